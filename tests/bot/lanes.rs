use crate::bot_harness::{Harness, OTHER, OWNER, command, forward_text, text};
use context_assistant::transport::Command;
use std::time::Duration;

#[tokio::test]
async fn events_for_one_user_run_in_arrival_order() {
    let h = Harness::new().await;
    h.inference.slow(Duration::from_millis(30));
    h.inference.reply("answer one");
    h.inference.reply("answer two");

    let router = h.service.router();
    drop(router.dispatch(forward_text(OWNER, (Some(7), "Anna"), 1, "first")));
    drop(router.dispatch(forward_text(OWNER, (Some(7), "Anna"), 2, "second")));
    drop(router.dispatch(command(OWNER, Command::Analyze)));
    drop(router.dispatch(text(OWNER, "one")));
    router.dispatch(text(OWNER, "two")).await.unwrap();

    assert_eq!(
        h.messenger.sent_texts()[1..],
        [
            "📊 2 messages buffered.\n\nChoose an action:".to_string(),
            "answer one".to_string(),
            "answer two".to_string(),
        ]
    );
    assert_eq!(
        h.session(OWNER).await.unwrap().last_instruction.as_deref(),
        Some("two")
    );
}

#[tokio::test]
async fn a_slow_user_does_not_block_another() {
    let h = Harness::new().await;
    h.send(forward_text(OWNER, (Some(7), "Anna"), 1, "hello")).await;
    h.send(command(OWNER, Command::Analyze)).await;
    h.inference.slow(Duration::from_millis(300));
    h.inference.reply("late answer");

    let router = h.service.router();
    let slow = router.dispatch(text(OWNER, "take your time"));
    router.dispatch(command(OTHER, Command::Help)).await.unwrap();

    assert!(!h.messenger.sent_texts().contains(&"late answer".to_string()));
    slow.await.unwrap();
    assert_eq!(h.messenger.last_sent().unwrap().0, "late answer");
}

#[tokio::test]
async fn failures_stay_inside_the_lane() {
    let h = Harness::new().await;
    h.messenger.fail_sends(true);

    h.send(command(OWNER, Command::Help)).await;

    let (action, failed, _) = h.last_stat(OWNER).await;
    assert_eq!(action, "help_error");
    assert!(failed);

    h.messenger.fail_sends(false);
    h.send(command(OWNER, Command::Help)).await;
    assert_eq!(h.messenger.sent_texts().len(), 1);
    assert!(
        h.service
            .router()
            .lanes()
            .wait_idle(Duration::from_secs(1))
            .await
    );
}
