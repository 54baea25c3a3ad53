use crate::bot_harness::{Harness, OTHER, OWNER, Outgoing, command, forward_text};
use context_assistant::transport::Command;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn serve_registers_the_menu_and_drains_every_event() {
    let h = Harness::new().await;
    h.messenger.queue_inbound(vec![
        forward_text(OWNER, (Some(7), "Anna"), 1, "hello"),
        forward_text(OWNER, (Some(7), "Anna"), 2, "are you there?"),
        command(OWNER, Command::Analyze),
        command(OTHER, Command::Help),
    ]);

    h.service.serve(CancellationToken::new()).await.unwrap();

    let Some(Outgoing::Commands(menu)) = h.messenger.outgoing().into_iter().next() else {
        panic!("command menu was not registered first");
    };
    let names: Vec<_> = menu.iter().map(|c| c.command.as_str()).collect();
    assert_eq!(names, ["analyze", "clear", "help"]);
    // A failed warmup is logged and polling goes on.
    assert_eq!(h.inference.warmups(), 1);

    assert_eq!(
        h.actions(OWNER).await,
        ["forward_message", "forward_message", "analyze_clicked"]
    );
    assert_eq!(h.actions(OTHER).await, ["help_command"]);
    assert_eq!(h.service.router().lanes().active_lanes(), 0);
}

#[tokio::test]
async fn cancelled_service_stops_without_dispatching() {
    let h = Harness::new().await;
    h.messenger
        .queue_inbound(vec![command(OWNER, Command::Help)]);
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    h.service.serve(shutdown).await.unwrap();

    assert!(h.messenger.sent_texts().is_empty());
    assert!(h.actions(OWNER).await.is_empty());
}
