use crate::bot_harness::{EditScript, Harness, OWNER, forward_media, forward_text, test_config};
use context_assistant::session::{ItemKind, SessionState};
use context_assistant::transport::Command;

#[tokio::test]
async fn first_forward_sends_progress_with_analyze_button() {
    let h = Harness::new().await;

    h.send(forward_text(OWNER, (Some(7), "Anna"), 60, "hello")).await;

    let (text, keyboard) = h.messenger.last_sent().unwrap();
    assert_eq!(
        text,
        "📝 Collected: 1/50 messages\n💡 Use /analyze to pick an action or type your own request"
    );
    let data: Vec<_> = keyboard.as_ref().unwrap().callback_data().collect();
    assert_eq!(data, ["analyze"]);

    let session = h.session(OWNER).await.unwrap();
    assert_eq!(session.last_message_id, Some(1));
    assert_eq!(session.messages.len(), 1);
    assert_eq!(h.actions(OWNER).await, ["forward_message"]);
}

#[tokio::test]
async fn later_forwards_edit_the_progress_message_in_place() {
    let h = Harness::new().await;

    h.send(forward_text(OWNER, (Some(7), "Anna"), 60, "hello")).await;
    h.send(forward_text(OWNER, (Some(100), "Me"), 120, "hi")).await;

    assert_eq!(h.messenger.sent_texts().len(), 1);
    let edits = h.messenger.edits();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].0.message_id, 1);
    assert!(edits[0].1.starts_with("📝 Collected: 2/50 messages"));
    assert_eq!(h.actions(OWNER).await, ["forward_message", "forward_message"]);
}

#[tokio::test]
async fn progress_counts_images_and_voice() {
    let h = Harness::new().await;

    h.send(forward_media(OWNER, ItemKind::Image, 10, None)).await;
    h.send(forward_media(OWNER, ItemKind::Voice, 20, Some(5))).await;

    let (_, text) = h.messenger.edits().pop().unwrap();
    assert!(text.starts_with("📝 Collected: 2/50 messages, 1/5 images, 1/7 voice messages"));
}

#[tokio::test]
async fn vanished_progress_message_is_replaced() {
    let h = Harness::new().await;
    h.send(forward_text(OWNER, (Some(7), "Anna"), 60, "hello")).await;

    h.messenger.script_edit(EditScript::NotFound);
    h.send(forward_text(OWNER, (Some(7), "Anna"), 61, "again")).await;

    assert_eq!(h.messenger.sent_texts().len(), 2);
    assert_eq!(h.session(OWNER).await.unwrap().last_message_id, Some(2));
    assert_eq!(h.actions(OWNER).await, ["forward_message", "forward_message"]);
}

#[tokio::test]
async fn unchanged_progress_edit_is_not_an_error() {
    let h = Harness::new().await;
    h.send(forward_text(OWNER, (Some(7), "Anna"), 60, "hello")).await;

    h.messenger.script_edit(EditScript::NotModified);
    h.send(forward_text(OWNER, (Some(7), "Anna"), 61, "again")).await;

    assert_eq!(h.messenger.sent_texts().len(), 1);
    assert!(h.messenger.edits().is_empty());
    assert_eq!(h.actions(OWNER).await, ["forward_message", "forward_message"]);
}

#[tokio::test]
async fn failed_edit_reports_a_forward_error() {
    let h = Harness::new().await;
    h.send(forward_text(OWNER, (Some(7), "Anna"), 60, "hello")).await;

    h.messenger.script_edit(EditScript::Broken);
    h.send(forward_text(OWNER, (Some(7), "Anna"), 61, "again")).await;

    let (text, _) = h.messenger.last_sent().unwrap();
    assert_eq!(text, "❌ The service is temporarily unavailable, try again later");
    let (action, failed, _) = h.last_stat(OWNER).await;
    assert_eq!(action, "forward_error");
    assert!(failed);
}

#[tokio::test]
async fn forward_over_the_message_limit_is_rejected() {
    let mut config = test_config();
    config.limits.max_messages = 2;
    let h = Harness::with_config(config).await;

    for date in [1, 2, 3] {
        h.send(forward_text(OWNER, (Some(7), "Anna"), date, "x")).await;
    }

    let (text, _) = h.messenger.last_sent().unwrap();
    assert_eq!(
        text,
        "⚠️ Limit reached: at most 2 messages per session.\nUse /clear to start a new session."
    );
    let (action, failed, data) = h.last_stat(OWNER).await;
    assert_eq!(action, "limit_exceeded");
    assert!(!failed);
    assert!(data.unwrap().contains("max_messages"));
    assert_eq!(h.session(OWNER).await.unwrap().messages.len(), 2);
}

#[tokio::test]
async fn long_voice_note_is_rejected() {
    let h = Harness::new().await;

    h.send(forward_media(OWNER, ItemKind::Voice, 10, Some(120))).await;

    let (text, _) = h.messenger.last_sent().unwrap();
    assert_eq!(
        text,
        "⚠️ The voice message is too long.\nMaximum duration: 60 seconds."
    );
    assert!(h.session(OWNER).await.unwrap().messages.is_empty());
    assert_eq!(h.actions(OWNER).await, ["limit_exceeded"]);
}

#[tokio::test]
async fn forwards_are_kept_in_chronological_order() {
    let h = Harness::new().await;

    h.send(forward_text(OWNER, (Some(7), "Anna"), 300, "third")).await;
    h.send(forward_text(OWNER, (Some(7), "Anna"), 100, "first")).await;
    h.send(forward_text(OWNER, (Some(7), "Anna"), 200, "second")).await;

    let session = h.session(OWNER).await.unwrap();
    let texts: Vec<_> = session.messages.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, ["first", "second", "third"]);
}

#[tokio::test]
async fn forward_after_analysis_starts_a_new_buffer() {
    let h = Harness::new().await;
    h.send(forward_text(OWNER, (Some(7), "Anna"), 1, "old")).await;
    h.send(crate::bot_harness::command(OWNER, Command::Analyze)).await;

    h.send(forward_text(OWNER, (Some(7), "Anna"), 2, "new")).await;

    let session = h.session(OWNER).await.unwrap();
    assert_eq!(session.state, SessionState::Collecting);
    assert_eq!(session.messages.len(), 1);
    assert_eq!(session.messages[0].text, "new");
}

#[tokio::test]
async fn own_messages_are_marked_as_self() {
    let h = Harness::new().await;

    h.send(forward_text(OWNER, (Some(OWNER.0), "Me"), 1, "mine")).await;
    h.send(forward_text(OWNER, (None, "Hidden"), 2, "theirs")).await;

    let session = h.session(OWNER).await.unwrap();
    assert!(session.messages[0].author.is_self);
    assert!(!session.messages[1].author.is_self);
}
