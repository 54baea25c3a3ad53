use crate::bot_harness::{Harness, OWNER, callback, command, forward_text};
use context_assistant::session::SessionState;
use context_assistant::transport::{CallbackNotice, Command};
use std::time::Duration;

async fn buffered(h: &Harness) {
    h.send(forward_text(OWNER, (Some(7), "Anna"), 60, "can we move the meeting?"))
        .await;
}

async fn analyzed(h: &Harness) {
    buffered(h).await;
    h.send(command(OWNER, Command::Analyze)).await;
}

fn alert(text: &str) -> Option<CallbackNotice> {
    Some(CallbackNotice::alert(text))
}

#[tokio::test]
async fn unknown_payload_is_rejected_with_an_alert() {
    let h = Harness::new().await;
    buffered(&h).await;

    h.send(callback(OWNER, "cb-1", "drop_everything")).await;
    h.send(callback(OWNER, "cb-2", "/analyze")).await;

    assert_eq!(
        h.messenger.answers(),
        [
            ("cb-1".to_string(), alert("❌ Unknown action")),
            ("cb-2".to_string(), alert("❌ Unknown action")),
        ]
    );
    let (action, _, data) = h.last_stat(OWNER).await;
    assert_eq!(action, "callback_rejected");
    assert!(data.unwrap().contains("/analyze"));
    assert_eq!(h.session(OWNER).await.unwrap().state, SessionState::Collecting);
}

#[tokio::test]
async fn button_without_a_session_reports_expiry() {
    let h = Harness::new().await;

    h.send(callback(OWNER, "cb-1", "summary")).await;

    assert_eq!(
        h.messenger.answers(),
        [("cb-1".to_string(), alert("❌ The session has expired"))]
    );
    assert!(h.messenger.sent_texts().is_empty());
    assert_eq!(h.actions(OWNER).await, ["session_missing"]);
}

#[tokio::test]
async fn analyze_button_behaves_like_the_command() {
    let h = Harness::new().await;
    buffered(&h).await;

    h.send(callback(OWNER, "cb-1", "analyze")).await;

    assert_eq!(
        h.messenger.last_sent().unwrap().0,
        "📊 1 messages buffered.\n\nChoose an action:"
    );
    assert_eq!(h.messenger.answers(), [("cb-1".to_string(), None)]);
    assert_eq!(h.last_stat(OWNER).await.0, "analyze_clicked");
}

#[tokio::test]
async fn preset_before_analysis_is_refused() {
    let h = Harness::new().await;
    buffered(&h).await;

    h.send(callback(OWNER, "cb-1", "formal")).await;

    assert_eq!(
        h.messenger.answers(),
        [("cb-1".to_string(), alert("💡 Use /analyze"))]
    );
    assert!(h.inference.requests().is_empty());
    assert_eq!(h.last_stat(OWNER).await.0, "instruction_rejected");
}

#[tokio::test]
async fn summary_button_generates_and_remembers_the_preset() {
    let h = Harness::new().await;
    analyzed(&h).await;
    h.inference.reply("Anna wants to reschedule.");

    h.send(callback(OWNER, "cb-1", "summary")).await;

    assert_eq!(h.messenger.last_sent().unwrap().0, "Anna wants to reschedule.");
    assert_eq!(h.messenger.answers(), [("cb-1".to_string(), None)]);
    let prompt = format!("{:?}", h.inference.requests()[0].messages);
    assert!(prompt.contains("Briefly summarize the conversation"));

    let session = h.session(OWNER).await.unwrap();
    assert_eq!(session.state, SessionState::Conversation);
    assert_eq!(session.last_instruction.as_deref(), Some("summary"));
    assert_eq!(h.last_stat(OWNER).await.0, "button_summary");
}

#[tokio::test]
async fn regenerate_without_history_is_refused() {
    let h = Harness::new().await;
    analyzed(&h).await;

    h.send(callback(OWNER, "cb-1", "regenerate")).await;

    assert_eq!(
        h.messenger.answers(),
        [("cb-1".to_string(), alert("❌ There is no previous instruction"))]
    );
    assert_eq!(h.last_stat(OWNER).await.0, "regenerate_rejected");
}

#[tokio::test]
async fn regenerate_repeats_the_last_instruction() {
    let h = Harness::new().await;
    analyzed(&h).await;
    h.inference.reply("Dear Anna, ...");
    h.inference.reply("Hello Anna, ...");

    h.send(callback(OWNER, "cb-1", "formal")).await;
    h.send(callback(OWNER, "cb-2", "regenerate")).await;

    let requests = h.inference.requests();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert!(format!("{:?}", request.messages).contains("Help write a formal reply"));
    }
    assert_eq!(
        h.messenger.sent_texts()[2..],
        ["Dear Anna, ...".to_string(), "Hello Anna, ...".to_string()]
    );
    assert_eq!(
        h.actions(OWNER).await,
        ["forward_message", "analyze_clicked", "button_formal", "regenerate"]
    );
}

#[tokio::test]
async fn regenerate_after_a_custom_request_reuses_its_text() {
    let h = Harness::new().await;
    analyzed(&h).await;
    h.send(crate::bot_harness::text(OWNER, "suggest a new time")).await;

    h.send(callback(OWNER, "cb-1", "regenerate")).await;

    let requests = h.inference.requests();
    assert_eq!(requests.len(), 2);
    assert!(format!("{:?}", requests[1].messages).contains("suggest a new time"));
}

#[tokio::test]
async fn clear_button_drops_the_session() {
    let h = Harness::new().await;
    analyzed(&h).await;

    h.send(callback(OWNER, "cb-1", "clear")).await;

    assert_eq!(h.messenger.last_sent().unwrap().0, "🗑 Buffer cleared");
    assert_eq!(h.messenger.answers(), [("cb-1".to_string(), None)]);
    assert!(h.session(OWNER).await.is_none());
    assert_eq!(h.last_stat(OWNER).await.0, "button_clear");
}

#[tokio::test]
async fn failing_button_flow_answers_with_an_alert() {
    let h = Harness::new().await;
    analyzed(&h).await;
    h.inference.fail("upstream timeout");

    h.send(callback(OWNER, "cb-1", "friendly")).await;

    assert_eq!(
        h.messenger.answers(),
        [(
            "cb-1".to_string(),
            alert("❌ The service is temporarily unavailable")
        )]
    );
    let (action, failed, _) = h.last_stat(OWNER).await;
    assert_eq!(action, "callback_error");
    assert!(failed);
}

#[tokio::test]
async fn preset_reply_survives_a_lost_session_row() {
    let h = Harness::new().await;
    analyzed(&h).await;
    h.inference.slow(Duration::from_millis(300));
    h.inference.reply("Dear Anna, ...");

    let ticket = h.service.router().dispatch(callback(OWNER, "cb-1", "formal"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    sqlx::query("DELETE FROM sessions")
        .execute(&h.pool)
        .await
        .unwrap();
    ticket.await.unwrap();

    assert_eq!(h.messenger.last_sent().unwrap().0, "Dear Anna, ...");
    assert_eq!(h.messenger.answers(), [("cb-1".to_string(), None)]);
    assert_eq!(h.last_stat(OWNER).await.0, "button_formal");
}
