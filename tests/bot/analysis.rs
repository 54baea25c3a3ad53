use crate::bot_harness::{
    Harness, OWNER, command, forward_media, forward_text, test_config, text,
};
use context_assistant::session::{ItemKind, SessionState};
use context_assistant::transport::{ChatAction, Command};
use std::time::Duration;

async fn analyzed(h: &Harness) {
    h.send(forward_text(OWNER, (Some(7), "Anna"), 60, "are you coming tonight?"))
        .await;
    h.send(forward_text(OWNER, (Some(OWNER.0), "Me"), 120, "not sure yet"))
        .await;
    h.send(command(OWNER, Command::Analyze)).await;
}

#[tokio::test]
async fn analyze_on_empty_buffer_says_so() {
    let h = Harness::new().await;

    h.send(command(OWNER, Command::Analyze)).await;

    assert_eq!(h.messenger.sent_texts(), ["❌ The buffer is empty"]);
    assert_eq!(h.actions(OWNER).await, ["analyze_empty"]);
    assert!(h.session(OWNER).await.is_none());
}

#[tokio::test]
async fn analyze_offers_the_action_keyboard() {
    let h = Harness::new().await;

    analyzed(&h).await;

    let (text, keyboard) = h.messenger.last_sent().unwrap();
    assert_eq!(text, "📊 2 messages buffered.\n\nChoose an action:");
    let data: Vec<_> = keyboard.as_ref().unwrap().callback_data().collect();
    assert_eq!(data, ["summary", "formal", "friendly", "clear"]);
    assert_eq!(h.session(OWNER).await.unwrap().state, SessionState::WaitingAction);
    assert_eq!(h.last_stat(OWNER).await.0, "analyze_clicked");
}

#[tokio::test]
async fn text_without_a_session_asks_for_forwards() {
    let h = Harness::new().await;

    h.send(text(OWNER, "what should I say?")).await;

    assert_eq!(
        h.messenger.sent_texts(),
        ["Forward some messages, then use /analyze"]
    );
    assert_eq!(h.actions(OWNER).await, ["session_missing"]);
}

#[tokio::test]
async fn text_while_collecting_points_to_analyze() {
    let h = Harness::new().await;
    h.send(forward_text(OWNER, (Some(7), "Anna"), 60, "hello")).await;

    h.send(text(OWNER, "what should I say?")).await;

    let (reply, _) = h.messenger.last_sent().unwrap();
    assert_eq!(reply, "💡 Use /analyze");
    assert_eq!(h.last_stat(OWNER).await.0, "instruction_rejected");
    assert!(h.inference.requests().is_empty());
}

#[tokio::test]
async fn custom_instruction_produces_a_reply() {
    let h = Harness::new().await;
    analyzed(&h).await;
    h.inference.reply("Tell her you will confirm by six.");

    h.send(text(OWNER, "  help me decline politely  ")).await;

    let (reply, keyboard) = h.messenger.last_sent().unwrap();
    assert_eq!(reply, "Tell her you will confirm by six.");
    let data: Vec<_> = keyboard.as_ref().unwrap().callback_data().collect();
    assert_eq!(data, ["regenerate"]);
    assert_eq!(h.messenger.chat_actions(), [ChatAction::Typing]);

    let requests = h.inference.requests();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].has_media());
    let prompt = format!("{:?}", requests[0].messages);
    assert!(prompt.contains("[00:01] Anna: are you coming tonight?"));
    assert!(prompt.contains("help me decline politely"));

    let session = h.session(OWNER).await.unwrap();
    assert_eq!(session.state, SessionState::Conversation);
    assert_eq!(
        session.last_instruction.as_deref(),
        Some("help me decline politely")
    );
    assert_eq!(h.last_stat(OWNER).await.0, "custom_request");
}

#[tokio::test]
async fn follow_up_instructions_reuse_the_buffer() {
    let h = Harness::new().await;
    analyzed(&h).await;

    h.send(text(OWNER, "first idea")).await;
    h.send(text(OWNER, "shorter please")).await;

    let requests = h.inference.requests();
    assert_eq!(requests.len(), 2);
    assert!(format!("{:?}", requests[1].messages).contains("are you coming tonight?"));
    assert_eq!(
        h.session(OWNER).await.unwrap().last_instruction.as_deref(),
        Some("shorter please")
    );
}

#[tokio::test]
async fn overlong_instruction_is_rejected_before_inference() {
    let mut config = test_config();
    config.prompt.max_instruction_chars = 10;
    let h = Harness::with_config(config).await;
    analyzed(&h).await;

    h.send(text(OWNER, "ничего лишнего!")).await;

    let (reply, _) = h.messenger.last_sent().unwrap();
    assert_eq!(reply, "⚠️ The request is too long: at most 10 characters");
    assert!(h.inference.requests().is_empty());
    assert_eq!(h.last_stat(OWNER).await.0, "instruction_rejected");
}

#[tokio::test]
async fn blank_instruction_is_rejected() {
    let h = Harness::new().await;
    analyzed(&h).await;

    h.send(text(OWNER, "   ")).await;

    let (reply, _) = h.messenger.last_sent().unwrap();
    assert_eq!(reply, "⚠️ Tell me what to do with the conversation");
    assert!(h.inference.requests().is_empty());
}

#[tokio::test]
async fn inference_failure_sends_a_generic_notice() {
    let h = Harness::new().await;
    analyzed(&h).await;
    h.inference.fail("openrouter returned 502");

    h.send(text(OWNER, "draft something")).await;

    let (reply, _) = h.messenger.last_sent().unwrap();
    assert_eq!(reply, "❌ The service is temporarily unavailable, try again later");
    let (action, failed, _) = h.last_stat(OWNER).await;
    assert_eq!(action, "message_error");
    assert!(failed);
    // Nothing was answered, so there is nothing to regenerate.
    assert!(h.session(OWNER).await.unwrap().last_instruction.is_none());
}

#[tokio::test]
async fn media_buffers_use_the_multimodal_request() {
    let h = Harness::new().await;
    h.send(forward_media(OWNER, ItemKind::Image, 10, None)).await;
    h.send(command(OWNER, Command::Analyze)).await;

    h.send(text(OWNER, "what is in the picture?")).await;

    assert_eq!(h.messenger.chat_actions(), [ChatAction::UploadPhoto]);
    let requests = h.inference.requests();
    assert!(requests[0].has_media());
    assert!(format!("{:?}", requests[0].messages).contains("data:image/png;base64,AAAA"));
}

#[tokio::test]
async fn unreachable_media_degrades_to_a_placeholder() {
    let h = Harness::new().await;
    h.send(forward_media(OWNER, ItemKind::Image, 10, None)).await;
    h.send(command(OWNER, Command::Analyze)).await;
    h.media.break_downloads();
    h.inference.reply("It looks like a photo.");

    h.send(text(OWNER, "what is in the picture?")).await;

    let requests = h.inference.requests();
    assert!(!requests[0].has_media());
    assert!(format!("{:?}", requests[0].messages).contains("[Image - failed to load]"));
    assert_eq!(h.messenger.last_sent().unwrap().0, "It looks like a photo.");
    let (_, _, data) = h.last_stat(OWNER).await;
    assert_eq!(data.as_deref(), Some(r#"{"used_media":false}"#));
}

#[tokio::test]
async fn clear_drops_the_session() {
    let h = Harness::new().await;
    analyzed(&h).await;

    h.send(command(OWNER, Command::Clear)).await;

    assert_eq!(h.messenger.last_sent().unwrap().0, "🗑 Buffer cleared");
    assert!(h.session(OWNER).await.is_none());
    assert_eq!(h.last_stat(OWNER).await.0, "clear_command");
}

#[tokio::test]
async fn help_and_start_share_the_help_text() {
    let h = Harness::new().await;

    h.send(command(OWNER, Command::Help)).await;
    h.send(command(OWNER, Command::Start)).await;

    let sent = h.messenger.sent_texts();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], sent[1]);
    assert!(sent[0].contains("/analyze"));
    assert_eq!(h.actions(OWNER).await, ["help_command", "help_command"]);
}

#[tokio::test]
async fn session_vanishing_mid_reply_still_sends_one_message() {
    let h = Harness::new().await;
    analyzed(&h).await;
    h.inference.slow(Duration::from_millis(300));
    h.inference.reply("draft reply");
    let before = h.messenger.sent_texts().len();

    let ticket = h.service.router().dispatch(text(OWNER, "draft something"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    sqlx::query("DELETE FROM sessions")
        .execute(&h.pool)
        .await
        .unwrap();
    ticket.await.unwrap();

    assert_eq!(h.messenger.sent_texts()[before..], ["draft reply".to_string()]);
    assert_eq!(
        h.actions(OWNER).await,
        [
            "forward_message",
            "forward_message",
            "analyze_clicked",
            "custom_request"
        ]
    );
    assert!(h.session(OWNER).await.is_none());
}
