use crate::error::{PopchatError, Result};
use crate::i18n::Localizer;
use crate::models::{Attachment, ChatMessage, ContentPart, MessageContent, Role};
use crate::session::preview;

pub const IMAGE_PLACEHOLDER: &str = "[Generated image omitted]";

const IMAGE_URL_PREFIXES: &[&str] = &[
    "data:image/",
    "https://oaidalleapiprodscus.blob.core.windows.net/",
    "https://files.oaiusercontent.com/",
];

/// Outgoing and persisted forms of one turn's history.
#[derive(Debug, Clone)]
pub struct TurnHistory {
    /// Sent upstream: one system message followed by the conversation.
    pub request: Vec<ChatMessage>,
    /// Written back to the session once the reply arrives.
    pub persisted: Vec<ChatMessage>,
    /// Plain prompt of the last user turn.
    pub prompt: String,
}

fn without_system(history: &[ChatMessage]) -> Vec<ChatMessage> {
    history
        .iter()
        .filter(|message| !message.is_system())
        .cloned()
        .collect()
}

fn with_system(system_message: &str, history: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut request = Vec::with_capacity(history.len() + 1);
    request.push(ChatMessage::system(system_message));
    request.extend(history.iter().cloned());
    request
}

/// User turn with its attachments folded into content parts.
pub fn user_message(text: &str, attachments: &[Attachment]) -> ChatMessage {
    if attachments.is_empty() {
        return ChatMessage::user(text);
    }

    let mut parts = Vec::with_capacity(attachments.len() + 1);
    if !text.trim().is_empty() {
        parts.push(ContentPart::InputText {
            text: text.to_string(),
        });
    }
    parts.extend(attachments.iter().map(Attachment::to_content_part));
    ChatMessage::user_parts(parts)
}

pub fn for_user_input(
    localizer: &dyn Localizer,
    system_message: &str,
    stored: &[ChatMessage],
    text: &str,
    attachments: &[Attachment],
) -> TurnHistory {
    let conversation = without_system(stored);

    let mut request = with_system(system_message, &conversation);
    request.push(user_message(text, attachments));

    let mut persisted = conversation;
    persisted.push(ChatMessage::user(preview::serialize_user_turn(
        localizer,
        text,
        attachments,
    )));

    TurnHistory {
        request,
        persisted,
        prompt: text.to_string(),
    }
}

/// Cuts the conversation after its last user turn so that turn is asked again.
pub fn for_regenerate(
    localizer: &dyn Localizer,
    system_message: &str,
    stored: &[ChatMessage],
) -> Result<TurnHistory> {
    let mut conversation = without_system(stored);
    let last_user = conversation
        .iter()
        .rposition(|message| message.role == Role::User)
        .ok_or(PopchatError::NoPreviousUserMessage)?;
    conversation.truncate(last_user + 1);

    let prompt = match &conversation[last_user].content {
        MessageContent::Text(text) => preview::user_text(localizer, text),
        MessageContent::Parts(parts) => parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::InputText { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
    };

    Ok(TurnHistory {
        request: with_system(system_message, &conversation),
        persisted: conversation,
        prompt,
    })
}

pub fn looks_like_generated_image(content: &str) -> bool {
    let content = content.trim();
    IMAGE_URL_PREFIXES
        .iter()
        .any(|prefix| content.starts_with(prefix))
}

/// Replaces assistant turns holding a generated image with a placeholder.
pub fn sanitize_image_turns(history: Vec<ChatMessage>) -> Vec<ChatMessage> {
    history
        .into_iter()
        .map(|message| {
            let is_image = message.role == Role::Assistant
                && message.text().is_some_and(looks_like_generated_image);
            if is_image {
                ChatMessage::assistant(IMAGE_PLACEHOLDER)
            } else {
                message
            }
        })
        .collect()
}
