//! Messages exchanged between a front end and the orchestrator.

use serde::{Deserialize, Serialize};

use super::attachment::Attachment;

/// Inbound intent. Deserializes from the wire shapes
/// `{userInput, attachments, chatId}`, `{regenerate, chatId}` and `{stopResponse}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InboundMessage {
    StopResponse {
        #[serde(rename = "stopResponse")]
        stop_response: bool,
    },
    Regenerate {
        regenerate: bool,
        #[serde(rename = "chatId", default, skip_serializing_if = "Option::is_none")]
        chat_id: Option<String>,
    },
    UserInput {
        #[serde(rename = "userInput")]
        user_input: String,
        #[serde(default)]
        attachments: Vec<Attachment>,
        #[serde(rename = "chatId", default, skip_serializing_if = "Option::is_none")]
        chat_id: Option<String>,
    },
}

impl InboundMessage {
    pub fn user_input(
        text: impl Into<String>,
        attachments: Vec<Attachment>,
        chat_id: Option<String>,
    ) -> Self {
        InboundMessage::UserInput {
            user_input: text.into(),
            attachments,
            chat_id,
        }
    }

    pub fn regenerate(chat_id: Option<String>) -> Self {
        InboundMessage::Regenerate {
            regenerate: true,
            chat_id,
        }
    }

    pub fn stop() -> Self {
        InboundMessage::StopResponse {
            stop_response: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamPayload {
    Start,
    Delta { delta: String },
    Done { text: String },
}

/// Event relayed to every listening front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    Stream {
        stream: StreamPayload,
    },
    Error {
        error: String,
    },
    ImageUrl {
        #[serde(rename = "imageUrl")]
        image_url: String,
    },
}

impl OutboundMessage {
    pub fn start() -> Self {
        OutboundMessage::Stream {
            stream: StreamPayload::Start,
        }
    }

    pub fn delta(delta: impl Into<String>) -> Self {
        OutboundMessage::Stream {
            stream: StreamPayload::Delta {
                delta: delta.into(),
            },
        }
    }

    pub fn done(text: impl Into<String>) -> Self {
        OutboundMessage::Stream {
            stream: StreamPayload::Done { text: text.into() },
        }
    }

    /// Whether this event closes the event stream of a request.
    ///
    /// A request superseded by a newer one ends without a terminal event; the
    /// newer request's `start` follows its last delta on the same channel.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            OutboundMessage::Stream {
                stream: StreamPayload::Start | StreamPayload::Delta { .. }
            }
        )
    }
}
