use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::ChatMessage;

pub const MAX_TITLE_LENGTH: usize = 80;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: String::new(),
            history: Vec::new(),
            pinned: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// A fresh session with a random id.
    pub fn empty() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }
}
