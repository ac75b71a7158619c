//! Keys of the persisted key-value document.

pub const API_KEY: &str = "apiKey";
pub const MODEL: &str = "apiModel";
pub const THINKING: &str = "apiThinkingLevel";
pub const WEB_SEARCH: &str = "webSearchEnabled";
pub const SYSTEM_MESSAGE: &str = "customSystemMessage";
pub const ACCENT_COLOR: &str = "accentColor";
pub const LANGUAGE: &str = "languagePreference";
pub const CHAT_SESSIONS: &str = "chatSessions";
pub const ACTIVE_CHAT_ID: &str = "activeChatId";
/// Single-conversation history written by older releases.
pub const LEGACY_CHAT_HISTORY: &str = "chatHistory";
