use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashSet;
use uuid::Uuid;

use super::keys;
use super::preview::flatten_parts;
use super::storage::StateStore;
use crate::error::{PopchatError, Result};
use crate::i18n::FallbackLocalizer;
use crate::models::{ChatMessage, ChatSession, MessageContent, Role, MAX_TITLE_LENGTH};

pub const MAX_CHAT_SESSIONS: usize = 12;
pub const AUTO_TITLE_LENGTH: usize = 52;

const SESSION_FIELDS: &[&str] = &["id", "title", "history", "pinned", "createdAt", "updatedAt"];

/// Result of [`normalize_state`]. `changed` tells the caller the normalized
/// form differs from what was read and has to be written back.
#[derive(Debug, Clone)]
pub struct NormalizedState {
    pub sessions: Vec<ChatSession>,
    pub active_id: String,
    pub changed: bool,
}

impl NormalizedState {
    /// Always `Some` for a value produced by [`normalize_state`].
    pub fn active_session(&self) -> Option<&ChatSession> {
        self.sessions.iter().find(|session| session.id == self.active_id)
    }
}

pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn parse_timestamp(raw: Option<&Value>) -> Option<DateTime<Utc>> {
    let millis = match raw? {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|value| value as i64))?,
        _ => return None,
    };
    DateTime::from_timestamp_millis(millis)
}

/// Lenient parse of one stored session. The flag reports whether anything
/// had to be repaired on the way.
fn parse_session(raw: &Value, now: DateTime<Utc>) -> Option<(ChatSession, bool)> {
    let object = raw.as_object()?;
    let mut repaired = object.keys().any(|key| !SESSION_FIELDS.contains(&key.as_str()));

    let raw_id = object.get("id").and_then(|id| id.as_str());
    let id = match raw_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => {
            repaired |= raw_id != Some(id);
            id.to_string()
        }
        None => {
            repaired = true;
            new_session_id()
        }
    };

    let raw_title = object.get("title").and_then(|title| title.as_str());
    let title = truncate_chars(raw_title.unwrap_or("").trim(), MAX_TITLE_LENGTH);
    repaired |= raw_title != Some(title.as_str());

    let history = match object.get("history").and_then(|history| history.as_array()) {
        Some(entries) => {
            let parsed: Vec<ChatMessage> =
                entries.iter().filter_map(ChatMessage::from_stored).collect();
            repaired |= parsed.len() != entries.len();
            parsed
        }
        None => {
            repaired = true;
            Vec::new()
        }
    };

    let pinned = match object.get("pinned").and_then(|pinned| pinned.as_bool()) {
        Some(pinned) => pinned,
        None => {
            repaired = true;
            false
        }
    };

    let created_at = object.get("createdAt");
    let updated_at = object.get("updatedAt");
    repaired |= !created_at.is_some_and(Value::is_i64) || !updated_at.is_some_and(Value::is_i64);
    let created_at = parse_timestamp(created_at).unwrap_or(now);
    let updated_at = parse_timestamp(updated_at).unwrap_or(created_at);

    Some((
        ChatSession {
            id,
            title,
            history,
            pinned,
            created_at,
            updated_at,
        },
        repaired,
    ))
}

fn history_from_legacy(legacy_history: Option<&Value>) -> Vec<ChatMessage> {
    legacy_history
        .and_then(|history| history.as_array())
        .map(|entries| entries.iter().filter_map(ChatMessage::from_stored).collect())
        .unwrap_or_default()
}

/// Title for an untitled session: first line of the hint, else the first
/// line of the first user turn.
pub fn derive_title(title_hint: Option<&str>, history: &[ChatMessage]) -> String {
    let first_line = |text: &str| -> Option<String> {
        text.lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(|line| truncate_chars(line, AUTO_TITLE_LENGTH))
    };

    title_hint
        .and_then(first_line)
        .or_else(|| {
            history
                .iter()
                .filter(|message| message.role == Role::User)
                .find_map(|message| message.text().and_then(first_line))
        })
        .unwrap_or_default()
}

/// Pinned sessions first, then most recently updated. Stable for ties.
pub fn sort_sessions(sessions: &mut [ChatSession]) {
    sessions.sort_by(|a, b| {
        b.pinned
            .cmp(&a.pinned)
            .then_with(|| b.updated_at.cmp(&a.updated_at))
    });
}

/// Caps the list at [`MAX_CHAT_SESSIONS`], keeping the active session even
/// when it sorts past the cut. Returns whether anything was dropped.
fn enforce_capacity(sessions: &mut Vec<ChatSession>, active_id: &str) -> bool {
    if sessions.len() <= MAX_CHAT_SESSIONS {
        return false;
    }

    match sessions.iter().position(|session| session.id == active_id) {
        Some(position) if position >= MAX_CHAT_SESSIONS => {
            let active = sessions.remove(position);
            sessions.truncate(MAX_CHAT_SESSIONS - 1);
            sessions.push(active);
        }
        _ => sessions.truncate(MAX_CHAT_SESSIONS),
    }
    true
}

fn ids(sessions: &[ChatSession]) -> Vec<String> {
    sessions.iter().map(|session| session.id.clone()).collect()
}

pub fn normalize_state(
    raw_sessions: Option<&Value>,
    raw_active_id: Option<&Value>,
    preferred_id: Option<&str>,
    legacy_history: Option<&Value>,
    allow_create_preferred: bool,
) -> NormalizedState {
    let now = Utc::now();
    let mut changed = false;
    let mut sessions: Vec<ChatSession> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    match raw_sessions {
        Some(Value::Array(entries)) => {
            for entry in entries {
                match parse_session(entry, now) {
                    Some((session, repaired)) => {
                        changed |= repaired;
                        if seen.insert(session.id.clone()) {
                            sessions.push(session);
                        } else {
                            changed = true;
                        }
                    }
                    None => changed = true,
                }
            }
        }
        Some(_) => changed = true,
        None => {}
    }

    if sessions.is_empty() {
        changed = true;
        let mut session = ChatSession::empty();
        session.history = history_from_legacy(legacy_history);
        session.title = derive_title(None, &session.history);
        sessions.push(session);
    }

    let preferred_id = preferred_id.map(str::trim).filter(|id| !id.is_empty());
    if let Some(preferred) = preferred_id {
        if allow_create_preferred && !sessions.iter().any(|session| session.id == preferred) {
            sessions.push(ChatSession::new(preferred));
            changed = true;
        }
    }

    let order_before = ids(&sessions);
    sort_sessions(&mut sessions);
    changed |= ids(&sessions) != order_before;

    let contains = |id: &str| sessions.iter().any(|session| session.id == id);
    let raw_active = raw_active_id.and_then(|active| active.as_str());
    let active_id = preferred_id
        .filter(|id| contains(id))
        .or_else(|| raw_active.filter(|id| contains(id)))
        .map(str::to_string)
        .unwrap_or_else(|| sessions[0].id.clone());

    changed |= enforce_capacity(&mut sessions, &active_id);
    changed |= raw_active != Some(active_id.as_str());

    NormalizedState {
        sessions,
        active_id,
        changed,
    }
}

/// Stored form of a message: structured user content is flattened to text.
fn to_stored(message: ChatMessage) -> ChatMessage {
    match message.content {
        MessageContent::Parts(parts) => ChatMessage {
            role: message.role,
            content: MessageContent::Text(flatten_parts(&FallbackLocalizer, &parts)),
        },
        MessageContent::Text(_) => message,
    }
}

pub fn update_history(
    mut sessions: Vec<ChatSession>,
    active_id: &str,
    new_history: Vec<ChatMessage>,
    title_hint: Option<&str>,
) -> Result<(Vec<ChatSession>, String)> {
    let session = sessions
        .iter_mut()
        .find(|session| session.id == active_id)
        .ok_or_else(|| PopchatError::SessionNotFound(active_id.to_string()))?;

    session.history = new_history
        .into_iter()
        .filter(|message| !message.is_system())
        .map(to_stored)
        .collect();
    session.updated_at = Utc::now();
    if !session.has_title() {
        session.title = derive_title(title_hint, &session.history);
    }

    sort_sessions(&mut sessions);
    enforce_capacity(&mut sessions, active_id);
    Ok((sessions, active_id.to_string()))
}

fn find_mut<'a>(sessions: &'a mut [ChatSession], id: &str) -> Result<&'a mut ChatSession> {
    sessions
        .iter_mut()
        .find(|session| session.id == id)
        .ok_or_else(|| PopchatError::SessionNotFound(id.to_string()))
}

/// Removes a session. The list never becomes empty and the active id always
/// names a remaining session.
pub fn delete_session(
    mut sessions: Vec<ChatSession>,
    active_id: &str,
    id: &str,
) -> Result<(Vec<ChatSession>, String)> {
    let before = sessions.len();
    sessions.retain(|session| session.id != id);
    if sessions.len() == before {
        return Err(PopchatError::SessionNotFound(id.to_string()));
    }
    if sessions.is_empty() {
        sessions.push(ChatSession::empty());
    }

    sort_sessions(&mut sessions);
    let active_id = if active_id != id && sessions.iter().any(|s| s.id == active_id) {
        active_id.to_string()
    } else {
        sessions[0].id.clone()
    };
    Ok((sessions, active_id))
}

pub fn set_pinned(
    mut sessions: Vec<ChatSession>,
    id: &str,
    pinned: bool,
) -> Result<Vec<ChatSession>> {
    find_mut(&mut sessions, id)?.pinned = pinned;
    sort_sessions(&mut sessions);
    Ok(sessions)
}

/// Sets a user title. An empty title lets the next turn derive one again.
pub fn rename_session(
    mut sessions: Vec<ChatSession>,
    id: &str,
    title: &str,
) -> Result<Vec<ChatSession>> {
    find_mut(&mut sessions, id)?.title = truncate_chars(title.trim(), MAX_TITLE_LENGTH);
    Ok(sessions)
}

pub fn clear_history(mut sessions: Vec<ChatSession>, id: &str) -> Result<Vec<ChatSession>> {
    let session = find_mut(&mut sessions, id)?;
    session.history.clear();
    session.title.clear();
    session.updated_at = Utc::now();
    sort_sessions(&mut sessions);
    Ok(sessions)
}

/// Reads and normalizes the session state, writing the repaired form back
/// when normalization changed anything.
pub fn load_state(
    store: &dyn StateStore,
    preferred_id: Option<&str>,
    allow_create_preferred: bool,
) -> Result<NormalizedState> {
    let raw = store.get(&[
        keys::CHAT_SESSIONS,
        keys::ACTIVE_CHAT_ID,
        keys::LEGACY_CHAT_HISTORY,
    ])?;

    let state = normalize_state(
        raw.get(keys::CHAT_SESSIONS),
        raw.get(keys::ACTIVE_CHAT_ID),
        preferred_id,
        raw.get(keys::LEGACY_CHAT_HISTORY),
        allow_create_preferred,
    );

    if state.changed {
        save_state(store, &state.sessions, &state.active_id)?;
        if raw.contains_key(keys::LEGACY_CHAT_HISTORY) {
            store.remove(&[keys::LEGACY_CHAT_HISTORY])?;
        }
    }

    Ok(state)
}

pub fn save_state(store: &dyn StateStore, sessions: &[ChatSession], active_id: &str) -> Result<()> {
    let mut entries = Map::new();
    entries.insert(keys::CHAT_SESSIONS.to_string(), serde_json::to_value(sessions)?);
    entries.insert(
        keys::ACTIVE_CHAT_ID.to_string(),
        Value::String(active_id.to_string()),
    );
    store.set(entries)
}
