//! Persisted user settings. Every read validates the stored value and
//! writes the repaired value back when it had to be reset.

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::catalog;
use crate::error::{PopchatError, Result};
use crate::i18n::{self, Localizer};
use crate::session::keys;
use crate::session::StateStore;

pub const DEFAULT_SYSTEM_MESSAGE: &str =
    "I'm your helpful chat bot! I provide helpful and concise answers.";
pub const MAX_SYSTEM_MESSAGE_LENGTH: usize = 4000;
const MIN_API_KEY_LENGTH: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub model_id: String,
    pub thinking_level: String,
    pub web_search_enabled: bool,
}

impl Default for Selection {
    fn default() -> Self {
        Self::normalized(None, None, None)
    }
}

impl Selection {
    pub fn normalized(
        model_id: Option<&str>,
        thinking_level: Option<&str>,
        web_search_enabled: Option<bool>,
    ) -> Self {
        let model_id = catalog::valid_model_id(model_id);
        Self {
            model_id: model_id.to_string(),
            thinking_level: catalog::valid_thinking_level(thinking_level, model_id).to_string(),
            web_search_enabled: catalog::valid_web_search_enabled(web_search_enabled),
        }
    }

    pub fn is_image_model(&self) -> bool {
        catalog::is_image_model(&self.model_id)
    }

    /// Reasoning effort to request, if the model takes one.
    pub fn effort(&self) -> Option<&'static str> {
        if catalog::supports_thinking(&self.model_id) {
            catalog::thinking_effort(&self.thinking_level, &self.model_id)
        } else {
            None
        }
    }

    pub fn web_search_active(&self) -> bool {
        self.web_search_enabled && catalog::supports_web_search(&self.model_id)
    }

    fn entries(&self) -> Map<String, Value> {
        let mut entries = Map::new();
        entries.insert(keys::MODEL.to_string(), Value::from(self.model_id.clone()));
        entries.insert(keys::THINKING.to_string(), Value::from(self.thinking_level.clone()));
        entries.insert(keys::WEB_SEARCH.to_string(), Value::from(self.web_search_enabled));
        entries
    }
}

fn str_value<'a>(raw: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    raw.get(key).and_then(|value| value.as_str())
}

pub fn load_selection(store: &dyn StateStore) -> Result<Selection> {
    let raw = store.get(&[keys::MODEL, keys::THINKING, keys::WEB_SEARCH])?;
    let selection = Selection::normalized(
        str_value(&raw, keys::MODEL),
        str_value(&raw, keys::THINKING),
        raw.get(keys::WEB_SEARCH).and_then(|value| value.as_bool()),
    );

    let updates: Map<String, Value> = selection
        .entries()
        .into_iter()
        .filter(|(key, value)| raw.get(key) != Some(value))
        .collect();
    if !updates.is_empty() {
        store.set(updates)?;
    }

    Ok(selection)
}

/// Applies the given overrides on top of the stored selection. The thinking
/// level is re-validated against the resulting model.
pub fn save_selection(
    store: &dyn StateStore,
    model_id: Option<&str>,
    thinking_level: Option<&str>,
    web_search_enabled: Option<bool>,
) -> Result<Selection> {
    let current = load_selection(store)?;
    let selection = Selection::normalized(
        Some(model_id.unwrap_or(current.model_id.as_str())),
        Some(thinking_level.unwrap_or(current.thinking_level.as_str())),
        Some(web_search_enabled.unwrap_or(current.web_search_enabled)),
    );
    store.set(selection.entries())?;
    Ok(selection)
}

pub fn load_api_key(store: &dyn StateStore) -> Result<Option<String>> {
    let raw = store.get(&[keys::API_KEY])?;
    Ok(str_value(&raw, keys::API_KEY)
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string))
}

pub fn looks_like_api_key(api_key: &str) -> bool {
    api_key.starts_with("sk-") && api_key.len() >= MIN_API_KEY_LENGTH
}

pub fn save_api_key(store: &dyn StateStore, api_key: &str) -> Result<()> {
    let api_key = api_key.trim();
    if !looks_like_api_key(api_key) {
        return Err(PopchatError::InvalidApiKeyFormat);
    }
    let mut entries = Map::new();
    entries.insert(keys::API_KEY.to_string(), Value::from(api_key));
    store.set(entries)
}

pub fn remove_api_key(store: &dyn StateStore) -> Result<()> {
    store.remove(&[keys::API_KEY])
}

pub fn normalize_system_message(system_message: &str) -> String {
    system_message
        .trim()
        .chars()
        .take(MAX_SYSTEM_MESSAGE_LENGTH)
        .collect()
}

/// The custom system message, or the built-in default when none is set.
pub fn load_system_message(store: &dyn StateStore) -> Result<String> {
    let raw = store.get(&[keys::SYSTEM_MESSAGE])?;
    let custom = normalize_system_message(str_value(&raw, keys::SYSTEM_MESSAGE).unwrap_or(""));
    if custom.is_empty() {
        Ok(DEFAULT_SYSTEM_MESSAGE.to_string())
    } else {
        Ok(custom)
    }
}

/// Stores a custom system message; an empty message restores the default.
pub fn save_system_message(store: &dyn StateStore, system_message: &str) -> Result<String> {
    let normalized = normalize_system_message(system_message);
    let mut entries = Map::new();
    entries.insert(keys::SYSTEM_MESSAGE.to_string(), Value::from(normalized.clone()));
    store.set(entries)?;
    Ok(normalized)
}

fn load_validated(
    store: &dyn StateStore,
    key: &str,
    validate: impl Fn(Option<&str>) -> String,
) -> Result<String> {
    let raw = store.get(&[key])?;
    let value = validate(str_value(&raw, key));
    if str_value(&raw, key) != Some(value.as_str()) {
        let mut entries = Map::new();
        entries.insert(key.to_string(), Value::from(value.clone()));
        store.set(entries)?;
    }
    Ok(value)
}

pub fn load_accent_color(store: &dyn StateStore) -> Result<String> {
    load_validated(store, keys::ACCENT_COLOR, catalog::valid_accent_color)
}

pub fn save_accent_color(store: &dyn StateStore, accent_color: &str) -> Result<String> {
    let value = catalog::valid_accent_color(Some(accent_color));
    let mut entries = Map::new();
    entries.insert(keys::ACCENT_COLOR.to_string(), Value::from(value.clone()));
    store.set(entries)?;
    Ok(value)
}

pub fn load_language_preference(store: &dyn StateStore) -> Result<String> {
    load_validated(store, keys::LANGUAGE, |raw| {
        catalog::valid_language_preference(raw).to_string()
    })
}

pub fn save_language_preference(store: &dyn StateStore, preference: &str) -> Result<String> {
    let value = catalog::valid_language_preference(Some(preference)).to_string();
    let mut entries = Map::new();
    entries.insert(keys::LANGUAGE.to_string(), Value::from(value.clone()));
    store.set(entries)?;
    Ok(value)
}

/// Localizer for the stored language preference; `auto` follows `ui_language`
/// (a locale string such as `de_DE.UTF-8`).
pub fn load_localizer(store: &dyn StateStore, ui_language: &str) -> Result<Arc<dyn Localizer>> {
    let preference = load_language_preference(store)?;
    let language = catalog::resolve_language_preference(Some(&preference), ui_language);
    Ok(i18n::for_language(language))
}
