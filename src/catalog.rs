//! Static catalog of supported models and the validators for every
//! selection and appearance setting that is read back from storage.

use regex::Regex;
use std::sync::LazyLock;

use crate::i18n::{self, Localizer};

pub const DEFAULT_MODEL_ID: &str = "gpt-5.2";
pub const DEFAULT_THINKING_LEVEL: &str = "default";
pub const DEFAULT_WEB_SEARCH_ENABLED: bool = false;
pub const DEFAULT_ACCENT_COLOR: &str = "#4f8cff";
pub const DEFAULT_LANGUAGE_PREFERENCE: &str = "auto";
pub const SUPPORTED_LANGUAGE_PREFERENCES: &[&str] = &["auto", "en", "de"];

static HEX_COLOR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Chat,
    Image,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Chat => "chat",
            ModelKind::Image => "image",
        }
    }
}

#[derive(Debug)]
pub struct ThinkingSpec {
    pub default_effort: &'static str,
    pub supported_efforts: &'static [&'static str],
}

#[derive(Debug)]
pub struct ModelInfo {
    pub id: &'static str,
    pub label: &'static str,
    pub kind: ModelKind,
    pub supports_thinking: bool,
    pub supports_web_search: bool,
    pub thinking: Option<ThinkingSpec>,
}

#[derive(Debug)]
pub struct ThinkingLevel {
    pub id: &'static str,
    pub label: &'static str,
    pub i18n_key: &'static str,
}

pub static MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "gpt-5.2",
        label: "GPT-5.2",
        kind: ModelKind::Chat,
        supports_thinking: true,
        supports_web_search: true,
        thinking: Some(ThinkingSpec {
            default_effort: "none",
            supported_efforts: &["none", "low", "medium", "high", "xhigh"],
        }),
    },
    ModelInfo {
        id: "gpt-5.1",
        label: "GPT-5.1",
        kind: ModelKind::Chat,
        supports_thinking: true,
        supports_web_search: true,
        thinking: Some(ThinkingSpec {
            default_effort: "none",
            supported_efforts: &["none", "low", "medium", "high"],
        }),
    },
    ModelInfo {
        id: "gpt-5-pro",
        label: "GPT-5 pro",
        kind: ModelKind::Chat,
        supports_thinking: true,
        supports_web_search: true,
        thinking: Some(ThinkingSpec {
            default_effort: "high",
            supported_efforts: &["high"],
        }),
    },
    ModelInfo {
        id: "gpt-5-mini",
        label: "GPT-5 mini",
        kind: ModelKind::Chat,
        supports_thinking: true,
        supports_web_search: true,
        thinking: Some(ThinkingSpec {
            default_effort: "medium",
            supported_efforts: &["minimal", "low", "medium", "high"],
        }),
    },
    ModelInfo {
        id: "gpt-5-nano",
        label: "GPT-5 nano",
        kind: ModelKind::Chat,
        supports_thinking: true,
        supports_web_search: true,
        thinking: Some(ThinkingSpec {
            default_effort: "medium",
            supported_efforts: &["minimal", "low", "medium", "high"],
        }),
    },
    ModelInfo {
        id: "gpt-image-1.5",
        label: "GPT Image 1.5",
        kind: ModelKind::Image,
        supports_thinking: false,
        supports_web_search: false,
        thinking: None,
    },
    ModelInfo {
        id: "gpt-image-1-mini",
        label: "GPT Image 1 mini",
        kind: ModelKind::Image,
        supports_thinking: false,
        supports_web_search: false,
        thinking: None,
    },
];

pub static THINKING_LEVELS: &[ThinkingLevel] = &[
    ThinkingLevel {
        id: "default",
        label: "Default",
        i18n_key: "thinkingLevelDefault",
    },
    ThinkingLevel {
        id: "none",
        label: "None",
        i18n_key: "thinkingLevelNone",
    },
    ThinkingLevel {
        id: "minimal",
        label: "Minimal",
        i18n_key: "thinkingLevelMinimal",
    },
    ThinkingLevel {
        id: "low",
        label: "Low",
        i18n_key: "thinkingLevelLow",
    },
    ThinkingLevel {
        id: "medium",
        label: "Medium",
        i18n_key: "thinkingLevelMedium",
    },
    ThinkingLevel {
        id: "high",
        label: "High",
        i18n_key: "thinkingLevelHigh",
    },
    ThinkingLevel {
        id: "xhigh",
        label: "XHigh",
        i18n_key: "thinkingLevelXHigh",
    },
];

pub fn model_by_id(model_id: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|model| model.id == model_id)
}

pub fn thinking_level_by_id(level_id: &str) -> Option<&'static ThinkingLevel> {
    THINKING_LEVELS.iter().find(|level| level.id == level_id)
}

pub fn valid_model_id(model_id: Option<&str>) -> &'static str {
    model_id
        .and_then(model_by_id)
        .map(|model| model.id)
        .unwrap_or(DEFAULT_MODEL_ID)
}

/// Levels selectable for a model: `default` followed by the model's own efforts.
pub fn thinking_levels_for_model(model_id: &str) -> Vec<&'static ThinkingLevel> {
    let Some(model) = model_by_id(model_id) else {
        return Vec::new();
    };
    if !model.supports_thinking {
        return Vec::new();
    }

    let efforts = model
        .thinking
        .as_ref()
        .map(|spec| spec.supported_efforts)
        .unwrap_or(&[]);

    let mut levels: Vec<&'static ThinkingLevel> = Vec::new();
    for id in std::iter::once(&DEFAULT_THINKING_LEVEL).chain(efforts.iter()) {
        if let Some(level) = thinking_level_by_id(id) {
            if !levels.iter().any(|existing| existing.id == level.id) {
                levels.push(level);
            }
        }
    }
    levels
}

pub fn valid_thinking_level(thinking_level: Option<&str>, model_id: &str) -> &'static str {
    let Some(level) = thinking_level.and_then(thinking_level_by_id) else {
        return DEFAULT_THINKING_LEVEL;
    };
    if level.id == DEFAULT_THINKING_LEVEL {
        return DEFAULT_THINKING_LEVEL;
    }

    if thinking_levels_for_model(model_id)
        .iter()
        .any(|allowed| allowed.id == level.id)
    {
        level.id
    } else {
        DEFAULT_THINKING_LEVEL
    }
}

/// Effort to send upstream, `None` when the model default should apply.
pub fn thinking_effort(thinking_level: &str, model_id: &str) -> Option<&'static str> {
    match valid_thinking_level(Some(thinking_level), model_id) {
        DEFAULT_THINKING_LEVEL => None,
        level => Some(level),
    }
}

pub fn default_thinking_effort(model_id: &str) -> Option<&'static str> {
    let effort = model_by_id(model_id)?.thinking.as_ref()?.default_effort;
    thinking_level_by_id(effort).map(|level| level.id)
}

pub fn supports_thinking_effort(model_id: &str, effort: &str) -> bool {
    !effort.is_empty()
        && thinking_levels_for_model(model_id)
            .iter()
            .any(|level| level.id == effort)
}

pub fn supports_thinking(model_id: &str) -> bool {
    model_by_id(model_id).is_some_and(|model| model.supports_thinking)
        && !thinking_levels_for_model(model_id).is_empty()
}

pub fn supports_web_search(model_id: &str) -> bool {
    model_by_id(model_id).is_some_and(|model| model.supports_web_search)
}

pub fn is_image_model(model_id: &str) -> bool {
    model_by_id(model_id).is_some_and(|model| model.kind == ModelKind::Image)
}

fn localized_level_label(localizer: &dyn Localizer, level: &ThinkingLevel) -> String {
    i18n::text(localizer, level.i18n_key, level.label)
}

/// Display label of a thinking level; `default` shows the model's own effort,
/// e.g. `Default (Medium)`.
pub fn thinking_label(localizer: &dyn Localizer, thinking_level: &str, model_id: &str) -> String {
    let level_id = valid_thinking_level(Some(thinking_level), model_id);
    let Some(level) = thinking_level_by_id(level_id) else {
        return i18n::text(localizer, "thinkingLevelDefault", "Default");
    };

    if level.id != DEFAULT_THINKING_LEVEL {
        return localized_level_label(localizer, level);
    }

    let Some(default_effort) = model_by_id(model_id)
        .and_then(|model| model.thinking.as_ref())
        .map(|spec| spec.default_effort)
    else {
        return level.label.to_string();
    };

    match thinking_level_by_id(default_effort) {
        Some(effort_level) => {
            let effort_label = localized_level_label(localizer, effort_level);
            match localizer.message("thinkingLevelDefaultWithValue") {
                Some(template) => template.replace("$1", &effort_label),
                None => format!("Default ({})", effort_label),
            }
        }
        None => localized_level_label(localizer, level),
    }
}

pub fn valid_accent_color(accent_color: Option<&str>) -> String {
    match accent_color.map(str::trim) {
        Some(color) if HEX_COLOR_REGEX.is_match(color) => color.to_lowercase(),
        _ => DEFAULT_ACCENT_COLOR.to_string(),
    }
}

pub fn valid_web_search_enabled(web_search_enabled: Option<bool>) -> bool {
    web_search_enabled == Some(true)
}

pub fn valid_language_preference(language_preference: Option<&str>) -> &'static str {
    let Some(preference) = language_preference.map(|p| p.trim().to_lowercase()) else {
        return DEFAULT_LANGUAGE_PREFERENCE;
    };
    SUPPORTED_LANGUAGE_PREFERENCES
        .iter()
        .find(|supported| **supported == preference)
        .copied()
        .unwrap_or(DEFAULT_LANGUAGE_PREFERENCE)
}

/// Resolves `auto` against the UI language (e.g. the `LANG` locale string).
pub fn resolve_language_preference(
    language_preference: Option<&str>,
    ui_language: &str,
) -> &'static str {
    match valid_language_preference(language_preference) {
        DEFAULT_LANGUAGE_PREFERENCE => {
            if ui_language.trim().to_lowercase().starts_with("de") {
                "de"
            } else {
                "en"
            }
        }
        preference => preference,
    }
}
