use std::sync::Arc;

/// Source of localized strings. Implementations return `None` for unknown keys.
pub trait Localizer: Send + Sync {
    fn message(&self, key: &str) -> Option<String>;
}

/// Localizer without a catalog; every lookup falls back to the built-in text.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackLocalizer;

impl Localizer for FallbackLocalizer {
    fn message(&self, _key: &str) -> Option<String> {
        None
    }
}

const GERMAN_MESSAGES: &[(&str, &str)] = &[
    ("popupAttachmentSummaryPrefix", "Anhänge"),
    ("popupAttachmentImageLabel", "Bild"),
    ("popupAttachmentImageToken", "bild"),
    ("popupAttachmentFileLabel", "DATEI"),
    ("thinkingLevelDefault", "Standard"),
    ("thinkingLevelDefaultWithValue", "Standard ($1)"),
    ("thinkingLevelNone", "Keine"),
    ("thinkingLevelMinimal", "Minimal"),
    ("thinkingLevelLow", "Niedrig"),
    ("thinkingLevelMedium", "Mittel"),
    ("thinkingLevelHigh", "Hoch"),
    ("thinkingLevelXHigh", "Sehr hoch"),
];

/// Built-in German strings for the keys the CLI renders.
#[derive(Debug, Default, Clone, Copy)]
pub struct GermanLocalizer;

impl Localizer for GermanLocalizer {
    fn message(&self, key: &str) -> Option<String> {
        GERMAN_MESSAGES
            .iter()
            .find(|(id, _)| *id == key)
            .map(|(_, text)| text.to_string())
    }
}

/// Localizer for a resolved language code (`en` or `de`).
pub fn for_language(language: &str) -> Arc<dyn Localizer> {
    match language {
        "de" => Arc::new(GermanLocalizer),
        _ => Arc::new(FallbackLocalizer),
    }
}

pub fn text(localizer: &dyn Localizer, key: &str, fallback: &str) -> String {
    localizer
        .message(key)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}
