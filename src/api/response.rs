use serde_json::Value;

use super::models::ImageResponse;

/// Best-effort extraction of an upstream error message from a response body.
pub fn extract_error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return None;
    };
    error_message_from_value(&json)
}

/// Message of an `{error: {message}}`, `{error: "..."}` or `{message}` payload.
pub fn error_message_from_value(payload: &Value) -> Option<String> {
    let message = match payload.get("error") {
        Some(Value::String(message)) => Some(message.as_str()),
        Some(error) => error.get("message").and_then(|m| m.as_str()),
        None => None,
    }
    .or_else(|| payload.get("message").and_then(|m| m.as_str()))
    .or_else(|| {
        payload
            .get("response")
            .and_then(|response| response.get("error"))
            .and_then(|error| error.get("message"))
            .and_then(|m| m.as_str())
    })?;

    let message = message.trim();
    if message.is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}

/// Concatenated `output_text` of a Responses API response object.
pub fn extract_output_text(response: &Value) -> Option<String> {
    if let Some(text) = response.get("output_text").and_then(|t| t.as_str()) {
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }

    let text: String = response
        .get("output")
        .and_then(|output| output.as_array())?
        .iter()
        .filter_map(|item| item.get("content").and_then(|c| c.as_array()))
        .flatten()
        .filter(|part| part.get("type").and_then(|t| t.as_str()) == Some("output_text"))
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// URL of the first generated image; inline base64 becomes a data URL.
pub fn extract_image_url(response: &ImageResponse) -> Option<String> {
    let first = response.data.first()?;
    if let Some(url) = first.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        return Some(url.to_string());
    }
    first
        .b64_json
        .as_deref()
        .map(str::trim)
        .filter(|b64| !b64.is_empty())
        .map(|b64| format!("data:image/png;base64,{}", b64))
}
