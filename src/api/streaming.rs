//! Incremental server-sent-events decoding for the Responses API stream.

use futures::StreamExt;
use serde_json::Value;

use super::client::ByteStream;
use super::response::{error_message_from_value, extract_output_text};
use crate::error::{PopchatError, Result};

const DONE_SENTINEL: &str = "[DONE]";
const DEFAULT_EVENT: &str = "message";

#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    pub event: String,
    pub data: Value,
}

/// Turns arbitrarily split byte chunks into complete SSE events.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending_bytes: Vec<u8>,
    buffer: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every event completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.pending_bytes.extend_from_slice(chunk);
        self.decode_pending(false);

        let mut events = Vec::new();
        while let Some(end) = self.buffer.find("\n\n") {
            let frame: String = self.buffer.drain(..end + 2).collect();
            if let Some(event) = parse_frame(&frame[..end]) {
                events.push(event);
            }
        }
        events
    }

    /// Flushes whatever is left once the stream has closed.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        self.decode_pending(true);

        let mut events = Vec::new();
        let rest = std::mem::take(&mut self.buffer);
        for frame in rest.split("\n\n") {
            if let Some(event) = parse_frame(frame) {
                events.push(event);
            }
        }
        events
    }

    fn decode_pending(&mut self, at_end: bool) {
        loop {
            match std::str::from_utf8(&self.pending_bytes) {
                Ok(text) => {
                    push_stripped(&mut self.buffer, text);
                    self.pending_bytes.clear();
                    return;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    let text = String::from_utf8_lossy(&self.pending_bytes[..valid]).into_owned();
                    push_stripped(&mut self.buffer, &text);

                    match err.error_len() {
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            self.pending_bytes.drain(..valid + len);
                        }
                        None if at_end => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            self.pending_bytes.clear();
                            return;
                        }
                        None => {
                            // Incomplete multi-byte sequence; wait for more bytes.
                            self.pending_bytes.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }
}

fn push_stripped(buffer: &mut String, text: &str) {
    buffer.extend(text.chars().filter(|c| *c != '\r'));
}

/// Parses one frame. `None` for comments, `[DONE]` and malformed payloads.
pub fn parse_frame(frame: &str) -> Option<SseEvent> {
    let mut event_name: Option<String> = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in frame.lines() {
        if line.starts_with(':') {
            continue;
        }
        if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.strip_prefix(' ').unwrap_or(value));
        } else if let Some(value) = line.strip_prefix("event:") {
            let value = value.trim();
            if !value.is_empty() {
                event_name = Some(value.to_string());
            }
        }
    }

    if data_lines.is_empty() {
        return None;
    }

    let data = data_lines.join("\n");
    if data.trim() == DONE_SENTINEL {
        return None;
    }

    let data: Value = serde_json::from_str(&data).ok()?;
    let event = event_name
        .or_else(|| data.get("type").and_then(|t| t.as_str()).map(str::to_string))
        .unwrap_or_else(|| DEFAULT_EVENT.to_string());

    Some(SseEvent { event, data })
}

/// Folds Responses API stream events into the final assistant text.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    text: String,
}

impl ResponseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event; returns the text delta to relay, if any.
    pub fn apply(&mut self, event: &SseEvent) -> Result<Option<String>> {
        match event.event.as_str() {
            "response.output_text.delta" => {
                let delta = event.data.get("delta").and_then(|d| d.as_str()).unwrap_or("");
                if delta.is_empty() {
                    return Ok(None);
                }
                self.text.push_str(delta);
                Ok(Some(delta.to_string()))
            }
            "response.output_text.done" => {
                if self.text.is_empty() {
                    if let Some(text) = event.data.get("text").and_then(|t| t.as_str()) {
                        self.text = text.to_string();
                    }
                }
                Ok(None)
            }
            "response.completed" => {
                if self.text.is_empty() {
                    if let Some(text) = event.data.get("response").and_then(extract_output_text) {
                        self.text = text;
                    }
                }
                Ok(None)
            }
            "response.failed" | "error" => Err(PopchatError::UpstreamError(
                error_message_from_value(&event.data)
                    .unwrap_or_else(|| "The response failed.".to_string()),
            )),
            _ => Ok(None),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Final text; an empty result is an error.
    pub fn into_text(self) -> Result<String> {
        if self.text.trim().is_empty() {
            Err(PopchatError::EmptyModelOutput)
        } else {
            Ok(self.text)
        }
    }
}

/// Drains a response byte stream, calling `on_delta` for each text delta.
pub async fn read_response_stream<F>(
    mut stream: ByteStream,
    verbose: bool,
    mut on_delta: F,
) -> Result<String>
where
    F: FnMut(&str),
{
    let mut decoder = SseDecoder::new();
    let mut accumulator = ResponseAccumulator::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        for event in decoder.feed(&chunk) {
            apply_event(&mut accumulator, &event, verbose, &mut on_delta)?;
        }
    }
    for event in decoder.finish() {
        apply_event(&mut accumulator, &event, verbose, &mut on_delta)?;
    }

    accumulator.into_text()
}

fn apply_event<F>(
    accumulator: &mut ResponseAccumulator,
    event: &SseEvent,
    verbose: bool,
    on_delta: &mut F,
) -> Result<()>
where
    F: FnMut(&str),
{
    if verbose && !event.event.starts_with("response.output_text") {
        crate::ui::output::debug(&format!("SSE event: {}", event.event));
    }
    if let Some(delta) = accumulator.apply(event)? {
        on_delta(&delta);
    }
    Ok(())
}
