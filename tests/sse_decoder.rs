use popchat::api::{ResponseAccumulator, SseDecoder, SseEvent};
use popchat::api::streaming::parse_frame;
use popchat::error::PopchatError;
use serde_json::json;

fn decode_all(chunks: &[&str]) -> Vec<SseEvent> {
    let mut decoder = SseDecoder::new();
    let mut events = Vec::new();
    for chunk in chunks {
        events.extend(decoder.feed(chunk.as_bytes()));
    }
    events.extend(decoder.finish());
    events
}

#[test]
fn test_single_frame_split_at_every_offset() {
    let frame = b"event: foo\ndata: {\"a\":1}\n\n";

    for split in 0..=frame.len() {
        let (head, tail) = frame.split_at(split);
        let mut decoder = SseDecoder::new();
        let mut events = decoder.feed(head);
        events.extend(decoder.feed(tail));
        events.extend(decoder.finish());

        assert_eq!(events.len(), 1, "split at {}", split);
        assert_eq!(events[0].event, "foo");
        assert_eq!(events[0].data, json!({"a": 1}));
    }
}

#[test]
fn test_multibyte_character_split_across_chunks() {
    let frame = "data: {\"type\":\"response.output_text.delta\",\"delta\":\"größe ✓\"}\n\n";
    let bytes = frame.as_bytes();
    let check_mark = frame.find('✓').unwrap();

    let mut decoder = SseDecoder::new();
    let mut events = decoder.feed(&bytes[..check_mark + 1]);
    assert!(events.is_empty());
    events.extend(decoder.feed(&bytes[check_mark + 1..]));

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data["delta"], json!("größe ✓"));
}

#[test]
fn test_done_sentinel_is_suppressed() {
    let events = decode_all(&["data: {\"type\":\"x\"}\n\ndata: [DONE]\n\n"]);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, "x");
}

#[test]
fn test_trailing_done_without_terminator_is_suppressed() {
    let events = decode_all(&["data: [DONE]"]);
    assert!(events.is_empty());
}

#[test]
fn test_event_name_inferred_from_type() {
    let events = decode_all(&["data: {\"type\":\"response.completed\",\"response\":{}}\n\n"]);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, "response.completed");
}

#[test]
fn test_explicit_event_name_wins_over_type() {
    let events = decode_all(&["event: custom\ndata: {\"type\":\"other\"}\n\n"]);
    assert_eq!(events[0].event, "custom");
}

#[test]
fn test_event_name_defaults_to_message() {
    let events = decode_all(&["data: {\"a\":1}\n\n"]);
    assert_eq!(events[0].event, "message");
}

#[test]
fn test_multi_line_data_is_joined() {
    let events = decode_all(&["event: multi\ndata: {\"a\":\ndata: 2}\n\n"]);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].data, json!({"a": 2}));
}

#[test]
fn test_malformed_frames_are_dropped() {
    let events = decode_all(&[
        "data: {not json}\n\n",
        "event: ok\ndata: {\"b\":true}\n\n",
        ": comment only\n\n",
        "event: lonely\n\n",
    ]);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, "ok");
}

#[test]
fn test_crlf_line_endings() {
    let events = decode_all(&["event: foo\r\ndata: {\"a\":1}\r\n\r\n"]);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, "foo");
}

#[test]
fn test_finish_flushes_unterminated_frame() {
    let mut decoder = SseDecoder::new();
    assert!(decoder.feed(b"event: tail\ndata: {\"c\":3}").is_empty());

    let events = decoder.finish();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, "tail");
    assert!(decoder.finish().is_empty());
}

#[test]
fn test_many_frames_in_one_chunk() {
    let events = decode_all(&["data: {\"n\":1}\n\ndata: {\"n\":2}\n\ndata: {\"n\":3}\n\n"]);
    let numbers: Vec<i64> = events.iter().map(|e| e.data["n"].as_i64().unwrap()).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
}

#[test]
fn test_parse_frame_without_data_is_none() {
    assert!(parse_frame("event: nothing").is_none());
    assert!(parse_frame("").is_none());
}

fn event(name: &str, data: serde_json::Value) -> SseEvent {
    SseEvent {
        event: name.to_string(),
        data,
    }
}

#[test]
fn test_accumulator_collects_deltas() {
    let mut accumulator = ResponseAccumulator::new();

    let first = accumulator
        .apply(&event("response.output_text.delta", json!({"delta": "Hel"})))
        .unwrap();
    let second = accumulator
        .apply(&event("response.output_text.delta", json!({"delta": "lo"})))
        .unwrap();
    accumulator
        .apply(&event("response.output_text.done", json!({"text": "ignored"})))
        .unwrap();

    assert_eq!(first.as_deref(), Some("Hel"));
    assert_eq!(second.as_deref(), Some("lo"));
    assert_eq!(accumulator.into_text().unwrap(), "Hello");
}

#[test]
fn test_accumulator_falls_back_to_completed_response() {
    let mut accumulator = ResponseAccumulator::new();
    accumulator
        .apply(&event(
            "response.completed",
            json!({
                "response": {
                    "output": [{
                        "type": "message",
                        "content": [{"type": "output_text", "text": "Full answer"}]
                    }]
                }
            }),
        ))
        .unwrap();

    assert_eq!(accumulator.text(), "Full answer");
}

#[test]
fn test_accumulator_failed_event_is_an_error() {
    let mut accumulator = ResponseAccumulator::new();
    let result = accumulator.apply(&event(
        "response.failed",
        json!({"response": {"error": {"message": "quota exceeded"}}}),
    ));

    match result {
        Err(PopchatError::UpstreamError(message)) => assert_eq!(message, "quota exceeded"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_accumulator_empty_output_is_an_error() {
    let accumulator = ResponseAccumulator::new();
    assert!(matches!(
        accumulator.into_text(),
        Err(PopchatError::EmptyModelOutput)
    ));
}
