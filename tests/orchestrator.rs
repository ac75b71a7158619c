use async_trait::async_trait;
use bytes::Bytes;
use popchat::api::{ImageRequest, ImageResponse, ResponsesRequest, Upstream, UpstreamResponse};
use popchat::error::{PopchatError, Result, INVALID_API_KEY_MESSAGE, TIMEOUT_MESSAGE};
use popchat::i18n::GermanLocalizer;
use popchat::models::{Attachment, ChatMessage, InboundMessage, OutboundMessage};
use popchat::orchestrator::history::IMAGE_PLACEHOLDER;
use popchat::orchestrator::{Orchestrator, TurnOutcome};
use popchat::session::{self, keys, MemoryStateStore, StateStore};
use popchat::settings::{self, DEFAULT_SYSTEM_MESSAGE};
use popchat::ui::output::{print_events, StreamPrinter};
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

const API_KEY: &str = "sk-test-0123456789abcdef";

enum Behavior {
    Stream(Vec<&'static str>),
    Json(Value),
    Status(u16, &'static str),
    Image(Value),
    Hang,
}

#[derive(Default)]
struct FakeUpstream {
    behaviors: Mutex<VecDeque<Behavior>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<Value>>,
}

impl FakeUpstream {
    fn new(behaviors: Vec<Behavior>) -> Arc<Self> {
        Arc::new(Self {
            behaviors: Mutex::new(behaviors.into()),
            ..Default::default()
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_request(&self) -> Value {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }

    fn next(&self, request: Value) -> Behavior {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        self.behaviors
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected upstream call")
    }
}

fn status_error(status: u16, body: &str) -> PopchatError {
    PopchatError::ApiError {
        status,
        message: popchat::api::response::extract_error_message(body).unwrap_or_default(),
    }
}

#[async_trait]
impl Upstream for FakeUpstream {
    async fn create_response(
        &self,
        _api_key: &str,
        request: &ResponsesRequest,
    ) -> Result<UpstreamResponse> {
        match self.next(serde_json::to_value(request).unwrap()) {
            Behavior::Stream(chunks) => {
                let chunks: Vec<Result<Bytes>> =
                    chunks.into_iter().map(|c| Ok(Bytes::from(c))).collect();
                Ok(UpstreamResponse::Stream(Box::pin(futures::stream::iter(chunks))))
            }
            Behavior::Json(value) => Ok(UpstreamResponse::Complete(value)),
            Behavior::Status(status, body) => Err(status_error(status, body)),
            Behavior::Hang => std::future::pending().await,
            Behavior::Image(_) => panic!("image behavior for a chat call"),
        }
    }

    async fn generate_image(
        &self,
        _api_key: &str,
        request: &ImageRequest,
    ) -> Result<ImageResponse> {
        match self.next(serde_json::to_value(request).unwrap()) {
            Behavior::Image(value) => Ok(serde_json::from_value(value).unwrap()),
            Behavior::Status(status, body) => Err(status_error(status, body)),
            Behavior::Hang => std::future::pending().await,
            _ => panic!("chat behavior for an image call"),
        }
    }
}

fn store_with_key() -> Arc<MemoryStateStore> {
    let mut entries = Map::new();
    entries.insert(keys::API_KEY.to_string(), json!(API_KEY));
    Arc::new(MemoryStateStore::with_entries(entries))
}

fn orchestrator(store: &Arc<MemoryStateStore>, upstream: &Arc<FakeUpstream>) -> Arc<Orchestrator> {
    let store: Arc<dyn StateStore> = store.clone();
    let upstream: Arc<dyn Upstream> = upstream.clone();
    Arc::new(Orchestrator::new(store, upstream))
}

fn drain(events: &mut broadcast::Receiver<OutboundMessage>) -> Vec<OutboundMessage> {
    let mut collected = Vec::new();
    while let Ok(event) = events.try_recv() {
        collected.push(event);
    }
    collected
}

fn active_history(store: &MemoryStateStore) -> Vec<ChatMessage> {
    let state = session::load_state(store, None, false).unwrap();
    state.active_session().unwrap().history.clone()
}

fn stream_of(deltas: &[&str]) -> Vec<&'static str> {
    let mut chunks: Vec<String> = deltas
        .iter()
        .map(|delta| {
            format!(
                "event: response.output_text.delta\ndata: {}\n\n",
                json!({"type": "response.output_text.delta", "delta": delta})
            )
        })
        .collect();
    chunks.push(
        "data: {\"type\":\"response.completed\",\"response\":{}}\n\ndata: [DONE]\n\n".to_string(),
    );
    chunks
        .into_iter()
        .map(|chunk| &*Box::leak(chunk.into_boxed_str()))
        .collect()
}

fn single_chunk(deltas: &[&str]) -> Vec<&'static str> {
    let body = stream_of(deltas).concat();
    vec![&*Box::leak(body.into_boxed_str())]
}

async fn wait_for_calls(upstream: &FakeUpstream, calls: usize) {
    for _ in 0..1000 {
        if upstream.calls() >= calls {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("upstream was never called");
}

#[tokio::test]
async fn test_streamed_reply_is_relayed_and_persisted() {
    let store = store_with_key();
    let upstream = FakeUpstream::new(vec![Behavior::Stream(stream_of(&["Hi ", "there"]))]);
    let orchestrator = orchestrator(&store, &upstream);
    let mut events = orchestrator.subscribe();

    let outcome = orchestrator
        .handle_message(InboundMessage::user_input("Hello", vec![], None))
        .await
        .unwrap();

    match outcome {
        TurnOutcome::Reply { text, .. } => assert_eq!(text, "Hi there"),
        other => panic!("unexpected outcome: {:?}", other),
    }

    assert_eq!(
        drain(&mut events),
        vec![
            OutboundMessage::start(),
            OutboundMessage::delta("Hi "),
            OutboundMessage::delta("there"),
            OutboundMessage::done("Hi there"),
        ]
    );

    let request = upstream.last_request();
    assert_eq!(request["stream"], json!(true));
    assert_eq!(request["model"], json!("gpt-5.2"));
    assert_eq!(
        request["input"],
        json!([
            {"role": "system", "content": DEFAULT_SYSTEM_MESSAGE},
            {"role": "user", "content": "Hello"}
        ])
    );
    assert!(request.get("reasoning").is_none());
    assert!(request.get("tools").is_none());

    assert_eq!(
        active_history(&store),
        vec![ChatMessage::user("Hello"), ChatMessage::assistant("Hi there")]
    );
    let state = session::load_state(store.as_ref(), None, false).unwrap();
    assert_eq!(state.active_session().unwrap().title, "Hello");
    assert!(!orchestrator.is_request_active());
}

#[tokio::test]
async fn test_selection_is_sent_upstream() {
    let store = store_with_key();
    settings::save_selection(store.as_ref(), Some("gpt-5-mini"), Some("high"), Some(true)).unwrap();
    let upstream = FakeUpstream::new(vec![Behavior::Stream(stream_of(&["ok"]))]);
    let orchestrator = orchestrator(&store, &upstream);

    orchestrator
        .handle_message(InboundMessage::user_input("Search", vec![], None))
        .await
        .unwrap();

    let request = upstream.last_request();
    assert_eq!(request["model"], json!("gpt-5-mini"));
    assert_eq!(request["reasoning"], json!({"effort": "high"}));
    assert_eq!(request["tools"], json!([{"type": "web_search"}]));
}

#[tokio::test]
async fn test_custom_system_message_replaces_stored_system_turns() {
    let store = store_with_key();
    settings::save_system_message(store.as_ref(), "Be terse.").unwrap();
    let state = session::load_state(store.as_ref(), None, false).unwrap();
    let (sessions, active_id) = session::update_history(
        state.sessions,
        &state.active_id,
        vec![ChatMessage::user("Q1"), ChatMessage::assistant("A1")],
        None,
    )
    .unwrap();
    session::save_state(store.as_ref(), &sessions, &active_id).unwrap();

    let upstream = FakeUpstream::new(vec![Behavior::Stream(stream_of(&["A2"]))]);
    let orchestrator = orchestrator(&store, &upstream);
    orchestrator
        .handle_message(InboundMessage::user_input("Q2", vec![], None))
        .await
        .unwrap();

    let input = upstream.last_request()["input"].clone();
    assert_eq!(
        input,
        json!([
            {"role": "system", "content": "Be terse."},
            {"role": "user", "content": "Q1"},
            {"role": "assistant", "content": "A1"},
            {"role": "user", "content": "Q2"}
        ])
    );
    assert_eq!(active_history(&store).len(), 4);
}

#[tokio::test]
async fn test_non_streaming_json_fallback() {
    let store = store_with_key();
    let upstream = FakeUpstream::new(vec![Behavior::Json(json!({
        "output": [{"type": "message", "content": [{"type": "output_text", "text": "whole"}]}]
    }))]);
    let orchestrator = orchestrator(&store, &upstream);

    let outcome = orchestrator
        .handle_message(InboundMessage::user_input("Hi", vec![], None))
        .await
        .unwrap();

    assert!(matches!(outcome, TurnOutcome::Reply { ref text, .. } if text == "whole"));
}

#[tokio::test]
async fn test_empty_stream_is_an_error_and_commits_nothing() {
    let store = store_with_key();
    let upstream = FakeUpstream::new(vec![Behavior::Stream(vec!["data: [DONE]\n\n"])]);
    let orchestrator = orchestrator(&store, &upstream);
    let mut events = orchestrator.subscribe();

    let result = orchestrator
        .handle_message(InboundMessage::user_input("Hi", vec![], None))
        .await;

    assert!(matches!(result, Err(PopchatError::EmptyModelOutput)));
    assert!(matches!(
        drain(&mut events).last(),
        Some(OutboundMessage::Error { .. })
    ));
    assert!(active_history(&store).is_empty());
}

#[tokio::test]
async fn test_missing_api_key_fails_without_call() {
    let store = Arc::new(MemoryStateStore::new());
    let upstream = FakeUpstream::new(vec![]);
    let orchestrator = orchestrator(&store, &upstream);
    let mut events = orchestrator.subscribe();

    let result = orchestrator
        .handle_message(InboundMessage::user_input("Hello", vec![], None))
        .await;

    assert!(matches!(result, Err(PopchatError::MissingApiKey)));
    assert_eq!(upstream.calls(), 0);
    assert!(matches!(
        drain(&mut events).as_slice(),
        [OutboundMessage::Error { .. }]
    ));
}

#[tokio::test]
async fn test_fallback_api_key_is_used() {
    let store = Arc::new(MemoryStateStore::new());
    let upstream = FakeUpstream::new(vec![Behavior::Stream(stream_of(&["yes"]))]);
    let store_dyn: Arc<dyn StateStore> = store.clone();
    let upstream_dyn: Arc<dyn Upstream> = upstream.clone();
    let orchestrator = Orchestrator::new(store_dyn, upstream_dyn)
        .with_fallback_api_key(Some(API_KEY.to_string()));

    let result = orchestrator
        .handle_message(InboundMessage::user_input("Hello", vec![], None))
        .await;

    assert!(result.is_ok());
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn test_empty_input_is_rejected() {
    let store = store_with_key();
    let upstream = FakeUpstream::new(vec![]);
    let orchestrator = orchestrator(&store, &upstream);

    let result = orchestrator
        .handle_message(InboundMessage::user_input("   ", vec![], None))
        .await;

    assert!(matches!(result, Err(PopchatError::EmptyInput)));
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn test_regenerate_without_user_turn_makes_no_call() {
    let store = store_with_key();
    let upstream = FakeUpstream::new(vec![]);
    let orchestrator = orchestrator(&store, &upstream);

    let result = orchestrator
        .handle_message(InboundMessage::regenerate(None))
        .await;

    assert!(matches!(result, Err(PopchatError::NoPreviousUserMessage)));
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn test_regenerate_reposes_last_user_turn() {
    let store = store_with_key();
    let upstream = FakeUpstream::new(vec![
        Behavior::Stream(stream_of(&["first answer"])),
        Behavior::Stream(stream_of(&["second answer"])),
    ]);
    let orchestrator = orchestrator(&store, &upstream);

    orchestrator
        .handle_message(InboundMessage::user_input("Question", vec![], None))
        .await
        .unwrap();
    orchestrator
        .handle_message(InboundMessage::regenerate(None))
        .await
        .unwrap();

    let input = upstream.last_request()["input"].clone();
    assert_eq!(input.as_array().unwrap().len(), 2);
    assert_eq!(input[1], json!({"role": "user", "content": "Question"}));

    assert_eq!(
        active_history(&store),
        vec![
            ChatMessage::user("Question"),
            ChatMessage::assistant("second answer")
        ]
    );
}

#[tokio::test]
async fn test_image_model_rejects_attachments_before_any_call() {
    let store = store_with_key();
    settings::save_selection(store.as_ref(), Some("gpt-image-1.5"), None, None).unwrap();
    let upstream = FakeUpstream::new(vec![]);
    let orchestrator = orchestrator(&store, &upstream);

    let attachments = vec![
        Attachment::new("a.png", "image/png", "data:image/png;base64,AAAA".to_string()),
        Attachment::new("b.pdf", "application/pdf", "data:application/pdf;base64,AAAA".to_string()),
    ];
    let result = orchestrator
        .handle_message(InboundMessage::user_input("Draw", attachments, None))
        .await;

    assert!(matches!(
        result,
        Err(PopchatError::AttachmentsUnsupported { .. })
    ));
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test]
async fn test_attachments_are_sent_as_parts_and_stored_as_summary() {
    let store = store_with_key();
    let upstream = FakeUpstream::new(vec![Behavior::Stream(stream_of(&["A cat."]))]);
    let orchestrator = orchestrator(&store, &upstream);

    let attachments = vec![Attachment::new(
        "cat.png",
        "image/png",
        "data:image/png;base64,AAAA".to_string(),
    )];
    orchestrator
        .handle_message(InboundMessage::user_input("What is this?", attachments, None))
        .await
        .unwrap();

    let input = upstream.last_request()["input"].clone();
    assert_eq!(
        input[1]["content"],
        json!([
            {"type": "input_text", "text": "What is this?"},
            {"type": "input_image", "image_url": "data:image/png;base64,AAAA"}
        ])
    );
    assert_eq!(
        active_history(&store)[0],
        ChatMessage::user("What is this?\n\nAttachments: cat.png")
    );
}

#[tokio::test]
async fn test_image_generation_and_later_sanitization() {
    let store = store_with_key();
    let url = "https://oaidalleapiprodscus.blob.core.windows.net/private/img.png";
    let upstream = FakeUpstream::new(vec![
        Behavior::Image(json!({"data": [{"url": url}]})),
        Behavior::Stream(stream_of(&["Nice."])),
    ]);
    let orchestrator = orchestrator(&store, &upstream);
    let mut events = orchestrator.subscribe();

    settings::save_selection(store.as_ref(), Some("gpt-image-1.5"), None, None).unwrap();
    let outcome = orchestrator
        .handle_message(InboundMessage::user_input("A cat", vec![], None))
        .await
        .unwrap();
    assert!(matches!(outcome, TurnOutcome::Image { .. }));
    assert_eq!(
        upstream.last_request(),
        json!({"prompt": "A cat", "model": "gpt-image-1.5", "n": 1, "size": "1024x1024"})
    );
    assert_eq!(
        drain(&mut events),
        vec![OutboundMessage::ImageUrl {
            image_url: url.to_string()
        }]
    );

    settings::save_selection(store.as_ref(), Some("gpt-5.2"), None, None).unwrap();
    orchestrator
        .handle_message(InboundMessage::user_input("Describe it", vec![], None))
        .await
        .unwrap();

    let input = upstream.last_request()["input"].clone();
    assert_eq!(input[2], json!({"role": "assistant", "content": IMAGE_PLACEHOLDER}));

    let history = active_history(&store);
    assert_eq!(history[1], ChatMessage::assistant(url));
}

#[tokio::test]
async fn test_empty_image_output_is_an_error() {
    let store = store_with_key();
    settings::save_selection(store.as_ref(), Some("gpt-image-1-mini"), None, None).unwrap();
    let upstream = FakeUpstream::new(vec![Behavior::Image(json!({"data": []}))]);
    let orchestrator = orchestrator(&store, &upstream);

    let result = orchestrator
        .handle_message(InboundMessage::user_input("A dog", vec![], None))
        .await;

    assert!(matches!(result, Err(PopchatError::EmptyImageOutput)));
}

#[tokio::test]
async fn test_unauthorized_maps_to_invalid_key_message() {
    let store = store_with_key();
    let upstream = FakeUpstream::new(vec![Behavior::Status(
        401,
        r#"{"error": {"message": "Incorrect API key provided"}}"#,
    )]);
    let orchestrator = orchestrator(&store, &upstream);
    let mut events = orchestrator.subscribe();

    let result = orchestrator
        .handle_message(InboundMessage::user_input("Hello", vec![], None))
        .await;

    assert!(matches!(result, Err(PopchatError::ApiError { status: 401, .. })));
    assert_eq!(
        drain(&mut events).last(),
        Some(&OutboundMessage::Error {
            error: INVALID_API_KEY_MESSAGE.to_string()
        })
    );
    assert!(active_history(&store).is_empty());
}

#[tokio::test]
async fn test_server_error_relays_upstream_message() {
    let store = store_with_key();
    let upstream = FakeUpstream::new(vec![Behavior::Status(500, "")]);
    let orchestrator = orchestrator(&store, &upstream);
    let mut events = orchestrator.subscribe();

    let _ = orchestrator
        .handle_message(InboundMessage::user_input("Hello", vec![], None))
        .await;

    assert_eq!(
        drain(&mut events).last(),
        Some(&OutboundMessage::Error {
            error: "Failed to fetch. Status code: 500".to_string()
        })
    );
}

#[tokio::test]
async fn test_timeout_is_reported() {
    let store = store_with_key();
    let upstream = FakeUpstream::new(vec![Behavior::Hang]);
    let store_dyn: Arc<dyn StateStore> = store.clone();
    let upstream_dyn: Arc<dyn Upstream> = upstream.clone();
    let orchestrator = Orchestrator::new(store_dyn, upstream_dyn)
        .with_request_timeout(Duration::from_millis(50));
    let mut events = orchestrator.subscribe();

    let result = orchestrator
        .handle_message(InboundMessage::user_input("Hello", vec![], None))
        .await;

    assert!(matches!(result, Err(PopchatError::Timeout)));
    assert_eq!(
        drain(&mut events).last(),
        Some(&OutboundMessage::Error {
            error: TIMEOUT_MESSAGE.to_string()
        })
    );
    assert!(active_history(&store).is_empty());
}

#[tokio::test]
async fn test_stop_cancels_in_flight_request() {
    let store = store_with_key();
    let upstream = FakeUpstream::new(vec![Behavior::Hang]);
    let orchestrator = orchestrator(&store, &upstream);
    let mut events = orchestrator.subscribe();

    let running = Arc::clone(&orchestrator);
    let handle = tokio::spawn(async move {
        running
            .handle_message(InboundMessage::user_input("Hello", vec![], None))
            .await
    });
    wait_for_calls(&upstream, 1).await;

    let stopped = orchestrator
        .handle_message(InboundMessage::stop())
        .await
        .unwrap();
    assert_eq!(stopped, TurnOutcome::Stopped { was_active: true });

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(PopchatError::Canceled)));
    assert_eq!(drain(&mut events).last(), Some(&OutboundMessage::done("")));
    assert!(active_history(&store).is_empty());
    assert!(!orchestrator.is_request_active());
}

#[tokio::test]
async fn test_stop_without_active_request() {
    let store = store_with_key();
    let upstream = FakeUpstream::new(vec![]);
    let orchestrator = orchestrator(&store, &upstream);

    let stopped = orchestrator
        .handle_message(InboundMessage::stop())
        .await
        .unwrap();
    assert_eq!(stopped, TurnOutcome::Stopped { was_active: false });
}

#[tokio::test]
async fn test_new_request_preempts_in_flight_one() {
    let store = store_with_key();
    let upstream = FakeUpstream::new(vec![
        Behavior::Hang,
        Behavior::Stream(stream_of(&["winner"])),
    ]);
    let orchestrator = orchestrator(&store, &upstream);
    let mut events = orchestrator.subscribe();

    let running = Arc::clone(&orchestrator);
    let first = tokio::spawn(async move {
        running
            .handle_message(InboundMessage::user_input("first", vec![], None))
            .await
    });
    wait_for_calls(&upstream, 1).await;

    let second = orchestrator
        .handle_message(InboundMessage::user_input("second", vec![], None))
        .await
        .unwrap();
    assert!(matches!(second, TurnOutcome::Reply { ref text, .. } if text == "winner"));

    let first = first.await.unwrap();
    assert!(matches!(first, Err(PopchatError::Canceled)));

    let events = drain(&mut events);
    assert!(!events.contains(&OutboundMessage::done("")));
    assert_eq!(events.last(), Some(&OutboundMessage::done("winner")));
    assert_eq!(events.iter().filter(|event| event.is_terminal()).count(), 1);

    assert_eq!(
        active_history(&store),
        vec![ChatMessage::user("second"), ChatMessage::assistant("winner")]
    );
}

#[tokio::test]
async fn test_chat_id_selects_and_creates_session() {
    let store = store_with_key();
    let upstream = FakeUpstream::new(vec![Behavior::Stream(stream_of(&["hey"]))]);
    let orchestrator = orchestrator(&store, &upstream);

    let outcome = orchestrator
        .handle_message(InboundMessage::user_input(
            "In a new chat",
            vec![],
            Some("client-chat-1".to_string()),
        ))
        .await
        .unwrap();

    match outcome {
        TurnOutcome::Reply { chat_id, .. } => assert_eq!(chat_id, "client-chat-1"),
        other => panic!("unexpected outcome: {:?}", other),
    }
    let state = session::load_state(store.as_ref(), None, false).unwrap();
    assert_eq!(state.active_id, "client-chat-1");
    assert_eq!(state.active_session().unwrap().history.len(), 2);
}

#[tokio::test]
async fn test_lagging_listener_still_prints_full_reply() {
    let words: Vec<String> = (0..400).map(|i| format!("w{} ", i)).collect();
    let deltas: Vec<&str> = words.iter().map(String::as_str).collect();
    let expected = words.concat();

    let store = store_with_key();
    let upstream = FakeUpstream::new(vec![Behavior::Stream(single_chunk(&deltas))]);
    let orchestrator = orchestrator(&store, &upstream);
    let mut events = orchestrator.subscribe();

    let outcome = orchestrator
        .handle_message(InboundMessage::user_input("Count", vec![], None))
        .await
        .unwrap();
    assert!(matches!(outcome, TurnOutcome::Reply { ref text, .. } if *text == expected));

    let mut printer = StreamPrinter::new(Vec::new());
    print_events(&mut events, &mut printer, false).await.unwrap();
    let printed = String::from_utf8(printer.into_inner()).unwrap();

    assert_eq!(printed, format!("{}\n", expected));
    assert_eq!(active_history(&store)[1], ChatMessage::assistant(expected.as_str()));
}

#[tokio::test]
async fn test_regenerate_keeps_literal_attachments_text_in_prompt() {
    let store = store_with_key();
    settings::save_selection(store.as_ref(), Some("gpt-image-1.5"), None, None).unwrap();
    let url = "https://files.oaiusercontent.com/img.png";
    let upstream = FakeUpstream::new(vec![
        Behavior::Image(json!({"data": [{"url": url}]})),
        Behavior::Image(json!({"data": [{"url": url}]})),
    ]);
    let orchestrator = orchestrator(&store, &upstream);

    let prompt = "Attachments: none needed";
    orchestrator
        .handle_message(InboundMessage::user_input(prompt, vec![], None))
        .await
        .unwrap();
    orchestrator
        .handle_message(InboundMessage::regenerate(None))
        .await
        .unwrap();

    assert_eq!(upstream.last_request()["prompt"], json!(prompt));
}

#[tokio::test]
async fn test_localizer_shapes_stored_summary() {
    let store = store_with_key();
    let upstream = FakeUpstream::new(vec![Behavior::Stream(stream_of(&["Eine Katze."]))]);
    let store_dyn: Arc<dyn StateStore> = store.clone();
    let upstream_dyn: Arc<dyn Upstream> = upstream.clone();
    let orchestrator =
        Orchestrator::new(store_dyn, upstream_dyn).with_localizer(Arc::new(GermanLocalizer));

    let attachments = vec![Attachment::new(
        "cat.png",
        "image/png",
        "data:image/png;base64,AAAA".to_string(),
    )];
    orchestrator
        .handle_message(InboundMessage::user_input("Was ist das?", attachments, None))
        .await
        .unwrap();

    assert_eq!(
        active_history(&store)[0],
        ChatMessage::user("Was ist das?\n\nAnhänge: cat.png")
    );
}
