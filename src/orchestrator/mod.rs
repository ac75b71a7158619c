//! Turns inbound intents into upstream calls and commits the results.
//!
//! Every user-input or regenerate message goes through
//! Building → InFlight → {Completed | Canceled | Failed}. At most one request
//! is in flight; a new one cancels its predecessor. Events for listeners are
//! published on a broadcast channel: zero or more deltas followed by exactly
//! one terminal event. A superseded request is the exception; it stops
//! without a terminal event so listeners only see the newer request finish.

mod coordinator;
pub mod history;

pub use coordinator::{RequestContext, RequestCoordinator};

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::Duration;

use crate::api::response::{extract_image_url, extract_output_text};
use crate::api::{read_response_stream, ImageRequest, ResponsesRequest, Upstream, UpstreamResponse};
use crate::error::{PopchatError, Result};
use crate::i18n::{FallbackLocalizer, Localizer};
use crate::models::{
    validate_attachments, Attachment, ChatMessage, InboundMessage, OutboundMessage, Reasoning,
    Tool,
};
use crate::session::{self, StateStore};
use crate::settings::{self, Selection};
use crate::ui::output;
use history::TurnHistory;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const EVENT_CAPACITY: usize = 256;

/// What a handled message produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Reply { chat_id: String, text: String },
    Image { chat_id: String, url: String },
    /// A stop request; `was_active` tells whether anything was in flight.
    Stopped { was_active: bool },
}

enum Intent {
    UserInput {
        text: String,
        attachments: Vec<Attachment>,
        chat_id: Option<String>,
    },
    Regenerate {
        chat_id: Option<String>,
    },
}

enum Reply {
    Text(String),
    Image(String),
}

struct PreparedTurn {
    api_key: String,
    selection: Selection,
    chat_id: String,
    history: TurnHistory,
    title_hint: Option<String>,
}

pub struct Orchestrator {
    store: Arc<dyn StateStore>,
    upstream: Arc<dyn Upstream>,
    localizer: Arc<dyn Localizer>,
    coordinator: RequestCoordinator,
    events: broadcast::Sender<OutboundMessage>,
    request_timeout: Duration,
    fallback_api_key: Option<String>,
    verbose: bool,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn StateStore>, upstream: Arc<dyn Upstream>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            upstream,
            localizer: Arc::new(FallbackLocalizer),
            coordinator: RequestCoordinator::new(),
            events,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            fallback_api_key: None,
            verbose: false,
        }
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Key used when the store holds none.
    pub fn with_fallback_api_key(mut self, api_key: Option<String>) -> Self {
        self.fallback_api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        self
    }

    pub fn with_localizer(mut self, localizer: Arc<dyn Localizer>) -> Self {
        self.localizer = localizer;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutboundMessage> {
        self.events.subscribe()
    }

    pub fn is_request_active(&self) -> bool {
        self.coordinator.is_active()
    }

    fn emit(&self, message: OutboundMessage) {
        // No listener is not an error.
        let _ = self.events.send(message);
    }

    fn debug(&self, message: &str) {
        if self.verbose {
            output::debug(message);
        }
    }

    /// Handles one inbound message.
    ///
    /// A canceled turn returns `Err(PopchatError::Canceled)` after emitting an
    /// empty `done`; a turn preempted by a newer one emits nothing further.
    /// Other failures are relayed as an `error` event and returned.
    pub async fn handle_message(&self, message: InboundMessage) -> Result<TurnOutcome> {
        let intent = match message {
            InboundMessage::StopResponse { .. } => {
                let was_active = self.coordinator.cancel();
                self.debug(&format!("stop requested (active: {})", was_active));
                return Ok(TurnOutcome::Stopped { was_active });
            }
            InboundMessage::Regenerate { chat_id, .. } => Intent::Regenerate { chat_id },
            InboundMessage::UserInput {
                user_input,
                attachments,
                chat_id,
            } => Intent::UserInput {
                text: user_input,
                attachments,
                chat_id,
            },
        };

        let context = self.coordinator.start();
        self.debug(&format!("request {} started", context.id()));
        let result = self.run_turn(&context, intent).await;
        self.coordinator.finish(&context);

        match result {
            Ok(outcome) => Ok(outcome),
            Err(PopchatError::Canceled) => {
                if context.is_superseded() {
                    self.debug(&format!("request {} superseded", context.id()));
                } else {
                    self.debug(&format!("request {} canceled", context.id()));
                    self.emit(OutboundMessage::done(""));
                }
                Err(PopchatError::Canceled)
            }
            Err(e) => {
                self.debug(&format!("request {} failed: {}", context.id(), e));
                self.emit(OutboundMessage::Error {
                    error: e.user_message(),
                });
                Err(e)
            }
        }
    }

    async fn run_turn(&self, context: &RequestContext, intent: Intent) -> Result<TurnOutcome> {
        let turn = self.prepare(intent)?;
        self.debug(&format!(
            "model={} thinking={} web_search={} chat={}",
            turn.selection.model_id,
            turn.selection.thinking_level,
            turn.selection.web_search_active(),
            turn.chat_id
        ));

        let call = async {
            if turn.selection.is_image_model() {
                self.generate_image(&turn).await
            } else {
                self.emit(OutboundMessage::start());
                self.create_response(&turn).await
            }
        };

        let reply = tokio::select! {
            biased;
            _ = context.token().cancelled() => return Err(PopchatError::Canceled),
            result = tokio::time::timeout(self.request_timeout, call) => match result {
                Ok(reply) => reply?,
                Err(_) => return Err(PopchatError::Timeout),
            },
        };

        // A stop that lands after the last byte still wins.
        if context.is_canceled() {
            return Err(PopchatError::Canceled);
        }

        self.commit(&turn, &reply)?;
        Ok(match reply {
            Reply::Text(text) => {
                self.emit(OutboundMessage::done(text.clone()));
                TurnOutcome::Reply {
                    chat_id: turn.chat_id,
                    text,
                }
            }
            Reply::Image(url) => {
                self.emit(OutboundMessage::ImageUrl {
                    image_url: url.clone(),
                });
                TurnOutcome::Image {
                    chat_id: turn.chat_id,
                    url,
                }
            }
        })
    }

    fn api_key(&self) -> Result<String> {
        settings::load_api_key(self.store.as_ref())?
            .or_else(|| self.fallback_api_key.clone())
            .ok_or(PopchatError::MissingApiKey)
    }

    fn prepare(&self, intent: Intent) -> Result<PreparedTurn> {
        let store = self.store.as_ref();

        if let Intent::UserInput {
            text, attachments, ..
        } = &intent
        {
            if text.trim().is_empty() && attachments.is_empty() {
                return Err(PopchatError::EmptyInput);
            }
        }

        let api_key = self.api_key()?;
        let selection = settings::load_selection(store)?;

        if let Intent::UserInput { attachments, .. } = &intent {
            if !attachments.is_empty() && selection.is_image_model() {
                return Err(PopchatError::AttachmentsUnsupported {
                    model: selection.model_id.clone(),
                });
            }
            validate_attachments(attachments)?;
        }

        let system_message = settings::load_system_message(store)?;

        match intent {
            Intent::UserInput {
                text,
                attachments,
                chat_id,
            } => {
                let state = session::load_state(store, chat_id.as_deref(), true)?;
                let stored = active_history(&state);
                let history = history::for_user_input(
                    self.localizer.as_ref(),
                    &system_message,
                    &stored,
                    &text,
                    &attachments,
                );
                Ok(PreparedTurn {
                    api_key,
                    selection,
                    chat_id: state.active_id,
                    history,
                    title_hint: Some(text),
                })
            }
            Intent::Regenerate { chat_id } => {
                let state = session::load_state(store, chat_id.as_deref(), false)?;
                let stored = active_history(&state);
                let history =
                    history::for_regenerate(self.localizer.as_ref(), &system_message, &stored)?;
                Ok(PreparedTurn {
                    api_key,
                    selection,
                    chat_id: state.active_id,
                    history,
                    title_hint: None,
                })
            }
        }
    }

    async fn generate_image(&self, turn: &PreparedTurn) -> Result<Reply> {
        let request = ImageRequest::new(
            turn.history.prompt.clone(),
            turn.selection.model_id.clone(),
        );
        self.debug("requesting image generation");
        let response = self.upstream.generate_image(&turn.api_key, &request).await?;
        extract_image_url(&response)
            .map(Reply::Image)
            .ok_or(PopchatError::EmptyImageOutput)
    }

    async fn create_response(&self, turn: &PreparedTurn) -> Result<Reply> {
        let request = ResponsesRequest {
            input: history::sanitize_image_turns(turn.history.request.clone()),
            model: turn.selection.model_id.clone(),
            stream: true,
            reasoning: turn.selection.effort().map(Reasoning::with_effort),
            tools: turn
                .selection
                .web_search_active()
                .then(|| vec![Tool::web_search()]),
        };

        self.debug("requesting response stream");
        let text = match self.upstream.create_response(&turn.api_key, &request).await? {
            UpstreamResponse::Stream(stream) => {
                read_response_stream(stream, self.verbose, |delta| {
                    self.emit(OutboundMessage::delta(delta));
                })
                .await?
            }
            UpstreamResponse::Complete(response) => {
                self.debug("upstream answered without streaming");
                extract_output_text(&response)
                    .filter(|text| !text.trim().is_empty())
                    .ok_or(PopchatError::EmptyModelOutput)?
            }
        };
        Ok(Reply::Text(text))
    }

    /// Re-reads the session state and appends the reply to the turn's session.
    fn commit(&self, turn: &PreparedTurn, reply: &Reply) -> Result<()> {
        let store = self.store.as_ref();
        let state = session::load_state(store, Some(&turn.chat_id), true)?;

        let mut new_history = turn.history.persisted.clone();
        new_history.push(ChatMessage::assistant(match reply {
            Reply::Text(text) => text.as_str(),
            Reply::Image(url) => url.as_str(),
        }));

        let (sessions, active_id) = session::update_history(
            state.sessions,
            &turn.chat_id,
            new_history,
            turn.title_hint.as_deref(),
        )?;
        session::save_state(store, &sessions, &active_id)?;
        self.debug(&format!("saved chat {}", active_id));
        Ok(())
    }
}

fn active_history(state: &session::NormalizedState) -> Vec<ChatMessage> {
    state
        .active_session()
        .map(|session| session.history.clone())
        .unwrap_or_default()
}
