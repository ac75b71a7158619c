use clap::Parser;
use colored::*;
use std::io;
use std::path::Path;
use std::process;
use std::sync::Arc;

use popchat::api::OpenAiClient;
use popchat::catalog;
use popchat::cli::Args;
use popchat::config::Config;
use popchat::error::Result;
use popchat::i18n::Localizer;
use popchat::models::{Attachment, InboundMessage};
use popchat::orchestrator::{Orchestrator, TurnOutcome};
use popchat::session::{self, FilesystemStateStore, StateStore};
use popchat::settings;
use popchat::ui::output;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if args.config_init {
        match Config::init_example() {
            Ok(path) => {
                output::success(&format!("Wrote example config to {}", path.display()));
                return;
            }
            Err(e) => {
                output::error(&format!("{:#}", e));
                process::exit(1);
            }
        }
    }

    let config = match Config::from_env_and_args(&args) {
        Ok(config) => config,
        Err(e) => {
            output::error(&format!("{:#}", e));
            process::exit(1);
        }
    };

    if config.verbose {
        output::debug(&format!("data dir: {}", config.data_dir.display()));
        output::debug(&format!("api: {}", config.api_base_url));
    }

    let store: Arc<dyn StateStore> = match FilesystemStateStore::new(&config.data_dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            output::error(&e.to_string());
            process::exit(1);
        }
    };

    match run(&args, &config, store).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            output::error(&e.user_message());
            process::exit(1);
        }
    }
}

/// Applies settings and chat management flags, then sends the message if any.
async fn run(args: &Args, config: &Config, store: Arc<dyn StateStore>) -> Result<i32> {
    let store_ref = store.as_ref();
    let mut handled = apply_settings(args, store_ref)?;
    let accent_color = settings::load_accent_color(store_ref)?;
    let localizer = settings::load_localizer(store_ref, &ui_language())?;

    let mut chat_id = args.chat_id.clone();
    if args.new_chat {
        let id = session::new_session_id();
        session::load_state(store_ref, Some(&id), true)?;
        if config.verbose {
            output::debug(&format!("new chat {}", id));
        }
        chat_id = Some(id);
        handled = true;
    }

    handled |= manage_sessions(args, store_ref, localizer.as_ref(), &accent_color)?;

    if args.list_models {
        let selection = settings::load_selection(store_ref)?;
        output::print_models(localizer.as_ref(), &selection, &accent_color);
        handled = true;
    }

    let text = args.message_text();
    if !args.regenerate && text.trim().is_empty() && args.attachments.is_empty() {
        if !handled {
            eprintln!("{}", "Usage: popchat [OPTIONS] <MESSAGE>...".yellow());
            eprintln!("{}", "Try 'popchat --help' for more information.".dimmed());
            return Ok(1);
        }
        return Ok(0);
    }

    let message = if args.regenerate {
        InboundMessage::regenerate(chat_id)
    } else {
        let attachments = args
            .attachments
            .iter()
            .map(|path| Attachment::from_file(Path::new(path)))
            .collect::<Result<Vec<_>>>()?;
        InboundMessage::user_input(text, attachments, chat_id)
    };

    send(config, store, localizer, message).await
}

fn ui_language() -> String {
    std::env::var("LANG").unwrap_or_default()
}

fn apply_settings(args: &Args, store: &dyn StateStore) -> Result<bool> {
    let mut handled = false;

    if let Some(api_key) = &args.set_api_key {
        settings::save_api_key(store, api_key)?;
        output::success("API key saved.");
        handled = true;
    }
    if args.remove_api_key {
        settings::remove_api_key(store)?;
        output::success("API key removed.");
        handled = true;
    }

    if args.reset_system_message {
        settings::save_system_message(store, "")?;
        output::success("System message reset to the default.");
        handled = true;
    } else if let Some(system_message) = &args.system_message {
        settings::save_system_message(store, system_message)?;
        output::success("System message saved.");
        handled = true;
    }

    if let Some(accent_color) = &args.accent_color {
        let saved = settings::save_accent_color(store, accent_color)?;
        output::success(&format!("Accent color: {}", saved));
        handled = true;
    }

    if let Some(language) = &args.language {
        let saved = settings::save_language_preference(store, language)?;
        let resolved = catalog::resolve_language_preference(Some(&saved), &ui_language());
        output::success(&format!("Language: {} ({})", saved, resolved));
        handled = true;
    }

    let web_search = args.web_search_override();
    if args.model.is_some() || args.thinking.is_some() || web_search.is_some() {
        let selection = settings::save_selection(
            store,
            args.model.as_deref(),
            args.thinking.as_deref(),
            web_search,
        )?;
        if let Some(requested) = &args.model {
            if requested.trim() != selection.model_id {
                eprintln!(
                    "{}",
                    format!("Unknown model '{}', using {}", requested, selection.model_id).yellow()
                );
            }
        }
        let localizer = settings::load_localizer(store, &ui_language())?;
        output::success(&format!(
            "Model: {}  Thinking: {}  Web search: {}",
            selection.model_id,
            catalog::thinking_label(
                localizer.as_ref(),
                &selection.thinking_level,
                &selection.model_id
            ),
            if selection.web_search_active() { "on" } else { "off" }
        ));
        handled = true;
    }

    Ok(handled)
}

fn manage_sessions(
    args: &Args,
    store: &dyn StateStore,
    localizer: &dyn Localizer,
    accent_color: &str,
) -> Result<bool> {
    let mut handled = false;

    if let Some(id) = &args.delete_chat {
        let state = session::load_state(store, None, false)?;
        let (sessions, active_id) = session::delete_session(state.sessions, &state.active_id, id)?;
        session::save_state(store, &sessions, &active_id)?;
        output::success(&format!("Deleted chat {}", id));
        handled = true;
    }

    for (id, pinned) in [(&args.pin_chat, true), (&args.unpin_chat, false)] {
        if let Some(id) = id {
            let state = session::load_state(store, None, false)?;
            let sessions = session::set_pinned(state.sessions, id, pinned)?;
            session::save_state(store, &sessions, &state.active_id)?;
            output::success(&format!(
                "{} chat {}",
                if pinned { "Pinned" } else { "Unpinned" },
                id
            ));
            handled = true;
        }
    }

    if let Some([id, title]) = args.rename_chat.as_deref() {
        let state = session::load_state(store, None, false)?;
        let sessions = session::rename_session(state.sessions, id, title)?;
        session::save_state(store, &sessions, &state.active_id)?;
        output::success(&format!("Renamed chat {}", id));
        handled = true;
    }

    if args.clear_history {
        let state = session::load_state(store, args.chat_id.as_deref(), false)?;
        let sessions = session::clear_history(state.sessions, &state.active_id)?;
        session::save_state(store, &sessions, &state.active_id)?;
        output::success("Chat history cleared.");
        handled = true;
    }

    if args.list_chats {
        let state = session::load_state(store, None, false)?;
        output::print_sessions(&state.sessions, &state.active_id, accent_color);
        handled = true;
    }

    if args.show_history {
        let state = session::load_state(store, args.chat_id.as_deref(), false)?;
        if let Some(active) = state.active_session() {
            output::print_history(localizer, active, accent_color);
        }
        handled = true;
    }

    Ok(handled)
}

async fn send(
    config: &Config,
    store: Arc<dyn StateStore>,
    localizer: Arc<dyn Localizer>,
    message: InboundMessage,
) -> Result<i32> {
    let upstream = Arc::new(OpenAiClient::new(config.api_base_url.clone())?);
    let orchestrator = Arc::new(
        Orchestrator::new(store, upstream)
            .with_request_timeout(config.request_timeout)
            .with_fallback_api_key(config.fallback_api_key.clone())
            .with_localizer(localizer)
            .with_verbose(config.verbose),
    );

    let mut events = orchestrator.subscribe();
    let verbose = config.verbose;
    let printer = tokio::spawn(async move {
        let mut printer = output::StreamPrinter::new(io::stdout());
        let _ = output::print_events(&mut events, &mut printer, verbose).await;
    });

    let stopper = Arc::clone(&orchestrator);
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = stopper.handle_message(InboundMessage::stop()).await;
        }
    });

    let result = orchestrator.handle_message(message).await;
    let _ = printer.await;
    ctrl_c.abort();

    match result {
        Ok(TurnOutcome::Reply { chat_id, .. }) | Ok(TurnOutcome::Image { chat_id, .. }) => {
            if config.verbose {
                output::debug(&format!("chat {}", chat_id));
            }
            Ok(0)
        }
        Ok(TurnOutcome::Stopped { .. }) => Ok(0),
        Err(e) if e.is_canceled() => {
            eprintln!("{}", "Stopped.".dimmed());
            Ok(130)
        }
        // Already reported through the event stream.
        Err(_) => Ok(1),
    }
}
