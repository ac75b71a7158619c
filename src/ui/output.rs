use colored::*;
use std::io::{self, Write};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::catalog::{self, MODELS};
use crate::i18n::Localizer;
use crate::models::{ChatMessage, ChatSession, OutboundMessage, Role, StreamPayload};
use crate::session::preview;
use crate::settings::Selection;

/// Verbose diagnostics on stderr.
pub fn debug(message: &str) {
    eprintln!("{}", format!("[popchat] {}", message).dimmed());
}

pub fn error(message: &str) {
    eprintln!("{}", format!("Error: {}", message).red());
}

pub fn success(message: &str) {
    println!("{}", message.green());
}

fn parse_hex(accent_color: &str) -> Option<(u8, u8, u8)> {
    let hex = accent_color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Paints `text` in the configured accent color.
pub fn accent(text: &str, accent_color: &str) -> ColoredString {
    match parse_hex(accent_color) {
        Some((r, g, b)) => text.truecolor(r, g, b),
        None => text.cyan(),
    }
}

/// Writes one request's event stream to a terminal.
///
/// Deltas are printed as they arrive. Once the receiver lagged, deltas are no
/// longer printed and the missing tail is taken from the final `done` text.
pub struct StreamPrinter<W: Write> {
    out: W,
    printed: String,
    lagged: bool,
}

impl<W: Write> StreamPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            printed: String::new(),
            lagged: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Records that the receiver skipped events.
    pub fn mark_lagged(&mut self, skipped: u64) {
        if skipped > 0 {
            self.lagged = true;
        }
    }

    /// Prints one event. Returns true once the request's event stream is over.
    pub fn render(&mut self, message: &OutboundMessage) -> io::Result<bool> {
        match message {
            OutboundMessage::Stream { stream } => match stream {
                StreamPayload::Start => {
                    self.printed.clear();
                    self.lagged = false;
                }
                StreamPayload::Delta { delta } => {
                    if !self.lagged {
                        write!(self.out, "{}", delta)?;
                        self.out.flush()?;
                        self.printed.push_str(delta);
                    }
                }
                StreamPayload::Done { text } => {
                    // An empty text closes a stopped turn.
                    match text.strip_prefix(self.printed.as_str()) {
                        Some(rest) => write!(self.out, "{}", rest)?,
                        None if text.is_empty() => {}
                        None => write!(self.out, "\n{}", text)?,
                    }
                    writeln!(self.out)?;
                    self.out.flush()?;
                }
            },
            OutboundMessage::Error { error: text } => error(text),
            OutboundMessage::ImageUrl { image_url } => {
                if image_url.starts_with("data:") {
                    writeln!(self.out, "{}", "[image returned inline as a data URL]".cyan())?;
                } else {
                    writeln!(self.out, "{}", image_url.cyan().underline())?;
                }
            }
        }
        Ok(message.is_terminal())
    }
}

/// Prints events until the current request's stream ends or the channel closes.
pub async fn print_events<W: Write>(
    events: &mut broadcast::Receiver<OutboundMessage>,
    printer: &mut StreamPrinter<W>,
    verbose: bool,
) -> io::Result<()> {
    loop {
        match events.recv().await {
            Ok(event) => {
                if printer.render(&event)? {
                    return Ok(());
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                if verbose {
                    debug(&format!("printer lagged by {} events", skipped));
                }
                printer.mark_lagged(skipped);
            }
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}

pub fn print_sessions(sessions: &[ChatSession], active_id: &str, accent_color: &str) {
    for session in sessions {
        let marker = if session.id == active_id { "*" } else { " " };
        let pin = if session.pinned { "📌" } else { "  " };
        let title = if session.has_title() {
            session.title.clone()
        } else {
            "(untitled)".to_string()
        };
        let line = format!("{} {} {}", marker, pin, title);
        let line = if session.id == active_id {
            accent(&line, accent_color).bold()
        } else {
            line.normal()
        };
        println!("{}", line);
        println!(
            "{}",
            format!(
                "      {}  {} messages  updated {}",
                session.id,
                session.history.len(),
                session.updated_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
            )
            .dimmed()
        );
    }
}

fn print_user_turn(localizer: &dyn Localizer, content: &str, accent_color: &str) {
    println!("{}", accent("You:", accent_color).bold());
    match preview::parse_stored_user_preview(localizer, content) {
        Some(user_preview) => {
            if !user_preview.text.is_empty() {
                println!("{}", user_preview.text);
            }
            let labels: Vec<String> = user_preview
                .attachments
                .iter()
                .map(|item| format!("[{}] {}", item.summary_label, item.file_name))
                .collect();
            println!("{}", labels.join("  ").dimmed());
        }
        None => println!("{}", content),
    }
}

pub fn print_history(localizer: &dyn Localizer, session: &ChatSession, accent_color: &str) {
    let title = if session.has_title() {
        session.title.as_str()
    } else {
        "(untitled)"
    };
    println!("{}", title.bold());
    println!("{}", "-".repeat(40).dimmed());

    if session.history.is_empty() {
        println!("{}", "No messages yet.".dimmed());
        return;
    }

    for message in &session.history {
        let content = message_text(message);
        match message.role {
            Role::User => print_user_turn(localizer, &content, accent_color),
            Role::Assistant => {
                println!("{}", "Assistant:".bold());
                println!("{}", content);
            }
            Role::System => continue,
        }
        println!();
    }
}

fn message_text(message: &ChatMessage) -> String {
    message.text().unwrap_or_default().to_string()
}

pub fn print_models(localizer: &dyn Localizer, selection: &Selection, accent_color: &str) {
    for model in MODELS {
        let selected = model.id == selection.model_id;
        let marker = if selected { "*" } else { " " };
        let line = format!(
            "{} {:<18} {:<18} {}",
            marker,
            model.id,
            model.label,
            model.kind.as_str()
        );
        if selected {
            println!("{}", accent(&line, accent_color).bold());
        } else {
            println!("{}", line);
        }

        if model.supports_thinking {
            let levels: Vec<&str> = catalog::thinking_levels_for_model(model.id)
                .iter()
                .map(|level| level.id)
                .collect();
            println!("{}", format!("    thinking: {}", levels.join(", ")).dimmed());
        }
    }

    println!();
    println!(
        "Thinking: {}",
        catalog::thinking_label(localizer, &selection.thinking_level, &selection.model_id)
    );
    let web_search = if !catalog::supports_web_search(&selection.model_id) {
        "unsupported"
    } else if selection.web_search_enabled {
        "on"
    } else {
        "off"
    };
    println!("Web search: {}", web_search);
}
