use colored::*;
use futures::StreamExt;
use std::env;

use popchat::api::{OpenAiClient, ResponsesRequest, SseDecoder, Upstream, UpstreamResponse};
use popchat::catalog::DEFAULT_MODEL_ID;
use popchat::config::{normalize_base_url, DEFAULT_API_BASE_URL};
use popchat::models::{ChatMessage, Reasoning};

fn rule() {
    println!("{}", "=".repeat(72).dimmed());
}

/// Dumps the raw bytes of one Responses API stream alongside the decoded events.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut positional = Vec::new();
    let mut effort = None;
    let mut rest = env::args().skip(1);
    while let Some(arg) = rest.next() {
        if arg == "--effort" {
            effort = rest.next();
        } else {
            positional.push(arg);
        }
    }

    let Some(prompt) = positional.first().cloned() else {
        eprintln!("usage: check-raw <prompt> [--effort <level>]");
        std::process::exit(2);
    };

    let Ok(api_key) = env::var("OPENAI_API_KEY") else {
        eprintln!("{}", "OPENAI_API_KEY is not set".red());
        std::process::exit(2);
    };

    let model = env::var("POPCHAT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL_ID.to_string());
    let base_url = match env::var("POPCHAT_API_ENDPOINT") {
        Ok(endpoint) => normalize_base_url(&endpoint),
        Err(_) => DEFAULT_API_BASE_URL.to_string(),
    };

    let request = ResponsesRequest {
        input: vec![ChatMessage::user(prompt.as_str())],
        model,
        stream: true,
        reasoning: effort.as_deref().map(Reasoning::with_effort),
        tools: None,
    };

    println!("{} {}", "endpoint:".cyan(), base_url);
    println!("{}", serde_json::to_string_pretty(&request)?);
    rule();

    let client = OpenAiClient::new(base_url)?;
    let mut stream = match client.create_response(&api_key, &request).await {
        Ok(UpstreamResponse::Stream(stream)) => stream,
        Ok(UpstreamResponse::Complete(body)) => {
            println!("{}", "not streamed, full body follows".yellow());
            println!("{}", serde_json::to_string_pretty(&body)?);
            return Ok(());
        }
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            std::process::exit(1);
        }
    };

    let mut decoder = SseDecoder::new();
    let mut chunks = 0usize;
    let mut events = 0usize;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        chunks += 1;
        let label = format!("#{} ({}B)", chunks, chunk.len());
        println!("{} {:?}", label.dimmed(), String::from_utf8_lossy(&chunk));

        for event in decoder.feed(&chunk) {
            events += 1;
            let delta = event.data.get("delta").and_then(|d| d.as_str()).unwrap_or("");
            println!("  {} {} {}", "->".green(), event.event.bold(), delta.yellow());
        }
    }
    for event in decoder.finish() {
        events += 1;
        println!("  {} {} {}", "->".green(), event.event.bold(), "(unterminated)".dimmed());
    }

    rule();
    println!("{} chunks, {} events", chunks, events);
    Ok(())
}
