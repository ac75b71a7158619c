use serde::{Deserialize, Serialize};

use crate::models::{ChatMessage, Reasoning, Tool};

pub const IMAGE_SIZE: &str = "1024x1024";

/// Body of `POST /responses`.
#[derive(Debug, Serialize)]
pub struct ResponsesRequest {
    pub input: Vec<ChatMessage>,
    pub model: String,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Reasoning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
}

/// Body of `POST /images/generations`.
#[derive(Debug, Serialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub model: String,
    pub n: u32,
    pub size: String,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            n: 1,
            size: IMAGE_SIZE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct ImageData {
    pub url: Option<String>,
    pub b64_json: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ImageResponse {
    #[serde(default)]
    pub data: Vec<ImageData>,
}
