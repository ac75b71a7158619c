use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::pin::Pin;

use super::models::{ImageRequest, ImageResponse, ResponsesRequest};
use super::response::extract_error_message;
use crate::error::{PopchatError, Result};

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// What the responses endpoint answered with.
pub enum UpstreamResponse {
    /// `text/event-stream` body.
    Stream(ByteStream),
    /// A complete `application/json` response object.
    Complete(Value),
}

/// The remote model API.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn create_response(
        &self,
        api_key: &str,
        request: &ResponsesRequest,
    ) -> Result<UpstreamResponse>;

    async fn generate_image(&self, api_key: &str, request: &ImageRequest) -> Result<ImageResponse>;
}

pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(api_key: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| PopchatError::Other(format!("Invalid authorization header: {}", e)))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn post<T: serde::Serialize + ?Sized>(
        &self,
        api_key: &str,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(format!("{}/{}", self.base_url, path))
            .headers(Self::headers(api_key)?)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PopchatError::ApiError {
                status: status.as_u16(),
                message: extract_error_message(&body).unwrap_or_default(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl Upstream for OpenAiClient {
    async fn create_response(
        &self,
        api_key: &str,
        request: &ResponsesRequest,
    ) -> Result<UpstreamResponse> {
        let response = self.post(api_key, "responses", request).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.contains("text/event-stream") {
            let stream = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(PopchatError::from));
            Ok(UpstreamResponse::Stream(Box::pin(stream)))
        } else if content_type.contains("application/json") {
            Ok(UpstreamResponse::Complete(response.json().await?))
        } else {
            Err(PopchatError::StreamUnsupported(content_type))
        }
    }

    async fn generate_image(&self, api_key: &str, request: &ImageRequest) -> Result<ImageResponse> {
        let response = self.post(api_key, "images/generations", request).await?;
        Ok(response.json().await?)
    }
}
