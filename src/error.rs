use std::fmt;

pub const INVALID_API_KEY_MESSAGE: &str =
    "Looks like your API key is incorrect. Please check your API key and try again.";
pub const TIMEOUT_MESSAGE: &str = "The request timed out. Please try again.";

#[derive(Debug)]
pub enum PopchatError {
    ApiError {
        status: u16,
        message: String,
    },
    /// The upstream reported a failure inside an otherwise successful stream.
    UpstreamError(String),
    MissingApiKey,
    InvalidApiKeyFormat,
    AttachmentsUnsupported {
        model: String,
    },
    TooManyAttachments {
        count: usize,
        max: usize,
    },
    AttachmentTooLarge {
        file_name: String,
    },
    EmptyInput,
    NoPreviousUserMessage,
    EmptyModelOutput,
    EmptyImageOutput,
    StreamUnsupported(String),
    SessionNotFound(String),
    StoreError(String),
    NetworkError(reqwest::Error),
    Timeout,
    Canceled,
    IoError(std::io::Error),
    JsonError(serde_json::Error),
    YamlError(serde_yaml::Error),
    Other(String),
}

impl PopchatError {
    /// True for the sentinel produced by an explicit stop or a superseding request.
    pub fn is_canceled(&self) -> bool {
        matches!(self, PopchatError::Canceled)
    }

    /// Text shown to the user when a turn fails.
    pub fn user_message(&self) -> String {
        match self {
            PopchatError::ApiError { status, .. } if *status == 401 || *status == 422 => {
                INVALID_API_KEY_MESSAGE.to_string()
            }
            PopchatError::ApiError { status, message } => {
                if message.trim().is_empty() {
                    format!("Failed to fetch. Status code: {}", status)
                } else {
                    message.clone()
                }
            }
            PopchatError::Timeout => TIMEOUT_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for PopchatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PopchatError::ApiError { status, message } => {
                write!(f, "API error (status {}): {}", status, message)
            }
            PopchatError::UpstreamError(msg) => write!(f, "{}", msg),
            PopchatError::MissingApiKey => {
                write!(f, "No API key configured. Set one with --set-api-key.")
            }
            PopchatError::InvalidApiKeyFormat => write!(
                f,
                "That does not look like an API key. \
                 Keys start with \"sk-\" and are at least 20 characters long."
            ),
            PopchatError::AttachmentsUnsupported { model } => write!(
                f,
                "The image model {} does not accept attachments. Remove them or pick a chat model.",
                model
            ),
            PopchatError::TooManyAttachments { count, max } => write!(
                f,
                "You can only attach up to {} files per message ({} given).",
                max, count
            ),
            PopchatError::AttachmentTooLarge { file_name } => {
                write!(f, "Attachment is too large: {}", file_name)
            }
            PopchatError::EmptyInput => write!(f, "Type a message or attach a file first."),
            PopchatError::NoPreviousUserMessage => {
                write!(f, "There is no previous user message to regenerate.")
            }
            PopchatError::EmptyModelOutput => write!(f, "The model returned an empty response."),
            PopchatError::EmptyImageOutput => write!(f, "The model did not return an image."),
            PopchatError::StreamUnsupported(content_type) => write!(
                f,
                "Streaming responses are not supported here (content type: {})",
                content_type
            ),
            PopchatError::SessionNotFound(id) => write!(f, "Chat session not found: {}", id),
            PopchatError::StoreError(msg) => write!(f, "Storage error: {}", msg),
            PopchatError::NetworkError(e) => write!(f, "Network error: {}", e),
            PopchatError::Timeout => write!(f, "Request timeout"),
            PopchatError::Canceled => write!(f, "Request canceled"),
            PopchatError::IoError(e) => write!(f, "IO error: {}", e),
            PopchatError::JsonError(e) => write!(f, "JSON error: {}", e),
            PopchatError::YamlError(e) => write!(f, "YAML error: {}", e),
            PopchatError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for PopchatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PopchatError::NetworkError(e) => Some(e),
            PopchatError::IoError(e) => Some(e),
            PopchatError::JsonError(e) => Some(e),
            PopchatError::YamlError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PopchatError {
    fn from(err: reqwest::Error) -> Self {
        PopchatError::NetworkError(err)
    }
}

impl From<std::io::Error> for PopchatError {
    fn from(err: std::io::Error) -> Self {
        PopchatError::IoError(err)
    }
}

impl From<serde_json::Error> for PopchatError {
    fn from(err: serde_json::Error) -> Self {
        PopchatError::JsonError(err)
    }
}

impl From<serde_yaml::Error> for PopchatError {
    fn from(err: serde_yaml::Error) -> Self {
        PopchatError::YamlError(err)
    }
}

impl From<anyhow::Error> for PopchatError {
    fn from(err: anyhow::Error) -> Self {
        PopchatError::Other(format!("{:#}", err))
    }
}

impl From<String> for PopchatError {
    fn from(msg: String) -> Self {
        PopchatError::Other(msg)
    }
}

impl From<&str> for PopchatError {
    fn from(msg: &str) -> Self {
        PopchatError::Other(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PopchatError>;
