pub mod client;
pub mod models;
pub mod response;
pub mod streaming;

pub use client::{ByteStream, OpenAiClient, Upstream, UpstreamResponse};
pub use models::{ImageRequest, ImageResponse, ResponsesRequest};
pub use streaming::{read_response_stream, ResponseAccumulator, SseDecoder, SseEvent};
