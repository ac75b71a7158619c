mod attachment;
mod message;
mod protocol;
mod reasoning;
mod session;
mod tool;

pub use attachment::{
    guess_mime_type, sanitize_attachment_file_name, validate_attachments, Attachment,
    MAX_ATTACHMENTS_PER_MESSAGE, MAX_ATTACHMENT_DATA_URL_LENGTH, MAX_ATTACHMENT_FILE_BYTES,
};
pub use message::{ChatMessage, ContentPart, MessageContent, Role};
pub use protocol::{InboundMessage, OutboundMessage, StreamPayload};
pub use reasoning::Reasoning;
pub use session::{ChatSession, MAX_TITLE_LENGTH};
pub use tool::Tool;
