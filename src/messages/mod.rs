pub mod api;
pub mod models;

pub use api::{CreateThread, SendMessage, ThreadCreated};
pub use models::{Attachment, AttachmentKind, Message, MessageKind, Reaction, Thread};
