#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod conversation;
pub mod generator;
pub mod prompt;
pub mod session;

pub use conversation::DocumentChat;
pub use generator::{OpenAiGenerator, TextGenerator};
pub use session::ChatSession;
