//! Conversation storage
//!
//! One pretty-printed JSON document per conversation, named `<id>.json`,
//! under a single directory. See [`FileConversationStore`].

pub mod error;
pub mod model;
pub mod store;

pub use error::{Result, StorageError};
pub use model::{generate_conversation_id, Conversation, ConversationMessage, ConversationSummary};
pub use store::FileConversationStore;
