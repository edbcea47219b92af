pub mod databricks;
pub mod factory;
pub mod provider;

pub use provider::{Message, MessageRole, ModelClient, ModelReply};
