pub mod chat;
pub mod common;
