pub mod agents;
pub mod auth;
pub mod commands;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod server;
pub mod state;
pub mod tools;
pub mod trace;
