pub mod chat;
pub mod health;
pub mod tools;
pub mod traces;
