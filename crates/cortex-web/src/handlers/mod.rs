//! HTTP Request Handlers

pub mod chat;
pub mod conversations;
pub mod health;
pub mod schema;
