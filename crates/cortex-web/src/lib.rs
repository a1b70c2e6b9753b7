//! cortex-web: transport for the chat pipeline
//!
//! - `POST /api/chat` runs a request and persists the exchange
//! - `/ws/steps/:request_id` and `/api/steps/:request_id` stream a
//!   request's step updates while it runs
//! - schema and conversation endpoints for the client

pub mod error;
pub mod handlers;
pub mod router;
pub mod sse;
pub mod state;
pub mod websocket;

pub use error::ApiError;
pub use router::create_router;
pub use state::AppState;
