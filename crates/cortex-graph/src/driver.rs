//! Driver and session traits

use async_trait::async_trait;
use cortex_core::Row;
use std::sync::Arc;

use crate::error::GraphError;

/// A query-executing session.
///
/// Implementations release whatever they hold (pool slot, connection)
/// when dropped, so a session obtained at the top of a request is given
/// back on every exit path.
#[async_trait]
pub trait GraphSession: Send + Sync {
    /// Run a statement and return its rows as `column -> value` maps
    async fn run(&self, query: &str) -> Result<Vec<Row>, GraphError>;
}

/// Shared handle to a session; the session is released when the last clone drops
pub type SharedSession = Arc<dyn GraphSession>;

/// Source of sessions
#[async_trait]
pub trait GraphDriver: Send + Sync {
    /// Acquire a session. Fails with [`GraphError::Unavailable`] when the
    /// store cannot be reached or no slot frees up in time.
    async fn session(&self) -> Result<SharedSession, GraphError>;

    /// Round-trip a trivial statement against the store
    async fn verify_connectivity(&self) -> Result<(), GraphError>;
}
