//! Graph store access for cortex
//!
//! The orchestration layer only sees [`GraphDriver`] and [`GraphSession`];
//! [`Neo4jDriver`] is the production implementation over the Neo4j HTTP
//! transactional endpoint.

pub mod driver;
pub mod error;
pub mod neo4j;

pub use driver::{GraphDriver, GraphSession, SharedSession};
pub use error::GraphError;
pub use neo4j::Neo4jDriver;
