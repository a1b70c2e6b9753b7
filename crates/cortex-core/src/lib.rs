//! Core types and utilities for cortex
//!
//! # Modules
//!
//! - `config`: Environment loading and typed application configuration
//! - `types`: Steps, tool results and request context shared across crates

pub mod config;
pub mod types;

// Re-exports
pub use config::{AppConfig, ConfigError};
pub use types::*;
