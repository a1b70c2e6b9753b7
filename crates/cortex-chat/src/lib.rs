//! cortex-chat: the per-request orchestration pipeline
//!
//! `Planning -> ToolValidation -> {GenerateQuery -> ExecuteQueryTool | ExecuteContextTool}
//! -> ResponseSynthesis`, with every step published on the request's topic
//! and returned inline in the [`ChatResponse`].

pub mod error;
pub mod format;
pub mod pipeline;
mod trace;

pub use error::PipelineError;
pub use format::format_query_response;
pub use pipeline::{ChatPipeline, ChatRequest, ChatResponse};
