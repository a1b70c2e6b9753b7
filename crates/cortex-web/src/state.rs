//! Application State

use cortex_chat::ChatPipeline;
use cortex_events::StepBus;
use cortex_introspection::SchemaCache;
use cortex_storage::FileConversationStore;
use cortex_tools::ToolRegistry;
use std::sync::Arc;
use std::time::Instant;

/// Shared by every handler
pub struct AppState {
    pub pipeline: Arc<ChatPipeline>,
    /// Same bus the pipeline publishes on
    pub bus: StepBus,
    pub schema: Arc<SchemaCache>,
    pub registry: Arc<ToolRegistry>,
    pub conversations: Arc<FileConversationStore>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        pipeline: Arc<ChatPipeline>,
        schema: Arc<SchemaCache>,
        registry: Arc<ToolRegistry>,
        conversations: Arc<FileConversationStore>,
    ) -> Self {
        Self {
            bus: pipeline.bus().clone(),
            pipeline,
            schema,
            registry,
            conversations,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
