//! cortex-events: Step Update Broadcasting
//!
//! A topic-keyed publish/subscribe bus. Every listener owns an unbounded
//! channel; `publish` multicasts to whatever listeners exist at that moment
//! and nothing is buffered for topics without listeners.

pub mod bus;

pub use bus::{EventBus, EventStream, Subscription};

use cortex_core::StepUpdateEvent;

/// The bus carrying per-request step updates
pub type StepBus = EventBus<StepUpdateEvent>;
