//! Ordered step record of one request

use cortex_core::{step_topic, Step, StepOutputs, StepUpdateEvent};
use cortex_events::StepBus;
use std::time::Instant;
use tracing::debug;

/// Append-only list of steps, mirrored onto the request's topic.
///
/// At most one pipeline-owned step is open at a time. Tool steps arrive
/// already terminal from the executor and are only recorded.
pub(crate) struct StepTrace {
    bus: StepBus,
    request_id: String,
    topic: String,
    steps: Vec<Step>,
    open: Option<(usize, Instant)>,
}

impl StepTrace {
    pub fn new(bus: StepBus, request_id: &str) -> Self {
        Self {
            bus,
            request_id: request_id.to_string(),
            topic: step_topic(request_id),
            steps: Vec::new(),
            open: None,
        }
    }

    /// Open a step in `RUNNING`
    pub fn begin(&mut self, id: &str, name: &str) {
        let step = Step::running(id, name);
        self.publish(&step);
        self.steps.push(step);
        self.open = Some((self.steps.len() - 1, Instant::now()));
    }

    pub fn complete(&mut self, outputs: Option<StepOutputs>) {
        if let Some((idx, started)) = self.open.take() {
            let step = self.steps[idx].completed(started.elapsed().as_secs_f64(), outputs);
            self.publish(&step);
            self.steps[idx] = step;
        }
    }

    pub fn fail(&mut self, error: &str) {
        if let Some((idx, started)) = self.open.take() {
            let step = self.steps[idx].failed(started.elapsed().as_secs_f64(), error);
            self.publish(&step);
            self.steps[idx] = step;
        }
    }

    /// Append a step whose lifecycle was published elsewhere
    pub fn record(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Rewrite a step still in `RUNNING` to `ERROR`; no-op otherwise
    pub fn fail_open_step(&mut self, error: &str) {
        if self.open.is_some() {
            self.fail(error);
        }
    }

    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }

    fn publish(&self, step: &Step) {
        let delivered = self.bus.publish(
            &self.topic,
            StepUpdateEvent {
                request_id: self.request_id.clone(),
                step: step.clone(),
            },
        );
        debug!(step = %step.id, status = %step.status, delivered, "Published step update");
    }
}
