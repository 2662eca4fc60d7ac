//! Serve-time matching: find the first activated recording whose pattern
//! matches a request, select a template, render it and compute its delay.

use crate::recording::CapturedRequest;
use crate::repository::RecordingRepository;
use crate::status::Statistics;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatedResponse {
    pub recording: String,
    pub template_index: usize,
    /// Every weight was zero and the first template was used.
    pub fallback: bool,
    pub code: String,
    pub header: String,
    pub content: String,
    pub delay_ms: u64,
}

pub struct Simulator {
    repository: Arc<RecordingRepository>,
    statistics: Arc<Statistics>,
}

impl Simulator {
    pub fn new(repository: Arc<RecordingRepository>, statistics: Arc<Statistics>) -> Self {
        Self {
            repository,
            statistics,
        }
    }

    /// Match `request` using the thread-local generator.
    pub fn respond(&self, request: &CapturedRequest) -> Option<SimulatedResponse> {
        self.respond_with_rng(request, &mut rand::thread_rng())
    }

    /// Match `request` against activated recordings in key order.
    pub fn respond_with_rng<R: Rng + ?Sized>(
        &self,
        request: &CapturedRequest,
        rng: &mut R,
    ) -> Option<SimulatedResponse> {
        for active in self.repository.active_recordings() {
            let Some(compiled) = active.stored.compiled.as_ref() else {
                continue;
            };
            let Some(captures) = compiled.captures(request) else {
                continue;
            };
            let Some(selection) = self.repository.selection().select(
                &active.key,
                compiled.strategy,
                &compiled.weights,
                rng,
            ) else {
                warn!("Recording {} matched but has no response templates", active.key);
                continue;
            };

            let response = &compiled.responses[selection.index];
            let rendered = response.render(&captures);
            let delay_ms = response.delay.sample(rng);
            self.statistics.record(&active.key);
            debug!(
                recording = %active.key,
                template = selection.index,
                delay_ms,
                "Matched request"
            );
            return Some(SimulatedResponse {
                recording: active.key,
                template_index: selection.index,
                fallback: selection.fallback,
                code: rendered.code,
                header: rendered.header,
                content: rendered.content,
                delay_ms,
            });
        }
        debug!("No activated recording matches request");
        None
    }

    /// Match `request` and wait out the simulated delay before returning.
    pub async fn serve(&self, request: &CapturedRequest) -> Option<SimulatedResponse> {
        let response = self.respond(request)?;
        if response.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(response.delay_ms)).await;
        }
        Some(response)
    }
}
