use super::types::Recording;
use crate::behaviors::{DelaySpec, ResponseStrategy};
use crate::pattern::{CompiledRequestPattern, PatternError, RequestCaptures};
use crate::recording::CapturedRequest;
use crate::template::render_template;

/// Serve-time form of a recording: compiled regexes and clamped delays.
#[derive(Debug, Clone)]
pub struct CompiledRecording {
    pub pattern: CompiledRequestPattern,
    pub strategy: ResponseStrategy,
    pub responses: Vec<CompiledResponse>,
    pub weights: Vec<u64>,
}

#[derive(Debug, Clone)]
pub struct CompiledResponse {
    pub code: String,
    pub header: String,
    pub content: String,
    pub delay: DelaySpec,
}

/// A template rendered for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResponse {
    pub code: String,
    pub header: String,
    pub content: String,
}

impl CompiledRecording {
    pub fn compile(recording: &Recording) -> Result<Self, PatternError> {
        let pattern = recording.request_pattern.compile()?;
        let responses = recording
            .response_templates
            .iter()
            .map(|t| CompiledResponse {
                code: t.code.clone(),
                header: t.header.clone(),
                content: t.content.clone(),
                delay: t.delay(),
            })
            .collect();
        Ok(Self {
            pattern,
            strategy: recording.response_strategy,
            responses,
            weights: recording.weights(),
        })
    }

    pub fn captures(&self, request: &CapturedRequest) -> Option<RequestCaptures> {
        self.pattern.captures(request)
    }
}

impl CompiledResponse {
    pub fn render(&self, captures: &RequestCaptures) -> RenderedResponse {
        RenderedResponse {
            code: render_template(&self.code, captures),
            header: render_template(&self.header, captures),
            content: render_template(&self.content, captures),
        }
    }
}
