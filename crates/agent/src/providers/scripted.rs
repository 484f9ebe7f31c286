//! Replays recorded completions; used by tests and offline demos.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{Completion, CompletionRequest, LlmClient, LlmError};

#[derive(Clone, Debug)]
pub enum ScriptedStep {
    Complete(Completion),
    /// Simulates an unavailable backend.
    Fail(String),
}

#[derive(Default)]
pub struct ScriptedClient {
    steps: Mutex<VecDeque<ScriptedStep>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new(steps: impl IntoIterator<Item = ScriptedStep>) -> Self {
        Self { steps: Mutex::new(steps.into_iter().collect()), requests: Mutex::new(Vec::new()) }
    }

    pub fn answering(text: impl Into<String>) -> Self {
        Self::new([ScriptedStep::Complete(Completion::Answer(text.into()))])
    }

    /// Every request seen so far, in call order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|requests| requests.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.steps.lock().map(|steps| steps.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let step = self
            .steps
            .lock()
            .map_err(|_| LlmError::NotConfigured("scripted client state poisoned".to_string()))?
            .pop_front();

        match step {
            Some(ScriptedStep::Complete(completion)) => Ok(completion),
            Some(ScriptedStep::Fail(body)) => Err(LlmError::Api { status: 503, body }),
            None => Err(LlmError::NotConfigured("scripted client has no steps left".to_string())),
        }
    }
}
