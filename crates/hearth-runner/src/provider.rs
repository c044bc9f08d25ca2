//! Reasoning provider backends.
//!
//! Enum dispatch instead of trait objects because async methods are not
//! dyn-compatible. The HTTP backend speaks the OpenAI-style chat
//! completions shape, which every local and hosted provider of interest
//! accepts; the scripted backend is the deterministic in-process stand-in
//! used by tests and the demo binary.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use hearth_types::{AgentId, DecisionKind, DecisionRequest, Priority};

use crate::error::RunnerError;

/// The system prompt sent with every request. The provider's only job is
/// to pick one action from the closed set and answer in bare JSON.
const SYSTEM_PROMPT: &str = "You are a resident of a small town. Decide your next action \
from your current situation. Answer with a single JSON object: \
{\"action\": <one of \"eat\",\"move\",\"mine\",\"fish\",\"sell\",\"buy\",\"talk\",\"idle\">, \
\"parameters\": {...}, \"rationale\": <short string>, \"emotion\": <optional mood>}. \
No prose outside the JSON.";

/// A backend that can turn a decision request into raw response text.
pub enum ReasoningProvider {
    /// OpenAI-style chat completions over HTTP.
    Http(HttpProvider),
    /// Canned responses for tests and offline runs.
    Scripted(ScriptedProvider),
}

impl ReasoningProvider {
    /// Send a request and return the raw response text.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Provider`] if the backend fails, or
    /// [`RunnerError::Serde`] if the request cannot be serialized.
    pub async fn complete(&self, request: &DecisionRequest) -> Result<String, RunnerError> {
        match self {
            Self::Http(provider) => provider.complete(request).await,
            Self::Scripted(provider) => provider.complete(request),
        }
    }

    /// Human-readable backend name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Scripted(_) => "scripted",
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP backend
// ---------------------------------------------------------------------------

/// OpenAI-style chat completions backend.
///
/// Sends requests to `{base_url}/chat/completions`. Works with hosted
/// APIs and local Ollama-style endpoints alike.
pub struct HttpProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpProvider {
    /// Create a backend against the given endpoint.
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
        }
    }

    async fn complete(&self, request: &DecisionRequest) -> Result<String, RunnerError> {
        let url = format!("{}/chat/completions", self.base_url);
        let situation = serde_json::to_string(&request.snapshot)?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": situation}
            ],
            "temperature": 0.7,
            "max_tokens": 256,
            "response_format": {"type": "json_object"}
        });

        let mut builder = self.client.post(&url).json(&body);
        if !self.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RunnerError::Provider(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(RunnerError::Provider(format!(
                "provider returned {status}: {error_body}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RunnerError::Provider(format!("response parse failed: {e}")))?;

        extract_content(&json)
    }
}

/// Extract the text content from a chat completions response.
fn extract_content(json: &serde_json::Value) -> Result<String, RunnerError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            RunnerError::Provider("response missing choices[0].message.content".to_owned())
        })
}

// ---------------------------------------------------------------------------
// Scripted backend
// ---------------------------------------------------------------------------

/// What the scripted backend does once its queued responses run out.
#[derive(Debug, Clone)]
enum Exhausted {
    /// Keep returning this response forever.
    Repeat(String),
    /// Fail every further call (provider-outage scenarios).
    Fail,
}

/// Shared record of the requests a scripted backend has answered, in
/// answer order. Cloning shares the same underlying log, so a handle
/// taken before the provider moves into the queue keeps observing it.
#[derive(Debug, Clone, Default)]
pub struct RequestLog {
    seen: Arc<Mutex<Vec<(AgentId, DecisionKind, Priority)>>>,
}

impl RequestLog {
    /// All recorded (agent, kind, priority) triples so far.
    pub fn entries(&self) -> Vec<(AgentId, DecisionKind, Priority)> {
        self.seen
            .lock()
            .map_or_else(|_poisoned| Vec::new(), |guard| guard.clone())
    }

    fn record(&self, request: &DecisionRequest) {
        if let Ok(mut guard) = self.seen.lock() {
            guard.push((request.agent_id, request.kind, request.priority));
        }
    }
}

/// Deterministic in-process backend: pops queued responses in order.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<String>>,
    exhausted: Exhausted,
    log: RequestLog,
}

impl ScriptedProvider {
    /// Queue responses; when they run out, repeat an idle decision.
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            exhausted: Exhausted::Repeat(Self::idle_json()),
            log: RequestLog::default(),
        }
    }

    /// Always return the same response.
    pub fn always(response: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            exhausted: Exhausted::Repeat(response.into()),
            log: RequestLog::default(),
        }
    }

    /// Fail every call: the full provider-outage scenario.
    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            exhausted: Exhausted::Fail,
            log: RequestLog::default(),
        }
    }

    /// Queue responses and fail once they run out.
    pub fn then_failing<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            exhausted: Exhausted::Fail,
            log: RequestLog::default(),
        }
    }

    /// A handle onto the log of answered requests.
    pub fn request_log(&self) -> RequestLog {
        self.log.clone()
    }

    fn idle_json() -> String {
        r#"{"action": "idle", "parameters": {}}"#.to_owned()
    }

    fn complete(&self, request: &DecisionRequest) -> Result<String, RunnerError> {
        self.log.record(request);
        let Ok(mut queue) = self.responses.lock() else {
            return Err(RunnerError::Provider("scripted queue poisoned".to_owned()));
        };
        if let Some(next) = queue.pop_front() {
            return Ok(next);
        }
        match &self.exhausted {
            Exhausted::Repeat(response) => Ok(response.clone()),
            Exhausted::Fail => Err(RunnerError::Provider("scripted outage".to_owned())),
        }
    }
}
