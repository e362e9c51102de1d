//! Mock Oracle for testing
//!
//! Replies are scripted: queued replies are consumed first, then the
//! default reply repeats. Failures and latency can be injected.

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use crate::error::{OracleError, OracleResult};
use crate::oracle::{Prompt, RiskOracle};

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Fail(String),
}

pub struct MockOracle {
    queued: RwLock<VecDeque<MockReply>>,
    default_reply: RwLock<MockReply>,
    delay: RwLock<Option<Duration>>,
    calls: AtomicUsize,
    prompts: RwLock<Vec<Prompt>>,
}

impl MockOracle {
    /// Mock that answers every call with a low-risk approval
    pub fn new() -> Self {
        Self::with_score(0.1)
    }

    /// Mock that answers every call with `score`
    pub fn with_score(score: f64) -> Self {
        Self::with_reply(Self::reply_for(score))
    }

    /// Mock that answers every call with the given raw text
    pub fn with_reply(text: impl Into<String>) -> Self {
        Self {
            queued: RwLock::new(VecDeque::new()),
            default_reply: RwLock::new(MockReply::Text(text.into())),
            delay: RwLock::new(None),
            calls: AtomicUsize::new(0),
            prompts: RwLock::new(Vec::new()),
        }
    }

    /// Mock whose every call fails like an unreachable network
    pub fn failing(message: impl Into<String>) -> Self {
        let oracle = Self::new();
        oracle.set_failing(message);
        oracle
    }

    /// Well-formed oracle answer for a score
    pub fn reply_for(score: f64) -> String {
        json!({
            "riskScore": score,
            "decision": guardian_core::OracleDecision::from_score(score).to_string(),
            "explanation": format!("Mock assessment at {:.2}", score),
            "flags": [],
            "confidence": 0.9,
            "requiresHumanReview": score > 0.6,
        })
        .to_string()
    }

    /// Replace the default reply with a score
    pub fn set_score(&self, score: f64) {
        self.set_reply(Self::reply_for(score));
    }

    pub fn set_reply(&self, text: impl Into<String>) {
        *self.default_reply.write().unwrap_or_else(|e| e.into_inner()) = MockReply::Text(text.into());
    }

    pub fn set_failing(&self, message: impl Into<String>) {
        *self.default_reply.write().unwrap_or_else(|e| e.into_inner()) = MockReply::Fail(message.into());
    }

    /// Queue a one-shot reply consumed before the default
    pub fn push_reply(&self, text: impl Into<String>) {
        self.queued
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(MockReply::Text(text.into()));
    }

    /// Delay every reply (for timeout and in-flight tests)
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.write().unwrap_or_else(|e| e.into_inner()) = Some(delay);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<Prompt> {
        self.prompts.read().unwrap_or_else(|e| e.into_inner()).last().cloned()
    }

    fn next_reply(&self) -> MockReply {
        let queued = self.queued.write().unwrap_or_else(|e| e.into_inner()).pop_front();
        queued.unwrap_or_else(|| self.default_reply.read().unwrap_or_else(|e| e.into_inner()).clone())
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RiskOracle for MockOracle {
    fn id(&self) -> &str {
        "mock"
    }

    async fn generate(&self, prompt: &Prompt) -> OracleResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.clone());

        let delay = *self.delay.read().unwrap_or_else(|e| e.into_inner());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.next_reply() {
            MockReply::Text(text) => Ok(text),
            MockReply::Fail(message) => Err(OracleError::ConnectionFailed {
                source: message.into(),
            }),
        }
    }
}
