//! In-memory ledger for tests and dry runs

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::client::{LedgerClient, LedgerReceipt, LedgerSubmission};
use crate::error::{LedgerError, LedgerResult};

#[derive(Default)]
pub struct InMemoryLedger {
    submissions: RwLock<Vec<LedgerSubmission>>,
    failing: AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following submit fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> Vec<LedgerSubmission> {
        self.submissions.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.submissions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    fn name(&self) -> &str {
        "memory"
    }

    async fn submit(&self, submission: &LedgerSubmission) -> LedgerResult<LedgerReceipt> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("in-memory ledger set to fail".to_string()));
        }
        let mut submissions = self.submissions.write().unwrap_or_else(|e| e.into_inner());
        submissions.push(submission.clone());
        Ok(LedgerReceipt {
            reference: format!("mem-{}", submissions.len()),
        })
    }
}
