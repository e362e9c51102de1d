//! At most one evaluation in flight per transaction

use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct InFlight {
    ids: Mutex<HashSet<String>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `id`; `None` while another guard for it is alive
    pub fn acquire(&self, id: &str) -> Option<InFlightGuard<'_>> {
        let mut ids = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        if !ids.insert(id.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            owner: self,
            id: id.to_string(),
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(id)
    }
}

/// Releases the claim on drop, including on early return and panic
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    owner: &'a InFlight,
    id: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.owner
            .ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_claim_rejected_until_release() {
        let in_flight = InFlight::new();

        let guard = in_flight.acquire("TX-1").unwrap();
        assert!(in_flight.acquire("TX-1").is_none());
        assert!(in_flight.acquire("TX-2").is_some());
        assert!(in_flight.contains("TX-1"));

        drop(guard);
        assert!(!in_flight.contains("TX-1"));
        assert!(in_flight.acquire("TX-1").is_some());
    }
}
