//! Alert Manager policy and circuit breaker
//!
//! Alerting is orthogonal to blocking: a quarantined transaction can raise an
//! alert, and the alert threshold is configured independently of the block
//! threshold.
//!
//! The circuit breaker counts alerts per agent in a rolling window of
//! minute buckets and quarantines the agent once enough HIGH or CRITICAL
//! alerts land inside the window.

use chrono::{DateTime, Utc};
use guardian_core::AlertSeverity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Number of buckets (1 per minute)
pub const BUCKET_COUNT: usize = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPolicy {
    /// Scores strictly above raise a HIGH alert
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: f64,

    /// Scores strictly above raise a CRITICAL alert
    #[serde(default = "default_critical_threshold")]
    pub critical_threshold: f64,

    /// Rolling window for the circuit breaker (1-60 minutes)
    #[serde(default = "default_window_minutes")]
    pub window_minutes: u32,

    /// CRITICAL alerts in the window that quarantine the agent (0 disables)
    #[serde(default = "default_critical_alerts_to_quarantine")]
    pub critical_alerts_to_quarantine: u32,

    /// HIGH-or-worse alerts in the window that quarantine the agent (0 disables)
    #[serde(default = "default_high_alerts_to_quarantine")]
    pub high_alerts_to_quarantine: u32,
}

fn default_alert_threshold() -> f64 {
    0.5
}

fn default_critical_threshold() -> f64 {
    0.9
}

fn default_window_minutes() -> u32 {
    60
}

fn default_critical_alerts_to_quarantine() -> u32 {
    1
}

fn default_high_alerts_to_quarantine() -> u32 {
    3
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            alert_threshold: default_alert_threshold(),
            critical_threshold: default_critical_threshold(),
            window_minutes: default_window_minutes(),
            critical_alerts_to_quarantine: default_critical_alerts_to_quarantine(),
            high_alerts_to_quarantine: default_high_alerts_to_quarantine(),
        }
    }
}

impl AlertPolicy {
    /// Severity for an evaluation score, `None` below the alert threshold
    pub fn severity_for(&self, score: f64) -> Option<AlertSeverity> {
        if score > self.critical_threshold {
            Some(AlertSeverity::Critical)
        } else if score > self.alert_threshold {
            Some(AlertSeverity::High)
        } else {
            None
        }
    }

    /// Severity for an agent scan. One notch below the evaluation severity:
    /// a scan flags a pattern, not a specific transfer.
    pub fn scan_severity_for(&self, score: f64) -> Option<AlertSeverity> {
        if score > self.critical_threshold {
            Some(AlertSeverity::High)
        } else if score > self.alert_threshold {
            Some(AlertSeverity::Medium)
        } else {
            None
        }
    }

    pub fn trips_breaker(&self, counts: &WindowCounts) -> bool {
        (self.critical_alerts_to_quarantine > 0 && counts.critical >= self.critical_alerts_to_quarantine)
            || (self.high_alerts_to_quarantine > 0 && counts.high_or_worse >= self.high_alerts_to_quarantine)
    }
}

/// Alert counts inside the rolling window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowCounts {
    pub high_or_worse: u32,
    pub critical: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct Bucket {
    /// Minute (unix seconds / 60) this bucket currently holds
    minute: i64,
    high_or_worse: u32,
    critical: u32,
}

/// Rolling window for a single agent
#[derive(Debug)]
pub struct AlertWindow {
    buckets: [Bucket; BUCKET_COUNT],
}

impl Default for AlertWindow {
    fn default() -> Self {
        Self {
            buckets: [Bucket::default(); BUCKET_COUNT],
        }
    }
}

impl AlertWindow {
    fn minute_of(timestamp: DateTime<Utc>) -> i64 {
        timestamp.timestamp().div_euclid(60)
    }

    fn bucket_index(minute: i64) -> usize {
        minute.rem_euclid(BUCKET_COUNT as i64) as usize
    }

    /// Record an alert; LOW and MEDIUM alerts do not count
    pub fn record(&mut self, severity: AlertSeverity, timestamp: DateTime<Utc>) {
        if severity < AlertSeverity::High {
            return;
        }
        let minute = Self::minute_of(timestamp);
        let bucket = &mut self.buckets[Self::bucket_index(minute)];

        if bucket.minute != minute {
            if minute < bucket.minute {
                // Older than what the slot holds now: outside any window we can answer
                return;
            }
            *bucket = Bucket {
                minute,
                ..Bucket::default()
            };
        }

        bucket.high_or_worse += 1;
        if severity == AlertSeverity::Critical {
            bucket.critical += 1;
        }
    }

    /// Undo a [`AlertWindow::record`] made with the same arguments
    pub fn forget(&mut self, severity: AlertSeverity, timestamp: DateTime<Utc>) {
        if severity < AlertSeverity::High {
            return;
        }
        let minute = Self::minute_of(timestamp);
        let bucket = &mut self.buckets[Self::bucket_index(minute)];
        if bucket.minute != minute || bucket.high_or_worse == 0 {
            return;
        }

        bucket.high_or_worse -= 1;
        if severity == AlertSeverity::Critical {
            bucket.critical = bucket.critical.saturating_sub(1);
        }
    }

    /// Counts for the last `minutes` minutes, including the current one
    pub fn counts_in_last(&self, minutes: u32, now: DateTime<Utc>) -> WindowCounts {
        let minutes = (minutes as i64).clamp(1, BUCKET_COUNT as i64);
        let current = Self::minute_of(now);

        self.buckets
            .iter()
            .filter(|b| b.high_or_worse > 0)
            .filter(|b| {
                let age = current - b.minute;
                (0..minutes).contains(&age)
            })
            .fold(WindowCounts::default(), |acc, b| WindowCounts {
                high_or_worse: acc.high_or_worse + b.high_or_worse,
                critical: acc.critical + b.critical,
            })
    }
}

/// Per-agent alert windows, rebuilt from stored alerts at startup
#[derive(Debug, Default)]
pub struct AlertTracker {
    windows: HashMap<String, AlertWindow>,
}

impl AlertTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, agent_id: &str, severity: AlertSeverity, at: DateTime<Utc>) {
        self.windows
            .entry(agent_id.to_string())
            .or_default()
            .record(severity, at);
    }

    pub fn forget(&mut self, agent_id: &str, severity: AlertSeverity, at: DateTime<Utc>) {
        if let Some(window) = self.windows.get_mut(agent_id) {
            window.forget(severity, at);
        }
    }

    pub fn counts(&self, agent_id: &str, minutes: u32, now: DateTime<Utc>) -> WindowCounts {
        self.windows
            .get(agent_id)
            .map(|w| w.counts_in_last(minutes, now))
            .unwrap_or_default()
    }

    pub fn agent_count(&self) -> usize {
        self.windows.len()
    }
}

/// What to do after an evaluation scored `score`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPlan {
    pub severity: AlertSeverity,
    /// Counts including the alert about to be raised
    pub counts: WindowCounts,
    pub quarantine_agent: bool,
}

/// Alert policy plus the shared rolling-window state
#[derive(Debug, Default)]
pub struct AlertManager {
    policy: AlertPolicy,
    tracker: Mutex<AlertTracker>,
}

impl AlertManager {
    pub fn new(policy: AlertPolicy) -> Self {
        Self {
            policy,
            tracker: Mutex::new(AlertTracker::new()),
        }
    }

    pub fn policy(&self) -> &AlertPolicy {
        &self.policy
    }

    /// Replay stored alerts into the window
    pub fn rebuild<'a>(&self, alerts: impl IntoIterator<Item = (&'a str, AlertSeverity, DateTime<Utc>)>) {
        let mut tracker = self.lock();
        *tracker = AlertTracker::new();
        for (agent_id, severity, at) in alerts {
            tracker.record(agent_id, severity, at);
        }
    }

    /// Decide whether an evaluation raises an alert and trips the breaker.
    ///
    /// Does not record anything; call [`AlertManager::record`] once the alert
    /// is committed.
    pub fn plan(&self, agent_id: &str, score: f64, now: DateTime<Utc>) -> Option<AlertPlan> {
        let severity = self.policy.severity_for(score)?;
        Some(self.plan_for_severity(agent_id, severity, now))
    }

    /// Plan an alert and count it in the window under one lock.
    ///
    /// Concurrent evaluations for the same agent each see the alerts
    /// reserved before them, so the breaker cannot be skipped. Call
    /// [`AlertManager::release`] with the same arguments if the alert is
    /// never committed.
    pub fn reserve(&self, agent_id: &str, score: f64, now: DateTime<Utc>) -> Option<AlertPlan> {
        let severity = self.policy.severity_for(score)?;
        let mut tracker = self.lock();
        let plan = self.plan_against(&tracker, agent_id, severity, now);
        tracker.record(agent_id, severity, now);
        Some(plan)
    }

    /// Drop a reservation whose alert was not committed
    pub fn release(&self, agent_id: &str, severity: AlertSeverity, at: DateTime<Utc>) {
        self.lock().forget(agent_id, severity, at);
    }

    /// Plan for an alert whose severity is already known (manual, scan)
    pub fn plan_for_severity(&self, agent_id: &str, severity: AlertSeverity, now: DateTime<Utc>) -> AlertPlan {
        let tracker = self.lock();
        self.plan_against(&tracker, agent_id, severity, now)
    }

    fn plan_against(
        &self,
        tracker: &AlertTracker,
        agent_id: &str,
        severity: AlertSeverity,
        now: DateTime<Utc>,
    ) -> AlertPlan {
        let mut counts = tracker.counts(agent_id, self.policy.window_minutes, now);
        if severity >= AlertSeverity::High {
            counts.high_or_worse += 1;
        }
        if severity == AlertSeverity::Critical {
            counts.critical += 1;
        }

        AlertPlan {
            severity,
            counts,
            quarantine_agent: self.policy.trips_breaker(&counts),
        }
    }

    pub fn record(&self, agent_id: &str, severity: AlertSeverity, at: DateTime<Utc>) {
        self.lock().record(agent_id, severity, at);
    }

    pub fn counts(&self, agent_id: &str, now: DateTime<Utc>) -> WindowCounts {
        self.lock().counts(agent_id, self.policy.window_minutes, now)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AlertTracker> {
        self.tracker.lock().unwrap_or_else(|e| e.into_inner())
    }
}
