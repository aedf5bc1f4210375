//! Failed-authentication throttling per source address.
//!
//! # States
//! - Clean: no recorded failures
//! - Counting(n): n consecutive failures, below the threshold
//! - Blocked: threshold reached, requests are dropped
//!
//! # State Transitions
//! ```text
//! Clean → Counting(1): first failure (starts the block window if none)
//! Counting(n) → Blocked: n + 1 reaches the threshold
//! Blocked | Counting → Clean: block window expired, whole state reset
//! ```
//!
//! # Design Decisions
//! - Deny list beats allow list beats temporary block
//! - One window for all addresses: once the oldest block could have
//!   expired, every block and counter is cleared at once
//! - One mutex guards all mutable state; static lists are read lock-free

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::config::ThrottleConfig;
use crate::observability::metrics;

/// Throttle key for an address: `IpAddr` display of the canonical form.
pub fn canonical_key(addr: String) -> String {
    match addr.trim().parse::<IpAddr>() {
        Ok(ip) => ip.to_canonical().to_string(),
        Err(_) => addr,
    }
}

#[derive(Debug, Default)]
struct ThrottleState {
    failure_counts: HashMap<String, u32>,
    blocked: HashSet<String>,
    window_start: Option<Instant>,
}

/// Process-wide abuse throttle.
#[derive(Debug)]
pub struct AbuseThrottle {
    allow: HashSet<String>,
    deny: HashSet<String>,
    threshold: u32,
    block_duration: Duration,
    state: Mutex<ThrottleState>,
}

impl AbuseThrottle {
    /// Build a throttle. A threshold of 0 is treated as 1.
    ///
    /// List entries that parse as IP addresses are stored in canonical
    /// form, matching how peers are keyed.
    pub fn new<A, D>(allow: A, deny: D, threshold: u32, block_duration: Duration) -> Self
    where
        A: IntoIterator<Item = String>,
        D: IntoIterator<Item = String>,
    {
        Self {
            allow: allow.into_iter().map(canonical_key).collect(),
            deny: deny.into_iter().map(canonical_key).collect(),
            threshold: threshold.max(1),
            block_duration,
            state: Mutex::new(ThrottleState::default()),
        }
    }

    pub fn from_config(config: &ThrottleConfig) -> Self {
        Self::new(
            config.allow.iter().cloned(),
            config.deny.iter().cloned(),
            config.failure_threshold,
            Duration::from_secs(config.block_duration_secs),
        )
    }

    fn lock(&self) -> MutexGuard<'_, ThrottleState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reset all temporary blocks if the block window has expired.
    pub fn refresh(&self) {
        self.refresh_at(Instant::now());
    }

    pub(crate) fn refresh_at(&self, now: Instant) {
        let mut state = self.lock();
        let Some(start) = state.window_start else {
            return;
        };
        if now.saturating_duration_since(start) > self.block_duration {
            state.blocked.clear();
            state.failure_counts.clear();
            state.window_start = None;
            metrics::record_throttle_reset();
            tracing::info!("Reset temporary blocks");
        }
    }

    pub fn is_blocked(&self, addr: &str) -> bool {
        if self.deny.contains(addr) {
            return true;
        }
        if self.allow.contains(addr) {
            return false;
        }
        self.lock().blocked.contains(addr)
    }

    /// Count one failed authentication for `addr`.
    pub fn record_failure(&self, addr: &str) {
        self.record_failure_at(addr, Instant::now());
    }

    pub(crate) fn record_failure_at(&self, addr: &str, now: Instant) {
        if self.allow.contains(addr) || self.deny.contains(addr) {
            return;
        }

        let mut state = self.lock();
        if state.blocked.contains(addr) {
            return;
        }

        if state.window_start.is_none() {
            state.window_start = Some(now);
            tracing::debug!("Blocking period timer started");
        }

        let count = state.failure_counts.entry(addr.to_string()).or_insert(0);
        *count += 1;
        let count = *count;
        tracing::debug!(client = %addr, failures = count, "Failed authentication attempt");

        if count >= self.threshold {
            state.failure_counts.remove(addr);
            state.blocked.insert(addr.to_string());
            metrics::record_throttle_block();
            tracing::info!(client = %addr, "Temporarily blocked");
        }
    }

    /// Current failure count for `addr` (0 once blocked or reset).
    pub fn failure_count(&self, addr: &str) -> u32 {
        self.lock().failure_counts.get(addr).copied().unwrap_or(0)
    }

    /// Number of temporarily blocked addresses.
    pub fn blocked_count(&self) -> usize {
        self.lock().blocked.len()
    }

    pub fn window_active(&self) -> bool {
        self.lock().window_start.is_some()
    }
}
