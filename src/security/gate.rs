//! Request admission gate.
//!
//! # Responsibilities
//! - Expire stale blocks before every decision
//! - Drop blocked sources before any authentication work
//! - Authenticate, and count failures against the source address
//!
//! # Design Decisions
//! - Blocked sources get no response at all, not even a 401
//! - Failures are counted only after a real authentication attempt
//! - The throttle lock is released before the caller does any I/O

use std::sync::Arc;

use axum::http::HeaderMap;

use crate::auth::{AuthenticationChain, Enforcement};
use crate::http::response::ResponseDescriptor;
use crate::observability::metrics;
use crate::security::throttle::AbuseThrottle;

/// Verdict for one request.
#[derive(Debug)]
pub enum Admission {
    /// Proceed to the module dispatcher.
    Admitted,
    /// Answer with the given response (authentication challenge).
    Rejected(ResponseDescriptor),
    /// Abandon the connection without answering.
    Dropped,
}

/// Combines the authentication chain with the abuse throttle.
#[derive(Debug)]
pub struct RequestGate {
    chain: AuthenticationChain,
    throttle: Arc<AbuseThrottle>,
}

impl RequestGate {
    pub fn new(chain: AuthenticationChain, throttle: Arc<AbuseThrottle>) -> Self {
        Self { chain, throttle }
    }

    pub fn throttle(&self) -> &AbuseThrottle {
        &self.throttle
    }

    /// Connection-level check, run before a connection is served.
    pub fn is_blocked(&self, addr: &str) -> bool {
        self.throttle.refresh();
        self.throttle.is_blocked(addr)
    }

    /// Decide whether a request from `addr` may reach the modules.
    pub fn admit(&self, addr: &str, headers: &HeaderMap) -> Admission {
        if self.is_blocked(addr) {
            tracing::debug!(client = %addr, "Dropping request from blocked address");
            metrics::record_admission("dropped");
            return Admission::Dropped;
        }

        match self.chain.enforce(headers) {
            Enforcement::Admitted => {
                metrics::record_admission("admitted");
                Admission::Admitted
            }
            Enforcement::Rejected(response) => {
                self.throttle.record_failure(addr);
                tracing::debug!(client = %addr, "Authentication failed");
                metrics::record_admission("rejected");
                Admission::Rejected(response)
            }
        }
    }
}
