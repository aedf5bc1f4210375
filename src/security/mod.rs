//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted connection:
//!     → gate.rs (refresh throttle, drop blocked peers)
//! Each request:
//!     → gate.rs (refresh, blocked? → drop)
//!     → auth chain (valid? → admit)
//!     → throttle.rs (record failure → maybe block)
//! ```
//!
//! # Design Decisions
//! - Fail closed: no authenticator means no admission
//! - Throttle state is process-local and lost on restart
//! - Static deny/allow lists are fixed at startup

pub mod gate;
pub mod throttle;

pub use gate::{Admission, RequestGate};
pub use throttle::AbuseThrottle;
