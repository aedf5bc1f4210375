//! Client authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Request headers
//!     → chain.rs (ask each authenticator, first accept wins)
//!     → basic.rs (parse `Authorization: Basic ...`)
//!     → verifier.rs (padded, constant-time comparison)
//!     → Admitted | Rejected(401 + WWW-Authenticate)
//! ```
//!
//! # Design Decisions
//! - Verifiers are built once from configuration and never mutated
//! - No configured authenticator means nothing is admitted
//! - Secrets never reach logs or Debug output

pub mod basic;
pub mod chain;
pub mod verifier;

pub use basic::BasicAuthenticator;
pub use chain::{AuthenticationChain, Authenticator, Enforcement};
pub use verifier::{AuthError, CredentialVerifier};
