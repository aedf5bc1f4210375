//! Request routing for upload modules.
//!
//! # Data Flow
//! ```text
//! Admitted request (method, path)
//!     → dispatcher offers it to each module in order
//!     → module asks its matcher.rs rule whether to claim it
//!     → claimed → module outcome | unclaimed → next module
//! ```
//!
//! # Design Decisions
//! - Each module owns its routing rule; the dispatcher knows none
//! - Deterministic: same request always reaches the same module
//! - First claiming module wins (configuration order)

pub mod matcher;

pub use matcher::{AnyMatcher, ExactPathMatcher, Matcher, PathPrefixMatcher};
