//! Path matching used by upload modules to claim requests.
//!
//! # Design Decisions
//! - Exact paths compare case-insensitively
//! - Prefixes compare case-sensitively
//! - Query strings never take part in matching
//! - No regex to guarantee O(n) matching

use std::collections::HashSet;

use crate::http::request::RequestHead;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, request: &RequestHead) -> bool;
}

/// Matches one of a fixed set of paths, ignoring ASCII case.
#[derive(Debug, Clone)]
pub struct ExactPathMatcher {
    paths: HashSet<String>,
}

impl ExactPathMatcher {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            paths: paths
                .into_iter()
                .map(|p| p.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }
}

impl Matcher for ExactPathMatcher {
    fn matches(&self, request: &RequestHead) -> bool {
        self.paths.contains(&request.path.to_ascii_lowercase())
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, request: &RequestHead) -> bool {
        request.path.starts_with(&self.prefix)
    }
}

/// Combines multiple matchers with OR semantics.
#[derive(Debug, Default)]
pub struct AnyMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AnyMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AnyMatcher {
    fn matches(&self, request: &RequestHead) -> bool {
        self.matchers.iter().any(|m| m.matches(request))
    }
}
