//! Authentication chain: accept if any member accepts.

use std::fmt;

use axum::http::{header::WWW_AUTHENTICATE, HeaderMap, StatusCode};

use crate::http::response::{ResponseBody, ResponseDescriptor};

/// One authentication scheme bound to its own configured secret.
pub trait Authenticator: Send + Sync + fmt::Debug {
    /// Short scheme name for logs.
    fn scheme(&self) -> &'static str;

    /// Returns true if the request carries credentials this member accepts.
    fn is_valid(&self, headers: &HeaderMap) -> bool;
}

/// Outcome of [`AuthenticationChain::enforce`].
#[derive(Debug)]
pub enum Enforcement {
    Admitted,
    /// Not admitted; carries the challenge response to send.
    Rejected(ResponseDescriptor),
}

/// Ordered set of authenticators.
///
/// An empty chain rejects every request.
#[derive(Debug, Default)]
pub struct AuthenticationChain {
    authenticators: Vec<Box<dyn Authenticator>>,
}

impl AuthenticationChain {
    pub fn new(authenticators: Vec<Box<dyn Authenticator>>) -> Self {
        if authenticators.is_empty() {
            tracing::warn!("Authentication chain is empty and will reject all requests");
        }
        Self { authenticators }
    }

    pub fn len(&self) -> usize {
        self.authenticators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authenticators.is_empty()
    }

    pub fn is_valid(&self, headers: &HeaderMap) -> bool {
        match self.authenticators.iter().find(|a| a.is_valid(headers)) {
            Some(authenticator) => {
                tracing::debug!(scheme = authenticator.scheme(), "Request authenticated");
                true
            }
            None => false,
        }
    }

    /// Admit the request, or build the standard 401 challenge.
    pub fn enforce(&self, headers: &HeaderMap) -> Enforcement {
        if self.is_valid(headers) {
            Enforcement::Admitted
        } else {
            Enforcement::Rejected(challenge_response())
        }
    }
}

/// `401 Unauthorized` with a Basic challenge.
pub fn challenge_response() -> ResponseDescriptor {
    ResponseDescriptor::new(StatusCode::UNAUTHORIZED)
        .with_header(WWW_AUTHENTICATE.as_str(), "Basic")
        .with_body(ResponseBody::text("Authentication required"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::basic::BasicAuthenticator;
    use axum::http::{header::AUTHORIZATION, HeaderValue};
    use base64::{engine::general_purpose::STANDARD, Engine};

    fn request(user: &str, pass: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let value = format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")));
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&value).unwrap());
        headers
    }

    fn chain() -> AuthenticationChain {
        AuthenticationChain::new(vec![
            Box::new(BasicAuthenticator::new("alice", "one").unwrap()),
            Box::new(BasicAuthenticator::new("bob", "two").unwrap()),
        ])
    }

    #[test]
    fn any_member_admits() {
        let chain = chain();
        assert!(chain.is_valid(&request("alice", "one")));
        assert!(chain.is_valid(&request("bob", "two")));
        assert!(!chain.is_valid(&request("alice", "two")));
    }

    #[test]
    fn empty_chain_rejects_everything() {
        let chain = AuthenticationChain::new(Vec::new());
        assert!(chain.is_empty());
        assert!(!chain.is_valid(&request("alice", "one")));
        assert!(!chain.is_valid(&HeaderMap::new()));
    }

    #[test]
    fn rejection_carries_challenge() {
        match chain().enforce(&HeaderMap::new()) {
            Enforcement::Rejected(response) => {
                assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
                assert_eq!(response.header("www-authenticate"), Some("Basic"));
                assert_eq!(
                    response.body(),
                    &ResponseBody::text("Authentication required")
                );
            }
            Enforcement::Admitted => panic!("expected rejection"),
        }
    }

    #[test]
    fn admission_emits_nothing() {
        assert!(matches!(
            chain().enforce(&request("bob", "two")),
            Enforcement::Admitted
        ));
    }
}
