//! HTTP Basic authentication scheme.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine};

use super::chain::Authenticator;
use super::verifier::{AuthError, CredentialVerifier};

/// Accepts requests carrying `Authorization: Basic <base64(user:pass)>`
/// for one configured user.
#[derive(Debug)]
pub struct BasicAuthenticator {
    verifier: CredentialVerifier,
}

impl BasicAuthenticator {
    pub fn new(username: &str, password: &str) -> Result<Self, AuthError> {
        Ok(Self {
            verifier: CredentialVerifier::new(username, password)?,
        })
    }
}

impl Authenticator for BasicAuthenticator {
    fn scheme(&self) -> &'static str {
        "basic"
    }

    fn is_valid(&self, headers: &HeaderMap) -> bool {
        let Some(value) = headers.get(AUTHORIZATION) else {
            tracing::debug!("No Authorization header in request");
            return false;
        };
        let Ok(value) = value.to_str() else {
            tracing::debug!("Authorization header is not valid ASCII");
            return false;
        };

        let mut parts = value.split_whitespace();
        let (Some(scheme), Some(encoded)) = (parts.next(), parts.next()) else {
            tracing::debug!("No valid Basic authentication header");
            return false;
        };
        if !scheme.eq_ignore_ascii_case("basic") {
            tracing::debug!("No valid Basic authentication header");
            return false;
        }

        match STANDARD.decode(encoded) {
            Ok(credentials) => self.verifier.verify(&credentials),
            Err(_) => {
                tracing::debug!("Basic credentials are not valid base64");
                false
            }
        }
    }
}
