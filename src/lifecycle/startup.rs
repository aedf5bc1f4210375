//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn a validated configuration into a ready `Gateway`
//! - Bind the listener and hand both to the server
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, nothing is served
//! - Listeners bind last (traffic only when ready)

use std::sync::Arc;

use thiserror::Error;

use crate::auth::{AuthError, AuthenticationChain, Authenticator, BasicAuthenticator};
use crate::config::GatewayConfig;
use crate::http::{Gateway, HttpServer};
use crate::modules::{build_modules, DispatchError, ModuleDispatcher};
use crate::net::{Listener, ListenerError};
use crate::security::{AbuseThrottle, RequestGate};

/// Error type for startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("credential {index}: {source}")]
    Credential { index: usize, source: AuthError },

    #[error("no credentials configured")]
    NoCredentials,

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Build the request pipeline from configuration.
pub fn build_gateway(config: &GatewayConfig) -> Result<Gateway, StartupError> {
    let authenticators = config
        .auth
        .basic
        .iter()
        .enumerate()
        .map(|(index, credential)| {
            BasicAuthenticator::new(&credential.username, &credential.password)
                .map(|auth| Box::new(auth) as Box<dyn Authenticator>)
                .map_err(|source| StartupError::Credential { index, source })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if authenticators.is_empty() {
        return Err(StartupError::NoCredentials);
    }

    let chain = AuthenticationChain::new(authenticators);
    let throttle = Arc::new(AbuseThrottle::from_config(&config.throttle));
    let dispatcher = ModuleDispatcher::new(build_modules(&config.modules))?;

    tracing::info!(
        authenticators = chain.len(),
        modules = dispatcher.len(),
        failure_threshold = config.throttle.failure_threshold,
        block_duration_secs = config.throttle.block_duration_secs,
        "Gateway assembled"
    );

    Ok(Gateway::new(
        RequestGate::new(chain, throttle),
        dispatcher,
        config.transport.clone(),
    ))
}

/// Build the gateway and bind its listener.
pub async fn start(config: &GatewayConfig) -> Result<(HttpServer, Listener), StartupError> {
    let gateway = build_gateway(config)?;
    let listener = Listener::bind(&config.listener).await?;
    Ok((HttpServer::new(gateway, config), listener))
}
