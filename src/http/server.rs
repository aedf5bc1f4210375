//! HTTP server setup and request handling.
//!
//! # Responsibilities
//! - Accept connections from the bounded listener
//! - Drop connections from blocked addresses before serving them
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Run every request through the gate, then the module dispatcher
//! - Drain open connections on shutdown
//!
//! # Design Decisions
//! - Connections are served with hyper directly rather than `axum::serve`,
//!   so a blocked peer can be abandoned without any response
//! - A blocked request surfaces as a service error, which makes hyper
//!   close the connection unanswered
//! - HTTP/1.1 only: over HTTP/2 a service error resets just the stream,
//!   leaving a blocked peer's connection open

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{Method, Request, Response, StatusCode},
};
use hyper::{body::Incoming, server::conn::http1};
use hyper_util::{rt::TokioIo, service::TowerToHyperService};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{GatewayConfig, TransportConfig};
use crate::http::request::{decode_form, RequestHead};
use crate::http::response::ResponseDescriptor;
use crate::modules::{ModuleDispatcher, Submission};
use crate::net::{ConnectionTracker, Listener, ListenerError};
use crate::net::listener::ConnectionPermit;
use crate::observability::metrics;
use crate::security::{Admission, RequestGate};

/// Returned when a request must go unanswered.
#[derive(Debug, Error)]
#[error("connection dropped")]
pub struct ConnectionDropped;

/// The request pipeline: admission, decoding, dispatch, rendering.
#[derive(Debug)]
pub struct Gateway {
    gate: RequestGate,
    dispatcher: ModuleDispatcher,
    transport: TransportConfig,
}

impl Gateway {
    pub fn new(gate: RequestGate, dispatcher: ModuleDispatcher, transport: TransportConfig) -> Self {
        Self {
            gate,
            dispatcher,
            transport,
        }
    }

    pub fn gate(&self) -> &RequestGate {
        &self.gate
    }

    pub fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    /// Handle one request from `peer`.
    pub async fn handle(
        &self,
        request: Request<Body>,
        peer: IpAddr,
    ) -> Result<Response<Body>, ConnectionDropped> {
        let start = Instant::now();
        let source = peer.to_canonical().to_string();
        let method = request.method().clone();

        let descriptor = match self.gate.admit(&source, request.headers()) {
            Admission::Dropped => {
                metrics::record_dropped_connection();
                return Err(ConnectionDropped);
            }
            Admission::Rejected(challenge) => challenge,
            Admission::Admitted => self.serve(request, &source).await,
        };

        metrics::record_request(method.as_str(), descriptor.status().as_u16(), start);
        Ok(descriptor.render(&self.transport))
    }

    async fn serve(&self, request: Request<Body>, source: &str) -> ResponseDescriptor {
        let (parts, body) = request.into_parts();
        let head = RequestHead::from_parts(&parts, source);

        if head.method == Method::GET {
            return self.dispatcher.dispatch(&head, Submission::Get).await;
        }
        if head.method != Method::POST {
            tracing::debug!(method = %head.method, "Unsupported method");
            return ResponseDescriptor::transport_error(StatusCode::NOT_IMPLEMENTED, &self.transport);
        }

        match decode_form(Request::from_parts(parts, body)).await {
            Ok(fields) => {
                tracing::debug!(fields = fields.len(), "Decoded form body");
                self.dispatcher.dispatch(&head, Submission::Post(&fields)).await
            }
            Err(err) => {
                tracing::debug!(error = %err, path = %head.path, "Failed to decode request body");
                ResponseDescriptor::transport_error(err.status(), &self.transport)
            }
        }
    }
}

/// HTTP server for the upload gateway.
pub struct HttpServer {
    gateway: Arc<Gateway>,
    request_timeout: Duration,
    shutdown_grace: Duration,
    max_body_size: usize,
    tracker: ConnectionTracker,
}

impl HttpServer {
    pub fn new(gateway: Gateway, config: &GatewayConfig) -> Self {
        Self {
            gateway: Arc::new(gateway),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
            shutdown_grace: Duration::from_secs(config.timeouts.shutdown_grace_secs),
            max_body_size: config.transport.max_body_size,
            tracker: ConnectionTracker::new(),
        }
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Run the server until `shutdown` fires, then drain open connections.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        tracing::info!(
            address = ?listener.local_addr().ok(),
            "HTTP server starting"
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting");
                    break;
                }
                accepted = listener.accept() => {
                    let (stream, peer, permit) = match accepted {
                        Ok(accepted) => accepted,
                        Err(ListenerError::Accept(err)) => {
                            tracing::warn!(error = %err, "Failed to accept connection");
                            continue;
                        }
                        Err(err) => return Err(err),
                    };

                    let source = peer.ip().to_canonical().to_string();
                    if self.gateway.gate().is_blocked(&source) {
                        tracing::debug!(
                            peer_addr = %peer,
                            "Dropping connection from blocked address"
                        );
                        metrics::record_dropped_connection();
                        continue;
                    }

                    self.spawn_connection(stream, peer, permit, shutdown.resubscribe());
                }
            }
        }

        let active = self.tracker.active_count();
        if active > 0 {
            tracing::info!(active, "Waiting for connections to finish");
        }
        if tokio::time::timeout(self.shutdown_grace, self.tracker.wait_for_idle())
            .await
            .is_err()
        {
            tracing::warn!(
                remaining = self.tracker.active_count(),
                "Shutdown grace period elapsed with connections still open"
            );
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    #[allow(deprecated)]
    fn spawn_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        permit: ConnectionPermit,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let guard = self.tracker.track();
        let gateway = Arc::clone(&self.gateway);

        let service = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http().make_span_with(move |request: &Request<Incoming>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id,
                        peer_addr = %peer,
                    )
                }),
            )
            .layer(TimeoutLayer::new(self.request_timeout))
            .layer(DefaultBodyLimit::max(self.max_body_size))
            .service_fn(move |request: Request<Incoming>| {
                let gateway = Arc::clone(&gateway);
                async move {
                    gateway
                        .handle(request.map(Body::new), peer.ip().to_canonical())
                        .await
                }
            });

        tokio::spawn(async move {
            let _permit = permit;
            let connection = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), TowerToHyperService::new(service));
            tokio::pin!(connection);

            let result = tokio::select! {
                result = connection.as_mut() => result,
                _ = shutdown.recv() => {
                    connection.as_mut().graceful_shutdown();
                    connection.await
                }
            };

            if let Err(err) = result {
                tracing::debug!(
                    connection_id = %guard.id(),
                    peer_addr = %peer,
                    error = %err,
                    "Connection ended with error"
                );
            }
        });
    }
}
