//! Secure Upload Gateway Library
//!
//! An authenticated HTTP endpoint that hands uploads to pluggable
//! processing modules (GPG decryption out of the box), with a throttle
//! that silently drops clients after repeated failed logins.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod routing;

// Request processing
pub mod auth;
pub mod modules;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::GatewayConfig;
pub use http::{Gateway, HttpServer};
pub use lifecycle::Shutdown;
