//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → startup builds auth chain, throttle and modules from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Secrets are redacted from Debug output

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AuthConfig, BasicCredentialConfig, GatewayConfig, GpgModuleConfig, ListenerConfig, LogFormat,
    ModuleConfig, ObservabilityConfig, ThrottleConfig, TimeoutConfig, TransportConfig,
};
pub use validation::{validate_config, ValidationError};
