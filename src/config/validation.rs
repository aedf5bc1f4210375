//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject configurations that would serve an open or useless gateway
//! - Validate value ranges and address formats
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

use crate::auth::{AuthError, CredentialVerifier};
use crate::config::schema::{GatewayConfig, ModuleConfig};

/// One semantic problem in a configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("auth: no credentials configured")]
    NoCredentials,

    #[error("auth.basic[{index}]: {source}")]
    Credential { index: usize, source: AuthError },

    #[error("modules: at least one upload module is required")]
    NoModules,

    #[error("modules[{index}]: passphrase must not be empty")]
    EmptyPassphrase { index: usize },

    #[error("modules[{index}]: timeout_secs must be at least 1")]
    ZeroModuleTimeout { index: usize },

    #[error("throttle.failure_threshold must be at least 1")]
    ZeroThreshold,

    #[error("throttle.block_duration_secs must be at least 1")]
    ZeroBlockDuration,

    #[error("{field}: '{value}' is not an IP address")]
    InvalidIp { field: &'static str, value: String },

    #[error("{field}: '{value}' is not a socket address")]
    InvalidSocketAddr { field: &'static str, value: String },

    #[error("listener.max_connections must be at least 1")]
    ZeroConnections,
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidSocketAddr {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroConnections);
    }

    if config.auth.basic.is_empty() {
        errors.push(ValidationError::NoCredentials);
    }
    for (index, credential) in config.auth.basic.iter().enumerate() {
        if let Err(source) = CredentialVerifier::new(&credential.username, &credential.password) {
            errors.push(ValidationError::Credential { index, source });
        }
    }

    if config.throttle.failure_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold);
    }
    if config.throttle.block_duration_secs == 0 {
        errors.push(ValidationError::ZeroBlockDuration);
    }
    let lists = [
        ("throttle.allow", &config.throttle.allow),
        ("throttle.deny", &config.throttle.deny),
    ];
    for (field, entries) in lists {
        for value in entries {
            if value.parse::<IpAddr>().is_err() {
                errors.push(ValidationError::InvalidIp {
                    field,
                    value: value.clone(),
                });
            }
        }
    }

    if config.modules.is_empty() {
        errors.push(ValidationError::NoModules);
    }
    for (index, module) in config.modules.iter().enumerate() {
        match module {
            ModuleConfig::Gpg(gpg) => {
                if gpg.passphrase.is_empty() {
                    errors.push(ValidationError::EmptyPassphrase { index });
                }
                if gpg.timeout_secs == 0 {
                    errors.push(ValidationError::ZeroModuleTimeout { index });
                }
            }
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidSocketAddr {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{BasicCredentialConfig, GpgModuleConfig};

    fn valid() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.auth.basic.push(BasicCredentialConfig {
            username: "user".into(),
            password: "pass".into(),
        });
        config.modules.push(ModuleConfig::Gpg(GpgModuleConfig {
            passphrase: "secret".into(),
            ..GpgModuleConfig::default()
        }));
        config
    }

    #[test]
    fn accepts_minimal_valid_config() {
        assert_eq!(validate_config(&valid()), Ok(()));
    }

    #[test]
    fn default_config_is_not_servable() {
        let errors = validate_config(&GatewayConfig::default()).unwrap_err();
        assert!(errors.contains(&ValidationError::NoCredentials));
        assert!(errors.contains(&ValidationError::NoModules));
    }

    #[test]
    fn reports_every_problem() {
        let mut config = valid();
        config.throttle.failure_threshold = 0;
        config.throttle.block_duration_secs = 0;
        config.throttle.deny.push("not-an-ip".into());
        config.auth.basic.push(BasicCredentialConfig {
            username: "a:b".into(),
            password: "x".into(),
        });
        config.listener.bind_address = "nowhere".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::Credential {
            index: 1,
            source: AuthError::SeparatorInIdentity,
        }));
        assert!(errors.contains(&ValidationError::InvalidIp {
            field: "throttle.deny",
            value: "not-an-ip".into(),
        }));
    }

    #[test]
    fn rejects_empty_passphrase() {
        let mut config = valid();
        config.modules.push(ModuleConfig::Gpg(GpgModuleConfig::default()));
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::EmptyPassphrase { index: 1 }])
        );
    }
}
