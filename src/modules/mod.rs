//! Upload processing modules.
//!
//! # Data Flow
//! ```text
//! Admitted request
//!     → dispatcher.rs (offer to each module in order)
//!     → module (claims by path, processes, reports an outcome)
//!     → Success → 200 | Failure → 500 | nobody claimed → 404
//! ```
//!
//! # Design Decisions
//! - Modules report failures as outcomes, never as panics or errors
//! - Module I/O runs after admission, outside any throttle lock
//! - Module headers apply to its own 200/500 responses only

pub mod dispatcher;
pub mod gpg;

use futures_util::future::BoxFuture;

use crate::config::ModuleConfig;
use crate::http::response::HeaderSet;

pub use crate::http::request::{FormFields, RequestHead};
pub use dispatcher::{DispatchError, ModuleDispatcher, Submission};
pub use gpg::GpgModule;

/// Result reported by a module for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleOutcome {
    /// The module handled the request.
    Success(String),
    /// The module claimed the request but could not process it.
    Failure(String),
    /// The request is not for this module.
    NotApplicable,
}

/// Capability contract every upload module implements.
pub trait UploadModule: Send + Sync + std::fmt::Debug {
    /// Name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Headers attached to this module's success and failure responses.
    fn additional_headers(&self) -> &HeaderSet;

    fn handle_get<'a>(&'a self, request: &'a RequestHead) -> BoxFuture<'a, ModuleOutcome>;

    fn handle_post<'a>(
        &'a self,
        request: &'a RequestHead,
        fields: &'a FormFields,
    ) -> BoxFuture<'a, ModuleOutcome>;
}

/// Instantiate the configured modules, in order.
pub fn build_modules(configs: &[ModuleConfig]) -> Vec<Box<dyn UploadModule>> {
    configs
        .iter()
        .map(|config| match config {
            ModuleConfig::Gpg(gpg) => Box::new(GpgModule::from_config(gpg)) as Box<dyn UploadModule>,
        })
        .collect()
}
