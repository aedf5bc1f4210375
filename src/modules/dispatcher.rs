//! Ordered module dispatch.
//!
//! Offers an admitted request to each configured module in turn and turns
//! the first claiming module's outcome into a response.

use axum::http::StatusCode;
use thiserror::Error;

use super::{FormFields, ModuleOutcome, RequestHead, UploadModule};
use crate::http::response::{ResponseBody, ResponseDescriptor};
use crate::observability::metrics;

/// Body of the 404 sent when no module claims a request.
pub const NOT_FOUND_MESSAGE: &str = "Invalid request or the required module is not enabled";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("the module dispatcher needs at least one upload module")]
    NoModules,
}

/// How the request is being submitted.
#[derive(Debug, Clone, Copy)]
pub enum Submission<'a> {
    Get,
    Post(&'a FormFields),
}

/// Non-empty, ordered list of modules.
#[derive(Debug)]
pub struct ModuleDispatcher {
    modules: Vec<Box<dyn UploadModule>>,
}

impl ModuleDispatcher {
    pub fn new(modules: Vec<Box<dyn UploadModule>>) -> Result<Self, DispatchError> {
        if modules.is_empty() {
            return Err(DispatchError::NoModules);
        }
        Ok(Self { modules })
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub async fn dispatch(
        &self,
        request: &RequestHead,
        submission: Submission<'_>,
    ) -> ResponseDescriptor {
        for module in &self.modules {
            let outcome = match submission {
                Submission::Get => module.handle_get(request).await,
                Submission::Post(fields) => module.handle_post(request, fields).await,
            };

            let (status, message) = match outcome {
                ModuleOutcome::NotApplicable => continue,
                ModuleOutcome::Success(message) => (StatusCode::OK, message),
                ModuleOutcome::Failure(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
            };

            let label = if status.is_success() { "success" } else { "failure" };
            metrics::record_module_outcome(module.name(), label);
            tracing::info!(
                module = module.name(),
                client = %request.source,
                path = %request.path,
                outcome = label,
                "Module handled request"
            );

            return ResponseDescriptor::new(status)
                .with_headers(module.additional_headers())
                .with_body(ResponseBody::Text(message));
        }

        metrics::record_module_outcome("none", "not_applicable");
        tracing::debug!(path = %request.path, "No module claimed request");
        ResponseDescriptor::new(StatusCode::NOT_FOUND)
            .with_body(ResponseBody::text(NOT_FOUND_MESSAGE))
    }
}
