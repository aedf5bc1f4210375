//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper connection, middleware, admission)
//!     → request.rs (request head, form decoding)
//!     → [module dispatcher picks a module]
//!     → response.rs (default headers, suppression, rendering)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{decode_form, DecodeError, FormFields, RequestHead};
pub use response::{HeaderSet, ResponseBody, ResponseDescriptor};
pub use server::{ConnectionDropped, Gateway, HttpServer};
