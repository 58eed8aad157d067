//! # ferry-client
//!
//! Authenticated REST access to the task and chat backend.
//!
//! - [`ApiClient`]: one typed method per endpoint, normalized results
//! - [`Transport`]: the network seam; [`ReqwestTransport`] in production,
//!   [`testing::ScriptedTransport`] in tests
//! - [`ApiError`]: status classification (unauthorized, HTTP, application,
//!   transport)
//!
//! A 401 or 403 from any call is routed to the [`ferry_auth::SessionGate`]
//! before the error is returned.

#![deny(unsafe_code)]

pub mod client;
pub mod errors;
pub mod mime;
pub mod testing;
pub mod transport;

pub use client::{ApiClient, ContactList, FileUpload, NewTask};
pub use errors::{ApiError, ApiResult, TransportError};
pub use mime::guess_mime;
pub use transport::{
    FormPart, HttpRequest, HttpResponse, Method, RequestBody, ReqwestTransport, Transport,
};
