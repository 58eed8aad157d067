//! # ferry-auth
//!
//! Session state for the Ferry client.
//!
//! - [`SessionGate`]: token presence, persistence, and forced logout
//! - [`UnauthorizedBus`]: synchronous fan-out of "unauthorized" events to the
//!   current subscribers
//! - [`CredentialStore`]: key/value persistence for session keys, with an
//!   in-memory and a JSON-file implementation
//!
//! The bus is owned by the application's composition root and injected into
//! the gate; nothing here is ambient global state.

#![deny(unsafe_code)]

pub mod bus;
pub mod errors;
pub mod gate;
pub mod storage;

pub use bus::{Subscription, UnauthorizedBus};
pub use errors::AuthError;
pub use gate::{DEFAULT_UNAUTHORIZED_REASON, SessionGate};
pub use storage::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, SESSION_KEYS, TOKEN_KEY,
};
