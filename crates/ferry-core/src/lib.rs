//! # ferry-core
//!
//! Foundation types shared by every Ferry crate:
//!
//! - **Model**: canonical [`Task`], [`Contact`], [`Message`], [`TargetDepartment`]
//!   and [`UserSummary`] records, independent of backend wire quirks
//! - **Normalization**: total mapping functions from loosely-typed JSON payloads
//!   into the model (see [`normalize`])
//! - **Logging**: `tracing` subscriber bootstrap

#![deny(unsafe_code)]

pub mod logging;
pub mod model;
pub mod normalize;

pub use model::{
    Comment, Contact, Message, Priority, Step, TargetDepartment, Task, TaskFile, TaskId,
    TaskStatus, UserSummary,
};
pub use normalize::{
    normalize_priority, normalize_read_state, normalize_targets, sort_messages,
};
