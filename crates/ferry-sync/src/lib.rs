//! # ferry-sync
//!
//! The client-side engine: optimistic mutations, adaptive polling, and the
//! headless controllers that drive the task and chat screens.
//!
//! - [`apply_optimistic`]: snapshot, patch, confirm, then reconcile or roll
//!   back, behind a per-kind [`SingleFlight`] guard
//! - [`AdaptivePoller`]: STOPPED / RUNNING / PAUSED refresh loop per list view
//! - [`TaskBoard`], [`ChatList`], [`ChatRoom`]: view state and operations
//! - [`FerryApp`]: composition root and forced-logout handling

#![deny(unsafe_code)]

pub mod app;
pub mod board;
pub mod chat_list;
pub mod chat_room;
pub mod errors;
pub mod flight;
pub mod navigation;
pub mod optimistic;
pub mod poller;

#[cfg(test)]
mod test_support;

pub use app::FerryApp;
pub use board::{BoardSection, TaskBoard, TaskDraft, TaskLists};
pub use chat_list::ChatList;
pub use chat_room::ChatRoom;
pub use errors::SyncError;
pub use flight::{FlightGuard, SingleFlight};
pub use navigation::{Navigator, Screen};
pub use optimistic::{MutationOutcome, apply_optimistic};
pub use poller::{AdaptivePoller, FetchMode, PollEvent, PollState, PollTarget};
