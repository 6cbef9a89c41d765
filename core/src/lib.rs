//! # Tombola Core
//!
//! Core traits and types for the Tombola event-lottery architecture.
//!
//! This crate provides the fundamental abstractions for building the lottery
//! backend as a functional core with an imperative shell:
//!
//! - **State**: domain state for an aggregate, owned and `Clone`-able
//! - **Action**: all possible inputs to a reducer (commands and events)
//! - **Reducer**: pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: side-effect *descriptions* (persistence, notification
//!   delivery), never side-effect execution
//! - **Environment**: injected dependencies behind traits ([`Clock`],
//!   [`Sampler`], [`SnapshotStore`], [`Notifier`])
//!
//! The reducer never performs I/O. Persistence and notification dispatch are
//! returned as [`Effect`](effect::Effect) values and executed by the runtime
//! store, or by a service layer that drives the same collaborator traits
//! directly. Every state transition is therefore a pure function of the
//! current snapshot plus an intent, which is what makes the
//! optimistic-concurrency reload-and-retry loop in the service layer sound.
//!
//! [`Clock`]: environment::Clock
//! [`Sampler`]: environment::Sampler
//! [`SnapshotStore`]: snapshot::SnapshotStore
//! [`Notifier`]: notify::Notifier

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

pub mod document;
pub mod effect;
mod effect_macros;
pub mod environment;
pub mod notify;
pub mod reducer;
pub mod snapshot;
