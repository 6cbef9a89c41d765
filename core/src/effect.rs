//! Effect descriptions returned by reducers.
//!
//! Effects are values describing side effects, not their execution. A reducer
//! returns effects; the runtime store (or a service layer) executes them and
//! feeds any resulting actions back into the reducer. This split keeps the
//! business logic pure and the I/O observable.

use crate::document::{DocumentId, Version};
use crate::notify::{Notification, Notifier, NotifyError};
use crate::snapshot::{Snapshot, SnapshotError, SnapshotStore};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Completion callback carried inside an effect: consumes the operation's
/// result and optionally produces a feedback action.
pub type Callback<Input, Action> = Box<dyn FnOnce(Input) -> Option<Action> + Send>;

/// Effect type - describes a side effect to be executed.
///
/// Effects are NOT executed immediately. They are descriptions of what should
/// happen, returned from reducers and executed by the Store runtime.
///
/// # Type Parameters
///
/// - `Action`: the action type that effects can produce (feedback loop)
pub enum Effect<Action> {
    /// No-op effect.
    None,

    /// Run effects in parallel.
    Parallel(Vec<Effect<Action>>),

    /// Run effects sequentially, stopping at nothing: every effect runs even
    /// if an earlier one produced an error feedback action.
    Sequential(Vec<Effect<Action>>),

    /// Delayed action (for timeouts, retries).
    Delay {
        /// How long to wait.
        duration: Duration,
        /// Action to dispatch after the delay.
        action: Box<Action>,
    },

    /// Arbitrary async computation.
    ///
    /// Returns `Option<Action>` - if `Some`, the action is fed back into the
    /// reducer.
    Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

    /// A snapshot-store operation (persist or load aggregate state).
    Snapshot(SnapshotOperation<Action>),

    /// A notification delivery operation.
    Notify(NotifyOperation<Action>),
}

/// Snapshot-store operations carried inside [`Effect::Snapshot`].
pub enum SnapshotOperation<Action> {
    /// Save aggregate state with an expected-version check.
    Save {
        /// The store to save into.
        store: Arc<dyn SnapshotStore>,
        /// The document to save.
        document: DocumentId,
        /// Expected current version (`None` skips the check).
        expected_version: Option<Version>,
        /// Serialized aggregate state.
        state: Vec<u8>,
        /// Called with the new version on success.
        on_success: Callback<Version, Action>,
        /// Called with the error on failure (including concurrency
        /// conflicts).
        on_error: Callback<SnapshotError, Action>,
    },

    /// Load the current snapshot of a document.
    Load {
        /// The store to load from.
        store: Arc<dyn SnapshotStore>,
        /// The document to load.
        document: DocumentId,
        /// Called with the snapshot (`None` for a never-saved document).
        on_success: Callback<Option<Snapshot>, Action>,
        /// Called with the error on failure.
        on_error: Callback<SnapshotError, Action>,
    },
}

/// Notification delivery operation carried inside [`Effect::Notify`].
pub struct NotifyOperation<Action> {
    /// The delivery collaborator.
    pub notifier: Arc<dyn Notifier>,
    /// The batch to deliver.
    pub notifications: Vec<Notification>,
    /// Called on successful hand-off.
    pub on_success: Callback<(), Action>,
    /// Called with the error on failure.
    pub on_error: Callback<NotifyError, Action>,
}

// Manual Debug implementations since futures and callbacks don't implement
// Debug.
impl<Action> std::fmt::Debug for Effect<Action>
where
    Action: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::None => write!(f, "Effect::None"),
            Effect::Parallel(effects) => f.debug_tuple("Effect::Parallel").field(effects).finish(),
            Effect::Sequential(effects) => {
                f.debug_tuple("Effect::Sequential").field(effects).finish()
            },
            Effect::Delay { duration, action } => f
                .debug_struct("Effect::Delay")
                .field("duration", duration)
                .field("action", action)
                .finish(),
            Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            Effect::Snapshot(op) => f.debug_tuple("Effect::Snapshot").field(op).finish(),
            Effect::Notify(op) => f.debug_tuple("Effect::Notify").field(op).finish(),
        }
    }
}

impl<Action> std::fmt::Debug for SnapshotOperation<Action> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotOperation::Save {
                document,
                expected_version,
                state,
                ..
            } => f
                .debug_struct("SnapshotOperation::Save")
                .field("document", document)
                .field("expected_version", expected_version)
                .field("state_len", &state.len())
                .finish_non_exhaustive(),
            SnapshotOperation::Load { document, .. } => f
                .debug_struct("SnapshotOperation::Load")
                .field("document", document)
                .finish_non_exhaustive(),
        }
    }
}

impl<Action> std::fmt::Debug for NotifyOperation<Action> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyOperation")
            .field("notifications", &self.notifications)
            .finish_non_exhaustive()
    }
}

impl<Action> Effect<Action> {
    /// Combine effects to run in parallel.
    #[must_use]
    pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
        Effect::Parallel(effects)
    }

    /// Chain effects to run sequentially.
    #[must_use]
    pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
        Effect::Sequential(effects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug)]
    enum TestAction {
        Tick,
    }

    #[test]
    fn debug_formatting_is_stable() {
        let effect: Effect<TestAction> = Effect::None;
        assert_eq!(format!("{effect:?}"), "Effect::None");

        let delay = Effect::Delay {
            duration: Duration::from_secs(1),
            action: Box::new(TestAction::Tick),
        };
        assert!(format!("{delay:?}").contains("Effect::Delay"));
    }

    #[test]
    fn merge_builds_parallel() {
        let merged: Effect<TestAction> = Effect::merge(vec![Effect::None, Effect::None]);
        assert!(matches!(merged, Effect::Parallel(ref inner) if inner.len() == 2));
    }

    #[test]
    fn chain_builds_sequential() {
        let chained: Effect<TestAction> = Effect::chain(vec![Effect::None]);
        assert!(matches!(chained, Effect::Sequential(ref inner) if inner.len() == 1));
    }
}
