//! # Tombola Runtime
//!
//! Runtime implementation for the Tombola event-lottery architecture.
//!
//! This crate provides the [`Store`](store::Store) runtime that coordinates
//! reducer execution and effect handling:
//!
//! - **Store**: owns aggregate state behind a lock, serializes reducer
//!   execution per store (the per-event mutual exclusion the concurrency
//!   model requires), and executes effects in background tasks
//! - **Effect execution**: runs effect descriptions and feeds resulting
//!   actions back into the reducer
//! - **Retry**: exponential-backoff helpers used by service layers to retry
//!   snapshot concurrency conflicts
//!
//! ## Example
//!
//! ```ignore
//! use tombola_runtime::store::Store;
//!
//! let store = Store::new(initial_state, reducer, environment);
//!
//! let mut handle = store.send(EnrollmentAction::RunDraw { event_id }).await?;
//! handle.wait().await; // persistence + notification effects are done
//!
//! let invited = store.state(|s| s.roster(&event_id).map(EventRoster::invited_count)).await;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;

/// Retry logic with exponential backoff
pub mod retry;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// An effect execution failed
        ///
        /// This error is logged but does not halt the store.
        /// Effects are fire-and-forget operations.
        #[error("Effect execution failed: {0}")]
        EffectFailed(String),

        /// A task join error occurred during effect execution
        ///
        /// This typically means a spawned task panicked.
        #[error("Task failed during effect execution: {0}")]
        TaskJoinError(#[from] tokio::task::JoinError),

        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),
    }
}

pub use error::StoreError;
pub use retry::RetryPolicy;

/// Handle for tracking effect completion
///
/// Returned by [`store::Store::send()`] to allow waiting for the effects of
/// an action to complete.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(Action::Start).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// // All effects from Action::Start are now complete
/// ```
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a new handle plus the tracking half used by effect execution.
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: tx,
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    ///
    /// Useful for initialization in loops where you need a `last_handle`.
    #[must_use]
    pub fn completed() -> Self {
        let (tx, rx) = watch::channel(());
        let _ = tx.send(());

        Self {
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Wait for all effects to complete
    ///
    /// Blocks until the effect counter reaches zero.
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            let _ = self.completion.changed().await;
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns `Err(())` if the timeout expires before all effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), ()> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| ())
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: effect tracking context shared between a handle and the tasks
/// executing its effects.
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl EffectTracking {
    /// Increment the effect counter (effect started)
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the effect counter (effect completed)
    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            let _ = self.notifier.send(());
        }
    }
}

impl Clone for EffectTracking {
    fn clone(&self) -> Self {
        Self {
            counter: Arc::clone(&self.counter),
            notifier: self.notifier.clone(),
        }
    }
}

/// Internal: RAII guard that decrements the effect counter on drop
///
/// Ensures the effect counter is always decremented, even if the effect
/// panics.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store module - the runtime for reducers
pub mod store {
    use super::{
        Arc, AtomicCounterGuard, AtomicUsize, DecrementGuard, Duration, EffectHandle,
        EffectTracking, Ordering, StoreError,
    };
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::RwLock;
    use tombola_core::effect::{Effect, NotifyOperation, SnapshotOperation};
    use tombola_core::reducer::Reducer;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with action feedback loop)
    ///
    /// # Concurrency
    ///
    /// The reducer runs while holding the state write lock, so all actions
    /// against one store are serialized. This is the single
    /// mutual-exclusion point that keeps an event's four membership lists
    /// consistent: a reader can never observe an entrant in two lists or in
    /// none mid-transition. Effects execute asynchronously after the lock is
    /// released and never touch state except through feedback actions.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
            }
        }
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
        A: Send + 'static,
        S: Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// Read state through a closure
        ///
        /// The closure runs while holding the read lock; keep it short and
        /// return owned data.
        pub async fn state<T>(&self, read: impl FnOnce(&S) -> T) -> T {
            let state = self.state.read().await;
            read(&state)
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the write lock on state
        /// 2. Calls the reducer with (state, action, environment)
        /// 3. Executes returned effects in background tasks
        /// 4. Effects may produce more actions (feedback loop)
        ///
        /// Returns an [`EffectHandle`] that can be awaited for effect
        /// completion; `send()` itself returns after *starting* effect
        /// execution.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is
        /// shutting down.
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            if self.shutdown.load(Ordering::Acquire) {
                return Err(StoreError::ShutdownInProgress);
            }

            let effects = {
                let mut state = self.state.write().await;
                self.reducer.reduce(&mut state, action, &self.environment)
            };

            metrics::counter!("store.actions").increment(1);

            let (handle, tracking) = EffectHandle::new();
            for effect in effects {
                self.spawn_effect(effect, &tracking);
            }

            Ok(handle)
        }

        /// Initiate graceful shutdown of the store
        ///
        /// Sets the shutdown flag (rejecting new actions), then waits for
        /// pending effects to complete.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires
        /// before all pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(100);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(pending_effects = pending, "Shutdown timeout");
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Whether shutdown has been initiated
        #[must_use]
        pub fn is_shutting_down(&self) -> bool {
            self.shutdown.load(Ordering::Acquire)
        }

        /// Send a feedback action produced by an effect, discarding its
        /// handle. Rejected sends during shutdown are logged and dropped.
        async fn feedback(&self, action: A) {
            if let Err(error) = self.send(action).await {
                tracing::warn!(%error, "Dropping feedback action");
            }
        }

        fn spawn_effect(&self, effect: Effect<A>, tracking: &EffectTracking) {
            tracking.increment();
            self.pending_effects.fetch_add(1, Ordering::SeqCst);

            let store = self.clone();
            let tracking = tracking.clone();
            let pending = Arc::clone(&self.pending_effects);

            tokio::spawn(async move {
                let _tracking_guard = DecrementGuard(tracking);
                let _pending_guard = AtomicCounterGuard(pending);
                execute_effect(store, effect).await;
            });
        }
    }

    /// Execute one effect tree, feeding produced actions back into the store.
    ///
    /// Boxed because the future recurses through `Parallel`/`Sequential`.
    fn execute_effect<S, A, E, R>(
        store: Store<S, A, E, R>,
        effect: Effect<A>,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
        A: Send + 'static,
        S: Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        Box::pin(async move {
            match effect {
                Effect::None => {},
                Effect::Parallel(effects) => {
                    futures::future::join_all(
                        effects
                            .into_iter()
                            .map(|e| execute_effect(store.clone(), e)),
                    )
                    .await;
                },
                Effect::Sequential(effects) => {
                    for e in effects {
                        execute_effect(store.clone(), e).await;
                    }
                },
                Effect::Delay { duration, action } => {
                    tokio::time::sleep(duration).await;
                    store.feedback(*action).await;
                },
                Effect::Future(future) => {
                    if let Some(action) = future.await {
                        store.feedback(action).await;
                    }
                },
                Effect::Snapshot(SnapshotOperation::Save {
                    store: snapshots,
                    document,
                    expected_version,
                    state,
                    on_success,
                    on_error,
                }) => {
                    let outcome = snapshots.save(document, expected_version, state).await;
                    let feedback = match outcome {
                        Ok(version) => on_success(version),
                        Err(error) => {
                            metrics::counter!("store.effects.snapshot_failed").increment(1);
                            tracing::warn!(%error, "Snapshot save failed");
                            on_error(error)
                        },
                    };
                    if let Some(action) = feedback {
                        store.feedback(action).await;
                    }
                },
                Effect::Snapshot(SnapshotOperation::Load {
                    store: snapshots,
                    document,
                    on_success,
                    on_error,
                }) => {
                    let outcome = snapshots.load(document).await;
                    let feedback = match outcome {
                        Ok(snapshot) => on_success(snapshot),
                        Err(error) => {
                            metrics::counter!("store.effects.snapshot_failed").increment(1);
                            tracing::warn!(%error, "Snapshot load failed");
                            on_error(error)
                        },
                    };
                    if let Some(action) = feedback {
                        store.feedback(action).await;
                    }
                },
                Effect::Notify(NotifyOperation {
                    notifier,
                    notifications,
                    on_success,
                    on_error,
                }) => {
                    let count = notifications.len();
                    let outcome = notifier.deliver(notifications).await;
                    let feedback = match outcome {
                        Ok(()) => {
                            tracing::debug!(count, "Notification batch delivered");
                            on_success(())
                        },
                        Err(error) => {
                            metrics::counter!("store.effects.notify_failed").increment(1);
                            tracing::warn!(%error, "Notification delivery failed");
                            on_error(error)
                        },
                    };
                    if let Some(action) = feedback {
                        store.feedback(action).await;
                    }
                },
            }
        })
    }
}
