//! # Tombola Testing
//!
//! Testing utilities and helpers for the Tombola event-lottery architecture.
//!
//! This crate provides:
//! - Mock implementations of the environment traits (`Clock`, `Sampler`,
//!   `SnapshotStore`, `Notifier`)
//! - The [`ReducerTest`] Given/When/Then harness and effect assertions
//!
//! ## Example
//!
//! ```ignore
//! use tombola_testing::{ReducerTest, mocks};
//!
//! ReducerTest::new(EnrollmentReducer::new())
//!     .with_env(test_environment())
//!     .given_state(EnrollmentState::new())
//!     .when_action(EnrollmentAction::RunDraw { event_id })
//!     .then_state(|state| assert!(state.last_error.is_none()))
//!     .run();
//! ```

mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of the environment traits.
pub mod mocks {
    use chrono::{DateTime, Utc};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex, PoisonError};
    use tombola_core::document::{DocumentId, Version};
    use tombola_core::environment::{Clock, Sampler};
    use tombola_core::notify::{Notification, Notifier, NotifyError};
    use tombola_core::snapshot::{Snapshot, SnapshotError, SnapshotStore};

    /// Fixed clock for deterministic tests.
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use tombola_testing::mocks::FixedClock;
    /// use tombola_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time.
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC).
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which should never
    /// happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Sampler that always picks the lowest indices.
    ///
    /// `sample(10, 3)` returns `[0, 1, 2]`. Useful when a test needs to know
    /// exactly who gets drawn.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct FirstSampler;

    impl Sampler for FirstSampler {
        fn sample(&self, population: usize, amount: usize) -> Vec<usize> {
            (0..amount.min(population)).collect()
        }
    }

    /// Seeded sampler for reproducible-but-random draws.
    ///
    /// Same seed, same sequence of samples. Distribution is identical to the
    /// production sampler (`rand::seq::index::sample`).
    #[derive(Debug)]
    pub struct SeededSampler {
        rng: Mutex<StdRng>,
    }

    impl SeededSampler {
        /// Create a sampler from a fixed seed.
        #[must_use]
        pub fn new(seed: u64) -> Self {
            Self {
                rng: Mutex::new(StdRng::seed_from_u64(seed)),
            }
        }
    }

    impl Sampler for SeededSampler {
        fn sample(&self, population: usize, amount: usize) -> Vec<usize> {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            rand::seq::index::sample(&mut *rng, population, amount.min(population)).into_vec()
        }
    }

    /// In-memory snapshot store with full optimistic-concurrency semantics.
    ///
    /// Behaves exactly like a production document store for version checks:
    /// a never-saved document is at version 0, every save bumps the version,
    /// and a mismatched `expected_version` fails with
    /// [`SnapshotError::ConcurrencyConflict`].
    #[derive(Debug, Clone, Default)]
    pub struct InMemorySnapshotStore {
        documents: Arc<Mutex<HashMap<DocumentId, Snapshot>>>,
    }

    impl InMemorySnapshotStore {
        /// Create an empty store.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Current version of a document, if it has ever been saved.
        #[must_use]
        pub fn version_of(&self, document: &DocumentId) -> Option<Version> {
            self.documents
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(document)
                .map(|snapshot| snapshot.version)
        }

        /// Number of documents stored.
        #[must_use]
        pub fn len(&self) -> usize {
            self.documents
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }

        /// Whether the store is empty.
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    impl SnapshotStore for InMemorySnapshotStore {
        fn load(
            &self,
            document: DocumentId,
        ) -> Pin<Box<dyn Future<Output = Result<Option<Snapshot>, SnapshotError>> + Send + '_>>
        {
            let snapshot = self
                .documents
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&document)
                .cloned();
            Box::pin(async move { Ok(snapshot) })
        }

        fn save(
            &self,
            document: DocumentId,
            expected_version: Option<Version>,
            state: Vec<u8>,
        ) -> Pin<Box<dyn Future<Output = Result<Version, SnapshotError>> + Send + '_>> {
            let result = {
                let mut documents = self
                    .documents
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);

                let current = documents
                    .get(&document)
                    .map_or_else(Version::default, |snapshot| snapshot.version);

                match expected_version {
                    Some(expected) if expected != current => {
                        Err(SnapshotError::ConcurrencyConflict {
                            document,
                            expected,
                            actual: current,
                        })
                    },
                    _ => {
                        let next = current.next();
                        documents.insert(document, Snapshot::new(next, state));
                        Ok(next)
                    },
                }
            };
            Box::pin(async move { result })
        }
    }

    /// Notifier that records every delivered batch.
    ///
    /// Flip `set_failing(true)` to make deliveries fail, for testing error
    /// feedback paths.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingNotifier {
        sent: Arc<Mutex<Vec<Notification>>>,
        failing: Arc<AtomicBool>,
    }

    impl RecordingNotifier {
        /// Create a notifier that accepts everything.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// All notifications delivered so far, in delivery order.
        #[must_use]
        pub fn delivered(&self) -> Vec<Notification> {
            self.sent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Notifications of a given kind delivered so far.
        #[must_use]
        pub fn delivered_of_kind(&self, kind: &str) -> Vec<Notification> {
            self.delivered()
                .into_iter()
                .filter(|n| n.kind == kind)
                .collect()
        }

        /// Make subsequent deliveries fail (or succeed again).
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    impl Notifier for RecordingNotifier {
        fn deliver(
            &self,
            batch: Vec<Notification>,
        ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + '_>> {
            let result = if self.failing.load(Ordering::SeqCst) {
                Err(NotifyError::Unavailable("recording notifier set to fail".to_string()))
            } else {
                self.sent
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend(batch);
                Ok(())
            };
            Box::pin(async move { result })
        }
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
