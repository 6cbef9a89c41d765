//! Enrollment command handler with optimistic-concurrency retry.
//!
//! The service is the imperative shell around the aggregate: it loads the
//! current snapshot, executes one command against it, saves the result with
//! the loaded version as the expected version, and hands the produced
//! notifications to the notifier once the save has stuck. A save that loses
//! a concurrency race is recomputed from a freshly loaded snapshot and
//! retried under the configured policy; business rejections are returned
//! immediately, never retried.

use crate::aggregates::enrollment::{EnrollmentAction, EnrollmentState, execute_command};
use crate::error::LotteryError;
use crate::types::{Entrant, EntrantId, EventId};
use std::sync::Arc;
use thiserror::Error;
use tombola_core::document::DocumentId;
use tombola_core::environment::{Clock, Sampler};
use tombola_core::notify::{Notification, Notifier};
use tombola_core::snapshot::{SnapshotError, SnapshotStore};
use tombola_runtime::retry::{RetryPolicy, retry_with_predicate};

/// Errors surfaced by the enrollment service.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The command violated a business rule; state is unchanged. Map the
    /// inner error to user-facing copy at the API edge, do not retry.
    #[error("command rejected: {0}")]
    Rejected(#[from] LotteryError),

    /// The snapshot store failed. Concurrency conflicts are retried
    /// internally; what escapes here is either a persistent conflict storm
    /// or a backend failure.
    #[error("snapshot store error: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// What a successfully handled command changed.
#[derive(Clone, Debug, PartialEq)]
pub enum EnrollmentOutcome {
    /// An enrollment roster was created.
    Opened {
        /// The published event
        event_id: EventId,
    },
    /// The entrant is now on the waiting list.
    Joined {
        /// The event
        event_id: EventId,
        /// The entrant
        entrant_id: EntrantId,
    },
    /// The entrant left the waiting list.
    Left {
        /// The event
        event_id: EventId,
        /// The entrant
        entrant_id: EntrantId,
    },
    /// The draw invited this selection.
    Drawn {
        /// The event
        event_id: EventId,
        /// Who was invited
        selected: Vec<Entrant>,
    },
    /// The invitation was accepted; the seat is confirmed.
    Accepted {
        /// The event
        event_id: EventId,
        /// The entrant
        entrant_id: EntrantId,
    },
    /// The invitation was declined.
    Declined {
        /// The event
        event_id: EventId,
        /// The entrant
        entrant_id: EntrantId,
    },
    /// Invitations were revoked and backfilled.
    Replaced {
        /// The event
        event_id: EventId,
        /// Newly cancelled invitees
        cancelled: Vec<Entrant>,
        /// Replacements drawn from the waiting list
        backfilled: Vec<Entrant>,
    },
    /// The command was valid but changed nothing (an idempotent re-accept,
    /// a draw with nothing to invite).
    NoChange,
}

/// Command handler for the enrollment aggregate.
///
/// Safe to share across tasks behind an `Arc`; each `handle` call is an
/// independent load → execute → save round.
pub struct EnrollmentService {
    snapshot_store: Arc<dyn SnapshotStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    sampler: Arc<dyn Sampler>,
    document: DocumentId,
    retry_policy: RetryPolicy,
}

impl EnrollmentService {
    /// Create a service with the default retry policy.
    #[must_use]
    pub fn new(
        snapshot_store: Arc<dyn SnapshotStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        sampler: Arc<dyn Sampler>,
        document: DocumentId,
    ) -> Self {
        Self {
            snapshot_store,
            notifier,
            clock,
            sampler,
            document,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Override the conflict-retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Handle one enrollment command.
    ///
    /// Returns the delta the command produced so the caller can render it.
    /// Notifications are handed to the notifier only after the new snapshot
    /// has been saved; a delivery failure is logged and never rolls the
    /// transition back.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Rejected`] for business-rule violations
    /// - [`ServiceError::Snapshot`] when the store fails or the conflict
    ///   retries are exhausted
    pub async fn handle(
        &self,
        command: EnrollmentAction,
    ) -> Result<EnrollmentOutcome, ServiceError> {
        let (outcome, notifications) = retry_with_predicate(
            self.retry_policy.clone(),
            || self.attempt(command.clone()),
            |error| {
                matches!(
                    error,
                    ServiceError::Snapshot(SnapshotError::ConcurrencyConflict { .. })
                )
            },
        )
        .await?;

        if !notifications.is_empty() {
            if let Err(error) = self.notifier.deliver(notifications).await {
                tracing::warn!(%error, "notification delivery failed after persisted transition");
            }
        }

        Ok(outcome)
    }

    /// One load → execute → save round.
    async fn attempt(
        &self,
        command: EnrollmentAction,
    ) -> Result<(EnrollmentOutcome, Vec<Notification>), ServiceError> {
        let mut state = match self.snapshot_store.load(self.document.clone()).await? {
            Some(snapshot) => {
                let mut state = EnrollmentState::decode(&snapshot.data)?;
                state.set_version(snapshot.version);
                state
            },
            None => EnrollmentState::new(),
        };

        let now = self.clock.now();
        let transition = execute_command(&mut state, &command, now, self.sampler.as_ref())?;

        let Some((event, notifications)) = transition else {
            return Ok((EnrollmentOutcome::NoChange, Vec::new()));
        };

        let expected = state.version().unwrap_or_default();
        let encoded = state.encode()?;
        let version = self
            .snapshot_store
            .save(self.document.clone(), Some(expected), encoded)
            .await?;

        tracing::info!(
            event_type = event.event_type(),
            %version,
            "enrollment transition persisted"
        );

        Ok((Self::outcome_from(event), notifications))
    }

    /// Map a recorded event to the caller-facing delta.
    fn outcome_from(event: EnrollmentAction) -> EnrollmentOutcome {
        match event {
            EnrollmentAction::EnrollmentOpened { event_id, .. } => {
                EnrollmentOutcome::Opened { event_id }
            },
            EnrollmentAction::EntrantJoined {
                event_id, entrant, ..
            } => EnrollmentOutcome::Joined {
                event_id,
                entrant_id: entrant.id,
            },
            EnrollmentAction::EntrantLeft {
                event_id,
                entrant_id,
                ..
            } => EnrollmentOutcome::Left {
                event_id,
                entrant_id,
            },
            EnrollmentAction::DrawCompleted {
                event_id, selected, ..
            } => EnrollmentOutcome::Drawn { event_id, selected },
            EnrollmentAction::InvitationAccepted {
                event_id,
                entrant_id,
                ..
            } => EnrollmentOutcome::Accepted {
                event_id,
                entrant_id,
            },
            EnrollmentAction::InvitationDeclined {
                event_id,
                entrant_id,
                ..
            } => EnrollmentOutcome::Declined {
                event_id,
                entrant_id,
            },
            EnrollmentAction::InviteesReplaced {
                event_id,
                cancelled,
                backfilled,
                ..
            } => EnrollmentOutcome::Replaced {
                event_id,
                cancelled,
                backfilled,
            },
            _ => EnrollmentOutcome::NoChange,
        }
    }

    /// Read-only view of the current state, for queries.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Snapshot`] when the store fails or the
    /// snapshot cannot be decoded.
    pub async fn current_state(&self) -> Result<EnrollmentState, ServiceError> {
        match self.snapshot_store.load(self.document.clone()).await? {
            Some(snapshot) => {
                let mut state = EnrollmentState::decode(&snapshot.data)?;
                state.set_version(snapshot.version);
                Ok(state)
            },
            None => Ok(EnrollmentState::new()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::Capacity;
    use tombola_testing::mocks::{
        FirstSampler, InMemorySnapshotStore, RecordingNotifier, test_clock,
    };

    fn service(
        store: &InMemorySnapshotStore,
        notifier: &RecordingNotifier,
    ) -> EnrollmentService {
        EnrollmentService::new(
            Arc::new(store.clone()),
            Arc::new(notifier.clone()),
            Arc::new(test_clock()),
            Arc::new(FirstSampler),
            DocumentId::new("enrollments"),
        )
    }

    #[tokio::test]
    async fn handle_persists_each_transition() {
        let store = InMemorySnapshotStore::new();
        let notifier = RecordingNotifier::new();
        let service = service(&store, &notifier);
        let event_id = EventId::new();
        let entrant = Entrant::new("Ada", "ada@example.com");

        let opened = service
            .handle(EnrollmentAction::OpenEnrollment {
                event_id,
                capacity: Capacity::new(5),
                waiting_capacity: None,
            })
            .await
            .unwrap();
        assert_eq!(opened, EnrollmentOutcome::Opened { event_id });

        let joined = service
            .handle(EnrollmentAction::JoinWaitingList {
                event_id,
                entrant: entrant.clone(),
            })
            .await
            .unwrap();
        assert_eq!(
            joined,
            EnrollmentOutcome::Joined {
                event_id,
                entrant_id: entrant.id
            }
        );

        // Two commands, two saves
        assert_eq!(
            store.version_of(&DocumentId::new("enrollments")),
            Some(tombola_core::document::Version::new(2))
        );
    }

    #[tokio::test]
    async fn rejected_command_saves_nothing() {
        let store = InMemorySnapshotStore::new();
        let notifier = RecordingNotifier::new();
        let service = service(&store, &notifier);
        let event_id = EventId::new();

        let result = service
            .handle(EnrollmentAction::JoinWaitingList {
                event_id,
                entrant: Entrant::new("Ada", "ada@example.com"),
            })
            .await;

        assert!(matches!(
            result,
            Err(ServiceError::Rejected(LotteryError::UnknownEvent(id))) if id == event_id
        ));
        assert!(store.is_empty());
        assert!(notifier.delivered().is_empty());
    }

    #[tokio::test]
    async fn draw_delivers_invitations_after_save() {
        let store = InMemorySnapshotStore::new();
        let notifier = RecordingNotifier::new();
        let service = service(&store, &notifier);
        let event_id = EventId::new();

        service
            .handle(EnrollmentAction::OpenEnrollment {
                event_id,
                capacity: Capacity::new(2),
                waiting_capacity: None,
            })
            .await
            .unwrap();
        for i in 0..4 {
            service
                .handle(EnrollmentAction::JoinWaitingList {
                    event_id,
                    entrant: Entrant::new(format!("Entrant {i}"), format!("e{i}@example.com")),
                })
                .await
                .unwrap();
        }

        let outcome = service
            .handle(EnrollmentAction::RunDraw { event_id })
            .await
            .unwrap();
        let EnrollmentOutcome::Drawn { selected, .. } = outcome else {
            panic!("expected a draw outcome");
        };
        assert_eq!(selected.len(), 2);
        assert_eq!(notifier.delivered_of_kind("invitation").len(), 2);

        let state = service.current_state().await.unwrap();
        let roster = state.roster(&event_id).unwrap();
        assert_eq!(roster.invited_count(), 2);
        assert_eq!(roster.waiting_count(), 2);
    }

    #[tokio::test]
    async fn idempotent_accept_reports_no_change() {
        let store = InMemorySnapshotStore::new();
        let notifier = RecordingNotifier::new();
        let service = service(&store, &notifier);
        let event_id = EventId::new();
        let entrant = Entrant::new("Ada", "ada@example.com");

        service
            .handle(EnrollmentAction::OpenEnrollment {
                event_id,
                capacity: Capacity::new(1),
                waiting_capacity: None,
            })
            .await
            .unwrap();
        service
            .handle(EnrollmentAction::JoinWaitingList {
                event_id,
                entrant: entrant.clone(),
            })
            .await
            .unwrap();
        service
            .handle(EnrollmentAction::RunDraw { event_id })
            .await
            .unwrap();

        let first = service
            .handle(EnrollmentAction::AcceptInvitation {
                event_id,
                entrant_id: entrant.id,
            })
            .await
            .unwrap();
        assert_eq!(
            first,
            EnrollmentOutcome::Accepted {
                event_id,
                entrant_id: entrant.id
            }
        );

        let saved = store.version_of(&DocumentId::new("enrollments"));
        let second = service
            .handle(EnrollmentAction::AcceptInvitation {
                event_id,
                entrant_id: entrant.id,
            })
            .await
            .unwrap();
        assert_eq!(second, EnrollmentOutcome::NoChange);
        // The no-op saved nothing
        assert_eq!(store.version_of(&DocumentId::new("enrollments")), saved);
    }
}
