//! Enrollment aggregate for the event lottery.
//!
//! Wraps the [`EventRoster`] state machine in the reducer pattern: commands
//! express intent (join, draw, accept…), events record what happened, and
//! effects describe the snapshot save and notification delivery that follow
//! a successful transition. Rejected commands record their typed error in
//! `last_error` and produce no effects; state never partially mutates.

use crate::error::LotteryError;
use crate::notifications;
use crate::roster::{Acceptance, EventRoster};
use crate::types::{Capacity, Entrant, EntrantId, EventId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tombola_core::document::{DocumentId, Version};
use tombola_core::effect::Effect;
use tombola_core::environment::{Clock, Sampler};
use tombola_core::notify::{Notification, Notifier};
use tombola_core::reducer::Reducer;
use tombola_core::snapshot::{SnapshotError, SnapshotStore};
use tombola_core::{SmallVec, save_snapshot, send_notifications, smallvec};
use tombola_macros::{Action, State};

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Actions for the Enrollment aggregate.
///
/// Commands express intent and may be rejected; events record transitions
/// that already happened and replay deterministically (the draw's randomness
/// is fixed inside the recorded selection).
#[derive(Action, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EnrollmentAction {
    // Commands
    /// Create the enrollment roster when an organizer publishes an event
    #[command]
    OpenEnrollment {
        /// The event being published
        event_id: EventId,
        /// Total seats the event can confirm
        capacity: Capacity,
        /// Optional organizer-set bound on the waiting list
        waiting_capacity: Option<Capacity>,
    },

    /// An entrant asks to queue on the waiting list
    #[command]
    JoinWaitingList {
        /// The event to join
        event_id: EventId,
        /// The authenticated entrant (identity is the caller's problem)
        entrant: Entrant,
    },

    /// An entrant gives up their waiting-list spot
    #[command]
    LeaveWaitingList {
        /// The event to leave
        event_id: EventId,
        /// The entrant leaving
        entrant_id: EntrantId,
    },

    /// The organizer runs the lottery draw
    #[command]
    RunDraw {
        /// The event to draw for
        event_id: EventId,
    },

    /// An entrant accepts a pending invitation
    #[command]
    AcceptInvitation {
        /// The event
        event_id: EventId,
        /// The accepting entrant
        entrant_id: EntrantId,
    },

    /// An entrant declines a pending invitation
    #[command]
    DeclineInvitation {
        /// The event
        event_id: EventId,
        /// The declining entrant
        entrant_id: EntrantId,
    },

    /// The organizer revokes a batch of invitations and backfills the
    /// vacated slots from the waiting list
    #[command]
    ReplaceInvitees {
        /// The event
        event_id: EventId,
        /// The invitees to cancel
        invitees: Vec<Entrant>,
    },

    // Events
    /// An enrollment roster was created
    #[event]
    EnrollmentOpened {
        /// The published event
        event_id: EventId,
        /// Total seats
        capacity: Capacity,
        /// Waiting-list bound, if any
        waiting_capacity: Option<Capacity>,
        /// When enrollment opened
        opened_at: DateTime<Utc>,
    },

    /// An entrant entered the waiting list
    #[event]
    EntrantJoined {
        /// The event
        event_id: EventId,
        /// The entrant who joined
        entrant: Entrant,
        /// When they joined
        joined_at: DateTime<Utc>,
    },

    /// An entrant left the waiting list
    #[event]
    EntrantLeft {
        /// The event
        event_id: EventId,
        /// The entrant who left
        entrant_id: EntrantId,
        /// When they left
        left_at: DateTime<Utc>,
    },

    /// A draw moved a random selection from waiting to invited
    #[event]
    DrawCompleted {
        /// The event
        event_id: EventId,
        /// Who was selected
        selected: Vec<Entrant>,
        /// When the draw ran
        drawn_at: DateTime<Utc>,
    },

    /// An invitation was accepted; the seat is confirmed
    #[event]
    InvitationAccepted {
        /// The event
        event_id: EventId,
        /// The entrant with the confirmed seat
        entrant_id: EntrantId,
        /// When they accepted
        accepted_at: DateTime<Utc>,
    },

    /// An invitation was declined
    #[event]
    InvitationDeclined {
        /// The event
        event_id: EventId,
        /// The declining entrant
        entrant_id: EntrantId,
        /// When they declined
        declined_at: DateTime<Utc>,
    },

    /// A batch of invitations was revoked and backfilled
    #[event]
    InviteesReplaced {
        /// The event
        event_id: EventId,
        /// Invitees newly recorded as cancelled
        cancelled: Vec<Entrant>,
        /// Replacements drawn from the waiting list
        backfilled: Vec<Entrant>,
        /// When the replacement ran
        replaced_at: DateTime<Utc>,
    },

    /// A command was rejected
    #[event]
    CommandRejected {
        /// Why the command was rejected
        error: LotteryError,
    },

    /// The state snapshot was persisted
    #[event]
    SnapshotSaved {
        /// The document version after the save
        version: Version,
    },

    /// Persisting the state snapshot failed
    #[event]
    PersistenceFailed {
        /// Store error rendering
        reason: String,
    },

    /// Handing a notification batch to the notifier failed
    #[event]
    DeliveryFailed {
        /// Notifier error rendering
        reason: String,
    },
}

// ============================================================================
// State
// ============================================================================

/// State for the Enrollment aggregate.
#[derive(State, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentState {
    /// All enrollment rosters indexed by event
    pub rosters: HashMap<EventId, EventRoster>,
    /// Last command rejection
    pub last_error: Option<LotteryError>,
    /// Snapshot version this state was loaded at (not persisted)
    #[version]
    #[serde(skip)]
    pub version: Option<Version>,
}

impl EnrollmentState {
    /// Creates a new empty `EnrollmentState`
    #[must_use]
    pub fn new() -> Self {
        Self {
            rosters: HashMap::new(),
            last_error: None,
            version: None,
        }
    }

    /// Gets a roster by event id
    #[must_use]
    pub fn roster(&self, event_id: &EventId) -> Option<&EventRoster> {
        self.rosters.get(event_id)
    }

    /// Number of rosters
    #[must_use]
    pub fn count(&self) -> usize {
        self.rosters.len()
    }

    /// Gets a mutable roster, failing with `UnknownEvent` when absent
    pub(crate) fn roster_mut(
        &mut self,
        event_id: &EventId,
    ) -> Result<&mut EventRoster, LotteryError> {
        self.rosters
            .get_mut(event_id)
            .ok_or(LotteryError::UnknownEvent(*event_id))
    }

    /// Serialize for the snapshot store.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Serialization`] if encoding fails.
    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serialize(self).map_err(|e| SnapshotError::Serialization(e.to_string()))
    }

    /// Deserialize from snapshot bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Serialization`] if decoding fails.
    pub fn decode(bytes: &[u8]) -> Result<Self, SnapshotError> {
        bincode::deserialize(bytes).map_err(|e| SnapshotError::Serialization(e.to_string()))
    }
}

impl Default for EnrollmentState {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Environment dependencies for the Enrollment aggregate
#[derive(Clone)]
pub struct EnrollmentEnvironment {
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
    /// Unbiased sampler for draws
    pub sampler: Arc<dyn Sampler>,
    /// Snapshot store for persistence
    pub snapshot_store: Arc<dyn SnapshotStore>,
    /// Notification delivery collaborator
    pub notifier: Arc<dyn Notifier>,
    /// Document holding this aggregate's snapshot
    pub document: DocumentId,
}

impl EnrollmentEnvironment {
    /// Creates a new `EnrollmentEnvironment`
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        sampler: Arc<dyn Sampler>,
        snapshot_store: Arc<dyn SnapshotStore>,
        notifier: Arc<dyn Notifier>,
        document: DocumentId,
    ) -> Self {
        Self {
            clock,
            sampler,
            snapshot_store,
            notifier,
            document,
        }
    }
}

// ============================================================================
// Command execution
// ============================================================================

/// Execute a command against state, returning the event to record plus the
/// notifications it produced.
///
/// `Ok(None)` means the command was legitimate but changed nothing (an empty
/// draw, an idempotent re-accept): there is nothing to persist or deliver.
/// Shared by the reducer and the service so command dispatch exists exactly
/// once.
pub(crate) fn execute_command(
    state: &mut EnrollmentState,
    command: &EnrollmentAction,
    now: DateTime<Utc>,
    sampler: &dyn Sampler,
) -> Result<Option<(EnrollmentAction, Vec<Notification>)>, LotteryError> {
    use EnrollmentAction as A;

    let result = match command {
        A::OpenEnrollment {
            event_id,
            capacity,
            waiting_capacity,
        } => {
            if state.rosters.contains_key(event_id) {
                Err(LotteryError::EnrollmentExists(*event_id))
            } else {
                state
                    .rosters
                    .insert(*event_id, EventRoster::new(*capacity, *waiting_capacity));
                Ok(Some((
                    A::EnrollmentOpened {
                        event_id: *event_id,
                        capacity: *capacity,
                        waiting_capacity: *waiting_capacity,
                        opened_at: now,
                    },
                    Vec::new(),
                )))
            }
        },

        A::JoinWaitingList { event_id, entrant } => state
            .roster_mut(event_id)
            .and_then(|roster| roster.join(entrant.clone()))
            .map(|_outcome| {
                Some((
                    A::EntrantJoined {
                        event_id: *event_id,
                        entrant: entrant.clone(),
                        joined_at: now,
                    },
                    Vec::new(),
                ))
            }),

        A::LeaveWaitingList {
            event_id,
            entrant_id,
        } => state
            .roster_mut(event_id)
            .and_then(|roster| roster.leave(entrant_id))
            .map(|_entrant| {
                Some((
                    A::EntrantLeft {
                        event_id: *event_id,
                        entrant_id: *entrant_id,
                        left_at: now,
                    },
                    Vec::new(),
                ))
            }),

        A::RunDraw { event_id } => state
            .roster_mut(event_id)
            .and_then(|roster| roster.draw(sampler))
            .map(|selected| {
                if selected.is_empty() {
                    // A draw with nothing to invite changes no list
                    None
                } else {
                    let notifications = notifications::invitations(*event_id, &selected);
                    Some((
                        A::DrawCompleted {
                            event_id: *event_id,
                            selected,
                            drawn_at: now,
                        },
                        notifications,
                    ))
                }
            }),

        A::AcceptInvitation {
            event_id,
            entrant_id,
        } => state
            .roster_mut(event_id)
            .and_then(|roster| roster.accept(entrant_id))
            .map(|acceptance| match acceptance {
                Acceptance::AlreadyJoined => None,
                Acceptance::Confirmed(entrant) => Some((
                    A::InvitationAccepted {
                        event_id: *event_id,
                        entrant_id: entrant.id,
                        accepted_at: now,
                    },
                    vec![notifications::confirmation(*event_id, &entrant.id)],
                )),
            }),

        A::DeclineInvitation {
            event_id,
            entrant_id,
        } => state
            .roster_mut(event_id)
            .and_then(|roster| roster.decline(entrant_id))
            .map(|entrant| {
                Some((
                    A::InvitationDeclined {
                        event_id: *event_id,
                        entrant_id: entrant.id,
                        declined_at: now,
                    },
                    Vec::new(),
                ))
            }),

        A::ReplaceInvitees { event_id, invitees } => state
            .roster_mut(event_id)
            .and_then(|roster| roster.replace(invitees, sampler))
            .map(|replacement| {
                if replacement.cancelled.is_empty() && replacement.backfilled.is_empty() {
                    return None;
                }
                let mut notifications =
                    notifications::cancellations(*event_id, &replacement.cancelled);
                notifications.extend(notifications::invitations(
                    *event_id,
                    &replacement.backfilled,
                ));
                Some((
                    A::InviteesReplaced {
                        event_id: *event_id,
                        cancelled: replacement.cancelled,
                        backfilled: replacement.backfilled,
                        replaced_at: now,
                    },
                    notifications,
                ))
            }),

        _ => {
            tracing::debug!("ignoring non-command action");
            Ok(None)
        },
    };

    if result.is_ok() {
        state.last_error = None;
    }
    result
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the Enrollment aggregate
#[derive(Clone, Debug)]
pub struct EnrollmentReducer;

impl EnrollmentReducer {
    /// Creates a new `EnrollmentReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Effects for a recorded transition: persist the snapshot, then hand
    /// the notification batch to the notifier.
    fn transition_effects(
        state: &EnrollmentState,
        event: EnrollmentAction,
        notifications: Vec<Notification>,
        env: &EnrollmentEnvironment,
    ) -> SmallVec<[Effect<EnrollmentAction>; 4]> {
        let encoded = match state.encode() {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::error!(%error, "state encoding failed, dropping effects");
                return SmallVec::new();
            },
        };

        tracing::info!(event_type = event.event_type(), "enrollment transition");

        let mut effects: SmallVec<[Effect<EnrollmentAction>; 4]> = smallvec![save_snapshot! {
            store: env.snapshot_store,
            document: env.document.clone(),
            expected_version: state.version(),
            state: encoded,
            on_success: |version| Some(EnrollmentAction::SnapshotSaved { version }),
            on_error: |error| Some(EnrollmentAction::PersistenceFailed {
                reason: error.to_string()
            })
        }];

        if !notifications.is_empty() {
            effects.push(send_notifications! {
                notifier: env.notifier,
                notifications: notifications,
                on_success: || None,
                on_error: |error| Some(EnrollmentAction::DeliveryFailed {
                    reason: error.to_string()
                })
            });
        }

        effects
    }

    /// Applies an event to state.
    ///
    /// Deterministic: a fresh state fed the same event sequence reproduces
    /// the same rosters (draw randomness is already fixed in the events).
    fn apply_event(state: &mut EnrollmentState, event: &EnrollmentAction) {
        match event {
            EnrollmentAction::EnrollmentOpened {
                event_id,
                capacity,
                waiting_capacity,
                ..
            } => {
                state
                    .rosters
                    .entry(*event_id)
                    .or_insert_with(|| EventRoster::new(*capacity, *waiting_capacity));
                state.last_error = None;
            },
            EnrollmentAction::EntrantJoined {
                event_id, entrant, ..
            } => {
                Self::with_roster(state, event_id, |roster| {
                    roster.replay_join(entrant.clone());
                });
            },
            EnrollmentAction::EntrantLeft {
                event_id,
                entrant_id,
                ..
            } => {
                Self::with_roster(state, event_id, |roster| roster.replay_leave(entrant_id));
            },
            EnrollmentAction::DrawCompleted {
                event_id, selected, ..
            } => {
                Self::with_roster(state, event_id, |roster| roster.replay_draw(selected));
            },
            EnrollmentAction::InvitationAccepted {
                event_id,
                entrant_id,
                ..
            } => {
                Self::with_roster(state, event_id, |roster| roster.replay_accept(entrant_id));
            },
            EnrollmentAction::InvitationDeclined {
                event_id,
                entrant_id,
                ..
            } => {
                Self::with_roster(state, event_id, |roster| roster.replay_decline(entrant_id));
            },
            EnrollmentAction::InviteesReplaced {
                event_id,
                cancelled,
                backfilled,
                ..
            } => {
                Self::with_roster(state, event_id, |roster| {
                    roster.replay_replace(cancelled, backfilled);
                });
            },
            EnrollmentAction::CommandRejected { error } => {
                state.last_error = Some(error.clone());
            },
            EnrollmentAction::SnapshotSaved { version } => {
                state.set_version(*version);
            },
            EnrollmentAction::PersistenceFailed { reason } => {
                tracing::error!(reason = %reason, "snapshot persistence failed");
            },
            EnrollmentAction::DeliveryFailed { reason } => {
                tracing::warn!(reason = %reason, "notification delivery failed");
            },
            // Commands are handled by execute_command, not replayed
            EnrollmentAction::OpenEnrollment { .. }
            | EnrollmentAction::JoinWaitingList { .. }
            | EnrollmentAction::LeaveWaitingList { .. }
            | EnrollmentAction::RunDraw { .. }
            | EnrollmentAction::AcceptInvitation { .. }
            | EnrollmentAction::DeclineInvitation { .. }
            | EnrollmentAction::ReplaceInvitees { .. } => {},
        }
    }

    fn with_roster(
        state: &mut EnrollmentState,
        event_id: &EventId,
        apply: impl FnOnce(&mut EventRoster),
    ) {
        match state.rosters.get_mut(event_id) {
            Some(roster) => {
                apply(roster);
                state.last_error = None;
            },
            None => tracing::warn!(event = %event_id, "event replay for unknown roster"),
        }
    }
}

impl Default for EnrollmentReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for EnrollmentReducer {
    type State = EnrollmentState;
    type Action = EnrollmentAction;
    type Environment = EnrollmentEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        if action.is_command() {
            return match execute_command(state, &action, env.clock.now(), env.sampler.as_ref()) {
                Ok(Some((event, notifications))) => {
                    Self::transition_effects(state, event, notifications, env)
                },
                Ok(None) => SmallVec::new(),
                Err(error) => {
                    if error.is_fatal() {
                        tracing::error!(%error, "enrollment command hit malformed state");
                    }
                    Self::apply_event(state, &EnrollmentAction::CommandRejected { error });
                    SmallVec::new()
                },
            };
        }

        // Events (replay or effect feedback)
        Self::apply_event(state, &action);
        SmallVec::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::roster::EntrantStanding;
    use tombola_testing::mocks::{
        FirstSampler, InMemorySnapshotStore, RecordingNotifier, test_clock,
    };
    use tombola_testing::{ReducerTest, assertions};

    fn create_test_env() -> EnrollmentEnvironment {
        EnrollmentEnvironment::new(
            Arc::new(test_clock()),
            Arc::new(FirstSampler),
            Arc::new(InMemorySnapshotStore::new()),
            Arc::new(RecordingNotifier::new()),
            DocumentId::new("enrollments"),
        )
    }

    fn opened_state(event_id: EventId, capacity: u32, waiting_capacity: Option<u32>) -> EnrollmentState {
        let mut state = EnrollmentState::new();
        state.rosters.insert(
            event_id,
            EventRoster::new(Capacity::new(capacity), waiting_capacity.map(Capacity::new)),
        );
        state
    }

    fn state_with_waiting(event_id: EventId, capacity: u32, waiting: &[Entrant]) -> EnrollmentState {
        let mut state = opened_state(event_id, capacity, None);
        let roster = state.rosters.get_mut(&event_id).unwrap();
        for entrant in waiting {
            roster.join(entrant.clone()).unwrap();
        }
        state
    }

    fn entrants(n: usize) -> Vec<Entrant> {
        (0..n)
            .map(|i| Entrant::new(format!("Entrant {i}"), format!("entrant{i}@example.com")))
            .collect()
    }

    #[test]
    fn open_enrollment_creates_roster() {
        let event_id = EventId::new();

        ReducerTest::new(EnrollmentReducer::new())
            .with_env(create_test_env())
            .given_state(EnrollmentState::new())
            .when_action(EnrollmentAction::OpenEnrollment {
                event_id,
                capacity: Capacity::new(50),
                waiting_capacity: Some(Capacity::new(200)),
            })
            .then_state(move |state| {
                assert_eq!(state.count(), 1);
                let roster = state.roster(&event_id).unwrap();
                assert_eq!(roster.capacity(), Capacity::new(50));
                assert_eq!(
                    roster.waiting().unwrap().capacity(),
                    Some(Capacity::new(200))
                );
                assert!(state.last_error.is_none());
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_snapshot_effect(effects);
            })
            .run();
    }

    #[test]
    fn open_enrollment_twice_is_rejected() {
        let event_id = EventId::new();

        ReducerTest::new(EnrollmentReducer::new())
            .with_env(create_test_env())
            .given_state(opened_state(event_id, 10, None))
            .when_action(EnrollmentAction::OpenEnrollment {
                event_id,
                capacity: Capacity::new(10),
                waiting_capacity: None,
            })
            .then_state(move |state| {
                assert_eq!(
                    state.last_error,
                    Some(LotteryError::EnrollmentExists(event_id))
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn join_updates_roster_and_persists() {
        let event_id = EventId::new();
        let entrant = Entrant::new("Ada", "ada@example.com");
        let entrant_id = entrant.id;

        ReducerTest::new(EnrollmentReducer::new())
            .with_env(create_test_env())
            .given_state(opened_state(event_id, 10, None))
            .when_action(EnrollmentAction::JoinWaitingList { event_id, entrant })
            .then_state(move |state| {
                let roster = state.roster(&event_id).unwrap();
                assert_eq!(roster.standing(&entrant_id), EntrantStanding::Waiting);
                assert!(state.last_error.is_none());
            })
            .then_effects(|effects| {
                // Persist only: joining produces no notification
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_snapshot_effect(effects);
            })
            .run();
    }

    #[test]
    fn join_unknown_event_is_rejected() {
        let event_id = EventId::new();

        ReducerTest::new(EnrollmentReducer::new())
            .with_env(create_test_env())
            .given_state(EnrollmentState::new())
            .when_action(EnrollmentAction::JoinWaitingList {
                event_id,
                entrant: Entrant::new("Ada", "ada@example.com"),
            })
            .then_state(move |state| {
                assert_eq!(state.last_error, Some(LotteryError::UnknownEvent(event_id)));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn join_full_waiting_list_is_rejected_without_mutation() {
        let event_id = EventId::new();
        let pool = entrants(2);
        let mut state = opened_state(event_id, 10, Some(1));
        state
            .rosters
            .get_mut(&event_id)
            .unwrap()
            .join(pool[0].clone())
            .unwrap();
        let late = pool[1].clone();
        let late_id = late.id;

        ReducerTest::new(EnrollmentReducer::new())
            .with_env(create_test_env())
            .given_state(state)
            .when_action(EnrollmentAction::JoinWaitingList {
                event_id,
                entrant: late,
            })
            .then_state(move |state| {
                assert_eq!(
                    state.last_error,
                    Some(LotteryError::CapacityExceeded(Capacity::new(1)))
                );
                let roster = state.roster(&event_id).unwrap();
                assert_eq!(roster.waiting_count(), 1);
                assert_eq!(roster.standing(&late_id), EntrantStanding::Absent);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn run_draw_invites_and_notifies() {
        let event_id = EventId::new();
        let pool = entrants(5);

        ReducerTest::new(EnrollmentReducer::new())
            .with_env(create_test_env())
            .given_state(state_with_waiting(event_id, 2, &pool))
            .when_action(EnrollmentAction::RunDraw { event_id })
            .then_state(move |state| {
                let roster = state.roster(&event_id).unwrap();
                assert_eq!(roster.invited_count(), 2);
                assert_eq!(roster.waiting_count(), 3);
            })
            .then_effects(|effects| {
                // Persist + invitation batch
                assertions::assert_effects_count(effects, 2);
                assertions::assert_has_snapshot_effect(effects);
                assertions::assert_has_notify_effect(effects);
            })
            .run();
    }

    #[test]
    fn empty_draw_changes_nothing() {
        let event_id = EventId::new();

        ReducerTest::new(EnrollmentReducer::new())
            .with_env(create_test_env())
            .given_state(opened_state(event_id, 5, None))
            .when_action(EnrollmentAction::RunDraw { event_id })
            .then_state(move |state| {
                assert!(state.last_error.is_none());
                assert_eq!(state.roster(&event_id).unwrap().invited_count(), 0);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn accept_confirms_and_notifies() {
        let event_id = EventId::new();
        let pool = entrants(2);
        let mut state = state_with_waiting(event_id, 2, &pool);
        state
            .rosters
            .get_mut(&event_id)
            .unwrap()
            .draw(&FirstSampler)
            .unwrap();
        let entrant_id = pool[0].id;

        ReducerTest::new(EnrollmentReducer::new())
            .with_env(create_test_env())
            .given_state(state)
            .when_action(EnrollmentAction::AcceptInvitation {
                event_id,
                entrant_id,
            })
            .then_state(move |state| {
                let roster = state.roster(&event_id).unwrap();
                assert_eq!(roster.standing(&entrant_id), EntrantStanding::Joined);
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 2);
                assertions::assert_has_notify_effect(effects);
            })
            .run();
    }

    #[test]
    fn second_accept_is_a_noop_not_an_error() {
        let event_id = EventId::new();
        let pool = entrants(1);
        let mut state = state_with_waiting(event_id, 2, &pool);
        let roster = state.rosters.get_mut(&event_id).unwrap();
        roster.draw(&FirstSampler).unwrap();
        roster.accept(&pool[0].id).unwrap();
        let entrant_id = pool[0].id;

        ReducerTest::new(EnrollmentReducer::new())
            .with_env(create_test_env())
            .given_state(state)
            .when_action(EnrollmentAction::AcceptInvitation {
                event_id,
                entrant_id,
            })
            .then_state(move |state| {
                assert!(state.last_error.is_none());
                let roster = state.roster(&event_id).unwrap();
                assert_eq!(roster.joined_count(), 1);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn decline_then_rejoin_clears_cancellation() {
        let event_id = EventId::new();
        let pool = entrants(1);
        let mut state = state_with_waiting(event_id, 2, &pool);
        state
            .rosters
            .get_mut(&event_id)
            .unwrap()
            .draw(&FirstSampler)
            .unwrap();

        let env = create_test_env();
        let reducer = EnrollmentReducer::new();

        reducer.reduce(
            &mut state,
            EnrollmentAction::DeclineInvitation {
                event_id,
                entrant_id: pool[0].id,
            },
            &env,
        );
        assert_eq!(
            state.roster(&event_id).unwrap().standing(&pool[0].id),
            EntrantStanding::Cancelled
        );

        reducer.reduce(
            &mut state,
            EnrollmentAction::JoinWaitingList {
                event_id,
                entrant: pool[0].clone(),
            },
            &env,
        );
        let roster = state.roster(&event_id).unwrap();
        assert_eq!(roster.standing(&pool[0].id), EntrantStanding::Waiting);
        assert_eq!(roster.cancelled_count(), 0);
        assert!(state.last_error.is_none());
    }

    #[test]
    fn replace_emits_cancellations_and_invitations() {
        let event_id = EventId::new();
        let pool = entrants(6);
        let mut state = state_with_waiting(event_id, 3, &pool);
        let invited = state
            .rosters
            .get_mut(&event_id)
            .unwrap()
            .draw(&FirstSampler)
            .unwrap();

        ReducerTest::new(EnrollmentReducer::new())
            .with_env(create_test_env())
            .given_state(state)
            .when_action(EnrollmentAction::ReplaceInvitees {
                event_id,
                invitees: invited[..2].to_vec(),
            })
            .then_state(move |state| {
                let roster = state.roster(&event_id).unwrap();
                assert_eq!(roster.cancelled_count(), 2);
                assert_eq!(roster.invited_count(), 3);
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 2);
                assertions::assert_has_notify_effect(effects);
            })
            .run();
    }

    #[test]
    fn rejection_keeps_rosters_untouched() {
        let event_id = EventId::new();
        let pool = entrants(2);
        let state = state_with_waiting(event_id, 5, &pool);
        let before = state.rosters.clone();

        let env = create_test_env();
        let mut state = state;
        let effects = EnrollmentReducer::new().reduce(
            &mut state,
            EnrollmentAction::AcceptInvitation {
                event_id,
                entrant_id: pool[0].id,
            },
            &env,
        );

        assert!(effects.is_empty());
        assert_eq!(
            state.last_error,
            Some(LotteryError::NoInvitationFound(pool[0].id))
        );
        assert_eq!(state.rosters, before);
    }

    #[test]
    fn event_replay_reproduces_command_built_state() {
        let event_id = EventId::new();
        let pool = entrants(5);
        let env = create_test_env();
        let reducer = EnrollmentReducer::new();

        // Drive a full flow through commands, recording the emitted events
        let mut state = EnrollmentState::new();
        let mut events = Vec::new();
        let now = env.clock.now();

        let commands = vec![
            EnrollmentAction::OpenEnrollment {
                event_id,
                capacity: Capacity::new(3),
                waiting_capacity: None,
            },
            EnrollmentAction::JoinWaitingList {
                event_id,
                entrant: pool[0].clone(),
            },
            EnrollmentAction::JoinWaitingList {
                event_id,
                entrant: pool[1].clone(),
            },
            EnrollmentAction::JoinWaitingList {
                event_id,
                entrant: pool[2].clone(),
            },
            EnrollmentAction::RunDraw { event_id },
            EnrollmentAction::AcceptInvitation {
                event_id,
                entrant_id: pool[0].id,
            },
            EnrollmentAction::DeclineInvitation {
                event_id,
                entrant_id: pool[1].id,
            },
        ];
        for command in commands {
            if let Ok(Some((event, _notifications))) =
                execute_command(&mut state, &command, now, &FirstSampler)
            {
                events.push(event);
            }
        }

        // Replay the events into a fresh state
        let mut replayed = EnrollmentState::new();
        for event in events {
            reducer.reduce(&mut replayed, event, &env);
        }

        assert_eq!(state.rosters, replayed.rosters);
    }

    #[test]
    fn snapshot_saved_feedback_tracks_version() {
        let env = create_test_env();
        let mut state = EnrollmentState::new();

        EnrollmentReducer::new().reduce(
            &mut state,
            EnrollmentAction::SnapshotSaved {
                version: Version::new(4),
            },
            &env,
        );
        assert_eq!(state.version(), Some(Version::new(4)));
    }

    #[test]
    fn state_snapshot_round_trip() {
        let event_id = EventId::new();
        let pool = entrants(3);
        let mut state = state_with_waiting(event_id, 5, &pool);
        state
            .rosters
            .get_mut(&event_id)
            .unwrap()
            .draw(&FirstSampler)
            .unwrap();

        let decoded = EnrollmentState::decode(&state.encode().unwrap()).unwrap();
        assert_eq!(decoded.rosters, state.rosters);
    }
}
