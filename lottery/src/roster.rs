//! Membership lists and the per-event enrollment roster.
//!
//! The roster is the entrant lifecycle state machine: four mutually
//! exclusive membership lists (waiting, invited, joined, cancelled) plus the
//! event capacity that drives draw sizing. An entrant id is a member of at
//! most one list at any time, and every operation here is all-or-nothing:
//! validation happens before the first mutation, so a rejected operation
//! leaves the roster exactly as it found it.

use crate::error::LotteryError;
use crate::types::{Capacity, Entrant, EntrantId};
use serde::{Deserialize, Serialize};
use tombola_core::environment::Sampler;

/// A capacity-bounded, duplicate-free, ordered collection of entrants.
///
/// Shared shape for all four roster roles. Insertion order is preserved for
/// display; selection fairness never depends on it. Lookups are linear
/// scans, which is fine at the expected sizes (tens to low hundreds).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MembershipList {
    capacity: Option<Capacity>,
    members: Vec<Entrant>,
}

impl MembershipList {
    /// Create a list with an optional capacity bound.
    #[must_use]
    pub const fn new(capacity: Option<Capacity>) -> Self {
        Self {
            capacity,
            members: Vec::new(),
        }
    }

    /// Create a list without a capacity bound.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self::new(None)
    }

    /// Create a list bounded to `capacity` members.
    #[must_use]
    pub const fn bounded(capacity: Capacity) -> Self {
        Self::new(Some(capacity))
    }

    /// The capacity bound, if any.
    #[must_use]
    pub const fn capacity(&self) -> Option<Capacity> {
        self.capacity
    }

    /// The members in insertion order.
    #[must_use]
    pub fn members(&self) -> &[Entrant] {
        &self.members
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the list has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether the list is at a set capacity bound.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.capacity
            .is_some_and(|capacity| self.members.len() >= capacity.as_len())
    }

    /// Whether the entrant id is a member.
    #[must_use]
    pub fn contains(&self, id: &EntrantId) -> bool {
        self.members.iter().any(|member| member.id == *id)
    }

    /// Append an entrant.
    ///
    /// # Errors
    ///
    /// - [`LotteryError::CapacityExceeded`] when the list is at a set
    ///   capacity
    /// - [`LotteryError::DuplicateMember`] when the id is already present
    ///
    /// A failed add changes nothing.
    pub fn add(&mut self, entrant: Entrant) -> Result<(), LotteryError> {
        if let Some(capacity) = self.capacity {
            if self.members.len() >= capacity.as_len() {
                return Err(LotteryError::CapacityExceeded(capacity));
            }
        }
        if self.contains(&entrant.id) {
            return Err(LotteryError::DuplicateMember(entrant.id));
        }
        self.members.push(entrant);
        Ok(())
    }

    /// Remove the entrant with the given id.
    ///
    /// # Errors
    ///
    /// [`LotteryError::NotFound`] when the id is absent. Non-fatal:
    /// callers that care about the distinction between "already removed"
    /// and "never present" check membership first.
    pub fn remove(&mut self, id: &EntrantId) -> Result<Entrant, LotteryError> {
        match self.members.iter().position(|member| member.id == *id) {
            Some(index) => Ok(self.members.remove(index)),
            None => Err(LotteryError::NotFound(*id)),
        }
    }
}

/// Where an entrant id currently stands for one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntrantStanding {
    /// Never interacted, or left again.
    Absent,
    /// On the waiting list, hoping to be drawn.
    Waiting,
    /// Drawn, invitation pending accept/decline.
    Invited,
    /// Accepted; a confirmed seat. The only terminal success state.
    Joined,
    /// Declined or replaced; may rejoin the waiting list.
    Cancelled,
}

/// Outcome of a successful [`EventRoster::join`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    /// First contact: the entrant went straight onto the waiting list.
    Joined,
    /// The entrant was in `cancelled`; the record was cleared on rejoin.
    RejoinedAfterCancellation,
}

/// Outcome of a successful [`EventRoster::accept`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Acceptance {
    /// Moved from invited to joined.
    Confirmed(Entrant),
    /// Was already in joined; nothing changed.
    AlreadyJoined,
}

/// Outcome of a successful [`EventRoster::replace`].
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Replacement {
    /// Invitees newly recorded as cancelled.
    pub cancelled: Vec<Entrant>,
    /// Entrants drawn from the waiting list to fill the vacated slots.
    pub backfilled: Vec<Entrant>,
}

/// The four membership lists of one event plus its seat capacity.
///
/// `waiting` and `joined` are optional in the persisted document: `joined`
/// is created lazily on the first accept, and a roster loaded from a
/// malformed document may lack `waiting` entirely. Every operation that
/// needs it surfaces that as the fatal [`LotteryError::MissingWaitingList`]
/// instead of panicking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRoster {
    capacity: Capacity,
    #[serde(default)]
    waiting: Option<MembershipList>,
    invited: MembershipList,
    #[serde(default)]
    joined: Option<MembershipList>,
    cancelled: MembershipList,
}

impl EventRoster {
    /// Create the roster for a freshly published event.
    ///
    /// The waiting list is bounded only if the organizer set a limit; the
    /// invited (and, lazily, joined) lists are bounded by the event
    /// capacity; cancelled is unbounded.
    #[must_use]
    pub const fn new(capacity: Capacity, waiting_capacity: Option<Capacity>) -> Self {
        Self {
            capacity,
            waiting: Some(MembershipList::new(waiting_capacity)),
            invited: MembershipList::bounded(capacity),
            joined: None,
            cancelled: MembershipList::unbounded(),
        }
    }

    /// Total seats the event can ultimately confirm.
    #[must_use]
    pub const fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// The waiting list, if the document carries one.
    #[must_use]
    pub const fn waiting(&self) -> Option<&MembershipList> {
        self.waiting.as_ref()
    }

    /// The invited list.
    #[must_use]
    pub const fn invited(&self) -> &MembershipList {
        &self.invited
    }

    /// The joined list, once the first invitation has been accepted.
    #[must_use]
    pub const fn joined(&self) -> Option<&MembershipList> {
        self.joined.as_ref()
    }

    /// The cancelled list.
    #[must_use]
    pub const fn cancelled(&self) -> &MembershipList {
        &self.cancelled
    }

    /// Number of entrants currently waiting.
    #[must_use]
    pub fn waiting_count(&self) -> usize {
        self.waiting.as_ref().map_or(0, MembershipList::len)
    }

    /// Number of entrants holding a pending invitation.
    #[must_use]
    pub fn invited_count(&self) -> usize {
        self.invited.len()
    }

    /// Number of confirmed seats.
    #[must_use]
    pub fn joined_count(&self) -> usize {
        self.joined.as_ref().map_or(0, MembershipList::len)
    }

    /// Number of cancellation records.
    #[must_use]
    pub fn cancelled_count(&self) -> usize {
        self.cancelled.len()
    }

    /// Seats not yet claimed by an invitation or a confirmed seat.
    #[must_use]
    pub fn remaining_capacity(&self) -> usize {
        let claimed = self.invited.len() + self.joined_count();
        self.capacity.as_len().saturating_sub(claimed)
    }

    /// Which of the five lifecycle states the entrant id is in.
    #[must_use]
    pub fn standing(&self, id: &EntrantId) -> EntrantStanding {
        if self.waiting.as_ref().is_some_and(|list| list.contains(id)) {
            EntrantStanding::Waiting
        } else if self.invited.contains(id) {
            EntrantStanding::Invited
        } else if self.joined.as_ref().is_some_and(|list| list.contains(id)) {
            EntrantStanding::Joined
        } else if self.cancelled.contains(id) {
            EntrantStanding::Cancelled
        } else {
            EntrantStanding::Absent
        }
    }

    // ------------------------------------------------------------------
    // Entrant-facing operations
    // ------------------------------------------------------------------

    /// Put an entrant on the waiting list.
    ///
    /// An entrant in `cancelled` may rejoin; the cancellation record is
    /// cleared in the same operation.
    ///
    /// # Errors
    ///
    /// - [`LotteryError::AlreadyMember`] when the entrant holds an
    ///   invitation or a confirmed seat
    /// - [`LotteryError::MissingWaitingList`] when the roster has no
    ///   waiting list
    /// - [`LotteryError::CapacityExceeded`] when the waiting list is full
    /// - [`LotteryError::DuplicateMember`] when the entrant is already
    ///   waiting
    pub fn join(&mut self, entrant: Entrant) -> Result<JoinOutcome, LotteryError> {
        if self.invited.contains(&entrant.id)
            || self.joined.as_ref().is_some_and(|list| list.contains(&entrant.id))
        {
            return Err(LotteryError::AlreadyMember(entrant.id));
        }

        // Validate against the waiting list before touching `cancelled`, so
        // a rejected join leaves the cancellation record intact.
        {
            let waiting = self
                .waiting
                .as_ref()
                .ok_or(LotteryError::MissingWaitingList)?;
            if let Some(capacity) = waiting.capacity() {
                if waiting.len() >= capacity.as_len() {
                    return Err(LotteryError::CapacityExceeded(capacity));
                }
            }
            if waiting.contains(&entrant.id) {
                return Err(LotteryError::DuplicateMember(entrant.id));
            }
        }

        let rejoined = self.cancelled.remove(&entrant.id).is_ok();
        self.waiting
            .as_mut()
            .ok_or(LotteryError::MissingWaitingList)?
            .add(entrant)?;

        Ok(if rejoined {
            JoinOutcome::RejoinedAfterCancellation
        } else {
            JoinOutcome::Joined
        })
    }

    /// Take an entrant off the waiting list.
    ///
    /// # Errors
    ///
    /// - [`LotteryError::MissingWaitingList`] when the roster has no
    ///   waiting list
    /// - [`LotteryError::NotInWaitingList`] when the entrant is not waiting
    pub fn leave(&mut self, id: &EntrantId) -> Result<Entrant, LotteryError> {
        let waiting = self
            .waiting
            .as_mut()
            .ok_or(LotteryError::MissingWaitingList)?;
        waiting
            .remove(id)
            .map_err(|_| LotteryError::NotInWaitingList(*id))
    }

    // ------------------------------------------------------------------
    // Organizer-facing operations
    // ------------------------------------------------------------------

    /// Run the lottery draw.
    ///
    /// Invites exactly `min(waiting, capacity − invited − joined)` entrants,
    /// chosen uniformly at random without replacement, moving each from
    /// waiting to invited. An empty result (no remaining capacity, or an
    /// empty waiting list) is a normal outcome, not an error.
    ///
    /// # Errors
    ///
    /// [`LotteryError::MissingWaitingList`] when the roster has no waiting
    /// list (a malformed document).
    pub fn draw(&mut self, sampler: &dyn Sampler) -> Result<Vec<Entrant>, LotteryError> {
        if self.waiting.is_none() {
            return Err(LotteryError::MissingWaitingList);
        }
        Ok(self.select_and_invite(sampler, self.remaining_capacity()))
    }

    /// Accept a pending invitation, confirming the seat.
    ///
    /// Idempotent: accepting an already-confirmed seat is a no-op, not an
    /// error. The joined list is created lazily on the first accept, bounded
    /// by the event capacity.
    ///
    /// # Errors
    ///
    /// [`LotteryError::NoInvitationFound`] when the entrant is neither
    /// invited nor joined.
    pub fn accept(&mut self, id: &EntrantId) -> Result<Acceptance, LotteryError> {
        if self.joined.as_ref().is_some_and(|list| list.contains(id)) {
            return Ok(Acceptance::AlreadyJoined);
        }
        let entrant = self
            .invited
            .remove(id)
            .map_err(|_| LotteryError::NoInvitationFound(*id))?;

        let capacity = self.capacity;
        let joined = self
            .joined
            .get_or_insert_with(|| MembershipList::bounded(capacity));
        if let Err(error) = joined.add(entrant.clone()) {
            tracing::warn!(entrant = %id, %error, "joined list rejected accepted entrant");
        }
        Ok(Acceptance::Confirmed(entrant))
    }

    /// Decline a pending invitation.
    ///
    /// Moves the entrant from invited to cancelled. Terminal for the
    /// invitation, but not for the entrant: rejoining the waiting list is
    /// allowed afterwards.
    ///
    /// # Errors
    ///
    /// [`LotteryError::NoInvitationFound`] when the entrant is not invited.
    pub fn decline(&mut self, id: &EntrantId) -> Result<Entrant, LotteryError> {
        let entrant = self
            .invited
            .remove(id)
            .map_err(|_| LotteryError::NoInvitationFound(*id))?;
        self.record_cancellation(entrant.clone());
        Ok(entrant)
    }

    /// Cancel a batch of invitees and backfill the vacated slots from the
    /// waiting list.
    ///
    /// For each selected invitee: the pending invitation (if any) is
    /// revoked and a cancellation recorded, skipping duplicates. Entrants
    /// that currently sit in `waiting` or `joined` are skipped entirely:
    /// they are not invitees and moving them would break list exclusivity.
    /// The backfill then draws `min(selected, waiting, spare capacity)`
    /// replacements with the same unbiased selection as [`Self::draw`].
    ///
    /// # Errors
    ///
    /// [`LotteryError::MissingWaitingList`] when the roster has no waiting
    /// list.
    pub fn replace(
        &mut self,
        invitees: &[Entrant],
        sampler: &dyn Sampler,
    ) -> Result<Replacement, LotteryError> {
        if self.waiting.is_none() {
            return Err(LotteryError::MissingWaitingList);
        }

        let mut cancelled = Vec::new();
        for invitee in invitees {
            match self.standing(&invitee.id) {
                EntrantStanding::Waiting | EntrantStanding::Joined => {
                    tracing::warn!(entrant = %invitee.id, "replace selection skipped non-invitee");
                },
                EntrantStanding::Cancelled => {},
                EntrantStanding::Invited => {
                    if let Ok(entrant) = self.invited.remove(&invitee.id) {
                        self.record_cancellation(entrant.clone());
                        cancelled.push(entrant);
                    }
                },
                EntrantStanding::Absent => {
                    self.record_cancellation(invitee.clone());
                    cancelled.push(invitee.clone());
                },
            }
        }

        let limit = invitees.len().min(self.remaining_capacity());
        let backfilled = self.select_and_invite(sampler, limit);

        Ok(Replacement {
            cancelled,
            backfilled,
        })
    }

    // ------------------------------------------------------------------
    // Deterministic replay
    // ------------------------------------------------------------------

    /// Replay a join event. Anomalies are logged, never propagated.
    pub fn replay_join(&mut self, entrant: Entrant) {
        let id = entrant.id;
        if let Err(error) = self.join(entrant) {
            tracing::warn!(entrant = %id, %error, "join replay out of sync");
        }
    }

    /// Replay a leave event.
    pub fn replay_leave(&mut self, id: &EntrantId) {
        if let Err(error) = self.leave(id) {
            tracing::warn!(entrant = %id, %error, "leave replay out of sync");
        }
    }

    /// Replay a draw by moving the recorded selection from waiting to
    /// invited. The randomness already happened when the event was
    /// recorded, so replay is deterministic.
    pub fn replay_draw(&mut self, selected: &[Entrant]) {
        for entrant in selected {
            let Some(waiting) = self.waiting.as_mut() else {
                tracing::warn!("draw replay on roster without waiting list");
                return;
            };
            match waiting.remove(&entrant.id) {
                Ok(member) => {
                    if let Err(error) = self.invited.add(member) {
                        tracing::warn!(entrant = %entrant.id, %error, "draw replay out of sync");
                    }
                },
                Err(_) => {
                    tracing::warn!(entrant = %entrant.id, "drawn entrant missing from waiting list");
                },
            }
        }
    }

    /// Replay an accept event.
    pub fn replay_accept(&mut self, id: &EntrantId) {
        if let Err(error) = self.accept(id) {
            tracing::warn!(entrant = %id, %error, "accept replay out of sync");
        }
    }

    /// Replay a decline event.
    pub fn replay_decline(&mut self, id: &EntrantId) {
        if let Err(error) = self.decline(id) {
            tracing::warn!(entrant = %id, %error, "decline replay out of sync");
        }
    }

    /// Replay a replace event from its recorded cancellations and backfill.
    pub fn replay_replace(&mut self, cancelled: &[Entrant], backfilled: &[Entrant]) {
        for entrant in cancelled {
            let _ = self.invited.remove(&entrant.id);
            self.record_cancellation(entrant.clone());
        }
        self.replay_draw(backfilled);
    }

    // ------------------------------------------------------------------

    /// Record a cancellation, skipping duplicates (the cancelled list keeps
    /// one record per entrant).
    fn record_cancellation(&mut self, entrant: Entrant) {
        if !self.cancelled.contains(&entrant.id) {
            if let Err(error) = self.cancelled.add(entrant) {
                tracing::warn!(%error, "cancellation record rejected");
            }
        }
    }

    /// Uniformly select up to `limit` waiting entrants and move them to
    /// invited. Returns the selection.
    fn select_and_invite(&mut self, sampler: &dyn Sampler, limit: usize) -> Vec<Entrant> {
        let Some(waiting) = self.waiting.as_ref() else {
            return Vec::new();
        };
        let amount = limit.min(waiting.len());
        if amount == 0 {
            return Vec::new();
        }

        let indices = sampler.sample(waiting.len(), amount);
        let selected: Vec<Entrant> = indices
            .into_iter()
            .filter_map(|index| waiting.members().get(index).cloned())
            .collect();

        self.replay_draw(&selected);
        selected
    }
}
