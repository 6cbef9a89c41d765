//! Typed failures for enrollment operations.

use crate::types::{Capacity, EntrantId, EventId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by enrollment operations.
///
/// Every business-rule violation is a distinct variant so the embedding API
/// layer can map each one to its own user-facing message; the `Display`
/// strings here are diagnostics, not end-user copy. No operation partially
/// mutates state before returning one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LotteryError {
    /// The entrant already holds an invitation or a confirmed seat and
    /// cannot also queue on the waiting list.
    #[error("entrant {0} already holds an invitation or a confirmed seat")]
    AlreadyMember(EntrantId),

    /// The entrant is already a member of the list being added to.
    #[error("entrant {0} is already on this list")]
    DuplicateMember(EntrantId),

    /// The list is at its capacity bound.
    #[error("list is full (capacity {0})")]
    CapacityExceeded(Capacity),

    /// The entrant is not currently on the waiting list.
    #[error("entrant {0} is not on the waiting list")]
    NotInWaitingList(EntrantId),

    /// The entrant has no pending invitation.
    #[error("entrant {0} has no pending invitation")]
    NoInvitationFound(EntrantId),

    /// The entrant is not a member of the list.
    #[error("entrant {0} is not a member of this list")]
    NotFound(EntrantId),

    /// The roster document is malformed: its waiting list is missing.
    /// Data-integrity error, not a recoverable business condition.
    #[error("roster has no waiting list")]
    MissingWaitingList,

    /// No enrollment roster exists for the event.
    #[error("no enrollment roster for event {0}")]
    UnknownEvent(EventId),

    /// An enrollment roster already exists for the event.
    #[error("event {0} already has an enrollment roster")]
    EnrollmentExists(EventId),
}

impl LotteryError {
    /// Whether this error signals a malformed aggregate rather than a
    /// rejected business action. Fatal errors should be logged and
    /// investigated, never blindly retried.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingWaitingList)
    }
}
