//! Notification builders for enrollment transitions.
//!
//! Transitions produce notification batches as plain data; delivery belongs
//! to the injected `Notifier`. Kinds are stable routing keys, bodies are
//! default renderings the embedding application may replace per channel.

use crate::types::{Entrant, EntrantId, EventId};
use tombola_core::notify::Notification;

/// Stable notification kinds.
pub mod kind {
    /// Selected in a draw; an invitation is pending.
    pub const INVITATION: &str = "invitation";
    /// A pending invitation was revoked by the organizer.
    pub const CANCELLATION: &str = "cancellation";
    /// An invitation was accepted; the seat is confirmed.
    pub const CONFIRMATION: &str = "confirmation";
}

/// One invitation per drawn entrant.
#[must_use]
pub fn invitations(event_id: EventId, selected: &[Entrant]) -> Vec<Notification> {
    selected
        .iter()
        .map(|entrant| {
            Notification::new(
                entrant.id.to_string(),
                event_id.document(),
                kind::INVITATION,
                "You have been selected in the draw. Accept or decline your invitation.",
            )
        })
        .collect()
}

/// One cancellation notice per revoked invitee.
#[must_use]
pub fn cancellations(event_id: EventId, cancelled: &[Entrant]) -> Vec<Notification> {
    cancelled
        .iter()
        .map(|entrant| {
            Notification::new(
                entrant.id.to_string(),
                event_id.document(),
                kind::CANCELLATION,
                "Your invitation has been cancelled. You may rejoin the waiting list.",
            )
        })
        .collect()
}

/// Confirmation of an accepted seat.
#[must_use]
pub fn confirmation(event_id: EventId, entrant_id: &EntrantId) -> Notification {
    Notification::new(
        entrant_id.to_string(),
        event_id.document(),
        kind::CONFIRMATION,
        "Your seat is confirmed. See you at the event.",
    )
}
