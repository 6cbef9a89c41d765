//! Notification data and the delivery collaborator trait.
//!
//! State transitions *produce* notifications (who should hear about what)
//! as plain data. Delivering them (push, email, in-app inbox) is the
//! [`Notifier`] collaborator's responsibility and happens strictly after the
//! transition has been persisted. The core never blocks on delivery and a
//! failed delivery never rolls a transition back.

use crate::document::DocumentId;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during notification delivery.
#[derive(Error, Debug, Clone)]
pub enum NotifyError {
    /// Delivery failed for a specific recipient.
    #[error("Delivery failed for {recipient}: {reason}")]
    DeliveryFailed {
        /// The recipient whose delivery failed.
        recipient: String,
        /// The reason for failure.
        reason: String,
    },

    /// The delivery channel itself is unavailable.
    #[error("Notifier unavailable: {0}")]
    Unavailable(String),
}

/// A notification to one recipient about one event.
///
/// Plain data: recipient, the event document it concerns, a stable kind
/// string (e.g. `"invitation"`, `"cancellation"`) for routing/rendering, and
/// a human-readable body. The embedding application decides how each kind is
/// presented; the body here is a default rendering, not end-user copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Identifier of the recipient (an entrant id, rendered as a string).
    pub recipient: String,
    /// The event document this notification concerns.
    pub subject: DocumentId,
    /// Stable notification kind for routing (not free text).
    pub kind: String,
    /// Default human-readable message body.
    pub body: String,
}

impl Notification {
    /// Create a new notification.
    #[must_use]
    pub fn new(
        recipient: impl Into<String>,
        subject: DocumentId,
        kind: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject,
            kind: kind.into(),
            body: body.into(),
        }
    }
}

/// Delivery collaborator for notification batches.
///
/// Implementations must be `Send + Sync`; the trait returns boxed futures so
/// it stays object-safe behind `Arc<dyn Notifier>` inside effect
/// descriptions.
///
/// Delivery is at-least-once from the caller's perspective: a batch may be
/// retried wholesale after a transient failure, so downstream channels should
/// tolerate duplicates.
pub trait Notifier: Send + Sync {
    /// Deliver a batch of notifications.
    ///
    /// # Errors
    ///
    /// Returns a [`NotifyError`] if the batch could not be handed to the
    /// delivery channel. Individual recipient failures inside an accepted
    /// batch are the channel's concern, not the caller's.
    fn deliver(
        &self,
        batch: Vec<Notification>,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_construction() {
        let n = Notification::new(
            "entrant-1",
            DocumentId::new("event-9"),
            "invitation",
            "You have been selected",
        );
        assert_eq!(n.recipient, "entrant-1");
        assert_eq!(n.kind, "invitation");
        assert_eq!(n.subject, DocumentId::new("event-9"));
    }

    #[test]
    fn delivery_error_display() {
        let error = NotifyError::DeliveryFailed {
            recipient: "entrant-1".to_string(),
            reason: "token expired".to_string(),
        };
        let display = format!("{error}");
        assert!(display.contains("entrant-1"));
        assert!(display.contains("token expired"));
    }
}
