//! Domain types for the event-lottery enrollment system.
//!
//! Value objects and identifiers shared across the roster, aggregate and
//! service modules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use tombola_core::document::DocumentId;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an entrant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntrantId(Uuid);

impl EntrantId {
    /// Creates a new random `EntrantId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EntrantId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EntrantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// The snapshot-store document that holds this event's data
    #[must_use]
    pub fn document(&self) -> DocumentId {
        DocumentId::new(format!("event-{}", self.0))
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Capacity Value Object
// ============================================================================

/// Number of seats a list (or the whole event) can hold
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Capacity(pub u32);

impl Capacity {
    /// Creates a new `Capacity`
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the capacity value
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Returns the capacity as a list length
    #[must_use]
    pub const fn as_len(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Entrant
// ============================================================================

/// A user who may join an event's waiting list.
///
/// Within this core an entrant is an identity plus the display attributes
/// membership screens need. Equality and hashing go through the id alone:
/// two `Entrant` values with the same id are the same person even when the
/// display fields have drifted apart between snapshots.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entrant {
    /// Stable unique identifier
    pub id: EntrantId,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
}

impl Entrant {
    /// Creates an entrant with a fresh id
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: EntrantId::new(),
            name: name.into(),
            email: email.into(),
        }
    }

    /// Creates an entrant with a known id
    #[must_use]
    pub fn with_id(id: EntrantId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
        }
    }
}

// Identity equality: membership is decided by id, never by display fields.
impl PartialEq for Entrant {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Entrant {}

impl Hash for Entrant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Entrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}
