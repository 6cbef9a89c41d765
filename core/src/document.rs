//! Aggregate document identification and versioning.
//!
//! This module defines strong types for addressing persisted aggregate
//! snapshots (`DocumentId`) and for optimistic concurrency control
//! (`Version`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for `DocumentId` parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid document ID: {0}")]
pub struct ParseDocumentIdError(String);

/// Unique identifier for a persisted aggregate document.
///
/// A document ID addresses a single aggregate instance in the snapshot store,
/// e.g. `"event-7f3a…"` for one event's enrollment roster.
///
/// # Validation
///
/// - `FromStr::from_str()`: validates input (rejects empty strings)
/// - `From::from()` and `new()`: no validation, for application-controlled
///   input
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    /// Create a new `DocumentId` from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the document ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert the `DocumentId` into its inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = ParseDocumentIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseDocumentIdError(
                "Document ID cannot be empty".to_string(),
            ));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Document version number for optimistic concurrency control.
///
/// A document that has never been saved is at version 0; every successful
/// save bumps the version by one. When saving, the caller states the version
/// it read the document at; a mismatch means another writer got there first
/// and the save fails with a concurrency conflict instead of silently losing
/// the other writer's update.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Version(u64);

impl Version {
    /// Create a new `Version` from a raw number.
    #[must_use]
    pub const fn new(version: u64) -> Self {
        Self(version)
    }

    /// Get the raw version number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The version following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
