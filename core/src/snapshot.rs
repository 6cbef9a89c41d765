//! Snapshot store trait and related types for aggregate persistence.
//!
//! This module defines the core abstraction for persisting aggregate state:
//! a versioned document store with optimistic concurrency control. The store
//! holds one document per aggregate instance; each save replaces the whole
//! document and bumps its version.
//!
//! # Design
//!
//! The `SnapshotStore` trait is deliberately minimal. It provides exactly
//! what the transition functions need:
//!
//! - Load the current snapshot (version + bytes) of a document
//! - Save a new snapshot with an expected-version check
//!
//! Anything richer (querying, indexing, event streams) belongs to the
//! embedding application, not this core.
//!
//! # Concurrency
//!
//! Two writers racing on the same document (two entrants grabbing the last
//! waiting-list slot, or two organizers drawing at once) are serialized by
//! the version check: the loser's save returns
//! [`SnapshotError::ConcurrencyConflict`] and the caller reloads, recomputes
//! the transition from the fresh state, and retries.
//!
//! # Implementations
//!
//! - `InMemorySnapshotStore` (in `tombola-testing`): fast, deterministic
//!   testing double with full conflict semantics
//! - A production document database adapter lives in whatever service wraps
//!   this core; none ships in this repository.

use crate::document::{DocumentId, Version};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during snapshot store operations.
#[derive(Error, Debug, Clone)]
pub enum SnapshotError {
    /// Optimistic concurrency conflict: expected version doesn't match the
    /// document's current version.
    ///
    /// Another process has saved the document since it was loaded. The
    /// operation should be recomputed from a freshly loaded snapshot and
    /// retried.
    #[error("Concurrency conflict on {document}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The document where the conflict occurred.
        document: DocumentId,
        /// The version the writer expected the document to be at.
        expected: Version,
        /// The actual current version of the document.
        actual: Version,
    },

    /// Backend connection or query error.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A versioned aggregate snapshot as stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    /// Version of the document this snapshot captures.
    pub version: Version,
    /// Serialized aggregate state.
    pub data: Vec<u8>,
}

impl Snapshot {
    /// Create a new snapshot.
    #[must_use]
    pub const fn new(version: Version, data: Vec<u8>) -> Self {
        Self { version, data }
    }
}

/// Versioned document store for aggregate snapshots.
///
/// # Version Semantics
///
/// - A document that has never been saved is at [`Version::new(0)`]
///   ("absent"); `load` returns `Ok(None)` for it.
/// - `save(doc, Some(v), _)` succeeds only if the document is currently at
///   version `v`, and stores the new snapshot at `v.next()`.
/// - `save(doc, None, _)` skips the version check (use with caution; the
///   reload-and-retry loop always passes the version it loaded).
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so they can be shared across the
/// async runtime behind an `Arc`.
///
/// # Dyn Compatibility
///
/// Methods return explicit `Pin<Box<dyn Future>>` instead of `async fn` so
/// the trait stays object-safe: reducers capture an `Arc<dyn SnapshotStore>`
/// inside effect descriptions.
pub trait SnapshotStore: Send + Sync {
    /// Load the current snapshot of a document.
    ///
    /// Returns `Ok(None)` if the document has never been saved: a new
    /// aggregate, not an error.
    ///
    /// # Errors
    ///
    /// - [`SnapshotError::Backend`]: backend connection or query failed
    /// - [`SnapshotError::Serialization`]: stored bytes are unreadable
    fn load(
        &self,
        document: DocumentId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Snapshot>, SnapshotError>> + Send + '_>>;

    /// Save a new snapshot of a document with optimistic concurrency control.
    ///
    /// Returns the version the document is at after the save.
    ///
    /// # Errors
    ///
    /// - [`SnapshotError::ConcurrencyConflict`]: version mismatch, a
    ///   concurrent writer saved first
    /// - [`SnapshotError::Backend`]: backend connection or query failed
    fn save(
        &self,
        document: DocumentId,
        expected_version: Option<Version>,
        state: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<Version, SnapshotError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_conflict_error_display() {
        let error = SnapshotError::ConcurrencyConflict {
            document: DocumentId::new("event-42"),
            expected: Version::new(5),
            actual: Version::new(7),
        };

        let display = format!("{error}");
        assert!(display.contains("event-42"));
        assert!(display.contains("expected version 5"));
        assert!(display.contains("found 7"));
    }

    #[test]
    fn backend_error_display() {
        let error = SnapshotError::Backend("connection refused".to_string());
        assert!(format!("{error}").contains("connection refused"));
    }
}
