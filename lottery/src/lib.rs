//! # Tombola Lottery
//!
//! Event-lottery enrollment domain: entrants join a capacity-limited
//! event's waiting list, the organizer runs a draw that invites a uniformly
//! random subset up to the remaining capacity, invitees accept or decline,
//! and vacated slots are backfilled from the waiting list.
//!
//! ## Layers
//!
//! - [`roster`]: the pure state machine, [`MembershipList`] and
//!   [`EventRoster`] with the join/leave/draw/accept/decline/replace
//!   operations and their invariants (mutual list exclusivity, capacity
//!   bounds, all-or-nothing mutation)
//! - [`aggregates::enrollment`]: the reducer wrapper, commands in, events
//!   plus snapshot/notification effects out
//! - [`service`]: the imperative shell, load snapshot → execute command →
//!   version-checked save, retrying lost concurrency races, delivering
//!   notifications after the save sticks
//!
//! An entrant id occupies exactly one of five states per event:
//!
//! ```text
//! Absent ──join──▶ Waiting ──draw──▶ Invited ──accept──▶ Joined (terminal)
//!    ▲               │ ▲                │
//!    └─────leave─────┘ └────rejoin──────┤ decline / replace
//!                                       ▼
//!                                   Cancelled
//! ```

pub mod aggregates;
pub mod error;
pub mod notifications;
pub mod roster;
pub mod service;
pub mod types;

pub use aggregates::enrollment::{
    EnrollmentAction, EnrollmentEnvironment, EnrollmentReducer, EnrollmentState,
};
pub use error::LotteryError;
pub use roster::{
    Acceptance, EntrantStanding, EventRoster, JoinOutcome, MembershipList, Replacement,
};
pub use service::{EnrollmentOutcome, EnrollmentService, ServiceError};
pub use types::{Capacity, Entrant, EntrantId, EventId};
