//! Walkthrough of the enrollment lifecycle against in-memory collaborators:
//! open enrollment, fill the waiting list, draw, accept/decline, backfill.
//!
//! Run with `cargo run -p tombola-lottery --example lottery_flow`.

use anyhow::Result;
use std::sync::Arc;
use tombola_core::document::DocumentId;
use tombola_core::environment::{SystemClock, ThreadRngSampler};
use tombola_lottery::{
    Capacity, Entrant, EnrollmentAction, EnrollmentOutcome, EnrollmentService, EventId,
};
use tombola_testing::mocks::{InMemorySnapshotStore, RecordingNotifier};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let snapshots = InMemorySnapshotStore::new();
    let notifier = RecordingNotifier::new();
    let service = EnrollmentService::new(
        Arc::new(snapshots),
        Arc::new(notifier.clone()),
        Arc::new(SystemClock),
        Arc::new(ThreadRngSampler),
        DocumentId::new("enrollments"),
    );

    let event_id = EventId::new();
    service
        .handle(EnrollmentAction::OpenEnrollment {
            event_id,
            capacity: Capacity::new(3),
            waiting_capacity: Some(Capacity::new(100)),
        })
        .await?;
    tracing::info!(%event_id, "enrollment open, 3 seats");

    let entrants: Vec<Entrant> = (1..=8)
        .map(|i| Entrant::new(format!("Entrant {i}"), format!("entrant{i}@example.com")))
        .collect();
    for entrant in &entrants {
        service
            .handle(EnrollmentAction::JoinWaitingList {
                event_id,
                entrant: entrant.clone(),
            })
            .await?;
    }
    tracing::info!(waiting = entrants.len(), "waiting list filled");

    let EnrollmentOutcome::Drawn { selected, .. } = service
        .handle(EnrollmentAction::RunDraw { event_id })
        .await?
    else {
        anyhow::bail!("draw produced no outcome");
    };
    for entrant in &selected {
        tracing::info!(entrant = %entrant.name, "invited");
    }

    // The first invitee accepts, the second declines
    service
        .handle(EnrollmentAction::AcceptInvitation {
            event_id,
            entrant_id: selected[0].id,
        })
        .await?;
    service
        .handle(EnrollmentAction::DeclineInvitation {
            event_id,
            entrant_id: selected[1].id,
        })
        .await?;
    tracing::info!(accepted = %selected[0].name, declined = %selected[1].name, "responses in");

    // The third invitee never responds; cancel and backfill
    let EnrollmentOutcome::Replaced { backfilled, .. } = service
        .handle(EnrollmentAction::ReplaceInvitees {
            event_id,
            invitees: vec![selected[2].clone()],
        })
        .await?
    else {
        anyhow::bail!("replace produced no outcome");
    };
    for entrant in &backfilled {
        tracing::info!(entrant = %entrant.name, "backfilled");
    }

    let state = service.current_state().await?;
    let roster = state
        .roster(&event_id)
        .ok_or_else(|| anyhow::anyhow!("roster missing"))?;
    tracing::info!(
        waiting = roster.waiting_count(),
        invited = roster.invited_count(),
        joined = roster.joined_count(),
        cancelled = roster.cancelled_count(),
        notifications = notifier.delivered().len(),
        "final standing"
    );

    Ok(())
}
