//! Remote event reconciliation
//!
//! Applies one tick's drained inbound events to the spatial state store.
//! Ordering and duplication hazards are absorbed here:
//!
//! - the store's monotonic-sequence check rejects stale or duplicate
//!   updates (equal sequence numbers never regress state);
//! - within a single drained batch, pose-bearing events for the same
//!   participant with equal sequence numbers are coalesced so the
//!   later-arriving one wins the tie;
//! - malformed events (empty id, non-finite pose) and events naming a space
//!   outside the static set are dropped and counted, never crash the tick;
//! - events about the local participant are ignored so a client never
//!   applies its own echo.

use crate::store::SpatialStateStore;
use log::{debug, warn};
use shared::{ParticipantId, Pose, PresenceEvent, SpaceId};
use std::collections::HashSet;

/// Per-drain diagnostics. `stale_discarded` is expected traffic, not an
/// error condition.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileStats {
    pub applied: u64,
    pub stale_discarded: u64,
    pub malformed_dropped: u64,
    pub unknown_space: u64,
    pub unknown_participant: u64,
    pub self_echo_ignored: u64,
}

/// Applies a drained batch of remote events in arrival order.
pub fn apply_remote_events(
    store: &mut SpatialStateStore,
    local_id: &ParticipantId,
    events: Vec<PresenceEvent>,
    stats: &mut ReconcileStats,
) {
    for event in coalesce_ties(events) {
        apply_one(store, local_id, event, stats);
    }
}

/// Last-write-wins on equal sequence numbers within one batch: of several
/// pose-bearing events for the same participant carrying the same sequence,
/// only the last-arriving one survives. Cross-batch ties are settled by the
/// store, which keeps the first applied update.
fn coalesce_ties(events: Vec<PresenceEvent>) -> Vec<PresenceEvent> {
    let mut seen: HashSet<(ParticipantId, u64)> = HashSet::new();
    let mut kept: Vec<PresenceEvent> = Vec::with_capacity(events.len());

    for event in events.into_iter().rev() {
        match event.seq() {
            Some(seq) => {
                let key = (event.participant_id().clone(), seq);
                if seen.insert(key) {
                    kept.push(event);
                }
            }
            // Leave events carry no sequence and are never coalesced.
            None => kept.push(event),
        }
    }
    kept.reverse();
    kept
}

fn apply_one(
    store: &mut SpatialStateStore,
    local_id: &ParticipantId,
    event: PresenceEvent,
    stats: &mut ReconcileStats,
) {
    if event.participant_id() == local_id {
        stats.self_echo_ignored += 1;
        return;
    }

    match event {
        PresenceEvent::Join {
            participant_id,
            display_name,
            pose,
            space,
            seq,
        } => {
            if !is_well_formed(&participant_id, &pose) {
                stats.malformed_dropped += 1;
                warn!("Dropped malformed join for '{}'", participant_id);
                return;
            }
            let Some(space) = resolve_space(&space, stats) else {
                return;
            };
            record_result(
                store.upsert(&participant_id, &display_name, pose, space, seq),
                stats,
            );
        }
        PresenceEvent::Leave { participant_id } => {
            if store.remove(&participant_id) {
                debug!("Participant {} left", participant_id);
                stats.applied += 1;
            }
        }
        PresenceEvent::Move {
            participant_id,
            pose,
            seq,
        } => {
            if !is_well_formed(&participant_id, &pose) {
                stats.malformed_dropped += 1;
                warn!("Dropped malformed move for '{}'", participant_id);
                return;
            }
            // A move for a participant we have never seen join carries no
            // space or name, so it cannot create a record.
            let Some(current) = store.get(&participant_id) else {
                stats.unknown_participant += 1;
                debug!("Dropped move for unknown participant {}", participant_id);
                return;
            };
            let (name, space) = (current.display_name.clone(), current.space);
            record_result(store.upsert(&participant_id, &name, pose, space, seq), stats);
        }
        PresenceEvent::SpaceChange {
            participant_id,
            space,
            pose,
            seq,
        } => {
            if !is_well_formed(&participant_id, &pose) {
                stats.malformed_dropped += 1;
                warn!("Dropped malformed space change for '{}'", participant_id);
                return;
            }
            let Some(space) = resolve_space(&space, stats) else {
                return;
            };
            let Some(current) = store.get(&participant_id) else {
                stats.unknown_participant += 1;
                debug!(
                    "Dropped space change for unknown participant {}",
                    participant_id
                );
                return;
            };
            let name = current.display_name.clone();
            // Space and pose go through one upsert: no intermediate state.
            record_result(store.upsert(&participant_id, &name, pose, space, seq), stats);
        }
    }
}

fn is_well_formed(id: &ParticipantId, pose: &Pose) -> bool {
    !id.as_str().is_empty() && pose.is_finite()
}

fn resolve_space(name: &str, stats: &mut ReconcileStats) -> Option<SpaceId> {
    match SpaceId::from_name(name) {
        Some(space) => Some(space),
        None => {
            stats.unknown_space += 1;
            warn!("Rejected event referencing unknown space '{}'", name);
            None
        }
    }
}

fn record_result(applied: bool, stats: &mut ReconcileStats) {
    if applied {
        stats.applied += 1;
    } else {
        stats.stale_discarded += 1;
    }
}
