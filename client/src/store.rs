//! Spatial state store: last-known pose and space membership per participant
//!
//! The store is the single authority for participant records on this client.
//! Updates are merged under a monotonic-sequence policy: an upsert is applied
//! only when its sequence number is strictly greater than the stored one, so
//! out-of-order or duplicated delivery can never regress state. Every applied
//! upsert or remove forwards its membership delta to the embedded
//! [`SpacePartitionIndex`], which has no other mutation path.

use crate::partition::SpacePartitionIndex;
use log::debug;
use shared::{Participant, ParticipantId, Pose, SpaceId};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct StoreStats {
    /// Updates rejected because their sequence was not newer than the stored
    /// one. Expected under normal operation, tracked for diagnostics only.
    pub stale_discarded: u64,
}

#[derive(Debug)]
pub struct SpatialStateStore {
    participants: HashMap<ParticipantId, Participant>,
    index: SpacePartitionIndex,
    stats: StoreStats,
}

impl SpatialStateStore {
    pub fn new() -> Self {
        Self {
            participants: HashMap::new(),
            index: SpacePartitionIndex::new(),
            stats: StoreStats::default(),
        }
    }

    /// Inserts or updates a participant record, returning whether the update
    /// was applied. For an existing record the update is applied only when
    /// `seq` is strictly greater than the stored sequence; pose and space are
    /// written together so a reader never sees them split. `display_name` is
    /// only consulted on first insert.
    pub fn upsert(
        &mut self,
        id: &ParticipantId,
        display_name: &str,
        pose: Pose,
        space: SpaceId,
        seq: u64,
    ) -> bool {
        match self.participants.get_mut(id) {
            Some(existing) => {
                if seq <= existing.seq {
                    self.stats.stale_discarded += 1;
                    debug!(
                        "Discarded stale update for {} (seq {} <= {})",
                        id, seq, existing.seq
                    );
                    return false;
                }
                let old_space = existing.space;
                existing.pose = pose;
                existing.space = space;
                existing.seq = seq;
                if old_space != space {
                    self.index.move_participant(id, Some(old_space), space);
                }
                true
            }
            None => {
                let mut record =
                    Participant::new(id.clone(), display_name.to_string(), pose, space);
                record.seq = seq;
                self.participants.insert(id.clone(), record);
                self.index.move_participant(id, None, space);
                true
            }
        }
    }

    /// Deletes a participant record. Idempotent: removing an absent id is a
    /// no-op, not an error. Returns whether a record was removed.
    pub fn remove(&mut self, id: &ParticipantId) -> bool {
        match self.participants.remove(id) {
            Some(record) => {
                self.index.remove(id, record.space);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.participants.contains_key(id)
    }

    /// Owned snapshot of every participant record. The snapshot does not
    /// reflect mutations made after it is taken.
    pub fn all(&self) -> Vec<Participant> {
        self.participants.values().cloned().collect()
    }

    pub fn members_of(&self, space: SpaceId) -> &HashSet<ParticipantId> {
        self.index.members_of(space)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }
}

impl Default for SpatialStateStore {
    fn default() -> Self {
        Self::new()
    }
}
