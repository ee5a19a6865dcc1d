//! Space membership index derived from the spatial state store
//!
//! Maps each space to the set of participant identifiers currently in it,
//! scoping rendering and presence queries to one space at a time. The index
//! never owns participant records and is only ever mutated through the
//! store's membership notifications, which keeps it consistent with the
//! store by construction.

use shared::{ParticipantId, SpaceId};
use std::collections::{HashMap, HashSet};

/// Per-space membership buckets. Every space in the static set has a bucket
/// from construction onward, so lookups never distinguish "empty" from
/// "absent".
#[derive(Debug, Clone)]
pub struct SpacePartitionIndex {
    buckets: HashMap<SpaceId, HashSet<ParticipantId>>,
}

impl SpacePartitionIndex {
    pub fn new() -> Self {
        let mut buckets = HashMap::with_capacity(SpaceId::ALL.len());
        for space in SpaceId::ALL {
            buckets.insert(space, HashSet::new());
        }
        Self { buckets }
    }

    /// Moves a participant between buckets. `old` is `None` on first insert.
    pub fn move_participant(&mut self, id: &ParticipantId, old: Option<SpaceId>, new: SpaceId) {
        if old == Some(new) {
            return;
        }
        if let Some(old_space) = old {
            if let Some(bucket) = self.buckets.get_mut(&old_space) {
                bucket.remove(id);
            }
        }
        if let Some(bucket) = self.buckets.get_mut(&new) {
            bucket.insert(id.clone());
        }
    }

    /// Drops a participant from its bucket. Idempotent.
    pub fn remove(&mut self, id: &ParticipantId, space: SpaceId) {
        if let Some(bucket) = self.buckets.get_mut(&space) {
            bucket.remove(id);
        }
    }

    pub fn members_of(&self, space: SpaceId) -> &HashSet<ParticipantId> {
        // Buckets exist for the whole static set, so this cannot miss.
        &self.buckets[&space]
    }

    /// Total membership across all buckets.
    pub fn total_members(&self) -> usize {
        self.buckets.values().map(|b| b.len()).sum()
    }
}

impl Default for SpacePartitionIndex {
    fn default() -> Self {
        Self::new()
    }
}
