//! Rendering adapter
//!
//! The core hands the renderer a per-tick snapshot of participant records
//! (identifier, display name, pose, space) and nothing else; how visual
//! proxies are drawn is entirely the adapter's business.

use log::debug;
use shared::{Participant, ParticipantId};

pub trait RenderAdapter {
    fn render(&mut self, local_id: &ParticipantId, participants: &[Participant]);
}

/// Diagnostic renderer: logs the snapshot shape at debug level.
#[derive(Debug, Default)]
pub struct LogRenderer {
    frames: u64,
}

impl RenderAdapter for LogRenderer {
    fn render(&mut self, local_id: &ParticipantId, participants: &[Participant]) {
        self.frames += 1;
        if self.frames % 60 == 0 {
            let local = participants.iter().find(|p| &p.id == local_id);
            match local {
                Some(p) => debug!(
                    "frame {}: {} participants, local at ({:.2}, {:.2}, {:.2}) in {}",
                    self.frames,
                    participants.len(),
                    p.pose.x,
                    p.pose.y,
                    p.pose.z,
                    p.space
                ),
                None => debug!(
                    "frame {}: {} participants, local not joined",
                    self.frames,
                    participants.len()
                ),
            }
        }
    }
}

/// Records every snapshot it is handed. Test helper for observing what the
/// core exposes to the rendering layer.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub snapshots: Vec<Vec<Participant>>,
}

impl RenderAdapter for RecordingRenderer {
    fn render(&mut self, _local_id: &ParticipantId, participants: &[Participant]) {
        self.snapshots.push(participants.to_vec());
    }
}
