//! Local session lifecycle management
//!
//! Tracks the local participant's identity, connection state machine, and
//! outbound sequence numbering:
//!
//! `Disconnected -> Connecting -> Connected -> Reconnecting -> ...`
//!
//! While reconnecting, locally computed poses are buffered (latest only) and
//! flushed as one fresh-sequence update on success. After a bounded number of
//! consecutive reconnect failures the session drops to `Disconnected` and
//! surfaces a session-fatal error; explicit logout is allowed from any state.

use crate::error::PresenceError;
use crate::identity::IdentityRecord;
use log::info;
use shared::{
    ParticipantId, Pose, PresenceEvent, SpaceId, MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE_DELAY_MS,
    RECONNECT_MAX_DELAY_MS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

#[derive(Debug)]
pub struct Session {
    identity: IdentityRecord,
    space: SpaceId,
    state: ConnectionState,
    seq: u64,
    reconnect_attempts: u32,
    buffered_pose: Option<(Pose, SpaceId)>,
}

impl Session {
    pub fn new(identity: IdentityRecord) -> Self {
        let space = identity.space;
        Self {
            identity,
            space,
            state: ConnectionState::Disconnected,
            seq: 0,
            reconnect_attempts: 0,
            buffered_pose: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.identity.id
    }

    pub fn display_name(&self) -> &str {
        &self.identity.display_name
    }

    pub fn space(&self) -> SpaceId {
        self.space
    }

    pub fn set_space(&mut self, space: SpaceId) {
        self.space = space;
    }

    /// Hands out the next outbound sequence number. Monotonic for the life
    /// of the session.
    pub fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// `Disconnected -> Connecting`, on startup or an explicit reconnect
    /// request.
    pub fn begin_connect(&mut self) -> Result<(), PresenceError> {
        if self.state != ConnectionState::Disconnected {
            return Err(PresenceError::InvalidTransition(
                "begin_connect requires Disconnected",
            ));
        }
        self.state = ConnectionState::Connecting;
        Ok(())
    }

    /// Transport-level connect acknowledgment. From `Connecting` this emits
    /// the join event; from `Reconnecting` it flushes the buffered pose (or
    /// the caller-supplied current pose) as a single fresh-sequence update.
    /// The whole reconnect buffer is never replayed: only the latest pose
    /// matters for presence.
    pub fn on_connect_ack(&mut self, current_pose: Pose) -> Result<PresenceEvent, PresenceError> {
        match self.state {
            ConnectionState::Connecting => {
                self.state = ConnectionState::Connected;
                self.reconnect_attempts = 0;
                info!("Session {} connected", self.identity.id);
                Ok(PresenceEvent::Join {
                    participant_id: self.identity.id.clone(),
                    display_name: self.identity.display_name.clone(),
                    pose: current_pose,
                    space: self.space.name().to_string(),
                    seq: self.next_seq(),
                })
            }
            ConnectionState::Reconnecting => {
                self.state = ConnectionState::Connected;
                self.reconnect_attempts = 0;
                let (pose, space) = self.buffered_pose.take().unwrap_or((current_pose, self.space));
                info!("Session {} reconnected", self.identity.id);
                // Space travels with the pose so the update stays atomic even
                // if the space changed while offline.
                Ok(PresenceEvent::SpaceChange {
                    participant_id: self.identity.id.clone(),
                    space: space.name().to_string(),
                    pose,
                    seq: self.next_seq(),
                })
            }
            _ => Err(PresenceError::InvalidTransition(
                "connect ack outside Connecting/Reconnecting",
            )),
        }
    }

    /// Transport-detected disconnect. Local pose updates keep being computed
    /// but are buffered rather than sent until reconnection succeeds.
    pub fn on_transport_lost(&mut self, reason: &str) -> Result<(), PresenceError> {
        match self.state {
            ConnectionState::Connected | ConnectionState::Connecting => {
                info!("Session {} lost transport: {}", self.identity.id, reason);
                self.state = ConnectionState::Reconnecting;
                Ok(())
            }
            _ => Err(PresenceError::InvalidTransition(
                "transport lost outside Connected/Connecting",
            )),
        }
    }

    /// Records the latest locally computed pose while reconnecting. Only the
    /// most recent value is kept.
    pub fn buffer_pose(&mut self, pose: Pose, space: SpaceId) {
        if self.state == ConnectionState::Reconnecting {
            self.buffered_pose = Some((pose, space));
        }
    }

    pub fn buffered_pose(&self) -> Option<(Pose, SpaceId)> {
        self.buffered_pose
    }

    /// A reconnect attempt failed. Returns the backoff delay before the next
    /// attempt, or the session-fatal error once the attempt cap is reached
    /// (at which point the session is `Disconnected` and no further attempt
    /// is made automatically).
    pub fn on_reconnect_failed(&mut self, reason: &str) -> Result<u64, PresenceError> {
        if self.state != ConnectionState::Reconnecting {
            return Err(PresenceError::InvalidTransition(
                "reconnect failure outside Reconnecting",
            ));
        }
        self.reconnect_attempts += 1;
        if self.reconnect_attempts >= MAX_RECONNECT_ATTEMPTS {
            self.state = ConnectionState::Disconnected;
            self.buffered_pose = None;
            return Err(PresenceError::TransportUnavailable {
                attempts: self.reconnect_attempts,
                reason: reason.to_string(),
            });
        }
        Ok(backoff_delay_ms(self.reconnect_attempts))
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    /// Explicit logout, allowed from any state. Cancels any pending
    /// reconnect, discards (does not flush) the buffered pose, and returns
    /// the leave event to emit when the session was actually connected.
    pub fn logout(&mut self) -> Option<PresenceEvent> {
        let was_connected = self.state == ConnectionState::Connected;
        self.state = ConnectionState::Disconnected;
        self.buffered_pose = None;
        self.reconnect_attempts = 0;
        if was_connected {
            info!("Session {} logged out", self.identity.id);
            Some(PresenceEvent::Leave {
                participant_id: self.identity.id.clone(),
            })
        } else {
            None
        }
    }
}

/// Exponential backoff, capped.
pub fn backoff_delay_ms(attempt: u32) -> u64 {
    let shift = attempt.saturating_sub(1).min(10);
    (RECONNECT_BASE_DELAY_MS << shift).min(RECONNECT_MAX_DELAY_MS)
}
