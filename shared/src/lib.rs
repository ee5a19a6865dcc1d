use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fmt;

pub const MOVE_SPEED: f32 = 6.0;
pub const TURN_SPEED: f32 = 3.0;
pub const GRAVITY: f32 = 9.8;
pub const JUMP_SPEED: f32 = 3.1;
pub const GROUND_Y: f32 = 0.0;
pub const POSE_EPSILON: f32 = 0.001;
pub const CLIENT_VERSION: u32 = 1;
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const RECONNECT_BASE_DELAY_MS: u64 = 500;
pub const RECONNECT_MAX_DELAY_MS: u64 = 8000;
pub const TICK_INTERVAL_MS: u64 = 16;

/// Position plus yaw rotation. Yaw is radians, kept normalized to [-pi, pi).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub yaw: f32,
}

impl Pose {
    pub fn new(x: f32, y: f32, z: f32, yaw: f32) -> Self {
        Self {
            x,
            y,
            z,
            yaw: normalize_yaw(yaw),
        }
    }

    pub fn origin() -> Self {
        Self::new(0.0, GROUND_Y, 0.0, 0.0)
    }

    pub fn distance_to(&self, other: &Pose) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// True if either position or yaw moved past `eps` relative to `other`.
    pub fn changed_beyond(&self, other: &Pose, eps: f32) -> bool {
        self.distance_to(other) > eps || yaw_delta(self.yaw, other.yaw).abs() > eps
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.yaw.is_finite()
    }
}

/// Wraps an angle into [-pi, pi).
pub fn normalize_yaw(yaw: f32) -> f32 {
    let mut y = (yaw + PI).rem_euclid(2.0 * PI) - PI;
    if y >= PI {
        y = -PI;
    }
    y
}

/// Smallest signed difference between two yaw angles.
pub fn yaw_delta(a: f32, b: f32) -> f32 {
    normalize_yaw(a - b)
}

/// The closed set of community spaces. Fixed at startup, never extended at
/// runtime; inbound events naming anything else are rejected.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpaceId {
    General,
    Lgbtq,
    Disability,
    Cultural,
    Workshop,
    Meditation,
    Gaming,
    Art,
}

impl SpaceId {
    pub const ALL: [SpaceId; 8] = [
        SpaceId::General,
        SpaceId::Lgbtq,
        SpaceId::Disability,
        SpaceId::Cultural,
        SpaceId::Workshop,
        SpaceId::Meditation,
        SpaceId::Gaming,
        SpaceId::Art,
    ];

    /// Stable wire name, used in events and the persisted identity file.
    pub fn name(&self) -> &'static str {
        match self {
            SpaceId::General => "general",
            SpaceId::Lgbtq => "lgbtq",
            SpaceId::Disability => "disability",
            SpaceId::Cultural => "cultural",
            SpaceId::Workshop => "workshop",
            SpaceId::Meditation => "meditation",
            SpaceId::Gaming => "gaming",
            SpaceId::Art => "art",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SpaceId::General => "General Hub",
            SpaceId::Lgbtq => "LGBTQ+ Space",
            SpaceId::Disability => "Accessibility Community",
            SpaceId::Cultural => "Cultural Exchange",
            SpaceId::Workshop => "Diversity Workshops",
            SpaceId::Meditation => "Meditation Garden",
            SpaceId::Gaming => "Inclusive Gaming",
            SpaceId::Art => "Creative Arts Studio",
        }
    }

    pub fn from_name(name: &str) -> Option<SpaceId> {
        SpaceId::ALL.iter().copied().find(|s| s.name() == name)
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Opaque participant identifier, stable for the lifetime of an identity.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A known participant as held by the spatial state store: last-known pose,
/// space membership, and the sequence number of the last applied update.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    pub pose: Pose,
    pub space: SpaceId,
    pub seq: u64,
}

impl Participant {
    pub fn new(id: ParticipantId, display_name: String, pose: Pose, space: SpaceId) -> Self {
        Self {
            id,
            display_name,
            pose,
            space,
            seq: 0,
        }
    }
}

/// Presence events exchanged with the transport. Space identifiers travel as
/// wire strings and are validated against the static set on receipt.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum PresenceEvent {
    Join {
        participant_id: ParticipantId,
        display_name: String,
        pose: Pose,
        space: String,
        seq: u64,
    },
    Leave {
        participant_id: ParticipantId,
    },
    Move {
        participant_id: ParticipantId,
        pose: Pose,
        seq: u64,
    },
    SpaceChange {
        participant_id: ParticipantId,
        space: String,
        pose: Pose,
        seq: u64,
    },
}

impl PresenceEvent {
    pub fn participant_id(&self) -> &ParticipantId {
        match self {
            PresenceEvent::Join { participant_id, .. }
            | PresenceEvent::Leave { participant_id }
            | PresenceEvent::Move { participant_id, .. }
            | PresenceEvent::SpaceChange { participant_id, .. } => participant_id,
        }
    }

    /// Sequence number, for the variants that carry one.
    pub fn seq(&self) -> Option<u64> {
        match self {
            PresenceEvent::Join { seq, .. }
            | PresenceEvent::Move { seq, .. }
            | PresenceEvent::SpaceChange { seq, .. } => Some(*seq),
            PresenceEvent::Leave { .. } => None,
        }
    }
}

/// Datagram framing for the UDP transport. Other transports are free to use
/// their own encoding; the core only ever sees `PresenceEvent`s.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Hello { client_version: u32 },
    Welcome,
    Event(PresenceEvent),
    Goodbye { reason: String },
}

/// One tick's sampled movement input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSample {
    pub forward: bool,
    pub backward: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    pub jump: bool,
}

impl InputSample {
    pub fn idle() -> Self {
        Self::default()
    }
}
