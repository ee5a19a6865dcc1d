//! Presence client: the per-tick reconciliation loop
//!
//! One cooperative tick drives everything, in a fixed order: sample input
//! and advance the local pose, enqueue locally generated events for send,
//! then drain and apply inbound events. Locally generated events always go
//! out before that tick's inbound events are applied, so the client never
//! observes its own stale echo overtaking a newer local change. The spatial
//! state store has exactly one writer (this loop); the rendering adapter is
//! a read-only consumer of per-tick snapshots.

use crate::error::PresenceError;
use crate::identity::IdentityRecord;
use crate::input::InputSource;
use crate::movement::LocalPose;
use crate::reconcile::{apply_remote_events, ReconcileStats};
use crate::render::RenderAdapter;
use crate::session::{ConnectionState, Session};
use crate::store::SpatialStateStore;
use crate::transport::{Transport, TransportEvent};
use log::{info, warn};
use shared::{Pose, PresenceEvent, SpaceId, POSE_EPSILON, TICK_INTERVAL_MS};
use std::time::{Duration, Instant};
use tokio::time::interval;

pub struct PresenceClient<T: Transport, I: InputSource, R: RenderAdapter> {
    transport: T,
    input: I,
    renderer: R,
    store: SpatialStateStore,
    session: Session,
    local: LocalPose,
    stats: ReconcileStats,
    last_broadcast_pose: Pose,
    next_reconnect_at: Option<Instant>,
    logged_out: bool,
}

impl<T: Transport, I: InputSource, R: RenderAdapter> PresenceClient<T, I, R> {
    pub fn new(identity: IdentityRecord, transport: T, input: I, renderer: R) -> Self {
        let start = Pose::origin();
        Self {
            transport,
            input,
            renderer,
            store: SpatialStateStore::new(),
            session: Session::new(identity),
            local: LocalPose::new(start),
            stats: ReconcileStats::default(),
            last_broadcast_pose: start,
            next_reconnect_at: None,
            logged_out: false,
        }
    }

    pub fn session_state(&self) -> ConnectionState {
        self.session.state()
    }

    pub fn store(&self) -> &SpatialStateStore {
        &self.store
    }

    pub fn stats(&self) -> &ReconcileStats {
        &self.stats
    }

    pub fn local_pose(&self) -> Pose {
        self.local.pose
    }

    pub fn current_space(&self) -> SpaceId {
        self.session.space()
    }

    /// Starts the initial connect. A transport that cannot even begin the
    /// attempt goes straight onto the reconnect path.
    pub fn connect(&mut self) -> Result<(), PresenceError> {
        self.session.begin_connect()?;
        if let Err(e) = self.transport.open() {
            warn!("Initial connect failed: {}", e);
            self.degrade(&e.to_string());
        }
        Ok(())
    }

    /// One scheduling tick. Per-event failures stay inside; only
    /// session-fatal conditions (reconnect cap exhausted) escape.
    pub fn tick(&mut self, dt: f32) -> Result<(), PresenceError> {
        // (a) advance the local pose deterministically.
        let sample = self.input.sample();
        self.local.step(&sample, dt);

        // (b) broadcast the change, or buffer it while reconnecting.
        if self
            .local
            .pose
            .changed_beyond(&self.last_broadcast_pose, POSE_EPSILON)
        {
            self.broadcast_local_pose();
        }

        // (c) drain inbound events; lifecycle signals are handled inline,
        // presence events are batched and applied after the sends above.
        let mut batch = Vec::new();
        while let Some(signal) = self.transport.try_recv() {
            match signal {
                TransportEvent::Opened => self.handle_opened(),
                TransportEvent::Closed { reason } => self.degrade(&reason),
                TransportEvent::Event(event) => batch.push(event),
            }
        }
        apply_remote_events(
            &mut self.store,
            self.session.participant_id(),
            batch,
            &mut self.stats,
        );

        // (d) reconnect when the backoff deadline has passed.
        if self.reconnect_due() {
            self.attempt_reconnect()?;
        }

        // (e) hand the snapshot to the renderer.
        let snapshot = self.store.all();
        self.renderer
            .render(self.session.participant_id(), &snapshot);
        Ok(())
    }

    /// Runs the tick loop until logout, ctrl-c, or a session-fatal error.
    pub async fn run(&mut self) -> Result<(), PresenceError> {
        self.connect()?;
        let mut ticker = interval(Duration::from_millis(TICK_INTERVAL_MS));
        let dt = TICK_INTERVAL_MS as f32 / 1000.0;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(dt)?;
                    if self.logged_out {
                        return Ok(());
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, leaving...");
                    self.logout();
                    return Ok(());
                }
            }
        }
    }

    /// Atomic local space switch: one event carries the new space together
    /// with the current pose, and the self-record is updated in one upsert.
    pub fn switch_space(&mut self, space: SpaceId) {
        if self.session.space() == space {
            return;
        }
        info!("Switching space to {}", space.display_name());
        self.session.set_space(space);

        let seq = self.session.next_seq();
        self.upsert_self(seq);
        let event = PresenceEvent::SpaceChange {
            participant_id: self.session.participant_id().clone(),
            space: space.name().to_string(),
            pose: self.local.pose,
            seq,
        };
        match self.session.state() {
            ConnectionState::Connected => self.send_or_degrade(&event),
            ConnectionState::Reconnecting => {
                self.session.buffer_pose(self.local.pose, space);
            }
            _ => {}
        }
        self.last_broadcast_pose = self.local.pose;
    }

    /// Explicit logout: emits a leave when connected, closes the transport,
    /// cancels any pending reconnect, and discards the buffered pose.
    pub fn logout(&mut self) {
        if let Some(leave) = self.session.logout() {
            if let Err(e) = self.transport.send(&leave) {
                warn!("Could not send leave: {}", e);
            }
        }
        self.transport.close();
        let id = self.session.participant_id().clone();
        self.store.remove(&id);
        self.next_reconnect_at = None;
        self.logged_out = true;
    }

    /// One reconnect attempt, now. Driven by the tick once the backoff
    /// deadline passes, or directly by an explicit user request. Surfaces
    /// the session-fatal error once the attempt cap is reached.
    pub fn attempt_reconnect(&mut self) -> Result<(), PresenceError> {
        if self.session.state() != ConnectionState::Reconnecting {
            return Ok(());
        }
        self.next_reconnect_at = None;
        match self.transport.open() {
            Ok(()) => Ok(()),
            Err(e) => {
                let delay = self.session.on_reconnect_failed(&e.to_string())?;
                self.next_reconnect_at = Some(Instant::now() + Duration::from_millis(delay));
                Ok(())
            }
        }
    }

    pub fn reconnect_due(&self) -> bool {
        matches!(self.next_reconnect_at, Some(at) if at <= Instant::now())
    }

    fn broadcast_local_pose(&mut self) {
        match self.session.state() {
            ConnectionState::Connected => {
                let seq = self.session.next_seq();
                self.upsert_self(seq);
                let event = PresenceEvent::Move {
                    participant_id: self.session.participant_id().clone(),
                    pose: self.local.pose,
                    seq,
                };
                self.send_or_degrade(&event);
                self.last_broadcast_pose = self.local.pose;
            }
            ConnectionState::Reconnecting => {
                let seq = self.session.next_seq();
                self.upsert_self(seq);
                self.session
                    .buffer_pose(self.local.pose, self.session.space());
                self.last_broadcast_pose = self.local.pose;
            }
            // Not joined yet; nothing to tell anyone.
            _ => {}
        }
    }

    fn upsert_self(&mut self, seq: u64) {
        let id = self.session.participant_id().clone();
        let name = self.session.display_name().to_string();
        self.store
            .upsert(&id, &name, self.local.pose, self.session.space(), seq);
    }

    fn handle_opened(&mut self) {
        match self.session.on_connect_ack(self.local.pose) {
            Ok(event) => {
                if let Some(seq) = event.seq() {
                    self.upsert_self(seq);
                }
                self.send_or_degrade(&event);
                self.last_broadcast_pose = self.local.pose;
            }
            Err(e) => warn!("Ignoring unexpected connect ack: {}", e),
        }
    }

    fn send_or_degrade(&mut self, event: &PresenceEvent) {
        if let Err(e) = self.transport.send(event) {
            warn!("Send failed: {}", e);
            self.degrade(&e.to_string());
        }
    }

    /// Transport-detected disconnect: move to reconnecting and schedule an
    /// immediate first attempt.
    fn degrade(&mut self, reason: &str) {
        if self.session.on_transport_lost(reason).is_ok() {
            self.next_reconnect_at = Some(Instant::now());
        }
    }
}
