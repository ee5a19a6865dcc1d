//! Integration tests for the presence synchronization core
//!
//! These tests validate cross-component behavior: a full client driven
//! against a scripted remote end, the UDP transport against a real socket,
//! and the reconnect policy against a transport that keeps failing.

use bincode::{deserialize, serialize};
use client::client::PresenceClient;
use client::error::PresenceError;
use client::identity::IdentityRecord;
use client::input::{NullInput, ScriptedInput};
use client::render::RecordingRenderer;
use client::session::ConnectionState;
use client::transport::{ChannelTransport, Transport, TransportEvent, UdpTransport};
use shared::{
    InputSample, Packet, Participant, ParticipantId, Pose, PresenceEvent, SpaceId, CLIENT_VERSION,
};
use std::net::UdpSocket;
use std::time::Duration;

const DT: f32 = 1.0 / 60.0;

fn identity(id: &str) -> IdentityRecord {
    IdentityRecord {
        id: ParticipantId(id.to_string()),
        display_name: format!("Guest_{}", id),
        space: SpaceId::General,
    }
}

fn pid(s: &str) -> ParticipantId {
    ParticipantId(s.to_string())
}

fn join(id: &str, space: &str, seq: u64) -> PresenceEvent {
    PresenceEvent::Join {
        participant_id: pid(id),
        display_name: format!("Guest_{}", id),
        pose: Pose::origin(),
        space: space.to_string(),
        seq,
    }
}

fn mv(id: &str, x: f32, seq: u64) -> PresenceEvent {
    PresenceEvent::Move {
        participant_id: pid(id),
        pose: Pose::new(x, 0.0, 0.0, 0.0),
        seq,
    }
}

/// FULL CLIENT SCENARIOS (channel transport)
mod client_scenarios {
    use super::*;

    #[test]
    fn join_move_and_stale_rejection() {
        let (transport, remote) = ChannelTransport::pair();
        let mut presence = PresenceClient::new(
            identity("local"),
            transport,
            NullInput,
            RecordingRenderer::default(),
        );
        presence.connect().unwrap();
        presence.tick(DT).unwrap();
        assert_eq!(presence.session_state(), ConnectionState::Connected);

        // A joins at general, seq 1, pose (0,0,0).
        remote.push_event(join("a", "general", 1));
        presence.tick(DT).unwrap();
        assert_eq!(presence.store().get(&pid("a")).unwrap().pose.x, 0.0);

        // Equal seq: rejected, store unchanged.
        remote.push_event(mv("a", 5.0, 1));
        presence.tick(DT).unwrap();
        assert_eq!(presence.store().get(&pid("a")).unwrap().pose.x, 0.0);
        assert_eq!(presence.store().get(&pid("a")).unwrap().seq, 1);

        // seq 2: applied.
        remote.push_event(mv("a", 5.0, 2));
        presence.tick(DT).unwrap();
        assert_eq!(presence.store().get(&pid("a")).unwrap().pose.x, 5.0);
        assert_eq!(presence.store().get(&pid("a")).unwrap().seq, 2);
    }

    #[test]
    fn remote_space_change_moves_partition_atomically() {
        let (transport, remote) = ChannelTransport::pair();
        let mut presence = PresenceClient::new(
            identity("local"),
            transport,
            NullInput,
            RecordingRenderer::default(),
        );
        presence.connect().unwrap();
        presence.tick(DT).unwrap();

        remote.push_event(join("a", "general", 1));
        presence.tick(DT).unwrap();
        assert!(presence
            .store()
            .members_of(SpaceId::General)
            .contains(&pid("a")));

        remote.push_event(PresenceEvent::SpaceChange {
            participant_id: pid("a"),
            space: "lgbtq".to_string(),
            pose: Pose::new(3.0, 0.0, 0.0, 0.0),
            seq: 3,
        });
        presence.tick(DT).unwrap();

        // Membership and pose moved together: no split view.
        assert!(!presence
            .store()
            .members_of(SpaceId::General)
            .contains(&pid("a")));
        assert!(presence
            .store()
            .members_of(SpaceId::Lgbtq)
            .contains(&pid("a")));
        let record = presence.store().get(&pid("a")).unwrap();
        assert_eq!(record.space, SpaceId::Lgbtq);
        assert_eq!(record.pose.x, 3.0);
    }

    #[test]
    fn partition_union_matches_store_after_churn() {
        let (transport, remote) = ChannelTransport::pair();
        let mut presence = PresenceClient::new(
            identity("local"),
            transport,
            NullInput,
            RecordingRenderer::default(),
        );
        presence.connect().unwrap();
        presence.tick(DT).unwrap();

        remote.push_event(join("a", "general", 1));
        remote.push_event(join("b", "gaming", 1));
        remote.push_event(join("c", "art", 1));
        presence.tick(DT).unwrap();

        remote.push_event(PresenceEvent::SpaceChange {
            participant_id: pid("b"),
            space: "meditation".to_string(),
            pose: Pose::origin(),
            seq: 2,
        });
        remote.push_event(PresenceEvent::Leave {
            participant_id: pid("c"),
        });
        presence.tick(DT).unwrap();

        let mut from_index: Vec<ParticipantId> = Vec::new();
        for space in SpaceId::ALL {
            from_index.extend(presence.store().members_of(space).iter().cloned());
        }
        let mut from_store: Vec<ParticipantId> = presence
            .store()
            .all()
            .into_iter()
            .map(|p: Participant| p.id)
            .collect();
        from_index.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        from_store.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        assert_eq!(from_index, from_store);
    }

    #[test]
    fn local_movement_reaches_remote_in_order() {
        let forward = InputSample {
            forward: true,
            ..Default::default()
        };
        let (transport, mut remote) = ChannelTransport::pair();
        let mut presence = PresenceClient::new(
            identity("local"),
            transport,
            ScriptedInput::new(vec![forward; 30]),
            RecordingRenderer::default(),
        );
        presence.connect().unwrap();
        for _ in 0..30 {
            presence.tick(DT).unwrap();
        }

        let sent = remote.drain_sent();
        assert!(matches!(sent[0], PresenceEvent::Join { .. }));
        let move_seqs: Vec<u64> = sent
            .iter()
            .filter_map(|e| match e {
                PresenceEvent::Move { seq, .. } => Some(*seq),
                _ => None,
            })
            .collect();
        assert!(!move_seqs.is_empty());
        assert!(move_seqs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn malformed_and_unknown_space_events_are_contained() {
        let (transport, remote) = ChannelTransport::pair();
        let mut presence = PresenceClient::new(
            identity("local"),
            transport,
            NullInput,
            RecordingRenderer::default(),
        );
        presence.connect().unwrap();
        presence.tick(DT).unwrap();

        remote.push_event(join("a", "general", 1));
        remote.push_event(join("ghost", "atlantis", 1));
        remote.push_event(PresenceEvent::Move {
            participant_id: pid("a"),
            pose: Pose {
                x: f32::INFINITY,
                y: 0.0,
                z: 0.0,
                yaw: 0.0,
            },
            seq: 2,
        });
        // The tick must survive all of it.
        presence.tick(DT).unwrap();

        assert_eq!(presence.stats().unknown_space, 1);
        assert_eq!(presence.stats().malformed_dropped, 1);
        assert!(presence.store().get(&pid("ghost")).is_none());
        assert_eq!(presence.store().get(&pid("a")).unwrap().seq, 1);
    }
}

/// RECONNECT POLICY
mod reconnect_tests {
    use super::*;

    /// Transport whose connect attempts always fail.
    struct DeadTransport;

    impl Transport for DeadTransport {
        fn open(&mut self) -> Result<(), PresenceError> {
            Err(PresenceError::TransportSend("connection refused".into()))
        }
        fn send(&mut self, _event: &PresenceEvent) -> Result<(), PresenceError> {
            Err(PresenceError::TransportSend("connection refused".into()))
        }
        fn try_recv(&mut self) -> Option<TransportEvent> {
            None
        }
        fn close(&mut self) {}
    }

    #[test]
    fn five_failures_end_the_session() {
        let mut presence = PresenceClient::new(
            identity("local"),
            DeadTransport,
            NullInput,
            RecordingRenderer::default(),
        );
        // The initial failure puts the session on the reconnect path.
        presence.connect().unwrap();
        assert_eq!(presence.session_state(), ConnectionState::Reconnecting);

        // Four more attempts stay non-fatal.
        for _ in 0..4 {
            presence.attempt_reconnect().unwrap();
            assert_eq!(presence.session_state(), ConnectionState::Reconnecting);
        }

        // The fifth failed attempt is session-fatal.
        match presence.attempt_reconnect() {
            Err(PresenceError::TransportUnavailable { attempts, .. }) => {
                assert_eq!(attempts, 5);
            }
            other => panic!("expected fatal transport error, got {:?}", other),
        }
        assert_eq!(presence.session_state(), ConnectionState::Disconnected);

        // No further automatic attempt: reconnecting state is gone.
        presence.attempt_reconnect().unwrap();
        assert_eq!(presence.session_state(), ConnectionState::Disconnected);
    }

    #[test]
    fn offline_pose_flushes_as_one_update() {
        let forward = InputSample {
            forward: true,
            ..Default::default()
        };
        let (transport, mut remote) = ChannelTransport::pair();
        let mut presence = PresenceClient::new(
            identity("local"),
            transport,
            ScriptedInput::new(vec![forward; 20]),
            RecordingRenderer::default(),
        );
        presence.connect().unwrap();
        presence.tick(DT).unwrap();
        remote.drain_sent();

        // Drop the link, keep moving for a while.
        remote.push_closed("network blip");
        for _ in 0..10 {
            presence.tick(DT).unwrap();
        }
        // Reconnected by now; everything moved while offline must have
        // arrived as exactly one fresh-sequence update.
        assert_eq!(presence.session_state(), ConnectionState::Connected);
        let sent = remote.drain_sent();
        let flushes: Vec<&PresenceEvent> = sent
            .iter()
            .filter(|e| matches!(e, PresenceEvent::SpaceChange { .. }))
            .collect();
        assert_eq!(flushes.len(), 1);
    }
}

/// UDP TRANSPORT END TO END
mod udp_tests {
    use super::*;

    #[test]
    fn handshake_join_and_peer_sync_over_udp() {
        let server = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind server socket");
        let server_addr = server.local_addr().unwrap();
        server
            .set_read_timeout(Some(Duration::from_millis(500)))
            .unwrap();

        let transport = UdpTransport::new(&server_addr.to_string()).unwrap();
        let mut presence = PresenceClient::new(
            identity("local"),
            transport,
            NullInput,
            RecordingRenderer::default(),
        );
        presence.connect().unwrap();

        // Server side: expect the hello, answer with welcome plus a peer.
        let mut buf = [0u8; 2048];
        let (len, client_addr) = server.recv_from(&mut buf).unwrap();
        match deserialize::<Packet>(&buf[0..len]).unwrap() {
            Packet::Hello { client_version } => assert_eq!(client_version, CLIENT_VERSION),
            other => panic!("expected hello, got {:?}", other),
        }
        server
            .send_to(&serialize(&Packet::Welcome).unwrap(), client_addr)
            .unwrap();
        server
            .send_to(
                &serialize(&Packet::Event(join("peer", "cultural", 1))).unwrap(),
                client_addr,
            )
            .unwrap();

        std::thread::sleep(Duration::from_millis(50));
        presence.tick(DT).unwrap();

        assert_eq!(presence.session_state(), ConnectionState::Connected);
        assert_eq!(
            presence.store().get(&pid("peer")).unwrap().space,
            SpaceId::Cultural
        );

        // The join went out over the wire after the welcome.
        let (len, _) = server.recv_from(&mut buf).unwrap();
        match deserialize::<Packet>(&buf[0..len]).unwrap() {
            Packet::Event(PresenceEvent::Join { space, .. }) => assert_eq!(space, "general"),
            other => panic!("expected join event, got {:?}", other),
        }
    }
}
