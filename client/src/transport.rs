//! Transport adapter: the core's only view of the wire
//!
//! The core requires a non-blocking bidirectional channel carrying
//! [`PresenceEvent`]s plus connection lifecycle signals; everything below
//! that (encoding, datagrams, handshakes) belongs to the implementation.
//! Two implementations ship here: an in-process channel pair used by the
//! integration tests, and a UDP transport speaking bincode-encoded
//! [`Packet`]s with a `Hello`/`Welcome` handshake.

use crate::error::PresenceError;
use bincode::{deserialize, serialize};
use log::{debug, error, warn};
use shared::{Packet, PresenceEvent, CLIENT_VERSION};
use std::net::{SocketAddr, UdpSocket};
use tokio::sync::mpsc;

/// Signals delivered by `try_recv`.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Connect (or reconnect) acknowledged by the far end.
    Opened,
    /// Transport-level disconnect.
    Closed { reason: String },
    /// A presence event from the wire.
    Event(PresenceEvent),
}

/// Non-blocking message channel. `open` starts a connect attempt; the
/// acknowledgment arrives later as [`TransportEvent::Opened`]. `try_recv`
/// never blocks and returns `None` once the inbound queue is drained for
/// this tick.
pub trait Transport {
    fn open(&mut self) -> Result<(), PresenceError>;
    fn send(&mut self, event: &PresenceEvent) -> Result<(), PresenceError>;
    fn try_recv(&mut self) -> Option<TransportEvent>;
    fn close(&mut self);
}

/// In-process transport backed by unbounded channels. The paired
/// [`ChannelRemote`] plays the far end of the wire: tests inject inbound
/// events and inspect what the client sent.
pub struct ChannelTransport {
    inbound_rx: mpsc::UnboundedReceiver<TransportEvent>,
    inbound_tx: mpsc::UnboundedSender<TransportEvent>,
    outbound_tx: mpsc::UnboundedSender<PresenceEvent>,
    open: bool,
}

pub struct ChannelRemote {
    to_client: mpsc::UnboundedSender<TransportEvent>,
    from_client: mpsc::UnboundedReceiver<PresenceEvent>,
}

impl ChannelTransport {
    pub fn pair() -> (ChannelTransport, ChannelRemote) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, from_client) = mpsc::unbounded_channel();
        let transport = ChannelTransport {
            inbound_rx,
            inbound_tx: inbound_tx.clone(),
            outbound_tx,
            open: false,
        };
        let remote = ChannelRemote {
            to_client: inbound_tx,
            from_client,
        };
        (transport, remote)
    }
}

impl Transport for ChannelTransport {
    fn open(&mut self) -> Result<(), PresenceError> {
        // An in-process pair cannot fail to connect; acknowledge at once.
        self.open = true;
        self.inbound_tx
            .send(TransportEvent::Opened)
            .map_err(|e| PresenceError::TransportSend(e.to_string()))
    }

    fn send(&mut self, event: &PresenceEvent) -> Result<(), PresenceError> {
        if !self.open {
            return Err(PresenceError::TransportSend("transport not open".into()));
        }
        self.outbound_tx
            .send(event.clone())
            .map_err(|e| PresenceError::TransportSend(e.to_string()))
    }

    fn try_recv(&mut self) -> Option<TransportEvent> {
        self.inbound_rx.try_recv().ok()
    }

    fn close(&mut self) {
        self.open = false;
    }
}

impl ChannelRemote {
    pub fn push_event(&self, event: PresenceEvent) {
        let _ = self.to_client.send(TransportEvent::Event(event));
    }

    pub fn push_closed(&self, reason: &str) {
        let _ = self.to_client.send(TransportEvent::Closed {
            reason: reason.to_string(),
        });
    }

    pub fn push_opened(&self) {
        let _ = self.to_client.send(TransportEvent::Opened);
    }

    /// Everything the client has sent so far, in order.
    pub fn drain_sent(&mut self) -> Vec<PresenceEvent> {
        let mut sent = Vec::new();
        while let Ok(event) = self.from_client.try_recv() {
            sent.push(event);
        }
        sent
    }
}

/// UDP transport carrying bincode-encoded [`Packet`] datagrams.
pub struct UdpTransport {
    socket: UdpSocket,
    server_addr: SocketAddr,
}

impl UdpTransport {
    pub fn new(server_addr: &str) -> Result<Self, PresenceError> {
        let server_addr: SocketAddr = server_addr
            .parse()
            .map_err(|_| PresenceError::InvalidAddress(server_addr.to_string()))?;
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;
        Ok(Self {
            socket,
            server_addr,
        })
    }

    fn send_packet(&self, packet: &Packet) -> Result<(), PresenceError> {
        let data = serialize(packet).map_err(|e| PresenceError::TransportSend(e.to_string()))?;
        self.socket
            .send_to(&data, self.server_addr)
            .map_err(|e| PresenceError::TransportSend(e.to_string()))?;
        Ok(())
    }
}

impl Transport for UdpTransport {
    fn open(&mut self) -> Result<(), PresenceError> {
        debug!("Sending hello to {}", self.server_addr);
        self.send_packet(&Packet::Hello {
            client_version: CLIENT_VERSION,
        })
    }

    fn send(&mut self, event: &PresenceEvent) -> Result<(), PresenceError> {
        self.send_packet(&Packet::Event(event.clone()))
    }

    fn try_recv(&mut self) -> Option<TransportEvent> {
        let mut buffer = [0u8; 2048];
        loop {
            match self.socket.recv_from(&mut buffer) {
                Ok((len, from)) => {
                    if from != self.server_addr {
                        debug!("Ignoring datagram from unexpected peer {}", from);
                        continue;
                    }
                    match deserialize::<Packet>(&buffer[0..len]) {
                        Ok(Packet::Welcome) => return Some(TransportEvent::Opened),
                        Ok(Packet::Goodbye { reason }) => {
                            return Some(TransportEvent::Closed { reason })
                        }
                        Ok(Packet::Event(event)) => return Some(TransportEvent::Event(event)),
                        Ok(Packet::Hello { .. }) => {
                            warn!("Ignoring hello from server");
                            continue;
                        }
                        Err(_) => {
                            warn!("Failed to deserialize datagram from {}", from);
                            continue;
                        }
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return None,
                Err(e) => {
                    error!("Error receiving datagram: {}", e);
                    return None;
                }
            }
        }
    }

    fn close(&mut self) {
        let _ = self.send_packet(&Packet::Goodbye {
            reason: "logout".to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{ParticipantId, Pose};

    fn mv(id: &str, seq: u64) -> PresenceEvent {
        PresenceEvent::Move {
            participant_id: ParticipantId(id.to_string()),
            pose: Pose::origin(),
            seq,
        }
    }

    #[test]
    fn test_channel_open_acks_immediately() {
        let (mut transport, _remote) = ChannelTransport::pair();
        transport.open().unwrap();
        assert_eq!(transport.try_recv(), Some(TransportEvent::Opened));
        assert_eq!(transport.try_recv(), None);
    }

    #[test]
    fn test_channel_send_requires_open() {
        let (mut transport, _remote) = ChannelTransport::pair();
        assert!(transport.send(&mv("a", 1)).is_err());

        transport.open().unwrap();
        assert!(transport.send(&mv("a", 1)).is_ok());

        transport.close();
        assert!(transport.send(&mv("a", 2)).is_err());
    }

    #[test]
    fn test_channel_round_trip() {
        let (mut transport, mut remote) = ChannelTransport::pair();
        transport.open().unwrap();
        assert_eq!(transport.try_recv(), Some(TransportEvent::Opened));

        transport.send(&mv("a", 1)).unwrap();
        transport.send(&mv("a", 2)).unwrap();
        let sent = remote.drain_sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].seq(), Some(1));
        assert_eq!(sent[1].seq(), Some(2));

        remote.push_event(mv("b", 1));
        remote.push_closed("server gone");
        assert_eq!(transport.try_recv(), Some(TransportEvent::Event(mv("b", 1))));
        assert_eq!(
            transport.try_recv(),
            Some(TransportEvent::Closed {
                reason: "server gone".to_string()
            })
        );
        assert_eq!(transport.try_recv(), None);
    }

    #[test]
    fn test_udp_rejects_bad_address() {
        assert!(matches!(
            UdpTransport::new("not-an-address"),
            Err(PresenceError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_udp_handshake_and_events() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let server_addr = server.local_addr().unwrap();
        server.set_nonblocking(true).unwrap();

        let mut transport = UdpTransport::new(&server_addr.to_string()).unwrap();
        transport.open().unwrap();

        // The far end sees a hello and answers with a welcome.
        std::thread::sleep(std::time::Duration::from_millis(20));
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
                &serialize(&Packet::Event(mv("b", 3))).unwrap(),
                client_addr,
            )
            .unwrap();

        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(transport.try_recv(), Some(TransportEvent::Opened));
        assert_eq!(transport.try_recv(), Some(TransportEvent::Event(mv("b", 3))));
        assert_eq!(transport.try_recv(), None);
    }
}
