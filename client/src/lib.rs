//! # Presence Synchronization Client
//!
//! Client-side core for keeping multiple participants' views of a shared,
//! multi-space world consistent. Each client tracks the last-known pose and
//! space membership of every known participant, advances its own pose
//! deterministically from sampled input, broadcasts changes, and merges
//! remote join/leave/move/space-change events under a monotonic-sequence
//! conflict policy: an update is applied only when its sequence number is
//! strictly greater than the stored one, so duplicated or reordered delivery
//! can never regress state.
//!
//! ## Architecture
//!
//! A single cooperative tick drives the whole client. Within one tick, local
//! input is sampled and the resulting events are enqueued for send *before*
//! any inbound event from the same tick is applied, so a participant never
//! observes its own stale echo overtaking a newer local change. The spatial
//! state store has exactly one writer (the tick loop); rendering and UI are
//! read-only consumers of per-tick snapshots.
//!
//! ## Modules
//!
//! - [`store`] — spatial state store: participant records merged under the
//!   monotonic-sequence policy, membership deltas forwarded to the index.
//! - [`partition`] — space partition index: per-space membership buckets,
//!   mutated only through the store.
//! - [`session`] — local session lifecycle: connect, reconnect with bounded
//!   backoff, pose buffering while offline, logout.
//! - [`movement`] — deterministic local pose integration (planar movement,
//!   yaw turning, capped vertical integrator).
//! - [`reconcile`] — inbound event validation, tie-breaking, and application.
//! - [`transport`] — the wire adapter trait plus channel and UDP transports.
//! - [`identity`] — persisted local identity (id, display name, space).
//! - [`input`] / [`render`] — narrow adapter traits for the UI layer.
//! - [`client`] — the tick loop tying everything together.

pub mod client;
pub mod error;
pub mod identity;
pub mod input;
pub mod movement;
pub mod partition;
pub mod reconcile;
pub mod render;
pub mod session;
pub mod store;
pub mod transport;

pub use crate::client::PresenceClient;
pub use crate::error::PresenceError;
