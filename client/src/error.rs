use thiserror::Error;

/// Errors surfaced by the presence core. Per-event problems (stale, unknown
/// space, malformed) are handled inside the tick and never reach callers;
/// only session-fatal and I/O conditions escape.
#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("transport unavailable after {attempts} attempts: {reason}")]
    TransportUnavailable { attempts: u32, reason: String },

    #[error("transport send failed: {0}")]
    TransportSend(String),

    #[error("invalid server address: {0}")]
    InvalidAddress(String),

    #[error("unknown space '{0}' referenced by inbound event")]
    UnknownSpace(String),

    #[error("malformed event: {0}")]
    MalformedEvent(String),

    #[error("invalid session transition: {0}")]
    InvalidTransition(&'static str),

    #[error("identity storage: {0}")]
    IdentityStorage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
