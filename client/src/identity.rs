//! Persisted local identity
//!
//! One JSON record per client installation: participant id, display name,
//! and last chosen space. Read at startup, written on first creation; a
//! missing or unreadable file triggers fresh-identity generation.

use crate::error::PresenceError;
use log::{info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use shared::{ParticipantId, SpaceId};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentityRecord {
    pub id: ParticipantId,
    pub display_name: String,
    pub space: SpaceId,
}

impl IdentityRecord {
    /// Fresh identity: random 32-hex-digit id and a guest display name.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id: String = (0..32)
            .map(|_| {
                let nibble: u8 = rng.gen_range(0..16);
                char::from_digit(nibble as u32, 16).unwrap_or('0')
            })
            .collect();
        let guest_number: u32 = rng.gen_range(0..10_000);
        Self {
            id: ParticipantId(id),
            display_name: format!("Guest_{}", guest_number),
            space: SpaceId::General,
        }
    }
}

/// Loads the identity record from `path`, generating and persisting a fresh
/// one when the file is absent. A file that exists but cannot be parsed is
/// replaced by a fresh identity rather than aborting startup.
pub fn load_or_create(path: &Path) -> Result<IdentityRecord, PresenceError> {
    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<IdentityRecord>(&contents) {
            Ok(record) => {
                info!("Loaded identity {} from {}", record.id, path.display());
                Ok(record)
            }
            Err(e) => {
                warn!(
                    "Identity file {} is unreadable ({}), generating a fresh identity",
                    path.display(),
                    e
                );
                create_and_save(path)
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => create_and_save(path),
        Err(e) => Err(PresenceError::Io(e)),
    }
}

/// Persists an identity record, creating parent directories as needed.
pub fn save(path: &Path, record: &IdentityRecord) -> Result<(), PresenceError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_json::to_string_pretty(record)
        .map_err(|e| PresenceError::IdentityStorage(e.to_string()))?;
    fs::write(path, contents)?;
    Ok(())
}

fn create_and_save(path: &Path) -> Result<IdentityRecord, PresenceError> {
    let record = IdentityRecord::generate();
    save(path, &record)?;
    info!("Created identity {} at {}", record.id, path.display());
    Ok(record)
}
