use tracing::debug;

use crate::errors::CoreError;

use super::format;
use super::snapshot::{self, SnapshotV2};

/// High-level storage operations: save/load the portfolio collection
/// to/from snapshot bytes or files.
pub struct StorageManager;

impl StorageManager {
    /// Serialize a snapshot to raw bytes (portable, platform-independent).
    ///
    /// Flow: SnapshotV2 → JSON → SBGT format bytes
    pub fn save_to_bytes(snapshot: &SnapshotV2) -> Result<Vec<u8>, CoreError> {
        let payload = serde_json::to_vec(snapshot)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize snapshot: {e}")))?;
        Ok(format::write_file(format::CURRENT_VERSION, &payload))
    }

    /// Parse snapshot bytes of any supported version into the current
    /// shape, then normalize every portfolio so corrupt figures can't
    /// leak into live state.
    pub fn load_from_bytes(data: &[u8]) -> Result<SnapshotV2, CoreError> {
        let (header, payload) = format::read_file(data)?;
        if header.version < format::CURRENT_VERSION {
            debug!(version = header.version, "upgrading legacy snapshot on load");
        }

        let mut loaded = snapshot::decode(header.version, payload)?;
        for portfolio in &mut loaded.portfolios {
            snapshot::normalize_portfolio(portfolio);
        }
        Ok(loaded)
    }

    /// Save a snapshot to a file on disk (native only, not WASM).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_file(snapshot: &SnapshotV2, path: &str) -> Result<(), CoreError> {
        let bytes = Self::save_to_bytes(snapshot)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Load a snapshot from a file on disk (native only, not WASM).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_file(path: &str) -> Result<SnapshotV2, CoreError> {
        let bytes = std::fs::read(path)?;
        Self::load_from_bytes(&bytes)
    }
}
