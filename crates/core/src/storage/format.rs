use crate::errors::CoreError;

/// Magic bytes identifying an SBGT (Stack Budget) snapshot file.
pub const MAGIC: &[u8; 4] = b"SBGT";

/// Current snapshot format version.
pub const CURRENT_VERSION: u16 = 2;

/// Oldest version the migration chain still understands.
pub const OLDEST_SUPPORTED_VERSION: u16 = 1;

/// Minimum header size in bytes: magic(4) + version(2) + payload_len(8) = 14
pub const MIN_HEADER_SIZE: usize = 14;

/// Header read from a snapshot file.
#[derive(Debug)]
pub struct FileHeader {
    pub version: u16,
    pub payload_len: u64,
}

/// Write a complete snapshot file to bytes.
///
/// Layout:
/// ```text
/// [SBGT: 4B] [version: 2B LE] [payload_len: 8B LE] [payload: variable]
/// ```
///
/// The payload is JSON so older schema shapes stay parseable and can be
/// upgraded field by field on load.
pub fn write_file(version: u16, payload: &[u8]) -> Vec<u8> {
    let payload_len = payload.len() as u64;
    let mut buf = Vec::with_capacity(MIN_HEADER_SIZE + payload.len());

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&version.to_le_bytes());
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(payload);

    buf
}

/// Parse the header from raw file bytes.
/// Returns the header and the payload slice.
pub fn read_file(data: &[u8]) -> Result<(FileHeader, &[u8]), CoreError> {
    if data.len() < MIN_HEADER_SIZE {
        return Err(CoreError::InvalidFileFormat(
            "File too small to be a valid SBGT snapshot".into(),
        ));
    }

    if &data[0..4] != MAGIC {
        return Err(CoreError::InvalidFileFormat(
            "Invalid magic bytes — not an SBGT snapshot".into(),
        ));
    }

    let mut offset = 4;

    let version = u16::from_le_bytes([data[offset], data[offset + 1]]);
    offset += 2;

    if !(OLDEST_SUPPORTED_VERSION..=CURRENT_VERSION).contains(&version) {
        return Err(CoreError::UnsupportedVersion(version));
    }

    let payload_len = u64::from_le_bytes(
        data[offset..offset + 8]
            .try_into()
            .map_err(|_| CoreError::InvalidFileFormat("Failed to read payload length".into()))?,
    );
    offset += 8;

    let expected_end = offset + payload_len as usize;
    if data.len() < expected_end {
        return Err(CoreError::InvalidFileFormat(format!(
            "File truncated: expected {} bytes of payload, got {}",
            payload_len,
            data.len() - offset
        )));
    }

    let payload = &data[offset..expected_end];

    Ok((
        FileHeader {
            version,
            payload_len,
        },
        payload,
    ))
}
