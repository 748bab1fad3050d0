use super::StorageEngine;
use crate::errors::DbError;
use crate::types::Operation;
use bincode::config::standard;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const HEADER_LEN: usize = 8;
const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Encode one operation as `[len: u32 LE][crc32: u32 LE][bincode payload]`.
///
/// # Errors
/// Returns an error if the operation cannot be encoded or is larger than a frame allows.
pub fn encode_frame(op: &Operation) -> Result<Vec<u8>, DbError> {
    let payload = bincode::serde::encode_to_vec(op, standard())?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(DbError::WalError(format!("record too large: {} bytes", payload.len())));
    }
    let len = u32::try_from(payload.len())
        .map_err(|_| DbError::WalError("record length overflow".into()))?;
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decode every complete frame in `buf`. Returns the operations and the byte length of the
/// valid prefix; a partially written final frame is left out of both.
///
/// # Errors
/// Returns `DbError::WalError` on a checksum mismatch or an impossible frame length, and a
/// decode error if a checksummed payload does not decode.
pub fn decode_frames(buf: &[u8]) -> Result<(Vec<Operation>, usize), DbError> {
    let mut ops = Vec::new();
    let mut offset = 0usize;
    while offset < buf.len() {
        if buf.len() - offset < HEADER_LEN {
            log::warn!("wal: ignoring truncated header at offset {offset}");
            break;
        }
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&buf[offset..offset + 4]);
        let mut crc_bytes = [0u8; 4];
        crc_bytes.copy_from_slice(&buf[offset + 4..offset + HEADER_LEN]);
        let len = usize::try_from(u32::from_le_bytes(len_bytes)).unwrap_or(usize::MAX);
        if len > MAX_FRAME_LEN {
            return Err(DbError::WalError(format!("frame length {len} at offset {offset}")));
        }
        let start = offset + HEADER_LEN;
        if start + len > buf.len() {
            log::warn!("wal: ignoring truncated record at offset {offset}");
            break;
        }
        let payload = &buf[start..start + len];
        if crc32fast::hash(payload) != u32::from_le_bytes(crc_bytes) {
            return Err(DbError::WalError(format!("checksum mismatch at offset {offset}")));
        }
        let (op, _) = bincode::serde::decode_from_slice::<Operation, _>(payload, standard())?;
        ops.push(op);
        offset = start + len;
    }
    Ok((ops, offset))
}

/// Append-only operation log on disk.
pub struct WalStorage {
    path: PathBuf,
    file: File,
}

impl WalStorage {
    /// Open (or create) the log at `path`. A torn final record is cut off so new appends
    /// start on a frame boundary.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or its existing contents are corrupt.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).read(true).append(true).open(&path)?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        let (ops, valid) = decode_frames(&buf)?;
        if valid < buf.len() {
            log::warn!(
                "wal: truncating {} trailing bytes in {}",
                buf.len() - valid,
                path.display()
            );
            file.set_len(crate::utils::num::usize_to_u64(valid))?;
        }
        log::info!("wal: opened {} with {} records", path.display(), ops.len());
        Ok(Self { path, file })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageEngine for WalStorage {
    fn append(&mut self, operation: &Operation) -> Result<(), DbError> {
        let frame = encode_frame(operation)?;
        self.file.write_all(&frame)?;
        self.file.flush()?;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<Operation>, DbError> {
        let buf = std::fs::read(&self.path)?;
        let (ops, _) = decode_frames(&buf)?;
        Ok(ops)
    }

    fn sync(&mut self) -> Result<(), DbError> {
        self.file.sync_data()?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("wal:{}", self.path.display())
    }
}
