//! The `.ptimer` container format.
//!
//! Layout of a container file:
//!
//! ```text
//! [0..4)    magic  b"PTMR"
//! [4..6)    schema version, u16 LE
//! [6..8)    flags, u16 LE, reserved (zero)
//! [8..N)    body: program header + step relation + asset relation
//! [N..N+32) SHA-256 of the body
//! ```
//!
//! All integers are little-endian. Strings and blobs are prefixed with
//! a u32 byte length. Step rows carry an explicit ordinal column; the
//! reader orders by it rather than by storage position.
//!
//! Nothing time- or environment-dependent is ever written, so compiling
//! the same input twice produces byte-identical files.

mod reader;
mod writer;

pub use reader::{decode_container, read_container};
pub use writer::{encode_container, write_container};

use std::path::PathBuf;

use thiserror::Error;

use crate::program::StepAction;

pub const MAGIC: [u8; 4] = *b"PTMR";
pub const HEADER_LEN: usize = 8;
pub const CHECKSUM_LEN: usize = 32;

/// Schema versions this build can read and write.
pub const SUPPORTED_VERSION: u16 = crate::program::SCHEMA_VERSION;

pub(crate) const ACTION_NONE: u8 = 0;
pub(crate) const ACTION_ALERT: u8 = 1;
pub(crate) const ACTION_AUTO_ADVANCE: u8 = 2;

pub(crate) fn action_to_u8(action: StepAction) -> u8 {
    match action {
        StepAction::None => ACTION_NONE,
        StepAction::Alert => ACTION_ALERT,
        StepAction::AutoAdvance => ACTION_AUTO_ADVANCE,
    }
}

pub(crate) fn action_from_u8(value: u8) -> Result<StepAction, PackageError> {
    match value {
        ACTION_NONE => Ok(StepAction::None),
        ACTION_ALERT => Ok(StepAction::Alert),
        ACTION_AUTO_ADVANCE => Ok(StepAction::AutoAdvance),
        other => Err(PackageError::Corrupt(format!(
            "invalid action tag {other:#04x}"
        ))),
    }
}

#[derive(Error, Debug)]
pub enum PackageError {
    /// The file carries a version marker this build does not know.
    /// Never guessed around: a newer writer may have changed the
    /// relation layout.
    #[error("unsupported container version {found} (this build supports version {supported})")]
    SchemaVersion { found: u16, supported: u16 },

    /// Checksum mismatch or a structurally unreadable relation.
    #[error("corrupt container: {0}")]
    Corrupt(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Bounded little-endian reader over the container body.
pub(crate) struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], PackageError> {
        let end = self.pos.checked_add(len).ok_or_else(truncated)?;
        if end > self.bytes.len() {
            return Err(truncated());
        }
        let start = self.pos;
        self.pos = end;
        Ok(&self.bytes[start..end])
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, PackageError> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Read a row count and bound it against the bytes actually left.
    ///
    /// Counts come from untrusted input; preallocating from them
    /// directly would let a small file request an enormous buffer. A
    /// count claiming more rows than the remaining bytes could possibly
    /// hold (at `min_row_len` bytes each) is structurally unreadable.
    pub(crate) fn read_count(&mut self, min_row_len: usize) -> Result<usize, PackageError> {
        let count = self.read_u32()? as usize;
        let remaining = self.bytes.len() - self.pos;
        if count.saturating_mul(min_row_len) > remaining {
            return Err(PackageError::Corrupt(format!(
                "relation claims {count} rows but only {remaining} bytes remain"
            )));
        }
        Ok(count)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, PackageError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn read_i64(&mut self) -> Result<i64, PackageError> {
        let bytes = self.read_bytes(8)?;
        Ok(i64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    pub(crate) fn read_string(&mut self) -> Result<String, PackageError> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| PackageError::Corrupt("invalid UTF-8 in string column".to_string()))
    }

    pub(crate) fn read_blob(&mut self) -> Result<Vec<u8>, PackageError> {
        let len = self.read_u32()? as usize;
        Ok(self.read_bytes(len)?.to_vec())
    }
}

fn truncated() -> PackageError {
    PackageError::Corrupt("truncated relation".to_string())
}
