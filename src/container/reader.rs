//! Container reading: version gate, checksum verification, decode.

use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

use super::{action_from_u8, Cursor, PackageError, CHECKSUM_LEN, HEADER_LEN, MAGIC, SUPPORTED_VERSION};
use crate::program::{Asset, AssetMap, Program, Step};
use crate::script::is_valid_ident;

/// Length-prefix of an empty string: the least any string column takes.
const MIN_STRING_LEN: usize = 4;
/// Smallest possible step row: ordinal + three empty strings + duration
/// + next flag + action + asset count.
const MIN_STEP_ROW_LEN: usize = 4 + 3 * MIN_STRING_LEN + 8 + 1 + 1 + 4;
/// Smallest possible asset row: two empty strings + empty blob.
const MIN_ASSET_ROW_LEN: usize = 2 * MIN_STRING_LEN + 4;

/// Open and fully materialize a container file.
pub fn read_container(path: &Path) -> Result<(Program, AssetMap), PackageError> {
    let bytes = fs::read(path).map_err(|source| PackageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_container(&bytes)
}

/// Decode container bytes into a program and its assets.
///
/// Order of failure: bad magic or short file → [`PackageError::Corrupt`];
/// recognized magic with an unknown version → [`PackageError::SchemaVersion`];
/// checksum mismatch or any structural decode failure → `Corrupt`.
pub fn decode_container(bytes: &[u8]) -> Result<(Program, AssetMap), PackageError> {
    if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(PackageError::Corrupt(
            "container shorter than header and checksum".to_string(),
        ));
    }
    if bytes[0..4] != MAGIC {
        return Err(PackageError::Corrupt("bad magic".to_string()));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != SUPPORTED_VERSION {
        return Err(PackageError::SchemaVersion {
            found: version,
            supported: SUPPORTED_VERSION,
        });
    }

    // The flags word is reserved. A writer that sets it means a layout
    // this build cannot interpret, so refuse rather than misread.
    let flags = u16::from_le_bytes([bytes[6], bytes[7]]);
    if flags != 0 {
        return Err(PackageError::Corrupt(format!(
            "unsupported flags {flags:#06x}"
        )));
    }

    let body = &bytes[HEADER_LEN..bytes.len() - CHECKSUM_LEN];
    let stored = &bytes[bytes.len() - CHECKSUM_LEN..];
    if Sha256::digest(body).as_slice() != stored {
        return Err(PackageError::Corrupt("checksum mismatch".to_string()));
    }

    let mut cursor = Cursor::new(body);
    let (program, assets) = decode_body(&mut cursor, version)?;
    if !cursor.is_eof() {
        return Err(PackageError::Corrupt(
            "trailing bytes after asset relation".to_string(),
        ));
    }
    Ok((program, assets))
}

/// Read a string column that must be a script identifier.
///
/// Step ids and next references are emitted unquoted on extract, so a
/// container holding one the grammar cannot express would decompile to
/// a script that fails to reparse. Reject it here instead.
fn read_ident(cursor: &mut Cursor<'_>, column: &str) -> Result<String, PackageError> {
    let value = cursor.read_string()?;
    if !is_valid_ident(&value) {
        return Err(PackageError::Corrupt(format!(
            "{column} '{value}' is not a valid identifier"
        )));
    }
    Ok(value)
}

fn decode_body(
    cursor: &mut Cursor<'_>,
    version: u16,
) -> Result<(Program, AssetMap), PackageError> {
    let mut program = Program::new(cursor.read_string()?);
    program.schema_version = version;
    program.default_duration = match cursor.read_u8()? {
        0 => None,
        1 => Some(cursor.read_i64()?),
        other => {
            return Err(PackageError::Corrupt(format!(
                "invalid default-duration flag {other:#04x}"
            )))
        }
    };

    // Step relation. Rows are keyed by ordinal, not storage position.
    let step_count = cursor.read_count(MIN_STEP_ROW_LEN)?;
    let mut rows: Vec<(u32, Step)> = Vec::with_capacity(step_count);
    for _ in 0..step_count {
        let ordinal = cursor.read_u32()?;
        let id = read_ident(cursor, "step id")?;
        let title = cursor.read_string()?;
        let body = cursor.read_string()?;
        let duration = cursor.read_i64()?;
        let next = match cursor.read_u8()? {
            0 => None,
            1 => Some(read_ident(cursor, "next reference")?),
            other => {
                return Err(PackageError::Corrupt(format!(
                    "invalid next flag {other:#04x}"
                )))
            }
        };
        let action = action_from_u8(cursor.read_u8()?)?;
        let asset_count = cursor.read_count(MIN_STRING_LEN)?;
        let mut assets = Vec::with_capacity(asset_count);
        for _ in 0..asset_count {
            assets.push(cursor.read_string()?);
        }
        rows.push((
            ordinal,
            Step {
                id,
                title,
                body,
                duration,
                next,
                assets,
                action,
            },
        ));
    }
    rows.sort_by_key(|(ordinal, _)| *ordinal);
    for (_, step) in rows {
        program.add_step(step);
    }

    // Asset relation.
    let asset_count = cursor.read_count(MIN_ASSET_ROW_LEN)?;
    let mut assets = AssetMap::new();
    for _ in 0..asset_count {
        let id = cursor.read_string()?;
        let content_type = cursor.read_string()?;
        let data = cursor.read_blob()?;
        if assets
            .insert(
                id.clone(),
                Asset {
                    id: id.clone(),
                    content_type,
                    data,
                },
            )
            .is_some()
        {
            return Err(PackageError::Corrupt(format!(
                "duplicate asset id '{id}' in asset relation"
            )));
        }
    }

    Ok((program, assets))
}
