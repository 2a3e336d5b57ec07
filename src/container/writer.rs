//! Container serialization and atomic writing.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::{action_to_u8, PackageError, CHECKSUM_LEN, MAGIC, SUPPORTED_VERSION};
use crate::program::{AssetMap, Program};

/// Serialize a validated program and its assets into container bytes.
pub fn encode_container(program: &Program, assets: &AssetMap) -> Result<Vec<u8>, PackageError> {
    if program.schema_version != SUPPORTED_VERSION {
        return Err(PackageError::SchemaVersion {
            found: program.schema_version,
            supported: SUPPORTED_VERSION,
        });
    }

    let body = encode_body(program, assets);

    let mut out = Vec::with_capacity(super::HEADER_LEN + body.len() + CHECKSUM_LEN);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&program.schema_version.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&body);
    out.extend_from_slice(Sha256::digest(&body).as_slice());
    Ok(out)
}

fn encode_body(program: &Program, assets: &AssetMap) -> Vec<u8> {
    let mut body = BodyEncoder::new();

    // Program header.
    body.string(&program.title);
    match program.default_duration {
        Some(value) => {
            body.u8(1);
            body.i64(value);
        }
        None => body.u8(0),
    }

    // Step relation, insertion order recorded as an ordinal column.
    body.u32(program.steps.len() as u32);
    for (ordinal, step) in program.steps.iter().enumerate() {
        body.u32(ordinal as u32);
        body.string(&step.id);
        body.string(&step.title);
        body.string(&step.body);
        body.i64(step.duration);
        match &step.next {
            Some(next) => {
                body.u8(1);
                body.string(next);
            }
            None => body.u8(0),
        }
        body.u8(action_to_u8(step.action));
        body.u32(step.assets.len() as u32);
        for reference in &step.assets {
            body.string(reference);
        }
    }

    // Asset relation. BTreeMap iteration keeps this deterministic.
    body.u32(assets.len() as u32);
    for asset in assets.values() {
        body.string(&asset.id);
        body.string(&asset.content_type);
        body.blob(&asset.data);
    }

    body.finish()
}

struct BodyEncoder {
    buf: Vec<u8>,
}

impl BodyEncoder {
    fn new() -> Self {
        Self { buf: Vec::new() }
    }

    fn u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    fn u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn string(&mut self, value: &str) {
        self.u32(value.len() as u32);
        self.buf.extend_from_slice(value.as_bytes());
    }

    fn blob(&mut self, value: &[u8]) {
        self.u32(value.len() as u32);
        self.buf.extend_from_slice(value);
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Write a container to `dest` atomically.
///
/// The bytes go to `<dest>.tmp` in the same directory first and are
/// renamed into place only after the full write succeeds, so an
/// interrupted run never leaves a half-written file at `dest`. The temp
/// file is removed on every other exit path.
pub fn write_container(
    program: &Program,
    assets: &AssetMap,
    dest: &Path,
) -> Result<(), PackageError> {
    let bytes = encode_container(program, assets)?;

    let mut guard = TempFile::create(dest)?;
    guard
        .file
        .write_all(&bytes)
        .and_then(|()| guard.file.sync_all())
        .map_err(|source| PackageError::Io {
            path: guard.path.clone(),
            source,
        })?;
    guard.commit(dest)
}

/// Temp file that unlinks itself unless committed.
struct TempFile {
    path: PathBuf,
    file: fs::File,
    committed: bool,
}

impl TempFile {
    fn create(dest: &Path) -> Result<Self, PackageError> {
        let mut name = dest.as_os_str().to_os_string();
        name.push(".tmp");
        let path = PathBuf::from(name);
        let file = fs::File::create(&path).map_err(|source| PackageError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            file,
            committed: false,
        })
    }

    fn commit(mut self, dest: &Path) -> Result<(), PackageError> {
        fs::rename(&self.path, dest).map_err(|source| PackageError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}
