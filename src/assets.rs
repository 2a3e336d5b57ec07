//! Loads asset files referenced by a program's steps.
//!
//! References are paths relative to the script's directory. Each
//! distinct normalized path is loaded once and becomes one [`Asset`]
//! keyed by that path, so two steps naming the same file share a single
//! container entry.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::program::{Asset, AssetMap, Program};

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("failed to read asset '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("asset reference '{reference}' escapes the script directory")]
    Escape { reference: String },
}

/// Load every asset referenced by `program`, relative to `base_dir`.
///
/// Rewrites the steps' asset references to the normalized form so that
/// they match the returned map's keys (and, later, the container's
/// asset relation).
pub fn resolve_assets(program: &mut Program, base_dir: &Path) -> Result<AssetMap, AssetError> {
    for step in &mut program.steps {
        for reference in &mut step.assets {
            *reference = normalize_reference(reference)?;
        }
    }

    let mut assets = AssetMap::new();
    for id in program.referenced_assets() {
        if assets.contains_key(id) {
            continue;
        }
        let path: PathBuf = base_dir.join(Path::new(id));
        let data = fs::read(&path).map_err(|source| AssetError::Read { path, source })?;
        assets.insert(
            id.to_string(),
            Asset {
                id: id.to_string(),
                content_type: content_type_for(id).to_string(),
                data,
            },
        );
    }

    Ok(assets)
}

/// Normalize a script asset reference into an asset id.
///
/// Ids use forward slashes and contain no `.` segments. Absolute paths
/// and `..` are rejected: an asset that lives outside the script's
/// directory cannot be re-created faithfully on extract.
pub fn normalize_reference(reference: &str) -> Result<String, AssetError> {
    let escape = || AssetError::Escape {
        reference: reference.to_string(),
    };

    if reference.starts_with('/') || reference.starts_with('\\') {
        return Err(escape());
    }

    let mut segments = Vec::new();
    for segment in reference.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => return Err(escape()),
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Err(escape());
    }

    Ok(segments.join("/"))
}

/// Content type inferred from the file extension.
pub fn content_type_for(id: &str) -> &'static str {
    let extension = id.rsplit('.').next().unwrap_or("");
    match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "m4a" | "aac" => "audio/aac",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parse_script;
    use std::io::Write;

    #[test]
    fn normalization_cleans_and_rejects() {
        assert_eq!(normalize_reference("./a/b.wav").expect("ok"), "a/b.wav");
        assert_eq!(normalize_reference("a\\b.png").expect("ok"), "a/b.png");
        assert!(matches!(
            normalize_reference("../secret.wav"),
            Err(AssetError::Escape { .. })
        ));
        assert!(matches!(
            normalize_reference("/etc/passwd"),
            Err(AssetError::Escape { .. })
        ));
        assert!(matches!(
            normalize_reference("."),
            Err(AssetError::Escape { .. })
        ));
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_for("ding.wav"), "audio/wav");
        assert_eq!(content_type_for("bell.PNG"), "image/png");
        assert_eq!(content_type_for("blob.bin"), "application/octet-stream");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    #[test]
    fn shared_references_load_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut file = fs::File::create(dir.path().join("ding.wav")).expect("create");
        file.write_all(b"RIFF").expect("write");

        let src = r#"
            step a { duration 5 asset "./ding.wav" }
            step b { duration 5 asset "ding.wav" }
        "#;
        let mut program = parse_script(src).expect("parse");
        let assets = resolve_assets(&mut program, dir.path()).expect("resolve");

        assert_eq!(assets.len(), 1);
        let asset = assets.get("ding.wav").expect("asset");
        assert_eq!(asset.content_type, "audio/wav");
        assert_eq!(asset.data, b"RIFF");
        assert_eq!(program.steps[0].assets, vec!["ding.wav"]);
        assert_eq!(program.steps[1].assets, vec!["ding.wav"]);
    }

    #[test]
    fn missing_asset_names_the_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut program =
            parse_script(r#"step a { duration 5 asset "gone.mp3" }"#).expect("parse");
        let err = resolve_assets(&mut program, dir.path()).expect_err("should fail");
        assert!(err.to_string().contains("gone.mp3"));
    }
}
