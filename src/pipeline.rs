//! The two command pipelines: create and extract.
//!
//! Both are single synchronous passes with no shared state; each stage
//! either succeeds or fails the whole run. The only internal recovery
//! anywhere is the writer's temp-file cleanup.

use std::fs;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::assets::{resolve_assets, AssetError};
use crate::container::{read_container, write_container, PackageError};
use crate::program::{AssetMap, Program};
use crate::script::{emit_script, parse_script, ParseError};
use crate::validate::{validate, CyclePolicy, ValidationError};

/// File name of the script emitted by [`extract`].
pub const SCRIPT_FILE_NAME: &str = "program.timer";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Package(#[from] PackageError),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Options for [`create`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateOptions {
    pub cycle_policy: CyclePolicy,
}

/// Compile a script file into a container at `output`.
pub fn create(script: &Path, output: &Path, options: CreateOptions) -> Result<(), PipelineError> {
    let source = fs::read_to_string(script).map_err(|source| PipelineError::Io {
        path: script.to_path_buf(),
        source,
    })?;

    let mut program = parse_script(&source)?;
    debug!(steps = program.steps.len(), title = %program.title, "parsed script");

    let base_dir = script.parent().unwrap_or(Path::new("."));
    let assets = resolve_assets(&mut program, base_dir)?;
    debug!(assets = assets.len(), "resolved assets");

    validate(&program, &assets, options.cycle_policy)?;
    if program.steps.is_empty() {
        warn!("program has no steps; writing an empty container");
    }

    write_container(&program, &assets, output)?;
    debug!(output = %output.display(), "container written");
    Ok(())
}

/// Unpack a container into `output_dir`: the script plus one file per
/// asset. Returns the path of the emitted script.
pub fn extract(container: &Path, output_dir: &Path) -> Result<PathBuf, PipelineError> {
    let (program, assets) = read_container(container)?;
    debug!(
        steps = program.steps.len(),
        assets = assets.len(),
        "container loaded"
    );

    fs::create_dir_all(output_dir).map_err(|source| PipelineError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;

    for asset in assets.values() {
        let path = asset_destination(output_dir, &asset.id)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| PipelineError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, &asset.data).map_err(|source| PipelineError::Io { path, source })?;
    }

    let script_path = output_dir.join(SCRIPT_FILE_NAME);
    fs::write(&script_path, emit_script(&program)).map_err(|source| PipelineError::Io {
        path: script_path.clone(),
        source,
    })?;

    Ok(script_path)
}

/// Load a container without touching the filesystem beyond reading it.
pub fn inspect(container: &Path) -> Result<(Program, AssetMap), PipelineError> {
    Ok(read_container(container)?)
}

/// Join an asset id onto the output directory, refusing ids that would
/// land outside it. Containers written by this tool only hold normalized
/// relative ids, but extract must not trust its input.
fn asset_destination(output_dir: &Path, id: &str) -> Result<PathBuf, PipelineError> {
    let relative = Path::new(id);
    let safe = relative.components().all(|c| matches!(c, Component::Normal(_)));
    if id.is_empty() || !safe {
        return Err(PackageError::Corrupt(format!("unsafe asset id '{id}'")).into());
    }
    Ok(output_dir.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_destinations_stay_inside_the_output_dir() {
        let dir = Path::new("/out");
        assert_eq!(
            asset_destination(dir, "a/b.wav").expect("ok"),
            Path::new("/out/a/b.wav")
        );
        assert!(asset_destination(dir, "../b.wav").is_err());
        assert!(asset_destination(dir, "/abs.wav").is_err());
        assert!(asset_destination(dir, "").is_err());
    }
}
