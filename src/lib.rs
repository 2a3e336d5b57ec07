//! ptimer: timer program packaging.
//!
//! Compiles a human-authored timer script (ordered, named, timed steps,
//! optionally bundling icon/sound assets) into a single portable
//! `.ptimer` container file, and decompiles a container back into an
//! editable script plus its asset files.
//!
//! ## Architecture
//!
//! ```text
//! create:  script ──parse──► Program ──resolve assets──► validate ──► container
//! extract: container ──read/verify──► Program + assets ──emit──► script + files
//! ```
//!
//! - `script`    — the text grammar: parser and emitter
//! - `assets`    — loading referenced files, content-type inference
//! - `validate`  — structural invariants, complete per-class reporting
//! - `container` — the checksummed binary format: writer and reader
//! - `pipeline`  — the `create` / `extract` compositions the CLI calls

pub mod assets;
pub mod container;
pub mod pipeline;
pub mod program;
pub mod script;
pub mod validate;

pub use container::PackageError;
pub use pipeline::{create, extract, inspect, CreateOptions, PipelineError};
pub use program::{Asset, AssetMap, Program, Step, StepAction, SCHEMA_VERSION};
pub use script::ParseError;
pub use validate::{CyclePolicy, ValidationError, Violation};
