//! Timer script grammar.
//!
//! A script is the editable text form of a program:
//!
//! ```text
//! title "Deep work"
//! version 1
//! default-duration 60
//!
//! step prep {
//!     title "Prepare"
//!     body "Clear the desk."
//!     duration 300
//!     next work
//!     action alert
//!     asset "sounds/ding.wav"
//! }
//! ```
//!
//! `//` comments run to end of line. Unrecognized fields are a hard
//! parse error so that compile/extract round-trips stay lossless.

mod emitter;
mod parser;

pub use emitter::emit_script;
pub use parser::parse_script;

pub(crate) use parser::is_valid_ident;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("line {line}: unexpected token '{token}'")]
    UnexpectedToken { line: usize, token: String },
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("line {line}: unknown field '{field}'")]
    UnknownField { line: usize, field: String },
    #[error("line {line}: duplicate field '{field}'")]
    DuplicateField { line: usize, field: String },
    #[error("line {line}: invalid number '{text}'")]
    InvalidNumber { line: usize, text: String },
    #[error("line {line}: unterminated string")]
    UnterminatedString { line: usize },
    #[error("line {line}: invalid escape '\\{escape}'")]
    InvalidEscape { line: usize, escape: char },
    #[error("line {line}: unknown action '{word}' (expected none, alert or auto-advance)")]
    UnknownAction { line: usize, word: String },
    #[error("line {line}: step '{step}' has no duration and no default-duration is set")]
    MissingDuration { line: usize, step: String },
}
