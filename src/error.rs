// ABOUTME: Error types for the reader, spec-file resolver, and bytecode loader

use thiserror::Error;

/// Errors raised while reading a top-level form (§7: lexical/grammar,
/// circular-reference, and caller-contract failure kinds).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadError {
    #[error("{name}: unexpected character {found:?} at position {position}")]
    UnexpectedChar {
        name: String,
        found: char,
        position: usize,
    },

    #[error("{name}: unexpected end of input")]
    UnexpectedEof { name: String },

    #[error("{name}: duplicate #{label}= def")]
    DuplicateCircDef { name: String, label: i64 },

    #[error("{name}: dangling #{label}# ref")]
    DanglingCircRef { name: String, label: i64 },

    #[error("{name}: absurd #{label}# ref")]
    AbsurdCircRef { name: String, label: i64 },

    #[error("{name}: unexpected surplus #{label}# ref")]
    SurplusCircRef { name: String, label: i64 },

    #[error("{name}: not all #n# refs replaced in object")]
    UnresolvedCircRefs { name: String },

    #[error("read: {name}: end of input reached without seeing object")]
    NoObject { name: String },

    #[error("read: {name}: errors encountered")]
    ErrorsEncountered { name: String },
}

impl ReadError {
    pub fn name(&self) -> &str {
        match self {
            ReadError::UnexpectedChar { name, .. }
            | ReadError::UnexpectedEof { name }
            | ReadError::DuplicateCircDef { name, .. }
            | ReadError::DanglingCircRef { name, .. }
            | ReadError::AbsurdCircRef { name, .. }
            | ReadError::SurplusCircRef { name, .. }
            | ReadError::UnresolvedCircRefs { name }
            | ReadError::NoObject { name }
            | ReadError::ErrorsEncountered { name } => name,
        }
    }
}

/// Errors from the spec-file resolver (§4.G).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecFileError {
    #[error("unable to open {0}")]
    UnableToOpen(String),

    #[error("io error opening {path}: {message}")]
    Io { path: String, message: String },
}

/// Errors from the bytecode top-level loader (§4.H).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BytecodeError {
    #[error("cannot load {name}: version number mismatch")]
    VersionMismatch { name: String },

    #[error("cannot load {name}: malformed header")]
    MalformedHeader { name: String },

    #[error("cannot load {name}: malformed procedure descriptor")]
    MalformedDescriptor { name: String },

    #[error("cannot load {name}: {source}")]
    Read { name: String, source: ReadError },

    #[error("vm host rejected descriptor: {0}")]
    VmRejected(String),
}

/// `intr` — raised when the interactive editor is interrupted mid-read (§7).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("intr")]
pub struct Interrupted;
