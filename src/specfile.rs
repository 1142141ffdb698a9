// ABOUTME: Spec-file suffix resolver — locates and classifies a source file by extension
//
// Grounded in `original_source/parser.c`'s `open_txr_file` (§4.G). That
// routine also opens the file descriptor; this crate only resolves *which*
// path and dialect to use and leaves opening to the caller, since the
// reader core has no bytecode/IO layer of its own beyond `bytecode.rs`.

use crate::error::SpecFileError;
use std::path::{Path, PathBuf};

/// Which dialect a resolved spec file should be read as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `.txr` — the non-Lisp template language (out of scope for this
    /// reader core; resolution still recognizes the suffix).
    Txr,
    /// `.tl` — plain-text Lisp source.
    Lisp,
    /// `.tlo` — compiled bytecode.
    Compiled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub path: PathBuf,
    pub dialect: Dialect,
}

fn suffix_of(name: &str) -> Option<Dialect> {
    if name.ends_with(".txr") {
        Some(Dialect::Txr)
    } else if name.ends_with(".tlo") {
        Some(Dialect::Compiled)
    } else if name.ends_with(".tl") {
        Some(Dialect::Lisp)
    } else {
        None
    }
}

/// Resolve `spec_file` to an existing path and its dialect. When the name
/// carries a recognized suffix, only that exact path is tried. Otherwise,
/// in order: the bare name (as `.txr`), `<name>.tlo`, then `<name>.tl` —
/// the same fallback order as the original, but appending the suffix
/// properly (`name.ext` rather than the source's literal `"." + name +
/// "ext"` concatenation, which is a textual quirk of its `scat` call, not
/// a path format this crate needs to reproduce).
pub fn open_txr_file(spec_file: &str) -> Result<Resolved, SpecFileError> {
    if let Some(dialect) = suffix_of(spec_file) {
        let path = PathBuf::from(spec_file);
        return if path.is_file() {
            Ok(Resolved { path, dialect })
        } else {
            Err(SpecFileError::UnableToOpen(spec_file.to_string()))
        };
    }

    let bare = Path::new(spec_file);
    if bare.is_file() {
        return Ok(Resolved {
            path: bare.to_path_buf(),
            dialect: Dialect::Txr,
        });
    }

    let tlo = PathBuf::from(format!("{spec_file}.tlo"));
    if tlo.is_file() {
        return Ok(Resolved {
            path: tlo,
            dialect: Dialect::Compiled,
        });
    }

    let tl = PathBuf::from(format!("{spec_file}.tl"));
    if tl.is_file() {
        return Ok(Resolved {
            path: tl,
            dialect: Dialect::Lisp,
        });
    }

    Err(SpecFileError::UnableToOpen(spec_file.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_suffix_of_recognizes_extensions() {
        assert_eq!(suffix_of("foo.tl"), Some(Dialect::Lisp));
        assert_eq!(suffix_of("foo.tlo"), Some(Dialect::Compiled));
        assert_eq!(suffix_of("foo.txr"), Some(Dialect::Txr));
        assert_eq!(suffix_of("foo"), None);
    }

    #[test]
    fn test_open_txr_file_exact_suffix_missing() {
        let err = open_txr_file("/nonexistent/path/does-not-exist.tl").unwrap_err();
        assert!(matches!(err, SpecFileError::UnableToOpen(_)));
    }

    #[test]
    fn test_open_txr_file_fallback_order() {
        let dir = std::env::temp_dir().join(format!(
            "reader-core-specfile-test-{}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        let base = dir.join("mymod");
        fs::write(base.with_extension("tl"), "(defun f () 1)").unwrap();

        let resolved = open_txr_file(base.to_str().unwrap()).unwrap();
        assert_eq!(resolved.dialect, Dialect::Lisp);

        fs::remove_dir_all(&dir).ok();
    }
}
