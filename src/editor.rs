// ABOUTME: Line-editor glue binding the reader core into a rustyline REPL
//
// Grounded in the teacher's `src/highlighter.rs` (the `Helper` bundle
// pattern) generalized to the full trait set, plus
// `original_source/parser.c`'s `load_rcfile`/`get_home_path`/`repl` (§4.I).

use crate::balanced;
use crate::completion;
use crate::config;
use crate::env::Package;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::hint::Hinter;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Context, Helper};
use std::borrow::Cow;
use std::fs;
use std::path::Path;
use std::rc::Rc;

/// The rustyline `Helper` bundle: completion against a `Package`, the
/// balanced-input validator, and the highlighter reused from the teacher's
/// `highlighter` module.
pub struct ReplHelper {
    pub package: Rc<Package>,
    pub cur_package: bool,
}

impl ReplHelper {
    pub fn new(package: Rc<Package>) -> Self {
        ReplHelper {
            package,
            cur_package: true,
        }
    }
}

impl Helper for ReplHelper {}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let head = &line[..pos];
        let Some(req) = completion::parse_tail(head) else {
            return Ok((pos, Vec::new()));
        };
        let start = head.len() - req.sym_prefix.len();
        let candidates = completion::complete(&req, &self.package, self.cur_package, false)
            .into_iter()
            .map(|text| {
                let display = text.clone();
                Pair {
                    display,
                    replacement: text,
                }
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;
}

impl Validator for ReplHelper {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        if balanced::is_balanced(ctx.input()) {
            Ok(ValidationResult::Valid(None))
        } else {
            Ok(ValidationResult::Incomplete)
        }
    }
}

impl Highlighter for ReplHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        let highlighted = crate::highlighter::highlight_line(line);
        if highlighted == line {
            Cow::Borrowed(line)
        } else {
            Cow::Owned(highlighted)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

/// `get_home_path` — resolve `$HOME`. We don't have a portable `uname()`
/// check in std for the Cygwin/CYGNAL special case the original carries,
/// so non-Unix targets fall straight back to `HOME` (documented in
/// DESIGN.md as a platform simplification, matching `config::home_dir`).
pub fn get_home_path() -> Option<std::path::PathBuf> {
    config::home_dir()
}

/// World/group-writable check backing `load_rcfile`'s security refusal.
/// Mirrors `path-private-to-me-p`: on Unix, refuse anything writable by
/// someone other than its owner.
#[cfg(unix)]
fn path_private_to_me(path: &Path) -> std::io::Result<bool> {
    use std::os::unix::fs::MetadataExt;
    let meta = fs::metadata(path)?;
    Ok(meta.mode() & 0o022 == 0)
}

#[cfg(not(unix))]
fn path_private_to_me(_path: &Path) -> std::io::Result<bool> {
    Ok(true)
}

/// Outcome of attempting to load the RC file, for the caller to report.
pub enum RcLoadOutcome {
    NotFound,
    SecurityRefused,
    Loaded { forms_read: usize },
    ReadError(String),
}

/// `load_rcfile` — read and evaluate `$HOME/.txr_profile`, refusing files
/// writable by anyone but their owner.
pub fn load_rcfile(path: &Path, mut on_form: impl FnMut(crate::value::Value)) -> RcLoadOutcome {
    if !path.is_file() {
        return RcLoadOutcome::NotFound;
    }

    match path_private_to_me(path) {
        Ok(true) => {}
        Ok(false) => return RcLoadOutcome::SecurityRefused,
        Err(e) => return RcLoadOutcome::ReadError(e.to_string()),
    }

    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => return RcLoadOutcome::ReadError(e.to_string()),
    };

    let name = path.display().to_string();
    match crate::parser::read_all_forms(&name, &source, &mut on_form) {
        Ok(n) => RcLoadOutcome::Loaded { forms_read: n },
        Err(e) => RcLoadOutcome::ReadError(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_rcfile_missing_is_not_found() {
        let outcome = load_rcfile(Path::new("/nonexistent/.txr_profile"), |_| {});
        assert!(matches!(outcome, RcLoadOutcome::NotFound));
    }

    #[test]
    fn test_load_rcfile_reads_forms() {
        let dir = std::env::temp_dir().join(format!("reader-core-rc-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let rc = dir.join(".txr_profile");
        fs::write(&rc, "(a b) (c d)").unwrap();

        let mut seen = 0;
        let outcome = load_rcfile(&rc, |_| seen += 1);
        assert!(matches!(outcome, RcLoadOutcome::Loaded { forms_read: 2 }));
        assert_eq!(seen, 2);

        fs::remove_dir_all(&dir).ok();
    }
}
