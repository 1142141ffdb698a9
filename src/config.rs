// ABOUTME: Configuration and constants for the reader and its REPL/editor glue

use std::path::PathBuf;

pub const VERSION: &str = "0.1.0";
pub const WELCOME_MESSAGE: &str = "Reader Core REPL";
pub const WELCOME_SUBTITLE: &str = "reads s-expressions; does not evaluate them";

/// The listener variables the original binds as dynamic globals
/// (`*listener-hist-len*`, `*listener-multi-line-p*`, ...).
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub hist_len: usize,
    pub multi_line: bool,
    pub sel_inclusive: bool,
    pub pprint: bool,
    pub greedy_eval: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            hist_len: 500,
            multi_line: true,
            sel_inclusive: false,
            pprint: false,
            greedy_eval: false,
        }
    }
}

/// `$HOME/.txr_history` — persistent line-editor history (§4.I).
pub fn history_file_name() -> &'static str {
    ".txr_history"
}

/// `$HOME/.txr_profile` — RC file loaded on REPL start (§4.I).
pub fn rc_file_name() -> &'static str {
    ".txr_profile"
}

/// Resolve `$HOME` (or `USERPROFILE` under Cygwin-flavored `uname`, per §6's
/// CLI/environment contract). We don't have a portable `uname().sysname`
/// check in std, so on non-Unix platforms we fall back straight to `HOME`
/// and document this as a platform simplification in DESIGN.md.
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

pub fn history_path() -> Option<PathBuf> {
    home_dir().map(|h| h.join(history_file_name()))
}

pub fn rc_path() -> Option<PathBuf> {
    home_dir().map(|h| h.join(rc_file_name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_listener_config() {
        let cfg = ListenerConfig::default();
        assert_eq!(cfg.hist_len, 500);
        assert!(cfg.multi_line);
        assert!(!cfg.pprint);
    }
}
