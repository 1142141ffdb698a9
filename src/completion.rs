// ABOUTME: Symbol completion engine for the line editor
//
// Grounded in `original_source/parser.c`'s `provide_completions` and
// `find_matching_syms`/`get_visible_syms` (§4.F).

use crate::env::{Bindings, Package};
use std::rc::Rc;

const GLYPH_CHARS: &str = "!$%&*+-<=>?\\_~/";

fn is_symbol_char(c: char) -> bool {
    c.is_alphanumeric() || GLYPH_CHARS.contains(c)
}

/// What syntactic role the character immediately before the symbol prefix
/// implies, matching the `kind` variable in `provide_completions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Preceded by `(` — only fbound/mbound/special-operator symbols apply.
    Callable,
    /// Preceded by `[` — only bound (variable or function) symbols apply.
    Indexable,
    /// Preceded by `.` — struct slot name.
    Slot,
    /// Preceded by `.(` or `.[` — struct method name.
    Method,
    /// No role restriction.
    Unrestricted,
}

fn classify(prev: Option<char>, pprev: Option<char>) -> Kind {
    let dwim = prev == Some('[');
    let par = prev == Some('(');
    let slot = prev == Some('.');
    let meth = pprev == Some('.') && (dwim || par);
    let quote = matches!(pprev, Some('^') | Some('\'') | Some('#'));
    let ppar = pprev == Some('(');

    if slot {
        Kind::Slot
    } else if meth {
        Kind::Method
    } else if pprev.is_none() || (!quote && !ppar) || dwim {
        match prev {
            Some('(') => Kind::Callable,
            Some('[') => Kind::Indexable,
            _ => Kind::Unrestricted,
        }
    } else {
        Kind::Unrestricted
    }
}

/// A parsed completion request: the symbol prefix being completed, the
/// literal text to re-prepend to each candidate, an optional explicit
/// package qualifier, whether it's a keyword (`:foo`), and the role kind.
#[derive(Debug, Clone)]
pub struct Request {
    pub line_prefix: String,
    pub sym_prefix: String,
    pub package_name: Option<String>,
    pub keyword: bool,
    pub kind: Kind,
}

/// Parse the tail of `data` (the text left of the cursor) into a completion
/// request, or `None` if the cursor isn't positioned after a symbol.
pub fn parse_tail(data: &str) -> Option<Request> {
    let chars: Vec<char> = data.chars().collect();
    if chars.is_empty() {
        return None;
    }

    let mut i = chars.len();
    let mut sym_start = None;
    while i > 0 && is_symbol_char(chars[i - 1]) {
        sym_start = Some(i - 1);
        i -= 1;
    }
    let sym_start = sym_start?;
    let mut end = sym_start;

    let mut keyword = false;
    let mut package_name = None;

    if end > 0 && chars[end - 1] == ':' {
        if end == 1 {
            keyword = true;
        } else {
            let colon = end - 1;
            let mut j = colon;
            let mut pkg_start = None;
            while j > 0 && is_symbol_char(chars[j - 1]) {
                pkg_start = Some(j - 1);
                j -= 1;
            }
            match pkg_start {
                Some(start) => {
                    package_name = Some(chars[start..colon].iter().collect());
                    end = start;
                }
                None => keyword = true,
            }
        }
    }

    if keyword {
        end = sym_start.saturating_sub(1);
    }

    let sym_prefix: String = chars[sym_start..].iter().collect();
    let line_prefix: String = chars[..end].iter().collect();

    let prev = if end > 0 { Some(chars[end - 1]) } else { None };
    let pprev = if end > 1 { Some(chars[end - 2]) } else { None };
    let kind = classify(prev, pprev);

    Some(Request {
        line_prefix,
        sym_prefix,
        package_name,
        keyword,
        kind,
    })
}

fn matches_role(kind: Kind, bindings: Bindings) -> bool {
    match kind {
        Kind::Callable => bindings.callable(),
        Kind::Indexable => bindings.indexable(),
        Kind::Slot | Kind::Method | Kind::Unrestricted => true,
    }
}

/// Enumerate candidate completion strings for `req`, searching `package`
/// (or, when `req.package_name` resolves elsewhere, the caller's resolved
/// package) and re-attaching `req.line_prefix`. `substring` selects
/// substring search over prefix-only matching (lino's `cpl->substring`).
pub fn complete(
    req: &Request,
    package: &Rc<Package>,
    cur_package: bool,
    substring: bool,
) -> Vec<String> {
    let qualify = req.package_name.is_some() || !cur_package;
    let pkg_label = if qualify {
        if req.keyword {
            String::new()
        } else {
            package.name.to_string()
        }
    } else {
        String::new()
    };

    let candidates: Vec<(Rc<str>, Bindings)> = match req.kind {
        Kind::Slot | Kind::Method => package
            .slot_names()
            .into_iter()
            .map(|n| (n, Bindings::default()))
            .collect(),
        _ => package.visible_symbols(cur_package && !qualify),
    };

    let mut out = Vec::new();
    for (name, bindings) in candidates {
        let found = if substring {
            name.contains(&req.sym_prefix)
        } else {
            name.starts_with(&req.sym_prefix)
        };
        if !found {
            continue;
        }
        if !matches_role(req.kind, bindings) {
            continue;
        }
        if &*name == req.sym_prefix {
            continue;
        }

        let completion = if qualify {
            format!("{}{}:{}", req.line_prefix, pkg_label, name)
        } else {
            format!("{}{}", req.line_prefix, name)
        };
        out.push(completion);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Bindings;

    #[test]
    fn test_parse_tail_simple_symbol() {
        let req = parse_tail("(print fo").unwrap();
        assert_eq!(req.sym_prefix, "fo");
        assert_eq!(req.line_prefix, "(print ");
        assert_eq!(req.kind, Kind::Unrestricted);
    }

    #[test]
    fn test_parse_tail_callable_position() {
        let req = parse_tail("(fo").unwrap();
        assert_eq!(req.sym_prefix, "fo");
        assert_eq!(req.kind, Kind::Callable);
    }

    #[test]
    fn test_parse_tail_keyword() {
        let req = parse_tail(":ke").unwrap();
        assert!(req.keyword);
        assert_eq!(req.sym_prefix, "ke");
    }

    #[test]
    fn test_parse_tail_slot_position() {
        let req = parse_tail("obj.sl").unwrap();
        assert_eq!(req.kind, Kind::Slot);
        assert_eq!(req.sym_prefix, "sl");
    }

    #[test]
    fn test_complete_filters_by_callable_role() {
        let pkg = Package::new("user");
        pkg.intern(
            "print-line",
            Bindings {
                function: true,
                ..Default::default()
            },
        );
        pkg.intern(
            "my-var",
            Bindings {
                variable: true,
                ..Default::default()
            },
        );

        let req = parse_tail("(pr").unwrap();
        let results = complete(&req, &pkg, true, false);
        assert_eq!(results, vec!["(print-line"]);

        let req2 = parse_tail("(my").unwrap();
        assert!(complete(&req2, &pkg, true, false).is_empty());
    }

    #[test]
    fn test_complete_excludes_exact_match() {
        let pkg = Package::new("user");
        pkg.intern("abc", Bindings::default());
        let req = parse_tail("abc").unwrap();
        assert!(complete(&req, &pkg, true, false).is_empty());
    }
}
