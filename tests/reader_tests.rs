// ABOUTME: Black-box integration tests over the public reader entry points

use reader_core::balanced::is_balanced;
use reader_core::completion::{self, Kind};
use reader_core::env::{Bindings, Package};
use reader_core::error::ReadError;
use reader_core::parser::{lisp_parse, nread, read_all_forms};
use reader_core::specfile::{open_txr_file, Dialect};
use reader_core::value::Value;

#[test]
fn reads_simple_list() {
    let v = nread("test", "(a b c)").unwrap();
    assert_eq!(format!("{v}"), "(a b c)");
}

#[test]
fn reads_nested_and_dotted_forms() {
    let v = nread("test", "(1 (2 . 3) 4)").unwrap();
    assert_eq!(format!("{v}"), "(1 (2 . 3) 4)");
}

#[test]
fn resolves_self_referential_circular_cons() {
    let v = nread("test", "#1=(a . #1#)").unwrap();
    if let Value::Cons(cell) = &v {
        let (car, cdr) = cell.borrow().clone();
        assert!(matches!(car, Value::Symbol(s) if &*s == "a"));
        assert!(matches!(cdr, Value::Cons(c) if std::rc::Rc::ptr_eq(&c, cell)));
    } else {
        panic!("expected cons, got {v:?}");
    }
}

#[test]
fn rejects_absurd_self_reference() {
    let err = nread("test", "#1=#1#").unwrap_err();
    assert!(matches!(err, ReadError::AbsurdCircRef { label: 1, .. }));
}

#[test]
fn rejects_dangling_reference() {
    let err = nread("test", "#2#").unwrap_err();
    assert!(matches!(err, ReadError::DanglingCircRef { label: 2, .. }));
}

#[test]
fn rejects_unexpected_character_distinctly_from_eof() {
    let err = nread("test", "]").unwrap_err();
    assert!(matches!(
        err,
        ReadError::UnexpectedChar { found: ']', position: 0, .. }
    ));
    let err = nread("test", "").unwrap_err();
    assert!(matches!(err, ReadError::NoObject { .. }));
}

#[test]
fn lisp_parse_records_a_source_location_that_nread_does_not() {
    let (v, loc) = lisp_parse("test", "(a b c)").unwrap();
    assert_eq!(format!("{v}"), "(a b c)");
    assert_eq!(loc.unwrap().line, 1);
}

#[test]
fn skips_comments_around_forms() {
    let v = nread("test", "; leading comment\n(a b) ; trailing\n").unwrap();
    assert_eq!(format!("{v}"), "(a b)");
}

#[test]
fn reads_all_top_level_forms_in_order() {
    let mut seen = Vec::new();
    let n = read_all_forms("test", "1 2 3", |v| seen.push(format!("{v}"))).unwrap();
    assert_eq!(n, 3);
    assert_eq!(seen, vec!["1", "2", "3"]);
}

#[test]
fn balanced_input_recognizer_handles_strings_and_nesting() {
    assert!(is_balanced("(a (b c) d)"));
    assert!(!is_balanced("(a (b c) d"));
    assert!(is_balanced(r#"(print "unbalanced ( inside a string")"#));
}

#[test]
fn balanced_input_recognizer_handles_unclosed_vector_literal() {
    assert!(!is_balanced("#(1 2 3"));
    assert!(is_balanced("#(1 2 3)"));
}

#[test]
fn completion_filters_candidates_by_role_and_prefix() {
    let pkg = Package::new("user");
    pkg.intern(
        "print-line",
        Bindings {
            function: true,
            ..Default::default()
        },
    );
    pkg.intern(
        "some-var",
        Bindings {
            variable: true,
            ..Default::default()
        },
    );

    let req = completion::parse_tail("(pri").unwrap();
    assert_eq!(req.kind, Kind::Callable);
    let results = completion::complete(&req, &pkg, true, false);
    assert_eq!(results, vec!["(print-line"]);
}

#[test]
fn specfile_resolver_finds_suffix_fallback() {
    let dir = std::env::temp_dir().join(format!(
        "reader-core-integration-specfile-{}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    let base = dir.join("module");
    std::fs::write(base.with_extension("tl"), "(defun f () 1)").unwrap();

    let resolved = open_txr_file(base.to_str().unwrap()).unwrap();
    assert_eq!(resolved.dialect, Dialect::Lisp);

    std::fs::remove_dir_all(&dir).ok();
}
