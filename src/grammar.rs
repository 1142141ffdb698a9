// ABOUTME: Expression grammar — nom combinators turning source text into Values
// Generalizes the teacher's nom-based parser.rs to the full value model and
// to `#n=`/`#n#` circular-reference syntax, grounded in `original_source/parser.c`'s
// recursive-descent grammar for the same surface syntax.

use nom::{
    branch::alt,
    bytes::complete::{escaped, tag, take_while},
    character::complete::{char, digit1, multispace1, none_of, one_of, satisfy},
    combinator::{map, not, opt, peek, recognize, value},
    multi::many0,
    IResult, Parser,
};

use crate::circ::CircTable;
use crate::value::Value;
use std::cell::RefCell;

thread_local! {
    static PENDING_DOCS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

pub fn set_pending_docs(docs: Vec<String>) {
    PENDING_DOCS.with(|d| *d.borrow_mut() = docs);
}

pub fn take_pending_docs() -> Vec<String> {
    PENDING_DOCS.with(|d| std::mem::take(&mut *d.borrow_mut()))
}

fn parse_doc_comment(input: &str) -> IResult<&str, String> {
    let (input, _) = tag(";;;")(input)?;
    let (input, text) = take_while(|c| c != '\n')(input)?;
    Ok((input, text.trim().to_string()))
}

fn parse_regular_comment(input: &str) -> IResult<&str, ()> {
    let (input, _) = char(';')(input)?;
    let (input, _) = not(peek(char(';'))).parse(input)?;
    let (input, _) = take_while(|c| c != '\n')(input)?;
    Ok((input, ()))
}

fn parse_double_comment(input: &str) -> IResult<&str, ()> {
    let (input, _) = tag(";;")(input)?;
    let (input, _) = not(peek(char(';'))).parse(input)?;
    let (input, _) = take_while(|c| c != '\n')(input)?;
    Ok((input, ()))
}

pub fn ws_and_comments(input: &str) -> IResult<&str, ()> {
    many0(alt((
        value((), multispace1),
        parse_double_comment,
        parse_regular_comment,
        value((), map(parse_doc_comment, |_| ())),
    )))
    .map(|_| ())
    .parse(input)
}

pub fn ws_and_collect_docs(input: &str) -> IResult<&str, Vec<String>> {
    let mut docs = Vec::new();
    let mut input = input;

    loop {
        let start = input;

        if let Ok((rest, _)) = multispace1::<_, nom::error::Error<_>>(input) {
            input = rest;
            continue;
        }
        if let Ok((rest, doc)) = parse_doc_comment(input) {
            docs.push(doc);
            input = rest;
            if let Ok((rest, _)) = char::<_, nom::error::Error<_>>('\n')(input) {
                input = rest;
            }
            continue;
        }
        if let Ok((rest, _)) = parse_double_comment(input) {
            input = rest;
            if let Ok((rest, _)) = char::<_, nom::error::Error<_>>('\n')(input) {
                input = rest;
            }
            continue;
        }
        if let Ok((rest, _)) = parse_regular_comment(input) {
            input = rest;
            if let Ok((rest, _)) = char::<_, nom::error::Error<_>>('\n')(input) {
                input = rest;
            }
            continue;
        }
        if start == input {
            break;
        }
    }

    Ok((input, docs))
}

fn parse_number(input: &str) -> IResult<&str, Value> {
    map(
        recognize((
            opt(char('-')),
            alt((
                recognize((digit1, opt((char('.'), opt(digit1))))),
                recognize((char('.'), digit1)),
            )),
        )),
        |num_str: &str| Value::Number(num_str.parse().expect("grammar guarantees valid float")),
    )
    .parse(input)
}

fn parse_bool(input: &str) -> IResult<&str, Value> {
    alt((
        value(Value::Bool(true), tag("#t")),
        value(Value::Bool(false), tag("#f")),
    ))
    .parse(input)
}

fn is_symbol_lead(c: char) -> bool {
    c.is_alphabetic() || "+-*/%<>=!?.".contains(c)
}

fn is_symbol_cont(c: char) -> bool {
    c.is_alphanumeric() || "-_?!<>=+*/%.".contains(c)
}

fn symbol_text(input: &str) -> IResult<&str, String> {
    let (input, first) = satisfy(is_symbol_lead)(input)?;
    let (input, rest) = take_while(is_symbol_cont)(input)?;
    let mut s = String::new();
    s.push(first);
    s.push_str(rest);
    Ok((input, s))
}

fn parse_symbol(input: &str) -> IResult<&str, Value> {
    map(symbol_text, Value::symbol).parse(input)
}

/// `:keyword`
fn parse_keyword(input: &str) -> IResult<&str, Value> {
    let (input, _) = char(':')(input)?;
    let (input, name) = symbol_text(input)?;
    Ok((input, Value::Keyword(name.into())))
}

fn parse_string(input: &str) -> IResult<&str, Value> {
    let (input, _) = char('"')(input)?;

    if let Ok((input, _)) = char::<_, nom::error::Error<_>>('"')(input) {
        return Ok((input, Value::String("".into())));
    }

    let (input, content) = escaped(none_of("\"\\"), '\\', one_of("\"\\nt"))(input)?;
    let (input, _) = char('"')(input)?;

    let mut result = String::new();
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                match next {
                    'n' => result.push('\n'),
                    't' => result.push('\t'),
                    '\\' => result.push('\\'),
                    '"' => result.push('"'),
                    _ => {
                        result.push('\\');
                        result.push(next);
                    }
                }
            }
        } else {
            result.push(c);
        }
    }

    Ok((input, Value::String(result.into())))
}

/// `#\a`, `#\space`, `#\newline`
fn parse_char(input: &str) -> IResult<&str, Value> {
    let (input, _) = tag("#\\")(input)?;
    alt((
        value(Value::Char(' '), tag("space")),
        value(Value::Char('\n'), tag("newline")),
        value(Value::Char('\t'), tag("tab")),
        map(satisfy(|_| true), Value::Char),
    ))
    .parse(input)
}

/// `#/regex/`
fn parse_regex(input: &str) -> IResult<&str, Value> {
    let (input, _) = tag("#/")(input)?;
    let (input, body) = take_while(|c| c != '/')(input)?;
    let (input, _) = char('/')(input)?;
    Ok((input, Value::Regex(body.into())))
}

/// `#b'deadbeef'` — buffer literal, hex pairs.
fn parse_buf(input: &str) -> IResult<&str, Value> {
    let (input, _) = tag("#b'")(input)?;
    let (input, hex) = take_while(|c: char| c.is_ascii_hexdigit())(input)?;
    let (input, _) = char('\'')(input)?;
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    let mut chars = hex.chars();
    while let (Some(a), Some(b)) = (chars.next(), chars.next()) {
        let byte = u8::from_str_radix(&format!("{a}{b}"), 16).unwrap_or(0);
        bytes.push(byte);
    }
    Ok((input, Value::Buf(std::rc::Rc::new(RefCell::new(bytes)))))
}

fn parse_quote(input: &str, circ: &mut CircTable) -> IResult<&str, Value> {
    let (input, _) = char('\'')(input)?;
    let (input, expr) = parse_expr(input, circ)?;
    Ok((input, Value::list(vec![Value::symbol("quote"), expr])))
}

fn parse_quasiquote(input: &str, circ: &mut CircTable) -> IResult<&str, Value> {
    let (input, _) = char('`')(input)?;
    let (input, expr) = parse_expr(input, circ)?;
    Ok((input, Value::list(vec![Value::symbol("quasiquote"), expr])))
}

fn parse_unquote(input: &str, circ: &mut CircTable) -> IResult<&str, Value> {
    let (input, _) = char(',')(input)?;
    if let Ok((input, _)) = char::<_, nom::error::Error<_>>('@')(input) {
        let (input, expr) = parse_expr(input, circ)?;
        Ok((
            input,
            Value::list(vec![Value::symbol("unquote-splicing"), expr]),
        ))
    } else {
        let (input, expr) = parse_expr(input, circ)?;
        Ok((input, Value::list(vec![Value::symbol("unquote"), expr])))
    }
}

fn parse_list(input: &str, circ: &mut CircTable) -> IResult<&str, Value> {
    let (input, _) = char('(')(input)?;
    let (input, _) = ws_and_comments(input)?;

    let mut items = Vec::new();
    let mut tail = Value::Nil;
    let mut remaining = input;

    loop {
        if let Ok((rest, _)) = char::<_, nom::error::Error<_>>(')')(remaining) {
            let mut out = tail;
            for item in items.into_iter().rev() {
                out = Value::cons(item, out);
            }
            return Ok((rest, out));
        }

        // dotted pair: `. expr )`
        if let Ok((rest, _)) = char::<_, nom::error::Error<_>>('.')(remaining) {
            if rest.starts_with(|c: char| c.is_whitespace() || c == '(') {
                let (rest, _) = ws_and_comments(rest)?;
                let (rest, expr) = parse_expr(rest, circ)?;
                let (rest, _) = ws_and_comments(rest)?;
                let (rest, _) = char(')')(rest)?;
                tail = expr;
                let mut out = tail;
                for item in items.into_iter().rev() {
                    out = Value::cons(item, out);
                }
                return Ok((rest, out));
            }
        }

        let (rest, expr) = parse_expr(remaining, circ)?;
        items.push(expr);

        let (rest, _) = ws_and_comments(rest)?;
        remaining = rest;
    }
}

fn parse_vector(input: &str, circ: &mut CircTable) -> IResult<&str, Value> {
    let (input, _) = tag("#(")(input)?;
    let (input, _) = ws_and_comments(input)?;

    let mut items = Vec::new();
    let mut remaining = input;
    loop {
        if let Ok((rest, _)) = char::<_, nom::error::Error<_>>(')')(remaining) {
            return Ok((
                rest,
                Value::Vector(std::rc::Rc::new(RefCell::new(items))),
            ));
        }
        let (rest, expr) = parse_expr(remaining, circ)?;
        items.push(expr);
        let (rest, _) = ws_and_comments(rest)?;
        remaining = rest;
    }
}

fn parse_uint(input: &str) -> IResult<&str, i64> {
    map(digit1, |s: &str| s.parse().unwrap_or(0)).parse(input)
}

/// `#n=expr` / `#n#`, per the circular-reference syntax (§3/§4.B).
fn parse_circ(input: &str, circ: &mut CircTable) -> IResult<&str, Value> {
    let (input, _) = char('#')(input)?;
    let (input, label) = parse_uint(input)?;

    if let Ok((input, _)) = char::<_, nom::error::Error<_>>('#')(input) {
        return Ok((input, circ.reference(label)));
    }

    let (input, _) = char('=')(input)?;
    let (input, expr) = parse_expr(input, circ)?;
    // `define` reconciles the eventual value with any placeholder already
    // vended under this label. A nom production can't fail on a semantic
    // error, so a duplicate definition is recorded for the caller to raise
    // once parsing of the enclosing form completes.
    if let Err(e) = circ.define("reader", label, expr.clone()) {
        if circ.pending_error.is_none() {
            circ.pending_error = Some(e);
        }
    }
    Ok((input, expr))
}

fn parse_expr(input: &str, circ: &mut CircTable) -> IResult<&str, Value> {
    let (input, _) = ws_and_comments(input)?;

    if input.starts_with('\'') {
        return parse_quote(input, circ);
    }
    if input.starts_with('`') {
        return parse_quasiquote(input, circ);
    }
    if input.starts_with(',') {
        return parse_unquote(input, circ);
    }
    if input.starts_with("#(") {
        return parse_vector(input, circ);
    }
    if input.starts_with("#\\") {
        return parse_char(input);
    }
    if input.starts_with("#/") {
        return parse_regex(input);
    }
    if input.starts_with("#b'") {
        return parse_buf(input);
    }
    if input.starts_with('(') {
        return parse_list(input, circ);
    }
    if input.starts_with(':') {
        return parse_keyword(input);
    }
    // `#n=` / `#n#` both start with `#` followed by a digit.
    if let Some(rest) = input.strip_prefix('#') {
        if rest.starts_with(|c: char| c.is_ascii_digit()) {
            return parse_circ(input, circ);
        }
    }

    alt((parse_bool, parse_number, parse_string, parse_symbol)).parse(input)
}

/// Where a failed parse attempt stopped — surfaced so the caller can raise
/// `ReadError::UnexpectedChar` instead of a blanket "unexpected eof" when
/// the failure was on a specific character mid-input (§7).
#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    pub position: usize,
    pub found: Option<char>,
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.found {
            Some(c) => write!(f, "unexpected character {c:?} at position {}", self.position),
            None => write!(f, "unexpected end of input at position {}", self.position),
        }
    }
}

/// Parse one top-level expression, threading circular-reference state.
pub fn parse_one<'a>(input: &'a str, circ: &mut CircTable) -> Result<(&'a str, Value), ParseFailure> {
    parse_expr(input, circ).map_err(|e| {
        let remaining = match &e {
            nom::Err::Error(err) | nom::Err::Failure(err) => Some(err.input),
            nom::Err::Incomplete(_) => None,
        };
        match remaining {
            Some(rem) if !rem.is_empty() => ParseFailure {
                position: input.len() - rem.len(),
                found: rem.chars().next(),
            },
            _ => ParseFailure {
                position: input.len(),
                found: None,
            },
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<Value, String> {
        let mut circ = CircTable::new();
        let (rest, v) = parse_one(input, &mut circ).map_err(|e| e.to_string())?;
        let (rest, _) = ws_and_comments(rest).unwrap_or((rest, ()));
        if !rest.is_empty() {
            return Err(format!("trailing input: {rest}"));
        }
        crate::circ::resolve("reader", &mut circ, &v).map_err(|e| e.to_string())?;
        Ok(v)
    }

    #[test]
    fn test_parse_number() {
        assert!(matches!(parse("42"), Ok(Value::Number(n)) if n == 42.0));
        assert!(matches!(parse("-2.5"), Ok(Value::Number(n)) if (n + 2.5).abs() < 1e-9));
    }

    #[test]
    fn test_parse_symbol_and_keyword() {
        assert!(matches!(parse("foo-bar"), Ok(Value::Symbol(s)) if &*s == "foo-bar"));
        assert!(matches!(parse(":key"), Ok(Value::Keyword(s)) if &*s == "key"));
    }

    #[test]
    fn test_parse_list_and_dotted_pair() {
        match parse("(1 2 3)") {
            Ok(v) => assert_eq!(format!("{v}"), "(1 2 3)"),
            e => panic!("{e:?}"),
        }
        match parse("(1 . 2)") {
            Ok(v) => assert_eq!(format!("{v}"), "(1 . 2)"),
            e => panic!("{e:?}"),
        }
    }

    #[test]
    fn test_parse_quote_forms() {
        match parse("'x") {
            Ok(v) => assert_eq!(format!("{v}"), "(quote x)"),
            e => panic!("{e:?}"),
        }
    }

    #[test]
    fn test_parse_circ_cons() {
        match parse("#1=(a . #1#)") {
            Ok(Value::Cons(cell)) => {
                let (car, cdr) = cell.borrow().clone();
                assert!(matches!(car, Value::Symbol(s) if &*s == "a"));
                assert!(matches!(cdr, Value::Cons(c) if std::rc::Rc::ptr_eq(&c, &cell)));
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn test_parse_char_and_regex() {
        assert!(matches!(parse("#\\a"), Ok(Value::Char('a'))));
        assert!(matches!(parse("#/ab+/"), Ok(Value::Regex(r)) if &*r == "ab+"));
    }

    #[test]
    fn test_parse_comment_skipping() {
        assert!(matches!(parse("; hi\n42"), Ok(Value::Number(n)) if n == 42.0));
    }
}
