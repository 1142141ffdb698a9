// ABOUTME: Balanced-input recognizer driving the line editor's multi-line entry
//
// Direct port of `original_source/parser.c`'s `is_balanced_line` stack
// automaton — used to decide whether the REPL should keep reading more
// lines before attempting a read (§4.E).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Cmnt,
    Par,
    Bkt,
    Brc,
    Hash,
    Lit,
    Qlit,
    Rgx,
    Rgxc,
    Rgxe,
    Chr,
    Esc,
    At,
    HashB,
    Buf,
}

/// True if `line` (accumulated so far, possibly spanning several physical
/// lines joined by `\n`) is a complete, balanced top-level form — every
/// paren/bracket/brace/string/char/regex/buffer-literal/quasi-literal is
/// closed and there is no trailing line-comment left open.
pub fn is_balanced(line: &str) -> bool {
    let mut state = vec![State::Start];
    let mut count = vec![0i32];

    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        if state.len() >= 30 {
            return true;
        }

        let top = *state.last().unwrap();
        match top {
            State::Start | State::Par | State::Bkt | State::Brc => {
                if dispatch_bracket_frame(&mut state, &mut count, ch) {
                    return true;
                }
            }
            State::Cmnt => {
                if ch == '\r' {
                    state.pop();
                    count.pop();
                }
            }
            State::Hash => match ch {
                '\\' => *state.last_mut().unwrap() = State::Chr,
                '/' => *state.last_mut().unwrap() = State::Rgx,
                'b' => *state.last_mut().unwrap() = State::HashB,
                ';' => {
                    state.pop();
                    count.pop();
                }
                _ => {
                    state.pop();
                    count.pop();
                    // re-dispatch this char under the popped state
                    if rewind_and_dispatch(&mut state, &mut count, ch) {
                        return true;
                    }
                }
            },
            State::Lit => match ch {
                '"' => {
                    state.pop();
                    count.pop();
                }
                '\\' => {
                    state.push(State::Esc);
                    count.push(0);
                }
                _ => {}
            },
            State::Qlit => match ch {
                '`' => {
                    state.pop();
                    count.pop();
                }
                '\\' => {
                    state.push(State::Esc);
                    count.push(0);
                }
                '@' => {
                    state.push(State::At);
                    count.push(0);
                }
                _ => {}
            },
            State::Rgx => match ch {
                '/' => {
                    state.pop();
                    count.pop();
                }
                '[' => {
                    state.push(State::Rgxc);
                    count.push(0);
                }
                '(' => {
                    state.push(State::Rgxe);
                    count.push(0);
                }
                '\\' => {
                    state.push(State::Esc);
                    count.push(0);
                }
                _ => {}
            },
            State::Rgxc => match ch {
                ']' => {
                    state.pop();
                    count.pop();
                }
                '\\' => {
                    state.push(State::Esc);
                    count.push(0);
                }
                _ => {}
            },
            State::Rgxe => match ch {
                ')' => {
                    state.pop();
                    count.pop();
                }
                '[' => {
                    state.push(State::Rgxc);
                    count.push(0);
                }
                '(' => {
                    state.push(State::Rgxe);
                    count.push(0);
                }
                '\\' => {
                    state.push(State::Esc);
                    count.push(0);
                }
                _ => {}
            },
            State::Chr | State::Esc => {
                state.pop();
                count.pop();
            }
            State::At => match ch {
                '(' => *state.last_mut().unwrap() = State::Par,
                '[' => *state.last_mut().unwrap() = State::Bkt,
                '{' => *state.last_mut().unwrap() = State::Brc,
                _ => {
                    state.pop();
                    count.pop();
                }
            },
            State::HashB => match ch {
                '\'' => *state.last_mut().unwrap() = State::Buf,
                _ => {
                    state.pop();
                    count.pop();
                }
            },
            State::Buf => {
                if ch == '\'' {
                    state.pop();
                    count.pop();
                }
            }
        }
    }

    if *state.last().unwrap() == State::Cmnt {
        state.pop();
        count.pop();
    }

    state.len() == 1 && state[0] == State::Start && count[0] == 0
}

/// The bracket/paren frame dispatch (`ST_START`/`ST_PAR`/`ST_BKT`/`ST_BRC`
/// in the original): handles comment/hash/string/quasi-literal openers and
/// paren/bracket/brace nesting. Returns `true` when a closer was found with
/// no matching opener anywhere on the stack, signalling the caller to treat
/// the input as balanced immediately (the original's fast path for garbage
/// input — an unmatched closer can never be completed by more text).
fn dispatch_bracket_frame(state: &mut Vec<State>, count: &mut Vec<i32>, ch: char) -> bool {
    let top = *state.last().unwrap();
    match ch {
        ';' => {
            state.push(State::Cmnt);
            count.push(0);
        }
        '#' => {
            state.push(State::Hash);
            count.push(0);
        }
        '"' => {
            state.push(State::Lit);
            count.push(0);
        }
        '`' => {
            state.push(State::Qlit);
            count.push(0);
        }
        '(' => {
            if top == State::Par {
                *count.last_mut().unwrap() += 1;
            } else {
                state.push(State::Par);
                count.push(0);
            }
        }
        '[' => {
            if top == State::Bkt {
                *count.last_mut().unwrap() += 1;
            } else {
                state.push(State::Bkt);
                count.push(0);
            }
        }
        ')' | ']' | '}' => {
            let want = match ch {
                ')' => State::Par,
                ']' => State::Bkt,
                _ => State::Brc,
            };
            while state.len() > 1 && *state.last().unwrap() != want {
                state.pop();
                count.pop();
            }
            if *state.last().unwrap() != want {
                return true;
            }
            if *count.last().unwrap() == 0 {
                state.pop();
                count.pop();
            } else {
                *count.last_mut().unwrap() -= 1;
            }
        }
        _ => {}
    }
    false
}

/// The source's `ST_HASH` default case pops then re-enters the switch on
/// the same character (`goto again`). `ST_HASH` is only ever pushed from
/// inside a bracket/paren frame, so the popped state is always one of
/// those, and re-running `dispatch_bracket_frame` on it covers every case
/// the original's `goto` could land on — e.g. an unclosed `#(` must still
/// open a paren frame rather than silently drop the `(`.
fn rewind_and_dispatch(state: &mut Vec<State>, count: &mut Vec<i32>, ch: char) -> bool {
    dispatch_bracket_frame(state, count, ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_simple() {
        assert!(is_balanced("(a b c)"));
        assert!(!is_balanced("(a b c"));
    }

    #[test]
    fn test_balanced_nested() {
        assert!(is_balanced("(a (b (c)) d)"));
        assert!(!is_balanced("(a (b (c)) d"));
    }

    #[test]
    fn test_balanced_string_with_paren() {
        assert!(is_balanced(r#"(print "(not a paren")"#));
    }

    #[test]
    fn test_balanced_char_literal_does_not_open_paren() {
        assert!(is_balanced(r"(list #\( #\))"));
    }

    #[test]
    fn test_balanced_regex() {
        assert!(is_balanced("#/(ab)+/"));
        assert!(!is_balanced("#/(ab"));
    }

    #[test]
    fn test_balanced_trailing_comment() {
        assert!(is_balanced("(a b) ; trailing comment"));
    }

    #[test]
    fn test_balanced_buf_literal() {
        assert!(is_balanced("#b'deadbeef'"));
        assert!(!is_balanced("#b'dead"));
    }

    #[test]
    fn test_balanced_vector_literal_reopens_paren_after_hash() {
        assert!(!is_balanced("#(1 2 3"));
        assert!(is_balanced("#(1 2 3)"));
        assert!(is_balanced("(list #(1 2) #(3 4))"));
    }
}
