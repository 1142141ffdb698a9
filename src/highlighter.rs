// ABOUTME: Syntax highlighting for the reader REPL
// Colors comments, strings, numbers, quote/unquote markers, circular-reference
// labels, and parens/brackets. No builtin/stdlib name highlighting — this
// reader has no evaluator to know what's bound.

const COLOR_RESET: &str = "\x1b[0m";
const COLOR_PARENS: &str = "\x1b[1;34m"; // Bold blue
const COLOR_NUMBER: &str = "\x1b[33m"; // Yellow
const COLOR_STRING: &str = "\x1b[32m"; // Green
const COLOR_BOOLEAN: &str = "\x1b[33m"; // Yellow
const COLOR_COMMENT: &str = "\x1b[90m"; // Bright black (gray)
const COLOR_QUOTE: &str = "\x1b[1;33m"; // Bold yellow
const COLOR_KEYWORD: &str = "\x1b[36m"; // Cyan
const COLOR_CIRC: &str = "\x1b[1;35m"; // Bold magenta

/// Colorize one line of reader input for terminal display.
pub fn highlight_line(line: &str) -> String {
    let mut result = String::new();
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            ';' => {
                result.push_str(COLOR_COMMENT);
                while i < chars.len() && chars[i] != '\n' {
                    result.push(chars[i]);
                    i += 1;
                }
                result.push_str(COLOR_RESET);
            }

            '"' => {
                result.push_str(COLOR_STRING);
                result.push('"');
                i += 1;
                while i < chars.len() {
                    if chars[i] == '\\' && i + 1 < chars.len() {
                        result.push(chars[i]);
                        result.push(chars[i + 1]);
                        i += 2;
                    } else if chars[i] == '"' {
                        result.push('"');
                        i += 1;
                        break;
                    } else {
                        result.push(chars[i]);
                        i += 1;
                    }
                }
                result.push_str(COLOR_RESET);
            }

            '0'..='9' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let num: String = chars[start..i].iter().collect();
                result.push_str(COLOR_NUMBER);
                result.push_str(&num);
                result.push_str(COLOR_RESET);
            }

            ':' => {
                let start = i;
                i += 1;
                while i < chars.len() && is_symbol_char(chars[i]) {
                    i += 1;
                }
                let kw: String = chars[start..i].iter().collect();
                result.push_str(COLOR_KEYWORD);
                result.push_str(&kw);
                result.push_str(COLOR_RESET);
            }

            // #t / #f / #n= / #n# / #\c / #/regex/ / #b'buf' / #(vector
            '#' => {
                let start = i;
                i += 1;
                if i < chars.len() && (chars[i] == 't' || chars[i] == 'f') {
                    i += 1;
                    let tok: String = chars[start..i].iter().collect();
                    result.push_str(COLOR_BOOLEAN);
                    result.push_str(&tok);
                    result.push_str(COLOR_RESET);
                } else if i < chars.len() && chars[i].is_ascii_digit() {
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                    if i < chars.len() && (chars[i] == '=' || chars[i] == '#') {
                        i += 1;
                    }
                    let tok: String = chars[start..i].iter().collect();
                    result.push_str(COLOR_CIRC);
                    result.push_str(&tok);
                    result.push_str(COLOR_RESET);
                } else {
                    result.push(chars[start]);
                }
            }

            '\'' | '`' => {
                result.push_str(COLOR_QUOTE);
                result.push(chars[i]);
                i += 1;
                result.push_str(COLOR_RESET);
            }

            ',' => {
                result.push_str(COLOR_QUOTE);
                result.push(',');
                i += 1;
                if i < chars.len() && chars[i] == '@' {
                    result.push('@');
                    i += 1;
                }
                result.push_str(COLOR_RESET);
            }

            '(' | ')' | '[' | ']' | '{' | '}' => {
                result.push_str(COLOR_PARENS);
                result.push(chars[i]);
                i += 1;
                result.push_str(COLOR_RESET);
            }

            _ => {
                result.push(chars[i]);
                i += 1;
            }
        }
    }

    result
}

fn is_symbol_char(c: char) -> bool {
    c.is_alphanumeric() || "-_?!<>=+*/%".contains(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_passes_through_plain_symbol() {
        assert_eq!(highlight_line("foo"), "foo");
    }

    #[test]
    fn test_highlight_colors_number() {
        let out = highlight_line("42");
        assert!(out.contains(COLOR_NUMBER));
        assert!(out.contains("42"));
    }

    #[test]
    fn test_highlight_colors_circ_label() {
        let out = highlight_line("#1=(a)");
        assert!(out.contains(COLOR_CIRC));
        assert!(out.contains("#1="));
    }
}
