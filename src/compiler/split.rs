//! Top-level statement splitting for `then` stage bodies.
//!
//! A small, explicitly scoped scanner: it splits authored code on `;` only at
//! the top level, respecting nested `()`/`[]`/`{}`, string literals (single,
//! double, and template, including `${...}` interpolation), and comments. It
//! is not a JavaScript parser and never fails: input the scanner cannot
//! balance degrades to a single statement.

/// Splits `text` into top-level statements, trimmed, with terminators and
/// empty segments dropped. Unbalanced input returns the whole trimmed text
/// as one statement.
pub fn split_statements(text: &str) -> Vec<String> {
    let segments = match scan_boundaries(text) {
        Some(boundaries) => {
            let mut segments = Vec::new();
            let mut start = 0;
            for boundary in boundaries {
                segments.push(&text[start..boundary]);
                start = boundary + 1;
            }
            segments.push(&text[start..]);
            segments
        }
        None => vec![text],
    };
    segments
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// One scanning context: plain code with a delimiter depth, or the inside of
/// a template literal. `${...}` pushes a fresh code frame over the template.
enum Frame {
    Code { depth: usize },
    Template,
}

/// Byte offsets of every top-level `;`, or `None` when the input cannot be
/// balanced (unclosed string, comment, delimiter, or stray closer).
fn scan_boundaries(text: &str) -> Option<Vec<usize>> {
    let bytes = text.as_bytes();
    let mut stack = vec![Frame::Code { depth: 0 }];
    let mut boundaries = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let in_template = match stack.last() {
            Some(Frame::Template) => true,
            Some(Frame::Code { .. }) => false,
            None => return None,
        };
        if in_template {
            match bytes[i] {
                b'\\' => {
                    i += 2;
                    continue;
                }
                b'`' => {
                    stack.pop();
                }
                b'$' if bytes.get(i + 1) == Some(&b'{') => {
                    stack.push(Frame::Code { depth: 0 });
                    i += 2;
                    continue;
                }
                _ => {}
            }
        } else {
            match bytes[i] {
                b'\'' | b'"' => {
                    i = skip_string(bytes, i)?;
                    continue;
                }
                b'`' => stack.push(Frame::Template),
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    while i < bytes.len() && bytes[i] != b'\n' {
                        i += 1;
                    }
                    continue;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    let close = find_from(bytes, i + 2, b"*/")?;
                    i = close + 2;
                    continue;
                }
                b'(' | b'[' | b'{' => *code_depth(&mut stack)? += 1,
                b')' | b']' => {
                    let depth = code_depth(&mut stack)?;
                    *depth = depth.checked_sub(1)?;
                }
                b'}' => {
                    let depth = code_depth(&mut stack)?;
                    if *depth > 0 {
                        *depth -= 1;
                    } else {
                        // Closes a `${...}` interpolation, or is unbalanced.
                        stack.pop();
                        match stack.last() {
                            Some(Frame::Template) => {}
                            _ => return None,
                        }
                    }
                }
                b';' => {
                    if matches!(stack.as_slice(), [Frame::Code { depth: 0 }]) {
                        boundaries.push(i);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }

    match stack.as_slice() {
        [Frame::Code { depth: 0 }] => Some(boundaries),
        _ => None,
    }
}

fn code_depth(stack: &mut [Frame]) -> Option<&mut usize> {
    match stack.last_mut() {
        Some(Frame::Code { depth }) => Some(depth),
        _ => None,
    }
}

/// Advances past a single- or double-quoted string starting at `start`.
fn skip_string(bytes: &[u8], start: usize) -> Option<usize> {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return None,
            b if b == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn find_from(bytes: &[u8], start: usize, needle: &[u8]) -> Option<usize> {
    (start..bytes.len().saturating_sub(needle.len() - 1))
        .find(|&i| &bytes[i..i + needle.len()] == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_two_simple_expressions() {
        let stmts = split_statements("expect(1).toBe(1); expect(2).toBe(2);");
        assert_eq!(stmts, vec!["expect(1).toBe(1)", "expect(2).toBe(2)"]);
    }

    #[test]
    fn trailing_statement_without_terminator_is_kept() {
        let stmts = split_statements("expect(a).toBe(b)");
        assert_eq!(stmts, vec!["expect(a).toBe(b)"]);
    }

    #[test]
    fn semicolons_inside_nesting_and_strings_do_not_split() {
        let stmts = split_statements(
            "expect(run(() => { step(); step(); })).toBe('a;b'); check(\"x;y\");",
        );
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].starts_with("expect(run"));
    }

    #[test]
    fn template_interpolation_is_respected() {
        let stmts = split_statements("expect(`${total(1); }`).toBeDefined(); tick();");
        // The interpolation's semicolon stays inside the first statement.
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[1], "tick()");
    }

    #[test]
    fn comments_are_skipped() {
        let stmts = split_statements("a(); // trailing; comment\nb(); /* c(); */ d();");
        assert_eq!(stmts, vec!["a()", "b()", "d()"]);
    }

    #[test]
    fn unbalanced_input_degrades_to_a_single_statement() {
        let stmts = split_statements("expect(open(; broken");
        assert_eq!(stmts, vec!["expect(open(; broken"]);
        let stmts = split_statements("close());");
        assert_eq!(stmts, vec!["close());"]);
        let stmts = split_statements("tick('unterminated);");
        assert_eq!(stmts, vec!["tick('unterminated);"]);
    }

    #[test]
    fn empty_and_blank_input_yield_no_statements() {
        assert!(split_statements("").is_empty());
        assert!(split_statements("  ;;  ").is_empty());
    }
}
