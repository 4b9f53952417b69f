//! Compilation of configured match patterns.
//!
//! Patterns are written in delimiter form, `/expression/flags`, the way
//! abuse-report configurations have traditionally been authored. The
//! delimiter is one of `/ # ~ ! % | , ; =`, or `{` closed by `}`. A pattern
//! that does not start with a delimiter is compiled verbatim. An empty or
//! blank pattern is rejected rather than matching everything.
//!
//! In delimited patterns without the `m` or `D` flag, a `$` outside a
//! character class also matches just before a final newline, as it does in
//! the traditional dialect. With `D` it anchors at the very end of the text.
//! Bare patterns use the `regex` crate's own `$`.

use regex::{Regex, RegexBuilder};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("empty pattern")]
    Empty,

    #[error("missing closing delimiter '{0}'")]
    MissingDelimiter(char),

    #[error("unsupported pattern flag '{0}'")]
    UnsupportedFlag(char),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

/// Compile a configured pattern into a [`Regex`]
pub fn compile(pattern: &str) -> Result<Regex, PatternError> {
    if pattern.trim().is_empty() {
        return Err(PatternError::Empty);
    }

    let Some(first) = pattern.chars().next().filter(|c| is_delimiter(*c)) else {
        return Ok(Regex::new(pattern)?);
    };

    let closing = closing_delimiter(first);
    let rest = &pattern[first.len_utf8()..];
    let end = rest
        .rfind(closing)
        .ok_or(PatternError::MissingDelimiter(closing))?;

    let expression = &rest[..end];
    let flags = &rest[end + closing.len_utf8()..];

    if expression.is_empty() {
        return Err(PatternError::Empty);
    }

    // `u` is implied: matching is always Unicode aware
    if let Some(other) = flags.chars().find(|c| !"imsxUuD".contains(*c)) {
        return Err(PatternError::UnsupportedFlag(other));
    }
    let has = |flag: char| flags.contains(flag);

    let expression = if has('m') || has('D') {
        expression.to_string()
    } else {
        dollar_before_final_newline(expression)
    };

    let regex = RegexBuilder::new(&expression)
        .case_insensitive(has('i'))
        .multi_line(has('m'))
        .dot_matches_new_line(has('s'))
        .ignore_whitespace(has('x'))
        .swap_greed(has('U'))
        .build()?;

    Ok(regex)
}

// `^`, `(`, `[`, `@` and `\` open bare expressions instead
const DELIMITERS: [char; 10] = ['/', '#', '~', '!', '%', '|', ',', ';', '=', '{'];

fn is_delimiter(c: char) -> bool {
    DELIMITERS.contains(&c)
}

fn closing_delimiter(opening: char) -> char {
    match opening {
        '{' => '}',
        other => other,
    }
}

/// Rewrite every unescaped `$` outside a character class so it also matches
/// before a trailing `\n`
fn dollar_before_final_newline(expression: &str) -> String {
    let mut out = String::with_capacity(expression.len() + 8);
    let mut chars = expression.chars().peekable();
    // nesting depth of character classes
    let mut class_depth = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '[' => {
                class_depth += 1;
                out.push(c);
                // a leading `]` (after an optional `^`) is a literal
                if chars.peek() == Some(&'^') {
                    out.push('^');
                    chars.next();
                }
                if chars.peek() == Some(&']') {
                    out.push(']');
                    chars.next();
                }
            }
            ']' if class_depth > 0 => {
                class_depth -= 1;
                out.push(c);
            }
            '$' if class_depth == 0 => out.push_str(r"(?:\n?\z)"),
            _ => out.push(c),
        }
    }

    out
}
