//! # Name patterns: literal or shell-style glob.
//!
//! A [`NamePattern`] is compiled once and matched many times. Compilation is the
//! only fallible step: the empty string and malformed globs are rejected there,
//! so [`NamePattern::matches`] is a pure, infallible predicate.
//!
//! ## Glob syntax
//! ```text
//! *        any run of characters, including the empty run
//! ?        exactly one character
//! [abc]    one character from the set
//! [a-z]    one character from the range
//! [^a-z]   one character outside the set (`[!a-z]` also accepted)
//! \x       the literal character x
//! ```
//! A pattern is a glob iff it contains one of `*?[]`; anything else is a literal
//! and matches by plain equality. Globs are anchored over the whole name:
//! `test-?` matches `test-1` but not `test-10`.
//!
//! Globs are translated to an anchored [`regex::Regex`].

use std::fmt;
use std::iter::Peekable;
use std::str::{Chars, FromStr};

use regex::Regex;

use crate::error::PatternError;

/// Characters whose presence makes a pattern a glob.
const GLOB_META: &[char] = &['*', '?', '[', ']'];

/// A compiled literal or glob pattern.
#[derive(Clone, Debug)]
pub struct NamePattern {
    raw: String,
    glob: Option<Regex>,
}

impl NamePattern {
    /// Compiles `pattern`.
    ///
    /// # Errors
    /// [`PatternError::InvalidPattern`] for an empty pattern or malformed glob
    /// syntax (unterminated `[`, dangling `\`, reversed range).
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(invalid(pattern, "pattern cannot be empty"));
        }
        if !pattern.contains(GLOB_META) {
            return Ok(Self {
                raw: pattern.to_owned(),
                glob: None,
            });
        }

        let source = translate(pattern).map_err(|reason| invalid(pattern, reason))?;
        let re = Regex::new(&source).map_err(|e| invalid(pattern, &e.to_string()))?;
        Ok(Self {
            raw: pattern.to_owned(),
            glob: Some(re),
        })
    }

    /// Returns true if `name` matches this pattern.
    pub fn matches(&self, name: &str) -> bool {
        match &self.glob {
            Some(re) => re.is_match(name),
            None => self.raw == name,
        }
    }

    /// True if the pattern uses glob syntax.
    pub fn is_glob(&self) -> bool {
        self.glob.is_some()
    }

    /// The pattern text as given.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for NamePattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn invalid(pattern: &str, reason: &str) -> PatternError {
    PatternError::InvalidPattern {
        pattern: pattern.to_owned(),
        reason: reason.to_owned(),
    }
}

/// Translates a glob into an anchored regex source.
fn translate(glob: &str) -> Result<String, &'static str> {
    let mut out = String::with_capacity(glob.len() * 2 + 8);
    out.push_str("(?s)^");

    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => {
                let lit = chars.next().ok_or("dangling escape at end of pattern")?;
                push_literal(&mut out, lit);
            }
            '[' => translate_class(&mut chars, &mut out)?,
            _ => push_literal(&mut out, c),
        }
    }

    out.push('$');
    Ok(out)
}

/// Translates the body of a `[...]` class; the opening bracket is consumed.
fn translate_class(chars: &mut Peekable<Chars<'_>>, out: &mut String) -> Result<(), &'static str> {
    out.push('[');
    if matches!(chars.peek(), Some('^' | '!')) {
        chars.next();
        out.push('^');
    }

    let mut members = 0usize;
    loop {
        let c = chars.next().ok_or("unterminated character class")?;
        // A leading `]` is a member, not the terminator.
        if c == ']' && members > 0 {
            break;
        }

        let lo = class_char(c, chars)?;
        let mut lookahead = chars.clone();
        let is_range = lookahead.next() == Some('-') && !matches!(lookahead.peek(), Some(']') | None);
        if is_range {
            chars.next();
            let next = chars.next().ok_or("unterminated character class")?;
            let hi = class_char(next, chars)?;
            if hi < lo {
                return Err("character range is out of order");
            }
            push_class_member(out, lo);
            out.push('-');
            push_class_member(out, hi);
        } else {
            push_class_member(out, lo);
        }
        members += 1;
    }

    out.push(']');
    Ok(())
}

fn class_char(c: char, chars: &mut Peekable<Chars<'_>>) -> Result<char, &'static str> {
    if c == '\\' {
        chars.next().ok_or("unterminated character class")
    } else {
        Ok(c)
    }
}

fn push_literal(out: &mut String, c: char) {
    let mut buf = [0u8; 4];
    out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}

fn push_class_member(out: &mut String, c: char) {
    if matches!(c, '\\' | ']' | '[' | '^' | '-' | '&' | '~') {
        out.push('\\');
    }
    out.push(c);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pat(p: &str) -> NamePattern {
        NamePattern::compile(p).unwrap()
    }

    #[test]
    fn test_literal_is_exact() {
        let p = pat("default");
        assert!(!p.is_glob());
        assert!(p.matches("default"));
        assert!(!p.matches("default-2"));
        assert!(!p.matches("kube-system"));
    }

    #[test]
    fn test_question_mark_is_exactly_one_char() {
        let p = pat("test-?");
        assert!(p.is_glob());
        assert!(p.matches("test-1"));
        assert!(p.matches("test-a"));
        assert!(!p.matches("test-10"));
        assert!(!p.matches("test"));
    }

    #[test]
    fn test_star_matches_any_run_including_empty() {
        let p = pat("go-*");
        assert!(p.matches("go-"));
        assert!(p.matches("go-service"));
        assert!(!p.matches("backend-service"));
        assert!(pat("*").matches(""));
        assert!(pat("*-dev").matches("frontend-dev"));
        assert!(!pat("*-dev").matches("frontend-dev-2"));
    }

    #[test]
    fn test_match_is_anchored() {
        assert!(!pat("front*").matches("my-frontend"));
        assert!(!pat("?").matches("ab"));
    }

    #[test]
    fn test_character_classes() {
        let p = pat("test-[abc]");
        assert!(p.matches("test-a"));
        assert!(p.matches("test-c"));
        assert!(!p.matches("test-d"));

        let r = pat("node-[0-9]");
        assert!(r.matches("node-7"));
        assert!(!r.matches("node-x"));

        let n = pat("node-[^0-9]");
        assert!(n.matches("node-x"));
        assert!(!n.matches("node-7"));
        assert!(pat("node-[!0-9]").matches("node-x"));
    }

    #[test]
    fn test_leading_bracket_and_escapes_are_literal() {
        let p = pat("a[]b]");
        assert!(p.matches("a]"));
        assert!(p.matches("ab"));
        assert!(pat(r"a\*").matches("a*"));
        assert!(!pat(r"a\*").matches("ab"));
    }

    #[test]
    fn test_regex_metacharacters_stay_literal() {
        let p = pat("team.a-*");
        assert!(p.matches("team.a-prod"));
        assert!(!p.matches("teamXa-prod"));
        assert!(pat("x[&~]").matches("x&"));
    }

    #[test]
    fn test_rejects_empty_and_malformed() {
        for bad in ["", "[invalid", "[", "ns-[a-", r"trailing\", "[z-a]", "[]"] {
            let err = NamePattern::compile(bad).unwrap_err();
            let PatternError::InvalidPattern { pattern, .. } = &err;
            assert_eq!(pattern, bad);
        }
    }

    #[test]
    fn test_match_is_pure() {
        let p = pat("api-*");
        let names = ["api-1", "web", "api-", "api"];
        let first: Vec<bool> = names.iter().map(|n| p.matches(n)).collect();
        let second: Vec<bool> = names.iter().rev().map(|n| p.matches(n)).collect();
        assert_eq!(first, second.into_iter().rev().collect::<Vec<_>>());
    }

    #[test]
    fn test_display_round_trips_text() {
        assert_eq!(pat("frontend-*").to_string(), "frontend-*");
        assert_eq!("bpfman".parse::<NamePattern>().unwrap().as_str(), "bpfman");
    }
}
