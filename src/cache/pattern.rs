//! Glob Pattern Module
//!
//! Redis-compatible glob matching used for bulk invalidation, so that one
//! pattern selects the same keys in the local layer and in the remote store.
//!
//! Supported syntax:
//! - `*` matches any run of characters, including none
//! - `?` matches exactly one character
//! - `[abc]`, `[a-z]`, `[^a]` / `[!a]` match one character from a class
//! - `\x` matches `x` literally

use crate::error::{CacheError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyChar,
    AnyRun,
    Class { negated: bool, items: Vec<ClassItem> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClassItem {
    Single(char),
    Range(char, char),
}

impl ClassItem {
    fn contains(&self, c: char) -> bool {
        match *self {
            ClassItem::Single(s) => s == c,
            ClassItem::Range(lo, hi) => lo <= c && c <= hi,
        }
    }
}

// == Glob Pattern ==
/// A parsed glob pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobPattern {
    source: String,
    tokens: Vec<Token>,
}

impl GlobPattern {
    // == Parse ==
    /// Parses a glob pattern.
    ///
    /// Empty patterns, unterminated `[` classes and a dangling trailing `\`
    /// are rejected as `CacheError::InvalidPattern`.
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(CacheError::invalid_pattern(pattern, "pattern is empty"));
        }

        let mut tokens = Vec::new();
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '*' => {
                    // Collapse runs of stars, they match the same set
                    if tokens.last() != Some(&Token::AnyRun) {
                        tokens.push(Token::AnyRun);
                    }
                }
                '?' => tokens.push(Token::AnyChar),
                '\\' => match chars.next() {
                    Some(escaped) => tokens.push(Token::Literal(escaped)),
                    None => {
                        return Err(CacheError::invalid_pattern(pattern, "dangling escape"));
                    }
                },
                '[' => {
                    let negated = matches!(chars.peek(), Some('^') | Some('!'));
                    if negated {
                        chars.next();
                    }

                    let mut items = Vec::new();
                    let mut closed = false;
                    while let Some(c) = chars.next() {
                        let lo = match c {
                            ']' if !items.is_empty() => {
                                closed = true;
                                break;
                            }
                            '\\' => match chars.next() {
                                Some(escaped) => escaped,
                                None => break,
                            },
                            other => other,
                        };

                        // `a-z` is a range unless the dash is the last class character
                        let mut lookahead = chars.clone();
                        if lookahead.next() == Some('-') {
                            if let Some(hi) = lookahead.next().filter(|&h| h != ']') {
                                chars.next();
                                chars.next();
                                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                                items.push(ClassItem::Range(lo, hi));
                                continue;
                            }
                        }
                        items.push(ClassItem::Single(lo));
                    }

                    if !closed {
                        return Err(CacheError::invalid_pattern(
                            pattern,
                            "unterminated character class",
                        ));
                    }
                    tokens.push(Token::Class { negated, items });
                }
                other => tokens.push(Token::Literal(other)),
            }
        }

        Ok(Self {
            source: pattern.to_string(),
            tokens,
        })
    }

    /// The pattern text as given, suitable for `SCAN ... MATCH`.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    // == Matches ==
    /// Returns true if the whole key matches the pattern.
    ///
    /// Iterative matcher with single-star backtracking, linear in practice.
    pub fn matches(&self, key: &str) -> bool {
        let text: Vec<char> = key.chars().collect();
        let (mut t, mut p) = (0usize, 0usize);
        let mut star: Option<(usize, usize)> = None;

        while t < text.len() {
            match self.tokens.get(p) {
                Some(Token::AnyRun) => {
                    star = Some((p, t));
                    p += 1;
                    continue;
                }
                Some(token) if token_matches(token, text[t]) => {
                    p += 1;
                    t += 1;
                    continue;
                }
                _ => {}
            }

            match star {
                Some((star_p, star_t)) => {
                    // Let the last star absorb one more character
                    p = star_p + 1;
                    t = star_t + 1;
                    star = Some((star_p, star_t + 1));
                }
                None => return false,
            }
        }

        self.tokens[p..].iter().all(|token| *token == Token::AnyRun)
    }
}

fn token_matches(token: &Token, c: char) -> bool {
    match token {
        Token::Literal(l) => *l == c,
        Token::AnyChar => true,
        Token::AnyRun => true,
        Token::Class { negated, items } => items.iter().any(|item| item.contains(c)) != *negated,
    }
}

impl std::fmt::Display for GlobPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}
