// Copyright (c) 2018 Fabian Schuiki

//! A lexer driven by an ordered list of token types.
//!
//! At every offset the matchable types are tried in the order they were handed
//! to the lexer, and the first one that matches wins. If the winner declares a
//! longer alternative and that alternative matches strictly more input, the
//! alternative is emitted instead. This resolves keyword/identifier overlaps
//! without lexer states.

use indexmap::IndexMap;
use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;

use crate::token::{Group, Pattern, Token, TokenTypeId, Vocabulary};

/// An error in the token type declarations handed to a lexer.
#[derive(Error, Debug)]
pub enum LexerDefinitionError {
    /// A token type id does not belong to the vocabulary.
    #[error("token type {0:?} is not part of the vocabulary")]
    UnknownTokenType(TokenTypeId),
    /// A regular expression failed to compile.
    #[error("invalid pattern for token type `{name}`")]
    InvalidPattern {
        /// The token type.
        name: String,
        /// The regex error.
        #[source]
        source: regex::Error,
    },
    /// A pattern matches the empty string.
    #[error("pattern of token type `{name}` can match the empty string")]
    EmptyMatch {
        /// The token type.
        name: String,
    },
    /// A longer alternative is not part of the lexer's token types.
    #[error("longer alternative `{alt}` of token type `{name}` is not handed to the lexer")]
    UnknownLongerAlt {
        /// The token type.
        name: String,
        /// The longer alternative.
        alt: String,
    },
    /// A longer alternative cannot be matched.
    #[error("longer alternative `{alt}` of token type `{name}` has no pattern")]
    LongerAltNotMatchable {
        /// The token type.
        name: String,
        /// The longer alternative.
        alt: String,
    },
    /// A token type names a category that was not declared before it.
    #[error("token type `{name}` belongs to category {category:?}, which is not declared before it")]
    UnknownCategory {
        /// The token type.
        name: String,
        /// The offending category.
        category: TokenTypeId,
    },
    /// Two token types handed to the lexer share a name.
    #[error("token type name `{0}` is used more than once")]
    DuplicateName(String),
}

/// An offset at which no token type matched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unexpected character at {line}:{column}: `{snippet}`")]
pub struct LexError {
    /// The byte offset.
    pub offset: usize,
    /// The line, starting at 1.
    pub line: usize,
    /// The column in characters, starting at 1.
    pub column: usize,
    /// The input text around the offending offset, shortened.
    pub snippet: String,
}

/// The result of tokenizing a text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LexOutput {
    /// Tokens of the default group, in source order.
    pub tokens: Vec<Token>,
    /// Tokens of the named groups, each in source order.
    pub groups: IndexMap<String, Vec<Token>>,
}

/// A lexer.
///
/// Construction validates the token types once. Afterwards the lexer is an
/// immutable value that may be shared across threads.
#[derive(Debug, Clone)]
pub struct Lexer {
    vocab: Vocabulary,
    matchers: Vec<Matcher>,
}

#[derive(Debug, Clone)]
struct Matcher {
    id: TokenTypeId,
    pattern: Compiled,
    /// Index of the longer alternative within `matchers`.
    longer_alt: Option<usize>,
    group: Group,
}

#[derive(Debug, Clone)]
enum Compiled {
    Literal(String),
    Regex(Regex),
}

impl Compiled {
    fn match_len(&self, rest: &str) -> Option<usize> {
        match *self {
            Compiled::Literal(ref lit) => {
                if rest.starts_with(lit.as_str()) {
                    Some(lit.len())
                } else {
                    None
                }
            }
            // Zero-width matches, such as a lone `\b`, make no progress.
            Compiled::Regex(ref re) => re.find(rest).map(|m| m.end()).filter(|&n| n > 0),
        }
    }
}

/// Number of characters of context included in a `LexError` before the
/// offending offset.
const SNIPPET_BEFORE: usize = 8;
/// Number of characters of context included from the offending offset on.
const SNIPPET_AFTER: usize = 16;

impl Lexer {
    /// Create a new lexer for the token types `order`, tried in that order.
    ///
    /// Types with the `NA` pattern may appear in the list; they are categories
    /// and never matched.
    pub fn new(vocab: &Vocabulary, order: &[TokenTypeId]) -> Result<Lexer, LexerDefinitionError> {
        let mut names = HashSet::new();
        for &id in order {
            let tt = vocab
                .get(id)
                .ok_or(LexerDefinitionError::UnknownTokenType(id))?;
            if let Some(category) = tt.unknown_category() {
                return Err(LexerDefinitionError::UnknownCategory {
                    name: tt.name.clone(),
                    category,
                });
            }
            if !names.insert(tt.name.as_str()) {
                return Err(LexerDefinitionError::DuplicateName(tt.name.clone()));
            }
        }

        // Compile the patterns of all matchable types.
        let mut matchers = Vec::new();
        for &id in order {
            let tt = &vocab[id];
            let pattern = match tt.pattern {
                Pattern::NA => continue,
                Pattern::Literal(ref lit) => {
                    if lit.is_empty() {
                        return Err(LexerDefinitionError::EmptyMatch {
                            name: tt.name.clone(),
                        });
                    }
                    Compiled::Literal(lit.clone())
                }
                Pattern::Regex(ref src) => {
                    let re = Regex::new(&format!(r"\A(?:{})", src)).map_err(|source| {
                        LexerDefinitionError::InvalidPattern {
                            name: tt.name.clone(),
                            source,
                        }
                    })?;
                    if re.is_match("") {
                        return Err(LexerDefinitionError::EmptyMatch {
                            name: tt.name.clone(),
                        });
                    }
                    Compiled::Regex(re)
                }
            };
            matchers.push(Matcher {
                id,
                pattern,
                longer_alt: None,
                group: tt.group.clone(),
            });
        }

        // Resolve the longer alternatives to matcher indices.
        for i in 0..matchers.len() {
            let tt = &vocab[matchers[i].id];
            let alt = match tt.longer_alt {
                Some(alt) => alt,
                None => continue,
            };
            let alt_name = vocab.name(alt).to_string();
            if !order.contains(&alt) {
                return Err(LexerDefinitionError::UnknownLongerAlt {
                    name: tt.name.clone(),
                    alt: alt_name,
                });
            }
            match matchers.iter().position(|m| m.id == alt) {
                Some(index) => matchers[i].longer_alt = Some(index),
                None => {
                    return Err(LexerDefinitionError::LongerAltNotMatchable {
                        name: tt.name.clone(),
                        alt: alt_name,
                    })
                }
            }
        }

        debug!(
            "lexer with {} matchers out of {} token types",
            matchers.len(),
            order.len()
        );
        Ok(Lexer {
            vocab: vocab.clone(),
            matchers,
        })
    }

    /// The vocabulary the lexer was built from.
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Split a text into tokens.
    ///
    /// Fails on the first offset at which no token type matches. No partial
    /// output is returned in that case.
    pub fn tokenize(&self, text: &str) -> Result<LexOutput, LexError> {
        let mut output = LexOutput::default();
        let mut offset = 0;
        let mut line = 1;
        let mut column = 1;

        while offset < text.len() {
            let rest = &text[offset..];
            let (index, len) = match self.first_match(rest) {
                Some(x) => x,
                None => {
                    return Err(LexError {
                        offset,
                        line,
                        column,
                        snippet: snippet(text, offset),
                    })
                }
            };

            let matcher = &self.matchers[index];
            let image = &rest[..len];
            let token = Token {
                kind: matcher.id,
                image: image.to_string(),
                offset,
                line,
                column,
            };
            trace!(
                "{} `{}` at {}:{}",
                matcher.id.pretty(&self.vocab),
                image,
                line,
                column
            );
            match matcher.group {
                Group::Default => output.tokens.push(token),
                Group::Skipped => (),
                Group::Named(ref name) => output
                    .groups
                    .entry(name.clone())
                    .or_insert_with(Vec::new)
                    .push(token),
            }

            for c in image.chars() {
                if c == '\n' {
                    line += 1;
                    column = 1;
                } else {
                    column += 1;
                }
            }
            offset += len;
        }

        Ok(output)
    }

    /// Find the matcher that wins at the start of `rest`, and its length.
    fn first_match(&self, rest: &str) -> Option<(usize, usize)> {
        let (index, len) = self
            .matchers
            .iter()
            .enumerate()
            .filter_map(|(i, m)| m.pattern.match_len(rest).map(|len| (i, len)))
            .next()?;
        if let Some(alt) = self.matchers[index].longer_alt {
            if let Some(alt_len) = self.matchers[alt].pattern.match_len(rest) {
                if alt_len > len {
                    return Some((alt, alt_len));
                }
            }
        }
        Some((index, len))
    }
}

/// The text surrounding `offset`, limited to the line it is on.
fn snippet(text: &str, offset: usize) -> String {
    let before: Vec<char> = text[..offset]
        .chars()
        .rev()
        .take_while(|&c| c != '\n')
        .take(SNIPPET_BEFORE)
        .collect();
    let after = text[offset..]
        .chars()
        .take_while(|&c| c != '\n')
        .take(SNIPPET_AFTER);
    before.into_iter().rev().chain(after).collect()
}
