// Copyright (c) 2018 Fabian Schuiki

//! Errors raised while defining a grammar, and a combined parse-time error.
//!
//! Definition errors are defects of the grammar itself. They abort
//! self-analysis entirely, so no partially analyzed parser is ever handed out.

use std::fmt;
use thiserror::Error;

use crate::lexer::LexError;
use crate::parser::ParseError;

/// A defect in a grammar, detected during self-analysis.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// The grammar is malformed. All issues found while recording are listed.
    #[error("invalid grammar definition: {}", IssueList(.0))]
    Grammar(Vec<GrammarIssue>),
    /// Two branches of a decision may start with the same tokens.
    #[error(
        "ambiguous {decision} in rule `{rule}`: {first} and {second} may both start with <{}>",
        .prefix.join(" ")
    )]
    AmbiguousAlternatives {
        /// The rule containing the decision.
        rule: String,
        /// The decision, such as `OR2` or `MANY1`.
        decision: String,
        /// The first of the conflicting branches.
        first: String,
        /// The second of the conflicting branches.
        second: String,
        /// The token type names both branches may start with.
        prefix: Vec<String>,
    },
    /// A rule may invoke itself without consuming any token.
    #[error("left recursion: {}", .cycle.join(" -> "))]
    LeftRecursion {
        /// The rules along the cycle, starting and ending with the same rule.
        cycle: Vec<String>,
    },
}

/// A single defect found while recording a grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarIssue {
    /// A rule was declared or invoked but never given a body.
    #[error("rule `{0}` is not defined")]
    UndefinedRule(String),
    /// A rule was given a body more than once.
    #[error("rule `{0}` is defined more than once")]
    DuplicateRule(String),
    /// A rule handle does not belong to this grammar.
    #[error("rule `{rule}` invokes a rule handle that does not belong to this grammar")]
    UnknownRule {
        /// The invoking rule.
        rule: String,
    },
    /// A token type does not belong to the vocabulary.
    #[error("rule `{rule}` consumes a token type that does not belong to the vocabulary")]
    UnknownTokenType {
        /// The consuming rule.
        rule: String,
    },
    /// A token type names a category that was not declared before it.
    #[error("token type `{token}` belongs to a category that is not declared before it")]
    UnknownCategory {
        /// The token type.
        token: String,
    },
    /// Two call sites of the same rule share an occurrence index.
    #[error("rule `{rule}` invokes `{target}` more than once with index {index}")]
    DuplicateOccurrence {
        /// The invoking rule.
        rule: String,
        /// The invoked rule.
        target: String,
        /// The shared index.
        index: u32,
    },
    /// An alternation without alternatives.
    #[error("{decision} in rule `{rule}` has no alternatives")]
    EmptyAlternation {
        /// The rule containing the alternation.
        rule: String,
        /// The decision, such as `OR1`.
        decision: String,
    },
    /// A repetition whose body may match no tokens at all.
    #[error("{decision} in rule `{rule}` repeats `{body}`, which can match empty input")]
    EmptyRepetition {
        /// The rule containing the repetition.
        rule: String,
        /// The decision, such as `MANY1`.
        decision: String,
        /// The repeated body.
        body: String,
    },
    /// The configured lookahead depth is zero.
    #[error("lookahead depth must be at least 1")]
    InvalidLookahead,
}

struct IssueList<'a>(&'a [GrammarIssue]);

impl<'a> fmt::Display for IssueList<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, issue) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", issue)?;
        }
        Ok(())
    }
}

/// An error while turning a text into a parse tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The text could not be tokenized.
    #[error(transparent)]
    Lex(#[from] LexError),
    /// The tokens did not match the grammar.
    #[error(transparent)]
    Parse(#[from] ParseError),
}
