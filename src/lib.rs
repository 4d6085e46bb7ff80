// Copyright (c) 2018 Fabian Schuiki

//! A toolkit for writing LL(k) recursive-descent parsers as plain Rust code.
//!
//! Token types are declared in a [`Vocabulary`] and matched by a [`Lexer`].
//! Grammar rules are closures over a [`Recorder`], handed to a
//! [`GrammarBuilder`]. Self-analysis runs every rule once to record its
//! structure, checks the grammar for left recursion and ambiguities, and
//! precomputes the lookahead of every decision. The result is an immutable
//! [`Parser`] that turns token sequences into [`ParseTree`]s.
//!
//! ```
//! use foresight::{GrammarBuilder, Lexer, Pattern, TokenType, Vocabulary};
//!
//! let mut vocab = Vocabulary::new();
//! let ws = TokenType::builder("WhiteSpace")
//!     .pattern(Pattern::regex(r"\s+"))
//!     .skipped()
//!     .build(&mut vocab);
//! let num = TokenType::builder("Number")
//!     .pattern(Pattern::regex("[0-9]+"))
//!     .build(&mut vocab);
//! let plus = TokenType::builder("Plus")
//!     .pattern(Pattern::literal("+"))
//!     .build(&mut vocab);
//! let lexer = Lexer::new(&vocab, &[ws, num, plus]).unwrap();
//!
//! let mut grammar = GrammarBuilder::new(&vocab);
//! let sum = grammar.rule("sum", move |r| {
//!     r.consume(num);
//!     r.many(|r| {
//!         r.consume(plus);
//!         r.consume(num);
//!     });
//! });
//! let parser = grammar.perform_self_analysis().unwrap();
//!
//! let tree = parser.parse_text(&lexer, sum, "1 + 2 + 3").unwrap();
//! assert_eq!(tree.token_count(), 5);
//! ```

#![deny(missing_docs)]

#[macro_use]
extern crate log;

pub mod error;
pub mod first;
pub mod grammar;
pub mod lexer;
pub mod lookahead;
pub mod parser;
pub mod record;
pub mod token;

pub use crate::error::{DefinitionError, Error, GrammarIssue};
pub use crate::grammar::{Grammar, Node, Occurrence, OccurrenceKey, OccurrenceKind, RuleId};
pub use crate::lexer::{LexError, LexOutput, Lexer, LexerDefinitionError};
pub use crate::parser::{Expected, ParseError, ParseNode, ParseTree, Parser, ParserConfig};
pub use crate::record::{Alternatives, GrammarBuilder, Recorder};
pub use crate::token::{Group, Pattern, Token, TokenType, TokenTypeId, Vocabulary};

/// A pretty printer.
pub struct Pretty<C, T> {
    ctx: C,
    item: T,
}

impl<C, T> Pretty<C, T> {
    pub(crate) fn new(ctx: C, item: T) -> Pretty<C, T> {
        Pretty { ctx, item }
    }
}
