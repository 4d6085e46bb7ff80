// Copyright (c) 2018 Fabian Schuiki

//! Execution of a frozen grammar against a token sequence.
//!
//! The parser replays the recorded rule bodies against real tokens. Every
//! decision consults its precomputed lookahead function and commits to the
//! selected branch; there is no backtracking.

use indexmap::IndexMap;
use std::fmt;
use thiserror::Error;

use crate::error::Error;
use crate::grammar::{Grammar, Node, Occurrence, OccurrenceKey, OccurrenceKind, RuleId};
use crate::lexer::Lexer;
use crate::lookahead::LookaheadFunction;
use crate::token::{Token, TokenTypeId, Vocabulary};

/// Configuration of a parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    /// The number of upcoming tokens a decision may look at.
    pub max_lookahead: usize,
    /// Whether a parse must consume all tokens.
    pub require_full_input: bool,
    /// The number of rule invocations that may be nested within each other.
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> ParserConfig {
        ParserConfig {
            max_lookahead: 1,
            require_full_input: true,
            max_depth: 128,
        }
    }
}

impl ParserConfig {
    /// Specify the lookahead depth.
    pub fn max_lookahead(mut self, v: usize) -> Self {
        self.max_lookahead = v;
        self
    }

    /// Specify whether a parse must consume all tokens.
    pub fn require_full_input(mut self, v: bool) -> Self {
        self.require_full_input = v;
        self
    }

    /// Specify the nesting limit for rule invocations.
    pub fn max_depth(mut self, v: usize) -> Self {
        self.max_depth = v;
        self
    }
}

/// A parser for a frozen grammar.
///
/// Produced by [`GrammarBuilder::perform_self_analysis`]. The parser is
/// immutable and may be shared across threads; every call to [`parse`] keeps
/// its state to itself.
///
/// [`GrammarBuilder::perform_self_analysis`]: crate::record::GrammarBuilder::perform_self_analysis
/// [`parse`]: Parser::parse
#[derive(Debug, Clone)]
pub struct Parser {
    vocab: Vocabulary,
    grammar: Grammar,
    lookahead: IndexMap<OccurrenceKey, LookaheadFunction>,
    config: ParserConfig,
}

/// A concrete syntax tree produced by a successful parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTree {
    /// The rule that produced this tree.
    pub rule: RuleId,
    /// The consumed tokens and nested trees, in input order.
    pub children: Vec<ParseNode>,
}

/// A child of a parse tree.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseNode {
    Token(Token),
    Tree(ParseTree),
}

impl ParseTree {
    /// Call a closure on every token of the tree, in input order.
    pub fn for_each_token<F: FnMut(&Token)>(&self, f: &mut F) {
        for child in &self.children {
            match *child {
                ParseNode::Token(ref token) => f(token),
                ParseNode::Tree(ref tree) => tree.for_each_token(f),
            }
        }
    }

    /// The number of tokens in the tree.
    pub fn token_count(&self) -> usize {
        let mut count = 0;
        self.for_each_token(&mut |_| count += 1);
        count
    }

    /// The nested trees produced by the given rule, directly below this one.
    pub fn subtrees(&self, rule: RuleId) -> impl Iterator<Item = &ParseTree> {
        self.children.iter().filter_map(move |c| match *c {
            ParseNode::Tree(ref t) if t.rule == rule => Some(t),
            _ => None,
        })
    }
}

/// What a parser expected when it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expected {
    /// One of the named token types.
    Tokens(Vec<String>),
    /// Something matching the description of an `or`.
    Description(String),
    /// The end of the input.
    EndOfInput,
    /// Rule invocations nested no deeper than the given limit.
    NestingLimit(usize),
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Expected::Tokens(ref names) => match names.len() {
                0 => write!(f, "nothing"),
                1 => write!(f, "{}", names[0]),
                _ => write!(f, "one of {}", names.join(", ")),
            },
            Expected::Description(ref desc) => write!(f, "{}", desc),
            Expected::EndOfInput => write!(f, "end of input"),
            Expected::NestingLimit(limit) => {
                write!(f, "at most {} nested rule invocations", limit)
            }
        }
    }
}

/// A mismatch between the grammar and the input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("in `{rule}`{}: expected {expected}, found {}", Site(.occurrence), Found(.found))]
pub struct ParseError {
    /// The rule in which the mismatch occurred.
    pub rule: String,
    /// The construct at which it occurred, if any.
    pub occurrence: Option<Occurrence>,
    /// What was expected.
    pub expected: Expected,
    /// The offending token, or `None` at the end of input.
    pub found: Option<Token>,
    /// The index of the offending token within the token sequence.
    pub position: usize,
}

struct Site<'a>(&'a Option<Occurrence>);

impl<'a> fmt::Display for Site<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self.0 {
            Some(occ) => write!(f, " at {}", occ),
            None => Ok(()),
        }
    }
}

struct Found<'a>(&'a Option<Token>);

impl<'a> fmt::Display for Found<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self.0 {
            Some(ref token) => write!(f, "`{}` at {}:{}", token.image, token.line, token.column),
            None => write!(f, "end of input"),
        }
    }
}

/// Errors are boxed while unwinding through the interpreter to keep its
/// stack frames small.
type Failure = Box<ParseError>;

/// The position within the token sequence of one parse.
struct Cursor<'t> {
    tokens: &'t [Token],
    index: usize,
    /// The number of rule invocations currently active.
    depth: usize,
}

impl<'t> Cursor<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.index)
    }

    fn upcoming(&self) -> &'t [Token] {
        &self.tokens[self.index.min(self.tokens.len())..]
    }
}

impl Parser {
    pub(crate) fn new(
        vocab: Vocabulary,
        grammar: Grammar,
        lookahead: IndexMap<OccurrenceKey, LookaheadFunction>,
        config: ParserConfig,
    ) -> Parser {
        Parser {
            vocab,
            grammar,
            lookahead,
            config,
        }
    }

    /// The recorded grammar.
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// The token vocabulary.
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    /// The configuration the parser was built with.
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Look up a rule by name.
    pub fn rule_by_name(&self, name: &str) -> Option<RuleId> {
        self.grammar.lookup(name)
    }

    /// The name of a rule.
    pub fn rule_name(&self, rule: RuleId) -> &str {
        self.grammar.get(rule).map(|r| r.name.as_str()).unwrap_or("?")
    }

    /// The lookahead function of a decision.
    pub fn lookahead(&self, key: &OccurrenceKey) -> Option<&LookaheadFunction> {
        self.lookahead.get(key)
    }

    /// Parse a token sequence, starting with the given rule.
    pub fn parse(&self, rule: RuleId, tokens: &[Token]) -> Result<ParseTree, ParseError> {
        let mut cursor = Cursor {
            tokens,
            index: 0,
            depth: 0,
        };
        let tree = self.invoke(rule, &mut cursor).map_err(|e| *e)?;
        if self.config.require_full_input {
            if let Some(token) = cursor.peek() {
                return Err(ParseError {
                    rule: self.rule_name(rule).to_string(),
                    occurrence: None,
                    expected: Expected::EndOfInput,
                    found: Some(token.clone()),
                    position: cursor.index,
                });
            }
        }
        Ok(tree)
    }

    /// Tokenize a text and parse it, starting with the given rule.
    pub fn parse_text(&self, lexer: &Lexer, rule: RuleId, text: &str) -> Result<ParseTree, Error> {
        let output = lexer.tokenize(text)?;
        Ok(self.parse(rule, &output.tokens)?)
    }

    fn invoke(&self, rule: RuleId, cursor: &mut Cursor) -> Result<ParseTree, Failure> {
        let body = match self.grammar.get(rule) {
            Some(r) => &r.body,
            None => return Err(self.failure(rule, None, Expected::Tokens(vec![]), cursor)),
        };
        if cursor.depth >= self.config.max_depth {
            let expected = Expected::NestingLimit(self.config.max_depth);
            return Err(self.failure(rule, None, expected, cursor));
        }
        trace!("enter {} at token {}", self.rule_name(rule), cursor.index);
        cursor.depth += 1;
        let mut children = Vec::new();
        let result = self.execute(rule, body, cursor, &mut children);
        cursor.depth -= 1;
        result?;
        Ok(ParseTree { rule, children })
    }

    fn predict(&self, key: OccurrenceKey, cursor: &Cursor) -> Option<usize> {
        self.lookahead
            .get(&key)
            .and_then(|f| f.predict(cursor.upcoming()))
    }

    fn execute(
        &self,
        rule: RuleId,
        node: &Node,
        cursor: &mut Cursor,
        out: &mut Vec<ParseNode>,
    ) -> Result<(), Failure> {
        match *node {
            Node::Terminal { token, occurrence } => match cursor.peek() {
                Some(t) if self.vocab.matches(t.kind, token) => {
                    out.push(ParseNode::Token(t.clone()));
                    cursor.index += 1;
                    Ok(())
                }
                _ => Err(self.failure(
                    rule,
                    Some(Occurrence::new(OccurrenceKind::Consume, occurrence)),
                    Expected::Tokens(vec![self.vocab.name(token).to_string()]),
                    cursor,
                )),
            },
            Node::Sequence(ref children) => {
                for child in children {
                    self.execute(rule, child, cursor, out)?;
                }
                Ok(())
            }
            Node::Optional {
                ref body,
                occurrence,
            } => {
                let key = OccurrenceKey::new(rule, OccurrenceKind::Option, occurrence);
                if self.predict(key, cursor) == Some(0) {
                    self.execute(rule, body, cursor, out)?;
                }
                Ok(())
            }
            Node::Repetition {
                ref body,
                occurrence,
                at_least_one,
            } => {
                let kind = if at_least_one {
                    OccurrenceKind::AtLeastOne
                } else {
                    OccurrenceKind::Many
                };
                let key = OccurrenceKey::new(rule, kind, occurrence);
                if at_least_one && self.predict(key, cursor) != Some(0) {
                    return Err(self.failure(
                        rule,
                        Some(key.occurrence),
                        Expected::Tokens(self.first_token_names(key)),
                        cursor,
                    ));
                }
                while self.predict(key, cursor) == Some(0) {
                    self.execute(rule, body, cursor, out)?;
                }
                Ok(())
            }
            Node::Alternation {
                ref alternatives,
                occurrence,
                ref description,
            } => {
                let key = OccurrenceKey::new(rule, OccurrenceKind::Or, occurrence);
                match self
                    .predict(key, cursor)
                    .and_then(|i| alternatives.get(i))
                {
                    Some(alt) => self.execute(rule, alt, cursor, out),
                    None => Err(self.failure(
                        rule,
                        Some(key.occurrence),
                        Expected::Description(description.clone()),
                        cursor,
                    )),
                }
            }
            Node::RuleRef { rule: callee, .. } => {
                let tree = self.invoke(callee, cursor)?;
                out.push(ParseNode::Tree(tree));
                Ok(())
            }
        }
    }

    fn first_token_names(&self, key: OccurrenceKey) -> Vec<String> {
        let first: &[TokenTypeId] = self
            .lookahead
            .get(&key)
            .map(|f| f.first_tokens(0))
            .unwrap_or(&[]);
        first
            .iter()
            .map(|&t| self.vocab.name(t).to_string())
            .collect()
    }

    fn failure(
        &self,
        rule: RuleId,
        occurrence: Option<Occurrence>,
        expected: Expected,
        cursor: &Cursor,
    ) -> Failure {
        Box::new(ParseError {
            rule: self.rule_name(rule).to_string(),
            occurrence,
            expected,
            found: cursor.peek().cloned(),
            position: cursor.index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::GrammarBuilder;
    use crate::token::{Pattern, TokenType};
    use assert_matches::assert_matches;

    struct Fixture {
        lexer: Lexer,
        parser: Parser,
        list: RuleId,
    }

    /// `list := Ident {Comma Ident}+ [Semi]`
    fn fixture(config: ParserConfig) -> Fixture {
        let mut v = Vocabulary::new();
        let ws = TokenType::builder("WhiteSpace")
            .pattern(Pattern::regex(r"\s+"))
            .skipped()
            .build(&mut v);
        let ident = TokenType::builder("Ident")
            .pattern(Pattern::regex("[a-z]+"))
            .build(&mut v);
        let comma = TokenType::builder("Comma")
            .pattern(Pattern::literal(","))
            .build(&mut v);
        let semi = TokenType::builder("Semi")
            .pattern(Pattern::literal(";"))
            .build(&mut v);
        let lexer = Lexer::new(&v, &[ws, ident, comma, semi]).unwrap();
        let mut g = GrammarBuilder::with_config(&v, config);
        let list = g.rule("list", move |r| {
            r.consume(ident);
            r.at_least_one(|r| {
                r.consume(comma);
                r.consume(ident);
            });
            r.option(|r| r.consume(semi));
        });
        Fixture {
            lexer,
            parser: g.perform_self_analysis().unwrap(),
            list,
        }
    }

    #[test]
    fn parses_and_builds_tree() {
        let f = fixture(ParserConfig::default());
        let tree = f.parser.parse_text(&f.lexer, f.list, "a, b, c;").unwrap();
        assert_eq!(tree.rule, f.list);
        assert_eq!(tree.token_count(), 6);
        let mut images = Vec::new();
        tree.for_each_token(&mut |t| images.push(t.image.clone()));
        assert_eq!(images, vec!["a", ",", "b", ",", "c", ";"]);
    }

    #[test]
    fn at_least_one_requires_an_iteration() {
        let f = fixture(ParserConfig::default());
        let err = f.parser.parse_text(&f.lexer, f.list, "a;").unwrap_err();
        assert_matches!(err, Error::Parse(ParseError {
            occurrence: Some(Occurrence { kind: OccurrenceKind::AtLeastOne, index: 1 }),
            ref expected,
            position: 1,
            ..
        }) if expected == &Expected::Tokens(vec!["Comma".into()]));
    }

    #[test]
    fn leftover_tokens_fail_unless_allowed() {
        let f = fixture(ParserConfig::default());
        let err = f.parser.parse_text(&f.lexer, f.list, "a, b; c").unwrap_err();
        assert_matches!(err, Error::Parse(ParseError {
            expected: Expected::EndOfInput,
            position: 4,
            ..
        }));

        let f = fixture(ParserConfig::default().require_full_input(false));
        let tree = f.parser.parse_text(&f.lexer, f.list, "a, b; c").unwrap();
        assert_eq!(tree.token_count(), 4);
    }

    #[test]
    fn end_of_input_is_reported() {
        let f = fixture(ParserConfig::default());
        let err = f.parser.parse_text(&f.lexer, f.list, "a,").unwrap_err();
        assert_matches!(err, Error::Parse(ParseError { found: None, position: 2, .. }));
        assert_eq!(
            err.to_string(),
            "in `list` at CONSUME2: expected Ident, found end of input"
        );
    }
}
