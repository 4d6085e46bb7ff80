// Copyright (c) 2018 Fabian Schuiki

//! Token types, categories, and token instances.
//!
//! A token type is a named classification of lexical units. Each type either
//! carries a pattern the lexer can match, or the `NA` pattern which makes it a
//! purely categorical supertype. Types may declare the categories they belong
//! to; since a category has to be declared before any of its members, the
//! category hierarchy is acyclic by construction.

use bit_set::BitSet;
use std::collections::HashMap;
use std::fmt;
use std::ops::Index;

use crate::Pretty;

/// The pattern of a token type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// No pattern. The type is a category and is never matched directly.
    NA,
    /// A literal string.
    Literal(String),
    /// A regular expression, implicitly anchored at the current offset.
    Regex(String),
}

impl Pattern {
    /// Create a literal pattern.
    pub fn literal<S: Into<String>>(text: S) -> Pattern {
        Pattern::Literal(text.into())
    }

    /// Create a regular expression pattern.
    pub fn regex<S: Into<String>>(src: S) -> Pattern {
        Pattern::Regex(src.into())
    }

    /// Whether the lexer can match this pattern.
    pub fn is_matchable(&self) -> bool {
        *self != Pattern::NA
    }
}

/// The output channel of a token type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Group {
    /// Tokens end up in the main token sequence.
    Default,
    /// Tokens are matched but dropped.
    Skipped,
    /// Tokens are collected in a separate, named channel.
    Named(String),
}

impl Default for Group {
    fn default() -> Group {
        Group::Default
    }
}

/// A token type.
#[derive(Debug, Clone)]
pub struct TokenType {
    /// The id of this token type.
    pub id: TokenTypeId,
    /// The name of the token type.
    pub name: String,
    /// The match pattern.
    pub pattern: Pattern,
    /// The output channel.
    pub group: Group,
    /// A type to prefer if it matches strictly more input.
    pub longer_alt: Option<TokenTypeId>,
    /// The categories this type is directly declared to belong to.
    pub categories: Vec<TokenTypeId>,
    /// This type and all its transitive categories.
    ancestors: BitSet,
}

impl TokenType {
    /// Start building a new token type.
    pub fn builder<S: Into<String>>(name: S) -> TokenTypeBuilder {
        TokenTypeBuilder {
            name: name.into(),
            pattern: Pattern::NA,
            group: Group::Default,
            longer_alt: None,
            categories: Vec::new(),
        }
    }

    /// The first of the declared categories that was not declared before
    /// this type, if any.
    ///
    /// Such categories are ignored when deciding whether a token is accepted.
    pub fn unknown_category(&self) -> Option<TokenTypeId> {
        self.categories
            .iter()
            .cloned()
            .find(|c| c.as_usize() >= self.id.as_usize())
    }

    /// Whether a token of this type is accepted where `expected` is.
    ///
    /// This is the case if the type is `expected` itself, or if `expected` is
    /// one of its transitive categories.
    pub fn is_a(&self, expected: TokenTypeId) -> bool {
        self.ancestors.contains(expected.as_usize())
    }
}

/// A builder for token types.
pub struct TokenTypeBuilder {
    name: String,
    pattern: Pattern,
    group: Group,
    longer_alt: Option<TokenTypeId>,
    categories: Vec<TokenTypeId>,
}

impl TokenTypeBuilder {
    /// Specify the match pattern. Defaults to `Pattern::NA`.
    pub fn pattern(mut self, v: Pattern) -> Self {
        self.pattern = v;
        self
    }

    /// Specify the output channel.
    pub fn group(mut self, v: Group) -> Self {
        self.group = v;
        self
    }

    /// Shorthand for `group(Group::Skipped)`.
    pub fn skipped(self) -> Self {
        self.group(Group::Skipped)
    }

    /// Specify the type to prefer when it matches strictly more input.
    pub fn longer_alt(mut self, v: TokenTypeId) -> Self {
        self.longer_alt = Some(v);
        self
    }

    /// Add a category this type belongs to.
    pub fn category(mut self, v: TokenTypeId) -> Self {
        self.categories.push(v);
        self
    }

    /// Build the token type.
    pub fn build(self, vocab: &mut Vocabulary) -> TokenTypeId {
        vocab.add(self)
    }
}

/// A set of token types.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    types: Vec<TokenType>,
    names: HashMap<String, TokenTypeId>,
}

impl Vocabulary {
    /// Create a new empty vocabulary.
    pub fn new() -> Vocabulary {
        Default::default()
    }

    fn add(&mut self, builder: TokenTypeBuilder) -> TokenTypeId {
        let id = TokenTypeId(self.types.len());
        let mut ancestors = BitSet::with_capacity(self.types.len() + 1);
        ancestors.insert(id.as_usize());
        for &cat in &builder.categories {
            if let Some(parent) = self.get(cat) {
                ancestors.union_with(&parent.ancestors);
            }
        }
        self.names.entry(builder.name.clone()).or_insert(id);
        self.types.push(TokenType {
            id,
            name: builder.name,
            pattern: builder.pattern,
            group: builder.group,
            longer_alt: builder.longer_alt,
            categories: builder.categories,
            ancestors,
        });
        id
    }

    /// Get a token type by id.
    pub fn get(&self, id: TokenTypeId) -> Option<&TokenType> {
        self.types.get(id.as_usize())
    }

    /// Look up a token type by name.
    ///
    /// If several types share a name, the first one declared is returned.
    pub fn lookup(&self, name: &str) -> Option<TokenTypeId> {
        self.names.get(name).cloned()
    }

    /// The name of a token type, or `"?"` for ids outside this vocabulary.
    pub fn name(&self, id: TokenTypeId) -> &str {
        self.get(id).map(|t| t.name.as_str()).unwrap_or("?")
    }

    /// The number of token types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate over all token types in declaration order.
    pub fn iter(&self) -> std::slice::Iter<TokenType> {
        self.types.iter()
    }

    /// Whether a token of type `actual` is accepted where `expected` is.
    pub fn matches(&self, actual: TokenTypeId, expected: TokenTypeId) -> bool {
        self.get(actual).map(|t| t.is_a(expected)).unwrap_or(false)
    }

    /// The set of all types accepted where `expected` is.
    pub fn accepted_by(&self, expected: TokenTypeId) -> BitSet {
        let mut set = BitSet::with_capacity(self.types.len());
        for t in &self.types {
            if t.is_a(expected) {
                set.insert(t.id.as_usize());
            }
        }
        set
    }
}

impl Index<TokenTypeId> for Vocabulary {
    type Output = TokenType;
    fn index(&self, id: TokenTypeId) -> &TokenType {
        &self.types[id.as_usize()]
    }
}

/// A unique token type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenTypeId(usize);

impl TokenTypeId {
    /// Create a token type id from a usize.
    pub fn from_usize(id: usize) -> TokenTypeId {
        TokenTypeId(id)
    }

    /// Obtain the id as a usize.
    pub fn as_usize(self) -> usize {
        self.0
    }

    /// Get a pretty printer for this token type.
    pub fn pretty(self, vocab: &Vocabulary) -> Pretty<&Vocabulary, Self> {
        Pretty::new(vocab, self)
    }
}

impl<'a> fmt::Display for Pretty<&'a Vocabulary, TokenTypeId> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.ctx.name(self.item))
    }
}

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    /// The type of the token.
    pub kind: TokenTypeId,
    /// The matched text.
    pub image: String,
    /// The byte offset of the token in the source.
    pub offset: usize,
    /// The line the token starts on, starting at 1.
    pub line: usize,
    /// The column the token starts at, in characters, starting at 1.
    pub column: usize,
}

impl Token {
    /// The length of the token in bytes.
    pub fn len(&self) -> usize {
        self.image.len()
    }

    /// Whether the token is empty. Lexed tokens never are.
    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }

}
