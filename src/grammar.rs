// Copyright (c) 2018 Fabian Schuiki

//! Data structures representing a grammar.
//!
//! Every rule of a grammar is recorded once into a tree of [`Node`]s. Decision
//! points and call sites within a rule carry an occurrence index, which
//! together with the rule and the kind of construct forms an
//! [`OccurrenceKey`].

use std::fmt;
use std::ops::Index;

use crate::token::{TokenTypeId, Vocabulary};
use crate::Pretty;

/// A frozen grammar.
#[derive(Debug, Clone)]
pub struct Grammar {
    rules: Vec<Rule>,
}

/// A single rule within a grammar.
#[derive(Debug, Clone)]
pub struct Rule {
    /// The id of the rule.
    pub id: RuleId,
    /// The name of the rule.
    pub name: String,
    /// The recorded body of the rule.
    pub body: Node,
}

/// A node of a recorded rule body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Consume one token of the given type or category.
    Terminal {
        /// The expected token type.
        token: TokenTypeId,
        /// The occurrence of this token type within the rule.
        occurrence: u32,
    },
    /// A sequence of nodes.
    Sequence(Vec<Node>),
    /// An optional node.
    Optional {
        /// The optional body.
        body: Box<Node>,
        /// The occurrence index.
        occurrence: u32,
    },
    /// A repeated node.
    Repetition {
        /// The repeated body.
        body: Box<Node>,
        /// The occurrence index.
        occurrence: u32,
        /// Whether the body must match at least once.
        at_least_one: bool,
    },
    /// A choice between multiple nodes.
    Alternation {
        /// The alternatives, in declaration order.
        alternatives: Vec<Node>,
        /// The occurrence index.
        occurrence: u32,
        /// A human-readable description used in error messages.
        description: String,
    },
    /// An invocation of another rule.
    RuleRef {
        /// The invoked rule.
        rule: RuleId,
        /// The call site index.
        occurrence: u32,
    },
}

/// The kind of construct an occurrence index refers to.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OccurrenceKind {
    Consume,
    Subrule,
    Option,
    Many,
    AtLeastOne,
    Or,
}

impl fmt::Display for OccurrenceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            OccurrenceKind::Consume => "CONSUME",
            OccurrenceKind::Subrule => "SUBRULE",
            OccurrenceKind::Option => "OPTION",
            OccurrenceKind::Many => "MANY",
            OccurrenceKind::AtLeastOne => "AT_LEAST_ONE",
            OccurrenceKind::Or => "OR",
        };
        write!(f, "{}", name)
    }
}

/// A construct within a rule, such as `OPTION2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Occurrence {
    /// The kind of construct.
    pub kind: OccurrenceKind,
    /// The index among constructs of the same kind.
    pub index: u32,
}

impl Occurrence {
    /// Create a new occurrence.
    pub fn new(kind: OccurrenceKind, index: u32) -> Occurrence {
        Occurrence { kind, index }
    }
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.kind, self.index)
    }
}

/// Uniquely identifies a construct within a grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OccurrenceKey {
    /// The enclosing rule.
    pub rule: RuleId,
    /// The construct within the rule.
    pub occurrence: Occurrence,
}

impl OccurrenceKey {
    /// Create a new occurrence key.
    pub fn new(rule: RuleId, kind: OccurrenceKind, index: u32) -> OccurrenceKey {
        OccurrenceKey {
            rule,
            occurrence: Occurrence::new(kind, index),
        }
    }
}

impl Grammar {
    /// Create a grammar from its rules.
    ///
    /// The rules must be ordered by id.
    pub(crate) fn new(rules: Vec<Rule>) -> Grammar {
        debug_assert!(rules.iter().enumerate().all(|(i, r)| r.id.as_usize() == i));
        Grammar { rules }
    }

    /// The rules in this grammar.
    pub fn rules(&self) -> std::slice::Iter<Rule> {
        self.rules.iter()
    }

    /// Get a rule by id.
    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.as_usize())
    }

    /// Look up a rule by name.
    pub fn lookup(&self, name: &str) -> Option<RuleId> {
        self.rules.iter().find(|r| r.name == name).map(|r| r.id)
    }

    /// The upper bound on rule IDs.
    pub fn rule_id_bound(&self) -> usize {
        self.rules.len()
    }
}

impl Index<RuleId> for Grammar {
    type Output = Rule;
    fn index(&self, id: RuleId) -> &Rule {
        &self.rules[id.as_usize()]
    }
}

impl Node {
    /// Get a pretty printer for this node.
    pub fn pretty<'a>(
        &'a self,
        ctx: (&'a Grammar, &'a Vocabulary),
    ) -> Pretty<(&'a Grammar, &'a Vocabulary), &'a Self> {
        Pretty::new(ctx, self)
    }

    /// Call a closure on this node and all nodes nested within it.
    pub fn walk<'a, F: FnMut(&'a Node)>(&'a self, f: &mut F) {
        f(self);
        match *self {
            Node::Sequence(ref children)
            | Node::Alternation {
                alternatives: ref children,
                ..
            } => {
                for child in children {
                    child.walk(f);
                }
            }
            Node::Optional { ref body, .. } | Node::Repetition { ref body, .. } => body.walk(f),
            Node::Terminal { .. } | Node::RuleRef { .. } => (),
        }
    }
}

impl<'a> fmt::Display for Pretty<(&'a Grammar, &'a Vocabulary), &'a Node> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (grammar, vocab) = self.ctx;
        match *self.item {
            Node::Terminal { token, .. } => write!(f, "{}", token.pretty(vocab)),
            Node::Sequence(ref children) => {
                if children.is_empty() {
                    return write!(f, "()");
                }
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    match *child {
                        Node::Sequence(..) | Node::Alternation { .. } => {
                            write!(f, "({})", child.pretty(self.ctx))?
                        }
                        _ => write!(f, "{}", child.pretty(self.ctx))?,
                    }
                }
                Ok(())
            }
            Node::Optional { ref body, .. } => write!(f, "[{}]", body.pretty(self.ctx)),
            Node::Repetition {
                ref body,
                at_least_one,
                ..
            } => write!(f, "{{{}}}{}", body.pretty(self.ctx), if at_least_one { "+" } else { "" }),
            Node::Alternation {
                ref alternatives, ..
            } => {
                for (i, alt) in alternatives.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", alt.pretty(self.ctx))?;
                }
                Ok(())
            }
            Node::RuleRef { rule, .. } => write!(f, "{}", rule.pretty(grammar)),
        }
    }
}

/// A unique rule identifier.
///
/// This is the handle through which grammar authors invoke rules and select
/// the entry point of a parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(usize);

impl RuleId {
    /// Create a rule id from a usize.
    pub fn from_usize(id: usize) -> RuleId {
        RuleId(id)
    }

    /// Obtain the id as a usize.
    pub fn as_usize(self) -> usize {
        self.0
    }

    /// Get a pretty printer for this rule.
    pub fn pretty(self, grammar: &Grammar) -> Pretty<&Grammar, Self> {
        Pretty::new(grammar, self)
    }
}

impl<'a> fmt::Display for Pretty<&'a Grammar, RuleId> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.ctx.get(self.item) {
            Some(rule) => write!(f, "{}", rule.name),
            None => write!(f, "r{}", self.item.as_usize()),
        }
    }
}
