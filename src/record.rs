// Copyright (c) 2018 Fabian Schuiki

//! Recording of rule bodies.
//!
//! Grammar authors declare rules as closures over a [`Recorder`]. During
//! self-analysis every closure is run exactly once in recording mode, which
//! captures the structure of the rule as a tree of [`Node`]s without looking
//! at any input. The recorded grammar is then analyzed and frozen into a
//! [`Parser`].

use std::collections::{HashMap, HashSet};

use crate::error::{DefinitionError, GrammarIssue};
use crate::first::FirstSets;
use crate::grammar::{Grammar, Node, OccurrenceKind, Rule, RuleId};
use crate::lookahead;
use crate::parser::{Parser, ParserConfig};
use crate::token::{TokenTypeId, Vocabulary};

type Body = Box<dyn Fn(&mut Recorder)>;

struct RuleDecl {
    name: String,
    body: Option<Body>,
}

/// A grammar under construction.
///
/// Rules are declared and defined here. Once all rules are known,
/// [`perform_self_analysis`](GrammarBuilder::perform_self_analysis) consumes
/// the builder and produces an immutable [`Parser`].
pub struct GrammarBuilder {
    vocab: Vocabulary,
    config: ParserConfig,
    rules: Vec<RuleDecl>,
    names: HashMap<String, RuleId>,
    issues: Vec<GrammarIssue>,
}

impl GrammarBuilder {
    /// Create a new builder with the default configuration.
    pub fn new(vocab: &Vocabulary) -> GrammarBuilder {
        GrammarBuilder::with_config(vocab, ParserConfig::default())
    }

    /// Create a new builder with the given configuration.
    pub fn with_config(vocab: &Vocabulary, config: ParserConfig) -> GrammarBuilder {
        let issues = vocab
            .iter()
            .filter(|t| t.unknown_category().is_some())
            .map(|t| GrammarIssue::UnknownCategory {
                token: t.name.clone(),
            })
            .collect();
        GrammarBuilder {
            vocab: vocab.clone(),
            config,
            rules: Vec::new(),
            names: HashMap::new(),
            issues,
        }
    }

    /// Declare a rule without defining it yet.
    ///
    /// Declaring the same name twice yields the same handle. This allows rules
    /// to refer to each other before their bodies are given.
    pub fn declare<S: Into<String>>(&mut self, name: S) -> RuleId {
        let name = name.into();
        if let Some(&id) = self.names.get(&name) {
            return id;
        }
        let id = RuleId::from_usize(self.rules.len());
        self.names.insert(name.clone(), id);
        self.rules.push(RuleDecl { name, body: None });
        id
    }

    /// Give a declared rule its body.
    pub fn define<F>(&mut self, rule: RuleId, body: F)
    where
        F: Fn(&mut Recorder) + 'static,
    {
        let decl = match self.rules.get_mut(rule.as_usize()) {
            Some(decl) => decl,
            None => {
                self.issues.push(GrammarIssue::UnknownRule {
                    rule: format!("r{}", rule.as_usize()),
                });
                return;
            }
        };
        if decl.body.is_some() {
            self.issues
                .push(GrammarIssue::DuplicateRule(decl.name.clone()));
            return;
        }
        decl.body = Some(Box::new(body));
    }

    /// Declare and define a rule in one go.
    pub fn rule<S, F>(&mut self, name: S, body: F) -> RuleId
    where
        S: Into<String>,
        F: Fn(&mut Recorder) + 'static,
    {
        let id = self.declare(name);
        self.define(id, body);
        id
    }

    /// Record all rules, compute the lookahead of every decision, and freeze
    /// the grammar.
    ///
    /// Fails if the grammar is malformed, ambiguous within the configured
    /// lookahead depth, or left-recursive.
    pub fn perform_self_analysis(self) -> Result<Parser, DefinitionError> {
        let GrammarBuilder {
            vocab,
            config,
            rules: decls,
            names: _,
            mut issues,
        } = self;
        if config.max_lookahead == 0 {
            issues.push(GrammarIssue::InvalidLookahead);
        }

        // Run every rule body once in recording mode.
        let names: Vec<String> = decls.iter().map(|d| d.name.clone()).collect();
        let mut rules = Vec::with_capacity(decls.len());
        for (i, decl) in decls.into_iter().enumerate() {
            let id = RuleId::from_usize(i);
            let body = match decl.body {
                Some(ref body) => {
                    let mut rec = Recorder::new(&vocab, &names, id, &mut issues);
                    body(&mut rec);
                    rec.finish()
                }
                None => {
                    issues.push(GrammarIssue::UndefinedRule(decl.name.clone()));
                    Node::Sequence(Vec::new())
                }
            };
            rules.push(Rule {
                id,
                name: decl.name,
                body,
            });
        }
        if !issues.is_empty() {
            return Err(DefinitionError::Grammar(issues));
        }
        let grammar = Grammar::new(rules);
        debug!("recorded {} rules", grammar.rule_id_bound());
        for rule in grammar.rules() {
            trace!("{} := {}", rule.name, rule.body.pretty((&grammar, &vocab)));
        }

        // Left recursion shows up while computing the first sets.
        let mut first = FirstSets::new(&grammar);
        for rule in grammar.rules() {
            first.rule(rule.id, 1)?;
        }

        // Repetitions must make progress on every iteration.
        for rule in grammar.rules() {
            let mut bodies = Vec::new();
            rule.body.walk(&mut |node| {
                if let Node::Repetition {
                    ref body,
                    occurrence,
                    at_least_one,
                } = *node
                {
                    let kind = if at_least_one {
                        OccurrenceKind::AtLeastOne
                    } else {
                        OccurrenceKind::Many
                    };
                    bodies.push((&**body, format!("{}{}", kind, occurrence)));
                }
            });
            for (body, decision) in bodies {
                if first.node(body, 1)?.contains(&Vec::new()) {
                    issues.push(GrammarIssue::EmptyRepetition {
                        rule: rule.name.clone(),
                        decision,
                        body: body.pretty((&grammar, &vocab)).to_string(),
                    });
                }
            }
        }
        if !issues.is_empty() {
            return Err(DefinitionError::Grammar(issues));
        }

        let depth = config.max_lookahead;
        let follow = first.follow_sets(depth)?;
        let table = lookahead::compute(&grammar, &vocab, &mut first, &follow, depth)?;
        drop(first);
        Ok(Parser::new(vocab, grammar, table, config))
    }
}

/// Records the structure of one rule body.
///
/// Each method corresponds to one combinator. Decision points and consumed
/// tokens are numbered automatically in the order they are recorded; call
/// sites of other rules take an explicit index.
pub struct Recorder<'a> {
    vocab: &'a Vocabulary,
    names: &'a [String],
    rule: RuleId,
    issues: &'a mut Vec<GrammarIssue>,
    frames: Vec<Vec<Node>>,
    consumes: HashMap<TokenTypeId, u32>,
    counters: HashMap<OccurrenceKind, u32>,
    call_sites: HashSet<(RuleId, u32)>,
}

impl<'a> Recorder<'a> {
    fn new(
        vocab: &'a Vocabulary,
        names: &'a [String],
        rule: RuleId,
        issues: &'a mut Vec<GrammarIssue>,
    ) -> Recorder<'a> {
        Recorder {
            vocab,
            names,
            rule,
            issues,
            frames: vec![Vec::new()],
            consumes: HashMap::new(),
            counters: HashMap::new(),
            call_sites: HashSet::new(),
        }
    }

    fn rule_name(&self) -> String {
        self.names[self.rule.as_usize()].clone()
    }

    fn next_occurrence(&mut self, kind: OccurrenceKind) -> u32 {
        let counter = self.counters.entry(kind).or_insert(0);
        *counter += 1;
        *counter
    }

    fn push(&mut self, node: Node) {
        if let Some(frame) = self.frames.last_mut() {
            frame.push(node);
        }
    }

    /// Record `body` into a node of its own.
    fn capture<F: FnOnce(&mut Self)>(&mut self, body: F) -> Node {
        self.frames.push(Vec::new());
        body(self);
        let mut nodes = self.frames.pop().unwrap_or_default();
        if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            Node::Sequence(nodes)
        }
    }

    fn finish(mut self) -> Node {
        let mut nodes = self.frames.pop().unwrap_or_default();
        if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            Node::Sequence(nodes)
        }
    }

    /// Consume a token of the given type, or of any type in the given
    /// category.
    pub fn consume(&mut self, token: TokenTypeId) {
        if self.vocab.get(token).is_none() {
            let rule = self.rule_name();
            self.issues.push(GrammarIssue::UnknownTokenType { rule });
        }
        let counter = self.consumes.entry(token).or_insert(0);
        *counter += 1;
        let occurrence = *counter;
        self.push(Node::Terminal { token, occurrence });
    }

    /// Invoke another rule.
    ///
    /// Shorthand for `subrule_at(1, rule)`.
    pub fn subrule(&mut self, rule: RuleId) {
        self.subrule_at(1, rule)
    }

    /// Invoke another rule at the call site with the given index.
    ///
    /// Every call site of the same rule within one rule body needs a distinct
    /// index.
    pub fn subrule_at(&mut self, index: u32, rule: RuleId) {
        if rule.as_usize() >= self.names.len() {
            let name = self.rule_name();
            self.issues.push(GrammarIssue::UnknownRule { rule: name });
        } else if !self.call_sites.insert((rule, index)) {
            let issue = GrammarIssue::DuplicateOccurrence {
                rule: self.rule_name(),
                target: self.names[rule.as_usize()].clone(),
                index,
            };
            self.issues.push(issue);
        }
        self.push(Node::RuleRef {
            rule,
            occurrence: index,
        });
    }

    /// Optionally match `body`.
    pub fn option<F: FnOnce(&mut Self)>(&mut self, body: F) {
        let occurrence = self.next_occurrence(OccurrenceKind::Option);
        let body = Box::new(self.capture(body));
        self.push(Node::Optional { body, occurrence });
    }

    /// Match `body` zero or more times.
    pub fn many<F: FnOnce(&mut Self)>(&mut self, body: F) {
        let occurrence = self.next_occurrence(OccurrenceKind::Many);
        let body = Box::new(self.capture(body));
        self.push(Node::Repetition {
            body,
            occurrence,
            at_least_one: false,
        });
    }

    /// Match `body` one or more times.
    pub fn at_least_one<F: FnOnce(&mut Self)>(&mut self, body: F) {
        let occurrence = self.next_occurrence(OccurrenceKind::AtLeastOne);
        let body = Box::new(self.capture(body));
        self.push(Node::Repetition {
            body,
            occurrence,
            at_least_one: true,
        });
    }

    /// Match exactly one of the alternatives added in `alternatives`.
    ///
    /// The `description` names the construct in error messages, such as
    /// "a value".
    pub fn or<S, F>(&mut self, description: S, alternatives: F)
    where
        S: Into<String>,
        F: FnOnce(&mut Alternatives<'_, 'a>),
    {
        let occurrence = self.next_occurrence(OccurrenceKind::Or);
        let mut alts = Alternatives {
            recorder: &mut *self,
            nodes: Vec::new(),
        };
        alternatives(&mut alts);
        let nodes = alts.nodes;
        if nodes.is_empty() {
            let issue = GrammarIssue::EmptyAlternation {
                rule: self.rule_name(),
                decision: format!("{}{}", OccurrenceKind::Or, occurrence),
            };
            self.issues.push(issue);
        }
        self.push(Node::Alternation {
            alternatives: nodes,
            occurrence,
            description: description.into(),
        });
    }
}

/// The alternatives of an `or`.
pub struct Alternatives<'r, 'a> {
    recorder: &'r mut Recorder<'a>,
    nodes: Vec<Node>,
}

impl<'r, 'a> Alternatives<'r, 'a> {
    /// Add an alternative.
    pub fn alt<F: FnOnce(&mut Recorder<'a>)>(&mut self, body: F) -> &mut Self {
        let node = self.recorder.capture(body);
        self.nodes.push(node);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Pattern, TokenType};
    use assert_matches::assert_matches;

    fn vocab() -> (Vocabulary, TokenTypeId, TokenTypeId) {
        let mut v = Vocabulary::new();
        let a = TokenType::builder("A")
            .pattern(Pattern::literal("a"))
            .build(&mut v);
        let b = TokenType::builder("B")
            .pattern(Pattern::literal("b"))
            .build(&mut v);
        (v, a, b)
    }

    #[test]
    fn records_structure_and_occurrences() {
        let (v, a, b) = vocab();
        let mut g = GrammarBuilder::new(&v);
        let item = g.declare("item");
        let list = g.rule("list", move |r| {
            r.consume(a);
            r.option(|r| {
                r.subrule(item);
                r.many(|r| {
                    r.consume(b);
                    r.subrule_at(2, item);
                });
            });
            r.consume(a);
        });
        g.rule("item", move |r| r.consume(b));
        let parser = g.perform_self_analysis().unwrap();
        let grammar = parser.grammar();
        assert_eq!(grammar[list].name, "list");
        assert_eq!(
            grammar[list].body,
            Node::Sequence(vec![
                Node::Terminal {
                    token: a,
                    occurrence: 1
                },
                Node::Optional {
                    body: Box::new(Node::Sequence(vec![
                        Node::RuleRef {
                            rule: item,
                            occurrence: 1
                        },
                        Node::Repetition {
                            body: Box::new(Node::Sequence(vec![
                                Node::Terminal {
                                    token: b,
                                    occurrence: 1
                                },
                                Node::RuleRef {
                                    rule: item,
                                    occurrence: 2
                                },
                            ])),
                            occurrence: 1,
                            at_least_one: false,
                        },
                    ])),
                    occurrence: 1,
                },
                Node::Terminal {
                    token: a,
                    occurrence: 2
                },
            ])
        );
    }

    #[test]
    fn duplicate_call_sites_are_rejected() {
        let (v, a, _) = vocab();
        let mut g = GrammarBuilder::new(&v);
        let item = g.declare("item");
        g.rule("pair", move |r| {
            r.subrule(item);
            r.subrule(item);
        });
        g.rule("item", move |r| r.consume(a));
        assert_matches!(
            g.perform_self_analysis(),
            Err(DefinitionError::Grammar(ref issues)) if issues == &[GrammarIssue::DuplicateOccurrence {
                rule: "pair".into(),
                target: "item".into(),
                index: 1,
            }]
        );
    }

    #[test]
    fn undefined_and_duplicate_rules_are_reported_together() {
        let (v, a, _) = vocab();
        let mut g = GrammarBuilder::new(&v);
        let missing = g.declare("missing");
        g.rule("start", move |r| r.subrule(missing));
        g.rule("start", move |r| r.consume(a));
        assert_matches!(
            g.perform_self_analysis(),
            Err(DefinitionError::Grammar(ref issues)) if issues == &[
                GrammarIssue::DuplicateRule("start".into()),
                GrammarIssue::UndefinedRule("missing".into()),
            ]
        );
    }

    #[test]
    fn empty_repetitions_are_rejected() {
        let (v, a, _) = vocab();
        let mut g = GrammarBuilder::new(&v);
        g.rule("start", move |r| {
            r.many(|r| r.option(|r| r.consume(a)));
        });
        assert_matches!(
            g.perform_self_analysis(),
            Err(DefinitionError::Grammar(ref issues))
                if matches!(issues.as_slice(), [GrammarIssue::EmptyRepetition { .. }])
        );
    }

    #[test]
    fn empty_alternations_are_rejected() {
        let (v, _, _) = vocab();
        let mut g = GrammarBuilder::new(&v);
        g.rule("start", |r| r.or("nothing", |_| ()));
        assert_matches!(
            g.perform_self_analysis(),
            Err(DefinitionError::Grammar(ref issues))
                if matches!(issues.as_slice(), [GrammarIssue::EmptyAlternation { .. }])
        );
    }

    #[test]
    fn categories_declared_late_are_reported() {
        let mut v = Vocabulary::new();
        let a = TokenType::builder("A")
            .pattern(Pattern::literal("a"))
            .category(TokenTypeId::from_usize(1))
            .build(&mut v);
        TokenType::builder("Letter").build(&mut v);
        let mut g = GrammarBuilder::new(&v);
        g.rule("start", move |r| r.consume(a));
        assert_matches!(
            g.perform_self_analysis(),
            Err(DefinitionError::Grammar(ref issues)) if issues == &[GrammarIssue::UnknownCategory {
                token: "A".into(),
            }]
        );
    }

    #[test]
    fn zero_lookahead_is_rejected() {
        let (v, a, _) = vocab();
        let mut g = GrammarBuilder::with_config(&v, ParserConfig::default().max_lookahead(0));
        g.rule("start", move |r| r.consume(a));
        assert_matches!(
            g.perform_self_analysis(),
            Err(DefinitionError::Grammar(ref issues)) if issues == &[GrammarIssue::InvalidLookahead]
        );
    }
}
