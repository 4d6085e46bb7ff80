// Copyright (c) 2018 Fabian Schuiki

//! Lookahead computation for the decisions of a grammar.
//!
//! Every `OPTION`, `MANY`, `AT_LEAST_ONE`, and `OR` in a grammar is assigned a
//! [`LookaheadFunction`] which, given the upcoming tokens, selects the branch to
//! take. The function for a decision is derived from the paths each branch may
//! start with, followed by the remainder of the enclosing rule and the rule's
//! follow set. Branches that share a path cannot be told apart and are
//! reported as ambiguous.

use bit_set::BitSet;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

use crate::error::DefinitionError;
use crate::first::{append, visit, FirstSets, Item, PathSet};
use crate::grammar::{Grammar, Node, OccurrenceKey, OccurrenceKind, RuleId};
use crate::token::{Token, TokenTypeId, Vocabulary};

/// A precomputed decision procedure for one occurrence.
///
/// For `OPTION`, `MANY`, and `AT_LEAST_ONE` there is a single branch, which
/// means entering the body. For `OR` there is one branch per alternative.
#[derive(Debug, Clone)]
pub struct LookaheadFunction {
    depth: usize,
    branches: Vec<Branch>,
}

#[derive(Debug, Clone)]
struct Branch {
    paths: Vec<CompiledPath>,
    /// The distinct token types the branch may start with.
    first: Vec<TokenTypeId>,
}

/// A path with each position expanded to the set of token types it accepts.
#[derive(Debug, Clone)]
struct CompiledPath {
    accepts: Vec<BitSet>,
}

impl CompiledPath {
    fn matches(&self, upcoming: &[Token], depth: usize) -> bool {
        // A short path requires the input to end right after it.
        let len_ok = if self.accepts.len() < depth {
            upcoming.len() == self.accepts.len()
        } else {
            upcoming.len() >= depth
        };
        len_ok
            && self
                .accepts
                .iter()
                .zip(upcoming)
                .all(|(set, token)| set.contains(token.kind.as_usize()))
    }

    fn overlaps(&self, other: &CompiledPath) -> bool {
        self.accepts.len() == other.accepts.len()
            && self
                .accepts
                .iter()
                .zip(&other.accepts)
                .all(|(a, b)| !a.is_disjoint(b))
    }
}

impl LookaheadFunction {
    /// Select a branch given the upcoming tokens.
    ///
    /// Only the first `depth` tokens are considered. Returns `None` if no
    /// branch applies.
    pub fn predict(&self, upcoming: &[Token]) -> Option<usize> {
        let upcoming = &upcoming[..upcoming.len().min(self.depth)];
        self.branches
            .iter()
            .position(|b| b.paths.iter().any(|p| p.matches(upcoming, self.depth)))
    }

    /// The number of branches.
    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    /// The token types the given branch may start with.
    pub fn first_tokens(&self, branch: usize) -> &[TokenTypeId] {
        self.branches
            .get(branch)
            .map(|b| b.first.as_slice())
            .unwrap_or(&[])
    }

    /// The lookahead depth.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

struct Context<'a, 'b> {
    grammar: &'a Grammar,
    vocab: &'a Vocabulary,
    first: &'b mut FirstSets<'a>,
    follow: &'b [PathSet],
    depth: usize,
    accepts: HashMap<TokenTypeId, BitSet>,
}

impl<'a, 'b> Context<'a, 'b> {
    /// The paths that may follow a position within `rule`.
    fn lookahead(&mut self, rule: RuleId, items: &[Item<'a>]) -> Result<PathSet, DefinitionError> {
        let set = self.first.sequence(items, self.depth)?;
        Ok(append(&set, &self.follow[rule.as_usize()], self.depth))
    }

    fn compile(&mut self, set: &PathSet) -> Branch {
        let mut first = IndexSet::new();
        let mut paths = Vec::new();
        for path in set {
            if let Some(&t) = path.first() {
                first.insert(t);
            }
            let vocab = self.vocab;
            let accepts = path
                .iter()
                .map(|&t| {
                    self.accepts
                        .entry(t)
                        .or_insert_with(|| vocab.accepted_by(t))
                        .clone()
                })
                .collect();
            paths.push(CompiledPath { accepts });
        }
        Branch {
            paths,
            first: first.into_iter().collect(),
        }
    }

    /// Find a path shared by two branches.
    fn conflict(&self, a: (&PathSet, &Branch), b: &Branch) -> Option<Vec<String>> {
        let (set, branch) = a;
        for (path, compiled) in set.iter().zip(&branch.paths) {
            if b.paths.iter().any(|other| compiled.overlaps(other)) {
                if path.is_empty() {
                    return Some(vec!["end of input".to_string()]);
                }
                return Some(path.iter().map(|&t| self.vocab.name(t).to_string()).collect());
            }
        }
        None
    }

    /// Build the lookahead function of a decision.
    ///
    /// `labels` names the branches for error messages; if an `exit` set is
    /// given, its label comes last.
    fn decision(
        &mut self,
        key: OccurrenceKey,
        labels: &[String],
        sets: Vec<PathSet>,
        exit: Option<PathSet>,
    ) -> Result<LookaheadFunction, DefinitionError> {
        let branches: Vec<Branch> = sets.iter().map(|s| self.compile(s)).collect();
        let exit = exit.map(|s| self.compile(&s));

        for i in 0..sets.len() {
            trace!(
                "{} in {}: {} has {:?}",
                key.occurrence,
                self.grammar[key.rule].name,
                labels[i],
                sets[i]
            );
            let mut others: Vec<(usize, &Branch)> =
                ((i + 1)..sets.len()).map(|j| (j, &branches[j])).collect();
            if let Some(ref b) = exit {
                others.push((labels.len() - 1, b));
            }
            for (j, other) in others {
                if let Some(prefix) = self.conflict((&sets[i], &branches[i]), other) {
                    return Err(DefinitionError::AmbiguousAlternatives {
                        rule: self.grammar[key.rule].name.clone(),
                        decision: key.occurrence.to_string(),
                        first: labels[i].clone(),
                        second: labels[j].clone(),
                        prefix,
                    });
                }
            }
        }

        Ok(LookaheadFunction {
            depth: self.depth,
            branches,
        })
    }
}

/// Compute the lookahead functions for all decisions of a grammar.
pub fn compute<'a>(
    grammar: &'a Grammar,
    vocab: &'a Vocabulary,
    first: &mut FirstSets<'a>,
    follow: &[PathSet],
    depth: usize,
) -> Result<IndexMap<OccurrenceKey, LookaheadFunction>, DefinitionError> {
    let mut ctx = Context {
        grammar,
        vocab,
        first,
        follow,
        depth,
        accepts: HashMap::new(),
    };
    let mut table = IndexMap::new();

    for rule in grammar.rules() {
        let mut decisions = Vec::new();
        visit(&rule.body, &[], &mut |node, cont| match *node {
            Node::Optional { .. } | Node::Repetition { .. } | Node::Alternation { .. } => {
                decisions.push((node, cont.to_vec()))
            }
            _ => (),
        });

        for (node, cont) in decisions {
            let (key, function) = match *node {
                Node::Optional {
                    ref body,
                    occurrence,
                } => {
                    let key = OccurrenceKey::new(rule.id, OccurrenceKind::Option, occurrence);
                    let mut items = vec![Item::Node(&**body)];
                    items.extend_from_slice(&cont);
                    let enter = ctx.lookahead(rule.id, &items)?;
                    let skip = ctx.lookahead(rule.id, &cont)?;
                    let labels = ["entering".to_string(), "skipping".to_string()];
                    (key, ctx.decision(key, &labels, vec![enter], Some(skip))?)
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
                    let key = OccurrenceKey::new(rule.id, kind, occurrence);
                    let mut items = vec![Item::Node(&**body), Item::Loop(&**body)];
                    items.extend_from_slice(&cont);
                    let enter = ctx.lookahead(rule.id, &items)?;
                    let exit = ctx.lookahead(rule.id, &cont)?;
                    let labels = ["another iteration".to_string(), "exiting".to_string()];
                    (key, ctx.decision(key, &labels, vec![enter], Some(exit))?)
                }
                Node::Alternation {
                    ref alternatives,
                    occurrence,
                    ..
                } => {
                    let key = OccurrenceKey::new(rule.id, OccurrenceKind::Or, occurrence);
                    let mut sets = Vec::new();
                    for alt in alternatives {
                        let mut items = vec![Item::Node(alt)];
                        items.extend_from_slice(&cont);
                        sets.push(ctx.lookahead(rule.id, &items)?);
                    }
                    let labels: Vec<String> = (1..=alternatives.len())
                        .map(|i| format!("alternative {}", i))
                        .collect();
                    (key, ctx.decision(key, &labels, sets, None)?)
                }
                _ => continue,
            };
            table.insert(key, function);
        }
    }

    debug!("computed {} lookahead functions", table.len());
    Ok(table)
}
