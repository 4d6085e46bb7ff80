// Copyright (c) 2018 Fabian Schuiki

//! First and follow set computation.
//!
//! This module computes, for any position within a recorded grammar, the set
//! of token paths of length up to `k` that may appear next. A path shorter
//! than `k` indicates that the construct ends after that many tokens. Since
//! rules invoke other rules and may match empty input, computation is somewhat
//! tricky.
//!
//! First sets are computed by recursive descent over the rule bodies, memoized
//! per rule and remaining depth. The remaining depth only shrinks once a token
//! has been collected, so re-entering a rule at the same depth means that the
//! rule can invoke itself without consuming any token. This is reported as
//! left recursion.

use indexmap::IndexSet;
use std::collections::HashMap;

use crate::error::DefinitionError;
use crate::grammar::{Grammar, Node, RuleId};
use crate::token::TokenTypeId;

/// A sequence of token types.
pub type Path = Vec<TokenTypeId>;

/// A set of paths.
pub type PathSet = IndexSet<Path>;

/// An item of a continuation, that is the material following a position
/// within a rule body.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Item<'a> {
    /// A node of the grammar.
    Node(&'a Node),
    /// Zero or more further repetitions of the given body.
    Loop(&'a Node),
}

/// The set containing only the empty path.
pub fn epsilon() -> PathSet {
    let mut set = PathSet::new();
    set.insert(Vec::new());
    set
}

/// Concatenate every short path in `prefixes` with the paths in `suffixes`,
/// truncating the result to length `k`.
pub fn append(prefixes: &PathSet, suffixes: &PathSet, k: usize) -> PathSet {
    let mut out = PathSet::new();
    for prefix in prefixes {
        if prefix.len() >= k {
            out.insert(prefix.clone());
            continue;
        }
        for suffix in suffixes {
            let mut path = prefix.clone();
            path.extend(suffix.iter().take(k - prefix.len()).cloned());
            out.insert(path);
        }
    }
    out
}

/// All first sets of a grammar, computed on demand.
pub struct FirstSets<'a> {
    grammar: &'a Grammar,
    memo: HashMap<(RuleId, usize), PathSet>,
    active: Vec<(RuleId, usize)>,
}

impl<'a> FirstSets<'a> {
    /// Create an empty cache for a grammar.
    pub fn new(grammar: &'a Grammar) -> FirstSets<'a> {
        FirstSets {
            grammar,
            memo: HashMap::new(),
            active: Vec::new(),
        }
    }

    /// The paths of length up to `k` a rule may start with.
    pub fn rule(&mut self, id: RuleId, k: usize) -> Result<PathSet, DefinitionError> {
        if let Some(set) = self.memo.get(&(id, k)) {
            return Ok(set.clone());
        }
        if let Some(pos) = self.active.iter().position(|&e| e == (id, k)) {
            let mut cycle: Vec<String> = self.active[pos..]
                .iter()
                .map(|&(r, _)| self.grammar[r].name.clone())
                .collect();
            cycle.push(self.grammar[id].name.clone());
            return Err(DefinitionError::LeftRecursion { cycle });
        }
        let grammar = self.grammar;
        self.active.push((id, k));
        let result = self.node(&grammar[id].body, k);
        self.active.pop();
        let set = result?;
        self.memo.insert((id, k), set.clone());
        Ok(set)
    }

    /// The paths of length up to `k` a node may start with.
    pub fn node(&mut self, node: &'a Node, k: usize) -> Result<PathSet, DefinitionError> {
        self.item(Item::Node(node), k)
    }

    /// The paths of length up to `k` a sequence of items may start with.
    pub(crate) fn sequence(
        &mut self,
        items: &[Item<'a>],
        k: usize,
    ) -> Result<PathSet, DefinitionError> {
        if k == 0 || items.is_empty() {
            return Ok(epsilon());
        }
        let head = self.item(items[0], k)?;
        let mut tails: HashMap<usize, PathSet> = HashMap::new();
        let mut out = PathSet::new();
        for path in head {
            if path.len() >= k {
                out.insert(path);
                continue;
            }
            let rest = k - path.len();
            if !tails.contains_key(&rest) {
                let tail = self.sequence(&items[1..], rest)?;
                tails.insert(rest, tail);
            }
            for tail in &tails[&rest] {
                let mut full = path.clone();
                full.extend(tail.iter().cloned());
                out.insert(full);
            }
        }
        Ok(out)
    }

    fn item(&mut self, item: Item<'a>, k: usize) -> Result<PathSet, DefinitionError> {
        if k == 0 {
            return Ok(epsilon());
        }
        let node = match item {
            Item::Node(node) => node,
            Item::Loop(body) => return self.repeat(body, k),
        };
        match *node {
            Node::Terminal { token, .. } => {
                let mut set = PathSet::new();
                set.insert(vec![token]);
                Ok(set)
            }
            Node::Sequence(ref children) => {
                let items: Vec<Item<'a>> = children.iter().map(Item::Node).collect();
                self.sequence(&items, k)
            }
            Node::Optional { ref body, .. } => {
                let mut set = self.node(body, k)?;
                set.insert(Vec::new());
                Ok(set)
            }
            Node::Repetition {
                ref body,
                at_least_one,
                ..
            } => {
                if at_least_one {
                    self.sequence(&[Item::Node(&**body), Item::Loop(&**body)], k)
                } else {
                    self.repeat(body, k)
                }
            }
            Node::Alternation {
                ref alternatives, ..
            } => {
                let mut set = PathSet::new();
                for alt in alternatives {
                    set.extend(self.node(alt, k)?);
                }
                Ok(set)
            }
            Node::RuleRef { rule, .. } => self.rule(rule, k),
        }
    }

    /// Zero or more repetitions of `body`.
    ///
    /// Iterations that consume no tokens are ignored, so this terminates even
    /// for bodies that can match empty input.
    fn repeat(&mut self, body: &'a Node, k: usize) -> Result<PathSet, DefinitionError> {
        let mut out = epsilon();
        for path in self.node(body, k)? {
            if path.is_empty() {
                continue;
            }
            if path.len() >= k {
                out.insert(path);
                continue;
            }
            for tail in self.repeat(body, k - path.len())? {
                let mut full = path.clone();
                full.extend(tail);
                out.insert(full);
            }
        }
        Ok(out)
    }

    /// Compute the follow set of every rule, indexed by rule id.
    ///
    /// The end of input may follow any rule, since any rule may serve as the
    /// entry point of a parse.
    pub fn follow_sets(&mut self, k: usize) -> Result<Vec<PathSet>, DefinitionError> {
        // Determine the call sites and what follows them within the caller.
        let grammar = self.grammar;
        let mut sites = Vec::new();
        for rule in grammar.rules() {
            let mut found = Vec::new();
            visit(&rule.body, &[], &mut |node, cont| {
                if let Node::RuleRef { rule: target, .. } = *node {
                    found.push((target, cont.to_vec()));
                }
            });
            for (target, cont) in found {
                sites.push((rule.id, target, self.sequence(&cont, k)?));
            }
        }

        // Propagate the follow sets until they settle.
        let mut follow = vec![epsilon(); grammar.rule_id_bound()];
        let mut changed = true;
        while changed {
            changed = false;
            for &(caller, target, ref first) in &sites {
                let contribution = append(first, &follow[caller.as_usize()], k);
                let set = &mut follow[target.as_usize()];
                let before = set.len();
                set.extend(contribution);
                changed |= set.len() != before;
            }
        }
        Ok(follow)
    }
}

/// Call a closure on each node within `node`, together with the continuation
/// that follows it inside the rule body.
pub(crate) fn visit<'a, F>(node: &'a Node, cont: &[Item<'a>], f: &mut F)
where
    F: FnMut(&'a Node, &[Item<'a>]),
{
    f(node, cont);
    match *node {
        Node::Sequence(ref children) => {
            for (i, child) in children.iter().enumerate() {
                let mut next: Vec<Item<'a>> = children[i + 1..].iter().map(Item::Node).collect();
                next.extend_from_slice(cont);
                visit(child, &next, f);
            }
        }
        Node::Optional { ref body, .. } => visit(body, cont, f),
        Node::Repetition { ref body, .. } => {
            let mut next = vec![Item::Loop(&**body)];
            next.extend_from_slice(cont);
            visit(body, &next, f);
        }
        Node::Alternation {
            ref alternatives, ..
        } => {
            for alt in alternatives {
                visit(alt, cont, f);
            }
        }
        Node::Terminal { .. } | Node::RuleRef { .. } => (),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Rule;
    use assert_matches::assert_matches;

    fn t(i: usize) -> TokenTypeId {
        TokenTypeId::from_usize(i)
    }

    fn term(i: usize) -> Node {
        Node::Terminal {
            token: t(i),
            occurrence: 1,
        }
    }

    fn call(i: usize) -> Node {
        Node::RuleRef {
            rule: RuleId::from_usize(i),
            occurrence: 1,
        }
    }

    fn grammar(bodies: Vec<Node>) -> Grammar {
        Grammar::new(
            bodies
                .into_iter()
                .enumerate()
                .map(|(i, body)| Rule {
                    id: RuleId::from_usize(i),
                    name: format!("r{}", i),
                    body,
                })
                .collect(),
        )
    }

    fn paths(set: &PathSet) -> Vec<Vec<usize>> {
        let mut v: Vec<Vec<usize>> = set
            .iter()
            .map(|p| p.iter().map(|t| t.as_usize()).collect())
            .collect();
        v.sort();
        v
    }

    #[test]
    fn optional_prefix_is_transparent() {
        // r0 := [0] 1 2
        let g = grammar(vec![Node::Sequence(vec![
            Node::Optional {
                body: Box::new(term(0)),
                occurrence: 1,
            },
            term(1),
            term(2),
        ])]);
        let mut fs = FirstSets::new(&g);
        let set = fs.rule(RuleId::from_usize(0), 1).unwrap();
        assert_eq!(paths(&set), vec![vec![0], vec![1]]);
        let set = fs.rule(RuleId::from_usize(0), 2).unwrap();
        assert_eq!(paths(&set), vec![vec![0, 1], vec![1, 2]]);
    }

    #[test]
    fn repetitions_unroll_up_to_depth() {
        // r0 := {0}+
        let g = grammar(vec![Node::Repetition {
            body: Box::new(term(0)),
            occurrence: 1,
            at_least_one: true,
        }]);
        let mut fs = FirstSets::new(&g);
        let set = fs.rule(RuleId::from_usize(0), 3).unwrap();
        assert_eq!(paths(&set), vec![vec![0], vec![0, 0], vec![0, 0, 0]]);
    }

    #[test]
    fn nested_rules_are_followed() {
        // r0 := r1 2 ; r1 := 0 | [1]
        let g = grammar(vec![
            Node::Sequence(vec![call(1), term(2)]),
            Node::Alternation {
                alternatives: vec![
                    term(0),
                    Node::Optional {
                        body: Box::new(term(1)),
                        occurrence: 1,
                    },
                ],
                occurrence: 1,
                description: "x".into(),
            },
        ]);
        let mut fs = FirstSets::new(&g);
        let set = fs.rule(RuleId::from_usize(0), 1).unwrap();
        assert_eq!(paths(&set), vec![vec![0], vec![1], vec![2]]);
        let set = fs.rule(RuleId::from_usize(1), 1).unwrap();
        assert_eq!(paths(&set), vec![vec![], vec![0], vec![1]]);
    }

    #[test]
    fn right_recursion_is_fine() {
        // r0 := 0 r0 | 1
        let g = grammar(vec![Node::Alternation {
            alternatives: vec![Node::Sequence(vec![term(0), call(0)]), term(1)],
            occurrence: 1,
            description: "x".into(),
        }]);
        let mut fs = FirstSets::new(&g);
        let set = fs.rule(RuleId::from_usize(0), 2).unwrap();
        assert_eq!(paths(&set), vec![vec![0, 0], vec![0, 1], vec![1]]);
    }

    #[test]
    fn left_recursion_is_detected() {
        // r0 := [0] r1 ; r1 := r0 1
        let g = grammar(vec![
            Node::Sequence(vec![
                Node::Optional {
                    body: Box::new(term(0)),
                    occurrence: 1,
                },
                call(1),
            ]),
            Node::Sequence(vec![call(0), term(1)]),
        ]);
        let mut fs = FirstSets::new(&g);
        assert_matches!(
            fs.rule(RuleId::from_usize(0), 1),
            Err(DefinitionError::LeftRecursion { ref cycle }) if cycle == &["r0", "r1", "r0"]
        );
    }

    #[test]
    fn follow_sets_include_end_of_input() {
        // r0 := r1 0 r1 ; r1 := 1
        let g = grammar(vec![
            Node::Sequence(vec![call(1), term(0), call(1)]),
            term(1),
        ]);
        let mut fs = FirstSets::new(&g);
        let follow = fs.follow_sets(1).unwrap();
        assert_eq!(paths(&follow[0]), vec![vec![]]);
        assert_eq!(paths(&follow[1]), vec![vec![], vec![0]]);
    }

    #[test]
    fn append_truncates() {
        let mut prefixes = PathSet::new();
        prefixes.insert(vec![t(0)]);
        prefixes.insert(vec![t(1), t(2)]);
        let mut suffixes = epsilon();
        suffixes.insert(vec![t(3), t(4)]);
        let out = append(&prefixes, &suffixes, 2);
        assert_eq!(paths(&out), vec![vec![0], vec![0, 3], vec![1, 2]]);
    }
}
