//! Binary subtree representation of every derivation of an input.
//!
//! An [`Epn`] `(slot, start, split, end)` states that the symbols before the
//! dot of `slot` derive the terminals `start..end`, the last of them
//! deriving `split..end`. EPNs sharing a [`NodeKey`] and span form a node;
//! a node with more than one EPN is an ambiguity. Nodes refer to each other
//! by key and span, never by ownership, so shared subderivations are stored
//! once.

use crate::grammar::{Grammar, NonterminalId, Slot, Symbol};
use crate::lexical::Terminal;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use streaming_iterator::StreamingIterator;

/// Extended packed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epn {
    pub slot: Slot,
    pub start: usize,
    pub split: usize,
    pub end: usize,
}

/// EPNs are stored into a vec, and references are stored as integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EpnId(usize);

impl EpnId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a node derives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeKey {
    /// A whole alternative of the nonterminal.
    Nonterminal(NonterminalId),
    /// The symbols before the dot of an incomplete slot.
    Slot(Slot),
}

/// A node: key, start and end.
pub type Node = (NodeKey, usize, usize);

/// Right child of an EPN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Child {
    /// The terminal at this index.
    Leaf(usize),
    Node(NonterminalId, usize, usize),
}

fn node_of(grammar: &Grammar, epn: &Epn) -> Node {
    let key = if grammar.is_complete(epn.slot) {
        NodeKey::Nonterminal(epn.slot.nonterminal)
    } else {
        NodeKey::Slot(epn.slot)
    };
    (key, epn.start, epn.end)
}

fn left_of(epn: &Epn) -> Option<Node> {
    (epn.slot.dot >= 2).then(|| (NodeKey::Slot(epn.slot.at(epn.slot.dot - 1)), epn.start, epn.split))
}

fn right_of(grammar: &Grammar, epn: &Epn) -> Option<Child> {
    let dot = epn.slot.dot.checked_sub(1)?;
    Some(match grammar.alternative(epn.slot.nonterminal, epn.slot.alternative)[dot] {
        Symbol::Terminal(_) => Child::Leaf(epn.split),
        Symbol::Nonterminal(callee) => Child::Node(callee, epn.split, epn.end),
    })
}

/// Nodes an EPN points to: its left prefix and its right nonterminal.
fn children_of(grammar: &Grammar, epn: &Epn) -> impl Iterator<Item = Node> {
    let right = match right_of(grammar, epn) {
        Some(Child::Node(callee, start, end)) => Some((NodeKey::Nonterminal(callee), start, end)),
        _ => None,
    };
    left_of(epn).into_iter().chain(right)
}

/// Every derivation of a parsed input, pruned to what the full parse uses.
#[derive(Debug, Clone)]
pub struct Bsr<'g> {
    grammar: &'g Grammar,
    terminals: Vec<Terminal>,
    epns: Vec<Epn>,
    nodes: BTreeMap<Node, Vec<EpnId>>,
}

impl<'g> Bsr<'g> {
    /// Keeps the EPNs reachable from the node of the start nonterminal over the whole input.
    pub(crate) fn new(grammar: &'g Grammar, terminals: Vec<Terminal>, recorded: BTreeSet<Epn>) -> Self {
        let total = recorded.len();
        let mut all: BTreeMap<Node, Vec<Epn>> = BTreeMap::new();
        for epn in recorded {
            all.entry(node_of(grammar, &epn)).or_default().push(epn);
        }

        let root = (NodeKey::Nonterminal(grammar.start()), 0, terminals.len());
        let mut seen = BTreeSet::from([root]);
        let mut stack = vec![root];
        let mut epns = Vec::new();
        let mut nodes = BTreeMap::new();
        while let Some(node) = stack.pop() {
            let Some(members) = all.get(&node) else {
                continue;
            };
            let mut ids = Vec::with_capacity(members.len());
            for epn in members {
                ids.push(EpnId(epns.len()));
                epns.push(*epn);
                for child in children_of(grammar, epn) {
                    if seen.insert(child) {
                        stack.push(child);
                    }
                }
            }
            nodes.insert(node, ids);
        }
        log::debug!("kept {} of {} EPNs in {} nodes", epns.len(), total, nodes.len());

        Self {
            grammar,
            terminals,
            epns,
            nodes,
        }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    pub fn terminals(&self) -> &[Terminal] {
        &self.terminals
    }

    pub fn len(&self) -> usize {
        self.epns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epns.is_empty()
    }

    pub fn epn(&self, id: EpnId) -> &Epn {
        &self.epns[id.0]
    }

    pub fn epns(&self) -> impl Iterator<Item = (EpnId, &Epn)> + '_ {
        self.epns.iter().enumerate().map(|(index, epn)| (EpnId(index), epn))
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&Node, &[EpnId])> + '_ {
        self.nodes.iter().map(|(node, ids)| (node, ids.as_slice()))
    }

    /// EPNs of the start nonterminal spanning the whole input.
    pub fn roots(&self) -> &[EpnId] {
        self.node(NodeKey::Nonterminal(self.grammar.start()), 0, self.terminals.len())
    }

    pub fn node(&self, key: NodeKey, start: usize, end: usize) -> &[EpnId] {
        self.nodes
            .get(&(key, start, end))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The node an EPN belongs to.
    pub fn node_of(&self, id: EpnId) -> Node {
        node_of(self.grammar, self.epn(id))
    }

    /// Derivations of all symbols before the last one, empty when there are none.
    pub fn left_children(&self, id: EpnId) -> &[EpnId] {
        match left_of(self.epn(id)) {
            Some((key, start, end)) => self.node(key, start, end),
            None => &[],
        }
    }

    /// What the last symbol before the dot derives, `None` for an empty alternative.
    pub fn right_child(&self, id: EpnId) -> Option<Child> {
        right_of(self.grammar, self.epn(id))
    }

    /// Whether some node has more than one derivation.
    pub fn is_ambiguous(&self) -> bool {
        self.nodes.values().any(|ids| ids.len() > 1)
    }

    /// Number of distinct derivation trees, `None` when there are infinitely many.
    ///
    /// Counts saturate at `u128::MAX`.
    pub fn count_derivations(&self) -> Option<u128> {
        let root = (NodeKey::Nonterminal(self.grammar.start()), 0, self.terminals.len());
        // `None` marks a node whose children are still being counted
        let mut memo: BTreeMap<Node, Option<u128>> = BTreeMap::new();
        let mut stack = vec![(root, false)];
        while let Some((node, counted)) = stack.pop() {
            let members = self.node(node.0, node.1, node.2);
            if counted {
                let mut total: u128 = 0;
                for &id in members {
                    let product = children_of(self.grammar, self.epn(id)).fold(1u128, |product, child| {
                        product.saturating_mul(memo.get(&child).copied().flatten().unwrap_or(0))
                    });
                    total = total.saturating_add(product);
                }
                memo.insert(node, Some(total));
                continue;
            }
            match memo.get(&node) {
                Some(Some(_)) => continue,
                // only nodes on the current path are unfinished, so this one derives itself
                Some(None) => return None,
                None => {}
            }
            memo.insert(node, None);
            stack.push((node, true));
            for &id in members {
                for child in children_of(self.grammar, self.epn(id)) {
                    if !matches!(memo.get(&child), Some(Some(_))) {
                        stack.push((child, false));
                    }
                }
            }
        }
        memo.get(&root).copied().flatten()
    }

    /// Every derivation tree, one at a time.
    ///
    /// Trees that would revisit a node inside itself are skipped, so the
    /// enumeration is finite even when [`count_derivations`](Self::count_derivations)
    /// is `None`.
    pub fn derivations(&self) -> Derivations<'_, 'g> {
        Derivations {
            bsr: self,
            choices: Vec::new(),
            steps: Vec::new(),
            started: false,
            done: false,
        }
    }

    /// Print the BSR in graphviz format
    pub fn to_dot(&self) -> String {
        let mut res = String::new();
        res.push_str("digraph {\n");
        let mut ids = BTreeMap::new();
        for (index, (node, epns)) in self.nodes.iter().enumerate() {
            ids.insert(*node, index);
            let (key, start, end) = node;
            let label = match key {
                NodeKey::Nonterminal(id) => format!("{} {}..{}", self.grammar.name(*id), start, end),
                NodeKey::Slot(slot) => format!("{} {}..{}", self.grammar.display_slot(*slot), start, end),
            };
            let _ = writeln!(res, "n{} [label={:?}]", index, label);
            for epn in epns {
                let _ = writeln!(res, "n{} -> e{}", index, epn.0);
            }
        }
        for (id, epn) in self.epns() {
            let _ = writeln!(res, "e{} [shape=point, xlabel=\"{}\"]", id.0, epn.split);
            if let Some(left) = left_of(epn) {
                if let Some(index) = ids.get(&left) {
                    let _ = writeln!(res, "e{} -> n{}", id.0, index);
                }
            }
            match right_of(self.grammar, epn) {
                Some(Child::Leaf(index)) => {
                    let _ = writeln!(res, "e{} -> t{}", id.0, index);
                }
                Some(Child::Node(callee, start, end)) => {
                    if let Some(index) = ids.get(&(NodeKey::Nonterminal(callee), start, end)) {
                        let _ = writeln!(res, "e{} -> n{}", id.0, index);
                    }
                }
                None => {}
            }
        }
        for (index, terminal) in self.terminals.iter().enumerate() {
            let label = format!("{} {:?}", self.grammar.tag_name(terminal.tag), terminal.text);
            let _ = writeln!(res, "t{} [shape=box, label={:?}]", index, label);
        }
        res.push('}');
        res
    }
}

/// One step of a derivation tree in preorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivationStep {
    /// An alternative of the nonterminal derives the terminals `start..end`;
    /// its children follow.
    Node {
        nonterminal: NonterminalId,
        alternative: usize,
        start: usize,
        end: usize,
    },
    /// The terminal at this index.
    Leaf { index: usize },
}

/// Enumerates derivation trees as preorder step sequences.
///
/// Each tree is identified by the EPN chosen at every node it visits. The
/// choices are advanced like an odometer, the last choice point first.
#[derive(Debug)]
pub struct Derivations<'b, 'g> {
    bsr: &'b Bsr<'g>,
    /// `(chosen, count)` per choice point, in visiting order
    choices: Vec<(usize, usize)>,
    steps: Vec<DerivationStep>,
    started: bool,
    done: bool,
}

impl Derivations<'_, '_> {
    /// Moves to the next combination of choices, `false` once all are used up.
    fn increment(&mut self) -> bool {
        while let Some((chosen, count)) = self.choices.pop() {
            if chosen + 1 < count {
                self.choices.push((chosen + 1, count));
                return true;
            }
        }
        false
    }

    fn choose(&mut self, cursor: &mut usize, count: usize) -> Option<usize> {
        if count == 0 {
            return None;
        }
        if *cursor == self.choices.len() {
            self.choices.push((0, count));
        }
        let chosen = self.choices[*cursor].0;
        *cursor += 1;
        Some(chosen)
    }

    /// Rebuilds the tree for the current choices, `false` on a dead end.
    fn replay(&mut self) -> bool {
        self.steps.clear();
        let bsr = self.bsr;
        let mut cursor = 0;
        let mut ancestors = BTreeSet::new();
        let mut todo = vec![Visit::Expand(bsr.grammar.start(), 0, bsr.terminals.len())];
        while let Some(visit) = todo.pop() {
            let (nonterminal, start, end) = match visit {
                Visit::Expand(nonterminal, start, end) => (nonterminal, start, end),
                Visit::Leaf(index) => {
                    self.steps.push(DerivationStep::Leaf { index });
                    continue;
                }
                Visit::Leave(nonterminal, start, end) => {
                    ancestors.remove(&(nonterminal, start, end));
                    continue;
                }
            };
            if !ancestors.insert((nonterminal, start, end)) {
                return false;
            }
            let members = bsr.node(NodeKey::Nonterminal(nonterminal), start, end);
            let Some(pick) = self.choose(&mut cursor, members.len()) else {
                return false;
            };
            let mut epn = *bsr.epn(members[pick]);
            self.steps.push(DerivationStep::Node {
                nonterminal,
                alternative: epn.slot.alternative,
                start,
                end,
            });

            todo.push(Visit::Leave(nonterminal, start, end));
            // the last symbol is found first and stacked deepest
            while let Some(child) = right_of(bsr.grammar, &epn) {
                todo.push(match child {
                    Child::Leaf(index) => Visit::Leaf(index),
                    Child::Node(callee, start, end) => Visit::Expand(callee, start, end),
                });
                let Some((key, left_start, left_end)) = left_of(&epn) else {
                    break;
                };
                let left = bsr.node(key, left_start, left_end);
                let Some(pick) = self.choose(&mut cursor, left.len()) else {
                    return false;
                };
                epn = *bsr.epn(left[pick]);
            }
        }
        true
    }
}

/// Pending work of [`Derivations::replay`].
enum Visit {
    Expand(NonterminalId, usize, usize),
    Leaf(usize),
    /// All children of the node have been replayed.
    Leave(NonterminalId, usize, usize),
}

impl StreamingIterator for Derivations<'_, '_> {
    type Item = [DerivationStep];

    fn advance(&mut self) {
        while !self.done {
            if self.started && !self.increment() {
                self.done = true;
                return;
            }
            self.started = true;
            if self.replay() {
                return;
            }
        }
    }

    fn get(&self) -> Option<&Self::Item> {
        if self.started && !self.done {
            Some(&self.steps)
        } else {
            None
        }
    }
}
