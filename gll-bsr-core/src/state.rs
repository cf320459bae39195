//! Parsing state of one GLL run.
//!
//! Descriptors `(slot, start, position)` are processed from a FIFO worklist.
//! Calls to cyclic nonterminals go through the call-return forest: one
//! cluster node per `(nonterminal, position)`, with edges to the return
//! slots waiting on it. Every result found is recorded as an [`Epn`].

use crate::bsr::Epn;
use crate::grammar::{Grammar, NonterminalId, Slot, Symbol};
use crate::lexical::{TagId, Terminal};
use petgraph::dot::{Config, Dot};
use petgraph::graph::NodeIndex;
use petgraph::{Directed, Graph};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Node of the call-return forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CrfNode {
    /// A call of the nonterminal at the position.
    Cluster(NonterminalId, usize),
    /// Where to continue once the call returns, with the start of the caller.
    Return(Slot, usize),
}

/// One unit of pending work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Descriptor {
    pub slot: Slot,
    /// Where the current alternative started.
    pub start: usize,
    pub position: usize,
}

#[derive(Debug)]
pub struct ParsingState<'a> {
    grammar: &'a Grammar,
    terminals: &'a [Terminal],
    /// Call-return forest, edges from clusters to return nodes
    pub crf: Graph<CrfNode, (), Directed>,
    /// Mapping from node to its index
    pub crf_nodes: BTreeMap<CrfNode, NodeIndex>,
    /// Descriptors seen so far, as `(slot, start)` per position
    pub visited: Vec<BTreeSet<(Slot, usize)>>,
    pub todo: VecDeque<Descriptor>,
    /// Ends found for each cluster
    pub popped: BTreeMap<(NonterminalId, usize), BTreeSet<usize>>,
    /// Ends of directly evaluated nonterminals
    pub direct: BTreeMap<(NonterminalId, usize), BTreeSet<usize>>,
    pub epns: BTreeSet<Epn>,
    /// Furthest terminal index at which a slot failed to match
    pub furthest: usize,
    /// Slots that were waiting for a terminal at `furthest`
    pub pending: BTreeSet<Slot>,
    /// Number of descriptors processed
    pub processed: usize,
}

impl<'a> ParsingState<'a> {
    pub fn new(grammar: &'a Grammar, terminals: &'a [Terminal]) -> Self {
        Self {
            grammar,
            terminals,
            crf: Graph::new(),
            crf_nodes: BTreeMap::new(),
            visited: vec![BTreeSet::new(); terminals.len() + 1],
            todo: VecDeque::new(),
            popped: BTreeMap::new(),
            direct: BTreeMap::new(),
            epns: BTreeSet::new(),
            furthest: 0,
            pending: BTreeSet::new(),
            processed: 0,
        }
    }

    /// Runs the start nonterminal from position 0 and returns the positions it can end at.
    pub fn run(&mut self) -> BTreeSet<usize> {
        let start = self.grammar.start();
        if self.grammar.is_direct(start) {
            return self.evaluate(start, 0);
        }
        self.crf_node(CrfNode::Cluster(start, 0));
        self.nt_add(start, 0);
        while let Some(descriptor) = self.todo.pop_front() {
            self.process(descriptor);
        }
        self.popped.get(&(start, 0)).cloned().unwrap_or_default()
    }

    /// Print the call-return forest in graphviz format
    pub fn print_crf_dot(&self) -> String {
        format!("{:?}", Dot::with_config(&self.crf, &[Config::EdgeNoLabel]))
    }

    fn crf_node(&mut self, node: CrfNode) -> NodeIndex {
        if let Some(index) = self.crf_nodes.get(&node) {
            return *index;
        }
        let index = self.crf.add_node(node);
        self.crf_nodes.insert(node, index);
        index
    }

    fn dsc_add(&mut self, slot: Slot, start: usize, position: usize) {
        if self.visited[position].insert((slot, start)) {
            self.todo.push_back(Descriptor {
                slot,
                start,
                position,
            });
        }
    }

    fn nt_add(&mut self, nonterminal: NonterminalId, position: usize) {
        for alternative in 0..self.grammar.nonterminal(nonterminal).alternatives.len() {
            self.dsc_add(Slot::new(nonterminal, alternative, 0), position, position);
        }
    }

    fn bsr_add(&mut self, slot: Slot, start: usize, split: usize, end: usize) {
        self.epns.insert(Epn {
            slot,
            start,
            split,
            end,
        });
    }

    fn fail(&mut self, slot: Slot, position: usize) {
        if position > self.furthest {
            self.furthest = position;
            self.pending.clear();
        }
        if position == self.furthest {
            self.pending.insert(slot);
        }
    }

    /// Notes that a parse could stop at `position` without consuming the rest.
    pub(crate) fn fail_at_end(&mut self, position: usize) {
        if position > self.furthest {
            self.furthest = position;
            self.pending.clear();
        }
    }

    fn matches(&self, tag: TagId, position: usize) -> bool {
        self.terminals
            .get(position)
            .map_or(false, |terminal| terminal.tag == tag)
    }

    /// Walks one alternative from a descriptor until it needs to wait on a call.
    fn process(&mut self, descriptor: Descriptor) {
        self.processed += 1;
        log::trace!(
            "descriptor {} from {} at {}",
            self.grammar.display_slot(descriptor.slot),
            descriptor.start,
            descriptor.position
        );
        let Descriptor {
            mut slot,
            start,
            mut position,
        } = descriptor;
        loop {
            match self.grammar.symbol_at(slot) {
                None => {
                    if slot.dot == 0 {
                        self.bsr_add(slot, start, start, start);
                    }
                    self.rtn(slot.nonterminal, start, position);
                    return;
                }
                Some(Symbol::Terminal(tag)) => {
                    if !self.matches(tag, position) {
                        self.fail(slot, position);
                        return;
                    }
                    slot = slot.next();
                    self.bsr_add(slot, start, position, position + 1);
                    position += 1;
                }
                Some(Symbol::Nonterminal(callee)) if self.grammar.is_direct(callee) => {
                    for end in self.evaluate(callee, position) {
                        self.bsr_add(slot.next(), start, position, end);
                        self.dsc_add(slot.next(), start, end);
                    }
                    return;
                }
                Some(Symbol::Nonterminal(callee)) => {
                    self.call(slot.next(), start, position, callee);
                    return;
                }
            }
        }
    }

    fn call(&mut self, ret: Slot, start: usize, position: usize, callee: NonterminalId) {
        let cluster = CrfNode::Cluster(callee, position);
        let target = self.crf_node(CrfNode::Return(ret, start));
        match self.crf_nodes.get(&cluster).copied() {
            None => {
                let source = self.crf_node(cluster);
                self.crf.add_edge(source, target, ());
                self.nt_add(callee, position);
            }
            Some(source) => {
                if self.crf.find_edge(source, target).is_some() {
                    return;
                }
                self.crf.add_edge(source, target, ());
                let ends = self
                    .popped
                    .get(&(callee, position))
                    .cloned()
                    .unwrap_or_default();
                for end in ends {
                    self.dsc_add(ret, start, end);
                    self.bsr_add(ret, start, position, end);
                }
            }
        }
    }

    fn rtn(&mut self, nonterminal: NonterminalId, start: usize, end: usize) {
        if !self.popped.entry((nonterminal, start)).or_default().insert(end) {
            return;
        }
        let Some(&cluster) = self.crf_nodes.get(&CrfNode::Cluster(nonterminal, start)) else {
            return;
        };
        let returns: Vec<(Slot, usize)> = self
            .crf
            .neighbors(cluster)
            .filter_map(|node| match self.crf[node] {
                CrfNode::Return(ret, caller) => Some((ret, caller)),
                CrfNode::Cluster(..) => None,
            })
            .collect();
        for (ret, caller) in returns {
            self.dsc_add(ret, caller, end);
            self.bsr_add(ret, caller, start, end);
        }
    }

    /// Ends of `nonterminal` started at `position`, for nonterminals whose
    /// whole call graph is acyclic.
    fn evaluate(&mut self, nonterminal: NonterminalId, position: usize) -> BTreeSet<usize> {
        if let Some(ends) = self.direct.get(&(nonterminal, position)) {
            return ends.clone();
        }
        let grammar = self.grammar;
        let mut ends = BTreeSet::new();
        for (alternative, symbols) in grammar.nonterminal(nonterminal).alternatives.iter().enumerate() {
            let slot = Slot::new(nonterminal, alternative, 0);
            if symbols.is_empty() {
                self.bsr_add(slot, position, position, position);
                ends.insert(position);
                continue;
            }
            let mut frontier = BTreeSet::from([position]);
            for (dot, symbol) in symbols.iter().enumerate() {
                let mut next = BTreeSet::new();
                for &split in &frontier {
                    match *symbol {
                        Symbol::Terminal(tag) if self.matches(tag, split) => {
                            self.bsr_add(slot.at(dot + 1), position, split, split + 1);
                            next.insert(split + 1);
                        }
                        Symbol::Terminal(_) => self.fail(slot.at(dot), split),
                        Symbol::Nonterminal(callee) => {
                            for end in self.evaluate(callee, split) {
                                self.bsr_add(slot.at(dot + 1), position, split, end);
                                next.insert(end);
                            }
                        }
                    }
                }
                frontier = next;
                if frontier.is_empty() {
                    break;
                }
            }
            ends.extend(frontier);
        }
        self.direct.insert((nonterminal, position), ends.clone());
        ends
    }
}
