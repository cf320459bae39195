//! Strongly connected components of the nonterminal call graph.
//!
//! A nonterminal is cyclic when it lies on a cycle of the call graph, that
//! is, when it shares a component with another nonterminal or calls itself.
//! The parser sends calls to cyclic nonterminals through the shared
//! descriptor machinery and evaluates the others directly.

use crate::grammar::{Nonterminal, NonterminalId, Symbol};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

/// One node per nonterminal, with node index `i` standing for nonterminal `i`,
/// and an edge `N -> M` when an alternative of `N` refers to `M`.
pub type CallGraph = DiGraph<NonterminalId, ()>;

/// Builds the call graph of `nonterminals`, indexed by their ids.
pub fn call_graph(nonterminals: &[Nonterminal]) -> CallGraph {
    let mut graph = CallGraph::with_capacity(nonterminals.len(), 0);
    for nonterminal in nonterminals {
        graph.add_node(nonterminal.id);
    }
    for nonterminal in nonterminals {
        let from = NodeIndex::new(nonterminal.id.index());
        for symbol in nonterminal.alternatives.iter().flatten() {
            if let Symbol::Nonterminal(callee) = symbol {
                graph.update_edge(from, NodeIndex::new(callee.index()), ());
            }
        }
    }
    graph
}

/// Cyclic/acyclic label of every nonterminal of a grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SccLabels {
    cyclic: Vec<bool>,
    components: Vec<Vec<NonterminalId>>,
}

impl SccLabels {
    pub fn is_cyclic(&self, nonterminal: NonterminalId) -> bool {
        self.cyclic[nonterminal.index()]
    }

    /// Components in reverse topological order: callees before their callers.
    pub fn components(&self) -> &[Vec<NonterminalId>] {
        &self.components
    }

    pub fn cyclic(&self) -> impl Iterator<Item = NonterminalId> + '_ {
        self.cyclic
            .iter()
            .enumerate()
            .filter(|(_, &cyclic)| cyclic)
            .map(|(index, _)| NonterminalId(index))
    }
}

/// Labels every node of `graph` with Tarjan's algorithm.
pub fn compute_sccs(graph: &CallGraph) -> SccLabels {
    let mut cyclic = vec![false; graph.node_count()];
    let mut components = Vec::new();
    for component in tarjan_scc(graph) {
        let looped = component.len() > 1
            || component
                .first()
                .map_or(false, |&node| graph.contains_edge(node, node));
        let mut ids: Vec<NonterminalId> = component.iter().map(|&node| graph[node]).collect();
        ids.sort();
        if looped {
            for id in &ids {
                cyclic[id.index()] = true;
            }
        }
        components.push(ids);
    }
    SccLabels { cyclic, components }
}
