//! The syntactic grammar.
//!
//! Nonterminals own ordered alternatives of [`Symbol`]s. Rules are written
//! with [`Item`]s, whose EBNF forms ([`opt`], [`many`], [`many1`]) are
//! desugared into auxiliary nonterminals when the grammar is built, so the
//! parser only ever sees plain alternatives.
//!
//! Start nonterminals may be guarded by a [`When`]; exactly one of them must
//! hold under the conditions the grammar is built with.

use crate::conditions::{Conditions, When};
use crate::diagnostics::{ConfigError, Error, ErrorGroup, SyntacticError, Warning, WarningGroup};
use crate::lexical::{LexicalGrammar, TagId, TagRole};
use crate::scc::{call_graph, compute_sccs, CallGraph, SccLabels};
use petgraph::graph::NodeIndex;
use petgraph::visit::Dfs;
use std::collections::HashMap;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonterminalId(pub(crate) usize);

impl NonterminalId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Symbol {
    Terminal(TagId),
    Nonterminal(NonterminalId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonterminal {
    pub id: NonterminalId,
    pub name: String,
    pub alternatives: Vec<Vec<Symbol>>,
    /// Introduced by EBNF desugaring.
    pub auxiliary: bool,
}

/// A position inside an alternative: `dot` symbols of it have been matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot {
    pub nonterminal: NonterminalId,
    pub alternative: usize,
    pub dot: usize,
}

impl Slot {
    pub fn new(nonterminal: NonterminalId, alternative: usize, dot: usize) -> Self {
        Self {
            nonterminal,
            alternative,
            dot,
        }
    }

    /// The same alternative with the dot at `dot`.
    pub fn at(self, dot: usize) -> Self {
        Self { dot, ..self }
    }

    pub fn next(self) -> Self {
        self.at(self.dot + 1)
    }
}

/// A symbol of a rule as written, before desugaring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Tag(String),
    Nonterminal(String),
    /// Zero or one occurrence of the sequence.
    Optional(Vec<Item>),
    /// Zero or more occurrences of the sequence.
    Many(Vec<Item>),
    /// One or more occurrences of the sequence.
    Many1(Vec<Item>),
}

/// A terminal tag reference.
pub fn t(name: &str) -> Item {
    Item::Tag(name.to_string())
}

/// A nonterminal reference.
pub fn n(name: &str) -> Item {
    Item::Nonterminal(name.to_string())
}

pub fn opt(items: Vec<Item>) -> Item {
    Item::Optional(items)
}

pub fn many(items: Vec<Item>) -> Item {
    Item::Many(items)
}

pub fn many1(items: Vec<Item>) -> Item {
    Item::Many1(items)
}

/// A validated grammar together with its call-graph classification.
#[derive(Debug, Clone)]
pub struct Grammar {
    nonterminals: Vec<Nonterminal>,
    by_name: HashMap<String, NonterminalId>,
    start: NonterminalId,
    tag_names: Vec<String>,
    labels: SccLabels,
    /// Acyclic nonterminals whose callees are all direct too.
    direct: Vec<bool>,
    conditions: Conditions,
    warnings: WarningGroup,
}

impl Grammar {
    /// Starts a grammar over the tags of `lexical`, under the same conditions.
    pub fn builder(lexical: &LexicalGrammar) -> GrammarBuilder<'_> {
        GrammarBuilder {
            lexical,
            rules: Vec::new(),
            starts: Vec::new(),
            conditions: lexical.conditions(),
        }
    }

    pub fn start(&self) -> NonterminalId {
        self.start
    }

    /// Conditions the start nonterminal was selected under.
    pub fn conditions(&self) -> Conditions {
        self.conditions
    }

    pub fn nonterminals(&self) -> &[Nonterminal] {
        &self.nonterminals
    }

    pub fn nonterminal(&self, id: NonterminalId) -> &Nonterminal {
        &self.nonterminals[id.0]
    }

    pub fn id(&self, name: &str) -> Option<NonterminalId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: NonterminalId) -> &str {
        &self.nonterminals[id.0].name
    }

    pub fn tag_name(&self, tag: TagId) -> &str {
        &self.tag_names[tag.index()]
    }

    pub fn alternative(&self, id: NonterminalId, alternative: usize) -> &[Symbol] {
        &self.nonterminals[id.0].alternatives[alternative]
    }

    /// The symbol right after the dot, `None` when the slot is complete.
    pub fn symbol_at(&self, slot: Slot) -> Option<Symbol> {
        self.alternative(slot.nonterminal, slot.alternative)
            .get(slot.dot)
            .copied()
    }

    pub fn is_complete(&self, slot: Slot) -> bool {
        slot.dot == self.alternative(slot.nonterminal, slot.alternative).len()
    }

    pub fn labels(&self) -> &SccLabels {
        &self.labels
    }

    pub fn is_cyclic(&self, id: NonterminalId) -> bool {
        self.labels.is_cyclic(id)
    }

    pub(crate) fn is_direct(&self, id: NonterminalId) -> bool {
        self.direct[id.0]
    }

    pub fn call_graph(&self) -> CallGraph {
        call_graph(&self.nonterminals)
    }

    pub fn warnings(&self) -> &WarningGroup {
        &self.warnings
    }

    pub fn display_symbol(&self, symbol: Symbol) -> &str {
        match symbol {
            Symbol::Terminal(tag) => self.tag_name(tag),
            Symbol::Nonterminal(id) => self.name(id),
        }
    }

    /// Renders a slot as `S ::= S PLUS . S`.
    pub fn display_slot(&self, slot: Slot) -> String {
        let mut text = format!("{} ::=", self.name(slot.nonterminal));
        let symbols = self.alternative(slot.nonterminal, slot.alternative);
        for (index, symbol) in symbols.iter().enumerate() {
            if index == slot.dot {
                text.push_str(" .");
            }
            let _ = write!(text, " {}", self.display_symbol(*symbol));
        }
        if slot.dot == symbols.len() {
            text.push_str(" .");
        }
        text
    }
}

#[derive(Debug, Clone)]
struct RuleDef {
    name: String,
    alternatives: Vec<Vec<Item>>,
}

/// Collects rules and validates them into a [`Grammar`].
#[derive(Debug, Clone)]
pub struct GrammarBuilder<'l> {
    lexical: &'l LexicalGrammar,
    rules: Vec<RuleDef>,
    starts: Vec<(String, When)>,
    conditions: Conditions,
}

impl<'l> GrammarBuilder<'l> {
    /// Adds a nonterminal with its alternatives, in order.
    pub fn rule<A>(mut self, name: &str, alternatives: A) -> Self
    where
        A: IntoIterator<Item = Vec<Item>>,
    {
        self.rules.push(RuleDef {
            name: name.to_string(),
            alternatives: alternatives.into_iter().collect(),
        });
        self
    }

    /// Marks `name` as the start nonterminal.
    pub fn start(self, name: &str) -> Self {
        self.start_when(name, When::Always)
    }

    /// Marks `name` as the start nonterminal when `when` holds.
    pub fn start_when(mut self, name: &str, when: When) -> Self {
        self.starts.push((name.to_string(), when));
        self
    }

    pub fn conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
        self
    }

    /// Desugars, validates and classifies the rules.
    ///
    /// All configuration errors found are returned together.
    pub fn build(self) -> Result<Grammar, Error> {
        let mut errors = ErrorGroup::new();
        let mut nonterminals = Vec::new();
        let mut by_name = HashMap::new();
        let mut defined = Vec::new();

        for rule in &self.rules {
            if by_name.contains_key(&rule.name) {
                errors.push(ConfigError::DuplicateNonterminal {
                    name: rule.name.clone(),
                });
                continue;
            }
            let id = NonterminalId(nonterminals.len());
            by_name.insert(rule.name.clone(), id);
            nonterminals.push(Nonterminal {
                id,
                name: rule.name.clone(),
                alternatives: Vec::new(),
                auxiliary: false,
            });
            defined.push((id, rule));
        }

        let mut selected: Vec<(&str, NonterminalId)> = Vec::new();
        let mut undefined = false;
        for (name, when) in &self.starts {
            let Some(&id) = by_name.get(name) else {
                errors.push(ConfigError::UndefinedNonterminal {
                    name: name.clone(),
                    referenced_by: "start".to_string(),
                });
                undefined = true;
                continue;
            };
            if when.holds(self.conditions) && !selected.iter().any(|&(_, other)| other == id) {
                selected.push((name, id));
            }
        }
        let start = match selected.as_slice() {
            [] => {
                if !undefined {
                    errors.push(SyntacticError::NoStart);
                }
                None
            }
            [(_, id)] => Some(*id),
            [_, rest @ ..] => {
                for (name, _) in rest {
                    errors.push(SyntacticError::MultipleStarts {
                        nonterminal: name.to_string(),
                    });
                }
                None
            }
        };

        let mut lowering = Lowering {
            lexical: self.lexical,
            by_name: &by_name,
            nonterminals,
            errors: &mut errors,
            auxiliaries: 0,
        };
        for (id, rule) in defined {
            let alternatives: Vec<_> = rule
                .alternatives
                .iter()
                .map(|items| lowering.lower(&rule.name, items))
                .collect();
            lowering.nonterminals[id.0].alternatives = alternatives;
        }
        let nonterminals = lowering.nonterminals;

        errors.into_result()?;
        let Some(start) = start else {
            return Err(SyntacticError::NoStart.into());
        };

        let graph = call_graph(&nonterminals);
        let labels = compute_sccs(&graph);
        let direct = direct_flags(&nonterminals, &labels);
        let warnings = check(self.lexical, &nonterminals, &graph, start);
        log::debug!(
            "built grammar: {} nonterminals, {} cyclic",
            nonterminals.len(),
            labels.cyclic().count()
        );

        Ok(Grammar {
            nonterminals,
            by_name,
            start,
            tag_names: self
                .lexical
                .tags()
                .iter()
                .map(|tag| tag.name.clone())
                .collect(),
            labels,
            direct,
            conditions: self.conditions,
            warnings,
        })
    }
}

struct Lowering<'a> {
    lexical: &'a LexicalGrammar,
    by_name: &'a HashMap<String, NonterminalId>,
    nonterminals: Vec<Nonterminal>,
    errors: &'a mut ErrorGroup,
    auxiliaries: usize,
}

impl Lowering<'_> {
    fn lower(&mut self, rule: &str, items: &[Item]) -> Vec<Symbol> {
        let mut symbols = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Item::Tag(name) => match self.lexical.tag_id(name) {
                    Some(tag) => symbols.push(Symbol::Terminal(tag)),
                    None => self.errors.push(ConfigError::UndefinedTag {
                        name: name.clone(),
                        referenced_by: rule.to_string(),
                    }),
                },
                Item::Nonterminal(name) => match self.by_name.get(name) {
                    Some(&id) => symbols.push(Symbol::Nonterminal(id)),
                    None => self.errors.push(ConfigError::UndefinedNonterminal {
                        name: name.clone(),
                        referenced_by: rule.to_string(),
                    }),
                },
                Item::Optional(inner) => {
                    let body = self.lower(rule, inner);
                    symbols.push(self.auxiliary(rule, vec![body, vec![]]));
                }
                Item::Many(inner) | Item::Many1(inner) => {
                    let body = self.lower(rule, inner);
                    let id = NonterminalId(self.nonterminals.len());
                    let mut looped = body.clone();
                    looped.push(Symbol::Nonterminal(id));
                    let last = match item {
                        Item::Many(_) => vec![],
                        _ => body,
                    };
                    symbols.push(self.auxiliary(rule, vec![looped, last]));
                }
            }
        }
        symbols
    }

    /// Appends a fresh nonterminal named after the rule it was desugared from.
    fn auxiliary(&mut self, rule: &str, alternatives: Vec<Vec<Symbol>>) -> Symbol {
        let id = NonterminalId(self.nonterminals.len());
        self.auxiliaries += 1;
        self.nonterminals.push(Nonterminal {
            id,
            name: format!("{}#{}", rule, self.auxiliaries),
            alternatives,
            auxiliary: true,
        });
        Symbol::Nonterminal(id)
    }
}

fn direct_flags(nonterminals: &[Nonterminal], labels: &SccLabels) -> Vec<bool> {
    let mut direct = vec![false; nonterminals.len()];
    // callees are classified before their callers
    for component in labels.components() {
        for &id in component {
            let calls_direct = nonterminals[id.0]
                .alternatives
                .iter()
                .flatten()
                .all(|symbol| match symbol {
                    Symbol::Terminal(_) => true,
                    Symbol::Nonterminal(callee) => direct[callee.0],
                });
            direct[id.0] = calls_direct && !labels.is_cyclic(id);
        }
    }
    direct
}

fn check(
    lexical: &LexicalGrammar,
    nonterminals: &[Nonterminal],
    graph: &CallGraph,
    start: NonterminalId,
) -> WarningGroup {
    let mut warnings = WarningGroup::new();
    let mut reachable = vec![false; nonterminals.len()];
    let mut dfs = Dfs::new(graph, NodeIndex::new(start.0));
    while let Some(node) = dfs.next(graph) {
        reachable[node.index()] = true;
    }
    for nonterminal in nonterminals {
        if !reachable[nonterminal.id.0] && !nonterminal.auxiliary {
            warnings.push(Warning::UnreachableNonterminal {
                name: nonterminal.name.clone(),
            });
        }
    }

    let mut used = vec![false; lexical.tags().len()];
    for symbol in nonterminals.iter().flat_map(|n| n.alternatives.iter().flatten()) {
        if let Symbol::Terminal(tag) = symbol {
            used[tag.index()] = true;
        }
    }
    for tag in lexical.tags() {
        let silent = matches!(tag.role, TagRole::Ignored | TagRole::Inactive);
        if !silent && !used[tag.id.index()] {
            warnings.push(Warning::UnusedTag {
                tag: tag.name.clone(),
            });
        }
    }
    warnings
}
