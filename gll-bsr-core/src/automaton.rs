//! Terminal tag automata and their cache.
//!
//! Each pattern is parsed by `regex-syntax` and translated into a Thompson
//! NFA over chars. The NFA is simulated directly, one set of live states at
//! a time; epsilon transitions are followed while computing those sets, so no
//! determinization happens up front.

use regex_syntax::hir::{Class, Hir, HirKind};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// NFA states are stored into a vec, and references are stored as integer
pub type StateId = usize;

/// Why a pattern could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("{0}")]
    Syntax(String),
    #[error("unsupported construct: {0}")]
    Unsupported(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    /// Consumes one char inside any of the inclusive ranges.
    Chars {
        ranges: Box<[(char, char)]>,
        next: StateId,
    },
    /// Epsilon transitions.
    Split(Vec<StateId>),
    Match,
}

/// Live NFA states after consuming some input.
///
/// Only char-consuming and accepting states are kept; split states are
/// resolved when the set is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StateSet {
    states: Vec<StateId>,
}

impl StateSet {
    /// No state is live: the automaton cannot advance any further.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }
}

/// Compiled nondeterministic automaton of one pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Automaton {
    states: Vec<State>,
    start: StateId,
}

impl Automaton {
    /// Compiles `pattern`, written in `regex-syntax` syntax.
    ///
    /// Anchors and other look-around assertions have no meaning for a token
    /// and are rejected.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let hir = regex_syntax::ParserBuilder::new()
            .build()
            .parse(pattern)
            .map_err(|err| PatternError::Syntax(err.to_string()))?;
        let mut automaton = Automaton {
            states: vec![State::Match],
            start: 0,
        };
        automaton.start = automaton.compile(&hir, 0)?;
        Ok(automaton)
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    fn push(&mut self, state: State) -> StateId {
        self.states.push(state);
        self.states.len() - 1
    }

    /// Emits states matching `hir` and continuing at `next`, returning the entry state.
    fn compile(&mut self, hir: &Hir, next: StateId) -> Result<StateId, PatternError> {
        match hir.kind() {
            HirKind::Empty => Ok(next),
            HirKind::Literal(literal) => {
                let text = std::str::from_utf8(&literal.0)
                    .map_err(|_| PatternError::Unsupported("non UTF-8 literal"))?;
                let mut entry = next;
                for c in text.chars().rev() {
                    entry = self.push(State::Chars {
                        ranges: Box::new([(c, c)]),
                        next: entry,
                    });
                }
                Ok(entry)
            }
            HirKind::Class(Class::Unicode(class)) => {
                let ranges = class.ranges().iter().map(|r| (r.start(), r.end())).collect();
                Ok(self.push(State::Chars { ranges, next }))
            }
            HirKind::Class(Class::Bytes(class)) => {
                let ranges = class
                    .ranges()
                    .iter()
                    .map(|r| (char::from(r.start()), char::from(r.end())))
                    .collect();
                Ok(self.push(State::Chars { ranges, next }))
            }
            HirKind::Look(_) => Err(PatternError::Unsupported("anchors and look-around")),
            HirKind::Capture(capture) => self.compile(&capture.sub, next),
            HirKind::Concat(items) => {
                let mut entry = next;
                for item in items.iter().rev() {
                    entry = self.compile(item, entry)?;
                }
                Ok(entry)
            }
            HirKind::Alternation(items) => {
                let targets = items
                    .iter()
                    .map(|item| self.compile(item, next))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self.push(State::Split(targets)))
            }
            HirKind::Repetition(repetition) => {
                let mut entry = match repetition.max {
                    None => {
                        let looped = self.push(State::Split(vec![]));
                        let body = self.compile(&repetition.sub, looped)?;
                        self.states[looped] = State::Split(vec![body, next]);
                        looped
                    }
                    Some(max) => {
                        let mut entry = next;
                        for _ in repetition.min..max {
                            let body = self.compile(&repetition.sub, entry)?;
                            entry = self.push(State::Split(vec![body, next]));
                        }
                        entry
                    }
                };
                for _ in 0..repetition.min {
                    entry = self.compile(&repetition.sub, entry)?;
                }
                Ok(entry)
            }
        }
    }

    /// Adds the epsilon closure of `state` to `set`.
    fn close(&self, state: StateId, set: &mut StateSet, seen: &mut [bool]) {
        let mut stack = vec![state];
        while let Some(id) = stack.pop() {
            if seen[id] {
                continue;
            }
            seen[id] = true;
            match &self.states[id] {
                State::Split(targets) => stack.extend(targets.iter().rev()),
                _ => set.states.push(id),
            }
        }
    }

    /// Live states before consuming any input.
    pub fn start(&self) -> StateSet {
        let mut set = StateSet::default();
        let mut seen = vec![false; self.states.len()];
        self.close(self.start, &mut set, &mut seen);
        set
    }

    /// Live states after consuming `c` from `current`.
    pub fn step(&self, current: &StateSet, c: char) -> StateSet {
        let mut set = StateSet::default();
        let mut seen = vec![false; self.states.len()];
        for &id in &current.states {
            if let State::Chars { ranges, next } = &self.states[id] {
                if ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi) {
                    self.close(*next, &mut set, &mut seen);
                }
            }
        }
        set
    }

    pub fn is_accepting(&self, set: &StateSet) -> bool {
        set.states.iter().any(|&id| self.states[id] == State::Match)
    }

    /// Whether the whole of `text` is accepted.
    pub fn accepts(&self, text: &str) -> bool {
        let mut set = self.start();
        for c in text.chars() {
            set = self.step(&set, c);
            if set.is_empty() {
                return false;
            }
        }
        self.is_accepting(&set)
    }

    /// Byte length of the longest non-empty accepted prefix of `text`.
    pub fn longest_match(&self, text: &str) -> Option<usize> {
        let mut set = self.start();
        let mut longest = None;
        for (offset, c) in text.char_indices() {
            set = self.step(&set, c);
            if set.is_empty() {
                break;
            }
            if self.is_accepting(&set) {
                longest = Some(offset + c.len_utf8());
            }
        }
        longest
    }
}

/// Memoizes one automaton per pattern.
///
/// The cache is filled while a lexical grammar is built and only read
/// afterwards. Automata are handed out as `Arc`s, so lexer runs on other
/// threads can share them.
#[derive(Debug, Default)]
pub struct AutomatonCache {
    automata: HashMap<String, Arc<Automaton>>,
}

impl AutomatonCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the automaton of `pattern`, compiling it on first use.
    pub fn compile(&mut self, pattern: &str) -> Result<Arc<Automaton>, PatternError> {
        if let Some(automaton) = self.automata.get(pattern) {
            return Ok(Arc::clone(automaton));
        }
        let automaton = Arc::new(Automaton::new(pattern)?);
        log::trace!(
            "compiled pattern {:?} into {} states",
            pattern,
            automaton.state_count()
        );
        self.automata
            .insert(pattern.to_string(), Arc::clone(&automaton));
        Ok(automaton)
    }

    /// The automaton of an already compiled pattern.
    pub fn get(&self, pattern: &str) -> Option<Arc<Automaton>> {
        self.automata.get(pattern).cloned()
    }

    pub fn len(&self) -> usize {
        self.automata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.automata.is_empty()
    }
}
