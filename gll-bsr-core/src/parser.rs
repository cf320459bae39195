//! GLL parser entry points.

use crate::bsr::Bsr;
use crate::diagnostics::{Error, LexicalError, NoDerivation, Position, SyntacticError};
use crate::grammar::{Grammar, Symbol};
use crate::lexical::{LexicalGrammar, Terminal};
use crate::state::ParsingState;
use std::collections::BTreeSet;

/// Parses terminal streams against one grammar.
///
/// The parser only borrows the grammar, so any number of parses, on any
/// number of threads, can share one grammar and its classification.
#[derive(Debug, Clone, Copy)]
pub struct Parser<'g> {
    grammar: &'g Grammar,
}

impl<'g> Parser<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// Parses `terminals`, stopping at the first lexical error.
    pub fn parse<I>(&self, terminals: I) -> Result<Bsr<'g>, Error>
    where
        I: IntoIterator<Item = Result<Terminal, LexicalError>>,
    {
        let terminals = terminals.into_iter().collect::<Result<Vec<_>, _>>()?;
        let epns = {
            let mut state = ParsingState::new(self.grammar, &terminals);
            let ends = state.run();
            log::debug!(
                "parsed {} terminals: {} descriptors, {} call-return nodes, {} EPNs",
                terminals.len(),
                state.processed,
                state.crf.node_count(),
                state.epns.len()
            );
            if !ends.contains(&terminals.len()) {
                for end in ends {
                    state.fail_at_end(end);
                }
                return Err(self.no_derivation(&state, &terminals).into());
            }
            std::mem::take(&mut state.epns)
        };
        Ok(Bsr::new(self.grammar, terminals, epns))
    }

    /// Lexes `text` with `lexical` and parses the result.
    pub fn parse_str(&self, lexical: &LexicalGrammar, text: &str) -> Result<Bsr<'g>, Error> {
        self.parse(lexical.lexer(text))
    }

    fn no_derivation(&self, state: &ParsingState<'_>, terminals: &[Terminal]) -> SyntacticError {
        let grammar = self.grammar;
        let index = state.furthest;
        let position = match terminals.get(index) {
            Some(terminal) => terminal.start,
            None => terminals.last().map_or_else(Position::default, |terminal| terminal.end),
        };
        let expected: BTreeSet<_> = state
            .pending
            .iter()
            .filter_map(|slot| match grammar.symbol_at(*slot) {
                Some(Symbol::Terminal(tag)) => Some(tag),
                _ => None,
            })
            .collect();
        let report = NoDerivation {
            index,
            position,
            found: terminals
                .get(index)
                .map(|terminal| grammar.tag_name(terminal.tag).to_string()),
            expected: expected
                .into_iter()
                .map(|tag| grammar.tag_name(tag).to_string())
                .collect(),
            pending: state.pending.iter().copied().collect(),
        };

        // empty alternatives match anywhere without making progress
        if !state.epns.iter().any(|epn| epn.end > epn.start) {
            return SyntacticError::NoDerivation(report);
        }
        let owner = report
            .pending
            .first()
            .map_or(grammar.start(), |slot| slot.nonterminal);
        SyntacticError::Derivation {
            nonterminal: grammar.name(owner).to_string(),
            source: report,
        }
    }
}
