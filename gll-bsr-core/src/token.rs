//! Terminal streams produced by a `logos` lexer.
//!
//! Each token kind is mapped to the terminal tag of the same name, which
//! must be declared with
//! [`external`](crate::LexicalGrammarBuilder::external). Data carried by a
//! variant is ignored: `Number(42)` maps to `Number`.

use crate::diagnostics::{LexicalError, Position};
use crate::lexical::{LexicalGrammar, TagId, TagRole, Terminal};
use logos::Logos;
use std::fmt::Debug;
use std::iter::FusedIterator;

pub struct LogosTerminals<'g, 's, T: Logos<'s, Source = str>> {
    grammar: &'g LexicalGrammar,
    lexer: logos::Lexer<'s, T>,
    position: Position,
    done: bool,
}

impl<'g, 's, T> LogosTerminals<'g, 's, T>
where
    T: Logos<'s, Source = str> + Debug,
    T::Extras: Default,
{
    pub fn new(grammar: &'g LexicalGrammar, source: &'s str) -> Self {
        Self::from_lexer(grammar, T::lexer(source))
    }
}

impl<'g, 's, T> LogosTerminals<'g, 's, T>
where
    T: Logos<'s, Source = str> + Debug,
{
    pub fn from_lexer(grammar: &'g LexicalGrammar, lexer: logos::Lexer<'s, T>) -> Self {
        Self {
            grammar,
            lexer,
            position: Position::default(),
            done: false,
        }
    }

    fn tag(&self, kind: &T) -> Option<TagId> {
        let name = format!("{:?}", kind);
        let name = name
            .split(|c: char| c == '(' || c == ' ' || c == '{')
            .next()
            .unwrap_or_default();
        self.grammar
            .tag_id(name)
            .filter(|&tag| self.grammar.tag(tag).role == TagRole::External)
    }

    fn error(&self, slice: &str, start: Position) -> LexicalError {
        LexicalError::NoTerminalTag {
            position: start,
            found: slice.chars().next().unwrap_or_default(),
            closest: vec![],
        }
    }
}

impl<'s, T> Iterator for LogosTerminals<'_, 's, T>
where
    T: Logos<'s, Source = str> + Debug,
{
    type Item = Result<Terminal, LexicalError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Some(token) = self.lexer.next() else {
            self.done = true;
            return None;
        };
        let span = self.lexer.span();
        let source = self.lexer.source();
        self.position.advance_str(&source[self.position.offset..span.start]);
        let start = self.position;
        let slice = self.lexer.slice();
        self.position.advance_str(slice);

        let tag = token.ok().and_then(|kind| self.tag(&kind));
        match tag {
            Some(tag) => Some(Ok(Terminal {
                tag,
                text: slice.to_string(),
                start,
                end: self.position,
            })),
            None => {
                self.done = true;
                Some(Err(self.error(slice, start)))
            }
        }
    }
}

impl<'s, T> FusedIterator for LogosTerminals<'_, 's, T> where T: Logos<'s, Source = str> + Debug {}
