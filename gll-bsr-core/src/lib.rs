//! A generalized LL parsing library, core crate
//!
//! Input text is tokenized by a [`Lexer`] driven by a [`LexicalGrammar`],
//! or by any `logos` lexer through [`LogosTerminals`]. The [`Parser`] then
//! builds a [`Bsr`] holding every derivation of the terminals under a
//! [`Grammar`], ambiguous or not.
//!
//! ```
//! use gll_bsr_core::*;
//!
//! let mut cache = AutomatonCache::new();
//! let lexical = LexicalGrammar::builder()
//!     .tag("N", "[0-9]+")
//!     .tag("PLUS", "[+]")
//!     .ignore("WS", " +")
//!     .build(&mut cache)
//!     .unwrap();
//! let grammar = Grammar::builder(&lexical)
//!     .rule("E", [vec![n("E"), t("PLUS"), n("E")], vec![t("N")]])
//!     .start("E")
//!     .build()
//!     .unwrap();
//! let bsr = Parser::new(&grammar).parse_str(&lexical, "1 + 2 + 3").unwrap();
//! assert_eq!(bsr.count_derivations(), Some(2));
//! ```

mod automaton;
mod bsr;
mod conditions;
mod diagnostics;
mod grammar;
mod lexical;
mod parser;
mod scc;
mod state;
mod token;
pub use automaton::*;
pub use bsr::*;
pub use conditions::*;
pub use diagnostics::*;
pub use grammar::*;
pub use lexical::*;
pub use parser::*;
pub use scc::*;
pub use state::*;
pub use token::*;
/// Re-exported so callers can drive [`Derivations`] without depending on it.
pub use streaming_iterator::StreamingIterator;
