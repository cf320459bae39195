//! Diagnostics shared by the lexer, the grammar model and the parser.
//!
//! Every error and warning carries a [`Location`], which is either a
//! structured [`Position`] in the input, a free-form name (a terminal tag or
//! nonterminal of the configuration), or nothing at all. Errors that are
//! found together are reported together in an [`ErrorGroup`], keeping the
//! order in which they were discovered.

use crate::automaton::PatternError;
use crate::grammar::Slot;
use crate::lexical::Specifier;
use std::fmt;
use thiserror::Error;

/// Position in the input text.
///
/// `offset` is a 0-based byte offset, `line` and `column` are 1-based and
/// `column` counts chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// Moves the position past `c`.
    pub fn advance(&mut self, c: char) {
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    /// Moves the position past every char of `text`.
    pub fn advance_str(&mut self, text: &str) {
        for c in text.chars() {
            self.advance(c);
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(0, 1, 1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Where a diagnostic happened.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    /// A position in the input text.
    Position(Position),
    /// A named place outside the input, e.g. a terminal tag of the configuration.
    Named(String),
    /// Not location-specific.
    Unknown,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Position(position) => write!(f, "{}", position),
            Location::Named(name) => write!(f, "{}", name),
            Location::Unknown => Ok(()),
        }
    }
}

/// Taxonomy of diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    Configuration,
    Lexical,
    Syntactic,
    Group,
    Warning,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::Configuration => "configuration error",
            DiagnosticKind::Lexical => "lexical error",
            DiagnosticKind::Syntactic => "syntactic error",
            DiagnosticKind::Group => "errors",
            DiagnosticKind::Warning => "warning",
        };
        f.write_str(name)
    }
}

/// Errors in the lexical or syntactic configuration.
///
/// These are found before any input is processed and must be fixed by the
/// grammar author.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{tag}: configuration error: malformed pattern {pattern:?}: {source}")]
    MalformedPattern {
        tag: String,
        pattern: String,
        source: PatternError,
    },
    #[error("{tag}: configuration error: conflicting specifiers {specifiers:?}")]
    SpecifierConflict {
        tag: String,
        specifiers: Vec<Specifier>,
    },
    #[error("{tag}: configuration error: ignored terminal tag without a pattern")]
    MissingPattern { tag: String },
    #[error("{tag}: configuration error: indenting/dedenting terminal tag with a pattern")]
    UnexpectedPattern { tag: String },
    #[error("{tag}: configuration error: terminal tag defined more than once")]
    DuplicateTag { tag: String },
    #[error("{tag}: configuration error: multiple indenting terminal tags")]
    MultipleIndents { tag: String },
    #[error("{tag}: configuration error: multiple dedenting terminal tags")]
    MultipleDedents { tag: String },
    #[error("{tag}: configuration error: missing indenting/dedenting counterpart")]
    MissingOffside { tag: String },
    #[error("{name}: configuration error: nonterminal defined more than once")]
    DuplicateNonterminal { name: String },
    #[error("{referenced_by}: configuration error: undefined nonterminal {name}")]
    UndefinedNonterminal { name: String, referenced_by: String },
    #[error("{referenced_by}: configuration error: undefined terminal tag {name}")]
    UndefinedTag { name: String, referenced_by: String },
}

impl ConfigError {
    pub fn kind(&self) -> DiagnosticKind {
        DiagnosticKind::Configuration
    }

    pub fn location(&self) -> Location {
        use ConfigError::*;
        let name = match self {
            MalformedPattern { tag, .. }
            | SpecifierConflict { tag, .. }
            | MissingPattern { tag }
            | UnexpectedPattern { tag }
            | DuplicateTag { tag }
            | MultipleIndents { tag }
            | MultipleDedents { tag }
            | MissingOffside { tag } => tag,
            DuplicateNonterminal { name } => name,
            UndefinedNonterminal { referenced_by, .. } | UndefinedTag { referenced_by, .. } => {
                referenced_by
            }
        };
        Location::Named(name.clone())
    }
}

/// Errors found while tokenizing an input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexicalError {
    /// No terminal tag accepts any prefix of the input at `position`.
    ///
    /// `closest` names the tags whose automata got furthest before failing.
    /// It may be empty.
    #[error(
        "{position}: lexical error: no terminal tag matches {found:?}{}",
        closest_suffix(.closest)
    )]
    NoTerminalTag {
        position: Position,
        found: char,
        closest: Vec<String>,
    },
    /// A dedent to a width that matches no open indentation level.
    #[error("{position}: lexical error: indentation width {width} matches no enclosing level")]
    Indentation { position: Position, width: usize },
    /// Indentation mixing tabs and spaces under `TabPolicy::Reject`.
    #[error("{position}: lexical error: indentation mixes tabs and spaces")]
    MixedIndentation { position: Position },
}

fn closest_suffix(closest: &[String]) -> String {
    if closest.is_empty() {
        String::new()
    } else {
        format!(", closest matches: {}", closest.join(", "))
    }
}

impl LexicalError {
    pub fn position(&self) -> Position {
        match self {
            LexicalError::NoTerminalTag { position, .. }
            | LexicalError::Indentation { position, .. }
            | LexicalError::MixedIndentation { position } => *position,
        }
    }

    pub fn kind(&self) -> DiagnosticKind {
        DiagnosticKind::Lexical
    }

    pub fn location(&self) -> Location {
        Location::Position(self.position())
    }
}

/// The furthest point a parse reached without finding a derivation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "{position}: syntactic error: no derivation, found {}, expected {}",
    .found.as_deref().unwrap_or("end of input"),
    expected_list(.expected)
)]
pub struct NoDerivation {
    /// Index of the offending terminal; equal to the terminal count at end of input.
    pub index: usize,
    pub position: Position,
    /// Tag of the offending terminal, `None` at end of input.
    pub found: Option<String>,
    /// Names of the terminal tags the pending slots were waiting for.
    pub expected: Vec<String>,
    /// Grammar slots that were waiting on a terminal at `index`.
    pub pending: Vec<Slot>,
}

fn expected_list(expected: &[String]) -> String {
    if expected.is_empty() {
        "end of input".to_string()
    } else {
        expected.join(" | ")
    }
}

/// Errors of the syntactic configuration or of a parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntacticError {
    #[error("syntactic error: no starting nonterminal")]
    NoStart,
    #[error("{nonterminal}: syntactic error: multiple starting nonterminals")]
    MultipleStarts { nonterminal: String },
    /// Nothing in the input could be derived.
    #[error(transparent)]
    NoDerivation(NoDerivation),
    /// A partial derivation of `nonterminal` was abandoned.
    #[error(
        "{}: syntactic error: derivation of {nonterminal} abandoned at terminal {}",
        .source.position,
        .source.index
    )]
    Derivation {
        nonterminal: String,
        source: NoDerivation,
    },
}

impl SyntacticError {
    /// The underlying no-derivation report, if this is a parse error.
    pub fn no_derivation(&self) -> Option<&NoDerivation> {
        match self {
            SyntacticError::NoDerivation(inner) | SyntacticError::Derivation { source: inner, .. } => {
                Some(inner)
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> DiagnosticKind {
        DiagnosticKind::Syntactic
    }

    pub fn location(&self) -> Location {
        match self {
            SyntacticError::NoStart => Location::Unknown,
            SyntacticError::MultipleStarts { nonterminal } => Location::Named(nonterminal.clone()),
            SyntacticError::NoDerivation(inner) | SyntacticError::Derivation { source: inner, .. } => {
                Location::Position(inner.position)
            }
        }
    }
}

/// Any error raised by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Lexical(#[from] LexicalError),
    #[error(transparent)]
    Syntactic(#[from] SyntacticError),
    #[error(transparent)]
    Group(ErrorGroup),
}

impl Error {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Error::Config(e) => e.kind(),
            Error::Lexical(e) => e.kind(),
            Error::Syntactic(e) => e.kind(),
            Error::Group(_) => DiagnosticKind::Group,
        }
    }

    pub fn location(&self) -> Location {
        match self {
            Error::Config(e) => e.location(),
            Error::Lexical(e) => e.location(),
            Error::Syntactic(e) => e.location(),
            Error::Group(_) => Location::Unknown,
        }
    }

    /// Errors contained in this one, in discovery order.
    pub fn errors(&self) -> &[Error] {
        match self {
            Error::Group(group) => &group.0,
            other => std::slice::from_ref(other),
        }
    }
}

/// Independent errors discovered by one run, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorGroup(Vec<Error>);

impl ErrorGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: impl Into<Error>) {
        self.0.push(error.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Error> {
        self.0.iter()
    }

    /// `Ok` when empty, the error itself when there is only one, a group otherwise.
    pub fn into_result(mut self) -> Result<(), Error> {
        match self.0.len() {
            0 => Ok(()),
            1 => Err(self.0.remove(0)),
            _ => Err(Error::Group(self)),
        }
    }
}

impl fmt::Display for ErrorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} errors", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorGroup {}

/// Conditions worth reporting that do not stop a build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Warning {
    #[error("{tag}: warning: pattern matches the empty string, which is never selected")]
    EmptyMatch { tag: String },
    #[error("{tag}: warning: terminal tag is never referenced by the grammar")]
    UnusedTag { tag: String },
    #[error("{name}: warning: nonterminal is unreachable from the start")]
    UnreachableNonterminal { name: String },
}

impl Warning {
    pub fn kind(&self) -> DiagnosticKind {
        DiagnosticKind::Warning
    }

    pub fn location(&self) -> Location {
        match self {
            Warning::EmptyMatch { tag } | Warning::UnusedTag { tag } => Location::Named(tag.clone()),
            Warning::UnreachableNonterminal { name } => Location::Named(name.clone()),
        }
    }
}

/// Warnings of one build, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarningGroup(Vec<Warning>);

impl WarningGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `warning` and logs it.
    pub fn push(&mut self, warning: Warning) {
        log::warn!("{}", warning);
        self.0.push(warning);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Warning> {
        self.0.iter()
    }

    pub fn extend(&mut self, other: WarningGroup) {
        self.0.extend(other.0);
    }
}

impl fmt::Display for WarningGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} warnings", self.0.len())?;
        for warning in &self.0 {
            write!(f, "\n  {}", warning)?;
        }
        Ok(())
    }
}
