//! Terminal tags and the lexer.
//!
//! A [`LexicalGrammar`] is an ordered list of terminal tags. At every input
//! offset the lexer runs the automata of all tags in lockstep, keeps the
//! longest accepted prefix and breaks ties by declaration order. Ignored tags
//! are matched but never emitted. When the grammar declares an indenting and
//! a dedenting tag, the off-side rule is applied: the first significant
//! terminal of each line is compared against a stack of indentation widths
//! and synthetic INDENT/DEDENT terminals are emitted in front of it.
//!
//! Whether a tag takes part at all, and which specifiers apply to it, may
//! depend on the runtime [`Conditions`] the grammar is built under.

use crate::automaton::{Automaton, AutomatonCache, StateSet};
use crate::conditions::{Conditions, When};
use crate::diagnostics::{ConfigError, Error, ErrorGroup, LexicalError, Position, Warning, WarningGroup};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

/// Index of a terminal tag in its lexical grammar, which is also its declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TagId(pub(crate) usize);

impl TagId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Modifiers of a terminal tag definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Specifier {
    /// Matched but never emitted, e.g. whitespace and comments.
    Ignore,
    /// Emitted when a line is more indented than the enclosing block.
    Indent,
    /// Emitted once per closed indentation level.
    Dedent,
}

/// Raw definition of a terminal tag, as handed over by a grammar definition layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagDef {
    pub name: String,
    pub pattern: Option<String>,
    /// Each specifier applies only when its guard holds.
    pub specifiers: Vec<(Specifier, When)>,
    /// The tag is left out entirely when this does not hold.
    pub active: When,
}

impl TagDef {
    pub fn new(name: &str, pattern: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.map(str::to_string),
            specifiers: vec![],
            active: When::Always,
        }
    }

    pub fn with(mut self, specifier: Specifier, when: When) -> Self {
        self.specifiers.push((specifier, when));
        self
    }

    pub fn active(mut self, when: When) -> Self {
        self.active = when;
        self
    }
}

/// What the lexer does with a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagRole {
    Token,
    Ignored,
    Indent,
    Dedent,
    /// Produced by an external lexer only.
    External,
    /// Left out under the conditions the grammar was built with.
    Inactive,
}

#[derive(Debug, Clone)]
pub struct TerminalTag {
    pub id: TagId,
    pub name: String,
    pub pattern: Option<String>,
    pub role: TagRole,
    automaton: Option<Arc<Automaton>>,
}

impl TerminalTag {
    pub fn automaton(&self) -> Option<&Arc<Automaton>> {
        self.automaton.as_ref()
    }
}

/// How tabs count when measuring indentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TabPolicy {
    /// A tab is one column wide.
    #[default]
    Column,
    /// Tab stops every `n` columns.
    Expand(usize),
    /// Indentation mixing tabs and spaces is an error.
    Reject,
}

impl TabPolicy {
    fn measure(self, leading: &str, position: Position) -> Result<usize, LexicalError> {
        match self {
            TabPolicy::Column => Ok(leading.chars().count()),
            TabPolicy::Expand(n) => {
                let n = n.max(1);
                Ok(leading.chars().fold(0, |width, c| match c {
                    '\t' => width + n - width % n,
                    _ => width + 1,
                }))
            }
            TabPolicy::Reject => {
                if leading.contains(' ') && leading.contains('\t') {
                    Err(LexicalError::MixedIndentation { position })
                } else {
                    Ok(leading.chars().count())
                }
            }
        }
    }
}

/// Ordered set of terminal tags with their compiled automata.
#[derive(Debug, Clone)]
pub struct LexicalGrammar {
    tags: Vec<TerminalTag>,
    by_name: HashMap<String, TagId>,
    /// Tags that take part in matching, in declaration order.
    matchers: Vec<(TagId, Arc<Automaton>)>,
    offside: Option<(TagId, TagId)>,
    tab_policy: TabPolicy,
    conditions: Conditions,
    warnings: WarningGroup,
}

impl LexicalGrammar {
    pub fn builder() -> LexicalGrammarBuilder {
        LexicalGrammarBuilder::default()
    }

    pub fn tags(&self) -> &[TerminalTag] {
        &self.tags
    }

    pub fn tag(&self, id: TagId) -> &TerminalTag {
        &self.tags[id.0]
    }

    pub fn tag_id(&self, name: &str) -> Option<TagId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: TagId) -> &str {
        &self.tags[id.0].name
    }

    /// Indenting and dedenting tags, when the off-side rule applies.
    pub fn offside(&self) -> Option<(TagId, TagId)> {
        self.offside
    }

    pub fn tab_policy(&self) -> TabPolicy {
        self.tab_policy
    }

    /// Conditions every guard was resolved against.
    pub fn conditions(&self) -> Conditions {
        self.conditions
    }

    pub fn warnings(&self) -> &WarningGroup {
        &self.warnings
    }

    pub fn lexer<'g, 'i>(&'g self, input: &'i str) -> Lexer<'g, 'i> {
        Lexer::new(self, input)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LexicalGrammarBuilder {
    defs: Vec<TagDef>,
    tab_policy: TabPolicy,
    conditions: Conditions,
}

impl LexicalGrammarBuilder {
    /// Adds a raw tag definition.
    pub fn define(mut self, def: TagDef) -> Self {
        self.defs.push(def);
        self
    }

    pub fn tag(self, name: &str, pattern: &str) -> Self {
        self.define(TagDef::new(name, Some(pattern)))
    }

    pub fn ignore(self, name: &str, pattern: &str) -> Self {
        self.define(TagDef::new(name, Some(pattern)).with(Specifier::Ignore, When::Always))
    }

    pub fn indent(self, name: &str) -> Self {
        self.define(TagDef::new(name, None).with(Specifier::Indent, When::Always))
    }

    pub fn dedent(self, name: &str) -> Self {
        self.define(TagDef::new(name, None).with(Specifier::Dedent, When::Always))
    }

    /// Adds a tag produced by an external lexer only.
    pub fn external(self, name: &str) -> Self {
        self.define(TagDef::new(name, None))
    }

    /// Makes the last added tag take part only when `when` holds.
    pub fn when(mut self, when: When) -> Self {
        if let Some(def) = self.defs.last_mut() {
            def.active = when;
        }
        self
    }

    pub fn tab_policy(mut self, tab_policy: TabPolicy) -> Self {
        self.tab_policy = tab_policy;
        self
    }

    /// Conditions to resolve the guards against, none raised by default.
    pub fn conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
        self
    }

    /// Validates every definition and compiles the patterns through `cache`.
    ///
    /// All configuration errors found are returned together.
    pub fn build(self, cache: &mut AutomatonCache) -> Result<LexicalGrammar, Error> {
        let mut errors = ErrorGroup::new();
        let mut warnings = WarningGroup::new();
        let mut tags = Vec::with_capacity(self.defs.len());
        let mut by_name = HashMap::new();
        let mut matchers = Vec::new();
        let mut indent: Option<TagId> = None;
        let mut dedent: Option<TagId> = None;

        for def in self.defs {
            if by_name.contains_key(&def.name) {
                errors.push(ConfigError::DuplicateTag { tag: def.name });
                continue;
            }
            let id = TagId(tags.len());
            let role = match Self::role(&def, self.conditions) {
                Ok(role) => role,
                Err(err) => {
                    errors.push(err);
                    continue;
                }
            };
            match role {
                TagRole::Indent if indent.is_some() => {
                    errors.push(ConfigError::MultipleIndents { tag: def.name });
                    continue;
                }
                TagRole::Dedent if dedent.is_some() => {
                    errors.push(ConfigError::MultipleDedents { tag: def.name });
                    continue;
                }
                TagRole::Indent => indent = Some(id),
                TagRole::Dedent => dedent = Some(id),
                _ => {}
            }
            let automaton = match &def.pattern {
                Some(pattern) => match cache.compile(pattern) {
                    Ok(automaton) => Some(automaton),
                    Err(source) => {
                        errors.push(ConfigError::MalformedPattern {
                            tag: def.name,
                            pattern: pattern.clone(),
                            source,
                        });
                        continue;
                    }
                },
                None => None,
            };
            if let Some(automaton) = automaton.as_ref().filter(|_| role != TagRole::Inactive) {
                if automaton.is_accepting(&automaton.start()) {
                    warnings.push(Warning::EmptyMatch {
                        tag: def.name.clone(),
                    });
                }
                matchers.push((id, Arc::clone(automaton)));
            }
            by_name.insert(def.name.clone(), id);
            tags.push(TerminalTag {
                id,
                name: def.name,
                pattern: def.pattern,
                role,
                automaton,
            });
        }

        let offside = match (indent, dedent) {
            (Some(indent), Some(dedent)) => Some((indent, dedent)),
            (Some(lone), None) | (None, Some(lone)) => {
                errors.push(ConfigError::MissingOffside {
                    tag: tags[lone.0].name.clone(),
                });
                None
            }
            (None, None) => None,
        };
        errors.into_result()?;
        log::debug!(
            "built lexical grammar under {:?}: {} tags, {} matched",
            self.conditions,
            tags.len(),
            matchers.len()
        );

        Ok(LexicalGrammar {
            tags,
            by_name,
            matchers,
            offside,
            tab_policy: self.tab_policy,
            conditions: self.conditions,
            warnings,
        })
    }

    /// Resolves the role of `def` from the specifiers whose guards hold.
    fn role(def: &TagDef, conditions: Conditions) -> Result<TagRole, ConfigError> {
        if !def.active.holds(conditions) {
            return Ok(TagRole::Inactive);
        }
        let mut specifiers: Vec<Specifier> = def
            .specifiers
            .iter()
            .filter(|(_, when)| when.holds(conditions))
            .map(|(specifier, _)| *specifier)
            .collect();
        specifiers.dedup();
        let offside = specifiers
            .iter()
            .any(|s| matches!(s, Specifier::Indent | Specifier::Dedent));
        if offside && specifiers.len() > 1 {
            return Err(ConfigError::SpecifierConflict {
                tag: def.name.clone(),
                specifiers,
            });
        }
        let role = match specifiers.first() {
            Some(Specifier::Indent) => TagRole::Indent,
            Some(Specifier::Dedent) => TagRole::Dedent,
            Some(Specifier::Ignore) => TagRole::Ignored,
            None if def.pattern.is_some() => TagRole::Token,
            None => TagRole::External,
        };
        match role {
            TagRole::Indent | TagRole::Dedent if def.pattern.is_some() => {
                Err(ConfigError::UnexpectedPattern {
                    tag: def.name.clone(),
                })
            }
            TagRole::Ignored if def.pattern.is_none() => Err(ConfigError::MissingPattern {
                tag: def.name.clone(),
            }),
            role => Ok(role),
        }
    }
}

/// A matched token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Terminal {
    pub tag: TagId,
    /// Matched text, empty for INDENT/DEDENT terminals.
    pub text: String,
    pub start: Position,
    pub end: Position,
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}{:?}@{}", self.tag.0, self.text, self.start)
    }
}

/// Mutable cursor of one lexer run.
#[derive(Debug, Clone)]
pub struct LexingState {
    position: Position,
    /// Byte offset where the current line starts.
    line_start: usize,
    /// Open indentation widths, the outermost level first.
    indents: Vec<usize>,
    /// Last line whose first significant char has been seen.
    settled_line: usize,
    /// Live automaton states of every matcher at the current match attempt.
    live: Vec<Option<StateSet>>,
}

impl Default for LexingState {
    fn default() -> Self {
        Self {
            position: Position::default(),
            line_start: 0,
            indents: vec![0],
            settled_line: 0,
            live: Vec::new(),
        }
    }
}

impl LexingState {
    pub fn position(&self) -> Position {
        self.position
    }

    /// Number of open indentation levels above the outermost one.
    pub fn indentation_depth(&self) -> usize {
        self.indents.len() - 1
    }
}

/// Tokenizes one input on demand.
///
/// The lexer yields terminals until the end of the input or the first
/// error, after which it yields nothing.
#[derive(Debug)]
pub struct Lexer<'g, 'i> {
    grammar: &'g LexicalGrammar,
    input: &'i str,
    state: LexingState,
    pending: VecDeque<Terminal>,
    done: bool,
}

impl<'g, 'i> Lexer<'g, 'i> {
    pub fn new(grammar: &'g LexicalGrammar, input: &'i str) -> Self {
        Self {
            grammar,
            input,
            state: LexingState::default(),
            pending: VecDeque::new(),
            done: false,
        }
    }

    pub fn grammar(&self) -> &'g LexicalGrammar {
        self.grammar
    }

    pub fn state(&self) -> &LexingState {
        &self.state
    }

    /// Levels opened by the INDENT terminals yielded so far and not yet
    /// closed by yielded DEDENT terminals.
    pub fn indentation_depth(&self) -> usize {
        let Some((indent, dedent)) = self.grammar.offside else {
            return 0;
        };
        let pending = |tag: TagId| self.pending.iter().filter(|t| t.tag == tag).count();
        self.state.indentation_depth() + pending(dedent) - pending(indent)
    }

    /// Produces the next terminal, or `None` at the end of the input.
    pub fn next_terminal(&mut self) -> Result<Option<Terminal>, LexicalError> {
        match self.advance() {
            Err(err) => {
                self.done = true;
                self.pending.clear();
                Err(err)
            }
            ok => ok,
        }
    }

    fn advance(&mut self) -> Result<Option<Terminal>, LexicalError> {
        loop {
            if let Some(terminal) = self.pending.pop_front() {
                return Ok(Some(terminal));
            }
            if self.done {
                return Ok(None);
            }
            let start = self.state.position;
            if start.offset == self.input.len() {
                self.close_levels();
                self.done = true;
                continue;
            }

            let (tag, len) = self.longest_match()?;
            let text = &self.input[start.offset..start.offset + len];
            let role = self.grammar.tag(tag).role;
            self.settle_line(role, text, start)?;

            let mut end = start;
            end.advance_str(text);
            if let Some(newline) = text.rfind('\n') {
                self.state.line_start = start.offset + newline + 1;
            }
            self.state.position = end;
            log::trace!(
                "matched {} {:?} at {}",
                self.grammar.name(tag),
                text,
                start
            );

            if role != TagRole::Ignored {
                self.pending.push_back(Terminal {
                    tag,
                    text: text.to_string(),
                    start,
                    end,
                });
            }
        }
    }

    /// Longest non-empty match at the current offset, ties going to the earliest tag.
    fn longest_match(&mut self) -> Result<(TagId, usize), LexicalError> {
        let matchers = &self.grammar.matchers;
        let rest = &self.input[self.state.position.offset..];
        let live = &mut self.state.live;
        live.clear();
        live.extend(matchers.iter().map(|(_, automaton)| Some(automaton.start())));
        let mut progress = vec![0; matchers.len()];
        let mut best: Option<(TagId, usize)> = None;

        for (offset, c) in rest.char_indices() {
            let end = offset + c.len_utf8();
            let mut alive = false;
            for (k, (tag, automaton)) in matchers.iter().enumerate() {
                let Some(current) = &live[k] else { continue };
                let next = automaton.step(current, c);
                if next.is_empty() {
                    live[k] = None;
                    continue;
                }
                alive = true;
                progress[k] = end;
                if automaton.is_accepting(&next) && best.map_or(true, |(_, len)| end > len) {
                    best = Some((*tag, end));
                }
                live[k] = Some(next);
            }
            if !alive {
                break;
            }
        }

        best.ok_or_else(|| {
            let furthest = progress.iter().copied().max().unwrap_or(0);
            let closest = matchers
                .iter()
                .zip(&progress)
                .filter(|(_, reached)| furthest > 0 && **reached == furthest)
                .map(|((tag, _), _)| self.grammar.name(*tag).to_string())
                .collect();
            LexicalError::NoTerminalTag {
                position: self.state.position,
                found: rest.chars().next().unwrap_or_default(),
                closest,
            }
        })
    }

    /// Applies the off-side rule when `text` holds the first significant char of its line.
    fn settle_line(&mut self, role: TagRole, text: &str, start: Position) -> Result<(), LexicalError> {
        let Some((indent, dedent)) = self.grammar.offside else {
            return Ok(());
        };
        let significant = |c: char| !matches!(c, ' ' | '\t' | '\r' | '\n');

        if start.line != self.state.settled_line && text.starts_with(significant) {
            let leading = &self.input[self.state.line_start..start.offset];
            if leading.chars().all(|c| c == ' ' || c == '\t') {
                self.state.settled_line = start.line;
                // comment-only lines do not take part
                if role != TagRole::Ignored {
                    let width = self.grammar.tab_policy.measure(leading, start)?;
                    self.apply_offside(width, start, indent, dedent)?;
                }
            }
        }
        if let Some(newline) = text.rfind('\n') {
            if text[newline + 1..].contains(significant) {
                self.state.settled_line = start.line + text.matches('\n').count();
            }
        }
        Ok(())
    }

    fn apply_offside(
        &mut self,
        width: usize,
        position: Position,
        indent: TagId,
        dedent: TagId,
    ) -> Result<(), LexicalError> {
        let indents = &mut self.state.indents;
        let mut top = indents.last().copied().unwrap_or(0);
        if width > top {
            indents.push(width);
            self.pending.push_back(offside_terminal(indent, position));
            return Ok(());
        }
        while width < top {
            indents.pop();
            self.pending.push_back(offside_terminal(dedent, position));
            top = indents.last().copied().unwrap_or(0);
        }
        if width != top {
            return Err(LexicalError::Indentation { position, width });
        }
        Ok(())
    }

    fn close_levels(&mut self) {
        if let Some((_, dedent)) = self.grammar.offside {
            let position = self.state.position;
            while self.state.indents.len() > 1 {
                self.state.indents.pop();
                self.pending.push_back(offside_terminal(dedent, position));
            }
        }
    }
}

fn offside_terminal(tag: TagId, position: Position) -> Terminal {
    Terminal {
        tag,
        text: String::new(),
        start: position,
        end: position,
    }
}

impl Iterator for Lexer<'_, '_> {
    type Item = Result<Terminal, LexicalError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_terminal().transpose()
    }
}

impl FusedIterator for Lexer<'_, '_> {}
