//! Runtime condition flags.
//!
//! A [`Conditions`] value is the set of flags a caller raises for one
//! configuration of a language. Terminal tags, their specifiers and start
//! nonterminals can be guarded by a [`When`] predicate over those flags, so
//! one definition serves several dialects: the builders resolve every guard
//! against their conditions and validate the result.

use std::ops::BitOr;

/// A set of up to 64 condition flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Conditions(u64);

impl Conditions {
    pub const NONE: Conditions = Conditions(0);

    /// The single flag number `index`; empty when `index` is 64 or more.
    pub const fn flag(index: u32) -> Self {
        match 1u64.checked_shl(index) {
            Some(bit) => Conditions(bit),
            None => Conditions(0),
        }
    }

    pub const fn from_bits(bits: u64) -> Self {
        Conditions(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn union(self, other: Conditions) -> Self {
        Conditions(self.0 | other.0)
    }

    /// Whether every flag of `other` is raised in `self`.
    pub const fn contains(self, other: Conditions) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Conditions) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for Conditions {
    type Output = Conditions;

    fn bitor(self, rhs: Conditions) -> Conditions {
        self.union(rhs)
    }
}

/// Predicate over [`Conditions`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum When {
    #[default]
    Always,
    Never,
    /// Every flag of the set is raised.
    All(Conditions),
    /// At least one flag of the set is raised.
    Any(Conditions),
    /// No flag of the set is raised.
    NoneOf(Conditions),
}

impl When {
    pub fn holds(self, conditions: Conditions) -> bool {
        match self {
            When::Always => true,
            When::Never => false,
            When::All(flags) => conditions.contains(flags),
            When::Any(flags) => conditions.intersects(flags),
            When::NoneOf(flags) => !conditions.intersects(flags),
        }
    }
}
