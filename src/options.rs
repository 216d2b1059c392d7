//! Result-shape configuration.
//!
//! Parses per-side options from either a scalar (applied to both sides) or
//! an explicit per-side pair, and validates the `multi`/`nonmatches`
//! cross-side interaction invariant.

use crate::capability::Mode;
use crate::error::ConfigurationError;

/// Which side of a pair an option or error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

/// Whether unmatched elements of a side still appear in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonMatches {
    Drop,
    Keep,
}

/// How multiple right-side matches are reduced for a single left element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multi {
    All,
    First,
    Last,
    Closest,
}

/// Flat output or grouped by one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    None,
    Left,
    Right,
}

/// Asserted bounds on per-element match counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cardinality {
    Exact(usize),
    Range(usize, usize),
    AtLeastOne,
    Any,
}

impl Cardinality {
    pub fn admits(self, count: usize) -> bool {
        match self {
            Cardinality::Exact(n) => count == n,
            Cardinality::Range(a, b) => (a..=b).contains(&count),
            Cardinality::AtLeastOne => count >= 1,
            Cardinality::Any => true,
        }
    }
}

/// Per-side result-shape settings.
#[derive(Debug, Clone, Copy)]
pub struct SideOptions {
    pub nonmatches: NonMatches,
    pub multi: Multi,
    pub cardinality: Cardinality,
}

impl Default for SideOptions {
    fn default() -> Self {
        SideOptions {
            nonmatches: NonMatches::Drop,
            multi: Multi::All,
            cardinality: Cardinality::Any,
        }
    }
}

/// Full set of options accepted by `join`/`join_indices`.
#[derive(Clone)]
pub struct JoinOptions {
    pub left: SideOptions,
    pub right: SideOptions,
    pub groupby: GroupBy,
    pub mode: Option<Mode>,
    /// Gated parallel left-probe; see `EngineConfig`.
    pub parallel: bool,
}

impl Default for JoinOptions {
    fn default() -> Self {
        JoinOptions {
            left: SideOptions::default(),
            right: SideOptions::default(),
            groupby: GroupBy::None,
            mode: None,
            parallel: false,
        }
    }
}

impl JoinOptions {
    pub fn inner() -> Self {
        JoinOptions::default()
    }

    pub fn left_join() -> Self {
        let mut o = JoinOptions::default();
        o.left.nonmatches = NonMatches::Keep;
        o
    }

    pub fn right_join() -> Self {
        let mut o = JoinOptions::default();
        o.right.nonmatches = NonMatches::Keep;
        o
    }

    pub fn outer_join() -> Self {
        let mut o = JoinOptions::default();
        o.left.nonmatches = NonMatches::Keep;
        o.right.nonmatches = NonMatches::Keep;
        o
    }

    pub fn with_multi(mut self, multi: Multi) -> Self {
        self.left.multi = multi;
        self.right.multi = multi;
        self
    }

    pub fn with_groupby(mut self, groupby: GroupBy) -> Self {
        self.groupby = groupby;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Opt into the rayon-backed parallel left-probe once `|L|` clears
    /// `EngineConfig::parallel_probe_threshold`.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_cardinality_left(mut self, cardinality: Cardinality) -> Self {
        self.left.cardinality = cardinality;
        self
    }

    pub fn with_cardinality_right(mut self, cardinality: Cardinality) -> Self {
        self.right.cardinality = cardinality;
        self
    }

    /// Reject a `multi != all` side paired with `nonmatches = keep` on the
    /// opposite side: a reduced side can silently swallow the match that
    /// would have kept the other side's element off the non-match list.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.left.multi != Multi::All && self.right.nonmatches == NonMatches::Keep {
            return Err(ConfigurationError::MultiNonmatchConflict {
                multi_side: Side::Left,
                multi: multi_name(self.left.multi),
                other_side: Side::Right,
                nonmatches: "keep",
            });
        }
        if self.right.multi != Multi::All && self.left.nonmatches == NonMatches::Keep {
            return Err(ConfigurationError::MultiNonmatchConflict {
                multi_side: Side::Right,
                multi: multi_name(self.right.multi),
                other_side: Side::Left,
                nonmatches: "keep",
            });
        }
        Ok(())
    }
}

fn multi_name(m: Multi) -> &'static str {
    match m {
        Multi::All => "all",
        Multi::First => "first",
        Multi::Last => "last",
        Multi::Closest => "closest",
    }
}
