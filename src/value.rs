//! Value model consumed by accessors.
//!
//! Trimmed to the variants an accessor can reasonably project: join keys,
//! sort/range keys, and the endpoints of an interval. Floats carry a total
//! order via `ordered-float` so `Value` can key a `HashMap` and sit in a
//! sorted permutation.

use ordered_float::OrderedFloat;
use std::cmp::Ordering;

/// A value projected out of a record by an accessor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
    Bool(bool),
    Null,
}

impl Value {
    pub fn int(v: i64) -> Self {
        Value::Int(v)
    }

    pub fn float(v: f64) -> Self {
        Value::Float(OrderedFloat(v))
    }

    pub fn str(v: impl Into<String>) -> Self {
        Value::Str(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(OrderedFloat(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

/// A closed/open interval over `Value` endpoints, used by the set-relation
/// and `∋`/`∈` predicates.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    pub lo: Value,
    pub hi: Value,
    pub lo_closed: bool,
    pub hi_closed: bool,
}

impl Interval {
    pub fn closed(lo: impl Into<Value>, hi: impl Into<Value>) -> Self {
        Interval {
            lo: lo.into(),
            hi: hi.into(),
            lo_closed: true,
            hi_closed: true,
        }
    }

    pub fn open(lo: impl Into<Value>, hi: impl Into<Value>) -> Self {
        Interval {
            lo: lo.into(),
            hi: hi.into(),
            lo_closed: false,
            hi_closed: false,
        }
    }

    pub fn half_open(lo: impl Into<Value>, hi: impl Into<Value>) -> Self {
        Interval {
            lo: lo.into(),
            hi: hi.into(),
            lo_closed: true,
            hi_closed: false,
        }
    }

    /// Does this interval contain `point`, honoring open/closed endpoints?
    pub fn contains(&self, point: &Value) -> bool {
        let above_lo = match point.partial_cmp(&self.lo) {
            Some(Ordering::Greater) => true,
            Some(Ordering::Equal) => self.lo_closed,
            _ => false,
        };
        let below_hi = match point.partial_cmp(&self.hi) {
            Some(Ordering::Less) => true,
            Some(Ordering::Equal) => self.hi_closed,
            _ => false,
        };
        above_lo && below_hi
    }

    /// `self` ⊆ `other`.
    pub fn subset_eq(&self, other: &Interval) -> bool {
        let lo_ok = match self.lo.partial_cmp(&other.lo) {
            Some(Ordering::Greater) => true,
            Some(Ordering::Equal) => other.lo_closed || !self.lo_closed,
            _ => false,
        };
        let hi_ok = match self.hi.partial_cmp(&other.hi) {
            Some(Ordering::Less) => true,
            Some(Ordering::Equal) => other.hi_closed || !self.hi_closed,
            _ => false,
        };
        lo_ok && hi_ok
    }

    pub fn proper_subset(&self, other: &Interval) -> bool {
        self.subset_eq(other) && self != other
    }

    pub fn superset_eq(&self, other: &Interval) -> bool {
        other.subset_eq(self)
    }

    pub fn proper_superset(&self, other: &Interval) -> bool {
        other.proper_subset(self)
    }

    /// The two intervals share at least one point.
    pub fn not_disjoint(&self, other: &Interval) -> bool {
        let lo_le_hi = match self.lo.partial_cmp(&other.hi) {
            Some(Ordering::Less) => true,
            Some(Ordering::Equal) => self.lo_closed && other.hi_closed,
            _ => false,
        };
        let other_lo_le_hi = match other.lo.partial_cmp(&self.hi) {
            Some(Ordering::Less) => true,
            Some(Ordering::Equal) => other.lo_closed && self.hi_closed,
            _ => false,
        };
        lo_le_hi && other_lo_le_hi
    }
}

/// What an accessor projects: either a plain scalar (for `ByKey`/ordered
/// `ByPred`) or an interval (for the set-relation and `∋`/`∈` predicates).
#[derive(Debug, Clone, PartialEq)]
pub enum Projected {
    Scalar(Value),
    Interval(Interval),
}

impl Projected {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Projected::Scalar(v) => Some(v),
            Projected::Interval(_) => None,
        }
    }

    pub fn as_interval(&self) -> Option<&Interval> {
        match self {
            Projected::Interval(i) => Some(i),
            Projected::Scalar(_) => None,
        }
    }
}
