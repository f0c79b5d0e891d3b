//! Tree value types
//!
//! The tree is ordered-tuple-agnostic: it stores any type implementing
//! [`TreeValue`], and the comparator is whatever `Ord` that type carries.
//! This module also ships [`Value`], a heterogeneous value with a cross-type
//! total order, suitable for datom-style tuples mixing numbers, strings,
//! keywords and nested tuples.

use std::cmp::Ordering;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Bound for types storable in the tree.
///
/// The `Ord` instance is the tree's comparator: it drives insertion order,
/// splitter selection, and range lookup. Serde bounds exist because nodes
/// round-trip through the codec when persisted.
pub trait TreeValue: Ord + Eq + Clone + fmt::Debug + Serialize + DeserializeOwned {}

impl<T> TreeValue for T where T: Ord + Eq + Clone + fmt::Debug + Serialize + DeserializeOwned {}

/// Heterogeneous value with a cross-type total order.
///
/// Type classes are ordered `Bool < numbers < Str < Keyword < Tuple`.
/// `Int` and `Float` form a single numeric class and compare numerically
/// against each other; on a numeric tie the `Int` orders first so the
/// ordering stays consistent with structural equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Keyword(String),
    Tuple(Vec<Value>),
}

impl Value {
    /// Build a keyword value (`:attr`-style identifiers)
    pub fn keyword(name: impl Into<String>) -> Self {
        Value::Keyword(name.into())
    }

    /// Build a tuple value
    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(items)
    }

    /// Rank of the type class, lowest first
    fn type_rank(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::Int(_) | Value::Float(_) => 1,
            Value::Str(_) => 2,
            Value::Keyword(_) => 3,
            Value::Tuple(_) => 4,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;
        match (self, other) {
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            // Floats order by total_cmp, so NaN and signed zero are totally
            // ordered and the comparator never panics.
            (Float(a), Float(b)) => a.total_cmp(b),
            (Int(a), Float(b)) => (*a as f64).total_cmp(b).then(Ordering::Less),
            (Float(a), Int(b)) => a.total_cmp(&(*b as f64)).then(Ordering::Greater),
            (Str(a), Str(b)) => a.cmp(b),
            (Keyword(a), Keyword(b)) => a.cmp(b),
            (Tuple(a), Tuple(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Keyword(k) => write!(f, ":{}", k),
            Value::Tuple(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}
