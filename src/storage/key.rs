//! Key types used to address stores and indexes
//!
//! Keys follow the ordering rules of an IndexedDB-style store:
//! Number < String < Array, arrays compared element by element.
//! Booleans, nulls and objects are not valid keys.

use std::fmt;
use std::ops::Bound;

use serde_json::Value;

/// An indexable key value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexValue {
    /// Number (f64 stored as order-preserving bits)
    Number(u64),
    /// String value
    String(String),
    /// Compound key
    Array(Vec<IndexValue>),
}

impl IndexValue {
    /// Create a key from a float.
    ///
    /// Uses bit representation for total ordering.
    pub fn from_f64(v: f64) -> Self {
        let bits = v.to_bits();
        let ordered = if (bits >> 63) == 1 {
            !bits
        } else {
            bits ^ (1 << 63)
        };
        IndexValue::Number(ordered)
    }

    /// Create a key from an integer
    pub fn from_int(v: i64) -> Self {
        Self::from_f64(v as f64)
    }

    /// Create a key from a string
    pub fn from_string(v: impl Into<String>) -> Self {
        IndexValue::String(v.into())
    }

    /// Create a compound key
    pub fn from_array(parts: impl IntoIterator<Item = IndexValue>) -> Self {
        IndexValue::Array(parts.into_iter().collect())
    }

    /// Create a key from a stored JSON value.
    ///
    /// Returns None for values that cannot be used as keys.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(Self::from_f64),
            Value::String(s) => Some(Self::from_string(s.as_str())),
            Value::Array(items) => items
                .iter()
                .map(Self::from_json)
                .collect::<Option<Vec<_>>>()
                .map(IndexValue::Array),
            Value::Null | Value::Bool(_) | Value::Object(_) => None,
        }
    }

    /// Decodes a numeric key back into its float value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            IndexValue::Number(ordered) => {
                let bits = if (ordered >> 63) == 1 {
                    ordered ^ (1 << 63)
                } else {
                    !ordered
                };
                Some(f64::from_bits(bits))
            }
            _ => None,
        }
    }

    /// Returns the string content of a string key
    pub fn as_str(&self) -> Option<&str> {
        match self {
            IndexValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for IndexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexValue::Number(_) => write!(f, "{}", self.as_f64().unwrap_or(f64::NAN)),
            IndexValue::String(s) => write!(f, "{:?}", s),
            IndexValue::Array(parts) => {
                write!(f, "[")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", part)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Conversion of in-memory field values into their indexable representation.
///
/// Implemented for the scalar types a store can index directly. Fields whose
/// stored form differs (dates, enums) supply an explicit mapper instead.
pub trait ToIndexValue {
    fn to_index_value(&self) -> IndexValue;
}

impl ToIndexValue for String {
    fn to_index_value(&self) -> IndexValue {
        IndexValue::from_string(self.as_str())
    }
}

impl ToIndexValue for &str {
    fn to_index_value(&self) -> IndexValue {
        IndexValue::from_string(*self)
    }
}

impl ToIndexValue for i64 {
    fn to_index_value(&self) -> IndexValue {
        IndexValue::from_int(*self)
    }
}

impl ToIndexValue for i32 {
    fn to_index_value(&self) -> IndexValue {
        IndexValue::from_int(i64::from(*self))
    }
}

impl ToIndexValue for f64 {
    fn to_index_value(&self) -> IndexValue {
        IndexValue::from_f64(*self)
    }
}

impl ToIndexValue for IndexValue {
    fn to_index_value(&self) -> IndexValue {
        self.clone()
    }
}

/// Key range over an index or a store's primary key. All bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRange {
    /// Exact match on a single key
    Only(IndexValue),
    /// Keys in [lower, upper]
    Bound {
        lower: IndexValue,
        upper: IndexValue,
    },
    /// Keys >= lower
    LowerBound(IndexValue),
    /// Keys <= upper
    UpperBound(IndexValue),
}

impl KeyRange {
    pub fn only(key: IndexValue) -> Self {
        KeyRange::Only(key)
    }

    pub fn bound(lower: IndexValue, upper: IndexValue) -> Self {
        KeyRange::Bound { lower, upper }
    }

    pub fn lower_bound(lower: IndexValue) -> Self {
        KeyRange::LowerBound(lower)
    }

    pub fn upper_bound(upper: IndexValue) -> Self {
        KeyRange::UpperBound(upper)
    }

    /// Lower bound for BTree range scans
    pub fn lower(&self) -> Bound<&IndexValue> {
        match self {
            KeyRange::Only(k) => Bound::Included(k),
            KeyRange::Bound { lower, .. } => Bound::Included(lower),
            KeyRange::LowerBound(lower) => Bound::Included(lower),
            KeyRange::UpperBound(_) => Bound::Unbounded,
        }
    }

    /// Upper bound for BTree range scans
    pub fn upper(&self) -> Bound<&IndexValue> {
        match self {
            KeyRange::Only(k) => Bound::Included(k),
            KeyRange::Bound { upper, .. } => Bound::Included(upper),
            KeyRange::UpperBound(upper) => Bound::Included(upper),
            KeyRange::LowerBound(_) => Bound::Unbounded,
        }
    }

    /// Returns true if the key falls inside the range
    pub fn contains(&self, key: &IndexValue) -> bool {
        let above = match self.lower() {
            Bound::Included(lower) => key >= lower,
            Bound::Excluded(lower) => key > lower,
            Bound::Unbounded => true,
        };
        let below = match self.upper() {
            Bound::Included(upper) => key <= upper,
            Bound::Excluded(upper) => key < upper,
            Bound::Unbounded => true,
        };
        above && below
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyRange::Only(k) => write!(f, "= {}", k),
            KeyRange::Bound { lower, upper } => write!(f, "[{}, {}]", lower, upper),
            KeyRange::LowerBound(lower) => write!(f, "[{}, +inf)", lower),
            KeyRange::UpperBound(upper) => write!(f, "(-inf, {}]", upper),
        }
    }
}

/// Cursor direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending key order
    Next,
    /// Descending key order
    Prev,
}

impl Direction {
    pub fn from_reverse(reverse: bool) -> Self {
        if reverse {
            Direction::Prev
        } else {
            Direction::Next
        }
    }

    pub fn is_reverse(&self) -> bool {
        matches!(self, Direction::Prev)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Next => "next",
            Direction::Prev => "prev",
        }
    }
}
