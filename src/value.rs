//! Attribute values that facts and rule constraints hold.
//!
//! Every attribute of an entity is one of three kinds: a label drawn from a
//! declared set (a color, an emotion), a bounded integer magnitude (a crack
//! count), or a flag. Values compare by plain equality; there is no implicit
//! coercion between kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single observed or constrained attribute value.
///
/// # Examples
///
/// ```
/// use gatekeep::AttributeValue;
///
/// let color = AttributeValue::label("Red");
/// let cracks = AttributeValue::Int(2);
/// let flag = AttributeValue::Bool(true);
///
/// assert!(color.is_label());
/// assert_eq!(cracks.as_int(), Some(2));
/// assert_eq!(flag.to_string(), "true");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    /// One label of a categorical domain.
    Label(String),
    /// A bounded integer magnitude.
    Int(i64),
    /// A yes/no flag.
    Bool(bool),
}

impl AttributeValue {
    /// Creates a label value.
    #[must_use]
    pub fn label(label: impl Into<String>) -> Self {
        Self::Label(label.into())
    }

    /// True for a label value.
    #[must_use]
    pub const fn is_label(&self) -> bool {
        matches!(self, Self::Label(_))
    }

    /// True for an integer value.
    #[must_use]
    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    /// True for a flag value.
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    /// The label, if this is one.
    #[must_use]
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Self::Label(v) => Some(v),
            _ => None,
        }
    }

    /// The integer, if this is one.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The flag, if this is one.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a human-readable kind name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Label(_) => "label",
            Self::Int(_) => "int",
            Self::Bool(_) => "bool",
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::Label(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::Label(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}
