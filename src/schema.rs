//! Attribute schemas.
//!
//! A schema is the ordered list of attributes an entity exposes, each with an
//! explicit finite domain. Facts and rules are positional over the schema, so
//! attribute order is part of the schema's identity. Domains are enumerated in
//! declaration order; random draws are uniform over that order.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::value::AttributeValue;

/// Upper bound on the number of values a single integer range may span.
///
/// Domains are enumerated eagerly in places (describing, sampling), so the
/// span is kept small.
pub const MAX_RANGE_SPAN: i64 = 1 << 16;

/// The finite domain of one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeKind {
    /// A categorical attribute with an explicit ordered label list.
    Labels {
        /// Allowed labels, in declaration order.
        labels: Vec<String>,
    },
    /// An integer magnitude within `[min, max]` (inclusive).
    Range {
        /// Smallest allowed value.
        min: i64,
        /// Largest allowed value.
        max: i64,
    },
    /// A boolean flag (`false`, `true`).
    Flag,
}

/// A named attribute and its domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDomain {
    name: String,
    #[serde(flatten)]
    kind: AttributeKind,
}

impl AttributeDomain {
    /// Declares a categorical attribute.
    #[must_use]
    pub fn labels<I, S>(name: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind: AttributeKind::Labels {
                labels: labels.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Declares a bounded integer attribute.
    #[must_use]
    pub fn range(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Range { min, max },
        }
    }

    /// Declares a boolean attribute.
    #[must_use]
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Flag,
        }
    }

    /// The attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The attribute domain.
    #[must_use]
    pub const fn kind(&self) -> &AttributeKind {
        &self.kind
    }

    /// Number of distinct values in the domain.
    #[must_use]
    pub fn cardinality(&self) -> usize {
        match &self.kind {
            AttributeKind::Labels { labels } => labels.len(),
            AttributeKind::Range { min, max } => {
                usize::try_from(i128::from(*max) - i128::from(*min) + 1).unwrap_or(0)
            }
            AttributeKind::Flag => 2,
        }
    }

    /// Returns true if `value` belongs to this domain.
    #[must_use]
    pub fn contains(&self, value: &AttributeValue) -> bool {
        match (&self.kind, value) {
            (AttributeKind::Labels { labels }, AttributeValue::Label(v)) => {
                labels.iter().any(|l| l == v)
            }
            (AttributeKind::Range { min, max }, AttributeValue::Int(v)) => {
                (*min..=*max).contains(v)
            }
            (AttributeKind::Flag, AttributeValue::Bool(_)) => true,
            _ => false,
        }
    }

    /// Returns the `index`-th value of the domain in declaration order.
    #[must_use]
    pub fn value_at(&self, index: usize) -> Option<AttributeValue> {
        if index >= self.cardinality() {
            return None;
        }
        match &self.kind {
            AttributeKind::Labels { labels } => {
                labels.get(index).cloned().map(AttributeValue::Label)
            }
            AttributeKind::Range { min, .. } => {
                i64::try_from(index).ok().map(|i| AttributeValue::Int(min + i))
            }
            AttributeKind::Flag => Some(AttributeValue::Bool(index == 1)),
        }
    }

    /// Iterates over every value of the domain in declaration order.
    pub fn values(&self) -> impl Iterator<Item = AttributeValue> + '_ {
        (0..self.cardinality()).filter_map(|i| self.value_at(i))
    }

    /// Draws a value uniformly from the domain.
    ///
    /// The domain must be non-empty; schemas reject empty domains on
    /// construction.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<AttributeValue> {
        let n = self.cardinality();
        if n == 0 {
            return None;
        }
        self.value_at(rng.gen_range(0..n))
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyAttributeName);
        }
        match &self.kind {
            AttributeKind::Labels { labels } => {
                if labels.is_empty() {
                    return Err(ValidationError::EmptyDomain {
                        attribute: self.name.clone(),
                    });
                }
                for (i, label) in labels.iter().enumerate() {
                    if label.trim().is_empty() {
                        return Err(ValidationError::MissingField {
                            field: format!("{}.labels[{i}]", self.name),
                        });
                    }
                    if labels[..i].contains(label) {
                        return Err(ValidationError::ValueOutOfDomain {
                            attribute: self.name.clone(),
                            value: format!("duplicate label {label}"),
                        });
                    }
                }
            }
            AttributeKind::Range { min, max } => {
                let span = i128::from(*max) - i128::from(*min);
                if span < 0 || span >= i128::from(MAX_RANGE_SPAN) {
                    return Err(ValidationError::InvalidBounds {
                        attribute: self.name.clone(),
                        min: *min,
                        max: *max,
                    });
                }
            }
            AttributeKind::Flag => {}
        }
        Ok(())
    }
}

impl fmt::Display for AttributeDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            AttributeKind::Labels { labels } => {
                write!(f, "{} ∈ {{{}}}", self.name, labels.join(", "))
            }
            AttributeKind::Range { min, max } => write!(f, "{} ∈ [{min}, {max}]", self.name),
            AttributeKind::Flag => write!(f, "{} ∈ {{false, true}}", self.name),
        }
    }
}

/// The ordered attribute tuple every entity of a game exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<AttributeDomain>", into = "Vec<AttributeDomain>")]
pub struct AttributeSchema {
    attributes: Vec<AttributeDomain>,
}

impl AttributeSchema {
    /// Builds a schema, validating every domain.
    pub fn new(attributes: Vec<AttributeDomain>) -> Result<Self, ValidationError> {
        if attributes.is_empty() {
            return Err(ValidationError::EmptySchema);
        }
        for (i, attr) in attributes.iter().enumerate() {
            attr.validate()?;
            if attributes[..i].iter().any(|a| a.name == attr.name) {
                return Err(ValidationError::DuplicateAttribute {
                    attribute: attr.name.clone(),
                });
            }
        }
        Ok(Self { attributes })
    }

    /// The mask checkpoint vocabulary: color, crack count and emotion.
    #[must_use]
    pub fn mask_checkpoint() -> Self {
        Self {
            attributes: vec![
                AttributeDomain::labels("color", ["White", "Red", "Blue", "Green", "Black"]),
                AttributeDomain::range("cracks", 0, 3),
                AttributeDomain::labels(
                    "emotion",
                    ["Neutral", "Happy", "Sad", "Angry", "Fear", "Surprise"],
                ),
            ],
        }
    }

    /// Parses and validates a schema from its JSON form.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json).map_err(|e| ValidationError::Parse {
            message: e.to_string(),
        })
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Always false for a validated schema.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// The attribute at position `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&AttributeDomain> {
        self.attributes.get(index)
    }

    /// Position of the attribute called `name`.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    /// Like [`Self::index_of`], but reports unknown names as an error.
    pub fn require(&self, name: &str) -> Result<usize, ValidationError> {
        self.index_of(name).ok_or_else(|| ValidationError::UnknownAttribute {
            attribute: name.to_string(),
        })
    }

    /// Iterates over the attributes in order.
    pub fn iter(&self) -> std::slice::Iter<'_, AttributeDomain> {
        self.attributes.iter()
    }

    /// Checks that `value` belongs to the domain of attribute `index`.
    pub fn check_value(&self, index: usize, value: &AttributeValue) -> Result<(), ValidationError> {
        let attr = self.attributes.get(index).ok_or_else(|| ValidationError::UnknownAttribute {
            attribute: format!("#{index}"),
        })?;
        if attr.contains(value) {
            Ok(())
        } else {
            Err(ValidationError::ValueOutOfDomain {
                attribute: attr.name.clone(),
                value: value.to_string(),
            })
        }
    }
}

impl TryFrom<Vec<AttributeDomain>> for AttributeSchema {
    type Error = ValidationError;

    fn try_from(attributes: Vec<AttributeDomain>) -> Result<Self, Self::Error> {
        Self::new(attributes)
    }
}

impl From<AttributeSchema> for Vec<AttributeDomain> {
    fn from(schema: AttributeSchema) -> Self {
        schema.attributes
    }
}

impl<'a> IntoIterator for &'a AttributeSchema {
    type Item = &'a AttributeDomain;
    type IntoIter = std::slice::Iter<'a, AttributeDomain>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.iter()
    }
}
