//! Entity facts.
//!
//! [`EntityFacts`] is an immutable snapshot of one judged entity's attribute
//! values, positional over an [`AttributeSchema`]. Facts are validated when
//! built, so the matcher never sees an out-of-domain value.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::schema::AttributeSchema;
use crate::value::AttributeValue;

/// Observed attribute values of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityFacts {
    values: Vec<AttributeValue>,
}

impl EntityFacts {
    /// Builds facts from values listed in schema order.
    pub fn new(
        schema: &AttributeSchema,
        values: Vec<AttributeValue>,
    ) -> Result<Self, ValidationError> {
        if values.len() != schema.len() {
            return Err(ValidationError::ArityMismatch {
                expected: schema.len(),
                actual: values.len(),
            });
        }
        for (i, value) in values.iter().enumerate() {
            schema.check_value(i, value)?;
        }
        Ok(Self { values })
    }

    /// Starts a name-keyed builder.
    #[must_use]
    pub fn builder(schema: &AttributeSchema) -> FactsBuilder<'_> {
        FactsBuilder::new(schema)
    }

    /// Value of the attribute at position `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&AttributeValue> {
        self.values.get(index)
    }

    /// Value of the attribute called `name`.
    #[must_use]
    pub fn value(&self, schema: &AttributeSchema, name: &str) -> Option<&AttributeValue> {
        schema.index_of(name).and_then(|i| self.values.get(i))
    }

    /// All values in schema order.
    #[must_use]
    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True only for facts over an empty schema, which cannot be built.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Renders the facts as `name=value` pairs.
    #[must_use]
    pub fn describe(&self, schema: &AttributeSchema) -> String {
        schema
            .iter()
            .zip(&self.values)
            .map(|(attr, v)| format!("{}={v}", attr.name()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Builder for [`EntityFacts`] that sets attributes by name.
///
/// Every attribute of the schema must be set exactly once; errors are
/// reported by [`FactsBuilder::build`].
#[derive(Debug)]
pub struct FactsBuilder<'s> {
    schema: &'s AttributeSchema,
    values: Vec<Option<AttributeValue>>,
    error: Option<ValidationError>,
}

impl<'s> FactsBuilder<'s> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new(schema: &'s AttributeSchema) -> Self {
        Self {
            schema,
            values: vec![None; schema.len()],
            error: None,
        }
    }

    /// Sets the attribute called `name`.
    #[must_use]
    pub fn set(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.schema.require(name) {
            Ok(i) => self.values[i] = Some(value.into()),
            Err(e) => self.error = Some(e),
        }
        self
    }

    /// Validates and builds the facts.
    pub fn build(self) -> Result<EntityFacts, ValidationError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let mut values = Vec::with_capacity(self.values.len());
        for (i, slot) in self.values.into_iter().enumerate() {
            let Some(v) = slot else {
                let field = self
                    .schema
                    .get(i)
                    .map_or_else(|| format!("#{i}"), |a| a.name().to_string());
                return Err(ValidationError::MissingField { field });
            };
            values.push(v);
        }
        EntityFacts::new(self.schema, values)
    }
}

/// Anything that can report the attribute tuple of the entity on display.
///
/// Implemented by the presentation layer's prop type; the engine only reads
/// the tuple and never owns the source object.
pub trait FactSource {
    /// Reads the current attribute values.
    fn facts(&self, schema: &AttributeSchema) -> Result<EntityFacts, ValidationError>;
}

impl FactSource for EntityFacts {
    fn facts(&self, schema: &AttributeSchema) -> Result<EntityFacts, ValidationError> {
        Self::new(schema, self.values.clone())
    }
}

/// Draws an entity uniformly at random over every attribute domain.
pub fn random_facts<R: Rng + ?Sized>(schema: &AttributeSchema, rng: &mut R) -> EntityFacts {
    EntityFacts {
        values: schema.iter().filter_map(|attr| attr.sample(&mut *rng)).collect(),
    }
}
