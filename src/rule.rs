//! Admission rules.
//!
//! A [`Rule`] is a partial predicate over an entity's facts plus a
//! [`Decision`]. For every schema attribute it either constrains the value
//! (`Some(v)`) or leaves it open (`None`). The number of constrained
//! attributes is the rule's specificity; the matcher prefers more specific
//! rules.
//!
//! Rules are immutable once built. A [`RuleSet`] only ever grows (or is
//! reseeded wholesale on reset), and refuses rules that conflict with one it
//! already holds.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::conflict::{self, RuleConflict};
use crate::error::ValidationError;
use crate::facts::EntityFacts;
use crate::schema::AttributeSchema;
use crate::value::AttributeValue;

/// What a rule says should happen to an entity it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Admit the entity.
    Allow,
    /// Turn the entity away.
    Deny,
}

impl Decision {
    /// The other decision.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Allow => Self::Deny,
            Self::Deny => Self::Allow,
        }
    }

    /// Returns true for [`Decision::Allow`].
    #[must_use]
    pub const fn is_allow(self) -> bool {
        matches!(self, Self::Allow)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "Allow"),
            Self::Deny => write!(f, "Deny"),
        }
    }
}

/// Position of a rule inside its [`RuleSet`].
///
/// Ids are insertion indices, so they are stable for the lifetime of a set
/// and reproducible across seeded runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(usize);

impl RuleId {
    /// Wraps a set index.
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// The set index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A partial constraint over facts plus a decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    constraints: Vec<Option<AttributeValue>>,
    decision: Decision,
}

impl Rule {
    /// Builds a rule from per-attribute constraints in schema order.
    ///
    /// Every constrained value must lie in its attribute's domain. A rule with
    /// no constraints at all is a wildcard: it matches everything with
    /// specificity 0.
    pub fn new(
        schema: &AttributeSchema,
        constraints: Vec<Option<AttributeValue>>,
        decision: Decision,
    ) -> Result<Self, ValidationError> {
        if constraints.len() != schema.len() {
            return Err(ValidationError::ArityMismatch {
                expected: schema.len(),
                actual: constraints.len(),
            });
        }
        for (i, c) in constraints.iter().enumerate() {
            if let Some(v) = c {
                schema.check_value(i, v)?;
            }
        }
        Ok(Self {
            constraints,
            decision,
        })
    }

    /// Constructs a rule whose values are already known to be in-domain.
    pub(crate) fn from_parts(constraints: Vec<Option<AttributeValue>>, decision: Decision) -> Self {
        Self {
            constraints,
            decision,
        }
    }

    /// A rule over `arity` attributes that constrains nothing.
    #[must_use]
    pub fn wildcard(arity: usize, decision: Decision) -> Self {
        Self::from_parts(vec![None; arity], decision)
    }

    /// Starts a name-keyed builder.
    #[must_use]
    pub fn builder(schema: &AttributeSchema) -> RuleBuilder<'_> {
        RuleBuilder::new(schema)
    }

    /// The rule's decision.
    #[must_use]
    pub const fn decision(&self) -> Decision {
        self.decision
    }

    /// Per-attribute constraints in schema order.
    #[must_use]
    pub fn constraints(&self) -> &[Option<AttributeValue>] {
        &self.constraints
    }

    /// The constraint on attribute `index`, if any.
    #[must_use]
    pub fn constraint(&self, index: usize) -> Option<&AttributeValue> {
        self.constraints.get(index).and_then(Option::as_ref)
    }

    /// Returns true if attribute `index` is constrained.
    #[must_use]
    pub fn is_constrained(&self, index: usize) -> bool {
        self.constraint(index).is_some()
    }

    /// Iterates over `(attribute index, required value)` pairs.
    pub fn constrained(&self) -> impl Iterator<Item = (usize, &AttributeValue)> + '_ {
        self.constraints
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|v| (i, v)))
    }

    /// Number of constrained attributes.
    #[must_use]
    pub fn specificity(&self) -> usize {
        self.constraints.iter().filter(|c| c.is_some()).count()
    }

    /// Returns true if the rule constrains nothing.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.specificity() == 0
    }

    /// Returns true if every constrained attribute equals the fact value.
    #[must_use]
    pub fn matches(&self, facts: &EntityFacts) -> bool {
        self.constrained().all(|(i, v)| facts.get(i) == Some(v))
    }

    /// Same constrained attributes with the same values.
    #[must_use]
    pub fn same_constraints(&self, other: &Self) -> bool {
        self.constraints == other.constraints
    }

    /// No attribute is constrained by both rules to different values.
    ///
    /// Overlapping rules can match a common entity.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.constraints
            .iter()
            .zip(&other.constraints)
            .all(|pair| match pair {
                (Some(a), Some(b)) => a == b,
                _ => true,
            })
    }

    /// Human-readable form, e.g. `Deny [color=Red, cracks=any, emotion=any]`.
    #[must_use]
    pub fn describe(&self, schema: &AttributeSchema) -> String {
        let parts: Vec<String> = schema
            .iter()
            .zip(&self.constraints)
            .map(|(attr, c)| match c {
                Some(v) => format!("{}={v}", attr.name()),
                None => format!("{}=any", attr.name()),
            })
            .collect();
        format!("{} [{}]", self.decision, parts.join(", "))
    }
}

/// Builder for [`Rule`] that constrains attributes by name.
#[derive(Debug)]
pub struct RuleBuilder<'s> {
    schema: &'s AttributeSchema,
    constraints: Vec<Option<AttributeValue>>,
    decision: Option<Decision>,
    error: Option<ValidationError>,
}

impl<'s> RuleBuilder<'s> {
    /// Creates a builder with every attribute unconstrained.
    #[must_use]
    pub fn new(schema: &'s AttributeSchema) -> Self {
        Self {
            schema,
            constraints: vec![None; schema.len()],
            decision: None,
            error: None,
        }
    }

    /// Requires attribute `name` to equal `value`.
    #[must_use]
    pub fn require(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.schema.require(name) {
            Ok(i) => self.constraints[i] = Some(value.into()),
            Err(e) => self.error = Some(e),
        }
        self
    }

    /// Sets the decision.
    #[must_use]
    pub fn decision(mut self, decision: Decision) -> Self {
        self.decision = Some(decision);
        self
    }

    /// Shorthand for `decision(Decision::Allow)`.
    #[must_use]
    pub fn allow(self) -> Self {
        self.decision(Decision::Allow)
    }

    /// Shorthand for `decision(Decision::Deny)`.
    #[must_use]
    pub fn deny(self) -> Self {
        self.decision(Decision::Deny)
    }

    /// Validates and builds the rule.
    pub fn build(self) -> Result<Rule, ValidationError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let decision = self.decision.ok_or_else(|| ValidationError::MissingField {
            field: "decision".to_string(),
        })?;
        Rule::new(self.schema, self.constraints, decision)
    }
}

/// An ordered, append-only, conflict-free collection of rules.
///
/// Insertion order is preserved and doubles as the matcher's tie-break
/// order: among equally specific matches, the earliest rule wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `rule` unless it conflicts with a rule already in the set.
    pub fn try_insert(&mut self, rule: Rule) -> Result<RuleId, RuleConflict> {
        if let Some(found) = conflict::find_conflict(&rule, &self.rules) {
            return Err(found);
        }
        let id = RuleId::from_index(self.rules.len());
        self.rules.push(rule);
        Ok(id)
    }

    /// Replaces the whole set with the single rule `rule`.
    pub(crate) fn reset_with(&mut self, rule: Rule) -> RuleId {
        self.rules.clear();
        self.rules.push(rule);
        RuleId::from_index(0)
    }

    /// The rule with the given id.
    #[must_use]
    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.index())
    }

    /// All rules in insertion order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Iterates over `(id, rule)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &Rule)> + '_ {
        self.rules
            .iter()
            .enumerate()
            .map(|(i, r)| (RuleId::from_index(i), r))
    }

    /// Iterates over the deny rules in insertion order.
    pub fn deny_rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> + '_ {
        self.iter().filter(|(_, r)| r.decision() == Decision::Deny)
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if the set holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> AttributeSchema {
        AttributeSchema::mask_checkpoint()
    }

    fn red_deny(schema: &AttributeSchema) -> Rule {
        Rule::builder(schema).require("color", "Red").deny().build().unwrap()
    }

    #[test]
    fn test_specificity_counts_constraints() {
        let schema = schema();
        assert_eq!(Rule::wildcard(schema.len(), Decision::Allow).specificity(), 0);
        assert_eq!(red_deny(&schema).specificity(), 1);

        let rule = Rule::builder(&schema)
            .require("color", "Red")
            .require("cracks", 0_i64)
            .allow()
            .build()
            .unwrap();
        assert_eq!(rule.specificity(), 2);
        assert_eq!(rule.constrained().map(|(i, _)| i).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_wildcard_matches_everything() {
        let schema = schema();
        let facts = EntityFacts::builder(&schema)
            .set("color", "Blue")
            .set("cracks", 3_i64)
            .set("emotion", "Fear")
            .build()
            .unwrap();
        assert!(Rule::wildcard(schema.len(), Decision::Deny).matches(&facts));
    }

    #[test]
    fn test_matches_checks_only_constrained() {
        let schema = schema();
        let rule = red_deny(&schema);
        let red = EntityFacts::builder(&schema)
            .set("color", "Red")
            .set("cracks", 2_i64)
            .set("emotion", "Sad")
            .build()
            .unwrap();
        let blue = EntityFacts::builder(&schema)
            .set("color", "Blue")
            .set("cracks", 2_i64)
            .set("emotion", "Sad")
            .build()
            .unwrap();
        assert!(rule.matches(&red));
        assert!(!rule.matches(&blue));
    }

    #[test]
    fn test_builder_requires_decision_and_domain() {
        let schema = schema();
        let missing = Rule::builder(&schema).require("color", "Red").build();
        assert!(matches!(missing, Err(ValidationError::MissingField { .. })));

        let bad = Rule::builder(&schema).require("color", "Purple").deny().build();
        assert!(matches!(bad, Err(ValidationError::ValueOutOfDomain { .. })));
    }

    #[test]
    fn test_overlaps() {
        let schema = schema();
        let red = red_deny(&schema);
        let red_cracked = Rule::builder(&schema)
            .require("color", "Red")
            .require("cracks", 1_i64)
            .allow()
            .build()
            .unwrap();
        let blue = Rule::builder(&schema).require("color", "Blue").allow().build().unwrap();
        let happy = Rule::builder(&schema).require("emotion", "Happy").allow().build().unwrap();

        assert!(red.overlaps(&red_cracked));
        assert!(!red.overlaps(&blue));
        assert!(red.overlaps(&happy));
    }

    #[test]
    fn test_describe() {
        let schema = schema();
        assert_eq!(
            red_deny(&schema).describe(&schema),
            "Deny [color=Red, cracks=any, emotion=any]"
        );
    }

    #[test]
    fn test_rule_set_rejects_contradiction() {
        let schema = schema();
        let mut set = RuleSet::new();
        let id = set.try_insert(red_deny(&schema)).unwrap();
        assert_eq!(id, RuleId::from_index(0));

        let contradiction = Rule::builder(&schema).require("color", "Red").allow().build().unwrap();
        let err = set.try_insert(contradiction).unwrap_err();
        assert_eq!(err.existing, id);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_rule_set_order_and_deny_filter() {
        let schema = schema();
        let mut set = RuleSet::new();
        set.try_insert(red_deny(&schema)).unwrap();
        set.try_insert(
            Rule::builder(&schema)
                .require("color", "Red")
                .require("cracks", 0_i64)
                .allow()
                .build()
                .unwrap(),
        )
        .unwrap();
        set.try_insert(Rule::builder(&schema).require("emotion", "Angry").deny().build().unwrap())
            .unwrap();

        let denies: Vec<RuleId> = set.deny_rules().map(|(id, _)| id).collect();
        assert_eq!(denies, vec![RuleId::from_index(0), RuleId::from_index(2)]);
    }

    #[test]
    fn test_reset_with_leaves_single_rule() {
        let schema = schema();
        let mut set = RuleSet::new();
        set.try_insert(red_deny(&schema)).unwrap();
        set.try_insert(Rule::builder(&schema).require("emotion", "Sad").deny().build().unwrap())
            .unwrap();

        let seed = Rule::builder(&schema).require("cracks", 2_i64).deny().build().unwrap();
        assert_eq!(set.reset_with(seed.clone()), RuleId::from_index(0));
        assert_eq!(set.rules(), std::slice::from_ref(&seed));
    }

    #[test]
    fn test_decision_helpers() {
        assert_eq!(Decision::Allow.opposite(), Decision::Deny);
        assert!(Decision::Allow.is_allow());
        assert_eq!(serde_json::to_string(&Decision::Deny).unwrap(), "\"deny\"");
    }
}
