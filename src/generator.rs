//! Procedural rule generation.
//!
//! Each attempt builds one candidate rule with one of two strategies:
//!
//! - **Exception**: take an existing deny rule, keep all of its constraints,
//!   and add more until the candidate is strictly more specific. The result
//!   is an allow rule that overrides the deny rule on their overlap.
//! - **Random deny**: constrain each attribute with a probability that grows
//!   with difficulty, forcing at least one constraint.
//!
//! Candidates that conflict with (or duplicate) an existing rule are thrown
//! away and the generator tries again, up to a fixed attempt cap.

use rand::seq::IteratorRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::conflict;
use crate::error::{GenerationError, ValidationError};
use crate::rule::{Decision, Rule, RuleId};
use crate::schema::AttributeSchema;
use crate::value::AttributeValue;

/// Which deny rule an exception is carved out of.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionSource {
    /// The earliest deny rule in set order.
    #[default]
    FirstDeny,
    /// A deny rule chosen uniformly at random.
    RandomDeny,
}

/// Generator tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Candidates tried per call before giving up.
    pub max_attempts: u32,
    /// Chance that an attempt tries the exception strategy (needs a deny rule).
    pub exception_probability: f64,
    /// Rounds the exception strategy spends adding constraints.
    pub exception_growth_attempts: u32,
    /// Per-attribute constraint chance at difficulty 0.
    pub base_constraint_probability: f64,
    /// Added per-attribute constraint chance per difficulty level.
    pub constraint_probability_per_difficulty: f64,
    /// How the exception strategy picks its source rule.
    pub exception_source: ExceptionSource,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 50,
            exception_probability: 0.5,
            exception_growth_attempts: 16,
            base_constraint_probability: 0.25,
            constraint_probability_per_difficulty: 0.10,
            exception_source: ExceptionSource::FirstDeny,
        }
    }
}

impl GeneratorConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "generator.max_attempts must be > 0".to_string(),
            });
        }
        if self.exception_growth_attempts == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "generator.exception_growth_attempts must be > 0".to_string(),
            });
        }
        for (field, value) in [
            ("exception_probability", self.exception_probability),
            ("base_constraint_probability", self.base_constraint_probability),
            (
                "constraint_probability_per_difficulty",
                self.constraint_probability_per_difficulty,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::InvalidConfig {
                    reason: format!("generator.{field} must be within [0.0, 1.0], got {value}"),
                });
            }
        }
        Ok(())
    }

    /// Per-attribute constraint chance for the random-deny strategy.
    #[must_use]
    pub fn constraint_probability(&self, difficulty: u32) -> f64 {
        let p = self.base_constraint_probability
            + f64::from(difficulty) * self.constraint_probability_per_difficulty;
        p.clamp(0.0, 1.0)
    }
}

/// How a generated rule came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Strategy {
    /// Allow rule overriding the deny rule `source`.
    Exception {
        /// The deny rule the exception was derived from.
        source: RuleId,
    },
    /// Freshly drawn deny rule.
    RandomDeny,
}

/// A rule accepted by the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedRule {
    /// The new rule. It does not conflict with the rules it was checked against.
    pub rule: Rule,
    /// Strategy that produced it.
    pub strategy: Strategy,
    /// Candidates built, including the accepted one.
    pub attempts: u32,
}

/// Bounded-retry rule generator.
#[derive(Debug, Clone, Default)]
pub struct RuleGenerator {
    config: GeneratorConfig,
}

impl RuleGenerator {
    /// Creates a generator, validating its configuration.
    pub fn new(config: GeneratorConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The generator's configuration.
    #[must_use]
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generates a rule that conflicts with nothing in `existing`.
    ///
    /// `existing` must be the rules of one set, in insertion order.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        schema: &AttributeSchema,
        difficulty: u32,
        existing: &[Rule],
        rng: &mut R,
    ) -> Result<GeneratedRule, GenerationError> {
        let has_deny = existing.iter().any(|r| r.decision() == Decision::Deny);

        for attempt in 1..=self.config.max_attempts {
            let exception = if has_deny && rng.gen_bool(self.config.exception_probability) {
                self.pick_exception_source(existing, rng).and_then(|source| {
                    let rule = existing.get(source.index())?;
                    self.derive_exception(schema, rule, &mut *rng)
                        .map(|derived| (derived, Strategy::Exception { source }))
                })
            } else {
                None
            };
            let (candidate, strategy) = exception.unwrap_or_else(|| {
                (
                    self.random_deny(schema, difficulty, &mut *rng),
                    Strategy::RandomDeny,
                )
            });

            if let Some(found) = conflict::find_conflict(&candidate, existing) {
                debug!(attempt, conflict = %found, "candidate rejected");
                continue;
            }
            if existing.contains(&candidate) {
                debug!(attempt, "candidate duplicates an existing rule");
                continue;
            }
            return Ok(GeneratedRule {
                rule: candidate,
                strategy,
                attempts: attempt,
            });
        }

        Err(GenerationError::Exhausted {
            difficulty,
            attempts: self.config.max_attempts,
        })
    }

    /// Builds an allow rule strictly more specific than `source`.
    ///
    /// Returns `None` if `source` already constrains every attribute or the
    /// growth rounds run out before any constraint is added.
    pub fn derive_exception<R: Rng + ?Sized>(
        &self,
        schema: &AttributeSchema,
        source: &Rule,
        rng: &mut R,
    ) -> Option<Rule> {
        let target = source.specificity();
        if target >= schema.len() {
            return None;
        }
        let mut constraints: Vec<Option<AttributeValue>> = source.constraints().to_vec();
        let mut specificity = target;

        for _ in 0..self.config.exception_growth_attempts {
            for (slot, attr) in constraints.iter_mut().zip(schema) {
                if slot.is_none() && rng.gen_bool(0.5) {
                    *slot = attr.sample(rng);
                    specificity += usize::from(slot.is_some());
                }
            }
            if specificity > target {
                return Some(Rule::from_parts(constraints, Decision::Allow));
            }
        }
        None
    }

    /// Builds a deny rule with at least one constraint.
    pub fn random_deny<R: Rng + ?Sized>(
        &self,
        schema: &AttributeSchema,
        difficulty: u32,
        rng: &mut R,
    ) -> Rule {
        let p = self.config.constraint_probability(difficulty);
        let mut constraints: Vec<Option<AttributeValue>> = schema
            .iter()
            .map(|attr| if rng.gen_bool(p) { attr.sample(&mut *rng) } else { None })
            .collect();

        if constraints.iter().all(Option::is_none) && !schema.is_empty() {
            let forced = rng.gen_range(0..schema.len());
            constraints[forced] = schema.get(forced).and_then(|attr| attr.sample(rng));
        }
        Rule::from_parts(constraints, Decision::Deny)
    }

    fn pick_exception_source<R: Rng + ?Sized>(
        &self,
        existing: &[Rule],
        rng: &mut R,
    ) -> Option<RuleId> {
        let mut denies = existing
            .iter()
            .enumerate()
            .filter(|(_, r)| r.decision() == Decision::Deny)
            .map(|(i, _)| RuleId::from_index(i));
        match self.config.exception_source {
            ExceptionSource::FirstDeny => denies.next(),
            ExceptionSource::RandomDeny => denies.choose(rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn schema() -> AttributeSchema {
        AttributeSchema::mask_checkpoint()
    }

    fn red_deny(schema: &AttributeSchema) -> Rule {
        Rule::builder(schema).require("color", "Red").deny().build().unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        GeneratorConfig::default().validate().unwrap();
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let mut c = GeneratorConfig::default();
        c.max_attempts = 0;
        assert!(c.validate().is_err());

        let mut c = GeneratorConfig::default();
        c.exception_probability = 1.5;
        assert!(c.validate().is_err());

        let mut c = GeneratorConfig::default();
        c.base_constraint_probability = -0.1;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_constraint_probability_scales_and_clamps() {
        let c = GeneratorConfig::default();
        assert!((c.constraint_probability(0) - 0.25).abs() < 1e-9);
        assert!((c.constraint_probability(1) - 0.35).abs() < 1e-9);
        assert!((c.constraint_probability(50) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_random_deny_never_wildcard() {
        let schema = schema();
        let mut config = GeneratorConfig::default();
        config.base_constraint_probability = 0.0;
        config.constraint_probability_per_difficulty = 0.0;
        let generator = RuleGenerator::new(config).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        for _ in 0..32 {
            let rule = generator.random_deny(&schema, 1, &mut rng);
            assert_eq!(rule.specificity(), 1);
            assert_eq!(rule.decision(), Decision::Deny);
        }
    }

    #[test]
    fn test_derive_exception_is_more_specific() {
        let schema = schema();
        let generator = RuleGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let source = red_deny(&schema);

        for _ in 0..32 {
            let derived = generator.derive_exception(&schema, &source, &mut rng).unwrap();
            assert_eq!(derived.decision(), Decision::Allow);
            assert!(derived.specificity() > source.specificity());
            assert_eq!(derived.constraint(0), source.constraint(0));
        }
    }

    #[test]
    fn test_derive_exception_from_full_rule_fails() {
        let schema = schema();
        let generator = RuleGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let full = Rule::builder(&schema)
            .require("color", "Red")
            .require("cracks", 1_i64)
            .require("emotion", "Sad")
            .deny()
            .build()
            .unwrap();
        assert!(generator.derive_exception(&schema, &full, &mut rng).is_none());
    }

    #[test]
    fn test_generate_avoids_conflicts() {
        let schema = schema();
        let generator = RuleGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut rules = vec![red_deny(&schema)];

        for difficulty in 1..8 {
            if let Ok(generated) = generator.generate(&schema, difficulty, &rules, &mut rng) {
                assert!(!conflict::conflicts(&generated.rule, &rules));
                rules.push(generated.rule);
            }
        }
        assert!(rules.len() > 1);
    }

    #[test]
    fn test_always_exception_uses_first_deny() {
        let schema = schema();
        let mut config = GeneratorConfig::default();
        config.exception_probability = 1.0;
        let generator = RuleGenerator::new(config).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let rules = vec![
            Rule::builder(&schema)
                .require("cracks", 3_i64)
                .require("emotion", "Happy")
                .allow()
                .build()
                .unwrap(),
            red_deny(&schema),
        ];

        let generated = generator.generate(&schema, 1, &rules, &mut rng).unwrap();
        let Strategy::Exception { source } = generated.strategy else {
            panic!("expected exception strategy, got {:?}", generated.strategy);
        };
        assert_eq!(source, RuleId::from_index(1));
        assert!(generated.rule.specificity() > rules[1].specificity());
        assert_eq!(generated.rule.decision(), Decision::Allow);
    }

    #[test]
    fn test_random_deny_source_spreads_over_denies() {
        let schema = schema();
        let config = GeneratorConfig {
            exception_probability: 1.0,
            exception_source: ExceptionSource::RandomDeny,
            ..GeneratorConfig::default()
        };
        let generator = RuleGenerator::new(config).unwrap();
        let rules = vec![
            red_deny(&schema),
            Rule::builder(&schema)
                .require("cracks", 2_i64)
                .require("emotion", "Sad")
                .deny()
                .build()
                .unwrap(),
        ];

        let mut seen = [false; 2];
        for seed in 0..64 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let generated = generator.generate(&schema, 1, &rules, &mut rng).unwrap();
            let Strategy::Exception { source } = generated.strategy else {
                panic!("expected exception strategy, got {:?}", generated.strategy);
            };
            let source_rule = &rules[source.index()];
            assert!(generated.rule.specificity() > source_rule.specificity());
            assert_eq!(generated.rule.decision(), Decision::Allow);
            for (i, v) in source_rule.constrained() {
                assert_eq!(generated.rule.constraint(i), Some(v));
            }
            seen[source.index()] = true;
        }
        assert_eq!(seen, [true, true]);
    }

    #[test]
    fn test_generate_exhausts_on_saturated_schema() {
        // One flag attribute: only two specific rules exist, so once both
        // denies are present every candidate is a duplicate or a conflict.
        let schema =
            AttributeSchema::new(vec![crate::schema::AttributeDomain::flag("defect")]).unwrap();
        let generator = RuleGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let rules = vec![
            Rule::builder(&schema).require("defect", false).deny().build().unwrap(),
            Rule::builder(&schema).require("defect", true).deny().build().unwrap(),
        ];

        let err = generator.generate(&schema, 1, &rules, &mut rng).unwrap_err();
        assert_eq!(
            err,
            GenerationError::Exhausted {
                difficulty: 1,
                attempts: 50
            }
        );
    }

    #[test]
    fn test_generation_is_reproducible() {
        let schema = schema();
        let generator = RuleGenerator::default();
        let rules = vec![red_deny(&schema)];

        let mut a = ChaCha8Rng::seed_from_u64(42);
        let mut b = ChaCha8Rng::seed_from_u64(42);
        assert_eq!(
            generator.generate(&schema, 2, &rules, &mut a),
            generator.generate(&schema, 2, &rules, &mut b)
        );
    }
}
