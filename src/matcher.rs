//! Rule matching.
//!
//! The matcher picks the most specific rule that matches an entity. Ties on
//! specificity go to the rule inserted first: the scan only replaces the
//! current best on a strictly higher score.

use serde::{Deserialize, Serialize};

use crate::facts::EntityFacts;
use crate::rule::{Decision, Rule, RuleId};
use crate::schema::AttributeSchema;

/// The winning rule for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch<'a> {
    /// Position of the rule in its set.
    pub id: RuleId,
    /// The rule itself.
    pub rule: &'a Rule,
}

impl RuleMatch<'_> {
    /// The winning rule's decision.
    #[must_use]
    pub const fn decision(&self) -> Decision {
        self.rule.decision()
    }

    /// The winning rule's specificity.
    #[must_use]
    pub fn specificity(&self) -> usize {
        self.rule.specificity()
    }

    /// Owned summary for display and scoring.
    #[must_use]
    pub fn report(&self, schema: &AttributeSchema) -> MatchReport {
        MatchReport {
            rule_id: self.id,
            decision: self.decision(),
            specificity: self.specificity(),
            constrained_attributes: self
                .rule
                .constrained()
                .filter_map(|(i, _)| schema.get(i).map(|a| a.name().to_string()))
                .collect(),
            description: self.rule.describe(schema),
        }
    }
}

/// Serializable view of a [`RuleMatch`].
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    pub rule_id: RuleId,
    pub decision: Decision,
    pub specificity: usize,
    pub constrained_attributes: Vec<String>,
    pub description: String,
}

/// Returns the best matching rule, or `None` if no rule matches.
///
/// `None` is a distinct outcome, not an implicit allow; callers apply their
/// own default policy.
#[must_use]
pub fn best_match<'a>(facts: &EntityFacts, rules: &'a [Rule]) -> Option<RuleMatch<'a>> {
    let mut best: Option<RuleMatch<'a>> = None;
    for (i, rule) in rules.iter().enumerate() {
        if !rule.matches(facts) {
            continue;
        }
        let improves = match &best {
            None => true,
            Some(current) => rule.specificity() > current.specificity(),
        };
        if improves {
            best = Some(RuleMatch {
                id: RuleId::from_index(i),
                rule,
            });
        }
    }
    best
}

/// Every matching rule, in set order.
pub fn all_matches<'a>(
    facts: &'a EntityFacts,
    rules: &'a [Rule],
) -> impl Iterator<Item = RuleMatch<'a>> + 'a {
    rules
        .iter()
        .enumerate()
        .filter(move |(_, rule)| rule.matches(facts))
        .map(|(i, rule)| RuleMatch {
            id: RuleId::from_index(i),
            rule,
        })
}
