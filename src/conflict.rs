//! Conflict detection between rules.
//!
//! Conflicts are explicit values, not hidden errors. Two rules conflict when
//! they disagree on the decision and the matcher could not tell them apart:
//!
//! - they constrain the same attributes to the same values, or
//! - they have equal specificity and can match a common entity.
//!
//! Overlapping rules of *different* specificity never conflict. The more
//! specific one simply wins, which is how exception rules override broader
//! deny rules.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rule::{Rule, RuleId};

/// Why two rules conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Identical constraints, opposite decisions.
    Contradiction,

    /// Equal specificity, overlapping constraints, opposite decisions.
    AmbiguousOverlap,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contradiction => write!(f, "contradiction"),
            Self::AmbiguousOverlap => write!(f, "ambiguous_overlap"),
        }
    }
}

/// A candidate rule's conflict with a rule already in a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleConflict {
    /// The existing rule the candidate clashes with.
    pub existing: RuleId,

    /// The type of conflict.
    pub kind: ConflictKind,
}

impl fmt::Display for RuleConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.existing)
    }
}

/// Classifies the conflict between two rules, if any.
///
/// Symmetric: `classify(a, b) == classify(b, a)`.
#[must_use]
pub fn classify(a: &Rule, b: &Rule) -> Option<ConflictKind> {
    if a.decision() == b.decision() {
        return None;
    }
    if a.same_constraints(b) {
        return Some(ConflictKind::Contradiction);
    }
    if a.specificity() == b.specificity() && a.overlaps(b) {
        return Some(ConflictKind::AmbiguousOverlap);
    }
    None
}

/// Finds the first rule in `existing` that `candidate` conflicts with.
#[must_use]
pub fn find_conflict(candidate: &Rule, existing: &[Rule]) -> Option<RuleConflict> {
    existing.iter().enumerate().find_map(|(i, rule)| {
        classify(candidate, rule).map(|kind| RuleConflict {
            existing: RuleId::from_index(i),
            kind,
        })
    })
}

/// Returns true if `candidate` conflicts with any rule in `existing`.
#[must_use]
pub fn conflicts(candidate: &Rule, existing: &[Rule]) -> bool {
    find_conflict(candidate, existing).is_some()
}
