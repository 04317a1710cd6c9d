//! Judging a player's call against the rule set.
//!
//! The player either admits or rejects the entity on display. The call is
//! correct when it agrees with the best matching rule's decision; when no
//! rule matches, the session's [`NoMatchPolicy`] supplies the expected
//! decision instead.

use serde::{Deserialize, Serialize};

use crate::matcher::RuleMatch;
use crate::rule::{Decision, RuleId};

/// The player's action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerChoice {
    /// Let the entity through.
    Admit,
    /// Turn the entity away.
    Reject,
}

impl PlayerChoice {
    /// The decision this choice enacts.
    #[must_use]
    pub const fn as_decision(self) -> Decision {
        match self {
            Self::Admit => Decision::Allow,
            Self::Reject => Decision::Deny,
        }
    }
}

/// What to expect from the player when no rule matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoMatchPolicy {
    /// Unmatched entities should be admitted.
    #[default]
    DefaultAllow,
    /// Unmatched entities should be rejected.
    DefaultDeny,
}

impl NoMatchPolicy {
    /// The expected decision for an unmatched entity.
    #[must_use]
    pub const fn decision(self) -> Decision {
        match self {
            Self::DefaultAllow => Decision::Allow,
            Self::DefaultDeny => Decision::Deny,
        }
    }
}

/// Outcome of judging one player choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgement {
    /// What the player did.
    pub choice: PlayerChoice,
    /// What the rules called for.
    pub expected: Decision,
    /// The rule that decided, or `None` when the no-match default applied.
    pub rule_id: Option<RuleId>,
    /// Whether the player agreed with the rules.
    pub correct: bool,
}

impl Judgement {
    /// True when no rule matched and the policy default was used.
    #[must_use]
    pub const fn defaulted(&self) -> bool {
        self.rule_id.is_none()
    }
}

/// Judges `choice` against the best match for the entity.
#[must_use]
pub fn judge(
    choice: PlayerChoice,
    best: Option<&RuleMatch<'_>>,
    policy: NoMatchPolicy,
) -> Judgement {
    let (expected, rule_id) = match best {
        Some(m) => (m.decision(), Some(m.id)),
        None => (policy.decision(), None),
    };
    Judgement {
        choice,
        expected,
        rule_id,
        correct: choice.as_decision() == expected,
    }
}
