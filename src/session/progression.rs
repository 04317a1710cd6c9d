//! Milestone counters.
//!
//! Progression decides *when* a new rule is due. It never touches the rule
//! set; the session asks it after each judged entity and reports back
//! whether generation succeeded.

use serde::{Deserialize, Serialize};

use super::config::SessionConfig;

/// Difficulty and milestone cadence of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progression {
    difficulty: u32,
    entities_since_last_rule: u32,
    entities_required: u32,
}

impl Progression {
    /// Initial progression for `config`.
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            difficulty: config.starting_difficulty,
            entities_since_last_rule: 0,
            entities_required: config.entities_per_rule,
        }
    }

    /// Current difficulty. Never decreases within a session.
    #[must_use]
    pub const fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Entities judged since the last milestone.
    #[must_use]
    pub const fn entities_since_last_rule(&self) -> u32 {
        self.entities_since_last_rule
    }

    /// Entities needed to reach the next milestone.
    #[must_use]
    pub const fn entities_required(&self) -> u32 {
        self.entities_required
    }

    /// Counts one judged entity. Returns true once the milestone is reached.
    pub fn record_entity(&mut self) -> bool {
        self.entities_since_last_rule = self.entities_since_last_rule.saturating_add(1);
        self.milestone_reached()
    }

    /// Whether enough entities have been judged for a new rule.
    #[must_use]
    pub const fn milestone_reached(&self) -> bool {
        self.entities_since_last_rule >= self.entities_required
    }

    /// Raises the difficulty ahead of a generation attempt and returns it.
    pub fn escalate(&mut self) -> u32 {
        self.difficulty = self.difficulty.saturating_add(1);
        self.difficulty
    }

    /// A rule was added: restart the count and stretch the cadence.
    pub fn rule_added(&mut self, cadence_step: u32) {
        self.entities_since_last_rule = 0;
        self.entities_required = self.entities_required.saturating_add(cadence_step);
    }

    /// Generation failed at this milestone.
    pub fn generation_failed(&mut self, reset_counter: bool) {
        if reset_counter {
            self.entities_since_last_rule = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        SessionConfig {
            starting_difficulty: 2,
            entities_per_rule: 3,
            cadence_step: 2,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn test_milestone_after_cadence() {
        let mut p = Progression::new(&config());
        assert!(!p.record_entity());
        assert!(!p.record_entity());
        assert!(p.record_entity());
        assert_eq!(p.entities_since_last_rule(), 3);
    }

    #[test]
    fn test_rule_added_escalates_cadence() {
        let mut p = Progression::new(&config());
        assert_eq!(p.escalate(), 3);
        p.rule_added(2);
        assert_eq!(p.entities_since_last_rule(), 0);
        assert_eq!(p.entities_required(), 5);
        assert_eq!(p.difficulty(), 3);
    }

    #[test]
    fn test_generation_failed_reset_flag() {
        let mut p = Progression::new(&config());
        for _ in 0..3 {
            p.record_entity();
        }
        p.generation_failed(false);
        assert!(p.milestone_reached());
        p.generation_failed(true);
        assert_eq!(p.entities_since_last_rule(), 0);
        assert_eq!(p.entities_required(), 3);
    }
}
