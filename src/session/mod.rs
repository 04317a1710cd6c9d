//! Rule set controller.
//!
//! A [`RuleSession`] owns everything one game needs: the schema, the ordered
//! rule set, milestone progression, the seeded random source and event
//! subscribers. It is single-threaded; run one session per game
//! and never share one across concurrent games.
//!
//! The external loop drives it with two calls per judged entity:
//! [`RuleSession::best_match`] to learn what the rules say, then
//! [`RuleSession::register_decision`] once the player has acted.
//! [`RuleSession::judge_and_register`] does both.

/// Session configuration.
pub mod config;
/// Session event types and streams.
pub mod events;
/// Milestone counters.
pub mod progression;

use std::fmt;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn, Span};
use uuid::Uuid;

use crate::error::{GateResult, GenerationError, ValidationError};
use crate::facts::EntityFacts;
use crate::generator::{GeneratedRule, RuleGenerator};
use crate::matcher::{self, MatchReport, RuleMatch};
use crate::rule::{Rule, RuleId, RuleSet};
use crate::schema::AttributeSchema;
use crate::verdict::{self, Judgement, PlayerChoice};

pub use config::{GameDefinition, SessionConfig};
pub use events::{EventStream, SessionEvent};
pub use progression::Progression;

use events::EventHub;

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a new random session ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Running tally of judged entities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Entities judged.
    pub judged: u64,
    /// Correct calls.
    pub correct: u64,
    /// Wrong calls.
    pub mistakes: u64,
}

impl SessionStats {
    fn record(&mut self, was_correct: bool) {
        self.judged += 1;
        if was_correct {
            self.correct += 1;
        } else {
            self.mistakes += 1;
        }
    }
}

/// What a single [`RuleSession::register_decision`] call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionOutcome {
    /// The rule added at this milestone, if any.
    pub rule_added: Option<RuleId>,
    /// Events emitted by this call, in order.
    pub events: Vec<SessionEvent>,
}

impl DecisionOutcome {
    /// Returns true if this call filled the rule set.
    #[must_use]
    pub fn max_rules_reached(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, SessionEvent::MaxRulesReached { .. }))
    }
}

/// A judged entity and its effect on progression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// How the player's call was scored.
    pub judgement: Judgement,
    /// Progression changes it caused.
    pub outcome: DecisionOutcome,
}

/// Builder for [`RuleSession`].
#[derive(Debug)]
pub struct SessionBuilder {
    schema: AttributeSchema,
    config: SessionConfig,
    rng: Option<ChaCha8Rng>,
    initial_rule: Option<Rule>,
}

impl SessionBuilder {
    /// Starts a builder with the default config.
    #[must_use]
    pub fn new(schema: AttributeSchema) -> Self {
        Self {
            schema,
            config: SessionConfig::default(),
            rng: None,
            initial_rule: None,
        }
    }

    /// Sets the session config.
    #[must_use]
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Seeds the random source, making generation reproducible.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = Some(ChaCha8Rng::seed_from_u64(seed));
        self
    }

    /// Uses an already-positioned random source.
    #[must_use]
    pub fn rng(mut self, rng: ChaCha8Rng) -> Self {
        self.rng = Some(rng);
        self
    }

    /// Uses `rule` as the seed rule instead of generating one.
    ///
    /// The same rule is reused on every [`RuleSession::reset`].
    #[must_use]
    pub fn initial_rule(mut self, rule: Rule) -> Self {
        self.initial_rule = Some(rule);
        self
    }

    /// Validates everything and seeds the rule set.
    pub fn build(self) -> GateResult<RuleSession> {
        self.config.validate()?;
        let generator = RuleGenerator::new(self.config.generator.clone())?;

        let initial_rule = match self.initial_rule {
            Some(rule) => {
                let rule = Rule::new(&self.schema, rule.constraints().to_vec(), rule.decision())?;
                if rule.is_wildcard() {
                    return Err(ValidationError::WildcardRule.into());
                }
                Some(rule)
            }
            None => None,
        };

        let id = SessionId::new();
        let mut session = RuleSession {
            id,
            span: info_span!("session", id = %id),
            progression: Progression::new(&self.config),
            events: EventHub::new(self.config.event_buffer),
            rng: self.rng.unwrap_or_else(ChaCha8Rng::from_entropy),
            schema: self.schema,
            config: self.config,
            generator,
            rules: RuleSet::new(),
            initial_rule,
            stats: SessionStats::default(),
            full_announced: false,
        };
        session.seed_rules()?;
        Ok(session)
    }
}

/// Session-scoped owner of a rule set and its progression.
#[derive(Debug)]
pub struct RuleSession {
    id: SessionId,
    span: Span,
    schema: AttributeSchema,
    config: SessionConfig,
    generator: RuleGenerator,
    rules: RuleSet,
    progression: Progression,
    rng: ChaCha8Rng,
    events: EventHub,
    initial_rule: Option<Rule>,
    stats: SessionStats,
    full_announced: bool,
}

impl RuleSession {
    /// Starts a builder.
    #[must_use]
    pub fn builder(schema: AttributeSchema) -> SessionBuilder {
        SessionBuilder::new(schema)
    }

    /// Builds a session with an entropy-seeded random source.
    pub fn new(schema: AttributeSchema, config: SessionConfig) -> GateResult<Self> {
        SessionBuilder::new(schema).config(config).build()
    }

    /// Builds a reproducible session.
    pub fn with_seed(
        schema: AttributeSchema,
        config: SessionConfig,
        seed: u64,
    ) -> GateResult<Self> {
        SessionBuilder::new(schema).config(config).seed(seed).build()
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Attribute schema judged entities follow.
    #[must_use]
    pub const fn schema(&self) -> &AttributeSchema {
        &self.schema
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current rules in insertion order.
    #[must_use]
    pub const fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Milestone progression.
    #[must_use]
    pub const fn progression(&self) -> &Progression {
        &self.progression
    }

    /// Current difficulty.
    #[must_use]
    pub const fn difficulty(&self) -> u32 {
        self.progression.difficulty()
    }

    /// Judging tally since the last reset.
    #[must_use]
    pub const fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// True once the rule set has reached `max_rules`.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.rules.len() >= self.config.max_rules
    }

    /// Subscribes to this session's events.
    pub fn subscribe(&mut self) -> EventStream {
        self.events.subscribe()
    }

    /// The best matching rule for `facts`, or `None` if nothing matches.
    #[must_use]
    pub fn best_match(&self, facts: &EntityFacts) -> Option<RuleMatch<'_>> {
        matcher::best_match(facts, self.rules.rules())
    }

    /// Owned summary of [`Self::best_match`].
    #[must_use]
    pub fn match_report(&self, facts: &EntityFacts) -> Option<MatchReport> {
        self.best_match(facts).map(|m| m.report(&self.schema))
    }

    /// Scores the player's call on `facts`, then registers it.
    pub fn judge_and_register(&mut self, facts: &EntityFacts, choice: PlayerChoice) -> TurnOutcome {
        let policy = self.config.no_match_policy;
        let judgement = verdict::judge(choice, self.best_match(facts).as_ref(), policy);
        if !judgement.correct {
            let rule = judgement
                .rule_id
                .and_then(|id| self.rules.get(id))
                .map_or_else(
                    || format!("no matching rule (default {})", judgement.expected),
                    |r| r.describe(&self.schema),
                );
            let _enter = self.span.enter();
            warn!(rule = %rule, facts = %facts.describe(&self.schema), ?choice, "rule broken");
        }
        let outcome = self.register_decision(judgement.correct);
        TurnOutcome { judgement, outcome }
    }

    /// Advances progression by one judged entity.
    ///
    /// When the milestone is reached and the set is not full, the difficulty
    /// goes up and one new rule is generated. A failed generation is reported
    /// through [`SessionEvent::GenerationFailed`] and never stops the game.
    ///
    /// [`SessionEvent::MaxRulesReached`] is emitted exactly once per fill,
    /// including for a set that was already full when it was seeded.
    pub fn register_decision(&mut self, was_correct: bool) -> DecisionOutcome {
        let span = self.span.clone();
        let _enter = span.enter();

        self.stats.record(was_correct);
        let mut outcome = DecisionOutcome::default();
        let milestone = self.progression.record_entity();

        if self.is_full() {
            self.announce_full(&mut outcome);
        } else if milestone {
            let difficulty = self.progression.escalate();
            let generated = self.generator.generate(
                &self.schema,
                difficulty,
                self.rules.rules(),
                &mut self.rng,
            );

            match generated {
                Ok(generated) => self.accept(generated, difficulty, &mut outcome),
                Err(GenerationError::Exhausted { attempts, .. }) => {
                    self.fail(difficulty, attempts, &mut outcome);
                }
            }
        }

        for event in &outcome.events {
            self.events.publish(event);
        }
        outcome
    }

    /// Clears the rule set and reseeds it with exactly one rule.
    pub fn reset(&mut self) -> GateResult<()> {
        let span = self.span.clone();
        let _enter = span.enter();

        self.seed_rules()?;
        self.stats = SessionStats::default();
        let event = SessionEvent::RulesReset {
            rule_count: self.rules.len(),
        };
        self.events.publish(&event);
        info!(rules = self.rules.len(), "session reset");
        Ok(())
    }

    fn seed_rules(&mut self) -> GateResult<()> {
        self.progression = Progression::new(&self.config);
        self.full_announced = false;
        let rule = match &self.initial_rule {
            Some(rule) => rule.clone(),
            None => {
                self.generator
                    .generate(&self.schema, self.progression.difficulty(), &[], &mut self.rng)?
                    .rule
            }
        };
        debug!(rule = %rule.describe(&self.schema), "seeding rule set");
        self.rules.reset_with(rule);
        Ok(())
    }

    fn accept(&mut self, generated: GeneratedRule, difficulty: u32, outcome: &mut DecisionOutcome) {
        let description = generated.rule.describe(&self.schema);
        let decision = generated.rule.decision();
        let specificity = generated.rule.specificity();
        let attempts = generated.attempts;

        let rule_id = match self.rules.try_insert(generated.rule) {
            Ok(id) => id,
            Err(conflict) => {
                warn!(%conflict, "generated rule refused by rule set");
                self.fail(difficulty, attempts, outcome);
                return;
            }
        };

        self.progression.rule_added(self.config.cadence_step);
        info!(
            rule_id = %rule_id,
            difficulty,
            attempts,
            rule = %description,
            "rule added"
        );
        outcome.rule_added = Some(rule_id);
        outcome.events.push(SessionEvent::RuleAdded {
            rule_id,
            description,
            decision,
            specificity,
            difficulty,
            strategy: generated.strategy,
        });

        if self.is_full() {
            self.announce_full(outcome);
        }
    }

    fn announce_full(&mut self, outcome: &mut DecisionOutcome) {
        if self.full_announced {
            return;
        }
        self.full_announced = true;
        info!(rules = self.rules.len(), "maximum rule count reached");
        outcome.events.push(SessionEvent::MaxRulesReached {
            rule_count: self.rules.len(),
        });
    }

    fn fail(&mut self, difficulty: u32, attempts: u32, outcome: &mut DecisionOutcome) {
        warn!(difficulty, attempts, "no rule generated at milestone");
        self.progression
            .generation_failed(self.config.reset_counter_on_failure);
        outcome
            .events
            .push(SessionEvent::GenerationFailed { difficulty, attempts });
    }
}
