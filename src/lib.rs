//! # Gatekeep - Checkpoint Rule Engine
//!
//! Gatekeep decides whether an entity at a checkpoint should be admitted. It
//! keeps an ordered, conflict-free set of admission rules, picks the most
//! specific matching rule for each entity, and grows the rule set as play
//! goes on, carving exceptions out of existing deny rules to keep things
//! coherent while they get harder.
//!
//! ## Core Concepts
//!
//! - **Facts**: the attribute values of the entity being judged
//! - **Rule**: a partial constraint over facts plus an Allow/Deny decision
//! - **Specificity**: how many attributes a rule constrains; higher wins
//! - **Conflict**: two rules the matcher could not tell apart that disagree
//! - **Session**: one game's rule set, progression and event subscribers
//!
//! ## Usage
//!
//! ```rust
//! use gatekeep::{AttributeSchema, EntityFacts, PlayerChoice, Rule, RuleSession};
//!
//! let schema = AttributeSchema::mask_checkpoint();
//! let seed_rule = Rule::builder(&schema).require("color", "Red").deny().build()?;
//!
//! let mut session = RuleSession::builder(schema.clone())
//!     .initial_rule(seed_rule)
//!     .seed(42)
//!     .build()?;
//!
//! let facts = EntityFacts::builder(&schema)
//!     .set("color", "Red")
//!     .set("cracks", 0_i64)
//!     .set("emotion", "Neutral")
//!     .build()?;
//!
//! let verdict = session.best_match(&facts).map(|m| m.decision());
//! assert_eq!(verdict, Some(gatekeep::Decision::Deny));
//!
//! let turn = session.judge_and_register(&facts, PlayerChoice::Reject);
//! assert!(turn.judgement.correct);
//! # Ok::<(), gatekeep::GateError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod error;
pub mod facts;
pub mod rule;
pub mod schema;
pub mod value;

// Engine
pub mod conflict;
pub mod generator;
pub mod matcher;
pub mod session;
pub mod verdict;

// Re-export primary types at crate root for convenience
pub use conflict::{ConflictKind, RuleConflict};
pub use error::{GateError, GateResult, GenerationError, ValidationError};
pub use facts::{EntityFacts, FactSource, FactsBuilder};
pub use generator::{ExceptionSource, GeneratedRule, GeneratorConfig, RuleGenerator, Strategy};
pub use matcher::{best_match, MatchReport, RuleMatch};
pub use rule::{Decision, Rule, RuleBuilder, RuleId, RuleSet};
pub use schema::{AttributeDomain, AttributeKind, AttributeSchema};
pub use session::{
    DecisionOutcome, EventStream, GameDefinition, RuleSession, SessionBuilder, SessionConfig,
    SessionEvent, SessionId, SessionStats, TurnOutcome,
};
pub use value::AttributeValue;
pub use verdict::{Judgement, NoMatchPolicy, PlayerChoice};
