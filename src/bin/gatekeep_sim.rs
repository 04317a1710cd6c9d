//! Gatekeep headless simulation
//!
//! Plays a checkpoint session against a simulated player and prints the rule
//! set as it grows.

use std::path::PathBuf;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gatekeep::{
    facts, Decision, FactSource, GameDefinition, PlayerChoice, RuleSession, SessionEvent,
};

/// Simulation configuration
struct Config {
    /// Seed for both the session and the simulated player
    seed: u64,
    /// Entities to judge
    entities: u32,
    /// Probability that the player makes the right call
    accuracy: f64,
    /// Optional game definition file
    definition: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed: 1,
            entities: 100,
            accuracy: 0.9,
            definition: None,
        }
    }
}

fn value_of<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(v) => v,
        None => {
            eprintln!("error: {flag} requires a value");
            std::process::exit(1);
        }
    }
}

fn parse_args() -> Config {
    let args: Vec<String> = std::env::args().collect();
    let mut config = Config::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" | "-s" => {
                let v = value_of(&args, i, "--seed");
                config.seed = v.parse().unwrap_or_else(|_| {
                    eprintln!("error: invalid seed: {v}");
                    std::process::exit(1);
                });
                i += 2;
            }
            "--entities" | "-n" => {
                let v = value_of(&args, i, "--entities");
                config.entities = v.parse().unwrap_or_else(|_| {
                    eprintln!("error: invalid entity count: {v}");
                    std::process::exit(1);
                });
                i += 2;
            }
            "--accuracy" | "-a" => {
                let v = value_of(&args, i, "--accuracy");
                config.accuracy = match v.parse::<f64>() {
                    Ok(p) if (0.0..=1.0).contains(&p) => p,
                    _ => {
                        eprintln!("error: accuracy must be a number in [0, 1]: {v}");
                        std::process::exit(1);
                    }
                };
                i += 2;
            }
            "--config" | "-c" => {
                config.definition = Some(PathBuf::from(value_of(&args, i, "--config")));
                i += 2;
            }
            "--help" | "-h" => {
                println!("gatekeep-sim - headless checkpoint session");
                println!();
                println!("USAGE:");
                println!("    gatekeep-sim [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -s, --seed <N>            Random seed [default: 1]");
                println!("    -n, --entities <N>        Entities to judge [default: 100]");
                println!("    -a, --accuracy <P>        Player accuracy in [0, 1] [default: 0.9]");
                println!("    -c, --config <FILE>       Game definition JSON (schema + session)");
                println!("    -h, --help                Print help information");
                std::process::exit(0);
            }
            arg => {
                eprintln!("error: unknown argument: {arg}");
                std::process::exit(1);
            }
        }
    }

    config
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = parse_args();
    let definition = match &config.definition {
        Some(path) => GameDefinition::from_json_file(path)?,
        None => GameDefinition::default(),
    };
    let schema = definition.schema.clone();

    let mut session = RuleSession::builder(definition.schema)
        .config(definition.session)
        .seed(config.seed)
        .build()?;
    let events = session.subscribe();
    let mut player = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(1));

    info!(session = %session.id(), seed = config.seed, "simulation started");
    println!("Gatekeep simulation v{}", env!("CARGO_PKG_VERSION"));
    for (id, rule) in session.rules().iter() {
        println!("  rule {id}: {}", rule.describe(&schema));
    }

    for _ in 0..config.entities {
        let spawned = facts::random_facts(&schema, &mut player);
        let observed = spawned.facts(&schema)?;

        let expected = session
            .best_match(&observed)
            .map_or(session.config().no_match_policy.decision(), |m| m.decision());
        let right = match expected {
            Decision::Allow => PlayerChoice::Admit,
            Decision::Deny => PlayerChoice::Reject,
        };
        let choice = if player.gen_bool(config.accuracy) {
            right
        } else {
            match right {
                PlayerChoice::Admit => PlayerChoice::Reject,
                PlayerChoice::Reject => PlayerChoice::Admit,
            }
        };
        session.judge_and_register(&observed, choice);

        for event in events.drain() {
            match event {
                SessionEvent::RuleAdded {
                    rule_id,
                    description,
                    ..
                } => println!("  rule {rule_id}: {description}"),
                SessionEvent::MaxRulesReached { rule_count } => {
                    println!("  rule set full ({rule_count} rules)");
                }
                SessionEvent::GenerationFailed { .. } | SessionEvent::RulesReset { .. } => {}
            }
        }
    }

    let stats = session.stats();
    println!();
    println!(
        "judged {} entities: {} correct, {} mistakes, difficulty {}",
        stats.judged,
        stats.correct,
        stats.mistakes,
        session.difficulty()
    );
    Ok(())
}
