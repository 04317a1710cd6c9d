use std::time::Instant;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use gatekeep::{
    best_match, facts, AttributeSchema, RuleGenerator, RuleSession, RuleSet, SessionConfig,
};

fn make_rule_set(target: usize) -> (AttributeSchema, RuleSet) {
    let schema = AttributeSchema::mask_checkpoint();
    let generator = RuleGenerator::default();
    let mut rng = ChaCha8Rng::seed_from_u64(0xbe7c);
    let mut rules = RuleSet::new();

    // Seed a realistic late-game rule set.
    let mut difficulty = 1;
    while rules.len() < target && difficulty < 200 {
        if let Ok(generated) = generator.generate(&schema, difficulty, rules.rules(), &mut rng) {
            let _ = rules.try_insert(generated.rule);
        }
        difficulty += 1;
    }
    (schema, rules)
}

fn bench_best_match(c: &mut Criterion) {
    let (schema, rules) = make_rule_set(24);
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let entities: Vec<_> = (0..256).map(|_| facts::random_facts(&schema, &mut rng)).collect();

    let mut group = c.benchmark_group("matcher");
    group.throughput(Throughput::Elements(entities.len() as u64));
    group.bench_function("best_match_24_rules", |b| {
        b.iter(|| {
            for entity in &entities {
                black_box(best_match(entity, rules.rules()));
            }
        });
    });
    group.finish();
}

fn bench_generate(c: &mut Criterion) {
    let (schema, rules) = make_rule_set(12);
    let generator = RuleGenerator::default();

    let mut group = c.benchmark_group("generator");
    group.throughput(Throughput::Elements(1));
    group.bench_function("generate_against_12_rules", |b| {
        b.iter_custom(|iters| {
            let mut rng = ChaCha8Rng::seed_from_u64(iters);
            let start = Instant::now();
            for _ in 0..iters {
                let _ = black_box(generator.generate(&schema, 5, rules.rules(), &mut rng));
            }
            start.elapsed()
        });
    });
    group.finish();
}

fn bench_session_turns(c: &mut Criterion) {
    c.bench_function("session/register_decision", |b| {
        b.iter_custom(|iters| {
            // Fresh session per sample so rule growth does not leak between samples.
            let config = SessionConfig {
                entities_per_rule: 3,
                max_rules: 16,
                ..SessionConfig::default()
            };
            let Ok(mut session) =
                RuleSession::with_seed(AttributeSchema::mask_checkpoint(), config, iters)
            else {
                return std::time::Duration::ZERO;
            };

            let start = Instant::now();
            for i in 0..iters {
                black_box(session.register_decision(i % 7 != 0));
            }
            start.elapsed()
        });
    });
}

criterion_group!(engine, bench_best_match, bench_generate, bench_session_turns);
criterion_main!(engine);
