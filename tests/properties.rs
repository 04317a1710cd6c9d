use gatekeep::matcher::all_matches;
use gatekeep::{best_match, conflict, facts, AttributeSchema, Decision, RuleGenerator, RuleSet};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn grown_rule_set(seed: u64, cycles: u32) -> (AttributeSchema, RuleSet) {
    let schema = AttributeSchema::mask_checkpoint();
    let generator = RuleGenerator::default();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut rules = RuleSet::new();
    for difficulty in 1..=cycles {
        if let Ok(generated) = generator.generate(&schema, difficulty, rules.rules(), &mut rng) {
            rules
                .try_insert(generated.rule)
                .expect("generator output must be accepted by the set");
        }
    }
    (schema, rules)
}

proptest! {
    /// Property: exceptions are strictly more specific than their source
    #[test]
    fn prop_exception_more_specific(seed in any::<u64>(), difficulty in 0u32..10) {
        let schema = AttributeSchema::mask_checkpoint();
        let generator = RuleGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let source = generator.random_deny(&schema, difficulty, &mut rng);
        prop_assert!(source.specificity() >= 1);
        if let Some(derived) = generator.derive_exception(&schema, &source, &mut rng) {
            prop_assert!(derived.specificity() > source.specificity());
            prop_assert_eq!(derived.decision(), Decision::Allow);
            for (i, v) in source.constrained() {
                prop_assert_eq!(derived.constraint(i), Some(v));
            }
        } else {
            prop_assert_eq!(source.specificity(), schema.len());
        }
    }

    /// Property: generated rule sets never hold a conflicting pair
    #[test]
    fn prop_rule_set_conflict_free(seed in any::<u64>(), cycles in 1u32..24) {
        let (_, rules) = grown_rule_set(seed, cycles);
        let rules = rules.rules();
        for (i, a) in rules.iter().enumerate() {
            prop_assert!(!a.is_wildcard());
            for b in &rules[i + 1..] {
                prop_assert!(!conflict::conflicts(a, std::slice::from_ref(b)));
            }
        }
    }

    /// Property: the matcher picks the first rule of maximal specificity
    #[test]
    fn prop_best_match_first_of_most_specific(seed in any::<u64>(), cycles in 1u32..24) {
        let (schema, rules) = grown_rule_set(seed, cycles);
        let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x5eed);

        for _ in 0..16 {
            let entity = facts::random_facts(&schema, &mut rng);
            let first = best_match(&entity, rules.rules()).map(|m| m.id);
            let second = best_match(&entity, rules.rules()).map(|m| m.id);
            prop_assert_eq!(first, second);

            let matches: Vec<_> = all_matches(&entity, rules.rules()).collect();
            let expected = matches
                .iter()
                .map(|m| m.specificity())
                .max()
                .and_then(|top| matches.iter().find(|m| m.specificity() == top))
                .map(|m| m.id);
            prop_assert_eq!(first, expected);
            prop_assert_eq!(first.is_none(), matches.is_empty());
        }
    }
}
