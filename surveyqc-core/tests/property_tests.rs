//! Property tests for model and statistics invariants.
//!
//! Uses proptest to verify:
//! 1. `before` is a strict partial order on block ids
//! 2. Surveys without branches have exactly one path
//! 3. Smoothing gives every survey option a count of at least 1
//! 4. Fitted probabilities sum to 1 per question
//! 5. Classification is a pure function of (response, population, seed)

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use surveyqc_core::respondent::{ProfileRespondent, RespondentStrategy, UniformRespondent};
use surveyqc_core::survey::{BlockId, QuestionSpec, Survey, SurveyBuilder};
use surveyqc_core::{
    Classifier, ClassifyParams, FrequencyTable, PathEnumerator, ProbabilityTable, SurveyResponse,
};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_block_id() -> impl Strategy<Value = BlockId> {
    prop::collection::vec(1u32..4, 1..4).prop_map(BlockId::new)
}

/// (option counts per question, randomize flag per block, questions per block)
fn arb_layout() -> impl Strategy<Value = (Vec<usize>, Vec<bool>)> {
    (
        prop::collection::vec(2usize..5, 1..8),
        prop::collection::vec(any::<bool>(), 1..4),
    )
}

fn build_flat(option_counts: &[usize], randomize: &[bool]) -> Survey {
    let mut builder = SurveyBuilder::new("prop");
    let blocks: Vec<_> = randomize.iter().map(|&r| builder.add_block(r)).collect();
    for (i, &n) in option_counts.iter().enumerate() {
        let labels: Vec<String> = (0..n).map(|k| format!("o{k}")).collect();
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
        builder.add_question(&blocks[i % blocks.len()], QuestionSpec::radio(format!("Q{i}"), &labels));
    }
    builder.build().unwrap()
}

fn simulate(survey: &Survey, bots: usize, real: usize, seed: u64) -> Vec<SurveyResponse> {
    let mut rng = StdRng::seed_from_u64(seed);
    let profile = ProfileRespondent::new(survey, 0.75, &mut rng);
    let mut out = Vec::with_capacity(bots + real);
    for _ in 0..bots {
        out.push(UniformRespondent::new().respond(survey, &mut rng).unwrap());
    }
    for _ in 0..real {
        out.push(profile.respond(survey, &mut rng).unwrap());
    }
    out
}

// ── 1. Partial order ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn before_is_antisymmetric(a in arb_block_id(), b in arb_block_id()) {
        prop_assert!(!(a.before(&b) && b.before(&a)));
    }

    #[test]
    fn before_is_irreflexive(a in arb_block_id()) {
        prop_assert!(!a.before(&a));
    }

    #[test]
    fn before_is_transitive(a in arb_block_id(), b in arb_block_id(), c in arb_block_id()) {
        if a.before(&b) && b.before(&c) {
            prop_assert!(a.before(&c));
        }
    }
}

// ── 2. Branch-free surveys ───────────────────────────────────────────

proptest! {
    #[test]
    fn branch_free_survey_has_one_path((counts, randomize) in arb_layout()) {
        let survey = build_flat(&counts, &randomize);
        let paths = PathEnumerator::new(&survey).paths().unwrap();
        prop_assert_eq!(paths.len(), 1);

        let (fixed, random) = survey.partition_top_level();
        let expected: Vec<BlockId> = fixed
            .iter()
            .chain(random.iter())
            .map(|b| b.id.clone())
            .collect();
        prop_assert_eq!(paths[0].blocks(), expected.as_slice());
    }
}

// ── 3–4. Frequencies and probabilities ───────────────────────────────

proptest! {
    #[test]
    fn smoothing_covers_every_option(
        (counts, randomize) in arb_layout(),
        n in 1usize..20,
        seed in any::<u64>(),
    ) {
        let survey = build_flat(&counts, &randomize);
        let responses = simulate(&survey, n, 0, seed);
        let table = FrequencyTable::build(&responses, Some(&survey));
        for q in survey.questions() {
            for o in q.options.keys() {
                prop_assert!(table.count(&q.id, o) >= 1);
            }
        }
    }

    #[test]
    fn probabilities_sum_to_one(
        (counts, randomize) in arb_layout(),
        n in 1usize..20,
        smoothing in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let survey = build_flat(&counts, &randomize);
        let responses = simulate(&survey, n, n, seed);
        let probs = ProbabilityTable::fit(&responses, smoothing.then_some(&survey));
        for q in survey.questions() {
            let dist = probs.distribution(&q.id).unwrap();
            let total: f64 = dist.values().sum();
            prop_assert!((total - 1.0).abs() < 1e-9, "{} sums to {}", q.id, total);
        }
    }
}

// ── 5. Classifier determinism ────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn classification_is_deterministic(
        seed in any::<u64>(),
        target in 0usize..40,
        entropy in any::<bool>(),
    ) {
        let survey = build_flat(&[4, 4, 4, 4, 4], &[false]);
        let population = simulate(&survey, 15, 25, seed);
        let classifier = if entropy { Classifier::Entropy } else { Classifier::LogLikelihood };
        let params = ClassifyParams { seed, ..ClassifyParams::default() };

        let first = classifier.classify(&population[target], &population, &survey, &params).unwrap();
        let second = classifier.classify(&population[target], &population, &survey, &params).unwrap();
        prop_assert_eq!(first, second);
    }
}
