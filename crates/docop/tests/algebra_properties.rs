mod common;

use common::generator::OpGenerator;
use common::{apply_all, identity};
use docop::{compose, invert, normalize, transform, validate};
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

    #[test]
    fn transformed_operations_converge(seed in any::<u64>()) {
        let mut generator = OpGenerator::new(seed);
        let document = generator.document();
        let client = generator.operation(&document);
        let server = generator.operation(&document);

        let (client_t, server_t) = transform(&client, &server)
            .map_err(|e| TestCaseError::fail(format!("transform failed: {e}")))?;
        prop_assert!(validate(&client_t).is_ok(), "client′ [{}] is malformed", client_t);
        prop_assert!(validate(&server_t).is_ok(), "server′ [{}] is malformed", server_t);

        let client_first = apply_all(&document, &[&client, &server_t]);
        let server_first = apply_all(&document, &[&server, &client_t]);
        prop_assert_eq!(client_first, server_first);
    }

    #[test]
    fn composition_matches_sequential_application(seed in any::<u64>()) {
        let mut generator = OpGenerator::new(seed);
        let document = generator.document();
        let first = generator.operation(&document);
        let after_first = apply_all(&document, &[&first]);
        let second = generator.operation(&after_first);

        let composed = compose(&first, &second)
            .map_err(|e| TestCaseError::fail(format!("compose failed: {e}")))?;
        prop_assert!(validate(&composed).is_ok(), "[{}] is malformed", composed);
        prop_assert_eq!(composed.initial_len(), first.initial_len());
        prop_assert_eq!(composed.resulting_len(), second.resulting_len());
        prop_assert_eq!(
            apply_all(&document, &[&composed]),
            apply_all(&document, &[&first, &second])
        );
    }

    #[test]
    fn composition_is_associative(seed in any::<u64>()) {
        let mut generator = OpGenerator::new(seed);
        let document = generator.document();
        let a = generator.operation(&document);
        let after_a = apply_all(&document, &[&a]);
        let b = generator.operation(&after_a);
        let after_b = apply_all(&after_a, &[&b]);
        let c = generator.operation(&after_b);

        let left = compose(&compose(&a, &b).unwrap(), &c).unwrap();
        let right = compose(&a, &compose(&b, &c).unwrap()).unwrap();
        prop_assert_eq!(apply_all(&document, &[&left]), apply_all(&document, &[&right]));
    }

    #[test]
    fn identity_is_neutral(seed in any::<u64>()) {
        let mut generator = OpGenerator::new(seed);
        let document = generator.document();
        let op = generator.operation(&document);

        let before = compose(&identity(op.initial_len()), &op).unwrap();
        let after = compose(&op, &identity(op.resulting_len())).unwrap();
        prop_assert_eq!(&before, &normalize(&op));
        prop_assert_eq!(&after, &normalize(&op));
    }

    #[test]
    fn inverse_restores_the_document(seed in any::<u64>()) {
        let mut generator = OpGenerator::new(seed);
        let document = generator.document();
        let op = generator.operation(&document);
        let inverse = invert(&op);

        prop_assert_eq!(inverse.initial_len(), op.resulting_len());
        prop_assert_eq!(inverse.resulting_len(), op.initial_len());
        prop_assert_eq!(&invert(&inverse), &op);
        prop_assert_eq!(apply_all(&document, &[&op, &inverse]), document.clone());

        let round_trip = compose(&op, &inverse).unwrap();
        prop_assert_eq!(apply_all(&document, &[&round_trip]), document);
    }

    #[test]
    fn normalization_is_idempotent(seed in any::<u64>()) {
        let mut generator = OpGenerator::new(seed);
        let document = generator.document();
        let op = generator.operation(&document);
        let normalized = normalize(&op);
        prop_assert_eq!(&normalize(&normalized), &normalized);
        prop_assert_eq!(
            apply_all(&document, &[&normalized]),
            apply_all(&document, &[&op])
        );
    }

    #[test]
    fn documents_survive_reinitialization(seed in any::<u64>()) {
        let mut generator = OpGenerator::new(seed);
        let document = generator.document();
        let op = generator.operation(&document);
        let edited = apply_all(&document, &[&op]);
        let rebuilt = docop::Document::from_initialization(&edited.to_initialization())
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(rebuilt, edited);
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

    #[test]
    fn annotated_operations_converge(seed in any::<u64>()) {
        let mut generator = OpGenerator::new(seed);
        let document = generator.annotated_document();
        let client = generator.annotated_operation(&document);
        let server = generator.annotated_operation(&document);

        let (client_t, server_t) = transform(&client, &server)
            .map_err(|e| TestCaseError::fail(format!("transform failed: {e}")))?;
        prop_assert!(validate(&client_t).is_ok(), "client′ [{}] is malformed", client_t);
        prop_assert!(validate(&server_t).is_ok(), "server′ [{}] is malformed", server_t);

        let client_first = apply_all(&document, &[&client, &server_t]);
        let server_first = apply_all(&document, &[&server, &client_t]);
        prop_assert_eq!(client_first, server_first);
    }

    #[test]
    fn annotated_composition_matches_sequential_application(seed in any::<u64>()) {
        let mut generator = OpGenerator::new(seed);
        let document = generator.annotated_document();
        let first = generator.annotated_operation(&document);
        let after_first = apply_all(&document, &[&first]);
        let second = generator.annotated_operation(&after_first);

        let composed = compose(&first, &second)
            .map_err(|e| TestCaseError::fail(format!("compose failed: {e}")))?;
        prop_assert!(validate(&composed).is_ok(), "[{}] is malformed", composed);
        prop_assert_eq!(
            apply_all(&document, &[&composed]),
            apply_all(&document, &[&first, &second])
        );
    }

    #[test]
    fn annotated_composition_is_associative(seed in any::<u64>()) {
        let mut generator = OpGenerator::new(seed);
        let document = generator.annotated_document();
        let a = generator.annotated_operation(&document);
        let after_a = apply_all(&document, &[&a]);
        let b = generator.annotated_operation(&after_a);
        let after_b = apply_all(&after_a, &[&b]);
        let c = generator.annotated_operation(&after_b);

        let left = compose(&compose(&a, &b).unwrap(), &c).unwrap();
        let right = compose(&a, &compose(&b, &c).unwrap()).unwrap();
        prop_assert_eq!(apply_all(&document, &[&left]), apply_all(&document, &[&right]));
    }

    #[test]
    fn annotated_identity_leaves_the_effect_unchanged(seed in any::<u64>()) {
        let mut generator = OpGenerator::new(seed);
        let document = generator.annotated_document();
        let op = generator.annotated_operation(&document);
        let expected = apply_all(&document, &[&op]);

        let before = compose(&identity(op.initial_len()), &op).unwrap();
        let after = compose(&op, &identity(op.resulting_len())).unwrap();
        prop_assert_eq!(apply_all(&document, &[&before]), expected.clone());
        prop_assert_eq!(apply_all(&document, &[&after]), expected);
    }

    #[test]
    fn annotated_inverse_restores_the_document(seed in any::<u64>()) {
        let mut generator = OpGenerator::new(seed);
        let document = generator.annotated_document();
        let op = generator.annotated_operation(&document);
        let inverse = invert(&op);

        prop_assert_eq!(&invert(&inverse), &op);
        prop_assert_eq!(apply_all(&document, &[&op, &inverse]), document.clone());

        let round_trip = compose(&op, &inverse).unwrap();
        prop_assert_eq!(apply_all(&document, &[&round_trip]), document);
    }

    #[test]
    fn annotated_documents_survive_reinitialization(seed in any::<u64>()) {
        let mut generator = OpGenerator::new(seed);
        let document = generator.annotated_document();
        let op = generator.annotated_operation(&document);
        let edited = apply_all(&document, &[&op]);
        let normalized = normalize(&op);
        prop_assert_eq!(&normalize(&normalized), &normalized);

        let rebuilt = docop::Document::from_initialization(&edited.to_initialization())
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(rebuilt, edited);
    }
}
