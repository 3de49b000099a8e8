use approx::assert_abs_diff_eq;
use factor_param::gamma::PARAM_FLOOR;
use factor_param::*;
use ndarray::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn moments_of_each_entity() {
    let mut activity = ScalarFactor::new("activity", 3, 3.0, 2.0);
    activity.update_shape_next_at(1, 1.0);
    activity.update_rate_next_at(2, 2.0);
    activity.swap();
    activity.compute_expectations();

    assert_abs_diff_eq!(
        *activity.expected_v(),
        arr1(&[1.5, 2.0, 0.75]),
        epsilon = 1e-12
    );
    // b / (a - 1)
    assert_abs_diff_eq!(
        *activity.expected_inv(),
        arr1(&[1.0, 2.0 / 3.0, 2.0]),
        epsilon = 1e-12
    );
    assert_abs_diff_eq!(activity.expected_mean(), 4.25 / 3.0, epsilon = 1e-12);
}

#[test]
fn empty_store_has_zero_mean() {
    let mut activity = ScalarFactor::new("activity", 0, 0.3, 0.3);
    activity.compute_expectations();
    assert_eq!(activity.expected_mean(), 0.0);
}

#[test]
fn vector_updates() {
    let mut popularity = ScalarFactor::new("popularity", 3, 1.0, 1.0);

    popularity.update_shape_next(&arr1(&[1.0, 2.0, 3.0]));
    popularity.update_shape_next_all(0.5);
    assert_eq!(*popularity.shape_next(), arr1(&[2.5, 3.5, 4.5]));

    popularity.update_rate_next(&arr1(&[1.0, 0.0, 1.0]));
    popularity.update_rate_next_scaled(&arr1(&[2.0, 2.0, 2.0]), 0.5);
    popularity.update_rate_next_weighted(3.0, &arr1(&[0.0, 1.0, 2.0]));
    assert_eq!(*popularity.rate_next(), arr1(&[3.0, 5.0, 9.0]));

    popularity.swap();
    assert_eq!(*popularity.shape_curr(), arr1(&[2.5, 3.5, 4.5]));
    assert_eq!(*popularity.shape_next(), arr1(&[1.0, 1.0, 1.0]));
    assert_eq!(*popularity.rate_next(), arr1(&[1.0, 1.0, 1.0]));
}

#[test]
fn zero_shape_is_floored() {
    let mut activity = ScalarFactor::new("activity", 2, 0.3, 1.0);
    activity.update_shape_next_at(0, -0.3);
    activity.swap();
    assert_eq!(activity.shape_curr()[0], 0.0);

    activity.compute_expectations();
    assert_eq!(activity.expected_v()[0], PARAM_FLOOR);
    assert!(activity.expected_logv()[0].is_finite());
    assert!(activity.compute_elbo_term().is_finite());
}

#[test]
#[should_panic]
fn negative_rate_is_fatal() {
    let mut activity = ScalarFactor::new("activity", 2, 0.3, 1.0);
    activity.update_rate_next_at(1, -2.0);
    activity.swap();
    activity.compute_expectations();
}

#[test]
fn elbo_is_zero_at_the_prior() {
    let mut activity = ScalarFactor::new("activity", 5, 0.3, 0.3);
    activity.set_to_prior_curr();
    activity.compute_expectations();
    assert_abs_diff_eq!(activity.compute_elbo_term(), 0.0, epsilon = 1e-9);

    activity.update_shape_next_all(2.0);
    activity.update_rate_next_at(0, 4.0);
    activity.swap();
    activity.compute_expectations();
    assert!(activity.compute_elbo_term() < 0.0);
}

#[test]
fn initialization_variants() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut activity = ScalarFactor::new("activity", 6, 0.3, 0.3);

    activity.initialize(1.0, &mut rng);
    assert!(activity.shape_curr().iter().all(|&a| (a - 0.3).abs() < 0.1));
    assert!(activity.rate_curr().iter().all(|&b| (b - 0.3).abs() < 0.1));
    assert_eq!(*activity.shape_next(), Array1::from_elem(6, 0.3));

    activity.initialize_with_shape_shift(2.0, 1.0, &mut rng);
    assert_abs_diff_eq!(*activity.shape_curr(), Array1::from_elem(6, 2.3), epsilon = 1e-12);
    assert!(activity.rate_curr().iter().all(|&b| (b / 0.3 - 1.0).abs() < 0.1));
}

#[test]
fn save_and_load_round_trip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let dir = dir.path().to_str().unwrap();

    let mut rng = StdRng::seed_from_u64(9);
    let mut activity = ScalarFactor::new("activity", 4, 0.3, 0.3);
    activity.initialize(1.0, &mut rng);
    activity.update_shape_next(&arr1(&[1.0, 0.0, 2.0, 0.0]));
    activity.swap();
    activity.compute_expectations();

    let ids: Vec<Box<str>> = vec!["a".into(), "b".into(), "c".into(), "d".into()];
    activity.save_state(Some(&ids[..]), dir)?;

    let mut restored = ScalarFactor::new("activity", 4, 0.3, 0.3);
    restored.load(dir)?;

    assert_abs_diff_eq!(*restored.shape_curr(), *activity.shape_curr(), epsilon = 1e-12);
    assert_abs_diff_eq!(*restored.rate_curr(), *activity.rate_curr(), epsilon = 1e-12);
    assert_abs_diff_eq!(*restored.expected_v(), *activity.expected_v(), epsilon = 1e-12);
    assert_abs_diff_eq!(*restored.expected_inv(), *activity.expected_inv(), epsilon = 1e-9);

    // topic-model initialization is not available for a vector
    restored.load_from_lda(dir, 1.0, 2)?;
    assert_abs_diff_eq!(*restored.expected_v(), *activity.expected_v(), epsilon = 1e-12);
    Ok(())
}
