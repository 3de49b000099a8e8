use approx::assert_abs_diff_eq;
use factor_param::*;
use ndarray::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn shared_rate_is_seen_by_every_row() {
    let mut beta = RowFactorMatrixSharedRate::new("beta", (3, 2), 1.0, 1.0);
    beta.update_shape_next_row(1, &arr1(&[1.0, 0.0]));
    beta.update_rate_next(&arr1(&[1.0, 3.0]));
    beta.swap();
    beta.compute_expectations();

    assert_eq!(*beta.rate_curr(), arr1(&[2.0, 4.0]));
    assert_abs_diff_eq!(
        *beta.expected_v(),
        arr2(&[[0.5, 0.25], [1.0, 0.25], [0.5, 0.25]]),
        epsilon = 1e-12
    );

    // fresh accumulator
    assert_eq!(*beta.rate_next(), arr1(&[1.0, 1.0]));
    assert_eq!(*beta.shape_next(), Array2::from_elem((3, 2), 1.0));
}

#[test]
fn elbo_is_zero_at_the_prior_and_negative_elsewhere() {
    let mut beta = RowFactorMatrixSharedRate::new("beta", (4, 3), 0.3, 0.3);
    beta.set_to_prior_curr();
    beta.compute_expectations();
    assert_abs_diff_eq!(beta.compute_elbo_term(), 0.0, epsilon = 1e-9);

    beta.update_shape_next_at(0, 2, 5.0);
    beta.update_rate_next(&arr1(&[0.0, 2.0, 0.5]));
    beta.swap();
    beta.compute_expectations();
    assert!(beta.compute_elbo_term() < 0.0);
}

#[test]
fn aggregates_and_curr_updates() {
    let mut beta = RowFactorMatrixSharedRate::new("beta", (2, 2), 1.0, 2.0);
    beta.update_shape_curr_row(0, &arr1(&[1.0, 3.0]));
    beta.update_rate_curr(&arr1(&[0.0, 2.0]));
    beta.compute_expectations();

    // E[v] = [[1, 1], [0.5, 0.25]]
    assert_abs_diff_eq!(beta.sum_rows(), arr1(&[1.5, 1.25]), epsilon = 1e-12);
    assert_abs_diff_eq!(
        beta.weighted_sum_rows(&arr1(&[0.0, 4.0])),
        arr1(&[2.0, 1.0]),
        epsilon = 1e-12
    );
    assert_abs_diff_eq!(beta.sum_cols(), arr1(&[2.0, 0.75]), epsilon = 1e-12);
}

#[test]
fn initialization_variants() {
    let mut rng = StdRng::seed_from_u64(11);
    let (a0, b0) = (0.3, 0.3);
    let mut beta = RowFactorMatrixSharedRate::new("beta", (5, 2), a0, b0);

    beta.initialize(1.0, &mut rng);
    assert!(beta.shape_curr().iter().all(|&a| (a - a0).abs() < 0.1));
    assert!(beta.rate_curr().iter().all(|&b| (b - b0).abs() < 0.1));
    assert_ne!(beta.rate_curr()[0], beta.rate_curr()[1]);

    beta.initialize_with_rate_shift(1.5, 1.0, &mut rng);
    assert_abs_diff_eq!(*beta.rate_curr(), arr1(&[1.8, 1.8]), epsilon = 1e-12);

    let shape = beta.shape_curr().clone();
    beta.initialize_expectations_at(2.0, 0.0, &mut rng);
    assert_abs_diff_eq!(*beta.expected_v(), shape.mapv(|a| a / 2.0), epsilon = 1e-12);

    beta.initialize_expectations(0.0, &mut rng);
    assert_abs_diff_eq!(*beta.expected_v(), shape.mapv(|a| a / b0), epsilon = 1e-12);
    assert_eq!(*beta.shape_curr(), shape);
}

#[test]
fn save_and_load_restores_expectations() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let dir = dir.path().to_str().unwrap();

    let mut rng = StdRng::seed_from_u64(3);
    let mut beta = RowFactorMatrixSharedRate::new("beta", (4, 3), 0.3, 0.3);
    beta.initialize(1.0, &mut rng);
    beta.update_shape_next_row(2, &arr1(&[1.0, 2.0, 3.0]));
    beta.swap();
    beta.compute_expectations();

    let ids: Vec<Box<str>> = (0..4).map(|i| format!("item{}", i).into()).collect();
    beta.save_state(Some(&ids[..]), dir)?;

    let mut restored = RowFactorMatrixSharedRate::new("beta", (4, 3), 0.3, 0.3);
    restored.load(dir)?;

    assert_abs_diff_eq!(*restored.shape_curr(), *beta.shape_curr(), epsilon = 1e-12);
    assert_abs_diff_eq!(*restored.rate_curr(), *beta.rate_curr(), epsilon = 1e-12);
    assert_abs_diff_eq!(*restored.expected_v(), *beta.expected_v(), epsilon = 1e-12);
    assert_abs_diff_eq!(
        *restored.expected_logv(),
        *beta.expected_logv(),
        epsilon = 1e-12
    );

    let mut wrong = RowFactorMatrixSharedRate::new("beta", (4, 2), 0.3, 0.3);
    assert!(wrong.load(dir).is_err());
    Ok(())
}

#[test]
fn load_from_lda_counts_by_column() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let dir = dir.path().to_str().unwrap();
    std::fs::create_dir_all(format!("{}/lda-fits", dir))?;
    // 2 topics x 3 items
    std::fs::write(
        format!("{}/lda-fits/beta-lda-k2.tsv", dir),
        "1\t0\t3\n2\t2\t0\n",
    )?;

    let mut beta = RowFactorMatrixSharedRate::new("beta", (3, 2), 0.3, 0.3);
    beta.load_from_lda(dir, 1.0, 2)?;

    assert_abs_diff_eq!(
        *beta.expected_v(),
        arr2(&[[2.0, 3.0], [1.0, 3.0], [4.0, 1.0]]) / 7.0,
        epsilon = 1e-12
    );
    // ψ(4) - ψ(7) = -(1/4 + 1/5 + 1/6)
    assert_abs_diff_eq!(
        beta.expected_logv()[[2, 0]],
        -(0.25 + 0.2 + 1.0 / 6.0),
        epsilon = 1e-9
    );
    Ok(())
}
