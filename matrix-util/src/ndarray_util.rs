use crate::traits::*;
use ndarray::prelude::*;
use rand::Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;

impl SampleOps for Array2<f64> {
    type Mat = Self;
    type Scalar = f64;

    fn runif(dd: usize, nn: usize) -> Self::Mat {
        let rvec: Vec<f64> = (0..(dd * nn))
            .into_par_iter()
            .map_init(rand::rng, |rng, _| rng.random::<f64>())
            .collect();

        Array2::from_shape_vec((dd, nn), rvec).expect("runif: shape mismatch")
    }

    fn rnorm(dd: usize, nn: usize) -> Self::Mat {
        let rvec: Vec<f64> = (0..(dd * nn))
            .into_par_iter()
            .map_init(rand::rng, |rng, _| -> f64 { rng.sample(StandardNormal) })
            .collect();

        Array2::from_shape_vec((dd, nn), rvec).expect("rnorm: shape mismatch")
    }
}
