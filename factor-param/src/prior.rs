use ndarray::prelude::*;

/// Rate hyperparameter of a row-wise Gamma matrix
#[derive(Debug, Clone, PartialEq)]
pub enum RatePrior {
    /// the same rate `b0` everywhere
    Scalar(f64),
    /// a rate per column, shared by every row
    Vector(Array1<f64>),
    /// hierarchical: a rate per row, supplied by another factor
    /// together with its expected log; `next` is reset to `rate[n]`
    PerRow {
        base: Array1<f64>,
        rate: Array1<f64>,
        log_rate: Array1<f64>,
    },
    /// hierarchical, but the `next` rate was built directly from a
    /// scaled per-row value; `next` is still reset to the fixed
    /// column rate `base[k]`
    ScaledPerRow {
        base: Array1<f64>,
        rate: Array1<f64>,
        log_rate: Array1<f64>,
    },
}

impl RatePrior {
    pub fn is_hierarchical(&self) -> bool {
        matches!(
            self,
            RatePrior::PerRow { .. } | RatePrior::ScaledPerRow { .. }
        )
    }

    /// The fixed rate of column `k`, ignoring any per-row prior
    pub fn column_rate(&self, k: usize) -> f64 {
        match self {
            RatePrior::Scalar(b0) => *b0,
            RatePrior::Vector(b0) => b0[k],
            RatePrior::PerRow { base, .. } | RatePrior::ScaledPerRow { base, .. } => base[k],
        }
    }

    pub fn column_rates(&self, ncols: usize) -> Array1<f64> {
        (0..ncols).map(|k| self.column_rate(k)).collect()
    }

    /// per-row (rate, log rate) counted in the ELBO
    pub fn per_row(&self) -> Option<(&Array1<f64>, &Array1<f64>)> {
        match self {
            RatePrior::PerRow { rate, log_rate, .. }
            | RatePrior::ScaledPerRow { rate, log_rate, .. } => Some((rate, log_rate)),
            RatePrior::Scalar(_) | RatePrior::Vector(_) => None,
        }
    }

    /// Overwrite every cell of `rate` with the value `next` is reset to
    pub fn fill(&self, rate: &mut Array2<f64>) {
        match self {
            RatePrior::Scalar(b0) => rate.fill(*b0),
            RatePrior::Vector(b0)
            | RatePrior::ScaledPerRow { base: b0, .. } => {
                for mut row in rate.rows_mut() {
                    row.assign(b0);
                }
            }
            RatePrior::PerRow { rate: b0, .. } => {
                for (mut row, &b) in rate.rows_mut().into_iter().zip(b0.iter()) {
                    row.fill(b);
                }
            }
        }
    }
}
