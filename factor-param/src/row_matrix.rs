use crate::buffer::DoubleBuffer;
use crate::gamma::*;
use crate::io::*;
use crate::prior::RatePrior;
use crate::traits::*;

use anyhow::Context;
use log::info;
use matrix_util::traits::IoOps;
use ndarray::prelude::*;
use ndarray::{AsArray, Zip};
use rand::Rng;

/// Row-wise Gamma matrix
///
/// ```text
/// v[n,k] ~ Gamma(a0, b0[n,k])
/// q(v[n,k]) = Gamma(shape[n,k], rate[n,k])
/// ```
///
/// where the prior rate `b0` is either fixed (scalar or a vector
/// over columns) or, in the hierarchical model, a per-row rate
/// supplied by another factor (e.g., user activity).
#[derive(Debug, Clone)]
pub struct RowFactorMatrix {
    name: Box<str>,
    num_rows: usize,
    num_columns: usize,
    //////////////////////
    // hyper parameters //
    //////////////////////
    a0: f64,
    rate_prior: RatePrior,
    ///////////////////////////
    // variational posterior //
    ///////////////////////////
    shape: DoubleBuffer<Array2<f64>>,
    rate: DoubleBuffer<Array2<f64>>,
    //////////////////
    // expectations //
    //////////////////
    expected_v: Array2<f64>,
    expected_logv: Array2<f64>,
}

impl RowFactorMatrix {
    /// New row-wise Gamma matrix with a constant rate prior
    ///
    /// # Arguments
    /// * `name` - prefix of the files written by `save_state`
    /// * `dims` - (num of rows, num of columns)
    /// * `a0` - shape hyper parameter
    /// * `b0` - rate hyper parameter
    pub fn new(name: &str, dims: (usize, usize), a0: f64, b0: f64) -> Self {
        Self::with_prior(name, dims, a0, RatePrior::Scalar(b0))
    }

    /// New row-wise Gamma matrix with the column-specific rate prior
    /// `b0 * rate_scale[k]`
    pub fn with_rate_scale(
        name: &str,
        dims: (usize, usize),
        a0: f64,
        b0: f64,
        rate_scale: &Array1<f64>,
    ) -> Self {
        assert_eq!(
            rate_scale.len(),
            dims.1,
            "{}: rate scale should have one value per column",
            name
        );
        Self::with_prior(name, dims, a0, RatePrior::Vector(rate_scale * b0))
    }

    fn with_prior(name: &str, dims: (usize, usize), a0: f64, rate_prior: RatePrior) -> Self {
        let mut rate = Array2::zeros(dims);
        rate_prior.fill(&mut rate);

        Self {
            name: name.into(),
            num_rows: dims.0,
            num_columns: dims.1,
            a0,
            rate_prior,
            shape: DoubleBuffer::from_elem(Array2::from_elem(dims, a0)),
            rate: DoubleBuffer::from_elem(rate),
            expected_v: Array2::zeros(dims),
            expected_logv: Array2::zeros(dims),
        }
    }

    pub fn shape_curr(&self) -> &Array2<f64> {
        self.shape.curr()
    }

    pub fn shape_next(&self) -> &Array2<f64> {
        self.shape.next()
    }

    pub fn rate_curr(&self) -> &Array2<f64> {
        self.rate.curr()
    }

    pub fn rate_next(&self) -> &Array2<f64> {
        self.rate.next()
    }

    pub fn shape_prior(&self) -> f64 {
        self.a0
    }

    pub fn rate_prior(&self) -> &RatePrior {
        &self.rate_prior
    }

    /// Column means of the expected values
    pub fn expected_means(&self) -> Array1<f64> {
        self.expected_v
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(self.num_columns))
    }

    ////////////////////////
    // hierarchical prior //
    ////////////////////////

    /// Switch to a per-row rate prior
    ///
    /// * `ev` - E[rate of row n], also installed in `next`
    /// * `elogv` - E[ln rate of row n]
    pub fn set_prior_rate(&mut self, ev: &Array1<f64>, elogv: &Array1<f64>) {
        assert_eq!(ev.len(), self.num_rows, "{}: prior rate", self.name);
        assert_eq!(elogv.len(), self.num_rows, "{}: prior log rate", self.name);

        self.rate_prior = RatePrior::PerRow {
            base: self.rate_prior.column_rates(self.num_columns),
            rate: ev.clone(),
            log_rate: elogv.clone(),
        };
        self.rate_prior.fill(self.rate.next_mut());
    }

    /// Build the `next` rate directly as
    /// `rate[n,k] = factor * ev[n] * scale[k]`
    ///
    /// The stored per-row prior used by the ELBO is left as it is,
    /// but the matrix is hierarchical from now on. Without a per-row
    /// prior installed, later swaps still reset `next` to the fixed
    /// column rate and the ELBO reads a zero per-row prior.
    pub fn set_prior_rate_scaled(
        &mut self,
        ev: &Array1<f64>,
        scale: &Array1<f64>,
        factor: f64,
    ) {
        assert_eq!(ev.len(), self.num_rows, "{}: prior rate", self.name);
        assert_eq!(scale.len(), self.num_columns, "{}: rate scale", self.name);

        Zip::from(self.rate.next_mut().rows_mut())
            .and(ev)
            .for_each(|mut row, &ev_n| {
                Zip::from(&mut row)
                    .and(scale)
                    .for_each(|b, &s| *b = factor * ev_n * s);
            });

        if !self.rate_prior.is_hierarchical() {
            self.rate_prior = RatePrior::ScaledPerRow {
                base: self.rate_prior.column_rates(self.num_columns),
                rate: Array1::zeros(self.num_rows),
                log_rate: Array1::zeros(self.num_rows),
            };
        }
    }

    ////////////////////////
    // shape accumulation //
    ////////////////////////

    /// `shape_next[n,:] += sphi`
    pub fn update_shape_next_row<'a, V: AsArray<'a, f64>>(&mut self, n: usize, sphi: V) {
        let sphi: ArrayView1<f64> = sphi.into();
        assert_eq!(sphi.len(), self.num_columns, "{}: shape row", self.name);
        let mut row = self.shape.next_mut().row_mut(n);
        row += &sphi;
    }

    /// `shape_next[n,k] += v`
    pub fn update_shape_next_at(&mut self, n: usize, k: usize, v: f64) {
        self.shape.next_mut()[[n, k]] += v;
    }

    /// `shape_curr[n,:] += sphi`
    pub fn update_shape_curr_row<'a, V: AsArray<'a, f64>>(&mut self, n: usize, sphi: V) {
        let sphi: ArrayView1<f64> = sphi.into();
        assert_eq!(sphi.len(), self.num_columns, "{}: shape row", self.name);
        let mut row = self.shape.curr_mut().row_mut(n);
        row += &sphi;
    }

    ///////////////////////
    // rate accumulation //
    ///////////////////////

    /// `rate_next[n,:] += u`
    pub fn update_rate_next_row<'a, V: AsArray<'a, f64>>(&mut self, n: usize, u: V) {
        let u: ArrayView1<f64> = u.into();
        assert_eq!(u.len(), self.num_columns, "{}: rate row", self.name);
        let mut row = self.rate.next_mut().row_mut(n);
        row += &u;
    }

    /// `rate_next[n,:] += scale[n] * u` for every row `n`
    pub fn update_rate_next_row_scaled(&mut self, u: &Array1<f64>, scale: &Array1<f64>) {
        assert_eq!(u.len(), self.num_columns, "{}: rate update", self.name);
        assert_eq!(scale.len(), self.num_rows, "{}: row scale", self.name);
        Zip::from(self.rate.next_mut().rows_mut())
            .and(scale)
            .for_each(|mut row, &s| row.scaled_add(s, u));
    }

    /// `rate_next[n,:] += scale * u` for every row `n`
    pub fn update_rate_next_scaled(&mut self, u: &Array1<f64>, scale: f64) {
        assert_eq!(u.len(), self.num_columns, "{}: rate update", self.name);
        for mut row in self.rate.next_mut().rows_mut() {
            row.scaled_add(scale, u);
        }
    }

    /// `rate_next[:,k] += v`
    pub fn update_rate_next_col(&mut self, k: usize, v: f64) {
        let mut col = self.rate.next_mut().column_mut(k);
        col += v;
    }

    /// `rate_curr[n,:] += u` for every row `n`
    pub fn update_rate_curr(&mut self, u: &Array1<f64>) {
        assert_eq!(u.len(), self.num_columns, "{}: rate update", self.name);
        for mut row in self.rate.curr_mut().rows_mut() {
            row += u;
        }
    }

    /////////////////
    // aggregation //
    /////////////////

    /// Σ_n E[v[n,:]]
    pub fn sum_rows(&self) -> Array1<f64> {
        self.expected_v.sum_axis(Axis(0))
    }

    /// Σ_n w[n] E[v[n,:]], e.g., with the availability of each row
    pub fn weighted_sum_rows(&self, weights: &Array1<f64>) -> Array1<f64> {
        assert_eq!(weights.len(), self.num_rows, "{}: row weights", self.name);
        weights.dot(&self.expected_v)
    }

    /// Σ_k E[v[:,k]]
    pub fn sum_cols(&self) -> Array1<f64> {
        self.expected_v.sum_axis(Axis(1))
    }

    /// Σ_k w[k] E[v[:,k]]
    pub fn weighted_sum_cols(&self, weights: &Array1<f64>) -> Array1<f64> {
        assert_eq!(weights.len(), self.num_columns, "{}: column weights", self.name);
        self.expected_v.dot(weights)
    }

    ////////////////////
    // initialization //
    ////////////////////

    /// Start near the prior with multiplicative noise:
    ///
    /// ```text
    /// shape[n,k] = a0 * (1 + offset * 0.01 * z)
    /// rate[n,k]  = b0[k] * (1 + offset * 0.01 * z_k)
    /// ```
    ///
    /// with one rate draw per column, shared by all rows.
    pub fn initialize<R: Rng + ?Sized>(&mut self, offset: f64, rng: &mut R) {
        let a0 = self.a0;
        self.shape
            .curr_mut()
            .mapv_inplace(|_| a0 * (1.0 + jitter(offset, rng)));

        let rate0: Array1<f64> = (0..self.num_columns)
            .map(|k| self.rate_prior.column_rate(k) * (1.0 + jitter(offset, rng)))
            .collect();

        for mut row in self.rate.curr_mut().rows_mut() {
            row.assign(&rate0);
        }
        self.set_to_prior();
    }

    /// Start with `shape = a0 + offset * 0.01 * z` and a rate
    /// shifted away from the column prior, `rate = b0[k] + v`
    pub fn initialize_with_rate_shift<R: Rng + ?Sized>(
        &mut self,
        v: f64,
        offset: f64,
        rng: &mut R,
    ) {
        let a0 = self.a0;
        self.shape
            .curr_mut()
            .mapv_inplace(|_| a0 + jitter(offset, rng));

        let rate_prior = &self.rate_prior;
        self.rate
            .curr_mut()
            .indexed_iter_mut()
            .for_each(|((_, k), b)| *b = rate_prior.column_rate(k) + v);
        self.set_to_prior();
    }

    /// Set the expectations from the current shape and a freshly
    /// drawn rate `b0[k] * (1 + offset * 0.01 * z)`; the rate
    /// buffers are left alone.
    pub fn initialize_expectations<R: Rng + ?Sized>(&mut self, offset: f64, rng: &mut R) {
        self.fill_expectations_with(|prior, k| {
            prior.column_rate(k) * (1.0 + jitter(offset, rng))
        });
        self.set_to_prior();
    }

    /// Like [`Self::initialize_expectations`], with the rate drawn
    /// around `v` as `v + offset * 0.01 * z`
    pub fn initialize_expectations_at<R: Rng + ?Sized>(
        &mut self,
        v: f64,
        offset: f64,
        rng: &mut R,
    ) {
        self.fill_expectations_with(|_, _| v + jitter(offset, rng));
        self.set_to_prior();
    }

    fn fill_expectations_with<F>(&mut self, mut draw_rate: F)
    where
        F: FnMut(&RatePrior, usize) -> f64,
    {
        let rate_prior = &self.rate_prior;
        Zip::indexed(&mut self.expected_v)
            .and(&mut self.expected_logv)
            .and(self.shape.curr())
            .for_each(|(_, k), ev, elogv, &a| {
                let (a, b) = make_nonzero(a, draw_rate(rate_prior, k));
                *ev = gamma_mean(a, b);
                *elogv = gamma_log_mean(a, b);
            });
    }
}

impl FactorStore for RowFactorMatrix {
    type Mat = Array2<f64>;
    type RateDelta = Array1<f64>;

    fn name(&self) -> &str {
        &self.name
    }

    fn nrows(&self) -> usize {
        self.num_rows
    }

    fn ncols(&self) -> usize {
        self.num_columns
    }

    fn expected_v(&self) -> &Self::Mat {
        &self.expected_v
    }

    fn expected_logv(&self) -> &Self::Mat {
        &self.expected_logv
    }

    fn set_to_prior(&mut self) {
        self.shape.next_mut().fill(self.a0);
        self.rate_prior.fill(self.rate.next_mut());
    }

    fn set_to_prior_curr(&mut self) {
        self.shape.curr_mut().fill(self.a0);
        self.rate_prior.fill(self.rate.curr_mut());
    }

    fn update_shape_next(&mut self, delta: &Self::Mat) {
        assert_eq!(delta.dim(), self.shape.next().dim(), "{}: shape update", self.name);
        *self.shape.next_mut() += delta;
    }

    /// `rate_next[n,:] += u` for every row `n`
    fn update_rate_next(&mut self, u: &Self::RateDelta) {
        assert_eq!(u.len(), self.num_columns, "{}: rate update", self.name);
        for mut row in self.rate.next_mut().rows_mut() {
            row += u;
        }
    }

    fn swap(&mut self) {
        self.shape.flip();
        self.rate.flip();
        self.set_to_prior();
    }

    fn compute_expectations(&mut self) {
        Zip::from(&mut self.expected_v)
            .and(&mut self.expected_logv)
            .and(self.shape.curr())
            .and(self.rate.curr())
            .for_each(|ev, elogv, &a, &b| {
                let (a, b) = make_nonzero(a, b);
                *ev = gamma_mean(a, b);
                *elogv = gamma_log_mean(a, b);
            });
    }

    fn compute_elbo_term_helper(&self) -> f64 {
        let a0 = self.a0;
        let mut s = 0.0;

        for n in 0..self.num_rows {
            let ev = self.expected_v.row(n);
            let elogv = self.expected_logv.row(n);

            // no prior term for a fixed rate
            if let Some((rate, log_rate)) = self.rate_prior.per_row() {
                s += Zip::from(&ev).and(&elogv).fold(0.0, |acc, &e, &le| {
                    acc + gamma_prior_elbo(a0, rate[n], log_rate[n], e, le)
                });
            }

            s += Zip::from(&ev)
                .and(&elogv)
                .and(self.shape.curr().row(n))
                .and(self.rate.curr().row(n))
                .fold(0.0, |acc, &e, &le, &a, &b| {
                    let (a, b) = make_nonzero(a, b);
                    acc + gamma_posterior_elbo(a, b, e, le)
                });
        }
        s
    }

    fn save_state(&self, ids: IdMap, dir: &str) -> anyhow::Result<()> {
        let files = state_files(dir, &self.name);
        self.shape
            .curr()
            .to_labelled_tsv(&files.shape, ids)
            .with_context(|| format!("failed to save {}", files.shape))?;
        self.rate
            .curr()
            .to_labelled_tsv(&files.rate, ids)
            .with_context(|| format!("failed to save {}", files.rate))?;
        self.expected_v
            .to_labelled_tsv(&files.mean, ids)
            .with_context(|| format!("failed to save {}", files.mean))?;
        Ok(())
    }

    /// Restore the expected values only; shape, rate and E[ln v] are
    /// left for the caller to rebuild
    fn load(&mut self, dir: &str) -> anyhow::Result<()> {
        let files = state_files(dir, &self.name);
        let ev = Array2::<f64>::from_labelled_tsv(&files.mean)
            .with_context(|| format!("failed to load {}", files.mean))?;

        anyhow::ensure!(
            ev.dim() == self.expected_v.dim(),
            "{}: expected {:?}, found {:?} in {}",
            self.name,
            self.expected_v.dim(),
            ev.dim(),
            files.mean
        );

        self.expected_v = ev;
        info!("loaded {} from {}", self.name, files.mean);
        Ok(())
    }

    /// Each row of the count matrix is smoothed to a Dirichlet mean
    fn load_from_lda(&mut self, dir: &str, alpha: f64, k: usize) -> anyhow::Result<()> {
        let lda = lda_file(dir, &self.name, k);
        info!("loading from {}", lda);

        let counts = Array2::<f64>::from_tsv(&lda)
            .with_context(|| format!("failed to load {}", lda))?;

        anyhow::ensure!(
            counts.dim() == self.expected_v.dim(),
            "{}: expected {:?} counts, found {:?} in {}",
            self.name,
            self.expected_v.dim(),
            counts.dim(),
            lda
        );

        self.expected_v = counts;
        Zip::from(self.expected_v.rows_mut())
            .and(self.expected_logv.rows_mut())
            .for_each(|ev, elogv| dirichlet_smooth(alpha, ev, elogv));

        let files = state_files(dir, &self.name);
        self.expected_v.to_labelled_tsv(&files.mean, None)
    }
}
