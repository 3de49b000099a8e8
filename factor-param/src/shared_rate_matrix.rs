use crate::buffer::DoubleBuffer;
use crate::gamma::*;
use crate::io::*;
use crate::traits::*;

use anyhow::Context;
use log::{debug, info};
use matrix_util::traits::IoOps;
use ndarray::prelude::*;
use ndarray::{AsArray, Zip};
use rand::Rng;

/// Gamma matrix whose rate is a global, per-column parameter
///
/// ```text
/// v[n,k] ~ Gamma(a0, b0)
/// q(v[n,k]) = Gamma(shape[n,k], rate[k])
/// ```
#[derive(Debug, Clone)]
pub struct RowFactorMatrixSharedRate {
    name: Box<str>,
    num_rows: usize,
    num_columns: usize,
    //////////////////////
    // hyper parameters //
    //////////////////////
    a0: f64,
    b0: f64,
    ///////////////////////////
    // variational posterior //
    ///////////////////////////
    shape: DoubleBuffer<Array2<f64>>,
    rate: DoubleBuffer<Array1<f64>>,
    //////////////////
    // expectations //
    //////////////////
    expected_v: Array2<f64>,
    expected_logv: Array2<f64>,
}

impl RowFactorMatrixSharedRate {
    /// # Arguments
    /// * `name` - prefix of the files written by `save_state`
    /// * `dims` - (num of rows, num of columns)
    /// * `a0` - shape hyper parameter
    /// * `b0` - rate hyper parameter
    pub fn new(name: &str, dims: (usize, usize), a0: f64, b0: f64) -> Self {
        Self {
            name: name.into(),
            num_rows: dims.0,
            num_columns: dims.1,
            a0,
            b0,
            shape: DoubleBuffer::from_elem(Array2::from_elem(dims, a0)),
            rate: DoubleBuffer::from_elem(Array1::from_elem(dims.1, b0)),
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

    pub fn rate_curr(&self) -> &Array1<f64> {
        self.rate.curr()
    }

    pub fn rate_next(&self) -> &Array1<f64> {
        self.rate.next()
    }

    pub fn shape_prior(&self) -> f64 {
        self.a0
    }

    pub fn rate_prior(&self) -> f64 {
        self.b0
    }

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

    /// `rate_curr += u`
    pub fn update_rate_curr(&mut self, u: &Array1<f64>) {
        assert_eq!(u.len(), self.num_columns, "{}: rate update", self.name);
        *self.rate.curr_mut() += u;
    }

    /// Σ_n E[v[n,:]]
    pub fn sum_rows(&self) -> Array1<f64> {
        self.expected_v.sum_axis(Axis(0))
    }

    /// Σ_n scale[n] E[v[n,:]]
    pub fn weighted_sum_rows(&self, scale: &Array1<f64>) -> Array1<f64> {
        assert_eq!(scale.len(), self.num_rows, "{}: row weights", self.name);
        scale.dot(&self.expected_v)
    }

    /// Σ_k E[v[:,k]]
    pub fn sum_cols(&self) -> Array1<f64> {
        self.expected_v.sum_axis(Axis(1))
    }

    /// shape = a0 + offset * 0.01 * z, rate = b0 + offset * 0.01 * z
    pub fn initialize<R: Rng + ?Sized>(&mut self, offset: f64, rng: &mut R) {
        let (a0, b0) = (self.a0, self.b0);
        self.shape
            .curr_mut()
            .mapv_inplace(|_| a0 + jitter(offset, rng));
        self.rate
            .curr_mut()
            .mapv_inplace(|_| b0 + jitter(offset, rng));
        self.set_to_prior();
    }

    /// shape = a0 + offset * 0.01 * z, rate = b0 + v
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
        self.rate.curr_mut().fill(self.b0 + v);
        self.set_to_prior();
    }

    /// Set the expectations from the current shape and a freshly
    /// drawn rate `b0 + offset * 0.01 * z`; the rate buffers are
    /// left alone.
    pub fn initialize_expectations<R: Rng + ?Sized>(&mut self, offset: f64, rng: &mut R) {
        let b0 = self.b0;
        self.fill_expectations_with(|| b0 + jitter(offset, rng));
        self.set_to_prior();
    }

    /// Like [`Self::initialize_expectations`], with the rate drawn
    /// around `v`
    pub fn initialize_expectations_at<R: Rng + ?Sized>(
        &mut self,
        v: f64,
        offset: f64,
        rng: &mut R,
    ) {
        self.fill_expectations_with(|| v + jitter(offset, rng));
        self.set_to_prior();
    }

    fn fill_expectations_with<F>(&mut self, mut draw_rate: F)
    where
        F: FnMut() -> f64,
    {
        Zip::from(&mut self.expected_v)
            .and(&mut self.expected_logv)
            .and(self.shape.curr())
            .for_each(|ev, elogv, &a| {
                let (a, b) = make_nonzero(a, draw_rate());
                *ev = gamma_mean(a, b);
                *elogv = gamma_log_mean(a, b);
            });
    }
}

impl FactorStore for RowFactorMatrixSharedRate {
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
        self.rate.next_mut().fill(self.b0);
    }

    fn set_to_prior_curr(&mut self) {
        self.shape.curr_mut().fill(self.a0);
        self.rate.curr_mut().fill(self.b0);
    }

    fn update_shape_next(&mut self, delta: &Self::Mat) {
        assert_eq!(delta.dim(), self.shape.next().dim(), "{}: shape update", self.name);
        *self.shape.next_mut() += delta;
    }

    /// `rate_next += u`, seen by every row
    fn update_rate_next(&mut self, u: &Self::RateDelta) {
        assert_eq!(u.len(), self.num_columns, "{}: rate update", self.name);
        *self.rate.next_mut() += u;
    }

    fn swap(&mut self) {
        self.shape.flip();
        self.rate.flip();
        self.set_to_prior();
    }

    fn compute_expectations(&mut self) {
        let rate = self.rate.curr();
        Zip::from(self.expected_v.rows_mut())
            .and(self.expected_logv.rows_mut())
            .and(self.shape.curr().rows())
            .for_each(|ev, elogv, shape| {
                Zip::from(ev)
                    .and(elogv)
                    .and(shape)
                    .and(rate)
                    .for_each(|ev, elogv, &a, &b| {
                        let (a, b) = make_nonzero(a, b);
                        *ev = gamma_mean(a, b);
                        *elogv = gamma_log_mean(a, b);
                    });
            });

        debug!(
            "name = {}, shape = {:?}, rate = {}, E[v] = {:?}",
            self.name,
            self.shape.curr().dim(),
            self.rate.curr(),
            self.expected_v.dim()
        );
    }

    fn compute_elbo_term_helper(&self) -> f64 {
        let (a0, b0) = (self.a0, self.b0);
        let log_b0 = b0.ln();
        let rate = self.rate.curr();
        let mut s = 0.0;

        for n in 0..self.num_rows {
            let ev = self.expected_v.row(n);
            let elogv = self.expected_logv.row(n);

            s += Zip::from(&ev)
                .and(&elogv)
                .fold(0.0, |acc, &e, &le| acc + gamma_prior_elbo(a0, b0, log_b0, e, le));

            s += Zip::from(&ev)
                .and(&elogv)
                .and(self.shape.curr().row(n))
                .and(rate)
                .fold(0.0, |acc, &e, &le, &a, &b| {
                    let (a, b) = make_nonzero(a, b);
                    acc + gamma_posterior_elbo(a, b, e, le)
                });
        }
        s
    }

    /// The rate file holds one value per column, labelled by the
    /// column index
    fn save_state(&self, ids: IdMap, dir: &str) -> anyhow::Result<()> {
        let files = state_files(dir, &self.name);
        self.shape
            .curr()
            .to_labelled_tsv(&files.shape, ids)
            .with_context(|| format!("failed to save {}", files.shape))?;
        self.rate
            .curr()
            .to_labelled_tsv(&files.rate, None)
            .with_context(|| format!("failed to save {}", files.rate))?;
        self.expected_v
            .to_labelled_tsv(&files.mean, ids)
            .with_context(|| format!("failed to save {}", files.mean))?;
        Ok(())
    }

    /// Restore shape and rate, then refresh the expectations
    fn load(&mut self, dir: &str) -> anyhow::Result<()> {
        let files = state_files(dir, &self.name);

        let shape = Array2::<f64>::from_labelled_tsv(&files.shape)
            .with_context(|| format!("failed to load {}", files.shape))?;
        let rate = Array1::<f64>::from_labelled_tsv(&files.rate)
            .with_context(|| format!("failed to load {}", files.rate))?;

        anyhow::ensure!(
            shape.dim() == (self.num_rows, self.num_columns),
            "{}: expected {:?} shape, found {:?}",
            self.name,
            (self.num_rows, self.num_columns),
            shape.dim()
        );
        anyhow::ensure!(
            rate.len() == self.num_columns,
            "{}: expected {} rates, found {}",
            self.name,
            self.num_columns,
            rate.len()
        );

        *self.shape.curr_mut() = shape;
        *self.rate.curr_mut() = rate;
        self.compute_expectations();

        info!("loaded from {} and {}", files.shape, files.rate);
        Ok(())
    }

    /// The count file is stored column by column (`k` lines of `n`
    /// counts); each column is smoothed to a Dirichlet mean
    fn load_from_lda(&mut self, dir: &str, alpha: f64, k: usize) -> anyhow::Result<()> {
        let lda = lda_file(dir, &self.name, k);
        info!("loading from {}", lda);

        let counts = Array2::<f64>::from_tsv(&lda)
            .with_context(|| format!("failed to load {}", lda))?
            .reversed_axes();

        anyhow::ensure!(
            counts.dim() == self.expected_v.dim(),
            "{}: expected {:?} counts, found {:?} in {}",
            self.name,
            self.expected_v.dim(),
            counts.dim(),
            lda
        );

        self.expected_v = counts.as_standard_layout().into_owned();
        Zip::from(self.expected_v.columns_mut())
            .and(self.expected_logv.columns_mut())
            .for_each(|ev, elogv| dirichlet_smooth(alpha, ev, elogv));

        let files = state_files(dir, &self.name);
        self.expected_v.to_labelled_tsv(&files.mean, None)
    }
}
