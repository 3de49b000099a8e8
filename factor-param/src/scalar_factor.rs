use crate::buffer::DoubleBuffer;
use crate::gamma::*;
use crate::io::*;
use crate::traits::*;

use anyhow::Context;
use log::info;
use matrix_util::traits::IoOps;
use ndarray::prelude::*;
use ndarray::Zip;
use rand::Rng;

/// One Gamma variable per entity, e.g., the activity of a user or
/// the popularity of an item
///
/// ```text
/// v[n] ~ Gamma(a0, b0)
/// q(v[n]) = Gamma(shape[n], rate[n])
/// ```
#[derive(Debug, Clone)]
pub struct ScalarFactor {
    name: Box<str>,
    num_rows: usize,
    a0: f64,
    b0: f64,
    shape: DoubleBuffer<Array1<f64>>,
    rate: DoubleBuffer<Array1<f64>>,
    expected_v: Array1<f64>,
    expected_logv: Array1<f64>,
    expected_inv: Array1<f64>,
}

impl ScalarFactor {
    pub fn new(name: &str, n: usize, a0: f64, b0: f64) -> Self {
        Self {
            name: name.into(),
            num_rows: n,
            a0,
            b0,
            shape: DoubleBuffer::from_elem(Array1::from_elem(n, a0)),
            rate: DoubleBuffer::from_elem(Array1::from_elem(n, b0)),
            expected_v: Array1::zeros(n),
            expected_logv: Array1::zeros(n),
            expected_inv: Array1::zeros(n),
        }
    }

    pub fn shape_curr(&self) -> &Array1<f64> {
        self.shape.curr()
    }

    pub fn shape_next(&self) -> &Array1<f64> {
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

    /// E[1/v] = rate / (shape - 1)
    pub fn expected_inv(&self) -> &Array1<f64> {
        &self.expected_inv
    }

    /// Average of E[v] over all entities
    pub fn expected_mean(&self) -> f64 {
        self.expected_v.mean().unwrap_or(0.0)
    }

    /// `shape_next[n] += v`
    pub fn update_shape_next_at(&mut self, n: usize, v: f64) {
        self.shape.next_mut()[n] += v;
    }

    /// `shape_next[:] += v`
    pub fn update_shape_next_all(&mut self, v: f64) {
        *self.shape.next_mut() += v;
    }

    /// `rate_next += scale * u`
    pub fn update_rate_next_scaled(&mut self, u: &Array1<f64>, scale: f64) {
        assert_eq!(u.len(), self.num_rows, "{}: rate update", self.name);
        self.rate.next_mut().scaled_add(scale, u);
    }

    /// `rate_next[n] += u * weights[n]`
    pub fn update_rate_next_weighted(&mut self, u: f64, weights: &Array1<f64>) {
        assert_eq!(weights.len(), self.num_rows, "{}: rate weights", self.name);
        self.rate.next_mut().scaled_add(u, weights);
    }

    /// `rate_next[n] += v`
    pub fn update_rate_next_at(&mut self, n: usize, v: f64) {
        self.rate.next_mut()[n] += v;
    }

    /// shape = a0 + offset * 0.01 * z, rate = b0 + offset * 0.01 * z
    pub fn initialize<R: Rng + ?Sized>(&mut self, offset: f64, rng: &mut R) {
        let (a0, b0) = (self.a0, self.b0);
        let (shape, rate) = (self.shape.curr_mut(), self.rate.curr_mut());
        Zip::from(shape).and(rate).for_each(|a, b| {
            *a = a0 + jitter(offset, rng);
            *b = b0 + jitter(offset, rng);
        });
        self.set_to_prior();
    }

    /// shape = a0 + v, rate = b0 * (1 + offset * 0.01 * z)
    pub fn initialize_with_shape_shift<R: Rng + ?Sized>(
        &mut self,
        v: f64,
        offset: f64,
        rng: &mut R,
    ) {
        let (a0, b0) = (self.a0, self.b0);
        self.shape.curr_mut().fill(a0 + v);
        self.rate
            .curr_mut()
            .mapv_inplace(|_| b0 * (1.0 + jitter(offset, rng)));
        self.set_to_prior();
    }
}

impl FactorStore for ScalarFactor {
    type Mat = Array1<f64>;
    type RateDelta = Array1<f64>;

    fn name(&self) -> &str {
        &self.name
    }

    fn nrows(&self) -> usize {
        self.num_rows
    }

    fn ncols(&self) -> usize {
        1
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

    fn update_shape_next(&mut self, phi: &Self::Mat) {
        assert_eq!(phi.len(), self.num_rows, "{}: shape update", self.name);
        *self.shape.next_mut() += phi;
    }

    fn update_rate_next(&mut self, u: &Self::RateDelta) {
        assert_eq!(u.len(), self.num_rows, "{}: rate update", self.name);
        *self.rate.next_mut() += u;
    }

    fn swap(&mut self) {
        self.shape.flip();
        self.rate.flip();
        self.set_to_prior();
    }

    fn compute_expectations(&mut self) {
        Zip::from(&mut self.expected_v)
            .and(&mut self.expected_logv)
            .and(&mut self.expected_inv)
            .and(self.shape.curr())
            .and(self.rate.curr())
            .for_each(|ev, elogv, einv, &a, &b| {
                let (a, b) = make_nonzero(a, b);
                *ev = gamma_mean(a, b);
                *elogv = gamma_log_mean(a, b);
                *einv = gamma_inv_mean(a, b);
            });
    }

    fn compute_elbo_term_helper(&self) -> f64 {
        let (a0, b0) = (self.a0, self.b0);
        let log_b0 = b0.ln();

        Zip::from(&self.expected_v)
            .and(&self.expected_logv)
            .and(self.shape.curr())
            .and(self.rate.curr())
            .fold(0.0, |s, &ev, &elogv, &a, &b| {
                let (a, b) = make_nonzero(a, b);
                s + gamma_prior_elbo(a0, b0, log_b0, ev, elogv)
                    + gamma_posterior_elbo(a, b, ev, elogv)
            })
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

    /// Restore shape and rate, then refresh the expectations
    fn load(&mut self, dir: &str) -> anyhow::Result<()> {
        let files = state_files(dir, &self.name);

        let shape = Array1::<f64>::from_labelled_tsv(&files.shape)
            .with_context(|| format!("failed to load {}", files.shape))?;
        let rate = Array1::<f64>::from_labelled_tsv(&files.rate)
            .with_context(|| format!("failed to load {}", files.rate))?;

        anyhow::ensure!(
            shape.len() == self.num_rows && rate.len() == self.num_rows,
            "{}: expected {} entries, found {} shapes and {} rates",
            self.name,
            self.num_rows,
            shape.len(),
            rate.len()
        );

        *self.shape.curr_mut() = shape;
        *self.rate.curr_mut() = rate;
        self.compute_expectations();

        info!("loaded from {} and {}", files.shape, files.rate);
        Ok(())
    }
}
