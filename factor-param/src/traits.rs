use log::{debug, warn};

/// Translation of the sequential row index to an external id, as
/// prepared by the data loader (`ids[i]` is the id of row `i`)
pub type IdMap<'a> = Option<&'a [Box<str>]>;

/// A block of Gamma-distributed latent variables fitted by
/// coordinate ascent.
///
/// Each iteration:
/// 1. statistics are added onto the prior held in the `next` buffer
/// 2. `swap` commits them to `curr` and resets `next` to the prior
/// 3. `compute_expectations` refreshes E[v] and E[ln v] from `curr`
/// 4. `compute_elbo_term` reports this block's share of the bound
pub trait FactorStore {
    /// shape of the expectation (and shape parameter) block
    type Mat;
    /// shape of a rate contribution taken by `update_rate_next`
    type RateDelta;

    fn name(&self) -> &str;
    fn nrows(&self) -> usize;
    fn ncols(&self) -> usize;

    fn expected_v(&self) -> &Self::Mat;
    fn expected_logv(&self) -> &Self::Mat;

    /// reset `next` to the prior
    fn set_to_prior(&mut self);

    /// reset `curr` to the prior
    fn set_to_prior_curr(&mut self);

    /// `shape_next += delta`
    fn update_shape_next(&mut self, delta: &Self::Mat);

    /// add a rate contribution to `next`
    fn update_rate_next(&mut self, delta: &Self::RateDelta);

    /// Commit `next` to `curr` and start a fresh `next` at the prior
    fn swap(&mut self);

    fn compute_expectations(&mut self);

    fn compute_elbo_term_helper(&self) -> f64;

    fn compute_elbo_term(&self) -> f64 {
        let s = self.compute_elbo_term_helper();
        debug!("sum of {} elbo terms = {}", self.name(), s);
        s
    }

    /// Write `<name>.tsv`, `<name>_shape.tsv` and `<name>_rate.tsv`
    /// under `dir`
    fn save_state(&self, ids: IdMap, dir: &str) -> anyhow::Result<()>;

    /// Restore what `save_state` wrote under `dir`
    fn load(&mut self, dir: &str) -> anyhow::Result<()>;

    /// Initialize the expectations from topic-model counts found in
    /// `<dir>/lda-fits/<name>-lda-k<k>.tsv`
    fn load_from_lda(&mut self, dir: &str, alpha: f64, k: usize) -> anyhow::Result<()> {
        let _ = (dir, alpha, k);
        warn!("{}: load_from_lda() unimplemented", self.name());
        Ok(())
    }
}
