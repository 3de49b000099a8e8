extern crate special;

use rand::Rng;
use rand_distr::StandardNormal;
use special::Gamma;

/// Non-positive shape or rate parameters are replaced by this value
pub const PARAM_FLOOR: f64 = 1e-30;

/// Standard deviation of the initial jitter per unit of `offset`
pub const JITTER_SCALE: f64 = 0.01;

/// Guard a pair of Gamma parameters before taking logs/digammas
///
/// * `av` - shape
/// * `bv` - rate
///
/// Zero is deflected to [`PARAM_FLOOR`]. A negative (or NaN)
/// parameter means the accumulated statistics are broken, so we
/// stop here.
pub fn make_nonzero(av: f64, bv: f64) -> (f64, f64) {
    assert!(
        av >= 0.0 && bv >= 0.0,
        "invalid gamma parameters: a = {}, b = {}",
        av,
        bv
    );
    let a = if av > 0.0 { av } else { PARAM_FLOOR };
    let b = if bv > 0.0 { bv } else { PARAM_FLOOR };
    (a, b)
}

/// E[v] = a / b
pub fn gamma_mean(a: f64, b: f64) -> f64 {
    a / b
}

/// E[ln v] = ψ(a) - ln b
pub fn gamma_log_mean(a: f64, b: f64) -> f64 {
    a.digamma() - b.ln()
}

/// E[1/v] = b / (a - 1), only meaningful for a > 1
pub fn gamma_inv_mean(a: f64, b: f64) -> f64 {
    b / (a - 1.0)
}

pub fn ln_gamma(x: f64) -> f64 {
    Gamma::ln_gamma(x).0
}

/// Prior part of the ELBO for one Gamma variable,
///
/// E[ln Gamma(v | a0, b0)]
///   = a0 ln b0 + (a0 - 1) E[ln v] - b0 E[v] - ln Γ(a0)
///
/// * `log_b0` - ln b0, or its expectation for a hierarchical rate
pub fn gamma_prior_elbo(a0: f64, b0: f64, log_b0: f64, ev: f64, elogv: f64) -> f64 {
    a0 * log_b0 + (a0 - 1.0) * elogv - b0 * ev - ln_gamma(a0)
}

/// Entropy part of the ELBO for one Gamma variable,
///
/// -E[ln q(v | a, b)]
///   = -a ln b - (a - 1) E[ln v] + b E[v] + ln Γ(a)
///
/// `a` and `b` are expected to have passed [`make_nonzero`]
pub fn gamma_posterior_elbo(a: f64, b: f64, ev: f64, elogv: f64) -> f64 {
    -(a * b.ln() + (a - 1.0) * elogv) + b * ev + ln_gamma(a)
}

/// `offset * 0.01 * N(0,1)`
pub fn jitter<R: Rng + ?Sized>(offset: f64, rng: &mut R) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    offset * JITTER_SCALE * z
}
