use ndarray::prelude::*;
use ndarray::Zip;
use special::Gamma;

/// Files written by `save_state`
pub struct StateFiles {
    /// expected values
    pub mean: Box<str>,
    pub shape: Box<str>,
    pub rate: Box<str>,
}

pub fn state_files(dir: &str, name: &str) -> StateFiles {
    StateFiles {
        mean: format!("{}/{}.tsv", dir, name).into_boxed_str(),
        shape: format!("{}/{}_shape.tsv", dir, name).into_boxed_str(),
        rate: format!("{}/{}_rate.tsv", dir, name).into_boxed_str(),
    }
}

/// `<dir>/lda-fits/<name>-lda-k<k>.tsv`
pub fn lda_file(dir: &str, name: &str, k: usize) -> Box<str> {
    format!("{}/lda-fits/{}-lda-k{}.tsv", dir, name, k).into_boxed_str()
}

/// Dirichlet posterior moments of one group of counts with a
/// symmetric pseudo-count `alpha`
///
/// ```text
/// E[θ_j]    = (alpha + c_j) / S
/// E[ln θ_j] = ψ(alpha + c_j) - ψ(S),   S = Σ c + alpha * len
/// ```
///
/// Both outputs overwrite `ev` and `elogv`; `ev` may hold the counts
/// themselves.
pub fn dirichlet_smooth(
    alpha: f64,
    mut ev: ArrayViewMut1<f64>,
    mut elogv: ArrayViewMut1<f64>,
) {
    let s = ev.sum() + alpha * ev.len() as f64;
    let digamma_s = s.digamma();
    Zip::from(&mut ev).and(&mut elogv).for_each(|ev, elogv| {
        let counts = *ev;
        *ev = (alpha + counts) / s;
        *elogv = (alpha + counts).digamma() - digamma_s;
    });
}
