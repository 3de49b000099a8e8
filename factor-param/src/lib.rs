//! Variational Gamma factors of hierarchical Poisson factorization
//!
//! Every factor keeps its posterior shape and rate twice (`curr` and
//! `next`) so that the statistics of one sweep over the observed
//! counts can be accumulated while the rest of the model keeps
//! reading the committed expectations.

pub mod buffer;
pub mod gamma;
pub mod io;
pub mod prior;
pub mod row_matrix;
pub mod scalar_factor;
pub mod shared_rate_matrix;
pub mod traits;

pub use prior::RatePrior;
pub use row_matrix::RowFactorMatrix;
pub use scalar_factor::ScalarFactor;
pub use shared_rate_matrix::RowFactorMatrixSharedRate;
pub use traits::{FactorStore, IdMap};
