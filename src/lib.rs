//! # u-jackknife
//!
//! Delete-d jackknife resampling and error propagation for the U-Engine
//! ecosystem.
//!
//! This crate turns raw sample series measured on a common ensemble into
//! jackknife replicates, and carries those replicates through arbitrary
//! functions so that means and standard errors of derived, possibly
//! nonlinear quantities come out with their correlations intact.
//!
//! ## Modules
//!
//! - [`analyzer`] — Keyed store of resampled datasets and derived quantities
//! - [`stats`] — Replicate construction and jackknife variance kernels
//! - [`config`] — Bin size and remainder policy
//! - [`error`] — Error type
//!
//! ## Design Philosophy
//!
//! - **One binning per store**: every dataset shares the bin count fixed by
//!   the first one, so replicate `i` always omits the same raw block
//! - **Numerical stability first**: Neumaier summation for every reduction
//! - **Property-based testing**: estimator identities verified via proptest
//!
//! ## Example
//!
//! ```
//! use u_jackknife::JackknifeAnalyzer;
//!
//! let mut jk = JackknifeAnalyzer::from_samples("x", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 1)?;
//! assert_eq!(jk.bin_count(), Some(6));
//! assert_eq!(jk.mu(&"x")?, 3.5);
//!
//! jk.add_function("x^2", |v: &[f64]| v[0] * v[0], &["x"])?;
//! let est = jk.jackknife(&"x^2").unwrap();
//! assert_eq!(est.mean, 12.25);
//! # Ok::<(), u_jackknife::JackknifeError>(())
//! ```

pub mod analyzer;
pub mod config;
pub mod error;
pub mod stats;

pub use analyzer::{Estimate, JackknifeAnalyzer};
pub use config::{JackknifeConfig, RemainderPolicy};
pub use error::{JackknifeError, Result};
pub use stats::Sample;
