//! Error type for analyzer construction, registration, and queries.
//!
//! Registering a key that already exists is *not* an error: the call is a
//! no-op and reports `Ok(false)`. Everything below is a hard failure local to
//! the failing call, raised before the store is touched.

use thiserror::Error;

/// Failures reported by [`JackknifeAnalyzer`](crate::JackknifeAnalyzer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JackknifeError {
    /// A dataset's bin count disagrees with the bin count already fixed
    /// for the store.
    #[error("bin count mismatch: store has {expected} bins, dataset yields {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// The first dataset registered yields fewer than two bins.
    #[error("fewer than 2 bins: dataset yields {found}")]
    InsufficientBins { found: usize },

    /// A query or a composed function argument names a key that is not stored.
    #[error("unknown key {key}")]
    UnknownKey { key: String },

    /// A bin size of zero was requested.
    #[error("bin size must be at least 1")]
    InvalidBinSize,

    /// A raw series length is not a multiple of the bin size and the store
    /// rejects remainders.
    #[error("{len} samples do not divide into bins of {bin_size}")]
    IndivisibleLength { len: usize, bin_size: usize },

    /// A function without arguments was composed before any dataset fixed
    /// the bin count.
    #[error("bin count is not established yet")]
    Uninitialized,

    /// A sample or bin count has no representation in the value type.
    #[error("count {count} is not representable in the sample type")]
    UnrepresentableCount { count: usize },
}

impl JackknifeError {
    pub(crate) fn unknown_key<K: std::fmt::Debug>(key: &K) -> Self {
        JackknifeError::UnknownKey {
            key: format!("{key:?}"),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = JackknifeError> = std::result::Result<T, E>;
