//! Jackknife estimators with numerical stability guarantees.
//!
//! These are the numeric kernels behind [`JackknifeAnalyzer`](crate::JackknifeAnalyzer).
//! They are generic over any floating-point [`Sample`] type and can be used
//! on their own when no keyed store is needed.
//!
//! # Algorithms
//!
//! - **Summation**: Neumaier compensated summation for O(ε) error
//!   independent of n.
//! - **Replicates**: delete-one-bin estimator. Replicate `b` is the mean of
//!   all samples except the contiguous block `[b·s, (b+1)·s)` where `s` is
//!   the bin size, computed as `(Σx − Σblock_b) / (n − s)`.
//! - **Variance**: `(N−1)/N · Σ (θ_i − θ̂)²` over the `N` replicates θ_i
//!   around the central estimate θ̂.
//!   Reference: Efron & Stein (1981), "The Jackknife Estimate of Variance",
//!   *The Annals of Statistics* 9(3).
//! - **Blocked jackknife**: bins of `s > 1` consecutive samples absorb
//!   serial correlation shorter than `s`.
//!   Reference: Künsch (1989), "The Jackknife and the Bootstrap for General
//!   Stationary Observations", *The Annals of Statistics* 17(3).

use std::fmt::Debug;

use num_traits::{Float, FromPrimitive};

use crate::error::{JackknifeError, Result};

/// Arithmetic value type accepted by the analyzer.
///
/// Implemented for every floating-point type that can also be built from a
/// sample count, i.e. `f32` and `f64`.
pub trait Sample: Float + FromPrimitive + Debug {}

impl<T: Float + FromPrimitive + Debug> Sample for T {}

/// Converts a count into the sample type.
pub(crate) fn count<T: Sample>(n: usize) -> Result<T> {
    T::from_usize(n).ok_or(JackknifeError::UnrepresentableCount { count: n })
}

// ---------------------------------------------------------------------------
// Compensated summation
// ---------------------------------------------------------------------------

/// Neumaier compensated summation for O(ε) error independent of `n`.
///
/// Handles the case where the addend is larger in magnitude than the
/// running sum, which plain Kahan summation does not.
///
/// Reference: Neumaier (1974), "Rundungsfehleranalyse einiger Verfahren
/// zur Summation endlicher Summen", *ZAMM* 54(1), pp. 39–51.
///
/// # Complexity
/// Time: O(n), Space: O(1)
///
/// # Examples
/// ```
/// use u_jackknife::stats::kahan_sum;
/// let v = [1.0e16_f64, 1.0, -1.0e16];
/// assert_eq!(kahan_sum(v), 1.0);
/// ```
pub fn kahan_sum<T: Sample>(data: impl IntoIterator<Item = T>) -> T {
    let mut sum = T::zero();
    let mut c = T::zero();
    for x in data {
        let t = sum + x;
        if sum.abs() >= x.abs() {
            c = c + ((sum - t) + x);
        } else {
            c = c + ((x - t) + sum);
        }
        sum = t;
    }
    sum + c
}

/// Arithmetic mean over every supplied sample.
///
/// # Errors
/// Returns [`JackknifeError::InsufficientBins`] for an empty slice.
///
/// # Examples
/// ```
/// use u_jackknife::stats::mean;
/// assert_eq!(mean(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap(), 3.5);
/// ```
pub fn mean<T: Sample>(data: &[T]) -> Result<T> {
    if data.is_empty() {
        return Err(JackknifeError::InsufficientBins { found: 0 });
    }
    Ok(kahan_sum(data.iter().copied()) / count(data.len())?)
}

// ---------------------------------------------------------------------------
// Resampling
// ---------------------------------------------------------------------------

/// Delete-one-bin jackknife replicates of the sample mean.
///
/// The series is cut into `data.len() / bin_size` contiguous bins. Replicate
/// `b` is the mean of the series with bin `b` removed. Samples after the last
/// full bin are never removed but still take part in every replicate.
///
/// # Errors
/// - [`JackknifeError::InvalidBinSize`] if `bin_size` is zero.
/// - [`JackknifeError::InsufficientBins`] if fewer than two bins fit.
///
/// # Complexity
/// Time: O(n), Space: O(n / bin_size)
///
/// # Examples
/// ```
/// use u_jackknife::stats::jackknife_replicates;
/// let reps: Vec<f64> = jackknife_replicates(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 1).unwrap();
/// assert_eq!(reps.len(), 6);
/// assert!((reps[0] - 4.0).abs() < 1e-12);
/// assert!((reps[5] - 3.0).abs() < 1e-12);
/// ```
pub fn jackknife_replicates<T: Sample>(data: &[T], bin_size: usize) -> Result<Vec<T>> {
    if bin_size == 0 {
        return Err(JackknifeError::InvalidBinSize);
    }
    let num_bins = data.len() / bin_size;
    if num_bins < 2 {
        return Err(JackknifeError::InsufficientBins { found: num_bins });
    }

    let total = kahan_sum(data.iter().copied());
    // num_bins >= 2 guarantees a positive denominator.
    let kept: T = count(data.len() - bin_size)?;

    Ok(data
        .chunks_exact(bin_size)
        .map(|block| (total - kahan_sum(block.iter().copied())) / kept)
        .collect())
}

// ---------------------------------------------------------------------------
// Error estimation
// ---------------------------------------------------------------------------

/// Jackknife covariance of two replicate series around their central
/// estimates: `(N−1)/N · Σ (a_i − â)(b_i − b̂)`.
///
/// Both series must come from the same binning so that replicate `i` of
/// each omits the same raw block.
///
/// # Errors
/// - [`JackknifeError::DimensionMismatch`] if the series differ in length.
/// - [`JackknifeError::InsufficientBins`] if the series are empty.
pub fn jackknife_covariance<T: Sample>(a: &[T], mean_a: T, b: &[T], mean_b: T) -> Result<T> {
    if a.len() != b.len() {
        return Err(JackknifeError::DimensionMismatch {
            expected: a.len(),
            found: b.len(),
        });
    }
    if a.is_empty() {
        return Err(JackknifeError::InsufficientBins { found: 0 });
    }
    let n: T = count(a.len())?;
    let products = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| (x - mean_a) * (y - mean_b));
    Ok((n - T::one()) / n * kahan_sum(products))
}

/// Jackknife variance `(N−1)/N · Σ (θ_i − θ̂)²`.
///
/// # Errors
/// Returns [`JackknifeError::InsufficientBins`] for an empty series.
pub fn jackknife_variance<T: Sample>(replicates: &[T], mean: T) -> Result<T> {
    jackknife_covariance(replicates, mean, replicates, mean)
}

/// Jackknife standard error, the square root of [`jackknife_variance`].
///
/// # Examples
/// ```
/// use u_jackknife::stats::jackknife_error;
/// let reps = [4.0, 3.8, 3.6, 3.4, 3.2, 3.0];
/// let sigma = jackknife_error(&reps, 3.5).unwrap();
/// assert!((sigma - (5.0_f64 / 6.0 * 0.7).sqrt()).abs() < 1e-12);
/// ```
pub fn jackknife_error<T: Sample>(replicates: &[T], mean: T) -> Result<T> {
    jackknife_variance(replicates, mean).map(Float::sqrt)
}

/// Jackknife bias estimate `(N−1) · (θ̄ − θ̂)` where θ̄ is the average of the
/// replicates.
///
/// Vanishes for linear estimators such as the plain sample mean.
///
/// # Errors
/// Returns [`JackknifeError::InsufficientBins`] for an empty series.
pub fn jackknife_bias<T: Sample>(replicates: &[T], mean: T) -> Result<T> {
    let n: T = count(replicates.len())?;
    let replicate_mean = self::mean(replicates)?;
    Ok((n - T::one()) * (replicate_mean - mean))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SIX: [f64; 6] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

    // --- kahan_sum ---

    #[test]
    fn test_kahan_sum_basic() {
        assert_eq!(kahan_sum(SIX), 21.0);
    }

    #[test]
    fn test_kahan_sum_empty() {
        assert_eq!(kahan_sum(Vec::<f64>::new()), 0.0);
    }

    #[test]
    fn test_kahan_sum_recovers_small_addends() {
        let mut v = vec![1.0e8_f64];
        v.extend(std::iter::repeat(1.0e-8).take(10_000));
        let s = kahan_sum(v.iter().copied());
        assert!((s - (1.0e8 + 1.0e-4)).abs() < 1e-7);
    }

    // --- mean ---

    #[test]
    fn test_mean_basic() {
        assert_eq!(mean(&SIX).unwrap(), 3.5);
    }

    #[test]
    fn test_mean_empty() {
        assert_eq!(
            mean::<f64>(&[]),
            Err(JackknifeError::InsufficientBins { found: 0 })
        );
    }

    #[test]
    fn test_mean_f32() {
        assert!((mean(&[1.0_f32, 2.0, 3.0]).unwrap() - 2.0).abs() < 1e-6);
    }

    // --- jackknife_replicates ---

    #[test]
    fn test_replicates_leave_one_out() {
        let reps = jackknife_replicates(&SIX, 1).unwrap();
        let expected = [4.0, 3.8, 3.6, 3.4, 3.2, 3.0];
        assert_eq!(reps.len(), 6);
        for (r, e) in reps.iter().zip(expected) {
            assert!((r - e).abs() < 1e-12, "{r} vs {e}");
        }
    }

    #[test]
    fn test_replicates_binned() {
        let reps = jackknife_replicates(&SIX, 2).unwrap();
        // (21 - 3) / 4, (21 - 7) / 4, (21 - 11) / 4
        assert_eq!(reps, vec![4.5, 3.5, 2.5]);
    }

    #[test]
    fn test_replicates_remainder_never_omitted() {
        // Bins {1,2} and {3,4}; the trailing 5 stays in every replicate.
        let reps = jackknife_replicates(&[1.0, 2.0, 3.0, 4.0, 5.0], 2).unwrap();
        assert_eq!(reps, vec![12.0 / 3.0, 8.0 / 3.0]);
    }

    #[test]
    fn test_replicates_too_few_bins() {
        assert_eq!(
            jackknife_replicates(&[1.0, 2.0, 3.0], 2),
            Err(JackknifeError::InsufficientBins { found: 1 })
        );
        assert_eq!(
            jackknife_replicates::<f64>(&[], 1),
            Err(JackknifeError::InsufficientBins { found: 0 })
        );
    }

    #[test]
    fn test_replicates_zero_bin_size() {
        assert_eq!(
            jackknife_replicates(&SIX, 0),
            Err(JackknifeError::InvalidBinSize)
        );
    }

    // --- variance / error ---

    #[test]
    fn test_error_matches_standard_error_of_mean() {
        // For the plain mean the jackknife error equals s / sqrt(n).
        let reps = jackknife_replicates(&SIX, 1).unwrap();
        let sigma = jackknife_error(&reps, 3.5).unwrap();
        let sem = (3.5_f64 / 6.0).sqrt();
        assert!((sigma - sem).abs() < 1e-12);
    }

    #[test]
    fn test_variance_constant_replicates() {
        let var = jackknife_variance(&[2.0, 2.0, 2.0, 2.0], 2.0).unwrap();
        assert_eq!(var, 0.0);
    }

    #[test]
    fn test_variance_empty() {
        assert_eq!(
            jackknife_variance::<f64>(&[], 0.0),
            Err(JackknifeError::InsufficientBins { found: 0 })
        );
    }

    // --- covariance ---

    #[test]
    fn test_covariance_length_mismatch() {
        assert_eq!(
            jackknife_covariance(&[1.0, 2.0], 1.5, &[1.0, 2.0, 3.0], 2.0),
            Err(JackknifeError::DimensionMismatch {
                expected: 2,
                found: 3
            })
        );
    }

    #[test]
    fn test_covariance_anticorrelated() {
        let a = [1.0, 2.0, 3.0];
        let b = [3.0, 2.0, 1.0];
        let cov = jackknife_covariance(&a, 2.0, &b, 2.0).unwrap();
        assert!((cov - (-2.0 * 2.0 / 3.0)).abs() < 1e-12);
    }

    // --- bias ---

    #[test]
    fn test_bias_vanishes_for_mean() {
        let reps = jackknife_replicates(&SIX, 1).unwrap();
        assert!(jackknife_bias(&reps, 3.5).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_bias_of_offset_replicates() {
        // Replicate average 2.5, central value 2.0, N = 4.
        let bias = jackknife_bias(&[2.0, 2.5, 3.0, 2.5], 2.0).unwrap();
        assert!((bias - 1.5).abs() < 1e-12);
    }
}
