//! Keyed jackknife store with error propagation through derived quantities.
//!
//! A [`JackknifeAnalyzer`] holds any number of datasets measured on the same
//! ensemble. Each dataset is kept as a central value plus one replicate per
//! bin, and replicate `i` of every dataset omits the same block of raw
//! samples. That shared binning is what lets an arbitrary function of
//! several datasets be evaluated replicate by replicate, carrying the
//! correlations between its arguments into the derived error.
//!
//! # Lifecycle
//!
//! Datasets enter the store in three ways:
//!
//! - [`resample`](JackknifeAnalyzer::resample) bins a raw series,
//! - [`add_resampled`](JackknifeAnalyzer::add_resampled) stores replicates
//!   computed elsewhere,
//! - [`add_function`](JackknifeAnalyzer::add_function) derives a dataset
//!   from stored ones.
//!
//! The first dataset fixes the bin count for the lifetime of the store.
//! Adding a key that is already present does nothing and returns `Ok(false)`.
//! Datasets are never modified in place; [`remove`](JackknifeAnalyzer::remove)
//! drops one without touching anything derived from it.

use std::collections::BTreeMap;
use std::fmt::{self, Debug, Display};

use tracing::{debug, trace, warn};

use crate::config::JackknifeConfig;
use crate::error::{JackknifeError, Result};
use crate::stats::{self, Sample};

/// Central value and jackknife error of one stored quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate<T> {
    pub mean: T,
    pub error: T,
}

impl<T: Display> Display for Estimate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ± {}", self.mean, self.error)
    }
}

/// Mean and replicates are stored together so a key always has both.
#[derive(Debug, Clone, PartialEq)]
struct Dataset<T> {
    mean: T,
    replicates: Vec<T>,
}

/// Store of jackknife-resampled datasets sharing one binning.
///
/// `K` names datasets, `T` is the floating-point sample type.
///
/// # Examples
/// ```
/// use u_jackknife::JackknifeAnalyzer;
///
/// let mut jk = JackknifeAnalyzer::new(1).unwrap();
/// jk.resample("x", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
/// jk.resample("y", &[2.0, 2.5, 3.5, 3.0, 4.5, 5.5]).unwrap();
///
/// // Ratio of two correlated measurements.
/// jk.add_function("x/y", |v: &[f64]| v[0] / v[1], &["x", "y"]).unwrap();
///
/// assert_eq!(jk.mu(&"x").unwrap(), 3.5);
/// assert!((jk.mu(&"x/y").unwrap() - 3.5 / 3.5).abs() < 1e-12);
/// let est = jk.jackknife(&"x/y").unwrap();
/// assert!(est.error > 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct JackknifeAnalyzer<K, T> {
    config: JackknifeConfig,
    bin_count: Option<usize>,
    datasets: BTreeMap<K, Dataset<T>>,
}

impl<K: Ord + Clone + Debug, T: Sample> JackknifeAnalyzer<K, T> {
    /// Creates an empty analyzer omitting `bin_size` consecutive raw samples
    /// per replicate.
    ///
    /// # Errors
    /// Returns [`JackknifeError::InvalidBinSize`] if `bin_size` is zero.
    pub fn new(bin_size: usize) -> Result<Self> {
        Ok(Self::with_config(JackknifeConfig::new(bin_size)?))
    }

    pub fn with_config(config: JackknifeConfig) -> Self {
        Self {
            config,
            bin_count: None,
            datasets: BTreeMap::new(),
        }
    }

    /// Creates an analyzer and resamples `samples` under `key`.
    ///
    /// # Errors
    /// Fails like [`new`](Self::new) and [`resample`](Self::resample).
    pub fn from_samples(key: K, samples: &[T], bin_size: usize) -> Result<Self> {
        let mut analyzer = Self::new(bin_size)?;
        analyzer.resample(key, samples)?;
        Ok(analyzer)
    }

    pub fn config(&self) -> &JackknifeConfig {
        &self.config
    }

    pub fn bin_size(&self) -> usize {
        self.config.bin_size()
    }

    /// Number of replicates per dataset, once the first dataset fixed it.
    pub fn bin_count(&self) -> Option<usize> {
        self.bin_count
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.datasets.contains_key(key)
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Bins the raw series `samples` and stores its mean and delete-one-bin
    /// replicates under `key`.
    ///
    /// The series splits into `samples.len() / bin_size` bins. The mean runs
    /// over every sample. Samples after the last full bin are handled by the
    /// store's [`RemainderPolicy`](crate::RemainderPolicy).
    ///
    /// Returns `Ok(false)` without doing anything if `key` is already stored.
    ///
    /// # Errors
    /// - [`JackknifeError::InsufficientBins`] if this is the first dataset
    ///   and it yields fewer than two bins.
    /// - [`JackknifeError::DimensionMismatch`] if the bin count differs from
    ///   the one already fixed.
    /// - [`JackknifeError::IndivisibleLength`] under
    ///   [`RemainderPolicy::Reject`](crate::RemainderPolicy::Reject).
    pub fn resample(&mut self, key: K, samples: &[T]) -> Result<bool> {
        if self.contains(&key) {
            trace!(key = ?key, "dataset already stored, skipping resample");
            return Ok(false);
        }

        let bin_size = self.bin_size();
        let num_bins = self.config.bins_for(samples.len())?;
        self.check_bin_count(num_bins)?;

        let remainder = samples.len() % bin_size;
        if remainder != 0 {
            warn!(
                key = ?key,
                len = samples.len(),
                bin_size,
                remainder,
                "trailing samples are never omitted"
            );
        }

        let dataset = Dataset {
            mean: stats::mean(samples)?,
            replicates: stats::jackknife_replicates(samples, bin_size)?,
        };
        debug!(key = ?key, len = samples.len(), bins = num_bins, "resampled raw dataset");
        self.insert(key, dataset);
        Ok(true)
    }

    /// Stores replicates computed elsewhere together with their central value.
    ///
    /// The mean has to be supplied because for a nonlinear quantity it is not
    /// the average of its replicates. `replicates` must already hold one
    /// entry per bin; the bin size plays no part in the check.
    ///
    /// Returns `Ok(false)` without doing anything if `key` is already stored.
    ///
    /// # Errors
    /// - [`JackknifeError::InsufficientBins`] if this is the first dataset
    ///   and it has fewer than two replicates.
    /// - [`JackknifeError::DimensionMismatch`] if the replicate count differs
    ///   from the bin count already fixed.
    pub fn add_resampled(&mut self, key: K, replicates: Vec<T>, mean: T) -> Result<bool> {
        if self.contains(&key) {
            trace!(key = ?key, "dataset already stored, skipping replicates");
            return Ok(false);
        }
        self.check_bin_count(replicates.len())?;

        debug!(key = ?key, bins = replicates.len(), "stored resampled dataset");
        self.insert(key, Dataset { mean, replicates });
        Ok(true)
    }

    /// Derives a dataset from stored ones by applying `f` to their values.
    ///
    /// `f` receives the argument values in the order of `arg_keys`. It is
    /// first called once with the means to produce the new mean, then once
    /// per bin with the matching replicates. `f` is expected to be pure.
    ///
    /// A function without arguments yields a constant dataset with zero
    /// error.
    ///
    /// Returns `Ok(false)` without doing anything if `key` is already stored.
    ///
    /// # Errors
    /// - [`JackknifeError::UnknownKey`] if any of `arg_keys` is not stored.
    /// - [`JackknifeError::Uninitialized`] if `arg_keys` is empty and no
    ///   dataset has fixed the bin count yet.
    pub fn add_function<F>(&mut self, key: K, mut f: F, arg_keys: &[K]) -> Result<bool>
    where
        F: FnMut(&[T]) -> T,
    {
        if self.contains(&key) {
            trace!(key = ?key, "dataset already stored, skipping function");
            return Ok(false);
        }
        let args = self.arguments(arg_keys)?;
        let bins = self.bin_count.ok_or(JackknifeError::Uninitialized)?;

        let mut values: Vec<T> = args.iter().map(|d| d.mean).collect();
        let mean = f(&values);

        let mut replicates = Vec::with_capacity(bins);
        for i in 0..bins {
            values.clear();
            values.extend(args.iter().map(|d| d.replicates[i]));
            replicates.push(f(&values));
        }

        debug!(key = ?key, args = ?arg_keys, bins, "derived dataset");
        self.insert(key, Dataset { mean, replicates });
        Ok(true)
    }

    /// Fixed-arity form of [`add_function`](Self::add_function).
    ///
    /// `f` takes its arguments as an array, which lets closures destructure
    /// them by name. Results are identical to the slice form.
    ///
    /// # Examples
    /// ```
    /// use u_jackknife::JackknifeAnalyzer;
    ///
    /// let mut jk = JackknifeAnalyzer::new(1).unwrap();
    /// jk.resample(0, &[1.0, 2.0, 3.0, 4.0]).unwrap();
    /// jk.resample(1, &[4.0, 3.0, 2.0, 1.0]).unwrap();
    /// jk.add_function_n(2, |[a, b]: [f64; 2]| a * b, [0, 1]).unwrap();
    /// assert_eq!(jk.mu(&2).unwrap(), 2.5 * 2.5);
    /// ```
    ///
    /// # Errors
    /// Same as [`add_function`](Self::add_function).
    pub fn add_function_n<F, const N: usize>(
        &mut self,
        key: K,
        mut f: F,
        arg_keys: [K; N],
    ) -> Result<bool>
    where
        F: FnMut([T; N]) -> T,
    {
        if self.contains(&key) {
            trace!(key = ?key, "dataset already stored, skipping function");
            return Ok(false);
        }
        let args = self.arguments(&arg_keys)?;
        let bins = self.bin_count.ok_or(JackknifeError::Uninitialized)?;

        let mean = f(std::array::from_fn(|j| args[j].mean));
        let replicates = (0..bins)
            .map(|i| f(std::array::from_fn(|j| args[j].replicates[i])))
            .collect();

        debug!(key = ?key, args = ?arg_keys, bins, "derived dataset");
        self.insert(key, Dataset { mean, replicates });
        Ok(true)
    }

    /// Removes `key` and its replicates. Datasets derived from it keep their
    /// values. Returns whether anything was removed.
    pub fn remove(&mut self, key: &K) -> bool {
        let removed = self.datasets.remove(key).is_some();
        if removed {
            trace!(key = ?key, "removed dataset");
        }
        removed
    }

    /// All stored keys in ascending order.
    pub fn keys(&self) -> Vec<K> {
        self.datasets.keys().cloned().collect()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Central value of `key`.
    ///
    /// # Errors
    /// Returns [`JackknifeError::UnknownKey`] if `key` is not stored.
    pub fn mu(&self, key: &K) -> Result<T> {
        self.dataset(key).map(|d| d.mean)
    }

    /// Jackknife standard error `sqrt((N−1)/N · Σ (θ_i − θ̂)²)` of `key`.
    ///
    /// # Errors
    /// Returns [`JackknifeError::UnknownKey`] if `key` is not stored.
    pub fn sigma(&self, key: &K) -> Result<T> {
        let d = self.dataset(key)?;
        stats::jackknife_error(&d.replicates, d.mean)
    }

    /// Mean and error of `key` in one call.
    ///
    /// # Errors
    /// Returns [`JackknifeError::UnknownKey`] if `key` is not stored.
    pub fn estimate(&self, key: &K) -> Result<Estimate<T>> {
        let d = self.dataset(key)?;
        Ok(Estimate {
            mean: d.mean,
            error: stats::jackknife_error(&d.replicates, d.mean)?,
        })
    }

    /// Mean and error of `key`, or `None` if it is not stored.
    pub fn jackknife(&self, key: &K) -> Option<Estimate<T>> {
        self.estimate(key).ok()
    }

    /// Copy of the replicates of `key`.
    ///
    /// # Errors
    /// Returns [`JackknifeError::UnknownKey`] if `key` is not stored.
    pub fn samples(&self, key: &K) -> Result<Vec<T>> {
        self.dataset(key).map(|d| d.replicates.clone())
    }

    /// Jackknife covariance of two stored quantities.
    ///
    /// `covariance(k, k)` is `sigma(k)²`.
    ///
    /// # Errors
    /// Returns [`JackknifeError::UnknownKey`] if either key is not stored.
    pub fn covariance(&self, a: &K, b: &K) -> Result<T> {
        let da = self.dataset(a)?;
        let db = self.dataset(b)?;
        stats::jackknife_covariance(&da.replicates, da.mean, &db.replicates, db.mean)
    }

    /// Jackknife estimate of the bias of `mu(key)`.
    ///
    /// # Errors
    /// Returns [`JackknifeError::UnknownKey`] if `key` is not stored.
    pub fn bias(&self, key: &K) -> Result<T> {
        let d = self.dataset(key)?;
        stats::jackknife_bias(&d.replicates, d.mean)
    }

    /// `mu(key)` with the jackknife bias estimate subtracted.
    ///
    /// # Errors
    /// Returns [`JackknifeError::UnknownKey`] if `key` is not stored.
    pub fn bias_corrected(&self, key: &K) -> Result<T> {
        let d = self.dataset(key)?;
        Ok(d.mean - stats::jackknife_bias(&d.replicates, d.mean)?)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn dataset(&self, key: &K) -> Result<&Dataset<T>> {
        self.datasets
            .get(key)
            .ok_or_else(|| JackknifeError::unknown_key(key))
    }

    fn arguments(&self, keys: &[K]) -> Result<Vec<&Dataset<T>>> {
        keys.iter().map(|k| self.dataset(k)).collect()
    }

    /// Validates a dataset's bin count against the store without mutating it.
    fn check_bin_count(&self, found: usize) -> Result<()> {
        match self.bin_count {
            Some(expected) if expected != found => {
                Err(JackknifeError::DimensionMismatch { expected, found })
            }
            Some(_) => Ok(()),
            None if found < 2 => Err(JackknifeError::InsufficientBins { found }),
            None => Ok(()),
        }
    }

    /// Stores a validated dataset, fixing the bin count on first use.
    fn insert(&mut self, key: K, dataset: Dataset<T>) {
        if self.bin_count.is_none() {
            debug!(bins = dataset.replicates.len(), "bin count established");
            self.bin_count = Some(dataset.replicates.len());
        }
        self.datasets.insert(key, dataset);
    }
}

impl<K: Ord + Clone + Debug, T: Sample> Default for JackknifeAnalyzer<K, T> {
    fn default() -> Self {
        Self::with_config(JackknifeConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        // --- n bins, mean over every sample ---
        #[test]
        fn resample_shape_and_mean(
            bins in 2_usize..40,
            bin_size in 1_usize..5,
            seed in proptest::collection::vec(-1e3_f64..1e3, 200),
        ) {
            let data = &seed[..bins * bin_size];
            let jk = JackknifeAnalyzer::from_samples(0, data, bin_size).unwrap();
            prop_assert_eq!(jk.bin_count(), Some(bins));
            prop_assert_eq!(jk.samples(&0).unwrap().len(), bins);
            let m = data.iter().sum::<f64>() / data.len() as f64;
            prop_assert!((jk.mu(&0).unwrap() - m).abs() < 1e-9 * m.abs().max(1.0));
        }

        // --- sigma follows the closed form ---
        #[test]
        fn sigma_closed_form(data in proptest::collection::vec(-1e3_f64..1e3, 2..=100)) {
            let jk = JackknifeAnalyzer::from_samples(0, &data, 1).unwrap();
            let mu = jk.mu(&0).unwrap();
            let reps = jk.samples(&0).unwrap();
            let n = reps.len() as f64;
            let ss: f64 = reps.iter().map(|r| (r - mu) * (r - mu)).sum();
            let expected = ((n - 1.0) / n * ss).sqrt();
            let sigma = jk.sigma(&0).unwrap();
            prop_assert!((sigma - expected).abs() < 1e-9 * expected.max(1.0));
        }

        // --- linear combination propagates replicate-wise ---
        #[test]
        fn linear_function_propagates(
            pairs in proptest::collection::vec((-1e3_f64..1e3, -1e3_f64..1e3), 2..=60),
            a in -10.0_f64..10.0,
            b in -10.0_f64..10.0,
        ) {
            let (xs, ys): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
            let mut jk = JackknifeAnalyzer::new(1).unwrap();
            jk.resample("x", &xs).unwrap();
            jk.resample("y", &ys).unwrap();
            jk.add_function_n("f", |[x, y]: [f64; 2]| a * x + b * y, ["x", "y"]).unwrap();

            let mu = a * jk.mu(&"x").unwrap() + b * jk.mu(&"y").unwrap();
            prop_assert!((jk.mu(&"f").unwrap() - mu).abs() < 1e-9 * mu.abs().max(1.0));

            // var(aX + bY) = a² var X + b² var Y + 2ab cov(X, Y)
            let var = a * a * jk.covariance(&"x", &"x").unwrap()
                + b * b * jk.covariance(&"y", &"y").unwrap()
                + 2.0 * a * b * jk.covariance(&"x", &"y").unwrap();
            let sigma = jk.sigma(&"f").unwrap();
            prop_assert!((sigma * sigma - var).abs() < 1e-6 * var.abs().max(1.0));
        }

        // --- mismatched second dataset changes nothing ---
        #[test]
        fn mismatch_is_atomic(
            first in 2_usize..30,
            second in 0_usize..30,
        ) {
            prop_assume!(first != second);
            let mut jk = JackknifeAnalyzer::new(1).unwrap();
            jk.resample("a", &vec![1.0; first]).unwrap();
            prop_assert!(jk.resample("b", &vec![1.0; second]).is_err());
            prop_assert_eq!(jk.bin_count(), Some(first));
            prop_assert_eq!(jk.keys(), vec!["a"]);
        }
    }
}
