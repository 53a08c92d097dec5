//! Store-wide resampling configuration.
//!
//! A [`JackknifeConfig`] is fixed when an analyzer is created and never
//! changes afterwards. It holds the number of consecutive raw samples that
//! form one omission unit and the policy for raw series whose length is not a
//! multiple of that size.

use std::num::NonZeroUsize;

use crate::error::{JackknifeError, Result};

/// What to do with raw samples left over after the last full bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemainderPolicy {
    /// Accept the series. Leftover samples count towards the mean and
    /// towards every replicate, but no bin ever omits them.
    #[default]
    Keep,
    /// Refuse the series with [`JackknifeError::IndivisibleLength`].
    Reject,
}

/// Resampling parameters shared by every dataset of one analyzer.
///
/// # Examples
/// ```
/// use u_jackknife::{JackknifeConfig, RemainderPolicy};
///
/// let config = JackknifeConfig::new(4)
///     .unwrap()
///     .with_remainder_policy(RemainderPolicy::Reject);
/// assert_eq!(config.bin_size(), 4);
/// assert_eq!(config.remainder_policy(), RemainderPolicy::Reject);
///
/// assert!(JackknifeConfig::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JackknifeConfig {
    bin_size: NonZeroUsize,
    remainder: RemainderPolicy,
}

impl JackknifeConfig {
    /// Creates a configuration omitting `bin_size` consecutive samples per
    /// replicate. A value of 1 is the classic leave-one-out jackknife.
    ///
    /// # Errors
    /// Returns [`JackknifeError::InvalidBinSize`] if `bin_size` is zero.
    pub fn new(bin_size: usize) -> Result<Self> {
        let bin_size = NonZeroUsize::new(bin_size).ok_or(JackknifeError::InvalidBinSize)?;
        Ok(Self {
            bin_size,
            remainder: RemainderPolicy::default(),
        })
    }

    pub fn with_remainder_policy(mut self, remainder: RemainderPolicy) -> Self {
        self.remainder = remainder;
        self
    }

    pub fn bin_size(&self) -> usize {
        self.bin_size.get()
    }

    pub fn remainder_policy(&self) -> RemainderPolicy {
        self.remainder
    }

    /// Number of bins a raw series of `len` samples splits into.
    ///
    /// # Errors
    /// Returns [`JackknifeError::IndivisibleLength`] when samples are left
    /// over and the policy is [`RemainderPolicy::Reject`].
    pub(crate) fn bins_for(&self, len: usize) -> Result<usize> {
        let bin_size = self.bin_size();
        if self.remainder == RemainderPolicy::Reject && len % bin_size != 0 {
            return Err(JackknifeError::IndivisibleLength { len, bin_size });
        }
        Ok(len / bin_size)
    }
}

impl Default for JackknifeConfig {
    fn default() -> Self {
        Self {
            bin_size: NonZeroUsize::MIN,
            remainder: RemainderPolicy::Keep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_leave_one_out() {
        let config = JackknifeConfig::default();
        assert_eq!(config.bin_size(), 1);
        assert_eq!(config.remainder_policy(), RemainderPolicy::Keep);
    }

    #[test]
    fn test_zero_bin_size_rejected() {
        assert_eq!(JackknifeConfig::new(0), Err(JackknifeError::InvalidBinSize));
    }

    #[test]
    fn test_bins_for_keep_truncates() {
        let config = JackknifeConfig::new(3).unwrap();
        assert_eq!(config.bins_for(10), Ok(3));
        assert_eq!(config.bins_for(9), Ok(3));
        assert_eq!(config.bins_for(2), Ok(0));
    }

    #[test]
    fn test_bins_for_reject() {
        let config = JackknifeConfig::new(3)
            .unwrap()
            .with_remainder_policy(RemainderPolicy::Reject);
        assert_eq!(config.bins_for(9), Ok(3));
        assert_eq!(
            config.bins_for(10),
            Err(JackknifeError::IndivisibleLength {
                len: 10,
                bin_size: 3
            })
        );
    }
}
