use crate::error::{Error, Result};
use crate::plan::{DEFAULT_SAMPLE_SIZE, DEFAULT_TARGET_COVERAGE};

/// Tunables shared by hashing and verification.
///
/// Digests are only comparable between runs that used the same
/// `sample_size` and `target_coverage`.
#[derive(Clone, Debug, PartialEq)]
pub struct HashConfig {
    /// Bytes read per sampled chunk.
    pub sample_size: u64,
    /// Fraction of a large file to sample (0.01 = 1%).
    pub target_coverage: f64,
    /// Worker threads; 0 lets rayon pick one per logical CPU.
    pub jobs: usize,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self { sample_size: DEFAULT_SAMPLE_SIZE, target_coverage: DEFAULT_TARGET_COVERAGE, jobs: 0 }
    }
}

impl HashConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_size == 0 {
            return Err(Error::InvalidConfig("sample size must be non-zero".into()));
        }
        if usize::try_from(self.sample_size).is_err() {
            return Err(Error::InvalidConfig(format!(
                "sample size {} does not fit in memory",
                self.sample_size
            )));
        }
        if !self.target_coverage.is_finite() || self.target_coverage <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "target coverage must be a positive number, got {}",
                self.target_coverage
            )));
        }
        Ok(())
    }

    /// Build the worker pool used by batch hashing and verification.
    pub(crate) fn thread_pool(&self) -> Result<rayon::ThreadPool> {
        Ok(rayon::ThreadPoolBuilder::new().num_threads(self.jobs).build()?)
    }
}
