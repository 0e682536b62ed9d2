use crate::config::HashConfig;

pub const DEFAULT_SAMPLE_SIZE: u64 = 4 * 1024 * 1024;
pub const DEFAULT_TARGET_COVERAGE: f64 = 0.01;
/// Files below this size always get the minimum plan.
pub const SMALL_FILE_THRESHOLD: u64 = 100 * 1024 * 1024;
pub const MIN_MIDDLE_CHUNKS: u32 = 2;
const MIN_TOTAL_CHUNKS: u64 = 4;

/// Number of middle chunks to sample for a file of `file_size` bytes.
///
/// Small files get a fixed 2 (4 samples in total). Above the threshold the
/// total grows linearly so that at least `target_coverage` of the file is
/// sampled, with first and last taken out of that total.
pub fn middle_chunk_count(file_size: u64, sample_size: u64, target_coverage: f64) -> u32 {
    if file_size < SMALL_FILE_THRESHOLD {
        return MIN_MIDDLE_CHUNKS;
    }
    let wanted = (target_coverage * file_size as f64 / sample_size.max(1) as f64).ceil();
    // Saturating float->int cast keeps absurd coverage targets bounded.
    let total = (wanted as u64).max(MIN_TOTAL_CHUNKS);
    let middle = total - 2;
    u32::try_from(middle).unwrap_or(u32::MAX).max(MIN_MIDDLE_CHUNKS)
}

/// Which byte ranges of a file get sampled. Recomputed on demand, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilePlan {
    pub file_size: u64,
    pub sample_size: u64,
    pub middle_chunks: u32,
}

impl FilePlan {
    pub fn new(file_size: u64, cfg: &HashConfig) -> Self {
        Self {
            file_size,
            sample_size: cfg.sample_size,
            middle_chunks: middle_chunk_count(file_size, cfg.sample_size, cfg.target_coverage),
        }
    }

    /// First + middle + last.
    pub fn total_chunks(&self) -> u32 {
        self.middle_chunks.saturating_add(2)
    }

    /// True when the file is long enough for middle and last chunks that do
    /// not overlap; otherwise only the first chunk is read.
    pub fn samples_past_first(&self) -> bool {
        let span = self.sample_size.saturating_mul(u64::from(self.total_chunks()));
        self.file_size > span
    }

    /// Offsets read, in hashing order.
    pub fn sample_offsets(&self) -> Vec<u64> {
        let mut offsets = vec![0];
        if !self.samples_past_first() {
            return offsets;
        }
        let n = u128::from(self.middle_chunks);
        let size = u128::from(self.file_size);
        offsets.reserve(self.middle_chunks as usize + 1);
        for i in 0..n {
            // (i + 2) / (n + 2) of the way through; always < file_size so fits u64
            offsets.push((size * (i + 2) / (n + 2)) as u64);
        }
        offsets.push(self.file_size.saturating_sub(self.sample_size));
        offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn threshold_boundary() {
        assert_eq!(middle_chunk_count(SMALL_FILE_THRESHOLD - 1, DEFAULT_SAMPLE_SIZE, 1.0), 2);
        // 100 MiB at 1% is a quarter of a chunk, floored to the minimum
        assert_eq!(middle_chunk_count(SMALL_FILE_THRESHOLD, DEFAULT_SAMPLE_SIZE, 0.01), 2);
        // 100 MiB at 100% is 25 chunks
        assert_eq!(middle_chunk_count(SMALL_FILE_THRESHOLD, DEFAULT_SAMPLE_SIZE, 1.0), 23);
    }

    #[test]
    fn ten_gib_at_one_percent() {
        // ceil(0.01 * 10240 MiB / 4 MiB) = ceil(25.6) = 26 total
        assert_eq!(middle_chunk_count(10 * 1024 * MIB, DEFAULT_SAMPLE_SIZE, 0.01), 24);
    }

    #[test]
    fn offsets_spread_and_end_at_tail() {
        let plan = FilePlan { file_size: 64 * 1024, sample_size: 4096, middle_chunks: 2 };
        assert!(plan.samples_past_first());
        assert_eq!(plan.sample_offsets(), vec![0, 32 * 1024, 48 * 1024, 60 * 1024]);
    }

    #[test]
    fn short_file_reads_first_chunk_only() {
        let plan = FilePlan { file_size: 4 * 4096, sample_size: 4096, middle_chunks: 2 };
        assert!(!plan.samples_past_first());
        assert_eq!(plan.sample_offsets(), vec![0]);
    }
}
