use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use blake2::digest::{Update, VariableOutput};
use blake2::Blake2bVar;

use crate::config::HashConfig;
use crate::error::{Error, Result};
use crate::plan::FilePlan;

/// Digest length in bytes (48 hex characters).
pub const DIGEST_LEN: usize = 24;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampledDigest {
    /// Uppercase hex, always `2 * DIGEST_LEN` characters.
    pub hex: String,
    pub chunks: u32,
    pub file_size: u64,
    /// File bytes fed to the hash, not counting the trailing size field.
    pub bytes_hashed: u64,
}

/// Streaming BLAKE2b with a 24-byte output length.
struct Hasher {
    inner: Blake2bVar,
    fed: u64,
}

impl Hasher {
    fn new() -> Result<Self> {
        let inner = Blake2bVar::new(DIGEST_LEN).map_err(|e| Error::HashInit(e.to_string()))?;
        Ok(Self { inner, fed: 0 })
    }

    fn sample(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
        self.fed += bytes.len() as u64;
    }

    fn finish(mut self, file_size: u64) -> Result<(String, u64)> {
        // Binds the digest to the exact length, so truncation always shows.
        self.inner.update(&file_size.to_be_bytes());
        let mut out = [0u8; DIGEST_LEN];
        self.inner.finalize_variable(&mut out).map_err(|e| Error::HashInit(e.to_string()))?;
        Ok((hex::encode_upper(out), self.fed))
    }
}

/// Compute the sampled digest of the file at `path`.
///
/// Reads the first chunk, then (when the file is long enough for them not to
/// overlap) the evenly spread middle chunks and the last chunk, and finally
/// folds in the file size as 8 big-endian bytes.
pub fn digest_file(path: &Path, cfg: &HashConfig) -> Result<SampledDigest> {
    cfg.validate()?;
    let mut f = File::open(path).map_err(|e| Error::io(path, e))?;
    let file_size = f.metadata().map_err(|e| Error::io(path, e))?.len();
    let plan = FilePlan::new(file_size, cfg);
    log::debug!(
        "{}: {} bytes, {} chunks planned, distinct samples: {}",
        path.display(),
        file_size,
        plan.total_chunks(),
        plan.samples_past_first()
    );

    let mut hasher = Hasher::new()?;
    let mut buf = Vec::with_capacity(cfg.sample_size.min(file_size) as usize);
    for offset in plan.sample_offsets() {
        f.seek(SeekFrom::Start(offset)).map_err(|e| Error::io(path, e))?;
        read_sample(&mut f, cfg.sample_size, &mut buf).map_err(|e| Error::io(path, e))?;
        hasher.sample(&buf);
    }
    let (hex, bytes_hashed) = hasher.finish(file_size)?;
    Ok(SampledDigest { hex, chunks: plan.total_chunks(), file_size, bytes_hashed })
}

/// Fill `buf` with up to `len` bytes, stopping early only at EOF.
fn read_sample(f: &mut File, len: u64, buf: &mut Vec<u8>) -> std::io::Result<()> {
    buf.clear();
    f.take(len).read_to_end(buf)?;
    Ok(())
}

/// Case-insensitive comparison of two hex digests.
pub fn digests_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
