use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;

use crate::config::HashConfig;
use crate::digest::{digest_file, SampledDigest};
use crate::error::{Error, Result};
use crate::manifest::{DigestRecord, MANIFEST_MAGIC};
use crate::progress::Progress;

/// Per-file result of a hashing run, in the shape reporters consume.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct HashedFile {
    pub filename: String,
    pub filepath: String,
    pub file_size: u64,
    pub fsh24: String,
    pub chunks: u32,
    /// Sampled bytes as a percentage of the file size.
    pub coverage_percent: f64,
    /// Seconds.
    pub processing_time: f64,
    pub bytes_hashed: u64,
}

impl HashedFile {
    fn new(path: &Path, filepath: &str, digest: SampledDigest, processing_time: f64) -> Self {
        let coverage_percent = if digest.file_size > 0 {
            digest.bytes_hashed as f64 / digest.file_size as f64 * 100.0
        } else {
            0.0
        };
        Self {
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| filepath.to_string()),
            filepath: filepath.to_string(),
            file_size: digest.file_size,
            fsh24: digest.hex,
            chunks: digest.chunks,
            coverage_percent,
            processing_time,
            bytes_hashed: digest.bytes_hashed,
        }
    }

    pub fn to_record(&self) -> DigestRecord {
        DigestRecord {
            digest: self.fsh24.clone(),
            chunks: self.chunks,
            size: self.file_size,
            path: self.filepath.clone(),
        }
    }
}

/// One input path and what happened to it.
#[derive(Debug)]
pub struct BatchItem {
    pub path: PathBuf,
    pub outcome: Result<HashedFile>,
}

/// Hash every path in parallel. The returned vector has one slot per input,
/// in input order, whatever order the workers finished in. A failure only
/// fills its own slot.
pub fn hash_all(
    paths: &[PathBuf],
    cfg: &HashConfig,
    progress: &Progress,
) -> Result<Vec<BatchItem>> {
    cfg.validate()?;
    let pool = cfg.thread_pool()?;
    log::info!("hashing {} file(s) on {} thread(s)", paths.len(), pool.current_num_threads());
    progress.set_stage("Hashing");
    progress.set_files_total(paths.len());
    progress.reset_bytes(0);

    let items = pool.install(|| {
        paths
            .par_iter()
            .map(|path| {
                let outcome = hash_one(path, cfg);
                if let Ok(h) = &outcome {
                    progress.add_bytes(h.bytes_hashed);
                }
                progress.inc_file();
                BatchItem { path: path.clone(), outcome }
            })
            .collect::<Vec<_>>()
    });
    Ok(items)
}

fn hash_one(path: &Path, cfg: &HashConfig) -> Result<HashedFile> {
    // Manifest paths are text; a lossy rewrite would never verify.
    let Some(filepath) = path.to_str() else {
        return Err(Error::UnrepresentablePath(path.to_string_lossy().into_owned()));
    };
    let t0 = Instant::now();
    let digest = digest_file(path, cfg).map_err(|e| match e {
        Error::Io { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
            Error::PathNotFound(path)
        }
        other => other,
    })?;
    let elapsed = t0.elapsed().as_secs_f64();
    log::debug!("{}: {} in {:.3}s", path.display(), digest.hex, elapsed);
    Ok(HashedFile::new(path, filepath, digest, elapsed))
}

/// Whole-run report; failed items are logged and left out.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct HashReport {
    pub magic: String,
    pub total_files: usize,
    pub total_processing_time: f64,
    pub average_time_per_file: f64,
    pub total_size: u64,
    pub total_hashed_size: u64,
    pub total_hashed_percentage: f64,
    pub files: Vec<HashedFile>,
}

impl HashReport {
    pub fn from_items(items: Vec<BatchItem>, total_processing_time: f64) -> Self {
        let mut files = Vec::with_capacity(items.len());
        for item in items {
            match item.outcome {
                Ok(h) => files.push(h),
                Err(e) => log::warn!("skipping {}: {}", item.path.display(), e),
            }
        }
        let total_size: u64 = files.iter().map(|f| f.file_size).sum();
        let total_hashed_size: u64 = files.iter().map(|f| f.bytes_hashed).sum();
        Self {
            magic: MANIFEST_MAGIC.to_string(),
            total_files: files.len(),
            total_processing_time,
            average_time_per_file: if files.is_empty() {
                0.0
            } else {
                total_processing_time / files.len() as f64
            },
            total_size,
            total_hashed_size,
            total_hashed_percentage: percentage(total_hashed_size, total_size),
            files,
        }
    }

    /// Manifest records in input order.
    pub fn records(&self) -> Vec<DigestRecord> {
        self.files.iter().map(HashedFile::to_record).collect()
    }
}

pub(crate) fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
