use std::fs;
use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;

use crate::batch::percentage;
use crate::config::HashConfig;
use crate::digest::{digest_file, digests_match};
use crate::error::Result;
use crate::manifest::{load_manifest, DigestRecord, LineIssue, LineIssueKind, ManifestEntry};
use crate::plan::FilePlan;
use crate::progress::Progress;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Verified,
    HashMismatch,
    SizeMismatch,
    Missing,
    HashError,
    InvalidLineFormat,
    InvalidChunksValue,
    InvalidFileSizeValue,
}

impl Status {
    pub fn is_ok(self) -> bool {
        self == Status::Verified
    }
}

impl From<LineIssueKind> for Status {
    fn from(kind: LineIssueKind) -> Self {
        match kind {
            LineIssueKind::InvalidLineFormat => Status::InvalidLineFormat,
            LineIssueKind::InvalidChunksValue => Status::InvalidChunksValue,
            LineIssueKind::InvalidFileSizeValue => Status::InvalidFileSizeValue,
        }
    }
}

/// Outcome for one manifest line.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct VerificationRecord {
    pub line: usize,
    pub filepath: String,
    pub filename: String,
    pub expected_hash: String,
    pub expected_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_hash: Option<String>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
    /// File bytes actually read for this record.
    pub hashed_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Raw text of a line that did not parse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_text: Option<String>,
}

impl VerificationRecord {
    fn pending(line: usize, record: &DigestRecord) -> Self {
        Self {
            line,
            filepath: record.path.clone(),
            filename: file_name_of(&record.path),
            expected_hash: record.digest.clone(),
            expected_size: record.size,
            actual_size: None,
            actual_hash: None,
            status: Status::Missing,
            processing_time: None,
            hashed_size: 0,
            error: None,
            line_text: None,
        }
    }

    fn from_issue(issue: &LineIssue) -> Self {
        let (expected_hash, filepath) = match issue.fields() {
            Some([digest, _, _, path]) => (digest.to_string(), path.to_string()),
            None => (String::new(), String::new()),
        };
        let expected_size =
            issue.fields().and_then(|[_, _, size, _]| size.parse().ok()).unwrap_or(0);
        Self {
            line: issue.line,
            filename: file_name_of(&filepath),
            filepath,
            expected_hash,
            expected_size,
            actual_size: None,
            actual_hash: None,
            status: issue.kind.into(),
            processing_time: None,
            hashed_size: 0,
            error: None,
            line_text: Some(issue.text.clone()),
        }
    }
}

fn file_name_of(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Check one record against the file on disk:
/// missing, then size (no hashing on mismatch), then the sampled digest.
pub fn verify_record(
    line: usize,
    record: &DigestRecord,
    root: &Path,
    cfg: &HashConfig,
) -> VerificationRecord {
    let mut out = VerificationRecord::pending(line, record);
    let path = root.join(&record.path);

    let meta = match fs::metadata(&path) {
        Ok(m) => m,
        Err(e) => {
            log::debug!("{}: stat failed: {}", path.display(), e);
            out.status = Status::Missing;
            return out;
        }
    };
    let actual_size = meta.len();
    out.actual_size = Some(actual_size);
    if actual_size != record.size {
        out.status = Status::SizeMismatch;
        return out;
    }

    let t0 = Instant::now();
    let result = digest_file(&path, cfg);
    out.processing_time = Some(t0.elapsed().as_secs_f64());
    match result {
        Ok(d) => {
            out.hashed_size = d.bytes_hashed;
            out.status = if digests_match(&d.hex, &record.digest) {
                Status::Verified
            } else {
                Status::HashMismatch
            };
            out.actual_hash = Some(d.hex);
        }
        Err(e) => {
            out.status = Status::HashError;
            out.error = Some(e.to_string());
        }
    }
    out
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct VerificationSummary {
    pub verified: usize,
    pub failed: usize,
    pub total: usize,
    pub success: bool,
    pub total_time: f64,
    pub average_time_per_file: f64,
    pub total_size: u64,
    pub total_hashed_size: u64,
    pub total_hashed_percentage: f64,
}

impl VerificationSummary {
    /// Aggregate after every record reached its terminal state.
    pub fn from_results(results: &[VerificationRecord], total_time: f64) -> Self {
        let verified = results.iter().filter(|r| r.status.is_ok()).count();
        let total = results.len();
        let failed = total - verified;
        let total_size: u64 =
            results.iter().map(|r| r.actual_size.unwrap_or(r.expected_size)).sum();
        let total_hashed_size: u64 = results.iter().map(|r| r.hashed_size).sum();
        Self {
            verified,
            failed,
            total,
            success: failed == 0,
            total_time,
            average_time_per_file: if total > 0 { total_time / total as f64 } else { 0.0 },
            total_size,
            total_hashed_size,
            total_hashed_percentage: percentage(total_hashed_size, total_size),
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct VerifyOutcome {
    pub summary: VerificationSummary,
    pub results: Vec<VerificationRecord>,
}

/// Verify parsed entries in parallel; one result per entry, in manifest order.
pub fn verify_entries(
    entries: &[ManifestEntry],
    root: &Path,
    cfg: &HashConfig,
    progress: &Progress,
) -> Result<VerifyOutcome> {
    cfg.validate()?;
    let pool = cfg.thread_pool()?;
    let t0 = Instant::now();

    progress.set_stage("Verifying");
    progress.set_files_total(entries.len());
    let planned: u64 = entries
        .iter()
        .filter_map(ManifestEntry::record)
        .map(|r| planned_bytes(r.size, cfg))
        .sum();
    progress.reset_bytes(planned);

    let results = pool.install(|| {
        entries
            .par_iter()
            .map(|entry| {
                let rec = match entry {
                    ManifestEntry::Record { line, record } => {
                        verify_record(*line, record, root, cfg)
                    }
                    ManifestEntry::Invalid(issue) => VerificationRecord::from_issue(issue),
                };
                progress.add_bytes(rec.hashed_size);
                progress.inc_file();
                rec
            })
            .collect::<Vec<_>>()
    });

    let summary = VerificationSummary::from_results(&results, t0.elapsed().as_secs_f64());
    log::info!(
        "verification finished: {} verified, {} failed",
        summary.verified,
        summary.failed
    );
    Ok(VerifyOutcome { summary, results })
}

/// Load the manifest at `manifest_path` and verify it. Relative paths in the
/// manifest resolve against `root`. An unreadable manifest or bad magic
/// aborts the run.
pub fn verify_manifest(
    manifest_path: &Path,
    root: &Path,
    cfg: &HashConfig,
    progress: &Progress,
) -> Result<VerifyOutcome> {
    let entries = load_manifest(manifest_path)?;
    verify_entries(&entries, root, cfg, progress)
}

/// Bytes the engine will read for a file of `size` bytes.
fn planned_bytes(size: u64, cfg: &HashConfig) -> u64 {
    let plan = FilePlan::new(size, cfg);
    if plan.samples_past_first() {
        // every read is a full sample once the file outgrows the plan
        u64::from(plan.total_chunks()) * cfg.sample_size
    } else {
        size.min(cfg.sample_size)
    }
}

