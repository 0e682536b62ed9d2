use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use fsh24_core::batch::{hash_all, HashReport, HashedFile};
use fsh24_core::expand::expand_paths;
use fsh24_core::manifest::{is_manifest_path, save_manifest, DEFAULT_MANIFEST_NAME};
use fsh24_core::plan::{DEFAULT_SAMPLE_SIZE, DEFAULT_TARGET_COVERAGE};
use fsh24_core::progress::Progress;
use fsh24_core::verify::{verify_manifest, Status, VerificationRecord, VerificationSummary};
use fsh24_core::HashConfig;

const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = MIB * 1024.0;

#[derive(Parser)]
#[command(
    name = "fsh24",
    version,
    about = "FSH24 - fast sample-based 24-byte integrity hash",
    after_help = "Examples:\n  fsh24 file.iso\n  fsh24 -r folder/ -o folder.fsh24\n  \
                  fsh24 checksums.fsh24 -v"
)]
struct Cli {
    /// Input file(s) and folder(s), or a single .fsh24 file to verify
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Output file (default: checksums.fsh24; with --json, the report is saved here)
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[arg(short, long)]
    verbose: bool,
    /// Print a JSON report instead of console output
    #[arg(short, long)]
    json: bool,
    /// Recurse into folders
    #[arg(short, long)]
    recursive: bool,
    /// Fraction of large files to sample
    #[arg(long, default_value_t = DEFAULT_TARGET_COVERAGE)]
    coverage: f64,
    /// Bytes per sampled chunk; manifests only match at the size they were made with
    #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
    sample_size: u64,
    /// Worker threads (0 = one per CPU)
    #[arg(long, default_value_t = 0)]
    jobs: usize,
    /// Base directory for relative paths when verifying
    #[arg(long, default_value = ".")]
    root: PathBuf,
    /// Periodic progress on stderr
    #[arg(long, default_value_t = false)]
    progress: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let cfg = HashConfig {
        sample_size: cli.sample_size,
        target_coverage: cli.coverage,
        jobs: cli.jobs,
    };
    cfg.validate()?;

    if cli.inputs.len() == 1 && is_manifest_path(&cli.inputs[0]) {
        verify(&cli, &cfg, &cli.inputs[0])
    } else {
        hash(&cli, &cfg)
    }
}

fn hash(cli: &Cli, cfg: &HashConfig) -> Result<ExitCode> {
    let files = expand_paths(&cli.inputs, cli.recursive)?;
    if files.is_empty() {
        println!("No files found to process.");
        return Ok(ExitCode::FAILURE);
    }

    let prog = Progress::new(cli.progress);
    prog.start();
    let t0 = Instant::now();
    let items = hash_all(&files, cfg, &prog)?;
    prog.stop();
    let report = HashReport::from_items(items, t0.elapsed().as_secs_f64());

    if cli.json {
        let text = serde_json::to_string_pretty(&report)?;
        match &cli.output {
            Some(out) => {
                fs::write(out, text).with_context(|| format!("write {}", out.display()))?;
                println!("JSON saved to: {}", out.display());
            }
            None => println!("{text}"),
        }
        return Ok(exit_for(!report.files.is_empty()));
    }

    for (i, f) in report.files.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print_hashed(f, cli.verbose);
    }
    if report.files.is_empty() {
        bail!("no file could be hashed");
    }

    let (records, skipped): (Vec<_>, Vec<_>) =
        report.records().into_iter().partition(|r| r.is_representable());
    for r in &skipped {
        log::warn!("not written to manifest (path contains '|' or a line break): {}", r.path);
    }
    let out = cli.output.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST_NAME));
    save_manifest(&out, &records).with_context(|| format!("write {}", out.display()))?;

    if report.files.len() > 1 {
        println!(
            "\nProcessed {} files in {:.3}s",
            report.total_files, report.total_processing_time
        );
        println!(
            "Total file size: {} bytes ({:.2} GB)",
            format_number(report.total_size),
            report.total_size as f64 / GIB
        );
        println!(
            "Total hashed size: {} bytes ({:.2} GB)",
            format_number(report.total_hashed_size),
            report.total_hashed_size as f64 / GIB
        );
        println!("Total hash percentage: {:.4}%", report.total_hashed_percentage);
    }
    println!("Hash file saved: {}", out.display());
    Ok(ExitCode::SUCCESS)
}

fn print_hashed(f: &HashedFile, verbose: bool) {
    println!("Processing: {}", f.filename);
    if verbose {
        println!("File size: {}", describe_size(f.file_size));
        println!("FSH24: {}", f.fsh24);
        println!(
            "Chunks: {}, Coverage: {:.4}%, Time: {:.3}s",
            f.chunks, f.coverage_percent, f.processing_time
        );
    } else {
        println!("FSH24: {}", f.fsh24);
    }
}

fn verify(cli: &Cli, cfg: &HashConfig, manifest: &Path) -> Result<ExitCode> {
    let prog = Progress::new(cli.progress);
    prog.start();
    let outcome = verify_manifest(manifest, &cli.root, cfg, &prog)
        .with_context(|| format!("verify {}", manifest.display()))?;
    prog.stop();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        for r in &outcome.results {
            print_verification(r, cli.verbose);
        }
        print_summary(&outcome.summary, cli.verbose);
    }
    Ok(exit_for(outcome.summary.success))
}

fn print_verification(r: &VerificationRecord, verbose: bool) {
    let prefix = if verbose {
        format!("{}|{}|{}", r.expected_hash, r.expected_size, r.filepath)
    } else {
        r.filepath.clone()
    };
    match r.status {
        Status::Verified => println!("{prefix}| Verified ✓"),
        Status::HashMismatch if verbose => println!("{prefix}| HASH MISMATCH ✗"),
        Status::HashMismatch => println!("HASH MISMATCH: {}", r.filepath),
        Status::SizeMismatch => println!(
            "!SIZE MISMATCH: {} (expected: {}, actual: {})",
            r.filepath,
            r.expected_size,
            r.actual_size.unwrap_or_default()
        ),
        Status::Missing => println!("!MISSING: {}", r.filepath),
        Status::HashError => println!(
            "!ERROR: {} during hashing: {}",
            r.filepath,
            r.error.as_deref().unwrap_or("unknown error")
        ),
        Status::InvalidLineFormat => print_invalid("line format", r),
        Status::InvalidChunksValue => print_invalid("chunks value", r),
        Status::InvalidFileSizeValue => print_invalid("file size value", r),
    }
}

fn print_invalid(what: &str, r: &VerificationRecord) {
    println!("Invalid {what} at line {}: {}", r.line, r.line_text.as_deref().unwrap_or_default());
}

fn print_summary(s: &VerificationSummary, verbose: bool) {
    if !verbose {
        println!("Verification: {} verified, {} failed", s.verified, s.failed);
        return;
    }
    println!("\nVerification complete: {} verified, {} failed", s.verified, s.failed);
    println!("Total time: {:.3}s", s.total_time);
    if s.total > 0 {
        println!("Average time per file: {:.3}s", s.average_time_per_file);
    }
    println!(
        "Total file size: {} bytes ({:.2} GB)",
        format_number(s.total_size),
        s.total_size as f64 / GIB
    );
    println!(
        "Total hashed size: {} bytes ({:.2} GB)",
        format_number(s.total_hashed_size),
        s.total_hashed_size as f64 / GIB
    );
    println!("Total hash percentage: {:.4}%", s.total_hashed_percentage);
}

fn exit_for(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn describe_size(n: u64) -> String {
    if (n as f64) < GIB {
        format!("{} bytes ({:.1} MB)", format_number(n), n as f64 / MIB)
    } else {
        format!("{} bytes ({:.1} GB)", format_number(n), n as f64 / GIB)
    }
}

/// 1234567 -> "1,234,567"
fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_separators() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(100_000), "100,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn size_switches_to_gb() {
        assert_eq!(describe_size(10), "10 bytes (0.0 MB)");
        assert_eq!(describe_size(1 << 30), "1,073,741,824 bytes (1.0 GB)");
    }

    #[test]
    fn cli_shape_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
