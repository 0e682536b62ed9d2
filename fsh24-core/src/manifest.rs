//! Line-oriented `.fsh24` manifest:
//!
//! ```text
//! FSH24-1
//! <48-hex-digest>|<chunk-count>|<file-size-bytes>|<path>
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};

pub const MANIFEST_MAGIC: &str = "FSH24-1";
/// Readers accept any first line starting with this.
pub const MAGIC_PREFIX: &str = "FSH24";
pub const DEFAULT_MANIFEST_NAME: &str = "checksums.fsh24";
pub const MANIFEST_EXTENSION: &str = "fsh24";

/// One manifest line. `chunks` is informational only; verification
/// recomputes its own plan.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct DigestRecord {
    pub digest: String,
    pub chunks: u32,
    pub size: u64,
    pub path: String,
}

impl DigestRecord {
    /// Paths are written verbatim, so `|` and line breaks cannot round-trip.
    pub fn is_representable(&self) -> bool {
        !self.path.contains(&['|', '\n', '\r'][..])
    }

    pub fn to_line(&self) -> String {
        format!("{}|{}|{}|{}", self.digest.to_uppercase(), self.chunks, self.size, self.path)
    }
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LineIssueKind {
    InvalidLineFormat,
    InvalidChunksValue,
    InvalidFileSizeValue,
}

/// A manifest line that could not be turned into a record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineIssue {
    /// 1-based line number within the manifest.
    pub line: usize,
    pub text: String,
    pub kind: LineIssueKind,
}

impl LineIssue {
    /// The four fields, when the line had the right shape.
    pub fn fields(&self) -> Option<[&str; 4]> {
        let mut it = self.text.split('|');
        let f = [it.next()?, it.next()?, it.next()?, it.next()?];
        it.next().is_none().then_some(f)
    }
}

/// A parsed line together with its 1-based line number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ManifestEntry {
    Record { line: usize, record: DigestRecord },
    Invalid(LineIssue),
}

impl ManifestEntry {
    pub fn line(&self) -> usize {
        match self {
            ManifestEntry::Record { line, .. } => *line,
            ManifestEntry::Invalid(issue) => issue.line,
        }
    }

    pub fn record(&self) -> Option<&DigestRecord> {
        match self {
            ManifestEntry::Record { record, .. } => Some(record),
            ManifestEntry::Invalid(_) => None,
        }
    }
}

pub fn write_manifest<W: Write>(mut w: W, records: &[DigestRecord]) -> Result<()> {
    if let Some(bad) = records.iter().find(|r| !r.is_representable()) {
        return Err(Error::UnrepresentablePath(bad.path.clone()));
    }
    let sink = |e| Error::io("<manifest>", e);
    writeln!(w, "{MANIFEST_MAGIC}").map_err(sink)?;
    for r in records {
        writeln!(w, "{}", r.to_line()).map_err(sink)?;
    }
    w.flush().map_err(sink)
}

/// Write `records` to a new manifest file at `path`, replacing any existing one.
pub fn save_manifest(path: &Path, records: &[DigestRecord]) -> Result<()> {
    let f = File::create(path).map_err(|e| Error::io(path, e))?;
    write_manifest(BufWriter::new(f), records).map_err(|e| match e {
        Error::Io { source, .. } => Error::io(path, source),
        other => other,
    })
}

/// Parse a manifest. Bad magic is fatal; bad record lines come back as
/// [`ManifestEntry::Invalid`] and parsing carries on.
pub fn parse_manifest<R: BufRead>(reader: R) -> Result<Vec<ManifestEntry>> {
    // Split on raw bytes so one undecodable path cannot sink the whole file.
    let mut lines = reader
        .split(b'\n')
        .map(|l| l.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()));
    let header = match lines.next() {
        Some(l) => l.map_err(|e| Error::io("<manifest>", e))?,
        None => return Err(Error::Format("empty file".into())),
    };
    if !header.trim().starts_with(MAGIC_PREFIX) {
        return Err(Error::Format("this file is not a FSH24 checksum v1 file".into()));
    }

    let mut entries = Vec::new();
    for (idx, line) in lines.enumerate() {
        let line = line.map_err(|e| Error::io("<manifest>", e))?;
        // Only the terminator goes; the path keeps any trailing whitespace.
        let text = line.strip_suffix('\r').unwrap_or(&line);
        if text.trim().is_empty() {
            continue;
        }
        entries.push(parse_line(idx + 2, text.trim_start()));
    }
    Ok(entries)
}

fn parse_line(line: usize, text: &str) -> ManifestEntry {
    let issue = |kind| ManifestEntry::Invalid(LineIssue { line, text: text.to_string(), kind });
    let parts: Vec<&str> = text.split('|').collect();
    let [digest, chunks, size, path] = parts[..] else {
        return issue(LineIssueKind::InvalidLineFormat);
    };
    let chunks = match chunks.parse::<u32>() {
        Ok(n) if n > 0 => n,
        _ => return issue(LineIssueKind::InvalidChunksValue),
    };
    let Ok(size) = size.parse::<u64>() else {
        return issue(LineIssueKind::InvalidFileSizeValue);
    };
    ManifestEntry::Record {
        line,
        record: DigestRecord {
            digest: digest.to_string(),
            chunks,
            size,
            path: path.to_string(),
        },
    }
}

pub fn load_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    let f = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::PathNotFound(path.to_path_buf()),
        _ => Error::io(path, e),
    })?;
    parse_manifest(BufReader::new(f)).map_err(|e| match e {
        Error::Io { source, .. } => Error::io(path, source),
        other => other,
    })
}

/// True when `path` names a manifest by extension (case-insensitive).
pub fn is_manifest_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(MANIFEST_EXTENSION))
}
