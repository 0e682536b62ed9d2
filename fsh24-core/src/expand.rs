use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Turn user inputs into a flat list of files.
///
/// Files pass through as given. A directory contributes its regular files
/// (the whole tree when `recursive`), sorted, at the position of the
/// directory in `inputs`. Inputs that do not exist are logged and skipped.
pub fn expand_paths(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for input in inputs {
        let md = match fs::metadata(input) {
            Ok(md) => md,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::warn!("{}", Error::PathNotFound(input.clone()));
                continue;
            }
            Err(e) => return Err(Error::io(input, e)),
        };
        if !md.is_dir() {
            out.push(input.clone());
            continue;
        }
        let mut files = if recursive { walk_tree(input)? } else { list_dir(input)? };
        files.sort();
        out.extend(files);
    }
    Ok(out)
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        // follows symlinks, like a plain stat
        if !path.is_dir() {
            files.push(path);
        }
    }
    Ok(files)
}

fn walk_tree(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for ent in WalkDir::new(dir).min_depth(1) {
        let ent = ent.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            let msg = e.to_string();
            let source =
                e.into_io_error().unwrap_or_else(|| std::io::Error::new(ErrorKind::Other, msg));
            Error::io(path, source)
        })?;
        if ent.file_type().is_dir() {
            continue;
        }
        files.push(ent.into_path());
    }
    Ok(files)
}
