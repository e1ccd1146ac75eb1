//! Directory expansion for multi-file runs.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, ErrorKind, Result};

/// Expands an input path into the list of regular files to process.
///
/// Plain files pass through unchanged. Directories are walked recursively;
/// `no_links` stops symbolic links from being followed, `no_dot_files` drops
/// entries whose file name starts with a dot.
pub fn expand_inputs(input: &Path, no_links: bool, no_dot_files: bool) -> Result<Vec<PathBuf>> {
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(input).follow_links(!no_links) {
        let entry = entry.map_err(|e| {
            Error::new(ErrorKind::OpenFile, format!("cannot walk {}: {e}", input.display()))
        })?;
        if no_dot_files {
            let hidden = entry
                .file_name()
                .to_str()
                .map(|n| n.starts_with('.'))
                .unwrap_or(false);
            if hidden {
                continue;
            }
        }
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}
