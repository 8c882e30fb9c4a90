//! Disk usage and file listing for a download directory.

use indicatif::HumanBytes;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct DirReport {
    pub root: PathBuf,
    pub files: Vec<FileEntry>,
    pub total_bytes: u64,
}

impl DirReport {
    pub fn human_total(&self) -> String {
        HumanBytes(self.total_bytes).to_string()
    }

    /// Leftover `.part` files from interrupted transfers.
    pub fn partial_files(&self) -> impl Iterator<Item = &FileEntry> {
        self.files
            .iter()
            .filter(|f| f.path.extension().map(|e| e == "part").unwrap_or(false))
    }
}

/// Walk `root` and collect every regular file, sorted by path.
pub fn scan(root: &Path) -> io::Result<DirReport> {
    let mut files = Vec::new();
    let mut total_bytes = 0u64;

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let size_bytes = entry.metadata().map_err(io::Error::from)?.len();
        total_bytes += size_bytes;
        files.push(FileEntry {
            path: entry.into_path(),
            size_bytes,
        });
    }

    Ok(DirReport {
        root: root.to_path_buf(),
        files,
        total_bytes,
    })
}
