//! Report destinations
//!
//! File writers stage the document in a sibling `.tmp` file and rename it into
//! place, so a failed write never leaves a truncated report behind.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::{ReportError, Result};

/// Accepts the lines of a finished report
pub trait ReportWriter {
    fn write_lines(&self, path: &Path, lines: &[String]) -> Result<()>;
}

fn join_lines(lines: &[String]) -> String {
    let mut content = lines.join("\n");
    content.push('\n');
    content
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("report"));
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_error(path: &Path) -> impl FnOnce(std::io::Error) -> ReportError + '_ {
    move |source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    }
}

/// Blocking filesystem writer
#[derive(Debug, Clone, Copy, Default)]
pub struct FileWriter;

impl ReportWriter for FileWriter {
    fn write_lines(&self, path: &Path, lines: &[String]) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error(path))?;
        }

        let staging = staging_path(path);
        let result = fs::write(&staging, join_lines(lines))
            .and_then(|_| fs::rename(&staging, path))
            .map_err(write_error(path));

        match result {
            Ok(()) => debug!(path = %path.display(), lines = lines.len(), "flushed report"),
            Err(_) => {
                let _ = fs::remove_file(&staging);
            }
        }
        result
    }
}

/// Tokio filesystem writer; completion is the returned future
#[derive(Debug, Clone, Copy, Default)]
pub struct AsyncFileWriter;

impl AsyncFileWriter {
    pub async fn write_lines(&self, path: &Path, lines: &[String]) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(write_error(path))?;
        }

        let staging = staging_path(path);
        let mut result = tokio::fs::write(&staging, join_lines(lines)).await;
        if result.is_ok() {
            result = tokio::fs::rename(&staging, path).await;
        }

        match result {
            Ok(()) => debug!(path = %path.display(), lines = lines.len(), "flushed report"),
            Err(_) => {
                let _ = tokio::fs::remove_file(&staging).await;
            }
        }
        result.map_err(write_error(path))
    }
}

/// Keeps written reports in memory
#[derive(Debug, Default)]
pub struct MemoryWriter {
    files: Mutex<BTreeMap<PathBuf, String>>,
}

impl MemoryWriter {
    /// Content written to `path`, if any
    pub fn content(&self, path: &Path) -> Option<String> {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .cloned()
    }

    /// Every path written so far
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }
}

impl ReportWriter for MemoryWriter {
    fn write_lines(&self, path: &Path, lines: &[String]) -> Result<()> {
        self.files
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_path_buf(), join_lines(lines));
        Ok(())
    }
}
