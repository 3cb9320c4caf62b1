//! Istanbul `coverage.json` collector

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use tracing::debug;

use super::CoverageRecord;
use crate::error::{ReportError, Result};

/// Resolves a file path to its coverage record
pub trait RecordLookup {
    fn record_for(&self, path: &str) -> Option<&CoverageRecord>;
}

impl RecordLookup for BTreeMap<String, CoverageRecord> {
    fn record_for(&self, path: &str) -> Option<&CoverageRecord> {
        self.get(path)
    }
}

impl RecordLookup for HashMap<String, CoverageRecord> {
    fn record_for(&self, path: &str) -> Option<&CoverageRecord> {
        self.get(path)
    }
}

/// Coverage records keyed by file path, iterated in path order
#[derive(Debug, Clone, Default)]
pub struct Collector {
    records: BTreeMap<String, CoverageRecord>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record, merging hit counts if the path is already known
    ///
    /// Ignored items that never ran are counted as hit before line hits are derived.
    pub fn add(&mut self, mut record: CoverageRecord) {
        if record.increment_ignored_totals() {
            debug!(path = %record.path, "counted ignored items as covered");
            record.rebuild_line_hits();
        }
        record.derive_line_hits();
        match self.records.get_mut(&record.path) {
            Some(existing) => existing.merge(&record),
            None => {
                self.records.insert(record.path.clone(), record);
            }
        }
    }

    /// Load a `coverage.json` file
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.add_json(&content, path)
    }

    /// Add every record of a `coverage.json` document
    pub fn add_json(&mut self, content: &str, origin: &Path) -> Result<()> {
        let parsed: BTreeMap<String, CoverageRecord> =
            serde_json::from_str(content).map_err(|source| ReportError::Parse {
                path: origin.to_path_buf(),
                source,
            })?;

        debug!(origin = %origin.display(), files = parsed.len(), "loaded coverage records");

        for (key, mut record) in parsed {
            if record.path.is_empty() {
                record.path = key;
            }
            self.add(record);
        }
        Ok(())
    }

    /// File paths in lexicographic order
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordLookup for Collector {
    fn record_for(&self, path: &str) -> Option<&CoverageRecord> {
        self.records.get(path)
    }
}
