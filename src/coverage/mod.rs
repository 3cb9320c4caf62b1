//! Coverage module
//!
//! Provides:
//! - Istanbul coverage records and their validation
//! - A collector that loads and merges `coverage.json` files
//! - Per-line branch and per-method counter aggregation

mod collector;
mod stats;

pub use collector::*;
pub use stats::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ReportError, Result};

/// A position in a source file (1-based line)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    #[serde(default)]
    pub column: Option<u32>,
}

/// A source span
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
    /// Excluded from coverage (`istanbul ignore`)
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Span {
    pub fn lines(start: u32, end: u32) -> Self {
        Self {
            start: Position { line: start, column: Some(0) },
            end: Position { line: end, column: None },
            skip: false,
        }
    }
}

/// A function declared in a source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionMapping {
    pub name: String,
    /// Line of the declaration
    pub line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<Span>,
    /// Excluded from coverage (`istanbul ignore`)
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip: bool,
}

/// A branch point and its ordered outcomes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchMapping {
    pub line: u32,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub locations: Vec<Span>,
}

/// Raw coverage facts for a single source file, in Istanbul's layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageRecord {
    #[serde(default)]
    pub path: String,
    #[serde(rename = "statementMap", default)]
    pub statements: BTreeMap<u32, Span>,
    #[serde(rename = "s", default)]
    pub statement_hits: BTreeMap<u32, u64>,
    #[serde(rename = "fnMap", default)]
    pub functions: BTreeMap<u32, FunctionMapping>,
    #[serde(rename = "f", default)]
    pub function_hits: BTreeMap<u32, u64>,
    #[serde(rename = "branchMap", default)]
    pub branches: BTreeMap<u32, BranchMapping>,
    #[serde(rename = "b", default)]
    pub branch_hits: BTreeMap<u32, Vec<u64>>,
    #[serde(rename = "l", default)]
    pub line_hits: BTreeMap<u32, u64>,
}

impl CoverageRecord {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Default::default()
        }
    }

    /// Check that every hit entry refers to a defined statement, function or branch
    pub fn validate(&self) -> Result<()> {
        if let Some(id) = self.statement_hits.keys().find(|id| !self.statements.contains_key(id)) {
            return Err(ReportError::malformed(
                &self.path,
                format!("statement hit {} has no statement mapping", id),
            ));
        }
        if let Some(id) = self.function_hits.keys().find(|id| !self.functions.contains_key(id)) {
            return Err(ReportError::malformed(
                &self.path,
                format!("function hit {} has no function mapping", id),
            ));
        }
        if let Some(id) = self.branch_hits.keys().find(|id| !self.branches.contains_key(id)) {
            return Err(ReportError::malformed(
                &self.path,
                format!("branch hit {} has no branch mapping", id),
            ));
        }
        Ok(())
    }

    /// Fill `line_hits` from statement hits when the input carried none.
    pub fn derive_line_hits(&mut self) {
        if self.line_hits.is_empty() {
            self.rebuild_line_hits();
        }
    }

    /// Recompute `line_hits` from statement hits.
    ///
    /// Each line takes the largest count of the statements starting on it. Records
    /// without statements keep the line hits they carry.
    pub fn rebuild_line_hits(&mut self) {
        if self.statements.is_empty() {
            return;
        }
        self.line_hits.clear();
        for (id, span) in &self.statements {
            let count = self.statement_hits.get(id).copied().unwrap_or(0);
            let entry = self.line_hits.entry(span.start.line).or_insert(0);
            if count > *entry {
                *entry = count;
            }
        }
    }

    /// Count ignored statements, functions and branch outcomes that never ran as hit once.
    ///
    /// Returns whether any count changed.
    pub fn increment_ignored_totals(&mut self) -> bool {
        let mut changed = false;

        for (id, span) in &self.statements {
            if let Some(hits) = self.statement_hits.get_mut(id) {
                changed |= bump_if_skipped(span.skip, hits);
            }
        }
        for (id, function) in &self.functions {
            if let Some(hits) = self.function_hits.get_mut(id) {
                changed |= bump_if_skipped(function.skip, hits);
            }
        }
        for (id, branch) in &self.branches {
            if let Some(hits) = self.branch_hits.get_mut(id) {
                for (location, outcome) in branch.locations.iter().zip(hits.iter_mut()) {
                    changed |= bump_if_skipped(location.skip, outcome);
                }
            }
        }

        changed
    }

    /// Add the hit counts of another record for the same file.
    ///
    /// Line hits are rebuilt from the merged statements when there are any, so
    /// statements sharing a line are not double counted.
    pub fn merge(&mut self, other: &CoverageRecord) {
        for (id, span) in &other.statements {
            self.statements.entry(*id).or_insert(*span);
        }
        for (id, function) in &other.functions {
            self.functions.entry(*id).or_insert_with(|| function.clone());
        }
        for (id, branch) in &other.branches {
            self.branches.entry(*id).or_insert_with(|| branch.clone());
        }

        sum_into(&mut self.statement_hits, &other.statement_hits);
        sum_into(&mut self.function_hits, &other.function_hits);

        for (id, counts) in &other.branch_hits {
            let existing = self.branch_hits.entry(*id).or_default();
            if existing.len() < counts.len() {
                existing.resize(counts.len(), 0);
            }
            for (slot, count) in existing.iter_mut().zip(counts) {
                *slot += count;
            }
        }

        if self.statements.is_empty() {
            sum_into(&mut self.line_hits, &other.line_hits);
        } else {
            self.rebuild_line_hits();
        }
    }
}

fn bump_if_skipped(skip: bool, hits: &mut u64) -> bool {
    if skip && *hits == 0 {
        *hits = 1;
        true
    } else {
        false
    }
}

fn sum_into(target: &mut BTreeMap<u32, u64>, source: &BTreeMap<u32, u64>) {
    for (key, count) in source {
        *target.entry(*key).or_insert(0) += count;
    }
}
