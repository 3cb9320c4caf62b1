//! jacoco-report - JaCoCo XML reports from Istanbul coverage
//!
//! A library for turning per-file coverage records into a JaCoCo report with:
//! - Istanbul `coverage.json` loading and merging
//! - Per-line branch coverage and per-method counters
//! - A package/class tree derived from source paths
//! - Synchronous and asynchronous report writers

pub mod config;
pub mod coverage;
pub mod error;
pub mod report;
pub mod tree;
pub mod writer;

pub use coverage::{Collector, CoverageRecord, LineBranchSummary, MethodCounters, RecordLookup};
pub use error::{ReportError, Result};
pub use report::{render, JacocoReport, ReportOptions, ReportSummary, SessionInfo};
pub use tree::{summarize, TreeNode};
pub use writer::{AsyncFileWriter, FileWriter, MemoryWriter, ReportWriter};
