//! JaCoCo XML report generation
//!
//! Walks the source tree depth-first: every directory holding files becomes a
//! `<package>`, every file a `<class>` with its `<method>` counters and `<lines>`.

mod xml;

pub use xml::*;

use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, info};

use crate::coverage::{
    branch_coverage_by_line, method_counters, Collector, Counter, CoverageRecord, RecordLookup,
};
use crate::error::{ReportError, Result};
use crate::tree::{summarize, TreeNode};
use crate::writer::{AsyncFileWriter, ReportWriter};

/// Default report file name
pub const DEFAULT_REPORT_FILE: &str = "jacoco-coverage.xml";

const XML_DECLARATION: &str = "<?xml version=\"1.0\" ?>";
const DOCTYPE: &str = "<!DOCTYPE report PUBLIC \"-//JACOCO//DTD Report 1.0//EN\" \"report.dtd\">";

/// Placeholder method descriptor: no-args, void return
const METHOD_DESC: &str = "()V";

/// The `<sessioninfo>` entry of a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: String,
    /// Epoch milliseconds
    pub start: i64,
    /// Epoch milliseconds
    pub dump: i64,
}

impl SessionInfo {
    pub fn new(id: &str, start: i64, dump: i64) -> Self {
        Self {
            id: id.to_string(),
            start,
            dump,
        }
    }

    /// Session stamped with the current time
    pub fn now(id: &str) -> Self {
        let millis = Utc::now().timestamp_millis();
        Self::new(id, millis, millis)
    }
}

/// Totals accumulated while emitting a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub packages: usize,
    pub classes: usize,
    pub methods: Counter,
    pub lines: Counter,
    pub branches: Counter,
}

impl ReportSummary {
    pub fn line_percentage(&self) -> f64 {
        percentage(self.lines)
    }

    pub fn branch_percentage(&self) -> f64 {
        percentage(self.branches)
    }
}

fn percentage(counter: Counter) -> f64 {
    if counter.total() == 0 {
        return 0.0;
    }
    (counter.covered as f64 / counter.total() as f64) * 100.0
}

/// Java package notation for a directory name: `lib/util/` becomes `lib.util`
pub fn package_name(directory: &str) -> String {
    let dotted = directory.replace(['/', '\\'], ".");
    match dotted.strip_suffix('.') {
        Some(stripped) => stripped.to_string(),
        None => dotted,
    }
}

/// Final path segment of a file path
pub fn class_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Render a complete report document.
///
/// Every file record is resolved before the document is returned, so a missing
/// record fails here and nothing reaches a writer.
pub fn render(
    root: &TreeNode,
    lookup: &dyn RecordLookup,
    project_root: &str,
    session: &SessionInfo,
) -> Result<(Vec<String>, ReportSummary)> {
    let mut walker = TreeWalker {
        lookup,
        xml: XmlEmitter::new(),
        summary: ReportSummary::default(),
    };

    walker.xml.raw(XML_DECLARATION);
    walker.xml.raw(DOCTYPE);
    walker.xml.open("report", &[("name", &project_root)]);
    walker.xml.empty(
        "sessioninfo",
        &[("id", &session.id), ("start", &session.start), ("dump", &session.dump)],
    );
    walker.walk(root)?;
    walker.xml.close("report")?;

    let summary = walker.summary;
    Ok((walker.xml.finish()?, summary))
}

struct TreeWalker<'a> {
    lookup: &'a dyn RecordLookup,
    xml: XmlEmitter,
    summary: ReportSummary,
}

impl TreeWalker<'_> {
    fn walk(&mut self, node: &TreeNode) -> Result<()> {
        let TreeNode::Directory { name, children } = node else {
            return Ok(());
        };

        let files: Vec<&str> = children
            .iter()
            .filter_map(|child| match child {
                TreeNode::File { path, .. } => Some(path.as_str()),
                TreeNode::Directory { .. } => None,
            })
            .collect();

        if !files.is_empty() {
            let package = package_name(name);
            debug!(package = %package, classes = files.len(), "emitting package");

            self.xml.open("package", &[("name", &package)]);
            for path in files {
                self.emit_class(path)?;
            }
            self.xml.close("package")?;
            self.summary.packages += 1;
        }

        for child in children.iter().filter(|c| c.is_directory()) {
            self.walk(child)?;
        }
        Ok(())
    }

    fn emit_class(&mut self, path: &str) -> Result<()> {
        let record = self
            .lookup
            .record_for(path)
            .ok_or_else(|| ReportError::MissingRecord(path.to_string()))?;
        record.validate()?;

        self.xml.open("class", &[("name", &class_name(path))]);
        self.emit_methods(record)?;
        self.emit_lines(record)?;
        self.xml.close("class")?;

        self.summary.classes += 1;
        Ok(())
    }

    fn emit_methods(&mut self, record: &CoverageRecord) -> Result<()> {
        for (id, function) in &record.functions {
            let Some(counters) = method_counters(record, *id) else {
                debug!(
                    file = %record.path,
                    function = %function.name,
                    line = function.line,
                    "no statement starts at declaration, skipping method"
                );
                continue;
            };

            self.xml.open(
                "method",
                &[
                    ("name", &function.name),
                    ("desc", &METHOD_DESC),
                    ("line", &function.line),
                ],
            );
            for (kind, counter) in counters.entries() {
                self.xml.empty(
                    "counter",
                    &[
                        ("type", &kind),
                        ("missed", &counter.missed),
                        ("covered", &counter.covered),
                    ],
                );
            }
            self.xml.close("method")?;

            self.summary.methods.missed += counters.method.missed;
            self.summary.methods.covered += counters.method.covered;
        }
        Ok(())
    }

    fn emit_lines(&mut self, record: &CoverageRecord) -> Result<()> {
        let branches = branch_coverage_by_line(record);
        // totals include branches on lines missing from `l`
        for detail in branches.values() {
            self.summary.branches.covered += u64::from(detail.covered);
            self.summary.branches.missed += u64::from(detail.total - detail.covered);
        }

        self.xml.open("lines", &[]);
        for (number, hits) in &record.line_hits {
            match branches.get(number) {
                Some(detail) => {
                    self.xml.empty(
                        "line",
                        &[
                            ("number", number),
                            ("hits", hits),
                            ("branch", &true),
                            ("condition-coverage", &detail.condition_coverage()),
                        ],
                    );
                }
                None => {
                    self.xml.empty(
                        "line",
                        &[("number", number), ("hits", hits), ("branch", &false)],
                    );
                }
            }

            if *hits > 0 {
                self.summary.lines.covered += 1;
            } else {
                self.summary.lines.missed += 1;
            }
        }
        self.xml.close("lines")
    }
}

/// Output location and identity of a JaCoCo report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Directory the report is written to
    pub dir: PathBuf,
    /// Report file name
    pub file: String,
    /// Value of the `<report name>` attribute
    pub project_root: String,
    /// Value of the `<sessioninfo id>` attribute
    pub host: String,
}

impl ReportOptions {
    pub fn new(project_root: &str, host: &str) -> Self {
        Self {
            dir: PathBuf::from(project_root),
            file: DEFAULT_REPORT_FILE.to_string(),
            project_root: project_root.to_string(),
            host: host.to_string(),
        }
    }
}

/// Writes the JaCoCo report for a collector's records
#[derive(Debug, Clone)]
pub struct JacocoReport {
    options: ReportOptions,
}

impl JacocoReport {
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    pub fn output_path(&self) -> PathBuf {
        self.options.dir.join(&self.options.file)
    }

    /// Render the report for every file in the collector
    pub fn render(&self, collector: &Collector) -> Result<(Vec<String>, ReportSummary)> {
        let tree = summarize(collector.files());
        let session = SessionInfo::now(&self.options.host);
        render(&tree, collector, &self.options.project_root, &session)
    }

    /// Render and hand the document to `writer`
    pub fn write_report(
        &self,
        collector: &Collector,
        writer: &dyn ReportWriter,
    ) -> Result<ReportSummary> {
        let tree = summarize(collector.files());
        self.write_tree(&tree, collector, writer)
    }

    /// Render an externally built tree and hand the document to `writer`
    pub fn write_tree(
        &self,
        root: &TreeNode,
        lookup: &dyn RecordLookup,
        writer: &dyn ReportWriter,
    ) -> Result<ReportSummary> {
        let session = SessionInfo::now(&self.options.host);
        let (lines, summary) = render(root, lookup, &self.options.project_root, &session)?;
        let path = self.output_path();
        writer.write_lines(&path, &lines)?;
        info!(path = %path.display(), classes = summary.classes, "wrote jacoco report");
        Ok(summary)
    }

    /// Render and write the document without blocking the runtime
    pub async fn write_report_async(
        &self,
        collector: &Collector,
        writer: &AsyncFileWriter,
    ) -> Result<ReportSummary> {
        let (lines, summary) = self.render(collector)?;
        let path = self.output_path();
        writer.write_lines(&path, &lines).await?;
        info!(path = %path.display(), classes = summary.classes, "wrote jacoco report");
        Ok(summary)
    }
}
