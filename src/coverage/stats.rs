//! Per-line branch coverage and per-method counters
//!
//! Istanbul records have no bytecode, so two JaCoCo counters are approximations:
//! - `INSTRUCTION` repeats the `LINE` counter.
//! - `COMPLEXITY` counts branches in the method body that left an outcome unexercised,
//!   plus one path for the method itself.

use std::collections::BTreeMap;

use super::CoverageRecord;

/// Branch outcomes on a single source line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineBranchSummary {
    pub covered: u32,
    pub total: u32,
    /// Percentage of covered outcomes, 0..=100
    pub coverage: f64,
}

impl LineBranchSummary {
    /// Value of the `condition-coverage` attribute, e.g. `25% (1/4)`
    pub fn condition_coverage(&self) -> String {
        format!("{}% ({}/{})", self.coverage, self.covered, self.total)
    }
}

/// A JaCoCo `{missed, covered}` pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counter {
    pub missed: u64,
    pub covered: u64,
}

impl Counter {
    pub fn new(missed: u64, covered: u64) -> Self {
        Self { missed, covered }
    }

    pub fn total(&self) -> u64 {
        self.missed + self.covered
    }
}

/// The four counters reported for a method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodCounters {
    pub instruction: Counter,
    pub line: Counter,
    pub complexity: Counter,
    pub method: Counter,
}

impl MethodCounters {
    /// Counters in the order they appear in the report
    pub fn entries(&self) -> [(&'static str, Counter); 4] {
        [
            ("INSTRUCTION", self.instruction),
            ("LINE", self.line),
            ("COMPLEXITY", self.complexity),
            ("METHOD", self.method),
        ]
    }
}

/// Group branch outcome hits by the line each branch is declared on
pub fn branch_coverage_by_line(record: &CoverageRecord) -> BTreeMap<u32, LineBranchSummary> {
    let mut outcomes: BTreeMap<u32, Vec<u64>> = BTreeMap::new();

    for (id, branch) in &record.branches {
        let slot = outcomes.entry(branch.line).or_default();
        match record.branch_hits.get(id) {
            Some(hits) => slot.extend_from_slice(hits),
            None => slot.extend(std::iter::repeat(0).take(branch.locations.len())),
        }
    }

    outcomes
        .into_iter()
        .map(|(line, hits)| {
            let covered = hits.iter().filter(|&&h| h > 0).count() as u32;
            let total = hits.len() as u32;
            let coverage = if total == 0 {
                0.0
            } else {
                covered as f64 / total as f64 * 100.0
            };
            (line, LineBranchSummary { covered, total, coverage })
        })
        .collect()
}

/// Line span of a function body, taken from the widest statement starting on its declaration line
pub fn method_body_range(record: &CoverageRecord, function_id: u32) -> Option<(u32, u32)> {
    let function = record.functions.get(&function_id)?;

    record
        .statements
        .values()
        .filter(|span| span.start.line == function.line)
        .map(|span| (span.start.line, span.end.line.max(span.start.line)))
        // max_by_key keeps the last maximum, so iterate ids in reverse to favour the lowest id
        .rev()
        .max_by_key(|&(_, end)| end)
}

/// Counters for one function, or `None` when its body cannot be resolved
pub fn method_counters(record: &CoverageRecord, function_id: u32) -> Option<MethodCounters> {
    let (start, end) = method_body_range(record, function_id)?;

    let mut covered_lines = 0u64;
    let mut missed_lines = 0u64;
    for line in start..=end {
        match record.line_hits.get(&line) {
            Some(&hits) if hits >= 1 => covered_lines += 1,
            _ => missed_lines += 1,
        }
    }

    let partially_covered_branches = record
        .branches
        .iter()
        .filter(|(_, branch)| (start..=end).contains(&branch.line))
        .filter(|(id, branch)| match record.branch_hits.get(*id) {
            Some(hits) => hits.iter().any(|&h| h == 0),
            None => !branch.locations.is_empty(),
        })
        .count() as u64;

    let lines = Counter::new(missed_lines, covered_lines);
    let method = if covered_lines > 0 {
        Counter::new(0, 1)
    } else {
        Counter::new(1, 0)
    };

    Some(MethodCounters {
        instruction: lines,
        line: lines,
        complexity: Counter::new(partially_covered_branches, 1),
        method,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::{BranchMapping, FunctionMapping, Span};

    fn function(name: &str, line: u32) -> FunctionMapping {
        FunctionMapping { name: name.to_string(), line, loc: None, skip: false }
    }

    fn branch(line: u32, outcomes: usize) -> BranchMapping {
        BranchMapping {
            line,
            kind: Some("if".to_string()),
            locations: vec![Span::lines(line, line); outcomes],
        }
    }

    #[test]
    fn test_function_over_three_lines() {
        let mut record = CoverageRecord::new("a.js");
        record.functions.insert(1, function("foo", 2));
        record.statements.insert(1, Span::lines(2, 4));
        record.line_hits.extend([(2, 1), (3, 0), (4, 1)]);

        let counters = method_counters(&record, 1).unwrap();
        assert_eq!(counters.instruction, Counter::new(1, 2));
        assert_eq!(counters.line, Counter::new(1, 2));
        assert_eq!(counters.complexity, Counter::new(0, 1));
        assert_eq!(counters.method, Counter::new(0, 1));
        assert!(branch_coverage_by_line(&record).is_empty());
    }

    #[test]
    fn test_two_branches_share_a_line() {
        let mut record = CoverageRecord::new("a.js");
        record.branches.insert(1, branch(5, 2));
        record.branches.insert(2, branch(5, 2));
        record.branch_hits.insert(1, vec![1, 0]);
        record.branch_hits.insert(2, vec![0, 0]);

        let by_line = branch_coverage_by_line(&record);
        let summary = by_line[&5];
        assert_eq!(summary.covered, 1);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.coverage, 25.0);
        assert_eq!(summary.condition_coverage(), "25% (1/4)");
    }

    #[test]
    fn test_condition_coverage_keeps_fraction() {
        let mut record = CoverageRecord::new("a.js");
        record.branches.insert(1, branch(3, 3));
        record.branch_hits.insert(1, vec![1, 0, 0]);

        let summary = branch_coverage_by_line(&record)[&3];
        assert_eq!(summary.condition_coverage(), "33.33333333333333% (1/3)");
    }

    #[test]
    fn test_branch_without_hits_counts_as_uncovered() {
        let mut record = CoverageRecord::new("a.js");
        record.branches.insert(1, branch(7, 2));

        let summary = branch_coverage_by_line(&record)[&7];
        assert_eq!((summary.covered, summary.total), (0, 2));
        assert_eq!(summary.coverage, 0.0);
    }

    #[test]
    fn test_unresolvable_body_is_absent() {
        let mut record = CoverageRecord::new("a.js");
        record.functions.insert(1, function("ghost", 10));
        record.statements.insert(1, Span::lines(11, 12));

        assert_eq!(method_body_range(&record, 1), None);
        assert!(method_counters(&record, 1).is_none());
        assert!(method_counters(&record, 99).is_none());
    }

    #[test]
    fn test_widest_statement_defines_body() {
        let mut record = CoverageRecord::new("a.js");
        record.functions.insert(1, function("outer", 1));
        record.statements.insert(1, Span::lines(1, 1));
        record.statements.insert(2, Span::lines(1, 6));
        record.statements.insert(3, Span::lines(2, 2));

        assert_eq!(method_body_range(&record, 1), Some((1, 6)));

        let counters = method_counters(&record, 1).unwrap();
        assert_eq!(counters.line.total(), 6);
        // no line hits at all: every line missed, method uncovered
        assert_eq!(counters.line, Counter::new(6, 0));
        assert_eq!(counters.method, Counter::new(1, 0));
    }

    #[test]
    fn test_complexity_counts_partial_branches_in_body() {
        let mut record = CoverageRecord::new("a.js");
        record.functions.insert(1, function("foo", 1));
        record.statements.insert(1, Span::lines(1, 5));
        record.line_hits.extend([(1, 1), (2, 1), (3, 1), (4, 1), (5, 1)]);
        record.branches.insert(1, branch(2, 2));
        record.branches.insert(2, branch(3, 2));
        record.branches.insert(3, branch(4, 2));
        record.branches.insert(4, branch(9, 2));
        record.branch_hits.insert(1, vec![1, 1]);
        record.branch_hits.insert(2, vec![1, 0]);
        record.branch_hits.insert(3, vec![0, 0]);
        record.branch_hits.insert(4, vec![0, 0]);

        let counters = method_counters(&record, 1).unwrap();
        assert_eq!(counters.complexity, Counter::new(2, 1));
        assert_eq!(counters.instruction, counters.line);
    }

    #[test]
    fn test_counter_invariants_hold() {
        let mut record = CoverageRecord::new("a.js");
        record.functions.insert(1, function("a", 1));
        record.functions.insert(2, function("b", 10));
        record.statements.insert(1, Span::lines(1, 4));
        record.statements.insert(2, Span::lines(10, 15));
        record.line_hits.extend([(1, 3), (2, 0), (10, 0), (12, 0)]);
        record.branches.insert(1, branch(2, 3));
        record.branch_hits.insert(1, vec![4, 0, 1]);

        for (id, (start, end)) in [(1u32, (1u64, 4u64)), (2, (10, 15))] {
            let counters = method_counters(&record, id).unwrap();
            assert_eq!(counters.line.total(), end - start + 1);
            assert_eq!(counters.method.total(), 1);
            assert!(counters.complexity.covered >= 1);
        }

        for summary in branch_coverage_by_line(&record).values() {
            assert!(summary.covered <= summary.total);
            assert!((0.0..=100.0).contains(&summary.coverage));
        }
    }
}
