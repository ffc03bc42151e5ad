//! Totals from an lcov tracefile.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoverageSummary {
    pub files: u64,
    pub lines_hit: u64,
    pub lines_total: u64,
    pub functions_hit: u64,
    pub functions_total: u64,
    pub branches_hit: u64,
    pub branches_total: u64,
}

#[derive(Default)]
struct RecordTotals {
    lines_hit: u64,
    lines_total: u64,
    functions_hit: u64,
    functions_total: u64,
    branches_hit: u64,
    branches_total: u64,
}

/// Accumulate per-record counts at each `end_of_record`.
///
/// `LF/LH/FNF/FNH/BRF/BRH` summary lines replace the counts gathered from the
/// individual `DA`, `FNDA` and `BRDA` entries of the same record.
pub fn summarize(content: &str) -> CoverageSummary {
    let mut summary = CoverageSummary::default();
    let mut record = RecordTotals::default();

    for line in content.lines() {
        let line = line.trim_end();
        if line.starts_with("SF:") {
            record = RecordTotals::default();
        } else if let Some(rest) = line.strip_prefix("DA:") {
            let mut parts = rest.split(',');
            if let (Some(_), Some(hits)) = (parts.next(), parts.next()) {
                record.lines_total += 1;
                if parse_hits(hits) > 0 {
                    record.lines_hit += 1;
                }
            }
        } else if let Some(rest) = line.strip_prefix("FNDA:") {
            if let Some((hits, _name)) = rest.split_once(',') {
                record.functions_total += 1;
                if parse_hits(hits) > 0 {
                    record.functions_hit += 1;
                }
            }
        } else if let Some(rest) = line.strip_prefix("BRDA:") {
            let parts: Vec<&str> = rest.split(',').collect();
            if parts.len() >= 4 {
                record.branches_total += 1;
                // "-" marks a branch whose block never ran
                if parts[3] != "-" && parse_hits(parts[3]) > 0 {
                    record.branches_hit += 1;
                }
            }
        } else if let Some(v) = line.strip_prefix("LF:").and_then(parse_total) {
            record.lines_total = v;
        } else if let Some(v) = line.strip_prefix("LH:").and_then(parse_total) {
            record.lines_hit = v;
        } else if let Some(v) = line.strip_prefix("FNF:").and_then(parse_total) {
            record.functions_total = v;
        } else if let Some(v) = line.strip_prefix("FNH:").and_then(parse_total) {
            record.functions_hit = v;
        } else if let Some(v) = line.strip_prefix("BRF:").and_then(parse_total) {
            record.branches_total = v;
        } else if let Some(v) = line.strip_prefix("BRH:").and_then(parse_total) {
            record.branches_hit = v;
        } else if line == "end_of_record" {
            summary.files += 1;
            summary.lines_hit += record.lines_hit;
            summary.lines_total += record.lines_total;
            summary.functions_hit += record.functions_hit;
            summary.functions_total += record.functions_total;
            summary.branches_hit += record.branches_hit;
            summary.branches_total += record.branches_total;
            record = RecordTotals::default();
        }
    }

    summary
}

// Counts may be written in scientific notation by some lcov versions.
fn parse_hits(raw: &str) -> u64 {
    let raw = raw.trim();
    raw.parse::<u64>().unwrap_or_else(|_| match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v.trunc() as u64,
        _ => 0,
    })
}

fn parse_total(raw: &str) -> Option<u64> {
    raw.trim().parse().ok()
}

fn percent(hit: u64, total: u64) -> Option<f64> {
    (total > 0).then(|| hit as f64 / total as f64 * 100.0)
}

impl CoverageSummary {
    pub fn line_percent(&self) -> Option<f64> {
        percent(self.lines_hit, self.lines_total)
    }

    pub fn function_percent(&self) -> Option<f64> {
        percent(self.functions_hit, self.functions_total)
    }

    pub fn branch_percent(&self) -> Option<f64> {
        percent(self.branches_hit, self.branches_total)
    }
}

impl fmt::Display for CoverageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("lines", self.lines_hit, self.lines_total),
            ("functions", self.functions_hit, self.functions_total),
            ("branches", self.branches_hit, self.branches_total),
        ];
        write!(f, "{} files", self.files)?;
        for (name, hit, total) in rows {
            match percent(hit, total) {
                Some(p) => write!(f, ", {name} {p:.2}% ({hit}/{total})")?,
                None => write!(f, ", {name} n/a")?,
            }
        }
        Ok(())
    }
}
