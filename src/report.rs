use ::time::{format_description::well_known, OffsetDateTime};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

use crate::types::{Finding, ScanEvent};

/// Final record of one scan, built by folding its events as they stream by.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub started_at: String,
    pub finished_at: Option<String>,
    pub ports: Vec<u16>,
    pub targets_started: u64,
    /// Targets whose whole port set was probed; a deadline can cut the last one short.
    pub targets_completed: u64,
    pub deadline_reached: bool,
    /// Open ports in summary order.
    pub findings: Vec<Finding>,
    /// True once the terminal event was seen.
    pub completed: bool,
}

impl ScanReport {
    pub fn new(ports: &[u16]) -> Self {
        Self {
            started_at: now_rfc3339(),
            finished_at: None,
            ports: ports.to_vec(),
            targets_started: 0,
            targets_completed: 0,
            deadline_reached: false,
            findings: Vec::new(),
            completed: false,
        }
    }

    pub fn observe(&mut self, event: &ScanEvent) {
        match event {
            ScanEvent::TargetStart { .. } => self.targets_started += 1,
            ScanEvent::TargetSeparator => self.targets_completed += 1,
            ScanEvent::DeadlineReached { .. } => self.deadline_reached = true,
            ScanEvent::Summary { findings } => self.findings = findings.clone(),
            ScanEvent::Terminal => {
                self.completed = true;
                self.finished_at = Some(now_rfc3339());
            }
            _ => {}
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create report: {}", path.display()))?;
        serde_json::to_writer_pretty(file, self)
            .with_context(|| format!("failed to write report: {}", path.display()))?;
        Ok(())
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Target;

    #[test]
    fn folds_summary_and_terminal() {
        let target = Target::parse("10.0.0.1").unwrap();
        let finding = Finding { target: target.clone(), port: 554 };
        let mut report = ScanReport::new(&[80, 554]);
        for ev in [
            ScanEvent::TargetStart { target },
            ScanEvent::PortOpen(finding.clone()),
            ScanEvent::TargetSeparator,
            ScanEvent::ScanComplete,
            ScanEvent::Summary { findings: vec![finding.clone()] },
        ] {
            report.observe(&ev);
        }
        assert!(!report.completed);
        assert!(report.finished_at.is_none());

        report.observe(&ScanEvent::Terminal);
        assert!(report.completed);
        assert!(report.finished_at.is_some());
        assert_eq!(report.targets_started, 1);
        assert_eq!(report.targets_completed, 1);
        assert_eq!(report.findings, vec![finding]);
        assert!(!report.deadline_reached);
    }

    #[test]
    fn target_cut_by_deadline_is_started_not_completed() {
        let a = Target::parse("a").unwrap();
        let mut report = ScanReport::new(&[80]);
        for ev in [
            ScanEvent::TargetStart { target: a.clone() },
            ScanEvent::PortProbeStart { target: a, port: 80 },
            ScanEvent::DeadlineReached { unscanned: 1 },
            ScanEvent::ScanComplete,
            ScanEvent::Summary { findings: vec![] },
            ScanEvent::Terminal,
        ] {
            report.observe(&ev);
        }
        assert_eq!(report.targets_started, 1);
        assert_eq!(report.targets_completed, 0);
        assert!(report.deadline_reached);
        assert!(report.completed);
    }

    #[test]
    fn write_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut report = ScanReport::new(&[80]);
        report.observe(&ScanEvent::DeadlineReached { unscanned: 2 });
        report.write_json(&path).unwrap();

        let loaded: ScanReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, report);
        assert!(loaded.deadline_reached);
    }
}
