//! Run statistics and the plain-text run report.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

/// Counters for a single restore run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RestoreStats {
    /// Keys returned by the listing.
    pub objects: u64,
    /// Keys skipped because they are not recognised images.
    pub ignored: u64,
    /// Distinct image groups.
    pub groups: u64,
    /// Groups that already had an original and were left alone.
    pub complete: u64,
    /// Groups with variants but no original.
    pub orphaned: u64,
    /// Originals written back.
    pub restored: u64,
    /// Orphaned groups whose original appeared before we wrote it.
    pub already_present: u64,
    /// Orphaned groups that failed.
    pub failed: u64,
}

impl std::fmt::Display for RestoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} objects ({} ignored), {} groups: {} complete, {} orphaned -> \
             {} restored, {} already present, {} failed",
            self.objects,
            self.ignored,
            self.groups,
            self.complete,
            self.orphaned,
            self.restored,
            self.already_present,
            self.failed
        )
    }
}

/// What happened to one orphaned group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupOutcome {
    /// The original was written.
    Restored {
        /// Bytes uploaded.
        bytes: u64,
        /// MIME type uploaded with.
        content_type: String,
    },
    /// The original key existed by the time we checked; nothing written.
    AlreadyPresent,
    /// Restoration failed; the message is the rendered error.
    Failed {
        /// Error description.
        error: String,
    },
}

/// Report line for one orphaned group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReport {
    /// Group base name.
    pub base: String,
    /// Key the original was (or would have been) written to.
    pub original_key: String,
    /// Variant chosen as the source.
    pub source_key: String,
    /// Result.
    pub outcome: GroupOutcome,
}

/// Full record of a restore run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Bucket that was processed.
    pub bucket: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Aggregate counters.
    pub stats: RestoreStats,
    /// One entry per orphaned group, in processing order.
    pub groups: Vec<GroupReport>,
}

impl RunReport {
    /// Groups that failed.
    pub fn failures(&self) -> impl Iterator<Item = &GroupReport> {
        self.groups
            .iter()
            .filter(|g| matches!(g.outcome, GroupOutcome::Failed { .. }))
    }

    /// Renders the report as plain text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        writeln!(out, "Media restore report for s3://{}", self.bucket).unwrap();
        writeln!(out, "Started: {}", self.started_at.to_rfc3339()).unwrap();
        writeln!(out, "{}", self.stats).unwrap();

        for group in &self.groups {
            writeln!(out, "-----------------").unwrap();
            writeln!(out, "{} <- {}", group.original_key, group.source_key).unwrap();
            match &group.outcome {
                GroupOutcome::Restored {
                    bytes,
                    content_type,
                } => {
                    writeln!(out, "  restored ({bytes} bytes, {content_type})").unwrap();
                }
                GroupOutcome::AlreadyPresent => {
                    writeln!(out, "  skipped: original already present").unwrap();
                }
                GroupOutcome::Failed { error } => {
                    writeln!(out, "  FAILED: {error}").unwrap();
                }
            }
        }

        out
    }

    /// File name the CLI writes the report to.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "restore_report_{}.txt",
            self.started_at.format("%Y%m%d%H%M%S")
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;

    fn report() -> RunReport {
        RunReport {
            bucket: "media".to_string(),
            started_at: Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap(),
            stats: RestoreStats {
                objects: 5,
                ignored: 1,
                groups: 3,
                complete: 1,
                orphaned: 2,
                restored: 1,
                already_present: 0,
                failed: 1,
            },
            groups: vec![
                GroupReport {
                    base: "dog".to_string(),
                    original_key: "dog.jpg".to_string(),
                    source_key: "dog-600x400.jpg".to_string(),
                    outcome: GroupOutcome::Restored {
                        bytes: 1234,
                        content_type: "image/jpeg".to_string(),
                    },
                },
                GroupReport {
                    base: "fox".to_string(),
                    original_key: "fox.png".to_string(),
                    source_key: "fox-10x10.png".to_string(),
                    outcome: GroupOutcome::Failed {
                        error: "boom".to_string(),
                    },
                },
            ],
        }
    }

    #[test]
    fn renders_every_group() {
        let text = report().render();
        assert!(text.starts_with("Media restore report for s3://media\n"));
        assert!(text.contains("dog.jpg <- dog-600x400.jpg\n  restored (1234 bytes, image/jpeg)"));
        assert!(text.contains("fox.png <- fox-10x10.png\n  FAILED: boom"));
        assert!(text.contains("1 restored, 0 already present, 1 failed"));
    }

    #[test]
    fn file_name_is_timestamped() {
        assert_eq!(report().file_name(), "restore_report_20240309070501.txt");
    }

    #[test]
    fn failures_filters_failed_groups() {
        let report = report();
        let failed: Vec<&str> = report.failures().map(|g| g.base.as_str()).collect();
        assert_eq!(failed, ["fox"]);
    }
}
