// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scan (work item) model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::ValidateUrl;

/// Lifecycle: `pending` then `completed` or `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Pending => "pending",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

/// Sub-scores shown on the detail page, each 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ScanMetrics {
    pub clarity: u8,
    pub trust: u8,
    pub cta: u8,
    pub mobile: u8,
}

/// Scan row in the `scans` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Scan {
    pub id: Uuid,
    /// Owning identity
    pub user_id: Uuid,
    pub url: String,
    pub status: ScanStatus,
    /// Present only once completed
    #[serde(default)]
    pub grade: Option<Grade>,
    #[serde(default)]
    pub score: Option<u8>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub metrics: Option<ScanMetrics>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Scan {
    /// A freshly accepted submission.
    pub fn pending(user_id: Uuid, url: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            url: url.to_string(),
            status: ScanStatus::Pending,
            grade: None,
            score: None,
            recommendations: Vec::new(),
            metrics: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result columns written when a scan leaves `pending`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanUpdate {
    pub status: ScanStatus,
    pub grade: Option<Grade>,
    pub score: Option<u8>,
    pub recommendations: Vec<String>,
    pub metrics: Option<ScanMetrics>,
}

impl ScanUpdate {
    pub fn completed(
        grade: Grade,
        score: u8,
        recommendations: Vec<String>,
        metrics: ScanMetrics,
    ) -> Self {
        Self {
            status: ScanStatus::Completed,
            grade: Some(grade),
            score: Some(score),
            recommendations,
            metrics: Some(metrics),
        }
    }

    /// Failed scans carry no results (grade/score only exist when completed).
    pub fn failed() -> Self {
        Self {
            status: ScanStatus::Failed,
            grade: None,
            score: None,
            recommendations: Vec::new(),
            metrics: None,
        }
    }

    pub fn apply(&self, scan: &mut Scan) {
        scan.status = self.status;
        scan.grade = self.grade;
        scan.score = self.score;
        scan.recommendations = self.recommendations.clone();
        scan.metrics = self.metrics;
        scan.updated_at = Utc::now();
    }
}

/// Well-formed URL with an http or https scheme.
pub fn is_http_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://")) && url.validate_url()
}

/// Order newest first (ties broken by id for a stable listing).
pub fn sort_newest_first(scans: &mut [Scan]) {
    scans.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_scan_has_no_results() {
        let scan = Scan::pending(Uuid::new_v4(), "https://stripe.com/pricing");
        assert_eq!(scan.status, ScanStatus::Pending);
        assert!(scan.grade.is_none());
        assert!(scan.score.is_none());
        assert!(scan.recommendations.is_empty());
    }

    #[test]
    fn test_failed_update_clears_results() {
        let mut scan = Scan::pending(Uuid::new_v4(), "https://notion.so/pricing");
        let metrics = ScanMetrics {
            clarity: 85,
            trust: 92,
            cta: 78,
            mobile: 95,
        };
        ScanUpdate::completed(Grade::B, 78, vec!["Add FAQ section".to_string()], metrics)
            .apply(&mut scan);
        assert_eq!(scan.grade, Some(Grade::B));

        ScanUpdate::failed().apply(&mut scan);
        assert_eq!(scan.status, ScanStatus::Failed);
        assert!(scan.grade.is_none());
        assert!(scan.score.is_none());
        assert!(scan.metrics.is_none());
    }

    #[test]
    fn test_sort_newest_first() {
        let user = Uuid::new_v4();
        let mut older = Scan::pending(user, "https://example.com/pricing");
        older.created_at = "2024-01-13T09:15:00Z".parse().unwrap();
        let mut newer = Scan::pending(user, "https://stripe.com/pricing");
        newer.created_at = "2024-01-15T10:30:00Z".parse().unwrap();

        let mut scans = vec![older.clone(), newer.clone()];
        sort_newest_first(&mut scans);
        assert_eq!(scans[0].id, newer.id);
        assert_eq!(scans[1].id, older.id);
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&ScanStatus::Completed).unwrap(),
            "\"completed\""
        );
        assert_eq!(serde_json::to_string(&Grade::F).unwrap(), "\"F\"");
    }
}
