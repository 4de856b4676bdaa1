use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::models::stats::MeetingStats;

/// Outcome of one analysis request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Success,
    Error,
}

/// Result of analyzing a single meeting. Immutable once produced.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    /// Generated identifier for this analysis run
    pub analysis_id: String,
    pub meeting_id: String,
    pub meeting_title: String,
    pub meeting_date: Option<NaiveDate>,
    pub status: AnalysisStatus,
    /// Model output text on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    /// Captured error on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Canonical participant names, sorted
    pub participants: Vec<String>,
    pub stats: MeetingStats,
    pub total_statements: usize,
    pub template_used: String,
    /// None when a fully custom prompt bypassed the registry
    pub template_version: Option<String>,
    pub model_used: String,
    /// RFC 3339 timestamp of when the result was produced
    pub timestamp: String,
}

impl AnalysisResult {
    pub fn success(
        meeting: MeetingDescriptor,
        analysis: String,
        stats: MeetingStats,
        provenance: Provenance,
    ) -> Self {
        Self::build(meeting, AnalysisStatus::Success, Some(analysis), None, stats, provenance)
    }

    pub fn error(
        meeting: MeetingDescriptor,
        message: String,
        stats: MeetingStats,
        provenance: Provenance,
    ) -> Self {
        Self::build(meeting, AnalysisStatus::Error, None, Some(message), stats, provenance)
    }

    fn build(
        meeting: MeetingDescriptor,
        status: AnalysisStatus,
        analysis: Option<String>,
        error: Option<String>,
        stats: MeetingStats,
        provenance: Provenance,
    ) -> Self {
        Self {
            analysis_id: uuid::Uuid::new_v4().to_string(),
            meeting_id: meeting.id,
            meeting_title: meeting.title,
            meeting_date: meeting.date,
            status,
            analysis,
            error,
            participants: stats.participant_names(),
            total_statements: stats.total_statements,
            stats,
            template_used: provenance.template_used,
            template_version: provenance.template_version,
            model_used: provenance.model_used,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Identity of the meeting a result describes
#[derive(Debug, Clone)]
pub struct MeetingDescriptor {
    pub id: String,
    pub title: String,
    pub date: Option<NaiveDate>,
}

/// Which template/version/model produced a result
#[derive(Debug, Clone)]
pub struct Provenance {
    pub template_used: String,
    pub template_version: Option<String>,
    pub model_used: String,
}

/// Result of an aggregated multi-meeting analysis
#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    pub analysis_id: String,
    pub status: AnalysisStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub meeting_count: usize,
    pub meeting_titles: Vec<String>,
    pub date_range: DateRange,
    pub participants: Vec<String>,
    pub stats: MeetingStats,
    pub total_statements: usize,
    pub template_used: String,
    pub template_version: Option<String>,
    pub model_used: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Write any serializable report to a pretty-printed JSON file
pub fn write_json<T: Serialize>(report: &T, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create file: {:?}", path))?;
    serde_json::to_writer_pretty(file, report).context("Failed to write JSON")?;
    Ok(())
}
