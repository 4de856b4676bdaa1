use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Canonical meeting record consumed by the analysis pipeline.
/// Persistence is out of scope: records arrive already fetched, either
/// directly in this shape or in a drive-export shape adapted below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingRecord {
    pub id: String,
    pub title: String,
    pub date: Option<NaiveDate>,
    /// Participant names as stored with the record, if any. When absent,
    /// participants are derived from the transcript.
    #[serde(default)]
    pub participants: Vec<String>,
    pub transcript: String,
}

/// Wire shapes accepted at the ingestion boundary. Schema sniffing stays
/// here: the pipeline only ever sees `MeetingRecord`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawMeetingRecord {
    /// Already in the canonical shape
    Native {
        #[serde(default)]
        id: Option<String>,
        title: String,
        #[serde(default)]
        date: Option<String>,
        #[serde(default)]
        participants: Vec<String>,
        #[serde(default)]
        transcript: String,
    },
    /// Drive-export shape: the transcript is embedded in a document body
    DriveExport {
        #[serde(default)]
        id: Option<String>,
        name: String,
        #[serde(default, rename = "createdTime")]
        created_time: Option<String>,
        #[serde(default)]
        content: Option<String>,
    },
}

impl RawMeetingRecord {
    /// Adapt a wire record into the canonical shape
    pub fn into_record(self) -> MeetingRecord {
        match self {
            RawMeetingRecord::Native {
                id,
                title,
                date,
                participants,
                transcript,
            } => MeetingRecord {
                id: id.unwrap_or_else(generated_id),
                title,
                date: date.as_deref().and_then(parse_record_date),
                participants,
                transcript,
            },
            RawMeetingRecord::DriveExport {
                id,
                name,
                created_time,
                content,
            } => MeetingRecord {
                id: id.unwrap_or_else(generated_id),
                title: name,
                date: created_time.as_deref().and_then(parse_record_date),
                participants: vec![],
                transcript: content
                    .as_deref()
                    .map(extract_transcript_section)
                    .unwrap_or_default(),
            },
        }
    }
}

fn generated_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Accepts `YYYY-MM-DD` and full ISO-8601 timestamps (`createdTime` is
/// stored as e.g. "2025-11-17T10:17:47.962Z"). Unparseable dates become
/// None rather than a guess.
fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = raw.parse::<NaiveDate>() {
        return Some(date);
    }
    raw.get(..10).and_then(|prefix| prefix.parse::<NaiveDate>().ok())
}

/// Recover the transcript section from a drive-export document body.
///
/// Export bodies look like:
///
/// ```text
/// ...summary prose...
/// Transcript
/// Nov 17, 2025
/// SYB call - Transcript
/// 00:00:00
/// Jeff Chung: Hello Jamie.
/// ```
///
/// Everything after the `Transcript` marker line is kept, minus the
/// marker itself and the date/title header lines that follow it. A body
/// with no marker is returned whole.
pub fn extract_transcript_section(content: &str) -> String {
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = normalized.lines().collect();

    let marker_idx = lines
        .iter()
        .position(|line| line.trim().eq_ignore_ascii_case("transcript"));

    let Some(marker_idx) = marker_idx else {
        return normalized.trim().to_string();
    };

    let mut start = marker_idx + 1;

    // Skip a "Nov 17, 2025" style date line directly after the marker
    if lines.get(start).is_some_and(|l| is_header_date_line(l)) {
        start += 1;
    }
    // Skip a "<title> - Transcript" header line
    if lines
        .get(start)
        .is_some_and(|l| l.trim_end().ends_with("- Transcript"))
    {
        start += 1;
    }

    lines[start..].join("\n").trim().to_string()
}

/// "Nov 17, 2025": three-letter month, day, comma, four-digit year
fn is_header_date_line(line: &str) -> bool {
    let line = line.trim();
    let mut parts = line.splitn(2, ' ');
    let (Some(month), Some(rest)) = (parts.next(), parts.next()) else {
        return false;
    };
    if month.len() != 3 || !month.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
        return false;
    }
    let Some((day, year)) = rest.split_once(", ") else {
        return false;
    };
    day.chars().all(|c| c.is_ascii_digit())
        && year.len() == 4
        && year.chars().all(|c| c.is_ascii_digit())
}

/// Input files contain either one record object or an array of records
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordSet {
    Many(Vec<RawMeetingRecord>),
    One(Box<RawMeetingRecord>),
}

/// Load meeting records from a JSON file, adapting each to the canonical shape
pub fn load_meeting_records(path: &Path) -> Result<Vec<MeetingRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read meeting records from {:?}", path))?;
    parse_meeting_records(&content)
}

/// Parse meeting records from a JSON string (single object or array)
pub fn parse_meeting_records(json: &str) -> Result<Vec<MeetingRecord>> {
    let set: RecordSet =
        serde_json::from_str(json).context("Failed to parse meeting record JSON")?;
    let raw = match set {
        RecordSet::Many(records) => records,
        RecordSet::One(record) => vec![*record],
    };
    Ok(raw.into_iter().map(RawMeetingRecord::into_record).collect())
}
