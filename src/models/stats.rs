use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Speaking statistics for one participant, keyed by canonical name in
/// the enclosing map. Raw counts only; percentage math lives in
/// `participation_rate` so there is a single source of that arithmetic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticipantStats {
    /// Number of statements attributed to this participant
    pub speak_count: usize,
    /// Sum of whitespace-token counts over attributed statement texts
    pub total_words: usize,
    /// Distinct meetings in which this participant spoke at least once
    pub meetings_attended: usize,
    /// One entry per attributed statement, in appearance order
    pub timestamps: Vec<Option<String>>,
    /// Raw statement texts, in appearance order
    pub statements: Vec<String>,
}

impl ParticipantStats {
    /// Fold another participant's per-meeting stats into this one.
    /// Timestamps and statements are concatenated in meeting order.
    pub fn merge(&mut self, other: &ParticipantStats) {
        self.speak_count += other.speak_count;
        self.total_words += other.total_words;
        self.meetings_attended += other.meetings_attended;
        self.timestamps.extend(other.timestamps.iter().cloned());
        self.statements.extend(other.statements.iter().cloned());
    }

    /// First and last timestamp actually present, for display
    pub fn time_range(&self) -> Option<(&str, &str)> {
        let mut present = self.timestamps.iter().flatten();
        let first = present.next()?;
        let last = self.timestamps.iter().flatten().last()?;
        Some((first.as_str(), last.as_str()))
    }
}

/// Statistics for a single meeting. Invariant: the sum of `speak_count`
/// over all participants equals `total_statements`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeetingStats {
    /// Per-participant statistics, keyed by canonical name.
    /// BTreeMap keeps prompt text deterministic across runs.
    pub participants: BTreeMap<String, ParticipantStats>,
    /// Total number of parsed statements in the meeting
    pub total_statements: usize,
}

impl MeetingStats {
    pub fn participant_names(&self) -> Vec<String> {
        self.participants.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

/// A participant's share of total statements, as a percentage.
/// Zero total reports a rate of 0 rather than an error.
pub fn participation_rate(speak_count: usize, total_statements: usize) -> f64 {
    if total_statements == 0 {
        return 0.0;
    }
    speak_count as f64 / total_statements as f64 * 100.0
}
