use std::collections::BTreeMap;

use crate::models::{MeetingStats, ParticipantStats, Statement};

/// Aggregate one meeting's statements (speakers already canonical) into
/// per-participant statistics. Every statement attributes to exactly one
/// participant, so Σ speak_count == statements.len().
pub fn aggregate_meeting(statements: &[Statement]) -> MeetingStats {
    let mut participants: BTreeMap<String, ParticipantStats> = BTreeMap::new();

    for statement in statements {
        let entry = participants.entry(statement.speaker.clone()).or_default();
        entry.speak_count += 1;
        entry.total_words += statement.word_count();
        entry.timestamps.push(statement.timestamp.clone());
        entry.statements.push(statement.text.clone());
    }

    for stats in participants.values_mut() {
        stats.meetings_attended = 1;
    }

    MeetingStats {
        total_statements: statements.len(),
        participants,
    }
}

/// Fold many per-meeting statistics into cross-meeting totals.
/// Counts and words sum; timestamps and statements concatenate in
/// meeting order; `meetings_attended` counts distinct meetings in which
/// the participant spoke. Raw counts only; rate math stays downstream.
pub fn aggregate_across(meetings: &[MeetingStats]) -> MeetingStats {
    let mut combined = MeetingStats::default();

    for meeting in meetings {
        combined.total_statements += meeting.total_statements;
        for (name, stats) in &meeting.participants {
            combined
                .participants
                .entry(name.clone())
                .or_default()
                .merge(stats);
        }
    }

    combined
}
