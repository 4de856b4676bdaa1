use chrono::NaiveDate;

use crate::models::{participation_rate, MeetingStats, Statement};
use crate::templates::TemplateVersion;

/// Everything the assembler needs for one prompt. Built per analysis
/// call, consumed once, discarded.
#[derive(Debug)]
pub struct PromptRequest<'a> {
    /// Anchor date injected into `{date}`. The assembler never does date
    /// arithmetic; relative-date resolution is the model's job, working
    /// from this literal anchor.
    pub meeting_date: Option<NaiveDate>,
    pub stats: &'a MeetingStats,
    /// Pre-formatted transcript material (meeting info, statistics,
    /// conversation), substituted into `{meetings_data}`
    pub transcript_block: &'a str,
    pub custom_instructions: Option<&'a str>,
}

/// Merge a resolved template with the request into the final prompt.
/// Pure string substitution. The template content is never parsed, so
/// Markdown and strict-JSON template families assemble identically.
pub fn assemble(template: &TemplateVersion, request: &PromptRequest) -> String {
    let participants = request.stats.participant_names().join(", ");
    let date = format_anchor_date(request.meeting_date);

    let body = template
        .content
        .replace("{date}", &date)
        .replace("{participants}", &participants)
        .replace("{meetings_data}", request.transcript_block);

    let mut prompt = String::new();
    prompt.push_str("The following is a meeting transcript record.\n\n");
    prompt.push_str(request.transcript_block);
    prompt.push_str("\n\n");
    if request.stats.is_empty() {
        prompt.push_str("Participants: (none, the transcript contained no statements)\n");
    } else {
        prompt.push_str(&format!("Participants: {}\n", participants));
    }
    prompt.push_str("\n---\n\n");
    prompt.push_str(&body);

    if let Some(instructions) = request.custom_instructions {
        if !instructions.trim().is_empty() {
            prompt.push_str("\n\n---\nAdditional instructions:\n");
            prompt.push_str(instructions.trim());
            prompt.push('\n');
        }
    }

    prompt
}

/// Canonical YYYY-MM-DD, or literal "N/A" when unknown, never a guess
pub fn format_anchor_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => "N/A".to_string(),
    }
}

/// Format one meeting (info, statistics, conversation) for the prompt
pub fn build_meeting_block(
    title: &str,
    date: Option<NaiveDate>,
    statements: &[Statement],
    stats: &MeetingStats,
) -> String {
    let mut block = String::new();

    block.push_str("=== Meeting information ===\n");
    block.push_str(&format!("Title: {}\n", title));
    block.push_str(&format!("Date: {}\n", format_anchor_date(date)));
    block.push_str(&format!(
        "Participants: {}\n",
        stats.participant_names().join(", ")
    ));
    block.push('\n');
    block.push_str(&format_stats_block(stats));
    block.push_str("\n=== Transcript ===\n");

    for statement in statements {
        match &statement.timestamp {
            Some(timestamp) => block.push_str(&format!(
                "[{}] {}: {}\n",
                timestamp, statement.speaker, statement.text
            )),
            None => block.push_str(&format!("{}: {}\n", statement.speaker, statement.text)),
        }
    }

    block
}

/// Section header separating meetings inside an aggregated prompt
pub fn format_meeting_section(title: &str, date: Option<NaiveDate>, transcript: &str) -> String {
    format!(
        "=== Meeting: {} ({}) ===\n\n{}\n",
        title,
        format_anchor_date(date),
        transcript.trim()
    )
}

/// Per-participant statistics, rendered deterministically (map order)
pub fn format_stats_block(stats: &MeetingStats) -> String {
    let mut block = String::from("=== Speaking statistics ===\n");

    if stats.is_empty() {
        block.push_str("(no statements parsed)\n");
        return block;
    }

    for (name, participant) in &stats.participants {
        let rate = participation_rate(participant.speak_count, stats.total_statements);
        block.push_str(&format!("{}:\n", name));
        block.push_str(&format!("  - statements: {}\n", participant.speak_count));
        block.push_str(&format!("  - words: {}\n", participant.total_words));
        block.push_str(&format!(
            "  - participation: {:.1}% of {} statements\n",
            rate, stats.total_statements
        ));
        if participant.meetings_attended > 1 {
            block.push_str(&format!(
                "  - meetings attended: {}\n",
                participant.meetings_attended
            ));
        }
        if let Some((first, last)) = participant.time_range() {
            block.push_str(&format!("  - active: {} ~ {}\n", first, last));
        }
    }

    block
}
