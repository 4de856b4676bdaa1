use regex::Regex;

use crate::models::{ParsedTranscript, Statement};

/// Transcript statement parser.
///
/// Recognizes four marker conventions:
/// 1. `[00:01:23] Kim: text` / `[01:23] Kim: text`
/// 2. `00:01:23 Kim: text` / `01:23 Kim: text`
/// 3. a bare timestamp line, with `Kim: text` on a following line
/// 4. `Kim: text` with no timestamp at all
///
/// Any other line continues the previous statement; lines before the
/// first statement land in the preamble bucket. Parsing is pure: the
/// same input always yields the same output.
pub struct StatementParser {
    bracketed: Regex,
    unbracketed: Regex,
    bare_timestamp: Regex,
    speaker_only: Regex,
    noise_speaker: Vec<Regex>,
}

impl Default for StatementParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementParser {
    pub fn new() -> Self {
        // Patterns are fixed string literals, so compilation cannot fail
        let compile = |pattern: &str| {
            Regex::new(pattern).unwrap_or_else(|e| panic!("invalid parser pattern {pattern:?}: {e}"))
        };

        Self {
            bracketed: compile(r"^\[(\d{2}:\d{2}(?::\d{2})?)\]\s*([^:]+):\s*(.*)$"),
            unbracketed: compile(r"^(\d{2}:\d{2}(?::\d{2})?)\s+([^:]+):\s*(.*)$"),
            bare_timestamp: compile(r"^(\d{2}:\d{2}(?::\d{2})?)$"),
            speaker_only: compile(r"^([^:]+):\s*(.+)$"),
            noise_speaker: NOISE_SPEAKER_PATTERNS.iter().map(|p| compile(p)).collect(),
        }
    }

    /// Parse raw transcript text into ordered statements
    pub fn parse(&self, transcript: &str) -> ParsedTranscript {
        let normalized = transcript.replace("\r\n", "\n").replace('\r', "\n");

        let mut parsed = ParsedTranscript::default();
        // Timestamp seen on its own line, waiting for its speaker line
        let mut pending_timestamp: Option<String> = None;

        for raw_line in normalized.lines() {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some((timestamp, speaker, text)) = self.match_timestamped(line) {
                pending_timestamp = None;
                self.push_statement(&mut parsed, Some(timestamp), speaker, text);
                continue;
            }

            if let Some(captures) = self.bare_timestamp.captures(line) {
                pending_timestamp = Some(captures[1].to_string());
                continue;
            }

            if let Some(captures) = self.speaker_only.captures(line) {
                let speaker = captures[1].trim().to_string();
                let text = captures[2].trim().to_string();
                // A label that is itself a timestamp is not a speaker
                if !self.bare_timestamp.is_match(&speaker) {
                    let timestamp = pending_timestamp.take();
                    self.push_statement(&mut parsed, timestamp, speaker, text);
                    continue;
                }
            }

            // Continuation of the previous statement, or preamble
            match parsed.statements.last_mut() {
                Some(last) => {
                    last.text.push(' ');
                    last.text.push_str(line);
                }
                None => parsed.preamble.push(line.to_string()),
            }
        }

        parsed
    }

    fn match_timestamped(&self, line: &str) -> Option<(String, String, String)> {
        let captures = self
            .bracketed
            .captures(line)
            .or_else(|| self.unbracketed.captures(line))?;
        Some((
            captures[1].to_string(),
            captures[2].trim().to_string(),
            captures[3].trim().to_string(),
        ))
    }

    fn push_statement(
        &self,
        parsed: &mut ParsedTranscript,
        timestamp: Option<String>,
        speaker: String,
        text: String,
    ) {
        if self.is_noise_speaker(&speaker) {
            // Boilerplate marker lines ("Transcription ended...") are not
            // statements and carry no transcript content worth keeping.
            return;
        }

        parsed.statements.push(Statement::new(timestamp, speaker, text));
    }

    /// Transcript boilerplate that shows up in the speaker position
    fn is_noise_speaker(&self, speaker: &str) -> bool {
        let speaker = speaker.trim_start_matches('\u{feff}').trim();
        if speaker.is_empty() {
            return true;
        }
        self.noise_speaker.iter().any(|p| p.is_match(speaker))
    }
}

/// Labels produced by transcript exporters rather than people
const NOISE_SPEAKER_PATTERNS: &[&str] = &[
    r"(?i)^Transcription\s+ended",
    r"(?i)^Session\s+ended",
    r"(?i)Meeting\s+ended\s+after",
    r"(?i)^This\s+editable\s+transcript",
    r"(?i)^You\s+should\s+review",
    r"(?i)^Please\s+provide\s+feedback",
    r"(?i)^Get\s+tips",
    r"(?i)^Attachments",
    r"'s\s+Presentation$",
    r"^\*",
    r"^\d+$",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ParsedTranscript {
        StatementParser::new().parse(text)
    }

    #[test]
    fn test_bracketed_timestamps() {
        let parsed = parse(
            "[00:01:23] Kim: Let's start.\n[00:01:30] Lee: Ready.\n[00:02:00] Kim: Great, let's begin.",
        );

        assert_eq!(parsed.total_statements(), 3);
        assert_eq!(parsed.statements[0].timestamp.as_deref(), Some("00:01:23"));
        assert_eq!(parsed.statements[0].speaker, "Kim");
        assert_eq!(parsed.statements[0].text, "Let's start.");
        assert_eq!(parsed.statements[1].speaker, "Lee");
        assert_eq!(parsed.statements[2].speaker, "Kim");
    }

    #[test]
    fn test_unbracketed_and_short_timestamps() {
        let parsed = parse("00:01:23 Kim: one\n[01:30] Lee: two\n01:45 Kim: three");

        assert_eq!(parsed.total_statements(), 3);
        assert_eq!(parsed.statements[1].timestamp.as_deref(), Some("01:30"));
        assert_eq!(parsed.statements[2].timestamp.as_deref(), Some("01:45"));
    }

    #[test]
    fn test_timestamp_on_separate_line() {
        let parsed = parse("00:00:00\n\nJeff Chung: Hello Jamie.\nHow are you?");

        assert_eq!(parsed.total_statements(), 1);
        assert_eq!(parsed.statements[0].timestamp.as_deref(), Some("00:00:00"));
        assert_eq!(parsed.statements[0].speaker, "Jeff Chung");
        assert_eq!(parsed.statements[0].text, "Hello Jamie. How are you?");
    }

    #[test]
    fn test_speaker_without_timestamp() {
        let parsed = parse("Kim: no clock here");

        assert_eq!(parsed.total_statements(), 1);
        assert_eq!(parsed.statements[0].timestamp, None);
        assert_eq!(parsed.statements[0].speaker, "Kim");
    }

    #[test]
    fn test_continuation_lines_append() {
        let parsed = parse("[00:01:00] Kim: We need to decide\nbetween the two options\n[00:02:00] Lee: Agreed");

        assert_eq!(parsed.total_statements(), 2);
        assert_eq!(parsed.statements[0].text, "We need to decide between the two options");
    }

    #[test]
    fn test_preamble_bucket_before_first_marker() {
        let parsed = parse("Weekly sync notes\nRecorded by the bot\n[00:01:00] Kim: hello");

        assert_eq!(parsed.total_statements(), 1);
        assert_eq!(
            parsed.preamble,
            vec!["Weekly sync notes".to_string(), "Recorded by the bot".to_string()]
        );
    }

    #[test]
    fn test_noise_speakers_are_not_statements() {
        let parsed = parse(
            "[00:01:00] Kim: hello\nTranscription ended after 00:45:00: done\n[00:02:00] Lee: bye",
        );

        assert_eq!(parsed.total_statements(), 2);
        assert_eq!(parsed.statements[1].speaker, "Lee");
    }

    #[test]
    fn test_empty_transcript() {
        let parsed = parse("");
        assert!(parsed.is_empty());
        assert!(parsed.preamble.is_empty());
    }

    #[test]
    fn test_crlf_input() {
        let parsed = parse("[00:01:00] Kim: hello\r\n[00:02:00] Lee: hi\r\n");
        assert_eq!(parsed.total_statements(), 2);
    }

    #[test]
    fn test_parse_is_rerunnable() {
        let input = "[00:01:23] Kim: Let's start.\nLee: Ready.";
        let parser = StatementParser::new();
        let a = parser.parse(input);
        let b = parser.parse(input);
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }
}
