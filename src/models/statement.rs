use serde::{Deserialize, Serialize};

/// One attributed utterance extracted from a transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    /// Timestamp as it appeared in the transcript ("HH:MM:SS" or "MM:SS"),
    /// None when the statement carried no timestamp
    pub timestamp: Option<String>,
    /// Speaker label (raw after parsing, canonical after normalization)
    pub speaker: String,
    /// The statement text, continuation lines joined with single spaces
    pub text: String,
}

impl Statement {
    pub fn new(timestamp: Option<String>, speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            speaker: speaker.into(),
            text: text.into(),
        }
    }

    /// Number of whitespace-delimited tokens in the statement text
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Output of the transcript parser
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedTranscript {
    /// Statements in transcript appearance order
    pub statements: Vec<Statement>,
    /// Lines that appeared before the first recognized marker.
    /// Never attributed to a speaker and never counted as statements.
    pub preamble: Vec<String>,
}

impl ParsedTranscript {
    /// Total number of attributed statements
    pub fn total_statements(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Unique speaker labels in first-appearance order
    pub fn speakers(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for statement in &self.statements {
            if !seen.iter().any(|s| s == &statement.speaker) {
                seen.push(statement.speaker.clone());
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count() {
        let s = Statement::new(Some("00:01:23".to_string()), "Kim", "Let's start the meeting");
        assert_eq!(s.word_count(), 4);

        let empty = Statement::new(None, "Kim", "");
        assert_eq!(empty.word_count(), 0);
    }

    #[test]
    fn test_speakers_first_appearance_order() {
        let parsed = ParsedTranscript {
            statements: vec![
                Statement::new(None, "Kim", "a"),
                Statement::new(None, "Lee", "b"),
                Statement::new(None, "Kim", "c"),
            ],
            preamble: vec![],
        };

        assert_eq!(parsed.speakers(), vec!["Kim".to_string(), "Lee".to_string()]);
        assert_eq!(parsed.total_statements(), 3);
    }
}
