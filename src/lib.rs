pub mod analyzer;
pub mod llm;
pub mod models;
pub mod stages;
pub mod templates;

pub use analyzer::{
    analyze_aggregated, analyze_batch, analyze_meeting, AggregateConfig, AnalyzeConfig,
};
pub use llm::{GeminiClient, GeminiConfig, ModelClient};
pub use models::{
    load_meeting_records, parse_meeting_records, AggregateResult, AnalysisResult, AnalysisStatus,
    MeetingRecord, MeetingStats, ParsedTranscript, ParticipantStats, Statement,
};
pub use stages::{
    aggregate_across, aggregate_meeting, assemble, AliasTable, PromptRequest, StatementParser,
};
pub use templates::{builtin_registry, TemplateError, TemplateRegistry, TemplateVersion};
