use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use crate::llm::ModelClient;
use crate::models::{
    AggregateResult, AnalysisResult, AnalysisStatus, DateRange, MeetingDescriptor, MeetingRecord,
    MeetingStats, Provenance,
};
use crate::stages::{
    aggregate_across, aggregate_meeting, assemble, build_meeting_block, format_meeting_section,
    format_stats_block, AliasTable, PromptRequest, StatementParser,
};
use crate::templates::{TemplateRegistry, TemplateVersion};

/// Name recorded when a caller-supplied prompt bypasses the registry
const CUSTOM_TEMPLATE_NAME: &str = "custom";

/// Configuration for single-meeting analysis
#[derive(Debug, Clone)]
pub struct AnalyzeConfig {
    /// Template name to resolve
    pub template: String,
    /// Template version; None or "latest" selects the flagged latest
    pub version: Option<String>,
    /// Extra instructions appended after the template body
    pub custom_instructions: Option<String>,
    /// Fully custom template body; bypasses the registry entirely
    pub custom_prompt: Option<String>,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            template: "default".to_string(),
            version: None,
            custom_instructions: None,
            custom_prompt: None,
        }
    }
}

/// Configuration for aggregated multi-meeting analysis
#[derive(Debug, Clone)]
pub struct AggregateConfig {
    pub template: String,
    pub version: Option<String>,
    pub custom_instructions: Option<String>,
    /// Anchor date override; defaults to the earliest meeting date
    pub date: Option<NaiveDate>,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            template: "comprehensive_review".to_string(),
            version: None,
            custom_instructions: None,
            date: None,
        }
    }
}

/// Run the full pipeline for one meeting: parse, normalize, aggregate,
/// resolve, assemble, generate. Every failure mode surfaces as an
/// error-status result; this function never aborts the caller.
pub async fn analyze_meeting(
    client: &dyn ModelClient,
    registry: &TemplateRegistry,
    aliases: &AliasTable,
    record: &MeetingRecord,
    config: &AnalyzeConfig,
) -> AnalysisResult {
    let parser = StatementParser::new();
    analyze_with_parser(&parser, client, registry, aliases, record, config).await
}

async fn analyze_with_parser(
    parser: &StatementParser,
    client: &dyn ModelClient,
    registry: &TemplateRegistry,
    aliases: &AliasTable,
    record: &MeetingRecord,
    config: &AnalyzeConfig,
) -> AnalysisResult {
    let mut parsed = parser.parse(&record.transcript);
    aliases.normalize_transcript(&mut parsed);
    let stats = aggregate_meeting(&parsed.statements);

    info!(
        "Meeting '{}': {} statements, {} participants",
        record.title,
        stats.total_statements,
        stats.participants.len()
    );

    let descriptor = MeetingDescriptor {
        id: record.id.clone(),
        title: record.title.clone(),
        date: record.date,
    };

    // Resolve the template up front so provenance is known even on failure
    let (provenance, template) = match select_template(registry, config, client.model_name()) {
        Ok(selection) => selection,
        Err((provenance, message)) => {
            warn!("Meeting '{}': {}", record.title, message);
            return AnalysisResult::error(descriptor, message, stats, provenance);
        }
    };

    let block = build_meeting_block(&record.title, record.date, &parsed.statements, &stats);
    let request = PromptRequest {
        meeting_date: record.date,
        stats: &stats,
        transcript_block: &block,
        custom_instructions: config.custom_instructions.as_deref(),
    };
    let prompt = assemble(&template, &request);

    match client.generate(&prompt).await {
        Ok(analysis) => AnalysisResult::success(descriptor, analysis, stats, provenance),
        Err(e) => {
            warn!("Meeting '{}': model call failed: {:#}", record.title, e);
            AnalysisResult::error(descriptor, format!("{:#}", e), stats, provenance)
        }
    }
}

/// Pick the template body for a request: the caller's custom prompt, or
/// a registry resolution. Resolution failure is returned with the
/// provenance it should be reported under.
fn select_template(
    registry: &TemplateRegistry,
    config: &AnalyzeConfig,
    model_name: &str,
) -> Result<(Provenance, TemplateVersion), (Provenance, String)> {
    if let Some(custom) = &config.custom_prompt {
        let provenance = Provenance {
            template_used: CUSTOM_TEMPLATE_NAME.to_string(),
            template_version: None,
            model_used: model_name.to_string(),
        };
        let template = TemplateVersion {
            content: custom.clone(),
            description: String::new(),
            is_latest: false,
        };
        return Ok((provenance, template));
    }

    match registry.resolve_entry(&config.template, config.version.as_deref()) {
        Ok((version, template)) => Ok((
            Provenance {
                template_used: config.template.clone(),
                template_version: Some(version.to_string()),
                model_used: model_name.to_string(),
            },
            template.clone(),
        )),
        Err(e) => Err((
            Provenance {
                template_used: config.template.clone(),
                template_version: config.version.clone(),
                model_used: model_name.to_string(),
            },
            e.to_string(),
        )),
    }
}

/// Analyze a batch of meetings, preserving input order. Each meeting's
/// failure is captured in its own result; nothing aborts the batch.
pub async fn analyze_batch(
    client: &dyn ModelClient,
    registry: &TemplateRegistry,
    aliases: &AliasTable,
    records: &[MeetingRecord],
    config: &AnalyzeConfig,
) -> Vec<AnalysisResult> {
    let parser = StatementParser::new();
    let mut results = Vec::with_capacity(records.len());

    for (idx, record) in records.iter().enumerate() {
        info!("Analyzing meeting {}/{}: {}", idx + 1, records.len(), record.title);
        let result =
            analyze_with_parser(&parser, client, registry, aliases, record, config).await;
        if result.status == AnalysisStatus::Error {
            warn!(
                "Meeting {}/{} finished with error: {}",
                idx + 1,
                records.len(),
                result.error.as_deref().unwrap_or("unknown")
            );
        }
        results.push(result);
    }

    results
}

/// Merge many meetings into one aggregated analysis (daily/weekly-style
/// reports). Meetings are ordered by date; the anchor date is the
/// explicit override or the earliest meeting date.
pub async fn analyze_aggregated(
    client: &dyn ModelClient,
    registry: &TemplateRegistry,
    aliases: &AliasTable,
    records: &[MeetingRecord],
    config: &AggregateConfig,
) -> AggregateResult {
    let analyze_config = AnalyzeConfig {
        template: config.template.clone(),
        version: config.version.clone(),
        custom_instructions: config.custom_instructions.clone(),
        custom_prompt: None,
    };

    let mut sorted: Vec<&MeetingRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.date);

    let parser = StatementParser::new();
    let mut sections = Vec::with_capacity(sorted.len());
    let mut per_meeting = Vec::with_capacity(sorted.len());

    for record in &sorted {
        let mut parsed = parser.parse(&record.transcript);
        aliases.normalize_transcript(&mut parsed);
        per_meeting.push(aggregate_meeting(&parsed.statements));
        sections.push(format_meeting_section(
            &record.title,
            record.date,
            &record.transcript,
        ));
    }

    let combined = aggregate_across(&per_meeting);
    let anchor_date = config.date.or_else(|| sorted.iter().find_map(|r| r.date));
    let date_range = DateRange {
        start: sorted.iter().find_map(|r| r.date),
        end: sorted.iter().rev().find_map(|r| r.date),
    };
    let meeting_titles: Vec<String> = sorted.iter().map(|r| r.title.clone()).collect();

    if records.is_empty() {
        return aggregate_result(
            AnalysisStatus::Error,
            None,
            Some("no meetings to aggregate".to_string()),
            combined,
            meeting_titles,
            date_range,
            Provenance {
                template_used: config.template.clone(),
                template_version: config.version.clone(),
                model_used: client.model_name().to_string(),
            },
        );
    }

    info!(
        "Aggregating {} meetings, {} participants",
        sorted.len(),
        combined.participants.len()
    );

    let (provenance, template) =
        match select_template(registry, &analyze_config, client.model_name()) {
            Ok(selection) => selection,
            Err((provenance, message)) => {
                warn!("Aggregated analysis: {}", message);
                return aggregate_result(
                    AnalysisStatus::Error,
                    None,
                    Some(message),
                    combined,
                    meeting_titles,
                    date_range,
                    provenance,
                );
            }
        };

    let block = format!("{}\n{}", sections.join("\n"), format_stats_block(&combined));
    let request = PromptRequest {
        meeting_date: anchor_date,
        stats: &combined,
        transcript_block: &block,
        custom_instructions: config.custom_instructions.as_deref(),
    };
    let prompt = assemble(&template, &request);

    match client.generate(&prompt).await {
        Ok(analysis) => aggregate_result(
            AnalysisStatus::Success,
            Some(analysis),
            None,
            combined,
            meeting_titles,
            date_range,
            provenance,
        ),
        Err(e) => {
            warn!("Aggregated analysis: model call failed: {:#}", e);
            aggregate_result(
                AnalysisStatus::Error,
                None,
                Some(format!("{:#}", e)),
                combined,
                meeting_titles,
                date_range,
                provenance,
            )
        }
    }
}

fn aggregate_result(
    status: AnalysisStatus,
    analysis: Option<String>,
    error: Option<String>,
    stats: MeetingStats,
    meeting_titles: Vec<String>,
    date_range: DateRange,
    provenance: Provenance,
) -> AggregateResult {
    AggregateResult {
        analysis_id: uuid::Uuid::new_v4().to_string(),
        status,
        analysis,
        error,
        meeting_count: meeting_titles.len(),
        meeting_titles,
        date_range,
        participants: stats.participant_names(),
        total_statements: stats.total_statements,
        stats,
        template_used: provenance.template_used,
        template_version: provenance.template_version,
        model_used: provenance.model_used,
        timestamp: Utc::now().to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::templates::builtin_registry;

    /// Fake model that fails on a chosen call number
    struct ScriptedClient {
        fail_on: Option<usize>,
        calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn ok() -> Self {
            Self {
                fail_on: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing_on(call: usize) -> Self {
            Self {
                fail_on: Some(call),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedClient {
        fn model_name(&self) -> &str {
            "scripted-model"
        }

        async fn generate(&self, prompt: &str) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on == Some(call) {
                anyhow::bail!("scripted model failure on call {}", call);
            }
            Ok(format!("analysis of {} bytes", prompt.len()))
        }
    }

    fn record(id: &str, title: &str, transcript: &str) -> MeetingRecord {
        MeetingRecord {
            id: id.to_string(),
            title: title.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 11, 17),
            participants: vec![],
            transcript: transcript.to_string(),
        }
    }

    const TRANSCRIPT: &str =
        "[00:01:23] Kim: Let's start.\n[00:01:30] Lee: Ready.\n[00:02:00] Kim: Great, let's begin.";

    #[tokio::test]
    async fn test_single_meeting_success() {
        let client = ScriptedClient::ok();
        let registry = builtin_registry().unwrap();
        let aliases = AliasTable::empty();
        let rec = record("m-1", "Standup", TRANSCRIPT);

        let result =
            analyze_meeting(&client, &registry, &aliases, &rec, &AnalyzeConfig::default()).await;

        assert_eq!(result.status, AnalysisStatus::Success);
        assert_eq!(result.total_statements, 3);
        assert_eq!(result.stats.participants["Kim"].speak_count, 2);
        assert_eq!(result.stats.participants["Lee"].speak_count, 1);
        assert_eq!(result.template_used, "default");
        assert_eq!(result.template_version.as_deref(), Some("2.0"));
        assert_eq!(result.model_used, "scripted-model");
    }

    #[tokio::test]
    async fn test_empty_transcript_is_success_not_error() {
        let client = ScriptedClient::ok();
        let registry = builtin_registry().unwrap();
        let aliases = AliasTable::empty();
        let rec = record("m-1", "Empty", "");

        let result =
            analyze_meeting(&client, &registry, &aliases, &rec, &AnalyzeConfig::default()).await;

        assert_eq!(result.status, AnalysisStatus::Success);
        assert_eq!(result.total_statements, 0);
        assert!(result.stats.participants.is_empty());
        assert!(result.participants.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_version_is_reported_not_substituted() {
        let client = ScriptedClient::ok();
        let registry = builtin_registry().unwrap();
        let aliases = AliasTable::empty();
        let rec = record("m-1", "Standup", TRANSCRIPT);
        let config = AnalyzeConfig {
            version: Some("9.9".to_string()),
            ..Default::default()
        };

        let result = analyze_meeting(&client, &registry, &aliases, &rec, &config).await;

        assert_eq!(result.status, AnalysisStatus::Error);
        assert!(result.error.as_deref().unwrap().contains("9.9"));
        // No model call happened for this request
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_custom_prompt_bypasses_registry() {
        let client = ScriptedClient::ok();
        let registry = builtin_registry().unwrap();
        let aliases = AliasTable::empty();
        let rec = record("m-1", "Standup", TRANSCRIPT);
        let config = AnalyzeConfig {
            custom_prompt: Some("Rate each participant's clarity from 1-10.".to_string()),
            ..Default::default()
        };

        let result = analyze_meeting(&client, &registry, &aliases, &rec, &config).await;

        assert_eq!(result.status, AnalysisStatus::Success);
        assert_eq!(result.template_used, "custom");
        assert_eq!(result.template_version, None);
    }

    #[tokio::test]
    async fn test_batch_isolates_failures_and_preserves_order() {
        let client = ScriptedClient::failing_on(2);
        let registry = builtin_registry().unwrap();
        let aliases = AliasTable::empty();
        let records = vec![
            record("m-1", "First", TRANSCRIPT),
            record("m-2", "Second", TRANSCRIPT),
            record("m-3", "Third", TRANSCRIPT),
        ];

        let results = analyze_batch(
            &client,
            &registry,
            &aliases,
            &records,
            &AnalyzeConfig::default(),
        )
        .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].status, AnalysisStatus::Success);
        assert_eq!(results[1].status, AnalysisStatus::Error);
        assert_eq!(results[2].status, AnalysisStatus::Success);
        assert_eq!(results[0].meeting_id, "m-1");
        assert_eq!(results[1].meeting_id, "m-2");
        assert_eq!(results[2].meeting_id, "m-3");
        assert!(results[1].error.as_deref().unwrap().contains("scripted model failure"));
    }

    #[tokio::test]
    async fn test_aggregated_analysis_merges_meetings() {
        let client = ScriptedClient::ok();
        let registry = builtin_registry().unwrap();
        let aliases = AliasTable::empty();

        let mut monday = record("m-1", "Monday sync", TRANSCRIPT);
        monday.date = NaiveDate::from_ymd_opt(2025, 11, 17);
        let mut tuesday = record("m-2", "Tuesday sync", "[00:01:00] Kim: More updates today.");
        tuesday.date = NaiveDate::from_ymd_opt(2025, 11, 18);

        // Intentionally out of order; aggregation sorts by date
        let records = vec![tuesday, monday];
        let result = analyze_aggregated(
            &client,
            &registry,
            &aliases,
            &records,
            &AggregateConfig::default(),
        )
        .await;

        assert_eq!(result.status, AnalysisStatus::Success);
        assert_eq!(result.meeting_count, 2);
        assert_eq!(
            result.meeting_titles,
            vec!["Monday sync".to_string(), "Tuesday sync".to_string()]
        );
        assert_eq!(result.date_range.start, NaiveDate::from_ymd_opt(2025, 11, 17));
        assert_eq!(result.date_range.end, NaiveDate::from_ymd_opt(2025, 11, 18));
        assert_eq!(result.stats.participants["Kim"].meetings_attended, 2);
        assert_eq!(result.stats.participants["Lee"].meetings_attended, 1);
        assert_eq!(result.total_statements, 4);
        assert_eq!(result.template_used, "comprehensive_review");
    }

    #[tokio::test]
    async fn test_aggregated_empty_batch_is_error() {
        let client = ScriptedClient::ok();
        let registry = builtin_registry().unwrap();
        let aliases = AliasTable::empty();

        let result =
            analyze_aggregated(&client, &registry, &aliases, &[], &AggregateConfig::default())
                .await;

        assert_eq!(result.status, AnalysisStatus::Error);
        assert_eq!(result.meeting_count, 0);
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_aliases_flow_through_analysis() {
        let client = ScriptedClient::ok();
        let registry = builtin_registry().unwrap();
        let aliases = AliasTable::from_json(r#"{"Kim": "Kim Minsoo"}"#).unwrap();
        let rec = record("m-1", "Standup", TRANSCRIPT);

        let result =
            analyze_meeting(&client, &registry, &aliases, &rec, &AnalyzeConfig::default()).await;

        assert!(result.stats.participants.contains_key("Kim Minsoo"));
        assert!(!result.stats.participants.contains_key("Kim"));
        assert_eq!(result.stats.participants["Kim Minsoo"].speak_count, 2);
    }
}
