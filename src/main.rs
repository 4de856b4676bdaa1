use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use colloquy::models::{report, MeetingRecord};
use colloquy::stages::{aggregate_meeting, AliasTable, StatementParser};
use colloquy::{
    analyze_aggregated, analyze_batch, builtin_registry, load_meeting_records, AggregateConfig,
    AnalysisStatus, AnalyzeConfig, GeminiClient, GeminiConfig, TemplateRegistry,
};

#[derive(Parser)]
#[command(name = "colloquy")]
#[command(author, version, about = "Meeting transcript analysis pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze each meeting in a records file individually
    Analyze {
        /// Input meeting records (JSON object or array)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for analysis results (JSON); prints a summary if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Template name
        #[arg(short, long, default_value = "default")]
        template: String,

        /// Template version (defaults to the latest)
        #[arg(long)]
        version: Option<String>,

        /// Additional instructions appended to the prompt
        #[arg(long)]
        instructions: Option<String>,

        /// File containing a fully custom prompt body (bypasses the registry)
        #[arg(long)]
        custom_prompt_file: Option<PathBuf>,

        /// Replacement template catalog (JSON)
        #[arg(long)]
        templates_file: Option<PathBuf>,

        /// Participant alias table (JSON)
        #[arg(long)]
        aliases: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Merge all meetings in a records file into one aggregated analysis
    Aggregate {
        /// Input meeting records (JSON object or array)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the aggregated result (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Template name (aggregated family)
        #[arg(short, long, default_value = "comprehensive_review")]
        template: String,

        /// Template version (defaults to the latest)
        #[arg(long)]
        version: Option<String>,

        /// Additional instructions appended to the prompt
        #[arg(long)]
        instructions: Option<String>,

        /// Anchor date (YYYY-MM-DD); defaults to the earliest meeting date
        #[arg(long)]
        date: Option<String>,

        /// Replacement template catalog (JSON)
        #[arg(long)]
        templates_file: Option<PathBuf>,

        /// Participant alias table (JSON)
        #[arg(long)]
        aliases: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Parse and aggregate without calling the model
    Stats {
        /// Input meeting records (JSON object or array)
        #[arg(short, long)]
        input: PathBuf,

        /// Participant alias table (JSON)
        #[arg(long)]
        aliases: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List available templates and versions
    Templates {
        /// Show versions for one template
        #[arg(long)]
        name: Option<String>,

        /// Replacement template catalog (JSON)
        #[arg(long)]
        templates_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            output,
            template,
            version,
            instructions,
            custom_prompt_file,
            templates_file,
            aliases,
            verbose,
        } => {
            setup_logging(verbose);
            let config = AnalyzeConfig {
                template,
                version,
                custom_instructions: instructions,
                custom_prompt: custom_prompt_file
                    .map(|path| {
                        std::fs::read_to_string(&path)
                            .with_context(|| format!("Failed to read custom prompt: {:?}", path))
                    })
                    .transpose()?,
            };
            run_analyze(input, output, templates_file, aliases, config).await
        }
        Commands::Aggregate {
            input,
            output,
            template,
            version,
            instructions,
            date,
            templates_file,
            aliases,
            verbose,
        } => {
            setup_logging(verbose);
            let date = date
                .map(|d| {
                    d.parse::<chrono::NaiveDate>()
                        .with_context(|| format!("Invalid date '{}': expected YYYY-MM-DD", d))
                })
                .transpose()?;
            let config = AggregateConfig {
                template,
                version,
                custom_instructions: instructions,
                date,
            };
            run_aggregate(input, output, templates_file, aliases, config).await
        }
        Commands::Stats {
            input,
            aliases,
            verbose,
        } => {
            setup_logging(verbose);
            run_stats(input, aliases)
        }
        Commands::Templates {
            name,
            templates_file,
        } => run_templates(name, templates_file),
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn load_registry(templates_file: Option<PathBuf>) -> Result<TemplateRegistry> {
    match templates_file {
        Some(path) => TemplateRegistry::from_json_file(&path),
        None => builtin_registry(),
    }
}

fn load_aliases(aliases: Option<PathBuf>) -> Result<AliasTable> {
    match aliases {
        Some(path) => AliasTable::from_json_file(&path),
        None => Ok(AliasTable::empty()),
    }
}

fn load_inputs(input: &Path) -> Result<Vec<MeetingRecord>> {
    let records = load_meeting_records(input)?;
    info!("Loaded {} meeting record(s) from {:?}", records.len(), input);
    Ok(records)
}

async fn run_analyze(
    input: PathBuf,
    output: Option<PathBuf>,
    templates_file: Option<PathBuf>,
    aliases: Option<PathBuf>,
    config: AnalyzeConfig,
) -> Result<()> {
    let registry = load_registry(templates_file)?;
    let aliases = load_aliases(aliases)?;
    let records = load_inputs(&input)?;
    let client = GeminiClient::new(GeminiConfig::from_env()?)?;

    let results = analyze_batch(&client, &registry, &aliases, &records, &config).await;

    let failures = results
        .iter()
        .filter(|r| r.status == AnalysisStatus::Error)
        .count();
    info!(
        "Analyzed {} meeting(s), {} succeeded, {} failed",
        results.len(),
        results.len() - failures,
        failures
    );

    match output {
        Some(path) => {
            report::write_json(&results, &path)?;
            info!("Results written to {:?}", path);
        }
        None => print_analysis_summary(&results),
    }

    Ok(())
}

async fn run_aggregate(
    input: PathBuf,
    output: Option<PathBuf>,
    templates_file: Option<PathBuf>,
    aliases: Option<PathBuf>,
    config: AggregateConfig,
) -> Result<()> {
    let registry = load_registry(templates_file)?;
    let aliases = load_aliases(aliases)?;
    let records = load_inputs(&input)?;
    let client = GeminiClient::new(GeminiConfig::from_env()?)?;

    let result = analyze_aggregated(&client, &registry, &aliases, &records, &config).await;

    match output {
        Some(path) => {
            report::write_json(&result, &path)?;
            info!("Aggregated result written to {:?}", path);
        }
        None => {
            println!("Aggregated analysis ({} meetings)", result.meeting_count);
            println!("================================");
            match (&result.analysis, &result.error) {
                (Some(analysis), _) => println!("{}", analysis),
                (None, Some(error)) => println!("Error: {}", error),
                (None, None) => {}
            }
        }
    }

    Ok(())
}

fn run_stats(input: PathBuf, aliases: Option<PathBuf>) -> Result<()> {
    let aliases = load_aliases(aliases)?;
    let records = load_inputs(&input)?;
    let parser = StatementParser::new();

    for record in &records {
        let mut parsed = parser.parse(&record.transcript);
        aliases.normalize_transcript(&mut parsed);
        let stats = aggregate_meeting(&parsed.statements);

        println!("Meeting: {}", record.title);
        println!(
            "Date: {}",
            record
                .date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "N/A".to_string())
        );
        println!("Statements: {}", stats.total_statements);
        if !parsed.preamble.is_empty() {
            println!("Preamble lines: {}", parsed.preamble.len());
        }
        println!("Participants:");
        for (name, participant) in &stats.participants {
            let rate = colloquy::models::participation_rate(
                participant.speak_count,
                stats.total_statements,
            );
            println!(
                "  {}: {} statements, {} words ({:.1}%)",
                name, participant.speak_count, participant.total_words, rate
            );
        }
        println!();
    }

    Ok(())
}

fn run_templates(name: Option<String>, templates_file: Option<PathBuf>) -> Result<()> {
    let registry = load_registry(templates_file)?;

    match name {
        Some(name) => {
            let versions = registry.list_versions(&name)?;
            let latest = registry.latest_version(&name)?;
            println!("Template: {}", name);
            for version in versions {
                let marker = if version == latest { " (latest)" } else { "" };
                println!("  {}{}", version, marker);
            }
        }
        None => {
            println!("Available templates");
            println!("===================");
            for summary in registry.list() {
                println!(
                    "{} [{}] - {}",
                    summary.name, summary.latest_version, summary.description
                );
                println!("  versions: {}", summary.versions.join(", "));
            }
        }
    }

    Ok(())
}

fn print_analysis_summary(results: &[colloquy::AnalysisResult]) {
    println!("Analysis summary");
    println!("================");

    for result in results {
        println!();
        println!("Meeting: {}", result.meeting_title);
        println!(
            "Date: {}",
            result
                .meeting_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "N/A".to_string())
        );
        println!("Statements: {}", result.total_statements);
        println!("Participants: {}", result.participants.join(", "));
        println!(
            "Template: {} ({})",
            result.template_used,
            result.template_version.as_deref().unwrap_or("custom")
        );

        match (&result.analysis, &result.error) {
            (Some(analysis), _) => {
                println!();
                println!("{}", analysis);
            }
            (None, Some(error)) => println!("Error: {}", error),
            (None, None) => {}
        }
        println!("{}", "-".repeat(60));
    }
}
