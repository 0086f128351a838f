use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::error;

use labsight::analysis::{assess_rules, RiskFinding, TrendSummary};
use labsight::config::AppConfig;
use labsight::export::{write_csv_file, write_pdf_file};
use labsight::models::{AnalysisWarning, ReportEntry};
use labsight::pipeline::metrics::{blood_pressure_category, MetricRecordBuilder, ReferenceResolver, ReferenceTable};
use labsight::pipeline::structuring::{ChatCompletionClient, ReportAnalyzer, ReportSummarizer};
use labsight::session::{process_batch, DocumentInput, SessionContext};

#[derive(Parser, Debug)]
#[command(
    name = "labsight",
    version,
    about = "Extract lab metrics from medical reports and ask questions about them"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract, classify and export metrics from one or more reports.
    Analyze(AnalyzeArgs),
    /// Answer a question grounded in the given reports.
    Ask(AskArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Write the latest report's metrics as CSV.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write the latest report's summary PDF.
    #[arg(long)]
    pdf: Option<PathBuf>,

    /// Pattern extraction only; no completion service.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Print machine-readable JSON instead of tables.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug)]
struct AskArgs {
    #[arg(required = true)]
    files: Vec<PathBuf>,

    #[arg(long, short)]
    question: String,

    /// Build records by pattern extraction; the answer still needs the completion service.
    #[arg(long, default_value_t = false)]
    offline: bool,
}

#[derive(Serialize)]
struct AnalyzeOutput<'a> {
    reports: &'a [ReportEntry],
    findings: Vec<ReportFindings<'a>>,
    trends: Vec<TrendSummary>,
    warnings: &'a [AnalysisWarning],
}

#[derive(Serialize)]
struct ReportFindings<'a> {
    source: &'a str,
    findings: Vec<RiskFinding>,
}

fn main() {
    labsight::init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env();

    match cli.command {
        Commands::Analyze(args) => analyze(&config, args),
        Commands::Ask(args) => ask(&config, args),
    }
}

fn build_analyzer(config: &AppConfig, offline: bool) -> Result<ReportAnalyzer> {
    let resolver = match &config.reference_ranges {
        Some(path) => ReferenceResolver::new(
            ReferenceTable::load(path)
                .with_context(|| format!("loading reference ranges from {}", path.display()))?,
        ),
        None => ReferenceResolver::default(),
    };
    let builder = MetricRecordBuilder::with_resolver(resolver);

    if offline {
        return Ok(ReportAnalyzer::offline(builder));
    }
    let client = ChatCompletionClient::from_config(config).context("configuring completion service")?;
    Ok(ReportAnalyzer::new(Some(ReportSummarizer::new(Box::new(client))), builder))
}

fn load_session(config: &AppConfig, files: &[PathBuf], offline: bool) -> Result<(SessionContext, Vec<AnalysisWarning>)> {
    let analyzer = Arc::new(build_analyzer(config, offline)?);
    let inputs = files
        .iter()
        .map(|p| DocumentInput::from_path(p).with_context(|| format!("reading {}", p.display())))
        .collect::<Result<Vec<_>>>()?;

    let runtime = tokio::runtime::Runtime::new().context("starting runtime")?;
    let outcome = runtime.block_on(process_batch(Arc::clone(&analyzer), inputs));
    drop(runtime);

    let mut session = SessionContext::new(config.clone());
    let warnings = session.ingest_batch(outcome);
    Ok((session, warnings))
}

fn analyze(config: &AppConfig, args: AnalyzeArgs) -> Result<()> {
    let (session, warnings) = load_session(config, &args.files, args.offline)?;
    let reports = session.reports().entries();

    if args.json {
        let output = AnalyzeOutput {
            reports,
            findings: reports
                .iter()
                .map(|r| ReportFindings {
                    source: &r.source,
                    findings: assess_rules(&r.records),
                })
                .collect(),
            trends: session.trends(),
            warnings: &warnings,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for report in reports {
            print_report(report);
        }
        if reports.len() > 1 {
            print_trends(&session.trends());
        }
        for warning in &warnings {
            eprintln!("warning: {warning}");
        }
    }

    if let Some(latest) = session.latest_report() {
        if let Some(path) = &args.csv {
            write_csv_file(path, &latest.records).with_context(|| format!("writing {}", path.display()))?;
        }
        if let Some(path) = &args.pdf {
            write_pdf_file(path, &latest.records).with_context(|| format!("writing {}", path.display()))?;
        }
    }
    Ok(())
}

fn ask(config: &AppConfig, args: AskArgs) -> Result<()> {
    let client = ChatCompletionClient::from_config(config).context("configuring completion service")?;
    let (mut session, warnings) = load_session(config, &args.files, args.offline)?;
    for warning in &warnings {
        eprintln!("warning: {warning}");
    }

    let answer = session.ask(&args.question, &client)?;
    println!("{answer}");
    Ok(())
}

fn print_report(report: &ReportEntry) {
    println!("== {} ==", report.source);
    if let Some(summary) = &report.summary {
        println!("{summary}\n");
    }
    if !report.has_metrics() {
        println!("No recognizable health metrics found.\n");
        return;
    }

    println!("{:<22} {:>12} {:<12} {:<16} {}", "Metric", "Value", "Unit", "Reference", "Status");
    for record in &report.records {
        let range = record.reference_range().map(|r| r.to_string()).unwrap_or_default();
        let mut status = record.status().to_string();
        if let Some(category) = blood_pressure_category(record.value()) {
            status = format!("{status} ({category})");
        }
        println!(
            "{:<22} {:>12} {:<12} {:<16} {}",
            record.metric(),
            record.value().to_string(),
            record.unit_or_unknown(),
            range,
            status
        );
    }

    let findings = assess_rules(&report.records);
    if !findings.is_empty() {
        println!("\nRisk assessment:");
        for f in findings {
            println!("  [{}] {}", f.level, f.message);
        }
    }
    println!();
}

fn print_trends(trends: &[TrendSummary]) {
    let flagged: Vec<&TrendSummary> = trends.iter().filter(|t| !t.anomalies.is_empty()).collect();
    if flagged.is_empty() {
        return;
    }
    println!("Trend anomalies:");
    for t in flagged {
        let points: Vec<String> = t
            .anomalies
            .iter()
            .map(|p| format!("{} = {}", p.source, p.value))
            .collect();
        println!("  {}: {}", t.series.metric, points.join(", "));
    }
}
