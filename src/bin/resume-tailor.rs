//! Command-line front end for the tailoring pipeline.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use resume_tailor::{
    Pipeline, PipelineConfig, RedactionAuditPolicy, RunProgressCallback, RunResult,
};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "resume-tailor",
    version,
    about = "Tailor a résumé to a job description: ATS audit, feedback, cover letter, interview prep",
    long_about = None
)]
struct Cli {
    /// Path to the résumé PDF
    resume: PathBuf,

    /// Job description: a file path, or '-' to read from stdin
    #[arg(short, long)]
    job_description: String,

    /// Directory for output artifacts
    #[arg(short, long, default_value = "tailor-output")]
    output_dir: PathBuf,

    /// Skip the rendered-page vs. extracted-text consistency check
    #[arg(long)]
    no_visual_check: bool,

    /// Source interview questions from real web material
    #[arg(long)]
    web_questions: bool,

    /// Send the unredacted résumé to the ATS audit stage
    #[arg(long)]
    no_sanitize_audit: bool,

    /// Score redaction placeholders as missing contact details
    #[arg(long)]
    penalize_redacted: bool,

    /// LLM provider name (e.g. openai, anthropic); auto-detected if omitted
    #[arg(long, env = "TAILOR_LLM_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(long, env = "TAILOR_MODEL")]
    model: Option<String>,

    /// Per-model-call timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Questions to generate per topic (1-3)
    #[arg(long, default_value_t = 1)]
    questions_per_topic: usize,

    /// Verbose logging (-v: info, -vv: debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Forwards stage events to an indicatif spinner.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }
}

impl RunProgressCallback for CliProgress {
    fn on_run_start(&self) {
        self.bar.set_message("starting run");
    }
    fn on_stage_start(&self, stage: &str) {
        self.bar.set_message(format!("running {stage}"));
    }
    fn on_stage_complete(&self, stage: &str) {
        self.bar.println(format!("  ✓ {stage}"));
    }
    fn on_stage_skipped(&self, stage: &str, reason: &str) {
        self.bar.println(format!("  - {stage} skipped ({reason})"));
    }
    fn on_stage_failed(&self, stage: &str, error: &str) {
        self.bar.println(format!("  ✗ {stage} failed: {error}"));
    }
    fn on_run_complete(&self, _fatal: bool) {
        self.bar.finish_and_clear();
    }
}

fn read_job_description(arg: &str) -> Result<String> {
    if arg == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading job description from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(arg)
            .with_context(|| format!("reading job description from {arg}"))
    }
}

fn print_summary(result: &RunResult, output_dir: &std::path::Path) {
    if !result.ats_report.is_empty() {
        println!("\nATS readability: {}/10", result.ats_score);
    }
    if let Some(w) = &result.visual_warning {
        println!("\n⚠ Visual layout warning: {}", w.issue);
        println!("  Advice: {}", w.advice);
    }
    println!("\nTarget level: {}", result.experience_level);
    if !result.questions.is_empty() {
        println!("Interview questions generated: {}", result.questions.len());
    }
    println!("\nArtifacts written to {}/", output_dir.display());
    println!(
        "  ran in {:.1}s ({} model calls)",
        result.stats.total_ms as f64 / 1000.0,
        result.stats.backend_calls
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("resume_tailor={default_level}"))),
        )
        .with_target(false)
        .init();

    let job_description = read_job_description(&cli.job_description)?;

    let mut builder = PipelineConfig::builder()
        .visual_check(!cli.no_visual_check)
        .web_search_questions(cli.web_questions)
        .sanitize_for_audit(!cli.no_sanitize_audit)
        .api_timeout_secs(cli.timeout_secs)
        .questions_per_topic(cli.questions_per_topic)
        .output_dir(&cli.output_dir)
        .progress_callback(Arc::new(CliProgress::new()));

    if cli.penalize_redacted {
        builder = builder.redaction_policy(RedactionAuditPolicy::PenalizeRedacted);
    }
    if let Some(provider) = &cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(model) = &cli.model {
        builder = builder.model(model);
    }

    let pipeline = Pipeline::new(builder.build()?)?;
    let result = pipeline.process_file(&cli.resume, &job_description).await;

    if let Some(fatal) = &result.fatal_error {
        bail!("{fatal}");
    }

    print_summary(&result, &cli.output_dir);
    Ok(())
}
