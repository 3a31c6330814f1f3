//! Command handlers for CLI operations
//!
//! - run: run the pipeline over a transcript, write a report, record history
//! - steps: list the configured pipeline
//! - history: show the last N runs
//! - replay: re-render a stored run
//! - config: show the effective configuration or its path
//! - doctor: validate configuration and check providers

use anyhow::{bail, Context, Result};
use serde_json::json;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cli::ConfigAction;
use crate::conductor::{default_pipeline, Orchestrator, ResultSet};
use crate::config::Config;
use crate::db::Database;
use crate::llm::ollama::OllamaProvider;
use crate::llm::openai::OpenAIProvider;
use crate::llm::router::LLMRouter;
use crate::llm::scripted::ScriptedProvider;
use crate::llm::{LLMProvider, ReasoningEngine};
use crate::report::{render_summary, write_report, ReportSection};
use crate::strategies::spec_for;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Options of the `run` command
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub out: Option<PathBuf>,
    pub max_iterations: Option<u32>,
    pub script: Option<PathBuf>,
    pub save: bool,
}

/// Build a single provider by name
fn build_provider(name: &str, config: &Config) -> Result<Box<dyn LLMProvider>> {
    match name {
        "openai" => Ok(Box::new(OpenAIProvider::from_env(config.llm.openai.clone()))),
        "ollama" => Ok(Box::new(OllamaProvider::new(
            config.llm.ollama.base_url.clone(),
            config.llm.ollama.model.clone(),
        ))),
        other => bail!("Unknown provider: {}", other),
    }
}

/// Router over the default provider and, if set, the fallback
pub fn build_router(config: &Config) -> Result<LLMRouter> {
    let mut providers = vec![build_provider(&config.llm.default_provider, config)?];
    if let Some(fallback) = &config.llm.fallback_provider {
        providers.push(build_provider(fallback, config)?);
    }

    Ok(LLMRouter::new(
        providers,
        Duration::from_secs(config.llm.timeout_secs),
    ))
}

/// Read a transcript from a file, or from stdin for `-`
pub fn read_transcript(source: &str) -> Result<String> {
    let transcript = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read transcript from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("Failed to read transcript {}", source))?
    };

    if transcript.trim().is_empty() {
        bail!("Transcript is empty");
    }

    Ok(transcript)
}

/// Apply a command-line iteration cap to every step
fn apply_iteration_cap(config: &mut Config, max_iterations: Option<u32>) -> Result<()> {
    if let Some(cap) = max_iterations {
        config.pipeline.max_iterations = cap;
        for step in config.pipeline.overrides.values_mut() {
            step.max_iterations = None;
        }
        config.validate_and_process()?;
    }
    Ok(())
}

/// Run the pipeline over a transcript
pub async fn handle_run(
    source: &str,
    options: RunOptions,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let transcript = read_transcript(source)?;

    let mut config = config.clone();
    apply_iteration_cap(&mut config, options.max_iterations)?;

    let engine: Arc<dyn ReasoningEngine> = match &options.script {
        Some(path) => {
            let script = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read script {}", path.display()))?;
            tracing::info!("Replaying engine replies from {}", path.display());
            Arc::new(ScriptedProvider::from_json(&script)?)
        }
        None => Arc::new(build_router(&config)?),
    };

    let orchestrator = Orchestrator::new(default_pipeline(&config, engine)?)?;

    let run_id = uuid::Uuid::new_v4().to_string();

    tracing::info!("Run {} started", run_id);
    let start = Instant::now();
    let results = orchestrator.run(&transcript).await;
    let duration_ms = start.elapsed().as_millis() as i64;

    let out_dir = options
        .out
        .unwrap_or_else(|| config.core.output_dir.join(&run_id));
    let paths = write_report(&results, &out_dir, &format!("Meeting report {}", run_id))?;

    let saved = if options.save {
        match record_run(&config, &run_id, &transcript, &results, duration_ms).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Run {} was not recorded in history: {:#}", run_id, e);
                false
            }
        }
    } else {
        false
    };

    match format {
        OutputFormat::Text => {
            print_run_summary(&run_id, &results, duration_ms);
            println!();
            println!("Results: {}", paths.results.display());
            println!("Summary: {}", paths.summary.display());
            if options.save && !saved {
                println!("Warning: run was not recorded in history");
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "run_id": run_id,
                "duration_ms": duration_ms,
                "saved": saved,
                "output": results.to_value(),
                "report": {
                    "results": paths.results,
                    "summary": paths.summary,
                }
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Store a finished run in the history database
async fn record_run(
    config: &Config,
    run_id: &str,
    transcript: &str,
    results: &ResultSet,
    duration_ms: i64,
) -> Result<()> {
    let db = Database::new(&config.db_path())
        .await
        .context("Failed to open database")?;
    let saved = db
        .runs()
        .save_result_set(run_id, transcript, results, duration_ms)
        .await
        .context("Failed to record run");
    db.close().await?;
    saved.map(|_| ())
}

fn print_run_summary(run_id: &str, results: &ResultSet, duration_ms: i64) {
    println!("Run {} {} in {}ms", run_id, results.state, duration_ms);
    println!();
    for step in &results.steps {
        let status = if step.success { "ok" } else { "degraded" };
        println!(
            "  {:<10} {:<9} {} plan call(s)",
            step.step, status, step.plan_calls
        );
    }
    if results.partial_failure {
        println!();
        println!("Some steps degraded; their payloads carry an error marker.");
    }
}

/// List the configured pipeline steps
pub fn handle_steps(config: &Config, format: OutputFormat) -> Result<()> {
    let kinds = config.pipeline_kinds()?;

    match format {
        OutputFormat::Text => {
            println!("Pipeline ({} steps):", kinds.len());
            println!();
            for (i, kind) in kinds.iter().enumerate() {
                let spec = spec_for(*kind);
                let settings = config.step_settings(*kind);
                println!("{}. {}", i + 1, kind);
                println!("   Reads: {}", spec.inputs.join(", "));
                println!("   Writes: {}", kind.output_key());
                println!(
                    "   Max iterations: {}, temperature: {}",
                    settings.max_iterations, settings.temperature
                );
            }
        }
        OutputFormat::Json => {
            let steps: Vec<_> = kinds
                .iter()
                .map(|kind| {
                    let settings = config.step_settings(*kind);
                    json!({
                        "step": kind.as_str(),
                        "inputs": spec_for(*kind).inputs,
                        "output_key": kind.output_key(),
                        "max_iterations": settings.max_iterations,
                        "temperature": settings.temperature,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json!({ "steps": steps }))?);
        }
    }

    Ok(())
}

/// Show the last runs
pub async fn handle_history(
    limit: usize,
    prune: Option<i64>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    if prune.is_some_and(|days| days < 0) {
        bail!("--prune takes a number of days, 0 or more");
    }

    let database = Database::new(&config.db_path())
        .await
        .context("Failed to open database")?;
    let repo = database.runs();

    let pruned = match prune {
        Some(days) => {
            let deleted = repo.delete_old_runs(days).await?;
            tracing::info!("Pruned {} runs older than {} days", deleted, days);
            Some(deleted)
        }
        None => None,
    };

    let runs = repo
        .get_recent_runs(limit as i64)
        .await
        .context("Failed to fetch run history")?;

    match format {
        OutputFormat::Text => {
            if let Some(deleted) = pruned {
                println!("Pruned {} old runs", deleted);
            }
            if runs.is_empty() {
                println!("No runs in history");
                return Ok(());
            }

            println!("Run History (last {} runs):", limit);
            println!();

            for run in &runs {
                println!("Run ID: {}", run.id);
                println!("  Transcript: {}", run.transcript_excerpt.replace('\n', " "));
                println!("  State: {}", run.state);
                if run.partial_failure {
                    println!("  Partial failure: yes");
                }
                if let Some(duration) = run.duration_ms {
                    println!("  Duration: {}ms", duration);
                }
                let created = chrono::DateTime::from_timestamp(run.created_at, 0)
                    .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "Unknown".to_string());
                println!("  Created: {}", created);
                println!();
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "runs": runs,
                "count": runs.len(),
                "limit": limit,
                "pruned": pruned
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    database.close().await?;
    Ok(())
}

/// Re-render a stored run
pub async fn handle_replay(run_id: &str, config: &Config, format: OutputFormat) -> Result<()> {
    let database = Database::new(&config.db_path())
        .await
        .context("Failed to open database")?;
    let repo = database.runs();

    let run = repo
        .get_run(run_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Run not found: {}", run_id))?;
    let steps = repo.get_run_steps(run_id).await?;

    match format {
        OutputFormat::Text => {
            let markdown = render_summary(
                &format!("Meeting report {}", run.id),
                run.partial_failure,
                &ReportSection::from_stored(&steps),
            )
            .context("Failed to render summary")?;
            print!("{}", markdown);
        }
        OutputFormat::Json => {
            let output = json!({ "run": run, "steps": steps });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    database.close().await?;
    Ok(())
}

/// Show the configuration or where it lives
pub fn handle_config(
    action: ConfigAction,
    config: &Config,
    config_path: &Path,
    format: OutputFormat,
) -> Result<()> {
    match (action, format) {
        (ConfigAction::Path, OutputFormat::Text) => println!("{}", config_path.display()),
        (ConfigAction::Path, OutputFormat::Json) => {
            println!("{}", json!({ "path": config_path }))
        }
        (ConfigAction::Show, OutputFormat::Text) => {
            let text = toml::to_string_pretty(config).context("Failed to serialize config")?;
            print!("{}", text);
        }
        (ConfigAction::Show, OutputFormat::Json) => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
    }
    Ok(())
}

/// Validate configuration and check providers
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(String, String)> = Vec::new();

    // Config is validated when loaded
    checks.push(("Configuration".into(), "Valid".into()));

    if let Err(e) = Orchestrator::new(default_pipeline(
        config,
        Arc::new(ScriptedProvider::new(Vec::new())),
    )?) {
        checks.push(("Pipeline order".into(), "Invalid".into()));
        issues.push(e.to_string());
    } else {
        checks.push(("Pipeline order".into(), "Valid".into()));
    }

    let data_dir = &config.core.data_dir;
    if data_dir.exists() {
        checks.push(("Data directory".into(), "Exists".into()));
    } else {
        checks.push(("Data directory".into(), "Missing (created on first run)".into()));
    }

    let db_path = config.db_path();
    if db_path.exists() {
        match Database::new(&db_path).await {
            Ok(db) => {
                checks.push(("Database".into(), "OK".into()));
                db.close().await.ok();
            }
            Err(e) => {
                checks.push(("Database".into(), "Failed".into()));
                issues.push(format!("Cannot open database: {}", e));
            }
        }
    } else {
        checks.push(("Database".into(), "Not initialized".into()));
    }

    let uses_openai = config.llm.default_provider == "openai"
        || config.llm.fallback_provider.as_deref() == Some("openai");
    if uses_openai {
        let var = &config.llm.openai.api_key_env;
        if std::env::var(var).map(|v| !v.is_empty()).unwrap_or(false) {
            checks.push(("OpenAI API key".into(), format!("Set ({})", var)));
        } else {
            checks.push(("OpenAI API key".into(), "Missing".into()));
            issues.push(format!("Environment variable {} is not set", var));
        }
    }

    let router = build_router(config)?;
    for health in router.check_health().await {
        let status = if health.healthy { "Reachable" } else { "Unreachable" };
        let location = if health.local { "local" } else { "remote" };
        checks.push((
            format!("Provider {}", health.name),
            format!("{} ({})", status, location),
        ));
        if !health.healthy {
            issues.push(format!("Provider {} is not reachable", health.name));
        }
    }

    match format {
        OutputFormat::Text => {
            println!("Scribe Doctor");
            println!();
            for (name, status) in &checks {
                println!("  {:<20} {}", name, status);
            }
            println!();
            if issues.is_empty() {
                println!("No issues found.");
            } else {
                println!("Issues:");
                for issue in &issues {
                    println!("  - {}", issue);
                }
            }
        }
        OutputFormat::Json => {
            let checks: Vec<_> = checks
                .iter()
                .map(|(name, status)| json!({ "check": name, "status": status }))
                .collect();
            let output = json!({
                "checks": checks,
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
