// Scribe meeting-transcript pipeline
// Main entry point for the scribe binary

use clap::Parser;
use scribe_engine::cli::{Cli, Command};
use scribe_engine::config::Config;
use scribe_engine::handlers::{
    handle_config, handle_doctor, handle_history, handle_replay, handle_run, handle_steps,
    OutputFormat, RunOptions,
};
use scribe_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let config = if cli.config.is_some() {
        Config::load_from_path(&config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log wins over the config file; RUST_LOG wins over both
    init_telemetry_with_level(cli.log.as_deref().unwrap_or(&config.core.log_level));

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Scribe v{} ({} - {})", version, commit, timestamp);

    match cli.command {
        Command::Run {
            transcript,
            out,
            max_iterations,
            script,
            no_save,
        } => {
            let options = RunOptions {
                out,
                max_iterations,
                script,
                save: !no_save,
            };
            handle_run(&transcript, options, &config, format).await
        }

        Command::Steps => handle_steps(&config, format),

        Command::History { limit, prune } => {
            tracing::info!("Showing last {} runs", limit);
            handle_history(limit, prune, &config, format).await
        }

        Command::Replay { run_id } => {
            tracing::info!("Replaying run: {}", run_id);
            handle_replay(&run_id, &config, format).await
        }

        Command::Config { action } => handle_config(action, &config, &config_path, format),

        Command::Doctor => handle_doctor(&config, format).await,
    }
}
