// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rfp_cli::commands::{self, SchemaKind};
use rfp_cli::config;
use rfp_cli::format::{Formatter, OutputFormat};
use std::path::PathBuf;

/// Exit code for runtime errors.
const EXIT_RUNTIME_ERROR: i32 = 1;
/// Exit code for usage / argument errors (clap exits with 2 automatically).
#[allow(dead_code)]
const EXIT_USAGE_ERROR: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "rfp", version, about = "RFP operator platform CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,

    /// Emit tracing output as JSON.
    #[arg(long)]
    json_logs: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SchemaKindArg {
    Config,
    Job,
    State,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the JSON schema for a contract type.
    Schema {
        /// Which schema to print.
        #[arg(value_enum)]
        kind: SchemaKindArg,
    },

    /// Load and validate a platform config file (or just the environment
    /// overlay, if no file is given).
    ConfigCheck {
        /// Path to a `platform.toml` file.
        file: Option<PathBuf>,
    },

    /// Pretty-print an `AgentJob` JSON file.
    JobInspect {
        /// Path to a job JSON file.
        file: PathBuf,

        /// Output format.
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Print the journal entries in a journal JSON file, newest first.
    Journal {
        /// Path to a JSON file containing an array of journal entries.
        file: PathBuf,

        /// Output format.
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Print the event-log entries in an events JSON file, newest first.
    Events {
        /// Path to a JSON file containing an array of event-log entries.
        file: PathBuf,

        /// Output format.
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Dry-run a patch against an opportunity state snapshot without
    /// touching any store.
    PatchDryRun {
        /// Path to an `OpportunityState` JSON file.
        state: PathBuf,

        /// Path to a raw opportunity-patch JSON file.
        patch: PathBuf,

        /// Output format.
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Submit one chat message to a freshly constructed agent runtime and
    /// print the resulting turn.
    Submit {
        /// Slack channel id the message arrived on.
        #[arg(long, default_value = "C000")]
        channel: String,

        /// Thread timestamp the message arrived on.
        #[arg(long, default_value = "1.0")]
        thread: String,

        /// Slack user id of the sender.
        #[arg(long)]
        user: Option<String>,

        /// Slack team id of the sender.
        #[arg(long)]
        team: Option<String>,

        /// Account sub the message is attributed to.
        #[arg(long, default_value = "U000")]
        acting_as: String,

        /// Message text.
        #[arg(long)]
        text: String,

        /// Path to a platform config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Path to an `OpportunityState` JSON file to seed the in-memory
        /// store with before the turn runs.
        #[arg(long)]
        seed_state: Option<PathBuf>,

        /// Output format.
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug { "debug" } else { "info" };
    // SAFETY-free: just sets an env var read back by `init_tracing`.
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", filter);
    }
    rfp_telemetry::init_tracing(cli.json_logs);

    if let Err(e) = run(cli.command).await {
        eprintln!("error: {e:#}");
        std::process::exit(EXIT_RUNTIME_ERROR);
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Schema { kind } => {
            let kind = match kind {
                SchemaKindArg::Config => SchemaKind::PlatformConfig,
                SchemaKindArg::Job => SchemaKind::Job,
                SchemaKindArg::State => SchemaKind::OpportunityState,
            };
            println!("{}", commands::schema_json(kind)?);
        }

        Commands::ConfigCheck { file } => {
            let diagnostics = commands::config_check(file.as_deref())?;
            let has_error = diagnostics.iter().any(|d| d.starts_with("error:"));
            for d in diagnostics {
                println!("{d}");
            }
            if has_error {
                anyhow::bail!("configuration is invalid");
            }
        }

        Commands::JobInspect { file, format } => {
            let formatter = Formatter::new(format.parse::<OutputFormat>().map_err(anyhow::Error::msg)?);
            let job = commands::read_job_file(&file)?;
            println!("{}", formatter.format_job(&job));
        }

        Commands::Journal { file, format } => {
            let formatter = Formatter::new(format.parse::<OutputFormat>().map_err(anyhow::Error::msg)?);
            for entry in commands::read_journal_file(&file)? {
                println!("{}", formatter.format_journal_entry(&entry));
            }
        }

        Commands::Events { file, format } => {
            let formatter = Formatter::new(format.parse::<OutputFormat>().map_err(anyhow::Error::msg)?);
            for event in commands::read_events_file(&file)? {
                println!("{}", formatter.format_event(&event));
            }
        }

        Commands::PatchDryRun { state, patch, format } => {
            let formatter = Formatter::new(format.parse::<OutputFormat>().map_err(anyhow::Error::msg)?);
            let now = rfp_core::now();
            let result = commands::patch_dry_run(&state, &patch, now)?;
            println!("{}", formatter.format_state(&result.after));
            println!("{}", formatter.format_diff(&result.diff));
            for check in &result.policy_checks {
                println!("policy_check: {} {} {}", check.check, check.status, check.detail);
            }
        }

        Commands::Submit {
            channel,
            thread,
            user,
            team,
            acting_as,
            text,
            config: config_path,
            seed_state,
            format,
        } => {
            let formatter = Formatter::new(format.parse::<OutputFormat>().map_err(anyhow::Error::msg)?);
            let (platform_config, warnings) = config::load_and_validate(config_path.as_deref()).context("load platform config")?;
            for w in &warnings {
                tracing::warn!(target: "rfp.cli", %w, "config warning");
            }

            let now = rfp_core::now();
            let outcome = commands::submit_message(
                &platform_config,
                &channel,
                &thread,
                user,
                team,
                &acting_as,
                &text,
                seed_state.as_deref(),
                Vec::new(),
                now,
            )
            .await?;

            if let Some(reply) = &outcome.turn.reply_text {
                println!("{reply}");
            }
            if let Some(rfp_id) = &outcome.turn.rfp_id {
                println!("rfp_id: {rfp_id}");
            }
            for entry in &outcome.journal {
                println!("{}", formatter.format_journal_entry(entry));
            }
            for event in &outcome.events {
                println!("{}", formatter.format_event(event));
            }
        }
    }

    Ok(())
}
