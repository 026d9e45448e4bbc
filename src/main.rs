use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{Parser, ValueEnum};
use color_eyre::{Result, eyre::Context};
use nginx_forge::{
    adapters::{LocalFileSystem, ScriptReloader},
    config::{AliasPolicy, Config, LoadOptions, SAMPLE_CONFIG, load_config_with},
    core::{DeployStage, Orchestrator, Outcome, OutputLayout, resolve_output_root},
    ports::reload::Reloader,
    tracing_setup::{self, LogFormat},
    utils::{GracefulShutdown, ReloadWorker},
};

const DEFAULT_CONFIG_PATH: &str = "/config/nginx.toml";
const DEFAULT_OUTPUT_DIR: &str = "/data/nginx";

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Commands,

    /// Log output format (level via RUST_LOG)
    #[clap(long, global = true, value_enum, default_value = "pretty")]
    log_format: LogFormatArg,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Parser, Debug)]
enum Commands {
    /// Generate nginx configuration files
    Generate {
        /// Configuration file to read
        #[clap(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Root directory of the generated category directories
        #[clap(short, long, default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,
        /// Deploy stage (local, dev, test, uat, production)
        #[clap(long, default_value = "production")]
        stage: DeployStage,
        /// File suffix of generated artifacts
        #[clap(long, default_value = "conf")]
        suffix: String,
        /// Treat a current key and its legacy alias set together as an error
        #[clap(long)]
        strict_aliases: bool,
        /// Print the generation report as JSON on stdout
        #[clap(long)]
        report_json: bool,
    },
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        #[clap(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Treat a current key and its legacy alias set together as an error
        #[clap(long)]
        strict_aliases: bool,
    },
    /// Initialize a new configuration file
    Init {
        /// Output path for the new config file
        #[clap(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
    /// Periodically run the reload command until SIGINT/SIGTERM
    Worker {
        /// Executable run without arguments on every tick
        #[clap(long)]
        reload_command: PathBuf,
        /// Interval between reloads, e.g. "10s" or "7d" (defaults by stage)
        #[clap(long, value_parser = humantime::parse_duration)]
        interval: Option<Duration>,
        /// Deploy stage (local, dev, test, uat, production)
        #[clap(long, default_value = "production")]
        stage: DeployStage,
    },
}

fn load_options(strict_aliases: bool) -> LoadOptions {
    LoadOptions {
        alias_policy: if strict_aliases {
            AliasPolicy::Reject
        } else {
            AliasPolicy::PreferNewest
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    tracing_setup::init_with_format(args.log_format.into())
        .context("Failed to initialize tracing")?;

    match args.command {
        Commands::Generate {
            config,
            output_dir,
            stage,
            suffix,
            strict_aliases,
            report_json,
        } => generate_command(
            &config,
            &output_dir,
            stage,
            suffix,
            &load_options(strict_aliases),
            report_json,
        ),
        Commands::Validate {
            config,
            strict_aliases,
        } => validate_config_command(&config, &load_options(strict_aliases)),
        Commands::Init { config } => init_config_command(&config).await,
        Commands::Worker {
            reload_command,
            interval,
            stage,
        } => {
            let interval = interval.unwrap_or_else(|| stage.default_reload_interval());
            worker_command(reload_command, interval).await
        }
    }
}

fn load_or_exit(config_path: &Path, options: &LoadOptions) -> Config {
    match load_config_with(config_path, options) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn generate_command(
    config_path: &Path,
    output_dir: &Path,
    stage: DeployStage,
    suffix: String,
    options: &LoadOptions,
    report_json: bool,
) -> Result<()> {
    tracing::info!(stage = %stage, "Loading configuration from {}", config_path.display());
    let config = load_or_exit(config_path, options);

    let root = resolve_output_root(output_dir, stage);
    let orchestrator = Orchestrator::new(
        LocalFileSystem::new(),
        OutputLayout::new(root).with_suffix(suffix),
    );

    let report = orchestrator
        .run(&config)
        .context("Generation aborted")?;

    if report_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    }

    match report.outcome() {
        Outcome::Success => Ok(()),
        Outcome::PartialFailure => {
            tracing::error!(
                failed = report.failed(),
                "Generation finished with failures"
            );
            std::process::exit(1);
        }
    }
}

fn validate_config_command(config_path: &Path, options: &LoadOptions) -> Result<()> {
    println!("🔍 Validating configuration file: {}", config_path.display());

    let config = load_or_exit(config_path, options);
    let enabled_http = config.http_server.iter().filter(|s| s.enable).count();
    let enabled_stream = config.stream_server.iter().filter(|s| s.enable).count();

    println!("✅ Configuration validation: OK");
    println!();
    println!("📋 Configuration Summary:");
    println!(
        "   • Default certificate: {}",
        config.defaults.ssl_cert_domain.as_deref().unwrap_or("<none>")
    );
    println!("   • HTTP upstreams: {}", config.http_upstream.len());
    println!(
        "   • HTTP servers: {} ({} enabled)",
        config.http_server.len(),
        enabled_http
    );
    println!("   • Stream upstreams: {}", config.stream_upstream.len());
    println!(
        "   • Stream servers: {} ({} enabled)",
        config.stream_server.len(),
        enabled_stream
    );
    println!("   • Mail servers: {}", config.mail_server.len());
    Ok(())
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &Path) -> Result<()> {
    if config_path.exists() {
        eprintln!(
            "❌ Error: Configuration file '{}' already exists",
            config_path.display()
        );
        std::process::exit(1);
    }

    tokio::fs::write(config_path, SAMPLE_CONFIG)
        .await
        .context("Failed to write config file")?;
    println!(
        "✅ Created sample configuration at: {}",
        config_path.display()
    );
    println!(
        "   Run 'nginx-forge generate --config {}' to render it",
        config_path.display()
    );
    Ok(())
}

async fn worker_command(reload_command: PathBuf, interval: Duration) -> Result<()> {
    if !reload_command.exists() {
        tracing::warn!(
            "Reload command {} does not exist yet, every reload will fail until it does",
            reload_command.display()
        );
    }

    let reloader: Arc<dyn Reloader> = Arc::new(ScriptReloader::new(reload_command));
    let shutdown = Arc::new(GracefulShutdown::new());
    let token = shutdown.shutdown_token();

    let signal_shutdown = shutdown.clone();
    let signal_handle = tokio::spawn(async move {
        if let Err(e) = signal_shutdown.run_signal_handler().await {
            tracing::error!("Signal handler error: {}", e);
        }
    });

    let reason = ReloadWorker::new(reloader, interval).run(token).await;
    signal_handle.abort();

    tracing::info!("Reload worker stopped: {:?}", reason);
    Ok(())
}
