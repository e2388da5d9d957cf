mod routes;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use sugarkit::bootstrap::{self, BootstrapOption};
use sugarkit::server::{self, middleware};
use sugarkit::{AppConfig, Bootstrap, ServerKind};

/// Sugar Server - application bootstrap runtime
#[derive(Parser)]
#[command(name = "sugar-server")]
#[command(about = "Sugar Server - application bootstrap runtime")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Server kind override: http, grpc (alias rpc)
    #[arg(short, long)]
    server: Option<ServerKind>,

    /// Print effective configuration (JSON) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) defaults -> 2) YAML (if provided) -> 3) env (APP__*) -> 4) CLI overrides
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_overrides(cli.port, cli.server);
    if let Some(level) = verbosity(cli.verbose) {
        level.clone_into(&mut config.logger.level);
    }

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
    }
}

fn verbosity(count: u8) -> Option<&'static str> {
    match count {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}

fn check_config(config: &AppConfig) -> Result<()> {
    // Fails for kinds that parse but have no server behind them.
    server::build(config.app.server)?;
    println!("Configuration is valid ({} mode)", config.app.env);
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

async fn run_server(config: AppConfig) -> Result<()> {
    let kind = config.app.server;
    let mut options: Vec<BootstrapOption> = vec![bootstrap::with_middleware(middleware::defaults())];
    if kind == ServerKind::Http {
        options.push(bootstrap::with_http_router(routes::register));
    }

    let app = Bootstrap::new(kind, config, options).await?;
    tracing::info!("Sugar Server starting");
    app.run().await?;
    Ok(())
}
