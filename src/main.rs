use anyhow::Result;
use chargewatch::config::{Config, LogFormat, LoggingConfig};
use chargewatch::storage::TransitionStore;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "chargewatch",
    about = "Charging connector status monitor with transition log and alerts",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, env = "CHARGEWATCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the monitor daemon (poll loop + optional status API)
    Run {
        /// Bind address for the read-only status API
        #[arg(long)]
        bind: Option<String>,
    },

    /// Poll once, record any transitions, and exit
    Check,

    /// Print the connector state reconstructed from the transition log
    Replay {
        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(cli.config.as_deref())?;
    init_tracing(&config.logging);
    match &config.origin {
        Some(path) => tracing::info!(path = %path.display(), "Loaded configuration"),
        None => tracing::debug!("No config file found, using compiled-in defaults"),
    }

    match cli.command {
        Commands::Run { bind } => {
            tracing::info!(log = %config.log.path.display(), "Starting chargewatch monitor");
            chargewatch::run(&config, bind).await?;
        }
        Commands::Check => {
            let report = chargewatch::check_once(&config).await?;
            println!(
                "\nPolled {} connectors at {}, {} transition(s)",
                report.polled,
                report.at.format("%Y-%m-%d %H:%M:%S"),
                report.transitions.len()
            );
            if !report.transitions.is_empty() {
                println!("{:<20} | {:<20} | {:<20} | After", "Connector", "From", "To");
                println!("{:-<20}-|-{:-<20}-|-{:-<20}-|-{:-<20}", "", "", "", "");
                for t in &report.transitions {
                    println!(
                        "{:<20} | {:<20} | {:<20} | {}",
                        t.connector_id,
                        t.old_status_label(),
                        t.new_status,
                        t.duration_label()
                    );
                }
            }
            println!();
        }
        Commands::Replay { json } => {
            let log = chargewatch::open_log(&config)?;
            let mut states: Vec<_> = log.reconstruct_latest()?.into_values().collect();
            states.sort_by(|a, b| a.id.cmp(&b.id));

            if json {
                println!("{}", serde_json::to_string_pretty(&states)?);
            } else if states.is_empty() {
                println!("No transitions recorded yet.");
            } else {
                println!("{:<20} | {:<20} | Since", "Connector", "Status");
                println!("{:-<20}-|-{:-<20}-|-{:-<19}", "", "", "");
                for s in states {
                    println!(
                        "{:<20} | {:<20} | {}",
                        s.id,
                        s.status,
                        s.since.format("%Y-%m-%d %H:%M:%S")
                    );
                }
            }
        }
    }

    Ok(())
}
