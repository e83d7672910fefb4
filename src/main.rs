use anyhow::Result;
use clap::{Parser, Subcommand};

use metrix::cli::{self, OutputFormat};
use metrix::synthetic::DEMO_POINTS;

#[derive(Debug, Parser)]
#[command(name = "metrix")]
#[command(about = "Analytics dashboard with live, demo and disconnected modes")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Reconcile once against the configured data source and print the result
    Fetch {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Print a synthetic demo payload
    Demo {
        /// Number of time-series points to generate
        #[arg(long, default_value_t = DEMO_POINTS)]
        points: usize,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Ask the insight service for a narrative report on current data
    Insight {
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Summarize recorded refreshes
    History {
        /// Number of recent events to list
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Run the web dashboard
    Web {
        /// Bind address (default from config: 127.0.0.1:9747)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Print the JSON a data source must return
    Schema {
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration (credential masked)
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a dotted key, e.g. `source.endpoint https://...`
    Set { key: String, value: String },
    /// Remove the data-source endpoint and credential
    Clear,
    /// Print the config file path
    Path,
}

fn main() -> Result<()> {
    let app = App::parse();

    match app.command {
        Commands::Fetch { format } => cli::run_fetch(OutputFormat::from_str_opt(Some(&format))),
        Commands::Demo { points, format } => {
            cli::run_demo(points, OutputFormat::from_str_opt(Some(&format)))
        }
        Commands::Insight { format } => cli::run_insight(OutputFormat::from_str_opt(Some(&format))),
        Commands::History { limit, format } => {
            cli::run_history(limit, OutputFormat::from_str_opt(Some(&format)))
        }
        Commands::Web { addr } => cli::run_web(addr),
        Commands::Schema { format } => cli::run_schema(OutputFormat::from_str_opt(Some(&format))),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Clear => cli::run_config_clear(),
            ConfigAction::Path => cli::run_config_path(),
        },
    }
}
