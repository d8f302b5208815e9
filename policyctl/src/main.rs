use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "policyctl", version)]
struct Cli {
    /// Path to console config JSON (default: POLICY_CONSOLE_CONFIG or .policy-console/config.json)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List policy categories and their schema namespaces
    Categories(commands::categories::CategoriesArgs),
    /// List org units
    Orgunits(commands::orgunits::OrgunitsArgs),
    /// Show effective policy values for an org unit
    Show(commands::show::ShowArgs),
    /// Change or reset policy values on an org unit
    Edit(commands::edit::EditArgs),
    /// Console configuration
    Config {
        #[command(subcommand)]
        cmd: commands::config::ConfigCommands,
    },
    /// Print version and exit
    Version,
}

fn init_tracing() {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.config.as_deref();
    match cli.cmd {
        Commands::Categories(args) => commands::categories::run(args),
        Commands::Orgunits(args) => commands::orgunits::run(config, args).await,
        Commands::Show(args) => commands::show::run(config, args).await,
        Commands::Edit(args) => commands::edit::run(config, args).await,
        Commands::Config { cmd } => commands::config::run(cmd),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(commands::exit_code(&e));
    }
}
