use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use coinboard::core::exchange::Exchange;
use coinboard::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for coinboard::AppCommand {
    fn from(cmd: Commands) -> coinboard::AppCommand {
        match cmd {
            Commands::Serve { listen } => coinboard::AppCommand::Serve { listen },
            Commands::Dashboard { json } => coinboard::AppCommand::Dashboard { json },
            Commands::Stocks { json } => coinboard::AppCommand::Stocks { json },
            Commands::Balance { exchange, json } => {
                coinboard::AppCommand::Balance { exchange, json }
            }
            Commands::Holdings { exchange, json } => {
                coinboard::AppCommand::Holdings { exchange, json }
            }
            Commands::TopVolume {
                exchange,
                limit,
                json,
            } => coinboard::AppCommand::TopVolume {
                exchange,
                limit,
                json,
            },
            Commands::News { query, json } => coinboard::AppCommand::News { query, json },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Serve the dashboard HTTP API
    Serve {
        /// Address to listen on, overrides the configured one
        #[arg(short, long)]
        listen: Option<String>,
    },
    /// Display the crypto dashboard
    Dashboard {
        /// Print the raw JSON document
        #[arg(long)]
        json: bool,
    },
    /// Display the stock market dashboard
    Stocks {
        #[arg(long)]
        json: bool,
    },
    /// Display the cash balance of an exchange account
    Balance {
        /// upbit or binance
        exchange: Exchange,
        #[arg(long)]
        json: bool,
    },
    /// Display coin holdings on an exchange
    Holdings {
        exchange: Exchange,
        #[arg(long)]
        json: bool,
    },
    /// Display the most traded markets on an exchange
    TopVolume {
        exchange: Exchange,
        #[arg(short, long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Search market news headlines
    News {
        query: String,
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Exchange keys may live in a local .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => coinboard::cli::setup::setup(),
        Some(cmd) => coinboard::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
