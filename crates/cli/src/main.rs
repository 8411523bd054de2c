//! Client Risk Predictor CLI
//!
//! A command-line tool for scoring clients, drafting reminder mails,
//! querying the portfolio assistant and inspecting the risk server.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{assist, clients, predict, status};
use std::path::PathBuf;

/// Client Risk Predictor CLI
#[derive(Parser)]
#[command(name = "riskctl")]
#[command(author, version, about = "CLI for the Client Risk Predictor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via RISK_API_URL env var)
    #[arg(long, env = "RISK_API_URL", default_value = "http://127.0.0.1:5000")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict the non-payment risk of one client
    Predict {
        /// JSON file holding the client's fields
        #[arg(long)]
        file: Option<PathBuf>,

        /// Client field as NAME=VALUE (repeatable, overrides --file)
        #[arg(long = "field", value_name = "NAME=VALUE")]
        fields: Vec<String>,
    },

    /// Score every row of a CSV file
    Batch {
        /// CSV file to upload
        csv: PathBuf,

        /// Where to write the scored CSV (stdout if not specified)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Draft a payment reminder mail
    Mail {
        /// Client name
        #[arg(long)]
        client: String,

        /// Amount due
        #[arg(long)]
        amount: f64,
    },

    /// Ask the portfolio assistant a question
    Chat {
        /// Question for the assistant
        message: String,
    },

    /// List dashboard clients
    Clients {
        /// Show the KPI summary instead of the rows
        #[arg(long)]
        summary: bool,
    },

    /// Show model and component status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize client
    let client = client::ApiClient::new(&cli.api_url)?;

    // Execute command
    match cli.command {
        Commands::Predict { file, fields } => {
            predict::predict(&client, file, fields, cli.format).await?;
        }
        Commands::Batch { csv, output } => {
            predict::batch(&client, &csv, output).await?;
        }
        Commands::Mail { client: name, amount } => {
            assist::mail(&client, &name, amount, cli.format).await?;
        }
        Commands::Chat { message } => {
            assist::chat(&client, &message, cli.format).await?;
        }
        Commands::Clients { summary } => {
            if summary {
                clients::show_summary(&client, cli.format).await?;
            } else {
                clients::list_clients(&client, cli.format).await?;
            }
        }
        Commands::Status => {
            status::show_status(&client, cli.format).await?;
        }
    }

    Ok(())
}
