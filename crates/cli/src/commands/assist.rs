//! Reminder mail and chat assistant commands

use anyhow::{bail, Result};
use colored::Colorize;

use crate::client::{ApiClient, ChatRequest, ChatResponse, MailRequest, MailResponse};
use crate::output::{format_amount, print_json, OutputFormat};

/// Draft a reminder mail for one client
pub async fn mail(client: &ApiClient, name: &str, amount: f64, format: OutputFormat) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Client name must not be empty");
    }

    let request = MailRequest {
        client_name: name.to_string(),
        amount_due: amount,
    };
    let response: MailResponse = client.post("/generate_mail", &request).await?;

    match format {
        OutputFormat::Json => print_json(&response),
        OutputFormat::Table => {
            println!(
                "{} {} ({})",
                "Reminder for".bold(),
                name.cyan(),
                format_amount(amount)
            );
            println!("{}", "=".repeat(60));
            println!("{}", response.generated_mail);
        }
    }

    Ok(())
}

/// Ask the portfolio assistant a question
pub async fn chat(client: &ApiClient, message: &str, format: OutputFormat) -> Result<()> {
    if message.trim().is_empty() {
        bail!("Message must not be empty");
    }

    let request = ChatRequest {
        message: message.to_string(),
    };
    let response: ChatResponse = client.post("/api/chat", &request).await?;

    match format {
        OutputFormat::Json => print_json(&response),
        OutputFormat::Table => {
            println!("{} {}", "Assistant:".bold().blue(), response.reply);
        }
    }

    Ok(())
}
