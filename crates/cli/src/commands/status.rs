//! Service status command

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::client::{ApiClient, HealthReport, ServiceStatus};
use crate::output::{color_status, print_json, print_table, print_warning, OutputFormat};

#[derive(Tabled, Serialize)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

#[derive(Serialize)]
struct StatusView {
    service: ServiceStatus,
    health: HealthReport,
}

/// Show model, text-generation and component health
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let service: ServiceStatus = client.get("/").await?;
    let health: HealthReport = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&StatusView { service, health }),
        OutputFormat::Table => {
            println!("{}", "Risk Server Status".bold());
            println!("{}", "=".repeat(50));
            println!("Version:         {}", service.version);
            println!("Overall health:  {}", color_status(&health.status));
            match &service.model {
                Some(model) => println!(
                    "Model:           {} {} ({}, {})",
                    model.kind.cyan(),
                    model.version,
                    model.format,
                    short_checksum(&model.checksum)
                ),
                None => println!("Model:           {}", "not loaded".red()),
            }
            println!(
                "Text generation: {}",
                if service.text_generation_enabled {
                    "enabled".green()
                } else {
                    "disabled".yellow()
                }
            );
            println!();

            if !service.model_loaded {
                print_warning("Predictions will fail until a model is deployed");
            }

            let rows: Vec<ComponentRow> = health
                .components
                .iter()
                .map(|(name, component)| ComponentRow {
                    name: name.clone(),
                    status: color_status(&component.status),
                    message: component.message.clone().unwrap_or_default(),
                })
                .collect();
            print_table(&rows, format);
        }
    }

    Ok(())
}

fn short_checksum(checksum: &str) -> &str {
    checksum.get(..12).unwrap_or(checksum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_checksum() {
        assert_eq!(short_checksum("0123456789abcdef"), "0123456789ab");
        assert_eq!(short_checksum("abc"), "abc");
    }
}
