//! Dashboard dataset commands

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use crate::client::{ApiClient, ClientRow, DashboardSummary};
use crate::output::{
    color_rate, format_amount, format_percent, print_json, print_table, print_warning,
    OutputFormat,
};

/// Row for the clients table
#[derive(Tabled, Serialize)]
struct ClientTableRow {
    #[tabled(rename = "Client")]
    id: String,
    #[tabled(rename = "Sector")]
    sector: String,
    #[tabled(rename = "Subscription")]
    subscription: String,
    #[tabled(rename = "Monthly")]
    monthly_amount: String,
    #[tabled(rename = "Unpaid")]
    unpaid_invoices: String,
    #[tabled(rename = "Reminders")]
    reminders: String,
    #[tabled(rename = "Risk")]
    risk: String,
}

impl From<&ClientRow> for ClientTableRow {
    fn from(row: &ClientRow) -> Self {
        let risk = match row.get("Risque_impaye") {
            Some(Value::Number(n)) if n.as_f64() == Some(1.0) => "yes".red().to_string(),
            Some(Value::Number(_)) => "no".green().to_string(),
            other => cell(other),
        };
        let monthly_amount = match row.get("Montant_mensuel").and_then(Value::as_f64) {
            Some(amount) => format_amount(amount),
            None => cell(row.get("Montant_mensuel")),
        };

        Self {
            id: cell(row.get("ID_client")),
            sector: cell(row.get("Secteur_activite")),
            subscription: cell(row.get("Type_abonnement")),
            monthly_amount,
            unpaid_invoices: cell(row.get("Nb_factures_impayees")),
            reminders: cell(row.get("Nb_relances")),
            risk,
        }
    }
}

/// Row for the sector breakdown table
#[derive(Tabled, Serialize)]
struct SectorRow {
    #[tabled(rename = "Sector")]
    sector: String,
    #[tabled(rename = "Clients")]
    clients: usize,
    #[tabled(rename = "At Risk")]
    at_risk: usize,
    #[tabled(rename = "Risk Rate")]
    risk_rate: String,
}

/// List the dashboard clients
pub async fn list_clients(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let rows: Vec<ClientRow> = client.get("/api/clients_data").await?;

    match format {
        // Raw rows keep every column
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            let table_rows: Vec<ClientTableRow> = rows.iter().map(ClientTableRow::from).collect();
            print_table(&table_rows, format);
            println!("\nTotal: {} client(s)", rows.len());
        }
    }

    Ok(())
}

/// Show the dashboard KPIs
pub async fn show_summary(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let summary: DashboardSummary = client.get("/api/clients_summary").await?;

    match format {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Table => {
            println!("{}", "Portfolio Summary".bold());
            println!("{}", "=".repeat(50));
            println!("Total clients:        {}", summary.total_clients);
            println!(
                "At-risk clients:      {} ({})",
                summary.at_risk_clients.to_string().red(),
                format_percent(summary.at_risk_percent)
            );
            println!(
                "Mean monthly amount:  {}",
                format_amount(summary.mean_monthly_amount)
            );
            println!("Mean reminders:       {:.1}", summary.mean_reminders);
            match &summary.most_affected_sector {
                Some(sector) => println!("Most affected sector: {}", sector.yellow()),
                None => println!("Most affected sector: -"),
            }
            println!();

            if summary.sectors.is_empty() {
                print_warning("No sector breakdown available");
                return Ok(());
            }

            let rows: Vec<SectorRow> = summary
                .sectors
                .iter()
                .map(|s| SectorRow {
                    sector: s.sector.clone(),
                    clients: s.clients,
                    at_risk: s.at_risk,
                    risk_rate: color_rate(s.risk_rate),
                })
                .collect();
            print_table(&rows, format);
        }
    }

    Ok(())
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_row_from_json() {
        colored::control::set_override(false);
        let row: ClientRow = serde_json::from_value(json!({
            "ID_client": "CL0001",
            "Secteur_activite": "Transport",
            "Type_abonnement": "Basique",
            "Montant_mensuel": 125000,
            "Nb_factures_impayees": 0,
            "Nb_relances": null,
            "Risque_impaye": 1
        }))
        .unwrap();

        let table_row = ClientTableRow::from(&row);
        assert_eq!(table_row.id, "CL0001");
        assert_eq!(table_row.monthly_amount, "125,000");
        assert_eq!(table_row.unpaid_invoices, "0");
        assert_eq!(table_row.reminders, "-");
        assert_eq!(table_row.risk, "yes");
    }
}
