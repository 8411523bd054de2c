//! Dashboard dataset
//!
//! Serves the static client CSV consumed by the BI dashboard, either row by
//! row or reduced to the headline KPIs.

use crate::models::FeatureValue;
use crate::table::Table;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const MONTHLY_AMOUNT_COLUMN: &str = "Montant_mensuel";
pub const REMINDERS_COLUMN: &str = "Nb_relances";
pub const SECTOR_COLUMN: &str = "Secteur_activite";

/// Per-sector breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorSummary {
    pub sector: String,
    pub clients: usize,
    pub at_risk: usize,
    /// Share of the sector's clients at risk, in percent
    pub risk_rate: f64,
}

/// Headline KPIs over the whole dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_clients: usize,
    pub at_risk_clients: usize,
    pub at_risk_percent: f64,
    pub mean_monthly_amount: f64,
    pub mean_reminders: f64,
    pub sectors: Vec<SectorSummary>,
    pub most_affected_sector: Option<String>,
}

impl DashboardSummary {
    /// Reduce a client table; `risk_column` holds the 0/1 ground truth
    pub fn from_table(table: &Table, risk_column: &str) -> Self {
        let total = table.len();
        let at_risk_flags: Vec<bool> = match table.column(risk_column) {
            Some(values) => values.map(is_at_risk).collect(),
            None => vec![false; total],
        };
        let at_risk_clients = at_risk_flags.iter().filter(|&&r| r).count();

        let mut by_sector: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        if let Some(sectors) = table.column(SECTOR_COLUMN) {
            for (value, &risky) in sectors.zip(&at_risk_flags) {
                if value.is_null() {
                    continue;
                }
                let entry = by_sector.entry(value.to_string()).or_default();
                entry.0 += 1;
                entry.1 += usize::from(risky);
            }
        }

        // BTreeMap iteration is name-ordered, so the stable sort keeps names ascending on ties
        let mut sectors: Vec<SectorSummary> = by_sector
            .into_iter()
            .map(|(sector, (clients, at_risk))| SectorSummary {
                sector,
                clients,
                at_risk,
                risk_rate: percent(at_risk, clients),
            })
            .collect();
        sectors.sort_by(|a, b| b.clients.cmp(&a.clients));

        let most_affected_sector = sectors
            .iter()
            .filter(|s| s.at_risk > 0)
            .min_by(|a, b| b.at_risk.cmp(&a.at_risk).then_with(|| a.sector.cmp(&b.sector)))
            .map(|s| s.sector.clone());

        Self {
            total_clients: total,
            at_risk_clients,
            at_risk_percent: percent(at_risk_clients, total),
            mean_monthly_amount: column_mean(table, MONTHLY_AMOUNT_COLUMN),
            mean_reminders: column_mean(table, REMINDERS_COLUMN),
            sectors,
            most_affected_sector,
        }
    }
}

fn is_at_risk(value: &FeatureValue) -> bool {
    value.as_f64() == Some(1.0)
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Mean over all rows, missing or non-numeric cells counting as zero
fn column_mean(table: &Table, column: &str) -> f64 {
    if table.is_empty() {
        return 0.0;
    }
    let sum: f64 = table
        .column(column)
        .map(|values| values.filter_map(FeatureValue::as_f64).sum())
        .unwrap_or(0.0);
    sum / table.len() as f64
}

/// CSV file backing the dashboard endpoints
#[derive(Debug, Clone)]
pub struct ClientsDataset {
    path: PathBuf,
    risk_column: String,
}

impl ClientsDataset {
    pub fn new(path: impl Into<PathBuf>, risk_column: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            risk_column: risk_column.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the file; `None` if it does not exist
    pub fn load_table(&self) -> Result<Option<Table>> {
        if !self.exists() {
            return Ok(None);
        }
        let file = std::fs::File::open(&self.path)
            .with_context(|| format!("Failed to open dataset {:?}", self.path))?;
        let table = Table::from_csv_reader(file)
            .with_context(|| format!("Failed to parse dataset {:?}", self.path))?;
        Ok(Some(table))
    }

    /// All rows as JSON objects, missing values as `null`
    pub fn load_records(&self) -> Result<Option<Vec<Map<String, Value>>>> {
        Ok(self.load_table()?.map(|table| table.to_json_records()))
    }

    pub fn summary(&self) -> Result<Option<DashboardSummary>> {
        Ok(self
            .load_table()?
            .map(|table| DashboardSummary::from_table(&table, &self.risk_column)))
    }
}
