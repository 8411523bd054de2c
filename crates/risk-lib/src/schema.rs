//! Column schema resolution
//!
//! The schema is the ordered list of feature names the classifier was
//! trained on. Input tables are projected onto it before inference; the
//! order is part of the model contract and is never changed.

use crate::table::Table;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Feature columns of the reference dataset, in training order
pub const DEFAULT_COLUMNS: [&str; 11] = [
    "Anciennete",
    "Nb_factures_impayees",
    "Moyenne_retards_jours",
    "Delai_moyen_paiement",
    "Montant_mensuel",
    "Nb_tickets_service",
    "Note_satisfaction",
    "Nb_relances",
    "Type_organisation",
    "Secteur_activite",
    "Type_abonnement",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("column schema must contain at least one column")]
    Empty,

    #[error("duplicate column in schema: {0}")]
    DuplicateColumn(String),
}

/// Ordered, immutable list of required feature names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    columns: Arc<[String]>,
}

impl ColumnSchema {
    pub fn new<I, S>(columns: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(SchemaError::Empty);
        }
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(SchemaError::DuplicateColumn(column.clone()));
            }
        }
        Ok(Self {
            columns: columns.into(),
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Required columns absent from `present`, sorted
    pub fn missing<'a, I>(&self, present: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let present: HashSet<&str> = present.into_iter().collect();
        let mut missing: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !present.contains(c.as_str()))
            .cloned()
            .collect();
        missing.sort();
        missing
    }

    /// Restrict `table` to the schema columns, in schema order
    ///
    /// Extra columns are dropped and row order is preserved.
    pub fn project(&self, table: &Table) -> Result<Table, SchemaError> {
        let missing = self.missing(table.columns().iter().map(String::as_str));
        if !missing.is_empty() {
            return Err(SchemaError::MissingColumns(missing));
        }
        table
            .select(&self.columns)
            .ok_or_else(|| SchemaError::MissingColumns(Vec::new()))
    }
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}
