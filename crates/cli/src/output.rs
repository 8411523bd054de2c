//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => print_json(&items),
    }
}

/// Pretty-print any serializable value
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a percentage with one decimal
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Round half away from zero and group thousands, as the server's mails do
pub fn format_amount(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if rounded < 0.0 {
        grouped.insert(0, '-');
    }
    grouped
}

/// Color a risk label
pub fn color_label(label: &str) -> String {
    match label {
        "At Risk" => label.red().bold().to_string(),
        "Low Risk" => label.green().to_string(),
        _ => label.to_string(),
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "ok" | "ready" => status.green().to_string(),
        "degraded" | "warning" => status.yellow().to_string(),
        "unhealthy" | "error" | "failed" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color a risk rate: red from 50%, yellow from 25%
pub fn color_rate(rate: f64) -> String {
    let formatted = format_percent(rate);
    if rate >= 50.0 {
        formatted.red().to_string()
    } else if rate >= 25.0 {
        formatted.yellow().to_string()
    } else {
        formatted.green().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(999.0), "999");
        assert_eq!(format_amount(150000.0), "150,000");
        assert_eq!(format_amount(1234567.4), "1,234,567");
        assert_eq!(format_amount(-2500.0), "-2,500");
        assert_eq!(format_amount(-0.4), "0");
    }

    #[test]
    fn test_format_amount_rounds_half_away_from_zero() {
        assert_eq!(format_amount(2.5), "3");
        assert_eq!(format_amount(0.5), "1");
        assert_eq!(format_amount(-2.5), "-3");
        assert_eq!(format_amount(999_999.5), "1,000,000");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(37.5), "37.5%");
        assert_eq!(format_percent(0.0), "0.0%");
    }

    #[test]
    fn test_color_label_keeps_text() {
        colored::control::set_override(false);
        assert_eq!(color_label("At Risk"), "At Risk");
        assert_eq!(color_status("degraded"), "degraded");
        assert_eq!(color_rate(60.0), "60.0%");
    }
}
