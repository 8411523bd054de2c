//! Subcommand implementations

pub mod assist;
pub mod clients;
pub mod predict;
pub mod status;
