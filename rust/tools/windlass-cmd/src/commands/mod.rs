//! Command implementations for windlass-cmd

use anyhow::{Context, Result};

use crate::utils;
use crate::workload::Workload;

pub mod generate;
pub mod inspect;
pub mod run;

/// Validates and loads a workload file.
pub fn load_workload(path: &str) -> Result<Workload> {
    utils::validate_file_exists(path)
        .with_context(|| format!("Invalid workload file: {}", path))?;
    Workload::load(path)
}
