//! Inspect command implementation

use anyhow::{Context, Result};
use std::fs;
use std::time::Duration;

use crate::commands::load_workload;
use crate::utils;

pub fn run(verbose: u8, workload_path: String) -> Result<()> {
    println!("Inspecting workload: {}", workload_path);

    let workload = load_workload(&workload_path)?;
    let file_size = fs::metadata(&workload_path)
        .with_context(|| format!("Failed to read metadata for: {}", workload_path))?
        .len();

    let total_busy = workload.total_busy();
    let mean_busy = if workload.entries.is_empty() {
        Duration::ZERO
    } else {
        total_busy / workload.entries.len() as u32
    };

    println!("  File size:       {}", utils::format_size(file_size));
    println!("  Entries:         {}", workload.entries.len());
    println!("  Flagged to fail: {}", workload.failing_count());
    println!(
        "  Simulated work:  {} total, {} mean",
        utils::format_duration(total_busy),
        utils::format_duration(mean_busy)
    );

    if verbose > 0 {
        for entry in &workload.entries {
            println!(
                "    entry {}: busy_us={} fail={}",
                entry.id, entry.busy_us, entry.fail
            );
        }
    }
    Ok(())
}
