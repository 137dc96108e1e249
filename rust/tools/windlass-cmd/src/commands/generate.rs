//! Generate command implementation

use anyhow::{Context, Result, bail};
use std::fs;

use crate::workload::{Workload, WorkloadEntry};

pub fn run(
    count: usize,
    fail_ratio: f64,
    seed: Option<u64>,
    output_path: Option<String>,
) -> Result<()> {
    if !(0.0..=1.0).contains(&fail_ratio) {
        bail!("Fail ratio must be between 0.0 and 1.0, got {}", fail_ratio);
    }
    if let Some(seed) = seed {
        fastrand::seed(seed);
    }

    let entries = (0..count)
        .map(|i| WorkloadEntry {
            id: i as u64,
            busy_us: fastrand::u64(50..500),
            fail: fastrand::f64() < fail_ratio,
        })
        .collect();
    let workload = Workload { entries };

    let workload_json = serde_json::to_string_pretty(&workload)
        .context("Failed to serialize workload to JSON")?;

    match output_path {
        Some(output_file) => {
            fs::write(&output_file, &workload_json)
                .with_context(|| format!("Failed to write workload to file: {}", output_file))?;
            println!(
                "Workload with {} entries written to: {}",
                count, output_file
            );
        }
        None => {
            println!("{}", workload_json);
        }
    }
    Ok(())
}
