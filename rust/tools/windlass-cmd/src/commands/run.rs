//! Run command implementation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::thread;
use std::time::{Duration, Instant};

use windlass::batch::{BatchOptions, run_batch};
use windlass::task::Task;
use windlass_common::error::Error;

use crate::commands::load_workload;
use crate::utils;
use crate::workload::WorkloadEntry;

/// Per-entry line of the JSON execution report.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportEntry {
    pub entry_id: u64,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_us: u64,
    pub entries: Vec<ReportEntry>,
}

pub fn run(
    workers: Option<usize>,
    queue_capacity: Option<usize>,
    output_path: Option<String>,
    workload_path: String,
) -> Result<()> {
    let workload = load_workload(&workload_path)?;

    let mut options = BatchOptions::new();
    if let Some(workers) = workers {
        options = options.with_workers(workers);
    }
    if let Some(capacity) = queue_capacity {
        options = options.with_queue_capacity(capacity);
    }

    println!(
        "Executing workload: {} entries ({} flagged to fail)",
        workload.entries.len(),
        workload.failing_count()
    );

    // Task ids are payload indices; keep the entry ids around so failed
    // outcomes can still be attributed.
    let entry_ids: Vec<u64> = workload.entries.iter().map(|e| e.id).collect();

    let started = Instant::now();
    let results = run_batch(options, workload.entries, execute_entry)?;
    let elapsed = started.elapsed();

    let mut report = ExecutionReport {
        succeeded: 0,
        failed: 0,
        elapsed_us: elapsed.as_micros() as u64,
        entries: Vec::with_capacity(results.len()),
    };
    for result in &results {
        let entry_id = entry_ids[result.task_id.as_u64() as usize];
        match &result.outcome {
            Ok(_) => {
                report.succeeded += 1;
                report.entries.push(ReportEntry {
                    entry_id,
                    ok: true,
                    error: None,
                });
            }
            Err(err) => {
                report.failed += 1;
                report.entries.push(ReportEntry {
                    entry_id,
                    ok: false,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    println!(
        "Workload complete in {}: {} succeeded, {} failed",
        utils::format_duration(elapsed),
        report.succeeded,
        report.failed
    );
    for line in report.entries.iter().filter(|e| !e.ok).take(5) {
        println!(
            "  entry {}: {}",
            line.entry_id,
            line.error.as_deref().unwrap_or("unknown error")
        );
    }
    if report.failed > 5 {
        println!("  ... and {} more failures", report.failed - 5);
    }

    if let Some(output_file) = output_path {
        let report_json = serde_json::to_string_pretty(&report)
            .context("Failed to serialize execution report")?;
        fs::write(&output_file, report_json)
            .with_context(|| format!("Failed to write report to file: {}", output_file))?;
        println!("Report written to: {}", output_file);
    }
    Ok(())
}

fn execute_entry(task: Task<WorkloadEntry>) -> windlass_common::Result<u64> {
    let entry = task.payload;
    if entry.busy_us > 0 {
        thread::sleep(Duration::from_micros(entry.busy_us));
    }
    if entry.fail {
        return Err(Error::task_failed(format!(
            "entry {} flagged to fail",
            entry.id
        )));
    }
    Ok(entry.id)
}
