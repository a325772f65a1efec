//! Example: load a patient file and print what it contains
//!
//! Run with: cargo run --package records --example load_patients -- data/patients.jsonl

use records::{EntryCategory, PatientIndex};
use std::path::PathBuf;
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/patients.jsonl"));

    let start = Instant::now();
    let index = PatientIndex::load_from_file(&path)?;
    let elapsed = start.elapsed();

    let (patients, entries, rejected) = index.counts();

    println!("\n=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Patients: {}", patients);
    println!("Entries: {}", entries);
    println!("Rejected lines: {}", rejected);
    println!("Providers: {}", index.provider_ids().len());

    for category in EntryCategory::ALL {
        let count: usize = index
            .patients()
            .iter()
            .map(|p| p.entries_slice(category).len())
            .sum();
        println!("  {:<12} {}", category, count);
    }

    for rejection in index.rejected() {
        println!("line {}: {}", rejection.line, rejection.error);
    }

    Ok(())
}
