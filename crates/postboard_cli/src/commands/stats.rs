//! Stats command implementation.

use super::{open, CliResult};
use serde::Serialize;
use std::path::Path;

/// Row count of one table.
#[derive(Debug, Serialize)]
pub struct TableRow {
    /// Table name.
    pub table: String,
    /// Number of rows.
    pub rows: usize,
}

/// Database statistics.
#[derive(Debug, Serialize)]
pub struct StatsOutput {
    /// Database path.
    pub path: String,
    /// Journal size in bytes.
    pub journal_size: u64,
    /// Last committed sequence number.
    pub committed_seq: u64,
    /// Row counts, by table name.
    pub tables: Vec<TableRow>,
}

/// Collects statistics.
pub fn stats(path: &Path) -> CliResult<StatsOutput> {
    let db = open(path)?;
    let tables = db
        .table_stats()
        .into_iter()
        .map(|s| TableRow {
            table: s.table,
            rows: s.rows,
        })
        .collect();
    Ok(StatsOutput {
        path: path.display().to_string(),
        journal_size: db.journal_size()?,
        committed_seq: db.committed_seq().as_u64(),
        tables,
    })
}

/// Runs the stats command.
pub fn run(path: &Path, format: &str) -> CliResult<()> {
    let output = stats(path)?;
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => print_text_output(&output),
    }
    Ok(())
}

fn print_text_output(output: &StatsOutput) {
    println!("Postboard Database");
    println!("==================");
    println!();
    println!("Path:          {}", output.path);
    println!("Journal size:  {} bytes", output.journal_size);
    println!("Committed seq: {}", output.committed_seq);
    println!();
    println!("Tables:");
    if output.tables.is_empty() {
        println!("  (none)");
    }
    for row in &output.tables {
        println!("  {:<10} {} rows", row.table, row.rows);
    }
}
