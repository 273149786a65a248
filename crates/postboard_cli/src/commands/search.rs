//! Search and reindex command implementations.

use super::index::IndexedBoard;
use super::CliResult;
use postboard_core::{Post, Record};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// One search hit.
#[derive(Debug, Serialize)]
pub struct Hit {
    /// Post id.
    pub id: i64,
    /// Post title.
    pub title: String,
    /// Post body.
    pub description: String,
    /// Creation time, RFC 3339.
    pub timestamp: String,
}

/// A page of search hits.
#[derive(Debug, Serialize)]
pub struct SearchOutput {
    /// Query as given.
    pub expression: String,
    /// Page number.
    pub page: usize,
    /// Page size.
    pub per_page: usize,
    /// Total matches across all pages.
    pub total: u64,
    /// Hits on this page.
    pub hits: Vec<Hit>,
}

/// Rebuilds and saves the post index. Returns the number of posts indexed.
pub fn reindex(path: &Path) -> CliResult<usize> {
    let (_board, indexed) = IndexedBoard::rebuild(path)?;
    Ok(indexed)
}

/// Searches posts.
pub fn search(
    path: &Path,
    expression: &str,
    page: usize,
    per_page: Option<usize>,
) -> CliResult<SearchOutput> {
    let board = IndexedBoard::open(path)?;
    let db = &board.db;
    let per_page = per_page.unwrap_or(db.config().default_per_page);
    let (posts, total) = db.search::<Post>(expression, page, per_page)?.into_parts();

    let hits = posts
        .into_iter()
        .map(|post| Hit {
            id: post.id().map_or(0, |id| id.as_i64()),
            timestamp: post.timestamp.to_rfc3339(),
            title: post.title,
            description: post.description,
        })
        .collect();

    Ok(SearchOutput {
        expression: expression.to_string(),
        page,
        per_page,
        total,
        hits,
    })
}

/// Runs the reindex command.
pub fn run_reindex(path: &Path) -> CliResult<()> {
    info!("Reindexing posts in {:?}", path);
    let indexed = reindex(path)?;
    println!("Indexed {indexed} posts");
    Ok(())
}

/// Runs the search command.
pub fn run(
    path: &Path,
    expression: &str,
    page: usize,
    per_page: Option<usize>,
    format: &str,
) -> CliResult<()> {
    let output = search(path, expression, page, per_page)?;
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => print_text_output(&output),
    }
    Ok(())
}

fn print_text_output(output: &SearchOutput) {
    println!(
        "{} matches for {:?} (page {}, {} per page)",
        output.total, output.expression, output.page, output.per_page
    );
    for hit in &output.hits {
        println!();
        println!("  [{}] {}  ({})", hit.id, hit.title, hit.timestamp);
        println!("      {}", hit.description);
    }
}
