//! Postboard CLI
//!
//! Command-line tools for a Postboard database.
//!
//! # Commands
//!
//! - `seed` - Insert the default teams and positions
//! - `add-user` - Create a user
//! - `add-post` - Create a post as a user
//! - `delete-post` - Delete a post
//! - `reindex` - Rebuild the search index of posts
//! - `search` - Full-text search over posts
//! - `stats` - Row counts per table

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Postboard command-line tools.
#[derive(Parser)]
#[command(name = "postboard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the database directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert the default teams and positions
    Seed,

    /// Create a user
    AddUser {
        /// Login name
        username: String,

        /// Email address
        email: String,

        /// Password to hash and store
        #[arg(long)]
        password: String,

        /// Team name
        #[arg(long)]
        team: Option<String>,

        /// Position name
        #[arg(long)]
        position: Option<String>,
    },

    /// Create a post as a user, in the user's team
    AddPost {
        /// Author's login name
        username: String,

        /// Post title
        title: String,

        /// Post body
        description: String,
    },

    /// Delete a post
    DeletePost {
        /// Post id
        id: i64,
    },

    /// Rebuild the search index of posts and report how many were indexed
    Reindex,

    /// Full-text search over posts
    Search {
        /// Search expression
        expression: String,

        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: usize,

        /// Results per page (defaults to the configured page size)
        #[arg(long)]
        per_page: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show row counts per table
    Stats {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Seed => {
            let path = cli.path.ok_or("Database path required for seed")?;
            commands::seed::run(&path)?;
        }
        Commands::AddUser {
            username,
            email,
            password,
            team,
            position,
        } => {
            let path = cli.path.ok_or("Database path required for add-user")?;
            let new_user = commands::add::NewUser {
                username,
                email,
                password,
                team,
                position,
            };
            commands::add::run_user(&path, &new_user)?;
        }
        Commands::AddPost {
            username,
            title,
            description,
        } => {
            let path = cli.path.ok_or("Database path required for add-post")?;
            commands::add::run_post(&path, &username, &title, &description)?;
        }
        Commands::DeletePost { id } => {
            let path = cli.path.ok_or("Database path required for delete-post")?;
            commands::delete::run(&path, id)?;
        }
        Commands::Reindex => {
            let path = cli.path.ok_or("Database path required for reindex")?;
            commands::search::run_reindex(&path)?;
        }
        Commands::Search {
            expression,
            page,
            per_page,
            format,
        } => {
            let path = cli.path.ok_or("Database path required for search")?;
            commands::search::run(&path, &expression, page, per_page, &format)?;
        }
        Commands::Stats { format } => {
            let path = cli.path.ok_or("Database path required for stats")?;
            commands::stats::run(&path, &format)?;
        }
        Commands::Version => {
            println!("Postboard CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Postboard Core v{}", postboard_core::VERSION);
        }
    }

    Ok(())
}
