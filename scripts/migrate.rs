#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use haulboard::{logging, migrate};

#[derive(Parser)]
#[command(name = "migrate", about = "Haulboard migration helper")]
struct Cli {
    /// Optional explicit DB path
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// List migrations and show applied/pending
    List,
    /// Show current migration status
    Status,
    /// Apply pending migrations and schema shims
    Up,
}

fn resolve_db_path(cli: &Cli) -> Result<PathBuf> {
    if let Some(path) = &cli.db {
        return Ok(path.clone());
    }
    if let Ok(path) = std::env::var("HAULBOARD_DB") {
        return Ok(PathBuf::from(path));
    }
    let base = dirs::data_dir().context("no platform data directory; pass --db")?;
    Ok(base.join("haulboard").join("haulboard.sqlite3"))
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    let path = resolve_db_path(&cli)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let pool = migrate::open_pool(&path).await?;

    match cli.cmd {
        Cmd::List => {
            let applied = migrate::applied_versions(&pool).await?;
            for name in migrate::migration_names() {
                let mark = if applied.iter().any(|v| v == name) {
                    "applied"
                } else {
                    "pending"
                };
                println!("{mark:>8}  {name}");
            }
        }
        Cmd::Status => {
            let applied = migrate::applied_versions(&pool).await?;
            let total = migrate::migration_names().len();
            println!(
                "{} of {} migrations applied ({})",
                applied.len(),
                total,
                path.display()
            );
        }
        Cmd::Up => {
            migrate::apply_migrations(&pool).await?;
            println!("store is up to date ({})", path.display());
        }
    }

    Ok(())
}
