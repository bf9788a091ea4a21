use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Executor, Row, SqlitePool};
use tracing::{error, info};

use crate::matrix;
use crate::time::now_ms;

static MIGRATIONS: &[(&str, &str)] = &[
    (
        "202608011200_initial.sql",
        include_str!("../migrations/202608011200_initial.sql"),
    ),
    (
        "202608051500_matrix_completeness.sql",
        include_str!("../migrations/202608051500_matrix_completeness.sql"),
    ),
];

fn preview(sql: &str) -> String {
    let one_line = sql.replace(['\n', '\t'], " ");
    let trimmed = one_line.trim();
    if trimmed.len() > 160 {
        format!("{}…", &trimmed[..160])
    } else {
        trimmed.to_string()
    }
}

fn cleaned_sql(raw: &str) -> String {
    raw.lines()
        .filter(|line| {
            let t = line.trim_start();
            !(t.is_empty() || t.starts_with("--"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn migration_names() -> Vec<&'static str> {
    MIGRATIONS.iter().map(|(name, _)| *name).collect()
}

/// Versions recorded as applied; empty when the ledger table itself does
/// not exist yet.
pub async fn applied_versions(pool: &SqlitePool) -> anyhow::Result<Vec<String>> {
    let ledger: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_migrations'",
    )
    .fetch_optional(pool)
    .await?;
    if ledger.is_none() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query("SELECT version FROM schema_migrations ORDER BY version")
        .fetch_all(pool)
        .await?;
    let mut versions = Vec::with_capacity(rows.len());
    for row in rows {
        versions.push(row.try_get::<String, _>("version")?);
    }
    Ok(versions)
}

/// Open (creating if missing) the database at `path` without touching the
/// schema. Callers that want a ready store follow up with
/// [`apply_migrations`].
pub async fn open_pool(path: &Path) -> anyhow::Result<SqlitePool> {
    let opts = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(opts)
        .await?;
    Ok(pool)
}

/// Bring the store to the current shape. Runs once at process startup,
/// before any other component touches the store; re-entrant, so a second
/// run produces no errors and no duplicate structural changes.
pub async fn apply_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    pool.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (\
           version    TEXT PRIMARY KEY,\
           applied_at INTEGER NOT NULL,\
           checksum   TEXT NOT NULL\
         )",
    )
    .await?;

    let rows = sqlx::query("SELECT version, checksum FROM schema_migrations")
        .fetch_all(pool)
        .await?;
    let mut applied: HashMap<String, String> = HashMap::new();
    for r in rows {
        if let (Ok(v), Ok(c)) = (
            r.try_get::<String, _>("version"),
            r.try_get::<String, _>("checksum"),
        ) {
            applied.insert(v, c);
        }
    }

    let add_col_re = Regex::new(r"(?i)^ALTER\s+TABLE\s+(\w+)\s+ADD\s+COLUMN\s+(\w+)")
        .expect("static regex");

    for (filename, raw_sql) in MIGRATIONS {
        let cleaned = cleaned_sql(raw_sql);
        let checksum = format!("{:x}", Sha256::digest(cleaned.as_bytes()));

        if let Some(stored) = applied.get(*filename) {
            if stored != &checksum {
                anyhow::bail!("migration {} edited after application", filename);
            }
            info!(target: "haulboard", event = "migration_skip_file", file = %filename);
            continue;
        }

        let mut tx = pool.begin().await?;
        for stmt in cleaned.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            let upper = s.to_ascii_uppercase();
            if upper == "BEGIN" || upper == "COMMIT" {
                continue;
            }
            // An upgraded legacy store may already carry a column a
            // migration adds; skip rather than fail.
            if let Some(caps) = add_col_re.captures(s) {
                let table = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                let col = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
                let exists: Option<i64> = sqlx::query_scalar(&format!(
                    "SELECT 1 FROM pragma_table_info('{table}') WHERE name='{col}'"
                ))
                .fetch_optional(&mut *tx)
                .await?;
                if exists.is_some() {
                    info!(target: "haulboard", event = "migration_stmt_skip", file = %filename, sql = %preview(s));
                    continue;
                }
            }
            info!(target: "haulboard", event = "migration_stmt", file = %filename, sql = %preview(s));
            if let Err(e) = sqlx::query(s).execute(&mut *tx).await {
                error!(target: "haulboard", event = "migration_stmt_error", file = %filename, sql = %preview(s), error = %e);
                return Err(e.into());
            }
        }

        sqlx::query(
            "INSERT INTO schema_migrations (version, applied_at, checksum) VALUES (?, ?, ?)",
        )
        .bind(*filename)
        .bind(now_ms())
        .bind(&checksum)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(target: "haulboard", event = "migration_file_applied", file = %filename);
    }

    ensure_matrix_shape(pool).await?;

    Ok(())
}

/// Guarded shims for stores created before the completeness era: recompute
/// the derived flag, retire the legacy hard-uniqueness constraint, and keep
/// the advisory lookup index in place. All idempotent.
async fn ensure_matrix_shape(pool: &SqlitePool) -> anyhow::Result<()> {
    let rows = sqlx::query(
        "SELECT id, origin, destination, client_name, unit_name, is_complete FROM client_matrix",
    )
    .fetch_all(pool)
    .await?;
    let mut backfilled = 0u64;
    for row in rows {
        let id: String = row.try_get("id")?;
        let origin: String = row.try_get("origin")?;
        let destination: String = row.try_get("destination")?;
        let client_name: String = row.try_get("client_name")?;
        let unit_name: String = row.try_get("unit_name")?;
        let stored: i64 = row.try_get("is_complete")?;
        let computed = matrix::is_complete(&origin, &destination, &client_name, &unit_name);
        if (stored != 0) != computed {
            sqlx::query("UPDATE client_matrix SET is_complete = ? WHERE id = ?")
                .bind(computed as i64)
                .bind(&id)
                .execute(pool)
                .await?;
            backfilled += 1;
        }
    }
    if backfilled > 0 {
        info!(target: "haulboard", event = "completeness_backfill", rows = backfilled);
    }

    // The 4-tuple business key is advisory only.
    sqlx::query("DROP INDEX IF EXISTS uniq_row").execute(pool).await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_client_matrix_lookup \
         ON client_matrix(origin, destination, client_name, unit_name)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
