use crate::models::{CrawlRun, ListingStatus, OrderLevel, Side, TokenSummary};
use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use duckdb::{params, params_from_iter, Connection};
use std::path::Path;
use tracing::info;

// ── Schema ────────────────────────────────────────────────────────────────────

const DDL: &str = r#"
CREATE SEQUENCE IF NOT EXISTS crawl_run_ids;

CREATE TABLE IF NOT EXISTS tokens (
    symbol        VARCHAR PRIMARY KEY,
    name          VARCHAR NOT NULL DEFAULT '',
    latest_price  DOUBLE,
    change_pct    DOUBLE,
    volume_24h    DOUBLE,
    total_volume  DOUBLE,
    starts_at     TIMESTAMP,
    ends_at       TIMESTAMP,
    -- Vietnamese status phrase, verbatim; NULL once an end time is known
    status        VARCHAR,
    captured_at   TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS order_levels (
    symbol       VARCHAR NOT NULL,
    side         VARCHAR NOT NULL,
    price        DOUBLE,
    quantity     DOUBLE,
    total        DOUBLE,
    captured_at  TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS crawl_runs (
    id               BIGINT PRIMARY KEY,
    mode             VARCHAR NOT NULL,
    started_at       TIMESTAMP NOT NULL,
    finished_at      TIMESTAMP,
    status           VARCHAR NOT NULL DEFAULT 'running',
    tokens_crawled   INTEGER DEFAULT 0,
    levels_captured  INTEGER DEFAULT 0,
    error_msg        VARCHAR
);

CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TIMESTAMP NOT NULL
);
"#;

const INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_levels_symbol   ON order_levels (symbol);
CREATE INDEX IF NOT EXISTS idx_levels_captured ON order_levels (captured_at);
CREATE INDEX IF NOT EXISTS idx_runs_started    ON crawl_runs (started_at);
"#;

// ── Repository ────────────────────────────────────────────────────────────────

/// Token/level store. `order_levels.symbol` is kept consistent with `tokens`
/// by hand (children deleted first, inside one transaction) because DuckDB
/// rewrites updated rows, which makes declared foreign keys and upserts
/// fight each other.
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create dir {:?}", parent))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open DuckDB at {:?}", path))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn run_migrations(&self) -> Result<()> {
        info!("Running migrations…");
        self.conn.execute_batch(DDL).context("DDL failed")?;
        self.conn
            .execute_batch(INDEXES)
            .context("Index creation failed")?;
        self.conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, ?)",
            params![Utc::now().naive_utc()],
        )?;
        info!("Migrations done.");
        Ok(())
    }

    /// Raw SQL escape hatch for sabotaging the schema in tests.
    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        Ok(self.conn.execute_batch(sql)?)
    }

    // ── Tokens ────────────────────────────────────────────────────────────────

    /// Upsert summaries keyed by symbol. A None market figure keeps whatever
    /// an earlier crawl saw; status is overwritten as-is because None there
    /// means the card now shows an end time instead.
    pub fn upsert_tokens(&self, tokens: &[TokenSummary]) -> Result<usize> {
        if tokens.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        let sql = r#"
            INSERT INTO tokens
                (symbol, name, latest_price, change_pct, volume_24h, total_volume,
                 starts_at, ends_at, status, captured_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (symbol) DO UPDATE SET
                name         = excluded.name,
                latest_price = COALESCE(excluded.latest_price, tokens.latest_price),
                change_pct   = COALESCE(excluded.change_pct,   tokens.change_pct),
                volume_24h   = COALESCE(excluded.volume_24h,   tokens.volume_24h),
                total_volume = COALESCE(excluded.total_volume, tokens.total_volume),
                starts_at    = COALESCE(excluded.starts_at,    tokens.starts_at),
                ends_at      = COALESCE(excluded.ends_at,      tokens.ends_at),
                status       = excluded.status,
                captured_at  = excluded.captured_at
        "#;

        for t in tokens {
            tx.execute(
                sql,
                params![
                    t.symbol,
                    t.name,
                    t.latest_price,
                    t.change_pct,
                    t.volume_24h,
                    t.total_volume,
                    t.starts_at,
                    t.ends_at,
                    t.status.map(|s| s.as_str()),
                    t.captured_at,
                ],
            )
            .with_context(|| format!("upsert token {}", t.symbol))?;
        }
        tx.commit()?;
        Ok(tokens.len())
    }

    pub fn upsert_token(&self, token: &TokenSummary) -> Result<()> {
        self.upsert_tokens(std::slice::from_ref(token))?;
        Ok(())
    }

    pub fn list_symbols(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT symbol FROM tokens ORDER BY symbol")?;
        let syms: Vec<String> = stmt
            .query_map([], |r| r.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(syms)
    }

    /// Tokens in insertion order, which on a fresh database is listing order.
    pub fn list_tokens(&self) -> Result<Vec<TokenSummary>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT symbol, name, latest_price, change_pct, volume_24h, total_volume,
                      starts_at, ends_at, status, captured_at
               FROM tokens ORDER BY rowid"#,
        )?;
        let tokens: Vec<TokenSummary> = stmt
            .query_map([], |r| {
                let status: Option<String> = r.get(8)?;
                Ok(TokenSummary {
                    symbol: r.get(0)?,
                    name: r.get(1)?,
                    latest_price: r.get(2)?,
                    change_pct: r.get(3)?,
                    volume_24h: r.get(4)?,
                    total_volume: r.get(5)?,
                    starts_at: r.get(6)?,
                    ends_at: r.get(7)?,
                    status: status.as_deref().and_then(ListingStatus::from_phrase),
                    captured_at: r.get(9)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(tokens)
    }

    pub fn token_count(&self) -> Result<i64> {
        let mut s = self.conn.prepare("SELECT COUNT(*) FROM tokens")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    // ── Order levels ──────────────────────────────────────────────────────────

    /// Replace one token's book with a freshly captured batch. Each crawl
    /// produces whole-book snapshots, so the previous rows for the symbol go
    /// away in the same transaction.
    pub fn insert_order_levels(&self, symbol: &str, levels: &[OrderLevel]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM order_levels WHERE symbol = ?", params![symbol])?;

        let sql = r#"
            INSERT INTO order_levels (symbol, side, price, quantity, total, captured_at)
            VALUES (?, ?, ?, ?, ?, ?)
        "#;
        for level in levels {
            tx.execute(
                sql,
                params![
                    level.symbol,
                    level.side.as_str(),
                    level.price,
                    level.quantity,
                    level.total,
                    level.captured_at,
                ],
            )
            .with_context(|| format!("insert level {} {}", level.symbol, level.side.as_str()))?;
        }

        tx.commit()?;
        Ok(levels.len())
    }

    /// Levels in insertion order: page order within a side, the Mua side
    /// before Bán for each token, tokens in crawl order.
    pub fn list_levels(&self) -> Result<Vec<OrderLevel>> {
        let mut stmt = self.conn.prepare(
            "SELECT symbol, side, price, quantity, total, captured_at
             FROM order_levels ORDER BY rowid",
        )?;
        let rows: Vec<(String, String, Option<f64>, Option<f64>, Option<f64>, NaiveDateTime)> =
            stmt.query_map([], |r| {
                Ok((
                    r.get(0)?,
                    r.get(1)?,
                    r.get(2)?,
                    r.get(3)?,
                    r.get(4)?,
                    r.get(5)?,
                ))
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(rows
            .into_iter()
            .filter_map(|(symbol, side, price, quantity, total, captured_at)| {
                Some(OrderLevel {
                    symbol,
                    side: Side::from_label(&side)?,
                    price,
                    quantity,
                    total,
                    captured_at,
                })
            })
            .collect())
    }

    pub fn level_count(&self) -> Result<i64> {
        let mut s = self.conn.prepare("SELECT COUNT(*) FROM order_levels")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    pub fn capture_range(&self) -> Result<(Option<NaiveDateTime>, Option<NaiveDateTime>)> {
        let mut s = self
            .conn
            .prepare("SELECT MIN(captured_at), MAX(captured_at) FROM order_levels")?;
        Ok(s.query_row([], |r| Ok((r.get(0)?, r.get(1)?)))?)
    }

    /// Drop persisted tokens (children first) whose symbol is absent from the
    /// current crawl. Returns how many tokens went away.
    pub fn prune_missing(&self, keep: &[String]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let pruned = if keep.is_empty() {
            tx.execute("DELETE FROM order_levels", [])?;
            tx.execute("DELETE FROM tokens", [])?
        } else {
            let placeholders = vec!["?"; keep.len()].join(", ");
            tx.execute(
                &format!("DELETE FROM order_levels WHERE symbol NOT IN ({placeholders})"),
                params_from_iter(keep.iter()),
            )?;
            tx.execute(
                &format!("DELETE FROM tokens WHERE symbol NOT IN ({placeholders})"),
                params_from_iter(keep.iter()),
            )?
        };
        tx.commit()?;
        Ok(pruned)
    }

    // ── Crawl run log ─────────────────────────────────────────────────────────

    pub fn begin_crawl_run(&self, mode: &str) -> Result<i64> {
        let id: i64 = self.conn.query_row(
            r#"INSERT INTO crawl_runs (id, mode, started_at, status)
               VALUES (nextval('crawl_run_ids'), ?, ?, 'running')
               RETURNING id"#,
            params![mode, Utc::now().naive_utc()],
            |r| r.get(0),
        )?;
        Ok(id)
    }

    pub fn finish_crawl_run(
        &self,
        run_id: i64,
        tokens: usize,
        levels: usize,
        error: Option<&str>,
    ) -> Result<()> {
        self.conn.execute(
            r#"UPDATE crawl_runs SET
               finished_at = ?, status = ?,
               tokens_crawled = ?, levels_captured = ?, error_msg = ?
               WHERE id = ?"#,
            params![
                Utc::now().naive_utc(),
                if error.is_none() { "ok" } else { "failed" },
                tokens as i64,
                levels as i64,
                error,
                run_id,
            ],
        )?;
        Ok(())
    }

    pub fn last_run(&self) -> Result<Option<CrawlRun>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT id, mode, started_at, finished_at, status,
                      tokens_crawled, levels_captured, error_msg
               FROM crawl_runs ORDER BY id DESC LIMIT 1"#,
        )?;
        let run = stmt
            .query_row([], |r| {
                Ok(CrawlRun {
                    id: r.get(0)?,
                    mode: r.get(1)?,
                    started_at: r.get(2)?,
                    finished_at: r.get(3)?,
                    status: r.get(4)?,
                    tokens_crawled: r.get(5)?,
                    levels_captured: r.get(6)?,
                    error: r.get(7)?,
                })
            })
            .ok();
        Ok(run)
    }
}
