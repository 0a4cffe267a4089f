/// Query Execution Module
///
/// One-shot queries whose results are fully materialised, and an explicit,
/// caller-owned cache for repeated reads of the same query text.

use super::connection::{transactional, DatabaseConnection};
use crate::core::{ProdevError, Result};
use crate::record::Record;
use rusqlite::{Connection, Params};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Runs `sql` with `params` and collects every resulting row as a [`Record`].
///
/// The statement must select the `id, name, email, age` columns.
///
/// # Examples
///
/// ```no_run
/// # fn demo(conn: &rusqlite::Connection) -> prodev::core::Result<()> {
/// let older = prodev::core::db::execute_query(conn, "SELECT * FROM user_data WHERE age > ?1", [25])?;
/// # Ok(()) }
/// ```
pub fn execute_query<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Record>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, Record::from_row)?;
    let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    debug!(rows = records.len(), "query executed");
    Ok(records)
}

/// Changes one user's email inside its own transaction.
///
/// # Returns
///
/// `ProdevError::InvalidArgument` if no user has that id; nothing is changed in that case.
pub fn update_email(conn: &mut DatabaseConnection, id: &str, email: &str) -> Result<()> {
    transactional(conn, |tx| {
        let changed = tx.execute(
            "UPDATE user_data SET email = ?1 WHERE id = ?2",
            (email, id),
        )?;
        if changed == 0 {
            return Err(ProdevError::InvalidArgument(format!("no user with id {}", id)));
        }
        Ok(())
    })
}

#[derive(Debug)]
struct CacheEntry {
    records: Arc<Vec<Record>>,
    stored_at: Instant,
}

/// Query results keyed by the literal query text.
///
/// The cache belongs to whoever creates it (a session, a request). Entries
/// expire after the optional TTL and can be dropped with `invalidate` or `clear`.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Option<Duration>,
    hits: u64,
    misses: u64,
}

impl QueryCache {
    /// A cache whose entries never expire on their own.
    pub fn new() -> Self {
        QueryCache::default()
    }

    /// A cache whose entries are refreshed once older than `ttl`.
    pub fn with_ttl(ttl: Duration) -> Self {
        QueryCache {
            ttl: Some(ttl),
            ..QueryCache::default()
        }
    }

    /// Returns the cached records for `sql`, running the query on a miss.
    pub fn fetch(&mut self, conn: &Connection, sql: &str) -> Result<Arc<Vec<Record>>> {
        if let Some(entry) = self.entries.get(sql) {
            let fresh = self
                .ttl
                .map_or(true, |ttl| entry.stored_at.elapsed() < ttl);
            if fresh {
                self.hits += 1;
                debug!(sql, "query cache hit");
                return Ok(Arc::clone(&entry.records));
            }
        }

        self.misses += 1;
        debug!(sql, "query cache miss");
        let records = Arc::new(execute_query(conn, sql, [])?);
        self.entries.insert(
            sql.to_string(),
            CacheEntry {
                records: Arc::clone(&records),
                stored_at: Instant::now(),
            },
        );
        Ok(records)
    }

    /// Drops the entry for one query text. Returns whether it was present.
    pub fn invalidate(&mut self, sql: &str) -> bool {
        self.entries.remove(sql).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
