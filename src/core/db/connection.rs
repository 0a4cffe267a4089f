/// Connection Management Module
///
/// This module resolves the database server, opens and releases connections,
/// bootstraps the database and the `user_data` table, and wraps transactions.
///
/// A server is a data directory; each named database is one SQLite file in it.

use crate::config::DbConfig;
use crate::core::{ConnectionErrorKind, ProdevError, Result};
use rusqlite::{Connection, ErrorCode, OpenFlags, Transaction};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Schema of the table every stream reads from.
pub const USER_DATA_DDL: &str = "
CREATE TABLE IF NOT EXISTS user_data (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    age INTEGER NOT NULL
)";

const DATABASE_EXTENSION: &str = "sqlite3";
const LOCAL_HOST: &str = "localhost";

/// A reachable database server and the credentials used against it.
///
/// Every connection opened through a `Server` is counted until it is dropped
/// or closed, which makes leaked connections observable.
#[derive(Debug, Clone)]
pub struct Server {
    root: PathBuf,
    user: String,
    password: String,
    database: String,
    live: Arc<AtomicUsize>,
}

impl Server {
    /// Resolves the server named by `config.host`.
    ///
    /// `localhost` maps to the per-user data directory, created on demand.
    /// Any other host is a path to an existing directory.
    ///
    /// # Returns
    ///
    /// `ProdevError::Connection` with kind `Unreachable` if the directory cannot be used.
    pub fn new(config: &DbConfig) -> Result<Self> {
        let root = resolve_root(&config.host)?;
        debug!(host = %config.host, root = %root.display(), "resolved database server");
        Ok(Server {
            root,
            user: config.user.clone(),
            password: config.password.clone(),
            database: config.database.clone(),
            live: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Name of the database `open` connects to.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Number of connections opened through this server that are still alive.
    pub fn open_connections(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Opens a server-level session that is not bound to any database.
    pub fn connect(&self) -> Result<DatabaseConnection> {
        let conn = Connection::open_in_memory().map_err(classify_open_error)?;
        debug!(user = %self.user, "opened server session");
        Ok(DatabaseConnection::new(conn, self, None))
    }

    /// Opens a session on an existing database.
    ///
    /// # Returns
    ///
    /// `ConnectionErrorKind::UnknownDatabase` if the database has not been created.
    pub fn connect_to(&self, database: &str) -> Result<DatabaseConnection> {
        let path = database_path(&self.root, database)?;
        if !path.is_file() {
            return Err(ProdevError::connection(
                ConnectionErrorKind::UnknownDatabase,
                format!("Database {} does not exist", database),
            ));
        }

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(classify_open_error)?;
        if self.password.is_empty() {
            debug!(user = %self.user, database, "opened connection without password");
        } else {
            debug!(user = %self.user, database, "opened connection");
        }
        Ok(DatabaseConnection::new(conn, self, Some(database.to_string())))
    }

    /// Opens a session on the configured database.
    pub fn open(&self) -> Result<DatabaseConnection> {
        self.connect_to(&self.database)
    }
}

/// Connects straight to the database named in `config`.
pub fn connect(config: &DbConfig) -> Result<DatabaseConnection> {
    Server::new(config)?.connect_to(&config.database)
}

fn resolve_root(host: &str) -> Result<PathBuf> {
    if host == LOCAL_HOST {
        let base = dirs::data_local_dir().ok_or_else(|| {
            ProdevError::connection(
                ConnectionErrorKind::Unreachable,
                "no local data directory available",
            )
        })?;
        let root = base.join("prodev");
        std::fs::create_dir_all(&root).map_err(|e| {
            ProdevError::connection(
                ConnectionErrorKind::Unreachable,
                format!("{}: {}", root.display(), e),
            )
        })?;
        return Ok(root);
    }

    let root = PathBuf::from(host);
    if !root.is_dir() {
        return Err(ProdevError::connection(
            ConnectionErrorKind::Unreachable,
            format!("data directory {} not found", root.display()),
        ));
    }
    Ok(root)
}

fn database_path(root: &Path, name: &str) -> Result<PathBuf> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(ProdevError::InvalidArgument(format!(
            "invalid database name {:?}",
            name
        )));
    }
    Ok(root.join(format!("{}.{}", name, DATABASE_EXTENSION)))
}

fn classify_open_error(err: rusqlite::Error) -> ProdevError {
    let kind = match &err {
        rusqlite::Error::SqliteFailure(e, _) => match e.code {
            ErrorCode::PermissionDenied
            | ErrorCode::AuthorizationForStatementDenied
            | ErrorCode::ReadOnly => Some(ConnectionErrorKind::AccessDenied),
            ErrorCode::CannotOpen => Some(ConnectionErrorKind::Unreachable),
            _ => None,
        },
        _ => None,
    };
    match kind {
        Some(kind) => ProdevError::connection(kind, err.to_string()),
        None => ProdevError::Query(err),
    }
}

/// Counts one live connection for as long as it exists.
#[derive(Debug)]
struct Lease {
    live: Arc<AtomicUsize>,
}

impl Lease {
    fn acquire(live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Lease { live: Arc::clone(live) }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        debug!("connection released");
    }
}

/// One live session, exclusively owned by whoever opened it.
///
/// Dropping it closes the underlying SQLite handle; `close` does the same but
/// reports a failing close.
#[derive(Debug)]
pub struct DatabaseConnection {
    conn: Connection,
    root: PathBuf,
    database: Option<String>,
    _lease: Lease,
}

impl DatabaseConnection {
    fn new(conn: Connection, server: &Server, database: Option<String>) -> Self {
        DatabaseConnection {
            conn,
            root: server.root.clone(),
            database,
            _lease: Lease::acquire(&server.live),
        }
    }

    /// The database this session is bound to, `None` for server sessions.
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Closes the session explicitly.
    pub fn close(self) -> Result<()> {
        let DatabaseConnection { conn, _lease, .. } = self;
        conn.close().map_err(|(_, e)| ProdevError::Query(e))
    }
}

impl Deref for DatabaseConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl DerefMut for DatabaseConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

/// Creates the named database on the session's server if it is missing.
///
/// Safe to call repeatedly.
pub fn ensure_database(conn: &DatabaseConnection, name: &str) -> Result<()> {
    let path = database_path(&conn.root, name)?;
    let existed = path.is_file();
    let db = Connection::open_with_flags(
        &path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )
    .map_err(classify_open_error)?;
    db.execute_batch("PRAGMA journal_mode = WAL;")?;
    db.close().map_err(|(_, e)| ProdevError::Query(e))?;

    if existed {
        debug!(database = name, "database already exists");
    } else {
        info!(database = name, "database created");
    }
    Ok(())
}

/// Runs a `CREATE ... IF NOT EXISTS` statement on the session.
pub fn ensure_table(conn: &DatabaseConnection, ddl: &str) -> Result<()> {
    conn.execute_batch(ddl)?;
    debug!("table ensured");
    Ok(())
}

/// Runs `f` inside a transaction: commit on `Ok`, roll back on `Err`.
pub fn transactional<T, F>(conn: &mut DatabaseConnection, f: F) -> Result<T>
where
    F: FnOnce(&Transaction<'_>) -> Result<T>,
{
    let tx = conn.transaction()?;
    match f(&tx) {
        Ok(value) => {
            tx.commit()?;
            debug!("transaction committed");
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback() {
                error!("rollback failed: {}", rollback_err);
            }
            warn!("transaction rolled back: {}", e);
            Err(e)
        }
    }
}
