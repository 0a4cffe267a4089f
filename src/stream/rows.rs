//! Row-at-a-time streaming over `user_data`.
//!
//! A [`RowStream`] borrows a prepared statement, so it only exists inside the
//! scope that owns the connection. The `stream_*` functions open that scope,
//! hand the stream to a closure, and release the connection when the closure
//! returns, however far it got through the rows.
use crate::core::db::Server;
use crate::core::{ProdevError, Result};
use crate::record::{Record, RECORD_COLUMNS};
use rusqlite::{Connection, Row, Rows};
use std::mem;
use tracing::{debug, error};

/// Converts the current row into a stream item.
pub type RowConverter<T> = fn(&Row<'_>) -> rusqlite::Result<T>;

enum State<'s> {
    Live(Rows<'s>),
    Failed(ProdevError),
    Done,
}

/// Lazy sequence of rows from a single query.
///
/// Yields `Ok` items until the cursor runs out. A failure is yielded once as
/// `Err` and the stream ends right after it.
pub struct RowStream<'s, T = Record> {
    state: State<'s>,
    convert: RowConverter<T>,
    rows_read: usize,
}

impl<'s, T> RowStream<'s, T> {
    pub fn new(rows: Rows<'s>, convert: RowConverter<T>) -> Self {
        RowStream {
            state: State::Live(rows),
            convert,
            rows_read: 0,
        }
    }

    /// A stream whose only item is `err`.
    pub fn failed(err: ProdevError, convert: RowConverter<T>) -> Self {
        error!("Error while streaming: {}", err);
        RowStream {
            state: State::Failed(err),
            convert,
            rows_read: 0,
        }
    }

    /// Rows successfully converted so far.
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }
}

impl<T> Iterator for RowStream<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let rows = match &mut self.state {
            State::Live(rows) => rows,
            State::Failed(_) => {
                return match mem::replace(&mut self.state, State::Done) {
                    State::Failed(err) => Some(Err(err)),
                    _ => None,
                };
            }
            State::Done => return None,
        };

        let step = match rows.next() {
            Ok(Some(row)) => Some((self.convert)(row)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        };

        match step {
            Some(Ok(item)) => {
                self.rows_read += 1;
                Some(Ok(item))
            }
            Some(Err(e)) => {
                error!("Error while streaming: {}", e);
                self.state = State::Done;
                Some(Err(e.into()))
            }
            None => {
                debug!(rows = self.rows_read, "row stream exhausted");
                self.state = State::Done;
                None
            }
        }
    }
}

fn select_records() -> String {
    format!("SELECT {} FROM user_data ORDER BY rowid", RECORD_COLUMNS)
}

const SELECT_AGES: &str = "SELECT age FROM user_data ORDER BY rowid";

fn age_from_row(row: &Row<'_>) -> rusqlite::Result<u32> {
    row.get(0)
}

/// Runs `sql` once on `conn` and lends the resulting stream to `consume`.
pub fn stream_query<T, R, F>(conn: &Connection, sql: &str, convert: RowConverter<T>, consume: F) -> R
where
    F: FnOnce(RowStream<'_, T>) -> R,
{
    let mut stmt = match conn.prepare(sql) {
        Ok(stmt) => stmt,
        Err(e) => return consume(RowStream::failed(e.into(), convert)),
    };
    let rows = stmt.query([]);
    match rows {
        Ok(rows) => consume(RowStream::new(rows, convert)),
        Err(e) => consume(RowStream::failed(e.into(), convert)),
    }
}

fn stream_owned<T, R, F>(server: &Server, sql: &str, convert: RowConverter<T>, consume: F) -> R
where
    F: FnOnce(RowStream<'_, T>) -> R,
{
    let conn = match server.open() {
        Ok(conn) => conn,
        Err(e) => return consume(RowStream::failed(e, convert)),
    };
    stream_query(&conn, sql, convert, consume)
}

/// Streams every user record on an already open connection.
pub fn stream_rows_on<R, F>(conn: &Connection, consume: F) -> R
where
    F: FnOnce(RowStream<'_, Record>) -> R,
{
    stream_query(conn, &select_records(), Record::from_row, consume)
}

/// Opens a connection, streams every user record through `consume`, and closes the connection.
///
/// # Examples
///
/// ```no_run
/// # fn demo(server: &prodev::core::db::Server) {
/// let first_two: Vec<_> = prodev::stream::stream_rows(server, |rows| rows.take(2).collect());
/// # }
/// ```
pub fn stream_rows<R, F>(server: &Server, consume: F) -> R
where
    F: FnOnce(RowStream<'_, Record>) -> R,
{
    stream_owned(server, &select_records(), Record::from_row, consume)
}

/// Like [`stream_rows`], but selects only the age column.
pub fn stream_ages<R, F>(server: &Server, consume: F) -> R
where
    F: FnOnce(RowStream<'_, u32>) -> R,
{
    stream_owned(server, SELECT_AGES, age_from_row, consume)
}
