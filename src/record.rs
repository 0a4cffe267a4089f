//! The `user_data` row as it leaves the database.
use rusqlite::Row;
use serde::Serialize;

/// Column list shared by every query that produces a [`Record`].
pub const RECORD_COLUMNS: &str = "id, name, email, age";

/// One row of `user_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub id: String,
    pub name: String,
    pub email: String,
    pub age: u32,
}

impl Record {
    /// Converts the current row. A negative or oversized age fails the conversion.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Record {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            age: row.get("age")?,
        })
    }
}

/// Anything that carries an age; lets the aggregator fold records and bare ages alike.
pub trait Aged {
    fn age(&self) -> u32;
}

impl Aged for Record {
    fn age(&self) -> u32 {
        self.age
    }
}

impl Aged for u32 {
    fn age(&self) -> u32 {
        *self
    }
}
