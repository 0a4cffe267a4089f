//! Bootstraps the database and loads users from CSV.
use crate::core::db::{
    ensure_database, ensure_table, transactional, DatabaseConnection, Server, USER_DATA_DDL,
};
use crate::core::{ProdevError, Result};
use crate::record::Record;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

const INSERT_USER: &str =
    "INSERT OR IGNORE INTO user_data (id, name, email, age) VALUES (?1, ?2, ?3, ?4)";

/// Outcome of a CSV load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Rows written to the table
    pub inserted: usize,
    /// Malformed rows left out
    pub skipped: usize,
    /// Valid rows whose id was already present
    pub duplicates: usize,
}

/// Stable id for rows that carry none, so reloading a file finds them again.
fn user_id(name: &str, email: &str) -> Uuid {
    let key = format!("{}\u{1f}{}", name, email.to_ascii_lowercase());
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
}

/// Parses one CSV row in either `id,name,email,age` or `name,email,age` form.
fn parse_row(row: &StringRecord) -> std::result::Result<Record, String> {
    let (id, name, email, age) = match row.len() {
        4 => (Some(&row[0]), &row[1], &row[2], &row[3]),
        3 => (None, &row[0], &row[1], &row[2]),
        n => return Err(format!("expected 3 or 4 columns, found {}", n)),
    };
    if name.is_empty() || email.is_empty() {
        return Err("name and email must not be empty".to_string());
    }
    let age: u32 = age
        .parse()
        .map_err(|_| format!("age {:?} is not a non-negative integer", age))?;
    let id = match id {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => user_id(name, email).to_string(),
    };

    Ok(Record {
        id,
        name: name.to_string(),
        email: email.to_string(),
        age,
    })
}

/// Loads users from CSV text, skipping the header row.
///
/// Malformed rows are logged and counted, never fatal. All valid rows go in
/// as one transaction; if any insert fails, nothing is kept and the error
/// comes back as `ProdevError::DataLoad`.
pub fn load_csv_from<R: Read>(conn: &mut DatabaseConnection, source: R) -> Result<LoadReport> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(source);

    let mut report = LoadReport::default();
    let mut valid = Vec::new();
    for result in reader.records() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!("Skipping unreadable row: {}", e);
                report.skipped += 1;
                continue;
            }
        };
        match parse_row(&row) {
            Ok(record) => valid.push(record),
            Err(reason) => {
                let line = row.position().map(|p| p.line()).unwrap_or_default();
                warn!(line, "Skipping malformed row {:?}: {}", row, reason);
                report.skipped += 1;
            }
        }
    }

    let inserted = transactional(conn, |tx| {
        let mut stmt = tx.prepare(INSERT_USER)?;
        let mut inserted = 0;
        for record in &valid {
            inserted += stmt.execute((&record.id, &record.name, &record.email, record.age))?;
        }
        Ok(inserted)
    })
    .map_err(|e| ProdevError::DataLoad(format!("insert rolled back: {}", e)))?;

    report.inserted = inserted;
    report.duplicates = valid.len() - inserted;
    info!(
        inserted = report.inserted,
        skipped = report.skipped,
        duplicates = report.duplicates,
        "CSV load committed"
    );
    Ok(report)
}

/// Loads users from the CSV file at `path`.
pub fn load_csv<P: AsRef<Path>>(conn: &mut DatabaseConnection, path: P) -> Result<LoadReport> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| ProdevError::DataLoad(format!("{}: {}", path.display(), e)))?;
    load_csv_from(conn, file)
}

/// Full bootstrap: create the database and table if needed, then load the CSV.
pub fn seed<P: AsRef<Path>>(server: &Server, csv_path: P) -> Result<LoadReport> {
    let admin = server.connect()?;
    ensure_database(&admin, server.database())?;
    admin.close()?;

    let mut conn = server.open()?;
    ensure_table(&conn, USER_DATA_DDL)?;
    let report = load_csv(&mut conn, csv_path)?;
    conn.close()?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::execute_query;
    use crate::test_utils::SeededServer;

    const SAMPLE: &str = "name,email,age
Alice,alice@x.com,20
Bob,bob@x.com,30
bad,nomail
";

    fn all_records(conn: &DatabaseConnection) -> Vec<Record> {
        execute_query(conn, "SELECT * FROM user_data ORDER BY rowid", []).unwrap()
    }

    #[test]
    fn test_skips_malformed_rows() {
        let fixture = SeededServer::with_ages(&[]);
        let mut conn = fixture.server.open().unwrap();

        let report = load_csv_from(&mut conn, SAMPLE.as_bytes()).unwrap();
        assert_eq!(
            report,
            LoadReport {
                inserted: 2,
                skipped: 1,
                duplicates: 0
            }
        );

        let records = all_records(&conn);
        assert_eq!(records[0].name, "Alice");
        assert_eq!(records[1].age, 30);
        assert!(Uuid::parse_str(&records[0].id).is_ok());
    }

    #[test]
    fn test_four_column_rows_keep_their_id() {
        let fixture = SeededServer::with_ages(&[]);
        let mut conn = fixture.server.open().unwrap();
        let csv = "user_id,name,email,age
00000000-0000-0000-0000-000000000001,Carol,carol@x.com,41
,Dan,dan@x.com,52
00000000-0000-0000-0000-000000000003,Eve,eve@x.com,old
00000000-0000-0000-0000-000000000004,,frank@x.com,20
";
        let report = load_csv_from(&mut conn, csv.as_bytes()).unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.skipped, 2);

        let records = all_records(&conn);
        assert_eq!(records[0].id, "00000000-0000-0000-0000-000000000001");
        assert!(!records[1].id.is_empty());
    }

    #[test]
    fn test_reload_counts_duplicates() {
        let fixture = SeededServer::with_ages(&[]);
        let mut conn = fixture.server.open().unwrap();
        let csv = "user_id,name,email,age
a1,Ann,ann@x.com,33
";
        load_csv_from(&mut conn, csv.as_bytes()).unwrap();
        let report = load_csv_from(&mut conn, csv.as_bytes()).unwrap();
        assert_eq!(report.inserted, 0);
        assert_eq!(report.duplicates, 1);
        assert_eq!(all_records(&conn).len(), 1);
    }

    #[test]
    fn test_insert_failure_rolls_back_everything() {
        let fixture = SeededServer::with_ages(&[]);
        let mut conn = fixture.server.open().unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reject_bob BEFORE INSERT ON user_data
             WHEN NEW.name = 'Bob'
             BEGIN SELECT RAISE(ABORT, 'bob rejected'); END;",
        )
        .unwrap();

        let err = load_csv_from(&mut conn, SAMPLE.as_bytes()).unwrap_err();
        assert!(matches!(err, ProdevError::DataLoad(_)));
        assert!(err.to_string().contains("bob rejected"), "{}", err);
        assert!(all_records(&conn).is_empty());
    }

    #[test]
    fn test_generated_ids_are_stable() {
        let first = user_id("Alice", "alice@x.com");
        assert_eq!(first, user_id("Alice", "ALICE@x.com"));
        assert_ne!(first, user_id("Alice", "alice@y.com"));
        assert_eq!(first.get_version_num(), 5);
    }

    #[test]
    fn test_missing_file() {
        let fixture = SeededServer::with_ages(&[]);
        let mut conn = fixture.server.open().unwrap();
        let err = load_csv(&mut conn, "/nonexistent/user_data.csv").unwrap_err();
        assert!(matches!(err, ProdevError::DataLoad(_)));
    }

    #[test]
    fn test_seed_bootstraps_fresh_server() {
        let dir = tempfile::TempDir::new().unwrap();
        let csv_path = dir.path().join("user_data.csv");
        std::fs::write(&csv_path, SAMPLE).unwrap();
        let config = crate::config::DbConfig {
            host: dir.path().to_string_lossy().into_owned(),
            ..Default::default()
        };
        let server = Server::new(&config).unwrap();

        let report = seed(&server, &csv_path).unwrap();
        assert_eq!(report.inserted, 2);
        let again = seed(&server, &csv_path).unwrap();
        assert_eq!(again.inserted, 0);
        assert_eq!(again.duplicates, 2);

        let conn = server.open().unwrap();
        assert_eq!(all_records(&conn).len(), 2);
        drop(conn);
        assert_eq!(server.open_connections(), 0);
    }
}
