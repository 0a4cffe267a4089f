/// # Test Utilities Module
///
/// Fixtures shared by the unit tests: an isolated server in a temporary
/// directory with the `user_data` table already created and filled.
use crate::config::DbConfig;
use crate::core::db::{ensure_database, ensure_table, transactional, Server, USER_DATA_DDL};
use crate::record::Record;
use tempfile::TempDir;
use uuid::Uuid;

/// A temporary server holding one seeded `ALX_prodev` database.
///
/// The directory is removed when the fixture is dropped.
pub struct SeededServer {
    pub server: Server,
    /// Rows in insertion order, which is also the order the streams read them in
    pub records: Vec<Record>,
    _dir: TempDir,
}

impl SeededServer {
    /// Creates the database and inserts one user per age.
    pub fn with_ages(ages: &[u32]) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let config = DbConfig {
            host: dir.path().to_string_lossy().into_owned(),
            ..DbConfig::default()
        };
        let server = Server::new(&config).expect("resolve temp server");
        ensure_database(&server.connect().expect("server session"), server.database())
            .expect("create database");

        let records: Vec<Record> = ages
            .iter()
            .enumerate()
            .map(|(i, age)| Record {
                id: Uuid::new_v4().to_string(),
                name: format!("user{}", i),
                email: format!("user{}@example.com", i),
                age: *age,
            })
            .collect();

        let mut conn = server.open().expect("open database");
        ensure_table(&conn, USER_DATA_DDL).expect("create table");
        transactional(&mut conn, |tx| {
            for record in &records {
                tx.execute(
                    "INSERT INTO user_data (id, name, email, age) VALUES (?1, ?2, ?3, ?4)",
                    (&record.id, &record.name, &record.email, record.age),
                )?;
            }
            Ok(())
        })
        .expect("insert fixture rows");
        drop(conn);

        SeededServer {
            server,
            records,
            _dir: dir,
        }
    }
}
