//! Shared setup for the integration tests: a temporary server seeded from CSV.
#![allow(dead_code)]

use prodev::config::DbConfig;
use prodev::core::db::Server;
use prodev::seed::{seed, LoadReport};
use std::fmt::Write;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct CsvServer {
    pub server: Server,
    pub report: LoadReport,
    pub csv_path: PathBuf,
    pub dir: TempDir,
}

pub fn config_for(dir: &TempDir) -> DbConfig {
    DbConfig {
        host: dir.path().to_string_lossy().into_owned(),
        ..DbConfig::default()
    }
}

/// Seeds a fresh server from raw CSV text.
pub fn seeded_from_csv(csv: &str) -> CsvServer {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("user_data.csv");
    std::fs::write(&csv_path, csv).unwrap();

    let server = Server::new(&config_for(&dir)).unwrap();
    let report = seed(&server, &csv_path).unwrap();
    CsvServer {
        server,
        report,
        csv_path,
        dir,
    }
}

/// Seeds a fresh server with one `name,email,age` row per age.
pub fn seeded_with_ages(ages: &[u32]) -> CsvServer {
    let mut csv = String::from("name,email,age\n");
    for (i, age) in ages.iter().enumerate() {
        writeln!(csv, "user{i},user{i}@example.com,{age}").unwrap();
    }
    seeded_from_csv(&csv)
}
