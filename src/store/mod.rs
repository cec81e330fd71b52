//! Materialization of mapped tables into a SQLite component library.
//!
//! One [`Materializer`] owns one connection. `generate` runs the whole pass:
//! schema, categories, component rows, the library descriptor, the report.

pub mod categories;
pub mod dblib;
pub mod materialize;
pub mod report;
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rusqlite::Connection;
use tracing::{error, info};

use crate::config::StoreConfig;
use crate::core::table::TableMapping;
use crate::error::StoreError;

pub use categories::{CategoryIds, DEFAULT_CATEGORIES};
pub use materialize::MaterializeStats;
pub use report::{MigrationReport, generate_report};

pub struct Materializer {
    conn: Connection,
    config: StoreConfig,
    db_path: Option<PathBuf>,
}

/// Paths written by [`Materializer::generate`].
#[derive(Debug, Clone)]
pub struct GeneratedFiles {
    pub output_dir: PathBuf,
    pub database: PathBuf,
    pub descriptor: PathBuf,
    /// `None` when the report could not be written.
    pub report: Option<PathBuf>,
    pub stats: MaterializeStats,
}

impl Materializer {
    pub fn open(path: &Path, config: StoreConfig) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self { conn, config, db_path: Some(path.to_path_buf()) })
    }

    pub fn open_in_memory(config: StoreConfig) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn, config, db_path: None })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Full pass into `output_dir`. A report failure is logged and leaves
    /// `GeneratedFiles::report` empty; everything else is fatal.
    pub fn generate(output_dir: &Path, config: StoreConfig, tables: &[TableMapping]) -> Result<GeneratedFiles, StoreError> {
        let started = Instant::now();
        fs::create_dir_all(output_dir).map_err(|source| StoreError::Io { path: output_dir.to_path_buf(), source })?;

        let database = output_dir.join(&config.database_name);
        let descriptor = output_dir.join(&config.dblib_name);
        let report_path = output_dir.join(&config.report_name);
        let store = Materializer::open(&database, config)?;

        info!("step 1/5: creating database schema");
        store.create_schema()?;

        info!("step 2/5: populating categories");
        let ids = store.populate_categories(tables)?;

        info!("step 3/5: populating components");
        let stats = store.materialize(tables, &ids)?;

        info!("step 4/5: writing library descriptor");
        store.write_library_descriptor(&descriptor)?;

        info!("step 5/5: generating migration report");
        let report = generate_report(tables);
        let report_path = match report.write(&report_path) {
            Ok(()) => {
                info!(path = %report_path.display(), "{}", report.summary_text());
                Some(report_path)
            }
            Err(e) => {
                error!(error = %e, "migration report not written");
                None
            }
        };

        info!(elapsed_ms = started.elapsed().as_millis() as u64, "library generation finished");
        Ok(GeneratedFiles { output_dir: output_dir.to_path_buf(), database, descriptor, report: report_path, stats })
    }
}
