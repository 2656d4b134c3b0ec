//! # Rayo-DB: Embedded Analytics with In-Query ML Inference
//!
//! Rayo-DB is an embedded columnar analytics engine built for one job:
//! measuring the latency of SQL queries that invoke machine-learning models
//! as scalar UDFs. Tables live in Arrow record batches, models are loaded
//! once from serialized files and exposed through a narrow prediction
//! interface, and the [`bench::Harness`] times repeated invocations of the
//! whole black-box unit of work.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use rayo_db::bench::Harness;
//! use rayo_db::storage::StorageEngine;
//! use rayo_db::Database;
//!
//! # fn main() -> rayo_db::Result<()> {
//! let mut db = Database::new();
//! db.register_table("listings", StorageEngine::load_parquet("data/listings.parquet")?);
//!
//! let harness = Harness::new(5);
//! let report = harness.run("scan", || db.sql("SELECT * FROM listings"))?;
//! println!("trimmed mean: {:.6}s", report.summary().trimmed_mean);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod bench;
pub mod error;
pub mod model;
pub mod query;
pub mod storage;
pub mod udf;

pub use error::{Error, Result};

use arrow::record_batch::RecordBatch;
use query::{QueryEngine, QueryExecutor};
use std::collections::HashMap;
use storage::StorageEngine;
use tracing::debug;
use udf::{ScalarUdf, UdfRegistry};

/// Embedded database instance: named tables plus registered scalar UDFs.
///
/// Tables and functions are registered once during setup; query execution
/// takes `&self`, so nothing a benchmark times mutates the database.
pub struct Database {
    tables: HashMap<String, StorageEngine>,
    udfs: UdfRegistry,
    engine: QueryEngine,
    executor: QueryExecutor,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    /// Create an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            udfs: UdfRegistry::new(),
            engine: QueryEngine::new(),
            executor: QueryExecutor::new(),
        }
    }

    /// Register a table; re-registering a name replaces its storage.
    pub fn register_table(&mut self, name: impl Into<String>, storage: StorageEngine) {
        let name = name.into();
        debug!(table = %name, rows = storage.num_rows(), "table registered");
        self.tables.insert(name, storage);
    }

    /// Register a scalar UDF, making it callable from SQL.
    pub fn create_function(&mut self, udf: ScalarUdf) {
        self.udfs.register(udf);
    }

    /// Registered function registry (read side).
    #[must_use]
    pub const fn functions(&self) -> &UdfRegistry {
        &self.udfs
    }

    /// Parse and execute one SQL statement, returning the result batch.
    ///
    /// UDF signatures are validated against the actual columns before any
    /// invocation happens, so a mis-declared call fails up front.
    ///
    /// # Errors
    /// Returns error on invalid SQL, unknown tables, columns, or functions,
    /// signature mismatches, or a failing UDF body.
    pub fn sql(&self, sql: &str) -> Result<RecordBatch> {
        let plan = self.engine.parse(sql)?;
        let storage = self
            .tables
            .get(&plan.table)
            .ok_or_else(|| Error::UnknownTable(plan.table.clone()))?;
        self.executor.execute(&plan, storage, &self.udfs)
    }
}
