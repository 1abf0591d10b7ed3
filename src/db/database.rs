use std::collections::BTreeMap;
use std::path::Path;

use miette::Result;
use tracing::{debug, trace};

use crate::db::column::Column;
use crate::db::table::Table;
use crate::error::DatabaseError;
use crate::snapshot;
use crate::sql::executor::QueryExecutor;
use crate::sql::parser::QueryParser;
use crate::sql::result::QueryResult;

/// The database façade: a catalog of tables plus the query pipeline.
///
/// `execute` runs one statement to completion and never fails outward; every
/// error becomes the returned result's message. The catalog is exclusively
/// owned and single-threaded: callers serialise access externally.
#[derive(Debug, Default)]
pub struct Database {
    tables: BTreeMap<String, Table>,
}

impl Database {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table. The name must not be taken.
    pub fn create_table(&mut self, name: &str, columns: Vec<Column>) -> Result<()> {
        if self.tables.contains_key(name) {
            return Err(DatabaseError::TableAlreadyExists(name.to_string()).into());
        }
        let table = Table::new(name, columns)?;
        debug!(table = name, "created table");
        self.tables.insert(name.to_string(), table);
        Ok(())
    }

    /// Removes a table and everything in it.
    pub fn drop_table(&mut self, name: &str) -> Result<(), DatabaseError> {
        self.tables
            .remove(name)
            .map(|_| debug!(table = name, "dropped table"))
            .ok_or_else(|| DatabaseError::TableNotFound(name.to_string()))
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn get_table(&self, name: &str) -> Result<&Table, DatabaseError> {
        self.tables
            .get(name)
            .ok_or_else(|| DatabaseError::TableNotFound(name.to_string()))
    }

    pub fn get_table_mut(&mut self, name: &str) -> Result<&mut Table, DatabaseError> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| DatabaseError::TableNotFound(name.to_string()))
    }

    /// The catalog, keyed by table name.
    pub fn tables(&self) -> &BTreeMap<String, Table> {
        &self.tables
    }

    /// Parses and runs one statement. Never panics and never returns an
    /// error: failures arrive as `QueryResult::error_message`.
    pub fn execute(&mut self, query: &str) -> QueryResult {
        trace!(query, "executing");
        let statement = match QueryParser::new(query, self).and_then(|mut parser| parser.parse()) {
            Ok(statement) => statement,
            Err(report) => return QueryResult::error(report.to_string()),
        };
        QueryExecutor::execute(statement, self)
    }

    /// Writes the whole catalog as a snapshot document.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), DatabaseError> {
        let path = path.as_ref();
        snapshot::save(self, path)?;
        debug!(path = %path.display(), tables = self.tables.len(), "saved snapshot");
        Ok(())
    }

    /// Replaces the catalog with the contents of a snapshot document.
    ///
    /// On error the current catalog is left untouched. Indices are not part
    /// of a snapshot; rebuild them as needed after loading.
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<(), DatabaseError> {
        let path = path.as_ref();
        let tables = snapshot::load(path)?;
        debug!(path = %path.display(), tables = tables.len(), "loaded snapshot");
        self.tables = tables;
        Ok(())
    }
}
