use miette::Diagnostic;

/// Errors surfaced by the database façade and the snapshot codec.
///
/// Query-level failures never reach the caller as errors: `Database::execute`
/// funnels every failure mode into `QueryResult::error`. This type covers the
/// calls that report failure directly (snapshot I/O, programmatic catalog
/// manipulation).
#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum DatabaseError {
    /// An I/O error occurred while reading or writing a snapshot file.
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),

    /// A snapshot document could not be encoded or decoded.
    #[error("Serialization Error: {0}")]
    SerializationError(String),

    /// The requested table does not exist.
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// A table with the same name already exists in the catalog.
    #[error("Table already exists: {0}")]
    TableAlreadyExists(String),
}
