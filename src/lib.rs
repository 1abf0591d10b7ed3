pub(crate) mod db;
pub(crate) mod error;
pub(crate) mod snapshot;
pub(crate) mod sql;
pub(crate) mod types;

pub use db::column::{Column, ColumnAttribute};
pub use db::database::Database;
pub use db::index::{Index, IndexKind};
pub use db::row::{Row, RowId};
pub use db::table::Table;
pub use error::DatabaseError;
pub use sql::expression::{BinaryOp, Binding, Expression, UnaryOp};
pub use sql::result::{QueryResult, ResultColumn, ResultRow};
pub use types::{DataType, Value};
