use crate::db::column::Column;
use crate::db::index::IndexKind;
use crate::sql::expression::Expression;
use crate::types::Value;

/// One item of a SELECT list.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expression: Expression,

    /// Result-column name: the `as` alias, or the item's source text.
    pub alias: String,
}

/// The single inner join a SELECT may carry.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub table: String,
    pub on: Expression,
}

/// A parsed statement, ready for execution.
///
/// Expression trees are owned by the statement that holds them.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable {
        table: String,
        columns: Vec<Column>,
    },
    CreateIndex {
        table: String,
        kind: IndexKind,
        columns: Vec<String>,
    },
    Insert {
        table: String,
        /// One slot per table column, already aligned with the schema.
        values: Vec<Option<Value>>,
    },
    Select {
        table: String,
        items: Vec<SelectItem>,
        join: Option<JoinClause>,
        filter: Option<Expression>,
    },
    Update {
        table: String,
        /// Assignments in written order; later ones see earlier rebindings.
        assignments: Vec<(String, Expression)>,
        filter: Option<Expression>,
    },
    Delete {
        table: String,
        filter: Option<Expression>,
    },
}
