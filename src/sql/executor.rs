use miette::{Result, miette};

use crate::db::column::ColumnAttribute;
use crate::db::database::Database;
use crate::db::row::{Row, RowId};
use crate::db::table::Table;
use crate::sql::expression::{Binding, Expression};
use crate::sql::parser::{JoinClause, SelectItem, Statement};
use crate::sql::result::{QueryResult, ResultColumn};
use crate::types::{DataType, Value};

/// Executes a parsed [`Statement`] against the database.
///
/// Any failure becomes the returned result's error message; mutations
/// performed before the failing step persist (there is no rollback).
pub struct QueryExecutor;

impl QueryExecutor {
    pub fn execute(statement: Statement, db: &mut Database) -> QueryResult {
        match Self::run(statement, db) {
            Ok(result) => result,
            Err(report) => QueryResult::error(report.to_string()),
        }
    }

    fn run(statement: Statement, db: &mut Database) -> Result<QueryResult> {
        match statement {
            Statement::CreateTable { table, columns } => {
                db.create_table(&table, columns)?;
                Ok(QueryResult::ok())
            }
            Statement::CreateIndex {
                table,
                kind,
                columns,
            } => {
                db.get_table_mut(&table)?.add_index(kind, columns)?;
                Ok(QueryResult::ok())
            }
            Statement::Insert { table, values } => {
                let id = db.get_table_mut(&table)?.insert_row(values)?;
                Ok(QueryResult::with_data(
                    vec![ResultColumn::new("id", DataType::Int32)],
                    vec![vec![Some(Value::Int(id as i32))]],
                ))
            }
            Statement::Select {
                table,
                items,
                join,
                filter,
            } => match join {
                Some(join) => Self::select_join(db, &table, &items, &join, filter.as_ref()),
                None => Self::select_scan(db, &table, &items, filter.as_ref()),
            },
            Statement::Update {
                table,
                assignments,
                filter,
            } => Self::update(db, &table, &assignments, filter.as_ref()),
            Statement::Delete { table, filter } => Self::delete(db, &table, filter.as_ref()),
        }
    }

    fn select_scan(
        db: &Database,
        table: &str,
        items: &[SelectItem],
        filter: Option<&Expression>,
    ) -> Result<QueryResult> {
        let table = db.get_table(table)?;
        let mut data = Vec::new();

        for row in table.rows().values() {
            let binding = table.row_binding(row);
            if !filter_matches(filter, &binding)? {
                continue;
            }
            data.push(evaluate_items(items, &binding)?);
        }

        Ok(QueryResult::with_data(result_columns(items), data))
    }

    /// Nested-loop inner join: outer over the left table, inner over the
    /// right, both in row order. Select items and clauses see the combined
    /// binding under fully qualified names.
    fn select_join(
        db: &Database,
        table: &str,
        items: &[SelectItem],
        join: &JoinClause,
        filter: Option<&Expression>,
    ) -> Result<QueryResult> {
        let left = db.get_table(table)?;
        let right = db.get_table(&join.table)?;
        let mut data = Vec::new();

        for left_row in left.rows().values() {
            let left_binding = qualified_binding(left, left_row);
            for right_row in right.rows().values() {
                let mut binding = left_binding.clone();
                binding.extend(qualified_binding(right, right_row));

                let matched = match join.on.evaluate(&binding)? {
                    Value::Bool(b) => b,
                    _ => {
                        return Err(miette!(
                            "JOIN condition does not evaluate to a boolean."
                        ));
                    }
                };
                if !matched || !filter_matches(filter, &binding)? {
                    continue;
                }
                data.push(evaluate_items(items, &binding)?);
            }
        }

        Ok(QueryResult::with_data(result_columns(items), data))
    }

    fn update(
        db: &mut Database,
        name: &str,
        assignments: &[(String, Expression)],
        filter: Option<&Expression>,
    ) -> Result<QueryResult> {
        let table = db.get_table_mut(name)?;
        let ids: Vec<RowId> = table.rows().keys().copied().collect();
        let mut updated = 0;

        for id in ids {
            let row = table.get_row(id)?;
            let mut binding = table.row_binding(row);
            if !filter_matches(filter, &binding)? {
                continue;
            }
            let mut new_values = row.values().to_vec();

            for (column_name, expression) in assignments {
                let position = table.column_index(column_name)?;
                let column = &table.columns()[position];
                if column.has_attribute(ColumnAttribute::AutoIncrement) {
                    return Err(miette!(
                        "Cannot update autoincrement column '{}'.",
                        column_name
                    ));
                }

                let value = expression.evaluate(&binding)?;
                if !value.matches_type(column.data_type()) {
                    return Err(miette!(
                        "Type mismatch in SET assignment for column '{}'.",
                        column_name
                    ));
                }

                // Later assignments in the same row see this new value.
                binding.insert(column_name.clone(), value.clone());
                new_values[position] = Some(value);
            }

            table.update_row(id, new_values)?;
            updated += 1;
        }

        Ok(count_result(updated))
    }

    /// Deletes in two passes: collect matching ids, then remove them.
    fn delete(db: &mut Database, name: &str, filter: Option<&Expression>) -> Result<QueryResult> {
        let table = db.get_table_mut(name)?;

        let mut matching = Vec::new();
        for (id, row) in table.rows() {
            let binding = table.row_binding(row);
            if filter_matches(filter, &binding)? {
                matching.push(*id);
            }
        }

        for id in &matching {
            table.delete_row(*id)?;
        }
        Ok(count_result(matching.len() as i32))
    }
}

fn filter_matches(filter: Option<&Expression>, binding: &Binding) -> Result<bool> {
    match filter {
        None => Ok(true),
        Some(expression) => match expression.evaluate(binding)? {
            Value::Bool(b) => Ok(b),
            _ => Err(miette!("WHERE clause does not evaluate to a boolean.")),
        },
    }
}

fn result_columns(items: &[SelectItem]) -> Vec<ResultColumn> {
    items
        .iter()
        .map(|item| ResultColumn::new(item.alias.clone(), item.expression.static_type()))
        .collect()
}

fn evaluate_items(items: &[SelectItem], binding: &Binding) -> Result<Vec<Option<Value>>> {
    items
        .iter()
        .map(|item| item.expression.evaluate(binding).map(Some))
        .collect()
}

/// Binding keyed by `table.column` for joined evaluation.
fn qualified_binding(table: &Table, row: &Row) -> Binding {
    table
        .columns()
        .iter()
        .zip(row.values())
        .filter_map(|(column, value)| {
            value
                .as_ref()
                .map(|value| (format!("{}.{}", table.name(), column.name()), value.clone()))
        })
        .collect()
}

fn count_result(count: i32) -> QueryResult {
    QueryResult::with_data(
        vec![ResultColumn::new("count", DataType::Int32)],
        vec![vec![Some(Value::Int(count))]],
    )
}
