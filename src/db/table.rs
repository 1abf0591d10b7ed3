use std::collections::BTreeMap;

use miette::{Result, miette};

use crate::db::column::{Column, ColumnAttribute};
use crate::db::index::{Index, IndexKind};
use crate::db::row::{Row, RowId};
use crate::sql::expression::Binding;
use crate::types::{DataType, Value};

/// A table: schema, rows keyed by [`RowId`], and secondary indices.
///
/// Row ids are assigned monotonically, so iterating the row map visits rows
/// in insertion order. Indices are kept in lockstep with the rows on every
/// insert, update and delete.
#[derive(Debug)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    rows: BTreeMap<RowId, Row>,
    indices: Vec<Index>,
    next_row_id: RowId,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(miette!("Table name cannot be empty."));
        }
        if columns.is_empty() {
            return Err(miette!("Column definitions cannot be empty."));
        }

        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name() == column.name()) {
                return Err(miette!("Duplicate column name: {}", column.name()));
            }
        }

        Ok(Self {
            name,
            columns,
            rows: BTreeMap::new(),
            indices: Vec::new(),
            next_row_id: 1,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column.name() == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|column| column.name() == name)
            .ok_or_else(|| miette!("Column not found: {}", name))
    }

    /// All rows, keyed by id in insertion order.
    pub fn rows(&self) -> &BTreeMap<RowId, Row> {
        &self.rows
    }

    pub fn indices(&self) -> &[Index] {
        &self.indices
    }

    /// The id the next inserted row will receive.
    pub fn next_row_id(&self) -> RowId {
        self.next_row_id
    }

    pub fn get_row(&self, id: RowId) -> Result<&Row> {
        self.rows
            .get(&id)
            .ok_or_else(|| miette!("Row ID not found: {}", id))
    }

    /// Inserts a row, left-aligning `values` with the columns.
    ///
    /// Slots that are NULL or past the supplied length are completed: an
    /// autoincrement column receives the new row id, a column with a default
    /// receives it, anything else stays NULL. Returns the new row's id.
    pub fn insert_row(&mut self, values: Vec<Option<Value>>) -> Result<RowId> {
        self.check_types_and_sizes(&values, false)?;
        self.check_unique(&values, None)?;

        let id = self.next_row_id;
        let complete = self.complete_values(values, id);
        self.check_indexed_slots(&complete)?;

        self.next_row_id += 1;
        self.attach_row(Row::new(id, complete));
        Ok(id)
    }

    /// Inserts a row under an explicit id (snapshot reload path).
    ///
    /// Bumps `next_row_id` past the supplied id; an id of 0 falls back to
    /// normal assignment.
    pub fn insert_row_with_id(&mut self, values: Vec<Option<Value>>, id: RowId) -> Result<RowId> {
        self.check_types_and_sizes(&values, false)?;
        self.check_unique(&values, Some(id))?;

        let id = if id != 0 {
            if id >= self.next_row_id {
                self.next_row_id = id + 1;
            }
            id
        } else {
            let id = self.next_row_id;
            self.next_row_id += 1;
            id
        };

        let complete = self.complete_values(values, id);
        self.check_indexed_slots(&complete)?;
        self.attach_row(Row::new(id, complete));
        Ok(id)
    }

    /// Removes a row; an absent id is an error. Indices stay coherent.
    pub fn delete_row(&mut self, id: RowId) -> Result<()> {
        let row = self
            .rows
            .remove(&id)
            .ok_or_else(|| miette!("Row ID not found: {}", id))?;

        let binding = self.row_binding(&row);
        for index in &mut self.indices {
            index.remove_row(id, &binding);
        }
        Ok(())
    }

    /// Replaces a row's values after validating them, keeping indices in sync.
    ///
    /// Uniqueness checks exclude the row itself.
    pub fn update_row(&mut self, id: RowId, values: Vec<Option<Value>>) -> Result<()> {
        self.check_types_and_sizes(&values, true)?;
        self.check_unique(&values, Some(id))?;
        self.check_indexed_slots(&values)?;

        let row = self
            .rows
            .get(&id)
            .ok_or_else(|| miette!("Row ID not found: {}", id))?;
        let old_binding = self.row_binding(row);

        let new_binding = binding_for(&self.columns, &values);
        for index in &mut self.indices {
            index.remove_row(id, &old_binding);
            index
                .add_row(id, &new_binding)
                .expect("indexed slots checked before mutation");
        }

        self.rows
            .get_mut(&id)
            .expect("row presence checked above")
            .set_values(values);
        Ok(())
    }

    /// Builds a new index over `columns`, populated from the current rows.
    ///
    /// A NULL in an indexed column of any existing row fails the build.
    pub fn add_index(&mut self, kind: IndexKind, columns: Vec<String>) -> Result<()> {
        for column in &columns {
            self.column_index(column)?;
        }

        let mut index = Index::new(kind, columns)?;
        for (row_id, row) in &self.rows {
            let mut projection = Binding::new();
            for column in index.columns() {
                let position = self.column_index(column)?;
                match row.value(position) {
                    Some(value) => {
                        projection.insert(column.clone(), value.clone());
                    }
                    None => {
                        return Err(miette!(
                            "Cannot index NULL value in column '{}'.",
                            column
                        ));
                    }
                }
            }
            index.add_row(*row_id, &projection)?;
        }

        self.indices.push(index);
        Ok(())
    }

    /// Non-NULL column values of a row, keyed by column name.
    pub fn row_binding(&self, row: &Row) -> Binding {
        binding_for(&self.columns, row.values())
    }

    fn attach_row(&mut self, row: Row) {
        let id = row.id();
        let binding = self.row_binding(&row);
        for index in &mut self.indices {
            index
                .add_row(id, &binding)
                .expect("indexed slots checked before insertion");
        }
        self.rows.insert(id, row);
    }

    fn complete_values(&self, values: Vec<Option<Value>>, row_id: RowId) -> Vec<Option<Value>> {
        let mut values = values;
        values.resize(self.columns.len(), None);

        for (slot, column) in values.iter_mut().zip(&self.columns) {
            if slot.is_some() {
                continue;
            }
            if column.has_attribute(ColumnAttribute::AutoIncrement) {
                *slot = Some(Value::Int(row_id as i32));
            } else if let Some(default) = column.default_value() {
                *slot = Some(default.clone());
            }
        }
        values
    }

    fn check_types_and_sizes(&self, values: &[Option<Value>], update: bool) -> Result<()> {
        if values.len() > self.columns.len() {
            return Err(if update {
                miette!("Too many values provided for the row update.")
            } else {
                miette!("Too many values provided for insertion.")
            });
        }

        for (value, column) in values.iter().zip(&self.columns) {
            let Some(value) = value else { continue };

            if !value.matches_type(column.data_type()) {
                return Err(miette!(
                    "Type mismatch for column \"{}\". Expected: {}, Got: {}",
                    column.name(),
                    column.data_type(),
                    value
                ));
            }

            match (value, column.data_type()) {
                (Value::Str(s), DataType::String(size)) if s.len() > *size => {
                    return Err(miette!(
                        "Value for column \"{}\" exceeds maximum length.",
                        column.name()
                    ));
                }
                (Value::Bytes(b), DataType::Bytes(size)) if b.len() > *size => {
                    return Err(miette!(
                        "Value for column \"{}\" exceeds maximum byte size.",
                        column.name()
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Checks key/unique columns for collisions with existing rows.
    ///
    /// NULLs never collide; `exclude` skips the row being rewritten.
    fn check_unique(&self, values: &[Option<Value>], exclude: Option<RowId>) -> Result<()> {
        for (position, column) in self.columns.iter().enumerate() {
            if !column.is_unique() {
                continue;
            }
            let Some(Some(new_value)) = values.get(position) else {
                continue;
            };

            for (row_id, row) in &self.rows {
                if exclude == Some(*row_id) {
                    continue;
                }
                if let Some(existing) = row.value(position)
                    && existing.is_same_type(new_value)
                    && existing == new_value
                {
                    return Err(miette!(
                        "Duplicate value for unique/key column \"{}\".",
                        column.name()
                    ));
                }
            }
        }
        Ok(())
    }

    /// A row entering the table may not carry NULL in any indexed column.
    fn check_indexed_slots(&self, values: &[Option<Value>]) -> Result<()> {
        for index in &self.indices {
            for column in index.columns() {
                let position = self.column_index(column)?;
                if values.get(position).map_or(true, Option::is_none) {
                    return Err(miette!(
                        "Cannot index NULL value in column '{}'.",
                        column
                    ));
                }
            }
        }
        Ok(())
    }
}

fn binding_for(columns: &[Column], values: &[Option<Value>]) -> Binding {
    columns
        .iter()
        .zip(values)
        .filter_map(|(column, value)| {
            value
                .as_ref()
                .map(|value| (column.name().to_string(), value.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_table() -> Table {
        let columns = vec![
            Column::new(
                "id",
                DataType::Int32,
                vec![ColumnAttribute::Key, ColumnAttribute::AutoIncrement],
                None,
            )
            .unwrap(),
            Column::new("name", DataType::String(8), vec![], None).unwrap(),
            Column::new(
                "active",
                DataType::Bool,
                vec![],
                Some(Value::Bool(true)),
            )
            .unwrap(),
        ];
        Table::new("users", columns).unwrap()
    }

    #[test]
    fn test_duplicate_column_names_rejected() {
        let columns = vec![
            Column::new("a", DataType::Int32, vec![], None).unwrap(),
            Column::new("a", DataType::Bool, vec![], None).unwrap(),
        ];
        assert!(Table::new("t", columns).is_err());
    }

    #[test]
    fn test_insert_fills_autoincrement_and_default() {
        let mut table = users_table();
        let id = table
            .insert_row(vec![None, Some(Value::Str("ada".into()))])
            .unwrap();
        assert_eq!(id, 1);

        let row = table.get_row(1).unwrap();
        assert_eq!(row.value(0), Some(&Value::Int(1)));
        assert_eq!(row.value(1), Some(&Value::Str("ada".into())));
        assert_eq!(row.value(2), Some(&Value::Bool(true)));

        // Every row is as wide as the schema.
        assert_eq!(row.values().len(), table.columns().len());
    }

    #[test]
    fn test_row_ids_are_monotone() {
        let mut table = users_table();
        for name in ["ada", "bob", "cyd"] {
            let id = table
                .insert_row(vec![None, Some(Value::Str(name.into()))])
                .unwrap();
            assert!(id < table.next_row_id());
        }
        let ids: Vec<RowId> = table.rows().keys().copied().collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_insert_type_mismatch() {
        let mut table = users_table();
        let result = table.insert_row(vec![None, Some(Value::Int(5))]);
        assert!(result.unwrap_err().to_string().contains("Type mismatch"));
    }

    #[test]
    fn test_string_length_boundary() {
        let mut table = users_table();
        // Exactly the declared size fits.
        assert!(
            table
                .insert_row(vec![None, Some(Value::Str("12345678".into()))])
                .is_ok()
        );
        // One past the declared size fails.
        let result = table.insert_row(vec![None, Some(Value::Str("123456789".into()))]);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("exceeds maximum length")
        );
    }

    #[test]
    fn test_unique_violation() {
        let columns = vec![
            Column::new("email", DataType::String(20), vec![ColumnAttribute::Unique], None)
                .unwrap(),
        ];
        let mut table = Table::new("u", columns).unwrap();
        table
            .insert_row(vec![Some(Value::Str("a@x".into()))])
            .unwrap();
        let result = table.insert_row(vec![Some(Value::Str("a@x".into()))]);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Duplicate value for unique/key column")
        );
    }

    #[test]
    fn test_two_nulls_do_not_collide() {
        let columns = vec![
            Column::new("email", DataType::String(20), vec![ColumnAttribute::Unique], None)
                .unwrap(),
            Column::new("n", DataType::Int32, vec![], None).unwrap(),
        ];
        let mut table = Table::new("u", columns).unwrap();
        table.insert_row(vec![None, Some(Value::Int(1))]).unwrap();
        assert!(table.insert_row(vec![None, Some(Value::Int(2))]).is_ok());
    }

    #[test]
    fn test_delete_row() {
        let mut table = users_table();
        table
            .insert_row(vec![None, Some(Value::Str("ada".into()))])
            .unwrap();
        assert!(table.delete_row(1).is_ok());
        assert!(table.delete_row(1).is_err());
        assert!(table.get_row(1).is_err());
    }

    #[test]
    fn test_insert_with_explicit_id_bumps_next() {
        let mut table = users_table();
        table
            .insert_row_with_id(
                vec![Some(Value::Int(7)), Some(Value::Str("ada".into())), None],
                7,
            )
            .unwrap();
        assert_eq!(table.next_row_id(), 8);

        let id = table
            .insert_row(vec![None, Some(Value::Str("bob".into()))])
            .unwrap();
        assert_eq!(id, 8);
    }

    #[test]
    fn test_add_index_rejects_null_column() {
        let mut table = users_table();
        // name stays NULL here.
        table.insert_row(vec![]).unwrap();
        let result = table.add_index(IndexKind::Ordered, vec!["name".into()]);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Cannot index NULL value in column 'name'.")
        );
    }

    #[test]
    fn test_add_index_unknown_column() {
        let mut table = users_table();
        let result = table.add_index(IndexKind::Unordered, vec!["ghost".into()]);
        assert!(result.unwrap_err().to_string().contains("Column not found"));
    }

    #[test]
    fn test_indices_follow_mutations() {
        let mut table = users_table();
        table
            .insert_row(vec![None, Some(Value::Str("ada".into()))])
            .unwrap();
        table.add_index(IndexKind::Unordered, vec!["name".into()]).unwrap();

        // Insert after index creation is reflected.
        table
            .insert_row(vec![None, Some(Value::Str("bob".into()))])
            .unwrap();
        let ada: Binding = [("name".to_string(), Value::Str("ada".into()))].into();
        let bob: Binding = [("name".to_string(), Value::Str("bob".into()))].into();
        assert_eq!(table.indices()[0].search(&ada), vec![1]);
        assert_eq!(table.indices()[0].search(&bob), vec![2]);

        // Update moves the entry.
        let mut values = table.get_row(1).unwrap().values().to_vec();
        values[1] = Some(Value::Str("ana".into()));
        table.update_row(1, values).unwrap();
        let ana: Binding = [("name".to_string(), Value::Str("ana".into()))].into();
        assert!(table.indices()[0].search(&ada).is_empty());
        assert_eq!(table.indices()[0].search(&ana), vec![1]);

        // Delete drops it.
        table.delete_row(1).unwrap();
        assert!(table.indices()[0].search(&ana).is_empty());
    }

    #[test]
    fn test_insert_null_into_indexed_column_fails() {
        let mut table = users_table();
        table
            .insert_row(vec![None, Some(Value::Str("ada".into()))])
            .unwrap();
        table.add_index(IndexKind::Unordered, vec!["name".into()]).unwrap();

        let result = table.insert_row(vec![]);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Cannot index NULL value")
        );
    }

    #[test]
    fn test_update_uniqueness_excludes_self() {
        let columns = vec![
            Column::new("id", DataType::Int32, vec![ColumnAttribute::Key], None).unwrap(),
            Column::new("n", DataType::Int32, vec![], None).unwrap(),
        ];
        let mut table = Table::new("t", columns).unwrap();
        table
            .insert_row(vec![Some(Value::Int(1)), Some(Value::Int(10))])
            .unwrap();

        // Rewriting the same key value on the same row is not a collision.
        let result = table.update_row(1, vec![Some(Value::Int(1)), Some(Value::Int(20))]);
        assert!(result.is_ok());
    }
}
