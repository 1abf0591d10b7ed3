use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use miette::{Result, miette};

use crate::db::row::RowId;
use crate::sql::expression::Binding;
use crate::types::Value;

/// The two index flavours of the query language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Single-column, sorted by the value's canonical rendering.
    Ordered,

    /// One or more columns, hashed by a composite rendered key.
    Unordered,
}

/// A secondary lookup structure over a table.
///
/// Keys are canonical value renderings ([`Value`]'s `Display`), which are
/// injective per type, so same-typed values never collide. The owning table
/// keeps every index in lockstep with its rows on insert, update and delete.
#[derive(Debug)]
pub enum Index {
    Ordered {
        column: String,
        entries: BTreeMap<String, RowId>,
    },
    Unordered {
        columns: Vec<String>,
        entries: HashMap<String, Vec<RowId>>,
    },
}

impl Index {
    pub fn new(kind: IndexKind, columns: Vec<String>) -> Result<Self> {
        match kind {
            IndexKind::Ordered => {
                let [column] = <[String; 1]>::try_from(columns).map_err(|_| {
                    miette!("Ordered index can only be created on a single column.")
                })?;
                Ok(Index::Ordered {
                    column,
                    entries: BTreeMap::new(),
                })
            }
            IndexKind::Unordered => {
                if columns.is_empty() {
                    return Err(miette!("Unordered index requires at least one column."));
                }
                Ok(Index::Unordered {
                    columns,
                    entries: HashMap::new(),
                })
            }
        }
    }

    /// The indexed column names.
    pub fn columns(&self) -> &[String] {
        match self {
            Index::Ordered { column, .. } => std::slice::from_ref(column),
            Index::Unordered { columns, .. } => columns,
        }
    }

    /// Records a row. Every indexed column must be present in the binding.
    pub fn add_row(&mut self, row_id: RowId, row: &Binding) -> Result<()> {
        match self {
            Index::Ordered { column, entries } => {
                let value = row
                    .get(column)
                    .ok_or_else(|| miette!("Column '{}' not found in row for index.", column))?;
                entries.insert(value.to_string(), row_id);
                Ok(())
            }
            Index::Unordered { columns, entries } => {
                let key = composite_key(columns, row)?;
                entries.entry(key).or_default().push(row_id);
                Ok(())
            }
        }
    }

    /// Forgets a row. Missing entries are ignored.
    pub fn remove_row(&mut self, row_id: RowId, row: &Binding) {
        match self {
            Index::Ordered { column, entries } => {
                if let Some(value) = row.get(column) {
                    let key = value.to_string();
                    if entries.get(&key) == Some(&row_id) {
                        entries.remove(&key);
                    }
                }
            }
            Index::Unordered { columns, entries } => {
                let Ok(key) = composite_key(columns, row) else {
                    return;
                };
                if let Some(ids) = entries.get_mut(&key) {
                    ids.retain(|id| *id != row_id);
                    if ids.is_empty() {
                        entries.remove(&key);
                    }
                }
            }
        }
    }

    /// Exact-match lookup on an unordered index.
    ///
    /// Every indexed column must be present in the condition; a missing
    /// column yields no matches. Always empty on an ordered index.
    pub fn search(&self, condition: &Binding) -> Vec<RowId> {
        let Index::Unordered { columns, entries } = self else {
            return Vec::new();
        };
        let Ok(key) = composite_key(columns, condition) else {
            return Vec::new();
        };
        entries.get(&key).cloned().unwrap_or_default()
    }

    /// Range lookup on an ordered index over `column`.
    ///
    /// `None` bounds are open ends. Empty when this index is unordered or
    /// covers a different column.
    pub fn search_range(
        &self,
        column: &str,
        lower: Option<&Value>,
        lower_inclusive: bool,
        upper: Option<&Value>,
        upper_inclusive: bool,
    ) -> Vec<RowId> {
        let Index::Ordered {
            column: indexed,
            entries,
        } = self
        else {
            return Vec::new();
        };
        if indexed != column {
            return Vec::new();
        }

        // Crossed bounds select nothing.
        if let (Some(lower), Some(upper)) = (lower, upper) {
            let (lower, upper) = (lower.to_string(), upper.to_string());
            if lower > upper || (lower == upper && !(lower_inclusive && upper_inclusive)) {
                return Vec::new();
            }
        }

        let lower_bound = match lower {
            Some(value) if lower_inclusive => Bound::Included(value.to_string()),
            Some(value) => Bound::Excluded(value.to_string()),
            None => Bound::Unbounded,
        };
        let upper_bound = match upper {
            Some(value) if upper_inclusive => Bound::Included(value.to_string()),
            Some(value) => Bound::Excluded(value.to_string()),
            None => Bound::Unbounded,
        };

        entries
            .range((lower_bound, upper_bound))
            .map(|(_, row_id)| *row_id)
            .collect()
    }
}

/// Joins the rendered values of the indexed columns with `|` terminators.
fn composite_key(columns: &[String], row: &Binding) -> Result<String> {
    let mut key = String::new();
    for column in columns {
        let value = row
            .get(column)
            .ok_or_else(|| miette!("Column '{}' not found in row for index.", column))?;
        key.push_str(&value.to_string());
        key.push('|');
    }
    Ok(key)
}
