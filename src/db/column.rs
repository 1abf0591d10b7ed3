use miette::{Result, miette};

use crate::types::{DataType, Value};

/// Constraints attachable to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnAttribute {
    /// Primary-key column: values must be unique across rows.
    Key,

    /// Values must be unique across rows (NULLs never collide).
    Unique,

    /// Omitted values are filled with the row's id. Int32 only.
    AutoIncrement,
}

/// Definition of a single table column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data_type: DataType,
    attributes: Vec<ColumnAttribute>,
    default_value: Option<Value>,
}

impl Column {
    /// Creates a column definition, validating its constraints.
    ///
    /// AutoIncrement requires Int32; a default must match the column type and
    /// fit the declared size.
    pub fn new(
        name: impl Into<String>,
        data_type: DataType,
        attributes: Vec<ColumnAttribute>,
        default_value: Option<Value>,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(miette!("Column name cannot be empty."));
        }

        if attributes.contains(&ColumnAttribute::AutoIncrement)
            && data_type != DataType::Int32
        {
            return Err(miette!(
                "AutoIncrement attribute can only be applied to int32 columns."
            ));
        }

        if let Some(default) = &default_value {
            if !default.matches_type(&data_type) {
                return Err(miette!("Default value type does not match column type."));
            }
            match (default, data_type) {
                (Value::Str(s), DataType::String(size)) if s.len() > size => {
                    return Err(miette!("Default string value exceeds defined size."));
                }
                (Value::Bytes(b), DataType::Bytes(size)) if b.len() > size => {
                    return Err(miette!("Default bytes value exceeds defined size."));
                }
                _ => {}
            }
        }

        Ok(Self {
            name,
            data_type,
            attributes,
            default_value,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn attributes(&self) -> &[ColumnAttribute] {
        &self.attributes
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    pub fn has_attribute(&self, attribute: ColumnAttribute) -> bool {
        self.attributes.contains(&attribute)
    }

    /// Whether values in this column must be pairwise distinct.
    pub fn is_unique(&self) -> bool {
        self.has_attribute(ColumnAttribute::Key) || self.has_attribute(ColumnAttribute::Unique)
    }
}
