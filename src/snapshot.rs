use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::db::column::{Column, ColumnAttribute};
use crate::db::database::Database;
use crate::db::row::RowId;
use crate::db::table::Table;
use crate::error::DatabaseError;
use crate::sql::lexer::{Lexer, Token};
use crate::types::{DataType, Value};

/// The portable snapshot document: `{"tables": [...]}`.
///
/// Column types reuse [`DataType`]'s rendering, defaults are stored as their
/// canonical textual rendering, row scalars are native JSON except Bytes
/// (`"0x"` + upper-hex). Indices are not part of a snapshot.
#[derive(Serialize, Deserialize)]
struct SnapshotDoc {
    tables: Vec<TableDoc>,
}

#[derive(Serialize, Deserialize)]
struct TableDoc {
    name: String,
    columns: Vec<ColumnDoc>,
    rows: Vec<RowDoc>,
}

#[derive(Serialize, Deserialize)]
struct ColumnDoc {
    name: String,
    #[serde(rename = "type")]
    data_type: String,
    attributes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct RowDoc {
    id: RowId,
    values: Vec<serde_json::Value>,
}

pub(crate) fn save(db: &Database, path: &Path) -> Result<(), DatabaseError> {
    let doc = SnapshotDoc {
        tables: db.tables().values().map(encode_table).collect(),
    };
    let text = serde_json::to_string_pretty(&doc)
        .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
    fs::write(path, text)?;
    Ok(())
}

/// Reads a snapshot into a fresh catalog.
///
/// `next_row_id` of each table resumes past the highest id seen. Any
/// structural deviation is a fatal load error.
pub(crate) fn load(path: &Path) -> Result<BTreeMap<String, Table>, DatabaseError> {
    let text = fs::read_to_string(path)?;
    let doc: SnapshotDoc = serde_json::from_str(&text)
        .map_err(|e| DatabaseError::SerializationError(format!("Invalid database file format: {e}")))?;

    let mut tables = BTreeMap::new();
    for table_doc in doc.tables {
        let table = decode_table(table_doc)?;
        tables.insert(table.name().to_string(), table);
    }
    Ok(tables)
}

fn encode_table(table: &Table) -> TableDoc {
    TableDoc {
        name: table.name().to_string(),
        columns: table.columns().iter().map(encode_column).collect(),
        rows: table
            .rows()
            .iter()
            .map(|(id, row)| RowDoc {
                id: *id,
                values: row.values().iter().map(encode_value).collect(),
            })
            .collect(),
    }
}

fn encode_column(column: &Column) -> ColumnDoc {
    ColumnDoc {
        name: column.name().to_string(),
        data_type: column.data_type().to_string(),
        attributes: column
            .attributes()
            .iter()
            .map(|attribute| attribute_name(*attribute).to_string())
            .collect(),
        default: column.default_value().map(|value| value.to_string()),
    }
}

fn attribute_name(attribute: ColumnAttribute) -> &'static str {
    match attribute {
        ColumnAttribute::Key => "key",
        ColumnAttribute::Unique => "unique",
        ColumnAttribute::AutoIncrement => "autoincrement",
    }
}

fn encode_value(value: &Option<Value>) -> serde_json::Value {
    match value {
        None => serde_json::Value::Null,
        Some(Value::Int(i)) => (*i).into(),
        Some(Value::Bool(b)) => (*b).into(),
        Some(Value::Str(s)) => s.clone().into(),
        // Rendered form: "0x" + upper-hex.
        Some(value @ Value::Bytes(_)) => value.to_string().into(),
    }
}

fn decode_table(doc: TableDoc) -> Result<Table, DatabaseError> {
    let mut columns = Vec::with_capacity(doc.columns.len());
    for column_doc in doc.columns {
        columns.push(decode_column(column_doc)?);
    }

    let mut table = Table::new(doc.name, columns).map_err(serialization_error)?;
    for row_doc in doc.rows {
        if row_doc.values.len() != table.columns().len() {
            return Err(DatabaseError::SerializationError(format!(
                "Row {} has {} values for {} columns.",
                row_doc.id,
                row_doc.values.len(),
                table.columns().len()
            )));
        }

        let mut values = Vec::with_capacity(row_doc.values.len());
        for (json, column) in row_doc.values.iter().zip(table.columns()) {
            values.push(decode_value(json, column.data_type())?);
        }
        table
            .insert_row_with_id(values, row_doc.id)
            .map_err(serialization_error)?;
    }
    Ok(table)
}

fn decode_column(doc: ColumnDoc) -> Result<Column, DatabaseError> {
    let data_type: DataType = doc.data_type.parse().map_err(serialization_error)?;

    let mut attributes = Vec::with_capacity(doc.attributes.len());
    for attribute in &doc.attributes {
        attributes.push(match attribute.as_str() {
            "key" => ColumnAttribute::Key,
            "unique" => ColumnAttribute::Unique,
            "autoincrement" => ColumnAttribute::AutoIncrement,
            other => {
                return Err(DatabaseError::SerializationError(format!(
                    "Unknown column attribute: {other}"
                )));
            }
        });
    }

    let default_value = doc
        .default
        .as_deref()
        .map(parse_rendered_value)
        .transpose()?;

    Column::new(doc.name, data_type, attributes, default_value).map_err(serialization_error)
}

/// Parses a value back from its canonical textual rendering via the literal
/// rules, so escapes round-trip symmetrically.
fn parse_rendered_value(text: &str) -> Result<Value, DatabaseError> {
    let tokens = Lexer::tokenize(text).map_err(serialization_error)?;
    let [spanned] = tokens.as_slice() else {
        return Err(DatabaseError::SerializationError(format!(
            "Invalid default value: {text}"
        )));
    };
    match &spanned.token {
        Token::IntLiteral(value) => Ok(Value::Int(*value)),
        Token::BoolLiteral(value) => Ok(Value::Bool(*value)),
        Token::StringLiteral(value) => Ok(Value::Str(value.clone())),
        Token::BytesLiteral(value) => Ok(Value::Bytes(value.clone())),
        _ => Err(DatabaseError::SerializationError(format!(
            "Invalid default value: {text}"
        ))),
    }
}

fn decode_value(
    json: &serde_json::Value,
    data_type: &DataType,
) -> Result<Option<Value>, DatabaseError> {
    if json.is_null() {
        return Ok(None);
    }

    let value = match data_type {
        DataType::Int32 => json
            .as_i64()
            .and_then(|i| i32::try_from(i).ok())
            .map(Value::Int)
            .ok_or_else(|| invalid_scalar(json, "int32"))?,
        DataType::Bool => json
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| invalid_scalar(json, "bool"))?,
        DataType::String(_) => json
            .as_str()
            .map(|s| Value::Str(s.to_string()))
            .ok_or_else(|| invalid_scalar(json, "string"))?,
        DataType::Bytes(_) => {
            let text = json.as_str().ok_or_else(|| invalid_scalar(json, "bytes"))?;
            Value::Bytes(decode_hex(text)?)
        }
        DataType::Unknown => {
            return Err(DatabaseError::SerializationError(
                "Unknown column type in snapshot.".to_string(),
            ));
        }
    };
    Ok(Some(value))
}

fn decode_hex(text: &str) -> Result<Vec<u8>, DatabaseError> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .ok_or_else(|| DatabaseError::SerializationError("Invalid bytes format.".to_string()))?;
    if digits.len() % 2 != 0 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(DatabaseError::SerializationError(
            "Invalid hex length for bytes.".to_string(),
        ));
    }
    Ok(digits
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).expect("hex digits are ASCII");
            u8::from_str_radix(pair, 16).expect("checked hex digits")
        })
        .collect())
}

fn invalid_scalar(json: &serde_json::Value, expected: &str) -> DatabaseError {
    DatabaseError::SerializationError(format!("Expected {expected} value, got: {json}"))
}

fn serialization_error(report: miette::Report) -> DatabaseError {
    DatabaseError::SerializationError(report.to_string())
}
