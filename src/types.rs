use std::cmp::Ordering;
use std::fmt::{self, Display, Write};
use std::str::FromStr;

use miette::{Result, miette};

/// Data types storable in a table column.
///
/// `String` and `Bytes` carry their declared maximum length. `Unknown` is the
/// static type of expressions whose result type cannot be determined without
/// evaluating them (e.g. a bare column reference).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// 32-bit signed integer.
    Int32,

    /// Boolean true/false value.
    Bool,

    /// UTF-8 text with a maximum length in bytes.
    String(usize),

    /// Raw octet sequence with a maximum length.
    Bytes(usize),

    /// Statically undetermined type.
    Unknown,
}

impl DataType {
    /// Whether a value of this type would fit a column declared as `other`.
    ///
    /// Compares the type tag only; declared sizes are checked separately
    /// against actual value lengths.
    pub fn same_kind(&self, other: &DataType) -> bool {
        matches!(
            (self, other),
            (DataType::Int32, DataType::Int32)
                | (DataType::Bool, DataType::Bool)
                | (DataType::String(_), DataType::String(_))
                | (DataType::Bytes(_), DataType::Bytes(_))
        )
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int32 => write!(f, "int32"),
            DataType::Bool => write!(f, "bool"),
            DataType::String(size) => write!(f, "string[{}]", size),
            DataType::Bytes(size) => write!(f, "bytes[{}]", size),
            DataType::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for DataType {
    type Err = miette::Report;

    /// Parses the canonical rendering produced by [`Display`]
    /// (`int32`, `bool`, `string[N]`, `bytes[N]`).
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "int32" => return Ok(DataType::Int32),
            "bool" => return Ok(DataType::Bool),
            _ => {}
        }

        let sized = |name: &str| -> Option<Result<usize>> {
            let rest = s.strip_prefix(name)?;
            let digits = rest.strip_prefix('[')?.strip_suffix(']')?;
            Some(
                digits
                    .parse::<usize>()
                    .map_err(|_| miette!("Invalid size in type: {}", s)),
            )
        };

        if let Some(size) = sized("string") {
            return Ok(DataType::String(size?));
        }
        if let Some(size) = sized("bytes") {
            return Ok(DataType::Bytes(size?));
        }

        Err(miette!("Unknown column type: {}", s))
    }
}

/// A scalar value held in a row slot or produced by expression evaluation.
///
/// NULL is represented as `Option<Value>::None` wherever absence is possible;
/// a `Value` itself always carries data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i32),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// The data type of this value.
    ///
    /// `String` and `Bytes` report their actual length as the size.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int(_) => DataType::Int32,
            Value::Bool(_) => DataType::Bool,
            Value::Str(s) => DataType::String(s.len()),
            Value::Bytes(b) => DataType::Bytes(b.len()),
        }
    }

    /// Whether both values carry the same type tag.
    pub fn is_same_type(&self, other: &Value) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Whether this value can be stored in a column of the given type.
    ///
    /// Type tag only; length limits are enforced by the table.
    pub fn matches_type(&self, data_type: &DataType) -> bool {
        self.data_type().same_kind(data_type)
    }

    pub fn as_int(&self) -> Result<i32> {
        match self {
            Value::Int(i) => Ok(*i),
            _ => Err(miette!("Value is not of type Int32.")),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => Err(miette!("Value is not of type Bool.")),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::Str(s) => Ok(s),
            _ => Err(miette!("Value is not of type String.")),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self {
            Value::Bytes(b) => Ok(b),
            _ => Err(miette!("Value is not of type Bytes.")),
        }
    }
}

/// Canonical textual rendering: decimal for ints, `true`/`false` for bools,
/// quoted (and escaped) strings, `0x` + upper-hex for bytes.
///
/// The rendering is parseable by the literal rules and injective per type, so
/// it doubles as the index key and the snapshot encoding for defaults.
impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => {
                f.write_char('"')?;
                for ch in s.chars() {
                    match ch {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        '\r' => f.write_str("\\r")?,
                        _ => f.write_char(ch)?,
                    }
                }
                f.write_char('"')
            }
            Value::Bytes(bytes) => {
                f.write_str("0x")?;
                for byte in bytes {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
        }
    }
}

/// Orders two values of the same type.
///
/// Int32 is natural, Bool orders `false < true`, String is lexicographic by
/// character code, Bytes is lexicographic by octet. Operands of different
/// types do not compare.
pub fn compare_values(left: &Value, right: &Value) -> Result<Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        (Value::Bytes(a), Value::Bytes(b)) => Ok(a.cmp(b)),
        _ => Err(miette!("Comparison requires operands of the same type.")),
    }
}
