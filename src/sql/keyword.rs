use std::str::FromStr;

use strum::EnumString;

/// Keywords of the query language.
///
/// Keywords are matched case-insensitively and contextually: the lexer emits
/// plain identifiers, and the statement parser decides where a keyword is
/// expected. `To`, `By` and `Set` only act as keywords in their clause
/// position and remain usable as column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Keyword {
    Create,
    Table,
    Insert,
    Update,
    Delete,
    Join,
    Where,

    // Type names
    Int32,
    String,
    Bytes,
    Bool,

    // Column attributes
    Key,
    Unique,
    Autoincrement,

    Index,
    Unordered,
    Ordered,
    On,

    Select,
    From,
    Values,
    As,

    // Contextual keywords, not reserved
    To,
    By,
    Set,
}

impl Keyword {
    /// Parses a word as a keyword, case-insensitively.
    pub fn parse(word: &str) -> Option<Keyword> {
        Keyword::from_str(word).ok()
    }

    /// Whether this keyword may not be used as a table or column name.
    pub fn is_reserved(self) -> bool {
        !matches!(self, Keyword::To | Keyword::By | Keyword::Set)
    }
}

/// Whether a word is reserved and therefore unusable as a name.
pub fn is_reserved_word(word: &str) -> bool {
    Keyword::parse(word).is_some_and(Keyword::is_reserved)
}

/// Whether a name matches the identifier shape `[A-Za-z][A-Za-z0-9_]*`.
///
/// Reserved-word rejection is a separate check ([`is_reserved_word`]).
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}
