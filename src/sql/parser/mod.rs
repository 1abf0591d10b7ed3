use miette::{Result, miette};

pub(crate) mod ast;
pub(crate) mod expression;

pub use ast::{JoinClause, SelectItem, Statement};
pub use expression::ExpressionParser;

use crate::db::column::{Column, ColumnAttribute};
use crate::db::database::Database;
use crate::db::index::IndexKind;
use crate::sql::expression::Expression;
use crate::sql::keyword::{Keyword, is_identifier, is_reserved_word};
use crate::sql::lexer::{Lexer, Op, SpannedToken, Token};
use crate::types::{DataType, Value};

/// Full-statement parser: query text → [`Statement`].
///
/// Keywords are matched case-insensitively; a trailing `;` is accepted. The
/// parser holds a shared reference to the database so INSERT can align its
/// values with the target table's schema (defaults, autoincrement).
pub struct QueryParser<'a> {
    input: &'a str,
    tokens: Vec<SpannedToken>,
    position: usize,
    db: &'a Database,
}

impl<'a> QueryParser<'a> {
    /// Lexes the query up front, rejecting unbalanced `()`/`{}` first.
    pub fn new(query: &'a str, db: &'a Database) -> Result<Self> {
        if !delimiters_balanced(query) {
            return Err(miette!("Unbalanced parentheses or braces in query."));
        }

        let mut tokens = Lexer::tokenize(query)?;
        if tokens.last().map(|t| &t.token) == Some(&Token::SemiColon) {
            tokens.pop();
        }

        Ok(Self {
            input: query,
            tokens,
            position: 0,
            db,
        })
    }

    pub fn parse(&mut self) -> Result<Statement> {
        match self.peek_keyword() {
            Some(Keyword::Create) => self.parse_create(),
            Some(Keyword::Insert) => self.parse_insert(),
            Some(Keyword::Select) => self.parse_select(),
            Some(Keyword::Update) => self.parse_update(),
            Some(Keyword::Delete) => self.parse_delete(),
            _ => Err(miette!("Unknown command: {}", self.describe_next())),
        }
    }

    // ---- token helpers ----

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|spanned| &spanned.token)
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn peek_keyword(&self) -> Option<Keyword> {
        match self.peek() {
            Some(Token::Identifier(word)) => Keyword::parse(word),
            _ => None,
        }
    }

    /// Consumes the next token if it is the given keyword.
    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.peek_keyword() == Some(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_token(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_token(&mut self, token: &Token, message: &str) -> Result<()> {
        if self.eat_token(token) {
            Ok(())
        } else {
            Err(miette!("{}", message))
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword, message: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(miette!("{}", message))
        }
    }

    fn expect_identifier(&mut self, message: &str) -> Result<String> {
        match self.peek() {
            Some(Token::Identifier(word)) => {
                let word = word.clone();
                self.advance();
                Ok(word)
            }
            _ => Err(miette!("{}", message)),
        }
    }

    /// Everything consumed; anything left over is a parse error.
    fn expect_end(&self) -> Result<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(miette!("Unexpected token in expression."))
        }
    }

    fn describe_next(&self) -> String {
        match self.peek() {
            Some(Token::Identifier(word)) => word.clone(),
            Some(Token::Operator(op)) => op.symbol().to_string(),
            Some(token) => format!("{token:?}"),
            None => "end of input".to_string(),
        }
    }

    fn validate_table_name(&self, name: &str) -> Result<()> {
        if !is_identifier(name) || is_reserved_word(name) {
            return Err(miette!("Invalid table name: {}", name));
        }
        Ok(())
    }

    fn validate_column_name(&self, name: &str) -> Result<()> {
        if !is_identifier(name) || is_reserved_word(name) {
            return Err(miette!("Invalid column name: {}", name));
        }
        Ok(())
    }

    /// Parses an expression at the current position and returns it together
    /// with its source text (the default SELECT alias).
    fn parse_expression(&mut self) -> Result<(Expression, String)> {
        let start_index = self.position;
        let mut parser = ExpressionParser::new(&self.tokens, self.position);
        let expr = parser.parse()?;
        self.position = parser.position();

        let text = if self.position > start_index {
            let start = self.tokens[start_index].start;
            let end = self.tokens[self.position - 1].end;
            self.input[start..end].trim().to_string()
        } else {
            String::new()
        };
        Ok((expr, text))
    }

    // ---- statements ----

    fn parse_create(&mut self) -> Result<Statement> {
        self.advance();
        match self.peek_keyword() {
            Some(Keyword::Table) => {
                self.advance();
                self.parse_create_table()
            }
            Some(Keyword::Ordered) => {
                self.advance();
                self.parse_create_index(IndexKind::Ordered)
            }
            Some(Keyword::Unordered) => {
                self.advance();
                self.parse_create_index(IndexKind::Unordered)
            }
            _ => Err(miette!(
                "Unknown CREATE subcommand: {}",
                self.describe_next()
            )),
        }
    }

    fn parse_create_table(&mut self) -> Result<Statement> {
        if self.peek() == Some(&Token::LeftParen) {
            return Err(miette!("Table name cannot be empty."));
        }
        let table = self.expect_identifier("Expected table name after 'create table'.")?;
        self.validate_table_name(&table)?;

        self.expect_token(&Token::LeftParen, "Expected '(' after table name.")?;

        let mut columns = Vec::new();
        if !self.eat_token(&Token::RightParen) {
            loop {
                columns.push(self.parse_column_definition()?);
                if self.eat_token(&Token::Comma) {
                    continue;
                }
                self.expect_token(
                    &Token::RightParen,
                    "Expected ',' or ')' in column definitions.",
                )?;
                break;
            }
        }

        self.expect_end()?;
        Ok(Statement::CreateTable { table, columns })
    }

    fn parse_column_definition(&mut self) -> Result<Column> {
        let mut attributes = Vec::new();
        if self.eat_token(&Token::LeftBrace) {
            loop {
                let word = self.expect_identifier("Expected column attribute.")?;
                let attribute = match Keyword::parse(&word) {
                    Some(Keyword::Key) => ColumnAttribute::Key,
                    Some(Keyword::Unique) => ColumnAttribute::Unique,
                    Some(Keyword::Autoincrement) => ColumnAttribute::AutoIncrement,
                    _ => return Err(miette!("Unknown column attribute: {}", word)),
                };
                attributes.push(attribute);
                if self.eat_token(&Token::Comma) {
                    continue;
                }
                self.expect_token(&Token::RightBrace, "Expected '}' for column attributes.")?;
                break;
            }
        }

        let name = self.expect_identifier("Column name is empty.")?;
        self.validate_column_name(&name)?;

        self.expect_token(&Token::Colon, "Expected ':' in column definition.")?;
        let data_type = self.parse_type_specifier()?;

        let default_value = if self.eat_token(&Token::Operator(Op::Equal)) {
            let value = self.parse_literal("Invalid default value.")?;
            Some(value)
        } else {
            None
        };

        Column::new(name, data_type, attributes, default_value)
    }

    fn parse_type_specifier(&mut self) -> Result<DataType> {
        let word = self.expect_identifier("Expected column type.")?;
        match Keyword::parse(&word) {
            Some(Keyword::Int32) => Ok(DataType::Int32),
            Some(Keyword::Bool) => Ok(DataType::Bool),
            Some(Keyword::String) => Ok(DataType::String(self.parse_type_size()?)),
            Some(Keyword::Bytes) => Ok(DataType::Bytes(self.parse_type_size()?)),
            _ => Err(miette!("Unknown column type: {}", word)),
        }
    }

    fn parse_type_size(&mut self) -> Result<usize> {
        self.expect_token(&Token::LeftBracket, "Expected '[' in type specifier.")?;
        let size = match self.peek() {
            Some(Token::IntLiteral(size)) if *size >= 1 => *size as usize,
            _ => return Err(miette!("Type size must be at least 1.")),
        };
        self.advance();
        self.expect_token(&Token::RightBracket, "Expected ']' in type specifier.")?;
        Ok(size)
    }

    /// Consumes a literal token as a [`Value`].
    fn parse_literal(&mut self, message: &str) -> Result<Value> {
        let value = match self.peek() {
            Some(Token::IntLiteral(value)) => Value::Int(*value),
            Some(Token::BoolLiteral(value)) => Value::Bool(*value),
            Some(Token::StringLiteral(value)) => Value::Str(value.clone()),
            Some(Token::BytesLiteral(value)) => Value::Bytes(value.clone()),
            _ => return Err(miette!("{}", message)),
        };
        self.advance();
        Ok(value)
    }

    fn parse_create_index(&mut self, kind: IndexKind) -> Result<Statement> {
        self.expect_keyword(Keyword::Index, "Expected 'index' after index type.")?;
        self.expect_keyword(
            Keyword::On,
            "Expected 'on' after 'create <index_type> index'.",
        )?;

        let table = self.expect_identifier("Expected table name in 'create index'.")?;
        self.validate_table_name(&table)?;

        self.expect_keyword(
            Keyword::By,
            "Expected 'by' after table name in 'create index'.",
        )?;

        let mut columns = Vec::new();
        loop {
            let column = self.expect_identifier("Expected column name in 'create index'.")?;
            self.validate_column_name(&column)?;
            columns.push(column);
            if !self.eat_token(&Token::Comma) {
                break;
            }
        }
        self.expect_end()?;

        // The schema is consulted at parse time so an unknown table or column
        // fails before the executor runs.
        let existing = self.db.get_table(&table)?;
        for column in &columns {
            if !existing.has_column(column) {
                return Err(miette!("Column not found: {}", column));
            }
        }

        Ok(Statement::CreateIndex {
            table,
            kind,
            columns,
        })
    }

    fn parse_insert(&mut self) -> Result<Statement> {
        self.advance();
        self.expect_token(&Token::LeftParen, "Invalid INSERT syntax.")?;

        // Collect the token region up to the matching ')'.
        let region_start = self.position;
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek() {
                Some(Token::LeftParen) => depth += 1,
                Some(Token::RightParen) => depth -= 1,
                Some(_) => {}
                None => return Err(miette!("Invalid INSERT syntax.")),
            }
            self.advance();
        }
        let region_end = self.position - 1;

        self.expect_keyword(Keyword::To, "Invalid INSERT syntax.")?;
        let table = self.expect_identifier("Expected table name after 'to'.")?;
        self.validate_table_name(&table)?;
        self.expect_end()?;

        let region = &self.tokens[region_start..region_end];
        let target = self.db.get_table(&table)?;
        let named = region
            .iter()
            .any(|spanned| spanned.token == Token::Operator(Op::Equal));
        let values = if named {
            named_insert_values(self.input, region, target.columns())?
        } else {
            positional_insert_values(self.input, region, target.columns())?
        };

        Ok(Statement::Insert { table, values })
    }

    fn parse_select(&mut self) -> Result<Statement> {
        self.advance();

        let mut items = Vec::new();
        loop {
            let (expression, text) = self.parse_expression()?;
            let alias = if self.eat_keyword(Keyword::As) {
                self.expect_identifier("Expected identifier after AS.")?
            } else {
                text
            };
            items.push(SelectItem { expression, alias });

            if self.eat_token(&Token::Comma) {
                continue;
            }
            match self.peek_keyword() {
                Some(Keyword::From) => break,
                _ if self.at_end() => return Err(miette!("Invalid SELECT syntax.")),
                _ => return Err(miette!("Unexpected token in expression.")),
            }
        }
        self.advance(); // from

        let table = self.expect_identifier("Expected table name after FROM.")?;
        self.validate_table_name(&table)?;

        let join = if self.eat_keyword(Keyword::Join) {
            let join_table = self.expect_identifier("Expected table name after JOIN.")?;
            self.validate_table_name(&join_table)?;
            self.expect_keyword(Keyword::On, "Expected 'on' after join table.")?;
            let (on, _) = self.parse_expression()?;
            Some(JoinClause {
                table: join_table,
                on,
            })
        } else {
            None
        };

        let filter = if self.eat_keyword(Keyword::Where) {
            Some(self.parse_expression()?.0)
        } else {
            None
        };
        self.expect_end()?;

        Ok(Statement::Select {
            table,
            items,
            join,
            filter,
        })
    }

    fn parse_update(&mut self) -> Result<Statement> {
        self.advance();
        let table = self.expect_identifier("Expected table name after UPDATE.")?;
        self.validate_table_name(&table)?;
        self.expect_keyword(Keyword::Set, "Expected 'set' after table name in UPDATE.")?;

        let mut assignments: Vec<(String, Expression)> = Vec::new();
        loop {
            if assignments.is_empty() && (self.peek_keyword() == Some(Keyword::Where) || self.at_end())
            {
                return Err(miette!("No assignment in UPDATE"));
            }
            let column = self.expect_identifier("Invalid assignment in UPDATE.")?;
            self.validate_column_name(&column)?;
            self.expect_token(&Token::Operator(Op::Equal), "Invalid assignment in UPDATE.")?;
            let (expression, _) = self.parse_expression()?;
            assignments.push((column, expression));

            if !self.eat_token(&Token::Comma) {
                break;
            }
        }

        let filter = if self.eat_keyword(Keyword::Where) {
            Some(self.parse_expression()?.0)
        } else {
            None
        };
        self.expect_end()?;

        Ok(Statement::Update {
            table,
            assignments,
            filter,
        })
    }

    fn parse_delete(&mut self) -> Result<Statement> {
        self.advance();
        // `delete from t` and `delete t` are both accepted.
        self.eat_keyword(Keyword::From);

        let table = self.expect_identifier("Expected table name after DELETE.")?;
        self.validate_table_name(&table)?;

        let filter = if self.eat_keyword(Keyword::Where) {
            Some(self.parse_expression()?.0)
        } else {
            None
        };
        self.expect_end()?;

        Ok(Statement::Delete { table, filter })
    }
}

/// Raw-character balance pre-check for `()` and `{}`.
fn delimiters_balanced(query: &str) -> bool {
    let mut stack = Vec::new();
    for ch in query.chars() {
        match ch {
            '(' | '{' => stack.push(ch),
            ')' => {
                if stack.pop() != Some('(') {
                    return false;
                }
            }
            '}' => {
                if stack.pop() != Some('{') {
                    return false;
                }
            }
            _ => {}
        }
    }
    stack.is_empty()
}

/// Splits a token region into top-level comma-separated groups.
fn split_on_commas(region: &[SpannedToken]) -> Vec<&[SpannedToken]> {
    let mut groups = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    for (i, spanned) in region.iter().enumerate() {
        match spanned.token {
            Token::LeftParen | Token::LeftBrace => depth += 1,
            Token::RightParen | Token::RightBrace => depth = depth.saturating_sub(1),
            Token::Comma if depth == 0 => {
                groups.push(&region[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    groups.push(&region[start..]);
    groups
}

fn slot_text<'a>(input: &'a str, slot: &[SpannedToken]) -> &'a str {
    match (slot.first(), slot.last()) {
        (Some(first), Some(last)) => input[first.start..last.end].trim(),
        _ => "",
    }
}

fn literal_token_value(token: &Token) -> Option<Value> {
    match token {
        Token::IntLiteral(value) => Some(Value::Int(*value)),
        Token::BoolLiteral(value) => Some(Value::Bool(*value)),
        Token::StringLiteral(value) => Some(Value::Str(value.clone())),
        Token::BytesLiteral(value) => Some(Value::Bytes(value.clone())),
        _ => None,
    }
}

/// Rejects string/bytes literals wider than the column's declared size.
fn check_literal_size(value: &Value, column: &Column) -> Result<()> {
    match (value, column.data_type()) {
        (Value::Str(s), DataType::String(size)) if s.len() > *size => {
            Err(miette!("String value exceeds defined size of {}", size))
        }
        (Value::Bytes(b), DataType::Bytes(size)) if b.len() > *size => {
            Err(miette!("Bytes value exceeds defined size of {}", size))
        }
        _ => Ok(()),
    }
}

/// Completion shared by both insert forms: autoincrement slots stay NULL for
/// the table to fill, defaulted slots take the default, anything else is a
/// missing value.
fn fill_remaining(values: &mut [Option<Value>], columns: &[Column], from: usize) -> Result<()> {
    for (slot, column) in values.iter_mut().zip(columns).skip(from) {
        if slot.is_some() || column.has_attribute(ColumnAttribute::AutoIncrement) {
            continue;
        }
        match column.default_value() {
            Some(default) => *slot = Some(default.clone()),
            None => return Err(miette!("Missing value for column: {}", column.name())),
        }
    }
    Ok(())
}

fn positional_insert_values(
    input: &str,
    region: &[SpannedToken],
    columns: &[Column],
) -> Result<Vec<Option<Value>>> {
    let mut values: Vec<Option<Value>> = vec![None; columns.len()];
    if region.is_empty() {
        fill_remaining(&mut values, columns, 0)?;
        return Ok(values);
    }

    let slots = split_on_commas(region);
    if slots.len() > columns.len() {
        return Err(miette!("Too many values for table columns"));
    }

    for (index, slot) in slots.iter().enumerate() {
        // An explicitly empty slot stays NULL; the table substitutes the
        // autoincrement id or the default.
        if slot.is_empty() {
            continue;
        }
        let [spanned] = slot else {
            return Err(miette!(
                "Invalid value in INSERT statement: {}",
                slot_text(input, slot)
            ));
        };
        let value = literal_token_value(&spanned.token).ok_or_else(|| {
            miette!(
                "Invalid value in INSERT statement: {}",
                slot_text(input, slot)
            )
        })?;
        check_literal_size(&value, &columns[index])?;
        values[index] = Some(value);
    }

    fill_remaining(&mut values, columns, slots.len())?;
    Ok(values)
}

fn named_insert_values(
    input: &str,
    region: &[SpannedToken],
    columns: &[Column],
) -> Result<Vec<Option<Value>>> {
    let mut values: Vec<Option<Value>> = vec![None; columns.len()];
    let mut seen: Vec<&str> = Vec::new();

    for slot in split_on_commas(region) {
        let [name, equals, literal] = slot else {
            return Err(miette!(
                "Invalid value in INSERT statement: {}",
                slot_text(input, slot)
            ));
        };
        let Token::Identifier(column_name) = &name.token else {
            return Err(miette!("Expected column name before '=' in INSERT."));
        };
        if equals.token != Token::Operator(Op::Equal) {
            return Err(miette!("Expected '=' after column name"));
        }

        if seen.contains(&column_name.as_str()) {
            return Err(miette!("Duplicate column name: {}", column_name));
        }
        seen.push(column_name);

        let position = columns
            .iter()
            .position(|column| column.name() == column_name.as_str())
            .ok_or_else(|| miette!("Column not found: {}", column_name))?;

        let value = literal_token_value(&literal.token).ok_or_else(|| {
            miette!(
                "Invalid value in INSERT statement: {}",
                slot_text(input, slot)
            )
        })?;
        check_literal_size(&value, &columns[position])?;
        values[position] = Some(value);
    }

    fill_remaining(&mut values, columns, 0)?;
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::expression::BinaryOp;

    fn db_with_users() -> Database {
        let mut db = Database::new();
        let result = db.execute(
            "create table users ({key, autoincrement} id: int32, name: string[8], age: int32 = 0)",
        );
        assert!(result.is_ok(), "{:?}", result.error_message());
        db
    }

    fn parse(db: &Database, query: &str) -> Result<Statement> {
        QueryParser::new(query, db)?.parse()
    }

    #[test]
    fn test_balance_precheck() {
        let db = Database::new();
        let err = parse(&db, "select a from t where (a > 2").unwrap_err();
        assert!(
            err.to_string()
                .contains("Unbalanced parentheses or braces")
        );
        assert!(parse(&db, "create table t ({key id: int32)").is_err());
    }

    #[test]
    fn test_unknown_command() {
        let db = Database::new();
        let err = parse(&db, "explain select 1").unwrap_err();
        assert!(err.to_string().contains("Unknown command: explain"));
    }

    #[test]
    fn test_create_table_statement() {
        let db = Database::new();
        let statement = parse(
            &db,
            "create table t ({key, autoincrement} id : int32, name: string[32], ok: bool = true);",
        )
        .unwrap();

        let Statement::CreateTable { table, columns } = statement else {
            panic!("expected CreateTable");
        };
        assert_eq!(table, "t");
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].name(), "id");
        assert!(columns[0].has_attribute(ColumnAttribute::Key));
        assert!(columns[0].has_attribute(ColumnAttribute::AutoIncrement));
        assert_eq!(*columns[1].data_type(), DataType::String(32));
        assert_eq!(columns[2].default_value(), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_create_table_rejects_reserved_names() {
        let db = Database::new();
        let err = parse(&db, "create table select (a: int32)").unwrap_err();
        assert!(err.to_string().contains("Invalid table name: select"));

        let err = parse(&db, "create table t (where: int32)").unwrap_err();
        assert!(err.to_string().contains("Invalid column name: where"));
    }

    #[test]
    fn test_create_table_missing_name() {
        let db = Database::new();
        let err = parse(&db, "create table (a: int32)").unwrap_err();
        assert!(err.to_string().contains("Table name cannot be empty."));
    }

    #[test]
    fn test_create_table_unknown_attribute_and_type() {
        let db = Database::new();
        let err = parse(&db, "create table t ({primary} a: int32)").unwrap_err();
        assert!(err.to_string().contains("Unknown column attribute: primary"));

        let err = parse(&db, "create table t (a: float)").unwrap_err();
        assert!(err.to_string().contains("Unknown column type: float"));

        let err = parse(&db, "create table t (a: string[0])").unwrap_err();
        assert!(err.to_string().contains("Type size must be at least 1."));
    }

    #[test]
    fn test_insert_positional() {
        let db = db_with_users();
        let statement = parse(&db, "insert (, \"ada\") to users").unwrap();
        let Statement::Insert { table, values } = statement else {
            panic!("expected Insert");
        };
        assert_eq!(table, "users");
        // id stays NULL for the autoincrement fill, age takes its default.
        assert_eq!(
            values,
            vec![None, Some(Value::Str("ada".into())), Some(Value::Int(0))]
        );
    }

    #[test]
    fn test_insert_named() {
        let db = db_with_users();
        let statement = parse(&db, "insert (name = \"bob\", age = 41) to users").unwrap();
        let Statement::Insert { values, .. } = statement else {
            panic!("expected Insert");
        };
        assert_eq!(
            values,
            vec![None, Some(Value::Str("bob".into())), Some(Value::Int(41))]
        );
    }

    #[test]
    fn test_insert_named_errors() {
        let db = db_with_users();
        let err = parse(&db, "insert (name = \"a\", name = \"b\") to users").unwrap_err();
        assert!(err.to_string().contains("Duplicate column name: name"));

        let err = parse(&db, "insert (ghost = 1) to users").unwrap_err();
        assert!(err.to_string().contains("Column not found: ghost"));
    }

    #[test]
    fn test_insert_too_many_values() {
        let db = db_with_users();
        let err = parse(&db, "insert (1, \"a\", 2, 3) to users").unwrap_err();
        assert!(err.to_string().contains("Too many values for table columns"));
    }

    #[test]
    fn test_insert_missing_value() {
        let mut db = Database::new();
        db.execute("create table t (a: int32, b: int32)");
        let err = parse(&db, "insert (1) to t").unwrap_err();
        assert!(err.to_string().contains("Missing value for column: b"));
    }

    #[test]
    fn test_insert_size_check_at_parse_time() {
        let db = db_with_users();
        let err = parse(&db, "insert (, \"much too long\") to users").unwrap_err();
        assert!(err.to_string().contains("String value exceeds defined size of 8"));
    }

    #[test]
    fn test_insert_into_unknown_table() {
        let db = Database::new();
        let err = parse(&db, "insert (1) to ghost").unwrap_err();
        assert!(err.to_string().contains("Table not found: ghost"));
    }

    #[test]
    fn test_select_statement() {
        let db = db_with_users();
        let statement =
            parse(&db, "select id, name as who, age + 1 from users where age > 18").unwrap();
        let Statement::Select {
            table,
            items,
            join,
            filter,
        } = statement
        else {
            panic!("expected Select");
        };
        assert_eq!(table, "users");
        assert!(join.is_none());
        assert!(filter.is_some());

        assert_eq!(items[0].alias, "id");
        assert_eq!(items[1].alias, "who");
        // Without `as` the alias is the written form of the expression.
        assert_eq!(items[2].alias, "age + 1");
        assert!(matches!(
            items[2].expression,
            Expression::Binary {
                op: BinaryOp::Add,
                ..
            }
        ));
    }

    #[test]
    fn test_select_with_join() {
        let mut db = db_with_users();
        db.execute("create table posts ({key} id: int32, uid: int32)");
        let statement = parse(
            &db,
            "select users.name, posts.id from users join posts on users.id = posts.uid where true",
        )
        .unwrap();
        let Statement::Select { join, .. } = statement else {
            panic!("expected Select");
        };
        let join = join.expect("join clause");
        assert_eq!(join.table, "posts");
        assert!(matches!(join.on, Expression::Binary { .. }));
    }

    #[test]
    fn test_select_adjacent_expressions_fail() {
        let db = db_with_users();
        let err = parse(&db, "select id name from users").unwrap_err();
        assert!(err.to_string().contains("Unexpected token in expression."));
    }

    #[test]
    fn test_update_statement() {
        let db = db_with_users();
        let statement =
            parse(&db, "update users set age = age + 1, name = \"x\" where id = 1").unwrap();
        let Statement::Update {
            table,
            assignments,
            filter,
        } = statement
        else {
            panic!("expected Update");
        };
        assert_eq!(table, "users");
        assert!(filter.is_some());
        // Written order is preserved.
        assert_eq!(assignments[0].0, "age");
        assert_eq!(assignments[1].0, "name");
    }

    #[test]
    fn test_update_without_assignments() {
        let db = db_with_users();
        let err = parse(&db, "update users set where id = 1").unwrap_err();
        assert!(err.to_string().contains("No assignment in UPDATE"));
    }

    #[test]
    fn test_delete_statement() {
        let db = db_with_users();
        let statement = parse(&db, "delete users where id = 1").unwrap();
        assert!(matches!(statement, Statement::Delete { filter: Some(_), .. }));

        // Optional `from`, optional `where`.
        let statement = parse(&db, "delete from users").unwrap();
        let Statement::Delete { table, filter } = statement else {
            panic!("expected Delete");
        };
        assert_eq!(table, "users");
        assert!(filter.is_none());
    }

    #[test]
    fn test_create_index_statement() {
        let db = db_with_users();
        let statement = parse(&db, "create ordered index on users by name").unwrap();
        let Statement::CreateIndex {
            table,
            kind,
            columns,
        } = statement
        else {
            panic!("expected CreateIndex");
        };
        assert_eq!(table, "users");
        assert_eq!(kind, IndexKind::Ordered);
        assert_eq!(columns, vec!["name"]);

        let statement = parse(&db, "create unordered index on users by name, age").unwrap();
        assert!(matches!(
            statement,
            Statement::CreateIndex {
                kind: IndexKind::Unordered,
                ..
            }
        ));
    }

    #[test]
    fn test_create_index_unknown_column() {
        let db = db_with_users();
        let err = parse(&db, "create ordered index on users by ghost").unwrap_err();
        assert!(err.to_string().contains("Column not found: ghost"));

        let err = parse(&db, "create ordered index on ghost by name").unwrap_err();
        assert!(err.to_string().contains("Table not found: ghost"));
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let db = db_with_users();
        assert!(parse(&db, "SELECT id FROM users WHERE id > 0").is_ok());
        assert!(parse(&db, "Delete From users").is_ok());
    }

    #[test]
    fn test_trailing_semicolon_is_accepted() {
        let db = db_with_users();
        assert!(parse(&db, "select id from users;").is_ok());
    }
}
