use miette::{Result, miette};

/// Operator symbols recognised by the expression grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    /// `=` — equality in expressions, assignment in `update … set`.
    Equal,
    /// `==` — always equality.
    DoubleEqual,
    NotEqual,
    Not,
    And,
    Or,
    Xor,
}

impl Op {
    pub fn symbol(self) -> &'static str {
        match self {
            Op::Plus => "+",
            Op::Minus => "-",
            Op::Star => "*",
            Op::Slash => "/",
            Op::Percent => "%",
            Op::Less => "<",
            Op::LessEqual => "<=",
            Op::Greater => ">",
            Op::GreaterEqual => ">=",
            Op::Equal => "=",
            Op::DoubleEqual => "==",
            Op::NotEqual => "!=",
            Op::Not => "!",
            Op::And => "&&",
            Op::Or => "||",
            Op::Xor => "^^",
        }
    }
}

/// A token of the query language.
///
/// Literal payloads are already decoded: escapes resolved, integers range
/// checked, hex pairs turned into octets.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifier, possibly qualified (`users.login` lexes as one token).
    Identifier(String),
    IntLiteral(i32),
    BoolLiteral(bool),
    StringLiteral(String),
    BytesLiteral(Vec<u8>),
    /// `|name|` length form; the payload is the identifier between the pipes.
    Length(String),
    Operator(Op),
    Comma,
    Colon,
    SemiColon,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
}

/// A token together with its byte span in the source query.
///
/// Spans let the parser recover the written form of an expression, which
/// becomes the default result-column alias in SELECT.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub start: usize,
    pub end: usize,
}

/// Lexer over a query string.
///
/// Yields spanned tokens until the input is exhausted; end of input is the
/// end of the iterator.
pub struct Lexer<'a> {
    /// The complete original query string.
    whole: &'a str,

    /// Byte position of the next unread character.
    position: usize,

    /// Whether the previous token could end an expression.
    ///
    /// Decides if `-`/`+` before a digit is a sign or an operator: after an
    /// identifier, a literal or a closing delimiter it is always an operator.
    after_operand: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            whole: input,
            position: 0,
            after_operand: false,
        }
    }

    /// Lexes the whole input up front.
    pub fn tokenize(input: &'a str) -> Result<Vec<SpannedToken>> {
        Lexer::new(input).collect()
    }

    fn rest(&self) -> &'a str {
        &self.whole[self.position..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|ch| ch.is_ascii_whitespace()) {
            self.bump();
        }
    }

    /// Consumes a word: identifier characters including `.` so qualified
    /// names arrive as a single token. `true`/`false` lex as bool literals.
    fn consume_word(&mut self) -> Token {
        let start = self.position;
        while self
            .peek()
            .is_some_and(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '.')
        {
            self.bump();
        }

        match &self.whole[start..self.position] {
            "true" => Token::BoolLiteral(true),
            "false" => Token::BoolLiteral(false),
            word => Token::Identifier(word.to_string()),
        }
    }

    /// Consumes an integer literal, sign included.
    fn consume_number(&mut self) -> Result<Token> {
        let start = self.position;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.bump();
        }
        while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
            self.bump();
        }

        let text = &self.whole[start..self.position];
        let value = text
            .parse::<i32>()
            .map_err(|_| miette!("Invalid integer value: {}", text))?;
        Ok(Token::IntLiteral(value))
    }

    /// Consumes a `0x…` bytes literal. The digit count must be even.
    fn consume_bytes(&mut self) -> Result<Token> {
        self.bump();
        self.bump();

        let start = self.position;
        while self.peek().is_some_and(|ch| ch.is_ascii_hexdigit()) {
            self.bump();
        }

        let digits = &self.whole[start..self.position];
        if digits.len() % 2 != 0 {
            return Err(miette!("Invalid bytes literal length."));
        }

        let bytes = digits
            .as_bytes()
            .chunks(2)
            .map(|pair| {
                let pair = std::str::from_utf8(pair).expect("hex digits are ASCII");
                u8::from_str_radix(pair, 16).expect("checked hex digits")
            })
            .collect();
        Ok(Token::BytesLiteral(bytes))
    }

    /// Consumes a string literal with `\n \t \r \\ \"` escapes; any other
    /// escaped character passes through unchanged.
    fn consume_string(&mut self) -> Result<Token> {
        self.bump();

        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(miette!("Unterminated string literal.")),
                Some('"') => break,
                Some('\\') => match self.bump() {
                    None => return Err(miette!("Unterminated string literal.")),
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some(other) => text.push(other),
                },
                Some(ch) => text.push(ch),
            }
        }
        Ok(Token::StringLiteral(text))
    }

    /// Consumes `||` or the `|identifier|` length form.
    fn consume_pipe(&mut self) -> Result<Token> {
        self.bump();
        if self.peek() == Some('|') {
            self.bump();
            return Ok(Token::Operator(Op::Or));
        }

        let start = self.position;
        while self
            .peek()
            .is_some_and(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        {
            self.bump();
        }

        let name = &self.whole[start..self.position];
        if self.peek() == Some('|') {
            self.bump();
            Ok(Token::Length(name.to_string()))
        } else {
            Err(miette!("Invalid operator after '|': expected '|'"))
        }
    }

    /// Consumes one character and, if the next one equals `second`, that too.
    fn one_or_two(&mut self, second: char, single: Token, double: Token) -> Token {
        self.bump();
        if self.peek() == Some(second) {
            self.bump();
            double
        } else {
            single
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        let current = self.peek().expect("caller checked for end of input");

        if current.is_ascii_alphabetic() || current == '_' {
            return Ok(self.consume_word());
        }

        if current == '0' && matches!(self.peek_second(), Some('x') | Some('X')) {
            return self.consume_bytes();
        }

        let signed_literal = matches!(current, '-' | '+')
            && !self.after_operand
            && self.peek_second().is_some_and(|ch| ch.is_ascii_digit());
        if current.is_ascii_digit() || signed_literal {
            return self.consume_number();
        }

        match current {
            '"' => self.consume_string(),
            ',' => {
                self.bump();
                Ok(Token::Comma)
            }
            ':' => {
                self.bump();
                Ok(Token::Colon)
            }
            ';' => {
                self.bump();
                Ok(Token::SemiColon)
            }
            '(' => {
                self.bump();
                Ok(Token::LeftParen)
            }
            ')' => {
                self.bump();
                Ok(Token::RightParen)
            }
            '{' => {
                self.bump();
                Ok(Token::LeftBrace)
            }
            '}' => {
                self.bump();
                Ok(Token::RightBrace)
            }
            '[' => {
                self.bump();
                Ok(Token::LeftBracket)
            }
            ']' => {
                self.bump();
                Ok(Token::RightBracket)
            }
            '+' => {
                self.bump();
                Ok(Token::Operator(Op::Plus))
            }
            '-' => {
                self.bump();
                Ok(Token::Operator(Op::Minus))
            }
            '*' => {
                self.bump();
                Ok(Token::Operator(Op::Star))
            }
            '/' => {
                self.bump();
                Ok(Token::Operator(Op::Slash))
            }
            '%' => {
                self.bump();
                Ok(Token::Operator(Op::Percent))
            }
            '<' => Ok(self.one_or_two(
                '=',
                Token::Operator(Op::Less),
                Token::Operator(Op::LessEqual),
            )),
            '>' => Ok(self.one_or_two(
                '=',
                Token::Operator(Op::Greater),
                Token::Operator(Op::GreaterEqual),
            )),
            '=' => Ok(self.one_or_two(
                '=',
                Token::Operator(Op::Equal),
                Token::Operator(Op::DoubleEqual),
            )),
            '!' => Ok(self.one_or_two(
                '=',
                Token::Operator(Op::Not),
                Token::Operator(Op::NotEqual),
            )),
            '&' => {
                self.bump();
                if self.peek() == Some('&') {
                    self.bump();
                    Ok(Token::Operator(Op::And))
                } else {
                    Err(miette!("Invalid character after '&'"))
                }
            }
            '^' => {
                self.bump();
                if self.peek() == Some('^') {
                    self.bump();
                    Ok(Token::Operator(Op::Xor))
                } else {
                    Err(miette!("Invalid character after '^'"))
                }
            }
            '|' => self.consume_pipe(),
            other => Err(miette!("Unknown character: {}", other)),
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<SpannedToken>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        self.peek()?;

        let start = self.position;
        let token = match self.next_token() {
            Ok(token) => token,
            Err(e) => return Some(Err(e)),
        };

        self.after_operand = matches!(
            token,
            Token::Identifier(_)
                | Token::IntLiteral(_)
                | Token::BoolLiteral(_)
                | Token::StringLiteral(_)
                | Token::BytesLiteral(_)
                | Token::Length(_)
                | Token::RightParen
                | Token::RightBracket
        );

        Some(Ok(SpannedToken {
            token,
            start,
            end: self.position,
        }))
    }
}
