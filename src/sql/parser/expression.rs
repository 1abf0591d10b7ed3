use miette::{Result, miette};

use crate::sql::expression::{BinaryOp, Expression, UnaryOp};
use crate::sql::lexer::{Op, SpannedToken, Token};

/// Recursive-descent expression parser over a token slice.
///
/// Precedence, lowest to highest: `||`, `^^`, `&&`, equality, comparison,
/// `+ -`, `* / %`, unary `!`, primary. The parser stops at the first token
/// that cannot continue an expression; the caller decides whether that token
/// is legal there.
pub struct ExpressionParser<'t> {
    tokens: &'t [SpannedToken],
    position: usize,
}

impl<'t> ExpressionParser<'t> {
    pub fn new(tokens: &'t [SpannedToken], position: usize) -> Self {
        Self { tokens, position }
    }

    /// Index of the first token not consumed by [`parse`](Self::parse).
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn parse(&mut self) -> Result<Expression> {
        self.parse_logical_or()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|spanned| &spanned.token)
    }

    fn peek_op(&self) -> Option<Op> {
        match self.peek() {
            Some(Token::Operator(op)) => Some(*op),
            _ => None,
        }
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    /// Folds a left-associative chain of binary operators at one level.
    fn parse_level(
        &mut self,
        accepts: impl Fn(Op) -> Option<BinaryOp>,
        next: impl Fn(&mut Self) -> Result<Expression>,
    ) -> Result<Expression> {
        let mut node = next(self)?;
        while let Some(op) = self.peek_op().and_then(&accepts) {
            self.advance();
            let right = next(self)?;
            node = Expression::Binary {
                op,
                left: Box::new(node),
                right: Box::new(right),
            };
        }
        Ok(node)
    }

    fn parse_logical_or(&mut self) -> Result<Expression> {
        self.parse_level(
            |op| (op == Op::Or).then_some(BinaryOp::Or),
            Self::parse_logical_xor,
        )
    }

    fn parse_logical_xor(&mut self) -> Result<Expression> {
        self.parse_level(
            |op| (op == Op::Xor).then_some(BinaryOp::Xor),
            Self::parse_logical_and,
        )
    }

    fn parse_logical_and(&mut self) -> Result<Expression> {
        self.parse_level(
            |op| (op == Op::And).then_some(BinaryOp::And),
            Self::parse_equality,
        )
    }

    fn parse_equality(&mut self) -> Result<Expression> {
        self.parse_level(
            |op| match op {
                Op::Equal | Op::DoubleEqual => Some(BinaryOp::Equal),
                Op::NotEqual => Some(BinaryOp::NotEqual),
                _ => None,
            },
            Self::parse_comparison,
        )
    }

    fn parse_comparison(&mut self) -> Result<Expression> {
        self.parse_level(
            |op| match op {
                Op::Less => Some(BinaryOp::Less),
                Op::LessEqual => Some(BinaryOp::LessEqual),
                Op::Greater => Some(BinaryOp::Greater),
                Op::GreaterEqual => Some(BinaryOp::GreaterEqual),
                _ => None,
            },
            Self::parse_term,
        )
    }

    fn parse_term(&mut self) -> Result<Expression> {
        self.parse_level(
            |op| match op {
                Op::Plus => Some(BinaryOp::Add),
                Op::Minus => Some(BinaryOp::Subtract),
                _ => None,
            },
            Self::parse_factor,
        )
    }

    fn parse_factor(&mut self) -> Result<Expression> {
        self.parse_level(
            |op| match op {
                Op::Star => Some(BinaryOp::Multiply),
                Op::Slash => Some(BinaryOp::Divide),
                Op::Percent => Some(BinaryOp::Modulo),
                _ => None,
            },
            Self::parse_unary,
        )
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        if self.peek_op() == Some(Op::Not) {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expression::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        let token = self
            .peek()
            .ok_or_else(|| miette!("Unexpected end of expression."))?
            .clone();

        let expr = match token {
            Token::Length(name) => Expression::Unary {
                op: UnaryOp::Length,
                operand: Box::new(Expression::Variable(name)),
            },
            Token::LeftParen => {
                self.advance();
                let inner = self.parse_logical_or()?;
                if self.peek() != Some(&Token::RightParen) {
                    return Err(miette!("Expected ')' after expression."));
                }
                inner
            }
            Token::IntLiteral(value) => Expression::Literal(crate::types::Value::Int(value)),
            Token::BoolLiteral(value) => Expression::Literal(crate::types::Value::Bool(value)),
            Token::StringLiteral(value) => Expression::Literal(crate::types::Value::Str(value)),
            Token::BytesLiteral(value) => Expression::Literal(crate::types::Value::Bytes(value)),
            Token::Identifier(name) => Expression::Variable(name),
            _ => return Err(miette!("Unexpected token in expression.")),
        };

        self.advance();
        Ok(expr)
    }
}
