use std::collections::HashMap;

use miette::{Result, miette};

use crate::types::{DataType, Value, compare_values};

/// A name→value mapping an expression is evaluated against.
///
/// Built from a row; NULL columns are absent. In joined selects the keys are
/// qualified (`table.column`).
pub type Binding = HashMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!` — boolean negation.
    Not,
    /// `|var|` — length of a string or bytes value.
    Length,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    And,
    Or,
    Xor,
}

/// A typed expression tree.
///
/// Each variant exclusively owns its children; evaluation is a pattern match
/// against a [`Binding`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    /// Column reference, possibly qualified (`users.id`).
    Variable(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

impl Expression {
    /// Evaluates the expression against a binding.
    ///
    /// A reference to a column that is absent from the binding (unknown or
    /// NULL) is an error, as is any operand type mismatch.
    pub fn evaluate(&self, binding: &Binding) -> Result<Value> {
        match self {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Variable(name) => binding
                .get(name)
                .cloned()
                .ok_or_else(|| miette!("Column not found: {}", name)),
            Expression::Unary { op, operand } => {
                let value = operand.evaluate(binding)?;
                match op {
                    UnaryOp::Not => match value {
                        Value::Bool(b) => Ok(Value::Bool(!b)),
                        _ => Err(miette!("Operator '!' requires Bool type.")),
                    },
                    UnaryOp::Length => match value {
                        Value::Str(s) => Ok(Value::Int(s.len() as i32)),
                        Value::Bytes(b) => Ok(Value::Int(b.len() as i32)),
                        _ => Err(miette!("Operator '|var|' requires String or Bytes type.")),
                    },
                }
            }
            Expression::Binary { op, left, right } => {
                let left = left.evaluate(binding)?;
                let right = right.evaluate(binding)?;
                match op {
                    BinaryOp::Add => value_add(&left, &right),
                    BinaryOp::Subtract => value_subtract(&left, &right),
                    BinaryOp::Multiply => value_multiply(&left, &right),
                    BinaryOp::Divide => value_divide(&left, &right),
                    BinaryOp::Modulo => value_modulo(&left, &right),
                    BinaryOp::Less => {
                        Ok(Value::Bool(compare_values(&left, &right)?.is_lt()))
                    }
                    BinaryOp::LessEqual => {
                        Ok(Value::Bool(compare_values(&left, &right)?.is_le()))
                    }
                    BinaryOp::Greater => {
                        Ok(Value::Bool(compare_values(&left, &right)?.is_gt()))
                    }
                    BinaryOp::GreaterEqual => {
                        Ok(Value::Bool(compare_values(&left, &right)?.is_ge()))
                    }
                    BinaryOp::Equal => {
                        if !left.is_same_type(&right) {
                            return Err(miette!(
                                "Equality comparison requires operands of the same type."
                            ));
                        }
                        Ok(Value::Bool(left == right))
                    }
                    BinaryOp::NotEqual => {
                        if !left.is_same_type(&right) {
                            return Err(miette!(
                                "Inequality comparison requires operands of the same type."
                            ));
                        }
                        Ok(Value::Bool(left != right))
                    }
                    // Both operands are type-checked even when the left one
                    // already decides the result.
                    BinaryOp::And => {
                        let (l, r) = (require_bool(&left, "&&")?, require_bool(&right, "&&")?);
                        Ok(Value::Bool(l && r))
                    }
                    BinaryOp::Or => {
                        let (l, r) = (require_bool(&left, "||")?, require_bool(&right, "||")?);
                        Ok(Value::Bool(l || r))
                    }
                    BinaryOp::Xor => {
                        let (l, r) = (require_bool(&left, "^^")?, require_bool(&right, "^^")?);
                        Ok(Value::Bool(l ^ r))
                    }
                }
            }
        }
    }

    /// The statically known result type, without evaluating.
    ///
    /// Column references are `Unknown` until bound to a row.
    pub fn static_type(&self) -> DataType {
        match self {
            Expression::Literal(value) => value.data_type(),
            Expression::Variable(_) => DataType::Unknown,
            Expression::Unary { op, .. } => match op {
                UnaryOp::Not => DataType::Bool,
                UnaryOp::Length => DataType::Int32,
            },
            Expression::Binary { op, .. } => match op {
                BinaryOp::Add
                | BinaryOp::Subtract
                | BinaryOp::Multiply
                | BinaryOp::Divide
                | BinaryOp::Modulo => DataType::Int32,
                _ => DataType::Bool,
            },
        }
    }
}

fn require_bool(value: &Value, op: &str) -> Result<bool> {
    value
        .as_bool()
        .map_err(|_| miette!("Operator '{}' requires Bool types.", op))
}

pub fn value_add(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .ok_or_else(|| miette!("Integer overflow in '+' operation.")),
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
        _ => Err(miette!("Operator '+' not supported for given types.")),
    }
}

pub fn value_subtract(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_sub(*b)
            .map(Value::Int)
            .ok_or_else(|| miette!("Integer overflow in '-' operation.")),
        _ => Err(miette!("Operator '-' requires numeric types.")),
    }
}

pub fn value_multiply(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_mul(*b)
            .map(Value::Int)
            .ok_or_else(|| miette!("Integer overflow in '*' operation.")),
        _ => Err(miette!("Operator '*' requires numeric types.")),
    }
}

pub fn value_divide(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Int(_), Value::Int(0)) => Err(miette!("Division by zero.")),
        (Value::Int(a), Value::Int(b)) => a
            .checked_div(*b)
            .map(Value::Int)
            .ok_or_else(|| miette!("Integer overflow in '/' operation.")),
        _ => Err(miette!("Operator '/' requires numeric types.")),
    }
}

pub fn value_modulo(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Int(_), Value::Int(0)) => Err(miette!("Modulo by zero.")),
        (Value::Int(a), Value::Int(b)) => a
            .checked_rem(*b)
            .map(Value::Int)
            .ok_or_else(|| miette!("Integer overflow in '%' operation.")),
        _ => Err(miette!("Operator '%' requires integer types.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(pairs: &[(&str, Value)]) -> Binding {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    fn int(value: i32) -> Expression {
        Expression::Literal(Value::Int(value))
    }

    fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[test]
    fn test_literal_evaluates_to_itself() {
        let expr = Expression::Literal(Value::Str("hi".into()));
        assert_eq!(
            expr.evaluate(&Binding::new()).unwrap(),
            Value::Str("hi".into())
        );
    }

    #[test]
    fn test_variable_lookup() {
        let b = binding(&[("age", Value::Int(30))]);
        let expr = Expression::Variable("age".into());
        assert_eq!(expr.evaluate(&b).unwrap(), Value::Int(30));
    }

    #[test]
    fn test_variable_missing_is_an_error() {
        let expr = Expression::Variable("ghost".into());
        let err = expr.evaluate(&Binding::new()).unwrap_err();
        assert!(err.to_string().contains("Column not found: ghost"));
    }

    #[test]
    fn test_arithmetic() {
        let b = Binding::new();
        assert_eq!(
            binary(BinaryOp::Add, int(10), int(5)).evaluate(&b).unwrap(),
            Value::Int(15)
        );
        assert_eq!(
            binary(BinaryOp::Subtract, int(10), int(5))
                .evaluate(&b)
                .unwrap(),
            Value::Int(5)
        );
        assert_eq!(
            binary(BinaryOp::Multiply, int(10), int(5))
                .evaluate(&b)
                .unwrap(),
            Value::Int(50)
        );
        assert_eq!(
            binary(BinaryOp::Divide, int(10), int(5))
                .evaluate(&b)
                .unwrap(),
            Value::Int(2)
        );
        assert_eq!(
            binary(BinaryOp::Modulo, int(10), int(4))
                .evaluate(&b)
                .unwrap(),
            Value::Int(2)
        );
    }

    #[test]
    fn test_add_commutes_on_int32() {
        let b = Binding::new();
        let ab = binary(BinaryOp::Add, int(12), int(30)).evaluate(&b).unwrap();
        let ba = binary(BinaryOp::Add, int(30), int(12)).evaluate(&b).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_division_and_modulo_by_zero() {
        let b = Binding::new();
        let err = binary(BinaryOp::Divide, int(1), int(0))
            .evaluate(&b)
            .unwrap_err();
        assert!(err.to_string().contains("Division by zero"));

        let err = binary(BinaryOp::Modulo, int(1), int(0))
            .evaluate(&b)
            .unwrap_err();
        assert!(err.to_string().contains("Modulo by zero"));
    }

    #[test]
    fn test_arithmetic_overflow_is_fatal() {
        let b = Binding::new();
        assert!(
            binary(BinaryOp::Add, int(i32::MAX), int(1))
                .evaluate(&b)
                .is_err()
        );
        assert!(
            binary(BinaryOp::Subtract, int(i32::MIN), int(1))
                .evaluate(&b)
                .is_err()
        );
        assert!(
            binary(BinaryOp::Multiply, int(i32::MAX), int(2))
                .evaluate(&b)
                .is_err()
        );
        // i32::MIN / -1 overflows too.
        assert!(
            binary(BinaryOp::Divide, int(i32::MIN), int(-1))
                .evaluate(&b)
                .is_err()
        );
    }

    #[test]
    fn test_string_concatenation() {
        let b = Binding::new();
        let expr = binary(
            BinaryOp::Add,
            Expression::Literal(Value::Str("foo".into())),
            Expression::Literal(Value::Str("bar".into())),
        );
        assert_eq!(expr.evaluate(&b).unwrap(), Value::Str("foobar".into()));
    }

    #[test]
    fn test_add_type_mismatch() {
        let b = Binding::new();
        let expr = binary(
            BinaryOp::Add,
            Expression::Literal(Value::Str("a".into())),
            int(1),
        );
        let err = expr.evaluate(&b).unwrap_err();
        assert!(
            err.to_string()
                .contains("Operator '+' not supported for given types.")
        );
    }

    #[test]
    fn test_comparisons() {
        let b = Binding::new();
        assert_eq!(
            binary(BinaryOp::Less, int(1), int(2)).evaluate(&b).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            binary(BinaryOp::GreaterEqual, int(2), int(2))
                .evaluate(&b)
                .unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            binary(
                BinaryOp::Less,
                Expression::Literal(Value::Str("alpha".into())),
                Expression::Literal(Value::Str("beta".into())),
            )
            .evaluate(&b)
            .unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            binary(
                BinaryOp::Less,
                Expression::Literal(Value::Bool(false)),
                Expression::Literal(Value::Bool(true)),
            )
            .evaluate(&b)
            .unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_comparison_across_types_is_an_error() {
        let b = Binding::new();
        let expr = binary(
            BinaryOp::Equal,
            int(1),
            Expression::Literal(Value::Str("1".into())),
        );
        let err = expr.evaluate(&b).unwrap_err();
        assert!(
            err.to_string()
                .contains("Equality comparison requires operands of the same type.")
        );

        let expr = binary(
            BinaryOp::Less,
            int(1),
            Expression::Literal(Value::Str("1".into())),
        );
        assert!(expr.evaluate(&b).is_err());
    }

    #[test]
    fn test_logical_operators() {
        let b = Binding::new();
        let t = || Expression::Literal(Value::Bool(true));
        let f = || Expression::Literal(Value::Bool(false));

        assert_eq!(
            binary(BinaryOp::And, t(), f()).evaluate(&b).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            binary(BinaryOp::Or, t(), f()).evaluate(&b).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            binary(BinaryOp::Xor, t(), f()).evaluate(&b).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            binary(BinaryOp::Xor, t(), t()).evaluate(&b).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_logical_operators_commute() {
        let b = Binding::new();
        for op in [BinaryOp::And, BinaryOp::Or, BinaryOp::Xor] {
            for (x, y) in [(true, false), (true, true), (false, false)] {
                let xy = binary(
                    op,
                    Expression::Literal(Value::Bool(x)),
                    Expression::Literal(Value::Bool(y)),
                )
                .evaluate(&b)
                .unwrap();
                let yx = binary(
                    op,
                    Expression::Literal(Value::Bool(y)),
                    Expression::Literal(Value::Bool(x)),
                )
                .evaluate(&b)
                .unwrap();
                assert_eq!(xy, yx);
            }
        }
    }

    #[test]
    fn test_logical_requires_bool() {
        let b = Binding::new();
        let err = binary(BinaryOp::And, Expression::Literal(Value::Bool(true)), int(1))
            .evaluate(&b)
            .unwrap_err();
        assert!(err.to_string().contains("Operator '&&' requires Bool types."));

        // A false left side does not skip the right side's type check.
        let err = binary(BinaryOp::And, Expression::Literal(Value::Bool(false)), int(1))
            .evaluate(&b)
            .unwrap_err();
        assert!(err.to_string().contains("Operator '&&' requires Bool types."));
    }

    #[test]
    fn test_not_is_involutive() {
        let b = binding(&[("flag", Value::Bool(true))]);
        let once = Expression::Unary {
            op: UnaryOp::Not,
            operand: Box::new(Expression::Variable("flag".into())),
        };
        let twice = Expression::Unary {
            op: UnaryOp::Not,
            operand: Box::new(once.clone()),
        };
        assert_eq!(once.evaluate(&b).unwrap(), Value::Bool(false));
        assert_eq!(twice.evaluate(&b).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_not_requires_bool() {
        let b = binding(&[("n", Value::Int(3))]);
        let expr = Expression::Unary {
            op: UnaryOp::Not,
            operand: Box::new(Expression::Variable("n".into())),
        };
        assert!(expr.evaluate(&b).is_err());
    }

    #[test]
    fn test_length() {
        let b = binding(&[
            ("s", Value::Str("hello".into())),
            ("raw", Value::Bytes(vec![1, 2, 3])),
            ("n", Value::Int(1)),
        ]);
        let length_of = |name: &str| Expression::Unary {
            op: UnaryOp::Length,
            operand: Box::new(Expression::Variable(name.into())),
        };

        assert_eq!(length_of("s").evaluate(&b).unwrap(), Value::Int(5));
        assert_eq!(length_of("raw").evaluate(&b).unwrap(), Value::Int(3));
        let err = length_of("n").evaluate(&b).unwrap_err();
        assert!(
            err.to_string()
                .contains("Operator '|var|' requires String or Bytes type.")
        );
    }

    #[test]
    fn test_static_types() {
        assert_eq!(int(1).static_type(), DataType::Int32);
        assert_eq!(
            Expression::Variable("x".into()).static_type(),
            DataType::Unknown
        );
        assert_eq!(
            binary(BinaryOp::Add, int(1), int(2)).static_type(),
            DataType::Int32
        );
        assert_eq!(
            binary(BinaryOp::Less, int(1), int(2)).static_type(),
            DataType::Bool
        );
        let not = Expression::Unary {
            op: UnaryOp::Not,
            operand: Box::new(Expression::Variable("x".into())),
        };
        assert_eq!(not.static_type(), DataType::Bool);
        let length = Expression::Unary {
            op: UnaryOp::Length,
            operand: Box::new(Expression::Variable("x".into())),
        };
        assert_eq!(length.static_type(), DataType::Int32);
    }
}
