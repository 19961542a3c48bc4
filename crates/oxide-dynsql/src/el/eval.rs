//! Evaluation of parsed expressions.

use std::cmp::Ordering;
use std::sync::Arc;

use super::parser::{BinaryOp, ExprNode, ExprParser, UnaryOp};
use super::{Expression, ExpressionError, ExpressionLanguage, VarScope};
use crate::value::SqlValue;

/// Built-in functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// `empty(x)`: NULL, empty text, empty array or empty blob.
    Empty,
    /// `size(x)`: length of text, array or blob, 0 for NULL.
    Size,
    /// `has('name')`: the caller supplied a parameter with that name.
    Has,
    /// `now()`: the current UTC timestamp.
    Now,
    /// `lower(s)`
    Lower,
    /// `upper(s)`
    Upper,
}

impl Function {
    /// Looks a function up by name (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "empty" | "isempty" => Some(Self::Empty),
            "size" | "length" => Some(Self::Size),
            "has" => Some(Self::Has),
            "now" => Some(Self::Now),
            "lower" | "tolowercase" => Some(Self::Lower),
            "upper" | "touppercase" => Some(Self::Upper),
            _ => None,
        }
    }

    /// Returns the canonical name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Size => "size",
            Self::Has => "has",
            Self::Now => "now",
            Self::Lower => "lower",
            Self::Upper => "upper",
        }
    }

    /// Returns the number of arguments the function takes.
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::Now => 0,
            Self::Empty | Self::Size | Self::Has | Self::Lower | Self::Upper => 1,
        }
    }

    fn call(self, args: &[SqlValue], scope: &dyn VarScope) -> Result<SqlValue, ExpressionError> {
        let arg = args.first().unwrap_or(&SqlValue::Null);
        match self {
            Self::Empty => Ok(SqlValue::Bool(match arg {
                SqlValue::Null => true,
                SqlValue::Text(s) => s.is_empty(),
                SqlValue::Array(items) => items.is_empty(),
                SqlValue::Blob(b) => b.is_empty(),
                _ => false,
            })),
            Self::Size => {
                let len = match arg {
                    SqlValue::Null => 0,
                    SqlValue::Text(s) => s.chars().count(),
                    SqlValue::Array(items) => items.len(),
                    SqlValue::Blob(b) => b.len(),
                    other => {
                        return Err(ExpressionError::Type(format!(
                            "size() is not defined for {}",
                            other.kind()
                        )))
                    }
                };
                i64::try_from(len)
                    .map(SqlValue::Int)
                    .map_err(|e| ExpressionError::Type(e.to_string()))
            }
            Self::Has => match arg {
                SqlValue::Text(name) => Ok(SqlValue::Bool(scope.has_param(name))),
                other => Err(ExpressionError::Type(format!(
                    "has() expects a text argument, got {}",
                    other.kind()
                ))),
            },
            Self::Now => Ok(SqlValue::Timestamp(chrono::Utc::now().naive_utc())),
            Self::Lower | Self::Upper => match arg {
                SqlValue::Null => Ok(SqlValue::Null),
                SqlValue::Text(s) if self == Self::Lower => Ok(SqlValue::Text(s.to_lowercase())),
                SqlValue::Text(s) => Ok(SqlValue::Text(s.to_uppercase())),
                other => Err(ExpressionError::Type(format!(
                    "{}() expects text, got {}",
                    self.name(),
                    other.kind()
                ))),
            },
        }
    }
}

/// An expression compiled by [`DefaultExpressionLanguage`].
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    source: String,
    root: ExprNode,
}

impl CompiledExpression {
    /// Returns the parsed expression tree.
    #[must_use]
    pub const fn root(&self) -> &ExprNode {
        &self.root
    }
}

impl Expression for CompiledExpression {
    fn source(&self) -> &str {
        &self.source
    }

    fn value(&self, scope: &dyn VarScope) -> Result<SqlValue, ExpressionError> {
        eval(&self.root, scope)
    }
}

/// The built-in expression language.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultExpressionLanguage;

impl DefaultExpressionLanguage {
    /// Creates the language.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ExpressionLanguage for DefaultExpressionLanguage {
    fn compile(&self, text: &str) -> Result<Arc<dyn Expression>, ExpressionError> {
        let root = ExprParser::new(text)?.parse()?;
        Ok(Arc::new(CompiledExpression {
            source: String::from(text),
            root,
        }))
    }
}

fn eval(node: &ExprNode, scope: &dyn VarScope) -> Result<SqlValue, ExpressionError> {
    match node {
        ExprNode::Literal(value) => Ok(value.clone()),
        // Undefined variables are NULL.
        ExprNode::Var(name) => Ok(scope.resolve(name).unwrap_or(SqlValue::Null)),
        ExprNode::Unary { op, operand } => {
            let value = eval(operand, scope)?;
            match op {
                UnaryOp::Not => Ok(SqlValue::Bool(!value.is_truthy())),
                UnaryOp::Neg => match value {
                    SqlValue::Null => Ok(SqlValue::Null),
                    SqlValue::Int(n) => n
                        .checked_neg()
                        .map(SqlValue::Int)
                        .ok_or_else(|| ExpressionError::Type(String::from("integer overflow"))),
                    SqlValue::Float(f) => Ok(SqlValue::Float(-f)),
                    other => Err(ExpressionError::Type(format!(
                        "cannot negate {}",
                        other.kind()
                    ))),
                },
            }
        }
        ExprNode::Binary { left, op, right } => match op {
            BinaryOp::And => {
                if !eval(left, scope)?.is_truthy() {
                    return Ok(SqlValue::Bool(false));
                }
                Ok(SqlValue::Bool(eval(right, scope)?.is_truthy()))
            }
            BinaryOp::Or => {
                if eval(left, scope)?.is_truthy() {
                    return Ok(SqlValue::Bool(true));
                }
                Ok(SqlValue::Bool(eval(right, scope)?.is_truthy()))
            }
            _ => {
                let lhs = eval(left, scope)?;
                let rhs = eval(right, scope)?;
                binary(*op, &lhs, &rhs)
            }
        },
        ExprNode::Call { function, args } => {
            let values = args
                .iter()
                .map(|arg| eval(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            function.call(&values, scope)
        }
    }
}

fn binary(op: BinaryOp, lhs: &SqlValue, rhs: &SqlValue) -> Result<SqlValue, ExpressionError> {
    match op {
        BinaryOp::Eq => Ok(SqlValue::Bool(values_equal(lhs, rhs))),
        BinaryOp::NotEq => Ok(SqlValue::Bool(!values_equal(lhs, rhs))),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            if lhs.is_null() || rhs.is_null() {
                return Ok(SqlValue::Bool(false));
            }
            let ordering = compare(lhs, rhs)?;
            Ok(SqlValue::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::LtEq => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOp::Add if matches!(lhs, SqlValue::Text(_)) || matches!(rhs, SqlValue::Text(_)) => {
            Ok(SqlValue::Text(format!(
                "{}{}",
                lhs.to_replacement_text(),
                rhs.to_replacement_text()
            )))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arithmetic(op, lhs, rhs)
        }
        BinaryOp::And | BinaryOp::Or => Ok(SqlValue::Bool(match op {
            BinaryOp::And => lhs.is_truthy() && rhs.is_truthy(),
            _ => lhs.is_truthy() || rhs.is_truthy(),
        })),
    }
}

#[allow(clippy::cast_precision_loss)]
fn values_equal(lhs: &SqlValue, rhs: &SqlValue) -> bool {
    match (lhs, rhs) {
        (SqlValue::Int(a), SqlValue::Float(b)) | (SqlValue::Float(b), SqlValue::Int(a)) => {
            (*a as f64 - b).abs() < f64::EPSILON
        }
        _ => lhs == rhs,
    }
}

#[allow(clippy::cast_precision_loss)]
fn compare(lhs: &SqlValue, rhs: &SqlValue) -> Result<Ordering, ExpressionError> {
    let ordering = match (lhs, rhs) {
        (SqlValue::Int(a), SqlValue::Int(b)) => Some(a.cmp(b)),
        (SqlValue::Int(a), SqlValue::Float(b)) => (*a as f64).partial_cmp(b),
        (SqlValue::Float(a), SqlValue::Int(b)) => a.partial_cmp(&(*b as f64)),
        (SqlValue::Float(a), SqlValue::Float(b)) => a.partial_cmp(b),
        (SqlValue::Text(a), SqlValue::Text(b)) => Some(a.cmp(b)),
        (SqlValue::Timestamp(a), SqlValue::Timestamp(b)) => Some(a.cmp(b)),
        (SqlValue::Bool(a), SqlValue::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    };
    ordering.ok_or_else(|| {
        ExpressionError::Type(format!(
            "cannot compare {} with {}",
            lhs.kind(),
            rhs.kind()
        ))
    })
}

#[allow(clippy::cast_precision_loss)]
fn arithmetic(op: BinaryOp, lhs: &SqlValue, rhs: &SqlValue) -> Result<SqlValue, ExpressionError> {
    let overflow = || ExpressionError::Type(String::from("integer overflow"));
    match (lhs, rhs) {
        (SqlValue::Null, _) | (_, SqlValue::Null) => Ok(SqlValue::Null),
        (SqlValue::Int(a), SqlValue::Int(b)) => {
            let (a, b) = (*a, *b);
            let result = match op {
                BinaryOp::Add => a.checked_add(b).ok_or_else(overflow)?,
                BinaryOp::Sub => a.checked_sub(b).ok_or_else(overflow)?,
                BinaryOp::Mul => a.checked_mul(b).ok_or_else(overflow)?,
                BinaryOp::Div | BinaryOp::Mod if b == 0 => {
                    return Err(ExpressionError::DivisionByZero)
                }
                BinaryOp::Div => a.checked_div(b).ok_or_else(overflow)?,
                _ => a.checked_rem(b).ok_or_else(overflow)?,
            };
            Ok(SqlValue::Int(result))
        }
        (SqlValue::Int(_) | SqlValue::Float(_), SqlValue::Int(_) | SqlValue::Float(_)) => {
            let a = as_f64(lhs);
            let b = as_f64(rhs);
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div | BinaryOp::Mod if b == 0.0 => {
                    return Err(ExpressionError::DivisionByZero)
                }
                BinaryOp::Div => a / b,
                _ => a % b,
            };
            Ok(SqlValue::Float(result))
        }
        _ => Err(ExpressionError::Type(format!(
            "arithmetic is not defined for {} and {}",
            lhs.kind(),
            rhs.kind()
        ))),
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(value: &SqlValue) -> f64 {
    match value {
        SqlValue::Int(n) => *n as f64,
        SqlValue::Float(f) => *f,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn scope(pairs: &[(&str, SqlValue)]) -> BTreeMap<String, SqlValue> {
        pairs
            .iter()
            .map(|(k, v)| (String::from(*k), v.clone()))
            .collect()
    }

    fn value_of(text: &str, vars: &BTreeMap<String, SqlValue>) -> SqlValue {
        DefaultExpressionLanguage::new()
            .compile(text)
            .unwrap()
            .value(vars)
            .unwrap()
    }

    #[test]
    fn test_arithmetic() {
        let vars = scope(&[("a", SqlValue::Int(7))]);
        assert_eq!(value_of("a * 2 + 1", &vars), SqlValue::Int(15));
        assert_eq!(value_of("a / 2", &vars), SqlValue::Int(3));
        assert_eq!(value_of("a % 4", &vars), SqlValue::Int(3));
        assert_eq!(value_of("a + 0.5", &vars), SqlValue::Float(7.5));
        assert_eq!(value_of("-a", &vars), SqlValue::Int(-7));
    }

    #[test]
    fn test_division_by_zero() {
        let expr = DefaultExpressionLanguage::new().compile("1 / 0").unwrap();
        assert_eq!(
            expr.value(&BTreeMap::<String, SqlValue>::new()),
            Err(ExpressionError::DivisionByZero)
        );
    }

    #[test]
    fn test_undefined_is_null() {
        let vars = BTreeMap::new();
        assert_eq!(value_of("missing", &vars), SqlValue::Null);
        assert_eq!(value_of("missing == null", &vars), SqlValue::Bool(true));
        assert_eq!(value_of("missing > 1", &vars), SqlValue::Bool(false));
    }

    #[test]
    fn test_logic_short_circuits() {
        let vars = scope(&[("joins", SqlValue::array(vec!["a"]))]);
        assert_eq!(
            value_of("null != joins && joins.size() > 0", &vars),
            SqlValue::Bool(true)
        );
        // The right side would fail to evaluate.
        assert_eq!(value_of("false && 1 / 0", &vars), SqlValue::Bool(false));
        assert_eq!(value_of("true or 1 / 0", &vars), SqlValue::Bool(true));
    }

    #[test]
    fn test_functions() {
        let vars = scope(&[
            ("name", SqlValue::Text(String::from("Ann"))),
            ("empty_list", SqlValue::Array(vec![])),
        ]);
        assert_eq!(value_of("upper(name)", &vars), SqlValue::Text(String::from("ANN")));
        assert_eq!(value_of("lower(name)", &vars), SqlValue::Text(String::from("ann")));
        assert_eq!(value_of("size(name)", &vars), SqlValue::Int(3));
        assert_eq!(value_of("empty(empty_list)", &vars), SqlValue::Bool(true));
        assert_eq!(value_of("has('name')", &vars), SqlValue::Bool(true));
        assert_eq!(value_of("has('other')", &vars), SqlValue::Bool(false));
        assert!(matches!(value_of("now()", &vars), SqlValue::Timestamp(_)));
    }

    #[test]
    fn test_text_concat_and_compare() {
        let vars = scope(&[("a", SqlValue::Text(String::from("x")))]);
        assert_eq!(value_of("a + 1", &vars), SqlValue::Text(String::from("x1")));
        assert_eq!(value_of("a < 'y'", &vars), SqlValue::Bool(true));
        assert_eq!(value_of("1 == 1.0", &vars), SqlValue::Bool(true));
    }

    #[test]
    fn test_type_error() {
        let vars = scope(&[("a", SqlValue::Text(String::from("x")))]);
        let expr = DefaultExpressionLanguage::new().compile("a * 2").unwrap();
        assert!(matches!(expr.value(&vars), Err(ExpressionError::Type(_))));
    }
}
