//! Operator precedence for the expression language.

use super::lexer::ExprToken;
use super::parser::{BinaryOp, UnaryOp};

/// Binding power of prefix operators.
pub const PREFIX_BINDING_POWER: u8 = 13;

/// Returns the infix binding power for a token.
///
/// Returns `(left_bp, right_bp)`; all operators are left associative.
/// Returns `None` if the token is not an infix operator.
#[must_use]
pub const fn infix_binding_power(token: &ExprToken) -> Option<(u8, u8)> {
    match token {
        // Logical OR (lowest precedence)
        ExprToken::Or => Some((1, 2)),

        // Logical AND
        ExprToken::And => Some((3, 4)),

        // Equality
        ExprToken::EqEq | ExprToken::NotEq => Some((5, 6)),

        // Relational
        ExprToken::Lt | ExprToken::LtEq | ExprToken::Gt | ExprToken::GtEq => Some((7, 8)),

        // Additive
        ExprToken::Plus | ExprToken::Minus => Some((9, 10)),

        // Multiplicative
        ExprToken::Star | ExprToken::Slash | ExprToken::Percent => Some((11, 12)),

        _ => None,
    }
}

/// Converts a token to a binary operator.
#[must_use]
pub const fn token_to_binary_op(token: &ExprToken) -> Option<BinaryOp> {
    match token {
        ExprToken::Or => Some(BinaryOp::Or),
        ExprToken::And => Some(BinaryOp::And),
        ExprToken::EqEq => Some(BinaryOp::Eq),
        ExprToken::NotEq => Some(BinaryOp::NotEq),
        ExprToken::Lt => Some(BinaryOp::Lt),
        ExprToken::LtEq => Some(BinaryOp::LtEq),
        ExprToken::Gt => Some(BinaryOp::Gt),
        ExprToken::GtEq => Some(BinaryOp::GtEq),
        ExprToken::Plus => Some(BinaryOp::Add),
        ExprToken::Minus => Some(BinaryOp::Sub),
        ExprToken::Star => Some(BinaryOp::Mul),
        ExprToken::Slash => Some(BinaryOp::Div),
        ExprToken::Percent => Some(BinaryOp::Mod),
        _ => None,
    }
}

/// Converts a token to a unary operator.
#[must_use]
pub const fn token_to_unary_op(token: &ExprToken) -> Option<UnaryOp> {
    match token {
        ExprToken::Not => Some(UnaryOp::Not),
        ExprToken::Minus => Some(UnaryOp::Neg),
        _ => None,
    }
}
