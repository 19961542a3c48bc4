//! Pratt parser for expression text.

use super::eval::Function;
use super::lexer::{ExprLexer, ExprToken, Spanned};
use super::pratt::{
    infix_binding_power, token_to_binary_op, token_to_unary_op, PREFIX_BINDING_POWER,
};
use super::ExpressionError;
use crate::value::SqlValue;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    /// A literal value.
    Literal(SqlValue),
    /// A variable reference.
    Var(String),
    /// A unary operation.
    Unary {
        op: UnaryOp,
        operand: Box<ExprNode>,
    },
    /// A binary operation.
    Binary {
        left: Box<ExprNode>,
        op: BinaryOp,
        right: Box<ExprNode>,
    },
    /// A function call, `x.f(a)` is parsed as `f(x, a)`.
    Call {
        function: Function,
        args: Vec<ExprNode>,
    },
}

pub struct ExprParser<'a> {
    source: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
}

impl<'a> ExprParser<'a> {
    pub fn new(source: &'a str) -> Result<Self, ExpressionError> {
        let tokens = ExprLexer::new(source).tokenize()?;
        Ok(Self {
            source,
            tokens,
            pos: 0,
        })
    }

    /// Parses the whole input as one expression.
    pub fn parse(mut self) -> Result<ExprNode, ExpressionError> {
        if self.check(&ExprToken::Eof) {
            return Err(self.error("Empty expression"));
        }
        let expr = self.parse_expression(0)?;
        if !self.check(&ExprToken::Eof) {
            return Err(self.error(format!("Unexpected token {:?}", self.current())));
        }
        Ok(expr)
    }

    fn parse_expression(&mut self, min_bp: u8) -> Result<ExprNode, ExpressionError> {
        let mut lhs = self.parse_prefix()?;

        while let Some((l_bp, r_bp)) = infix_binding_power(self.current()) {
            if l_bp < min_bp {
                break;
            }
            let Some(op) = token_to_binary_op(self.current()) else {
                break;
            };
            self.advance();
            let rhs = self.parse_expression(r_bp)?;
            lhs = ExprNode::Binary {
                left: Box::new(lhs),
                op,
                right: Box::new(rhs),
            };
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<ExprNode, ExpressionError> {
        if let Some(op) = token_to_unary_op(self.current()) {
            self.advance();
            let operand = self.parse_expression(PREFIX_BINDING_POWER)?;
            return Ok(ExprNode::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<ExprNode, ExpressionError> {
        let token = self.current().clone();
        match token {
            ExprToken::Integer(n) => {
                self.advance();
                Ok(ExprNode::Literal(SqlValue::Int(n)))
            }
            ExprToken::Float(f) => {
                self.advance();
                Ok(ExprNode::Literal(SqlValue::Float(f)))
            }
            ExprToken::String(s) => {
                self.advance();
                Ok(ExprNode::Literal(SqlValue::Text(s)))
            }
            ExprToken::True => {
                self.advance();
                Ok(ExprNode::Literal(SqlValue::Bool(true)))
            }
            ExprToken::False => {
                self.advance();
                Ok(ExprNode::Literal(SqlValue::Bool(false)))
            }
            ExprToken::Null => {
                self.advance();
                Ok(ExprNode::Literal(SqlValue::Null))
            }
            ExprToken::LeftParen => {
                self.advance();
                let expr = self.parse_expression(0)?;
                self.expect(&ExprToken::RightParen, "')'")?;
                Ok(expr)
            }
            ExprToken::Identifier(name) => {
                self.advance();
                if self.check(&ExprToken::LeftParen) {
                    self.parse_call(&name)
                } else {
                    Ok(ExprNode::Var(name))
                }
            }
            other => Err(self.error(format!("Expected an expression, found {other:?}"))),
        }
    }

    fn parse_call(&mut self, name: &str) -> Result<ExprNode, ExpressionError> {
        self.expect(&ExprToken::LeftParen, "'('")?;

        let mut args = Vec::new();
        let function_name = match name.rsplit_once('.') {
            Some((receiver, method)) => {
                args.push(ExprNode::Var(String::from(receiver)));
                method
            }
            None => name,
        };
        let function = Function::from_name(function_name)
            .ok_or_else(|| ExpressionError::UnknownFunction(String::from(function_name)))?;

        if !self.check(&ExprToken::RightParen) {
            loop {
                args.push(self.parse_expression(0)?);
                if self.check(&ExprToken::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&ExprToken::RightParen, "')'")?;

        if args.len() != function.arity() {
            return Err(ExpressionError::Arity {
                name: String::from(function.name()),
                expected: function.arity(),
                found: args.len(),
            });
        }
        Ok(ExprNode::Call { function, args })
    }

    // --- Helper methods ---

    fn current(&self) -> &ExprToken {
        self.tokens
            .get(self.pos)
            .map_or(&ExprToken::Eof, |spanned| &spanned.token)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.source.len(), |spanned| spanned.offset)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn check(&self, token: &ExprToken) -> bool {
        core::mem::discriminant(self.current()) == core::mem::discriminant(token)
    }

    fn expect(&mut self, token: &ExprToken, expected: &str) -> Result<(), ExpressionError> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "Expected {expected}, found {:?}",
                self.current()
            )))
        }
    }

    fn error(&self, message: impl Into<String>) -> ExpressionError {
        ExpressionError::Syntax {
            message: message.into(),
            position: self.offset(),
            text: String::from(self.source),
        }
    }
}
