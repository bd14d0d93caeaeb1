//! Postfix formula evaluation.
//!
//! Every tunable number in the spell catalog is a small postfix expression
//! ("power 2 *") resolved at runtime against named bindings, so balance
//! lives in data instead of code:
//! - Integer and float domains share one grammar and dispatcher
//! - Token priority: variable binding, then literal, then operator
//! - Unknown tokens, operand underflow and leftover operands are malformed
//! - Division or remainder by zero is its own error
//! - `evaluate_or` never fails: content errors log a warning and fall back

use std::collections::HashMap;
use std::fmt::Display;

use tracing::warn;

mod sealed {
    pub trait Sealed {}
    impl Sealed for i64 {}
    impl Sealed for f32 {}
}

/// Numeric domain a formula evaluates in. Implemented for `i64`
/// (truncating division, wrapping arithmetic) and `f32`.
pub trait Operand: sealed::Sealed + Copy + PartialEq + Display {
    fn parse_literal(token: &str) -> Option<Self>;
    fn is_zero(self) -> bool;
    fn add(self, rhs: Self) -> Self;
    fn sub(self, rhs: Self) -> Self;
    fn mul(self, rhs: Self) -> Self;
    fn div(self, rhs: Self) -> Self;
    fn rem(self, rhs: Self) -> Self;
}

impl Operand for i64 {
    fn parse_literal(token: &str) -> Option<Self> {
        token.parse().ok()
    }

    fn is_zero(self) -> bool {
        self == 0
    }

    fn add(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }

    fn sub(self, rhs: Self) -> Self {
        self.wrapping_sub(rhs)
    }

    fn mul(self, rhs: Self) -> Self {
        self.wrapping_mul(rhs)
    }

    fn div(self, rhs: Self) -> Self {
        self.wrapping_div(rhs)
    }

    fn rem(self, rhs: Self) -> Self {
        self.wrapping_rem(rhs)
    }
}

impl Operand for f32 {
    fn parse_literal(token: &str) -> Option<Self> {
        token.parse().ok()
    }

    fn is_zero(self) -> bool {
        self == 0.0
    }

    fn add(self, rhs: Self) -> Self {
        self + rhs
    }

    fn sub(self, rhs: Self) -> Self {
        self - rhs
    }

    fn mul(self, rhs: Self) -> Self {
        self * rhs
    }

    fn div(self, rhs: Self) -> Self {
        self / rhs
    }

    fn rem(self, rhs: Self) -> Self {
        self % rhs
    }
}

/// Why a formula failed to evaluate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormulaError {
    /// Empty input, unknown token, operator underflow, or leftover operands.
    #[error("malformed formula `{expression}`: {reason}")]
    Malformed { expression: String, reason: String },

    /// Right operand of `/` or `%` resolved to zero.
    #[error("division by zero in formula `{expression}`")]
    DivisionByZero { expression: String },
}

impl FormulaError {
    fn malformed(expression: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "+" => Some(Self::Add),
            "-" => Some(Self::Sub),
            "*" => Some(Self::Mul),
            "/" => Some(Self::Div),
            "%" => Some(Self::Rem),
            _ => None,
        }
    }

    fn apply<T: Operand>(self, lhs: T, rhs: T) -> T {
        match self {
            Self::Add => T::add(lhs, rhs),
            Self::Sub => T::sub(lhs, rhs),
            Self::Mul => T::mul(lhs, rhs),
            Self::Div => T::div(lhs, rhs),
            Self::Rem => T::rem(lhs, rhs),
        }
    }

    fn divides(self) -> bool {
        matches!(self, Self::Div | Self::Rem)
    }
}

/// Evaluates a space-delimited postfix expression against `vars`.
///
/// A token is resolved as a variable first, then as a literal, then as an
/// operator. The expression must reduce to exactly one value.
pub fn evaluate<T: Operand>(
    expression: &str,
    vars: &HashMap<&str, T>,
) -> Result<T, FormulaError> {
    if expression.trim().is_empty() {
        return Err(FormulaError::malformed(expression, "empty expression"));
    }

    let mut stack: Vec<T> = Vec::new();
    for token in expression.split_whitespace() {
        if let Some(value) = vars.get(token) {
            stack.push(*value);
        } else if let Some(literal) = T::parse_literal(token) {
            stack.push(literal);
        } else if let Some(op) = BinaryOp::from_token(token) {
            let rhs = stack.pop().ok_or_else(|| {
                FormulaError::malformed(expression, format!("operator `{token}` needs two operands"))
            })?;
            let lhs = stack.pop().ok_or_else(|| {
                FormulaError::malformed(expression, format!("operator `{token}` needs two operands"))
            })?;
            if op.divides() && rhs.is_zero() {
                return Err(FormulaError::DivisionByZero {
                    expression: expression.to_string(),
                });
            }
            stack.push(op.apply(lhs, rhs));
        } else {
            return Err(FormulaError::malformed(
                expression,
                format!("unknown token `{token}`"),
            ));
        }
    }

    let result = stack.pop().ok_or_else(|| {
        FormulaError::malformed(expression, "expression produced no value")
    })?;
    if !stack.is_empty() {
        return Err(FormulaError::malformed(
            expression,
            format!("expression leaves {} extra operand(s)", stack.len()),
        ));
    }
    Ok(result)
}

/// Evaluates an expression, falling back to `fallback` on any error.
///
/// This is the form the composition and cast paths use: bad catalog content
/// degrades a single number with a warning instead of aborting a cast.
pub fn evaluate_or<T: Operand>(expression: &str, vars: &HashMap<&str, T>, fallback: T) -> T {
    match evaluate(expression, vars) {
        Ok(value) => value,
        Err(err) => {
            warn!("formula fell back to {fallback}: {err}");
            fallback
        }
    }
}
