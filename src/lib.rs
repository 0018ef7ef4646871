//! An interpreter for arithmetic expressions supplied as text: integers and
//! decimals combined with `+ - * / % ^`, unary sign prefixes, and nested
//! parentheses, evaluated to a single `f64`.
//!
//! The scanner ([`Cursor`]) tracks a position over the input; the evaluator
//! ([`ExpressionNode`]) drives it character by character, recursing for
//! parenthesized groups over the same cursor, and reduces the collected
//! operator/term list by precedence-ordered contraction, without ever
//! building a parse tree.
//!
//! [`evaluate`] returns NaN for anything malformed; [`try_evaluate`] turns
//! that sentinel into a diagnostic.

pub mod eval;
pub mod scan;

pub use eval::{ExpressionNode, Operator, OperatorTerm, Term, UndefinedExpressionError};
pub use scan::Cursor;

/// Evaluates `input` to an IEEE-754 double.
///
/// Malformed or empty input yields NaN rather than an error; callers
/// distinguish success from failure with a NaN check. Leading and trailing
/// whitespace is trimmed; spaces between tokens are skipped by the scanner.
pub fn evaluate(input: &str) -> f64 {
    let mut cursor = Cursor::new(input.trim());
    ExpressionNode::new().eval(&mut cursor)
}

/// Like [`evaluate`], but an undefined result becomes an error labeling the
/// offset where evaluation stopped.
///
/// Arithmetic that legitimately produces NaN (such as `0/0`) is
/// indistinguishable from malformed input and also reports as undefined.
pub fn try_evaluate(input: &str) -> Result<f64, UndefinedExpressionError> {
    let trimmed = input.trim();
    let mut cursor = Cursor::new(trimmed);
    let value = ExpressionNode::new().eval(&mut cursor);
    if value.is_nan() {
        return Err(UndefinedExpressionError::build(trimmed, cursor.position()));
    }
    Ok(value)
}
