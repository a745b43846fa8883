//! Error types for expression parsing and evaluation.

use crate::bcd::BcdError;
use crate::expression::ReturnType;
use crate::table::TableError;
use thiserror::Error;

/// Errors that can occur while parsing or evaluating an expression
#[derive(Error, Debug)]
pub enum ExpressionError {
    /// Malformed grammar
    #[error("Invalid expression at position {position}: {reason}")]
    InvalidExpression { position: usize, reason: String },

    #[error("Unbalanced parentheses")]
    UnbalancedParens,

    #[error("Unterminated quote starting at position {position}")]
    UnbalancedQuotes { position: usize },

    /// Identifier that does not name a usable field of the bound table
    #[error("Invalid field name: {name}")]
    InvalidFieldName { name: String },

    #[error("Unknown function: {name}")]
    InvalidFunction { name: String },

    /// Wrong argument count, or a call the current binding cannot satisfy
    #[error("Invalid parameters for {function}(): {reason}")]
    InvalidParm { function: String, reason: String },

    #[error("Inconsistent parameter lengths for {function}(): {left} and {right}")]
    InconsistentParmLens {
        function: String,
        left: usize,
        right: usize,
    },

    #[error("Incompatible operands for {operator}: {}", format_types(.operands))]
    IncompatibleOperands {
        operator: String,
        operands: Vec<ReturnType>,
    },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid date: '{text}'")]
    InvalidDate { text: String },

    /// Typed getter called for a type the expression does not return
    #[error("Expression returns {actual}, not {requested}")]
    WrongResultType {
        requested: ReturnType,
        actual: ReturnType,
    },

    #[error("Expression has not been evaluated")]
    NotEvaluated,

    #[error("Numeric error: {0}")]
    Numeric(#[from] BcdError),

    /// Failure reported by the table collaborator, passed through unchanged
    #[error(transparent)]
    Table(#[from] TableError),
}

fn format_types(types: &[ReturnType]) -> String {
    types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ExpressionError {
    /// Legacy xBase return code for this error.
    pub fn code(&self) -> i16 {
        match self {
            ExpressionError::InvalidExpression { .. } => -500,
            ExpressionError::InvalidFunction { .. } => -501,
            ExpressionError::InvalidParm { .. } => -502,
            ExpressionError::InconsistentParmLens { .. } => -503,
            ExpressionError::IncompatibleOperands { .. } => -504,
            ExpressionError::UnbalancedParens => -505,
            ExpressionError::UnbalancedQuotes { .. } => -506,
            ExpressionError::WrongResultType { .. }
            | ExpressionError::NotEvaluated
            | ExpressionError::DivisionByZero
            | ExpressionError::Numeric(_) => -507,
            ExpressionError::InvalidFieldName { .. } => -303,
            ExpressionError::InvalidDate { .. } => -307,
            ExpressionError::Table(e) => e.code(),
        }
    }

    pub(crate) fn incompatible(operator: &str, operands: &[ReturnType]) -> Self {
        ExpressionError::IncompatibleOperands {
            operator: operator.to_string(),
            operands: operands.to_vec(),
        }
    }
}

/// Result type for expression operations
pub type ExpressionResult<T> = Result<T, ExpressionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExpressionError::IncompatibleOperands {
            operator: "+".to_string(),
            operands: vec![ReturnType::Character, ReturnType::Numeric],
        };
        assert_eq!(
            err.to_string(),
            "Incompatible operands for +: Character, Numeric"
        );

        let err = ExpressionError::InvalidFieldName {
            name: "NOPE".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid field name: NOPE");

        let err = ExpressionError::WrongResultType {
            requested: ReturnType::Date,
            actual: ReturnType::Numeric,
        };
        assert_eq!(err.to_string(), "Expression returns Numeric, not Date");

        let err = ExpressionError::InvalidParm {
            function: "SUBSTR".to_string(),
            reason: "expected 3 arguments, got 2".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid parameters for SUBSTR(): expected 3 arguments, got 2"
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ExpressionError::UnbalancedParens.code(), -505);
        assert_eq!(ExpressionError::UnbalancedQuotes { position: 0 }.code(), -506);
        assert_eq!(
            ExpressionError::InvalidFunction {
                name: "FOO".to_string()
            }
            .code(),
            -501
        );
        assert_eq!(
            ExpressionError::Table(TableError::NoCurrentRecord).code(),
            -214
        );
    }

    #[test]
    fn test_table_error_passes_through() {
        let err: ExpressionError = TableError::NoCurrentRecord.into();
        assert_eq!(err.to_string(), "No current record");
    }
}
