//! xBase expression engine.
//!
//! This module provides:
//! - Tokenizing of dBASE expression text (`lexer`, `token`)
//! - Field name resolution against the bound table (`binder`)
//! - A recursive descent parser that checks types while it builds the
//!   tree (`parser`, `node`)
//! - The built-in function catalog (`function`)
//! - Post-order evaluation against a table's current record (`eval`)
//! - [`Expression`], the parsed handle callers evaluate and read results from

pub mod binder;
pub mod compiled;
pub mod error;
pub mod eval;
pub mod function;
pub mod lexer;
pub mod node;
pub mod operator;
pub mod parser;
pub mod token;
pub mod value;

pub use binder::{bind_field, FieldBinding};
pub use compiled::{Expression, SharedExpression};
pub use error::{ExpressionError, ExpressionResult};
pub use eval::ExpressionEvaluator;
pub use function::{FunctionContext, FunctionDef};
pub use node::{Node, NodeKind};
pub use operator::{BinaryOperator, Operator, UnaryOperator};
pub use parser::Parser;
pub use value::{ReturnType, Value, MAX_CHARACTER_LEN};
