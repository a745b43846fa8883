pub mod bcd;
pub mod config;
pub mod date;
pub mod expression;
pub mod filter;
pub mod table;

pub use bcd::{Bcd, BcdError};
pub use config::ExpressionConfig;
pub use expression::{
    Expression, ExpressionError, ExpressionResult, ReturnType, SharedExpression, Value,
};
pub use filter::Filter;
pub use table::{
    FieldDef, FieldType, FieldValue, MemoryTable, RecordCursor, Table, TableError, TableResult,
    TableSpec,
};
