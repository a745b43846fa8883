//! Table collaborator contract consumed by the expression engine.
//!
//! The engine never touches table files directly. Everything it needs from
//! a table goes through the [`Table`] trait:
//!
//! - **Schema**: field names, types and widths
//! - **Current record**: typed field values and the deletion flag
//! - **Counts**: current record number and total record count
//!
//! [`RecordCursor`] adds positioning for callers that walk a table, such as
//! the record filter. [`MemoryTable`] is an in-memory, DBF-shaped table that
//! implements both.

pub mod error;
pub mod field;
pub mod memory;

pub use error::{TableError, TableResult};
pub use field::{FieldDef, FieldType, FieldValue};
pub use memory::{MemoryTable, TableSpec};

/// Schema and current-record access for one open table.
pub trait Table: Send + Sync {
    /// Table name, matched against `ALIAS->FIELD` qualifiers.
    fn name(&self) -> &str;

    /// Field definitions in record order.
    fn fields(&self) -> &[FieldDef];

    fn field_count(&self) -> usize {
        self.fields().len()
    }

    /// Case-insensitive field lookup.
    fn field_index(&self, name: &str) -> Option<usize> {
        self.fields()
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
    }

    fn field(&self, index: usize) -> Option<&FieldDef> {
        self.fields().get(index)
    }

    /// Typed value of a field in the current record.
    fn field_value(&self, index: usize) -> TableResult<FieldValue>;

    /// One-based number of the current record, 0 when none is loaded.
    fn current_record_number(&self) -> u32;

    fn record_count(&self) -> TableResult<u32>;

    fn is_current_record_deleted(&self) -> TableResult<bool>;
}

/// A table whose current record can be moved.
pub trait RecordCursor: Table {
    /// Make `recno` (one-based) the current record.
    fn goto_record(&self, recno: u32) -> TableResult<()>;
}
