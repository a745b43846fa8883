//! Field name resolution against the bound table.

use crate::expression::{ExpressionError, ExpressionResult, ReturnType};
use crate::table::{FieldType, Table};

/// A field name resolved to its position and expression type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldBinding {
    pub index: usize,
    pub field_type: FieldType,
    pub return_type: ReturnType,
    /// Character fields keep their width; other types use the fixed length
    pub result_len: usize,
}

/// Resolve `name`, optionally qualified as `alias->name`.
///
/// The alias must equal the table name, ignoring case. Memo fields cannot
/// appear in expressions. Every failure, including having no table bound,
/// is reported as `InvalidFieldName` carrying the name as written.
pub fn bind_field(
    table: Option<&dyn Table>,
    alias: Option<&str>,
    name: &str,
) -> ExpressionResult<FieldBinding> {
    let invalid = || ExpressionError::InvalidFieldName {
        name: match alias {
            Some(alias) => format!("{}->{}", alias, name),
            None => name.to_string(),
        },
    };

    let table = table.ok_or_else(invalid)?;
    if alias.is_some_and(|alias| !table.name().eq_ignore_ascii_case(alias)) {
        return Err(invalid());
    }

    let index = table.field_index(name).ok_or_else(invalid)?;
    let def = table.field(index).ok_or_else(invalid)?;
    let return_type = ReturnType::from_field_type(def.field_type).ok_or_else(invalid)?;
    let result_len = match return_type {
        ReturnType::Character => def.length,
        other => other.fixed_len(),
    };

    Ok(FieldBinding {
        index,
        field_type: def.field_type,
        return_type,
        result_len,
    })
}
