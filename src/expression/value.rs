//! Result types and typed values carried through an expression tree.

use crate::table::{FieldType, FieldValue};
use chrono::NaiveDate;
use std::fmt;

/// Longest Character result an expression may produce, in characters.
pub const MAX_CHARACTER_LEN: usize = 65_535;

/// Static result type of an expression node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnType {
    Character,
    Numeric,
    Date,
    Logical,
}

impl ReturnType {
    /// Type produced by reading a field, `None` for fields expressions cannot use.
    pub fn from_field_type(field_type: FieldType) -> Option<Self> {
        match field_type {
            FieldType::Character => Some(ReturnType::Character),
            FieldType::Numeric | FieldType::Float => Some(ReturnType::Numeric),
            FieldType::Date => Some(ReturnType::Date),
            FieldType::Logical => Some(ReturnType::Logical),
            FieldType::Memo => None,
        }
    }

    /// Single letter code, as used in xBase type listings.
    pub fn code(&self) -> char {
        match self {
            ReturnType::Character => 'C',
            ReturnType::Numeric => 'N',
            ReturnType::Date => 'D',
            ReturnType::Logical => 'L',
        }
    }

    /// Result length of a node of this type when it is not structural.
    pub fn fixed_len(&self) -> usize {
        match self {
            ReturnType::Character => 0,
            ReturnType::Numeric => 4,
            ReturnType::Date => 8,
            ReturnType::Logical => 1,
        }
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReturnType::Character => "Character",
            ReturnType::Numeric => "Numeric",
            ReturnType::Date => "Date",
            ReturnType::Logical => "Logical",
        };
        f.write_str(name)
    }
}

/// A typed value held in a node's result slot
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Character(String),
    Numeric(f64),
    /// `None` is the blank date; it sorts before every real date.
    Date(Option<NaiveDate>),
    Logical(bool),
}

impl Value {
    pub fn return_type(&self) -> ReturnType {
        match self {
            Value::Character(_) => ReturnType::Character,
            Value::Numeric(_) => ReturnType::Numeric,
            Value::Date(_) => ReturnType::Date,
            Value::Logical(_) => ReturnType::Logical,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Character(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Numeric(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<Option<NaiveDate>> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Logical(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Character(s) => Value::Character(s),
            FieldValue::Numeric(n) => Value::Numeric(n),
            FieldValue::Date(d) => Value::Date(d),
            FieldValue::Logical(b) => Value::Logical(b),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Character(s) => write!(f, "\"{}\"", s),
            Value::Numeric(n) => write!(f, "{}", n),
            Value::Date(Some(d)) => write!(f, "{}", d.format("%Y%m%d")),
            Value::Date(None) => write!(f, "{{  /  /  }}"),
            Value::Logical(true) => write!(f, ".T."),
            Value::Logical(false) => write!(f, ".F."),
        }
    }
}
