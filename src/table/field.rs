//! Field definitions and fixed-width field encoding.

use crate::date;
use crate::table::{TableError, TableResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// xBase field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Character,
    Numeric,
    Float,
    Date,
    Logical,
    Memo,
}

impl FieldType {
    /// Map a DBF header type letter.
    pub fn from_code(code: char) -> TableResult<Self> {
        match code.to_ascii_uppercase() {
            'C' => Ok(FieldType::Character),
            'N' => Ok(FieldType::Numeric),
            'F' => Ok(FieldType::Float),
            'D' => Ok(FieldType::Date),
            'L' => Ok(FieldType::Logical),
            'M' => Ok(FieldType::Memo),
            _ => Err(TableError::InvalidFieldDef(format!(
                "unknown field type '{}'",
                code
            ))),
        }
    }

    pub fn code(&self) -> char {
        match self {
            FieldType::Character => 'C',
            FieldType::Numeric => 'N',
            FieldType::Float => 'F',
            FieldType::Date => 'D',
            FieldType::Logical => 'L',
            FieldType::Memo => 'M',
        }
    }
}

/// Schema entry for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    pub length: usize,
    pub decimals: usize,
}

impl FieldDef {
    pub fn new(name: &str, field_type: FieldType, length: usize, decimals: usize) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            field_type,
            length,
            decimals,
        }
    }

    pub fn character(name: &str, length: usize) -> Self {
        Self::new(name, FieldType::Character, length, 0)
    }

    pub fn numeric(name: &str, length: usize, decimals: usize) -> Self {
        Self::new(name, FieldType::Numeric, length, decimals)
    }

    pub fn date(name: &str) -> Self {
        Self::new(name, FieldType::Date, date::DATE8_LEN, 0)
    }

    pub fn logical(name: &str) -> Self {
        Self::new(name, FieldType::Logical, 1, 0)
    }

    pub fn memo(name: &str) -> Self {
        Self::new(name, FieldType::Memo, 10, 0)
    }

    /// Check name and width rules for a DBF field.
    pub fn validate(&self) -> TableResult<()> {
        let invalid = |reason: String| -> TableResult<()> { Err(TableError::InvalidFieldDef(reason)) };

        if self.name.is_empty() || self.name.len() > 10 {
            return invalid(format!("field name '{}' must be 1-10 characters", self.name));
        }
        if !self.name.starts_with(|c: char| c.is_ascii_alphabetic())
            || !self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return invalid(format!("field name '{}' has invalid characters", self.name));
        }

        match self.field_type {
            FieldType::Character if self.length == 0 || self.length > 254 => {
                invalid(format!("{}: character width {}", self.name, self.length))
            }
            FieldType::Numeric | FieldType::Float
                if self.length == 0 || self.length > 20 || self.decimals >= self.length =>
            {
                invalid(format!(
                    "{}: numeric width {}.{}",
                    self.name, self.length, self.decimals
                ))
            }
            FieldType::Date if self.length != date::DATE8_LEN => {
                invalid(format!("{}: date width must be 8", self.name))
            }
            FieldType::Logical if self.length != 1 => {
                invalid(format!("{}: logical width must be 1", self.name))
            }
            _ => Ok(()),
        }
    }

    /// Encode text into this field's fixed-width record bytes.
    pub fn encode(&self, text: &str) -> TableResult<Vec<u8>> {
        let out = match self.field_type {
            FieldType::Character | FieldType::Memo => {
                format!("{:<width$.width$}", text, width = self.length)
            }
            FieldType::Numeric | FieldType::Float => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    " ".repeat(self.length)
                } else {
                    let value: f64 = trimmed.parse().map_err(|_| self.bad_value(text))?;
                    let formatted = format!(
                        "{:>width$.prec$}",
                        value,
                        width = self.length,
                        prec = self.decimals
                    );
                    if formatted.len() > self.length {
                        return Err(self.bad_value(text));
                    }
                    formatted
                }
            }
            FieldType::Date => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    " ".repeat(date::DATE8_LEN)
                } else {
                    date::parse_date8(trimmed).ok_or_else(|| self.bad_value(text))?;
                    trimmed.to_string()
                }
            }
            FieldType::Logical => match text.trim().to_ascii_uppercase().as_str() {
                "T" | "Y" | ".T." | "TRUE" => "T".to_string(),
                "F" | "N" | ".F." | "FALSE" => "F".to_string(),
                "" | "?" => "?".to_string(),
                _ => return Err(self.bad_value(text)),
            },
        };
        Ok(out.into_bytes())
    }

    /// Decode this field's record bytes into a typed value.
    pub fn decode(&self, raw: &[u8]) -> TableResult<FieldValue> {
        let text = String::from_utf8_lossy(raw);
        match self.field_type {
            FieldType::Character | FieldType::Memo => Ok(FieldValue::Character(text.into_owned())),
            FieldType::Numeric | FieldType::Float => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok(FieldValue::Numeric(0.0));
                }
                trimmed
                    .parse()
                    .map(FieldValue::Numeric)
                    .map_err(|_| self.bad_value(&text))
            }
            FieldType::Date => {
                if text.trim().is_empty() {
                    return Ok(FieldValue::Date(None));
                }
                date::parse_date8(&text)
                    .map(|d| FieldValue::Date(Some(d)))
                    .ok_or_else(|| self.bad_value(&text))
            }
            FieldType::Logical => Ok(FieldValue::Logical(matches!(
                raw.first(),
                Some(b'T' | b't' | b'Y' | b'y')
            ))),
        }
    }

    fn bad_value(&self, text: &str) -> TableError {
        TableError::InvalidFieldValue {
            field: self.name.clone(),
            reason: format!("'{}' does not fit {}({})", text, self.field_type.code(), self.length),
        }
    }
}

/// A decoded field value from the current record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Character(String),
    Numeric(f64),
    /// `None` for a blank date field.
    Date(Option<NaiveDate>),
    Logical(bool),
}
