//! Expression engine configuration.

use crate::date;
use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// Settings consulted while parsing and evaluating expressions.
///
/// Passed explicitly to [`crate::Expression::parse_with_config`]; the engine
/// keeps no process-wide defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionConfig {
    /// Picture used by `DTOC()` output and `CTOD()` / date literal input.
    pub date_format: String,

    /// Year the two digit century window is centred on. Defaults to the
    /// current year when unset.
    pub century_reference_year: Option<i32>,
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        Self {
            date_format: "MM/DD/YY".to_string(),
            century_reference_year: None,
        }
    }
}

impl ExpressionConfig {
    pub fn with_date_format(mut self, format: &str) -> Self {
        self.date_format = format.to_string();
        self
    }

    pub fn with_century_reference_year(mut self, year: i32) -> Self {
        self.century_reference_year = Some(year);
        self
    }

    pub fn reference_year(&self) -> i32 {
        self.century_reference_year
            .unwrap_or_else(|| date::today().year())
    }

    /// Width of a date rendered with the configured picture.
    pub fn date_format_width(&self) -> usize {
        date::picture_width(&self.date_format)
    }
}
