//! Record filter.
//!
//! A [`Filter`] walks a table through its [`RecordCursor`] and stops only on
//! records for which a Logical expression holds, the way a dBASE
//! `SET FILTER TO` condition hides every other record from navigation.
//! Deleted records are skipped unless the filter is told to include them.

use crate::config::ExpressionConfig;
use crate::expression::{Expression, ExpressionError, ExpressionResult, ReturnType};
use crate::table::{RecordCursor, Table};
use log::{debug, warn};

/// Navigation over the records that satisfy a Logical expression
pub struct Filter<'t, C: RecordCursor> {
    /// Cursor that is moved onto matching records
    cursor: &'t C,
    /// Condition, bound to the cursor's table
    expression: Expression<'t>,
    include_deleted: bool,
}

impl<'t, C: RecordCursor> Filter<'t, C> {
    /// Create a filter with the default expression configuration
    pub fn new(cursor: &'t C, condition: &str) -> ExpressionResult<Self> {
        Self::with_config(cursor, condition, ExpressionConfig::default())
    }

    /// Create a filter
    ///
    /// # Arguments
    /// * `cursor` - The table to navigate
    /// * `condition` - Expression text that must evaluate to Logical
    /// * `config` - Configuration used to parse the condition
    pub fn with_config(
        cursor: &'t C,
        condition: &str,
        config: ExpressionConfig,
    ) -> ExpressionResult<Self> {
        let table: &'t dyn Table = cursor;
        let expression = Expression::parse_with_config(Some(table), condition, config)?;
        if expression.return_type() != ReturnType::Logical {
            return Err(ExpressionError::incompatible(
                "filter",
                &[expression.return_type()],
            ));
        }

        Ok(Self {
            cursor,
            expression,
            include_deleted: false,
        })
    }

    /// Also stop on records flagged as deleted
    pub fn include_deleted(mut self, include: bool) -> Self {
        self.include_deleted = include;
        self
    }

    pub fn expression(&self) -> &Expression<'t> {
        &self.expression
    }

    /// Whether the cursor's current record passes the filter
    pub fn matches_current(&mut self) -> ExpressionResult<bool> {
        if !self.include_deleted && self.cursor.is_current_record_deleted()? {
            return Ok(false);
        }
        self.expression.evaluate()?;
        self.expression.logical_result()
    }

    /// Move to the first matching record
    pub fn first(&mut self) -> ExpressionResult<Option<u32>> {
        let count = self.cursor.record_count()?;
        self.scan(1..=count)
    }

    /// Move to the last matching record
    pub fn last(&mut self) -> ExpressionResult<Option<u32>> {
        let count = self.cursor.record_count()?;
        self.scan((1..=count).rev())
    }

    /// Move to the next matching record after the current one
    pub fn next(&mut self) -> ExpressionResult<Option<u32>> {
        let count = self.cursor.record_count()?;
        let from = self.cursor.current_record_number() + 1;
        self.scan(from..=count)
    }

    /// Move to the nearest matching record before the current one
    pub fn prev(&mut self) -> ExpressionResult<Option<u32>> {
        let current = self.cursor.current_record_number();
        if current <= 1 {
            return Ok(None);
        }
        self.scan((1..current).rev())
    }

    /// Record numbers of every matching record, in table order
    ///
    /// The cursor is left where it was before the call, also on error.
    pub fn matching_records(&mut self) -> ExpressionResult<Vec<u32>> {
        let start = self.cursor.current_record_number();
        let count = self.cursor.record_count()?;

        let mut matches = Vec::new();
        for recno in 1..=count {
            if self.visit(recno, start)? {
                matches.push(recno);
            }
        }

        if start != 0 {
            self.cursor.goto_record(start)?;
        }
        debug!(
            "Filter '{}' matched {} of {} records",
            self.expression.text(),
            matches.len(),
            count
        );
        Ok(matches)
    }

    /// Stop on the first match in `records`; when nothing matches, or a
    /// record fails to evaluate, the cursor returns to where it started.
    fn scan(&mut self, records: impl Iterator<Item = u32>) -> ExpressionResult<Option<u32>> {
        let start = self.cursor.current_record_number();

        for recno in records {
            if self.visit(recno, start)? {
                return Ok(Some(recno));
            }
        }

        if start != 0 {
            self.cursor.goto_record(start)?;
        }
        Ok(None)
    }

    /// Test record `recno`, moving back to `start` if that fails.
    fn visit(&mut self, recno: u32, start: u32) -> ExpressionResult<bool> {
        let result = match self.cursor.goto_record(recno) {
            Ok(()) => self.matches_current(),
            Err(e) => Err(e.into()),
        };
        if result.is_err() && start != 0 {
            if let Err(e) = self.cursor.goto_record(start) {
                warn!("Failed to return filter cursor to record {}: {}", start, e);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{FieldDef, MemoryTable};

    fn orders() -> MemoryTable {
        let table = MemoryTable::new(
            "orders",
            vec![
                FieldDef::character("customer", 8),
                FieldDef::numeric("amount", 7, 2),
                FieldDef::logical("paid"),
            ],
        )
        .unwrap();
        for (customer, amount, paid) in [
            ("ACME", "120.50", "T"),
            ("GLOBEX", "15.00", "F"),
            ("ACME", "99.99", "F"),
            ("INITECH", "300.00", "T"),
            ("ACME", "42.00", "T"),
        ] {
            table.append(&[customer, amount, paid]).unwrap();
        }
        table
    }

    #[test]
    fn test_filter_basic() {
        let table = orders();
        let mut filter = Filter::new(&table, "customer = 'ACME'").unwrap();

        assert_eq!(filter.first().unwrap(), Some(1));
        assert_eq!(filter.next().unwrap(), Some(3));
        assert_eq!(filter.next().unwrap(), Some(5));
        assert_eq!(filter.next().unwrap(), None);
        // No match leaves the cursor in place
        assert_eq!(table.current_record_number(), 5);

        assert_eq!(filter.prev().unwrap(), Some(3));
        assert_eq!(filter.last().unwrap(), Some(5));
    }

    #[test]
    fn test_filter_all_matching() {
        let table = orders();
        let mut filter = Filter::new(&table, "amount > 50 .AND. paid").unwrap();
        assert_eq!(filter.matching_records().unwrap(), vec![1, 4]);
    }

    #[test]
    fn test_filter_no_match() {
        let table = orders();
        let mut filter = Filter::new(&table, "amount > 1000").unwrap();
        assert_eq!(filter.first().unwrap(), None);
        assert!(filter.matching_records().unwrap().is_empty());
    }

    #[test]
    fn test_filter_skips_deleted_records() {
        let table = orders();
        table.goto_record(3).unwrap();
        table.delete_record().unwrap();

        let mut filter = Filter::new(&table, "customer = 'ACME'").unwrap();
        assert_eq!(filter.matching_records().unwrap(), vec![1, 5]);

        let mut filter = Filter::new(&table, "customer = 'ACME'")
            .unwrap()
            .include_deleted(true);
        assert_eq!(filter.matching_records().unwrap(), vec![1, 3, 5]);

        let mut filter = Filter::new(&table, "DELETED()")
            .unwrap()
            .include_deleted(true);
        assert_eq!(filter.matching_records().unwrap(), vec![3]);
    }

    #[test]
    fn test_filter_error_restores_cursor() {
        let table = orders();
        table.goto_record(1).unwrap();
        let mut filter = Filter::new(&table, "100 / (amount - 15) > 1").unwrap();

        assert!(matches!(
            filter.matching_records(),
            Err(ExpressionError::DivisionByZero)
        ));
        assert_eq!(table.current_record_number(), 1);

        assert!(matches!(filter.first(), Err(ExpressionError::DivisionByZero)));
        assert_eq!(table.current_record_number(), 1);

        table.goto_record(3).unwrap();
        assert!(matches!(filter.prev(), Err(ExpressionError::DivisionByZero)));
        assert_eq!(table.current_record_number(), 3);
    }

    #[test]
    fn test_filter_requires_logical_expression() {
        let table = orders();
        assert!(matches!(
            Filter::new(&table, "amount * 2"),
            Err(ExpressionError::IncompatibleOperands { .. })
        ));
        assert!(matches!(
            Filter::new(&table, "nosuchfield"),
            Err(ExpressionError::InvalidFieldName { .. })
        ));
    }
}
