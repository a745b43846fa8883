//! Parsed expressions and the caller-facing result API.

use crate::bcd::Bcd;
use crate::config::ExpressionConfig;
use crate::date::format_date8;
use crate::expression::eval::ExpressionEvaluator;
use crate::expression::node::Node;
use crate::expression::parser::Parser;
use crate::expression::{ExpressionError, ExpressionResult, ReturnType, Value};
use crate::table::Table;
use chrono::NaiveDate;
use log::{debug, trace};
use parking_lot::{Mutex, MutexGuard};

/// A parsed expression, optionally bound to a table
///
/// The tree is built once by [`Expression::parse`] and evaluated any number
/// of times. Each call to [`Expression::evaluate`] reads the table's current
/// record afresh, so moving the table between calls yields per-record
/// results.
pub struct Expression<'t> {
    text: String,
    root: Node,
    table: Option<&'t dyn Table>,
    config: ExpressionConfig,
    evaluated: bool,
}

impl<'t> Expression<'t> {
    /// Parse with the default configuration
    pub fn parse(table: Option<&'t dyn Table>, text: &str) -> ExpressionResult<Self> {
        Self::parse_with_config(table, text, ExpressionConfig::default())
    }

    pub fn parse_with_config(
        table: Option<&'t dyn Table>,
        text: &str,
        config: ExpressionConfig,
    ) -> ExpressionResult<Self> {
        let root = Parser::new(text, table, &config)?.parse()?;
        debug!(
            "Parsed expression '{}': {} nodes, returns {} ({})",
            text,
            root.node_count(),
            root.return_type,
            root.result_len
        );

        Ok(Self {
            text: text.to_string(),
            root,
            table,
            config,
            evaluated: false,
        })
    }

    /// Evaluate against the table's current record
    pub fn evaluate(&mut self) -> ExpressionResult<()> {
        self.evaluated = false;
        ExpressionEvaluator::new(self.table, &self.config).evaluate(&mut self.root)?;
        self.evaluated = true;
        trace!("Evaluated '{}' = {:?}", self.text, self.root.result());
        Ok(())
    }

    /// Evaluate and return a copy of the result
    pub fn evaluate_value(&mut self) -> ExpressionResult<Value> {
        self.evaluate()?;
        self.value().cloned()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn table(&self) -> Option<&'t dyn Table> {
        self.table
    }

    pub fn config(&self) -> &ExpressionConfig {
        &self.config
    }

    pub fn return_type(&self) -> ReturnType {
        self.root.return_type
    }

    /// Width of the result when written to a key buffer
    pub fn result_len(&self) -> usize {
        self.root.result_len
    }

    /// Result of the most recent successful evaluation
    pub fn value(&self) -> ExpressionResult<&Value> {
        if !self.evaluated {
            return Err(ExpressionError::NotEvaluated);
        }
        self.root.result().ok_or(ExpressionError::NotEvaluated)
    }

    pub fn character_result(&self) -> ExpressionResult<&str> {
        match self.typed_value(ReturnType::Character)? {
            Value::Character(s) => Ok(s),
            other => Err(self.wrong_type(ReturnType::Character, other)),
        }
    }

    pub fn numeric_result(&self) -> ExpressionResult<f64> {
        match self.typed_value(ReturnType::Numeric)? {
            Value::Numeric(n) => Ok(*n),
            other => Err(self.wrong_type(ReturnType::Numeric, other)),
        }
    }

    /// Numeric result as a packed decimal
    pub fn bcd_result(&self) -> ExpressionResult<Bcd> {
        Ok(Bcd::from_f64(self.numeric_result()?)?)
    }

    /// Date result; `None` is a blank date
    pub fn date_result(&self) -> ExpressionResult<Option<NaiveDate>> {
        match self.typed_value(ReturnType::Date)? {
            Value::Date(d) => Ok(*d),
            other => Err(self.wrong_type(ReturnType::Date, other)),
        }
    }

    pub fn logical_result(&self) -> ExpressionResult<bool> {
        match self.typed_value(ReturnType::Logical)? {
            Value::Logical(b) => Ok(*b),
            other => Err(self.wrong_type(ReturnType::Logical, other)),
        }
    }

    /// Result encoded as an index key
    ///
    /// Character results are blank padded or cut to [`Self::result_len`]
    /// characters and then UTF-8 encoded, numerics become the 12 byte packed decimal form, dates are `CCYYMMDD`
    /// (eight blanks when empty) and logicals are `T` or `F`.
    pub fn index_key(&self) -> ExpressionResult<Vec<u8>> {
        let key = match self.value()? {
            Value::Character(s) => {
                let width = self.result_len();
                let used = s.chars().count().min(width);
                let mut key: String = s.chars().take(width).collect();
                key.extend(std::iter::repeat(' ').take(width - used));
                key.into_bytes()
            }
            Value::Numeric(n) => Bcd::from_f64(*n)?.to_bytes().to_vec(),
            Value::Date(d) => format_date8(*d).into_bytes(),
            Value::Logical(b) => vec![if *b { b'T' } else { b'F' }],
        };
        Ok(key)
    }

    /// Indented listing of the tree with any results from the last pass
    pub fn dump_tree(&self) -> String {
        self.root.to_string()
    }

    fn typed_value(&self, requested: ReturnType) -> ExpressionResult<&Value> {
        if self.return_type() != requested {
            return Err(ExpressionError::WrongResultType {
                requested,
                actual: self.return_type(),
            });
        }
        self.value()
    }

    fn wrong_type(&self, requested: ReturnType, value: &Value) -> ExpressionError {
        ExpressionError::WrongResultType {
            requested,
            actual: value.return_type(),
        }
    }
}

/// An expression shared between threads
///
/// Evaluation writes into the tree's result slots, so callers take the
/// lock for the whole evaluate-then-read sequence.
pub struct SharedExpression<'t> {
    inner: Mutex<Expression<'t>>,
}

impl<'t> SharedExpression<'t> {
    pub fn new(expression: Expression<'t>) -> Self {
        Self {
            inner: Mutex::new(expression),
        }
    }

    /// Evaluate and copy out the result under one lock
    pub fn evaluate_value(&self) -> ExpressionResult<Value> {
        self.inner.lock().evaluate_value()
    }

    pub fn evaluate_logical(&self) -> ExpressionResult<bool> {
        let mut expression = self.inner.lock();
        expression.evaluate()?;
        expression.logical_result()
    }

    pub fn lock(&self) -> MutexGuard<'_, Expression<'t>> {
        self.inner.lock()
    }

    pub fn into_inner(self) -> Expression<'t> {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{FieldDef, MemoryTable, RecordCursor};
    use std::sync::Arc;
    use std::thread;

    fn table() -> MemoryTable {
        let table = MemoryTable::new(
            "stock",
            vec![
                FieldDef::character("item", 6),
                FieldDef::numeric("qty", 5, 0),
                FieldDef::date("due"),
            ],
        )
        .unwrap();
        table.append(&["bolt", "120", "20171014"]).unwrap();
        table.append(&["nut", "7", ""]).unwrap();
        table
    }

    #[test]
    fn test_getters_before_evaluation() {
        let expr = Expression::parse(None, "1+1").unwrap();
        assert_eq!(expr.return_type(), ReturnType::Numeric);
        assert!(matches!(expr.value(), Err(ExpressionError::NotEvaluated)));
        assert!(matches!(
            expr.numeric_result(),
            Err(ExpressionError::NotEvaluated)
        ));
    }

    #[test]
    fn test_typed_getters() {
        let mut expr = Expression::parse(None, "'ab' + 'cd'").unwrap();
        expr.evaluate().unwrap();
        assert_eq!(expr.character_result().unwrap(), "abcd");
        assert!(matches!(
            expr.numeric_result(),
            Err(ExpressionError::WrongResultType {
                requested: ReturnType::Numeric,
                actual: ReturnType::Character
            })
        ));

        let mut expr = Expression::parse(None, "3 > 2").unwrap();
        expr.evaluate().unwrap();
        assert!(expr.logical_result().unwrap());

        let mut expr = Expression::parse(None, "STOD('20171014')").unwrap();
        expr.evaluate().unwrap();
        assert_eq!(
            expr.date_result().unwrap(),
            NaiveDate::from_ymd_opt(2017, 10, 14)
        );
    }

    #[test]
    fn test_failed_evaluation_clears_result() {
        let table = table();
        let mut expr = Expression::parse(Some(&table), "100 / (qty - 7)").unwrap();
        table.goto_record(1).unwrap();
        expr.evaluate().unwrap();
        assert!(expr.numeric_result().is_ok());

        table.goto_record(2).unwrap();
        assert!(matches!(
            expr.evaluate(),
            Err(ExpressionError::DivisionByZero)
        ));
        assert!(matches!(expr.value(), Err(ExpressionError::NotEvaluated)));
    }

    #[test]
    fn test_reevaluation_follows_current_record() {
        let table = table();
        let mut expr = Expression::parse(Some(&table), "item + STR(qty, 4)").unwrap();
        assert_eq!(expr.result_len(), 10);

        table.goto_record(1).unwrap();
        expr.evaluate().unwrap();
        assert_eq!(expr.character_result().unwrap(), "bolt   120");

        table.goto_record(2).unwrap();
        expr.evaluate().unwrap();
        assert_eq!(expr.character_result().unwrap(), "nut      7");
    }

    #[test]
    fn test_index_keys() {
        let table = table();
        table.goto_record(1).unwrap();

        let mut expr = Expression::parse(Some(&table), "TRIM(item)").unwrap();
        expr.evaluate().unwrap();
        assert_eq!(expr.index_key().unwrap(), b"bolt  ".to_vec());

        let mut expr = Expression::parse(Some(&table), "due").unwrap();
        expr.evaluate().unwrap();
        assert_eq!(expr.index_key().unwrap(), b"20171014".to_vec());
        table.goto_record(2).unwrap();
        expr.evaluate().unwrap();
        assert_eq!(expr.index_key().unwrap(), b"        ".to_vec());

        let mut expr = Expression::parse(Some(&table), "qty").unwrap();
        expr.evaluate().unwrap();
        assert_eq!(
            expr.index_key().unwrap(),
            Bcd::from_f64(7.0).unwrap().to_bytes().to_vec()
        );

        let mut expr = Expression::parse(None, ".NOT. .T.").unwrap();
        expr.evaluate().unwrap();
        assert_eq!(expr.index_key().unwrap(), b"F".to_vec());
    }

    #[test]
    fn test_index_key_counts_characters() {
        let mut expr = Expression::parse(None, "'café' + 'ñ'").unwrap();
        assert_eq!(expr.result_len(), 5);
        expr.evaluate().unwrap();
        assert_eq!(expr.index_key().unwrap(), "caféñ".as_bytes().to_vec());

        let mut expr = Expression::parse(None, "TRIM('über ') + '  '").unwrap();
        expr.evaluate().unwrap();
        let key = expr.index_key().unwrap();
        assert_eq!(String::from_utf8(key).unwrap(), "über   ");

        let mut expr = Expression::parse(None, "LEFT('naïve', 3)").unwrap();
        expr.evaluate().unwrap();
        assert_eq!(expr.index_key().unwrap(), "naï".as_bytes().to_vec());
    }

    #[test]
    fn test_dump_tree_shows_results() {
        let mut expr = Expression::parse(None, "2+3*4").unwrap();
        expr.evaluate().unwrap();
        let dump = expr.dump_tree();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "Operator + w6 '2+3*4' type=N len=4 = 14");
        assert_eq!(lines[2], "  Operator * w7 '3*4' type=N len=4 = 12");
    }

    #[test]
    fn test_shared_expression_across_threads() {
        let shared = Arc::new(SharedExpression::new(
            Expression::parse(None, "LEN('abc') * 2 = 6").unwrap(),
        ));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || shared.evaluate_logical().unwrap())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(shared.lock().text(), "LEN('abc') * 2 = 6");
    }
}
