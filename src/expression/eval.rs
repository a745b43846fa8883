//! Expression evaluation implementation.
//!
//! Evaluation is a post-order walk: every child is evaluated before its
//! parent, and each node's result slot is overwritten with the value it
//! produced on this pass. `.AND.` and `.OR.` skip their right operand when
//! the left one decides the result; the skipped subtree's slots are cleared
//! so no value from an earlier pass survives in the tree.

use crate::bcd::Bcd;
use crate::config::ExpressionConfig;
use crate::date::julian_day;
use crate::expression::function::{add_days, FunctionContext};
use crate::expression::node::{Node, NodeKind};
use crate::expression::operator::{BinaryOperator, Operator, UnaryOperator};
use crate::expression::{ExpressionError, ExpressionResult, Value};
use crate::table::Table;
use std::cmp::Ordering;

/// Evaluator for parsed expression trees
pub struct ExpressionEvaluator<'a> {
    /// Table whose current record supplies field values
    table: Option<&'a dyn Table>,
    config: &'a ExpressionConfig,
}

impl<'a> ExpressionEvaluator<'a> {
    pub fn new(table: Option<&'a dyn Table>, config: &'a ExpressionConfig) -> Self {
        Self { table, config }
    }

    /// Evaluate a subtree, leaving the result in `node`'s slot
    pub fn evaluate(&self, node: &mut Node) -> ExpressionResult<()> {
        let value = match &mut node.kind {
            NodeKind::Constant(value) => value.clone(),

            NodeKind::FieldReference { index, .. } => self.evaluate_field(*index)?,

            NodeKind::FunctionCall { function, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args.iter_mut() {
                    values.push(self.evaluate_child(arg)?);
                }
                let ctx = FunctionContext {
                    table: self.table,
                    config: self.config,
                };
                function.call(&ctx, &values)?
            }

            NodeKind::Operator { op, operands, .. } => match (*op, operands.as_mut_slice()) {
                (Operator::Binary(op), [left, right]) => {
                    self.evaluate_binary(op, left, right)?
                }
                (Operator::Unary(op), [operand]) => {
                    let operand = self.evaluate_child(operand)?;
                    evaluate_unary(op, operand)?
                }
                (op, operands) => {
                    return Err(ExpressionError::InvalidExpression {
                        position: node.span.start,
                        reason: format!(
                            "operator {} has {} operands",
                            op.as_str(),
                            operands.len()
                        ),
                    })
                }
            },
        };

        node.set_result(value);
        Ok(())
    }

    fn evaluate_child(&self, node: &mut Node) -> ExpressionResult<Value> {
        self.evaluate(node)?;
        node.result().cloned().ok_or(ExpressionError::NotEvaluated)
    }

    fn evaluate_field(&self, index: usize) -> ExpressionResult<Value> {
        let table = self.table.ok_or_else(|| ExpressionError::InvalidFieldName {
            name: format!("#{}", index),
        })?;
        Ok(Value::from(table.field_value(index)?))
    }

    fn evaluate_binary(
        &self,
        op: BinaryOperator,
        left: &mut Node,
        right: &mut Node,
    ) -> ExpressionResult<Value> {
        let left_val = self.evaluate_child(left)?;

        // Short-circuit logical operators
        match (op, &left_val) {
            (BinaryOperator::And, Value::Logical(false)) | (BinaryOperator::Or, Value::Logical(true)) => {
                clear_results(right);
                return Ok(left_val);
            }
            _ => {}
        }

        let right_val = self.evaluate_child(right)?;
        evaluate_binary_op(op, left_val, right_val)
    }
}

/// Drop the result slots of a subtree that was not evaluated this pass
fn clear_results(node: &mut Node) {
    node.take_result();
    match &mut node.kind {
        NodeKind::FunctionCall { args: children, .. }
        | NodeKind::Operator {
            operands: children, ..
        } => children.iter_mut().for_each(clear_results),
        NodeKind::Constant(_) | NodeKind::FieldReference { .. } => {}
    }
}

fn evaluate_binary_op(op: BinaryOperator, left: Value, right: Value) -> ExpressionResult<Value> {
    use BinaryOperator::*;

    if op.is_relational() {
        return compare(op, &left, &right).map(Value::Logical);
    }

    match (op, left, right) {
        (Add, Value::Character(a), Value::Character(b)) => Ok(Value::Character(a + &b)),
        (Sub, Value::Character(a), Value::Character(b)) => Ok(Value::Character(
            concat_trimmed(&a, &b),
        )),

        (Add, Value::Numeric(a), Value::Numeric(b)) => Ok(Value::Numeric(a + b)),
        (Sub, Value::Numeric(a), Value::Numeric(b)) => Ok(Value::Numeric(a - b)),
        (Mul, Value::Numeric(a), Value::Numeric(b)) => Ok(Value::Numeric(a * b)),
        (Div, Value::Numeric(a), Value::Numeric(b)) => {
            if b == 0.0 {
                return Err(ExpressionError::DivisionByZero);
            }
            Ok(Value::Numeric(a / b))
        }
        (Mod, Value::Numeric(a), Value::Numeric(b)) => {
            if b == 0.0 {
                return Err(ExpressionError::DivisionByZero);
            }
            Ok(Value::Numeric(a % b))
        }
        (Pow, Value::Numeric(a), Value::Numeric(b)) => Ok(Value::Numeric(a.powf(b))),

        (Add, Value::Date(d), Value::Numeric(n)) | (Add, Value::Numeric(n), Value::Date(d)) => {
            Ok(Value::Date(add_days(d, n)?))
        }
        (Sub, Value::Date(d), Value::Numeric(n)) => Ok(Value::Date(add_days(d, -n)?)),
        (Sub, Value::Date(a), Value::Date(b)) => {
            let days = match (a, b) {
                (Some(a), Some(b)) => julian_day(a) - julian_day(b),
                _ => 0,
            };
            Ok(Value::Numeric(days as f64))
        }

        (And, Value::Logical(a), Value::Logical(b)) => Ok(Value::Logical(a && b)),
        (Or, Value::Logical(a), Value::Logical(b)) => Ok(Value::Logical(a || b)),

        (op, left, right) => Err(ExpressionError::incompatible(
            op.as_str(),
            &[left.return_type(), right.return_type()],
        )),
    }
}

fn evaluate_unary(op: UnaryOperator, operand: Value) -> ExpressionResult<Value> {
    match (op, operand) {
        (UnaryOperator::Not, Value::Logical(b)) => Ok(Value::Logical(!b)),
        (UnaryOperator::Minus, Value::Numeric(n)) => Ok(Value::Numeric(-n)),
        (op, operand) => Err(ExpressionError::incompatible(
            op.as_str(),
            &[operand.return_type()],
        )),
    }
}

/// Character `-`: trailing blanks of the left operand move to the end.
fn concat_trimmed(left: &str, right: &str) -> String {
    let width = left.chars().count() + right.chars().count();
    let mut out = left.trim_end_matches(' ').to_string();
    out.push_str(right);
    let pad = width - out.chars().count();
    out.extend(std::iter::repeat(' ').take(pad));
    out
}

fn compare(op: BinaryOperator, left: &Value, right: &Value) -> ExpressionResult<bool> {
    if op == BinaryOperator::Contains {
        return match (left, right) {
            (Value::Character(needle), Value::Character(haystack)) => {
                Ok(haystack.contains(needle.as_str()))
            }
            _ => Err(ExpressionError::incompatible(
                op.as_str(),
                &[left.return_type(), right.return_type()],
            )),
        };
    }

    let ordering = match (left, right) {
        (Value::Numeric(a), Value::Numeric(b)) => compare_numeric(*a, *b),
        // Trailing blanks are not significant
        (Value::Character(a), Value::Character(b)) => {
            a.trim_end_matches(' ').cmp(b.trim_end_matches(' '))
        }
        // A blank date sorts before every real date
        (Value::Date(a), Value::Date(b)) => a.cmp(b),
        (Value::Logical(a), Value::Logical(b)) => a.cmp(b),
        _ => {
            return Err(ExpressionError::incompatible(
                op.as_str(),
                &[left.return_type(), right.return_type()],
            ))
        }
    };

    match op {
        BinaryOperator::Eq => Ok(ordering == Ordering::Equal),
        BinaryOperator::Ne => Ok(ordering != Ordering::Equal),
        BinaryOperator::Lt => Ok(ordering == Ordering::Less),
        BinaryOperator::Le => Ok(ordering != Ordering::Greater),
        BinaryOperator::Gt => Ok(ordering == Ordering::Greater),
        BinaryOperator::Ge => Ok(ordering != Ordering::Less),
        _ => Err(ExpressionError::incompatible(
            op.as_str(),
            &[left.return_type(), right.return_type()],
        )),
    }
}

/// Compare numerics as decimal digit strings so binary rounding noise
/// such as `0.1 + 0.2` versus `0.3` does not decide the result.
/// Magnitudes a packed decimal cannot hold are compared as floats.
fn compare_numeric(a: f64, b: f64) -> Ordering {
    match Bcd::from_f64(a) {
        Ok(lhs) => lhs.compare_f64(b),
        Err(_) => a.partial_cmp(&b).unwrap_or(Ordering::Less),
    }
}
