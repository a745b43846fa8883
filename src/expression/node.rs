//! Expression tree nodes.

use crate::expression::function::FunctionDef;
use crate::expression::operator::Operator;
use crate::expression::{ReturnType, Value};
use crate::table::FieldType;
use std::fmt::{self, Write};
use std::ops::Range;

/// What a node is, with only the data that kind needs
#[derive(Debug, Clone)]
pub enum NodeKind {
    Constant(Value),
    FieldReference {
        index: usize,
        field_type: FieldType,
    },
    FunctionCall {
        function: &'static FunctionDef,
        args: Vec<Node>,
    },
    Operator {
        op: Operator,
        weight: u8,
        operands: Vec<Node>,
    },
}

/// One element of a parsed expression
///
/// A node owns its children outright. The return type and result length
/// are fixed when the node is built; only the result slot changes, and it
/// is overwritten on every evaluation pass.
#[derive(Debug, Clone)]
pub struct Node {
    /// Source text covered by this node
    pub text: String,
    /// Character range of `text` within the expression
    pub span: Range<usize>,
    pub kind: NodeKind,
    pub return_type: ReturnType,
    /// Width of the result when it feeds a key buffer
    pub result_len: usize,
    result: Option<Value>,
}

impl Node {
    pub fn new(
        text: String,
        span: Range<usize>,
        kind: NodeKind,
        return_type: ReturnType,
        result_len: usize,
    ) -> Self {
        Self {
            text,
            span,
            kind,
            return_type,
            result_len,
            result: None,
        }
    }

    /// Build a literal node; character literals are as wide as their text.
    pub fn constant(value: Value, text: String, span: Range<usize>) -> Self {
        let return_type = value.return_type();
        let result_len = match &value {
            Value::Character(s) => s.chars().count(),
            _ => return_type.fixed_len(),
        };
        Self::new(text, span, NodeKind::Constant(value), return_type, result_len)
    }

    /// Value from the most recent evaluation pass
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub(crate) fn set_result(&mut self, value: Value) {
        self.result = Some(value);
    }

    pub(crate) fn take_result(&mut self) -> Option<Value> {
        self.result.take()
    }

    /// The literal value when this node is a constant
    pub fn constant_value(&self) -> Option<&Value> {
        match &self.kind {
            NodeKind::Constant(value) => Some(value),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match &self.kind {
            NodeKind::FunctionCall { args, .. } => args,
            NodeKind::Operator { operands, .. } => operands,
            NodeKind::Constant(_) | NodeKind::FieldReference { .. } => &[],
        }
    }

    /// Number of nodes in this subtree
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(Node::node_count).sum::<usize>()
    }

    fn write_tree(&self, out: &mut String, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        let kind = match &self.kind {
            NodeKind::Constant(_) => "Constant".to_string(),
            NodeKind::FieldReference { index, .. } => format!("Field #{}", index),
            NodeKind::FunctionCall { function, .. } => format!("Function {}", function.name),
            NodeKind::Operator { op, weight, .. } => format!("Operator {} w{}", op.as_str(), weight),
        };
        write!(
            out,
            "{}{} '{}' type={} len={}",
            indent,
            kind,
            self.text,
            self.return_type.code(),
            self.result_len
        )?;
        if let Some(value) = &self.result {
            write!(out, " = {}", value)?;
        }
        out.push('\n');

        for child in self.children() {
            child.write_tree(out, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    /// Indented tree listing, one node per line
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_tree(&mut out, 0)?;
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::operator::BinaryOperator;

    fn number(n: f64, at: usize) -> Node {
        Node::constant(Value::Numeric(n), n.to_string(), at..at + 1)
    }

    #[test]
    fn test_constant_lengths() {
        let c = Node::constant(Value::Character("abc".to_string()), "'abc'".to_string(), 0..5);
        assert_eq!(c.result_len, 3);
        assert_eq!(c.return_type, ReturnType::Character);
        assert_eq!(number(1.0, 0).result_len, 4);
        let l = Node::constant(Value::Logical(true), ".T.".to_string(), 0..3);
        assert_eq!(l.result_len, 1);
        assert!(c.result().is_none());
    }

    #[test]
    fn test_children_and_dump() {
        let op = Operator::Binary(BinaryOperator::Add);
        let mut node = Node::new(
            "1+2".to_string(),
            0..3,
            NodeKind::Operator {
                op,
                weight: op.weight(),
                operands: vec![number(1.0, 0), number(2.0, 2)],
            },
            ReturnType::Numeric,
            4,
        );
        assert_eq!(node.children().len(), 2);
        assert_eq!(node.node_count(), 3);

        node.set_result(Value::Numeric(3.0));
        let dump = node.to_string();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines[0], "Operator + w6 '1+2' type=N len=4 = 3");
        assert_eq!(lines[1], "  Constant '1' type=N len=4");
        assert_eq!(lines.len(), 3);
    }
}
