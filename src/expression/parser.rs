// Expression parser - converts tokens to an owned, typed node tree

use super::binder::bind_field;
use super::function::{self, parse_date_text};
use super::lexer::{check_parens_and_quotes, Lexer};
use super::node::{Node, NodeKind};
use super::operator::{BinaryOperator, Operator, UnaryOperator};
use super::token::{Spanned, Token};
use crate::config::ExpressionConfig;
use crate::expression::{
    ExpressionError, ExpressionResult, ReturnType, Value, MAX_CHARACTER_LEN,
};
use crate::table::Table;
use std::ops::Range;

pub struct Parser<'a> {
    tokens: Vec<Spanned>,
    position: usize,
    source: Vec<char>,
    table: Option<&'a dyn Table>,
    config: &'a ExpressionConfig,
}

impl<'a> Parser<'a> {
    /// Check quote and paren balance, then tokenize
    pub fn new(
        text: &str,
        table: Option<&'a dyn Table>,
        config: &'a ExpressionConfig,
    ) -> ExpressionResult<Self> {
        check_parens_and_quotes(text)?;
        let tokens = Lexer::new(text).tokenize()?;
        Ok(Parser {
            tokens,
            position: 0,
            source: text.chars().collect(),
            table,
            config,
        })
    }

    /// Parse a complete expression
    pub fn parse(&mut self) -> ExpressionResult<Node> {
        if self.match_token(&Token::Eof) {
            return Err(self.error("empty expression"));
        }

        let root = self.parse_or()?;
        if !self.match_token(&Token::Eof) {
            return Err(self.error(&format!("unexpected {:?}", self.current_token())));
        }
        Ok(root)
    }

    fn parse_or(&mut self) -> ExpressionResult<Node> {
        let mut left = self.parse_and()?;

        while self.match_token(&Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = self.binary(BinaryOperator::Or, left, right)?;
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> ExpressionResult<Node> {
        let mut left = self.parse_not()?;

        while self.match_token(&Token::And) {
            self.advance();
            let right = self.parse_not()?;
            left = self.binary(BinaryOperator::And, left, right)?;
        }

        Ok(left)
    }

    fn parse_not(&mut self) -> ExpressionResult<Node> {
        if self.match_token(&Token::Not) {
            let start = self.current().start;
            self.advance();
            let operand = self.parse_not()?;
            return self.unary(UnaryOperator::Not, operand, start);
        }

        self.parse_relational()
    }

    /// Relational operators do not chain: `a < b < c` is rejected.
    fn parse_relational(&mut self) -> ExpressionResult<Node> {
        let left = self.parse_additive()?;

        let op = match self.current_token() {
            Token::Equal => BinaryOperator::Eq,
            Token::NotEqual => BinaryOperator::Ne,
            Token::Less => BinaryOperator::Lt,
            Token::LessEqual => BinaryOperator::Le,
            Token::Greater => BinaryOperator::Gt,
            Token::GreaterEqual => BinaryOperator::Ge,
            Token::Dollar => BinaryOperator::Contains,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_additive()?;
        self.binary(op, left, right)
    }

    fn parse_additive(&mut self) -> ExpressionResult<Node> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = self.binary(op, left, right)?;
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ExpressionResult<Node> {
        let mut left = self.parse_power()?;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Mul,
                Token::Slash => BinaryOperator::Div,
                Token::Percent => BinaryOperator::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_power()?;
            left = self.binary(op, left, right)?;
        }

        Ok(left)
    }

    /// Exponentiation is right associative: `2^3^2` is `2^(3^2)`.
    fn parse_power(&mut self) -> ExpressionResult<Node> {
        let base = self.parse_unary()?;

        if self.match_token(&Token::Caret) {
            self.advance();
            let exponent = self.parse_power()?;
            return self.binary(BinaryOperator::Pow, base, exponent);
        }

        Ok(base)
    }

    fn parse_unary(&mut self) -> ExpressionResult<Node> {
        if self.match_token(&Token::Minus) {
            let start = self.current().start;
            self.advance();
            let operand = self.parse_unary()?;
            return self.unary(UnaryOperator::Minus, operand, start);
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ExpressionResult<Node> {
        let spanned = self.current().clone();
        let span = spanned.start..spanned.end;

        let value = match spanned.token {
            Token::Number(text) => {
                let n: f64 = text
                    .parse()
                    .map_err(|_| self.error(&format!("invalid number '{}'", text)))?;
                Value::Numeric(n)
            }
            Token::String(s) => Value::Character(s),
            Token::Date(text) => Value::Date(parse_date_text(&text, self.config)?),
            Token::Logical(b) => Value::Logical(b),
            Token::Identifier(name) => {
                self.advance();
                let next = self.current_token().clone();
                return match next {
                    Token::LeftParen => self.parse_function_call(name, span.start),
                    Token::Arrow => self.parse_qualified_field(name, span.start),
                    _ => self.field_node(None, &name, span),
                };
            }
            Token::LeftParen => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect_token(Token::RightParen)?;
                return Ok(inner);
            }
            _ => return Err(self.error(&format!("unexpected {:?}", spanned.token))),
        };

        self.advance();
        Ok(Node::constant(value, self.span_text(&span), span))
    }

    /// `NAME(arg, ...)`; the current token is the opening paren.
    fn parse_function_call(&mut self, name: String, start: usize) -> ExpressionResult<Node> {
        let function =
            function::lookup(&name).ok_or_else(|| ExpressionError::InvalidFunction { name })?;
        self.expect_token(Token::LeftParen)?;

        let mut args = Vec::new();
        if !self.match_token(&Token::RightParen) {
            loop {
                args.push(self.parse_or()?);
                if self.match_token(&Token::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        let end = self.current().end;
        self.expect_token(Token::RightParen)?;

        if args.len() < function.min_args || args.len() > function.max_args() {
            let expected = if function.min_args == function.max_args() {
                function.min_args.to_string()
            } else {
                format!("{} to {}", function.min_args, function.max_args())
            };
            return Err(ExpressionError::InvalidParm {
                function: function.name.to_string(),
                reason: format!("expected {} arguments, got {}", expected, args.len()),
            });
        }
        if function.needs_table && self.table.is_none() {
            return Err(ExpressionError::InvalidParm {
                function: function.name.to_string(),
                reason: "no table is bound to this expression".to_string(),
            });
        }
        for (i, (arg, expected)) in args.iter().zip(function.args).enumerate() {
            if !expected.accepts(arg.return_type) {
                return Err(ExpressionError::incompatible(
                    &format!("{}() argument {}", function.name, i + 1),
                    &[arg.return_type],
                ));
            }
        }
        if let Some(check) = function.check {
            check(function, &args)?;
        }

        let return_type = function.return_type(&args);
        let result_len = function.result_len(&args, self.config)?;
        let span = start..end;
        Ok(Node::new(
            self.span_text(&span),
            span,
            NodeKind::FunctionCall { function, args },
            return_type,
            result_len,
        ))
    }

    /// `ALIAS->FIELD`; the current token is the arrow.
    fn parse_qualified_field(&mut self, alias: String, start: usize) -> ExpressionResult<Node> {
        self.advance();
        let spanned = self.current().clone();
        let Token::Identifier(field) = spanned.token else {
            return Err(self.error("expected a field name after '->'"));
        };
        self.advance();
        self.field_node(Some(&alias), &field, start..spanned.end)
    }

    fn field_node(
        &self,
        alias: Option<&str>,
        field: &str,
        span: Range<usize>,
    ) -> ExpressionResult<Node> {
        let binding = bind_field(self.table, alias, field)?;
        Ok(Node::new(
            self.span_text(&span),
            span,
            NodeKind::FieldReference {
                index: binding.index,
                field_type: binding.field_type,
            },
            binding.return_type,
            binding.result_len,
        ))
    }

    fn binary(&self, op: BinaryOperator, left: Node, right: Node) -> ExpressionResult<Node> {
        let return_type = op
            .output_type(left.return_type, right.return_type)
            .ok_or_else(|| {
                ExpressionError::incompatible(op.as_str(), &[left.return_type, right.return_type])
            })?;
        let result_len = match return_type {
            ReturnType::Character => left
                .result_len
                .checked_add(right.result_len)
                .filter(|&len| len <= MAX_CHARACTER_LEN)
                .ok_or_else(|| ExpressionError::InvalidExpression {
                    position: left.span.start,
                    reason: format!("character result longer than {}", MAX_CHARACTER_LEN),
                })?,
            other => other.fixed_len(),
        };

        let span = left.span.start..right.span.end;
        let op = Operator::Binary(op);
        Ok(Node::new(
            self.span_text(&span),
            span,
            NodeKind::Operator {
                op,
                weight: op.weight(),
                operands: vec![left, right],
            },
            return_type,
            result_len,
        ))
    }

    fn unary(&self, op: UnaryOperator, operand: Node, start: usize) -> ExpressionResult<Node> {
        let return_type = op
            .output_type(operand.return_type)
            .ok_or_else(|| ExpressionError::incompatible(op.as_str(), &[operand.return_type]))?;

        let span = start..operand.span.end;
        let op = Operator::Unary(op);
        Ok(Node::new(
            self.span_text(&span),
            span,
            NodeKind::Operator {
                op,
                weight: op.weight(),
                operands: vec![operand],
            },
            return_type,
            return_type.fixed_len(),
        ))
    }

    fn span_text(&self, span: &Range<usize>) -> String {
        self.source[span.start.min(self.source.len())..span.end.min(self.source.len())]
            .iter()
            .collect()
    }

    fn error(&self, reason: &str) -> ExpressionError {
        ExpressionError::InvalidExpression {
            position: self.current().start,
            reason: reason.to_string(),
        }
    }

    fn current(&self) -> &Spanned {
        // The token list always ends with Eof and advance() never passes it.
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn current_token(&self) -> &Token {
        &self.current().token
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn match_token(&self, token: &Token) -> bool {
        self.current_token() == token
    }

    fn expect_token(&mut self, expected: Token) -> ExpressionResult<()> {
        if self.match_token(&expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!(
                "expected {:?}, found {:?}",
                expected,
                self.current_token()
            )))
        }
    }
}
