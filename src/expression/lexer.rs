// Expression lexer - tokenizes dBASE expression text

use super::token::{Spanned, Token};
use crate::expression::{ExpressionError, ExpressionResult};

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    current_char: Option<char>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let input: Vec<char> = input.chars().collect();
        let current_char = input.first().copied();
        Lexer {
            input,
            position: 0,
            current_char,
        }
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> ExpressionResult<Spanned> {
        self.skip_whitespace();
        let start = self.position;

        let Some(ch) = self.current_char else {
            return Ok(self.spanned(Token::Eof, start));
        };

        let token = match ch {
            '+' => self.single(Token::Plus),
            '-' => {
                self.advance();
                if self.current_char == Some('>') {
                    self.advance();
                    Token::Arrow
                } else {
                    Token::Minus
                }
            }
            '*' => {
                self.advance();
                if self.current_char == Some('*') {
                    self.advance();
                    Token::Caret
                } else {
                    Token::Star
                }
            }
            '/' => self.single(Token::Slash),
            '%' => self.single(Token::Percent),
            '^' => self.single(Token::Caret),
            '$' => self.single(Token::Dollar),
            '#' => self.single(Token::NotEqual),
            '=' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                }
                Token::Equal
            }
            '<' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::LessEqual
                } else if self.current_char == Some('>') {
                    self.advance();
                    Token::NotEqual
                } else {
                    Token::Less
                }
            }
            '>' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::GreaterEqual
                } else {
                    Token::Greater
                }
            }
            '!' => {
                self.advance();
                if self.current_char == Some('=') {
                    self.advance();
                    Token::NotEqual
                } else {
                    return Err(self.unexpected(start, '!'));
                }
            }
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            ',' => self.single(Token::Comma),
            '\'' | '"' | '`' => self.read_string(ch)?,
            '{' => self.read_date()?,
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.read_number(),
            '.' => self.read_dotted_keyword()?,
            c if c.is_alphabetic() || c == '_' => self.read_identifier(),
            c if c.is_ascii_digit() => self.read_number(),
            c => return Err(self.unexpected(start, c)),
        };

        Ok(self.spanned(token, start))
    }

    /// Tokenize the entire input, ending with `Token::Eof`
    pub fn tokenize(&mut self) -> ExpressionResult<Vec<Spanned>> {
        let mut tokens = Vec::new();

        loop {
            let spanned = self.next_token()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                break;
            }
        }

        Ok(tokens)
    }

    fn spanned(&self, token: Token, start: usize) -> Spanned {
        Spanned {
            token,
            start,
            end: self.position,
        }
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    fn unexpected(&self, position: usize, ch: char) -> ExpressionError {
        ExpressionError::InvalidExpression {
            position,
            reason: format!("unexpected character '{}'", ch),
        }
    }

    /// Advance to the next character
    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    /// Peek at the next character without advancing
    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    /// Skip whitespace characters
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Read an identifier or bare logical keyword
    fn read_identifier(&mut self) -> Token {
        let mut identifier = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_alphanumeric() || ch == '_' {
                identifier.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Token::keyword_from_str(&identifier).unwrap_or(Token::Identifier(identifier))
    }

    /// Read `.AND.`, `.OR.`, `.NOT.` or a logical literal such as `.T.`
    fn read_dotted_keyword(&mut self) -> ExpressionResult<Token> {
        let start = self.position;
        self.advance(); // Skip opening dot
        let mut word = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_ascii_alphabetic() {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if self.current_char != Some('.') {
            return Err(ExpressionError::InvalidExpression {
                position: start,
                reason: format!("unterminated dotted keyword '.{}'", word),
            });
        }
        self.advance(); // Skip closing dot

        match word.to_ascii_uppercase().as_str() {
            "T" | "Y" | "TRUE" => Ok(Token::Logical(true)),
            "F" | "N" | "FALSE" => Ok(Token::Logical(false)),
            other => {
                Token::keyword_from_str(other).ok_or_else(|| ExpressionError::InvalidExpression {
                    position: start,
                    reason: format!("unknown keyword '.{}.'", word),
                })
            }
        }
    }

    /// Read a string literal closed by the same quote that opened it
    fn read_string(&mut self, quote: char) -> ExpressionResult<Token> {
        let start = self.position;
        self.advance(); // Skip opening quote
        let mut string = String::new();

        while let Some(ch) = self.current_char {
            self.advance();
            if ch == quote {
                return Ok(Token::String(string));
            }
            string.push(ch);
        }

        Err(ExpressionError::UnbalancedQuotes { position: start })
    }

    /// Read a `{MM/DD/YY}` date literal
    fn read_date(&mut self) -> ExpressionResult<Token> {
        let start = self.position;
        self.advance(); // Skip opening brace
        let mut text = String::new();

        while let Some(ch) = self.current_char {
            self.advance();
            if ch == '}' {
                return Ok(Token::Date(text));
            }
            text.push(ch);
        }

        Err(ExpressionError::InvalidExpression {
            position: start,
            reason: "unterminated date literal".to_string(),
        })
    }

    /// Read a number (integer or decimal)
    fn read_number(&mut self) -> Token {
        let mut number = String::new();
        let mut has_dot = false;

        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.' && !has_dot && self.peek().is_some_and(|c| c.is_ascii_digit()) {
                has_dot = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Token::Number(number)
    }
}

/// Check quote and parenthesis balance over raw expression text.
///
/// Parentheses inside quoted literals are ignored.
pub fn check_parens_and_quotes(text: &str) -> ExpressionResult<()> {
    let mut depth: i32 = 0;
    let mut open_quote: Option<(char, usize)> = None;

    for (position, ch) in text.chars().enumerate() {
        match open_quote {
            Some((quote, _)) if ch == quote => open_quote = None,
            Some(_) => {}
            None => match ch {
                '\'' | '"' | '`' => open_quote = Some((ch, position)),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(ExpressionError::UnbalancedParens);
                    }
                }
                _ => {}
            },
        }
    }

    if let Some((_, position)) = open_quote {
        return Err(ExpressionError::UnbalancedQuotes { position });
    }
    if depth != 0 {
        return Err(ExpressionError::UnbalancedParens);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            tokens("+ - * / % ^ ** = == <> != # < <= > >= $"),
            vec![
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::Slash,
                Token::Percent,
                Token::Caret,
                Token::Caret,
                Token::Equal,
                Token::Equal,
                Token::NotEqual,
                Token::NotEqual,
                Token::NotEqual,
                Token::Less,
                Token::LessEqual,
                Token::Greater,
                Token::GreaterEqual,
                Token::Dollar,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_logical_keywords() {
        assert_eq!(
            tokens(".AND. .or. .Not. AND or NOT .T. .F. .TRUE. .false."),
            vec![
                Token::And,
                Token::Or,
                Token::Not,
                Token::And,
                Token::Or,
                Token::Not,
                Token::Logical(true),
                Token::Logical(false),
                Token::Logical(true),
                Token::Logical(false),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(
            tokens(r#"'single' "dou'ble" `back"tick`"#),
            vec![
                Token::String("single".to_string()),
                Token::String("dou'ble".to_string()),
                Token::String("back\"tick".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("123 12.34 .5 1.AND."),
            vec![
                Token::Number("123".to_string()),
                Token::Number("12.34".to_string()),
                Token::Number(".5".to_string()),
                Token::Number("1".to_string()),
                Token::And,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_identifiers_and_alias() {
        assert_eq!(
            tokens("CUST->NAME + last_name"),
            vec![
                Token::Identifier("CUST".to_string()),
                Token::Arrow,
                Token::Identifier("NAME".to_string()),
                Token::Plus,
                Token::Identifier("last_name".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_date_literal() {
        assert_eq!(
            tokens("{10/14/17}"),
            vec![Token::Date("10/14/17".to_string()), Token::Eof]
        );
    }

    #[test]
    fn test_spans() {
        let spanned = Lexer::new("  AB + 'x'").tokenize().unwrap();
        assert_eq!((spanned[0].start, spanned[0].end), (2, 4));
        assert_eq!((spanned[2].start, spanned[2].end), (7, 10));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            Lexer::new("'abc").tokenize(),
            Err(ExpressionError::UnbalancedQuotes { position: 0 })
        ));
        assert!(matches!(
            Lexer::new("1 @ 2").tokenize(),
            Err(ExpressionError::InvalidExpression { position: 2, .. })
        ));
        assert!(matches!(
            Lexer::new(".XOR. ").tokenize(),
            Err(ExpressionError::InvalidExpression { .. })
        ));
        assert!(matches!(
            Lexer::new("{10/14/17").tokenize(),
            Err(ExpressionError::InvalidExpression { .. })
        ));
    }

    #[test]
    fn test_check_parens_and_quotes() {
        assert!(check_parens_and_quotes("(1+2)*(3)").is_ok());
        assert!(check_parens_and_quotes("'(' + \")\"").is_ok());
        assert!(matches!(
            check_parens_and_quotes("(1+2"),
            Err(ExpressionError::UnbalancedParens)
        ));
        assert!(matches!(
            check_parens_and_quotes(")("),
            Err(ExpressionError::UnbalancedParens)
        ));
        assert!(matches!(
            check_parens_and_quotes("'abc"),
            Err(ExpressionError::UnbalancedQuotes { position: 0 })
        ));
    }
}
