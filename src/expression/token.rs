// Expression tokens for lexical analysis

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Identifier(String),
    Number(String),
    String(String),
    /// Text between `{` and `}`
    Date(String),
    Logical(bool),

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    /// `^` or `**`
    Caret,

    // Relational
    Equal,
    /// `<>`, `!=` or `#`
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Dollar,

    // Logical, dotted or bare keyword form
    And,
    Or,
    Not,

    // Punctuation
    LeftParen,
    RightParen,
    Comma,
    /// `->` alias qualifier
    Arrow,

    Eof,
}

impl Token {
    /// Map a dotted or bare logical keyword.
    pub fn keyword_from_str(s: &str) -> Option<Token> {
        match s.to_ascii_uppercase().as_str() {
            "AND" => Some(Token::And),
            "OR" => Some(Token::Or),
            "NOT" => Some(Token::Not),
            _ => None,
        }
    }
}

/// A token together with the character range it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub start: usize,
    pub end: usize,
}
