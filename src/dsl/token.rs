//! Token types for the cadenza lexer.

use std::fmt;

/// A token produced by the [`Tokenizer`](super::lexer::Tokenizer).
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Eof,
    /// Digits without a fractional part. Stored as `f64`, always integral.
    Integer(f64),
    Float(f64),
    Punctuation(Punctuation),
    Operator(Operator),
    Keyword(Keyword),
    Identifier(String),
    Boolean(bool),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punctuation {
    LBrace,
    RBrace,
    Comma,
    Pipe,
    Semicolon,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

impl Punctuation {
    pub const ALL: [Punctuation; 9] = [
        Punctuation::LBrace,
        Punctuation::RBrace,
        Punctuation::Comma,
        Punctuation::Pipe,
        Punctuation::Semicolon,
        Punctuation::LParen,
        Punctuation::RParen,
        Punctuation::LBracket,
        Punctuation::RBracket,
    ];

    pub fn from_char(ch: char) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_char() == ch)
    }

    pub fn as_char(self) -> char {
        match self {
            Punctuation::LBrace => '{',
            Punctuation::RBrace => '}',
            Punctuation::Comma => ',',
            Punctuation::Pipe => '|',
            Punctuation::Semicolon => ';',
            Punctuation::LParen => '(',
            Punctuation::RParen => ')',
            Punctuation::LBracket => '[',
            Punctuation::RBracket => ']',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `:=:` stack two sequences on top of each other.
    Stack,
    /// `:+:` play one sequence after the other.
    Concat,
    Divide,
    Multiply,
    Plus,
    Minus,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    NotEqual,
    Equal,
    And,
    Or,
    Assign,
    Not,
}

impl Operator {
    pub const ALL: [Operator; 16] = [
        Operator::Stack,
        Operator::Concat,
        Operator::Divide,
        Operator::Multiply,
        Operator::Plus,
        Operator::Minus,
        Operator::Greater,
        Operator::GreaterEqual,
        Operator::Less,
        Operator::LessEqual,
        Operator::NotEqual,
        Operator::Equal,
        Operator::And,
        Operator::Or,
        Operator::Assign,
        Operator::Not,
    ];

    pub fn from_symbol(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == s)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Stack => ":=:",
            Operator::Concat => ":+:",
            Operator::Divide => "/",
            Operator::Multiply => "*",
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::NotEqual => "!=",
            Operator::Equal => "==",
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Assign => "=",
            Operator::Not => "!",
        }
    }

    /// Characters that may appear in an operator run.
    pub fn is_operator_char(ch: char) -> bool {
        "!&*+-/:<=>|".contains(ch)
    }
}

/// Reserved words. `for` and `let` are reserved but not part of the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Seq,
    Fun,
    Step,
    Return,
    If,
    Else,
    While,
    For,
    Let,
    Nil,
    Loop,
    Tempo,
    Play,
    Sleep,
}

impl Keyword {
    pub fn from_word(s: &str) -> Option<Self> {
        let kw = match s {
            "seq" => Keyword::Seq,
            "fun" => Keyword::Fun,
            "step" => Keyword::Step,
            "return" => Keyword::Return,
            "if" => Keyword::If,
            "else" => Keyword::Else,
            "while" => Keyword::While,
            "for" => Keyword::For,
            "let" => Keyword::Let,
            "nil" => Keyword::Nil,
            "loop" => Keyword::Loop,
            "tempo" => Keyword::Tempo,
            "play" => Keyword::Play,
            "sleep" => Keyword::Sleep,
            _ => return None,
        };
        Some(kw)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Seq => "seq",
            Keyword::Fun => "fun",
            Keyword::Step => "step",
            Keyword::Return => "return",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::While => "while",
            Keyword::For => "for",
            Keyword::Let => "let",
            Keyword::Nil => "nil",
            Keyword::Loop => "loop",
            Keyword::Tempo => "tempo",
            Keyword::Play => "play",
            Keyword::Sleep => "sleep",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Eof => write!(f, "end of input"),
            Token::Integer(v) | Token::Float(v) => write!(f, "number {v}"),
            Token::Punctuation(p) => write!(f, "'{}'", p.as_char()),
            Token::Operator(op) => write!(f, "operator '{}'", op.as_str()),
            Token::Keyword(kw) => write!(f, "keyword '{}'", kw.as_str()),
            Token::Identifier(name) => write!(f, "identifier '{name}'"),
            Token::Boolean(b) => write!(f, "boolean {b}"),
            Token::String(s) => write!(f, "string \"{s}\""),
        }
    }
}
