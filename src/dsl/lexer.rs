//! Lexer for the cadenza language.
//!
//! Pulls characters from an [`InputStream`] and produces one [`Token`] at a
//! time, with exactly one token of lookahead.

use super::error::SyntaxError;
use super::input::InputStream;
use super::token::{Keyword, Operator, Punctuation, Token};

/// A token together with the position of its first character.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
    pub col: usize,
}

pub struct Tokenizer {
    input: InputStream,
    peeked: Option<Result<Spanned, SyntaxError>>,
    last_line: usize,
    last_col: usize,
}

impl Tokenizer {
    pub fn new(source: &str) -> Self {
        Self::from_input(InputStream::new(source))
    }

    pub fn from_input(input: InputStream) -> Self {
        Self {
            input,
            peeked: None,
            last_line: 1,
            last_col: 1,
        }
    }

    /// Consume and return the next token.
    pub fn next(&mut self) -> Result<Token, SyntaxError> {
        let spanned = match self.peeked.take() {
            Some(result) => result?,
            None => self.read_next()?,
        };
        self.last_line = spanned.line;
        self.last_col = spanned.col;
        Ok(spanned.token)
    }

    /// Return the next token without consuming it.
    pub fn peek(&mut self) -> Result<&Token, SyntaxError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.read_next());
        }
        match &self.peeked {
            Some(Ok(spanned)) => Ok(&spanned.token),
            Some(Err(e)) => Err(e.clone()),
            None => unreachable!("peeked token was just filled"),
        }
    }

    pub fn eof(&mut self) -> bool {
        matches!(self.peek(), Ok(Token::Eof))
    }

    /// Line after the last character consumed from the input.
    pub fn line(&self) -> usize {
        self.input.line()
    }

    /// Column after the last character consumed from the input.
    pub fn col(&self) -> usize {
        self.input.col()
    }

    /// Start position of the peeked token, or of the last consumed one.
    pub fn token_position(&self) -> (usize, usize) {
        match &self.peeked {
            Some(Ok(spanned)) => (spanned.line, spanned.col),
            Some(Err(e)) => (e.line, e.col),
            None => (self.last_line, self.last_col),
        }
    }

    /// Drain the remaining input into a vector, stopping at (and including) EOF.
    pub fn tokenize(mut self) -> Result<Vec<Token>, SyntaxError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn read_next(&mut self) -> Result<Spanned, SyntaxError> {
        loop {
            self.skip_while(is_whitespace);
            if self.input.peek() == Some('#') {
                self.skip_while(|ch| ch != '\n');
                continue;
            }
            break;
        }

        let line = self.input.line();
        let col = self.input.col();
        let spanned = |token| Spanned { token, line, col };

        let Some(ch) = self.input.peek() else {
            return Ok(spanned(Token::Eof));
        };

        let token = if ch == '"' {
            self.read_string(line, col)?
        } else if ch.is_ascii_digit() {
            self.read_number(line, col)?
        } else if Operator::is_operator_char(ch) {
            self.read_operator(line, col)?
        } else if let Some(punctuation) = Punctuation::from_char(ch) {
            self.input.next();
            Token::Punctuation(punctuation)
        } else if is_identifier_start(ch) {
            self.read_identifier()
        } else {
            return Err(SyntaxError::lex(
                format!("cannot handle character \"{ch}\""),
                line,
                col,
            ));
        };

        Ok(spanned(token))
    }

    fn skip_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.input.peek().is_some_and(&predicate) {
            self.input.next();
        }
    }

    fn read_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let mut s = String::new();
        while let Some(ch) = self.input.peek() {
            if !predicate(ch) {
                break;
            }
            s.push(ch);
            self.input.next();
        }
        s
    }

    fn read_number(&mut self, line: usize, col: usize) -> Result<Token, SyntaxError> {
        let mut digits = self.read_while(|ch| ch.is_ascii_digit());
        let is_float = self.input.peek() == Some('.')
            && self.input.peek_second().is_some_and(|ch| ch.is_ascii_digit());

        if is_float {
            self.input.next();
            digits.push('.');
            digits.push_str(&self.read_while(|ch| ch.is_ascii_digit()));
        }

        let value: f64 = digits
            .parse()
            .map_err(|_| SyntaxError::lex(format!("invalid number: {digits}"), line, col))?;

        if is_float {
            Ok(Token::Float(value))
        } else {
            Ok(Token::Integer(value.round()))
        }
    }

    fn read_operator(&mut self, line: usize, col: usize) -> Result<Token, SyntaxError> {
        let run = self.read_while(Operator::is_operator_char);
        if let Some(op) = Operator::from_symbol(&run) {
            return Ok(Token::Operator(op));
        }
        // `|` is not an operator on its own; it separates step attributes.
        if run == "|" {
            return Ok(Token::Punctuation(Punctuation::Pipe));
        }
        Err(SyntaxError::lex(
            format!("unrecognized operator {run}"),
            line,
            col,
        ))
    }

    fn read_identifier(&mut self) -> Token {
        let word = self.read_while(is_identifier_char);
        if let Some(keyword) = Keyword::from_word(&word) {
            return Token::Keyword(keyword);
        }
        match word.as_str() {
            "true" => Token::Boolean(true),
            "false" => Token::Boolean(false),
            _ => Token::Identifier(word),
        }
    }

    fn read_string(&mut self, line: usize, col: usize) -> Result<Token, SyntaxError> {
        self.input.next(); // opening quote
        let s = self.read_while(|ch| ch != '"');
        if self.input.next() != Some('"') {
            return Err(SyntaxError::lex("unterminated string", line, col));
        }
        Ok(Token::String(s))
    }
}

fn is_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\u{00a0}')
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_identifier_char(ch: char) -> bool {
    is_identifier_start(ch) || ch.is_ascii_digit() || matches!(ch, '?' | '!' | '-')
}
