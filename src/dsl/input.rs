//! Character stream over source text with 1-based line/column tracking.
//!
//! `line()` and `col()` describe the position of the *next* character, so
//! after consuming a newline the stream reports column 1 of the next line.

pub struct InputStream {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl InputStream {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Consume and return the next character, or `None` at the end of input.
    pub fn next(&mut self) -> Option<char> {
        let ch = *self.chars.get(self.pos)?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// Look one character past [`peek`](Self::peek).
    pub fn peek_second(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    pub fn eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn col(&self) -> usize {
        self.col
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_line_one_column_one() {
        let input = InputStream::new("abc");
        assert_eq!(input.line(), 1);
        assert_eq!(input.col(), 1);
    }

    #[test]
    fn tracks_lines_and_columns() {
        let lines = ["abc\n", "def\n", "ghi"];
        let mut input = InputStream::new(&lines.concat());
        for (line_idx, line) in lines.iter().enumerate() {
            for (col_idx, expected) in line.chars().enumerate() {
                let ch = input.next();
                assert_eq!(ch, Some(expected));
                if expected == '\n' {
                    assert_eq!(input.line(), line_idx + 2);
                    assert_eq!(input.col(), 1);
                } else {
                    assert_eq!(input.line(), line_idx + 1);
                    assert_eq!(input.col(), col_idx + 2);
                }
            }
        }
        assert_eq!(input.next(), None);
        assert!(input.eof());
    }

    #[test]
    fn peek_does_not_consume() {
        let mut input = InputStream::new("xy");
        assert_eq!(input.peek(), Some('x'));
        assert_eq!(input.peek(), Some('x'));
        assert_eq!(input.next(), Some('x'));
        assert_eq!(input.peek(), Some('y'));
    }

    #[test]
    fn newline_moves_to_next_line() {
        let mut input = InputStream::new("abc\ndef");
        for _ in 0..4 {
            input.next();
        }
        assert_eq!(input.line(), 2);
        assert_eq!(input.col(), 1);
    }
}
