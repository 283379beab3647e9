//! Tokenizer for PDF object syntax.
//!
//! Produces the lexical tokens of ISO 32000-1 §7.2/§7.3: numbers, names,
//! literal and hex strings, and keywords. Structural keywords that the object
//! parser and the xref loader care about get their own [`Keyword`] variants;
//! anything else is carried through as [`Keyword::Other`].

use crate::error::{PdfError, Result};

/// Keywords recognized by the object layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Keyword {
    ArrayStart, // [
    ArrayEnd,   // ]
    DictStart,  // <<
    DictEnd,    // >>
    Null,
    Obj,
    EndObj,
    R,
    Stream,
    EndStream,
    Xref,
    Trailer,
    StartXref,
    Other(Vec<u8>),
}

impl Keyword {
    pub fn from_bytes(b: &[u8]) -> Self {
        match b {
            b"[" => Keyword::ArrayStart,
            b"]" => Keyword::ArrayEnd,
            b"<<" => Keyword::DictStart,
            b">>" => Keyword::DictEnd,
            b"null" => Keyword::Null,
            b"obj" => Keyword::Obj,
            b"endobj" => Keyword::EndObj,
            b"R" => Keyword::R,
            b"stream" => Keyword::Stream,
            b"endstream" => Keyword::EndStream,
            b"xref" => Keyword::Xref,
            b"trailer" => Keyword::Trailer,
            b"startxref" => Keyword::StartXref,
            _ => Keyword::Other(b.to_vec()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Keyword::ArrayStart => b"[",
            Keyword::ArrayEnd => b"]",
            Keyword::DictStart => b"<<",
            Keyword::DictEnd => b">>",
            Keyword::Null => b"null",
            Keyword::Obj => b"obj",
            Keyword::EndObj => b"endobj",
            Keyword::R => b"R",
            Keyword::Stream => b"stream",
            Keyword::EndStream => b"endstream",
            Keyword::Xref => b"xref",
            Keyword::Trailer => b"trailer",
            Keyword::StartXref => b"startxref",
            Keyword::Other(bytes) => bytes.as_slice(),
        }
    }
}

/// Lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Integer value
    Int(i64),
    /// Floating point value
    Real(f64),
    /// Boolean value
    Bool(bool),
    /// Name (e.g. /Type), without the leading slash
    Name(String),
    /// String (literal or hex)
    String(Vec<u8>),
    /// Keyword or delimiter
    Keyword(Keyword),
}

/// Byte-level tokenizer over a borrowed buffer.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current position in the buffer.
    pub fn tell(&self) -> usize {
        self.pos
    }

    /// Move to an absolute position.
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// The whole underlying buffer.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.data.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    /// PDF whitespace characters (ISO 32000-1 Table 1).
    pub fn is_whitespace(b: u8) -> bool {
        matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\x00' | b'\x0c')
    }

    /// PDF delimiter characters (ISO 32000-1 Table 2).
    pub fn is_delimiter(b: u8) -> bool {
        matches!(
            b,
            b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
        )
    }

    fn is_token_end(b: u8) -> bool {
        Self::is_whitespace(b) || Self::is_delimiter(b)
    }

    /// Skip whitespace and comments.
    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if Self::is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while let Some(c) = self.advance() {
                    if c == b'\r' || c == b'\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn parse_name(&mut self) -> Result<Token> {
        self.pos += 1; // '/'
        let mut name = Vec::new();

        while let Some(b) = self.peek() {
            if Self::is_token_end(b) {
                break;
            }
            self.pos += 1;
            if b == b'#' {
                if let (Some(h1), Some(h2)) = (
                    self.peek().and_then(hex_value),
                    self.peek_at(1).and_then(hex_value),
                ) {
                    self.pos += 2;
                    name.push((h1 << 4) | h2);
                    continue;
                }
                // A '#' without two hex digits is kept verbatim.
            }
            name.push(b);
        }

        Ok(Token::Name(name_from_bytes(&name)))
    }

    fn parse_number(&mut self) -> Result<Token> {
        let start = self.pos;
        let mut has_dot = false;

        if matches!(self.peek(), Some(b'+') | Some(b'-')) {
            self.pos += 1;
        }

        while let Some(b) = self.peek() {
            if b.is_ascii_digit() {
                self.pos += 1;
            } else if b == b'.' && !has_dot {
                has_dot = true;
                self.pos += 1;
            } else {
                break;
            }
        }

        let s = std::str::from_utf8(&self.data[start..self.pos]).map_err(|_| {
            PdfError::TokenError {
                pos: start,
                msg: "invalid number".into(),
            }
        })?;

        if has_dot {
            // "5." and "-.5" are valid PDF reals; Rust's parser needs a digit on each side.
            let normalized = if s.ends_with('.') {
                format!("{s}0")
            } else {
                s.to_string()
            };
            let val: f64 = normalized.parse().map_err(|_| PdfError::TokenError {
                pos: start,
                msg: format!("invalid real: {s}"),
            })?;
            Ok(Token::Real(val))
        } else {
            let val: i64 = s.parse().map_err(|_| PdfError::TokenError {
                pos: start,
                msg: format!("invalid int: {s}"),
            })?;
            Ok(Token::Int(val))
        }
    }

    fn parse_string(&mut self) -> Result<Token> {
        self.pos += 1; // '('
        let mut result = Vec::new();
        let mut depth = 1;

        while depth > 0 {
            match self.advance() {
                Some(b'(') => {
                    depth += 1;
                    result.push(b'(');
                }
                Some(b')') => {
                    depth -= 1;
                    if depth > 0 {
                        result.push(b')');
                    }
                }
                Some(b'\\') => match self.advance() {
                    Some(b'n') => result.push(b'\n'),
                    Some(b'r') => result.push(b'\r'),
                    Some(b't') => result.push(b'\t'),
                    Some(b'b') => result.push(0x08),
                    Some(b'f') => result.push(0x0c),
                    Some(b'\r') => {
                        if self.peek() == Some(b'\n') {
                            self.pos += 1;
                        }
                    }
                    Some(b'\n') => {}
                    Some(c @ b'0'..=b'7') => {
                        let mut octal = u32::from(c - b'0');
                        for _ in 0..2 {
                            match self.peek() {
                                Some(d @ b'0'..=b'7') => {
                                    self.pos += 1;
                                    octal = octal * 8 + u32::from(d - b'0');
                                }
                                _ => break,
                            }
                        }
                        result.push((octal & 0xFF) as u8);
                    }
                    // Covers \( \) \\ and unknown escapes, which keep the character.
                    Some(c) => result.push(c),
                    None => return Err(PdfError::UnexpectedEof),
                },
                Some(c) => result.push(c),
                None => return Err(PdfError::UnexpectedEof),
            }
        }

        Ok(Token::String(result))
    }

    fn parse_hex_string(&mut self) -> Result<Token> {
        let start = self.pos;
        self.pos += 1; // '<'
        let mut result = Vec::new();
        let mut high: Option<u8> = None;

        loop {
            match self.advance() {
                Some(b'>') => break,
                Some(c) if Self::is_whitespace(c) => {}
                Some(c) => {
                    let nibble = hex_value(c).ok_or_else(|| PdfError::TokenError {
                        pos: self.pos - 1,
                        msg: format!("invalid hex digit in string starting at {start}"),
                    })?;
                    match high.take() {
                        Some(h) => result.push((h << 4) | nibble),
                        None => high = Some(nibble),
                    }
                }
                None => return Err(PdfError::UnexpectedEof),
            }
        }

        // An odd digit count behaves as if a trailing 0 followed.
        if let Some(h) = high {
            result.push(h << 4);
        }

        Ok(Token::String(result))
    }

    fn parse_keyword(&mut self) -> Token {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if Self::is_token_end(b) {
                break;
            }
            self.pos += 1;
        }

        match &self.data[start..self.pos] {
            b"true" => Token::Bool(true),
            b"false" => Token::Bool(false),
            kw => Token::Keyword(Keyword::from_bytes(kw)),
        }
    }

    /// Get next token together with its start position.
    pub fn next_token(&mut self) -> Option<Result<(usize, Token)>> {
        self.skip_whitespace();

        if self.at_end() {
            return None;
        }

        let token_pos = self.pos;
        let b = self.peek()?;

        let result = match b {
            b'/' => self.parse_name(),
            b'(' => self.parse_string(),
            b'<' => {
                if self.peek_at(1) == Some(b'<') {
                    self.pos += 2;
                    Ok(Token::Keyword(Keyword::DictStart))
                } else {
                    self.parse_hex_string()
                }
            }
            b'>' => {
                if self.peek_at(1) == Some(b'>') {
                    self.pos += 2;
                    Ok(Token::Keyword(Keyword::DictEnd))
                } else {
                    self.pos += 1;
                    Err(PdfError::TokenError {
                        pos: token_pos,
                        msg: "unbalanced '>'".into(),
                    })
                }
            }
            b'[' => {
                self.pos += 1;
                Ok(Token::Keyword(Keyword::ArrayStart))
            }
            b']' => {
                self.pos += 1;
                Ok(Token::Keyword(Keyword::ArrayEnd))
            }
            b'{' | b'}' | b')' => {
                self.pos += 1;
                Ok(Token::Keyword(Keyword::Other(vec![b])))
            }
            b'+' | b'-' | b'.' => {
                if matches!(self.peek_at(1), Some(c) if c.is_ascii_digit() || c == b'.') {
                    self.parse_number()
                } else {
                    Ok(self.parse_keyword())
                }
            }
            c if c.is_ascii_digit() => self.parse_number(),
            _ => Ok(self.parse_keyword()),
        };

        Some(result.map(|token| (token_pos, token)))
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Names are byte strings; bytes outside ASCII map to the matching Latin-1 char.
pub(crate) fn name_from_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(data: &[u8]) -> Vec<Token> {
        let mut lexer = Lexer::new(data);
        let mut out = Vec::new();
        while let Some(tok) = lexer.next_token() {
            out.push(tok.unwrap().1);
        }
        out
    }

    #[test]
    fn test_keyword_from_bytes_known() {
        assert_eq!(Keyword::from_bytes(b"obj"), Keyword::Obj);
        assert_eq!(Keyword::from_bytes(b"endstream"), Keyword::EndStream);
        assert_eq!(Keyword::from_bytes(b"startxref"), Keyword::StartXref);
    }

    #[test]
    fn test_keyword_round_trips_bytes() {
        for kw in [&b"R"[..], b"trailer", b"xref", b"BT"] {
            assert_eq!(Keyword::from_bytes(kw).as_bytes(), kw);
        }
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens(b"42 -7 +3 3.5 -.25 5."),
            vec![
                Token::Int(42),
                Token::Int(-7),
                Token::Int(3),
                Token::Real(3.5),
                Token::Real(-0.25),
                Token::Real(5.0),
            ]
        );
    }

    #[test]
    fn test_name_hex_escape() {
        assert_eq!(
            tokens(b"/A#20B /Type"),
            vec![Token::Name("A B".into()), Token::Name("Type".into())]
        );
    }

    #[test]
    fn test_literal_string_escapes() {
        assert_eq!(
            tokens(b"(a(b)c\\n\\101\\\nd)"),
            vec![Token::String(b"a(b)c\nAd".to_vec())]
        );
    }

    #[test]
    fn test_hex_string_odd_digits() {
        assert_eq!(tokens(b"<48 6 9 7>"), vec![Token::String(vec![0x48, 0x69, 0x70])]);
    }

    #[test]
    fn test_invalid_hex_digit_is_error() {
        let mut lexer = Lexer::new(b"<4G>");
        assert!(lexer.next_token().unwrap().is_err());
    }

    #[test]
    fn test_comments_and_delimiters() {
        assert_eq!(
            tokens(b"% comment\n<< /K [1 true] >>"),
            vec![
                Token::Keyword(Keyword::DictStart),
                Token::Name("K".into()),
                Token::Keyword(Keyword::ArrayStart),
                Token::Int(1),
                Token::Bool(true),
                Token::Keyword(Keyword::ArrayEnd),
                Token::Keyword(Keyword::DictEnd),
            ]
        );
    }

    #[test]
    fn test_token_positions() {
        let mut lexer = Lexer::new(b"  12 0 obj");
        assert_eq!(lexer.next_token().unwrap().unwrap().0, 2);
        assert_eq!(lexer.next_token().unwrap().unwrap().0, 5);
        let (pos, tok) = lexer.next_token().unwrap().unwrap();
        assert_eq!(pos, 7);
        assert_eq!(tok, Token::Keyword(Keyword::Obj));
        assert_eq!(lexer.tell(), 10);
    }
}
