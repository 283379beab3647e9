//! PDF parser - converts tokens to PDF objects.
//!
//! Also parses indirect objects (`N G obj ... endobj`) at a byte offset,
//! including slicing the body of stream objects out of the file buffer.

use crate::error::{PdfError, Result};
use crate::model::objects::{PDFDict, PDFObjRef, PDFObject, PDFStream};
use crate::parser::lexer::{Keyword, Lexer, Token};
use bytes::Bytes;

/// PDF Parser - parses PDF object syntax
///
/// Uses [`Lexer`] for tokenization and builds PDF objects, folding
/// `num num R` triples into references.
pub struct PDFParser<'a> {
    lexer: Lexer<'a>,
    /// Pushed-back tokens with their positions; the last entry is returned first.
    lookahead: Vec<(usize, Token)>,
}

impl<'a> PDFParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            lexer: Lexer::new(data),
            lookahead: Vec::new(),
        }
    }

    /// Position of the next token to be consumed.
    pub fn tell(&self) -> usize {
        match self.lookahead.last() {
            Some((pos, _)) => *pos,
            None => self.lexer.tell(),
        }
    }

    /// Move to an absolute position, dropping any lookahead.
    pub fn set_pos(&mut self, pos: usize) {
        self.lookahead.clear();
        self.lexer.set_pos(pos);
    }

    /// Get remaining unparsed data.
    pub fn remaining(&self) -> &'a [u8] {
        &self.lexer.data()[self.tell()..]
    }

    /// Get next token (from lookahead or lexer)
    pub fn next_token(&mut self) -> Result<Option<(usize, Token)>> {
        if let Some(tok) = self.lookahead.pop() {
            return Ok(Some(tok));
        }
        self.lexer.next_token().transpose()
    }

    fn push_back(&mut self, pos: usize, tok: Token) {
        self.lookahead.push((pos, tok));
    }

    /// Parse next PDF object
    pub fn parse_object(&mut self) -> Result<PDFObject> {
        let (pos, token) = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;
        self.token_to_object(pos, token)
    }

    /// Convert a token to a PDF object
    fn token_to_object(&mut self, pos: usize, token: Token) -> Result<PDFObject> {
        match token {
            Token::Int(n) => {
                if let Some(objref) = self.try_reference(n)? {
                    return Ok(PDFObject::Ref(objref));
                }
                Ok(PDFObject::Int(n))
            }
            Token::Real(n) => Ok(PDFObject::Real(n)),
            Token::Bool(b) => Ok(PDFObject::Bool(b)),
            Token::Name(s) => Ok(PDFObject::Name(s)),
            Token::String(s) => Ok(PDFObject::String(s)),
            Token::Keyword(Keyword::Null) => Ok(PDFObject::Null),
            Token::Keyword(Keyword::ArrayStart) => self.parse_array(),
            Token::Keyword(Keyword::DictStart) => self.parse_dict(),
            Token::Keyword(kw) => Err(PdfError::TokenError {
                pos,
                msg: format!(
                    "unexpected keyword: {}",
                    String::from_utf8_lossy(kw.as_bytes())
                ),
            }),
        }
    }

    /// Having read integer `n`, check whether `n m R` follows.
    fn try_reference(&mut self, n: i64) -> Result<Option<PDFObjRef>> {
        let Some((pos2, tok2)) = self.next_token()? else {
            return Ok(None);
        };
        let Token::Int(m) = tok2 else {
            self.push_back(pos2, tok2);
            return Ok(None);
        };
        let Some((pos3, tok3)) = self.next_token()? else {
            self.push_back(pos2, Token::Int(m));
            return Ok(None);
        };
        if tok3 == Token::Keyword(Keyword::R) {
            let objid = u32::try_from(n).map_err(|_| PdfError::TokenError {
                pos: pos2,
                msg: format!("invalid object number in reference: {n}"),
            })?;
            let genno = u32::try_from(m).map_err(|_| PdfError::TokenError {
                pos: pos2,
                msg: format!("invalid generation number in reference: {m}"),
            })?;
            return Ok(Some(PDFObjRef::new(objid, genno)));
        }
        self.push_back(pos3, tok3);
        self.push_back(pos2, Token::Int(m));
        Ok(None)
    }

    /// Parse array contents until ]
    fn parse_array(&mut self) -> Result<PDFObject> {
        let mut arr = Vec::new();

        loop {
            let (pos, token) = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;
            if token == Token::Keyword(Keyword::ArrayEnd) {
                break;
            }
            arr.push(self.token_to_object(pos, token)?);
        }

        Ok(PDFObject::Array(arr))
    }

    /// Parse dict contents until >>
    fn parse_dict(&mut self) -> Result<PDFObject> {
        let mut dict = PDFDict::new();

        loop {
            let (pos, token) = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;

            let key = match token {
                Token::Keyword(Keyword::DictEnd) => break,
                Token::Name(name) => name,
                _ => {
                    return Err(PdfError::TokenError {
                        pos,
                        msg: "expected name as dict key".into(),
                    });
                }
            };

            let value = self.parse_object()?;
            // A null value is equivalent to an absent entry.
            if !value.is_null() {
                dict.insert(key, value);
            }
        }

        Ok(PDFObject::Dict(dict))
    }
}

/// Skip PDF whitespace starting at `pos`, returning the first non-blank index.
pub(crate) fn skip_blank(data: &[u8], mut pos: usize) -> usize {
    while pos < data.len() && Lexer::is_whitespace(data[pos]) {
        pos += 1;
    }
    pos
}

/// Parse the indirect object starting at `offset`.
///
/// `expected` is the object number the caller is looking for; a header that
/// names a different object is a structural error. For streams, `length_of`
/// receives the `/Length` entry and turns it into a byte count, which lets the
/// caller resolve an indirect length.
pub fn parse_indirect_object<F>(
    data: &Bytes,
    offset: usize,
    expected: Option<u32>,
    mut length_of: F,
) -> Result<(PDFObjRef, PDFObject)>
where
    F: FnMut(&PDFObject) -> Result<usize>,
{
    if offset >= data.len() {
        return Err(PdfError::SyntaxError(format!(
            "object offset {} exceeds file size {}",
            offset,
            data.len()
        )));
    }

    let buf: &[u8] = data.as_ref();
    let mut parser = PDFParser::new(buf);
    parser.set_pos(offset);

    let header = (
        parser.next_token()?.map(|(_, t)| t),
        parser.next_token()?.map(|(_, t)| t),
        parser.next_token()?.map(|(_, t)| t),
    );
    let objref = match header {
        (Some(Token::Int(n)), Some(Token::Int(g)), Some(Token::Keyword(Keyword::Obj))) => {
            match (u32::try_from(n), u32::try_from(g)) {
                (Ok(objid), Ok(genno)) => PDFObjRef::new(objid, genno),
                _ => {
                    return Err(PdfError::SyntaxError(format!(
                        "invalid object header {n} {g} at offset {offset}"
                    )));
                }
            }
        }
        _ => {
            let end = (offset + 16).min(buf.len());
            return Err(PdfError::SyntaxError(format!(
                "expected 'N G obj' at offset {}, got {:?}",
                offset,
                String::from_utf8_lossy(&buf[offset..end])
            )));
        }
    };

    if let Some(objid) = expected
        && objid != objref.objid
    {
        return Err(PdfError::SyntaxError(format!(
            "offset {} holds object {}, expected {}",
            offset, objref.objid, objid
        )));
    }

    let obj = parser.parse_object()?;
    let PDFObject::Dict(dict) = obj else {
        return Ok((objref, obj));
    };

    let mut pos = skip_blank(buf, parser.tell());
    if !buf[pos..].starts_with(b"stream") {
        return Ok((objref, PDFObject::Dict(dict)));
    }
    pos += 6;
    if buf.get(pos) == Some(&b'\r') {
        pos += 1;
    }
    if buf.get(pos) == Some(&b'\n') {
        pos += 1;
    }

    let length_obj = dict.get("Length").ok_or_else(|| {
        PdfError::SyntaxError(format!("stream object {} has no /Length", objref.objid))
    })?;
    let length = length_of(length_obj)?;

    let end = pos
        .checked_add(length)
        .filter(|&end| end <= buf.len())
        .ok_or_else(|| {
            PdfError::SyntaxError(format!(
                "stream of object {} runs past end of file (/Length {})",
                objref.objid, length
            ))
        })?;

    let after = skip_blank(buf, end);
    if !buf[after..].starts_with(b"endstream") {
        return Err(PdfError::SyntaxError(format!(
            "/Length {} of object {} does not end at 'endstream'",
            length, objref.objid
        )));
    }

    let mut stream = PDFStream::new(dict, data.slice(pos..end));
    stream.set_objid(objref.objid, objref.genno);
    Ok((objref, PDFObject::Stream(Box::new(stream))))
}
