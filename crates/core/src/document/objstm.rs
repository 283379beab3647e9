//! Object stream (`/Type /ObjStm`) unpacking.
//!
//! The decoded body starts with `N` pairs of integers `objid offset`,
//! followed at byte `/First` by the objects themselves. Offsets are relative
//! to `/First`.

use crate::error::{PdfError, Result};
use crate::model::objects::PDFObject;
use crate::parser::lexer::{Lexer, Token};
use crate::parser::pdf_parser::PDFParser;
use std::ops::Range;

/// Parsed header of an object stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjStmHeader {
    /// Start of the object area within the decoded body.
    pub first: usize,
    /// `(objid, offset relative to first)` in stream order.
    pub entries: Vec<(u32, usize)>,
}

impl ObjStmHeader {
    /// Parse the header of a decoded body holding `n` objects.
    ///
    /// Exactly `2 * n` non-negative integers must precede `first`.
    pub fn parse(body: &[u8], n: usize, first: usize) -> Result<Self> {
        if first > body.len() {
            return Err(PdfError::ObjStmHeader(format!(
                "/First {} is beyond the decoded body of {} bytes",
                first,
                body.len()
            )));
        }

        let mut numbers = Vec::with_capacity(n.saturating_mul(2).min(first));
        let mut lexer = Lexer::new(&body[..first]);
        while let Some(token) = lexer.next_token() {
            let (pos, token) = token?;
            match token {
                Token::Int(v) if v >= 0 => numbers.push(v),
                other => {
                    return Err(PdfError::ObjStmHeader(format!(
                        "expected non-negative integer at {pos}, got {other:?}"
                    )));
                }
            }
        }
        if numbers.len() != n.saturating_mul(2) {
            return Err(PdfError::ObjStmHeader(format!(
                "found {} integers before /First, /N {} needs {}",
                numbers.len(),
                n,
                n.saturating_mul(2)
            )));
        }

        let mut entries = Vec::with_capacity(n);
        let mut last = 0;
        for pair in numbers.chunks(2) {
            let objid = u32::try_from(pair[0])
                .map_err(|_| PdfError::ObjStmHeader(format!("object number {}", pair[0])))?;
            let offset = usize::try_from(pair[1])
                .map_err(|_| PdfError::ObjStmHeader(format!("offset {}", pair[1])))?;
            if offset < last || first + offset > body.len() {
                return Err(PdfError::ObjStmHeader(format!(
                    "offset {offset} of object {objid} is out of order or past the body"
                )));
            }
            last = offset;
            entries.push((objid, offset));
        }

        Ok(Self { first, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Byte range of object `index`; the last object runs to the end.
    pub fn object_range(&self, index: usize, body_len: usize) -> Option<Range<usize>> {
        let (_, offset) = *self.entries.get(index)?;
        let end = self
            .entries
            .get(index + 1)
            .map_or(body_len, |&(_, next)| self.first + next);
        Some(self.first + offset..end)
    }
}

/// A decoded object stream ready for extraction.
#[derive(Debug, Clone)]
pub struct ObjStm {
    pub objid: u32,
    pub header: ObjStmHeader,
    body: Vec<u8>,
}

impl ObjStm {
    pub fn new(objid: u32, body: Vec<u8>, n: usize, first: usize) -> Result<Self> {
        let header = ObjStmHeader::parse(&body, n, first)?;
        tracing::debug!(objid, objects = header.len(), "unpacked object stream");
        Ok(Self {
            objid,
            header,
            body,
        })
    }

    pub fn len(&self) -> usize {
        self.header.len()
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Parse object `index` as a bare value. Returns its object number too.
    pub fn extract(&self, index: usize) -> Result<(u32, PDFObject)> {
        let range = self
            .header
            .object_range(index, self.body.len())
            .ok_or(PdfError::MissingObjectInStream {
                stream: self.objid,
                index,
                count: self.len(),
            })?;
        let objid = self.header.entries[index].0;
        let mut parser = PDFParser::new(&self.body[range]);
        Ok((objid, parser.parse_object()?))
    }
}
