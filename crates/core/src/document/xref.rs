//! Cross-reference loading.
//!
//! Reads classic `xref` tables and cross-reference streams, follows `/Prev`
//! and `/XRefStm` chains, and merges every section into one
//! `objid -> XRefEntry` map plus the trailer dictionary.

use crate::codec::filters::decode_stream;
use crate::document::params::DEFAULT_MAX_DECODED_SIZE;
use crate::error::{PdfError, Result};
use crate::model::objects::{PDFDict, PDFObject};
use crate::parser::lexer::{Keyword, Token};
use crate::parser::pdf_parser::{PDFParser, parse_indirect_object, skip_blank};
use bytes::Bytes;
use std::collections::{HashMap, HashSet};

/// Location of an object in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    Free,
    /// Indirect object at a byte offset.
    Direct { offset: usize, genno: u32 },
    /// Object number `index` inside object stream `stream_objid`.
    Compressed { stream_objid: u32, index: usize },
}

/// Cross-reference table for locating objects in a PDF.
#[derive(Debug, Clone, Default)]
pub struct XRefTable {
    entries: HashMap<u32, XRefEntry>,
    trailer: PDFDict,
}

/// One xref section as found in the file, before merging.
#[derive(Debug, Default)]
struct XRefSection {
    entries: Vec<(u32, XRefEntry)>,
    trailer: PDFDict,
}

/// Keys of an xref stream dictionary that describe the stream itself.
const XREF_STREAM_KEYS: &[&str] = &["Length", "Filter", "DecodeParms", "W", "Index", "Type"];

impl XRefTable {
    /// Build a table from already known entries.
    pub fn new(entries: HashMap<u32, XRefEntry>, trailer: PDFDict) -> Self {
        Self { entries, trailer }
    }

    /// Load the cross-reference chain of a complete file.
    pub fn load(data: &Bytes) -> Result<Self> {
        Self::load_with_limit(data, DEFAULT_MAX_DECODED_SIZE)
    }

    /// Like [`XRefTable::load`], bounding decoded xref stream size.
    pub fn load_with_limit(data: &Bytes, limit: usize) -> Result<Self> {
        let start = find_startxref(data)?;

        // newest first
        let mut sections = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(start);
        while let Some(pos) = next {
            if !visited.insert(pos) {
                return Err(PdfError::SyntaxError(format!(
                    "xref /Prev chain loops back to offset {pos}"
                )));
            }
            let mut section = load_section(data, pos, limit)?;

            if let Some(stm) = section.trailer.get("XRefStm") {
                let stm_pos = stm.as_usize()?;
                if visited.insert(stm_pos) {
                    let hybrid = load_xref_stream(data, stm_pos, limit)?;
                    tracing::debug!(
                        offset = stm_pos,
                        entries = hybrid.entries.len(),
                        "loaded hybrid /XRefStm section"
                    );
                    section.entries.extend(hybrid.entries);
                }
            }

            next = section
                .trailer
                .get("Prev")
                .map(PDFObject::as_usize)
                .transpose()?;
            tracing::debug!(
                offset = pos,
                entries = section.entries.len(),
                prev = ?next,
                "loaded xref section"
            );
            sections.push(section);
        }

        let mut table = Self::default();
        for section in sections.into_iter().rev() {
            table.entries.extend(section.entries);
            table.trailer.extend(section.trailer);
        }
        Ok(table)
    }

    /// Entry for `objid`, if any section mentions it.
    pub fn get(&self, objid: u32) -> Option<XRefEntry> {
        self.entries.get(&objid).copied()
    }

    pub const fn trailer(&self) -> &PDFDict {
        &self.trailer
    }

    pub const fn entries(&self) -> &HashMap<u32, XRefEntry> {
        &self.entries
    }

    /// Object numbers of all in-use objects, ascending.
    pub fn objids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .entries
            .iter()
            .filter(|(_, e)| !matches!(e, XRefEntry::Free))
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Find the offset named by the last `startxref` in the final 1024 bytes.
pub fn find_startxref(data: &[u8]) -> Result<usize> {
    let needle = b"startxref";
    let search_start = data.len().saturating_sub(1024);
    let hay = &data[search_start..];
    let found = hay
        .windows(needle.len())
        .rposition(|w| w == needle)
        .ok_or_else(|| PdfError::SyntaxError("startxref not found".into()))?;

    let mut parser = PDFParser::new(data);
    parser.set_pos(search_start + found + needle.len());
    match parser.next_token()? {
        Some((_, Token::Int(n))) => usize::try_from(n)
            .map_err(|_| PdfError::SyntaxError(format!("invalid startxref offset {n}"))),
        _ => Err(PdfError::SyntaxError(
            "startxref is not followed by an offset".into(),
        )),
    }
}

fn load_section(data: &Bytes, pos: usize, limit: usize) -> Result<XRefSection> {
    if pos >= data.len() {
        return Err(PdfError::SyntaxError(format!(
            "xref offset {} exceeds file size {}",
            pos,
            data.len()
        )));
    }
    let pos = skip_blank(data, pos);
    if data[pos..].starts_with(b"xref") {
        load_classic_xref(data, pos)
    } else {
        load_xref_stream(data, pos, limit)
    }
}

fn expect_int(parser: &mut PDFParser<'_>, what: &str) -> Result<i64> {
    match parser.next_token()? {
        Some((_, Token::Int(n))) => Ok(n),
        Some((pos, tok)) => Err(PdfError::SyntaxError(format!(
            "expected {what} in xref table at {pos}, got {tok:?}"
        ))),
        None => Err(PdfError::UnexpectedEof),
    }
}

fn to_u32(n: i64, what: &str) -> Result<u32> {
    u32::try_from(n).map_err(|_| PdfError::SyntaxError(format!("invalid {what} {n}")))
}

/// Parse a classic `xref` table and the trailer that follows it.
fn load_classic_xref(data: &[u8], pos: usize) -> Result<XRefSection> {
    let mut section = XRefSection::default();
    let mut parser = PDFParser::new(data);
    parser.set_pos(pos + 4);

    loop {
        let (tok_pos, token) = parser.next_token()?.ok_or(PdfError::UnexpectedEof)?;
        let start = match token {
            Token::Keyword(Keyword::Trailer) => break,
            Token::Int(n) => to_u32(n, "subsection start")?,
            other => {
                return Err(PdfError::SyntaxError(format!(
                    "unexpected {other:?} in xref table at {tok_pos}"
                )));
            }
        };
        let count = to_u32(expect_int(&mut parser, "subsection count")?, "count")?;

        let mut base = start;
        for i in 0..count {
            let offset = expect_int(&mut parser, "offset")?;
            let genno = expect_int(&mut parser, "generation")?;
            let marker = match parser.next_token()? {
                Some((_, Token::Keyword(Keyword::Other(m)))) if m == b"n" || m == b"f" => m[0],
                other => {
                    return Err(PdfError::SyntaxError(format!(
                        "expected 'n' or 'f' in xref table, got {other:?}"
                    )));
                }
            };

            // Some writers start the first subsection at 1 but still include
            // the object 0 free entry.
            if i == 0 && base > 0 && marker == b'f' && offset == 0 && genno == 65535 {
                base -= 1;
            }

            let objid = base
                .checked_add(i)
                .ok_or_else(|| PdfError::SyntaxError("xref object number overflow".into()))?;
            let entry = if marker == b'n' {
                XRefEntry::Direct {
                    offset: usize::try_from(offset).map_err(|_| {
                        PdfError::SyntaxError(format!("invalid offset {offset} for object {objid}"))
                    })?,
                    genno: to_u32(genno, "generation")?,
                }
            } else {
                XRefEntry::Free
            };
            section.entries.push((objid, entry));
        }
    }

    section.trailer = match parser.parse_object()? {
        PDFObject::Dict(dict) => dict,
        other => {
            return Err(PdfError::TypeError {
                expected: "trailer dict",
                got: other.type_name(),
            });
        }
    };
    Ok(section)
}

fn read_bytes_as_int(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0, |acc, &b| (acc << 8) | u64::from(b))
}

/// Parse a cross-reference stream (PDF 1.5+).
fn load_xref_stream(data: &Bytes, pos: usize, limit: usize) -> Result<XRefSection> {
    let (objref, obj) = parse_indirect_object(data, pos, None, PDFObject::as_usize)?;
    let stream = obj.as_stream()?;
    if let Some(t) = stream.type_name()
        && t != "XRef"
    {
        return Err(PdfError::SyntaxError(format!(
            "object {} at xref offset {} is /{}",
            objref.objid, pos, t
        )));
    }

    let widths = stream
        .get("W")
        .ok_or_else(|| PdfError::SyntaxError("missing /W in xref stream".into()))?
        .as_array()?
        .iter()
        .map(PDFObject::as_usize)
        .collect::<Result<Vec<_>>>()?;
    let [w0, w1, w2] = widths[..] else {
        return Err(PdfError::SyntaxError("/W must have 3 elements".into()));
    };
    if widths.iter().any(|&w| w > 8) {
        return Err(PdfError::SyntaxError(format!("/W field too wide: {widths:?}")));
    }
    let entry_size = w0 + w1 + w2;

    let size = stream
        .get("Size")
        .ok_or_else(|| PdfError::SyntaxError("missing /Size in xref stream".into()))?
        .as_usize()?;

    let index = match stream.get("Index") {
        Some(idx) => {
            let arr = idx.as_array()?;
            if arr.len() % 2 != 0 {
                return Err(PdfError::SyntaxError(
                    "/Index must hold start/count pairs".into(),
                ));
            }
            arr.chunks(2)
                .map(|pair| -> Result<(u32, usize)> {
                    Ok((to_u32(pair[0].as_int()?, "start")?, pair[1].as_usize()?))
                })
                .collect::<Result<Vec<_>>>()?
        }
        None => vec![(0, size)],
    };

    let body = decode_stream(stream, limit)?;

    let mut section = XRefSection::default();
    let mut cursor = 0;
    for (start, count) in index {
        for i in 0..count {
            let objid = start
                .checked_add(u32::try_from(i).unwrap_or(u32::MAX))
                .ok_or_else(|| PdfError::SyntaxError("xref object number overflow".into()))?;
            let Some(row) = body.get(cursor..cursor + entry_size) else {
                return Err(PdfError::SyntaxError(format!(
                    "xref stream data ends at object {objid}"
                )));
            };
            cursor += entry_size;

            let kind = if w0 > 0 {
                read_bytes_as_int(&row[..w0])
            } else {
                1
            };
            let field1 = read_bytes_as_int(&row[w0..w0 + w1]);
            let field2 = read_bytes_as_int(&row[w0 + w1..]);

            let entry = match kind {
                0 => XRefEntry::Free,
                1 => XRefEntry::Direct {
                    offset: usize::try_from(field1).map_err(|_| {
                        PdfError::SyntaxError(format!("invalid offset for object {objid}"))
                    })?,
                    genno: u32::try_from(field2).unwrap_or(u32::MAX),
                },
                2 => XRefEntry::Compressed {
                    stream_objid: u32::try_from(field1).map_err(|_| {
                        PdfError::SyntaxError(format!("invalid object stream number {field1}"))
                    })?,
                    index: usize::try_from(field2).map_err(|_| {
                        PdfError::SyntaxError(format!("invalid object stream index {field2}"))
                    })?,
                },
                other => {
                    return Err(PdfError::Unsupported(format!(
                        "xref stream entry type {other} for object {objid}"
                    )));
                }
            };
            section.entries.push((objid, entry));
        }
    }

    section.trailer = stream
        .attrs
        .iter()
        .filter(|(k, _)| !XREF_STREAM_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Ok(section)
}
