//! LZW stream decoder (PDF variant: MSB first, 9 to 12 bit codes).

use crate::codec::bit_reader::BitReader;
use crate::document::params::DEFAULT_MAX_DECODED_SIZE;
use crate::error::{PdfError, Result};
use crate::model::objects::PDFDict;

const CLEAR: u16 = 256;
const EOD: u16 = 257;
const FIRST_FREE: u16 = 258;
const MAX_ENTRIES: usize = 4096;
const MIN_WIDTH: u32 = 9;
const MAX_WIDTH: u32 = 12;

/// `/DecodeParms` of an `/LZWDecode` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzwParams {
    /// 1 (the default) switches code width one entry early, 0 does not.
    pub early_change: u8,
}

impl Default for LzwParams {
    fn default() -> Self {
        Self { early_change: 1 }
    }
}

impl LzwParams {
    pub fn from_decode_parms(parms: Option<&PDFDict>) -> Result<Self> {
        match parms.and_then(|d| d.get("EarlyChange")) {
            None => Ok(Self::default()),
            Some(v) => Ok(Self {
                early_change: checked_early_change(v.as_int()?)?,
            }),
        }
    }
}

fn checked_early_change(value: i64) -> Result<u8> {
    match value {
        0 => Ok(0),
        1 => Ok(1),
        other => Err(PdfError::Unsupported(format!("LZW EarlyChange {other}"))),
    }
}

/// Decode LZW-encoded data with the PDF default EarlyChange of 1.
pub fn lzwdecode(data: &[u8]) -> Result<Vec<u8>> {
    lzwdecode_with_earlychange(data, 1)
}

/// Decode LZW-encoded data with an explicit EarlyChange setting (0 or 1).
pub fn lzwdecode_with_earlychange(data: &[u8], early_change: i64) -> Result<Vec<u8>> {
    lzwdecode_with_limit(data, early_change, DEFAULT_MAX_DECODED_SIZE)
}

/// Decode LZW-encoded data, failing as soon as the output exceeds `limit`
/// bytes.
pub fn lzwdecode_with_limit(data: &[u8], early_change: i64, limit: usize) -> Result<Vec<u8>> {
    let early_change = checked_early_change(early_change)?;
    Dictionary::new().decode(data, usize::from(early_change), limit)
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    prefix: u16,
    byte: u8,
    first: u8,
    len: u16,
}

/// Code table. Strings are stored as (prefix code, last byte) chains.
struct Dictionary {
    entries: Vec<Entry>,
}

impl Dictionary {
    fn new() -> Self {
        let mut entries = Vec::with_capacity(MAX_ENTRIES);
        entries.extend((0..=255u8).map(|b| Entry {
            prefix: 0,
            byte: b,
            first: b,
            len: 1,
        }));
        Self { entries }
    }

    fn reset(&mut self) {
        self.entries.truncate(256);
    }

    fn next_code(&self) -> usize {
        self.entries.len().max(usize::from(FIRST_FREE))
    }

    fn add(&mut self, prefix: u16, byte: u8) {
        let next = self.next_code();
        if next >= MAX_ENTRIES {
            return;
        }
        // Codes 256 and 257 are never looked up; keep indices aligned.
        while self.entries.len() < next {
            self.entries.push(Entry {
                prefix: 0,
                byte: 0,
                first: 0,
                len: 0,
            });
        }
        let p = self.entries[usize::from(prefix)];
        self.entries.push(Entry {
            prefix,
            byte,
            first: p.first,
            len: p.len + 1,
        });
    }

    fn get(&self, code: u16) -> Option<Entry> {
        self.entries
            .get(usize::from(code))
            .copied()
            .filter(|e| e.len > 0)
    }

    /// Append the string for `code` to `out`.
    fn emit(&self, code: u16, out: &mut Vec<u8>) {
        let Some(entry) = self.get(code) else {
            return;
        };
        let start = out.len();
        out.resize(start + usize::from(entry.len), 0);
        let mut cur = entry;
        let mut i = out.len();
        loop {
            i -= 1;
            out[i] = cur.byte;
            if i == start {
                break;
            }
            cur = self.entries[usize::from(cur.prefix)];
        }
    }

    fn decode(mut self, data: &[u8], early_change: usize, limit: usize) -> Result<Vec<u8>> {
        let mut reader = BitReader::new(data);
        let total_bits = data.len().saturating_mul(8);
        let mut out = Vec::with_capacity(data.len().saturating_mul(2).min(limit));
        let mut width = MIN_WIDTH;
        let mut prev: Option<u16> = None;

        loop {
            if reader.bit_offset() + width as usize > total_bits {
                tracing::debug!(
                    decoded = out.len(),
                    "LZW data ends without EOD marker"
                );
                break;
            }
            let code = reader.read_bits(width) as u16;
            match code {
                CLEAR => {
                    self.reset();
                    width = MIN_WIDTH;
                    prev = None;
                    continue;
                }
                EOD => break,
                _ => {}
            }

            let next = self.next_code();
            match (self.get(code), prev) {
                (Some(entry), Some(p)) => {
                    self.emit(code, &mut out);
                    self.add(p, entry.first);
                }
                (Some(_), None) => self.emit(code, &mut out),
                (None, Some(p)) if usize::from(code) == next => {
                    // KwKwK: the string is prev + first byte of prev
                    let first = self.get(p).map_or(0, |e| e.first);
                    self.add(p, first);
                    self.emit(code, &mut out);
                }
                _ => {
                    return Err(PdfError::DecodeError(format!(
                        "invalid LZW code {code} (next free code {next})"
                    )));
                }
            }
            prev = Some(code);
            if out.len() > limit {
                return Err(PdfError::DecodeError(format!(
                    "LZWDecode output exceeds {limit} bytes"
                )));
            }

            if self.next_code() + early_change >= 1 << width && width < MAX_WIDTH {
                width += 1;
            }
        }
        Ok(out)
    }
}
