//! CCITT fax decoder
//!
//! ITU-T Recommendation T.4 - Group 3 facsimile (1D and mixed 1D/2D)
//! ITU-T Recommendation T.6 - Group 4 facsimile (pure 2D)
//!
//! Rows are tracked as lists of changing elements: the pixel positions where
//! the color switches, starting from white. Even indices are white→black
//! transitions, odd indices black→white.

use crate::codec::bit_reader::BitReader;
use crate::codec::huffman::{Color, MODE_TRIE, Mode, decode_run_length};
use crate::document::params::DEFAULT_MAX_DECODED_SIZE;
use crate::error::{PdfError, Result};
use crate::model::objects::{PDFDict, PDFObject};

/// The end-of-line marker `000000000001`.
const EOL: u32 = 1;
const EOL_BITS: u32 = 12;

/// CCITT decoding parameters, named after the `/DecodeParms` entries of
/// `/CCITTFaxDecode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CcittParams {
    /// < 0: pure 2D (G4); 0: pure 1D (G3); > 0: mixed 1D/2D (G3).
    pub k: i32,
    pub columns: usize,
    /// 0 means "unknown", otherwise must match the image height.
    pub rows: usize,
    pub end_of_line: bool,
    pub encoded_byte_align: bool,
    pub black_is_1: bool,
    pub end_of_block: bool,
    pub damaged_rows_before_error: i64,
}

impl Default for CcittParams {
    fn default() -> Self {
        Self {
            k: 0,
            columns: 1728,
            rows: 0,
            end_of_line: false,
            encoded_byte_align: false,
            black_is_1: false,
            end_of_block: true,
            damaged_rows_before_error: 0,
        }
    }
}

impl CcittParams {
    /// Read parameters from a `/DecodeParms` dictionary. Entries must already
    /// be resolved; missing entries keep their defaults.
    pub fn from_decode_parms(parms: Option<&PDFDict>) -> Result<Self> {
        let mut params = Self::default();
        let Some(dict) = parms else {
            return Ok(params);
        };
        let int = |key: &str| dict.get(key).map(PDFObject::as_int).transpose();
        let flag = |key: &str| dict.get(key).map(PDFObject::as_bool).transpose();

        if let Some(k) = int("K")? {
            params.k = i32::try_from(k.clamp(i64::from(i32::MIN), i64::from(i32::MAX)))
                .unwrap_or_default();
        }
        if let Some(columns) = dict.get("Columns") {
            params.columns = columns.as_usize()?;
        }
        if let Some(rows) = dict.get("Rows") {
            params.rows = rows.as_usize()?;
        }
        if let Some(v) = flag("EndOfLine")? {
            params.end_of_line = v;
        }
        if let Some(v) = flag("EncodedByteAlign")? {
            params.encoded_byte_align = v;
        }
        if let Some(v) = flag("BlackIs1")? {
            params.black_is_1 = v;
        }
        if let Some(v) = flag("EndOfBlock")? {
            params.end_of_block = v;
        }
        if let Some(v) = int("DamagedRowsBeforeError")? {
            params.damaged_rows_before_error = v;
        }
        Ok(params)
    }
}

/// Decode CCITT fax data into a packed 1bpp bitmap.
///
/// The result holds `height` rows of `ceil(width / 8)` bytes, MSB first.
/// White pixels are 1 bits unless `black_is_1` is set.
pub fn ccittfaxdecode(
    data: &[u8],
    width: usize,
    height: usize,
    params: &CcittParams,
) -> Result<Vec<u8>> {
    ccittfaxdecode_with_limit(data, width, height, params, DEFAULT_MAX_DECODED_SIZE)
}

/// [`ccittfaxdecode`] for images whose bitmap may not exceed `limit` bytes.
pub fn ccittfaxdecode_with_limit(
    data: &[u8],
    width: usize,
    height: usize,
    params: &CcittParams,
    limit: usize,
) -> Result<Vec<u8>> {
    if params.columns != width || (params.rows != 0 && params.rows != height) {
        return Err(PdfError::CcittDimensionMismatch {
            columns: params.columns,
            rows: params.rows,
            width,
            height,
        });
    }
    if params.damaged_rows_before_error != 0 && params.k >= 0 {
        return Err(PdfError::Unsupported(format!(
            "DamagedRowsBeforeError {} with K={}",
            params.damaged_rows_before_error, params.k
        )));
    }

    tracing::debug!(
        width,
        height,
        k = params.k,
        end_of_block = params.end_of_block,
        "decoding CCITT image"
    );

    let row_bytes = width.div_ceil(8);
    let total = row_bytes
        .checked_mul(height)
        .filter(|&total| total <= limit)
        .ok_or_else(|| {
            PdfError::DecodeError(format!(
                "CCITT image of {width}x{height} exceeds {limit} bytes"
            ))
        })?;
    // rows are appended as they decode; the data bounds how many there can be
    let mut out = Vec::with_capacity(total.min(data.len().saturating_mul(8)));
    if width == 0 {
        return Ok(out);
    }

    let mut decoder = Decoder {
        reader: BitReader::new(data),
        width,
        height,
        params,
    };
    // The line above the first row is all white.
    let mut reference: Vec<usize> = Vec::new();
    for row in 0..height {
        let coding = if decoder.start_row(row)? {
            decoder.decode_2d_row(&reference)?
        } else {
            decoder.decode_1d_row()?
        };
        pack_row(&coding, width, &mut out);
        reference = coding;
    }

    if params.black_is_1 {
        for b in &mut out {
            *b ^= 0xFF;
        }
    }
    Ok(out)
}

struct Decoder<'a> {
    reader: BitReader<'a>,
    width: usize,
    height: usize,
    params: &'a CcittParams,
}

impl Decoder<'_> {
    /// Consume line-start markers. Returns whether the row is 2D coded.
    fn start_row(&mut self, row: usize) -> Result<bool> {
        if self.params.encoded_byte_align {
            self.reader.align_to_byte();
        }
        let saw_eol = self.skip_eol();
        if saw_eol && self.reader.peek_bits(EOL_BITS) == EOL {
            // EOFB (G4) or RTC (G3)
            return Err(PdfError::DecodeError(format!(
                "end-of-block marker after {} of {} rows",
                row, self.height
            )));
        }
        if !saw_eol && self.params.end_of_line {
            return Err(PdfError::Unsupported(format!(
                "EndOfLine is set but row {row} has no EOL marker"
            )));
        }
        if self.reader.is_exhausted() {
            return Err(PdfError::DecodeError(format!(
                "data ends after {} of {} rows",
                row, self.height
            )));
        }
        match self.params.k {
            k if k < 0 => Ok(true),
            0 => Ok(false),
            k => {
                // groups of K+1 rows, the first one 1D
                let two_d = row % (k as usize + 1) != 0;
                // tag bit: 1 = 1D, 0 = 2D
                let tagged_two_d = self.reader.read_bit() == 0;
                if tagged_two_d != two_d {
                    return Err(PdfError::DecodeError(format!(
                        "row {row} is tagged {}D, K={k} requires {}D",
                        if tagged_two_d { 2 } else { 1 },
                        if two_d { 2 } else { 1 }
                    )));
                }
                Ok(two_d)
            }
        }
    }

    /// Skip fill bits and one EOL marker if present.
    ///
    /// No run-length or mode code starts with more than seven zeros, so eleven
    /// zeros followed by a one can only be an EOL.
    fn skip_eol(&mut self) -> bool {
        let saved = self.reader.save_position();
        let mut zeros = 0usize;
        loop {
            if self.reader.is_exhausted() {
                self.reader.restore_position(saved);
                return false;
            }
            if self.reader.read_bit() == 1 {
                break;
            }
            zeros += 1;
        }
        if zeros >= 11 {
            true
        } else {
            self.reader.restore_position(saved);
            false
        }
    }

    fn decode_1d_row(&mut self) -> Result<Vec<usize>> {
        let mut coding = Vec::new();
        let mut pos = 0;
        let mut color = Color::White;
        while pos < self.width {
            let run = decode_run_length(&mut self.reader, color)? as usize;
            pos = (pos + run).min(self.width);
            push_change(&mut coding, pos);
            color = color.flip();
        }
        truncate_changes(&mut coding, self.width);
        Ok(coding)
    }

    fn decode_2d_row(&mut self, reference: &[usize]) -> Result<Vec<usize>> {
        let width = self.width;
        let mut coding: Vec<usize> = Vec::new();
        // -1 is the imaginary white pixel before the row
        let mut a0: isize = -1;

        while a0 < width as isize {
            let color = if coding.len() % 2 == 0 {
                Color::White
            } else {
                Color::Black
            };
            let mode = MODE_TRIE.decode(&mut self.reader)?;
            let (b1, b2) = find_b1_b2(reference, a0, color, width);
            let start = a0.max(0) as usize;

            match mode {
                Mode::Pass => {
                    a0 = b2 as isize;
                }
                Mode::Horizontal => {
                    let first = decode_run_length(&mut self.reader, color)? as usize;
                    let second = decode_run_length(&mut self.reader, color.flip())? as usize;
                    let a1 = (start + first).min(width);
                    let a2 = (a1 + second).min(width);
                    push_change(&mut coding, a1);
                    push_change(&mut coding, a2);
                    a0 = a2 as isize;
                }
                Mode::Vertical(delta) => {
                    let a1 = b1 as isize + isize::from(delta);
                    if a1 < 0 || a1 < a0 {
                        return Err(PdfError::DecodeError(format!(
                            "vertical code V({delta}) gives negative run at a0={a0}"
                        )));
                    }
                    let a1 = (a1 as usize).min(width);
                    push_change(&mut coding, a1);
                    a0 = a1 as isize;
                }
                Mode::Extension(code) => {
                    tracing::warn!(
                        code,
                        position = start,
                        "2D extension code, current color runs to end of row"
                    );
                    a0 = width as isize;
                }
            }
        }

        truncate_changes(&mut coding, width);
        Ok(coding)
    }
}

/// Locate b1 (first change on the reference line right of `a0` whose new
/// color is opposite to `color`) and b2 (the change after it). Missing
/// changes sit at `width`.
fn find_b1_b2(reference: &[usize], a0: isize, color: Color, width: usize) -> (usize, usize) {
    let parity = match color {
        Color::White => 0,
        Color::Black => 1,
    };
    let found = reference
        .iter()
        .enumerate()
        .find(|&(i, &c)| c as isize > a0 && i % 2 == parity);
    match found {
        Some((i, &b1)) => (b1, reference.get(i + 1).copied().unwrap_or(width)),
        None => (width, width),
    }
}

/// Append a change at `pos`; a change at the same position as the previous
/// one cancels it (zero-length run).
fn push_change(coding: &mut Vec<usize>, pos: usize) {
    if coding.last() == Some(&pos) {
        coding.pop();
    } else {
        coding.push(pos);
    }
}

fn truncate_changes(coding: &mut Vec<usize>, width: usize) {
    while coding.last().is_some_and(|&c| c >= width) {
        coding.pop();
    }
}

/// Paint black spans onto an all-white row and append it to `out`.
fn pack_row(coding: &[usize], width: usize, out: &mut Vec<u8>) {
    let start = out.len();
    out.resize(start + width.div_ceil(8), 0xFF);
    let row = &mut out[start..];
    for span in coding.chunks(2) {
        let from = span[0];
        let to = span.get(1).copied().unwrap_or(width).min(width);
        for x in from..to {
            row[x / 8] &= !(0x80 >> (x % 8));
        }
    }
}
