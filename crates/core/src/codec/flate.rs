//! FlateDecode and the `/Predictor` post-processing shared with LZWDecode.

use crate::error::{PdfError, Result};
use crate::model::objects::PDFDict;
use std::io::Read;

/// Inflate zlib data, failing if the output exceeds `limit` bytes.
pub fn flate_decode(data: &[u8], limit: usize) -> Result<Vec<u8>> {
    let mut decoder = flate2::read::ZlibDecoder::new(data).take((limit as u64).saturating_add(1));
    let mut out = Vec::with_capacity(data.len().saturating_mul(2).min(limit));
    decoder
        .read_to_end(&mut out)
        .map_err(|e| PdfError::DecodeError(format!("FlateDecode: {e}")))?;
    if out.len() > limit {
        return Err(PdfError::DecodeError(format!(
            "FlateDecode output exceeds {limit} bytes"
        )));
    }
    Ok(out)
}

/// Predictor entries of a Flate or LZW `/DecodeParms` dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictorParams {
    pub predictor: i64,
    pub colors: usize,
    pub bits_per_component: usize,
    pub columns: usize,
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
        }
    }
}

impl PredictorParams {
    pub fn from_decode_parms(parms: Option<&PDFDict>) -> Result<Self> {
        let mut params = Self::default();
        let Some(dict) = parms else {
            return Ok(params);
        };
        if let Some(p) = dict.get("Predictor") {
            params.predictor = p.as_int()?;
        }
        if let Some(c) = dict.get("Colors") {
            params.colors = c.as_usize()?.max(1);
        }
        if let Some(b) = dict.get("BitsPerComponent") {
            params.bits_per_component = b.as_usize()?;
        }
        if let Some(c) = dict.get("Columns") {
            params.columns = c.as_usize()?.max(1);
        }
        Ok(params)
    }

    /// Bytes per row, excluding the PNG filter-type byte.
    fn row_bytes(&self) -> Result<usize> {
        self.colors
            .checked_mul(self.columns)
            .and_then(|n| n.checked_mul(self.bits_per_component))
            .map(|bits| bits.div_ceil(8))
            .ok_or_else(|| {
                PdfError::DecodeError(format!(
                    "predictor row of {} columns overflows",
                    self.columns
                ))
            })
    }

    /// Bytes per complete pixel, at least 1.
    fn pixel_bytes(&self) -> Result<usize> {
        self.colors
            .checked_mul(self.bits_per_component)
            .map(|bits| bits.div_ceil(8).max(1))
            .ok_or_else(|| {
                PdfError::DecodeError(format!("{} colors per pixel overflows", self.colors))
            })
    }
}

/// Undo the predictor named in `params`.
pub fn apply_predictor(data: Vec<u8>, params: &PredictorParams) -> Result<Vec<u8>> {
    match params.predictor {
        1 => Ok(data),
        2 => apply_tiff_predictor(data, params),
        10..=15 => apply_png_predictor(&data, params),
        other => Err(PdfError::Unsupported(format!("predictor {other}"))),
    }
}

fn apply_tiff_predictor(mut data: Vec<u8>, params: &PredictorParams) -> Result<Vec<u8>> {
    if params.bits_per_component != 8 {
        return Err(PdfError::Unsupported(format!(
            "TIFF predictor with {} bits per component",
            params.bits_per_component
        )));
    }
    let row_bytes = params.row_bytes()?.max(1);
    let colors = params.colors;
    for row in data.chunks_mut(row_bytes) {
        for i in colors..row.len() {
            row[i] = row[i].wrapping_add(row[i - colors]);
        }
    }
    Ok(data)
}

/// PNG prediction puts a filter-type byte in front of every row.
fn apply_png_predictor(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>> {
    let row_bytes = params.row_bytes()?;
    let bpp = params.pixel_bytes()?;
    let row_size = row_bytes + 1;
    if !data.is_empty() && row_size > data.len() {
        return Err(PdfError::DecodeError(format!(
            "predictor row of {row_size} bytes is longer than the {} bytes of data",
            data.len()
        )));
    }

    let mut result = Vec::with_capacity(data.len());
    let mut prev_row = vec![0u8; row_bytes];
    let mut current_row = vec![0u8; row_bytes];

    for row in data.chunks(row_size) {
        if row.len() < row_size {
            tracing::debug!(
                trailing = row.len(),
                row_size,
                "dropping incomplete predictor row"
            );
            break;
        }
        let row_data = &row[1..];

        match row[0] {
            0 => current_row.copy_from_slice(row_data),
            1 => {
                // Sub
                for i in 0..row_bytes {
                    let left = if i >= bpp { current_row[i - bpp] } else { 0 };
                    current_row[i] = row_data[i].wrapping_add(left);
                }
            }
            2 => {
                // Up
                for i in 0..row_bytes {
                    current_row[i] = row_data[i].wrapping_add(prev_row[i]);
                }
            }
            3 => {
                // Average
                for i in 0..row_bytes {
                    let left = if i >= bpp {
                        u16::from(current_row[i - bpp])
                    } else {
                        0
                    };
                    let above = u16::from(prev_row[i]);
                    current_row[i] = row_data[i].wrapping_add(((left + above) / 2) as u8);
                }
            }
            4 => {
                for i in 0..row_bytes {
                    let left = if i >= bpp { current_row[i - bpp] } else { 0 };
                    let above = prev_row[i];
                    let upper_left = if i >= bpp { prev_row[i - bpp] } else { 0 };
                    current_row[i] = row_data[i].wrapping_add(paeth_predictor(left, above, upper_left));
                }
            }
            other => {
                return Err(PdfError::DecodeError(format!(
                    "unknown PNG filter type {other}"
                )));
            }
        }

        result.extend_from_slice(&current_row);
        std::mem::swap(&mut prev_row, &mut current_row);
    }

    Ok(result)
}

/// Paeth predictor function used in PNG filtering.
const fn paeth_predictor(left: u8, above: u8, upper_left: u8) -> u8 {
    let a = left as i32;
    let b = above as i32;
    let c = upper_left as i32;
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();

    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        above
    } else {
        upper_left
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn test_flate_round_trip() {
        let data = b"hello hello hello hello";
        assert_eq!(flate_decode(&deflate(data), 1024).unwrap(), data);
    }

    #[test]
    fn test_flate_limit() {
        let data = vec![0u8; 4096];
        assert!(flate_decode(&deflate(&data), 100).is_err());
    }

    #[test]
    fn test_flate_corrupt_data_fails() {
        assert!(matches!(
            flate_decode(b"not zlib at all", 1024),
            Err(PdfError::DecodeError(_))
        ));
    }

    #[test]
    fn test_png_up_predictor() {
        let params = PredictorParams {
            predictor: 12,
            columns: 3,
            ..Default::default()
        };
        let data = vec![2, 1, 2, 3, 2, 1, 1, 1];
        assert_eq!(
            apply_predictor(data, &params).unwrap(),
            vec![1, 2, 3, 2, 3, 4]
        );
    }

    #[test]
    fn test_png_sub_and_paeth() {
        let params = PredictorParams {
            predictor: 15,
            columns: 3,
            ..Default::default()
        };
        let data = vec![1, 5, 1, 1, 4, 0, 0, 0];
        assert_eq!(
            apply_predictor(data, &params).unwrap(),
            vec![5, 6, 7, 5, 6, 7]
        );
    }

    #[test]
    fn test_tiff_predictor() {
        let params = PredictorParams {
            predictor: 2,
            colors: 2,
            columns: 2,
            ..Default::default()
        };
        let data = vec![10, 20, 1, 2];
        assert_eq!(apply_predictor(data, &params).unwrap(), vec![10, 20, 11, 22]);
    }

    #[test]
    fn test_oversized_predictor_rows() {
        let huge = PredictorParams {
            predictor: 12,
            columns: 1 << 60,
            ..Default::default()
        };
        assert!(matches!(
            apply_predictor(vec![2, 0, 0], &huge),
            Err(PdfError::DecodeError(_))
        ));
        let overflow = PredictorParams {
            colors: usize::MAX,
            ..huge
        };
        assert!(matches!(
            apply_predictor(vec![2, 0, 0], &overflow),
            Err(PdfError::DecodeError(_))
        ));
        let tiff = PredictorParams {
            predictor: 2,
            ..overflow
        };
        assert!(matches!(
            apply_predictor(vec![1, 2], &tiff),
            Err(PdfError::DecodeError(_))
        ));
    }

    #[test]
    fn test_unknown_predictor() {
        let params = PredictorParams {
            predictor: 7,
            ..Default::default()
        };
        assert!(matches!(
            apply_predictor(vec![], &params),
            Err(PdfError::Unsupported(_))
        ));
    }
}
