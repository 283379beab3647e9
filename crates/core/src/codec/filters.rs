//! `/Filter` + `/DecodeParms` chain dispatcher.

use crate::codec::ccitt::{CcittParams, ccittfaxdecode_with_limit};
use crate::codec::flate::{PredictorParams, apply_predictor, flate_decode};
use crate::codec::lzw::{LzwParams, lzwdecode_with_limit};
use crate::error::{PdfError, Result};
use crate::model::objects::{PDFDict, PDFObject, PDFStream};

/// One stage of a filter chain with its (resolved) parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub name: String,
    pub parms: Option<PDFDict>,
}

/// Canonical filter name for abbreviated filter names.
fn canonical_name(name: &str) -> &str {
    match name {
        "Fl" => "FlateDecode",
        "LZW" => "LZWDecode",
        "CCF" => "CCITTFaxDecode",
        "DCT" => "DCTDecode",
        other => other,
    }
}

/// Filters whose output is an image format handled by the image consumer.
fn is_image_codec(name: &str) -> bool {
    matches!(name, "DCTDecode" | "JPXDecode" | "JBIG2Decode")
}

/// Build the filter chain of a stream dictionary.
///
/// `resolve` turns indirect references into their values; `/Filter`,
/// `/DecodeParms` and each of their array elements pass through it.
pub fn filter_chain<F>(attrs: &PDFDict, mut resolve: F) -> Result<Vec<FilterSpec>>
where
    F: FnMut(&PDFObject) -> Result<PDFObject>,
{
    let Some(filter) = attrs.get("Filter") else {
        return Ok(Vec::new());
    };
    let names: Vec<String> = match resolve(filter)? {
        PDFObject::Null => Vec::new(),
        PDFObject::Name(name) => vec![name],
        PDFObject::Array(items) => items
            .iter()
            .map(|item| -> Result<String> { Ok(resolve(item)?.as_name()?.to_string()) })
            .collect::<Result<_>>()?,
        other => {
            return Err(PdfError::TypeError {
                expected: "name or array",
                got: other.type_name(),
            });
        }
    };

    let parms = attrs.get("DecodeParms");
    let parms: Vec<Option<PDFDict>> = match parms.map(&mut resolve).transpose()? {
        None | Some(PDFObject::Null) => Vec::new(),
        Some(PDFObject::Dict(d)) => vec![Some(d)],
        Some(PDFObject::Array(items)) => items
            .iter()
            .map(|item| -> Result<Option<PDFDict>> {
                match resolve(item)? {
                    PDFObject::Null => Ok(None),
                    PDFObject::Dict(d) => Ok(Some(d)),
                    other => Err(PdfError::TypeError {
                        expected: "dict",
                        got: other.type_name(),
                    }),
                }
            })
            .collect::<Result<_>>()?,
        Some(other) => {
            return Err(PdfError::TypeError {
                expected: "dict or array",
                got: other.type_name(),
            });
        }
    };

    Ok(names
        .into_iter()
        .enumerate()
        .map(|(i, name)| FilterSpec {
            name: canonical_name(&name).to_string(),
            parms: parms.get(i).cloned().flatten(),
        })
        .collect())
}

/// Image dimensions for CCITT stages, from the stream's `/Width` and `/Height`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageSize {
    pub width: Option<usize>,
    pub height: Option<usize>,
}

impl ImageSize {
    pub fn from_attrs(attrs: &PDFDict) -> Result<Self> {
        let dim = |key: &str| attrs.get(key).map(PDFObject::as_usize).transpose();
        Ok(Self {
            width: dim("Width")?,
            height: dim("Height")?,
        })
    }
}

/// Run `data` through `chain`. Decoding stops before an image codec, leaving
/// its input for the image consumer.
pub fn apply_chain(
    data: &[u8],
    chain: &[FilterSpec],
    size: ImageSize,
    limit: usize,
) -> Result<Vec<u8>> {
    let mut output = data.to_vec();
    for stage in chain {
        let parms = stage.parms.as_ref();
        output = match stage.name.as_str() {
            "FlateDecode" => {
                let inflated = flate_decode(&output, limit)?;
                apply_predictor(inflated, &PredictorParams::from_decode_parms(parms)?)?
            }
            "LZWDecode" => {
                let lzw = LzwParams::from_decode_parms(parms)?;
                let decoded =
                    lzwdecode_with_limit(&output, i64::from(lzw.early_change), limit)?;
                apply_predictor(decoded, &PredictorParams::from_decode_parms(parms)?)?
            }
            "CCITTFaxDecode" => {
                let params = CcittParams::from_decode_parms(parms)?;
                let width = size.width.unwrap_or(params.columns);
                let height = match (size.height, params.rows) {
                    (Some(h), _) => h,
                    (None, rows) if rows > 0 => rows,
                    _ => {
                        return Err(PdfError::Unsupported(
                            "CCITTFaxDecode stream without /Height or /Rows".into(),
                        ));
                    }
                };
                ccittfaxdecode_with_limit(&output, width, height, &params, limit)?
            }
            name if is_image_codec(name) => {
                tracing::debug!(filter = name, "leaving image data encoded");
                return Ok(output);
            }
            other => return Err(PdfError::Unsupported(format!("filter /{other}"))),
        };
        if output.len() > limit {
            return Err(PdfError::DecodeError(format!(
                "/{} output exceeds {} bytes",
                stage.name, limit
            )));
        }
    }
    Ok(output)
}

/// Decode a stream whose `/Filter` and `/DecodeParms` hold direct values.
pub fn decode_stream(stream: &PDFStream, limit: usize) -> Result<Vec<u8>> {
    let chain = filter_chain(&stream.attrs, |obj| Ok(obj.clone()))?;
    let size = ImageSize::from_attrs(&stream.attrs)?;
    apply_chain(stream.get_rawdata(), &chain, size, limit)
}
