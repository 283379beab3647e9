//! In-memory PDF fixtures with computed offsets.

#![allow(dead_code)]

use bytes::Bytes;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use std::collections::BTreeMap;
use std::io::Write;

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// One row of a cross-reference stream: `(objid, type, field1, field2)`.
pub type XRefRow = (u32, u8, u64, u64);

pub struct PdfBuilder {
    pub buf: Vec<u8>,
    /// Offset of the last written copy of each object.
    pub offsets: BTreeMap<u32, usize>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self {
            buf: b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n".to_vec(),
            offsets: BTreeMap::new(),
        }
    }

    pub fn offset(&self, objid: u32) -> usize {
        self.offsets[&objid]
    }

    /// Append bytes verbatim, returning where they start.
    pub fn raw(&mut self, bytes: &[u8]) -> usize {
        let at = self.buf.len();
        self.buf.extend_from_slice(bytes);
        at
    }

    pub fn object(&mut self, objid: u32, body: &str) -> usize {
        let at = self.raw(format!("{objid} 0 obj\n{body}\nendobj\n").as_bytes());
        self.offsets.insert(objid, at);
        at
    }

    /// A stream object; `/Length` is appended to `dict` entries.
    pub fn stream(&mut self, objid: u32, dict: &str, data: &[u8]) -> usize {
        let at = self.raw(
            format!(
                "{objid} 0 obj\n<< {dict} /Length {} >>\nstream\n",
                data.len()
            )
            .as_bytes(),
        );
        self.raw(data);
        self.raw(b"\nendstream\nendobj\n");
        self.offsets.insert(objid, at);
        at
    }

    /// A Flate-compressed object stream holding `objects` in order.
    pub fn objstm(&mut self, objid: u32, objects: &[(u32, &str)]) -> usize {
        let mut header = String::new();
        let mut bodies = String::new();
        for (id, body) in objects {
            header.push_str(&format!("{id} {} ", bodies.len()));
            bodies.push_str(body);
            bodies.push('\n');
        }
        let first = header.len();
        let data = deflate(format!("{header}{bodies}").as_bytes());
        self.stream(
            objid,
            &format!(
                "/Type /ObjStm /N {} /First {first} /Filter /FlateDecode",
                objects.len()
            ),
            &data,
        )
    }

    /// A classic xref section listing `ids` as in use and `free` as free.
    pub fn classic_xref(&mut self, ids: &[u32], free: &[u32], trailer: &str) -> usize {
        let mut table = String::from("xref\n0 1\n0000000000 65535 f \n");
        for &id in ids {
            table.push_str(&format!("{id} 1\n{:010} 00000 n \n", self.offset(id)));
        }
        for &id in free {
            table.push_str(&format!("{id} 1\n0000000000 00001 f \n"));
        }
        table.push_str(&format!("trailer\n<< {trailer} >>\n"));
        self.raw(table.as_bytes())
    }

    /// A cross-reference stream object. A type 1 row for the stream itself
    /// is added. Rows are `/W [1 4 2]`, PNG Up encoded when `predictor` is
    /// set.
    pub fn xref_stream(
        &mut self,
        objid: u32,
        rows: &[XRefRow],
        dict: &str,
        predictor: bool,
    ) -> usize {
        let at = self.buf.len();
        let mut rows = rows.to_vec();
        rows.push((objid, 1, at as u64, 0));
        rows.sort_by_key(|r| r.0);

        let mut index = String::new();
        let mut body = Vec::new();
        let mut prev = [0u8; 7];
        for &(id, kind, f1, f2) in &rows {
            index.push_str(&format!("{id} 1 "));
            let mut row = [0u8; 7];
            row[0] = kind;
            row[1..5].copy_from_slice(&(f1 as u32).to_be_bytes());
            row[5..7].copy_from_slice(&(f2 as u16).to_be_bytes());
            if predictor {
                body.push(2);
                body.extend(row.iter().zip(prev).map(|(&b, p)| b.wrapping_sub(p)));
                prev = row;
            } else {
                body.extend_from_slice(&row);
            }
        }
        let size = rows.iter().map(|r| r.0).max().unwrap_or(0) + 1;
        let parms = if predictor {
            " /DecodeParms << /Predictor 12 /Columns 7 >>"
        } else {
            ""
        };
        let data = deflate(&body);
        self.stream(
            objid,
            &format!(
                "/Type /XRef /W [1 4 2] /Index [{index}] /Size {size} /Filter /FlateDecode{parms} {dict}"
            ),
            &data,
        )
    }

    /// Terminate the file, pointing `startxref` at `xref_offset`.
    pub fn finish(mut self, xref_offset: usize) -> Bytes {
        self.raw(format!("startxref\n{xref_offset}\n%%EOF\n").as_bytes());
        Bytes::from(self.buf)
    }
}
