//! Cross-reference loading: classic tables, xref streams and /Prev chains.

mod common;

use common::PdfBuilder;
use pdfgraph_core::document::find_startxref;
use pdfgraph_core::{PDFObject, PdfError, PdfResolver, XRefEntry, XRefTable};

#[test]
fn test_classic_xref() {
    let mut pdf = PdfBuilder::new();
    pdf.object(1, "<< /Type /Catalog >>");
    pdf.object(2, "(two)");
    let xref = pdf.classic_xref(&[1, 2], &[], "/Size 3 /Root 1 0 R");
    let off1 = pdf.offset(1);
    let data = pdf.finish(xref);

    assert_eq!(find_startxref(&data).unwrap(), xref);
    let table = XRefTable::load(&data).unwrap();
    assert_eq!(
        table.get(1),
        Some(XRefEntry::Direct {
            offset: off1,
            genno: 0
        })
    );
    assert_eq!(table.get(0), Some(XRefEntry::Free));
    assert_eq!(table.objids(), vec![1, 2]);
    assert_eq!(table.trailer()["Size"], PDFObject::Int(3));
}

#[test]
fn test_prev_chain_newest_entry_wins() {
    let mut pdf = PdfBuilder::new();
    pdf.object(1, "(old)");
    pdf.object(2, "<< /Type /Catalog >>");
    let first = pdf.classic_xref(&[1, 2], &[], "/Size 3 /Root 2 0 R");
    pdf.object(1, "(new)");
    let second = pdf.classic_xref(&[1], &[], &format!("/Size 3 /Prev {first}"));
    let data = pdf.finish(second);

    let resolver = PdfResolver::open(data).unwrap();
    assert_eq!(
        resolver.get_object(1).unwrap(),
        PDFObject::String(b"new".to_vec())
    );
    // older sections still contribute entries and trailer keys
    assert!(resolver.trailer().contains_key("Root"));
    assert_eq!(
        resolver.catalog().unwrap().as_dict().unwrap()["Type"],
        PDFObject::Name("Catalog".into())
    );
}

#[test]
fn test_prev_loop_is_rejected() {
    let mut pdf = PdfBuilder::new();
    pdf.object(1, "null");
    let xref_at = pdf.buf.len();
    let xref = pdf.classic_xref(&[1], &[], &format!("/Size 2 /Prev {xref_at}"));
    let data = pdf.finish(xref);
    assert!(matches!(
        XRefTable::load(&data),
        Err(PdfError::SyntaxError(_))
    ));
}

#[test]
fn test_xref_stream_with_png_up_predictor() {
    let mut pdf = PdfBuilder::new();
    pdf.object(1, "<< /Type /Catalog >>");
    pdf.object(2, "[1 2 3]");
    let rows = [
        (0, 0, 0, 65535),
        (1, 1, pdf.offset(1) as u64, 0),
        (2, 1, pdf.offset(2) as u64, 0),
    ];
    let xref = pdf.xref_stream(3, &rows, "/Root 1 0 R", true);
    let data = pdf.finish(xref);

    let table = XRefTable::load(&data).unwrap();
    assert_eq!(table.get(0), Some(XRefEntry::Free));
    assert_eq!(
        table.get(3),
        Some(XRefEntry::Direct {
            offset: xref,
            genno: 0
        })
    );
    // stream-describing keys are not part of the trailer
    assert!(table.trailer().contains_key("Root"));
    assert!(table.trailer().contains_key("Size"));
    assert!(!table.trailer().contains_key("W"));
    assert!(!table.trailer().contains_key("Filter"));

    let resolver = PdfResolver::new(data, table);
    assert_eq!(resolver.get_object(2).unwrap().as_array().unwrap().len(), 3);
}

#[test]
fn test_hybrid_xref_stream_overrides_classic_entries() {
    let mut pdf = PdfBuilder::new();
    pdf.object(1, "<< /Type /Catalog >>");
    pdf.objstm(4, &[(3, "(compressed)")]);
    let stm = pdf.xref_stream(5, &[(3, 2, 4, 0)], "", false);
    // classic writers that do not understand object streams see 3 as free
    let xref = pdf.classic_xref(&[1, 4], &[3], &format!("/Size 6 /Root 1 0 R /XRefStm {stm}"));
    let data = pdf.finish(xref);

    let table = XRefTable::load(&data).unwrap();
    assert_eq!(
        table.get(3),
        Some(XRefEntry::Compressed {
            stream_objid: 4,
            index: 0
        })
    );
    let resolver = PdfResolver::new(data, table);
    assert_eq!(
        resolver.get_object(3).unwrap(),
        PDFObject::String(b"compressed".to_vec())
    );
}

#[test]
fn test_unknown_xref_stream_entry_type() {
    let mut pdf = PdfBuilder::new();
    pdf.object(1, "null");
    let xref = pdf.xref_stream(2, &[(1, 7, 0, 0)], "", false);
    let data = pdf.finish(xref);
    assert!(matches!(
        XRefTable::load(&data),
        Err(PdfError::Unsupported(_))
    ));
}

#[test]
fn test_startxref_past_end_of_file() {
    let mut pdf = PdfBuilder::new();
    pdf.object(1, "null");
    let data = pdf.finish(1 << 20);
    assert!(matches!(
        XRefTable::load(&data),
        Err(PdfError::SyntaxError(_))
    ));
}

#[test]
fn test_xref_stream_with_oversized_predictor_row() {
    let mut pdf = PdfBuilder::new();
    pdf.object(1, "null");
    let xref = pdf.stream(
        2,
        "/Type /XRef /W [1 4 2] /Size 3 /Filter /FlateDecode /DecodeParms << /Predictor 12 /Columns 1152921504606846976 >>",
        &common::deflate(&[2, 0, 0]),
    );
    let data = pdf.finish(xref);
    assert!(matches!(
        XRefTable::load(&data),
        Err(PdfError::DecodeError(_))
    ));
}
