//! dumpobj - Dump PDF objects as XML
//!
//! Objects are looked up through the file's xref chain, so objects stored in
//! object streams are dumped the same way as top-level ones.

use anyhow::Context;
use clap::{ArgAction, ArgGroup, Parser};
use memmap2::Mmap;
use pdfgraph_core::{PDFObject, PdfResolver, ResolverParams};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Escape special characters for XML output.
fn escape(s: &[u8]) -> String {
    let mut result = String::new();
    for &byte in s {
        match byte {
            b'&' => result.push_str("&amp;"),
            b'<' => result.push_str("&lt;"),
            b'>' => result.push_str("&gt;"),
            b'"' => result.push_str("&quot;"),
            b'\'' => result.push_str("&#39;"),
            b'\\' => result.push_str("&#92;"),
            0..=31 | 127..=255 => {
                result.push_str(&format!("&#{byte};"));
            }
            _ => result.push(byte as char),
        }
    }
    result
}

fn escape_str(s: &str) -> String {
    escape(s.as_bytes())
}

/// How stream bodies are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamCodec {
    /// Dictionary only.
    None,
    /// Bytes as stored in the file.
    Raw,
    /// Bytes after the filter chain.
    Binary,
}

/// Dump a PDF object as XML.
fn dumpxml<W: Write>(
    out: &mut W,
    resolver: &PdfResolver,
    obj: &PDFObject,
    codec: StreamCodec,
) -> anyhow::Result<()> {
    match obj {
        PDFObject::Null => write!(out, "<null />")?,
        PDFObject::Bool(b) => write!(out, "<boolean>{b}</boolean>")?,
        PDFObject::Int(n) => write!(out, "<number>{n}</number>")?,
        PDFObject::Real(n) => write!(out, "<number>{n}</number>")?,
        PDFObject::String(s) => {
            write!(out, r#"<string size="{}">{}</string>"#, s.len(), escape(s))?;
        }
        PDFObject::Name(name) => write!(out, "<literal>{}</literal>", escape_str(name))?,
        PDFObject::Array(arr) => {
            writeln!(out, r#"<list size="{}">"#, arr.len())?;
            for item in arr {
                dumpxml(out, resolver, item, codec)?;
                writeln!(out)?;
            }
            write!(out, "</list>")?;
        }
        PDFObject::Dict(dict) => {
            writeln!(out, r#"<dict size="{}">"#, dict.len())?;
            let mut keys: Vec<&String> = dict.keys().collect();
            keys.sort();
            for k in keys {
                writeln!(out, "<key>{}</key>", escape_str(k))?;
                write!(out, "<value>")?;
                dumpxml(out, resolver, &dict[k], codec)?;
                writeln!(out, "</value>")?;
            }
            write!(out, "</dict>")?;
        }
        PDFObject::Stream(stream) => match codec {
            StreamCodec::Raw => out.write_all(stream.get_rawdata())?,
            StreamCodec::Binary => out.write_all(&resolver.decode_stream(stream)?)?,
            StreamCodec::None => {
                writeln!(out, "<stream>")?;
                writeln!(out, "<props>")?;
                dumpxml(out, resolver, &PDFObject::Dict(stream.attrs.clone()), codec)?;
                writeln!(out)?;
                writeln!(out, "</props>")?;
                write!(out, "</stream>")?;
            }
        },
        PDFObject::Ref(objref) => write!(out, r#"<ref id="{}" />"#, objref.objid)?,
    }
    Ok(())
}

fn dumptrailer<W: Write>(out: &mut W, resolver: &PdfResolver) -> anyhow::Result<()> {
    writeln!(out, "<trailer>")?;
    dumpxml(
        out,
        resolver,
        &PDFObject::Dict(resolver.trailer().clone()),
        StreamCodec::None,
    )?;
    writeln!(out)?;
    writeln!(out, "</trailer>")?;
    Ok(())
}

/// Dump the given objects, reporting the ones that fail and carrying on.
///
/// Returns how many objects could not be dumped.
fn dumpobjs<W: Write>(
    out: &mut W,
    resolver: &PdfResolver,
    objids: &[u32],
    codec: StreamCodec,
) -> anyhow::Result<usize> {
    let mut failures = 0;
    for &objid in objids {
        let obj = match resolver.get_object_shared(objid) {
            Ok(obj) => obj,
            Err(e) => {
                eprintln!("object {objid} could not be decoded: {e}");
                failures += 1;
                continue;
            }
        };
        // Stream bodies are written bare; wrappers would corrupt them.
        if codec != StreamCodec::None && obj.as_stream().is_ok() {
            if let Err(e) = dumpxml(out, resolver, &obj, codec) {
                eprintln!("object {objid} could not be decoded: {e}");
                failures += 1;
            }
            continue;
        }
        let mut buf = Vec::new();
        match dumpxml(&mut buf, resolver, &obj, codec) {
            Ok(()) => {
                writeln!(out, r#"<object id="{objid}">"#)?;
                out.write_all(&buf)?;
                writeln!(out)?;
                writeln!(out, "</object>")?;
                writeln!(out)?;
            }
            Err(e) => {
                eprintln!("object {objid} could not be decoded: {e}");
                failures += 1;
            }
        }
    }
    Ok(failures)
}

/// A command line tool for dumping PDF objects as XML.
#[derive(Parser, Debug)]
#[command(name = "dumpobj")]
#[command(author, version, about = "Dump PDF objects in XML format", long_about = None)]
#[command(group(
    ArgGroup::new("stream_codec")
        .args(["raw_stream", "binary_stream"])
))]
struct Args {
    /// Path to a PDF file
    file: PathBuf,

    /// Object number to dump; may be repeated or comma-separated
    #[arg(short = 'i', long = "object", value_delimiter = ',', action = ArgAction::Append)]
    objects: Vec<u32>,

    /// Dump every in-use object of the xref table
    #[arg(short = 'a', long = "all", action = ArgAction::SetTrue)]
    all: bool,

    /// Dump the merged trailer dictionary
    #[arg(short = 'T', long = "trailer", action = ArgAction::SetTrue)]
    trailer: bool,

    /// Write stream bodies as stored in the file
    #[arg(short = 'r', long = "raw", action = ArgAction::SetTrue)]
    raw_stream: bool,

    /// Write stream bodies after decoding their filters
    #[arg(short = 'b', long = "binary", action = ArgAction::SetTrue)]
    binary_stream: bool,

    /// Path to file where output is written, or "-" for stdout
    #[arg(short = 'o', long, default_value = "-")]
    outfile: String,

    /// Log resolution details to stderr
    #[arg(short = 'v', long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let codec = if args.raw_stream {
        StreamCodec::Raw
    } else if args.binary_stream {
        StreamCodec::Binary
    } else {
        StreamCodec::None
    };

    let file =
        File::open(&args.file).with_context(|| format!("opening {}", args.file.display()))?;
    // SAFETY: the mapping is read-only and dropped before main returns.
    let mmap = unsafe { Mmap::map(&file) }?;
    // Streams are decoded on demand so one bad filter does not hide the
    // object's dictionary.
    let params = ResolverParams {
        decode_streams: false,
        ..Default::default()
    };
    let resolver = PdfResolver::open_with_params(mmap.to_vec(), params)
        .with_context(|| format!("loading xref of {}", args.file.display()))?;

    let mut output: Box<dyn Write> = if args.outfile == "-" {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        let file = File::create(&args.outfile)
            .with_context(|| format!("creating {}", args.outfile))?;
        Box::new(BufWriter::new(file))
    };

    let objids = if args.all {
        resolver.xref().objids()
    } else {
        args.objects.clone()
    };

    let xml = codec == StreamCodec::None;
    if xml {
        write!(output, "<pdf>")?;
    }
    let failures = dumpobjs(&mut output, &resolver, &objids, codec)?;
    if xml && (args.trailer || objids.is_empty()) {
        dumptrailer(&mut output, &resolver)?;
    }
    if xml {
        writeln!(output, "</pdf>")?;
    }
    output.flush()?;

    if failures > 0 {
        tracing::warn!(failures, "some objects could not be dumped");
    }
    Ok(())
}
