//! pdfgraph - PDF object graph access: xref chains, object streams and
//! the stream codecs needed to reach them.

pub mod codec;
pub mod document;
pub mod error;
pub mod model;
pub mod parser;

// Re-export codec modules for convenience
pub use codec::ccitt;
pub use codec::lzw;

pub use document::{PdfResolver, ResolverParams, XRefEntry, XRefTable};
pub use error::{ErrorKind, PdfError, Result};
pub use model::{PDFDict, PDFObjRef, PDFObject, PDFStream};
