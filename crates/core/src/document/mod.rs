//! Document-level object access.
//!
//! - `xref` - cross-reference tables and streams, `/Prev` chains
//! - `objstm` - object stream unpacking
//! - `resolver` - object number to object resolution (PdfResolver)
//! - `params` - resolver limits

pub mod objstm;
pub mod params;
pub mod resolver;
pub mod xref;

// Re-export main types for convenience
pub use objstm::{ObjStm, ObjStmHeader};
pub use params::ResolverParams;
pub use resolver::PdfResolver;
pub use xref::{XRefEntry, XRefTable, find_startxref};
