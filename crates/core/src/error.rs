//! Error types for pdfgraph object resolution and stream decoding.

use thiserror::Error;

/// Coarse classification of a [`PdfError`].
///
/// Callers that convert whole documents usually only need to know which
/// bucket a failure falls into to decide how to report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed file structure: xref/trailer, ObjStm header, dimensions.
    Structural,
    /// A reference that cannot be followed: free, missing, out of range.
    Reference,
    /// Valid input that uses a feature this crate does not implement.
    Unsupported,
    /// Corrupt compressed data.
    Decode,
}

/// Primary error type for PDF parsing operations.
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("invalid token at position {pos}: {msg}")]
    TokenError { pos: usize, msg: String },

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("type error: expected {expected}, got {got}")]
    TypeError {
        expected: &'static str,
        got: &'static str,
    },

    #[error("key not found: {0}")]
    KeyError(String),

    #[error("PDF syntax error: {0}")]
    SyntaxError(String),

    #[error("malformed object stream header: {0}")]
    ObjStmHeader(String),

    #[error("CCITT parameters describe {columns}x{rows}, image is {width}x{height}")]
    CcittDimensionMismatch {
        columns: usize,
        rows: usize,
        width: usize,
        height: usize,
    },

    #[error("reference to free object {0}")]
    ReferenceToFreeObject(u32),

    #[error("PDF object not found: {0}")]
    ObjectNotFound(u32),

    #[error("object stream {stream} holds {count} objects, index {index} is out of range")]
    MissingObjectInStream {
        stream: u32,
        index: usize,
        count: usize,
    },

    #[error("stream length of object {0} could not be resolved")]
    UnresolvedLength(u32),

    #[error("circular reference detected for obj {0}")]
    CircularReference(u32),

    #[error("resolving obj {objid} exceeds the maximum depth of {depth}")]
    ResolutionDepthExceeded { objid: u32, depth: usize },

    #[error("unsupported feature: {0}")]
    Unsupported(String),

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PdfError {
    /// Classify this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::TokenError { .. }
            | Self::UnexpectedEof
            | Self::TypeError { .. }
            | Self::KeyError(_)
            | Self::SyntaxError(_)
            | Self::ObjStmHeader(_)
            | Self::CcittDimensionMismatch { .. }
            | Self::Io(_) => ErrorKind::Structural,
            Self::ReferenceToFreeObject(_)
            | Self::ObjectNotFound(_)
            | Self::MissingObjectInStream { .. }
            | Self::UnresolvedLength(_)
            | Self::CircularReference(_)
            | Self::ResolutionDepthExceeded { .. } => ErrorKind::Reference,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::DecodeError(_) => ErrorKind::Decode,
        }
    }
}

/// Convenience Result type alias for PdfError.
pub type Result<T> = std::result::Result<T, PdfError>;
