//! Resolver configuration.

/// Default bound on nested object resolution.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Default bound on the output of any single filter stage (256 MiB).
pub const DEFAULT_MAX_DECODED_SIZE: usize = 256 * 1024 * 1024;

/// Parameters for [`PdfResolver`](super::resolver::PdfResolver).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverParams {
    /// How many objects may be under resolution at once, e.g. an ObjStm
    /// whose `/Length` is itself an indirect object.
    pub max_depth: usize,

    /// Whether resolving a direct stream object also runs its filter chain.
    /// Object stream containers are always decoded.
    pub decode_streams: bool,

    /// Largest output, in bytes, any filter stage may produce.
    pub max_decoded_size: usize,
}

impl Default for ResolverParams {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            decode_streams: true,
            max_decoded_size: DEFAULT_MAX_DECODED_SIZE,
        }
    }
}

impl ResolverParams {
    pub fn new(max_depth: usize, decode_streams: bool, max_decoded_size: usize) -> Self {
        Self {
            max_depth,
            decode_streams,
            max_decoded_size,
        }
    }
}
