//! Stream codecs.
//!
//! - `bit_reader`: MSB-first bit cursor
//! - `huffman`: T.4 run-length tables and prefix-code trie
//! - `ccitt`: CCITT Group 3/4 fax decompression
//! - `lzw`: LZW decompression
//! - `flate`: FlateDecode and predictors
//! - `filters`: `/Filter` chain dispatch

pub mod bit_reader;
pub mod ccitt;
pub mod filters;
pub mod flate;
pub mod huffman;
pub mod lzw;

pub use bit_reader::BitReader;
pub use ccitt::{CcittParams, ccittfaxdecode, ccittfaxdecode_with_limit};
pub use filters::{FilterSpec, ImageSize, apply_chain, decode_stream, filter_chain};
pub use lzw::{LzwParams, lzwdecode, lzwdecode_with_earlychange, lzwdecode_with_limit};
