//! Benchmarks for the stream codecs.
//!
//! Benchmark groups:
//! - `lzw_decode`: LZW throughput on text-like and repetitive input
//! - `ccitt_decode`: G4 decoding of all-white pages

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use pdfgraph_core::ccitt::{CcittParams, ccittfaxdecode};
use pdfgraph_core::lzw::lzwdecode;

// =============================================================================
// Data Generation
// =============================================================================

/// Content-stream shaped text of roughly `n` bytes.
fn generate_text(n: usize) -> Vec<u8> {
    let line = b"BT /F1 12 Tf 72 712 Td (The quick brown fox) Tj ET\n";
    line.iter().copied().cycle().take(n).collect()
}

fn lzw_encode(data: &[u8]) -> Vec<u8> {
    weezl::encode::Encoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
        .encode(data)
        .unwrap_or_default()
}

/// A G4 stream of `height` all-white rows: one V0 code (`1`) per row.
fn white_page(height: usize) -> Vec<u8> {
    let mut out = vec![0xFF; height / 8];
    if height % 8 != 0 {
        out.push(0xFFu8 << (8 - height % 8));
    }
    out
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_lzw(c: &mut Criterion) {
    let mut group = c.benchmark_group("lzw_decode");
    for size in [4 * 1024, 64 * 1024, 1024 * 1024] {
        let encoded = lzw_encode(&generate_text(size));
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("text", size), &encoded, |b, data| {
            b.iter(|| lzwdecode(black_box(data)));
        });
    }
    let zeros = lzw_encode(&vec![0u8; 256 * 1024]);
    group.bench_function("zeros_256k", |b| b.iter(|| lzwdecode(black_box(&zeros))));
    group.finish();
}

fn bench_ccitt(c: &mut Criterion) {
    let mut group = c.benchmark_group("ccitt_decode");
    let params = CcittParams {
        k: -1,
        ..Default::default()
    };
    for height in [100, 2200] {
        let encoded = white_page(height);
        group.bench_with_input(BenchmarkId::new("white_a4", height), &encoded, |b, data| {
            b.iter(|| ccittfaxdecode(black_box(data), 1728, height, &params));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_lzw, bench_ccitt);
criterion_main!(benches);
