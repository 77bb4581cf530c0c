// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the bionic-render crate. Measures the built-in
// layout of one full chunk of emphasised paragraphs.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use bionic_core::{BoldRatio, ContentBlock, Diagnostics, Paragraph, Result};
use bionic_document::{Assembler, ChunkTemplate, ImageTable};
use bionic_render::{ChunkDocument, PdfChunkWriter};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Lay out 100 paragraphs (the default chunk size) with the built-in writer.
fn bench_chunk_layout(c: &mut Criterion) {
    let images = ImageTable::new();
    let source: Vec<Result<ContentBlock>> = (0..100)
        .map(|i| {
            Ok(ContentBlock::Paragraph(Paragraph::plain(format!(
                "Paragraph {i}: the quick brown fox jumps over the lazy dog, twice over."
            ))))
        })
        .collect();
    let mut diagnostics = Diagnostics::new();
    let assembly = Assembler::new(&images, BoldRatio::default()).assemble(source, &mut diagnostics);
    let template = ChunkTemplate::new("Arial", assembly.dominant_font_size_pt);
    let writer = PdfChunkWriter::new();

    c.bench_function("builtin layout (100 paragraphs)", |b| {
        b.iter(|| {
            let chunk = ChunkDocument {
                index: 0,
                blocks: &assembly.blocks,
                template: &template,
            };
            black_box(writer.render_bytes(black_box(&chunk)).unwrap());
        });
    });
}

criterion_group!(benches, bench_chunk_layout);
criterion_main!(benches);
