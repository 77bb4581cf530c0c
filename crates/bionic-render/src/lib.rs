// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bionic-render: Chunked rendering and merging for Bionic Reader.
//
// Renders assembled documents in independent chunks on a worker pool, using
// either the built-in `printpdf` layout or an external HTML-to-PDF program,
// and merges the chunk PDFs in document order with `lopdf`.

pub mod artifacts;
pub mod convert;
pub mod merge;
pub mod orchestrator;
pub mod renderer;

pub use artifacts::ArtifactArena;
pub use convert::{ConversionReport, Converter, default_output_path};
pub use merge::PdfMerger;
pub use orchestrator::{JobState, Orchestrator, RenderChunk, RenderSummary, partition};
pub use renderer::{ChunkDocument, CommandRenderer, MarkupRenderer, PdfChunkWriter, renderer_for};
