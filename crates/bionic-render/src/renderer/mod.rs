// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Chunk renderers: turn one self-contained chunk into a PDF file on disk.

pub mod command;
pub mod pdf_writer;

use std::path::Path;

use bionic_core::{RendererKind, Result};
use bionic_document::{ChunkTemplate, RenderBlock};

pub use command::CommandRenderer;
pub use pdf_writer::PdfChunkWriter;

/// One chunk of a document, ready to render independently of its siblings.
#[derive(Debug, Clone, Copy)]
pub struct ChunkDocument<'a> {
    pub index: usize,
    pub blocks: &'a [RenderBlock],
    pub template: &'a ChunkTemplate,
}

impl ChunkDocument<'_> {
    /// Full HTML document for this chunk.
    pub fn html(&self) -> String {
        self.template.wrap(self.blocks)
    }
}

/// Renders a chunk to a PDF at `output`. Called concurrently from several
/// worker threads, one chunk per call.
pub trait MarkupRenderer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Write the chunk's PDF to `output`. Failures are `BionicError::Render`
    /// carrying the chunk index.
    fn render(&self, chunk: &ChunkDocument<'_>, output: &Path) -> Result<()>;
}

/// Build the renderer a configuration asks for.
pub fn renderer_for(kind: &RendererKind) -> Box<dyn MarkupRenderer> {
    match kind {
        RendererKind::Builtin => Box::new(PdfChunkWriter::new()),
        RendererKind::Command { program, args } => {
            Box::new(CommandRenderer::new(program.clone(), args.clone()))
        }
    }
}
