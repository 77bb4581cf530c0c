// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content block assembler: walks the provider's blocks in document order,
// emphasises every text run and binds image references to the payloads the
// image pipeline produced.

pub mod blocks;
pub mod markup;

use bionic_core::{
    BionicError, BoldRatio, ContentBlock, Diagnostics, ImageRef, Paragraph, ResolvedImage, Result,
    Run, Table,
};
use tracing::{debug, info, instrument};

use crate::emphasis::emphasize;
use crate::image::ImageTable;

pub use blocks::{InlineItem, RenderBlock, RenderCell, RenderParagraph, RenderTable, TextContent};
pub use markup::ChunkTemplate;

/// Font size used when no run declares one.
pub const DEFAULT_FONT_SIZE_PT: f32 = 11.0;

/// Result of assembling a document.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub blocks: Vec<RenderBlock>,
    /// Most common run font size in the document.
    pub dominant_font_size_pt: f32,
    /// Blocks dropped because they were malformed.
    pub skipped: usize,
}

/// Builds renderable blocks. Needs the finished image table, so it can only
/// be created after the image pipeline barrier.
pub struct Assembler<'a> {
    images: &'a ImageTable,
    ratio: BoldRatio,
}

impl<'a> Assembler<'a> {
    pub fn new(images: &'a ImageTable, ratio: BoldRatio) -> Self {
        Self { images, ratio }
    }

    /// Assemble `source` in order. Provider errors and blocks failing
    /// validation are skipped and recorded in `diagnostics`.
    #[instrument(skip_all)]
    pub fn assemble<I>(&self, source: I, diagnostics: &mut Diagnostics) -> Assembly
    where
        I: IntoIterator<Item = Result<ContentBlock>>,
    {
        let mut blocks = Vec::new();
        let mut sizes = FontSizeTally::default();
        let mut skipped = 0;

        for (index, item) in source.into_iter().enumerate() {
            let block = match item.and_then(|block| block.validate().map(|()| block)) {
                Ok(block) => block,
                Err(err) => {
                    diagnostics.record(format!("block {index}"), &err);
                    skipped += 1;
                    continue;
                }
            };
            sizes.add_block(&block);
            blocks.push(self.block(&block, diagnostics));
        }

        let dominant_font_size_pt = sizes.dominant().unwrap_or(DEFAULT_FONT_SIZE_PT);
        info!(
            blocks = blocks.len(),
            skipped,
            font_size = dominant_font_size_pt,
            "Document assembled"
        );

        Assembly {
            blocks,
            dominant_font_size_pt,
            skipped,
        }
    }

    fn block(&self, block: &ContentBlock, diagnostics: &mut Diagnostics) -> RenderBlock {
        match block {
            ContentBlock::Paragraph(paragraph) => {
                RenderBlock::Paragraph(self.paragraph(paragraph, diagnostics))
            }
            ContentBlock::Table(table) => RenderBlock::Table(self.table(table, diagnostics)),
            // Position hints are ignored: layout is flow-only.
            ContentBlock::Image(image) => RenderBlock::Image(self.image(&image.image, diagnostics)),
        }
    }

    fn table(&self, table: &Table, diagnostics: &mut Diagnostics) -> RenderTable {
        let mut rows = Vec::with_capacity(table.rows.len());
        for row in &table.rows {
            let mut cells = Vec::with_capacity(row.cells.len());
            for cell in &row.cells {
                let mut paragraphs = Vec::with_capacity(cell.paragraphs.len());
                for paragraph in &cell.paragraphs {
                    paragraphs.push(self.paragraph(paragraph, diagnostics));
                }
                cells.push(RenderCell { paragraphs });
            }
            rows.push(cells);
        }
        RenderTable { rows }
    }

    pub fn paragraph(&self, paragraph: &Paragraph, diagnostics: &mut Diagnostics) -> RenderParagraph {
        let mut items = Vec::new();
        for run in &paragraph.runs {
            self.run(run, &mut items, diagnostics);
        }
        RenderParagraph {
            alignment: paragraph.alignment,
            items,
        }
    }

    fn run(&self, run: &Run, items: &mut Vec<InlineItem>, diagnostics: &mut Diagnostics) {
        if let Some(image) = &run.image {
            items.push(InlineItem::Image(self.image(image, diagnostics)));
        }
        if !run.text.is_empty() {
            let content = match emphasize(&run.text, self.ratio) {
                Some(emphasized) => TextContent::Emphasized(emphasized.into_segments()),
                None => TextContent::Original(run.text.clone()),
            };
            items.push(InlineItem::Text {
                style: run.style.clone(),
                content,
            });
        }
        if run.line_break {
            items.push(InlineItem::LineBreak);
        }
    }

    fn image(&self, id: &ImageRef, diagnostics: &mut Diagnostics) -> ResolvedImage {
        match self.images.get(id) {
            Some(resolved) => resolved.clone(),
            None => {
                diagnostics.record(
                    id.as_str(),
                    &BionicError::ImageDecode {
                        id: id.to_string(),
                        reason: "referenced image was never extracted".into(),
                    },
                );
                None
            }
        }
    }
}

/// Counts declared run sizes; ties go to the size seen first.
#[derive(Default)]
struct FontSizeTally {
    counts: Vec<(f32, usize)>,
}

impl FontSizeTally {
    fn add(&mut self, size: f32) {
        match self.counts.iter_mut().find(|(s, _)| *s == size) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((size, 1)),
        }
    }

    fn add_paragraph(&mut self, paragraph: &Paragraph) {
        for run in &paragraph.runs {
            if let Some(size) = run.style.size_pt {
                self.add(size);
            }
        }
    }

    fn add_block(&mut self, block: &ContentBlock) {
        match block {
            ContentBlock::Paragraph(paragraph) => self.add_paragraph(paragraph),
            ContentBlock::Table(table) => {
                for cell in table.rows.iter().flat_map(|row| &row.cells) {
                    for paragraph in &cell.paragraphs {
                        self.add_paragraph(paragraph);
                    }
                }
            }
            ContentBlock::Image(_) => {}
        }
    }

    fn dominant(&self) -> Option<f32> {
        let mut best: Option<(f32, usize)> = None;
        for &(size, count) in &self.counts {
            if best.is_none_or(|(_, best_count)| count > best_count) {
                best = Some((size, count));
            }
        }
        debug!(candidates = self.counts.len(), ?best, "Dominant font size");
        best.map(|(size, _)| size)
    }
}
