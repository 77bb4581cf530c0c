// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Built-in chunk renderer: lays renderable blocks out directly with
// `printpdf` 0.8, no external HTML engine required.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`. Only the PDF base-14 fonts are used, so glyph widths
// are estimated rather than measured.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use bionic_core::{Alignment, BionicError, NormalizedImage, PaperSize, Result, RunStyle};
use bionic_document::assemble::{InlineItem, RenderParagraph, RenderTable, TextContent};
use bionic_document::{RenderBlock, Segment};
use image::RgbImage;
use printpdf::{
    BuiltinFont, LinePoint, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt,
    RawImage, RawImageData, RawImageFormat, TextItem, XObjectTransform,
};
use tracing::{debug, instrument};

use super::{ChunkDocument, MarkupRenderer};

// Page box from the chunk template: 1in all round, 1.5in on the right.
const MARGIN_TOP_MM: f32 = 25.4;
const MARGIN_BOTTOM_MM: f32 = 25.4;
const MARGIN_LEFT_MM: f32 = 25.4;
const MARGIN_RIGHT_MM: f32 = 38.1;

const LINE_SPACING: f32 = 1.2;
/// Space after each paragraph, in ems.
const PARAGRAPH_GAP_EM: f32 = 0.5;
/// Space above and below a block image, in ems.
const IMAGE_GAP_EM: f32 = 1.0;
/// Pixel density assumed for embedded images (CSS px).
const IMAGE_DPI: f32 = 96.0;
const CELL_PADDING_PT: f32 = 4.0;
/// Underline position below the baseline and stroke width, in ems.
const UNDERLINE_OFFSET_EM: f32 = 0.12;
const UNDERLINE_THICKNESS_EM: f32 = 0.06;

// -- Fonts --------------------------------------------------------------------

/// The four faces of a base-14 family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontFaces {
    regular: BuiltinFont,
    bold: BuiltinFont,
    italic: BuiltinFont,
    bold_italic: BuiltinFont,
    /// Average glyph advance as a fraction of the font size.
    advance: f32,
}

impl FontFaces {
    const HELVETICA: Self = Self {
        regular: BuiltinFont::Helvetica,
        bold: BuiltinFont::HelveticaBold,
        italic: BuiltinFont::HelveticaOblique,
        bold_italic: BuiltinFont::HelveticaBoldOblique,
        advance: 0.5,
    };
    const TIMES: Self = Self {
        regular: BuiltinFont::TimesRoman,
        bold: BuiltinFont::TimesBold,
        italic: BuiltinFont::TimesItalic,
        bold_italic: BuiltinFont::TimesBoldItalic,
        advance: 0.45,
    };
    const COURIER: Self = Self {
        regular: BuiltinFont::Courier,
        bold: BuiltinFont::CourierBold,
        italic: BuiltinFont::CourierOblique,
        bold_italic: BuiltinFont::CourierBoldOblique,
        advance: 0.6,
    };

    /// Closest base-14 family for a CSS-style family name.
    pub fn for_family(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if name.contains("courier") || name.contains("mono") || name.contains("consolas") {
            Self::COURIER
        } else if name.contains("sans") {
            Self::HELVETICA
        } else if name.contains("times")
            || name.contains("serif")
            || name.contains("georgia")
            || name.contains("garamond")
        {
            Self::TIMES
        } else {
            Self::HELVETICA
        }
    }

    pub fn face(&self, bold: bool, italic: bool) -> BuiltinFont {
        match (bold, italic) {
            (false, false) => self.regular,
            (true, false) => self.bold,
            (false, true) => self.italic,
            (true, true) => self.bold_italic,
        }
    }

    fn width(&self, font: BuiltinFont, text: &str, size: f32) -> f32 {
        let bold = font == self.bold || font == self.bold_italic;
        // Bold faces run about a tenth wider, except monospaced Courier.
        let advance = if bold && self != &Self::COURIER {
            self.advance * 1.1
        } else {
            self.advance
        };
        text.chars().count() as f32 * advance * size
    }
}

// -- Inline layout ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct Span {
    text: String,
    font: BuiltinFont,
    size: f32,
    width: f32,
    underline: bool,
}

/// Unbreakable units of a paragraph.
#[derive(Debug, Clone)]
enum Piece {
    Word(Vec<Span>),
    Space(Span),
    Break,
    Image(Arc<NormalizedImage>),
}

#[derive(Debug, Clone, Default)]
struct Line {
    spans: Vec<Span>,
    width: f32,
    size: f32,
}

impl Line {
    fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    fn push(&mut self, span: Span) {
        self.width += span.width;
        self.size = self.size.max(span.size);
        self.spans.push(span);
    }

    fn height(&self, fallback: f32) -> f32 {
        let size = if self.size > 0.0 { self.size } else { fallback };
        size * LINE_SPACING
    }
}

#[derive(Debug, Clone)]
enum LineItem {
    Text(Line),
    Image(Arc<NormalizedImage>),
}

struct PieceBuilder<'a> {
    faces: &'a FontFaces,
    pieces: Vec<Piece>,
    word: Vec<Span>,
}

impl<'a> PieceBuilder<'a> {
    fn new(faces: &'a FontFaces) -> Self {
        Self {
            faces,
            pieces: Vec::new(),
            word: Vec::new(),
        }
    }

    fn flush_word(&mut self) {
        if !self.word.is_empty() {
            self.pieces.push(Piece::Word(std::mem::take(&mut self.word)));
        }
    }

    fn span(&self, text: String, font: BuiltinFont, size: f32, underline: bool) -> Span {
        let width = self.faces.width(font, &text, size);
        Span {
            text,
            font,
            size,
            width,
            underline,
        }
    }

    /// Split `text` at whitespace; adjacent non-space text from different
    /// segments joins the same word.
    fn text(&mut self, text: &str, font: BuiltinFont, size: f32, underline: bool) {
        let mut current = String::new();
        let mut in_space = false;
        for ch in text.chars() {
            let space = ch.is_whitespace();
            if space != in_space && !current.is_empty() {
                self.emit(std::mem::take(&mut current), in_space, font, size, underline);
            }
            in_space = space;
            current.push(ch);
        }
        if !current.is_empty() {
            self.emit(current, in_space, font, size, underline);
        }
    }

    fn emit(&mut self, chunk: String, space: bool, font: BuiltinFont, size: f32, underline: bool) {
        if space {
            self.flush_word();
            let span = self.span(" ".to_string(), font, size, underline);
            // Runs of whitespace collapse to one space.
            if !matches!(self.pieces.last(), Some(Piece::Space(_))) {
                self.pieces.push(Piece::Space(span));
            }
        } else {
            let span = self.span(chunk, font, size, underline);
            self.word.push(span);
        }
    }

    fn finish(mut self) -> Vec<Piece> {
        self.flush_word();
        self.pieces
    }
}

fn paragraph_pieces(paragraph: &RenderParagraph, faces: &FontFaces, base_size: f32) -> Vec<Piece> {
    let mut builder = PieceBuilder::new(faces);
    for item in &paragraph.items {
        match item {
            InlineItem::Text { style, content } => {
                let size = style.size_pt.unwrap_or(base_size);
                match content {
                    TextContent::Original(text) => {
                        let face = faces.face(style.bold, style.italic);
                        builder.text(text, face, size, style.underline);
                    }
                    TextContent::Emphasized(segments) => {
                        for segment in segments {
                            builder.text(
                                segment.text(),
                                segment_face(faces, segment, style),
                                size,
                                style.underline,
                            );
                        }
                    }
                }
            }
            InlineItem::Image(Some(image)) => {
                builder.flush_word();
                builder.pieces.push(Piece::Image(image.clone()));
            }
            // A failed inline image leaves no mark in flow layout.
            InlineItem::Image(None) => {}
            InlineItem::LineBreak => {
                builder.flush_word();
                builder.pieces.push(Piece::Break);
            }
        }
    }
    builder.finish()
}

/// Emphasised prefixes are always bold and the rest of each word always
/// regular weight; separators keep the run's own weight.
fn segment_face(faces: &FontFaces, segment: &Segment, style: &RunStyle) -> BuiltinFont {
    match segment {
        Segment::Strong(_) => faces.face(true, style.italic),
        Segment::Normal(_) => faces.face(false, style.italic),
        Segment::Plain(_) => faces.face(style.bold, style.italic),
    }
}

/// Greedy line breaking at spaces. A word wider than the line gets a line
/// of its own.
fn wrap(pieces: Vec<Piece>, max_width: f32) -> Vec<LineItem> {
    let mut lines = Vec::new();
    let mut line = Line::default();
    let mut pending_space: Option<Span> = None;

    for piece in pieces {
        match piece {
            Piece::Word(spans) => {
                let word_width: f32 = spans.iter().map(|s| s.width).sum();
                let space_width = pending_space.as_ref().map_or(0.0, |s| s.width);
                if !line.is_empty() && line.width + space_width + word_width > max_width {
                    lines.push(LineItem::Text(std::mem::take(&mut line)));
                    pending_space = None;
                }
                if let Some(space) = pending_space.take() {
                    line.push(space);
                }
                for span in spans {
                    line.push(span);
                }
            }
            Piece::Space(span) => {
                if !line.is_empty() {
                    pending_space = Some(span);
                }
            }
            Piece::Break => {
                lines.push(LineItem::Text(std::mem::take(&mut line)));
                pending_space = None;
            }
            Piece::Image(image) => {
                if !line.is_empty() {
                    lines.push(LineItem::Text(std::mem::take(&mut line)));
                }
                pending_space = None;
                lines.push(LineItem::Image(image));
            }
        }
    }
    if !line.is_empty() {
        lines.push(LineItem::Text(line));
    }
    lines
}

fn line_offset(alignment: Alignment, line_width: f32, box_width: f32) -> f32 {
    let slack = (box_width - line_width).max(0.0);
    match alignment {
        Alignment::Left => 0.0,
        Alignment::Center => slack / 2.0,
        Alignment::Right => slack,
    }
}

// -- Images -------------------------------------------------------------------

/// Decode a payload to RGB, compositing any transparency onto white.
fn decode_rgb(image: &NormalizedImage) -> std::result::Result<RgbImage, String> {
    let decoded = ::image::load_from_memory(&image.bytes).map_err(|err| err.to_string())?;
    if !decoded.color().has_alpha() {
        return Ok(decoded.to_rgb8());
    }
    let rgba = decoded.to_rgba8();
    Ok(RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let over_white = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8;
        ::image::Rgb([over_white(r), over_white(g), over_white(b)])
    }))
}

/// Natural size of an image in points at [`IMAGE_DPI`].
fn natural_size_pt(image: &NormalizedImage) -> (f32, f32) {
    let scale = 72.0 / IMAGE_DPI;
    (image.width as f32 * scale, image.height as f32 * scale)
}

// -- Page flow ----------------------------------------------------------------

/// Vertical flow over a sequence of pages. `y` is measured down from the top
/// edge of the current page.
struct PageFlow {
    width: Mm,
    height: Mm,
    height_pt: f32,
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
    y: f32,
    ops: Vec<Op>,
    pages: Vec<PdfPage>,
}

impl PageFlow {
    fn new(paper: PaperSize) -> Self {
        let (w_mm, h_mm) = paper.dimensions_mm();
        let (width, height) = (Mm(w_mm as f32), Mm(h_mm as f32));
        let top = Mm(MARGIN_TOP_MM).into_pt().0;
        Self {
            width,
            height,
            height_pt: height.into_pt().0,
            left: Mm(MARGIN_LEFT_MM).into_pt().0,
            right: width.into_pt().0 - Mm(MARGIN_RIGHT_MM).into_pt().0,
            top,
            bottom: height.into_pt().0 - Mm(MARGIN_BOTTOM_MM).into_pt().0,
            y: top,
            ops: Vec::new(),
            pages: Vec::new(),
        }
    }

    fn content_width(&self) -> f32 {
        self.right - self.left
    }

    fn content_height(&self) -> f32 {
        self.bottom - self.top
    }

    fn new_page(&mut self) {
        let ops = std::mem::take(&mut self.ops);
        self.pages.push(PdfPage::new(self.width, self.height, ops));
        self.y = self.top;
    }

    /// Start a new page unless `height` fits below the cursor. Content taller
    /// than a whole page is placed at the top and allowed to overflow.
    fn reserve(&mut self, height: f32) {
        if self.y + height > self.bottom && self.y > self.top {
            self.new_page();
        }
    }

    fn advance(&mut self, height: f32) {
        self.y = (self.y + height).min(self.bottom);
    }

    /// Queue the ops for one text line whose top sits at `top`.
    fn text_line(&mut self, line: &Line, x: f32, top: f32) {
        let baseline = self.height_pt - (top + line.size);
        self.ops.push(Op::StartTextSection);
        self.ops.push(Op::SetTextCursor {
            pos: Point {
                x: Pt(x),
                y: Pt(baseline),
            },
        });
        for span in &line.spans {
            self.ops.push(Op::SetFontSizeBuiltinFont {
                size: Pt(span.size),
                font: span.font,
            });
            self.ops.push(Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(span.text.clone())],
                font: span.font,
            });
        }
        self.ops.push(Op::EndTextSection);
        self.underlines(line, x, baseline);
    }

    /// Stroke a rule under each underlined span, just below the baseline.
    fn underlines(&mut self, line: &Line, x: f32, baseline: f32) {
        let mut start = x;
        for span in &line.spans {
            if span.underline && span.width > 0.0 {
                let y = baseline - span.size * UNDERLINE_OFFSET_EM;
                self.ops.push(Op::SetOutlineThickness {
                    pt: Pt(span.size * UNDERLINE_THICKNESS_EM),
                });
                self.ops.push(Op::DrawLine {
                    line: printpdf::Line {
                        points: vec![
                            LinePoint {
                                p: Point { x: Pt(start), y: Pt(y) },
                                bezier: false,
                            },
                            LinePoint {
                                p: Point {
                                    x: Pt(start + span.width),
                                    y: Pt(y),
                                },
                                bezier: false,
                            },
                        ],
                        is_closed: false,
                    },
                });
            }
            start += span.width;
        }
    }

    fn image_at(&mut self, doc: &mut PdfDocument, raw: &RawImage, x: f32, top: f32, scale: f32, height: f32) {
        let id = doc.add_image(raw);
        self.ops.push(Op::UseXobject {
            id,
            transform: XObjectTransform {
                translate_x: Some(Pt(x)),
                translate_y: Some(Pt(self.height_pt - (top + height))),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(IMAGE_DPI),
                rotate: None,
            },
        });
    }

    fn finish(mut self) -> Vec<PdfPage> {
        self.new_page();
        self.pages
    }
}

/// One vertical slot inside a table cell.
enum CellContent {
    Line(Line),
    Image(PlacedImage),
}

/// A decoded image scaled into a box.
struct PlacedImage {
    raw: RawImage,
    scale: f32,
    width: f32,
    height: f32,
}

fn place_image(
    image: &NormalizedImage,
    max_width: f32,
    max_height: f32,
    chunk: usize,
) -> Result<PlacedImage> {
    let rgb = decode_rgb(image).map_err(|reason| BionicError::Render {
        chunk,
        reason: format!("embedded image: {reason}"),
    })?;
    let (natural_w, natural_h) = natural_size_pt(image);
    let scale = (max_width / natural_w)
        .min(max_height / natural_h)
        .min(1.0)
        .max(f32::MIN_POSITIVE);
    let raw = RawImage {
        width: rgb.width() as usize,
        height: rgb.height() as usize,
        pixels: RawImageData::U8(rgb.into_raw()),
        data_format: RawImageFormat::RGB8,
        tag: Vec::new(),
    };
    Ok(PlacedImage {
        raw,
        scale,
        width: natural_w * scale,
        height: natural_h * scale,
    })
}

// -- Writer -------------------------------------------------------------------

/// Lays chunks out on fixed-size pages with the base-14 fonts. The page size
/// comes from each chunk's template.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfChunkWriter;

struct LayoutContext<'a> {
    doc: &'a mut PdfDocument,
    flow: PageFlow,
    faces: FontFaces,
    base_size: f32,
    chunk: usize,
}

impl LayoutContext<'_> {
    fn block(&mut self, block: &RenderBlock) -> Result<()> {
        match block {
            RenderBlock::Paragraph(paragraph) => self.paragraph(paragraph),
            RenderBlock::Table(table) => self.table(table),
            RenderBlock::Image(Some(image)) => self.block_image(image),
            RenderBlock::Image(None) => {
                self.flow.advance(self.base_size * IMAGE_GAP_EM);
                Ok(())
            }
        }
    }

    fn paragraph(&mut self, paragraph: &RenderParagraph) -> Result<()> {
        let width = self.flow.content_width();
        let pieces = paragraph_pieces(paragraph, &self.faces, self.base_size);
        for item in wrap(pieces, width) {
            match item {
                LineItem::Text(line) => {
                    let height = line.height(self.base_size);
                    self.flow.reserve(height);
                    let x = self.flow.left + line_offset(paragraph.alignment, line.width, width);
                    let top = self.flow.y;
                    self.flow.text_line(&line, x, top);
                    self.flow.advance(height);
                }
                LineItem::Image(image) => self.inline_image(&image, paragraph.alignment)?,
            }
        }
        self.flow.advance(self.base_size * PARAGRAPH_GAP_EM);
        Ok(())
    }

    fn inline_image(&mut self, image: &NormalizedImage, alignment: Alignment) -> Result<()> {
        let width = self.flow.content_width();
        let placed = place_image(image, width, self.flow.content_height(), self.chunk)?;
        self.flow.reserve(placed.height);
        let x = self.flow.left + line_offset(alignment, placed.width, width);
        let top = self.flow.y;
        self.flow
            .image_at(self.doc, &placed.raw, x, top, placed.scale, placed.height);
        self.flow.advance(placed.height);
        Ok(())
    }

    /// Block images are centred with an em of space above and below.
    fn block_image(&mut self, image: &NormalizedImage) -> Result<()> {
        let gap = self.base_size * IMAGE_GAP_EM;
        self.flow.advance(gap);
        self.inline_image(image, Alignment::Center)?;
        self.flow.advance(gap);
        Ok(())
    }

    /// Equal-width columns. A row that fits on a page moves to the next page
    /// as a whole; a taller one is split between lines.
    fn table(&mut self, table: &RenderTable) -> Result<()> {
        let columns = table.columns().max(1);
        let column_width = self.flow.content_width() / columns as f32;
        let inner_width = (column_width - 2.0 * CELL_PADDING_PT).max(1.0);

        for row in &table.rows {
            let cells: Vec<Vec<(Alignment, LineItem)>> = row
                .iter()
                .map(|cell| {
                    cell.paragraphs
                        .iter()
                        .flat_map(|paragraph| {
                            let pieces = paragraph_pieces(paragraph, &self.faces, self.base_size);
                            wrap(pieces, inner_width)
                                .into_iter()
                                .map(move |line| (paragraph.alignment, line))
                        })
                        .collect()
                })
                .collect();

            let mut placed_cells = Vec::with_capacity(cells.len());
            let mut row_height: f32 = 0.0;
            for lines in cells {
                let mut placed = Vec::with_capacity(lines.len());
                let mut cell_height = 0.0;
                for (alignment, line) in lines {
                    let entry = match line {
                        LineItem::Text(line) => {
                            let height = line.height(self.base_size);
                            (alignment, CellContent::Line(line), height)
                        }
                        LineItem::Image(image) => {
                            let image = place_image(
                                &image,
                                inner_width,
                                self.flow.content_height(),
                                self.chunk,
                            )?;
                            let height = image.height;
                            (alignment, CellContent::Image(image), height)
                        }
                    };
                    cell_height += entry.2;
                    placed.push(entry);
                }
                row_height = row_height.max(cell_height);
                placed_cells.push(placed);
            }
            let row_height = row_height + 2.0 * CELL_PADDING_PT;

            self.flow.reserve(row_height.min(self.flow.content_height()));
            let mut cells: Vec<VecDeque<(Alignment, CellContent, f32)>> =
                placed_cells.into_iter().map(VecDeque::from).collect();
            // Rows taller than a page continue each cell on the next page.
            loop {
                let row_top = self.flow.y;
                let at_page_top = row_top <= self.flow.top;
                let limit = self.flow.bottom - CELL_PADDING_PT;
                let mut used = 2.0 * CELL_PADDING_PT;
                for (column, queue) in cells.iter_mut().enumerate() {
                    let cell_left = self.flow.left + column as f32 * column_width + CELL_PADDING_PT;
                    let mut top = row_top + CELL_PADDING_PT;
                    let mut drawn = false;
                    while let Some(height) = queue.front().map(|entry| entry.2) {
                        // At the top of a page at least one slot is drawn so
                        // the row always makes progress.
                        if top + height > limit && (drawn || !at_page_top) {
                            break;
                        }
                        let Some((alignment, content, height)) = queue.pop_front() else {
                            break;
                        };
                        match content {
                            CellContent::Line(line) => {
                                let x = cell_left + line_offset(alignment, line.width, inner_width);
                                self.flow.text_line(&line, x, top);
                            }
                            CellContent::Image(image) => {
                                let x = cell_left + line_offset(alignment, image.width, inner_width);
                                self.flow
                                    .image_at(self.doc, &image.raw, x, top, image.scale, image.height);
                            }
                        }
                        top += height;
                        drawn = true;
                    }
                    used = used.max(top - row_top + CELL_PADDING_PT);
                }
                if cells.iter().all(VecDeque::is_empty) {
                    self.flow.advance(used);
                    break;
                }
                self.flow.new_page();
            }
        }
        self.flow.advance(self.base_size * PARAGRAPH_GAP_EM);
        Ok(())
    }
}

impl PdfChunkWriter {
    pub fn new() -> Self {
        Self
    }

    /// Lay out the chunk and serialise it. Always produces at least one page.
    #[instrument(skip_all, fields(chunk = chunk.index, blocks = chunk.blocks.len()))]
    pub fn render_bytes(&self, chunk: &ChunkDocument<'_>) -> Result<Vec<u8>> {
        let mut doc = PdfDocument::new("Bionic PDF");
        let mut ctx = LayoutContext {
            doc: &mut doc,
            flow: PageFlow::new(chunk.template.paper()),
            faces: FontFaces::for_family(chunk.template.font_family()),
            base_size: chunk.template.font_size_pt(),
            chunk: chunk.index,
        };
        for block in chunk.blocks {
            ctx.block(block)?;
        }
        let pages = ctx.flow.finish();
        let page_count = pages.len();
        doc.with_pages(pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        debug!(pages = page_count, bytes = output.len(), "Chunk laid out");
        Ok(output)
    }
}

impl MarkupRenderer for PdfChunkWriter {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn render(&self, chunk: &ChunkDocument<'_>, output: &Path) -> Result<()> {
        let bytes = self.render_bytes(chunk)?;
        std::fs::write(output, &bytes).map_err(|err| BionicError::Render {
            chunk: chunk.index,
            reason: format!("writing {}: {err}", output.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bionic_core::ImageKind;
    use bionic_document::ChunkTemplate;
    use bionic_document::assemble::{RenderCell, RenderParagraph};

    fn emphasised(word_pairs: &[(&str, &str)]) -> RenderParagraph {
        let mut segments = Vec::new();
        for (idx, (strong, normal)) in word_pairs.iter().enumerate() {
            if idx > 0 {
                segments.push(Segment::Plain(" ".into()));
            }
            segments.push(Segment::Strong((*strong).into()));
            segments.push(Segment::Normal((*normal).into()));
        }
        RenderParagraph {
            alignment: Alignment::Left,
            items: vec![InlineItem::Text {
                style: RunStyle::default(),
                content: TextContent::Emphasized(segments),
            }],
        }
    }

    fn png_payload(width: u32, height: u32) -> Arc<NormalizedImage> {
        let img = ::image::DynamicImage::ImageRgba8(::image::RgbaImage::from_pixel(
            width,
            height,
            ::image::Rgba([10, 20, 30, 128]),
        ));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, ::image::ImageFormat::Png).unwrap();
        Arc::new(NormalizedImage {
            bytes: bytes.into_inner(),
            kind: ImageKind::Png,
            width,
            height,
        })
    }

    fn page_count(bytes: &[u8]) -> usize {
        lopdf::Document::load_mem(bytes).unwrap().get_pages().len()
    }

    #[test]
    fn family_mapping() {
        assert_eq!(FontFaces::for_family("Arial"), FontFaces::HELVETICA);
        assert_eq!(FontFaces::for_family("Times New Roman"), FontFaces::TIMES);
        assert_eq!(FontFaces::for_family("DejaVu Sans Mono"), FontFaces::COURIER);
        assert_eq!(FontFaces::for_family("sans-serif"), FontFaces::HELVETICA);
        assert_eq!(FontFaces::for_family("serif"), FontFaces::TIMES);
    }

    #[test]
    fn prefix_is_bold_rest_is_regular() {
        let faces = FontFaces::HELVETICA;
        let pieces = paragraph_pieces(&emphasised(&[("rea", "ding"), ("f", "ast")]), &faces, 11.0);
        assert_eq!(pieces.len(), 3);
        match &pieces[0] {
            Piece::Word(spans) => {
                assert_eq!(spans.len(), 2);
                assert_eq!(spans[0].text, "rea");
                assert_eq!(spans[0].font, BuiltinFont::HelveticaBold);
                assert_eq!(spans[1].text, "ding");
                assert_eq!(spans[1].font, BuiltinFont::Helvetica);
            }
            other => panic!("expected a word, got {other:?}"),
        }
        assert!(matches!(pieces[1], Piece::Space(_)));
    }

    #[test]
    fn wrapping_respects_width_and_breaks() {
        let faces = FontFaces::HELVETICA;
        let mut paragraph = emphasised(&[("aa", "aa"), ("bb", "bb"), ("cc", "cc")]);
        // Each word is about 21pt wide and a space 5pt, so two fit in 50pt.
        let lines = wrap(paragraph_pieces(&paragraph, &faces, 10.0), 50.0);
        assert_eq!(lines.len(), 2);

        paragraph.items.push(InlineItem::LineBreak);
        paragraph.items.push(InlineItem::LineBreak);
        let lines = wrap(paragraph_pieces(&paragraph, &faces, 10.0), 1000.0);
        // One full line, then an empty line from the second break.
        assert_eq!(lines.len(), 2);
        match &lines[1] {
            LineItem::Text(line) => assert!(line.is_empty()),
            LineItem::Image(_) => panic!("unexpected image"),
        }
    }

    #[test]
    fn alignment_offsets() {
        assert_eq!(line_offset(Alignment::Left, 40.0, 100.0), 0.0);
        assert_eq!(line_offset(Alignment::Center, 40.0, 100.0), 30.0);
        assert_eq!(line_offset(Alignment::Right, 40.0, 100.0), 60.0);
        assert_eq!(line_offset(Alignment::Right, 140.0, 100.0), 0.0);
    }

    #[test]
    fn transparent_pixels_land_on_white() {
        let rgb = decode_rgb(&png_payload(2, 2)).unwrap();
        let [r, g, b] = rgb.get_pixel(0, 0).0;
        assert!(r > 100 && g > 100 && b > 100);
    }

    #[test]
    fn empty_chunk_is_one_blank_page() {
        let template = ChunkTemplate::new("Arial", 11.0);
        let chunk = ChunkDocument {
            index: 0,
            blocks: &[],
            template: &template,
        };
        let bytes = PdfChunkWriter::new().render_bytes(&chunk).unwrap();
        assert_eq!(page_count(&bytes), 1);
    }

    #[test]
    fn long_chunks_flow_onto_more_pages() {
        let template = ChunkTemplate::new("Times", 12.0);
        let blocks: Vec<RenderBlock> = (0..120)
            .map(|_| RenderBlock::Paragraph(emphasised(&[("rea", "ding"), ("i", "s"), ("f", "un")])))
            .collect();
        let chunk = ChunkDocument {
            index: 1,
            blocks: &blocks,
            template: &template,
        };
        let bytes = PdfChunkWriter::new().render_bytes(&chunk).unwrap();
        assert!(page_count(&bytes) > 1);
    }

    #[test]
    fn images_and_tables_render() {
        let template = ChunkTemplate::new("Arial", 11.0);
        let cell = RenderCell {
            paragraphs: vec![emphasised(&[("ce", "ll")])],
        };
        let blocks = vec![
            RenderBlock::Image(Some(png_payload(40, 30))),
            RenderBlock::Image(None),
            RenderBlock::Table(RenderTable {
                rows: vec![vec![cell.clone(), cell.clone()], vec![cell]],
            }),
        ];
        let chunk = ChunkDocument {
            index: 0,
            blocks: &blocks,
            template: &template,
        };
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("chunk.pdf");
        PdfChunkWriter::new()
            .render(&chunk, &output)
            .unwrap();
        assert_eq!(page_count(&std::fs::read(&output).unwrap()), 1);
    }

    #[test]
    fn tall_table_row_continues_on_next_page() {
        let template = ChunkTemplate::new("Arial", 11.0);
        let cell = RenderCell {
            paragraphs: (0..200).map(|_| emphasised(&[("li", "ne")])).collect(),
        };
        let blocks = vec![RenderBlock::Table(RenderTable {
            rows: vec![vec![cell]],
        })];
        let chunk = ChunkDocument {
            index: 0,
            blocks: &blocks,
            template: &template,
        };
        let bytes = PdfChunkWriter::new().render_bytes(&chunk).unwrap();
        assert!(page_count(&bytes) > 1);
    }

    #[test]
    fn underlined_runs_get_a_rule() {
        let faces = FontFaces::HELVETICA;
        let paragraph = RenderParagraph {
            alignment: Alignment::Left,
            items: vec![
                InlineItem::Text {
                    style: RunStyle {
                        underline: true,
                        ..RunStyle::default()
                    },
                    content: TextContent::Original("linked".into()),
                },
                InlineItem::Text {
                    style: RunStyle::default(),
                    content: TextContent::Original(" plain".into()),
                },
            ],
        };
        let lines = wrap(paragraph_pieces(&paragraph, &faces, 10.0), 1000.0);
        let LineItem::Text(line) = &lines[0] else {
            panic!("expected a text line");
        };
        let mut flow = PageFlow::new(PaperSize::Letter);
        flow.text_line(line, flow.left, flow.top);
        let rules = flow
            .ops
            .iter()
            .filter(|op| matches!(op, Op::DrawLine { .. }))
            .count();
        assert_eq!(rules, 1);
    }

    #[test]
    fn page_box_follows_template_paper() {
        let template = ChunkTemplate::new("Arial", 11.0).with_paper(PaperSize::A4);
        let a4 = PageFlow::new(template.paper());
        let letter = PageFlow::new(PaperSize::Letter);
        assert_eq!(a4.width.0, 210.0);
        assert_eq!(a4.height.0, 297.0);
        assert!(a4.bottom > letter.bottom);
        assert!(a4.right < letter.right);
    }
}
