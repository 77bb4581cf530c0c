// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Renderable blocks: the assembler's output. Text is already emphasised and
// image references are already resolved, so renderers never look anything up.

use bionic_core::{Alignment, ResolvedImage, RunStyle};

use crate::emphasis::Segment;

/// Text of one run after emphasis.
#[derive(Debug, Clone, PartialEq)]
pub enum TextContent {
    Emphasized(Vec<Segment>),
    /// Emphasis produced nothing (whitespace-only run); keep the text as is.
    Original(String),
}

impl TextContent {
    pub fn plain_text(&self) -> String {
        match self {
            Self::Emphasized(segments) => segments.iter().map(Segment::text).collect(),
            Self::Original(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InlineItem {
    /// Emphasised text wrapped in the run's own style.
    Text { style: RunStyle, content: TextContent },
    /// Inline drawing; `None` renders as an empty container.
    Image(ResolvedImage),
    LineBreak,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderParagraph {
    pub alignment: Alignment,
    pub items: Vec<InlineItem>,
}

impl RenderParagraph {
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            match item {
                InlineItem::Text { content, .. } => out.push_str(&content.plain_text()),
                InlineItem::LineBreak => out.push('\n'),
                InlineItem::Image(_) => {}
            }
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderCell {
    pub paragraphs: Vec<RenderParagraph>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderTable {
    pub rows: Vec<Vec<RenderCell>>,
}

impl RenderTable {
    pub fn columns(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// One top-level element of a chunk, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderBlock {
    Paragraph(RenderParagraph),
    Table(RenderTable),
    Image(ResolvedImage),
}
