// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTML projection of renderable blocks and the per-chunk document template.
// Every chunk is wrapped in the full template so that any chunk can be
// rendered on its own.

use std::fmt::Write as _;

use bionic_core::{PaperSize, ResolvedImage};

use super::blocks::{InlineItem, RenderBlock, RenderParagraph, RenderTable, TextContent};
use crate::emphasis::{escape_html, segments_html};

/// Weight of the emphasised word prefix.
pub const STRONG_WEIGHT: u16 = 700;
/// Weight of the rest of each word.
pub const NORMAL_WEIGHT: u16 = 400;

/// Style context shared by every chunk of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkTemplate {
    font_family: String,
    font_size_pt: f32,
    paper: PaperSize,
}

impl ChunkTemplate {
    pub fn new(font_family: impl Into<String>, font_size_pt: f32) -> Self {
        Self {
            font_family: font_family.into(),
            font_size_pt,
            paper: PaperSize::Letter,
        }
    }

    pub fn with_paper(mut self, paper: PaperSize) -> Self {
        self.paper = paper;
        self
    }

    pub fn paper(&self) -> PaperSize {
        self.paper
    }

    pub fn font_family(&self) -> &str {
        &self.font_family
    }

    pub fn font_size_pt(&self) -> f32 {
        self.font_size_pt
    }

    /// Document prologue up to and including the opening page container.
    pub fn head(&self) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8" />
  <title>Bionic PDF</title>
  <style>
    @page {{
      size: {paper};
      margin: 1in;
      margin-right: 1.5in;
    }}
    body {{ font-family: {family}, sans-serif; font-size: {size}pt; margin: 0; padding: 0; background: white; }}
    .page {{ width: 100%; box-sizing: border-box; }}
    .bionic-prefix {{ font-weight: {strong}; }}
    .bionic-rest {{ font-weight: {normal}; }}
    img {{ max-width: 100%; height: auto; display: block; }}
    .paragraph {{ margin-bottom: 0.5em; }}
    .image-container {{ position: relative; margin: 1em 0; text-align: center; clear: both; }}
    table {{ width: 100%; border-collapse: collapse; margin-bottom: 1em; }}
    td {{ vertical-align: top; padding: 4px; }}
  </style>
</head>
<body>
<div class="page">
"#,
            paper = self.paper.css_size(),
            family = css_font_family(&self.font_family),
            size = self.font_size_pt,
            strong = STRONG_WEIGHT,
            normal = NORMAL_WEIGHT,
        )
    }

    pub fn tail(&self) -> &'static str {
        "\n</div>\n</body>\n</html>\n"
    }

    /// Self-contained HTML document holding `blocks`.
    pub fn wrap(&self, blocks: &[RenderBlock]) -> String {
        let mut html = self.head();
        for block in blocks {
            html.push_str(&block_html(block));
        }
        html.push_str(self.tail());
        html
    }
}

/// Strip characters that would let a family name escape its declaration.
fn css_font_family(family: &str) -> String {
    family
        .chars()
        .filter(|c| !matches!(c, ';' | '{' | '}' | '<' | '>' | '\\'))
        .collect()
}

pub fn block_html(block: &RenderBlock) -> String {
    match block {
        RenderBlock::Paragraph(paragraph) => paragraph_html(paragraph),
        RenderBlock::Table(table) => table_html(table),
        RenderBlock::Image(image) => image_html(image),
    }
}

fn paragraph_html(paragraph: &RenderParagraph) -> String {
    let mut out = String::from(r#"<div class="paragraph""#);
    if let Some(align) = paragraph.alignment.css() {
        let _ = write!(out, r#" style="text-align: {align};""#);
    }
    out.push('>');
    for item in &paragraph.items {
        match item {
            InlineItem::Text { style, content } => {
                match style.css() {
                    Some(css) => {
                        let _ = write!(out, r#"<span style="{}">"#, escape_html(&css));
                    }
                    None => out.push_str("<span>"),
                }
                out.push_str(&content_html(content));
                out.push_str("</span>");
            }
            InlineItem::Image(image) => out.push_str(&image_html(image)),
            InlineItem::LineBreak => out.push_str("<br />"),
        }
    }
    out.push_str("</div>");
    out
}

fn content_html(content: &TextContent) -> String {
    match content {
        TextContent::Original(text) => escape_html(text),
        TextContent::Emphasized(segments) => segments_html(segments),
    }
}

fn table_html(table: &RenderTable) -> String {
    let mut out = String::from("<table>");
    for row in &table.rows {
        out.push_str("<tr>");
        for cell in row {
            out.push_str("<td>");
            for paragraph in &cell.paragraphs {
                out.push_str(&paragraph_html(paragraph));
            }
            out.push_str("</td>");
        }
        out.push_str("</tr>");
    }
    out.push_str("</table>");
    out
}

/// A failed image keeps its container so the surrounding layout is unchanged.
fn image_html(image: &ResolvedImage) -> String {
    match image {
        Some(image) => format!(
            r#"<div class="image-container"><img src="{}" alt="Document Image" /></div>"#,
            image.data_uri()
        ),
        None => r#"<div class="image-container"></div>"#.to_string(),
    }
}
