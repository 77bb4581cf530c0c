// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Bionic Reader: the content tree handed over by a
// document provider and the normalised image payloads bound to it.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BionicError, Result};

/// Unique identifier for one conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier of an image within one job.
///
/// Providers mint these while walking the source (e.g. `rId7`, `p3-Im0`);
/// they are only meaningful against the image table of the same job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fraction of each word rendered in the strong weight, in (0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct BoldRatio(f64);

impl BoldRatio {
    pub fn new(value: f64) -> Result<Self> {
        if value.is_finite() && value > 0.0 && value <= 1.0 {
            Ok(Self(value))
        } else {
            Err(BionicError::InvalidConfig(format!(
                "bold ratio must be in (0, 1], got {value}"
            )))
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for BoldRatio {
    fn default() -> Self {
        Self(0.5)
    }
}

impl TryFrom<f64> for BoldRatio {
    type Error = BionicError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<BoldRatio> for f64 {
    fn from(ratio: BoldRatio) -> f64 {
        ratio.0
    }
}

// -- Content tree -------------------------------------------------------------

/// Character formatting carried by a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// Font size in points, when the source declares one.
    #[serde(rename = "size")]
    pub size_pt: Option<f32>,
}

impl RunStyle {
    /// Inline CSS declarations for this style, or `None` for plain text.
    pub fn css(&self) -> Option<String> {
        let mut decls = Vec::new();
        if self.bold {
            decls.push("font-weight: bold".to_string());
        }
        if self.italic {
            decls.push("font-style: italic".to_string());
        }
        if self.underline {
            decls.push("text-decoration: underline".to_string());
        }
        if let Some(size) = self.size_pt {
            decls.push(format!("font-size: {size}pt"));
        }
        if decls.is_empty() {
            None
        } else {
            Some(decls.join("; "))
        }
    }
}

/// A contiguous piece of text sharing one style.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    #[serde(default)]
    pub text: String,
    #[serde(flatten)]
    pub style: RunStyle,
    /// Inline drawing anchored in this run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    /// The run ends with an explicit line break.
    #[serde(default)]
    pub line_break: bool,
}

impl Run {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn styled(text: impl Into<String>, style: RunStyle) -> Self {
        Self {
            text: text.into(),
            style,
            ..Self::default()
        }
    }
}

/// Horizontal paragraph alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    /// CSS `text-align` value, `None` for the default flow.
    pub fn css(&self) -> Option<&'static str> {
        match self {
            Self::Left => None,
            Self::Center => Some("center"),
            Self::Right => Some("right"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default)]
    pub runs: Vec<Run>,
    #[serde(default)]
    pub alignment: Alignment,
}

impl Paragraph {
    pub fn new(runs: Vec<Run>) -> Self {
        Self {
            runs,
            alignment: Alignment::Left,
        }
    }

    /// Convenience constructor for a single unstyled run.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(vec![Run::text(text)])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub rows: Vec<TableRow>,
}

/// Floating anchor offset in inches. Parsed but not used for layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionHint {
    pub x_in: f32,
    pub y_in: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    pub image: ImageRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<PositionHint>,
}

/// One unit of document structure, in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Paragraph(Paragraph),
    Table(Table),
    Image(ImageBlock),
}

impl ContentBlock {
    /// Structural checks a provider cannot express through its types.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Paragraph(paragraph) => validate_paragraph(paragraph),
            Self::Table(table) => {
                if table.rows.is_empty() {
                    return Err(BionicError::StructureParse("table has no rows".into()));
                }
                for (row_idx, row) in table.rows.iter().enumerate() {
                    if row.cells.is_empty() {
                        return Err(BionicError::StructureParse(format!(
                            "table row {row_idx} has no cells"
                        )));
                    }
                    for cell in &row.cells {
                        for paragraph in &cell.paragraphs {
                            validate_paragraph(paragraph)?;
                        }
                    }
                }
                Ok(())
            }
            Self::Image(image) => {
                if image.image.as_str().is_empty() {
                    return Err(BionicError::StructureParse(
                        "image block without an identifier".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

fn validate_paragraph(paragraph: &Paragraph) -> Result<()> {
    for run in &paragraph.runs {
        if let Some(size) = run.style.size_pt {
            if !size.is_finite() || size <= 0.0 {
                return Err(BionicError::StructureParse(format!(
                    "run declares invalid font size {size}"
                )));
            }
        }
    }
    Ok(())
}

// -- Images -------------------------------------------------------------------

/// Raw image bytes as extracted from the source, before normalisation.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub id: ImageRef,
    pub bytes: Vec<u8>,
}

impl SourceImage {
    pub fn new(id: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            id: ImageRef::new(id),
            bytes,
        }
    }
}

/// Encoding chosen for a normalised image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// Encoded, size-bounded image ready to be embedded in a chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
}

impl NormalizedImage {
    /// `data:<mime>;base64,<payload>` form used inside markup fragments.
    pub fn data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.kind.mime_type(),
            STANDARD.encode(&self.bytes)
        )
    }
}

/// Resolution of an [`ImageRef`]: the payload, or `None` when processing failed.
pub type ResolvedImage = Option<Arc<NormalizedImage>>;

/// Page size of the output, shared by the markup template and the builtin
/// renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    #[default]
    Letter,
    Legal,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }

    /// Value for the CSS `@page { size: ... }` descriptor.
    pub fn css_size(&self) -> String {
        match self {
            Self::A4 => "A4".into(),
            Self::Letter => "Letter".into(),
            Self::Legal => "Legal".into(),
            Self::Custom {
                width_mm,
                height_mm,
            } => format!("{width_mm}mm {height_mm}mm"),
        }
    }
}
