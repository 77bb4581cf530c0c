// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bionic-document: Document processing for Bionic Reader.
//
// Reads document structure from a source file, emphasises the leading part of
// every word, normalises embedded images in parallel, and assembles the result
// into renderable blocks with an HTML projection.

pub mod assemble;
pub mod emphasis;
pub mod image;
pub mod provider;

// Re-export the primary types so callers can use `bionic_document::Assembler` etc.
pub use assemble::{Assembler, Assembly, ChunkTemplate, RenderBlock};
pub use emphasis::{Emphasized, Segment, emphasize};
pub use crate::image::{ImageNormalizer, ImagePipeline, ImageTable};
pub use provider::{DocumentProvider, SourceDocument, check_input, provider_for};
