// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document structure providers: turn a source file into the ordered block
// sequence and the raw images it references.

pub mod json;
pub mod pdf;

use std::path::Path;

use bionic_core::{BionicError, ContentBlock, ImageRef, Result, SourceImage};
use tracing::debug;

pub use json::JsonProvider;
pub use pdf::PdfProvider;

/// Everything a provider extracted from one source file.
#[derive(Debug, Default)]
pub struct SourceDocument {
    /// Blocks in document order. A malformed block is an `Err` in its slot.
    pub blocks: Vec<Result<ContentBlock>>,
    /// Raw images, keyed by the ids the blocks reference.
    pub images: Vec<SourceImage>,
    /// Images the provider found but could not extract.
    pub image_errors: Vec<(ImageRef, BionicError)>,
}

/// Source of document structure.
pub trait DocumentProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Parse the file at `path`. Errors are fatal; per-block problems belong
    /// in [`SourceDocument::blocks`].
    fn load(&self, path: &Path) -> Result<SourceDocument>;
}

/// Fail early with an input error if `path` is not a readable file.
pub fn check_input(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|err| {
        BionicError::Input(format!("{}: {err}", path.display()))
    })?;
    if !metadata.is_file() {
        return Err(BionicError::Input(format!(
            "{} is not a regular file",
            path.display()
        )));
    }
    std::fs::File::open(path)
        .map_err(|err| BionicError::Input(format!("{}: {err}", path.display())))?;
    Ok(())
}

/// Pick a provider from the file extension.
pub fn provider_for(path: &Path) -> Result<Box<dyn DocumentProvider>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let provider: Box<dyn DocumentProvider> = match ext.as_str() {
        "json" => Box::new(JsonProvider),
        "pdf" => Box::new(PdfProvider),
        other => {
            return Err(BionicError::Input(format!(
                "unsupported input type '{other}' for {} (expected .pdf or .json)",
                path.display()
            )));
        }
    };
    debug!(provider = provider.name(), path = %path.display(), "Provider selected");
    Ok(provider)
}
