// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Whole-document conversion: provider, image pipeline, assembler and render
// orchestrator wired together for one input file.

use std::path::{Path, PathBuf};

use bionic_core::{ConversionConfig, Diagnostics, Result};
use bionic_document::{Assembler, ChunkTemplate, ImagePipeline, check_input, provider_for};
use tracing::{info, instrument};

use crate::orchestrator::{Orchestrator, RenderSummary};
use crate::renderer::renderer_for;

/// Outcome of a successful conversion, including every recovered error.
#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub summary: RenderSummary,
    pub diagnostics: Diagnostics,
    /// Blocks dropped by the assembler.
    pub skipped_blocks: usize,
}

/// `<dir>/<stem>_bionic.pdf` next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    input.with_file_name(format!("{stem}_bionic.pdf"))
}

pub struct Converter {
    config: ConversionConfig,
    scratch_root: Option<PathBuf>,
}

impl Converter {
    /// Validates `config` up front so a bad setting fails before any work.
    pub fn new(config: ConversionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            scratch_root: None,
        })
    }

    /// Keep chunk scratch files under `dir`.
    pub fn with_scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(dir.into());
        self
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    #[instrument(skip(self), fields(input = %input.display(), output = %output.display()))]
    pub fn convert(&self, input: &Path, output: &Path) -> Result<ConversionReport> {
        check_input(input)?;
        let provider = provider_for(input)?;
        let source = provider.load(input)?;
        let workers = self.config.worker_count();
        let mut diagnostics = Diagnostics::new();

        // Barrier: the assembler only starts once every image is resolved.
        let pipeline = ImagePipeline::new(self.config.image, workers)?;
        let mut images = pipeline.run(source.images, &mut diagnostics);
        for (id, err) in source.image_errors {
            images.record_failure(id, &err, &mut diagnostics);
        }

        let assembly = Assembler::new(&images, self.config.bold_ratio)
            .assemble(source.blocks, &mut diagnostics);
        let template = ChunkTemplate::new(
            self.config.font_family.clone(),
            assembly.dominant_font_size_pt,
        )
        .with_paper(self.config.paper);

        let renderer = renderer_for(&self.config.renderer);
        let mut orchestrator = Orchestrator::new(renderer.as_ref(), self.config.chunk_size, workers);
        if let Some(root) = &self.scratch_root {
            orchestrator = orchestrator.with_scratch_root(root.clone());
        }
        let summary = orchestrator.run(assembly.blocks, &template, output)?;

        info!(
            pages = summary.pages,
            chunks = summary.chunks,
            skipped = assembly.skipped,
            recovered = diagnostics.entries().len(),
            "Conversion complete"
        );
        Ok(ConversionReport {
            summary,
            diagnostics,
            skipped_blocks: assembly.skipped,
        })
    }
}
