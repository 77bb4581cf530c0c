// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BionicError, Result};
use crate::types::{BoldRatio, PaperSize};

/// Blocks per render chunk unless overridden.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Settings applied by the image normalisation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    /// Images wider than this are downscaled to exactly this width.
    pub max_width: u32,
    /// JPEG quality (1-100) for opaque images.
    pub jpeg_quality: u8,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            max_width: 1200,
            jpeg_quality: 75,
        }
    }
}

/// Which markup renderer turns chunks into PDF pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RendererKind {
    /// In-process renderer built on `printpdf`.
    #[default]
    Builtin,
    /// External program fed the HTML fragment on stdin. `{output}` in `args`
    /// is replaced with the path the program must write its PDF to.
    Command { program: String, args: Vec<String> },
}

/// Settings for one conversion job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Fraction of every word rendered bold.
    pub bold_ratio: BoldRatio,
    /// Font family substituted into the chunk template.
    pub font_family: String,
    /// Page size of every output page.
    pub paper: PaperSize,
    /// Enables debug logging. No effect on the output.
    pub verbose: bool,
    /// Maximum number of blocks per render chunk.
    pub chunk_size: usize,
    /// Worker count for image and render pools; `None` uses all cores.
    pub workers: Option<usize>,
    pub image: ImageSettings,
    pub renderer: RendererKind,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            bold_ratio: BoldRatio::default(),
            font_family: "Arial".into(),
            paper: PaperSize::Letter,
            verbose: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: None,
            image: ImageSettings::default(),
            renderer: RendererKind::Builtin,
        }
    }
}

impl ConversionConfig {
    /// Load a configuration file (JSON). Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            BionicError::InvalidConfig(format!("cannot read {}: {err}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|err| {
            BionicError::InvalidConfig(format!("{}: {err}", path.display()))
        })?;
        config.validate()?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(BionicError::InvalidConfig(
                "chunk_size must be at least 1".into(),
            ));
        }
        if self.workers == Some(0) {
            return Err(BionicError::InvalidConfig(
                "workers must be at least 1".into(),
            ));
        }
        if self.font_family.trim().is_empty() {
            return Err(BionicError::InvalidConfig("font_family is empty".into()));
        }
        if let PaperSize::Custom {
            width_mm,
            height_mm,
        } = self.paper
        {
            if width_mm == 0 || height_mm == 0 {
                return Err(BionicError::InvalidConfig(format!(
                    "custom paper size must be positive, got {width_mm}x{height_mm}mm"
                )));
            }
        }
        if !(1..=100).contains(&self.image.jpeg_quality) {
            return Err(BionicError::InvalidConfig(format!(
                "jpeg_quality must be 1-100, got {}",
                self.image.jpeg_quality
            )));
        }
        if self.image.max_width == 0 {
            return Err(BionicError::InvalidConfig(
                "image max_width must be positive".into(),
            ));
        }
        if let RendererKind::Command { program, .. } = &self.renderer {
            if program.trim().is_empty() {
                return Err(BionicError::InvalidConfig(
                    "renderer command has no program".into(),
                ));
            }
        }
        Ok(())
    }

    /// Worker count to use, falling back to the machine's parallelism.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ConversionConfig::default();
        assert_eq!(config.bold_ratio.get(), 0.5);
        assert_eq!(config.font_family, "Arial");
        assert_eq!(config.chunk_size, 100);
        assert_eq!(config.image.max_width, 1200);
        assert_eq!(config.image.jpeg_quality, 75);
        assert_eq!(config.renderer, RendererKind::Builtin);
        assert_eq!(config.paper, PaperSize::Letter);
        assert!(config.validate().is_ok());
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bionic.json");
        std::fs::write(
            &path,
            r#"{"bold_ratio": 0.4, "renderer": {"kind": "command", "program": "weasyprint", "args": ["-", "{output}"]}}"#,
        )
        .unwrap();

        let config = ConversionConfig::load(&path).unwrap();
        assert_eq!(config.bold_ratio.get(), 0.4);
        assert_eq!(config.font_family, "Arial");
        match config.renderer {
            RendererKind::Command { program, args } => {
                assert_eq!(program, "weasyprint");
                assert_eq!(args, vec!["-", "{output}"]);
            }
            other => panic!("unexpected renderer {other:?}"),
        }
    }

    #[test]
    fn load_rejects_out_of_range_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"bold_ratio": 0.0}"#).unwrap();
        assert!(matches!(
            ConversionConfig::load(&path),
            Err(BionicError::InvalidConfig(_))
        ));
    }

    #[test]
    fn paper_size_is_configurable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a4.json");
        std::fs::write(&path, r#"{"paper": "A4"}"#).unwrap();
        assert_eq!(ConversionConfig::load(&path).unwrap().paper, PaperSize::A4);

        let config = ConversionConfig {
            paper: PaperSize::Custom {
                width_mm: 0,
                height_mm: 200,
            },
            ..ConversionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(BionicError::InvalidConfig(_))
        ));
    }

    #[test]
    fn validate_rejects_zero_chunk_size() {
        let config = ConversionConfig {
            chunk_size: 0,
            ..ConversionConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
