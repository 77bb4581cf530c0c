// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line interface. Flags override values from `--config`, which in
// turn override the built-in defaults.

use std::path::PathBuf;

use bionic_core::{BionicError, BoldRatio, ConversionConfig, RendererKind, Result};
use bionic_render::default_output_path;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "bionic-reader")]
#[command(version)]
#[command(about = "Convert documents to bionic reading format", long_about = None)]
pub struct Cli {
    /// Input document (.pdf or .json content tree)
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Output PDF [default: <input>_bionic.pdf]
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Fraction of each word to emphasise, in (0, 1] [default: 0.5]
    #[arg(short, long, value_name = "RATIO")]
    pub bold_ratio: Option<f64>,

    /// Font family for the output [default: Arial]
    #[arg(short, long, value_name = "FAMILY")]
    pub font: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Blocks per render chunk [default: 100]
    #[arg(long, value_name = "N")]
    pub chunk_size: Option<usize>,

    /// Worker threads for image and render pools [default: all cores]
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// External HTML-to-PDF command, e.g. "weasyprint - {output}"
    #[arg(long, value_name = "COMMAND")]
    pub renderer_cmd: Option<String>,
}

impl Cli {
    /// Merge the config file (if any) with the flags and validate the result.
    pub fn resolve_config(&self) -> Result<ConversionConfig> {
        let mut config = match &self.config {
            Some(path) => ConversionConfig::load(path)?,
            None => ConversionConfig::default(),
        };
        if let Some(ratio) = self.bold_ratio {
            config.bold_ratio = BoldRatio::new(ratio)?;
        }
        if let Some(font) = &self.font {
            config.font_family = font.clone();
        }
        if self.verbose {
            config.verbose = true;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(workers) = self.workers {
            config.workers = Some(workers);
        }
        if let Some(command) = &self.renderer_cmd {
            config.renderer = parse_renderer_command(command)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.input))
    }
}

/// Split a command line on whitespace into program and arguments.
fn parse_renderer_command(command: &str) -> Result<RendererKind> {
    let mut parts = command.split_whitespace().map(str::to_string);
    let program = parts
        .next()
        .ok_or_else(|| BionicError::InvalidConfig("--renderer-cmd is empty".into()))?;
    Ok(RendererKind::Command {
        program,
        args: parts.collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn short_flags_match_long_ones() {
        let cli = Cli::try_parse_from([
            "bionic-reader", "-i", "in.pdf", "-o", "out.pdf", "-b", "0.4", "-f", "Georgia", "-v",
        ])
        .unwrap();
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.bold_ratio.get(), 0.4);
        assert_eq!(config.font_family, "Georgia");
        assert!(config.verbose);
        assert_eq!(cli.output_path(), PathBuf::from("out.pdf"));
    }

    #[test]
    fn defaults_apply_without_flags() {
        let cli = Cli::try_parse_from(["bionic-reader", "--input", "docs/paper.pdf"]).unwrap();
        let config = cli.resolve_config().unwrap();
        assert_eq!(config, ConversionConfig::default());
        assert_eq!(cli.output_path(), Path::new("docs/paper_bionic.pdf"));
    }

    #[test]
    fn input_is_required() {
        assert!(Cli::try_parse_from(["bionic-reader"]).is_err());
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bionic.json");
        std::fs::write(&path, r#"{"bold_ratio": 0.3, "chunk_size": 25, "font_family": "Times"}"#)
            .unwrap();
        let cli = Cli::try_parse_from([
            "bionic-reader",
            "-i",
            "a.json",
            "--config",
            path.to_str().unwrap(),
            "--chunk-size",
            "10",
            "--workers",
            "3",
        ])
        .unwrap();
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.bold_ratio.get(), 0.3);
        assert_eq!(config.font_family, "Times");
        assert_eq!(config.chunk_size, 10);
        assert_eq!(config.workers, Some(3));
    }

    #[test]
    fn invalid_values_are_config_errors() {
        for args in [
            vec!["bionic-reader", "-i", "a.pdf", "-b", "0"],
            vec!["bionic-reader", "-i", "a.pdf", "-b", "1.5"],
            vec!["bionic-reader", "-i", "a.pdf", "--chunk-size", "0"],
            vec!["bionic-reader", "-i", "a.pdf", "--workers", "0"],
            vec!["bionic-reader", "-i", "a.pdf", "--renderer-cmd", "   "],
        ] {
            let cli = Cli::try_parse_from(args).unwrap();
            assert!(matches!(
                cli.resolve_config(),
                Err(BionicError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn renderer_command_is_split() {
        let cli = Cli::try_parse_from([
            "bionic-reader",
            "-i",
            "a.pdf",
            "--renderer-cmd",
            "weasyprint - {output}",
        ])
        .unwrap();
        assert_eq!(
            cli.resolve_config().unwrap().renderer,
            RendererKind::Command {
                program: "weasyprint".into(),
                args: vec!["-".into(), "{output}".into()],
            }
        );
    }
}
