// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bionic Reader: re-typesets a document so the leading part of every word
// is emphasised.
//
// Entry point. Parses flags, initialises logging, and runs one conversion.

mod cli;

use std::process::ExitCode;

use bionic_core::{ConversionConfig, Result};
use bionic_render::{ConversionReport, Converter};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cli::Cli;

/// `RUST_LOG` wins; otherwise `debug` when verbose and `info` when not.
fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli, config: ConversionConfig) -> Result<ConversionReport> {
    let output = cli.output_path();
    info!(
        input = %cli.input.display(),
        output = %output.display(),
        ratio = config.bold_ratio.get(),
        font = %config.font_family,
        "Bionic Reader starting"
    );
    Converter::new(config)?.convert(&cli.input, &output)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(err) => {
            init_logging(cli.verbose);
            error!(%err, "invalid configuration");
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(config.verbose);

    match run(&cli, config) {
        Ok(report) => {
            if !report.diagnostics.is_empty() {
                warn!(
                    recovered = report.diagnostics.entries().len(),
                    skipped_blocks = report.skipped_blocks,
                    "Output produced with recovered errors"
                );
            }
            println!("Success! Output saved to: {}", report.summary.output.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "conversion failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
