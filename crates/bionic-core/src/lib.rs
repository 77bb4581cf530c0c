// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bionic Reader: Core types, configuration, and error definitions shared
// across all crates.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod types;

pub use config::{ConversionConfig, ImageSettings, RendererKind};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{BionicError, Result};
pub use types::*;
