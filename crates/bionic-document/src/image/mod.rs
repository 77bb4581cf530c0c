// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: per-image normalisation and the parallel pipeline that
// resolves every image of a job before assembly starts.

pub mod normalize;
pub mod pipeline;

pub use normalize::ImageNormalizer;
pub use pipeline::{ImagePipeline, ImageTable};
