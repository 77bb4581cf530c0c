// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Bionic Reader.

use thiserror::Error;

/// Top-level error type for all Bionic Reader operations.
#[derive(Debug, Error)]
pub enum BionicError {
    // -- Fatal before any work --
    #[error("input error: {0}")]
    Input(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- Recovered locally --
    #[error("malformed content block: {0}")]
    StructureParse(String),

    #[error("image {id} could not be decoded: {reason}")]
    ImageDecode { id: String, reason: String },

    // -- Fatal to the whole job --
    #[error("chunk {chunk} failed to render: {reason}")]
    Render { chunk: usize, reason: String },

    #[error("merging rendered chunks failed: {0}")]
    Merge(String),

    // -- Plumbing --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BionicError {
    /// Per-block and per-image errors are absorbed and the job carries on.
    /// Everything else aborts the conversion.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::StructureParse(_) | Self::ImageDecode { .. })
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BionicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_errors() {
        assert!(BionicError::StructureParse("bad table".into()).is_recoverable());
        assert!(
            BionicError::ImageDecode {
                id: "rId4".into(),
                reason: "truncated".into()
            }
            .is_recoverable()
        );
    }

    #[test]
    fn fatal_errors() {
        assert!(!BionicError::Input("missing.pdf".into()).is_recoverable());
        assert!(
            !BionicError::Render {
                chunk: 1,
                reason: "boom".into()
            }
            .is_recoverable()
        );
        assert!(!BionicError::Merge("corrupt".into()).is_recoverable());
    }

    #[test]
    fn render_error_names_chunk() {
        let err = BionicError::Render {
            chunk: 2,
            reason: "renderer exited with status 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "chunk 2 failed to render: renderer exited with status 1"
        );
    }
}
