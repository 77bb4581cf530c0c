// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-job record of recovered errors. Passed explicitly through the provider,
// image pipeline and assembler so that degraded output is never silent.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::error::BionicError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// A content block was skipped.
    StructureParse,
    /// An image resolved to nothing.
    ImageDecode,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// What the message is about: a block index, an image id, a page.
    pub subject: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a recovered error and log it as a warning.
    ///
    /// Fatal errors are not diagnostics; passing one is a caller bug and it is
    /// recorded as a structure problem so it still shows up in the summary.
    pub fn record(&mut self, subject: impl Into<String>, err: &BionicError) {
        let subject = subject.into();
        let kind = match err {
            BionicError::ImageDecode { .. } => DiagnosticKind::ImageDecode,
            _ => DiagnosticKind::StructureParse,
        };
        warn!(subject = %subject, error = %err, "recovered error");
        self.entries.push(Diagnostic {
            kind,
            subject,
            message: err.to_string(),
            at: Utc::now(),
        });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_kind() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.record(
            "rId1",
            &BionicError::ImageDecode {
                id: "rId1".into(),
                reason: "bad header".into(),
            },
        );
        diagnostics.record("block 4", &BionicError::StructureParse("bad".into()));
        diagnostics.record("block 9", &BionicError::StructureParse("worse".into()));

        assert_eq!(diagnostics.count(DiagnosticKind::ImageDecode), 1);
        assert_eq!(diagnostics.count(DiagnosticKind::StructureParse), 2);
        assert_eq!(diagnostics.entries()[0].subject, "rId1");
        assert!(!diagnostics.is_empty());
    }
}
