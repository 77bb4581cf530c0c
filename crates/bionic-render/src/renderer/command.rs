// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// External HTML-to-PDF renderer. The chunk's HTML is written to the child's
// stdin; the output path is passed through the `{output}` argument placeholder
// (or appended when no argument carries one).

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use bionic_core::{BionicError, Result};
use tracing::{debug, instrument};

use super::{ChunkDocument, MarkupRenderer};

/// Argument placeholder replaced by the chunk's output path.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Longest stderr excerpt carried in an error.
const STDERR_EXCERPT: usize = 512;

#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
}

impl CommandRenderer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Arguments with the output path substituted in.
    pub fn arguments(&self, output: &Path) -> Vec<String> {
        let output = output.display().to_string();
        let mut substituted = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                if arg.contains(OUTPUT_PLACEHOLDER) {
                    substituted = true;
                    arg.replace(OUTPUT_PLACEHOLDER, &output)
                } else {
                    arg.clone()
                }
            })
            .collect();
        if !substituted {
            args.push(output);
        }
        args
    }
}

impl MarkupRenderer for CommandRenderer {
    fn name(&self) -> &'static str {
        "command"
    }

    #[instrument(skip_all, fields(chunk = chunk.index, program = %self.program))]
    fn render(&self, chunk: &ChunkDocument<'_>, output: &Path) -> Result<()> {
        let failed = |reason: String| BionicError::Render {
            chunk: chunk.index,
            reason,
        };
        let html = chunk.html();
        let html_bytes = html.len();

        let mut child = Command::new(&self.program)
            .args(self.arguments(output))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| failed(format!("cannot start {}: {err}", self.program)))?;

        let stdin = child.stdin.take();
        // Feed stdin from a second thread so a chatty child cannot fill its
        // stderr pipe while we are still blocked writing.
        let (write_result, wait_result) = thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(html.as_bytes()),
                None => Ok(()),
            });
            let wait_result = child.wait_with_output();
            let write_result = writer
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
            (write_result, wait_result)
        });

        let result = wait_result.map_err(|err| failed(format!("waiting for renderer: {err}")))?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let stderr = stderr.trim();
            let excerpt: String = stderr
                .chars()
                .skip(stderr.chars().count().saturating_sub(STDERR_EXCERPT))
                .collect();
            return Err(failed(format!("{} exited with {}: {excerpt}", self.program, result.status)));
        }
        // A renderer may legitimately stop reading early once it has what it needs.
        if let Err(err) = write_result {
            debug!(%err, "renderer closed stdin early");
        }
        if !output.is_file() {
            return Err(failed(format!("{} produced no output file", self.program)));
        }

        debug!(html_bytes, "Chunk rendered externally");
        Ok(())
    }
}
