// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Chunk render/merge orchestrator.
//
// Splits the assembled blocks into fixed-size chunks, renders each chunk on a
// bounded pool of worker threads, and folds the resulting PDFs into the
// destination in chunk order regardless of completion order. The first
// failure stops the job: queued chunks are skipped, in-flight chunks finish,
// every worker is joined, and scratch files are removed before the error is
// returned.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use bionic_core::{BionicError, JobId, Result};
use bionic_document::{ChunkTemplate, RenderBlock};
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, unbounded};
use tracing::{debug, error, info, instrument, warn};

use crate::artifacts::ArtifactArena;
use crate::merge::PdfMerger;
use crate::renderer::{ChunkDocument, MarkupRenderer};

/// Contiguous run of blocks rendered as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderChunk {
    pub index: usize,
    pub blocks: Vec<RenderBlock>,
}

/// A chunk that has been rendered to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub index: usize,
    pub path: PathBuf,
}

/// Lifecycle of one render job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Partitioned { chunks: usize },
    Rendering { chunks: usize },
    Merging { chunks: usize },
    Done { pages: usize },
    Failed { reason: String },
}

/// Outcome of a successful job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSummary {
    pub job: JobId,
    pub chunks: usize,
    pub pages: usize,
    pub output: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Split `blocks` into chunks of at most `chunk_size`, preserving order.
///
/// An empty document still yields one empty chunk so the output has a page.
pub fn partition(blocks: Vec<RenderBlock>, chunk_size: usize) -> Vec<RenderChunk> {
    let chunk_size = chunk_size.max(1);
    if blocks.is_empty() {
        return vec![RenderChunk {
            index: 0,
            blocks: Vec::new(),
        }];
    }
    let mut chunks = Vec::with_capacity(blocks.len().div_ceil(chunk_size));
    let mut blocks = blocks.into_iter().peekable();
    while blocks.peek().is_some() {
        chunks.push(RenderChunk {
            index: chunks.len(),
            blocks: blocks.by_ref().take(chunk_size).collect(),
        });
    }
    chunks
}

pub struct Orchestrator<'r> {
    renderer: &'r dyn MarkupRenderer,
    chunk_size: usize,
    workers: usize,
    scratch_root: Option<PathBuf>,
    job: JobId,
    state: JobState,
}

impl<'r> Orchestrator<'r> {
    pub fn new(renderer: &'r dyn MarkupRenderer, chunk_size: usize, workers: usize) -> Self {
        Self {
            renderer,
            chunk_size: chunk_size.max(1),
            workers: workers.max(1),
            scratch_root: None,
            job: JobId::new(),
            state: JobState::Idle,
        }
    }

    /// Create the scratch arena under `dir` instead of the system temp dir.
    pub fn with_scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(dir.into());
        self
    }

    pub fn job(&self) -> JobId {
        self.job
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    fn transition(&mut self, next: JobState) {
        debug!(job = %self.job, from = ?self.state, to = ?next, "Job state change");
        self.state = next;
    }

    /// Render `blocks` and write the merged PDF to `destination`.
    ///
    /// On error the destination is left untouched and no scratch files remain.
    #[instrument(skip_all, fields(job = %self.job, blocks = blocks.len(), destination = %destination.display()))]
    pub fn run(
        &mut self,
        blocks: Vec<RenderBlock>,
        template: &ChunkTemplate,
        destination: &Path,
    ) -> Result<RenderSummary> {
        let started_at = Utc::now();
        match self.execute(blocks, template, destination) {
            Ok((chunks, pages)) => {
                self.transition(JobState::Done { pages });
                let finished_at = Utc::now();
                info!(
                    chunks,
                    pages,
                    elapsed_ms = (finished_at - started_at).num_milliseconds(),
                    "Render job complete"
                );
                Ok(RenderSummary {
                    job: self.job,
                    chunks,
                    pages,
                    output: destination.to_path_buf(),
                    started_at,
                    finished_at,
                })
            }
            Err(err) => {
                error!(%err, "Render job failed");
                self.transition(JobState::Failed {
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn execute(
        &mut self,
        blocks: Vec<RenderBlock>,
        template: &ChunkTemplate,
        destination: &Path,
    ) -> Result<(usize, usize)> {
        let chunks = partition(blocks, self.chunk_size);
        let count = chunks.len();
        self.transition(JobState::Partitioned { chunks: count });

        // Dropped on every exit path, taking any leftover chunk files with it.
        let arena = match &self.scratch_root {
            Some(root) => ArtifactArena::new_in(root)?,
            None => ArtifactArena::new()?,
        };

        self.transition(JobState::Rendering { chunks: count });
        let mut rendered = self.render_all(&chunks, template, &arena)?;
        drop(chunks);

        self.transition(JobState::Merging { chunks: count });
        rendered.sort_by_key(|chunk| chunk.index);
        let mut merger = PdfMerger::new();
        for chunk in &rendered {
            let pages = merger.append_file(&chunk.path)?;
            debug!(chunk = chunk.index, pages, "Chunk merged");
            arena.release(&chunk.path);
        }
        let pages = merger.finish(destination)?;
        Ok((count, pages))
    }

    /// Render every chunk on the worker pool. Returns in completion order.
    fn render_all(
        &self,
        chunks: &[RenderChunk],
        template: &ChunkTemplate,
        arena: &ArtifactArena,
    ) -> Result<Vec<RenderedPage>> {
        let workers = self.workers.min(chunks.len()).max(1);
        let abort = AtomicBool::new(false);
        let renderer = self.renderer;
        info!(chunks = chunks.len(), workers, renderer = renderer.name(), "Rendering chunks");

        thread::scope(|scope| {
            let (task_tx, task_rx) = bounded::<&RenderChunk>(workers);
            let (result_tx, result_rx) = unbounded::<Result<RenderedPage>>();

            let mut handles = Vec::with_capacity(workers);
            for worker in 0..workers {
                let task_rx = task_rx.clone();
                let result_tx = result_tx.clone();
                let abort = &abort;
                let handle = thread::Builder::new()
                    .name(format!("bionic-render-{worker}"))
                    .spawn_scoped(scope, move || {
                        for chunk in task_rx.iter() {
                            // Drain without rendering once any chunk has failed.
                            if abort.load(Ordering::Acquire) {
                                continue;
                            }
                            let result = render_chunk(renderer, chunk, template, arena);
                            if result.is_err() {
                                abort.store(true, Ordering::Release);
                            }
                            if result_tx.send(result).is_err() {
                                break;
                            }
                        }
                    })?;
                handles.push(handle);
            }
            drop(task_rx);
            drop(result_tx);

            for chunk in chunks {
                if abort.load(Ordering::Acquire) {
                    break;
                }
                if task_tx.send(chunk).is_err() {
                    break;
                }
            }
            drop(task_tx);

            let mut rendered = Vec::with_capacity(chunks.len());
            let mut failure: Option<BionicError> = None;
            for result in result_rx.iter() {
                match result {
                    Ok(chunk) => rendered.push(chunk),
                    Err(err) => {
                        if failure.is_none() {
                            failure = Some(err);
                        } else {
                            warn!(%err, "further chunk failure");
                        }
                    }
                }
            }
            for handle in handles {
                if handle.join().is_err() && failure.is_none() {
                    failure = Some(BionicError::Render {
                        chunk: missing_chunk(chunks, &rendered),
                        reason: "render worker panicked".into(),
                    });
                }
            }

            if let Some(err) = failure {
                return Err(err);
            }
            if rendered.len() != chunks.len() {
                return Err(BionicError::Render {
                    chunk: missing_chunk(chunks, &rendered),
                    reason: "chunk was never rendered".into(),
                });
            }
            Ok(rendered)
        })
    }
}

fn render_chunk(
    renderer: &dyn MarkupRenderer,
    chunk: &RenderChunk,
    template: &ChunkTemplate,
    arena: &ArtifactArena,
) -> Result<RenderedPage> {
    let path = arena.chunk_path(chunk.index);
    let document = ChunkDocument {
        index: chunk.index,
        blocks: &chunk.blocks,
        template,
    };
    // A panicking renderer fails its chunk rather than the process.
    match panic::catch_unwind(AssertUnwindSafe(|| renderer.render(&document, &path))) {
        Ok(Ok(())) => {
            debug!(chunk = chunk.index, "Chunk rendered");
            Ok(RenderedPage {
                index: chunk.index,
                path,
            })
        }
        Ok(Err(err)) => Err(err),
        Err(_) => Err(BionicError::Render {
            chunk: chunk.index,
            reason: "renderer panicked".into(),
        }),
    }
}

fn missing_chunk(chunks: &[RenderChunk], rendered: &[RenderedPage]) -> usize {
    chunks
        .iter()
        .map(|chunk| chunk.index)
        .find(|index| rendered.iter().all(|r| r.index != *index))
        .unwrap_or(0)
}
