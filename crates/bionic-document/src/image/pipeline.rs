// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Parallel image pipeline: normalises every extracted image on a bounded
// rayon pool and collects the results into an id-keyed table. `run` returns
// only once every submitted id has a payload or a recorded failure.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bionic_core::{
    BionicError, Diagnostics, ImageRef, ImageSettings, NormalizedImage, ResolvedImage, Result,
    SourceImage,
};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{info, instrument, warn};

use super::normalize::ImageNormalizer;

/// Write-once mapping from image id to its normalised payload.
///
/// A present key with a `None` value is an image that failed to decode; an
/// absent key is an id the pipeline never saw.
#[derive(Debug, Default, Clone)]
pub struct ImageTable {
    entries: HashMap<ImageRef, ResolvedImage>,
}

impl ImageTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ImageRef) -> Option<&ResolvedImage> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of ids bound to a payload.
    pub fn resolved(&self) -> usize {
        self.entries.values().filter(|v| v.is_some()).count()
    }

    /// Number of ids recorded as failed.
    pub fn failed(&self) -> usize {
        self.entries.values().filter(|v| v.is_none()).count()
    }

    /// Bind `id` to a failed payload if nothing is bound yet, recording why.
    /// Used for images the provider could not extract.
    pub fn record_failure(&mut self, id: ImageRef, err: &BionicError, diagnostics: &mut Diagnostics) {
        if self.entries.contains_key(&id) {
            return;
        }
        diagnostics.record(id.as_str(), err);
        self.entries.insert(id, None);
    }

    fn insert(&mut self, id: ImageRef, image: ResolvedImage) {
        self.entries.entry(id).or_insert(image);
    }
}

/// Normalises images concurrently, bounded by a dedicated worker pool.
pub struct ImagePipeline {
    normalizer: ImageNormalizer,
    pool: ThreadPool,
}

impl ImagePipeline {
    /// Build a pipeline with `workers` threads.
    pub fn new(settings: ImageSettings, workers: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|idx| format!("bionic-image-{idx}"))
            .build()
            .map_err(|err| BionicError::InvalidConfig(format!("image worker pool: {err}")))?;
        Ok(Self {
            normalizer: ImageNormalizer::new(settings),
            pool,
        })
    }

    /// Normalise a single image, mapping failure to a `None` payload.
    pub fn normalize_one(&self, image: &SourceImage) -> (ImageRef, Result<NormalizedImage>) {
        (
            image.id.clone(),
            self.normalizer.normalize(&image.id, &image.bytes),
        )
    }

    /// Normalise every image and wait for all of them.
    ///
    /// Decode failures are recorded in `diagnostics` and bound to `None`.
    /// Duplicate ids are processed once; the first occurrence wins.
    #[instrument(skip_all, fields(images = images.len()))]
    pub fn run(&self, images: Vec<SourceImage>, diagnostics: &mut Diagnostics) -> ImageTable {
        let mut seen = HashSet::new();
        let unique: Vec<SourceImage> = images
            .into_iter()
            .filter(|image| {
                let fresh = seen.insert(image.id.clone());
                if !fresh {
                    warn!(id = %image.id, "duplicate image id ignored");
                }
                fresh
            })
            .collect();

        let results: Vec<(ImageRef, Result<NormalizedImage>)> = self
            .pool
            .install(|| unique.par_iter().map(|image| self.normalize_one(image)).collect());

        let mut table = ImageTable::new();
        for (id, result) in results {
            match result {
                Ok(image) => table.insert(id, Some(Arc::new(image))),
                Err(err) => {
                    diagnostics.record(id.as_str(), &err);
                    table.insert(id, None);
                }
            }
        }

        info!(
            resolved = table.resolved(),
            failed = table.failed(),
            "Images processed"
        );
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::normalize::tests::opaque_png;
    use bionic_core::DiagnosticKind;

    #[test]
    fn every_id_gets_an_entry() {
        let pipeline = ImagePipeline::new(ImageSettings::default(), 4).unwrap();
        let mut images: Vec<SourceImage> = (0..12)
            .map(|i| SourceImage::new(format!("rId{i}"), opaque_png(10 + i, 10)))
            .collect();
        images.push(SourceImage::new("broken", b"\x00\x01\x02".to_vec()));

        let mut diagnostics = Diagnostics::new();
        let table = pipeline.run(images, &mut diagnostics);

        assert_eq!(table.len(), 13);
        assert_eq!(table.resolved(), 12);
        assert_eq!(table.failed(), 1);
        for i in 0..12u32 {
            let image = table
                .get(&ImageRef::new(format!("rId{i}")))
                .unwrap()
                .as_ref()
                .unwrap();
            assert_eq!(image.width, 10 + i);
        }
        assert_eq!(table.get(&ImageRef::new("broken")), Some(&None));
        assert_eq!(table.get(&ImageRef::new("never-seen")), None);
        assert_eq!(diagnostics.count(DiagnosticKind::ImageDecode), 1);
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let pipeline = ImagePipeline::new(ImageSettings::default(), 2).unwrap();
        let images = vec![
            SourceImage::new("rId1", opaque_png(20, 20)),
            SourceImage::new("rId1", b"garbage".to_vec()),
        ];
        let mut diagnostics = Diagnostics::new();
        let table = pipeline.run(images, &mut diagnostics);
        assert_eq!(table.len(), 1);
        assert!(table.get(&ImageRef::new("rId1")).unwrap().is_some());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn provider_failures_do_not_overwrite() {
        let pipeline = ImagePipeline::new(ImageSettings::default(), 1).unwrap();
        let mut diagnostics = Diagnostics::new();
        let mut table = pipeline.run(vec![SourceImage::new("ok", opaque_png(4, 4))], &mut diagnostics);
        let err = BionicError::ImageDecode {
            id: "x".into(),
            reason: "unreadable".into(),
        };
        table.record_failure(ImageRef::new("ok"), &err, &mut diagnostics);
        table.record_failure(ImageRef::new("lost"), &err, &mut diagnostics);

        assert!(table.get(&ImageRef::new("ok")).unwrap().is_some());
        assert_eq!(table.get(&ImageRef::new("lost")), Some(&None));
        assert_eq!(diagnostics.count(DiagnosticKind::ImageDecode), 1);
    }

    #[test]
    fn empty_input_is_fine() {
        let pipeline = ImagePipeline::new(ImageSettings::default(), 1).unwrap();
        let mut diagnostics = Diagnostics::new();
        assert!(pipeline.run(Vec::new(), &mut diagnostics).is_empty());
    }
}
