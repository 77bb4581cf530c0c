// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF merger: folds rendered chunk PDFs into one document with `lopdf`, then
// writes it atomically so a failed job never leaves a partial file behind.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use bionic_core::{BionicError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITED: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

fn merge_error(context: &str, err: impl std::fmt::Display) -> BionicError {
    BionicError::Merge(format!("{context}: {err}"))
}

/// Accumulates pages from successive PDFs, in the order they are appended.
pub struct PdfMerger {
    target: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl Default for PdfMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfMerger {
    pub fn new() -> Self {
        let mut target = Document::with_version("1.5");
        let pages_id = target.new_object_id();
        let catalog_id = target.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        target.trailer.set("Root", catalog_id);
        Self {
            target,
            pages_id,
            kids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append every page of the PDF at `path`. Returns the number of pages added.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn append_file(&mut self, path: &Path) -> Result<usize> {
        let source = Document::load(path)
            .map_err(|err| merge_error(&format!("failed to load {}", path.display()), err))?;
        self.append(&source)
    }

    /// Append every page of `source`, in page order.
    pub fn append(&mut self, source: &Document) -> Result<usize> {
        let pages = source.get_pages();
        // One memo per source document so shared fonts and images are copied once.
        let mut memo = HashMap::new();
        for page_id in pages.values() {
            let cloned = self.clone_page(source, *page_id, &mut memo)?;
            self.kids.push(Object::Reference(cloned));
        }
        debug!(pages = pages.len(), total = self.kids.len(), "Pages appended");
        Ok(pages.len())
    }

    fn clone_page(
        &mut self,
        source: &Document,
        page_id: ObjectId,
        memo: &mut HashMap<ObjectId, ObjectId>,
    ) -> Result<ObjectId> {
        let page = source
            .get_dictionary(page_id)
            .map_err(|err| merge_error(&format!("cannot read page {page_id:?}"), err))?;

        let mut cloned = Dictionary::new();
        for (key, value) in page.iter() {
            // /Parent is re-pointed at the merged page tree below.
            if key == b"Parent" {
                continue;
            }
            cloned.set(key.clone(), deep_clone(source, &mut self.target, value, memo));
        }
        for key in INHERITED {
            if cloned.has(key) {
                continue;
            }
            if let Some(value) = inherited_attribute(source, page, key) {
                cloned.set(key.to_vec(), deep_clone(source, &mut self.target, value, memo));
            }
        }
        cloned.set("Parent", Object::Reference(self.pages_id));

        let new_id = self.target.add_object(cloned);
        memo.insert(page_id, new_id);
        Ok(new_id)
    }

    /// Finalise the page tree and write the document to `destination`.
    ///
    /// The bytes go to a temporary file beside the destination, which is then
    /// renamed over it; readers never observe a half-written file.
    #[instrument(skip(self), fields(destination = %destination.display(), pages = self.kids.len()))]
    pub fn finish(mut self, destination: &Path) -> Result<usize> {
        if self.kids.is_empty() {
            return Err(BionicError::Merge("no pages to merge".into()));
        }
        let page_count = self.kids.len();
        self.target.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => std::mem::take(&mut self.kids),
                "Count" => page_count as i64,
            }),
        );

        let mut bytes = Vec::new();
        self.target
            .save_to(&mut bytes)
            .map_err(|err| merge_error("failed to serialise merged PDF", err))?;

        let parent = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut staged = NamedTempFile::new_in(parent)
            .map_err(|err| merge_error(&format!("cannot stage output in {}", parent.display()), err))?;
        staged
            .write_all(&bytes)
            .and_then(|()| staged.as_file().sync_all())
            .map_err(|err| merge_error("failed to write merged PDF", err))?;
        staged
            .persist(destination)
            .map_err(|err| merge_error(&format!("cannot move output to {}", destination.display()), err.error))?;

        info!(pages = page_count, bytes = bytes.len(), "Merged PDF written");
        Ok(page_count)
    }
}

/// Look `key` up on the page's ancestors.
fn inherited_attribute<'a>(source: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut node = page;
    // Page trees are shallow; the bound only guards against /Parent cycles.
    for _ in 0..64 {
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = source.get_dictionary(parent).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
    }
    None
}

/// Deep-clone `object` from `source` into `target`.
///
/// Indirect objects are copied once per source document via `memo`, which
/// also makes reference cycles terminate. /Parent keys are dropped: the only
/// parents in a chunk are page-tree nodes, which are rebuilt.
fn deep_clone(
    source: &Document,
    target: &mut Document,
    object: &Object,
    memo: &mut HashMap<ObjectId, ObjectId>,
) -> Object {
    match object {
        Object::Dictionary(dict) => Object::Dictionary(clone_dictionary(source, target, dict, memo)),
        Object::Array(items) => Object::Array(
            items
                .iter()
                .map(|item| deep_clone(source, target, item, memo))
                .collect(),
        ),
        Object::Stream(stream) => {
            let dict = clone_dictionary(source, target, &stream.dict, memo);
            Object::Stream(lopdf::Stream::new(dict, stream.content.clone()))
        }
        Object::Reference(ref_id) => {
            if let Some(existing) = memo.get(ref_id) {
                return Object::Reference(*existing);
            }
            match source.get_object(*ref_id) {
                Ok(referenced) => {
                    // Reserve the id before recursing so cycles resolve to it.
                    let new_id = target.new_object_id();
                    memo.insert(*ref_id, new_id);
                    let cloned = deep_clone(source, target, referenced, memo);
                    target.objects.insert(new_id, cloned);
                    Object::Reference(new_id)
                }
                Err(err) => {
                    warn!(?ref_id, %err, "Cannot resolve reference, using Null");
                    Object::Null
                }
            }
        }
        other => other.clone(),
    }
}

fn clone_dictionary(
    source: &Document,
    target: &mut Document,
    dict: &Dictionary,
    memo: &mut HashMap<ObjectId, ObjectId>,
) -> Dictionary {
    let mut cloned = Dictionary::new();
    for (key, value) in dict.iter() {
        if key == b"Parent" {
            continue;
        }
        cloned.set(key.clone(), deep_clone(source, target, value, memo));
    }
    cloned
}
