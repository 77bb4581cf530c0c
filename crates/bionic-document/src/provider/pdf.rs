// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF provider: recovers paragraphs and embedded images from an existing PDF
// using `lopdf`. Styling and layout are not recoverable; every paragraph is
// plain left-aligned text.

use std::io::Cursor;
use std::path::Path;

use bionic_core::{
    BionicError, ContentBlock, ImageBlock, ImageRef, Paragraph, Result, Run, SourceImage,
};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info, instrument, warn};

use super::{DocumentProvider, SourceDocument};

/// How far up the page tree to look for inherited `/Resources`.
const MAX_TREE_DEPTH: usize = 32;

pub struct PdfProvider;

impl DocumentProvider for PdfProvider {
    fn name(&self) -> &'static str {
        "pdf"
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    fn load(&self, path: &Path) -> Result<SourceDocument> {
        let document = Document::load(path).map_err(|err| {
            BionicError::Input(format!("failed to open {}: {err}", path.display()))
        })?;
        let source = read_document(&document);
        info!(
            pages = document.get_pages().len(),
            blocks = source.blocks.len(),
            images = source.images.len(),
            "PDF document loaded"
        );
        Ok(source)
    }
}

/// Walk every page in order: its text paragraphs first, then its images.
pub fn read_document(document: &Document) -> SourceDocument {
    let mut source = SourceDocument::default();

    for (page_number, page_id) in document.get_pages() {
        match document.extract_text(&[page_number]) {
            Ok(text) => {
                for paragraph in split_paragraphs(&text) {
                    source.blocks.push(Ok(ContentBlock::Paragraph(paragraph)));
                }
            }
            Err(err) => source.blocks.push(Err(BionicError::StructureParse(format!(
                "page {page_number}: {err}"
            )))),
        }

        for (name, object_id) in page_images(document, page_id) {
            let id = ImageRef::new(format!("p{page_number}-{name}-{}", object_id.0));
            source.blocks.push(Ok(ContentBlock::Image(ImageBlock {
                image: id.clone(),
                position: None,
            })));
            match image_bytes(document, object_id) {
                Ok(bytes) => source.images.push(SourceImage {
                    id: id.clone(),
                    bytes,
                }),
                Err(reason) => source.image_errors.push((
                    id.clone(),
                    BionicError::ImageDecode {
                        id: id.to_string(),
                        reason,
                    },
                )),
            }
        }
        debug!(page_number, "Page read");
    }

    source
}

/// Group lines into paragraphs at blank lines. Each line becomes a run, with
/// a hard break between consecutive lines of the same paragraph.
pub fn split_paragraphs(text: &str) -> Vec<Paragraph> {
    let mut paragraphs = Vec::new();
    let mut lines: Vec<&str> = Vec::new();

    let mut flush = |lines: &mut Vec<&str>| {
        if lines.is_empty() {
            return;
        }
        let last = lines.len() - 1;
        let runs = lines
            .drain(..)
            .enumerate()
            .map(|(idx, line)| Run {
                line_break: idx != last,
                ..Run::text(line)
            })
            .collect();
        paragraphs.push(Paragraph::new(runs));
    };

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            flush(&mut lines);
        } else {
            lines.push(line);
        }
    }
    flush(&mut lines);
    paragraphs
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

fn resolve_dict<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    resolve(document, object).and_then(|o| o.as_dict().ok())
}

/// The page's `/Resources`, inherited from an ancestor if the page has none.
fn page_resources(document: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = document.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            return resolve_dict(document, resources);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = document.get_dictionary(parent).ok()?;
    }
    None
}

/// Image XObjects on a page, as (resource name, object id) in name order.
fn page_images(document: &Document, page_id: ObjectId) -> Vec<(String, ObjectId)> {
    let Some(xobjects) = page_resources(document, page_id)
        .and_then(|resources| resources.get(b"XObject").ok())
        .and_then(|xobjects| resolve_dict(document, xobjects))
    else {
        return Vec::new();
    };

    let mut images: Vec<(String, ObjectId)> = xobjects
        .iter()
        .filter_map(|(name, value)| {
            let id = value.as_reference().ok()?;
            let stream = document.get_object(id).ok()?.as_stream().ok()?;
            let subtype = stream.dict.get(b"Subtype").ok()?.as_name().ok()?;
            (subtype == b"Image").then(|| (String::from_utf8_lossy(name).into_owned(), id))
        })
        .collect();
    images.sort();
    images
}

fn filters(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

/// Encoded bytes for one image XObject, in a format the normaliser decodes.
///
/// JPEG streams pass through untouched. Uncompressed or Flate-compressed 8-bit
/// RGB and grey samples are repacked as PNG.
fn image_bytes(document: &Document, object_id: ObjectId) -> std::result::Result<Vec<u8>, String> {
    let stream = document
        .get_object(object_id)
        .and_then(Object::as_stream)
        .map_err(|err| format!("unreadable image object: {err}"))?;

    let filters = filters(&stream.dict);
    if filters.last().is_some_and(|f| f == b"DCTDecode") {
        if filters.len() == 1 {
            return Ok(stream.content.clone());
        }
        return Err("chained filters before DCTDecode are not supported".into());
    }
    if filters.iter().any(|f| f != b"FlateDecode") {
        let names: Vec<String> = filters
            .iter()
            .map(|f| String::from_utf8_lossy(f).into_owned())
            .collect();
        return Err(format!("unsupported image filter {}", names.join(", ")));
    }

    let int = |key: &[u8]| stream.dict.get(key).and_then(Object::as_i64).ok();
    let (Some(width), Some(height)) = (int(b"Width"), int(b"Height")) else {
        return Err("image without dimensions".into());
    };
    if int(b"BitsPerComponent").unwrap_or(8) != 8 {
        return Err("only 8-bit samples are supported".into());
    }
    let width = u32::try_from(width).map_err(|_| "negative width".to_string())?;
    let height = u32::try_from(height).map_err(|_| "negative height".to_string())?;

    let colour_space = stream
        .dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|cs| resolve(document, cs))
        .and_then(|cs| cs.as_name().ok())
        .unwrap_or(&b"DeviceRGB"[..]);

    let samples = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream
            .decompressed_content()
            .map_err(|err| format!("cannot inflate image stream: {err}"))?
    };

    let image = match colour_space {
        b"DeviceRGB" => RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8),
        b"DeviceGray" => GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8),
        other => {
            return Err(format!(
                "unsupported colour space {}",
                String::from_utf8_lossy(other)
            ));
        }
    }
    .ok_or_else(|| "sample data shorter than width x height".to_string())?;

    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).map_err(|err| {
        warn!(%err, "PNG repack failed");
        format!("cannot repack samples: {err}")
    })?;
    Ok(out.into_inner())
}
