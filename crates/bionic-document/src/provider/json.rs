// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON content-tree provider.
//
// ```json
// {
//   "blocks": [ { "type": "paragraph", "runs": [ { "text": "Hello", "bold": true } ] } ],
//   "images": { "rId1": { "data": "<base64>" }, "rId2": { "file": "figure.png" } }
// }
// ```
//
// Blocks are deserialised one at a time so a single malformed block does not
// take the rest of the document down with it.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bionic_core::{BionicError, ContentBlock, ImageRef, Result, SourceImage};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument};

use super::{DocumentProvider, SourceDocument};

pub struct JsonProvider;

#[derive(Deserialize)]
#[serde(untagged)]
enum ImageSource {
    Data { data: String },
    /// Relative paths resolve against the JSON file's directory.
    File { file: PathBuf },
}

impl DocumentProvider for JsonProvider {
    fn name(&self) -> &'static str {
        "json"
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    fn load(&self, path: &Path) -> Result<SourceDocument> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| BionicError::Input(format!("{}: {err}", path.display())))?;
        let root: Value = serde_json::from_str(&raw).map_err(|err| {
            BionicError::Input(format!("{} is not valid JSON: {err}", path.display()))
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let document = parse_document(root, base_dir)?;
        info!(
            blocks = document.blocks.len(),
            images = document.images.len(),
            "JSON document loaded"
        );
        Ok(document)
    }
}

/// Split a parsed JSON value into blocks and images.
pub fn parse_document(root: Value, base_dir: &Path) -> Result<SourceDocument> {
    let Value::Object(mut root) = root else {
        return Err(BionicError::Input(
            "content document must be a JSON object".into(),
        ));
    };

    let blocks = match root.remove("blocks") {
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| {
                serde_json::from_value::<ContentBlock>(item)
                    .map_err(|err| BionicError::StructureParse(format!("block {idx}: {err}")))
            })
            .collect(),
        Some(_) => {
            return Err(BionicError::Input("\"blocks\" must be an array".into()));
        }
        None => Vec::new(),
    };

    let mut images = Vec::new();
    let mut image_errors = Vec::new();
    let entries = match root.remove("images") {
        Some(Value::Object(entries)) => entries,
        Some(_) => {
            return Err(BionicError::Input(
                "\"images\" must be an object keyed by image id".into(),
            ));
        }
        None => serde_json::Map::new(),
    };
    for (id, value) in entries {
        let id = ImageRef::new(id);
        match load_image(&id, value, base_dir) {
            Ok(bytes) => images.push(SourceImage { id, bytes }),
            Err(err) => image_errors.push((id, err)),
        }
    }

    Ok(SourceDocument {
        blocks,
        images,
        image_errors,
    })
}

fn load_image(id: &ImageRef, value: Value, base_dir: &Path) -> Result<Vec<u8>> {
    let failure = |reason: String| BionicError::ImageDecode {
        id: id.to_string(),
        reason,
    };
    let source: ImageSource =
        serde_json::from_value(value).map_err(|err| failure(format!("bad image entry: {err}")))?;
    match source {
        ImageSource::Data { data } => STANDARD
            .decode(data.trim())
            .map_err(|err| failure(format!("invalid base64: {err}"))),
        ImageSource::File { file } => {
            let path = if file.is_absolute() {
                file
            } else {
                base_dir.join(file)
            };
            std::fs::read(&path).map_err(|err| failure(format!("{}: {err}", path.display())))
        }
    }
}
