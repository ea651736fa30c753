//! Decoder for Vectornator and Linearity Curve documents.
//!
//! [`read_document`] walks a container through [`ArchiveAccessor`]: the manifest,
//! the document entry it names, then every artboard entry. The result is a
//! version-independent [`Document`] whose problems are collected as
//! [`Diagnostic`]s instead of aborting the decode.

pub mod archive;
pub mod color;
pub mod decode;
pub mod diagnostics;
pub mod error;
pub mod keyed_archive;
pub mod model;
pub mod options;
pub mod profile;
pub mod resolve;
pub mod text;
pub mod varint;

pub use archive::{ArchiveAccessor, MemoryArchive, ZipArchiveReader};
pub use color::Color;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{DecodeError, Result};
pub use model::*;
pub use options::DecodeOptions;
pub use profile::{AppFamily, AppVersion, FormatProfile};

use curve_data::model::{DocumentJson, Manifest};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, instrument};

pub const MANIFEST_ENTRY: &str = "Manifest.json";

/// Decode a whole document.
///
/// Fails only when the container itself is unusable: no manifest, no drawing,
/// or no artboards. An artboard entry that cannot be decoded is recorded as an
/// error diagnostic on the document and skipped.
#[instrument(level = "debug", skip_all)]
pub fn read_document(archive: &dyn ArchiveAccessor, options: &DecodeOptions) -> Result<Document> {
    let manifest = Manifest::deserialize(&archive.read_json(MANIFEST_ENTRY)?)?;
    let document = DocumentJson::deserialize(&archive.read_json(&manifest.document_json_filename)?)?;
    let drawing = document.drawing.ok_or(DecodeError::MissingDrawingData)?;
    if drawing.artboard_paths.is_empty() {
        return Err(DecodeError::NoArtboards);
    }

    let app_version = document.app_version.unwrap_or_default();
    let profile = FormatProfile::detect(
        &app_version,
        manifest.file_format_version,
        options.curve_min_version,
    );
    info!(
        "Reading {:?} document, app version {:?}, format {}",
        profile.family, app_version, manifest.file_format_version
    );

    let mut diagnostics = Diagnostics::new();
    if profile.app_version.is_none() {
        diagnostics.warn(
            None,
            format!("Unreadable app version {:?}, assuming Vectornator", app_version),
        );
    }

    let decode_entry = |path: &String| -> Result<Vec<Artboard>> {
        debug!("Decoding artboard entry {}", path);
        let root = archive.read_json(path)?;
        decode::decode_artboards(&root, path, profile, archive, options)
    };

    #[cfg(feature = "parallel")]
    let results: Vec<Result<Vec<Artboard>>> = if options.parallel_artboards {
        use rayon::prelude::*;
        drawing.artboard_paths.par_iter().map(decode_entry).collect()
    } else {
        drawing.artboard_paths.iter().map(decode_entry).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let results: Vec<Result<Vec<Artboard>>> =
        drawing.artboard_paths.iter().map(decode_entry).collect();

    let mut artboards = Vec::new();
    for (path, result) in drawing.artboard_paths.iter().zip(results) {
        match result {
            Ok(decoded) => artboards.extend(decoded),
            Err(e) => diagnostics.error(Some(path.as_str()), format!("Artboard skipped: {}", e)),
        }
    }

    Ok(Document {
        units: drawing.settings.units,
        app_version,
        profile,
        artboards,
        diagnostics: diagnostics.into_vec(),
    })
}

/// Open a `.curve` or `.vectornator` file and decode it.
pub fn open_document(path: impl AsRef<Path>, options: &DecodeOptions) -> Result<Document> {
    let archive = ZipArchiveReader::open(path)?;
    read_document(&archive, options)
}
