//! Entity decoders.
//!
//! An [`ArtboardDecoder`] owns the state for one artboard: the resolver over the
//! artboard's JSON, the archive for bitmap payloads, the options, and the
//! diagnostics collected on the way. Each entity kind has its own file; they all
//! extend the same `impl` so the resolver and diagnostics stay in one place.

mod artboard;
mod element;
mod image;
mod path;
mod style;
mod text;

use crate::archive::ArchiveAccessor;
use crate::diagnostics::Diagnostics;
use crate::error::{DecodeError, Result};
use crate::model::Artboard;
use crate::options::DecodeOptions;
use crate::profile::FormatProfile;
use crate::resolve::Resolver;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

pub struct ArtboardDecoder<'a> {
    resolver: Resolver<'a>,
    archive: &'a dyn ArchiveAccessor,
    options: &'a DecodeOptions,
    diagnostics: Diagnostics,
    /// Groups currently being expanded, outermost first.
    group_stack: Vec<&'a Value>,
}

impl<'a> ArtboardDecoder<'a> {
    /// `root` is the whole artboard entry: the artboard itself in direct
    /// documents, the object holding the flat arrays in mapped ones.
    pub fn new(
        root: &'a Value,
        profile: FormatProfile,
        archive: &'a dyn ArchiveAccessor,
        options: &'a DecodeOptions,
    ) -> Self {
        Self {
            resolver: Resolver::new(root, profile),
            archive,
            options,
            diagnostics: Diagnostics::new(),
            group_stack: Vec::new(),
        }
    }

    pub fn profile(&self) -> &FormatProfile {
        self.resolver.profile()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn child(&self, entity: &'a Value, key: &str) -> Result<Option<&'a Value>> {
        self.resolver.get_child(entity, key)
    }

    /// Resolvable children of `entity`. Children whose id does not resolve are
    /// reported against `owner` and skipped.
    fn children(&mut self, entity: &'a Value, key: &str, owner: &str) -> Result<Vec<&'a Value>> {
        let mut found = Vec::new();
        for child in self.resolver.get_children(entity, key)? {
            match child {
                Ok(value) => found.push(value),
                Err(e) => self
                    .diagnostics
                    .error(Some(owner), format!("Skipping unresolvable entry in '{}': {}", key, e)),
            }
        }
        debug!("Resolved {} '{}' of {}", found.len(), key, owner);
        Ok(found)
    }
}

/// Decode every artboard held by one artboard entry.
///
/// Mapped documents keep their artboards in an `artboards` array next to the
/// flat entity arrays; in direct documents the entry is the artboard.
pub fn decode_artboards(
    root: &Value,
    entry: &str,
    profile: FormatProfile,
    archive: &dyn ArchiveAccessor,
    options: &DecodeOptions,
) -> Result<Vec<Artboard>> {
    if !profile.is_mapped() {
        return ArtboardDecoder::new(root, profile, archive, options)
            .decode(root)
            .map(|artboard| vec![artboard]);
    }

    let entries = root
        .get("artboards")
        .and_then(Value::as_array)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| DecodeError::MissingArtboard(entry.to_string()))?;

    entries
        .iter()
        .filter(|a| !a.is_null())
        .map(|artboard| ArtboardDecoder::new(root, profile, archive, options).decode(artboard))
        .collect()
}

/// Deserialize a leaf payload into its `curve-data` struct.
fn parse<T: DeserializeOwned>(value: &Value, what: &str) -> Result<T> {
    T::deserialize(value).map_err(|source| DecodeError::Malformed {
        what: what.to_string(),
        source,
    })
}

fn non_null<'v>(entity: &'v Value, key: &str) -> Option<&'v Value> {
    entity.get(key).filter(|v| !v.is_null())
}

/// C-style truth value: booleans, or numbers other than zero.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

/// A `[a, b, c, d, tx, ty]` matrix.
fn matrix(value: &Value, field: &str) -> Result<[f64; 6]> {
    let unexpected = || DecodeError::UnexpectedType {
        field: field.to_string(),
        expected: "six numbers",
    };
    let items = value.as_array().ok_or_else(unexpected)?;
    let numbers: Vec<f64> = items.iter().filter_map(Value::as_f64).collect();
    numbers
        .try_into()
        .map_err(|_: Vec<f64>| unexpected())
}
