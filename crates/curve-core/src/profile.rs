//! Format profiles: which addressing scheme a document uses, and the key
//! mapping tables that drive the field resolution layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// File format version from which Vectornator geometry is stored in element-local space.
pub const VECTORNATOR_TRANSFORM_THRESHOLD: i64 = 30;
/// File format version from which Curve geometry is stored in element-local space.
pub const CURVE_TRANSFORM_THRESHOLD: i64 = 44;

/// First app release written by Linearity Curve.
pub const CURVE_MIN_VERSION: AppVersion = AppVersion::new(5, 1, 0);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AppVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl AppVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse the leading dotted-numeric part of a version string.
    ///
    /// Accepts `"5.18.4"`, `"5.1"`, `"v4.13.6"` and `"5.2.0-beta (1234)"`.
    /// Returns `None` when no numeric component is present.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim().trim_start_matches(|c: char| c == 'v' || c == 'V');
        let end = trimmed
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(trimmed.len());
        let numeric = trimmed[..end].trim_end_matches('.');
        if numeric.is_empty() {
            return None;
        }

        let mut parts = [0u64; 3];
        for (i, part) in numeric.split('.').enumerate() {
            let value: u64 = part.parse().ok()?;
            if i < parts.len() {
                parts[i] = value;
            }
        }
        Some(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl fmt::Display for AppVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// The application that wrote the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppFamily {
    Vectornator,
    Curve,
}

/// How entities reference their children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Addressing {
    /// Children are embedded in their parent.
    Direct,
    /// Children are integer ids into flat top-level arrays.
    Mapped,
}

/// Where a semantic key lives in mapped documents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyMapping {
    /// Field on the entity holding the id.
    pub id_field: &'static str,
    /// Top-level arrays to index, tried in order.
    pub arrays: &'static [&'static str],
}

const fn map(id_field: &'static str, arrays: &'static [&'static str]) -> KeyMapping {
    KeyMapping { id_field, arrays }
}

/// Key table for Curve documents. Arrays renamed between releases are listed
/// newest first.
pub static CURVE_MAPPING: &[(&str, KeyMapping)] = &[
    ("layers", map("layerIds", &["layers"])),
    ("guideLayer", map("guideLayerId", &["layers"])),
    ("elements", map("elementIds", &["elements"])),
    ("localTransform", map("localTransformId", &["localTransforms"])),
    ("guideLine", map("guideLine", &["guideLines"])),
    ("group", map("group", &["groups"])),
    ("image", map("image", &["images"])),
    ("abstractImage", map("abstractImage", &["abstractImages"])),
    ("imageData", map("abstractImage", &["abstractImages"])),
    ("abstractImageData", map("abstractImage", &["abstractImages"])),
    ("sharedFileImage", map("sharedFileImage", &["imageDatas"])),
    ("imageDataId", map("imageDataId", &["imageDatas"])),
    ("stylable", map("stylable", &["stylables"])),
    ("singleStyle", map("singleStyle", &["singleStyles"])),
    ("abstractPath", map("abstractPath", &["abstractPaths"])),
    ("pathData", map("path", &["paths"])),
    ("compoundPathData", map("compoundPath", &["compoundPaths"])),
    ("geometry", map("geometryId", &["pathGeometries"])),
    ("subpaths", map("subpathIds", &["pathGeometries"])),
    ("text", map("abstractText", &["abstractTexts"])),
    ("textProperty", map("text", &["texts"])),
    ("textPath", map("textPath", &["textPaths"])),
    ("styledText", map("textId", &["styledTexts"])),
    ("fill", map("fillId", &["fills"])),
    ("strokeStyle", map("strokeStyleId", &["pathStrokeStyles", "strokeStyles"])),
    ("textStrokeStyle", map("strokeStyleId", &["textStrokeStyles"])),
    ("brushStroke", map("brushStrokeId", &["brushStrokes"])),
    ("brushProfile", map("brushProfileId", &["brushProfiles"])),
    ("fillTransform", map("fillTransformId", &["fillTransforms"])),
];

/// Addressing and compatibility rules for one (application, file format version) pair.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct FormatProfile {
    pub family: AppFamily,
    pub app_version: Option<AppVersion>,
    pub file_format_version: i64,
    pub addressing: Addressing,
    #[serde(skip)]
    mappings: &'static [(&'static str, KeyMapping)],
}

impl FormatProfile {
    /// Pick the profile for a document. An unparseable app version is treated
    /// as a pre-Curve document.
    pub fn detect(app_version: &str, file_format_version: i64, curve_min: AppVersion) -> Self {
        let parsed = AppVersion::parse(app_version);
        if parsed.is_none() {
            warn!("Invalid version string: {:?}", app_version);
        }
        match parsed {
            Some(v) if v >= curve_min => Self::curve(Some(v), file_format_version),
            _ => Self::vectornator(parsed, file_format_version),
        }
    }

    pub fn vectornator(app_version: Option<AppVersion>, file_format_version: i64) -> Self {
        Self {
            family: AppFamily::Vectornator,
            app_version,
            file_format_version,
            addressing: Addressing::Direct,
            mappings: &[],
        }
    }

    pub fn curve(app_version: Option<AppVersion>, file_format_version: i64) -> Self {
        Self {
            family: AppFamily::Curve,
            app_version,
            file_format_version,
            addressing: Addressing::Mapped,
            mappings: CURVE_MAPPING,
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.addressing == Addressing::Mapped
    }

    pub fn mapping(&self, key: &str) -> Option<&'static KeyMapping> {
        self.mappings
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, mapping)| mapping)
    }

    pub fn transform_threshold(&self) -> i64 {
        match self.family {
            AppFamily::Vectornator => VECTORNATOR_TRANSFORM_THRESHOLD,
            AppFamily::Curve => CURVE_TRANSFORM_THRESHOLD,
        }
    }

    /// True when path geometry is stored untransformed and the renderer must
    /// apply each element's local transform itself.
    pub fn renderer_applies_local_transform(&self) -> bool {
        self.file_format_version >= self.transform_threshold()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_versions() {
        assert_eq!(AppVersion::parse("5.18.4"), Some(AppVersion::new(5, 18, 4)));
        assert_eq!(AppVersion::parse("5.1"), Some(AppVersion::new(5, 1, 0)));
        assert_eq!(AppVersion::parse("v4.13.6"), Some(AppVersion::new(4, 13, 6)));
        assert_eq!(
            AppVersion::parse("5.2.0-beta (1234)"),
            Some(AppVersion::new(5, 2, 0))
        );
        assert_eq!(AppVersion::parse("not a version"), None);
        assert_eq!(AppVersion::parse(""), None);
    }

    #[test]
    fn test_detect_family() {
        let curve = FormatProfile::detect("5.18.4", 44, CURVE_MIN_VERSION);
        assert_eq!(curve.family, AppFamily::Curve);
        assert!(curve.is_mapped());

        let boundary = FormatProfile::detect("5.1.0", 21, CURVE_MIN_VERSION);
        assert_eq!(boundary.family, AppFamily::Curve);

        let vn = FormatProfile::detect("5.0.3", 19, CURVE_MIN_VERSION);
        assert_eq!(vn.family, AppFamily::Vectornator);
        assert_eq!(vn.addressing, Addressing::Direct);
    }

    #[test]
    fn test_invalid_version_is_not_curve() {
        let profile = FormatProfile::detect("garbage", 44, CURVE_MIN_VERSION);
        assert_eq!(profile.family, AppFamily::Vectornator);
        assert_eq!(profile.app_version, None);
    }

    #[test]
    fn test_mapping_lookup() {
        let profile = FormatProfile::curve(None, 44);
        let stroke = profile.mapping("strokeStyle").unwrap();
        assert_eq!(stroke.id_field, "strokeStyleId");
        assert_eq!(stroke.arrays, &["pathStrokeStyles", "strokeStyles"]);
        assert!(profile.mapping("nonexistent").is_none());

        let vn = FormatProfile::vectornator(None, 19);
        assert!(vn.mapping("strokeStyle").is_none());
    }

    #[test]
    fn test_transform_thresholds() {
        assert!(FormatProfile::curve(None, 44).renderer_applies_local_transform());
        assert!(!FormatProfile::curve(None, 21).renderer_applies_local_transform());
        assert!(FormatProfile::vectornator(None, 30).renderer_applies_local_transform());
        assert!(!FormatProfile::vectornator(None, 19).renderer_applies_local_transform());
    }
}
