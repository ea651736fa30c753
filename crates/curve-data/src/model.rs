use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_document_filename() -> String {
    "Document.json".to_string()
}

fn default_one() -> f64 {
    1.0
}

fn default_unit_scale() -> [f64; 2] {
    [1.0, 1.0]
}

// --- Container entries ---

/// `Manifest.json`, the first entry read from every archive.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub file_format_version: i64,
    #[serde(rename = "documentJSONFilename", default = "default_document_filename")]
    pub document_json_filename: String,
}

/// The document entry named by the manifest.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct DocumentJson {
    #[serde(default)]
    pub app_version: Option<String>,
    #[serde(default)]
    pub drawing: Option<Drawing>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Drawing {
    #[serde(default)]
    pub settings: DrawingSettings,
    #[serde(default)]
    pub artboard_paths: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct DrawingSettings {
    #[serde(default)]
    pub units: Option<String>,
}

// --- Artboard / layer ---

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Frame {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

/// Layer attributes. Stored under `properties` in most Vectornator formats and
/// flat on the layer object otherwise.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct LayerProperties {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub opacity: Option<f64>,
    #[serde(default)]
    pub is_visible: Option<bool>,
    #[serde(default)]
    pub is_locked: Option<bool>,
    #[serde(default)]
    pub is_expanded: Option<bool>,
}

// --- Elements ---

/// Fields shared by every element, whatever its sub-element kind.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ElementBase {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub blur: Option<f64>,
    #[serde(default)]
    pub opacity: Option<f64>,
    #[serde(default)]
    pub blend_mode: Option<i64>,
    #[serde(default)]
    pub is_hidden: Option<bool>,
    #[serde(default)]
    pub is_locked: Option<bool>,
}

impl ElementBase {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unnamed Element")
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LocalTransform {
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_unit_scale")]
    pub scale: [f64; 2],
    /// Tangent of the horizontal skew angle.
    #[serde(default)]
    pub shear: f64,
    #[serde(default)]
    pub translation: [f64; 2],
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self {
            rotation: 0.0,
            scale: [1.0, 1.0],
            shear: 0.0,
            translation: [0.0, 0.0],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct GuideLine {
    #[serde(default)]
    pub offset: f64,
    /// 0 = vertical, 1 = horizontal
    #[serde(default)]
    pub orientation: i64,
}

// --- Images ---

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImageData {
    #[serde(default)]
    pub relative_path: Option<String>,
}

// --- Paths ---

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PathNode {
    pub anchor_point: [f64; 2],
    #[serde(default)]
    pub in_point: Option<[f64; 2]>,
    #[serde(default)]
    pub out_point: Option<[f64; 2]>,
    #[serde(default)]
    pub corner_radius: Option<f64>,
    /// `{"disconnected": {}}`, `{"asymmetric": {}}` or `{"symmetric": {}}` in Curve files.
    #[serde(default)]
    pub node_type: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PathData {
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub nodes: Vec<PathNode>,
}

// --- Styles ---

/// Colour payload. Exactly one of the encodings is expected to be present.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ColorData {
    #[serde(default)]
    pub rgba: Option<Rgba>,
    #[serde(default)]
    pub hsba: Option<Hsba>,
    // Legacy short HSB keys.
    #[serde(default)]
    pub h: Option<f64>,
    #[serde(default)]
    pub s: Option<f64>,
    #[serde(default)]
    pub b: Option<f64>,
    #[serde(default)]
    pub a: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    #[serde(default)]
    pub red: f64,
    #[serde(default)]
    pub green: f64,
    #[serde(default)]
    pub blue: f64,
    #[serde(default = "default_one")]
    pub alpha: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Hsba {
    #[serde(default)]
    pub hue: f64,
    #[serde(default)]
    pub saturation: f64,
    #[serde(default)]
    pub brightness: f64,
    #[serde(default = "default_one")]
    pub alpha: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BasicStrokeStyle {
    #[serde(default)]
    pub cap: i64,
    #[serde(default)]
    pub dash_pattern: Option<Vec<f64>>,
    #[serde(default)]
    pub join: i64,
    #[serde(default)]
    pub position: i64,
}

/// Stroke payload. Newer formats nest cap/join/dash under `basicStrokeStyle`,
/// older ones keep them flat next to `color` and `width`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct StrokeStyleData {
    #[serde(default)]
    pub basic_stroke_style: Option<BasicStrokeStyle>,
    #[serde(default)]
    pub cap: Option<i64>,
    #[serde(default)]
    pub dash_pattern: Option<Vec<f64>>,
    #[serde(default)]
    pub join: Option<i64>,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub color: Option<Value>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub start_arrow: Option<ArrowData>,
    #[serde(default)]
    pub end_arrow: Option<ArrowData>,
    /// 1 marks a brush stroke.
    #[serde(default)]
    pub stroke_type: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ArrowData {
    #[serde(default)]
    pub type_raw_value: i64,
    #[serde(default = "default_one")]
    pub scale: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GradientData {
    #[serde(default)]
    pub stops: Vec<GradientStopData>,
    /// 0 = linear, 1 = radial
    #[serde(default)]
    pub type_raw_value: i64,
    #[serde(default)]
    pub transform: Option<FillTransform>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GradientStopData {
    pub color: Value,
    #[serde(default)]
    pub ratio: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FillTransform {
    #[serde(default)]
    pub start: [f64; 2],
    #[serde(default)]
    pub end: [f64; 2],
    #[serde(default)]
    pub transform: Option<Vec<f64>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct BrushProfileData {
    #[serde(default)]
    pub handles: Vec<[f64; 2]>,
    #[serde(default)]
    pub angle: f64,
    #[serde(default = "default_one")]
    pub roundness: f64,
    #[serde(default)]
    pub minimum_width: f64,
    #[serde(default)]
    pub is_pressure_sensitive: bool,
}

// --- Text ---

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct TextProperty {
    /// `{"autoWidth": {}}`, `{"autoHeight": {"width": ..}}` or `{"fixedSize": {"width": .., "height": ..}}`
    #[serde(default)]
    pub text_frame_limits: Option<Value>,
    #[serde(default)]
    pub text_frame_pivot: Option<[f64; 2]>,
}

/// One breakpoint of a range-styled attribute.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RangeValue {
    pub upper_bound: i64,
    pub value: Value,
}
