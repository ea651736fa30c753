use crate::color::Color;
use crate::diagnostics::Diagnostic;
use crate::profile::FormatProfile;
pub use curve_data::model::{Frame, LocalTransform};
use kurbo::{Affine, BezPath, Point};
use serde::Serialize;
use serde_json::Value;

/// A fully decoded document.
#[derive(Clone, Debug, Serialize)]
pub struct Document {
    pub units: Option<String>,
    pub app_version: String,
    pub profile: FormatProfile,
    pub artboards: Vec<Artboard>,
    /// Artboards that failed to decode, and other document-level problems.
    pub diagnostics: Vec<Diagnostic>,
}

impl Document {
    /// Every diagnostic, document-level first.
    pub fn all_diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .chain(self.artboards.iter().flat_map(|a| a.diagnostics.iter()))
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Artboard {
    pub title: String,
    pub frame: Frame,
    pub layers: Vec<Layer>,
    pub background: Option<Fill>,
    pub guides: Vec<Element>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Layer {
    pub name: String,
    pub opacity: f64,
    pub visible: bool,
    pub locked: bool,
    pub expanded: bool,
    /// Paint order, bottom first.
    pub elements: Vec<Element>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Element {
    pub name: String,
    pub blur: f64,
    pub opacity: f64,
    pub blend_mode: BlendMode,
    pub hidden: bool,
    pub locked: bool,
    pub local_transform: Option<LocalTransform>,
    pub kind: ElementKind,
}

impl Element {
    pub fn is_base(&self) -> bool {
        matches!(self.kind, ElementKind::Base)
    }

    pub fn as_path(&self) -> Option<&PathElement> {
        match &self.kind {
            ElementKind::Path(path) => Some(path),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextElement> {
        match &self.kind {
            ElementKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Element] {
        match &self.kind {
            ElementKind::Group { children } => children,
            _ => &[],
        }
    }

    /// Local transform as an affine map, identity when absent.
    pub fn transform(&self) -> Affine {
        self.local_transform
            .as_ref()
            .map(local_transform_affine)
            .unwrap_or(Affine::IDENTITY)
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementKind {
    Group { children: Vec<Element> },
    Image(ImageElement),
    Path(PathElement),
    Text(TextElement),
    Guide(GuideElement),
    /// Unknown or undecodable element; only the common fields are meaningful.
    Base,
}

impl ElementKind {
    pub fn label(&self) -> &'static str {
        match self {
            ElementKind::Group { .. } => "group",
            ElementKind::Image(_) => "image",
            ElementKind::Path(_) => "path",
            ElementKind::Text(_) => "text",
            ElementKind::Guide(_) => "guide",
            ElementKind::Base => "base",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    SoftLight,
    HardLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
    Unknown(i64),
}

impl BlendMode {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => BlendMode::Normal,
            1 => BlendMode::Multiply,
            2 => BlendMode::Screen,
            3 => BlendMode::Overlay,
            4 => BlendMode::Darken,
            5 => BlendMode::Lighten,
            6 => BlendMode::ColorDodge,
            7 => BlendMode::ColorBurn,
            8 => BlendMode::SoftLight,
            9 => BlendMode::HardLight,
            10 => BlendMode::Difference,
            11 => BlendMode::Exclusion,
            12 => BlendMode::Hue,
            13 => BlendMode::Saturation,
            14 => BlendMode::Color,
            15 => BlendMode::Luminosity,
            other => BlendMode::Unknown(other),
        }
    }
}

/// Translate, rotate, scale, then skew along x by `atan(shear)`.
pub fn local_transform_affine(t: &LocalTransform) -> Affine {
    Affine::translate((t.translation[0], t.translation[1]))
        * Affine::rotate(t.rotation)
        * Affine::scale_non_uniform(t.scale[0], t.scale[1])
        * Affine::skew(t.shear, 0.0)
}

// --- Images ---

#[derive(Clone, Debug, Serialize)]
pub struct ImageElement {
    /// Base64 bitmap payload; empty when image embedding is disabled.
    pub data: String,
    pub relative_path: Option<String>,
    /// Legacy `[a, b, c, d, tx, ty]` matrix overriding the local transform.
    pub transform: Option<[f64; 6]>,
    /// Two corner points.
    pub crop_rect: Option<[[f64; 2]; 2]>,
}

// --- Paths ---

#[derive(Clone, Debug, Serialize)]
pub struct PathElement {
    pub mask: bool,
    pub fill: Option<Fill>,
    pub stroke: Option<StrokeStyle>,
    pub brush: Option<BrushProfile>,
    /// One entry per subpath; more than one only for compound paths.
    pub geometries: Vec<PathGeometry>,
    pub shape: Option<ShapeDescription>,
}

/// Parametric shape the path was drawn from, e.g. `"rectangle"`.
#[derive(Clone, Debug, Serialize)]
pub struct ShapeDescription {
    pub kind: String,
    pub params: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PathGeometry {
    pub closed: bool,
    pub nodes: Vec<PathNode>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PathNode {
    pub anchor: [f64; 2],
    pub in_point: [f64; 2],
    pub out_point: [f64; 2],
    pub corner_radius: Option<f64>,
    pub node_type: NodeType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// Sharp corner; handles move independently.
    Disconnected,
    /// Smooth, handles colinear with independent lengths.
    Asymmetric,
    /// Smooth, handles mirrored.
    Symmetric,
}

impl NodeType {
    pub fn is_sharp(self) -> bool {
        self == NodeType::Disconnected
    }
}

fn point(p: [f64; 2]) -> Point {
    Point::new(p[0], p[1])
}

impl PathGeometry {
    /// Renderer-ready outline. A segment whose handles sit on its endpoints is a
    /// line, anything else a cubic; closed geometry wraps back to the first node.
    pub fn to_bez_path(&self) -> BezPath {
        let mut bp = BezPath::new();
        let Some(first) = self.nodes.first() else {
            return bp;
        };
        bp.move_to(point(first.anchor));

        let wrap = if self.closed { Some(first) } else { None };
        let mut prev = first;
        for node in self.nodes.iter().skip(1).chain(wrap) {
            if prev.out_point == prev.anchor && node.in_point == node.anchor {
                bp.line_to(point(node.anchor));
            } else {
                bp.curve_to(
                    point(prev.out_point),
                    point(node.in_point),
                    point(node.anchor),
                );
            }
            prev = node;
        }

        if self.closed {
            bp.close_path();
        }
        bp
    }

    /// Corner radii of sharp nodes, in node order.
    pub fn corner_radii(&self) -> Vec<f64> {
        self.nodes
            .iter()
            .filter(|n| n.node_type.is_sharp())
            .filter_map(|n| n.corner_radius)
            .collect()
    }
}

// --- Styles ---

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Fill {
    Solid(Color),
    Gradient(Gradient),
}

impl Fill {
    pub fn as_color(&self) -> Option<&Color> {
        match self {
            Fill::Solid(color) => Some(color),
            Fill::Gradient(_) => None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Gradient {
    pub kind: GradientKind,
    /// Sorted by ratio.
    pub stops: Vec<GradientStop>,
    pub transform: Option<GradientTransform>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientKind {
    Linear,
    Radial,
}

#[derive(Clone, Debug, Serialize)]
pub struct GradientStop {
    pub color: Color,
    pub ratio: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientTransform {
    /// Start and end points in element space.
    Points { start: [f64; 2], end: [f64; 2] },
    /// Start and end points mapped through a matrix (oldest encoding).
    Matrix {
        start: [f64; 2],
        end: [f64; 2],
        matrix: [f64; 6],
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct StrokeStyle {
    pub cap: LineCap,
    pub join: LineJoin,
    pub position: StrokePosition,
    /// Trailing zeros trimmed; `[0]` for a solid stroke.
    pub dash_pattern: Vec<f64>,
    pub color: Color,
    pub width: f64,
    pub start_arrow: Option<Arrow>,
    pub end_arrow: Option<Arrow>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineCap {
    Butt,
    Round,
    Square,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineJoin {
    Miter,
    Round,
    Bevel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokePosition {
    Inside,
    Center,
    Outside,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Arrow {
    pub kind: i64,
    pub scale: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BrushProfile {
    pub handles: Vec<[f64; 2]>,
    pub angle: f64,
    pub roundness: f64,
    pub minimum_width: f64,
    pub pressure_sensitive: bool,
}

// --- Text ---

#[derive(Clone, Debug, Serialize)]
pub struct TextElement {
    pub string: String,
    pub transform: Option<[f64; 6]>,
    pub frame: TextFrame,
    pub runs: Vec<StyledTextRun>,
}

impl TextElement {
    /// Length in UTF-16 code units, the unit run lengths are counted in.
    pub fn len(&self) -> usize {
        self.string.encode_utf16().count()
    }

    pub fn is_empty(&self) -> bool {
        self.string.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TextFrame {
    pub limits: TextFrameLimits,
    pub pivot: [f64; 2],
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFrameLimits {
    #[default]
    AutoWidth,
    AutoHeight {
        width: Option<f64>,
    },
    FixedSize {
        width: f64,
        height: f64,
    },
}

/// Unified alignment codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlignment {
    Left,
    Right,
    Center,
    Justified,
    Natural,
}

impl TextAlignment {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(TextAlignment::Left),
            1 => Some(TextAlignment::Right),
            2 => Some(TextAlignment::Center),
            3 => Some(TextAlignment::Justified),
            4 => Some(TextAlignment::Natural),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineHeight {
    Multiple(f64),
    Fixed(f64),
    AtLeast(f64),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TextStroke {
    pub color: Color,
    pub width: f64,
}

/// One run of uniformly styled text. `None` leaves the attribute to the renderer's default.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StyledTextRun {
    pub length: usize,
    pub font_name: Option<String>,
    pub font_size: Option<f64>,
    pub alignment: Option<TextAlignment>,
    pub kerning: Option<f64>,
    pub line_height: Option<LineHeight>,
    pub fill_color: Option<Color>,
    pub stroke: Option<TextStroke>,
    pub strikethrough: bool,
    pub underline: bool,
}

// --- Guides ---

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GuideElement {
    pub offset: f64,
    pub orientation: GuideOrientation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuideOrientation {
    Vertical,
    Horizontal,
}
