use super::{non_null, parse, truthy, ArtboardDecoder};
use crate::error::Result;
use crate::model::{NodeType, PathElement, PathGeometry, PathNode, ShapeDescription};
use crate::resolve::sub_element;
use curve_data::model::{PathData, PathNode as RawPathNode};
use serde_json::Value;

const NODE_EPSILON: f64 = 1e-6;

impl<'a> ArtboardDecoder<'a> {
    /// Decode a path-bearing stylable. `abstract_path` is the `abstractPath`
    /// payload, or the `singleStyle` wrapper that stands in for it.
    pub(crate) fn path(
        &mut self,
        stylable: &'a Value,
        abstract_path: &'a Value,
        name: &str,
    ) -> Result<PathElement> {
        let mask = truthy(stylable.get("mask"));
        if mask {
            self.diagnostics
                .warn(Some(name), "Clipping masks are not supported");
        }

        let stroke_raw = match self.child(abstract_path, "strokeStyle")? {
            Some(stroke) => Some(stroke),
            None => self.child(stylable, "strokeStyle")?,
        };
        let stroke = stroke_raw.map(|raw| self.stroke(raw, name)).transpose()?;

        let brush = match stroke_raw {
            Some(raw) if raw.get("strokeType").and_then(Value::as_i64) == Some(1) => {
                self.brush(raw, &[abstract_path, stylable], name)?
            }
            _ => None,
        };

        let fill = match self.fill(abstract_path, stylable, name)? {
            Some(fill) => Some(fill),
            None if !std::ptr::eq(abstract_path, stylable) => {
                self.fill(stylable, stylable, name)?
            }
            None => None,
        };

        let mut geometries = Vec::new();
        let mut shape = None;

        if let Some(path_data) = self.child(abstract_path, "pathData")? {
            geometries.push(self.geometry(path_data)?);
            shape = shape_description(path_data);
        }

        if let Some(compound) = self.child(abstract_path, "compoundPathData")? {
            for subpath in self.children(compound, "subpaths", name)? {
                let subpath = match nested_subpath(subpath) {
                    Some(path_data) => {
                        self.diagnostics.warn(
                            Some(name),
                            "Subpath wrapped in its own stylable, using its nested path data",
                        );
                        path_data
                    }
                    None => subpath,
                };
                geometries.push(self.geometry(subpath)?);
            }
        }

        if geometries.is_empty() {
            self.diagnostics.warn(Some(name), "Path has no geometry");
        }

        Ok(PathElement {
            mask,
            fill,
            stroke,
            brush,
            geometries,
            shape: shape.or_else(|| shape_description(abstract_path)),
        })
    }

    /// Node list of a path payload. Geometry sits behind `geometry` in mapped
    /// and single-style documents, on the payload itself otherwise.
    fn geometry(&self, path_data: &'a Value) -> Result<PathGeometry> {
        let geometry = self.child(path_data, "geometry")?.unwrap_or(path_data);
        let data: PathData = parse(geometry, "path geometry")?;
        Ok(PathGeometry {
            closed: data.closed,
            nodes: data.nodes.iter().map(path_node).collect(),
        })
    }
}

/// Format 16 wraps every subpath in a stylable of its own.
fn nested_subpath(subpath: &Value) -> Option<&Value> {
    let stylable = sub_element(subpath, "stylable")?;
    let abstract_path = sub_element(stylable, "abstractPath")?;
    sub_element(abstract_path, "pathData")
}

fn shape_description(holder: &Value) -> Option<ShapeDescription> {
    let kind = non_null(holder, "shapeDescription")?.as_str()?.to_string();
    Some(ShapeDescription {
        kind,
        params: non_null(holder, "inputParams").cloned(),
    })
}

fn path_node(raw: &RawPathNode) -> PathNode {
    let anchor = raw.anchor_point;
    let in_point = raw.in_point.unwrap_or(anchor);
    let out_point = raw.out_point.unwrap_or(anchor);
    let node_type = raw
        .node_type
        .as_ref()
        .and_then(node_type_tag)
        .unwrap_or_else(|| infer_node_type(anchor, in_point, out_point));

    PathNode {
        anchor,
        in_point,
        out_point,
        corner_radius: raw.corner_radius,
        node_type,
    }
}

/// `{"symmetric": {}}` in Curve files, a bare string in some exports.
fn node_type_tag(value: &Value) -> Option<NodeType> {
    let tag = match value {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map.keys().next()?.as_str(),
        _ => return None,
    };
    match tag {
        "disconnected" => Some(NodeType::Disconnected),
        "asymmetric" => Some(NodeType::Asymmetric),
        "symmetric" => Some(NodeType::Symmetric),
        _ => None,
    }
}

fn infer_node_type(anchor: [f64; 2], in_point: [f64; 2], out_point: [f64; 2]) -> NodeType {
    let a = [in_point[0] - anchor[0], in_point[1] - anchor[1]];
    let b = [out_point[0] - anchor[0], out_point[1] - anchor[1]];
    let is_zero = |v: [f64; 2]| v[0].abs() < NODE_EPSILON && v[1].abs() < NODE_EPSILON;
    if is_zero(a) || is_zero(b) {
        return NodeType::Disconnected;
    }
    if (a[0] + b[0]).abs() < NODE_EPSILON && (a[1] + b[1]).abs() < NODE_EPSILON {
        return NodeType::Symmetric;
    }
    let cross = a[0] * b[1] - a[1] * b[0];
    let dot = a[0] * b[0] + a[1] * b[1];
    let scale = a[0].hypot(a[1]) * b[0].hypot(b[1]);
    if cross.abs() <= NODE_EPSILON * scale && dot < 0.0 {
        NodeType::Asymmetric
    } else {
        NodeType::Disconnected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;
    use crate::error::DecodeError;
    use crate::model::Fill;
    use crate::options::DecodeOptions;
    use crate::profile::FormatProfile;
    use serde_json::json;

    fn square() -> Value {
        json!({
            "closed": true,
            "nodes": [
                { "anchorPoint": [0, 0], "inPoint": [0, 0], "outPoint": [0, 0], "cornerRadius": 0 },
                { "anchorPoint": [10, 0] },
                { "anchorPoint": [10, 10] },
                { "anchorPoint": [0, 10] }
            ]
        })
    }

    #[test]
    fn test_node_type_inference() {
        assert_eq!(infer_node_type([0.0, 0.0], [0.0, 0.0], [0.0, 0.0]), NodeType::Disconnected);
        assert_eq!(infer_node_type([0.0, 0.0], [-1.0, 0.0], [1.0, 0.0]), NodeType::Symmetric);
        assert_eq!(infer_node_type([0.0, 0.0], [-1.0, 0.0], [3.0, 0.0]), NodeType::Asymmetric);
        assert_eq!(infer_node_type([0.0, 0.0], [-1.0, 0.0], [0.0, 3.0]), NodeType::Disconnected);
    }

    #[test]
    fn test_node_type_tags() {
        assert_eq!(node_type_tag(&json!({ "symmetric": {} })), Some(NodeType::Symmetric));
        assert_eq!(node_type_tag(&json!("asymmetric")), Some(NodeType::Asymmetric));
        assert_eq!(node_type_tag(&json!({ "other": {} })), None);
        assert_eq!(node_type_tag(&json!(3)), None);
    }

    #[test]
    fn test_direct_path_with_stylable_stroke_and_fill() {
        let stylable = json!({
            "mask": 0,
            "strokeStyle": {
                "cap": 0, "join": 0, "position": 0, "dashPattern": [],
                "color": { "rgba": { "red": 0, "green": 0, "blue": 0, "alpha": 1 } },
                "width": 3
            },
            "fillColor": { "rgba": { "red": 0, "green": 1, "blue": 0, "alpha": 1 } },
            "subElement": { "abstractPath": { "_0": {
                "subElement": { "pathData": { "_0": square() } }
            } } }
        });
        let abstract_path = &stylable["subElement"]["abstractPath"]["_0"];
        let (root, archive, options) = (json!({}), MemoryArchive::new(), DecodeOptions::default());
        let mut d = ArtboardDecoder::new(&root, FormatProfile::vectornator(None, 13), &archive, &options);

        let path = d.path(&stylable, abstract_path, "Square").unwrap();
        assert!(!path.mask);
        assert_eq!(path.stroke.unwrap().width, 3.0);
        assert_eq!(path.fill.unwrap().as_color().unwrap().hex, "#00FF00");
        assert_eq!(path.geometries.len(), 1);
        let geometry = &path.geometries[0];
        assert!(geometry.closed);
        assert_eq!(geometry.nodes.len(), 4);
        assert_eq!(geometry.nodes[1].in_point, [10.0, 0.0]);
        assert_eq!(geometry.nodes[1].node_type, NodeType::Disconnected);
        assert!(d.diagnostics.is_empty());
    }

    #[test]
    fn test_single_style_geometry_and_fill() {
        let stylable = json!({
            "fillTransform": { "start": [0, 0], "end": [1, 0] },
            "subElement": { "singleStyle": { "_0": {
                "fill": { "gradient": { "_0": { "typeRawValue": 0, "stops": [] } } },
                "subElement": { "pathData": { "_0": { "geometry": square() } } }
            } } }
        });
        let single_style = &stylable["subElement"]["singleStyle"]["_0"];
        let (root, archive, options) = (json!({}), MemoryArchive::new(), DecodeOptions::default());
        let mut d = ArtboardDecoder::new(&root, FormatProfile::vectornator(None, 19), &archive, &options);

        let path = d.path(&stylable, single_style, "S").unwrap();
        assert!(matches!(path.fill, Some(Fill::Gradient(_))));
        assert_eq!(path.geometries[0].nodes.len(), 4);
        assert!(d.diagnostics.is_empty());
    }

    #[test]
    fn test_mapped_compound_path_with_brush() {
        let root = json!({
            "abstractPaths": [{
                "strokeStyleId": 0,
                "fillId": 0,
                "subElement": { "compoundPath": { "_0": 0 } }
            }],
            "compoundPaths": [{ "subpathIds": [0, 1] }],
            "pathGeometries": [
                square(),
                { "closed": false, "nodes": [
                    { "anchorPoint": [0, 0], "inPoint": [-1, 0], "outPoint": [1, 0], "nodeType": { "symmetric": {} } }
                ] }
            ],
            "pathStrokeStyles": [{
                "basicStrokeStyle": { "cap": 0, "join": 0, "position": 0, "dashPattern": [] },
                "color": { "rgba": { "red": 0, "green": 0, "blue": 0, "alpha": 1 } },
                "width": 1,
                "strokeType": 1,
                "brushStrokeId": 0
            }],
            "brushStrokes": [{ "brushProfileId": 0 }],
            "brushProfiles": [{ "handles": [[0, 0.5]], "angle": 0 }],
            "fills": [{ "color": { "_0": { "rgba": { "red": 0, "green": 0, "blue": 1, "alpha": 1 } } } }]
        });
        let stylable = json!({ "subElement": { "abstractPath": { "_0": 0 } } });
        let (archive, options) = (MemoryArchive::new(), DecodeOptions::default());
        let mut d = ArtboardDecoder::new(&root, FormatProfile::curve(None, 44), &archive, &options);

        let abstract_path = &root["abstractPaths"][0];
        let path = d.path(&stylable, abstract_path, "Compound").unwrap();
        assert_eq!(path.geometries.len(), 2);
        assert_eq!(path.geometries[1].nodes[0].node_type, NodeType::Symmetric);
        assert_eq!(path.brush.unwrap().handles, vec![[0.0, 0.5]]);
        assert_eq!(path.fill.unwrap().as_color().unwrap().hex, "#0000FF");
    }

    #[test]
    fn test_nested_subpaths() {
        let stylable = json!({
            "subElement": { "abstractPath": { "_0": {
                "subElement": { "compoundPathData": { "_0": { "subpaths": [
                    { "subElement": { "stylable": { "_0": { "subElement": { "abstractPath": { "_0": {
                        "subElement": { "pathData": { "_0": square() } }
                    } } } } } } },
                    square()
                ] } } }
            } } }
        });
        let abstract_path = &stylable["subElement"]["abstractPath"]["_0"];
        let (root, archive, options) = (json!({}), MemoryArchive::new(), DecodeOptions::default());
        let mut d = ArtboardDecoder::new(&root, FormatProfile::vectornator(None, 16), &archive, &options);

        let path = d.path(&stylable, abstract_path, "Nested").unwrap();
        assert_eq!(path.geometries.len(), 2);
        assert_eq!(path.geometries[0], path.geometries[1]);
        assert_eq!(d.diagnostics.len(), 1);
        assert_eq!(
            d.diagnostics.iter().next().unwrap().element.as_deref(),
            Some("Nested")
        );
    }

    #[test]
    fn test_shape_description_and_mask_warning() {
        let stylable = json!({
            "mask": 1,
            "subElement": { "abstractPath": { "_0": {
                "subElement": { "pathData": { "_0": {
                    "closed": true,
                    "nodes": [],
                    "shapeDescription": "rectangle",
                    "inputParams": { "cornerRadius": 4 }
                } } }
            } } }
        });
        let abstract_path = &stylable["subElement"]["abstractPath"]["_0"];
        let (root, archive, options) = (json!({}), MemoryArchive::new(), DecodeOptions::default());
        let mut d = ArtboardDecoder::new(&root, FormatProfile::vectornator(None, 30), &archive, &options);

        let path = d.path(&stylable, abstract_path, "Rect").unwrap();
        assert!(path.mask);
        let shape = path.shape.unwrap();
        assert_eq!(shape.kind, "rectangle");
        assert_eq!(shape.params, Some(json!({ "cornerRadius": 4 })));
        assert_eq!(d.diagnostics.len(), 1);
    }

    #[test]
    fn test_bad_stroke_fails_the_path() {
        let stylable = json!({
            "strokeStyle": { "width": 1 },
            "subElement": { "abstractPath": { "_0": {} } }
        });
        let abstract_path = &stylable["subElement"]["abstractPath"]["_0"];
        let (root, archive, options) = (json!({}), MemoryArchive::new(), DecodeOptions::default());
        let mut d = ArtboardDecoder::new(&root, FormatProfile::vectornator(None, 13), &archive, &options);
        assert!(matches!(
            d.path(&stylable, abstract_path, "P"),
            Err(DecodeError::MissingField(_))
        ));
    }
}
