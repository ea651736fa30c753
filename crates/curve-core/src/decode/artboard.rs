use super::{non_null, parse, ArtboardDecoder};
use crate::error::Result;
use crate::model::{Artboard, Element, Frame, Layer};
use curve_data::model::LayerProperties;
use serde_json::Value;
use tracing::{debug, instrument};

impl<'a> ArtboardDecoder<'a> {
    #[instrument(level = "debug", skip_all)]
    pub fn decode(mut self, artboard: &'a Value) -> Result<Artboard> {
        let title = artboard
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("Untitled")
            .to_string();
        let frame: Frame = match non_null(artboard, "frame") {
            Some(frame) => parse(frame, "artboard frame")?,
            None => Frame::default(),
        };

        let mut layers = Vec::new();
        for raw in self.children(artboard, "layers", &title)? {
            match self.layer(raw) {
                Ok(layer) => layers.push(layer),
                Err(e) => self
                    .diagnostics
                    .error(Some(&title), format!("Skipping layer: {}", e)),
            }
        }

        let guides = match self.guides(artboard, &title) {
            Ok(guides) => guides,
            Err(e) => {
                self.diagnostics
                    .warn(Some(&title), format!("Guides ignored: {}", e));
                Vec::new()
            }
        };

        let background = match self.fill(artboard, artboard, &title) {
            Ok(fill) => fill,
            Err(e) => {
                self.diagnostics
                    .warn(Some(&title), format!("Background ignored: {}", e));
                None
            }
        };

        debug!(
            "Artboard '{}': {} layers, {} guides",
            title,
            layers.len(),
            guides.len()
        );

        Ok(Artboard {
            title,
            frame,
            layers,
            background,
            guides,
            diagnostics: self.diagnostics.into_vec(),
        })
    }

    fn layer(&mut self, raw: &'a Value) -> Result<Layer> {
        // Format 7 and mapped documents keep the properties on the layer itself.
        let properties = raw
            .get("properties")
            .filter(|p| p.is_object())
            .unwrap_or(raw);
        let properties: LayerProperties = parse(properties, "layer properties")?;
        let name = properties.name.unwrap_or_else(|| "Layer".to_string());

        let elements = self
            .children(raw, "elements", &name)?
            .into_iter()
            .map(|element| self.element(element, 0))
            .collect();

        Ok(Layer {
            opacity: properties.opacity.unwrap_or(1.0),
            visible: properties.is_visible.unwrap_or(true),
            locked: properties.is_locked.unwrap_or(false),
            expanded: properties.is_expanded.unwrap_or(false),
            name,
            elements,
        })
    }

    fn guides(&mut self, artboard: &'a Value, title: &str) -> Result<Vec<Element>> {
        let Some(guide_layer) = self.child(artboard, "guideLayer")? else {
            return Ok(Vec::new());
        };
        Ok(self
            .children(guide_layer, "elements", title)?
            .into_iter()
            .map(|guide| self.element(guide, 0))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;
    use crate::model::{ElementKind, Fill, GuideOrientation};
    use crate::options::DecodeOptions;
    use crate::profile::FormatProfile;
    use serde_json::json;

    fn decode(root: &Value, profile: FormatProfile) -> Artboard {
        let archive = MemoryArchive::new();
        let options = DecodeOptions::default();
        ArtboardDecoder::new(root, profile, &archive, &options)
            .decode(root)
            .unwrap()
    }

    #[test]
    fn test_vectornator_artboard_defaults() {
        let root = json!({
            "frame": { "x": 0, "y": 0, "width": 100, "height": 50 },
            "layers": [
                { "properties": { "name": "Background", "opacity": 0.5, "isVisible": false }, "elements": [] },
                null,
                { "name": "Flat", "elements": [] }
            ]
        });
        let artboard = decode(&root, FormatProfile::vectornator(None, 19));
        assert_eq!(artboard.title, "Untitled");
        assert_eq!(artboard.frame.height, 50.0);
        assert_eq!(artboard.layers.len(), 2);

        let background = &artboard.layers[0];
        assert_eq!(background.name, "Background");
        assert_eq!(background.opacity, 0.5);
        assert!(!background.visible);
        assert!(!background.locked);

        let flat = &artboard.layers[1];
        assert_eq!(flat.name, "Flat");
        assert_eq!(flat.opacity, 1.0);
        assert!(flat.visible);
        assert!(artboard.guides.is_empty());
        assert!(artboard.background.is_none());
    }

    #[test]
    fn test_direct_guides_and_background() {
        let root = json!({
            "title": "Guides",
            "layers": [],
            "guideLayer": {
                "elements": [
                    { "name": "G", "subElement": { "guideLine": { "_0": { "offset": 12.5, "orientation": 1 } } } }
                ]
            },
            "fillColor": { "rgba": { "red": 1, "green": 1, "blue": 1, "alpha": 1 } }
        });
        let artboard = decode(&root, FormatProfile::vectornator(None, 13));
        assert_eq!(artboard.guides.len(), 1);
        match &artboard.guides[0].kind {
            ElementKind::Guide(guide) => {
                assert_eq!(guide.offset, 12.5);
                assert_eq!(guide.orientation, GuideOrientation::Horizontal);
            }
            other => panic!("expected guide, got {:?}", other),
        }
        match artboard.background {
            Some(Fill::Solid(ref color)) => assert_eq!(color.hex, "#FFFFFF"),
            ref other => panic!("expected solid background, got {:?}", other),
        }
    }

    #[test]
    fn test_mapped_layers_and_guide_layer() {
        let root = json!({
            "artboards": [{ "title": "A", "layerIds": [0], "guideLayerId": 1 }],
            "layers": [
                { "name": "Main", "opacity": 1, "isVisible": true, "isLocked": true, "isExpanded": true, "elementIds": [] },
                { "name": "Guides", "elementIds": [0] }
            ],
            "elements": [
                { "name": "Guide", "localTransformId": null, "subElement": { "guideLine": { "_0": 0 } } }
            ],
            "guideLines": [{ "offset": 4, "orientation": 0 }]
        });
        let archive = MemoryArchive::new();
        let options = DecodeOptions::default();
        let artboard =
            ArtboardDecoder::new(&root, FormatProfile::curve(None, 44), &archive, &options)
                .decode(&root["artboards"][0])
                .unwrap();

        assert_eq!(artboard.title, "A");
        assert_eq!(artboard.layers.len(), 1);
        assert!(artboard.layers[0].locked);
        assert!(artboard.layers[0].expanded);
        assert_eq!(artboard.guides.len(), 1);
        assert_eq!(artboard.guides[0].name, "Guide");
    }

    #[test]
    fn test_unresolvable_layer_is_reported() {
        let root = json!({
            "artboards": [{ "title": "A", "layerIds": [3] }],
            "layers": []
        });
        let archive = MemoryArchive::new();
        let options = DecodeOptions::default();
        let artboard =
            ArtboardDecoder::new(&root, FormatProfile::curve(None, 44), &archive, &options)
                .decode(&root["artboards"][0])
                .unwrap();
        assert!(artboard.layers.is_empty());
        assert_eq!(artboard.diagnostics.len(), 1);
        assert_eq!(artboard.diagnostics[0].element.as_deref(), Some("A"));
    }
}
