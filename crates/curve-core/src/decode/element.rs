use super::{parse, ArtboardDecoder};
use crate::error::{DecodeError, Result};
use crate::model::{BlendMode, Element, ElementKind, GuideElement, GuideOrientation};
use curve_data::model::{ElementBase, GuideLine, LocalTransform};
use serde::Deserialize;
use serde_json::Value;
use std::ptr;
use tracing::debug;

impl<'a> ArtboardDecoder<'a> {
    /// Decode one element. Never fails: an element that cannot be decoded keeps
    /// its common fields and becomes [`ElementKind::Base`].
    pub(crate) fn element(&mut self, raw: &'a Value, depth: usize) -> Element {
        let base = match ElementBase::deserialize(raw) {
            Ok(base) => base,
            Err(e) => {
                self.diagnostics
                    .warn(None, format!("Element fields unreadable, using defaults: {}", e));
                ElementBase::default()
            }
        };
        let name = base.name().to_string();

        let local_transform = match self.local_transform(raw) {
            Ok(transform) => transform,
            Err(e) => {
                self.diagnostics
                    .warn(Some(&name), format!("Local transform ignored: {}", e));
                None
            }
        };

        let kind = match self.element_kind(raw, &name, depth) {
            Ok(kind) => kind,
            Err(e) => {
                self.diagnostics
                    .error(Some(&name), format!("Decoded as a plain element: {}", e));
                ElementKind::Base
            }
        };
        debug!("Element '{}' decoded as {}", name, kind.label());

        Element {
            name,
            blur: base.blur.unwrap_or(0.0),
            opacity: base.opacity.unwrap_or(1.0),
            blend_mode: BlendMode::from_code(base.blend_mode.unwrap_or(0)),
            hidden: base.is_hidden.unwrap_or(false),
            locked: base.is_locked.unwrap_or(false),
            local_transform,
            kind,
        }
    }

    fn local_transform(&self, raw: &'a Value) -> Result<Option<LocalTransform>> {
        self.child(raw, "localTransform")?
            .map(|t| parse(t, "local transform"))
            .transpose()
    }

    /// Classify by the first sub-element tag that resolves.
    fn element_kind(&mut self, raw: &'a Value, name: &str, depth: usize) -> Result<ElementKind> {
        if let Some(guide) = self.child(raw, "guideLine")? {
            return Ok(ElementKind::Guide(self.guide(guide, name)?));
        }
        if let Some(group) = self.child(raw, "group")? {
            return self.group(group, name, depth);
        }
        if let Some(image) = self.child(raw, "image")? {
            return Ok(ElementKind::Image(self.image(image, name)?));
        }
        if let Some(image) = self.child(raw, "abstractImage")? {
            return Ok(ElementKind::Image(self.image(image, name)?));
        }
        if let Some(stylable) = self.child(raw, "stylable")? {
            return self.stylable(stylable, name);
        }
        Ok(ElementKind::Base)
    }

    fn stylable(&mut self, stylable: &'a Value, name: &str) -> Result<ElementKind> {
        if let Some(single_style) = self.child(stylable, "singleStyle")? {
            return Ok(ElementKind::Path(self.path(stylable, single_style, name)?));
        }
        if let Some(abstract_path) = self.child(stylable, "abstractPath")? {
            return Ok(ElementKind::Path(self.path(stylable, abstract_path, name)?));
        }
        if let Some(text) = self.child(stylable, "text")? {
            return Ok(ElementKind::Text(self.text(text, name)?));
        }
        self.diagnostics
            .warn(Some(name), "Styled element has neither path nor text");
        Ok(ElementKind::Base)
    }

    fn guide(&mut self, raw: &Value, name: &str) -> Result<GuideElement> {
        let guide: GuideLine = parse(raw, "guide line")?;
        let orientation = match guide.orientation {
            0 => GuideOrientation::Vertical,
            1 => GuideOrientation::Horizontal,
            other => {
                self.diagnostics.warn(
                    Some(name),
                    format!("Unknown guide orientation {}, using vertical", other),
                );
                GuideOrientation::Vertical
            }
        };
        Ok(GuideElement {
            offset: guide.offset,
            orientation,
        })
    }

    fn group(&mut self, group: &'a Value, name: &str, depth: usize) -> Result<ElementKind> {
        if depth >= self.options.max_group_depth {
            return Err(DecodeError::GroupDepthExceeded(self.options.max_group_depth));
        }
        if self.group_stack.iter().any(|g| ptr::eq(*g, group)) {
            return Err(DecodeError::GroupCycle(name.to_string()));
        }

        let raws = self.children(group, "elements", name)?;
        self.group_stack.push(group);
        let children = raws
            .into_iter()
            .map(|child| self.element(child, depth + 1))
            .collect();
        self.group_stack.pop();

        Ok(ElementKind::Group { children })
    }
}
