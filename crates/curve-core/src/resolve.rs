//! Field resolution: locate the child entity a semantic key refers to, whether it
//! is embedded in its parent, addressed by an id into a flat top-level array, or
//! wrapped in the `subElement` tagged union.

use crate::error::{DecodeError, Result};
use crate::profile::{FormatProfile, KeyMapping};
use serde_json::Value;
use tracing::debug;

/// Payload of a `subElement` variant: `entity.subElement[tag]._0`.
pub fn sub_element<'a>(entity: &'a Value, tag: &str) -> Option<&'a Value> {
    entity
        .get("subElement")?
        .get(tag)?
        .get("_0")
        .filter(|v| !v.is_null())
}

/// Resolves keys against one artboard document.
///
/// The artboard JSON is the arena: mapped ids index into its top-level arrays,
/// and every resolved entity borrows from it.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    root: &'a Value,
    profile: FormatProfile,
}

impl<'a> Resolver<'a> {
    pub fn new(root: &'a Value, profile: FormatProfile) -> Self {
        Self { root, profile }
    }

    pub fn root(&self) -> &'a Value {
        self.root
    }

    pub fn profile(&self) -> &FormatProfile {
        &self.profile
    }

    /// Resolve `key` on `entity`. `Ok(None)` means the feature is absent.
    pub fn get_child(&self, entity: &'a Value, key: &str) -> Result<Option<&'a Value>> {
        let mapping = match self.profile.mapping(key) {
            Some(mapping) if self.profile.is_mapped() => mapping,
            _ => return Ok(Self::direct(entity, key)),
        };

        if let Some(id) = entity.get(mapping.id_field).filter(|v| !v.is_null()) {
            if let Some(found) = self.lookup(mapping, id)? {
                return Ok(Some(found));
            }
        }

        if let Some(id) = sub_element(entity, key) {
            return self.lookup(mapping, id);
        }

        // The sub-element tag is sometimes named after the id field rather than the key.
        if mapping.id_field != key {
            if let Some(id) = sub_element(entity, mapping.id_field) {
                return self.lookup(mapping, id);
            }
        }

        Ok(None)
    }

    /// Resolve `key` to an ordered list of children: an embedded array in direct
    /// mode, a list of ids in mapped mode.
    ///
    /// The outer error covers a malformed list; each entry carries its own result
    /// so one bad id does not hide its siblings.
    pub fn get_children(&self, entity: &'a Value, key: &str) -> Result<Vec<Result<&'a Value>>> {
        let mapping = self.profile.mapping(key).filter(|_| self.profile.is_mapped());

        if let Some(mapping) = mapping {
            if let Some(ids) = entity.get(mapping.id_field).filter(|v| !v.is_null()) {
                let ids = ids.as_array().ok_or_else(|| DecodeError::UnexpectedType {
                    field: mapping.id_field.to_string(),
                    expected: "an array of ids",
                })?;
                return Ok(ids
                    .iter()
                    .filter(|id| !id.is_null())
                    .map(|id| {
                        self.lookup(mapping, id)?.ok_or_else(|| {
                            DecodeError::MissingField(format!("{}[{}]", mapping.arrays[0], id))
                        })
                    })
                    .collect());
            }
        }

        let embedded = entity
            .get(key)
            .filter(|v| !v.is_null())
            .or_else(|| sub_element(entity, key));
        match embedded {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items
                .iter()
                .filter(|item| !item.is_null())
                .map(|item| match mapping {
                    // Mixed documents: an id list stored under the semantic key.
                    Some(mapping) if item.is_number() => {
                        self.lookup(mapping, item)?.ok_or_else(|| {
                            DecodeError::MissingField(format!("{}[{}]", mapping.arrays[0], item))
                        })
                    }
                    _ => Ok(item),
                })
                .collect()),
            Some(_) => Err(DecodeError::UnexpectedType {
                field: key.to_string(),
                expected: "an array",
            }),
        }
    }

    fn direct(entity: &'a Value, key: &str) -> Option<&'a Value> {
        entity
            .get(key)
            .filter(|v| !v.is_null())
            .or_else(|| sub_element(entity, key))
    }

    /// Index `id` into the mapping's arrays, trying each candidate in order.
    fn lookup(&self, mapping: &KeyMapping, id: &'a Value) -> Result<Option<&'a Value>> {
        let index = match id {
            Value::Null => return Ok(None),
            // `{"_0": id}` enum payload wrapping the id.
            Value::Object(map) if map.len() == 1 && map.contains_key("_0") => {
                return self.lookup(mapping, &map["_0"]);
            }
            // Already the entity itself.
            Value::Object(_) => return Ok(Some(id)),
            Value::Number(n) => n.as_i64().ok_or_else(|| DecodeError::UnexpectedType {
                field: mapping.id_field.to_string(),
                expected: "an integer id",
            })?,
            _ => {
                return Err(DecodeError::UnexpectedType {
                    field: mapping.id_field.to_string(),
                    expected: "an integer id",
                })
            }
        };

        let mut out_of_range = None;
        for name in mapping.arrays {
            let Some(array) = self.root.get(*name).and_then(Value::as_array) else {
                continue;
            };
            match usize::try_from(index).ok().and_then(|i| array.get(i)) {
                Some(found) if found.is_null() => return Ok(None),
                Some(found) => return Ok(Some(found)),
                None => {
                    debug!("Id {} not in '{}', trying next candidate", index, name);
                    out_of_range.get_or_insert((*name, array.len()));
                }
            }
        }

        match out_of_range {
            Some((array, len)) => Err(DecodeError::IndexOutOfRange {
                array: array.to_string(),
                index,
                len,
            }),
            None => {
                debug!("None of {:?} present in document", mapping.arrays);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn curve() -> FormatProfile {
        FormatProfile::curve(None, 44)
    }

    fn vectornator() -> FormatProfile {
        FormatProfile::vectornator(None, 19)
    }

    #[test]
    fn test_direct_field() {
        let root = json!({});
        let entity = json!({ "fill": { "color": { "_0": { "rgba": {} } } } });
        let profile = vectornator();
        let r = Resolver::new(&root, profile);
        assert_eq!(r.get_child(&entity, "fill").unwrap(), entity.get("fill"));
    }

    #[test]
    fn test_direct_sub_element() {
        let root = json!({});
        let entity = json!({ "subElement": { "group": { "_0": { "elements": [] } } } });
        let r = Resolver::new(&root, vectornator());
        assert_eq!(
            r.get_child(&entity, "group").unwrap(),
            Some(&json!({ "elements": [] }))
        );
        assert_eq!(r.get_child(&entity, "image").unwrap(), None);
    }

    #[test]
    fn test_mapped_id_field() {
        let root = json!({ "fills": [{ "a": 0 }, { "a": 1 }] });
        let entity = json!({ "fillId": 1 });
        let r = Resolver::new(&root, curve());
        assert_eq!(r.get_child(&entity, "fill").unwrap(), Some(&json!({ "a": 1 })));
    }

    #[test]
    fn test_mapped_null_id_is_absent() {
        let root = json!({ "fills": [{ "a": 0 }] });
        let entity = json!({ "fillId": null });
        let r = Resolver::new(&root, curve());
        assert_eq!(r.get_child(&entity, "fill").unwrap(), None);
    }

    #[test]
    fn test_mapped_sub_element_id() {
        let root = json!({ "groups": [{ "elementIds": [] }] });
        let entity = json!({ "subElement": { "group": { "_0": 0 } } });
        let r = Resolver::new(&root, curve());
        assert_eq!(
            r.get_child(&entity, "group").unwrap(),
            Some(&json!({ "elementIds": [] }))
        );
    }

    #[test]
    fn test_mapped_sub_element_named_after_id_field() {
        // `pathData` maps to id field `path`; the tag on disk is `path`.
        let root = json!({ "paths": [{ "geometryId": 3 }] });
        let entity = json!({ "subElement": { "path": { "_0": 0 } } });
        let r = Resolver::new(&root, curve());
        assert_eq!(
            r.get_child(&entity, "pathData").unwrap(),
            Some(&json!({ "geometryId": 3 }))
        );
    }

    #[test]
    fn test_fallback_array_name() {
        let root = json!({
            "pathStrokeStyles": [],
            "strokeStyles": [{ "width": 2 }]
        });
        let entity = json!({ "strokeStyleId": 0 });
        let r = Resolver::new(&root, curve());
        assert_eq!(
            r.get_child(&entity, "strokeStyle").unwrap(),
            Some(&json!({ "width": 2 }))
        );
    }

    #[test]
    fn test_fallback_when_first_array_missing() {
        let root = json!({ "strokeStyles": [{ "width": 3 }] });
        let entity = json!({ "strokeStyleId": 0 });
        let r = Resolver::new(&root, curve());
        assert_eq!(
            r.get_child(&entity, "strokeStyle").unwrap(),
            Some(&json!({ "width": 3 }))
        );
    }

    #[test]
    fn test_out_of_range_is_error() {
        let root = json!({ "fills": [{}] });
        let entity = json!({ "fillId": 5 });
        let r = Resolver::new(&root, curve());
        let err = r.get_child(&entity, "fill").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::IndexOutOfRange { index: 5, len: 1, .. }
        ));
    }

    #[test]
    fn test_wrong_id_type_is_error() {
        let root = json!({ "fills": [{}] });
        let entity = json!({ "fillId": "zero" });
        let r = Resolver::new(&root, curve());
        assert!(matches!(
            r.get_child(&entity, "fill"),
            Err(DecodeError::UnexpectedType { .. })
        ));
    }

    #[test]
    fn test_children_mapped() {
        let root = json!({ "elements": [{ "name": "a" }, { "name": "b" }] });
        let layer = json!({ "elementIds": [1, 0, 9] });
        let r = Resolver::new(&root, curve());
        let children = r.get_children(&layer, "elements").unwrap();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].as_ref().unwrap()["name"], "b");
        assert_eq!(children[1].as_ref().unwrap()["name"], "a");
        assert!(children[2].is_err());
    }

    #[test]
    fn test_children_direct() {
        let root = json!({});
        let layer = json!({ "elements": [{ "name": "a" }, null, { "name": "b" }] });
        let r = Resolver::new(&root, vectornator());
        let children = r.get_children(&layer, "elements").unwrap();
        assert_eq!(children.len(), 2);
        assert!(r.get_children(&json!({}), "elements").unwrap().is_empty());
        assert!(r.get_children(&json!({ "elements": 3 }), "elements").is_err());
    }

    #[test]
    fn test_wrapped_id() {
        let root = json!({ "imageDatas": [{ "relativePath": "a.dat" }, { "relativePath": "b.dat" }] });
        let data = json!({ "sharedFileImage": { "_0": 1 } });
        let r = Resolver::new(&root, curve());
        assert_eq!(
            r.get_child(&data, "sharedFileImage").unwrap(),
            Some(&json!({ "relativePath": "b.dat" }))
        );
    }

    #[test]
    fn test_unmapped_key_in_mapped_mode_is_direct() {
        let root = json!({});
        let entity = json!({ "imageData": { "relativePath": "a.dat" }, "cropRect": [[0, 0], [1, 1]] });
        let r = Resolver::new(&root, curve());
        assert!(r.get_child(&entity, "cropRect").unwrap().is_some());
    }
}
