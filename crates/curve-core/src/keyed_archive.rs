//! Decoder for `NSKeyedArchiver` graphs, the binary property-list archives older
//! documents use for attributed text.
//!
//! The archive is a flat object table (`$objects`) plus a `$top` dictionary whose
//! values reference table entries by UID. Decoding substitutes every reference
//! with a copy of the object it points to and collapses the Foundation container
//! classes into plain lists, maps, strings and bytes.

use crate::error::{DecodeError, Result};
use crate::varint::decode_varint;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z, the `NSDate` reference date.
pub const APPLE_REFERENCE_EPOCH: f64 = 978_307_200.0;

/// Plain value tree produced by unarchiving.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArchiveValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    String(String),
    Data(Vec<u8>),
    Date(SystemTime),
    Array(Vec<ArchiveValue>),
    Dictionary(BTreeMap<String, ArchiveValue>),
}

impl ArchiveValue {
    pub fn get(&self, key: &str) -> Option<&ArchiveValue> {
        match self {
            ArchiveValue::Dictionary(map) => map.get(key).filter(|v| !v.is_null()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ArchiveValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArchiveValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArchiveValue::Real(f) => Some(*f),
            ArchiveValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ArchiveValue::Integer(i) => Some(*i),
            ArchiveValue::Real(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Booleans, and integers as C truth values.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArchiveValue::Bool(b) => Some(*b),
            ArchiveValue::Integer(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ArchiveValue::Data(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ArchiveValue]> {
        match self {
            ArchiveValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<String, ArchiveValue>> {
        match self {
            ArchiveValue::Dictionary(map) => Some(map),
            _ => None,
        }
    }
}

/// One entry of an attributed string's run table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AttributeRun {
    pub length: u64,
    pub attribute_id: u64,
}

/// Decode an `NSAttributeInfo` blob: successive `(length, attribute id)` varint
/// pairs. Stops at the end of the buffer or at a truncated pair.
pub fn decode_attribute_info(data: &[u8]) -> Vec<AttributeRun> {
    let mut runs = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        let Some((length, next)) = decode_varint(data, offset) else {
            break;
        };
        let Some((attribute_id, next)) = decode_varint(data, next) else {
            break;
        };
        runs.push(AttributeRun {
            length,
            attribute_id,
        });
        offset = next;
    }
    runs
}

/// Parse and unarchive a binary or XML property list.
pub fn unarchive_bytes(bytes: &[u8], max_depth: usize, max_nodes: usize) -> Result<ArchiveValue> {
    let plist = plist::Value::from_reader(Cursor::new(bytes))?;
    unarchive(&plist, max_depth, max_nodes)
}

/// Unarchive an already parsed property list.
///
/// `max_depth` bounds nesting and `max_nodes` the total number of values
/// visited, which also covers objects referenced from many places.
///
/// A single `root` entry under `$top` is unwrapped, and an `NSAttributeInfo`
/// blob on the result is expanded into a list of `{length, attribute_id}` maps.
pub fn unarchive(plist: &plist::Value, max_depth: usize, max_nodes: usize) -> Result<ArchiveValue> {
    let mut budget = max_nodes;
    unarchive_within(plist, max_depth, max_nodes, &mut budget)
}

fn unarchive_within(
    plist: &plist::Value,
    max_depth: usize,
    max_nodes: usize,
    budget: &mut usize,
) -> Result<ArchiveValue> {
    let archive = plist
        .as_dictionary()
        .ok_or_else(|| DecodeError::KeyedArchive("top level is not a dictionary".into()))?;
    let top = archive
        .get("$top")
        .ok_or_else(|| DecodeError::KeyedArchive("missing $top".into()))?;
    let objects = archive
        .get("$objects")
        .and_then(plist::Value::as_array)
        .ok_or_else(|| DecodeError::KeyedArchive("missing $objects".into()))?;

    let mut unarchiver = Unarchiver {
        objects,
        max_depth,
        max_nodes,
        budget,
        stack: Vec::new(),
    };
    let mut value = unarchiver.resolve(top, 0)?;

    if let ArchiveValue::Dictionary(map) = &mut value {
        if map.len() == 1 && map.contains_key("root") {
            if let Some(root) = map.remove("root") {
                value = root;
            }
        }
    }

    if let ArchiveValue::Dictionary(map) = &mut value {
        if let Some(ArchiveValue::Data(info)) = map.get("NSAttributeInfo") {
            let runs = decode_attribute_info(info)
                .into_iter()
                .map(|run| {
                    ArchiveValue::Dictionary(BTreeMap::from([
                        ("length".to_string(), ArchiveValue::Integer(run.length as i64)),
                        (
                            "attribute_id".to_string(),
                            ArchiveValue::Integer(run.attribute_id as i64),
                        ),
                    ]))
                })
                .collect();
            map.insert("NSAttributeInfo".to_string(), ArchiveValue::Array(runs));
        }
    }

    Ok(value)
}

struct Unarchiver<'a> {
    objects: &'a [plist::Value],
    max_depth: usize,
    max_nodes: usize,
    /// Values still allowed to be visited, shared with nested archives.
    budget: &'a mut usize,
    /// Object-table indices currently being expanded.
    stack: Vec<u64>,
}

impl<'a> Unarchiver<'a> {
    fn resolve(&mut self, value: &plist::Value, depth: usize) -> Result<ArchiveValue> {
        if depth > self.max_depth {
            return Err(DecodeError::UnarchiveDepthExceeded(self.max_depth));
        }
        if *self.budget == 0 {
            return Err(DecodeError::UnarchiveNodesExceeded(self.max_nodes));
        }
        *self.budget -= 1;

        match value {
            plist::Value::Uid(uid) => self.resolve_uid(uid.get(), depth),
            plist::Value::Dictionary(dict) => {
                let mut map = BTreeMap::new();
                for (key, item) in dict.iter() {
                    map.insert(key.clone(), self.resolve(item, depth + 1)?);
                }
                Ok(collapse_class(map))
            }
            plist::Value::Array(items) => items
                .iter()
                .map(|item| self.resolve(item, depth + 1))
                .collect::<Result<Vec<_>>>()
                .map(ArchiveValue::Array),
            plist::Value::Data(bytes) => self.resolve_data(bytes, depth),
            plist::Value::String(s) => Ok(ArchiveValue::String(s.clone())),
            plist::Value::Boolean(b) => Ok(ArchiveValue::Bool(*b)),
            plist::Value::Real(f) => Ok(ArchiveValue::Real(*f)),
            plist::Value::Integer(i) => Ok(i
                .as_signed()
                .map(ArchiveValue::Integer)
                .or_else(|| i.as_unsigned().map(|u| ArchiveValue::Real(u as f64)))
                .unwrap_or(ArchiveValue::Null)),
            plist::Value::Date(date) => Ok(ArchiveValue::Date(SystemTime::from(*date))),
            _ => Ok(ArchiveValue::Null),
        }
    }

    fn resolve_uid(&mut self, index: u64, depth: usize) -> Result<ArchiveValue> {
        if self.stack.contains(&index) {
            return Err(DecodeError::ReferenceCycle(index));
        }
        let object = usize::try_from(index)
            .ok()
            .and_then(|i| self.objects.get(i))
            .ok_or_else(|| {
                DecodeError::KeyedArchive(format!(
                    "UID {} outside object table of {}",
                    index,
                    self.objects.len()
                ))
            })?;

        if let plist::Value::String(s) = object {
            if s == "$null" {
                return Ok(ArchiveValue::Null);
            }
        }

        self.stack.push(index);
        let resolved = self.resolve(object, depth + 1);
        self.stack.pop();
        resolved
    }

    /// Data blobs may themselves be keyed archives.
    fn resolve_data(&mut self, bytes: &[u8], depth: usize) -> Result<ArchiveValue> {
        let looks_like_plist = bytes.starts_with(b"bplist") || bytes.starts_with(b"<?xml");
        if looks_like_plist {
            if let Ok(inner) = plist::Value::from_reader(Cursor::new(bytes)) {
                let is_archive = inner
                    .as_dictionary()
                    .map(|d| d.contains_key("$top") && d.contains_key("$objects"))
                    .unwrap_or(false);
                if is_archive {
                    debug!("Unarchiving nested keyed archive ({} bytes)", bytes.len());
                    let remaining = self.max_depth.saturating_sub(depth);
                    return unarchive_within(&inner, remaining, self.max_nodes, self.budget);
                }
            }
        }
        Ok(ArchiveValue::Data(bytes.to_vec()))
    }
}

fn class_names(map: &BTreeMap<String, ArchiveValue>) -> Vec<&str> {
    map.get("$class")
        .and_then(|class| class.get("$classes"))
        .and_then(ArchiveValue::as_array)
        .map(|classes| classes.iter().filter_map(ArchiveValue::as_str).collect())
        .unwrap_or_default()
}

/// Collapse Foundation container classes to their plain shape.
fn collapse_class(mut map: BTreeMap<String, ArchiveValue>) -> ArchiveValue {
    let classes = class_names(&map);
    if classes.is_empty() {
        return ArchiveValue::Dictionary(map);
    }
    let is = |names: &[&str]| classes.iter().any(|c| names.contains(c));

    if is(&["NSArray", "NSSet", "NSOrderedSet"]) {
        return map
            .remove("NS.objects")
            .unwrap_or(ArchiveValue::Array(Vec::new()));
    }
    if is(&["NSDictionary", "NSMutableDictionary"]) {
        let keys = map.remove("NS.keys");
        let values = map.remove("NS.objects");
        let pairs = match (keys, values) {
            (Some(ArchiveValue::Array(keys)), Some(ArchiveValue::Array(values))) => keys
                .into_iter()
                .zip(values)
                .map(|(k, v)| (key_string(k), v))
                .collect(),
            _ => BTreeMap::new(),
        };
        return ArchiveValue::Dictionary(pairs);
    }
    if is(&["NSString", "NSMutableString"]) {
        return map.remove("NS.string").unwrap_or(ArchiveValue::Null);
    }
    if is(&["NSData", "NSMutableData"]) {
        return map.remove("NS.data").unwrap_or(ArchiveValue::Null);
    }
    if is(&["NSDate"]) {
        return match map.get("NS.time").and_then(ArchiveValue::as_f64) {
            Some(t) => apple_time(t)
                .map(ArchiveValue::Date)
                .unwrap_or(ArchiveValue::Null),
            None => ArchiveValue::Null,
        };
    }

    map.remove("$class");
    ArchiveValue::Dictionary(map)
}

fn key_string(key: ArchiveValue) -> String {
    match key {
        ArchiveValue::String(s) => s,
        ArchiveValue::Integer(i) => i.to_string(),
        ArchiveValue::Real(f) => f.to_string(),
        ArchiveValue::Bool(b) => b.to_string(),
        other => format!("{:?}", other),
    }
}

/// Seconds since the `NSDate` reference date to wall-clock time.
fn apple_time(seconds: f64) -> Option<SystemTime> {
    let unix = seconds + APPLE_REFERENCE_EPOCH;
    if unix >= 0.0 {
        SystemTime::UNIX_EPOCH.checked_add(Duration::try_from_secs_f64(unix).ok()?)
    } else {
        SystemTime::UNIX_EPOCH.checked_sub(Duration::try_from_secs_f64(-unix).ok()?)
    }
}
