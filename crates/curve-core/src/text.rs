//! Text style timelines.
//!
//! Two encodings converge on one ordered list of [`StyledTextRun`]s:
//!
//! * Range styles: every attribute lists `(upperBound, value)` breakpoints
//!   independently. The union of breakpoints delimits the runs and values are
//!   back-filled from later runs where an attribute is not restated.
//! * Attributed strings: the unarchived `NSAttributedString` layout of a flat
//!   string, a run table and an attribute dictionary per style.
//!
//! Run lengths count UTF-16 code units.

use crate::color::Color;
use crate::diagnostics::Diagnostics;
use crate::error::{DecodeError, Result};
use crate::keyed_archive::{decode_attribute_info, ArchiveValue};
use crate::model::{LineHeight, StyledTextRun, TextAlignment, TextStroke};
use curve_data::model::RangeValue;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

type StyleMap = Map<String, Value>;

/// Legacy documents swap right (1) and center (2) relative to [`TextAlignment`].
pub fn remap_legacy_alignment(code: i64) -> i64 {
    match code {
        1 | 2 => 3 - code,
        other => other,
    }
}

/// Decode a range-style map (the `styledText` entity minus its string).
pub fn decode_range_styles(
    styled_text: &Value,
    diagnostics: &mut Diagnostics,
    element: &str,
) -> Vec<StyledTextRun> {
    let Some(attributes) = styled_text.as_object() else {
        return Vec::new();
    };

    let mut bounds = BTreeSet::new();
    for attribute in attributes.values().filter(|v| v.is_object()) {
        collect_upper_bounds(attribute, &mut bounds);
    }
    let bounds: Vec<i64> = bounds.into_iter().collect();

    let mut styles: Vec<StyleMap> = vec![Map::new(); bounds.len()];
    let mut groups = BTreeSet::new();
    for (key, attribute) in attributes.iter().filter(|(_, v)| v.is_object()) {
        if attribute.get("values").is_none() {
            groups.insert(key.clone());
        }
        add_styles(attribute, &[key.as_str()], &bounds, &mut styles);
    }

    propagate(&mut styles, &groups);

    let mut previous = 0i64;
    let mut negative = false;
    let runs: Vec<StyledTextRun> = bounds
        .iter()
        .zip(&styles)
        .map(|(&bound, style)| {
            // Bounds below the start of the string give empty runs.
            let length = match bound.checked_sub(previous) {
                Some(delta) if delta >= 0 => usize::try_from(delta).unwrap_or(usize::MAX),
                _ => {
                    negative = true;
                    0
                }
            };
            previous = previous.max(bound);
            run_from_range_style(length, style, diagnostics, element)
        })
        .collect();

    if negative {
        diagnostics.warn(
            Some(element),
            "Negative text range bounds were treated as empty runs",
        );
    }
    runs
}

fn range_values(attribute: &Value) -> Option<Vec<RangeValue>> {
    let values = attribute.get("values")?;
    Vec::<RangeValue>::deserialize(values).ok()
}

fn collect_upper_bounds(attribute: &Value, bounds: &mut BTreeSet<i64>) {
    match range_values(attribute) {
        Some(values) if !values.is_empty() => {
            bounds.extend(values.iter().map(|v| v.upper_bound));
        }
        _ => {
            if let Some(fields) = attribute.as_object() {
                for child in fields.values().filter(|v| v.is_object()) {
                    collect_upper_bounds(child, bounds);
                }
            }
        }
    }
}

fn add_styles(attribute: &Value, path: &[&str], bounds: &[i64], styles: &mut [StyleMap]) {
    match range_values(attribute) {
        Some(values) if !values.is_empty() => {
            for range in values {
                if let Ok(index) = bounds.binary_search(&range.upper_bound) {
                    insert_at_path(&mut styles[index], path, range.value);
                }
            }
        }
        _ => {
            if let Some(fields) = attribute.as_object() {
                for (key, child) in fields.iter().filter(|(_, v)| v.is_object()) {
                    let mut child_path = path.to_vec();
                    child_path.push(key.as_str());
                    add_styles(child, &child_path, bounds, styles);
                }
            }
        }
    }
}

fn insert_at_path(style: &mut StyleMap, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut target = style;
    for key in parents {
        let entry = target
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        target = next;
    }
    target.insert(last.to_string(), value);
}

/// Back-fill attributes from later runs. Group attributes merge field by
/// field; plain values are copied whole.
fn propagate(styles: &mut [StyleMap], groups: &BTreeSet<String>) {
    let Some(last) = styles.last() else {
        return;
    };
    let mut carried = last.clone();

    for style in styles.iter_mut().rev() {
        for (key, value) in &carried {
            match style.get_mut(key) {
                None => {
                    style.insert(key.clone(), value.clone());
                }
                Some(Value::Object(current)) if groups.contains(key) => {
                    if let Value::Object(fields) = value {
                        for (field, v) in fields {
                            current.entry(field.clone()).or_insert_with(|| v.clone());
                        }
                    }
                }
                Some(_) => {}
            }
        }

        for (key, value) in style.iter() {
            let merged = match (carried.get_mut(key), value) {
                (Some(Value::Object(current)), Value::Object(fields)) if groups.contains(key) => {
                    for (field, v) in fields {
                        current.insert(field.clone(), v.clone());
                    }
                    true
                }
                _ => false,
            };
            if !merged {
                carried.insert(key.clone(), value.clone());
            }
        }
    }
}

fn json_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        _ => false,
    }
}

fn line_height(value: &Value) -> Option<LineHeight> {
    let fields = value.as_object()?;
    let (kind, payload) = fields.iter().next()?;
    let amount = payload.get("_0").unwrap_or(payload).as_f64()?;
    match kind.as_str() {
        "multiple" => Some(LineHeight::Multiple(amount)),
        "fixed" | "exactly" => Some(LineHeight::Fixed(amount)),
        "atLeast" => Some(LineHeight::AtLeast(amount)),
        _ => None,
    }
}

fn run_from_range_style(
    length: usize,
    style: &StyleMap,
    diagnostics: &mut Diagnostics,
    element: &str,
) -> StyledTextRun {
    let alignment = style.get("alignment").and_then(Value::as_i64).and_then(|code| {
        let alignment = TextAlignment::from_code(code);
        if alignment.is_none() {
            diagnostics.warn(Some(element), format!("Unknown text alignment {}", code));
        }
        alignment
    });

    let line_height = style.get("lineHeight").and_then(|v| {
        let decoded = line_height(v);
        if decoded.is_none() && !v.is_null() {
            diagnostics.warn(Some(element), format!("Unsupported line height {}", v));
        }
        decoded
    });

    let fill_color = style
        .get("fillColor")
        .filter(|v| !v.is_null())
        .and_then(|v| match Color::from_value(v) {
            Ok(color) => Some(color),
            Err(e) => {
                diagnostics.warn(Some(element), format!("Text fill color ignored: {}", e));
                None
            }
        });

    let stroke = style
        .get("strokeStyle")
        .and_then(|v| text_stroke(v, diagnostics, element));

    StyledTextRun {
        length,
        font_name: style.get("fontName").and_then(Value::as_str).map(str::to_string),
        font_size: style.get("fontSize").and_then(Value::as_f64),
        alignment,
        kerning: style.get("kerning").and_then(Value::as_f64),
        line_height,
        fill_color,
        stroke,
        strikethrough: json_flag(style.get("strikethrough")),
        underline: json_flag(style.get("underline")),
    }
}

fn text_stroke(value: &Value, diagnostics: &mut Diagnostics, element: &str) -> Option<TextStroke> {
    let width = value.get("width").and_then(Value::as_f64).unwrap_or(0.0);
    if width <= 0.0 {
        return None;
    }
    let color = match value.get("color").filter(|v| !v.is_null()) {
        None => Color::from_rgba(0.0, 0.0, 0.0, 1.0),
        Some(raw) => match Color::from_value(raw) {
            Ok(color) => color,
            Err(e) => {
                diagnostics.warn(Some(element), format!("Text stroke ignored: {}", e));
                return None;
            }
        },
    };
    Some(TextStroke { color, width })
}

/// Decode an unarchived attributed string into its plain string and runs.
pub fn decode_attributed_string(
    archive: &ArchiveValue,
    diagnostics: &mut Diagnostics,
    element: &str,
) -> Result<(String, Vec<StyledTextRun>)> {
    let string = archive
        .get("NSString")
        .and_then(ArchiveValue::as_str)
        .ok_or_else(|| DecodeError::MissingField("NSString".into()))?
        .to_string();
    let string_len = string.encode_utf16().count() as u64;

    let (attributes, single) = match archive.get("NSAttributes") {
        Some(ArchiveValue::Array(items)) => (items.iter().collect::<Vec<_>>(), false),
        Some(dict @ ArchiveValue::Dictionary(_)) => (vec![dict], true),
        _ => (Vec::new(), false),
    };

    let table: Vec<(u64, i64)> = match archive.get("NSAttributeInfo") {
        _ if single => vec![(string_len, 0)],
        Some(ArchiveValue::Array(entries)) => entries
            .iter()
            .map(|entry| {
                let length = entry.get("length").and_then(ArchiveValue::as_i64).unwrap_or(0);
                let id = entry
                    .get("attribute_id")
                    .and_then(ArchiveValue::as_i64)
                    .unwrap_or(-1);
                (u64::try_from(length).unwrap_or(0), id)
            })
            .collect(),
        Some(ArchiveValue::Data(bytes)) => decode_attribute_info(bytes)
            .into_iter()
            .map(|run| (run.length, i64::try_from(run.attribute_id).unwrap_or(-1)))
            .collect(),
        _ if !attributes.is_empty() => vec![(string_len, 0)],
        _ => Vec::new(),
    };

    let runs = table
        .into_iter()
        .map(|(length, id)| {
            let length = usize::try_from(length.min(string_len)).unwrap_or(usize::MAX);
            let attribute = usize::try_from(id).ok().and_then(|i| attributes.get(i));
            match attribute {
                Some(attribute) => run_from_attributes(length, attribute),
                None => {
                    diagnostics.warn(
                        Some(element),
                        format!(
                            "Attribute id {} out of range ({} attribute sets)",
                            id,
                            attributes.len()
                        ),
                    );
                    StyledTextRun {
                        length,
                        ..Default::default()
                    }
                }
            }
        })
        .collect();

    Ok((string, runs))
}

/// `UIColor` components, or the space-separated `NSRGB` byte string.
fn legacy_color(value: &ArchiveValue) -> Option<Color> {
    if value.get("UIRed").is_some() || value.get("UIGreen").is_some() || value.get("UIBlue").is_some() {
        let component = |key: &str, default: f64| {
            value.get(key).and_then(ArchiveValue::as_f64).unwrap_or(default)
        };
        return Some(Color::from_rgba(
            component("UIRed", 0.0),
            component("UIGreen", 0.0),
            component("UIBlue", 0.0),
            component("UIAlpha", 1.0),
        ));
    }

    let rgb = value.get("NSRGB")?.as_bytes()?;
    let text = String::from_utf8_lossy(rgb);
    let parts: Vec<f64> = text
        .trim_end_matches('\0')
        .split_whitespace()
        .filter_map(|p| p.parse().ok())
        .collect();
    match parts.as_slice() {
        [r, g, b] => Some(Color::from_rgba(*r, *g, *b, 1.0)),
        [r, g, b, a, ..] => Some(Color::from_rgba(*r, *g, *b, *a)),
        _ => None,
    }
}

fn run_from_attributes(length: usize, attribute: &ArchiveValue) -> StyledTextRun {
    let stroke = attribute.get("NSStrokeColor").and_then(|color| {
        let width = attribute
            .get("NSStrokeWidth")
            .and_then(ArchiveValue::as_f64)
            .unwrap_or(1.0)
            .max(0.0);
        let color = legacy_color(color)?;
        (width > 0.0).then_some(TextStroke { color, width })
    });

    let alignment = attribute
        .get("NSParagraphStyle")
        .and_then(|p| p.get("NSAlignment"))
        .and_then(ArchiveValue::as_i64)
        .unwrap_or(0);

    let font = attribute.get("NSFont");
    let flag = |key: &str| {
        attribute
            .get(key)
            .and_then(ArchiveValue::as_bool)
            .unwrap_or(false)
    };

    StyledTextRun {
        length,
        font_name: font
            .and_then(|f| f.get("NSName"))
            .and_then(ArchiveValue::as_str)
            .map(str::to_string),
        font_size: font.and_then(|f| f.get("NSSize")).and_then(ArchiveValue::as_f64),
        alignment: TextAlignment::from_code(remap_legacy_alignment(alignment)),
        kerning: Some(
            attribute
                .get("NSKern")
                .and_then(ArchiveValue::as_f64)
                .unwrap_or(0.0),
        ),
        line_height: None,
        fill_color: attribute.get("NSColor").and_then(legacy_color),
        stroke,
        strikethrough: flag("NSStrikethrough"),
        underline: flag("NSUnderline"),
    }
}

/// Force the run lengths to sum to `text_len`: pad the last run, cut the runs
/// past the end of the text, or add one unstyled run. Returns whether anything
/// changed.
pub fn normalize_runs(runs: &mut Vec<StyledTextRun>, text_len: usize) -> bool {
    let total = runs
        .iter()
        .try_fold(0usize, |total, run| total.checked_add(run.length));

    match total {
        Some(total) if total == text_len => false,
        Some(total) if total < text_len => {
            match runs.last_mut() {
                Some(last) => last.length += text_len - total,
                None => runs.push(StyledTextRun {
                    length: text_len,
                    ..Default::default()
                }),
            }
            true
        }
        _ => {
            let mut remaining = text_len;
            let mut kept = 0;
            for run in runs.iter_mut() {
                if remaining == 0 {
                    break;
                }
                run.length = run.length.min(remaining);
                remaining -= run.length;
                kept += 1;
            }
            runs.truncate(kept);
            true
        }
    }
}
