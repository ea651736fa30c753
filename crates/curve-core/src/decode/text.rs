use super::{matrix, non_null, parse, ArtboardDecoder};
use crate::error::{DecodeError, Result};
use crate::keyed_archive::unarchive_bytes;
use crate::model::{TextElement, TextFrame, TextFrameLimits};
use crate::text::{decode_attributed_string, decode_range_styles, normalize_runs};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use curve_data::model::TextProperty;
use serde_json::Value;
use tracing::debug;

impl<'a> ArtboardDecoder<'a> {
    /// Decode a text payload: a legacy archived attributed string when
    /// `attributedText` is present, range styles otherwise.
    pub(crate) fn text(&mut self, text: &'a Value, name: &str) -> Result<TextElement> {
        if self.child(text, "textPath")?.is_some() {
            self.diagnostics
                .warn(Some(name), "Text on a path is drawn as plain text");
        }

        let mut element = match non_null(text, "attributedText") {
            Some(blob) => self.legacy_text(text, blob, name)?,
            None => self.styled_text(text, name)?,
        };

        let text_len = element.len();
        if normalize_runs(&mut element.runs, text_len) {
            self.diagnostics.warn(
                Some(name),
                "Text run lengths did not match the string and were adjusted",
            );
        }
        Ok(element)
    }

    fn legacy_text(&mut self, text: &'a Value, blob: &Value, name: &str) -> Result<TextElement> {
        let bytes = match blob {
            Value::String(encoded) => BASE64_STANDARD.decode(encoded)?,
            Value::Array(items) => items
                .iter()
                .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect::<Option<Vec<u8>>>()
                .ok_or_else(|| DecodeError::UnexpectedType {
                    field: "attributedText".to_string(),
                    expected: "base64 or a byte list",
                })?,
            _ => {
                return Err(DecodeError::UnexpectedType {
                    field: "attributedText".to_string(),
                    expected: "base64 or a byte list",
                })
            }
        };
        debug!("Unarchiving {} bytes of attributed text", bytes.len());

        let archive = unarchive_bytes(
            &bytes,
            self.options.max_unarchive_depth,
            self.options.max_unarchive_nodes,
        )?;
        let (string, runs) = decode_attributed_string(&archive, &mut self.diagnostics, name)?;

        Ok(TextElement {
            string,
            transform: non_null(text, "transform")
                .map(|t| matrix(t, "transform"))
                .transpose()?,
            frame: TextFrame::default(),
            runs,
        })
    }

    fn styled_text(&mut self, text: &'a Value, name: &str) -> Result<TextElement> {
        let frame = match self.child(text, "textProperty")? {
            Some(property) => self.text_frame(parse(property, "text property")?, name),
            None => TextFrame::default(),
        };

        let styled = self
            .child(text, "styledText")?
            .ok_or_else(|| DecodeError::MissingField("styledText".into()))?;
        let string = styled
            .get("string")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let runs = decode_range_styles(styled, &mut self.diagnostics, name);

        Ok(TextElement {
            string,
            transform: None,
            frame,
            runs,
        })
    }

    fn text_frame(&mut self, property: TextProperty, name: &str) -> TextFrame {
        let limits = match property.text_frame_limits.as_ref().and_then(Value::as_object) {
            None => TextFrameLimits::AutoWidth,
            Some(limits) => {
                let size = |key: &str| {
                    let payload = limits.get(key)?;
                    Some(payload.get("_0").unwrap_or(payload))
                };
                let number = |payload: &Value, key: &str| payload.get(key).and_then(Value::as_f64);

                if let Some(fixed) = size("fixedSize") {
                    TextFrameLimits::FixedSize {
                        width: number(fixed, "width").unwrap_or(0.0),
                        height: number(fixed, "height").unwrap_or(0.0),
                    }
                } else if let Some(auto_height) = size("autoHeight") {
                    TextFrameLimits::AutoHeight {
                        width: number(auto_height, "width"),
                    }
                } else {
                    if size("autoWidth").is_none() {
                        self.diagnostics
                            .warn(Some(name), "Unknown text frame limits, using auto width");
                    }
                    TextFrameLimits::AutoWidth
                }
            }
        };

        TextFrame {
            limits,
            pivot: property.text_frame_pivot.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;
    use crate::model::TextAlignment;
    use crate::options::DecodeOptions;
    use crate::profile::FormatProfile;
    use plist::{Dictionary, Value as Plist};
    use serde_json::json;

    fn plist_dict(entries: Vec<(&str, Plist)>) -> Plist {
        let mut d = Dictionary::new();
        for (k, v) in entries {
            d.insert(k.to_string(), v);
        }
        Plist::Dictionary(d)
    }

    fn archived_text(string: &str) -> Vec<u8> {
        let root = plist_dict(vec![
            ("NSString", Plist::String(string.to_string())),
            (
                "NSAttributes",
                plist_dict(vec![
                    (
                        "NSColor",
                        plist_dict(vec![
                            ("UIRed", Plist::Real(1.0)),
                            ("UIGreen", Plist::Real(0.0)),
                            ("UIBlue", Plist::Real(0.0)),
                            ("UIAlpha", Plist::Real(1.0)),
                        ]),
                    ),
                    (
                        "NSFont",
                        plist_dict(vec![
                            ("NSName", Plist::String("Helvetica".into())),
                            ("NSSize", Plist::Real(18.0)),
                        ]),
                    ),
                    (
                        "NSParagraphStyle",
                        plist_dict(vec![("NSAlignment", Plist::Integer(1i64.into()))]),
                    ),
                ]),
            ),
        ]);
        let archive = plist_dict(vec![
            ("$archiver", Plist::String("NSKeyedArchiver".into())),
            ("$top", plist_dict(vec![("root", root)])),
            ("$objects", Plist::Array(vec![Plist::String("$null".into())])),
        ]);
        let mut bytes = Vec::new();
        archive.to_writer_binary(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_legacy_attributed_text() {
        let text = json!({
            "attributedText": BASE64_STANDARD.encode(archived_text("Hello")),
            "transform": [1, 0, 0, 1, 10, 20]
        });
        let (root, archive, options) = (json!({}), MemoryArchive::new(), DecodeOptions::default());
        let mut d = ArtboardDecoder::new(&root, FormatProfile::vectornator(None, 13), &archive, &options);

        let decoded = d.text(&text, "T").unwrap();
        assert_eq!(decoded.string, "Hello");
        assert_eq!(decoded.transform, Some([1.0, 0.0, 0.0, 1.0, 10.0, 20.0]));
        assert_eq!(decoded.runs.len(), 1);
        let run = &decoded.runs[0];
        assert_eq!(run.length, 5);
        assert_eq!(run.font_name.as_deref(), Some("Helvetica"));
        assert_eq!(run.font_size, Some(18.0));
        assert_eq!(run.alignment, Some(TextAlignment::Center));
        assert_eq!(run.fill_color.as_ref().unwrap().hex, "#FF0000");
        assert!(d.diagnostics.is_empty());
    }

    #[test]
    fn test_legacy_text_as_byte_list() {
        let bytes: Vec<Value> = archived_text("Hi").into_iter().map(Value::from).collect();
        let text = json!({ "attributedText": bytes });
        let (root, archive, options) = (json!({}), MemoryArchive::new(), DecodeOptions::default());
        let mut d = ArtboardDecoder::new(&root, FormatProfile::vectornator(None, 13), &archive, &options);
        assert_eq!(d.text(&text, "T").unwrap().string, "Hi");
    }

    #[test]
    fn test_bad_base64_is_error() {
        let text = json!({ "attributedText": "not base64!!" });
        let (root, archive, options) = (json!({}), MemoryArchive::new(), DecodeOptions::default());
        let mut d = ArtboardDecoder::new(&root, FormatProfile::vectornator(None, 13), &archive, &options);
        assert!(matches!(d.text(&text, "T"), Err(DecodeError::Base64(_))));
    }

    #[test]
    fn test_mapped_styled_text() {
        let root = json!({
            "abstractTexts": [{ "text": 0, "textId": 0 }],
            "texts": [{
                "textFrameLimits": { "fixedSize": { "width": 200, "height": 50 } },
                "textFramePivot": [100, 25]
            }],
            "styledTexts": [{
                "string": "Hello world",
                "fontName": { "values": [{ "upperBound": 5, "value": "Inter" }, { "upperBound": 11, "value": "Inter" }] },
                "fontSize": { "values": [{ "upperBound": 11, "value": 12 }] }
            }]
        });
        let (archive, options) = (MemoryArchive::new(), DecodeOptions::default());
        let mut d = ArtboardDecoder::new(&root, FormatProfile::curve(None, 44), &archive, &options);

        let decoded = d.text(&root["abstractTexts"][0], "T").unwrap();
        assert_eq!(decoded.string, "Hello world");
        assert_eq!(
            decoded.frame,
            TextFrame {
                limits: TextFrameLimits::FixedSize { width: 200.0, height: 50.0 },
                pivot: [100.0, 25.0]
            }
        );
        let lengths: Vec<usize> = decoded.runs.iter().map(|r| r.length).collect();
        assert_eq!(lengths, vec![5, 6]);
        assert_eq!(decoded.runs[0].font_size, Some(12.0));
        assert!(d.diagnostics.is_empty());
    }

    #[test]
    fn test_run_lengths_are_normalized() {
        let text = json!({
            "textProperty": { "textFrameLimits": { "autoHeight": { "width": 80 } } },
            "styledText": {
                "string": "abcdef",
                "fontSize": { "values": [{ "upperBound": 4, "value": 10 }] }
            }
        });
        let (root, archive, options) = (json!({}), MemoryArchive::new(), DecodeOptions::default());
        let mut d = ArtboardDecoder::new(&root, FormatProfile::vectornator(None, 30), &archive, &options);

        let decoded = d.text(&text, "T").unwrap();
        assert_eq!(decoded.frame.limits, TextFrameLimits::AutoHeight { width: Some(80.0) });
        assert_eq!(decoded.runs.len(), 1);
        assert_eq!(decoded.runs[0].length, 6);
        assert_eq!(d.diagnostics.len(), 1);
    }

    #[test]
    fn test_text_path_and_missing_styles() {
        let text = json!({ "textPath": { "closed": false } });
        let (root, archive, options) = (json!({}), MemoryArchive::new(), DecodeOptions::default());
        let mut d = ArtboardDecoder::new(&root, FormatProfile::vectornator(None, 30), &archive, &options);
        assert!(matches!(
            d.text(&text, "T"),
            Err(DecodeError::MissingField(ref f)) if f == "styledText"
        ));
        assert_eq!(d.diagnostics.len(), 1);
    }
}
