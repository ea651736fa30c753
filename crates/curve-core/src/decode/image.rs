use super::{matrix, non_null, ArtboardDecoder};
use crate::error::{DecodeError, Result};
use crate::model::ImageElement;
use curve_data::model::ImageData;
use serde::Deserialize;
use serde_json::Value;
use std::ptr;
use tracing::debug;

fn relative_path(image_data: &Value) -> Option<String> {
    ImageData::deserialize(image_data).ok()?.relative_path
}

impl<'a> ArtboardDecoder<'a> {
    pub(crate) fn image(&mut self, image: &'a Value, name: &str) -> Result<ImageElement> {
        let relative_path = self.image_path(image, 0)?;

        let data = match (&relative_path, self.options.embed_images) {
            (Some(path), true) => self.archive.read_base64(path)?,
            (Some(_), false) => String::new(),
            (None, _) => {
                self.diagnostics
                    .warn(Some(name), "Image has no bitmap reference");
                String::new()
            }
        };

        let transform = non_null(image, "transform")
            .map(|t| matrix(t, "transform"))
            .transpose()?;
        let crop_rect = non_null(image, "cropRect")
            .map(|c| crop_rect(c, name))
            .transpose()?;

        Ok(ImageElement {
            data,
            relative_path,
            transform,
            crop_rect,
        })
    }

    /// Locate the bitmap entry for an image, trying the shared file image, the
    /// abstract image indirection, `imageDataId`, then an inline `imageData`.
    fn image_path(&self, image: &'a Value, hops: usize) -> Result<Option<String>> {
        let inline = non_null(image, "imageData");

        if let Some(data) = inline {
            if let Some(shared) = self.child(data, "sharedFileImage")? {
                if let Some(path) = relative_path(shared) {
                    debug!("Image resolved through shared file image");
                    return Ok(Some(path));
                }
            }
        }

        if hops == 0 {
            if let Some(abstract_image) = self.child(image, "abstractImage")? {
                if !ptr::eq(abstract_image, image) {
                    if let Some(path) = self.image_path(abstract_image, hops + 1)? {
                        debug!("Image resolved through abstract image");
                        return Ok(Some(path));
                    }
                }
            }
        }

        if let Some(data) = self.child(image, "imageDataId")? {
            if let Some(path) = relative_path(data) {
                return Ok(Some(path));
            }
        }

        Ok(inline.and_then(relative_path))
    }
}

fn crop_rect(value: &Value, name: &str) -> Result<[[f64; 2]; 2]> {
    let points = value.as_array().ok_or_else(|| DecodeError::UnexpectedType {
        field: "cropRect".to_string(),
        expected: "a list of points",
    })?;
    if points.len() != 2 {
        return Err(DecodeError::InvalidCropRect {
            element: name.to_string(),
            found: points.len(),
        });
    }

    let point = |p: &Value| -> Result<[f64; 2]> {
        match p.as_array().map(|xy| xy.as_slice()) {
            Some([x, y]) => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => Ok([x, y]),
                _ => Err(DecodeError::UnexpectedType {
                    field: "cropRect".to_string(),
                    expected: "numeric points",
                }),
            },
            _ => Err(DecodeError::UnexpectedType {
                field: "cropRect".to_string(),
                expected: "two-coordinate points",
            }),
        }
    };
    Ok([point(&points[0])?, point(&points[1])?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;
    use crate::options::DecodeOptions;
    use crate::profile::FormatProfile;
    use serde_json::json;

    fn bitmap_archive() -> MemoryArchive {
        MemoryArchive::new()
            .with_entry("a.dat", vec![1u8, 2, 3])
            .with_entry("b.dat", vec![4u8, 5, 6])
    }

    #[test]
    fn test_shared_file_image() {
        let root = json!({ "imageDatas": [{ "relativePath": "a.dat" }, { "relativePath": "b.dat" }] });
        let image = json!({ "imageData": { "sharedFileImage": { "_0": 1 } }, "cropRect": [[0, 0], [10, 20]] });
        let archive = bitmap_archive();
        let options = DecodeOptions::default();
        let mut decoder = ArtboardDecoder::new(&root, FormatProfile::curve(None, 44), &archive, &options);

        let decoded = decoder.image(&image, "Photo").unwrap();
        assert_eq!(decoded.relative_path.as_deref(), Some("b.dat"));
        assert_eq!(decoded.data, "BAUG");
        assert_eq!(decoded.crop_rect, Some([[0.0, 0.0], [10.0, 20.0]]));
    }

    #[test]
    fn test_abstract_image_indirection() {
        let root = json!({
            "abstractImages": [{ "imageDataId": 0 }],
            "imageDatas": [{ "relativePath": "a.dat" }]
        });
        let image = json!({ "abstractImage": 0 });
        let archive = bitmap_archive();
        let options = DecodeOptions::default();
        let mut decoder = ArtboardDecoder::new(&root, FormatProfile::curve(None, 40), &archive, &options);

        let decoded = decoder.image(&image, "Photo").unwrap();
        assert_eq!(decoded.relative_path.as_deref(), Some("a.dat"));
        assert_eq!(decoded.data, "AQID");
    }

    #[test]
    fn test_inline_image_data_with_transform() {
        let image = json!({ "imageData": { "relativePath": "a.dat" }, "transform": [1, 0, 0, 1, 5, 5] });
        let archive = bitmap_archive();
        let options = DecodeOptions::default().with_embed_images(false);
        let root = json!({});
        let mut decoder = ArtboardDecoder::new(&root, FormatProfile::vectornator(None, 19), &archive, &options);

        let decoded = decoder.image(&image, "Photo").unwrap();
        assert_eq!(decoded.relative_path.as_deref(), Some("a.dat"));
        assert!(decoded.data.is_empty());
        assert_eq!(decoded.transform, Some([1.0, 0.0, 0.0, 1.0, 5.0, 5.0]));
    }

    #[test]
    fn test_crop_rect_validation() {
        let err = crop_rect(&json!([[0, 0]]), "Photo").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidCropRect { ref element, found: 1 } if element == "Photo"
        ));
        assert!(matches!(
            crop_rect(&json!([[0, 0], [1]]), "Photo"),
            Err(DecodeError::UnexpectedType { .. })
        ));
        assert!(crop_rect(&json!([[0, 0], [1, 2], [3, 4]]), "Photo").is_err());
    }

    #[test]
    fn test_missing_bitmap_entry_is_error() {
        let image = json!({ "imageData": { "relativePath": "missing.dat" } });
        let archive = bitmap_archive();
        let options = DecodeOptions::default();
        let root = json!({});
        let mut decoder = ArtboardDecoder::new(&root, FormatProfile::vectornator(None, 19), &archive, &options);
        assert!(matches!(
            decoder.image(&image, "Photo"),
            Err(DecodeError::Archive { .. })
        ));
    }
}
