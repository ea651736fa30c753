use crate::error::{DecodeError, Result};
use curve_data::model::ColorData;
use glam::Vec4;
use serde::Serialize;
use serde_json::Value;

/// A colour normalised to `#RRGGBB` plus a separate alpha.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Color {
    pub hex: String,
    pub alpha: f64,
}

impl Color {
    pub fn from_rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            hex: format!(
                "#{:02X}{:02X}{:02X}",
                channel(red),
                channel(green),
                channel(blue)
            ),
            alpha,
        }
    }

    /// Build from an `rgba`, `hsba` or legacy `h`/`s`/`b`/`a` payload.
    pub fn from_data(data: &ColorData) -> Result<Self> {
        if let Some(rgba) = &data.rgba {
            return Ok(Self::from_rgba(rgba.red, rgba.green, rgba.blue, rgba.alpha));
        }
        if let Some(hsba) = &data.hsba {
            let (r, g, b) = hsv_to_rgb(hsba.hue, hsba.saturation, hsba.brightness);
            return Ok(Self::from_rgba(r, g, b, hsba.alpha));
        }
        if let (Some(h), Some(s), Some(b)) = (data.h, data.s, data.b) {
            let (r, g, bl) = hsv_to_rgb(h, s, b);
            return Ok(Self::from_rgba(r, g, bl, data.a.unwrap_or(1.0)));
        }
        Err(DecodeError::InvalidColor)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        if !value.is_object() {
            return Err(DecodeError::InvalidColor);
        }
        let data: ColorData = serde_json::from_value(value.clone())?;
        Self::from_data(&data)
    }

    /// Linear RGBA components in `[0, 1]`.
    pub fn to_vec4(&self) -> Vec4 {
        let hex = self.hex.trim_start_matches('#');
        let component = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .map(|c| c as f32 / 255.0)
                .unwrap_or(0.0)
        };
        Vec4::new(component(0), component(2), component(4), self.alpha as f32)
    }
}

fn channel(c: f64) -> u8 {
    (c * 255.0).clamp(0.0, 255.0) as u8
}

/// HSV to RGB with hue, saturation and value in `[0, 1]`.
fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (f64, f64, f64) {
    if s == 0.0 {
        return (v, v, v);
    }
    let sector = (h * 6.0).trunc();
    let f = h * 6.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match (sector as i64).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}
