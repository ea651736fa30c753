use super::{non_null, parse, ArtboardDecoder};
use crate::color::Color;
use crate::error::{DecodeError, Result};
use crate::model::{
    Arrow, BrushProfile, Fill, Gradient, GradientKind, GradientStop, GradientTransform, LineCap,
    LineJoin, StrokePosition, StrokeStyle,
};
use crate::resolve::sub_element;
use curve_data::model::{ArrowData, BrushProfileData, FillTransform, GradientData, StrokeStyleData};
use serde_json::Value;

/// `[0]` for a solid line, otherwise the pattern without trailing zero entries.
fn dash_pattern(raw: Option<Vec<f64>>) -> Vec<f64> {
    let mut dashes: Vec<f64> = raw
        .unwrap_or_default()
        .into_iter()
        .map(|d| d.max(0.0))
        .collect();
    while dashes.len() > 1 && dashes.last() == Some(&0.0) {
        dashes.pop();
    }
    if dashes.is_empty() {
        dashes.push(0.0);
    }
    dashes
}

/// `fill.<tag>._0`, or the same under `subElement`.
fn fill_variant<'v>(fill: &'v Value, tag: &str) -> Option<&'v Value> {
    fill.get(tag)
        .and_then(|v| v.get("_0"))
        .filter(|v| !v.is_null())
        .or_else(|| sub_element(fill, tag))
}

fn gradient_transform(transform: FillTransform) -> GradientTransform {
    match transform.transform.as_deref() {
        Some(&[a, b, c, d, tx, ty]) => GradientTransform::Matrix {
            start: transform.start,
            end: transform.end,
            matrix: [a, b, c, d, tx, ty],
        },
        _ => GradientTransform::Points {
            start: transform.start,
            end: transform.end,
        },
    }
}

impl<'a> ArtboardDecoder<'a> {
    pub(crate) fn stroke(&mut self, raw: &Value, name: &str) -> Result<StrokeStyle> {
        let data: StrokeStyleData = parse(raw, "stroke style")?;

        let (cap, join, position, dashes) = match data.basic_stroke_style {
            Some(basic) => (basic.cap, basic.join, basic.position, basic.dash_pattern),
            None => (
                data.cap.unwrap_or(0),
                data.join.unwrap_or(0),
                data.position.unwrap_or(0),
                data.dash_pattern,
            ),
        };

        let color = data
            .color
            .as_ref()
            .filter(|c| !c.is_null())
            .ok_or_else(|| DecodeError::MissingField("strokeStyle.color".into()))?;

        Ok(StrokeStyle {
            cap: self.line_cap(cap, name),
            join: self.line_join(join, name),
            position: self.stroke_position(position, name),
            dash_pattern: dash_pattern(dashes),
            color: Color::from_value(color)?,
            width: data.width.unwrap_or(1.0).max(0.0),
            start_arrow: self.arrow(data.start_arrow, name),
            end_arrow: self.arrow(data.end_arrow, name),
        })
    }

    fn line_cap(&mut self, code: i64, name: &str) -> LineCap {
        match code {
            0 => LineCap::Butt,
            1 => LineCap::Round,
            2 => LineCap::Square,
            other => {
                self.diagnostics
                    .warn(Some(name), format!("Unknown line cap {}, using butt", other));
                LineCap::Butt
            }
        }
    }

    fn line_join(&mut self, code: i64, name: &str) -> LineJoin {
        match code {
            0 => LineJoin::Miter,
            1 => LineJoin::Round,
            2 => LineJoin::Bevel,
            other => {
                self.diagnostics
                    .warn(Some(name), format!("Unknown line join {}, using miter", other));
                LineJoin::Miter
            }
        }
    }

    fn stroke_position(&mut self, code: i64, name: &str) -> StrokePosition {
        match code {
            -1 => StrokePosition::Inside,
            0 => StrokePosition::Center,
            1 => StrokePosition::Outside,
            other => {
                self.diagnostics.warn(
                    Some(name),
                    format!("Unknown stroke position {}, using center", other),
                );
                StrokePosition::Center
            }
        }
    }

    fn arrow(&mut self, data: Option<ArrowData>, name: &str) -> Option<Arrow> {
        let data = data?;
        match data.type_raw_value {
            0 => None,
            kind if kind < 0 => {
                self.diagnostics
                    .warn(Some(name), format!("Unknown line-end marker {} ignored", kind));
                None
            }
            kind => Some(Arrow {
                kind,
                scale: data.scale,
            }),
        }
    }

    /// Fill held by `holder`: a `fill` enum (inline or mapped), or the older
    /// `fillGradient` / `fillColor` pair. Gradients without their own transform
    /// take it from `stylable`.
    pub(crate) fn fill(
        &mut self,
        holder: &'a Value,
        stylable: &'a Value,
        name: &str,
    ) -> Result<Option<Fill>> {
        if let Some(fill) = self.child(holder, "fill")? {
            if let Some(gradient) = fill_variant(fill, "gradient") {
                return Ok(Some(Fill::Gradient(self.gradient(gradient, stylable, name)?)));
            }
            if let Some(color) = fill_variant(fill, "color") {
                return Ok(Some(Fill::Solid(Color::from_value(color)?)));
            }
            return Ok(None);
        }

        if let Some(gradient) = non_null(holder, "fillGradient") {
            return Ok(Some(Fill::Gradient(self.gradient(gradient, stylable, name)?)));
        }
        if let Some(color) = non_null(holder, "fillColor") {
            return Ok(Some(Fill::Solid(Color::from_value(color)?)));
        }
        Ok(None)
    }

    fn gradient(&mut self, raw: &Value, stylable: &'a Value, name: &str) -> Result<Gradient> {
        let data: GradientData = parse(raw, "gradient")?;

        let kind = match data.type_raw_value {
            0 => GradientKind::Linear,
            1 => GradientKind::Radial,
            other => {
                self.diagnostics.warn(
                    Some(name),
                    format!("Unknown gradient type {}, using linear", other),
                );
                GradientKind::Linear
            }
        };

        let mut stops = data
            .stops
            .iter()
            .map(|stop| {
                Ok(GradientStop {
                    color: Color::from_value(&stop.color)?,
                    ratio: stop.ratio,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        stops.sort_by(|a, b| a.ratio.total_cmp(&b.ratio));

        let transform = match data.transform {
            Some(transform) => Some(gradient_transform(transform)),
            None => match self.child(stylable, "fillTransform")? {
                Some(raw) => Some(gradient_transform(parse(raw, "fill transform")?)),
                None => {
                    self.diagnostics
                        .warn(Some(name), "Gradient has no fill transform");
                    None
                }
            },
        };

        Ok(Gradient {
            kind,
            stops,
            transform,
        })
    }

    /// Brush profile for a brush-mode stroke, looked up on the stroke style and
    /// then on each of `owners`.
    pub(crate) fn brush(
        &mut self,
        stroke: &'a Value,
        owners: &[&'a Value],
        name: &str,
    ) -> Result<Option<BrushProfile>> {
        let mut brush_stroke = self.child(stroke, "brushStroke")?;
        for owner in owners {
            if brush_stroke.is_some() {
                break;
            }
            brush_stroke = self.child(owner, "brushStroke")?;
        }
        let Some(brush_stroke) = brush_stroke else {
            self.diagnostics
                .warn(Some(name), "Brush stroke without brush data, drawn as a plain stroke");
            return Ok(None);
        };

        let Some(profile) = self.child(brush_stroke, "brushProfile")? else {
            self.diagnostics
                .warn(Some(name), "Brush stroke without a profile, drawn as a plain stroke");
            return Ok(None);
        };
        let data: BrushProfileData = parse(profile, "brush profile")?;

        Ok(Some(BrushProfile {
            handles: data.handles,
            angle: data.angle,
            roundness: data.roundness,
            minimum_width: data.minimum_width,
            pressure_sensitive: data.is_pressure_sensitive,
        }))
    }
}
