use serde_json::Value;
use tracing::warn;

use crate::constants::{DEFAULT_NODE_RADIUS, MIN_SHAPE_RADIUS};
use crate::errors::ShapeError;
use crate::shape::{Shape, ShapeKind};

/// 形状构造使用的开放属性表，未识别的键会被忽略。
pub type ShapeAttributes = serde_json::Map<String, Value>;

/// 根据类型标签与属性表构造形状。
///
/// 未知类型默认返回 [`ShapeError::UnknownShapeType`]；配置了回退类型时改为构造回退形状并记录告警。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeFactory {
    default_radius: f64,
    fallback: Option<ShapeKind>,
}

impl Default for ShapeFactory {
    fn default() -> Self {
        Self {
            default_radius: DEFAULT_NODE_RADIUS,
            fallback: None,
        }
    }
}

impl ShapeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 未给出任何尺寸属性时使用的归一化半径。矩形的默认边长为其两倍。
    pub fn with_default_radius(mut self, radius: f64) -> Self {
        self.default_radius = radius.abs();
        self
    }

    pub fn with_fallback(mut self, fallback: Option<ShapeKind>) -> Self {
        self.fallback = fallback;
        self
    }

    #[inline]
    pub fn fallback(&self) -> Option<ShapeKind> {
        self.fallback
    }

    pub fn create_shape(
        &self,
        type_tag: &str,
        attributes: &ShapeAttributes,
        scene_scale: f64,
    ) -> Result<Shape, ShapeError> {
        if !scene_scale.is_finite() || scene_scale <= 0.0 {
            return Err(ShapeError::InvalidScale(scene_scale));
        }
        let kind = match type_tag.parse::<ShapeKind>() {
            Ok(kind) => kind,
            Err(err) => match self.fallback {
                Some(fallback) => {
                    warn!(type_tag, fallback = %fallback, "未知形状类型，使用回退形状");
                    fallback
                }
                None => return Err(err),
            },
        };
        match kind {
            ShapeKind::Circle => self.create_circle(attributes, scene_scale),
            ShapeKind::Rectangle => self.create_rectangle(attributes, scene_scale),
        }
    }

    fn create_circle(
        &self,
        attributes: &ShapeAttributes,
        scene_scale: f64,
    ) -> Result<Shape, ShapeError> {
        let radius = match numeric_attribute(attributes, "radius")? {
            Some(radius) => radius,
            None => match numeric_attribute(attributes, "diameter")? {
                Some(diameter) => diameter * 0.5,
                None => numeric_attribute(attributes, "size")?
                    .map(|size| size * 0.5)
                    .unwrap_or(self.default_radius),
            },
        };
        Ok(Shape::circle((radius * scene_scale).max(MIN_SHAPE_RADIUS)))
    }

    fn create_rectangle(
        &self,
        attributes: &ShapeAttributes,
        scene_scale: f64,
    ) -> Result<Shape, ShapeError> {
        let size = numeric_attribute(attributes, "size")?;
        let default_side = self.default_radius * 2.0;
        let width = numeric_attribute(attributes, "width")?
            .or(size)
            .unwrap_or(default_side);
        let height = numeric_attribute(attributes, "height")?
            .or(size)
            .unwrap_or(default_side);
        let corner_radius = match numeric_attribute(attributes, "corner_radius")? {
            Some(value) => value,
            None => numeric_attribute(attributes, "cornerRadius")?.unwrap_or(0.0),
        };
        Ok(Shape::rectangle(
            width * scene_scale,
            height * scene_scale,
            corner_radius * scene_scale,
        ))
    }
}

/// 读取数值属性，接受数字与数字字符串；缺失或 `null` 视为未提供。
fn numeric_attribute(attributes: &ShapeAttributes, key: &str) -> Result<Option<f64>, ShapeError> {
    let invalid = |reason: &str| ShapeError::InvalidAttribute {
        key: key.to_string(),
        reason: reason.to_string(),
    };
    let value = match attributes.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(number)) => number
            .as_f64()
            .ok_or_else(|| invalid("number is not representable as f64"))?,
        Some(Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid("expected a numeric string"))?,
        Some(_) => return Err(invalid("expected a number")),
    };
    if !value.is_finite() {
        return Err(invalid("value must be finite"));
    }
    if value < 0.0 {
        return Err(invalid("value must not be negative"));
    }
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn attributes(value: Value) -> ShapeAttributes {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other:?}"),
        }
    }

    fn circle_radius(shape: Shape) -> f64 {
        match shape {
            Shape::Circle(circle) => circle.radius(),
            other => panic!("expected circle, got {other:?}"),
        }
    }

    #[test]
    fn circle_radius_resolution_order() {
        let factory = ShapeFactory::new();

        let explicit = factory
            .create_shape("circle", &attributes(json!({"radius": 2.0, "size": 10.0})), 1.0)
            .unwrap();
        assert!((circle_radius(explicit) - 2.0).abs() < 1e-9);

        let from_diameter = factory
            .create_shape("circle", &attributes(json!({"diameter": 3.0, "size": 10.0})), 1.0)
            .unwrap();
        assert!((circle_radius(from_diameter) - 1.5).abs() < 1e-9);

        let from_size = factory
            .create_shape("circle", &attributes(json!({"size": "4"})), 1.0)
            .unwrap();
        assert!((circle_radius(from_size) - 2.0).abs() < 1e-9);

        let default = factory
            .create_shape("circle", &ShapeAttributes::new(), 2.0)
            .unwrap();
        assert!((circle_radius(default) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn circle_radius_is_floored_after_scaling() {
        let shape = ShapeFactory::new()
            .create_shape("circle", &attributes(json!({"radius": 1.0})), 0.01)
            .unwrap();
        assert!((circle_radius(shape) - MIN_SHAPE_RADIUS).abs() < 1e-12);
    }

    #[test]
    fn rectangle_dimensions_fall_back_to_size() {
        let factory = ShapeFactory::new();
        let shape = factory
            .create_shape(
                "Rectangle",
                &attributes(json!({"width": 4.0, "size": 2.0, "cornerRadius": 0.5, "label": "x"})),
                3.0,
            )
            .unwrap();
        match shape {
            Shape::Rectangle(rect) => {
                assert!((rect.width() - 12.0).abs() < 1e-9);
                assert!((rect.height() - 6.0).abs() < 1e-9);
                assert!((rect.corner_radius() - 1.5).abs() < 1e-9);
            }
            other => panic!("expected rectangle, got {other:?}"),
        }

        let square = factory
            .create_shape("rectangle", &ShapeAttributes::new(), 1.0)
            .unwrap();
        match square {
            Shape::Rectangle(rect) => {
                assert!((rect.width() - 1.0).abs() < 1e-9);
                assert!((rect.height() - 1.0).abs() < 1e-9);
                assert_eq!(rect.corner_radius(), 0.0);
            }
            other => panic!("expected rectangle, got {other:?}"),
        }
    }

    #[test]
    fn unknown_type_without_fallback_is_an_error() {
        let err = ShapeFactory::new()
            .create_shape("star", &ShapeAttributes::new(), 1.0)
            .unwrap_err();
        assert_eq!(err, ShapeError::UnknownShapeType("star".to_string()));
    }

    #[test]
    fn unknown_type_uses_configured_fallback() {
        let factory = ShapeFactory::new().with_fallback(Some(ShapeKind::Circle));
        let shape = factory
            .create_shape("star", &attributes(json!({"radius": 0.7})), 1.0)
            .unwrap();
        assert_eq!(shape.kind(), ShapeKind::Circle);
        assert!((circle_radius(shape) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let factory = ShapeFactory::new();
        let err = factory
            .create_shape("circle", &attributes(json!({"radius": "wide"})), 1.0)
            .unwrap_err();
        assert!(matches!(err, ShapeError::InvalidAttribute { key, .. } if key == "radius"));

        let err = factory
            .create_shape("rectangle", &attributes(json!({"height": -1.0})), 1.0)
            .unwrap_err();
        assert!(matches!(err, ShapeError::InvalidAttribute { key, .. } if key == "height"));

        let err = factory
            .create_shape("circle", &ShapeAttributes::new(), 0.0)
            .unwrap_err();
        assert_eq!(err, ShapeError::InvalidScale(0.0));
    }
}
