//! 形状两两之间的几何判定。
//!
//! 每种形状组合使用闭式解，不支持旋转。

use glam::DVec2;

use crate::constants::ESCAPE_EPSILON;
use crate::geometry::{Point2, Vector2};
use crate::shape::{Shape, WorldSize};

/// 放置在世界坐标中的形状。
#[derive(Debug, Clone, Copy)]
pub struct PlacedShape<'a> {
    pub shape: &'a Shape,
    pub center: Point2,
    pub world_size: WorldSize,
}

impl<'a> PlacedShape<'a> {
    #[inline]
    pub fn new(shape: &'a Shape, center: Point2, world_size: WorldSize) -> Self {
        Self {
            shape,
            center,
            world_size,
        }
    }

    #[inline]
    fn radius(&self) -> f64 {
        self.world_size.radius()
    }

    #[inline]
    fn half_extents(&self) -> DVec2 {
        self.shape.half_extents(self.world_size)
    }

    #[inline]
    fn offset_from(&self, other: &PlacedShape<'_>) -> DVec2 {
        self.center.as_vec2() - other.center.as_vec2()
    }
}

/// 内部形状相对外部形状的逃逸方向。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EscapeVector {
    pub dx: f64,
    pub dy: f64,
    pub distance: f64,
}

impl EscapeVector {
    /// 单位方向向量。
    pub fn direction(&self) -> Vector2 {
        Vector2::new(self.dx / self.distance, self.dy / self.distance)
    }
}

/// `inner` 是否完整落在 `outer` 内。`margin` 按比例收缩外部边界（1.0 表示不收缩）。
pub fn is_inside(inner: &PlacedShape<'_>, outer: &PlacedShape<'_>, margin: f64) -> bool {
    let offset = inner.offset_from(outer);
    match (inner.shape, outer.shape) {
        (Shape::Circle(_), Shape::Circle(_)) => {
            offset.length() + inner.radius() <= outer.radius() * margin
        }
        (Shape::Circle(_), Shape::Rectangle(_)) => {
            let outer_half = outer.half_extents() * margin;
            let radius = inner.radius();
            offset.x.abs() + radius <= outer_half.x && offset.y.abs() + radius <= outer_half.y
        }
        (Shape::Rectangle(_), Shape::Rectangle(_)) => {
            let outer_half = outer.half_extents() * margin;
            let inner_half = inner.half_extents();
            offset.x.abs() + inner_half.x <= outer_half.x
                && offset.y.abs() + inner_half.y <= outer_half.y
        }
        (Shape::Rectangle(_), Shape::Circle(_)) => {
            let half = inner.half_extents();
            let limit = outer.radius() * margin;
            let limit_squared = limit * limit;
            [
                DVec2::new(half.x, half.y),
                DVec2::new(-half.x, half.y),
                DVec2::new(half.x, -half.y),
                DVec2::new(-half.x, -half.y),
            ]
            .into_iter()
            .all(|corner| (offset + corner).length_squared() <= limit_squared)
        }
    }
}

/// 两个形状是否相交，仅接触不算相交。
pub fn intersects(a: &PlacedShape<'_>, b: &PlacedShape<'_>) -> bool {
    match (a.shape, b.shape) {
        (Shape::Circle(_), Shape::Circle(_)) => {
            let reach = a.radius() + b.radius();
            a.center.distance_squared(b.center) < reach * reach
        }
        (Shape::Circle(_), Shape::Rectangle(_)) => circle_intersects_rectangle(a, b),
        (Shape::Rectangle(_), Shape::Circle(_)) => circle_intersects_rectangle(b, a),
        (Shape::Rectangle(_), Shape::Rectangle(_)) => {
            let offset = a.offset_from(b).abs();
            let reach = a.half_extents() + b.half_extents();
            offset.x < reach.x && offset.y < reach.y
        }
    }
}

fn circle_intersects_rectangle(circle: &PlacedShape<'_>, rect: &PlacedShape<'_>) -> bool {
    let half = rect.half_extents();
    let local = circle.offset_from(rect);
    let closest = local.clamp(-half, half);
    let radius = circle.radius();
    (local - closest).length_squared() < radius * radius
}

/// 从外部形状中心指向内部形状中心的向量；两中心几乎重合时没有定义方向。
pub fn escape_vector(inner: &PlacedShape<'_>, outer: &PlacedShape<'_>) -> Option<EscapeVector> {
    let offset = inner.offset_from(outer);
    let distance = offset.length();
    if distance < ESCAPE_EPSILON {
        return None;
    }
    Some(EscapeVector {
        dx: offset.x,
        dy: offset.y,
        distance,
    })
}
