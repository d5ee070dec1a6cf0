use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use glam::DVec2;

use crate::constants::{BASE_UNIT_TO_PIXELS, CONSTRAINT_DAMPING, HITBOX_SCALE};
use crate::errors::ShapeError;
use crate::geometry::{Bounds2D, Point2, Vector2};

/// 世界坐标下的形状尺寸（外接圆直径）。
///
/// 与形状内部保存的归一化尺寸区分开，避免两种单位混用。
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct WorldSize(f64);

impl WorldSize {
    #[inline]
    pub fn new(value: f64) -> Self {
        Self(value.abs())
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn radius(self) -> f64 {
        self.0 * 0.5
    }

    #[inline]
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.0 * factor)
    }
}

/// 形状类型标签，对应工厂接收的字符串。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Circle,
    Rectangle,
}

impl ShapeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Circle => "circle",
            ShapeKind::Rectangle => "rectangle",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShapeKind {
    type Err = ShapeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "circle" => Ok(ShapeKind::Circle),
            "rectangle" => Ok(ShapeKind::Rectangle),
            _ => Err(ShapeError::UnknownShapeType(value.to_string())),
        }
    }
}

/// 圆形，半径为归一化单位。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    radius: f64,
}

impl Circle {
    #[inline]
    pub fn new(radius: f64) -> Self {
        Self {
            radius: radius.abs(),
        }
    }

    #[inline]
    pub fn radius(&self) -> f64 {
        self.radius
    }
}

/// 可带圆角的轴对齐矩形，尺寸为归一化单位。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    width: f64,
    height: f64,
    corner_radius: f64,
}

impl Rectangle {
    /// 圆角半径会被限制在短边的一半以内。
    pub fn new(width: f64, height: f64, corner_radius: f64) -> Self {
        let width = width.abs();
        let height = height.abs();
        let corner_radius = corner_radius.abs().min(width.min(height) * 0.5);
        Self {
            width,
            height,
            corner_radius,
        }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.height
    }

    #[inline]
    pub fn corner_radius(&self) -> f64 {
        self.corner_radius
    }
}

/// 物理约束修正：回拉后的位置与反射衰减后的速度。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstraintCorrection {
    pub position: Point2,
    pub velocity: Vector2,
}

/// 节点形状。尺寸在构造后不可变，世界尺寸由外部的累计缩放换算。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle(Circle),
    Rectangle(Rectangle),
}

impl Shape {
    #[inline]
    pub fn circle(radius: f64) -> Self {
        Shape::Circle(Circle::new(radius))
    }

    #[inline]
    pub fn rectangle(width: f64, height: f64, corner_radius: f64) -> Self {
        Shape::Rectangle(Rectangle::new(width, height, corner_radius))
    }

    #[inline]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Circle(_) => ShapeKind::Circle,
            Shape::Rectangle(_) => ShapeKind::Rectangle,
        }
    }

    /// 归一化面积。
    pub fn area(&self) -> f64 {
        match self {
            Shape::Circle(circle) => PI * circle.radius * circle.radius,
            Shape::Rectangle(rect) => rect.width * rect.height,
        }
    }

    /// 归一化外接圆直径，矩形取对角线长度。
    pub fn diameter(&self) -> f64 {
        match self {
            Shape::Circle(circle) => circle.radius * 2.0,
            Shape::Rectangle(rect) => rect.width.hypot(rect.height),
        }
    }

    pub fn world_size(&self, cumulative_scale: f64) -> WorldSize {
        WorldSize::new(self.diameter() * BASE_UNIT_TO_PIXELS / cumulative_scale)
    }

    pub fn world_area(&self, cumulative_scale: f64) -> f64 {
        let factor = BASE_UNIT_TO_PIXELS / cumulative_scale;
        self.area() * factor * factor
    }

    /// 给定世界尺寸下的宽高。
    pub fn world_extents(&self, world_size: WorldSize) -> DVec2 {
        match self {
            Shape::Circle(_) => DVec2::splat(world_size.get()),
            Shape::Rectangle(rect) => {
                DVec2::new(rect.width, rect.height) * self.normalized_to_world(world_size)
            }
        }
    }

    #[inline]
    pub fn half_extents(&self, world_size: WorldSize) -> DVec2 {
        self.world_extents(world_size) * 0.5
    }

    pub fn bounds(&self, center: Point2, world_size: WorldSize) -> Bounds2D {
        let extents = self.world_extents(world_size);
        Bounds2D::from_center(center, extents.x, extents.y)
    }

    /// 从中心指向 `target` 的射线与形状边界的交点。`target` 与中心重合时返回中心。
    pub fn border_point(&self, center: Point2, target: Point2, world_size: WorldSize) -> Point2 {
        let direction = center.vector_to(target).as_vec2();
        if direction.length_squared() <= f64::EPSILON {
            return center;
        }
        let offset = match self {
            Shape::Circle(_) => direction.normalize() * world_size.radius(),
            Shape::Rectangle(rect) => {
                let factor = self.normalized_to_world(world_size);
                let half = DVec2::new(rect.width, rect.height) * factor * 0.5;
                rectangle_border_offset(half, rect.corner_radius * factor, direction)
            }
        };
        Point2::from_vec(center.as_vec2() + offset)
    }

    /// 视觉/物理边界内的点判定。矩形只做轴向检查，不考虑圆角与旋转。
    pub fn is_inside(&self, point: Point2, center: Point2, world_size: WorldSize) -> bool {
        match self {
            Shape::Circle(_) => {
                let radius = world_size.radius();
                point.distance_squared(center) <= radius * radius
            }
            Shape::Rectangle(_) => {
                let half = self.half_extents(world_size);
                let delta = (point.as_vec2() - center.as_vec2()).abs();
                delta.x <= half.x && delta.y <= half.y
            }
        }
    }

    /// 指针命中判定，使用放大 10% 的命中区域。
    pub fn contains_point(&self, point: Point2, center: Point2, world_size: WorldSize) -> bool {
        self.is_inside(point, center, world_size.scaled(HITBOX_SCALE))
    }

    /// 把越界点拉回边界内侧，并反射衰减速度；点已在形状内时返回 `None`。
    pub fn enforce_constraint(
        &self,
        point: Point2,
        velocity: Vector2,
        center: Point2,
        world_size: WorldSize,
        margin: f64,
    ) -> Option<ConstraintCorrection> {
        if self.is_inside(point, center, world_size) {
            return None;
        }
        let border = self.border_point(center, point, world_size);
        let pulled = center.vector_to(border).scale(margin);
        Some(ConstraintCorrection {
            position: center.translate(pulled),
            velocity: velocity.scale(CONSTRAINT_DAMPING),
        })
    }

    fn normalized_to_world(&self, world_size: WorldSize) -> f64 {
        let diameter = self.diameter();
        if diameter > 0.0 {
            world_size.get() / diameter
        } else {
            0.0
        }
    }
}

fn rectangle_border_offset(half: DVec2, corner_radius: f64, direction: DVec2) -> DVec2 {
    let tx = if direction.x != 0.0 {
        half.x / direction.x.abs()
    } else {
        f64::INFINITY
    };
    let ty = if direction.y != 0.0 {
        half.y / direction.y.abs()
    } else {
        f64::INFINITY
    };
    let hit = direction * tx.min(ty);

    let radius = corner_radius.min(half.x).min(half.y);
    if radius > 0.0 && hit.x.abs() > half.x - radius && hit.y.abs() > half.y - radius {
        let arc_center = DVec2::new(
            hit.x.signum() * (half.x - radius),
            hit.y.signum() * (half.y - radius),
        );
        if let Some(t) = ray_circle_exit(direction, arc_center, radius) {
            return direction * t;
        }
    }
    hit
}

/// 原点出发的射线离开圆的参数，射线与圆不相交时返回 `None`。
fn ray_circle_exit(direction: DVec2, center: DVec2, radius: f64) -> Option<f64> {
    let a = direction.length_squared();
    let b = direction.dot(center);
    let c = center.length_squared() - radius * radius;
    let discriminant = b * b - a * c;
    if a <= 0.0 || discriminant < 0.0 {
        return None;
    }
    Some((b + discriminant.sqrt()) / a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_CONSTRAINT_MARGIN;

    fn origin() -> Point2 {
        Point2::new(0.0, 0.0)
    }

    #[test]
    fn area_and_diameter_follow_shape_kind() {
        let circle = Shape::circle(2.0);
        assert!((circle.area() - 4.0 * PI).abs() < 1e-9);
        assert!((circle.diameter() - 4.0).abs() < 1e-9);

        let rect = Shape::rectangle(3.0, 4.0, 0.0);
        assert!((rect.area() - 12.0).abs() < 1e-9);
        assert!((rect.diameter() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn world_size_divides_by_cumulative_scale() {
        let circle = Shape::circle(0.5);
        assert!((circle.world_size(1.0).get() - BASE_UNIT_TO_PIXELS).abs() < 1e-9);
        assert!((circle.world_size(4.0).get() - BASE_UNIT_TO_PIXELS / 4.0).abs() < 1e-9);

        let rect = Shape::rectangle(1.0, 2.0, 0.0);
        let factor = BASE_UNIT_TO_PIXELS / 2.0;
        assert!((rect.world_area(2.0) - 2.0 * factor * factor).abs() < 1e-6);
    }

    #[test]
    fn rectangle_world_extents_keep_aspect_ratio() {
        let rect = Shape::rectangle(3.0, 4.0, 0.0);
        let extents = rect.world_extents(WorldSize::new(50.0));
        assert!((extents.x - 30.0).abs() < 1e-9);
        assert!((extents.y - 40.0).abs() < 1e-9);

        let bounds = rect.bounds(Point2::new(10.0, 10.0), WorldSize::new(50.0));
        assert!((bounds.min().x() + 5.0).abs() < 1e-9);
        assert!((bounds.max().y() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn circle_containment_round_trip() {
        let circle = Shape::circle(1.0);
        let r = 7.5;
        let size = WorldSize::new(2.0 * r);
        assert!(circle.is_inside(Point2::new(r * 0.99, 0.0), origin(), size));
        assert!(!circle.is_inside(Point2::new(r * 1.01, 0.0), origin(), size));
    }

    #[test]
    fn contains_point_uses_larger_hitbox() {
        let circle = Shape::circle(1.0);
        let size = WorldSize::new(20.0);
        let point = Point2::new(10.5, 0.0);
        assert!(!circle.is_inside(point, origin(), size));
        assert!(circle.contains_point(point, origin(), size));
        assert!(!circle.contains_point(Point2::new(11.5, 0.0), origin(), size));

        let rect = Shape::rectangle(2.0, 1.0, 0.0);
        let size = rect.world_size(1.0);
        let half = rect.half_extents(size);
        let edge = Point2::new(half.x * 1.05, 0.0);
        assert!(!rect.is_inside(edge, origin(), size));
        assert!(rect.contains_point(edge, origin(), size));
    }

    #[test]
    fn border_point_lies_on_boundary() {
        let shapes = [
            Shape::circle(1.0),
            Shape::rectangle(2.0, 1.0, 0.0),
            Shape::rectangle(1.0, 3.0, 0.0),
        ];
        let center = Point2::new(3.0, -2.0);
        let targets = [
            Point2::new(10.0, -2.0),
            Point2::new(3.0, 5.0),
            Point2::new(-4.0, 1.0),
            Point2::new(5.0, -9.0),
        ];
        for shape in shapes {
            let size = WorldSize::new(40.0);
            for target in targets {
                let inner = shape.border_point(center, target, size.scaled(0.999));
                let outer = shape.border_point(center, target, size.scaled(1.001));
                assert!(
                    shape.is_inside(inner, center, size),
                    "{shape:?} 边界点应在内部: {inner:?}"
                );
                assert!(
                    !shape.is_inside(outer, center, size),
                    "{shape:?} 边界点应在外部: {outer:?}"
                );
            }
        }
    }

    #[test]
    fn rectangle_border_point_hits_flat_edge() {
        let rect = Shape::rectangle(4.0, 2.0, 0.0);
        let size = WorldSize::new(rect.diameter());
        let point = rect.border_point(origin(), Point2::new(10.0, 1.0), size);
        assert!((point.x() - 2.0).abs() < 1e-9);
        assert!((point.y() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn rounded_corner_uses_arc_intersection() {
        let rect = Shape::rectangle(2.0, 2.0, 0.5);
        let size = WorldSize::new(rect.diameter());
        let point = rect.border_point(origin(), Point2::new(5.0, 5.0), size);
        let expected = 0.5 + 0.5 / 2f64.sqrt();
        assert!((point.x() - expected).abs() < 1e-9);
        assert!((point.y() - expected).abs() < 1e-9);

        let arc_center = Point2::new(0.5, 0.5);
        assert!((point.distance_squared(arc_center).sqrt() - 0.5).abs() < 1e-9);

        let mirrored = rect.border_point(origin(), Point2::new(-5.0, -5.0), size);
        assert!((mirrored.x() + expected).abs() < 1e-9);
        assert!((mirrored.y() + expected).abs() < 1e-9);

        // 射线命中直边时不受圆角影响
        let flat = rect.border_point(origin(), Point2::new(5.0, 1.0), size);
        assert!((flat.x() - 1.0).abs() < 1e-9);
        assert!((flat.y() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn border_point_degenerate_returns_center() {
        let center = Point2::new(1.0, 2.0);
        for shape in [Shape::circle(1.0), Shape::rectangle(1.0, 1.0, 0.2)] {
            let point = shape.border_point(center, center, WorldSize::new(10.0));
            assert_eq!(point, center);
        }
    }

    #[test]
    fn enforce_constraint_pulls_point_back() {
        let circle = Shape::circle(1.0);
        let size = WorldSize::new(20.0);
        let inside = circle.enforce_constraint(
            Point2::new(1.0, 1.0),
            Vector2::new(3.0, 0.0),
            origin(),
            size,
            DEFAULT_CONSTRAINT_MARGIN,
        );
        assert!(inside.is_none());

        let correction = circle
            .enforce_constraint(
                Point2::new(30.0, 0.0),
                Vector2::new(4.0, -2.0),
                origin(),
                size,
                DEFAULT_CONSTRAINT_MARGIN,
            )
            .expect("越界点需要修正");
        assert!((correction.position.x() - 9.0).abs() < 1e-9);
        assert!(correction.position.y().abs() < 1e-9);
        assert!((correction.velocity.x() + 2.0).abs() < 1e-9);
        assert!((correction.velocity.y() - 1.0).abs() < 1e-9);
        assert!(circle.is_inside(correction.position, origin(), size));
    }

    #[test]
    fn rectangle_constraint_pulls_point_back() {
        let rect = Shape::rectangle(2.0, 1.0, 0.0);
        let size = WorldSize::new(rect.diameter());
        let inside = rect.enforce_constraint(
            Point2::new(0.5, 0.2),
            Vector2::new(1.0, 1.0),
            origin(),
            size,
            DEFAULT_CONSTRAINT_MARGIN,
        );
        assert!(inside.is_none());

        // 射线 (3, 0.5) 先碰到右边 x = 1，交点为 (1, 1/6)
        let correction = rect
            .enforce_constraint(
                Point2::new(3.0, 0.5),
                Vector2::new(2.0, -4.0),
                origin(),
                size,
                DEFAULT_CONSTRAINT_MARGIN,
            )
            .expect("越界点需要修正");
        assert!((correction.position.x() - 0.9).abs() < 1e-9);
        assert!((correction.position.y() - 0.15).abs() < 1e-9);
        assert!((correction.velocity.x() + 1.0).abs() < 1e-9);
        assert!((correction.velocity.y() - 2.0).abs() < 1e-9);
        assert!(rect.is_inside(correction.position, origin(), size));
    }

    #[test]
    fn rounded_corner_constraint_uses_arc() {
        let rect = Shape::rectangle(2.0, 2.0, 0.5);
        let size = WorldSize::new(rect.diameter());
        let correction = rect
            .enforce_constraint(
                Point2::new(5.0, 5.0),
                Vector2::new(-1.0, 3.0),
                origin(),
                size,
                DEFAULT_CONSTRAINT_MARGIN,
            )
            .expect("越界点需要修正");

        let on_arc = 0.5 + 0.5 / 2f64.sqrt();
        let expected = on_arc * DEFAULT_CONSTRAINT_MARGIN;
        assert!((correction.position.x() - expected).abs() < 1e-9);
        assert!((correction.position.y() - expected).abs() < 1e-9);
        // 修正点落在圆角弧内侧，而不是直角顶点方向
        let arc_center = Point2::new(0.5, 0.5);
        assert!(correction.position.distance_squared(arc_center) < 0.25);
        assert!(correction.position.x() < DEFAULT_CONSTRAINT_MARGIN);
        assert!((correction.velocity.x() - 0.5).abs() < 1e-9);
        assert!((correction.velocity.y() + 1.5).abs() < 1e-9);
        assert!(rect.is_inside(correction.position, origin(), size));
    }

    #[test]
    fn shape_kind_parses_case_insensitively() {
        assert_eq!("Circle".parse::<ShapeKind>(), Ok(ShapeKind::Circle));
        assert_eq!(" rectangle ".parse::<ShapeKind>(), Ok(ShapeKind::Rectangle));
        assert_eq!(ShapeKind::Rectangle.to_string(), "rectangle");
        assert!(matches!(
            "hexagon".parse::<ShapeKind>(),
            Err(ShapeError::UnknownShapeType(tag)) if tag == "hexagon"
        ));
    }

    #[test]
    fn rectangle_corner_radius_is_clamped() {
        let rect = Rectangle::new(2.0, 1.0, 3.0);
        assert!((rect.corner_radius() - 0.5).abs() < 1e-9);
    }
}
