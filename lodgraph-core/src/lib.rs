pub mod comparison;
pub mod factory;
pub mod shape;

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum ShapeError {
        #[error("unknown shape type `{0}`")]
        UnknownShapeType(String),
        #[error("invalid shape attribute `{key}`: {reason}")]
        InvalidAttribute { key: String, reason: String },
        #[error("scene scale must be finite and positive, got {0}")]
        InvalidScale(f64),
    }
}

/// 坐标系常量。除 `BASE_UNIT_TO_PIXELS` 外，其余默认值均可由配置覆盖。
pub mod constants {
    /// 归一化单位到世界像素的换算系数。
    pub const BASE_UNIT_TO_PIXELS: f64 = 100.0;
    /// 未给出尺寸属性时使用的归一化半径（直径 1.0）。
    pub const DEFAULT_NODE_RADIUS: f64 = 0.5;
    /// 展开状态的背景透明度。
    pub const DEFAULT_EXPANDED_BACKGROUND_OPACITY: f64 = 0.15;
    /// 折叠状态的背景透明度。
    pub const DEFAULT_COLLAPSED_BACKGROUND_OPACITY: f64 = 0.9;
    pub const MIN_ZOOM: f64 = -8.0;
    pub const MAX_ZOOM: f64 = 24.0;
    /// 缩放命令未给出步长时的 zoom 增量。
    pub const DEFAULT_ZOOM_STEP: f64 = 0.25;
    /// 缩放后的最小圆半径，避免退化形状。
    pub const MIN_SHAPE_RADIUS: f64 = 0.1;
    /// 指针命中判定使用的放大系数。
    pub const HITBOX_SCALE: f64 = 1.1;
    /// 越界点回拉到边界的比例。
    pub const DEFAULT_CONSTRAINT_MARGIN: f64 = 0.9;
    /// 越界时速度的反射阻尼。
    pub const CONSTRAINT_DAMPING: f64 = -0.5;
    /// 两中心距离小于该值时不定义逃逸方向。
    pub const ESCAPE_EPSILON: f64 = 0.001;
}

pub mod geometry {
    use glam::DVec2;

    /// 世界坐标中的二维点，内部以 `glam::DVec2` 表示。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn translate(self, offset: Vector2) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn vector_to(self, other: Point2) -> Vector2 {
            Vector2(other.0 - self.0)
        }

        #[inline]
        pub fn distance_squared(self, other: Point2) -> f64 {
            self.0.distance_squared(other.0)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量，用于速度、位移与逃逸方向。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_points(start: Point2, end: Point2) -> Self {
            Self(end.0 - start.0)
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn scale(self, factor: f64) -> Self {
            Self(self.0 * factor)
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 轴对齐边界框，用于估算实体/选中集范围。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        /// 以中心和宽高构造边界框。
        #[inline]
        pub fn from_center(center: Point2, width: f64, height: f64) -> Self {
            let half = DVec2::new(width.abs() * 0.5, height.abs() * 0.5);
            Self {
                min: Point2::from_vec(center.0 - half),
                max: Point2::from_vec(center.0 + half),
            }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        #[inline]
        pub fn width(&self) -> f64 {
            if self.is_empty() {
                0.0
            } else {
                self.max.x() - self.min.x()
            }
        }

        #[inline]
        pub fn height(&self) -> f64 {
            if self.is_empty() {
                0.0
            } else {
                self.max.y() - self.min.y()
            }
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            let min_vec = self.min.as_vec2();
            let max_vec = self.max.as_vec2();
            let center = (min_vec + max_vec) * 0.5;
            Point2::from_vec(center)
        }
    }

}
