use std::collections::BTreeMap;

use thiserror::Error;

use crate::errors::EngineError;
use crate::mode::PresentationMode;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SegmentError {
    #[error("boundary `{0}` must be finite")]
    NonFinite(&'static str),
    #[error("boundary `{lower}` ({lower_value}) exceeds `{upper}` ({upper_value})")]
    OutOfOrder {
        lower: &'static str,
        lower_value: f64,
        upper: &'static str,
        upper_value: f64,
    },
}

/// 单个图层在 scale 轴上的窗口分段。
///
/// 边界满足 `fading_in_min ≤ expanded_min ≤ expanded_max ≤ collapsed_min ≤ collapsed_max ≤ fading_out_max`。
/// 两端边界可缺省：缺省 `fading_in_min` 表示该层在 scale 变小时始终保持展开；
/// 缺省 `fading_out_max` 表示该层在 scale 变大时始终保持折叠。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSegment {
    fading_in_min: Option<f64>,
    expanded_min: f64,
    expanded_max: f64,
    collapsed_min: f64,
    collapsed_max: f64,
    fading_out_max: Option<f64>,
}

impl WindowSegment {
    pub fn new(
        fading_in_min: Option<f64>,
        expanded_min: f64,
        expanded_max: f64,
        collapsed_min: f64,
        collapsed_max: f64,
        fading_out_max: Option<f64>,
    ) -> Result<Self, SegmentError> {
        let named = [
            ("fading_in_min", fading_in_min),
            ("expanded_min", Some(expanded_min)),
            ("expanded_max", Some(expanded_max)),
            ("collapsed_min", Some(collapsed_min)),
            ("collapsed_max", Some(collapsed_max)),
            ("fading_out_max", fading_out_max),
        ];
        for (name, value) in named {
            if value.is_some_and(|value| !value.is_finite()) {
                return Err(SegmentError::NonFinite(name));
            }
        }

        let defined: Vec<(&'static str, f64)> = named
            .into_iter()
            .filter_map(|(name, value)| value.map(|value| (name, value)))
            .collect();
        for pair in defined.windows(2) {
            let (lower, lower_value) = pair[0];
            let (upper, upper_value) = pair[1];
            if lower_value > upper_value {
                return Err(SegmentError::OutOfOrder {
                    lower,
                    lower_value,
                    upper,
                    upper_value,
                });
            }
        }

        Ok(Self {
            fading_in_min,
            expanded_min,
            expanded_max,
            collapsed_min,
            collapsed_max,
            fading_out_max,
        })
    }

    /// 从比例尺组件输出的六元组构造，两端的 NaN 表示缺省边界。
    pub fn from_raw(bounds: [f64; 6]) -> Result<Self, SegmentError> {
        let optional = |value: f64| if value.is_nan() { None } else { Some(value) };
        Self::new(
            optional(bounds[0]),
            bounds[1],
            bounds[2],
            bounds[3],
            bounds[4],
            optional(bounds[5]),
        )
    }

    #[inline]
    pub fn fading_in_min(&self) -> Option<f64> {
        self.fading_in_min
    }

    #[inline]
    pub fn expanded_min(&self) -> f64 {
        self.expanded_min
    }

    #[inline]
    pub fn expanded_max(&self) -> f64 {
        self.expanded_max
    }

    #[inline]
    pub fn collapsed_min(&self) -> f64 {
        self.collapsed_min
    }

    #[inline]
    pub fn collapsed_max(&self) -> f64 {
        self.collapsed_max
    }

    #[inline]
    pub fn fading_out_max(&self) -> Option<f64> {
        self.fading_out_max
    }

    /// 可见窗口 `[lower, upper]`，缺省边界分别视为 0 与正无穷。
    pub fn visible_window(&self) -> (f64, f64) {
        (
            self.fading_in_min.unwrap_or(0.0),
            self.fading_out_max.unwrap_or(f64::INFINITY),
        )
    }

    pub fn is_visible_at(&self, scale: f64) -> bool {
        let (lower, upper) = self.visible_window();
        lower <= scale && scale <= upper
    }

    /// 在 scale 轴上定位所在的区段，0 与 6 分别是两端的不可见区。
    ///
    /// 各区段为左闭右开区间，唯独淡出区在 `fading_out_max` 处闭合，与 [`Self::is_visible_at`] 保持一致。
    pub fn band(&self, scale: f64) -> usize {
        if scale.is_nan() {
            return 6;
        }
        let below_fade_in = self.fading_in_min.is_some_and(|min| scale < min);
        let fading_in = self.fading_in_min.is_some() && scale < self.expanded_min;
        if below_fade_in {
            0
        } else if fading_in {
            1
        } else if scale < self.expanded_max {
            2
        } else if scale < self.collapsed_min {
            3
        } else if self.fading_out_max.is_none() || scale < self.collapsed_max {
            4
        } else if self.fading_out_max.is_some_and(|max| scale <= max) {
            5
        } else {
            6
        }
    }

    pub fn mode_at_scale(&self, scale: f64) -> PresentationMode {
        match self.band(scale) {
            1 => PresentationMode::FadingIn,
            2 => PresentationMode::Expanded,
            3 => PresentationMode::Collapsing,
            4 => PresentationMode::Collapsed,
            5 => PresentationMode::FadingOut,
            _ => PresentationMode::Invisible,
        }
    }
}

/// 图层到窗口分段的映射，由外部比例尺组件在层级变化时整体重建。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentTable {
    segments: BTreeMap<u32, WindowSegment>,
}

impl SegmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, layer: u32, segment: WindowSegment) -> Option<WindowSegment> {
        self.segments.insert(layer, segment)
    }

    /// 校验并插入原始六元组。
    pub fn insert_raw(&mut self, layer: u32, bounds: [f64; 6]) -> Result<(), EngineError> {
        let segment = WindowSegment::from_raw(bounds)
            .map_err(|source| EngineError::InvalidSegment { layer, source })?;
        self.segments.insert(layer, segment);
        Ok(())
    }

    #[inline]
    pub fn get(&self, layer: u32) -> Option<&WindowSegment> {
        self.segments.get(&layer)
    }

    #[inline]
    pub fn max_layer(&self) -> Option<u32> {
        self.segments.keys().next_back().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &WindowSegment)> + '_ {
        self.segments.iter().map(|(layer, segment)| (*layer, segment))
    }
}

impl FromIterator<(u32, WindowSegment)> for SegmentTable {
    fn from_iter<T: IntoIterator<Item = (u32, WindowSegment)>>(iter: T) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounded() -> WindowSegment {
        WindowSegment::new(Some(1.0), 2.0, 3.0, 4.0, 5.0, Some(6.0)).unwrap()
    }

    #[test]
    fn rejects_out_of_order_boundaries() {
        let err = WindowSegment::new(Some(1.0), 2.0, 1.5, 4.0, 5.0, Some(6.0)).unwrap_err();
        assert!(matches!(
            err,
            SegmentError::OutOfOrder {
                lower: "expanded_min",
                upper: "expanded_max",
                ..
            }
        ));

        let err = WindowSegment::new(Some(3.0), 2.0, 3.0, 4.0, 5.0, None).unwrap_err();
        assert!(matches!(err, SegmentError::OutOfOrder { lower: "fading_in_min", .. }));

        let err = WindowSegment::new(None, 2.0, 3.0, f64::INFINITY, 5.0, None).unwrap_err();
        assert_eq!(err, SegmentError::NonFinite("collapsed_min"));
    }

    #[test]
    fn raw_nan_marks_open_ends() {
        let segment = WindowSegment::from_raw([f64::NAN, 0.0, 1.0, 2.0, 3.0, f64::NAN]).unwrap();
        assert!(segment.fading_in_min().is_none());
        assert!(segment.fading_out_max().is_none());
        assert_eq!(segment.visible_window(), (0.0, f64::INFINITY));

        let err = WindowSegment::from_raw([0.0, f64::NAN, 1.0, 2.0, 3.0, 4.0]).unwrap_err();
        assert_eq!(err, SegmentError::NonFinite("expanded_min"));
    }

    #[test]
    fn bands_are_half_open_except_fade_out() {
        let segment = bounded();
        let expectations = [
            (0.5, 0),
            (1.0, 1),
            (2.0, 2),
            (3.0, 3),
            (4.0, 4),
            (5.0, 5),
            (6.0, 5),
            (6.5, 6),
            (f64::NAN, 6),
        ];
        for (scale, band) in expectations {
            assert_eq!(segment.band(scale), band, "scale = {scale}");
        }
    }

    #[test]
    fn open_ends_extend_neighbouring_modes() {
        let segment = WindowSegment::new(None, 2.0, 3.0, 4.0, 5.0, None).unwrap();
        assert_eq!(segment.mode_at_scale(0.0), PresentationMode::Expanded);
        assert_eq!(segment.mode_at_scale(1.0), PresentationMode::Expanded);
        assert_eq!(segment.mode_at_scale(5.0), PresentationMode::Collapsed);
        assert_eq!(segment.mode_at_scale(1e9), PresentationMode::Collapsed);
        assert_eq!(segment.mode_at_scale(f64::INFINITY), PresentationMode::Collapsed);
    }

    #[test]
    fn table_tracks_max_layer_and_validates_raw_input() {
        let mut table = SegmentTable::new();
        assert!(table.is_empty());
        assert_eq!(table.max_layer(), None);

        table.insert(3, bounded());
        table
            .insert_raw(1, [f64::NAN, 0.0, 1.0, 2.0, 3.0, 4.0])
            .expect("valid raw segment");
        assert_eq!(table.len(), 2);
        assert_eq!(table.max_layer(), Some(3));
        assert!(table.get(1).is_some());
        assert!(table.get(2).is_none());

        let err = table
            .insert_raw(2, [0.0, 1.0, 0.5, 2.0, 3.0, 4.0])
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidSegment { layer: 2, .. }));

        let layers: Vec<u32> = table.iter().map(|(layer, _)| layer).collect();
        assert_eq!(layers, vec![1, 3]);
    }
}
