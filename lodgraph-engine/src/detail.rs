//! 缩放驱动的细节层级（LOD）计算。
//!
//! 所有查询都是 `(图层, zoom, 分段表)` 的纯函数，不在帧之间保留状态。

use std::collections::BTreeSet;

use tracing::debug;

use crate::errors::EngineError;
use crate::mode::{DetailConstants, ModeStyle, PresentationMode};
use crate::segment::{SegmentTable, WindowSegment};

/// `scale = 2^(-zoom)`，放大时 scale 变小。
#[inline]
pub fn zoom_to_scale(zoom: f64) -> f64 {
    (-zoom).exp2()
}

#[inline]
pub fn scale_to_zoom(scale: f64) -> f64 {
    -scale.log2()
}

/// 单个实体在某一缩放下的渲染状态，每次查询重新计算。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetailState {
    pub mode: PresentationMode,
    pub visible: bool,
    pub opacity: f64,
    pub show_border: bool,
    pub border_opacity: f64,
    pub border_width: f64,
    pub background_opacity: f64,
    pub label_inside: bool,
}

pub fn classify_mode(zoom: f64, segment: &WindowSegment) -> PresentationMode {
    segment.mode_at_scale(zoom_to_scale(zoom))
}

/// 节点整体透明度。展开/收拢/折叠三种模式只改变背景透明度，节点本身保持不透明。
pub fn opacity_for_mode(mode: PresentationMode, zoom: f64, segment: &WindowSegment) -> f64 {
    let scale = zoom_to_scale(zoom);
    match mode {
        PresentationMode::Invisible => 0.0,
        PresentationMode::FadingIn => match segment.fading_in_min() {
            Some(min) => unit_fraction(scale, min, segment.expanded_min()),
            None => 1.0,
        },
        PresentationMode::Expanded | PresentationMode::Collapsing | PresentationMode::Collapsed => {
            1.0
        }
        // 零宽淡出区与缺省边界一样直接跳过淡出
        PresentationMode::FadingOut => match segment.fading_out_max() {
            Some(max) if max > segment.collapsed_max() => {
                1.0 - unit_fraction(scale, segment.collapsed_max(), max)
            }
            _ => 1.0,
        },
    }
}

/// 收拢过程中的背景透明度：在 `expanded_max` 与 `collapsed_min` 之间由展开值过渡到折叠值。
pub fn collapsing_background_opacity(
    zoom: f64,
    segment: &WindowSegment,
    constants: &DetailConstants,
) -> f64 {
    let t = unit_fraction(
        zoom_to_scale(zoom),
        segment.expanded_max(),
        segment.collapsed_min(),
    );
    let expanded = constants.expanded_background_opacity;
    let collapsed = constants.collapsed_background_opacity;
    expanded + (collapsed - expanded) * t
}

/// `value` 在 `[start, end]` 中的相对位置，结果截断到 `[0, 1]`。
fn unit_fraction(value: f64, start: f64, end: f64) -> f64 {
    let span = end - start;
    if span == 0.0 {
        return if value >= end { 1.0 } else { 0.0 };
    }
    let t = (value - start) / span;
    if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) }
}

/// 细节层级引擎：持有外部构建的分段表，按图层与缩放给出渲染状态。
///
/// 分段表只通过 [`LevelOfDetailEngine::install_segments`] 整体替换，查询本身不修改任何状态，
/// 因此可以放在读写锁后被多个线程同时查询。
#[derive(Debug, Clone, Default)]
pub struct LevelOfDetailEngine {
    segments: Option<SegmentTable>,
    constants: DetailConstants,
}

impl LevelOfDetailEngine {
    pub fn new(constants: DetailConstants) -> Self {
        Self {
            segments: None,
            constants,
        }
    }

    #[inline]
    pub fn constants(&self) -> &DetailConstants {
        &self.constants
    }

    /// 替换分段表（层级或图层元数据变化后由比例尺组件调用）。
    pub fn install_segments(&mut self, table: SegmentTable) {
        debug!(
            layers = table.len(),
            max_layer = ?table.max_layer(),
            "已安装图层分段表"
        );
        self.segments = Some(table);
    }

    pub fn clear_segments(&mut self) {
        self.segments = None;
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.segments.is_some()
    }

    #[inline]
    pub fn segments(&self) -> Option<&SegmentTable> {
        self.segments.as_ref()
    }

    pub fn max_layer(&self) -> Option<u32> {
        self.segments.as_ref().and_then(SegmentTable::max_layer)
    }

    pub fn segment(&self, layer: u32) -> Result<&WindowSegment, EngineError> {
        let table = self
            .segments
            .as_ref()
            .ok_or(EngineError::SegmentNotInitialized)?;
        table.get(layer).ok_or(EngineError::MissingSegment(layer))
    }

    pub fn classify_layer(&self, layer: u32, zoom: f64) -> Result<PresentationMode, EngineError> {
        Ok(classify_mode(zoom, self.segment(layer)?))
    }

    pub fn detail_state_at(&self, layer: u32, zoom: f64) -> Result<DetailState, EngineError> {
        let segment = self.segment(layer)?;
        let mode = classify_mode(zoom, segment);
        let mut style = ModeStyle::for_mode(mode, &self.constants);
        if mode == PresentationMode::Collapsing {
            style.background_opacity = collapsing_background_opacity(zoom, segment, &self.constants);
        }
        Ok(DetailState {
            mode,
            visible: mode.is_visible(),
            opacity: opacity_for_mode(mode, zoom, segment),
            show_border: style.show_border,
            border_opacity: style.border_opacity,
            border_width: style.border_width,
            background_opacity: style.background_opacity,
            label_inside: style.label_inside,
        })
    }

    /// 当前缩放下可见的图层集合，供上游跳过不可见层的模拟与绘制。
    pub fn visible_layers(&self, zoom: f64) -> Result<BTreeSet<u32>, EngineError> {
        let table = self
            .segments
            .as_ref()
            .ok_or(EngineError::SegmentNotInitialized)?;
        let scale = zoom_to_scale(zoom);
        Ok(table
            .iter()
            .filter(|(_, segment)| segment.is_visible_at(scale))
            .map(|(layer, _)| layer)
            .collect())
    }
}
