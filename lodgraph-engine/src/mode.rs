use std::fmt;

use lodgraph_core::constants::{
    DEFAULT_COLLAPSED_BACKGROUND_OPACITY, DEFAULT_EXPANDED_BACKGROUND_OPACITY,
};

/// 图层在某一缩放下所处的呈现模式，沿 scale 轴依次排列：
/// `Invisible < FadingIn < Expanded < Collapsing < Collapsed < FadingOut < Invisible`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentationMode {
    Invisible,
    FadingIn,
    Expanded,
    Collapsing,
    Collapsed,
    FadingOut,
}

impl PresentationMode {
    pub const ALL: [PresentationMode; 6] = [
        PresentationMode::Invisible,
        PresentationMode::FadingIn,
        PresentationMode::Expanded,
        PresentationMode::Collapsing,
        PresentationMode::Collapsed,
        PresentationMode::FadingOut,
    ];

    #[inline]
    pub fn is_visible(self) -> bool {
        self != PresentationMode::Invisible
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PresentationMode::Invisible => "invisible",
            PresentationMode::FadingIn => "fading_in",
            PresentationMode::Expanded => "expanded",
            PresentationMode::Collapsing => "collapsing",
            PresentationMode::Collapsed => "collapsed",
            PresentationMode::FadingOut => "fading_out",
        }
    }
}

impl fmt::Display for PresentationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 展开/折叠两种状态的背景透明度，由配置注入。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetailConstants {
    pub expanded_background_opacity: f64,
    pub collapsed_background_opacity: f64,
}

impl Default for DetailConstants {
    fn default() -> Self {
        Self {
            expanded_background_opacity: DEFAULT_EXPANDED_BACKGROUND_OPACITY,
            collapsed_background_opacity: DEFAULT_COLLAPSED_BACKGROUND_OPACITY,
        }
    }
}

/// 单个模式的静态样式。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeStyle {
    pub show_border: bool,
    pub border_opacity: f64,
    pub border_width: f64,
    pub background_opacity: f64,
    pub label_inside: bool,
}

impl ModeStyle {
    /// 模式到样式的查找表。`Collapsing` 的背景透明度在引擎中按缩放插值后覆盖。
    pub fn for_mode(mode: PresentationMode, constants: &DetailConstants) -> Self {
        let expanded = constants.expanded_background_opacity;
        let collapsed = constants.collapsed_background_opacity;
        match mode {
            PresentationMode::Invisible => Self {
                show_border: false,
                border_opacity: 0.0,
                border_width: 0.0,
                background_opacity: 0.0,
                label_inside: false,
            },
            PresentationMode::FadingIn => Self {
                show_border: true,
                border_opacity: 0.5,
                border_width: 1.0,
                background_opacity: expanded,
                label_inside: false,
            },
            PresentationMode::Expanded => Self {
                show_border: true,
                border_opacity: 1.0,
                border_width: 2.0,
                background_opacity: expanded,
                label_inside: false,
            },
            PresentationMode::Collapsing => Self {
                show_border: true,
                border_opacity: 1.0,
                border_width: 1.5,
                background_opacity: expanded,
                label_inside: false,
            },
            PresentationMode::Collapsed => Self {
                show_border: true,
                border_opacity: 0.8,
                border_width: 1.0,
                background_opacity: collapsed,
                label_inside: true,
            },
            PresentationMode::FadingOut => Self {
                show_border: true,
                border_opacity: 0.5,
                border_width: 0.5,
                background_opacity: collapsed,
                label_inside: true,
            },
        }
    }
}
