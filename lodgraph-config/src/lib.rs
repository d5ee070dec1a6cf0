use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use lodgraph_core::constants::{
    DEFAULT_COLLAPSED_BACKGROUND_OPACITY, DEFAULT_EXPANDED_BACKGROUND_OPACITY,
    DEFAULT_NODE_RADIUS, DEFAULT_ZOOM_STEP, MAX_ZOOM, MIN_ZOOM,
};
use lodgraph_core::shape::ShapeKind;
use serde::Deserialize;
use thiserror::Error;

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub detail: DetailConfig,
    #[serde(default)]
    pub shapes: ShapeConfig,
    #[serde(default)]
    pub viewport: ViewportConfig,
}

impl AppConfig {
    /// 从显式路径加载并校验配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 自动发现配置文件：优先读取环境变量 `LODGRAPH_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os("LODGRAPH_CONFIG") {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// 检查数值范围与形状名称。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let opacities = [
            (
                "detail.expanded_background_opacity",
                self.detail.expanded_background_opacity,
            ),
            (
                "detail.collapsed_background_opacity",
                self.detail.collapsed_background_opacity,
            ),
        ];
        for (key, value) in opacities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid {
                    message: format!("{key} 必须位于 [0, 1] 区间，当前为 {value}"),
                });
            }
        }
        if !self.shapes.default_radius.is_finite() || self.shapes.default_radius <= 0.0 {
            return Err(ConfigError::Invalid {
                message: format!(
                    "shapes.default_radius 必须为正数，当前为 {}",
                    self.shapes.default_radius
                ),
            });
        }
        self.shapes.fallback_kind()?;
        let viewport = &self.viewport;
        if !viewport.min_zoom.is_finite()
            || !viewport.max_zoom.is_finite()
            || viewport.min_zoom > viewport.max_zoom
        {
            return Err(ConfigError::Invalid {
                message: format!(
                    "viewport 缩放范围无效: [{}, {}]",
                    viewport.min_zoom, viewport.max_zoom
                ),
            });
        }
        if !viewport.zoom_step.is_finite() || viewport.zoom_step <= 0.0 {
            return Err(ConfigError::Invalid {
                message: format!("viewport.zoom_step 必须为正数，当前为 {}", viewport.zoom_step),
            });
        }
        Ok(())
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 细节层级的背景透明度。
#[derive(Debug, Clone, Deserialize)]
pub struct DetailConfig {
    #[serde(default = "DetailConfig::default_expanded")]
    pub expanded_background_opacity: f64,
    #[serde(default = "DetailConfig::default_collapsed")]
    pub collapsed_background_opacity: f64,
}

impl DetailConfig {
    fn default_expanded() -> f64 {
        DEFAULT_EXPANDED_BACKGROUND_OPACITY
    }

    fn default_collapsed() -> f64 {
        DEFAULT_COLLAPSED_BACKGROUND_OPACITY
    }
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            expanded_background_opacity: Self::default_expanded(),
            collapsed_background_opacity: Self::default_collapsed(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShapeConfig {
    #[serde(default = "ShapeConfig::default_radius")]
    pub default_radius: f64,
    /// 未知形状类型的回退形状；缺省时未知类型视为错误。
    #[serde(default)]
    pub unknown_type_fallback: Option<String>,
}

impl ShapeConfig {
    fn default_radius() -> f64 {
        DEFAULT_NODE_RADIUS
    }

    /// 解析回退形状名称；未配置时返回 `None`。
    pub fn fallback_kind(&self) -> Result<Option<ShapeKind>, ConfigError> {
        self.unknown_type_fallback
            .as_deref()
            .map(|raw| {
                raw.parse::<ShapeKind>().map_err(|_| ConfigError::Invalid {
                    message: format!("shapes.unknown_type_fallback 不是已知形状: {raw}"),
                })
            })
            .transpose()
    }
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            default_radius: Self::default_radius(),
            unknown_type_fallback: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewportConfig {
    #[serde(default = "ViewportConfig::default_min_zoom")]
    pub min_zoom: f64,
    #[serde(default = "ViewportConfig::default_max_zoom")]
    pub max_zoom: f64,
    #[serde(default = "ViewportConfig::default_zoom_step")]
    pub zoom_step: f64,
}

impl ViewportConfig {
    fn default_min_zoom() -> f64 {
        MIN_ZOOM
    }

    fn default_max_zoom() -> f64 {
        MAX_ZOOM
    }

    fn default_zoom_step() -> f64 {
        DEFAULT_ZOOM_STEP
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_zoom: Self::default_min_zoom(),
            max_zoom: Self::default_max_zoom(),
            zoom_step: Self::default_zoom_step(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
    #[error("配置无效: {message}")]
    Invalid { message: String },
}
