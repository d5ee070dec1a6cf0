use std::path::PathBuf;

use lodgraph_config::{AppConfig, ConfigError};
use lodgraph_core::factory::ShapeFactory;
use lodgraph_engine::detail::LevelOfDetailEngine;
use lodgraph_engine::mode::DetailConstants;
use lodgraph_engine::scene::{Scene, ZoomLimits};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

mod report;

fn main() {
    let mut args = std::env::args().skip(1);
    let mut config_override: Option<PathBuf> = None;
    let mut zooms: Vec<f64> = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let Some(path) = args.next() else {
                    eprintln!("`--config` 需要提供配置文件路径");
                    std::process::exit(1);
                };
                config_override = Some(PathBuf::from(path));
            }
            "--zoom" => {
                let Some(raw) = args.next() else {
                    eprintln!("`--zoom` 需要提供缩放值");
                    std::process::exit(1);
                };
                match raw.parse::<f64>() {
                    Ok(zoom) if zoom.is_finite() => zooms.push(zoom),
                    _ => {
                        eprintln!("无效的缩放值：{raw}");
                        std::process::exit(1);
                    }
                }
            }
            other => {
                eprintln!("未知参数：{other}");
                std::process::exit(1);
            }
        }
    }

    let (config, fallback_error) = load_configuration(config_override);
    init_logging(&config);
    if let Some(err) = &fallback_error {
        report_fallback(err);
    }
    info!("启动 lodgraph 演示");

    let factory = shape_factory(&config);
    let lod = LevelOfDetailEngine::new(DetailConstants {
        expanded_background_opacity: config.detail.expanded_background_opacity,
        collapsed_background_opacity: config.detail.collapsed_background_opacity,
    });
    let limits = ZoomLimits {
        min: config.viewport.min_zoom,
        max: config.viewport.max_zoom,
    };
    let mut scene = Scene::with_engine(lod, limits);

    if let Err(err) = report::run(&mut scene, &factory, &zooms, config.viewport.zoom_step) {
        error!(error = %err, "执行 LOD 演示失败");
        std::process::exit(1);
    }
}

fn load_configuration(override_path: Option<PathBuf>) -> (AppConfig, Option<ConfigError>) {
    let loaded = match override_path {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::discover(),
    };
    match loaded {
        Ok(cfg) => (cfg, None),
        Err(err) => (AppConfig::default(), Some(err)),
    }
}

/// 日志初始化之后再报告配置回退，保证警告可见。
fn report_fallback(err: &ConfigError) {
    match err {
        ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
            warn!(path = %path.display(), error = %err, "加载配置失败，使用内建默认值");
        }
        ConfigError::Context { .. } | ConfigError::Invalid { .. } => {
            warn!(error = %err, "加载配置失败，使用内建默认值");
        }
    }
}

fn shape_factory(config: &AppConfig) -> ShapeFactory {
    let fallback = config.shapes.fallback_kind().unwrap_or_else(|err| {
        warn!(error = %err, "忽略无效的回退形状");
        None
    });
    ShapeFactory::new()
        .with_default_radius(config.shapes.default_radius)
        .with_fallback(fallback)
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
