use std::collections::HashMap;

use lodgraph_core::constants::DEFAULT_ZOOM_STEP;
use lodgraph_core::geometry::Point2;
use tracing::debug;

use crate::scene::{EntityId, Scene};

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub success: bool,
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse;
}

pub struct CommandContext<'a> {
    pub scene: &'a mut Scene,
    /// 未显式给出步长时使用的 zoom 增量。
    pub zoom_step: f64,
}

impl<'a> CommandContext<'a> {
    pub fn new(scene: &'a mut Scene) -> Self {
        Self {
            scene,
            zoom_step: DEFAULT_ZOOM_STEP,
        }
    }
}

pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(ZoomCommand::In);
        bus.register(ZoomCommand::Out);
        bus.register(ResetViewCommand);
        bus.register(FocusNodeCommand);
        bus.register(FocusAtCommand);
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if let Some(handler) = self.handlers.get(request.name.as_str()) {
            debug!(command = %request.name, args = ?request.args, "分发命令");
            handler.execute(request, context)
        } else {
            CommandResponse::err(format!("未知命令: {}", request.name))
        }
    }

    pub fn available_commands(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

enum ZoomCommand {
    In,
    Out,
}

impl CommandHandler for ZoomCommand {
    fn name(&self) -> &'static str {
        match self {
            ZoomCommand::In => "zoom_in",
            ZoomCommand::Out => "zoom_out",
        }
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let step = match request.args.first() {
            Some(raw) => match raw.parse::<f64>() {
                Ok(step) if step.is_finite() && step > 0.0 => step,
                _ => return CommandResponse::err(format!("无效的缩放步长: {raw}")),
            },
            None => context.zoom_step,
        };
        let delta = match self {
            ZoomCommand::In => step,
            ZoomCommand::Out => -step,
        };
        context.scene.zoom_by(delta);
        CommandResponse::ok(format!("zoom = {:.3}", context.scene.viewport().zoom))
    }
}

struct ResetViewCommand;

impl CommandHandler for ResetViewCommand {
    fn name(&self) -> &'static str {
        "reset_view"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        context.scene.reset_viewport();
        CommandResponse::ok("视口已重置")
    }
}

/// `focus_node <id>`：聚焦指定节点的子树。
struct FocusNodeCommand;

impl CommandHandler for FocusNodeCommand {
    fn name(&self) -> &'static str {
        "focus_node"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let Some(raw) = request.args.first() else {
            return CommandResponse::err("focus_node 需要节点 ID");
        };
        let Ok(raw_id) = raw.parse::<u64>() else {
            return CommandResponse::err(format!("无效的节点 ID: {raw}"));
        };
        match context.scene.focus_on(EntityId::new(raw_id)) {
            Ok(()) => CommandResponse::ok(format!("视口已聚焦节点 #{raw_id}")),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

/// `focus_at <x> <y>`：命中测试选出可见的最深节点并聚焦其子树。
struct FocusAtCommand;

impl CommandHandler for FocusAtCommand {
    fn name(&self) -> &'static str {
        "focus_at"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let coords: Option<Vec<f64>> = request
            .args
            .iter()
            .map(|raw| raw.parse::<f64>().ok().filter(|value| value.is_finite()))
            .collect();
        let Some(&[x, y]) = coords.as_deref() else {
            return CommandResponse::err(format!("focus_at 需要两个坐标: {:?}", request.args));
        };
        match context.scene.focus_at(Point2::new(x, y)) {
            Ok(Some(id)) => CommandResponse::ok(format!("视口已聚焦节点 #{}", id.get())),
            Ok(None) => CommandResponse::err(format!("({x}, {y}) 处没有可见节点")),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use lodgraph_core::factory::ShapeFactory;

    use super::*;
    use crate::scene::Scene;

    #[test]
    fn focus_commands_follow_hierarchy() {
        let mut scene = Scene::new();
        let ids = scene.populate_demo(&ShapeFactory::new()).unwrap();
        scene.set_viewport_zoom(3.0);

        let bus = CommandBus::new();
        let mut context = CommandContext::new(&mut scene);

        let request = CommandRequest::new("focus_at").with_arg("160").with_arg("5");
        let response = bus.dispatch(&request, &mut context);
        assert!(response.success);
        assert!((context.scene.viewport().center.x() - 150.0).abs() < 1e-9);

        let request = CommandRequest::new("focus_node").with_arg(ids.clusters[0].get().to_string());
        assert!(bus.dispatch(&request, &mut context).success);
        assert!((context.scene.viewport().center.x() + 150.0).abs() < 1e-9);

        let missing = CommandRequest::new("focus_at").with_arg("5000").with_arg("0");
        assert!(!bus.dispatch(&missing, &mut context).success);
        let malformed = CommandRequest::new("focus_at").with_arg("1");
        assert!(!bus.dispatch(&malformed, &mut context).success);
        let unknown = CommandRequest::new("focus_node").with_arg("999");
        assert!(!bus.dispatch(&unknown, &mut context).success);
        assert!((context.scene.viewport().center.x() + 150.0).abs() < 1e-9);
    }

    #[test]
    fn zoom_commands_apply_steps() {
        let mut scene = Scene::new();
        let bus = CommandBus::new();
        let mut context = CommandContext::new(&mut scene);
        context.zoom_step = 0.5;

        assert!(bus.dispatch(&CommandRequest::new("zoom_in"), &mut context).success);
        assert!((context.scene.viewport().zoom - 0.5).abs() < f64::EPSILON);

        let request = CommandRequest::new("zoom_out").with_arg("2");
        assert!(bus.dispatch(&request, &mut context).success);
        assert!((context.scene.viewport().zoom + 1.5).abs() < f64::EPSILON);

        let request = CommandRequest::new("zoom_in").with_arg("-1");
        let response = bus.dispatch(&request, &mut context);
        assert!(!response.success);
        assert!((context.scene.viewport().zoom + 1.5).abs() < f64::EPSILON);

        assert!(bus.dispatch(&CommandRequest::new("reset_view"), &mut context).success);
        assert_eq!(context.scene.viewport().zoom, 0.0);
    }

    #[test]
    fn unknown_command_fails() {
        let mut scene = Scene::new();
        let bus = CommandBus::new();
        let mut context = CommandContext::new(&mut scene);
        let response = bus.dispatch(&CommandRequest::new("explode"), &mut context);
        assert!(!response.success);
        assert_eq!(bus.available_commands().count(), 5);
    }
}
