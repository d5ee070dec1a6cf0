use std::collections::BTreeSet;

use lodgraph_core::factory::ShapeFactory;
use lodgraph_engine::command::{CommandBus, CommandContext, CommandRequest, CommandResponse};
use lodgraph_engine::detail::DetailState;
use lodgraph_engine::errors::EngineError;
use lodgraph_engine::scene::{EntityId, Scene};
use tracing::{info, warn};

const SWEEP_START: f64 = -2.0;
const SWEEP_END: f64 = 12.0;
const FOCUS_ZOOM: f64 = 3.0;
const FOCUS_POINT: (f64, f64) = (150.0, 0.0);

/// 某个缩放下整个场景的细节快照。
#[derive(Debug, Clone)]
pub struct ZoomSnapshot {
    pub zoom: f64,
    pub scale: f64,
    pub visible_layers: BTreeSet<u32>,
    pub nodes: Vec<NodeRow>,
}

#[derive(Debug, Clone)]
pub struct NodeRow {
    pub id: EntityId,
    pub label: String,
    pub layer: u32,
    pub state: DetailState,
}

/// 构建演示层级，依次在给定缩放（缺省时为 -2..=12 的整数扫描）下打印各节点的渲染状态。
pub fn run(
    scene: &mut Scene,
    factory: &ShapeFactory,
    zooms: &[f64],
    zoom_step: f64,
) -> Result<(), EngineError> {
    let ids = scene.populate_demo(factory)?;
    println!("lodgraph 细节层级演示");
    println!(
        "  - 根节点 ID = {}, 簇 ID = {}, {}",
        ids.root.get(),
        ids.clusters[0].get(),
        ids.clusters[1].get()
    );

    let violations = scene.validate_hierarchy();
    if violations.is_empty() {
        println!("层级校验通过：所有子节点均位于父节点内。");
    } else {
        for violation in &violations {
            println!(
                "层级校验失败：子节点 {} 超出父节点 {}",
                violation.child.get(),
                violation.parent.get()
            );
        }
    }

    let bus = CommandBus::new();
    let mut context = CommandContext::new(scene);
    context.zoom_step = zoom_step;
    let commands: Vec<&str> = bus.available_commands().copied().collect();
    println!("支持的命令: {}", commands.join(", "));

    // 放大到簇层可见后，以东侧簇中心做命中测试并聚焦其子树
    dispatch(
        &bus,
        CommandRequest::new("zoom_in").with_arg(FOCUS_ZOOM.to_string()),
        &mut context,
    );
    let response = dispatch(
        &bus,
        CommandRequest::new("focus_at")
            .with_arg(FOCUS_POINT.0.to_string())
            .with_arg(FOCUS_POINT.1.to_string()),
        &mut context,
    );
    let viewport = context.scene.viewport();
    println!(
        "{} 视口中心=({:.2}, {:.2})",
        response.message.as_deref().unwrap_or("聚焦失败"),
        viewport.center.x(),
        viewport.center.y()
    );

    if zooms.is_empty() {
        dispatch(&bus, CommandRequest::new("reset_view"), &mut context);
        dispatch(
            &bus,
            CommandRequest::new("zoom_out").with_arg((-SWEEP_START).to_string()),
            &mut context,
        );
        loop {
            print_snapshot(&snapshot(context.scene)?);
            let before = context.scene.viewport().zoom;
            if before >= SWEEP_END {
                break;
            }
            dispatch(
                &bus,
                CommandRequest::new("zoom_in").with_arg("1"),
                &mut context,
            );
            // 到达缩放上限后不再前进
            if context.scene.viewport().zoom <= before {
                break;
            }
        }
    } else {
        for &zoom in zooms {
            context.scene.set_viewport_zoom(zoom);
            print_snapshot(&snapshot(context.scene)?);
        }
    }
    info!(nodes = context.scene.node_count(), "LOD 演示完成");
    Ok(())
}

/// 当前视口下所有节点（含不可见节点）的渲染状态。
pub fn snapshot(scene: &Scene) -> Result<ZoomSnapshot, EngineError> {
    let viewport = scene.viewport();
    let lod = scene.lod();
    let visible_layers = lod.visible_layers(viewport.zoom)?;
    let mut nodes = Vec::with_capacity(scene.node_count());
    for (id, node) in scene.nodes() {
        nodes.push(NodeRow {
            id: *id,
            label: node.label.clone(),
            layer: node.layer,
            state: lod.detail_state_at(node.layer, viewport.zoom)?,
        });
    }
    Ok(ZoomSnapshot {
        zoom: viewport.zoom,
        scale: viewport.scale(),
        visible_layers,
        nodes,
    })
}

fn print_snapshot(snapshot: &ZoomSnapshot) {
    let layers: Vec<String> = snapshot
        .visible_layers
        .iter()
        .map(|layer| layer.to_string())
        .collect();
    println!(
        "zoom={:.2} scale={:.5} 可见图层=[{}]",
        snapshot.zoom,
        snapshot.scale,
        layers.join(", ")
    );
    for row in &snapshot.nodes {
        let state = &row.state;
        if !state.visible {
            println!("  - #{} {} (L{}): {}", row.id.get(), row.label, row.layer, state.mode);
            continue;
        }
        println!(
            "  - #{} {} (L{}): {} opacity={:.3} border={} ({:.2}, w{:.1}) bg={:.3}{}",
            row.id.get(),
            row.label,
            row.layer,
            state.mode,
            state.opacity,
            state.show_border,
            state.border_opacity,
            state.border_width,
            state.background_opacity,
            if state.label_inside { " label-inside" } else { "" }
        );
    }
}

fn dispatch(
    bus: &CommandBus,
    request: CommandRequest,
    context: &mut CommandContext<'_>,
) -> CommandResponse {
    let response = bus.dispatch(&request, context);
    if !response.success {
        warn!(
            command = %request.name,
            detail = response.message.as_deref().unwrap_or_default(),
            "命令执行失败"
        );
    }
    response
}
