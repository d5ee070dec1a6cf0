use std::collections::HashSet;

use lodgraph_core::comparison::{self, PlacedShape};
use lodgraph_core::constants::{MAX_ZOOM, MIN_ZOOM};
use lodgraph_core::factory::{ShapeAttributes, ShapeFactory};
use lodgraph_core::geometry::{Bounds2D, Point2, Vector2};
use lodgraph_core::shape::{Shape, WorldSize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::detail::{DetailState, LevelOfDetailEngine, zoom_to_scale};
use crate::errors::EngineError;
use crate::segment::SegmentTable;

pub const DEFAULT_ZOOM: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(u64);

impl EntityId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// 提供原始数值，便于日志输出。
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// 缩放范围（以 zoom 指数表示）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub min: f64,
    pub max: f64,
}

impl ZoomLimits {
    #[inline]
    fn clamp(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min, self.max)
    }
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: MIN_ZOOM,
            max: MAX_ZOOM,
        }
    }
}

/// 记录视口状态（中心点与 zoom）。
#[derive(Debug, Clone, Copy)]
pub struct ViewportState {
    pub center: Point2,
    pub zoom: f64,
}

impl ViewportState {
    #[inline]
    pub fn scale(&self) -> f64 {
        zoom_to_scale(self.zoom)
    }
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            center: Point2::new(0.0, 0.0),
            zoom: DEFAULT_ZOOM,
        }
    }
}

/// 层级图中的一个节点。`cumulative_scale` 由外部层级构建器在结构变化时重算。
#[derive(Debug, Clone)]
pub struct Node {
    pub label: String,
    pub layer: u32,
    pub position: Point2,
    pub cumulative_scale: f64,
    pub shape: Shape,
    pub parent: Option<EntityId>,
}

impl Node {
    pub fn new(
        label: impl Into<String>,
        layer: u32,
        position: Point2,
        cumulative_scale: f64,
        shape: Shape,
    ) -> Self {
        Self {
            label: label.into(),
            layer,
            position,
            cumulative_scale,
            shape,
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    #[inline]
    pub fn world_size(&self) -> WorldSize {
        self.shape.world_size(self.cumulative_scale)
    }

    #[inline]
    pub fn placed(&self) -> PlacedShape<'_> {
        PlacedShape::new(&self.shape, self.position, self.world_size())
    }

    #[inline]
    pub fn bounds(&self) -> Bounds2D {
        self.shape.bounds(self.position, self.world_size())
    }

    #[inline]
    pub fn contains_point(&self, point: Point2) -> bool {
        self.shape
            .contains_point(point, self.position, self.world_size())
    }
}

/// 子节点未被父节点完整包含。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HierarchyViolation {
    pub child: EntityId,
    pub parent: EntityId,
}

/// 引擎层负责维护节点集合、LOD 引擎与视口状态。
#[derive(Debug)]
pub struct Scene {
    nodes: Vec<(EntityId, Node)>,
    next_id: u64,
    viewport: ViewportState,
    limits: ZoomLimits,
    lod: LevelOfDetailEngine,
}

#[derive(Debug, Clone, Copy)]
pub struct DemoEntities {
    pub root: EntityId,
    pub clusters: [EntityId; 2],
    pub leaves: [EntityId; 4],
}

impl Scene {
    pub fn new() -> Self {
        Self::with_engine(LevelOfDetailEngine::default(), ZoomLimits::default())
    }

    pub fn with_engine(lod: LevelOfDetailEngine, limits: ZoomLimits) -> Self {
        Self {
            nodes: Vec::new(),
            next_id: 0,
            viewport: ViewportState::default(),
            limits,
            lod,
        }
    }

    /// 清空节点、选中集与分段表，视口回到默认状态。
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.next_id = 0;
        self.viewport = ViewportState::default();
        self.lod.clear_segments();
    }

    pub fn add_node(&mut self, node: Node) -> Result<EntityId, EngineError> {
        if !node.cumulative_scale.is_finite() || node.cumulative_scale <= 0.0 {
            return Err(EngineError::InvalidNode(format!(
                "cumulative scale of `{}` must be positive, got {}",
                node.label, node.cumulative_scale
            )));
        }
        if !node.position.x().is_finite() || !node.position.y().is_finite() {
            return Err(EngineError::InvalidNode(format!(
                "position of `{}` must be finite",
                node.label
            )));
        }
        if let Some(parent) = node.parent {
            if self.node(parent).is_none() {
                return Err(EngineError::EntityNotFound(parent.get()));
            }
        }
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        self.nodes.push((id, node));
        Ok(id)
    }

    /// 通过形状工厂构造节点形状后加入场景。
    pub fn spawn_node(
        &mut self,
        factory: &ShapeFactory,
        type_tag: &str,
        attributes: &ShapeAttributes,
        template: Node,
    ) -> Result<EntityId, EngineError> {
        let shape = factory.create_shape(type_tag, attributes, 1.0)?;
        self.add_node(Node { shape, ..template })
    }

    pub fn node(&self, id: EntityId) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|(candidate, _)| *candidate == id)
            .map(|(_, node)| node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &(EntityId, Node)> {
        self.nodes.iter()
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn lod(&self) -> &LevelOfDetailEngine {
        &self.lod
    }

    pub fn install_segments(&mut self, table: SegmentTable) {
        self.lod.install_segments(table);
    }

    /// 节点及其全部后代的包围盒。
    ///
    /// 父节点总是先于子节点加入，按插入顺序遍历一次即可收集整棵子树。
    pub fn subtree_bounds(&self, id: EntityId) -> Result<Bounds2D, EngineError> {
        if self.node(id).is_none() {
            return Err(EngineError::EntityNotFound(id.get()));
        }
        let mut members = HashSet::from([id]);
        let mut bounds = Bounds2D::empty();
        for (candidate, node) in &self.nodes {
            let in_subtree = members.contains(candidate)
                || node.parent.is_some_and(|parent| members.contains(&parent));
            if in_subtree {
                members.insert(*candidate);
                bounds.include_bounds(&node.bounds());
            }
        }
        Ok(bounds)
    }

    #[inline]
    pub fn viewport(&self) -> ViewportState {
        self.viewport
    }

    #[inline]
    pub fn zoom_limits(&self) -> ZoomLimits {
        self.limits
    }

    #[inline]
    pub fn reset_viewport(&mut self) {
        self.viewport = ViewportState::default();
    }

    #[inline]
    pub fn set_viewport_center(&mut self, center: Point2) {
        self.viewport.center = center;
    }

    pub fn pan_viewport(&mut self, delta: Vector2) {
        self.viewport.center = self.viewport.center.translate(delta);
    }

    /// 设置 zoom（自动限制在合法范围内，NaN 被忽略）。
    pub fn set_viewport_zoom(&mut self, zoom: f64) {
        if zoom.is_nan() {
            return;
        }
        self.viewport.zoom = self.limits.clamp(zoom);
    }

    /// 按增量调整 zoom。
    pub fn zoom_by(&mut self, delta: f64) {
        let current = self.viewport.zoom;
        let target = if delta.is_finite() {
            current + delta
        } else {
            current
        };
        self.set_viewport_zoom(target);
    }

    /// 视口中心移到节点子树的包围盒中心，zoom 保持不变。
    pub fn focus_on(&mut self, id: EntityId) -> Result<(), EngineError> {
        let center = self.subtree_bounds(id)?.center();
        self.viewport.center = center;
        debug!(node = id.get(), x = center.x(), y = center.y(), "视口已聚焦节点子树");
        Ok(())
    }

    /// 以命中测试选出当前可见的最深节点并聚焦其子树；未命中时视口不变。
    pub fn focus_at(&mut self, point: Point2) -> Result<Option<EntityId>, EngineError> {
        let Some(id) = self.hit_test(point)? else {
            return Ok(None);
        };
        self.focus_on(id)?;
        Ok(Some(id))
    }

    /// 当前视口下需要绘制的节点及其渲染状态，不可见图层上的节点直接跳过。
    pub fn render_states(&self) -> Result<Vec<(EntityId, DetailState)>, EngineError> {
        let zoom = self.viewport.zoom;
        let visible = self.lod.visible_layers(zoom)?;
        let mut states = Vec::new();
        for (id, node) in &self.nodes {
            if !visible.contains(&node.layer) {
                continue;
            }
            states.push((*id, self.lod.detail_state_at(node.layer, zoom)?));
        }
        Ok(states)
    }

    /// 指针命中测试：返回包含该点的最深图层可见节点，同层时后加入者优先。
    pub fn hit_test(&self, point: Point2) -> Result<Option<EntityId>, EngineError> {
        let visible = self.lod.visible_layers(self.viewport.zoom)?;
        let mut best: Option<(u32, EntityId)> = None;
        for (id, node) in &self.nodes {
            if !visible.contains(&node.layer) || !node.contains_point(point) {
                continue;
            }
            if best.is_none_or(|(layer, _)| node.layer >= layer) {
                best = Some((node.layer, *id));
            }
        }
        Ok(best.map(|(_, id)| id))
    }

    /// 检查每个子节点是否完整落在父节点内。
    pub fn validate_hierarchy(&self) -> Vec<HierarchyViolation> {
        let mut violations = Vec::new();
        for (id, node) in &self.nodes {
            let Some(parent_id) = node.parent else {
                continue;
            };
            let Some(parent) = self.node(parent_id) else {
                continue;
            };
            if !comparison::is_inside(&node.placed(), &parent.placed(), 1.0) {
                warn!(
                    child = id.get(),
                    parent = parent_id.get(),
                    "子节点超出父节点范围"
                );
                violations.push(HierarchyViolation {
                    child: *id,
                    parent: parent_id,
                });
            }
        }
        violations
    }

    /// 为 CLI / 快速验证构建三层示例层级并安装匹配的分段表，返回关键实体 ID。
    pub fn populate_demo(&mut self, factory: &ShapeFactory) -> Result<DemoEntities, EngineError> {
        self.reset();

        let root = self.spawn_node(
            factory,
            "circle",
            &attributes(json!({ "radius": 5.0 })),
            Node::new("root", 0, Point2::new(0.0, 0.0), 1.0, Shape::circle(0.0)),
        )?;

        let cluster_attributes =
            attributes(json!({ "width": 2.0, "height": 1.0, "cornerRadius": 0.1 }));
        let mut clusters = [root; 2];
        for (slot, (label, x)) in clusters
            .iter_mut()
            .zip([("cluster-west", -150.0), ("cluster-east", 150.0)])
        {
            *slot = self.spawn_node(
                factory,
                "rectangle",
                &cluster_attributes,
                Node::new(label, 1, Point2::new(x, 0.0), 4.0, Shape::circle(0.0))
                    .with_parent(root),
            )?;
        }

        let leaf_attributes = attributes(json!({ "size": 1.0 }));
        let mut leaves = [root; 4];
        let offsets = [(-15.0, -8.0), (15.0, 8.0)];
        for (index, slot) in leaves.iter_mut().enumerate() {
            let parent = clusters[index / 2];
            let (dx, dy) = offsets[index % 2];
            let center = self
                .node(parent)
                .map(|node| node.position)
                .ok_or(EngineError::EntityNotFound(parent.get()))?;
            *slot = self.spawn_node(
                factory,
                "circle",
                &leaf_attributes,
                Node::new(
                    format!("leaf-{index}"),
                    2,
                    Point2::new(center.x() + dx, center.y() + dy),
                    16.0,
                    Shape::circle(0.0),
                )
                .with_parent(parent),
            )?;
        }

        self.install_segments(demo_segments()?);

        let ids = DemoEntities {
            root,
            clusters,
            leaves,
        };
        debug!(
            root = ids.root.get(),
            nodes = self.nodes.len(),
            "已创建演示层级"
        );
        Ok(ids)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

/// 演示层级使用的分段表：根层两端开放，更深的层在更小的 scale 上出现。
pub fn demo_segments() -> Result<SegmentTable, EngineError> {
    let mut table = SegmentTable::new();
    table.insert_raw(0, [f64::NAN, 0.0, 0.25, 0.5, 2.0, f64::NAN])?;
    table.insert_raw(1, [0.01, 0.02, 0.06, 0.12, 0.25, 0.5])?;
    table.insert_raw(2, [0.001, 0.002, 0.006, 0.012, 0.025, 0.05])?;
    Ok(table)
}

fn attributes(value: Value) -> ShapeAttributes {
    match value {
        Value::Object(map) => map,
        _ => ShapeAttributes::new(),
    }
}
