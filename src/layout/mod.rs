//! # 分层布局
//!
//! Sugiyama 式流程: 分层 ([`layering`]) → 层内排序 ([`ordering`]) →
//! 坐标分配 (本模块) → 平移到边距. 只依赖拓扑, 不看令牌内容;
//! 相同的图与声明顺序总是得到相同的坐标.

pub mod layering;
pub mod ordering;
pub mod stacking;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::net::core::ExecutableGraph;
use crate::net::ids::NodeId;
use crate::net::token::Token;

pub use layering::{Layering, assign_layers, direction_graph};
pub use ordering::LayeredGraph;
pub use stacking::{DEFAULT_TOKEN_RADIUS, token_offset};

/// Node centre coordinates keyed by node name, in declaration order.
pub type Positions = IndexMap<String, (f64, f64)>;

pub const DEFAULT_MARGIN: f64 = 60.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub place_width: f64,
    pub transition_width: f64,
    /// Horizontal gap between neighbouring nodes of one layer.
    pub node_spacing: f64,
    /// Vertical distance between consecutive layers.
    pub layer_spacing: f64,
    pub sweeps: usize,
    pub token_radius: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            place_width: 90.0,
            transition_width: 120.0,
            node_spacing: 80.0,
            layer_spacing: 120.0,
            sweeps: 8,
            token_radius: DEFAULT_TOKEN_RADIUS,
        }
    }
}

impl LayoutConfig {
    fn width_of(&self, node: NodeId) -> f64 {
        match node {
            NodeId::Place(_) => self.place_width,
            NodeId::Transition(_) => self.transition_width,
        }
    }
}

pub fn layout<T: Token>(graph: &ExecutableGraph<T>, margin: f64) -> Positions {
    layout_with(graph, margin, &LayoutConfig::default())
}

pub fn layout_with<T: Token>(
    graph: &ExecutableGraph<T>,
    margin: f64,
    config: &LayoutConfig,
) -> Positions {
    let order = graph.declaration_order();
    if order.is_empty() {
        return Positions::new();
    }

    let flow = direction_graph(graph);
    let layering = assign_layers(&flow);
    if !layering.back_edges.is_empty() {
        log::debug!("layout reversed {} back edges", layering.back_edges.len());
    }
    let layered = LayeredGraph::new(&layering.layer_of, &layering.downward_edges(&flow));
    let layers = layered.minimize_crossings(config.sweeps);

    let mut raw = vec![(0.0, 0.0); order.len()];
    for (depth, layer) in layers.iter().enumerate() {
        let width = |node: usize| {
            if layered.is_virtual(node) {
                0.0
            } else {
                config.width_of(order[node])
            }
        };
        let total: f64 = layer.iter().map(|&node| width(node)).sum::<f64>()
            + config.node_spacing * layer.len().saturating_sub(1) as f64;

        let mut left = -total / 2.0;
        let y = depth as f64 * config.layer_spacing;
        for &node in layer {
            let w = width(node);
            if !layered.is_virtual(node) {
                raw[node] = (left + w / 2.0, y);
            }
            left += w + config.node_spacing;
        }
    }

    let min_x = raw.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let min_y = raw.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);

    order
        .iter()
        .zip(raw)
        .map(|(&node, (x, y))| {
            (
                graph.node_name(node).to_owned(),
                (x - min_x + margin, y - min_y + margin),
            )
        })
        .collect()
}
