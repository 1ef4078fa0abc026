//! 渲染快照: 把图、布局坐标与令牌颜色合成为远端渲染器可直接绘制的视图.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::animation::color::{Color, TokenPalette};
use crate::animation::predict::token_id;
use crate::layout::{LayoutConfig, Positions, token_offset};
use crate::net::core::ExecutableGraph;
use crate::net::token::Token;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("no position for node `{0}`")]
    MissingPosition(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenView {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceView {
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(rename = "type")]
    pub type_name: String,
    pub tokens: Vec<TokenView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionView {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// place → transition
    Argument,
    /// transition → place
    Return,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeView {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    /// Parameter name on argument edges, empty otherwise.
    pub label: String,
}

/// One frame of the graph, ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderableGraph {
    pub places: Vec<PlaceView>,
    pub transitions: Vec<TransitionView>,
    pub edges: Vec<EdgeView>,
    pub width: f64,
    pub height: f64,
}

impl RenderableGraph {
    pub fn build<T, P>(
        graph: &ExecutableGraph<T>,
        positions: &Positions,
        palette: &P,
    ) -> Result<Self, ViewError>
    where
        T: Token,
        P: TokenPalette<T> + ?Sized,
    {
        Self::build_with(graph, positions, palette, &LayoutConfig::default())
    }

    pub fn build_with<T, P>(
        graph: &ExecutableGraph<T>,
        positions: &Positions,
        palette: &P,
        config: &LayoutConfig,
    ) -> Result<Self, ViewError>
    where
        T: Token,
        P: TokenPalette<T> + ?Sized,
    {
        let position = |name: &str| {
            positions
                .get(name)
                .copied()
                .ok_or_else(|| ViewError::MissingPosition(name.to_owned()))
        };

        let mut places = Vec::with_capacity(graph.places_len());
        for place in graph.places().iter() {
            let (x, y) = position(&place.name)?;
            let total = place.len();
            let tokens = place
                .tokens()
                .iter()
                .enumerate()
                .map(|(index, token)| {
                    let (dx, dy) = token_offset(index, total, config.token_radius);
                    TokenView {
                        id: token_id(&place.name, index),
                        x: x + dx,
                        y: y + dy,
                        color: palette.color(token),
                    }
                })
                .collect();
            places.push(PlaceView {
                name: place.name.clone(),
                x,
                y,
                type_name: place.declared.to_string(),
                tokens,
            });
        }

        let mut transitions = Vec::with_capacity(graph.transitions_len());
        for (id, transition) in graph.transitions().iter_enumerated() {
            let (x, y) = position(&transition.name)?;
            transitions.push(TransitionView {
                name: transition.name.clone(),
                x,
                y,
                enabled: graph.is_enabled(id),
            });
        }

        let mut edges =
            Vec::with_capacity(graph.argument_edges().len() + graph.return_edges().len());
        for edge in graph.argument_edges() {
            let start = position(&graph.place(edge.place).name)?;
            let end = position(&graph.transition(edge.transition).name)?;
            edges.push(EdgeView {
                start_x: start.0,
                start_y: start.1,
                end_x: end.0,
                end_y: end.1,
                kind: EdgeKind::Argument,
                label: edge.argument.clone(),
            });
        }
        for edge in graph.return_edges() {
            let start = position(&graph.transition(edge.transition).name)?;
            let end = position(&graph.place(edge.place).name)?;
            edges.push(EdgeView {
                start_x: start.0,
                start_y: start.1,
                end_x: end.0,
                end_y: end.1,
                kind: EdgeKind::Return,
                label: String::new(),
            });
        }

        // Room for the widest node plus the same margin the layout left on
        // the top-left side.
        let margin = positions
            .values()
            .map(|p| p.0.min(p.1))
            .fold(f64::INFINITY, f64::min);
        let margin = if margin.is_finite() { margin } else { 0.0 };
        let half = config.place_width.max(config.transition_width) / 2.0;
        let width = positions.values().map(|p| p.0).fold(0.0, f64::max) + half + margin;
        let height = positions.values().map(|p| p.1).fold(0.0, f64::max) + half + margin;

        Ok(Self {
            places,
            transitions,
            edges,
            width: width.ceil(),
            height: height.ceil(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::color::DefaultPalette;
    use crate::layout::layout;
    use crate::net::builder::{GraphSpec, construct_graph};
    use crate::net::token::ScalarKind;

    fn graph() -> ExecutableGraph<i64> {
        construct_graph(vec![
            GraphSpec::place("Input", ScalarKind::Int, vec![1, 2, 3, 4, 5]),
            GraphSpec::argument("Input", "Process", "x"),
            GraphSpec::transition("Process", ["x"], |args| Ok(*args.get("x")?)),
            GraphSpec::output("Process", "Output"),
            GraphSpec::place("Output", ScalarKind::Int, vec![]),
        ])
        .unwrap()
    }

    #[test]
    fn places_carry_positioned_tokens() {
        let graph = graph();
        let positions = layout(&graph, 60.0);
        let view = RenderableGraph::build(&graph, &positions, &DefaultPalette).unwrap();

        let input = &view.places[0];
        assert_eq!(input.type_name, "int");
        assert_eq!(input.tokens.len(), 5);
        assert_eq!(input.tokens[4].id, "token-Input-4");
        assert_eq!(input.tokens[4].x, input.x);
        assert!(input.tokens[0].y < input.tokens[4].y);
        assert!(view.transitions[0].enabled);
    }

    #[test]
    fn edges_are_labelled_by_parameter() {
        let graph = graph();
        let view = RenderableGraph::build(&graph, &layout(&graph, 60.0), &DefaultPalette).unwrap();
        assert_eq!(view.edges.len(), 2);
        assert_eq!(view.edges[0].kind, EdgeKind::Argument);
        assert_eq!(view.edges[0].label, "x");
        assert_eq!(view.edges[1].kind, EdgeKind::Return);
        assert!(view.edges[1].label.is_empty());
    }

    #[test]
    fn bounds_cover_every_node() {
        let graph = graph();
        let positions = layout(&graph, 60.0);
        let view = RenderableGraph::build(&graph, &positions, &DefaultPalette).unwrap();
        for (x, y) in positions.values() {
            assert!(*x < view.width);
            assert!(*y < view.height);
        }
    }

    #[test]
    fn serializes_with_client_names() {
        let graph = graph();
        let view = RenderableGraph::build(&graph, &layout(&graph, 60.0), &DefaultPalette).unwrap();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["places"][0]["type"], "int");
        assert_eq!(json["edges"][0]["type"], "argument");
        assert!(json["edges"][0]["startX"].is_number());
    }

    #[test]
    fn missing_position_is_an_error() {
        let graph = graph();
        let mut positions = layout(&graph, 60.0);
        positions.shift_remove("Output");
        assert_eq!(
            RenderableGraph::build(&graph, &positions, &DefaultPalette),
            Err(ViewError::MissingPosition("Output".into()))
        );
    }
}
