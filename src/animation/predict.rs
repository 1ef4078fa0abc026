//! 发生预演: 不修改图, 计算一次发生将消费哪些令牌、产出落在何处.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::animation::color::{Color, TokenPalette};
use crate::engine::fire::{EngineError, FirePolicy, plan_production};
use crate::layout::{DEFAULT_TOKEN_RADIUS, Positions, token_offset};
use crate::net::core::ExecutableGraph;
use crate::net::ids::{PlaceId, TransitionId};
use crate::net::structure::Bindings;
use crate::net::token::Token;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("no position for node `{0}`")]
    MissingPosition(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationKind {
    #[default]
    Fire,
}

/// A token about to leave its place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputToken {
    /// Same id the renderer gives the token element, see [`token_id`].
    pub id: String,
    pub color: Color,
    pub place: String,
    pub x: f64,
    pub y: f64,
}

/// A token about to land in a place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputToken {
    pub color: Color,
    pub dest_x: f64,
    pub dest_y: f64,
    pub dest_place: String,
}

/// Everything a client needs to animate one firing. Serializes to the
/// shape the browser animation code reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationPlan {
    #[serde(rename = "type")]
    pub kind: AnimationKind,
    pub transition: String,
    pub transition_pos: Point,
    pub input_tokens: Vec<InputToken>,
    pub output_tokens: Vec<OutputToken>,
}

impl AnimationPlan {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictOptions {
    pub policy: FirePolicy,
    pub token_radius: f64,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            policy: FirePolicy::default(),
            token_radius: DEFAULT_TOKEN_RADIUS,
        }
    }
}

/// `token-<place>-<index>` with spaces in the place name turned into `-`.
pub fn token_id(place: &str, index: usize) -> String {
    format!("token-{}-{}", place.replace(' ', "-"), index)
}

pub fn predict_fire<T, P>(
    graph: &ExecutableGraph<T>,
    transition: TransitionId,
    positions: &Positions,
    palette: &P,
) -> Result<AnimationPlan, PredictError>
where
    T: Token,
    P: TokenPalette<T> + ?Sized,
{
    predict_fire_with(graph, transition, positions, palette, PredictOptions::default())
}

/// Dry run of [`crate::engine::fire_with`].
///
/// Binds the top token of every input place, runs the transition function
/// on copies and replays the distribution rule. If an input place is empty
/// the tokens that are there are still reported but nothing is produced.
/// Destination offsets treat the target as holding one more token than it
/// does now; several tokens landing in one place take consecutive slots.
pub fn predict_fire_with<T, P>(
    graph: &ExecutableGraph<T>,
    transition: TransitionId,
    positions: &Positions,
    palette: &P,
    options: PredictOptions,
) -> Result<AnimationPlan, PredictError>
where
    T: Token,
    P: TokenPalette<T> + ?Sized,
{
    let node = graph
        .transitions()
        .get(transition)
        .ok_or(EngineError::OutOfBounds(transition))?;
    let position = |name: &str| {
        positions
            .get(name)
            .copied()
            .ok_or_else(|| PredictError::MissingPosition(name.to_owned()))
    };
    let radius = options.token_radius;
    let (tx, ty) = position(&node.name)?;

    let mut input_tokens = Vec::new();
    let mut bindings = Bindings::new();
    let mut complete = true;

    for edge in graph.inputs_of(transition) {
        let place = graph.place(edge.place);
        let Some(token) = place.top() else {
            complete = false;
            continue;
        };
        let index = place.len() - 1;
        let (px, py) = position(&place.name)?;
        let (dx, dy) = token_offset(index, place.len(), radius);
        input_tokens.push(InputToken {
            id: token_id(&place.name, index),
            color: palette.color(token),
            place: place.name.clone(),
            x: px + dx,
            y: py + dy,
        });
        bindings.bind(&edge.argument, edge.place, token.clone());
    }

    let mut output_tokens = Vec::new();
    if complete && !bindings.is_empty() {
        if !options.policy.permits(graph, transition) {
            return Err(EngineError::TokenCopyingDisallowed {
                transition: node.name.clone(),
                targets: graph.outputs_of(transition).len(),
            }
            .into());
        }
        let result = node
            .call(&bindings)
            .map_err(|source| EngineError::TransitionFailed {
                transition: node.name.clone(),
                source,
            })?;
        let produced = plan_production(graph, transition, node, result)?;

        let mut arriving: HashMap<PlaceId, usize> = HashMap::new();
        for (place, _) in &produced {
            *arriving.entry(*place).or_default() += 1;
        }
        let mut landed: HashMap<PlaceId, usize> = HashMap::new();
        for (place, token) in &produced {
            let target = graph.place(*place);
            let slot = landed.entry(*place).or_default();
            let (dx, dy) = token_offset(
                target.len() + *slot,
                target.len() + arriving[place],
                radius,
            );
            *slot += 1;

            let (px, py) = position(&target.name)?;
            output_tokens.push(OutputToken {
                color: palette.color(token),
                dest_x: px + dx,
                dest_y: py + dy,
                dest_place: target.name.clone(),
            });
        }
    } else {
        log::trace!("`{}` has an empty input, previewing consumption only", node.name);
    }

    Ok(AnimationPlan {
        kind: AnimationKind::Fire,
        transition: node.name.clone(),
        transition_pos: Point { x: tx, y: ty },
        input_tokens,
        output_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::color::DefaultPalette;
    use crate::engine::fire::fire;
    use crate::layout::layout;
    use crate::net::builder::{GraphSpec, construct_graph};
    use crate::net::structure::Distribution;
    use crate::net::token::ScalarKind;

    fn positions(entries: &[(&str, (f64, f64))]) -> Positions {
        entries
            .iter()
            .map(|(name, pos)| (name.to_string(), *pos))
            .collect()
    }

    fn doubling() -> ExecutableGraph<i64> {
        construct_graph(vec![
            GraphSpec::place("Input", ScalarKind::Int, vec![5]),
            GraphSpec::argument("Input", "Double", "x"),
            GraphSpec::transition("Double", ["x"], |args| Ok(args.get("x")? * 2)),
            GraphSpec::output("Double", "Output"),
            GraphSpec::place("Output", ScalarKind::Int, vec![]),
        ])
        .unwrap()
    }

    fn routing(input: Vec<i64>) -> ExecutableGraph<i64> {
        construct_graph(vec![
            GraphSpec::place("Input", ScalarKind::Int, input),
            GraphSpec::argument("Input", "Route", "x"),
            GraphSpec::routed_transition(
                "Route",
                ["x"],
                |args| Ok(*args.get("x")?),
                |x| {
                    Ok(if x > 5 {
                        Distribution::new().to("High", x)
                    } else {
                        Distribution::new().to("Low", x)
                    })
                },
            ),
            GraphSpec::output("Route", "High"),
            GraphSpec::output("Route", "Low"),
            GraphSpec::place("High", ScalarKind::Int, vec![]),
            GraphSpec::place("Low", ScalarKind::Int, vec![]),
        ])
        .unwrap()
    }

    #[test]
    fn single_input_single_output() {
        let graph = doubling();
        let pos = positions(&[
            ("Input", (100.0, 100.0)),
            ("Double", (200.0, 200.0)),
            ("Output", (300.0, 300.0)),
        ]);
        let double = graph.transition_id("Double").unwrap();
        let plan = predict_fire(&graph, double, &pos, &DefaultPalette).unwrap();

        assert_eq!(plan.transition, "Double");
        assert_eq!(plan.transition_pos, Point { x: 200.0, y: 200.0 });
        assert_eq!(plan.input_tokens.len(), 1);
        assert_eq!(plan.input_tokens[0].id, "token-Input-0");
        assert_eq!((plan.input_tokens[0].x, plan.input_tokens[0].y), (100.0, 100.0));
        assert_eq!(plan.output_tokens.len(), 1);
        assert_eq!(plan.output_tokens[0].dest_place, "Output");
        assert_eq!((plan.output_tokens[0].dest_x, plan.output_tokens[0].dest_y), (300.0, 300.0));
    }

    #[test]
    fn prediction_leaves_the_graph_alone() {
        let graph = routing(vec![3, 7]);
        let before = graph.snapshot();
        let route = graph.transition_id("Route").unwrap();
        predict_fire(&graph, route, &layout(&graph, 60.0), &DefaultPalette).unwrap();
        assert_eq!(graph.snapshot(), before);
    }

    #[test]
    fn prediction_matches_the_following_fire() {
        let mut graph = routing(vec![3, 7, 2, 9]);
        let route = graph.transition_id("Route").unwrap();
        let pos = layout(&graph, 60.0);

        while graph.is_enabled(route) {
            let plan = predict_fire(&graph, route, &pos, &DefaultPalette).unwrap();
            let input = graph.place_id("Input").unwrap();
            let expected_id = token_id("Input", graph.place(input).len() - 1);
            let outcome = fire(&mut graph, route).unwrap();

            assert_eq!(plan.input_tokens.len(), outcome.consumed.len());
            assert_eq!(plan.input_tokens[0].id, expected_id);
            let predicted: Vec<_> = plan.output_tokens.iter().map(|t| t.dest_place.as_str()).collect();
            let actual: Vec<_> = outcome
                .produced
                .iter()
                .map(|(place, _)| graph.place(*place).name.as_str())
                .collect();
            assert_eq!(predicted, actual);
        }
        assert_eq!(graph.tokens("High"), Some(&[9, 7][..]));
    }

    #[test]
    fn empty_input_predicts_no_outputs() {
        let graph = construct_graph(vec![
            GraphSpec::place("A", ScalarKind::Int, vec![1i64]),
            GraphSpec::place("B", ScalarKind::Int, vec![]),
            GraphSpec::argument("A", "Add", "a"),
            GraphSpec::argument("B", "Add", "b"),
            GraphSpec::transition("Add", ["a", "b"], |args| Ok(args.get("a")? + args.get("b")?)),
            GraphSpec::output("Add", "Sum"),
            GraphSpec::place("Sum", ScalarKind::Int, vec![]),
        ])
        .unwrap();
        let add = graph.transition_id("Add").unwrap();
        let plan = predict_fire(&graph, add, &layout(&graph, 60.0), &DefaultPalette).unwrap();
        assert_eq!(plan.input_tokens.len(), 1);
        assert_eq!(plan.input_tokens[0].place, "A");
        assert!(plan.output_tokens.is_empty());
    }

    #[test]
    fn returning_token_lands_above_the_current_stack() {
        let graph = construct_graph(vec![
            GraphSpec::place("Loop", ScalarKind::Int, vec![0i64, 1, 2]),
            GraphSpec::argument("Loop", "Spin", "x"),
            GraphSpec::transition("Spin", ["x"], |args| Ok(args.get("x")? + 1)),
            GraphSpec::output("Spin", "Loop"),
        ])
        .unwrap();
        let pos = positions(&[("Loop", (0.0, 0.0)), ("Spin", (0.0, 100.0))]);
        let spin = graph.transition_id("Spin").unwrap();
        let plan = predict_fire(&graph, spin, &pos, &DefaultPalette).unwrap();
        let input = &plan.input_tokens[0];
        let output = &plan.output_tokens[0];
        assert_eq!(input.id, "token-Loop-2");
        assert_eq!((input.x, input.y), (20.0, 0.0));
        // Slot 3 of 4, even though the consumed token frees slot 2.
        assert_eq!((output.dest_x, output.dest_y), (30.0, 0.0));
    }

    #[test]
    fn tokens_landing_together_are_spread_out() {
        let graph = construct_graph(vec![
            GraphSpec::place("Input", ScalarKind::Int, vec![4i64]),
            GraphSpec::argument("Input", "Split", "x"),
            GraphSpec::routed_transition(
                "Split",
                ["x"],
                |args| Ok(*args.get("x")?),
                |x| Ok(Distribution::new().to("Out", x / 2).to("Out", x - x / 2)),
            ),
            GraphSpec::output("Split", "Out"),
            GraphSpec::place("Out", ScalarKind::Int, vec![]),
        ])
        .unwrap();
        let pos = positions(&[("Input", (0.0, 0.0)), ("Split", (0.0, 100.0)), ("Out", (0.0, 200.0))]);
        let split = graph.transition_id("Split").unwrap();
        let plan = predict_fire(&graph, split, &pos, &DefaultPalette).unwrap();
        let xs: Vec<_> = plan.output_tokens.iter().map(|t| t.dest_x).collect();
        assert_eq!(xs, vec![-10.0, 10.0]);
    }

    #[test]
    fn colours_come_from_the_palette() {
        let graph = doubling();
        let double = graph.transition_id("Double").unwrap();
        let palette = |x: &i64| if *x >= 10 { Color::new("#E74C3C") } else { Color::new("#3498DB") };
        let plan = predict_fire(&graph, double, &layout(&graph, 60.0), &palette).unwrap();
        assert_eq!(plan.input_tokens[0].color.as_str(), "#3498DB");
        assert_eq!(plan.output_tokens[0].color.as_str(), "#E74C3C");
    }

    #[test]
    fn missing_position_is_reported() {
        let graph = doubling();
        let double = graph.transition_id("Double").unwrap();
        let pos = positions(&[("Input", (0.0, 0.0)), ("Double", (0.0, 0.0))]);
        match predict_fire(&graph, double, &pos, &DefaultPalette) {
            Err(PredictError::MissingPosition(name)) => assert_eq!(name, "Output"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn failing_function_surfaces_as_engine_error() {
        let graph = construct_graph(vec![
            GraphSpec::place("Input", ScalarKind::Int, vec![1i64]),
            GraphSpec::argument("Input", "Fail", "x"),
            GraphSpec::transition("Fail", ["x"], |_| anyhow::bail!("nope")),
        ])
        .unwrap();
        let fail = graph.transition_id("Fail").unwrap();
        let result = predict_fire(&graph, fail, &layout(&graph, 60.0), &DefaultPalette);
        assert!(matches!(
            result,
            Err(PredictError::Engine(EngineError::TransitionFailed { .. }))
        ));
    }

    #[test]
    fn client_json_uses_browser_field_names() {
        let graph = construct_graph(vec![
            GraphSpec::place("Red Balls", ScalarKind::Int, vec![1i64]),
            GraphSpec::argument("Red Balls", "Move", "x"),
            GraphSpec::transition("Move", ["x"], |args| Ok(*args.get("x")?)),
            GraphSpec::output("Move", "Done"),
            GraphSpec::place("Done", ScalarKind::Int, vec![]),
        ])
        .unwrap();
        let moving = graph.transition_id("Move").unwrap();
        let plan = predict_fire(&graph, moving, &layout(&graph, 60.0), &DefaultPalette).unwrap();
        let json: serde_json::Value = serde_json::from_str(&plan.to_json().unwrap()).unwrap();

        assert_eq!(json["type"], "fire");
        assert!(json["transition_pos"]["x"].is_number());
        assert_eq!(json["input_tokens"][0]["id"], "token-Red-Balls-0");
        assert_eq!(json["input_tokens"][0]["color"], "#95A5A6");
        assert_eq!(json["output_tokens"][0]["destPlace"], "Done");
        assert!(json["output_tokens"][0]["destX"].is_number());
    }
}
