//! 彩球工厂: 橡胶 + 颜料 → 球, 按颜色分拣到三个库所.
use std::fmt;

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::animation::color::{Color, Colored};
use crate::net::builder::{GraphConstructionError, GraphSpec, construct_graph};
use crate::net::core::ExecutableGraph;
use crate::net::structure::{Bindings, Distribution};
use crate::net::token::Token;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactoryToken {
    Rubber { quantity: u32 },
    Paint { color: String },
    Ball { color: String, size: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactoryKind {
    Rubber,
    Paint,
    Ball,
}

impl fmt::Display for FactoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FactoryKind::Rubber => "Rubber",
            FactoryKind::Paint => "Paint",
            FactoryKind::Ball => "Ball",
        };
        f.write_str(name)
    }
}

impl Token for FactoryToken {
    type Kind = FactoryKind;

    fn kind(&self) -> FactoryKind {
        match self {
            FactoryToken::Rubber { .. } => FactoryKind::Rubber,
            FactoryToken::Paint { .. } => FactoryKind::Paint,
            FactoryToken::Ball { .. } => FactoryKind::Ball,
        }
    }
}

impl FactoryToken {
    pub fn rubber(quantity: u32) -> Self {
        FactoryToken::Rubber { quantity }
    }

    pub fn paint(color: &str) -> Self {
        FactoryToken::Paint {
            color: color.to_owned(),
        }
    }
}

fn paint_hex(color: &str) -> &'static str {
    match color {
        "red" => "#E74C3C",
        "blue" => "#3498DB",
        "green" => "#2ECC71",
        "yellow" => "#F1C40F",
        _ => "#9B59B6",
    }
}

impl Colored for FactoryToken {
    fn color(&self) -> Color {
        match self {
            FactoryToken::Paint { color } | FactoryToken::Ball { color, .. } => {
                Color::new(paint_hex(color))
            }
            // Light to dark brown with the amount of rubber.
            FactoryToken::Rubber { quantity } => {
                let intensity = quantity.saturating_mul(20).min(200) as u8;
                Color::rgb(100 + intensity / 2, 60 + intensity / 3, 20 + intensity / 4)
            }
        }
    }
}

pub const RED_BALLS: &str = "Red Balls";
pub const BLUE_BALLS: &str = "Blue Balls";
pub const OTHER_BALLS: &str = "Other Balls";

fn make_a_ball(args: &Bindings<FactoryToken>) -> anyhow::Result<FactoryToken> {
    let (FactoryToken::Rubber { quantity }, FactoryToken::Paint { color }) =
        (args.get("rubber")?, args.get("paint")?)
    else {
        bail!("make a ball needs rubber and paint");
    };
    Ok(FactoryToken::Ball {
        color: color.clone(),
        size: quantity * 10,
    })
}

fn distribute_by_colour(ball: FactoryToken) -> anyhow::Result<Distribution<FactoryToken>> {
    let place = match &ball {
        FactoryToken::Ball { color, .. } if color == "red" => RED_BALLS,
        FactoryToken::Ball { color, .. } if color == "blue" => BLUE_BALLS,
        FactoryToken::Ball { .. } => OTHER_BALLS,
        other => bail!("only balls can be sorted, got {:?}", other),
    };
    Ok(Distribution::new().to(place, ball))
}

pub fn create_initial_graph() -> Result<ExecutableGraph<FactoryToken>, GraphConstructionError> {
    let paint = ["red", "blue", "green", "yellow", "red", "blue", "green", "yellow", "red"]
        .into_iter()
        .map(FactoryToken::paint)
        .collect();
    let rubber = (1..=10).map(FactoryToken::rubber).collect();

    construct_graph(vec![
        GraphSpec::place("Input Rubber", FactoryKind::Rubber, rubber),
        GraphSpec::place("Input Paint", FactoryKind::Paint, paint),
        GraphSpec::argument("Input Rubber", "Make a Ball", "rubber"),
        GraphSpec::argument("Input Paint", "Make a Ball", "paint"),
        GraphSpec::routed_transition(
            "Make a Ball",
            ["rubber", "paint"],
            make_a_ball,
            distribute_by_colour,
        ),
        GraphSpec::output("Make a Ball", RED_BALLS),
        GraphSpec::output("Make a Ball", BLUE_BALLS),
        GraphSpec::output("Make a Ball", OTHER_BALLS),
        GraphSpec::place(RED_BALLS, FactoryKind::Ball, vec![]),
        GraphSpec::place(BLUE_BALLS, FactoryKind::Ball, vec![]),
        GraphSpec::place(OTHER_BALLS, FactoryKind::Ball, vec![]),
    ])
}
