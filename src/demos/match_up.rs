//! 配对: 字符串与长度两两尝试, 长度相符则成对输出, 否则原样送回.
//!
//! 禁止复制令牌时运行; 结果总是经由分发函数显式路由.
use std::fmt;

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::animation::color::{Color, Colored};
use crate::net::builder::{GraphConstructionError, GraphSpec, construct_graph};
use crate::net::core::ExecutableGraph;
use crate::net::structure::{Bindings, Distribution};
use crate::net::token::Token;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchToken {
    Str(String),
    Len(i64),
    Pair(String, i64),
    /// Result of one matching attempt, before it is routed.
    Attempt {
        matched: bool,
        string: String,
        length: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    Str,
    Len,
    Pair,
    Attempt,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchKind::Str => "str",
            MatchKind::Len => "int",
            MatchKind::Pair => "tuple",
            MatchKind::Attempt => "attempt",
        };
        f.write_str(name)
    }
}

impl Token for MatchToken {
    type Kind = MatchKind;

    fn kind(&self) -> MatchKind {
        match self {
            MatchToken::Str(_) => MatchKind::Str,
            MatchToken::Len(_) => MatchKind::Len,
            MatchToken::Pair(..) => MatchKind::Pair,
            MatchToken::Attempt { .. } => MatchKind::Attempt,
        }
    }
}

impl Colored for MatchToken {
    fn color(&self) -> Color {
        let hex = match self {
            MatchToken::Str(s) => match s.chars().count() {
                1 => "#AED6F1",
                2 => "#5DADE2",
                3 => "#3498DB",
                _ => "#2874A6",
            },
            MatchToken::Len(n) if *n < 3 => "#F8C471",
            MatchToken::Len(n) if *n < 5 => "#F39C12",
            MatchToken::Len(n) if *n < 10 => "#E67E22",
            MatchToken::Len(_) => "#BA4A00",
            MatchToken::Pair(..) => "#2ECC71",
            MatchToken::Attempt { .. } => Color::DEFAULT_HEX,
        };
        Color::new(hex)
    }
}

pub const STRINGS: &str = "Some Strings";
pub const LENGTHS: &str = "Some Lengths";
pub const MATCHED: &str = "Matched Pair";

fn match_one_string_to_one_length(args: &Bindings<MatchToken>) -> anyhow::Result<MatchToken> {
    let (MatchToken::Str(string), MatchToken::Len(length)) =
        (args.get("string")?, args.get("length")?)
    else {
        bail!("matching needs a string and a length");
    };
    Ok(MatchToken::Attempt {
        matched: string.chars().count() as i64 == *length,
        string: string.clone(),
        length: *length,
    })
}

/// Matched pairs go to the output, anything else back where it came from.
fn distribute_result_tokens(result: MatchToken) -> anyhow::Result<Distribution<MatchToken>> {
    let (matched, string, length) = match result {
        MatchToken::Attempt {
            matched,
            string,
            length,
        } => (matched, string, length),
        other => bail!("expected a matching attempt, got {:?}", other),
    };
    Ok(if matched {
        Distribution::new().to(MATCHED, MatchToken::Pair(string, length))
    } else {
        Distribution::new()
            .to(STRINGS, MatchToken::Str(string))
            .to(LENGTHS, MatchToken::Len(length))
    })
}

pub fn create_initial_graph() -> Result<ExecutableGraph<MatchToken>, GraphConstructionError> {
    graph_with(&["a", "ab", "abc", "abcd"], &[2, 3, 4, 5, 99])
}

pub fn graph_with(
    strings: &[&str],
    lengths: &[i64],
) -> Result<ExecutableGraph<MatchToken>, GraphConstructionError> {
    let strings = strings.iter().map(|s| MatchToken::Str((*s).to_owned())).collect();
    let lengths = lengths.iter().map(|&n| MatchToken::Len(n)).collect();

    construct_graph(vec![
        GraphSpec::place(STRINGS, MatchKind::Str, strings),
        GraphSpec::place(LENGTHS, MatchKind::Len, lengths),
        GraphSpec::argument(STRINGS, "Match Lengths", "string"),
        GraphSpec::argument(LENGTHS, "Match Lengths", "length"),
        GraphSpec::routed_transition(
            "Match Lengths",
            ["string", "length"],
            match_one_string_to_one_length,
            distribute_result_tokens,
        ),
        GraphSpec::output("Match Lengths", STRINGS),
        GraphSpec::output("Match Lengths", LENGTHS),
        GraphSpec::output("Match Lengths", MATCHED),
        GraphSpec::place(MATCHED, MatchKind::Pair, vec![]),
    ])
}
