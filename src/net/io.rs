//! I/O 支持: 图快照的 JSON 与 RON 序列化.
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::net::core::ExecutableGraph;
use crate::net::token::Token;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ron error: {0}")]
    Ron(#[from] ron::Error),
    #[error("ron parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Name-keyed picture of a graph, enough for a remote renderer to rebuild
/// its views. Functions are not serializable, so transitions only carry
/// their signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot<V> {
    pub places: Vec<PlaceSnapshot<V>>,
    pub transitions: Vec<TransitionSnapshot>,
    pub argument_edges: Vec<ArgumentEdgeSnapshot>,
    pub return_edges: Vec<ReturnEdgeSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceSnapshot<V> {
    pub name: String,
    pub type_name: String,
    pub tokens: Vec<V>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionSnapshot {
    pub name: String,
    pub params: Vec<String>,
    pub routed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentEdgeSnapshot {
    pub place: String,
    pub transition: String,
    pub argument: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnEdgeSnapshot {
    pub transition: String,
    pub place: String,
}

impl<T: Token> ExecutableGraph<T> {
    pub fn snapshot(&self) -> GraphSnapshot<T> {
        self.snapshot_with(T::clone)
    }

    /// Snapshot with tokens converted by `encode`, for token types that are
    /// not themselves serializable.
    pub fn snapshot_with<V>(&self, mut encode: impl FnMut(&T) -> V) -> GraphSnapshot<V> {
        GraphSnapshot {
            places: self
                .places
                .iter()
                .map(|place| PlaceSnapshot {
                    name: place.name.clone(),
                    type_name: place.declared.to_string(),
                    tokens: place.tokens().iter().map(&mut encode).collect(),
                })
                .collect(),
            transitions: self
                .transitions
                .iter()
                .map(|transition| TransitionSnapshot {
                    name: transition.name.clone(),
                    params: transition.params.clone(),
                    routed: transition.has_distribution(),
                })
                .collect(),
            argument_edges: self
                .argument_edges
                .iter()
                .map(|edge| ArgumentEdgeSnapshot {
                    place: self.places[edge.place].name.clone(),
                    transition: self.transitions[edge.transition].name.clone(),
                    argument: edge.argument.clone(),
                })
                .collect(),
            return_edges: self
                .return_edges
                .iter()
                .map(|edge| ReturnEdgeSnapshot {
                    transition: self.transitions[edge.transition].name.clone(),
                    place: self.places[edge.place].name.clone(),
                })
                .collect(),
        }
    }
}

pub fn to_json_string<T>(value: &T) -> Result<String, IoError>
where
    T: Serialize,
{
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn from_json_str<T>(s: &str) -> Result<T, IoError>
where
    T: DeserializeOwned,
{
    Ok(serde_json::from_str(s)?)
}

pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), IoError> {
    let mut file = File::create(path)?;
    let content = to_json_string(value)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

pub fn read_json<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T, IoError> {
    let mut file = File::open(path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    from_json_str(&content)
}

pub fn to_ron_string<T>(value: &T) -> Result<String, IoError>
where
    T: Serialize,
{
    let mut pretty = PrettyConfig::default();
    pretty.new_line = "\n".into();
    Ok(ron::ser::to_string_pretty(value, pretty)?)
}

pub fn from_ron_str<T>(s: &str) -> Result<T, IoError>
where
    T: DeserializeOwned,
{
    Ok(ron::from_str(s)?)
}

pub fn write_ron<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), IoError> {
    let mut file = File::create(path)?;
    let content = to_ron_string(value)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
