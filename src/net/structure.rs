//! 静态结构元素: 库所、变迁、参数弧与返回弧.
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::net::ids::{PlaceId, TransitionId};
use crate::net::token::Token;

/// User code run when a transition fires.
pub type TransitionFn<T> = Arc<dyn Fn(&Bindings<T>) -> anyhow::Result<T> + Send + Sync>;

/// Routes a transition's result to named places.
pub type DistributionFn<T> = Arc<dyn Fn(T) -> anyhow::Result<Distribution<T>> + Send + Sync>;

/// A typed, LIFO token container.
#[derive(Clone)]
pub struct Place<T: Token> {
    pub name: String,
    pub declared: T::Kind,
    pub(crate) tokens: Vec<T>,
}

impl<T: Token> Place<T> {
    pub(crate) fn new(name: String, declared: T::Kind) -> Self {
        Self {
            name,
            declared,
            tokens: Vec::new(),
        }
    }

    /// Tokens in insertion order; the last one is consumed first.
    pub fn tokens(&self) -> &[T] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The token the next firing would take.
    pub fn top(&self) -> Option<&T> {
        self.tokens.last()
    }

    pub fn accepts(&self, token: &T) -> bool {
        token.is_assignable_to(self.declared)
    }
}

impl<T: Token> fmt::Debug for Place<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Place")
            .field("name", &self.name)
            .field("declared", &self.declared)
            .field("tokens", &self.tokens)
            .finish()
    }
}

#[derive(Clone)]
pub struct Transition<T: Token> {
    pub name: String,
    pub params: Vec<String>,
    pub(crate) function: TransitionFn<T>,
    pub(crate) distribution: Option<DistributionFn<T>>,
}

impl<T: Token> Transition<T> {
    pub fn has_distribution(&self) -> bool {
        self.distribution.is_some()
    }

    pub(crate) fn call(&self, bindings: &Bindings<T>) -> anyhow::Result<T> {
        (self.function)(bindings)
    }
}

impl<T: Token> fmt::Debug for Transition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transition").field(&self.name).finish()
    }
}

/// `place -> transition`, binding one parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArgumentEdge {
    pub place: PlaceId,
    pub transition: TransitionId,
    pub argument: String,
}

/// `transition -> place`, a broadcast destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReturnEdge {
    pub transition: TransitionId,
    pub place: PlaceId,
}

#[derive(Debug, Error)]
#[error("no argument bound to parameter `{0}`")]
pub struct BindingError(pub String);

#[derive(Debug, Clone)]
pub struct Binding<T> {
    pub param: String,
    pub place: PlaceId,
    pub token: T,
}

/// Arguments handed to a transition function, one per argument edge.
#[derive(Debug, Clone)]
pub struct Bindings<T> {
    entries: SmallVec<[Binding<T>; 4]>,
}

impl<T> Bindings<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: SmallVec::new(),
        }
    }

    pub(crate) fn bind(&mut self, param: &str, place: PlaceId, token: T) {
        self.entries.push(Binding {
            param: param.to_owned(),
            place,
            token,
        });
    }

    pub fn get(&self, param: &str) -> Result<&T, BindingError> {
        self.entries
            .iter()
            .find(|binding| binding.param == param)
            .map(|binding| &binding.token)
            .ok_or_else(|| BindingError(param.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding<T>> {
        self.entries.iter()
    }

    pub(crate) fn into_entries(self) -> SmallVec<[Binding<T>; 4]> {
        self.entries
    }
}

/// Explicit routing of produced tokens, keyed by destination place name.
///
/// Keys keep insertion order so the produced sequence is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution<T> {
    routes: IndexMap<String, Vec<T>>,
}

impl<T> Distribution<T> {
    pub fn new() -> Self {
        Self {
            routes: IndexMap::new(),
        }
    }

    /// Appends `token` to the tokens routed to `place`.
    pub fn to(mut self, place: impl Into<String>, token: T) -> Self {
        self.push(place, token);
        self
    }

    pub fn push(&mut self, place: impl Into<String>, token: T) {
        self.routes.entry(place.into()).or_default().push(token);
    }

    pub fn is_empty(&self) -> bool {
        self.routes.values().all(Vec::is_empty)
    }

    pub fn routes(&self) -> impl Iterator<Item = (&str, &[T])> {
        self.routes
            .iter()
            .map(|(place, tokens)| (place.as_str(), tokens.as_slice()))
    }

    pub(crate) fn into_routes(self) -> impl Iterator<Item = (String, Vec<T>)> {
        self.routes.into_iter()
    }
}

impl<T> Default for Distribution<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_lookup_by_param() {
        let mut bindings = Bindings::new();
        bindings.bind("a", PlaceId::new(0), 1i64);
        bindings.bind("b", PlaceId::new(1), 2i64);
        assert_eq!(*bindings.get("b").unwrap(), 2);
        let err = bindings.get("c").unwrap_err();
        assert_eq!(err.to_string(), "no argument bound to parameter `c`");
    }

    #[test]
    fn distribution_groups_by_place_in_insertion_order() {
        let dist = Distribution::new()
            .to("Low", 1i64)
            .to("High", 9)
            .to("Low", 2);
        let routes: Vec<_> = dist.routes().map(|(p, t)| (p.to_owned(), t.to_vec())).collect();
        assert_eq!(
            routes,
            vec![("Low".to_owned(), vec![1, 2]), ("High".to_owned(), vec![9])]
        );
        assert!(Distribution::<i64>::new().is_empty());
    }
}
