use std::fmt;

use serde::{Deserialize, Serialize};

use crate::net::index_vec::Idx;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(transparent)]
        pub struct $name(pub u32);

        impl $name {
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl Idx for $name {
            fn index(self) -> usize {
                self.0 as usize
            }

            fn from_usize(idx: usize) -> Self {
                Self(idx as u32)
            }
        }
    };
}

define_id!(PlaceId, "p");
define_id!(TransitionId, "t");

/// A place or a transition, in the shared node namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeId {
    Place(PlaceId),
    Transition(TransitionId),
}

impl NodeId {
    pub fn as_place(self) -> Option<PlaceId> {
        match self {
            NodeId::Place(place) => Some(place),
            NodeId::Transition(_) => None,
        }
    }

    pub fn as_transition(self) -> Option<TransitionId> {
        match self {
            NodeId::Transition(transition) => Some(transition),
            NodeId::Place(_) => None,
        }
    }

    pub fn is_place(self) -> bool {
        matches!(self, NodeId::Place(_))
    }
}

impl From<PlaceId> for NodeId {
    fn from(value: PlaceId) -> Self {
        NodeId::Place(value)
    }
}

impl From<TransitionId> for NodeId {
    fn from(value: TransitionId) -> Self {
        NodeId::Transition(value)
    }
}
