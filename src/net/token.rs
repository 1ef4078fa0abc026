//! 令牌类型: 库所声明的类型即 `Token::Kind`, 插入时校验.
use std::fmt;

use serde::{Deserialize, Serialize};

/// A value that can sit in a place.
///
/// Every place declares a [`Token::Kind`]; a token may only be inserted into a
/// place whose declared kind it is assignable to. Tokens carry no engine
/// identity, so two equal values in one place are indistinguishable.
pub trait Token: Clone + fmt::Debug + Send + Sync + 'static {
    type Kind: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;

    fn is_assignable_to(&self, declared: Self::Kind) -> bool {
        self.kind() == declared
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Int,
    Float,
    Bool,
    Str,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::Bool => "bool",
            ScalarKind::Str => "str",
        })
    }
}

macro_rules! scalar_token {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Token for $ty {
                type Kind = ScalarKind;

                fn kind(&self) -> ScalarKind {
                    ScalarKind::$kind
                }
            }
        )*
    };
}

scalar_token!(i64 => Int, f64 => Float, bool => Bool, String => Str);

/// Shape of a `serde_json::Value` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JsonKind {
    /// Accepts any JSON value.
    Any,
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Token for serde_json::Value {
    type Kind = JsonKind;

    fn kind(&self) -> JsonKind {
        use serde_json::Value;
        match self {
            Value::Null => JsonKind::Null,
            Value::Bool(_) => JsonKind::Bool,
            Value::Number(_) => JsonKind::Number,
            Value::String(_) => JsonKind::String,
            Value::Array(_) => JsonKind::Array,
            Value::Object(_) => JsonKind::Object,
        }
    }

    fn is_assignable_to(&self, declared: JsonKind) -> bool {
        declared == JsonKind::Any || self.kind() == declared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_kinds() {
        assert_eq!(5i64.kind(), ScalarKind::Int);
        assert_eq!("a".to_string().kind(), ScalarKind::Str);
        assert!(!1.5f64.is_assignable_to(ScalarKind::Int));
        assert_eq!(ScalarKind::Str.to_string(), "str");
    }

    #[test]
    fn json_any_accepts_everything() {
        assert!(json!({"color": "red"}).is_assignable_to(JsonKind::Any));
        assert!(json!([1, 2]).is_assignable_to(JsonKind::Array));
        assert!(!json!(3).is_assignable_to(JsonKind::String));
    }
}
