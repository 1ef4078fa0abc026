//! 令牌着色: 由表现层注入, 按令牌形状多态.
use std::fmt;

use serde::{Deserialize, Serialize};

/// A CSS colour string, e.g. `#95A5A6` or `rgb(120, 80, 30)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    pub const DEFAULT_HEX: &'static str = "#95A5A6";

    pub fn new(css: impl Into<String>) -> Self {
        Self(css.into())
    }

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(format!("rgb({}, {}, {})", r, g, b))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HEX)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps a token to its display colour. Must be pure; it may be called
/// several times for the same token.
pub trait TokenPalette<T> {
    fn color(&self, token: &T) -> Color;
}

impl<T, F> TokenPalette<T> for F
where
    F: Fn(&T) -> Color,
{
    fn color(&self, token: &T) -> Color {
        self(token)
    }
}

/// Tokens that know their own colour.
pub trait Colored {
    fn color(&self) -> Color;
}

/// Palette delegating to [`Colored`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NativePalette;

impl<T: Colored> TokenPalette<T> for NativePalette {
    fn color(&self, token: &T) -> Color {
        token.color()
    }
}

/// Grey for everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPalette;

impl<T> TokenPalette<T> for DefaultPalette {
    fn color(&self, _token: &T) -> Color {
        Color::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ball(&'static str);

    impl Colored for Ball {
        fn color(&self) -> Color {
            Color::new(self.0)
        }
    }

    #[test]
    fn closures_are_palettes() {
        let palette = |x: &i64| {
            if *x > 0 {
                Color::new("#2ECC71")
            } else {
                Color::new("#E74C3C")
            }
        };
        assert_eq!(palette.color(&3).as_str(), "#2ECC71");
        assert_eq!(TokenPalette::color(&palette, &-1).as_str(), "#E74C3C");
    }

    #[test]
    fn native_palette_asks_the_token() {
        assert_eq!(NativePalette.color(&Ball("#3498DB")), Color::new("#3498DB"));
    }

    #[test]
    fn default_is_grey() {
        assert_eq!(DefaultPalette.color(&42i64).to_string(), "#95A5A6");
        assert_eq!(Color::rgb(100, 60, 20).as_str(), "rgb(100, 60, 20)");
    }
}
