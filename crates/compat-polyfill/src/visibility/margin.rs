//! Root Margin
//!
//! CSS margin shorthand: one value applies to all sides, two are
//! vertical/horizontal, three are top/horizontal/bottom, four are
//! top/right/bottom/left.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::geometry::Rect;

/// A single margin length
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginLength {
    Px(f64),
    /// Relative to the root's width (left/right) or height (top/bottom)
    Percent(f64),
}

impl MarginLength {
    fn resolve(self, basis: f64) -> f64 {
        match self {
            Self::Px(px) => px,
            Self::Percent(pct) => basis * pct / 100.0,
        }
    }
}

impl fmt::Display for MarginLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Px(v) => write!(f, "{v}px"),
            Self::Percent(v) => write!(f, "{v}%"),
        }
    }
}

impl FromStr for MarginLength {
    type Err = MarginError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let invalid = || MarginError::InvalidLength(token.to_string());
        let (number, make): (&str, fn(f64) -> MarginLength) =
            match (token.strip_suffix("px"), token.strip_suffix('%')) {
                (Some(n), _) => (n, MarginLength::Px),
                (None, Some(n)) => (n, MarginLength::Percent),
                (None, None) => return Err(invalid()),
            };

        let value: f64 = number.parse().map_err(|_| invalid())?;
        if !value.is_finite() {
            return Err(invalid());
        }
        Ok(make(value))
    }
}

/// Malformed root margin
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarginError {
    #[error("Invalid margin length '{0}': expected px or %")]
    InvalidLength(String),
    #[error("Root margin takes 1 to 4 values, got {0}")]
    WrongValueCount(usize),
}

/// Expanded root margin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RootMargin {
    pub top: MarginLength,
    pub right: MarginLength,
    pub bottom: MarginLength,
    pub left: MarginLength,
}

impl Default for RootMargin {
    fn default() -> Self {
        Self::uniform(MarginLength::Px(0.0))
    }
}

impl RootMargin {
    pub fn uniform(length: MarginLength) -> Self {
        Self {
            top: length,
            right: length,
            bottom: length,
            left: length,
        }
    }

    /// Parse shorthand such as `"10px 5%"`; blank input means no margin
    pub fn parse(shorthand: &str) -> Result<Self, MarginError> {
        let values = shorthand
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<Vec<MarginLength>, _>>()?;

        match values[..] {
            [] => Ok(Self::default()),
            [all] => Ok(Self::uniform(all)),
            [vertical, horizontal] => Ok(Self {
                top: vertical,
                right: horizontal,
                bottom: vertical,
                left: horizontal,
            }),
            [top, horizontal, bottom] => Ok(Self {
                top,
                right: horizontal,
                bottom,
                left: horizontal,
            }),
            [top, right, bottom, left] => Ok(Self {
                top,
                right,
                bottom,
                left,
            }),
            _ => Err(MarginError::WrongValueCount(values.len())),
        }
    }

    /// Root bounds grown by this margin
    pub fn apply(&self, root: &Rect) -> Rect {
        root.expand(
            self.top.resolve(root.height),
            self.right.resolve(root.width),
            self.bottom.resolve(root.height),
            self.left.resolve(root.width),
        )
    }
}

impl FromStr for RootMargin {
    type Err = MarginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RootMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.top, self.right, self.bottom, self.left)
    }
}
