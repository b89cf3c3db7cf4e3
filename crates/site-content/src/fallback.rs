//! Static fallback content and its plain-text flattening
//!
//! A slot is declared with the markup it shows before (or instead of) any
//! stored copy. Only the text matters for resolution, so the markup is
//! modelled as a small tree and flattened to one string.

use serde::{Deserialize, Serialize};

/// Fallback content tree
///
/// Deserializes from plain JSON: strings are `Text`, numbers are `Number`,
/// arrays are `Composite`, and `null` is `Empty`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FallbackNode {
    /// Literal text
    Text(String),
    /// Numeric leaf, printed literally
    Number(f64),
    /// Element with children
    Composite(Vec<FallbackNode>),
    /// Node that renders no text
    Empty,
}

impl FallbackNode {
    /// Text leaf
    #[inline]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Composite node
    #[inline]
    pub fn composite(children: impl IntoIterator<Item = FallbackNode>) -> Self {
        Self::Composite(children.into_iter().collect())
    }

    /// Flatten to plain text
    ///
    /// Text and numbers are taken literally; composite children are
    /// flattened recursively and joined with a single space; `Empty`
    /// contributes an empty string (still occupying a join position).
    #[must_use]
    pub fn flatten(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Number(n) => format_number(*n),
            Self::Composite(children) => children
                .iter()
                .map(FallbackNode::flatten)
                .collect::<Vec<_>>()
                .join(" "),
            Self::Empty => String::new(),
        }
    }
}

impl From<&str> for FallbackNode {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for FallbackNode {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<f64> for FallbackNode {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for FallbackNode {
    #[allow(clippy::cast_precision_loss)]
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<Vec<FallbackNode>> for FallbackNode {
    fn from(children: Vec<FallbackNode>) -> Self {
        Self::Composite(children)
    }
}

/// Print a number the way page markup does: no `-0`, named infinities,
/// exponent form outside `[1e-6, 1e21)` with an explicit `+` on positive
/// exponents.
fn format_number(n: f64) -> String {
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let magnitude = n.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let formatted = format!("{n:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => formatted,
        };
    }
    n.to_string()
}
