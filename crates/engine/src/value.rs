use serde::{Deserialize, Serialize};

/// Rendering for cells whose evaluation failed.
pub const INVALID_DISPLAY: &str = "####";

/// Horizontal text alignment
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    Left,
    Right,
}

/// The evaluated result of a cell: a number, a piece of text, or the
/// invalid marker.
///
/// `Invalid` is a value, not an error. It stands in for every evaluation
/// failure (malformed syntax, type mismatch, division by zero, bad cell
/// reference) and flows through further arithmetic: any operation with an
/// `Invalid` operand is itself `Invalid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Number(f64),
    Text(String),
    Invalid,
}

impl Value {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Value::Invalid)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    /// The numeric payload, if this is a number. Text is never coerced.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Alignment hint for display: text goes left, everything else right.
    pub fn alignment(&self) -> Alignment {
        match self {
            Value::Text(_) => Alignment::Left,
            Value::Number(_) | Value::Invalid => Alignment::Right,
        }
    }

    /// Natural string rendering. Whole numbers drop the fractional part;
    /// the invalid marker renders as a fixed placeholder.
    pub fn to_display(&self) -> String {
        match self {
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Value::Text(s) => s.clone(),
            Value::Invalid => INVALID_DISPLAY.to_string(),
        }
    }
}
