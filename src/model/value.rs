//! Scalar value type for attributes, literals and parameters.
//!
//! Integers, floats and text. Coercion between them is
//! explicit and total: every conversion either succeeds or leaves the value
//! untouched.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Attribute / literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
}

// ============================================================================
// Type checking
// ============================================================================

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::Text(_) => "TEXT",
        }
    }

    pub fn is_numeric(&self) -> bool { matches!(self, Value::Int(_) | Value::Float(_)) }
    pub fn is_text(&self) -> bool { matches!(self, Value::Text(_)) }

    /// Attempt to extract as i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Attempt to extract as f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Attempt to extract as &str
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Text form used when matching pattern attributes (`{age: 3}` matches
    /// an attribute stored as `"3"`).
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

// ============================================================================
// Coercion
// ============================================================================

impl Value {
    /// Text that reads as a number becomes that number: integer first, then
    /// float. Everything else is returned unchanged.
    pub fn coerce_numeric(&self) -> Value {
        match self {
            Value::Text(s) => {
                let s = s.trim();
                if let Ok(i) = s.parse::<i64>() {
                    Value::Int(i)
                } else if let Ok(f) = s.parse::<f64>() {
                    Value::Float(f)
                } else {
                    self.clone()
                }
            }
            _ => self.clone(),
        }
    }

    /// Convert text to the numeric type of `target`. No-op when `self` is
    /// not text, `target` is not numeric, or the text does not parse.
    pub fn coerce_like(&self, target: &Value) -> Value {
        let Value::Text(s) = self else {
            return self.clone();
        };
        let s = s.trim();
        match target {
            Value::Int(_) => s.parse::<i64>().map_or_else(|_| self.clone(), Value::Int),
            Value::Float(_) => s.parse::<f64>().map_or_else(|_| self.clone(), Value::Float),
            Value::Text(_) => self.clone(),
        }
    }
}

// ============================================================================
// Comparison
// ============================================================================

impl Value {
    /// Equality across types: numbers compare numerically, text compares
    /// exactly, text never equals a number.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => self.compare(other) == Some(Ordering::Equal),
        }
    }

    /// Ordering. `None` for text vs. number (and NaN).
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Text(a), Value::Text(b)) => a.partial_cmp(b),
            _ => None,
        }
    }

    /// Membership of `needle` in `self` treated as a container. Only text
    /// contains anything (substring); `None` when the types don't allow it.
    pub fn contains(&self, needle: &Value) -> Option<bool> {
        match (self, needle) {
            (Value::Text(hay), Value::Text(n)) => Some(hay.contains(n.as_str())),
            _ => None,
        }
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v as i64) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Float(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::Text(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::Text(v.to_owned()) } }

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            // Debug keeps the fractional part: 1.0 renders as "1.0", not "1".
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from() {
        assert_eq!(Value::from("hello"), Value::Text("hello".into()));
        assert_eq!(Value::from(42), Value::Int(42));
        assert_eq!(Value::from(2.5), Value::Float(2.5));
    }

    #[test]
    fn test_text_form() {
        assert_eq!(Value::Int(3).to_text(), "3");
        assert_eq!(Value::Float(1.0).to_text(), "1.0");
        assert_eq!(Value::Float(2.5).to_text(), "2.5");
        assert_eq!(Value::from("x").to_text(), "x");
    }

    #[test]
    fn test_coerce_numeric() {
        assert_eq!(Value::from("30").coerce_numeric(), Value::Int(30));
        assert_eq!(Value::from(" 30 ").coerce_numeric(), Value::Int(30));
        assert_eq!(Value::from("2.5").coerce_numeric(), Value::Float(2.5));
        assert_eq!(Value::from("Bob").coerce_numeric(), Value::from("Bob"));
        assert_eq!(Value::Int(4).coerce_numeric(), Value::Int(4));
    }

    #[test]
    fn test_coerce_like() {
        assert_eq!(Value::from("7").coerce_like(&Value::Int(1)), Value::Int(7));
        assert_eq!(Value::from("7").coerce_like(&Value::Float(1.0)), Value::Float(7.0));
        // "7.5" is not an integer: left as text.
        assert_eq!(Value::from("7.5").coerce_like(&Value::Int(1)), Value::from("7.5"));
        assert_eq!(Value::from("7").coerce_like(&Value::from("x")), Value::from("7"));
        assert_eq!(Value::Int(7).coerce_like(&Value::Float(1.0)), Value::Int(7));
    }

    #[test]
    fn test_numeric_comparison() {
        assert_eq!(Value::Int(1).compare(&Value::Float(1.5)), Some(Ordering::Less));
        assert!(Value::Int(2).loose_eq(&Value::Float(2.0)));
    }

    #[test]
    fn test_mixed_types() {
        assert_eq!(Value::from("1").compare(&Value::Int(1)), None);
        assert!(!Value::from("1").loose_eq(&Value::Int(1)));
    }

    #[test]
    fn test_contains() {
        assert_eq!(Value::from("Alice,Bob").contains(&Value::from("Bob")), Some(true));
        assert_eq!(Value::from("Alice").contains(&Value::from("Bob")), Some(false));
        assert_eq!(Value::Int(12).contains(&Value::Int(1)), None);
        assert_eq!(Value::from("12").contains(&Value::Int(1)), None);
    }
}
