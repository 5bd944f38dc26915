//! Value converters
//!
//! Maps fixed-width ASCII data fields to semantic values and back. The
//! decode path checks the field width before interpreting anything; only
//! the encode path pads.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ProtocolError;

/// Width of most data fields
const WIDE: usize = 6;

/// Width of short integer fields
const SHORT: usize = 3;

/// A semantic value carried in a frame's data field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// On/off flag
    Bool(bool),
    /// Whole number
    Integer(i64),
    /// Real number
    Float(f64),
    /// Raw or textual payload
    Text(String),
}

impl Value {
    /// Get the flag, if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the number, if this is an integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the number as a float; integers widen
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get the text, if this is textual
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// Codec between a raw data field and one kind of semantic value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Converter {
    /// Pass-through, any width
    #[default]
    Identity,
    /// `111111` / `000000`
    Boolean,
    /// Six-digit decimal integer
    Integer,
    /// Fixed point with two implied decimals
    Float,
    /// Scientific notation such as `001E03`
    Exponential,
    /// Six-character string.
    ///
    /// Shorter strings are zero-padded on the left when encoded and the
    /// padding is kept when decoding, so only six-character strings come
    /// back unchanged.
    Text,
    /// Three-digit decimal integer
    Short,
}

impl Converter {
    /// Human readable converter name
    pub fn name(self) -> &'static str {
        match self {
            Converter::Identity => "identity",
            Converter::Boolean => "boolean",
            Converter::Integer => "integer",
            Converter::Float => "float",
            Converter::Exponential => "exponential",
            Converter::Text => "string",
            Converter::Short => "short",
        }
    }

    /// Expected raw field width, `None` for the identity converter
    pub fn width(self) -> Option<usize> {
        match self {
            Converter::Identity => None,
            Converter::Short => Some(SHORT),
            _ => Some(WIDE),
        }
    }

    /// Decode a raw data field
    pub fn to_semantic(self, raw: &str) -> Result<Value, ProtocolError> {
        if let Some(expected) = self.width() {
            if raw.len() != expected {
                return Err(ProtocolError::WrongFieldWidth {
                    value: raw.to_string(),
                    expected,
                    actual: raw.len(),
                });
            }
        }

        match self {
            Converter::Identity | Converter::Text => Ok(Value::Text(raw.to_string())),
            Converter::Boolean => match raw {
                "111111" => Ok(Value::Bool(true)),
                "000000" => Ok(Value::Bool(false)),
                other => Err(ProtocolError::UnrecognizedEncoding(other.to_string())),
            },
            Converter::Integer | Converter::Short => parse_integer(raw).map(Value::Integer),
            Converter::Float => parse_integer(raw).map(|i| Value::Float(i as f64 / 100.0)),
            Converter::Exponential => raw
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| ProtocolError::NotNumeric(raw.to_string())),
        }
    }

    /// Encode a semantic value into a raw data field
    pub fn to_raw(self, value: &Value) -> Result<String, ProtocolError> {
        let raw = match (self, value) {
            (Converter::Identity, v) => return Ok(v.to_string()),
            (Converter::Boolean, Value::Bool(true)) => "111111".to_string(),
            (Converter::Boolean, Value::Bool(false)) => "000000".to_string(),
            (Converter::Integer, Value::Integer(i)) => format!("{:06}", i),
            (Converter::Short, Value::Integer(i)) => format!("{:03}", i),
            (Converter::Float, v) => {
                let f = self.finite(v)?;
                format!("{:06}", (f * 100.0).trunc() as i64)
            }
            (Converter::Exponential, v) => zero_pad(&format_exponential(self.finite(v)?), WIDE),
            (Converter::Text, Value::Text(s)) => zero_pad(s, WIDE),
            (_, v) => return Err(self.unsupported(v)),
        };

        // Width is always known past the identity arm
        let width = self.width().unwrap_or(raw.len());
        if raw.len() > width {
            return Err(ProtocolError::FieldTooLarge {
                field: self.name(),
                value: raw,
                width,
            });
        }
        Ok(raw)
    }

    fn finite(self, value: &Value) -> Result<f64, ProtocolError> {
        value
            .as_float()
            .filter(|f| f.is_finite())
            .ok_or_else(|| self.unsupported(value))
    }

    fn unsupported(self, value: &Value) -> ProtocolError {
        ProtocolError::UnsupportedValue {
            converter: self.name(),
            value: format!("{:?}", value),
        }
    }
}

fn parse_integer(raw: &str) -> Result<i64, ProtocolError> {
    raw.parse::<i64>()
        .map_err(|_| ProtocolError::NotNumeric(raw.to_string()))
}

/// Left-pad with zeros, keeping a leading minus sign in front
fn zero_pad(text: &str, width: usize) -> String {
    if text.len() >= width {
        return text.to_string();
    }
    let fill = "0".repeat(width - text.len());
    match text.strip_prefix('-') {
        Some(rest) => format!("-{}{}", fill, rest),
        None => format!("{}{}", fill, text),
    }
}

/// Normalized scientific notation: `1230.0` becomes `1.23E03`, `0.005`
/// becomes `5E-03`
fn format_exponential(value: f64) -> String {
    let formatted = format!("{:.6E}", value);
    let (mantissa, exponent) = formatted.split_once('E').unwrap_or((formatted.as_str(), "0"));
    let mantissa = match mantissa.trim_end_matches('0').trim_end_matches('.') {
        "" => "0",
        m => m,
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if exponent < 0 {
        format!("{}E-{:02}", mantissa, -exponent)
    } else {
        format!("{}E{:02}", mantissa, exponent)
    }
}
