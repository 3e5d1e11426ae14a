//! Runtime values

mod string;

pub use string::{FalconString, STRING_BLOCK};

use serde::Serialize;
use std::fmt;

/// Parameter list of a callable binding
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FunctionDescriptor {
    pub params: Vec<String>,
}

impl FunctionDescriptor {
    pub fn new(params: Vec<String>) -> Self {
        Self { params }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Tagged runtime datum
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub enum Value {
    /// Never assigned
    #[default]
    Undefined,
    /// Write-protected reserved name
    Constant,
    Nil,
    Bool(bool),
    Number(f64),
    String(FalconString),
    Function(FunctionDescriptor),
}

/// The active tag of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Variant {
    Undefined,
    Constant,
    Nil,
    Bool,
    Number,
    String,
    Function,
}

impl Variant {
    /// Numeric code reported by `typeOf`
    pub fn type_tag(self) -> f64 {
        match self {
            Variant::Constant => -2.0,
            Variant::Undefined => -1.0,
            Variant::Nil => 0.0,
            Variant::Bool => 1.0,
            Variant::Number => 3.0,
            Variant::Function => 6.0,
            Variant::String => 8.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Variant::Undefined => "undefined",
            Variant::Constant => "constant",
            Variant::Nil => "nil",
            Variant::Bool => "bool",
            Variant::Number => "number",
            Variant::String => "string",
            Variant::Function => "function",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    pub fn string(s: &str) -> Self {
        Value::String(FalconString::from(s))
    }

    pub fn variant(&self) -> Variant {
        match self {
            Value::Undefined => Variant::Undefined,
            Value::Constant => Variant::Constant,
            Value::Nil => Variant::Nil,
            Value::Bool(_) => Variant::Bool,
            Value::Number(_) => Variant::Number,
            Value::String(_) => Variant::String,
            Value::Function(_) => Variant::Function,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Overwrite with a deep copy of `other`, releasing the old payload
    pub fn assign(&mut self, other: &Value) {
        *self = other.clone();
    }

    /// Values a conditional branch treats as false
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::Bool(b) => !b,
            Value::Nil => true,
            Value::Number(n) => *n == 0.0,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Textual form used by `print` and string concatenation
    pub fn to_text(&self) -> Option<FalconString> {
        match self {
            Value::Bool(true) => Some("true".into()),
            Value::Bool(false) => Some("false".into()),
            Value::Nil => Some("Nil".into()),
            Value::Number(n) => Some(format_number(*n).into()),
            Value::String(s) => Some(s.clone()),
            Value::Undefined | Value::Constant | Value::Function(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Constant => f.write_str("constant"),
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Function(desc) => write!(f, "function({})", desc.params.join(", ")),
        }
    }
}

/// Render a number the way C's `%g` does: six significant digits, trailing
/// zeros removed, scientific notation for very small or large magnitudes
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "nan".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if n == 0.0 {
        return if n.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let scientific = format!("{n:.5e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return n.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return n.to_string();
    };

    if exponent < -4 || exponent >= 6 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (5 - exponent) as usize;
        trim_fraction(&format!("{n:.decimals$}")).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}
