//! Per-opcode type rules
//!
//! Each function maps defined operand values to a result or the error the
//! combination raises. Undefined operands are rejected by the caller first.

use crate::error::{FalconError, Result};
use crate::value::{FalconString, Value};
use std::cmp::Ordering;

/// The six relational operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Equal,
    Unequal,
    GreaterEq,
    LessEq,
    Less,
    Greater,
}

impl Relation {
    pub fn symbol(self) -> &'static str {
        match self {
            Relation::Equal => "==",
            Relation::Unequal => "!=",
            Relation::GreaterEq => ">=",
            Relation::LessEq => "<=",
            Relation::Less => "<",
            Relation::Greater => ">",
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Relation::Equal => ordering == Ordering::Equal,
            Relation::Unequal => ordering != Ordering::Equal,
            Relation::GreaterEq => ordering != Ordering::Less,
            Relation::LessEq => ordering != Ordering::Greater,
            Relation::Less => ordering == Ordering::Less,
            Relation::Greater => ordering == Ordering::Greater,
        }
    }

    fn is_equality(self) -> bool {
        matches!(self, Relation::Equal | Relation::Unequal)
    }
}

fn mismatch(op: &str, left: &Value, right: &Value) -> FalconError {
    FalconError::type_compatibility(op, left.variant().name(), right.variant().name())
}

fn numbers(op: &str, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(mismatch(op, left, right)),
    }
}

/// `+`: numeric sum, or concatenation onto a string
pub fn add(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::String(s), other) => {
            let tail = other.to_text().ok_or_else(|| mismatch("+", left, right))?;
            let mut joined = s.clone();
            joined.append(tail.as_bytes())?;
            Ok(Value::String(joined))
        }
        _ => Err(mismatch("+", left, right)),
    }
}

pub fn sub(left: &Value, right: &Value) -> Result<Value> {
    let (a, b) = numbers("-", left, right)?;
    Ok(Value::Number(a - b))
}

/// `*`: numeric product, or string repetition by a truncated count
pub fn mul(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
        (Value::String(s), Value::Number(n)) => {
            let count = n.trunc();
            if count.is_nan() || count < 0.0 {
                return Err(FalconError::runtime(format!(
                    "invalid repeat count {}",
                    crate::value::format_number(*n)
                )));
            }
            // saturates, so an infinite count hits the length limit
            Ok(Value::String(s.repeat(count as usize)?))
        }
        _ => Err(mismatch("*", left, right)),
    }
}

pub fn div(left: &Value, right: &Value) -> Result<Value> {
    let (a, b) = numbers("/", left, right)?;
    if b == 0.0 {
        return Err(FalconError::divide_by_zero());
    }
    Ok(Value::Number(a / b))
}

pub fn pow(left: &Value, right: &Value) -> Result<Value> {
    let (a, b) = numbers("**", left, right)?;
    Ok(Value::Number(a.powf(b)))
}

/// Relational comparison; both sides must share a variant
pub fn compare(relation: Relation, left: &Value, right: &Value) -> Result<Value> {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => match a.partial_cmp(b) {
            Some(ordering) => ordering,
            // NaN compares unequal to everything
            None => return Ok(Value::Bool(relation == Relation::Unequal)),
        },
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) if relation.is_equality() => a.cmp(b),
        (Value::Nil, Value::Nil) if relation.is_equality() => Ordering::Equal,
        _ => return Err(mismatch(relation.symbol(), left, right)),
    };
    Ok(Value::Bool(relation.holds(ordering)))
}

fn bound(value: Option<&Value>, default: f64) -> Result<f64> {
    match value {
        None => Ok(default),
        Some(Value::Number(n)) => Ok(n.trunc()),
        Some(other) => Err(FalconError::type_compatibility(
            "[:]",
            "string",
            other.variant().name(),
        )),
    }
}

/// Substring `target[from:to]`, end exclusive
///
/// Missing bounds default to the whole string. Out-of-range or crossed bounds
/// give the empty string.
pub fn cut(target: &Value, from: Option<&Value>, to: Option<&Value>) -> Result<Value> {
    let Value::String(s) = target else {
        return Err(FalconError::type_compatibility(
            "[:]",
            target.variant().name(),
            "bounds",
        ));
    };
    let len = s.len() as f64;
    let from = bound(from, 0.0)?;
    let to = bound(to, len)?;
    if from < 0.0 || from >= to || to > len {
        return Ok(Value::String(FalconString::new()));
    }
    Ok(Value::String(s.slice(from as usize, to as usize)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::value::FunctionDescriptor;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    fn text(s: &str) -> Value {
        Value::string(s)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(add(&num(2.0), &num(3.0)).unwrap(), num(5.0));
        assert_eq!(sub(&num(2.0), &num(3.0)).unwrap(), num(-1.0));
        assert_eq!(mul(&num(2.0), &num(3.0)).unwrap(), num(6.0));
        assert_eq!(div(&num(3.0), &num(2.0)).unwrap(), num(1.5));
        assert_eq!(pow(&num(2.0), &num(10.0)).unwrap(), num(1024.0));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            div(&num(1.0), &num(0.0)).unwrap_err().kind,
            ErrorKind::DivideByZero
        );
    }

    #[test]
    fn test_numeric_ops_reject_strings() {
        for op in [sub, div, pow] {
            assert_eq!(
                op(&text("a"), &num(1.0)).unwrap_err().kind,
                ErrorKind::TypeCompatibility
            );
            assert_eq!(
                op(&num(1.0), &text("a")).unwrap_err().kind,
                ErrorKind::TypeCompatibility
            );
        }
    }

    // ====================================================================
    // Concatenation and repetition
    // ====================================================================

    #[test]
    fn test_concatenation_coerces_right_operand() {
        assert_eq!(add(&text("a"), &text("b")).unwrap(), text("ab"));
        assert_eq!(add(&text("n="), &num(2.5)).unwrap(), text("n=2.5"));
        assert_eq!(add(&text("b="), &Value::Bool(true)).unwrap(), text("b=true"));
        assert_eq!(add(&text("b="), &Value::Bool(false)).unwrap(), text("b=false"));
        assert_eq!(add(&text("x="), &Value::Nil).unwrap(), text("x=Nil"));
    }

    #[test]
    fn test_concatenation_rejects_function_and_constant() {
        let function = Value::Function(FunctionDescriptor::default());
        assert_eq!(
            add(&text("a"), &function).unwrap_err().kind,
            ErrorKind::TypeCompatibility
        );
        assert_eq!(
            add(&text("a"), &Value::Constant).unwrap_err().kind,
            ErrorKind::TypeCompatibility
        );
    }

    #[test]
    fn test_number_plus_string_is_incompatible() {
        assert_eq!(
            add(&num(1.0), &text("a")).unwrap_err().kind,
            ErrorKind::TypeCompatibility
        );
    }

    #[test]
    fn test_repetition() {
        assert_eq!(mul(&text("ab"), &num(3.0)).unwrap(), text("ababab"));
        assert_eq!(mul(&text("ab"), &num(2.9)).unwrap(), text("abab"));
        assert_eq!(mul(&text("ab"), &num(0.0)).unwrap(), text(""));
    }

    #[test]
    fn test_negative_repetition_is_runtime_error() {
        assert_eq!(
            mul(&text("ab"), &num(-1.0)).unwrap_err().kind,
            ErrorKind::Runtime
        );
    }

    #[test]
    fn test_nan_repetition_is_runtime_error() {
        assert_eq!(
            mul(&text("ab"), &num(f64::NAN)).unwrap_err().kind,
            ErrorKind::Runtime
        );
    }

    #[test]
    fn test_oversized_repetition_is_internal_error() {
        for count in [1e30, 1e10, f64::INFINITY] {
            assert_eq!(
                mul(&text("ab"), &num(count)).unwrap_err().kind,
                ErrorKind::Internal
            );
        }
    }

    #[test]
    fn test_huge_repetition_of_empty_string() {
        assert_eq!(mul(&text(""), &num(1e30)).unwrap(), text(""));
        assert_eq!(mul(&text(""), &num(f64::INFINITY)).unwrap(), text(""));
    }

    #[test]
    fn test_number_times_string_is_incompatible() {
        assert_eq!(
            mul(&num(2.0), &text("ab")).unwrap_err().kind,
            ErrorKind::TypeCompatibility
        );
    }

    // ====================================================================
    // Relations
    // ====================================================================

    #[test]
    fn test_compare_numbers() {
        assert_eq!(compare(Relation::Less, &num(1.0), &num(2.0)).unwrap(), Value::Bool(true));
        assert_eq!(compare(Relation::GreaterEq, &num(2.0), &num(2.0)).unwrap(), Value::Bool(true));
        assert_eq!(compare(Relation::Greater, &num(1.0), &num(2.0)).unwrap(), Value::Bool(false));
        assert_eq!(compare(Relation::Unequal, &num(1.0), &num(2.0)).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_compare_strings_bytewise() {
        assert_eq!(compare(Relation::Less, &text("abc"), &text("abd")).unwrap(), Value::Bool(true));
        assert_eq!(compare(Relation::Equal, &text("x"), &text("x")).unwrap(), Value::Bool(true));
        assert_eq!(compare(Relation::LessEq, &text("b"), &text("a")).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_compare_bool_and_nil_equality_only() {
        assert_eq!(
            compare(Relation::Equal, &Value::Bool(true), &Value::Bool(true)).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            compare(Relation::Unequal, &Value::Nil, &Value::Nil).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            compare(Relation::Less, &Value::Bool(false), &Value::Bool(true))
                .unwrap_err()
                .kind,
            ErrorKind::TypeCompatibility
        );
    }

    #[test]
    fn test_compare_mixed_variants_is_incompatible() {
        let err = compare(Relation::Equal, &num(1.0), &text("1")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeCompatibility);
        assert_eq!(
            compare(Relation::Unequal, &Value::Nil, &Value::Bool(false))
                .unwrap_err()
                .kind,
            ErrorKind::TypeCompatibility
        );
    }

    // ====================================================================
    // Cut
    // ====================================================================

    #[test]
    fn test_cut_ranges() {
        let s = text("hello");
        assert_eq!(cut(&s, Some(&num(1.0)), Some(&num(3.0))).unwrap(), text("el"));
        assert_eq!(cut(&s, None, Some(&num(2.0))).unwrap(), text("he"));
        assert_eq!(cut(&s, Some(&num(3.0)), None).unwrap(), text("lo"));
        assert_eq!(cut(&s, None, None).unwrap(), text("hello"));
        assert_eq!(cut(&s, Some(&num(1.7)), Some(&num(3.2))).unwrap(), text("el"));
    }

    #[test]
    fn test_cut_out_of_range_is_empty() {
        let s = text("hello");
        assert_eq!(cut(&s, Some(&num(3.0)), Some(&num(3.0))).unwrap(), text(""));
        assert_eq!(cut(&s, Some(&num(4.0)), Some(&num(2.0))).unwrap(), text(""));
        assert_eq!(cut(&s, Some(&num(0.0)), Some(&num(6.0))).unwrap(), text(""));
        assert_eq!(cut(&s, Some(&num(-1.0)), Some(&num(2.0))).unwrap(), text(""));
    }

    #[test]
    fn test_cut_needs_string_and_number_bounds() {
        assert_eq!(
            cut(&num(5.0), None, None).unwrap_err().kind,
            ErrorKind::TypeCompatibility
        );
        assert_eq!(
            cut(&text("abc"), Some(&text("1")), None).unwrap_err().kind,
            ErrorKind::TypeCompatibility
        );
    }
}
