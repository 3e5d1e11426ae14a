//! Builtin library routines
//!
//! Pure functions over the value model, invoked by the interpreter's builtin
//! opcodes.

use crate::error::{FalconError, Result};
use crate::program::Opcode;
use crate::value::{FalconString, Value};
use std::io::BufRead;

/// The predefined functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Input,
    Print,
    Numeric,
    TypeOf,
    Len,
    Find,
    Sort,
}

impl Builtin {
    pub const ALL: [Builtin; 7] = [
        Builtin::Input,
        Builtin::Print,
        Builtin::Numeric,
        Builtin::TypeOf,
        Builtin::Len,
        Builtin::Find,
        Builtin::Sort,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Input => "input",
            Builtin::Print => "print",
            Builtin::Numeric => "numeric",
            Builtin::TypeOf => "typeOf",
            Builtin::Len => "len",
            Builtin::Find => "find",
            Builtin::Sort => "sort",
        }
    }

    pub fn from_name(name: &str) -> Option<Builtin> {
        Builtin::ALL.into_iter().find(|b| b.name() == name)
    }

    /// Formal parameters; `print` takes one or more arguments
    pub fn params(self) -> &'static [&'static str] {
        match self {
            Builtin::Input => &[],
            Builtin::Print => &["term"],
            Builtin::Numeric => &["id"],
            Builtin::TypeOf => &["id"],
            Builtin::Len => &["id"],
            Builtin::Find => &["string", "search"],
            Builtin::Sort => &["string"],
        }
    }

    pub fn is_variadic(self) -> bool {
        self == Builtin::Print
    }

    pub fn accepts(self, count: usize) -> bool {
        if self.is_variadic() {
            count >= 1
        } else {
            count == self.params().len()
        }
    }

    pub fn opcode(self) -> Opcode {
        match self {
            Builtin::Input => Opcode::Input,
            Builtin::Print => Opcode::Print,
            Builtin::Numeric => Opcode::Numeric,
            Builtin::TypeOf => Opcode::TypeOf,
            Builtin::Len => Opcode::Len,
            Builtin::Find => Opcode::Find,
            Builtin::Sort => Opcode::Sort,
        }
    }
}

/// Read one line without its line terminator; end of input gives ""
pub fn read_line<R: BufRead>(reader: &mut R) -> Result<FalconString> {
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
    Ok(FalconString::from_bytes(&line))
}

/// 1-based start of the first occurrence of `needle` in `haystack`
///
/// Boyer-Moore-Horspool: the window is compared from its right end and shifted
/// by the bad-character table on mismatch. An empty needle matches at 1.
pub fn substring_search(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    let m = needle.len();
    if m == 0 {
        return Some(1);
    }
    if m > haystack.len() {
        return None;
    }

    let mut shift = [m; 256];
    for (i, &byte) in needle[..m - 1].iter().enumerate() {
        shift[byte as usize] = m - 1 - i;
    }

    let mut pos = 0;
    while pos + m <= haystack.len() {
        let window = &haystack[pos..pos + m];
        if window.iter().rev().zip(needle.iter().rev()).all(|(a, b)| a == b) {
            return Some(pos + 1);
        }
        pos += shift[window[m - 1] as usize];
    }
    None
}

/// Bytes of `text` in ascending order
pub fn sort(text: &FalconString) -> FalconString {
    let mut bytes = text.as_bytes().to_vec();
    bytes.sort_unstable();
    FalconString::from_bytes(&bytes)
}

/// Convert a value to a number the way `numeric` does
///
/// Text is read like C's `strtod`: optional leading whitespace, then the
/// longest decimal prefix. Anything without such a prefix is rejected.
pub fn to_number(value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::String(s) => parse_prefix(s.as_bytes()).ok_or_else(|| {
            FalconError::type_change(format!("cannot convert {s:?} to a number"))
        }),
        other => Err(FalconError::type_change(format!(
            "cannot convert {} to a number",
            other.variant()
        ))),
    }
}

fn parse_prefix(bytes: &[u8]) -> Option<f64> {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let rest = &bytes[start..];

    let digits = |from: usize| rest[from..].iter().take_while(|b| b.is_ascii_digit()).count();

    let mut end = 0;
    if matches!(rest.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_digits = digits(end);
    end += int_digits;
    let mut frac_digits = 0;
    if rest.get(end) == Some(&b'.') {
        frac_digits = digits(end + 1);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }
    if matches!(rest.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(rest.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = digits(exp_end);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    std::str::from_utf8(&rest[..end]).ok()?.parse::<f64>().ok()
}

pub fn to_type_tag(value: &Value) -> f64 {
    value.variant().type_tag()
}

/// Byte length of a string, 0 for anything else
pub fn length(value: &Value) -> f64 {
    match value {
        Value::String(s) => s.len() as f64,
        _ => 0.0,
    }
}
