//! Three-address instructions, the label index and program listing

mod memory;

pub use memory::{Cell, Memory, Slot};

use crate::error::{FalconError, Result};
use crate::span::Span;
use crate::value::Value;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fmt;

/// Instruction opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Opcode {
    Nop,
    Copy,
    Label,
    Jump,
    BranchFalse,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Cut,
    Equal,
    Unequal,
    GreaterEq,
    LessEq,
    Less,
    Greater,
    Input,
    Numeric,
    Print,
    TypeOf,
    Len,
    Find,
    Sort,
}

impl Opcode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "nop",
            Opcode::Copy => "copy",
            Opcode::Label => "label",
            Opcode::Jump => "jump",
            Opcode::BranchFalse => "brafal",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Pow => "pow",
            Opcode::Cut => "cut",
            Opcode::Equal => "eq",
            Opcode::Unequal => "ne",
            Opcode::GreaterEq => "ge",
            Opcode::LessEq => "le",
            Opcode::Less => "lt",
            Opcode::Greater => "gt",
            Opcode::Input => "input",
            Opcode::Numeric => "numeric",
            Opcode::Print => "print",
            Opcode::TypeOf => "typeof",
            Opcode::Len => "len",
            Opcode::Find => "find",
            Opcode::Sort => "sort",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// One opcode with up to three operand slots
///
/// Arithmetic with `operands[2]` unset is the in-place form `a = a op b`;
/// with all three set it is `a = b op c`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: [Option<Slot>; 3],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Instruction {
    pub fn new(opcode: Opcode, a: Option<Slot>, b: Option<Slot>, c: Option<Slot>) -> Self {
        Self {
            opcode,
            operands: [a, b, c],
            span: None,
        }
    }

    pub fn unary(opcode: Opcode, a: Slot) -> Self {
        Self::new(opcode, Some(a), None, None)
    }

    pub fn binary(opcode: Opcode, a: Slot, b: Slot) -> Self {
        Self::new(opcode, Some(a), Some(b), None)
    }

    pub fn ternary(opcode: Opcode, a: Slot, b: Slot, c: Slot) -> Self {
        Self::new(opcode, Some(a), Some(b), Some(c))
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Operand `index`, which the opcode requires
    pub fn operand(&self, index: usize) -> Result<Slot> {
        self.operands.get(index).copied().flatten().ok_or_else(|| {
            FalconError::internal(format!("{} is missing operand {}", self.opcode, index + 1))
        })
    }
}

/// A compiled program: instructions, label index and initial memory
#[derive(Debug, Clone, Default, Serialize)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    labels: FxHashMap<String, usize>,
    pub memory: Memory,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, instruction: Instruction) -> usize {
        self.instructions.push(instruction);
        self.instructions.len() - 1
    }

    /// Append a label instruction and index it by the string held in `slot`
    pub fn place_label(&mut self, slot: Slot, span: Option<Span>) -> Result<usize> {
        let name = match self.memory.get(slot)? {
            Value::String(s) => s.to_string_lossy(),
            other => {
                return Err(FalconError::internal(format!(
                    "label operand holds {}",
                    other.variant()
                )));
            }
        };
        if self.labels.contains_key(&name) {
            return Err(FalconError::internal(format!("label {name} placed twice")));
        }
        let mut instruction = Instruction::unary(Opcode::Label, slot);
        instruction.span = span;
        let position = self.emit(instruction);
        self.labels.insert(name, position);
        Ok(position)
    }

    /// Position of the label called `name`
    pub fn resolve_label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    fn operand_text(&self, slot: Slot) -> String {
        let name = self.memory.name(slot);
        if name.starts_with("$c") {
            match self.memory.get(slot) {
                Ok(value) => value.to_string(),
                Err(_) => name.to_string(),
            }
        } else {
            name.to_string()
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, instruction) in self.instructions.iter().enumerate() {
            if instruction.opcode == Opcode::Label {
                if let Some(slot) = instruction.operands[0] {
                    writeln!(f, "{index:04}  {}:", self.memory.name(slot))?;
                }
                continue;
            }
            let operands: Vec<String> = instruction
                .operands
                .iter()
                .flatten()
                .map(|slot| self.operand_text(*slot))
                .collect();
            if operands.is_empty() {
                writeln!(f, "{index:04}      {}", instruction.opcode)?;
            } else {
                writeln!(
                    f,
                    "{index:04}      {:<8}{}",
                    instruction.opcode.mnemonic(),
                    operands.join(", ")
                )?;
            }
        }
        Ok(())
    }
}
