//! Instruction interpreter
//!
//! A single program counter walks the instruction vector. Every run starts from
//! a private copy of the program's memory, so a compiled program can be
//! executed any number of times with the same result.

pub mod ops;

use crate::builtins;
use crate::error::{ErrorKind, FalconError, Result};
use crate::program::{Instruction, Memory, Opcode, Program, Slot};
use crate::value::Value;
use ops::Relation;
use std::io::{BufRead, Write};
use tracing::{debug, trace};

/// Execution knobs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Stop with a runtime error after this many executed instructions
    pub step_limit: Option<u64>,
}

pub struct Interpreter<'p, R, W> {
    program: &'p Program,
    memory: Memory,
    input: R,
    output: W,
    options: RunOptions,
    steps: u64,
}

impl<'p, R: BufRead, W: Write> Interpreter<'p, R, W> {
    pub fn new(program: &'p Program, input: R, output: W) -> Self {
        Self {
            program,
            memory: program.memory.clone(),
            input,
            output,
            options: RunOptions::default(),
            steps: 0,
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Execute until the last instruction completes or an error halts the run
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn run(&mut self) -> Result<()> {
        self.memory = self.program.memory.clone();
        self.steps = 0;

        let program = self.program;
        let mut pc = 0;
        let result = loop {
            let Some(instruction) = program.instructions.get(pc) else {
                break Ok(());
            };
            if let Some(limit) = self.options.step_limit {
                if self.steps >= limit {
                    break Err(FalconError::runtime(format!(
                        "step limit of {limit} instructions exceeded"
                    ))
                    .or_span(instruction.span));
                }
            }
            self.steps += 1;
            match self.step(instruction, pc) {
                Ok(next) => pc = next,
                Err(err) => break Err(err.or_span(instruction.span)),
            }
        };

        self.output.flush()?;
        debug!(steps = self.steps, ok = result.is_ok(), "halted");
        result
    }

    /// Number of instructions executed by the last run
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Value bound to a cell of the given name, as the last run left it
    pub fn value_of(&self, name: &str) -> Option<&Value> {
        self.memory
            .iter()
            .find(|(_, cell)| cell.name == name)
            .map(|(_, cell)| &cell.value)
    }

    /// A defined operand value
    fn read(&self, slot: Slot) -> Result<&Value> {
        let value = self.memory.get(slot)?;
        if value.is_undefined() {
            return Err(FalconError::undefined_variable(self.memory.name(slot)));
        }
        Ok(value)
    }

    fn read_optional(&self, slot: Option<Slot>) -> Result<Option<&Value>> {
        slot.map(|slot| self.read(slot)).transpose()
    }

    fn label_target(&self, slot: Slot) -> Result<usize> {
        let name = match self.read(slot)? {
            Value::String(s) => s.to_string_lossy(),
            other => {
                return Err(FalconError::runtime(format!(
                    "jump target is a {}, not a label",
                    other.variant()
                )));
            }
        };
        let target = self
            .program
            .resolve_label(&name)
            .ok_or_else(|| FalconError::runtime(format!("unresolved label {name}")))?;
        trace!(label = %name, target, "jump");
        Ok(target)
    }

    /// Destination and both sources of an arithmetic or relational instruction
    fn arith_operands(instruction: &Instruction) -> Result<(Slot, Slot, Slot)> {
        let dst = instruction.operand(0)?;
        match instruction.operands[2] {
            Some(right) => Ok((dst, instruction.operand(1)?, right)),
            None => Ok((dst, dst, instruction.operand(1)?)),
        }
    }

    fn binary(
        &mut self,
        instruction: &Instruction,
        op: fn(&Value, &Value) -> Result<Value>,
    ) -> Result<()> {
        let (dst, left, right) = Self::arith_operands(instruction)?;
        let result = op(self.read(left)?, self.read(right)?)?;
        self.memory.set(dst, result)
    }

    fn relation(&mut self, instruction: &Instruction, relation: Relation) -> Result<()> {
        let (dst, left, right) = Self::arith_operands(instruction)?;
        let result = ops::compare(relation, self.read(left)?, self.read(right)?)?;
        self.memory.set(dst, result)
    }

    /// Execute one instruction, returning the next program counter
    fn step(&mut self, instruction: &Instruction, pc: usize) -> Result<usize> {
        trace!(pc, opcode = %instruction.opcode, "step");
        match instruction.opcode {
            Opcode::Nop | Opcode::Label => {}
            Opcode::Jump => return self.label_target(instruction.operand(0)?),
            Opcode::BranchFalse => {
                let condition = self.read(instruction.operand(0)?)?;
                if condition.is_falsy() {
                    return self.label_target(instruction.operand(1)?);
                }
            }
            Opcode::Copy => {
                let dst = instruction.operand(0)?;
                let value = self.read(instruction.operand(1)?)?.clone();
                let target = self.memory.get_mut(dst)?;
                if matches!(target, Value::Constant) {
                    return Err(FalconError::new(
                        ErrorKind::Semantic,
                        format!("cannot assign to constant {}", self.memory.name(dst)),
                    ));
                }
                target.assign(&value);
            }
            Opcode::Add => self.binary(instruction, ops::add)?,
            Opcode::Sub => self.binary(instruction, ops::sub)?,
            Opcode::Mul => self.binary(instruction, ops::mul)?,
            Opcode::Div => self.binary(instruction, ops::div)?,
            Opcode::Pow => self.binary(instruction, ops::pow)?,
            Opcode::Equal => self.relation(instruction, Relation::Equal)?,
            Opcode::Unequal => self.relation(instruction, Relation::Unequal)?,
            Opcode::GreaterEq => self.relation(instruction, Relation::GreaterEq)?,
            Opcode::LessEq => self.relation(instruction, Relation::LessEq)?,
            Opcode::Less => self.relation(instruction, Relation::Less)?,
            Opcode::Greater => self.relation(instruction, Relation::Greater)?,
            Opcode::Cut => {
                let target = instruction.operand(0)?;
                let result = ops::cut(
                    self.read(target)?,
                    self.read_optional(instruction.operands[1])?,
                    self.read_optional(instruction.operands[2])?,
                )?;
                self.memory.set(target, result)?;
            }
            Opcode::Input => {
                let line = builtins::read_line(&mut self.input)?;
                self.memory.set(instruction.operand(0)?, Value::String(line))?;
            }
            Opcode::Print => {
                if let Some(text) = self.read(instruction.operand(0)?)?.to_text() {
                    self.output.write_all(text.as_bytes())?;
                }
            }
            Opcode::Numeric => {
                let n = builtins::to_number(self.read(instruction.operand(1)?)?)?;
                self.memory.set(instruction.operand(0)?, Value::Number(n))?;
            }
            Opcode::TypeOf => {
                let tag = builtins::to_type_tag(self.read(instruction.operand(1)?)?);
                self.memory.set(instruction.operand(0)?, Value::Number(tag))?;
            }
            Opcode::Len => {
                let len = builtins::length(self.read(instruction.operand(1)?)?);
                self.memory.set(instruction.operand(0)?, Value::Number(len))?;
            }
            Opcode::Find => {
                let haystack = self.read(instruction.operand(1)?)?;
                let needle = self.read(instruction.operand(2)?)?;
                let result = match (haystack, needle) {
                    (Value::String(h), Value::String(n)) => {
                        match builtins::substring_search(h.as_bytes(), n.as_bytes()) {
                            Some(position) => Value::Number(position as f64),
                            None => Value::Nil,
                        }
                    }
                    _ => {
                        return Err(FalconError::type_compatibility(
                            "find",
                            haystack.variant().name(),
                            needle.variant().name(),
                        ));
                    }
                };
                self.memory.set(instruction.operand(0)?, result)?;
            }
            Opcode::Sort => {
                let sorted = match self.read(instruction.operand(1)?)? {
                    Value::String(s) => builtins::sort(s),
                    other => {
                        return Err(FalconError::type_compatibility(
                            "sort",
                            other.variant().name(),
                            "nothing",
                        ));
                    }
                };
                self.memory.set(instruction.operand(0)?, Value::String(sorted))?;
            }
        }
        Ok(pc + 1)
    }
}
