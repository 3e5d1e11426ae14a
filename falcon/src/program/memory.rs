//! Value storage addressed by slot

use crate::error::{FalconError, Result};
use crate::value::Value;
use serde::Serialize;
use std::fmt;

/// Index of a value cell in [`Memory`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Slot(pub u32);

impl Slot {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// A named value cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub name: String,
    pub value: Value,
}

/// Arena owning every value a program touches
///
/// Cells are never freed; symbol tables hold slots into it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Memory {
    cells: Vec<Cell>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, name: impl Into<String>, value: Value) -> Slot {
        let slot = Slot(self.cells.len() as u32);
        self.cells.push(Cell {
            name: name.into(),
            value,
        });
        slot
    }

    fn cell(&self, slot: Slot) -> Result<&Cell> {
        self.cells
            .get(slot.index())
            .ok_or_else(|| FalconError::internal(format!("dangling slot {slot}")))
    }

    pub fn get(&self, slot: Slot) -> Result<&Value> {
        Ok(&self.cell(slot)?.value)
    }

    pub fn get_mut(&mut self, slot: Slot) -> Result<&mut Value> {
        self.cells
            .get_mut(slot.index())
            .map(|cell| &mut cell.value)
            .ok_or_else(|| FalconError::internal(format!("dangling slot {slot}")))
    }

    pub fn set(&mut self, slot: Slot, value: Value) -> Result<()> {
        *self.get_mut(slot)? = value;
        Ok(())
    }

    /// Name the cell was allocated under, or `?` for an unknown slot
    pub fn name(&self, slot: Slot) -> &str {
        self.cell(slot).map(|cell| cell.name.as_str()).unwrap_or("?")
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Slot, &Cell)> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, cell)| (Slot(i as u32), cell))
    }
}
