//! Stack of symbol tables
//!
//! The bottom entry is the global scope and lives as long as the compiler.
//! Lookups walk from the innermost scope outwards.

use super::SymbolTable;
use crate::error::{FalconError, Result};
use crate::program::{Memory, Slot};
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct ScopeStack {
    /// Index 0 is global
    scopes: Vec<SymbolTable>,
}

impl ScopeStack {
    pub fn new(global: SymbolTable) -> Self {
        ScopeStack {
            scopes: vec![global],
        }
    }

    /// Install `table` as the current scope, returning the new depth
    pub fn push_scope(&mut self, table: SymbolTable) -> usize {
        self.scopes.push(table);
        self.scopes.len() - 1
    }

    /// Remove the current scope and hand it back
    pub fn pop_scope(&mut self) -> Result<SymbolTable> {
        if self.scopes.len() <= 1 {
            return Err(FalconError::internal("cannot pop the global scope"));
        }
        self.scopes
            .pop()
            .ok_or_else(|| FalconError::internal("scope stack is empty"))
    }

    /// True while no function scope is open
    pub fn is_global(&self) -> bool {
        self.scopes.len() == 1
    }

    /// Look a name up from the current scope down to the global one
    pub fn lookup(&self, name: &str) -> Option<Slot> {
        self.scopes.iter().rev().find_map(|scope| scope.lookup(name))
    }

    /// Look a name up in the current scope only
    pub fn lookup_local(&self, name: &str) -> Option<Slot> {
        self.current().lookup(name)
    }

    pub fn current(&self) -> &SymbolTable {
        // never empty: pop_scope refuses to remove the global scope
        &self.scopes[self.scopes.len() - 1]
    }

    pub fn current_mut(&mut self) -> &mut SymbolTable {
        let top = self.scopes.len() - 1;
        &mut self.scopes[top]
    }

    pub fn global_mut(&mut self) -> &mut SymbolTable {
        &mut self.scopes[0]
    }

    /// Insert into the current scope
    pub fn insert(&mut self, memory: &mut Memory, name: &str, value: &Value) -> Slot {
        self.current_mut().insert(memory, name, value)
    }
}
