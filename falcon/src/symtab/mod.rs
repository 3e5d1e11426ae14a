//! Symbol tables and the scope stack

mod scope;

pub use scope::ScopeStack;

use crate::builtins::Builtin;
use crate::program::{Memory, Slot};
use crate::value::{FunctionDescriptor, Value};
use rustc_hash::FxHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};

/// Number of hash chains per table
pub const BUCKET_COUNT: usize = 101;

/// Names reserved for future use; they can be neither read nor assigned
pub const RESERVED_CONSTANTS: &[&str] = &[
    "as",
    "def",
    "directive",
    "export",
    "from",
    "import",
    "launch",
    "load",
    "macro",
];

/// A name bound to a memory cell
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub slot: Slot,
}

/// One scope: a chained hash map from name to slot
#[derive(Debug, Clone)]
pub struct SymbolTable {
    buckets: Vec<VecDeque<Binding>>,
    len: usize,
}

fn bucket_index(name: &str) -> usize {
    let mut hasher = FxHasher::default();
    name.hash(&mut hasher);
    (hasher.finish() % BUCKET_COUNT as u64) as usize
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            buckets: vec![VecDeque::new(); BUCKET_COUNT],
            len: 0,
        }
    }

    /// Fresh table holding the reserved constants and builtin functions
    pub fn seeded(memory: &mut Memory) -> Self {
        let mut table = Self::new();
        for name in RESERVED_CONSTANTS {
            table.insert(memory, name, &Value::Constant);
        }
        for builtin in Builtin::ALL {
            let descriptor = FunctionDescriptor::new(
                builtin.params().iter().map(|p| p.to_string()).collect(),
            );
            table.insert(memory, builtin.name(), &Value::Function(descriptor));
        }
        table
    }

    pub fn lookup(&self, name: &str) -> Option<Slot> {
        self.buckets[bucket_index(name)]
            .iter()
            .find(|binding| binding.name == name)
            .map(|binding| binding.slot)
    }

    /// Bind `name` to a copy of `value`
    ///
    /// An existing binding keeps its slot and has its value overwritten; a new
    /// one gets a fresh cell and goes to the front of its chain.
    pub fn insert(&mut self, memory: &mut Memory, name: &str, value: &Value) -> Slot {
        if let Some(slot) = self.lookup(name) {
            if let Ok(cell) = memory.get_mut(slot) {
                cell.assign(value);
                return slot;
            }
        }
        let slot = memory.alloc(name, value.clone());
        self.bind(name, slot);
        slot
    }

    /// Bind `name` to an already allocated cell
    pub fn bind(&mut self, name: &str, slot: Slot) {
        let chain = &mut self.buckets[bucket_index(name)];
        if let Some(binding) = chain.iter_mut().find(|binding| binding.name == name) {
            binding.slot = slot;
            return;
        }
        chain.push_front(Binding {
            name: name.to_string(),
            slot,
        });
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Variant;

    #[test]
    fn test_insert_then_lookup() {
        let mut memory = Memory::new();
        let mut table = SymbolTable::new();
        let slot = table.insert(&mut memory, "x", &Value::Number(1.0));
        assert_eq!(table.lookup("x"), Some(slot));
        assert_eq!(table.lookup("y"), None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_insert_existing_overwrites_in_place() {
        let mut memory = Memory::new();
        let mut table = SymbolTable::new();
        let first = table.insert(&mut memory, "x", &Value::Number(1.0));
        let second = table.insert(&mut memory, "x", &Value::string("two"));
        assert_eq!(first, second);
        assert_eq!(table.len(), 1);
        assert_eq!(memory.get(first).unwrap(), &Value::string("two"));
    }

    #[test]
    fn test_insert_stores_deep_copy() {
        let mut memory = Memory::new();
        let mut table = SymbolTable::new();
        let mut value = Value::string("abc");
        let slot = table.insert(&mut memory, "s", &value);
        if let Value::String(s) = &mut value {
            s.push(b'!').unwrap();
        }
        assert_eq!(memory.get(slot).unwrap(), &Value::string("abc"));
    }

    #[test]
    fn test_colliding_names_keep_their_own_slots() {
        let mut memory = Memory::new();
        let mut table = SymbolTable::new();
        // Find two names sharing a bucket
        let first = "a0".to_string();
        let second = (1..10_000)
            .map(|i| format!("a{i}"))
            .find(|name| bucket_index(name) == bucket_index(&first))
            .unwrap();
        let a = table.insert(&mut memory, &first, &Value::Nil);
        let b = table.insert(&mut memory, &second, &Value::Number(2.0));
        assert_ne!(a, b);
        assert_eq!(table.lookup(&first), Some(a));
        assert_eq!(table.lookup(&second), Some(b));
        assert_eq!(table.buckets[bucket_index(&first)].front().map(|binding| binding.slot), Some(b));
    }

    #[test]
    fn test_bucket_index_in_range() {
        for name in ["", "x", "while", "a_very_long_identifier_name"] {
            assert!(bucket_index(name) < BUCKET_COUNT);
        }
    }

    #[test]
    fn test_seeded_table() {
        let mut memory = Memory::new();
        let table = SymbolTable::seeded(&mut memory);
        assert_eq!(table.len(), RESERVED_CONSTANTS.len() + Builtin::ALL.len());

        let import = table.lookup("import").unwrap();
        assert_eq!(memory.get(import).unwrap(), &Value::Constant);

        let find = table.lookup("find").unwrap();
        match memory.get(find).unwrap() {
            Value::Function(desc) => assert_eq!(desc.arity(), 2),
            other => panic!("expected function, got {other:?}"),
        }
        assert_eq!(
            memory.get(table.lookup("print").unwrap()).unwrap().variant(),
            Variant::Function
        );
    }

    #[test]
    fn test_seeded_tables_do_not_share_cells() {
        let mut memory = Memory::new();
        let a = SymbolTable::seeded(&mut memory);
        let b = SymbolTable::seeded(&mut memory);
        assert_ne!(a.lookup("len"), b.lookup("len"));
    }
}
