use rustc_hash::FxHashMap;

use crate::value::SymbolId;

/// Interned symbol table. Each unique symbol name maps to a unique SymbolId,
/// so symbol equality by content is id equality.
///
/// Symbols are never collected: a name interned once stays for the life of
/// the table.
pub struct SymbolTable {
    name_to_id: FxHashMap<String, SymbolId>,
    id_to_name: Vec<String>,
}

/// Well-known symbol IDs, pre-interned at startup.
/// These must match the order of interning in SymbolTable::new().
pub mod sym {
    use crate::value::SymbolId;

    pub const IF: SymbolId = SymbolId(0);
    pub const DEFINE: SymbolId = SymbolId(1);
    pub const LAMBDA: SymbolId = SymbolId(2);
    pub const AND: SymbolId = SymbolId(3);
    pub const OR: SymbolId = SymbolId(4);
}

/// Names of the special forms, in `sym` order.
pub const KEYWORDS: [&str; 5] = ["if", "define", "lambda", "and", "or"];

impl SymbolTable {
    /// Create a new symbol table with the special-form keywords pre-interned.
    pub fn new() -> Self {
        let mut table = SymbolTable {
            name_to_id: FxHashMap::default(),
            id_to_name: Vec::new(),
        };
        for name in KEYWORDS {
            table.intern(name);
        }
        table
    }

    /// Intern a symbol name. Returns the existing ID if already interned,
    /// or creates a new one.
    pub fn intern(&mut self, name: &str) -> SymbolId {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }
        let id = SymbolId(self.id_to_name.len() as u32);
        self.name_to_id.insert(name.to_string(), id);
        self.id_to_name.push(name.to_string());
        id
    }

    /// Look up a symbol name by its ID.
    pub fn name(&self, id: SymbolId) -> &str {
        &self.id_to_name[id.0 as usize]
    }

    /// Look up a symbol ID by name, without interning.
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.name_to_id.get(name).copied()
    }

    /// Total number of interned symbols.
    pub fn count(&self) -> usize {
        self.id_to_name.len()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
