use std::fmt;

/// Unique identifier for an interned symbol.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

/// Index into the pair arena. This is the GC handle for cons cells.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairId(pub u32);

/// Index into the closure arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClosureId(pub u32);

/// Index into the environment frame arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvId(pub u32);

/// Index into the static primitive table.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimitiveId(pub u16);

/// The fundamental runtime value.
/// Copy semantics: pair and closure data live in the heap.
///
/// `PartialEq` here is handle identity for pairs and closures and value
/// equality for immediates. Use `Heap::equal` for structural comparison.
#[derive(Clone, Copy, PartialEq)]
pub enum Value {
    Nil,
    Number(f64),
    Boolean(bool),
    Symbol(SymbolId),
    Pair(PairId),
    Primitive(PrimitiveId),
    Closure(ClosureId),
}

impl Value {
    /// Only `#f` is false. Every other value, `0` and `()` included, is truthy.
    pub fn is_false(self) -> bool {
        matches!(self, Value::Boolean(false))
    }

    pub fn is_procedure(self) -> bool {
        matches!(self, Value::Primitive(_) | Value::Closure(_))
    }

    pub fn as_symbol(self) -> Option<SymbolId> {
        match self {
            Value::Symbol(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_number(self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Name of the variant, used in type mismatch diagnostics.
    pub fn type_name(self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::Symbol(_) => "symbol",
            Value::Pair(_) => "pair",
            Value::Primitive(_) => "procedure",
            Value::Closure(_) => "closure",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Number(n) => write!(f, "Num({})", n),
            Value::Boolean(b) => write!(f, "Bool({})", b),
            Value::Symbol(id) => write!(f, "Sym({})", id.0),
            Value::Pair(id) => write!(f, "Pair({})", id.0),
            Value::Primitive(id) => write!(f, "Prim({})", id.0),
            Value::Closure(id) => write!(f, "Clo({})", id.0),
        }
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolId({})", self.0)
    }
}

impl fmt::Debug for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PairId({})", self.0)
    }
}

impl fmt::Debug for ClosureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClosureId({})", self.0)
    }
}

impl fmt::Debug for EnvId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EnvId({})", self.0)
    }
}

impl fmt::Debug for PrimitiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrimitiveId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_boolean_false_is_false() {
        assert!(Value::Boolean(false).is_false());
        assert!(!Value::Boolean(true).is_false());
        assert!(!Value::Number(0.0).is_false());
        assert!(!Value::Nil.is_false());
    }

    #[test]
    fn procedures_are_primitives_and_closures() {
        assert!(Value::Primitive(PrimitiveId(0)).is_procedure());
        assert!(Value::Closure(ClosureId(3)).is_procedure());
        assert!(!Value::Symbol(SymbolId(1)).is_procedure());
        assert!(!Value::Pair(PairId(0)).is_procedure());
    }

    #[test]
    fn accessors_match_variant() {
        assert_eq!(Value::Number(2.5).as_number(), Some(2.5));
        assert_eq!(Value::Boolean(true).as_number(), None);
        assert_eq!(Value::Symbol(SymbolId(4)).as_symbol(), Some(SymbolId(4)));
        assert_eq!(Value::Pair(PairId(7)).as_symbol(), None);
        assert_eq!(Value::Number(1.0).type_name(), "number");
    }
}
