//! Lexical environments.
//!
//! A frame's bindings are an association list of `(name . value)` pairs
//! built from ordinary heap pairs. Lookup walks the frame linearly and then
//! the parent chain; `bind` only ever touches the frame it is given.

use crate::error::{SchemeError, SchemeResult};
use crate::heap::Heap;
use crate::symbol::SymbolTable;
use crate::value::{EnvId, SymbolId, Value};

/// Allocate a frame with no bindings.
pub fn new_frame(heap: &mut Heap, parent: Option<EnvId>) -> SchemeResult<EnvId> {
    heap.alloc_frame(parent)
}

/// Find the `(name . value)` binding pair in a single frame.
fn lookup_in_frame(heap: &Heap, env: EnvId, name: SymbolId) -> Option<Value> {
    let mut current = heap.frame(env).bindings;
    while let Value::Pair(id) = current {
        let binding = heap.car(id);
        if let Value::Pair(bid) = binding {
            if heap.car(bid) == Value::Symbol(name) {
                return Some(binding);
            }
        }
        current = heap.cdr(id);
    }
    None
}

/// Look up `name`, searching `env` and then each enclosing frame.
pub fn lookup(heap: &Heap, env: EnvId, name: SymbolId) -> Option<Value> {
    let mut frame = Some(env);
    while let Some(id) = frame {
        if let Some(Value::Pair(bid)) = lookup_in_frame(heap, id, name) {
            return Some(heap.cdr(bid));
        }
        frame = heap.frame(id).parent;
    }
    None
}

/// Like `lookup`, but an unbound name is an `UnboundVariable` fault.
pub fn find(heap: &Heap, symbols: &SymbolTable, env: EnvId, name: SymbolId) -> SchemeResult<Value> {
    lookup(heap, env, name).ok_or_else(|| SchemeError::UnboundVariable(symbols.name(name).to_string()))
}

/// Set or add a binding in `env` itself.
/// If the name is already bound in this frame, mutate its value. Otherwise
/// prepend a fresh binding pair.
pub fn bind(heap: &mut Heap, env: EnvId, name: SymbolId, val: Value) -> SchemeResult<()> {
    if let Some(Value::Pair(bid)) = lookup_in_frame(heap, env, name) {
        heap.set_cdr(bid, val);
        return Ok(());
    }

    let binding = heap.cons(Value::Symbol(name), val)?;
    let bindings = heap.frame(env).bindings;
    let node = heap.cons(binding, bindings)?;
    heap.frame_mut(env).bindings = node;
    Ok(())
}
