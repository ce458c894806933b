use crate::error::{SchemeError, SchemeResult};
use crate::value::{ClosureId, EnvId, PairId, SymbolId, Value};

/// A single cons cell on the heap.
pub struct ConsCell {
    pub car: Value,
    pub cdr: Value,
}

/// A closure record. `env` is a traced edge: a frame stays alive as long as
/// any reachable closure captured it.
pub struct ClosureCell {
    pub params: Value,
    pub body: Value,
    pub env: EnvId,
}

/// One environment frame: an association list of `(symbol . value)` pairs
/// and the enclosing frame, if any.
pub struct Frame {
    pub bindings: Value,
    pub parent: Option<EnvId>,
}

/// Marker written into swept pair slots to make use-after-free visible.
const POISON: Value = Value::Symbol(SymbolId(0xDEAD));

/// Indexed storage with a mark bit per slot and a free list of swept slots.
struct Slots<T> {
    items: Vec<T>,
    marks: Vec<bool>,
    free: Vec<u32>,
}

impl<T> Slots<T> {
    fn new() -> Self {
        Slots {
            items: Vec::with_capacity(1024),
            marks: Vec::with_capacity(1024),
            free: Vec::new(),
        }
    }

    /// Store `item` in a recycled slot, or append a fresh one.
    fn alloc(&mut self, item: T) -> u32 {
        if let Some(idx) = self.free.pop() {
            self.items[idx as usize] = item;
            self.marks[idx as usize] = false;
            return idx;
        }
        let idx = self.items.len() as u32;
        self.items.push(item);
        self.marks.push(false);
        idx
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn live(&self) -> usize {
        self.items.len() - self.free.len()
    }

    /// Set the mark bit. Returns true if the slot was not already marked.
    fn mark(&mut self, idx: u32) -> bool {
        let slot = &mut self.marks[idx as usize];
        let fresh = !*slot;
        *slot = true;
        fresh
    }

    fn clear_marks(&mut self) {
        self.marks.iter_mut().for_each(|m| *m = false);
    }

    /// Rebuild the free list from unmarked slots. Returns how many slots
    /// were newly freed.
    fn sweep(&mut self, poison: impl Fn(&mut T)) -> usize {
        let previously_free = self.free.len();
        self.free.clear();
        for (i, item) in self.items.iter_mut().enumerate() {
            if !self.marks[i] {
                self.free.push(i as u32);
                poison(item);
            }
        }
        self.free.len() - previously_free
    }
}

/// Object pending a trace of its outgoing edges.
#[derive(Clone, Copy, Debug)]
pub enum Gray {
    Pair(PairId),
    Closure(ClosureId),
    Frame(EnvId),
}

/// Live object counts by arena.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub pairs: usize,
    pub closures: usize,
    pub frames: usize,
}

impl HeapStats {
    pub fn total(&self) -> usize {
        self.pairs + self.closures + self.frames
    }
}

/// The object heap. Pairs, closures and environment frames are allocated
/// here and addressed by index handles.
pub struct Heap {
    pairs: Slots<ConsCell>,
    closures: Slots<ClosureCell>,
    frames: Slots<Frame>,
    /// Maximum number of allocated objects across all arenas.
    capacity: usize,
    /// Number of allocations since last GC (for triggering).
    allocs_since_gc: usize,
    /// Configured allocations between collections.
    base_threshold: usize,
    /// GC threshold: trigger GC when allocs_since_gc reaches this. Never
    /// more than half the headroom left by the last collection.
    gc_threshold: usize,
}

impl Heap {
    pub fn new(capacity: usize, gc_threshold: usize) -> Self {
        let base_threshold = gc_threshold.max(1);
        Heap {
            pairs: Slots::new(),
            closures: Slots::new(),
            frames: Slots::new(),
            capacity,
            allocs_since_gc: 0,
            base_threshold,
            gc_threshold: base_threshold.min(capacity / 2).max(1),
        }
    }

    /// Count one allocation against the capacity.
    /// Free slots in any arena count as room, whichever arena the new
    /// object lands in.
    fn reserve(&mut self) -> SchemeResult<()> {
        if self.allocated() >= self.capacity {
            return Err(SchemeError::HeapExhausted {
                capacity: self.capacity,
            });
        }
        self.allocs_since_gc += 1;
        Ok(())
    }

    /// Allocate a new cons cell. Returns Err(HeapExhausted) if capacity is
    /// reached.
    pub fn alloc_pair(&mut self, car: Value, cdr: Value) -> SchemeResult<PairId> {
        self.reserve()?;
        Ok(PairId(self.pairs.alloc(ConsCell { car, cdr })))
    }

    /// Allocate a pair and return it as a value.
    pub fn cons(&mut self, car: Value, cdr: Value) -> SchemeResult<Value> {
        Ok(Value::Pair(self.alloc_pair(car, cdr)?))
    }

    pub fn alloc_closure(&mut self, params: Value, body: Value, env: EnvId) -> SchemeResult<ClosureId> {
        self.reserve()?;
        Ok(ClosureId(self.closures.alloc(ClosureCell { params, body, env })))
    }

    /// Allocate an empty frame.
    pub fn alloc_frame(&mut self, parent: Option<EnvId>) -> SchemeResult<EnvId> {
        self.reserve()?;
        let frame = Frame {
            bindings: Value::Nil,
            parent,
        };
        Ok(EnvId(self.frames.alloc(frame)))
    }

    /// Get the car of a pair.
    #[inline]
    pub fn car(&self, id: PairId) -> Value {
        self.pairs.items[id.0 as usize].car
    }

    /// Get the cdr of a pair.
    #[inline]
    pub fn cdr(&self, id: PairId) -> Value {
        self.pairs.items[id.0 as usize].cdr
    }

    #[inline]
    pub fn set_cdr(&mut self, id: PairId, val: Value) {
        self.pairs.items[id.0 as usize].cdr = val;
    }

    #[inline]
    pub fn closure(&self, id: ClosureId) -> &ClosureCell {
        &self.closures.items[id.0 as usize]
    }

    #[inline]
    pub fn frame(&self, id: EnvId) -> &Frame {
        &self.frames.items[id.0 as usize]
    }

    #[inline]
    pub fn frame_mut(&mut self, id: EnvId) -> &mut Frame {
        &mut self.frames.items[id.0 as usize]
    }

    /// Build a proper list from a slice of values.
    pub fn list(&mut self, values: &[Value]) -> SchemeResult<Value> {
        let mut result = Value::Nil;
        for &val in values.iter().rev() {
            result = self.cons(val, result)?;
        }
        Ok(result)
    }

    /// Returns true if this value is a proper list.
    pub fn is_proper_list(&self, val: Value) -> bool {
        let mut current = val;
        loop {
            match current {
                Value::Nil => return true,
                Value::Pair(id) => current = self.cdr(id),
                _ => return false,
            }
        }
    }

    /// Collect a proper list into a Vec. Returns None if not a proper list.
    pub fn list_to_vec(&self, val: Value) -> Option<Vec<Value>> {
        let mut result = Vec::new();
        let mut current = val;
        loop {
            match current {
                Value::Nil => return Some(result),
                Value::Pair(id) => {
                    result.push(self.car(id));
                    current = self.cdr(id);
                }
                _ => return None,
            }
        }
    }

    /// Structural equality: numbers, booleans and symbols by value, pairs
    /// element-wise, procedures by identity.
    pub fn equal(&self, a: Value, b: Value) -> bool {
        let mut pending = vec![(a, b)];
        while let Some((x, y)) = pending.pop() {
            match (x, y) {
                (Value::Pair(p), Value::Pair(q)) => {
                    pending.push((self.cdr(p), self.cdr(q)));
                    pending.push((self.car(p), self.car(q)));
                }
                _ if x == y => {}
                _ => return false,
            }
        }
        true
    }

    /// Total slots in use or on a free list, across all arenas.
    pub fn total_slots(&self) -> usize {
        self.pairs.len() + self.closures.len() + self.frames.len()
    }

    /// Live object counts (exact after a collection).
    pub fn stats(&self) -> HeapStats {
        HeapStats {
            pairs: self.pairs.live(),
            closures: self.closures.live(),
            frames: self.frames.live(),
        }
    }

    /// Objects allocated and not yet swept, garbage included.
    fn allocated(&self) -> usize {
        self.stats().total()
    }

    /// Returns true if we should trigger a GC cycle: the threshold is
    /// reached, or the next allocation would fail without one.
    pub fn should_gc(&self) -> bool {
        self.allocs_since_gc >= self.gc_threshold || self.allocated() >= self.capacity
    }

    /// Reset alloc counter after GC.
    pub fn reset_gc_counter(&mut self) {
        self.allocs_since_gc = 0;
    }

    /// Adjust GC threshold after a collection.
    pub fn adjust_gc_threshold(&mut self) {
        let live = self.allocated();
        let total = self.total_slots();
        // High occupancy: double the threshold to avoid thrashing
        let busy = total > 0 && live as f64 / total as f64 > 0.75;
        let wanted = if busy {
            self.gc_threshold.saturating_mul(2)
        } else {
            self.base_threshold
        };
        // Leave room for the allocations between two safe points.
        let headroom = self.capacity.saturating_sub(live);
        self.gc_threshold = wanted.min(headroom / 2).max(1);
    }

    // === GC methods ===

    /// Clear all mark bits (phase 1 of mark-sweep).
    pub fn clear_marks(&mut self) {
        self.pairs.clear_marks();
        self.closures.clear_marks();
        self.frames.clear_marks();
    }

    /// Mark a value as reachable. Heap objects are queued for tracing.
    pub fn mark_value(&mut self, val: Value, worklist: &mut Vec<Gray>) {
        match val {
            Value::Pair(id) => {
                if self.pairs.mark(id.0) {
                    worklist.push(Gray::Pair(id));
                }
            }
            Value::Closure(id) => {
                if self.closures.mark(id.0) {
                    worklist.push(Gray::Closure(id));
                }
            }
            _ => {}
        }
    }

    /// Mark a frame as reachable.
    pub fn mark_env(&mut self, env: EnvId, worklist: &mut Vec<Gray>) {
        if self.frames.mark(env.0) {
            worklist.push(Gray::Frame(env));
        }
    }

    /// Process the mark worklist until every reachable object is marked.
    pub fn process_worklist(&mut self, worklist: &mut Vec<Gray>) {
        while let Some(gray) = worklist.pop() {
            match gray {
                Gray::Pair(id) => {
                    let car = self.car(id);
                    let cdr = self.cdr(id);
                    self.mark_value(car, worklist);
                    self.mark_value(cdr, worklist);
                }
                Gray::Closure(id) => {
                    let (params, body, env) = {
                        let clo = self.closure(id);
                        (clo.params, clo.body, clo.env)
                    };
                    self.mark_value(params, worklist);
                    self.mark_value(body, worklist);
                    self.mark_env(env, worklist);
                }
                Gray::Frame(id) => {
                    let (bindings, parent) = {
                        let frame = self.frame(id);
                        (frame.bindings, frame.parent)
                    };
                    self.mark_value(bindings, worklist);
                    if let Some(parent) = parent {
                        self.mark_env(parent, worklist);
                    }
                }
            }
        }
    }

    /// Sweep: collect unmarked slots to the free lists (phase 2 of
    /// mark-sweep). Returns the number of objects freed by this sweep.
    pub fn sweep(&mut self) -> HeapStats {
        HeapStats {
            pairs: self.pairs.sweep(|cell| {
                cell.car = POISON;
                cell.cdr = POISON;
            }),
            closures: self.closures.sweep(|clo| {
                clo.params = POISON;
                clo.body = POISON;
            }),
            frames: self.frames.sweep(|frame| {
                frame.bindings = POISON;
                frame.parent = None;
            }),
        }
    }
}
