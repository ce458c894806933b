use tracing::{debug, trace};

use crate::config::Limits;
use crate::env;
use crate::error::{SchemeError, SchemeResult};
use crate::heap::{Heap, HeapStats};
use crate::primitives;
use crate::printer;
use crate::reader;
use crate::stack::ensure_sufficient_stack;
use crate::symbol::{sym, SymbolTable};
use crate::value::{EnvId, SymbolId, Value};

/// The evaluation machine.
/// All interpreter state lives here so GC can find roots.
///
/// Collection only happens on entry to [`Machine::eval`]. Every value the
/// evaluator still needs after a nested `eval` returns is kept on `roots`
/// (or `env_roots` for frames), and the expression and frame of every
/// active `eval` call are pushed there on entry. Anything reachable from
/// those stacks or from the global frame survives a collection.
pub struct Machine {
    pub heap: Heap,
    pub symbols: SymbolTable,

    /// The global frame. Created with the machine, reclaimed by `shutdown`.
    global: EnvId,
    /// Values held by active evaluator calls.
    roots: Vec<Value>,
    /// Frames held by active evaluator calls.
    env_roots: Vec<EnvId>,

    /// Current nesting of `eval` calls.
    depth: usize,
    max_depth: Option<usize>,
    /// Number of completed collections.
    collections: usize,
}

impl Machine {
    pub fn new(limits: &Limits) -> SchemeResult<Self> {
        let mut heap = Heap::new(limits.heap_capacity, limits.gc_threshold);
        let symbols = SymbolTable::new();
        let global = env::new_frame(&mut heap, None)?;

        let mut m = Machine {
            heap,
            symbols,
            global,
            roots: Vec::new(),
            env_roots: Vec::new(),
            depth: 0,
            max_depth: limits.max_depth,
            collections: 0,
        };

        m.init_primitives()?;
        debug!(
            heap_capacity = limits.heap_capacity,
            gc_threshold = limits.gc_threshold,
            max_depth = ?limits.max_depth,
            "machine initialized"
        );
        Ok(m)
    }

    /// Bind every primitive in the global frame under its name.
    fn init_primitives(&mut self) -> SchemeResult<()> {
        for (id, prim) in primitives::all() {
            self.define_global(prim.name, Value::Primitive(id))?;
        }
        Ok(())
    }

    /// Bind `name` in the global frame.
    pub fn define_global(&mut self, name: &str, val: Value) -> SchemeResult<()> {
        let id = self.symbols.intern(name);
        env::bind(&mut self.heap, self.global, id, val)
    }

    pub fn print(&self, val: Value) -> String {
        printer::print_val(val, &self.heap, &self.symbols)
    }

    pub fn stats(&self) -> HeapStats {
        self.heap.stats()
    }

    pub fn collections(&self) -> usize {
        self.collections
    }

    // ========================================================================
    // Driver entry points
    // ========================================================================

    /// Evaluate an expression in the global environment.
    pub fn eval_global(&mut self, expr: Value) -> SchemeResult<Value> {
        self.eval(expr, self.global)
    }

    /// Read and evaluate every form in `src`, passing each result to
    /// `on_result`. Stops at the first read or evaluation fault.
    ///
    /// Forms are read one at a time so that unevaluated source never sits
    /// on the Rust stack, invisible to the collector.
    pub fn eval_source(
        &mut self,
        src: &str,
        mut on_result: impl FnMut(&Machine, Value),
    ) -> SchemeResult<()> {
        let mut pos = 0;
        while let Some((expr, next)) = reader::read_one_at(src, pos, &mut self.heap, &mut self.symbols)? {
            pos = next;
            let val = self.eval_global(expr)?;
            on_result(&*self, val);
        }
        Ok(())
    }

    /// Evaluate every form in `src` and return the last result (`Nil` for
    /// empty input).
    pub fn eval_str(&mut self, src: &str) -> SchemeResult<Value> {
        let mut last = Value::Nil;
        self.eval_source(src, |_, val| last = val)?;
        Ok(last)
    }

    // ========================================================================
    // Core evaluation
    // ========================================================================

    /// Evaluate `expr` in `env`.
    ///
    /// Not tail-call optimized: every nested evaluation is a native call.
    /// `ensure_sufficient_stack` grows the stack as needed and `max_depth`
    /// bounds runaway recursion.
    pub fn eval(&mut self, expr: Value, env: EnvId) -> SchemeResult<Value> {
        if let Some(max) = self.max_depth {
            if self.depth >= max {
                return Err(SchemeError::DepthExceeded(max));
            }
        }

        let value_mark = self.roots.len();
        let env_mark = self.env_roots.len();
        self.roots.push(expr);
        self.env_roots.push(env);
        self.depth += 1;

        if self.heap.should_gc() {
            self.collect();
        }

        let result = ensure_sufficient_stack(|| self.eval_inner(expr, env));

        self.depth -= 1;
        self.roots.truncate(value_mark);
        self.env_roots.truncate(env_mark);
        result
    }

    fn eval_inner(&mut self, expr: Value, env: EnvId) -> SchemeResult<Value> {
        match expr {
            Value::Number(_)
            | Value::Boolean(_)
            | Value::Primitive(_)
            | Value::Closure(_)
            | Value::Nil => Ok(expr),
            Value::Symbol(name) => env::find(&self.heap, &self.symbols, env, name),
            Value::Pair(id) => {
                let head = self.heap.car(id);
                let rest = self.heap.cdr(id);
                // Special forms are matched on the literal head symbol before
                // any lookup, so these names cannot be rebound by user code.
                match head {
                    Value::Symbol(sym::IF) => self.eval_if(rest, env),
                    Value::Symbol(sym::DEFINE) => self.eval_define(rest, env),
                    Value::Symbol(sym::LAMBDA) => self.eval_lambda(rest, env),
                    Value::Symbol(sym::AND) => self.eval_and(rest, env),
                    Value::Symbol(sym::OR) => self.eval_or(rest, env),
                    _ => self.eval_application(head, rest, env),
                }
            }
        }
    }

    /// Unpack the operands of a special form, requiring exactly `N`.
    fn form_operands<const N: usize>(&self, rest: Value, shape: &str) -> SchemeResult<[Value; N]> {
        self.heap
            .list_to_vec(rest)
            .and_then(|ops| <[Value; N]>::try_from(ops).ok())
            .ok_or_else(|| SchemeError::malformed(format!("expected {}", shape)))
    }

    /// (if test conseq alt)
    fn eval_if(&mut self, rest: Value, env: EnvId) -> SchemeResult<Value> {
        let [test, conseq, alt] = self.form_operands::<3>(rest, "(if test conseq alt)")?;
        if self.eval(test, env)?.is_false() {
            self.eval(alt, env)
        } else {
            self.eval(conseq, env)
        }
    }

    /// (define sym expr): binds in the current frame only.
    fn eval_define(&mut self, rest: Value, env: EnvId) -> SchemeResult<Value> {
        let [target, expr] = self.form_operands::<2>(rest, "(define symbol expr)")?;
        let name = target
            .as_symbol()
            .ok_or_else(|| SchemeError::malformed("define: target must be a symbol"))?;
        let val = self.eval(expr, env)?;
        env::bind(&mut self.heap, env, name, val)?;
        trace!(name = self.symbols.name(name), "defined");
        Ok(Value::Nil)
    }

    /// (lambda (params ...) body): a single body expression.
    fn eval_lambda(&mut self, rest: Value, env: EnvId) -> SchemeResult<Value> {
        let [params, body] = self.form_operands::<2>(rest, "(lambda (params ...) body)")?;
        let all_symbols = self
            .heap
            .list_to_vec(params)
            .is_some_and(|ps| ps.iter().all(|p| p.as_symbol().is_some()));
        if !all_symbols {
            return Err(SchemeError::malformed(
                "lambda: parameters must be a list of symbols",
            ));
        }
        let id = self.heap.alloc_closure(params, body, env)?;
        Ok(Value::Closure(id))
    }

    /// (and e ...): only a `#f` result short-circuits.
    fn eval_and(&mut self, rest: Value, env: EnvId) -> SchemeResult<Value> {
        if !self.heap.is_proper_list(rest) {
            return Err(SchemeError::malformed("and: improper operand list"));
        }
        let mut current = rest;
        while let Value::Pair(id) = current {
            let operand = self.heap.car(id);
            if self.eval(operand, env)? == Value::Boolean(false) {
                return Ok(Value::Boolean(false));
            }
            current = self.heap.cdr(id);
        }
        Ok(Value::Boolean(true))
    }

    /// (or e ...): only a `#t` result short-circuits.
    fn eval_or(&mut self, rest: Value, env: EnvId) -> SchemeResult<Value> {
        if !self.heap.is_proper_list(rest) {
            return Err(SchemeError::malformed("or: improper operand list"));
        }
        let mut current = rest;
        while let Value::Pair(id) = current {
            let operand = self.heap.car(id);
            if self.eval(operand, env)? == Value::Boolean(true) {
                return Ok(Value::Boolean(true));
            }
            current = self.heap.cdr(id);
        }
        Ok(Value::Boolean(false))
    }

    /// Evaluate the head, then each argument left to right, then apply.
    fn eval_application(&mut self, head: Value, rest: Value, env: EnvId) -> SchemeResult<Value> {
        if !self.heap.is_proper_list(rest) {
            return Err(SchemeError::malformed("improper argument list"));
        }
        let proc = self.eval(head, env)?;
        if !proc.is_procedure() {
            return Err(self.not_a_procedure(proc));
        }
        self.roots.push(proc);

        let base = self.roots.len();
        let mut current = rest;
        while let Value::Pair(id) = current {
            let operand = self.heap.car(id);
            let arg = self.eval(operand, env)?;
            self.roots.push(arg);
            current = self.heap.cdr(id);
        }

        let evaluated = self.roots[base..].to_vec();
        let args = self.heap.list(&evaluated)?;
        self.apply(proc, args)
    }

    /// Apply a procedure to an evaluated argument list.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn apply(&mut self, proc: Value, args: Value) -> SchemeResult<Value> {
        match proc {
            Value::Primitive(id) => primitives::call_primitive(id, args, &self.heap),
            Value::Closure(id) => {
                let (params, body, captured) = {
                    let clo = self.heap.closure(id);
                    (clo.params, clo.body, clo.env)
                };
                let frame = env::new_frame(&mut self.heap, Some(captured))?;
                self.bind_params(frame, params, args)?;
                self.eval(body, frame)
            }
            other => Err(self.not_a_procedure(other)),
        }
    }

    /// Bind each parameter to the matching argument. The counts must agree.
    fn bind_params(&mut self, frame: EnvId, params: Value, args: Value) -> SchemeResult<()> {
        let names: Vec<SymbolId> = self
            .heap
            .list_to_vec(params)
            .unwrap_or_default()
            .into_iter()
            .filter_map(Value::as_symbol)
            .collect();
        let values = self
            .heap
            .list_to_vec(args)
            .ok_or_else(|| SchemeError::malformed("improper argument list"))?;

        if names.len() != values.len() {
            return Err(SchemeError::arity("#<closure>", names.len().to_string(), values.len()));
        }
        for (name, val) in names.into_iter().zip(values) {
            env::bind(&mut self.heap, frame, name, val)?;
        }
        Ok(())
    }

    fn not_a_procedure(&self, val: Value) -> SchemeError {
        SchemeError::NotAProcedure(printer::describe(val, &self.heap, &self.symbols))
    }

    // ========================================================================
    // Collection
    // ========================================================================

    /// Run a full collection from the global frame and the root stacks.
    /// Returns the number of objects freed.
    pub fn collect(&mut self) -> HeapStats {
        self.run_gc(true)
    }

    fn run_gc(&mut self, include_globals: bool) -> HeapStats {
        self.heap.clear_marks();
        let mut worklist = Vec::new();

        if include_globals {
            self.heap.mark_env(self.global, &mut worklist);
        }
        for &val in &self.roots {
            self.heap.mark_value(val, &mut worklist);
        }
        for &env in &self.env_roots {
            self.heap.mark_env(env, &mut worklist);
        }

        self.heap.process_worklist(&mut worklist);

        let freed = self.heap.sweep();
        self.heap.reset_gc_counter();
        self.heap.adjust_gc_threshold();
        self.collections += 1;

        let live = self.heap.stats();
        debug!(
            freed = freed.total(),
            live_pairs = live.pairs,
            live_closures = live.closures,
            live_frames = live.frames,
            "collection finished"
        );
        freed
    }

    /// Tear down the global environment: drop every root and collect, so
    /// every pair, closure and frame the program created is reclaimed.
    /// Returns the live counts afterwards, which are zero.
    pub fn shutdown(mut self) -> HeapStats {
        self.roots.clear();
        self.env_roots.clear();
        let freed = self.run_gc(false);
        let live = self.heap.stats();
        debug!(
            freed = freed.total(),
            remaining = live.total(),
            symbols = self.symbols.count(),
            "machine shut down"
        );
        live
    }
}
