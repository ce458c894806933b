//! Stack safety for the recursive evaluator, reader and printer.
//!
//! Evaluation is direct recursion with no trampoline, so a non-tail
//! recursive program nests one native frame per call. Wrapping recursive
//! entry points in [`ensure_sufficient_stack`] grows the stack on demand,
//! which moves the practical limit from the main thread's stack size to
//! available memory (and the heap capacity, since every call allocates a
//! frame).
//!
//! - **Red zone**: 100KB - if less than this remains, the stack is grown
//! - **Growth size**: 1MB per growth

const RED_ZONE: usize = 100 * 1024;

const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Ensure sufficient stack space is available before executing `f`.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_recursion_does_not_overflow() {
        fn depth(n: u64) -> u64 {
            ensure_sufficient_stack(|| if n == 0 { 0 } else { depth(n - 1) + 1 })
        }

        assert_eq!(depth(100_000), 100_000);
    }

    #[test]
    fn passes_results_through() {
        let result: Result<i32, &str> = ensure_sufficient_stack(|| Ok(7));
        assert_eq!(result, Ok(7));
    }
}
