//! Interpreter limits, read from environment variables.

use std::env;

pub const HEAP_CAPACITY_VAR: &str = "MINISCHEME_HEAP_CAPACITY";
pub const GC_THRESHOLD_VAR: &str = "MINISCHEME_GC_THRESHOLD";
pub const MAX_DEPTH_VAR: &str = "MINISCHEME_MAX_DEPTH";

/// Default maximum number of live heap objects.
pub const DEFAULT_HEAP_CAPACITY: usize = 4 * 1024 * 1024;

/// Default number of allocations between collections.
pub const DEFAULT_GC_THRESHOLD: usize = 64 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Limits {
    pub heap_capacity: usize,
    pub gc_threshold: usize,
    /// Maximum nesting of `eval` calls. `None` means unlimited.
    pub max_depth: Option<usize>,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            heap_capacity: DEFAULT_HEAP_CAPACITY,
            gc_threshold: DEFAULT_GC_THRESHOLD,
            max_depth: None,
        }
    }
}

impl Limits {
    /// Build limits from the environment, falling back to defaults for
    /// unset variables.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build limits from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let defaults = Limits::default();
        Ok(Limits {
            heap_capacity: parse_opt_usize(HEAP_CAPACITY_VAR, lookup(HEAP_CAPACITY_VAR))?
                .unwrap_or(defaults.heap_capacity),
            gc_threshold: parse_opt_usize(GC_THRESHOLD_VAR, lookup(GC_THRESHOLD_VAR))?
                .unwrap_or(defaults.gc_threshold),
            max_depth: parse_opt_usize(MAX_DEPTH_VAR, lookup(MAX_DEPTH_VAR))?,
        })
    }
}

fn parse_opt_usize(name: &str, value: Option<String>) -> Result<Option<usize>, String> {
    match value {
        None => Ok(None),
        Some(v) => {
            let n = v
                .trim()
                .parse::<usize>()
                .map_err(|_| format!("invalid {}: {}", name, v))?;
            if n == 0 {
                return Err(format!("invalid {}: must be positive", name));
            }
            Ok(Some(n))
        }
    }
}
