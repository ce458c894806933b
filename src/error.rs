use thiserror::Error;

/// Faults raised while reading or evaluating a program.
///
/// None of these terminate the process; they propagate to the driver,
/// which decides whether to abandon a REPL turn or the whole run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemeError {
    /// Symbol lookup exhausted the environment chain.
    #[error("unbound variable '{0}'")]
    UnboundVariable(String),

    /// Application head is neither a primitive nor a closure.
    #[error("not a procedure: {0}")]
    NotAProcedure(String),

    /// Procedure invoked with the wrong number of arguments.
    #[error("{procedure}: expected {expected} argument(s), got {got}")]
    ArityMismatch {
        procedure: String,
        expected: String,
        got: usize,
    },

    /// Operand of the wrong variant.
    #[error("{procedure}: expected {expected}, got {got}")]
    TypeMismatch {
        procedure: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    /// Reader faults and malformed special forms.
    #[error("malformed syntax: {0}")]
    MalformedSyntax(String),

    /// No room for another object within the heap capacity, even after
    /// collecting at the last safe point.
    #[error("heap capacity of {capacity} objects exceeded")]
    HeapExhausted { capacity: usize },

    /// Evaluation nested deeper than the configured limit.
    #[error("evaluation depth limit of {0} exceeded")]
    DepthExceeded(usize),
}

impl SchemeError {
    pub fn malformed(detail: impl Into<String>) -> Self {
        SchemeError::MalformedSyntax(detail.into())
    }

    pub fn arity(procedure: impl Into<String>, expected: impl Into<String>, got: usize) -> Self {
        SchemeError::ArityMismatch {
            procedure: procedure.into(),
            expected: expected.into(),
            got,
        }
    }
}

pub type SchemeResult<T> = Result<T, SchemeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_fault() {
        assert_eq!(
            SchemeError::UnboundVariable("foo".into()).to_string(),
            "unbound variable 'foo'"
        );
        assert_eq!(SchemeError::DivisionByZero.to_string(), "division by zero");
        assert_eq!(
            SchemeError::arity("-", "1 to 2", 3).to_string(),
            "-: expected 1 to 2 argument(s), got 3"
        );
        assert_eq!(
            SchemeError::TypeMismatch {
                procedure: "+".into(),
                expected: "number",
                got: "boolean",
            }
            .to_string(),
            "+: expected number, got boolean"
        );
    }
}
