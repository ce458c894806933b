use crate::error::{SchemeError, SchemeResult};
use crate::heap::Heap;
use crate::value::{PrimitiveId, Value};

/// A native procedure: receives its arguments as a proper list and checks
/// its own arity and operand types.
pub type PrimitiveFn = fn(&Heap, Value) -> SchemeResult<Value>;

pub struct Primitive {
    pub name: &'static str,
    pub func: PrimitiveFn,
}

/// The primitive table. A `PrimitiveId` is an index into this slice.
pub static PRIMITIVES: &[Primitive] = &[
    Primitive { name: "+", func: prim_add },
    Primitive { name: "-", func: prim_sub },
    Primitive { name: "*", func: prim_mul },
    Primitive { name: "/", func: prim_div },
    Primitive { name: "=", func: prim_eq },
    Primitive { name: "<", func: prim_lt },
    Primitive { name: ">", func: prim_gt },
    Primitive { name: "<=", func: prim_le },
    Primitive { name: ">=", func: prim_ge },
    Primitive { name: "not", func: prim_not },
];

/// Iterate `(id, primitive)` over the whole table.
pub fn all() -> impl Iterator<Item = (PrimitiveId, &'static Primitive)> {
    PRIMITIVES
        .iter()
        .enumerate()
        .map(|(i, prim)| (PrimitiveId(i as u16), prim))
}

pub fn name(id: PrimitiveId) -> &'static str {
    PRIMITIVES[id.0 as usize].name
}

/// Dispatch a primitive call with an evaluated argument list.
pub fn call_primitive(id: PrimitiveId, args: Value, heap: &Heap) -> SchemeResult<Value> {
    let prim = &PRIMITIVES[id.0 as usize];
    (prim.func)(heap, args)
}

/// Unpack the argument list, enforcing `min..=max` arguments.
fn arguments(heap: &Heap, args: Value, name: &str, min: usize, max: Option<usize>) -> SchemeResult<Vec<Value>> {
    let values = heap
        .list_to_vec(args)
        .ok_or_else(|| SchemeError::malformed(format!("{}: improper argument list", name)))?;
    let n = values.len();
    if n < min || max.is_some_and(|max| n > max) {
        let expected = match max {
            Some(max) if max == min => min.to_string(),
            Some(max) => format!("{} to {}", min, max),
            None => format!("at least {}", min),
        };
        return Err(SchemeError::arity(name, expected, n));
    }
    Ok(values)
}

fn number(name: &str, val: Value) -> SchemeResult<f64> {
    val.as_number().ok_or_else(|| SchemeError::TypeMismatch {
        procedure: name.to_string(),
        expected: "number",
        got: val.type_name(),
    })
}

/// (+ n ...): sum, 0 with no arguments.
fn prim_add(heap: &Heap, args: Value) -> SchemeResult<Value> {
    let values = arguments(heap, args, "+", 0, None)?;
    let mut sum = 0.0;
    for val in values {
        sum += number("+", val)?;
    }
    Ok(Value::Number(sum))
}

/// (* n ...): product, 1 with no arguments.
fn prim_mul(heap: &Heap, args: Value) -> SchemeResult<Value> {
    let values = arguments(heap, args, "*", 0, None)?;
    let mut product = 1.0;
    for val in values {
        product *= number("*", val)?;
    }
    Ok(Value::Number(product))
}

/// (- a) negates, (- a b) subtracts.
fn prim_sub(heap: &Heap, args: Value) -> SchemeResult<Value> {
    let values = arguments(heap, args, "-", 1, Some(2))?;
    let first = number("-", values[0])?;
    match values.get(1) {
        None => Ok(Value::Number(-first)),
        Some(&second) => Ok(Value::Number(first - number("-", second)?)),
    }
}

/// (/ a) is the reciprocal, (/ a b) the quotient. A zero divisor faults.
fn prim_div(heap: &Heap, args: Value) -> SchemeResult<Value> {
    let values = arguments(heap, args, "/", 1, Some(2))?;
    let first = number("/", values[0])?;
    let (dividend, divisor) = match values.get(1) {
        None => (1.0, first),
        Some(&second) => (first, number("/", second)?),
    };
    if divisor == 0.0 {
        return Err(SchemeError::DivisionByZero);
    }
    Ok(Value::Number(dividend / divisor))
}

/// (= a b): numbers and booleans compare by value; anything else,
/// including operands of different types, is #f.
fn prim_eq(heap: &Heap, args: Value) -> SchemeResult<Value> {
    let values = arguments(heap, args, "=", 2, Some(2))?;
    let result = match (values[0], values[1]) {
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        _ => false,
    };
    Ok(Value::Boolean(result))
}

fn compare(heap: &Heap, args: Value, name: &str, op: fn(f64, f64) -> bool) -> SchemeResult<Value> {
    let values = arguments(heap, args, name, 2, Some(2))?;
    let a = number(name, values[0])?;
    let b = number(name, values[1])?;
    Ok(Value::Boolean(op(a, b)))
}

fn prim_lt(heap: &Heap, args: Value) -> SchemeResult<Value> {
    compare(heap, args, "<", |a, b| a < b)
}

fn prim_gt(heap: &Heap, args: Value) -> SchemeResult<Value> {
    compare(heap, args, ">", |a, b| a > b)
}

fn prim_le(heap: &Heap, args: Value) -> SchemeResult<Value> {
    compare(heap, args, "<=", |a, b| a <= b)
}

fn prim_ge(heap: &Heap, args: Value) -> SchemeResult<Value> {
    compare(heap, args, ">=", |a, b| a >= b)
}

/// (not b): only accepts booleans.
fn prim_not(heap: &Heap, args: Value) -> SchemeResult<Value> {
    let values = arguments(heap, args, "not", 1, Some(1))?;
    match values[0] {
        Value::Boolean(b) => Ok(Value::Boolean(!b)),
        other => Err(SchemeError::TypeMismatch {
            procedure: "not".into(),
            expected: "boolean",
            got: other.type_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call(name: &str, args: &[Value]) -> SchemeResult<Value> {
        let mut heap = Heap::new(1000, 100);
        let list = heap.list(args).unwrap();
        let (id, _) = all().find(|(_, p)| p.name == name).unwrap();
        call_primitive(id, list, &heap)
    }

    fn n(x: f64) -> Value {
        Value::Number(x)
    }

    #[test]
    fn variadic_arithmetic() {
        assert_eq!(call("+", &[n(1.0), n(2.0), n(3.0)]), Ok(n(6.0)));
        assert_eq!(call("+", &[]), Ok(n(0.0)));
        assert_eq!(call("*", &[n(2.0), n(3.0), n(4.0)]), Ok(n(24.0)));
        assert_eq!(call("*", &[]), Ok(n(1.0)));
    }

    #[test]
    fn unary_and_binary_minus() {
        assert_eq!(call("-", &[n(5.0)]), Ok(n(-5.0)));
        assert_eq!(call("-", &[n(5.0), n(2.0)]), Ok(n(3.0)));
        assert_eq!(
            call("-", &[n(1.0), n(2.0), n(3.0)]),
            Err(SchemeError::arity("-", "1 to 2", 3))
        );
        assert_eq!(call("-", &[]), Err(SchemeError::arity("-", "1 to 2", 0)));
    }

    #[test]
    fn division_and_reciprocal() {
        assert_eq!(call("/", &[n(1.0), n(4.0)]), Ok(n(0.25)));
        assert_eq!(call("/", &[n(4.0)]), Ok(n(0.25)));
        assert_eq!(call("/", &[n(1.0), n(0.0)]), Err(SchemeError::DivisionByZero));
        assert_eq!(call("/", &[n(0.0)]), Err(SchemeError::DivisionByZero));
    }

    #[test]
    fn non_numbers_are_type_mismatches() {
        assert_eq!(
            call("+", &[n(1.0), Value::Boolean(true)]),
            Err(SchemeError::TypeMismatch {
                procedure: "+".into(),
                expected: "number",
                got: "boolean",
            })
        );
        assert!(matches!(
            call("<", &[Value::Nil, n(1.0)]),
            Err(SchemeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn equality_across_types_is_false() {
        assert_eq!(call("=", &[n(2.0), n(2.0)]), Ok(Value::Boolean(true)));
        assert_eq!(
            call("=", &[Value::Boolean(false), Value::Boolean(false)]),
            Ok(Value::Boolean(true))
        );
        assert_eq!(call("=", &[n(0.0), Value::Boolean(false)]), Ok(Value::Boolean(false)));
        assert_eq!(call("=", &[Value::Nil, Value::Nil]), Ok(Value::Boolean(false)));
        assert_eq!(call("=", &[n(1.0)]), Err(SchemeError::arity("=", "2", 1)));
    }

    #[test]
    fn comparisons() {
        assert_eq!(call("<", &[n(1.0), n(2.0)]), Ok(Value::Boolean(true)));
        assert_eq!(call(">", &[n(1.0), n(2.0)]), Ok(Value::Boolean(false)));
        assert_eq!(call("<=", &[n(2.0), n(2.0)]), Ok(Value::Boolean(true)));
        assert_eq!(call(">=", &[n(1.0), n(2.0)]), Ok(Value::Boolean(false)));
    }

    #[test]
    fn not_requires_a_boolean() {
        assert_eq!(call("not", &[Value::Boolean(false)]), Ok(Value::Boolean(true)));
        assert!(matches!(
            call("not", &[n(0.0)]),
            Err(SchemeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn table_names_are_unique() {
        let mut names: Vec<_> = PRIMITIVES.iter().map(|p| p.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), PRIMITIVES.len());
    }
}
