use crate::heap::Heap;
use crate::primitives;
use crate::stack::ensure_sufficient_stack;
use crate::symbol::SymbolTable;
use crate::value::Value;

/// Significant digits used for numbers, as in C's `%g`.
const PRECISION: usize = 6;

/// Print a value to a string.
pub fn print_val(val: Value, heap: &Heap, symbols: &SymbolTable) -> String {
    let mut out = String::new();
    print_inner(val, heap, symbols, &mut out);
    out
}

fn print_inner(val: Value, heap: &Heap, symbols: &SymbolTable, out: &mut String) {
    match val {
        Value::Nil => out.push_str("()"),
        Value::Number(n) => out.push_str(&format_number(n)),
        Value::Boolean(true) => out.push_str("#t"),
        Value::Boolean(false) => out.push_str("#f"),
        Value::Symbol(id) => out.push_str(symbols.name(id)),
        Value::Primitive(_) => out.push_str("#<procedure>"),
        Value::Closure(_) => out.push_str("#<closure>"),
        Value::Pair(id) => {
            out.push('(');
            ensure_sufficient_stack(|| print_inner(heap.car(id), heap, symbols, out));

            let mut current = heap.cdr(id);
            loop {
                match current {
                    Value::Nil => break,
                    Value::Pair(pid) => {
                        out.push(' ');
                        ensure_sufficient_stack(|| print_inner(heap.car(pid), heap, symbols, out));
                        current = heap.cdr(pid);
                    }
                    _ => {
                        out.push_str(" . ");
                        print_inner(current, heap, symbols, out);
                        break;
                    }
                }
            }
            out.push(')');
        }
    }
}

/// Describe a value for diagnostics, naming primitives.
pub fn describe(val: Value, heap: &Heap, symbols: &SymbolTable) -> String {
    match val {
        Value::Primitive(id) => format!("#<procedure {}>", primitives::name(id)),
        other => print_val(other, heap, symbols),
    }
}

/// Format a number the way C's `%g` does: six significant digits, trailing
/// zeros removed, exponent notation when the exponent is below -4 or at
/// least the precision.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "nan".into();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf".into() } else { "-inf".into() };
    }
    if n == 0.0 {
        return if n.is_sign_negative() { "-0".into() } else { "0".into() };
    }

    // Round to the target precision first; the exponent of the rounded
    // value decides between fixed and exponent notation.
    let sci = format!("{:.*e}", PRECISION - 1, n);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return sci;
    };

    if exp < -4 || exp >= PRECISION as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", strip_fraction_zeros(mantissa), sign, exp.abs())
    } else {
        let decimals = (PRECISION as i32 - 1 - exp) as usize;
        strip_fraction_zeros(&format!("{:.*}", decimals, n)).to_string()
    }
}

fn strip_fraction_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
