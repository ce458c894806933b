//! Property test: printing a datum and reading it back yields an equal datum.

use minischeme::heap::Heap;
use minischeme::printer::print_val;
use minischeme::reader::read_str;
use minischeme::symbol::SymbolTable;
use minischeme::Value;
use proptest::prelude::*;

/// A datum built outside the heap, so strategies stay heap-independent.
#[derive(Clone, Debug)]
enum Datum {
    Number(f64),
    Boolean(bool),
    Symbol(String),
    List(Vec<Datum>),
}

fn symbol_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9?!*-]{0,8}").expect("valid regex")
}

fn number_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![
        (-99_999i32..99_999).prop_map(f64::from),
        // Eighths print exactly within six significant digits.
        (-999i32..999, 0u32..8).prop_map(|(whole, eighths)| f64::from(whole) + f64::from(eighths) / 8.0),
    ]
}

fn datum_strategy() -> impl Strategy<Value = Datum> {
    let leaf = prop_oneof![
        number_strategy().prop_map(Datum::Number),
        any::<bool>().prop_map(Datum::Boolean),
        symbol_strategy().prop_map(Datum::Symbol),
    ];
    leaf.prop_recursive(4, 64, 6, |inner| {
        prop::collection::vec(inner, 0..6).prop_map(Datum::List)
    })
}

fn build(datum: &Datum, heap: &mut Heap, symbols: &mut SymbolTable) -> Value {
    match datum {
        Datum::Number(n) => Value::Number(*n),
        Datum::Boolean(b) => Value::Boolean(*b),
        Datum::Symbol(name) => Value::Symbol(symbols.intern(name)),
        Datum::List(items) => {
            let values: Vec<Value> = items.iter().map(|d| build(d, heap, symbols)).collect();
            heap.list(&values).unwrap()
        }
    }
}

proptest! {
    #[test]
    fn print_then_read_is_identity(datum in datum_strategy()) {
        let mut heap = Heap::new(100_000, 100_000);
        let mut symbols = SymbolTable::new();

        let original = build(&datum, &mut heap, &mut symbols);
        let printed = print_val(original, &heap, &symbols);
        let reread = read_str(&printed, &mut heap, &mut symbols).unwrap();

        prop_assert!(heap.equal(original, reread), "{} did not survive a round trip", printed);
        prop_assert_eq!(print_val(reread, &heap, &symbols), printed);
    }
}
