use crate::error::{SchemeError, SchemeResult};
use crate::heap::Heap;
use crate::stack::ensure_sufficient_stack;
use crate::symbol::SymbolTable;
use crate::value::Value;

/// Parses source text into values allocated on the heap.
///
/// Surface syntax: numbers (`-?\d+(\.\d+)?`), booleans `#t`/`#f`, symbols
/// (any other run of non-delimiter characters), and parenthesized lists.
/// There is no dotted-pair or quote syntax. `;` starts a comment that runs
/// to the end of the line.
pub struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
    heap: &'a mut Heap,
    symbols: &'a mut SymbolTable,
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a str, heap: &'a mut Heap, symbols: &'a mut SymbolTable) -> Self {
        Reader {
            input: input.as_bytes(),
            pos: 0,
            heap,
            symbols,
        }
    }

    /// Read one expression. Returns None at end of input.
    pub fn read(&mut self) -> SchemeResult<Option<Value>> {
        self.skip_whitespace_and_comments();
        if self.pos >= self.input.len() {
            return Ok(None);
        }
        let val = self.read_expr()?;
        Ok(Some(val))
    }

    /// Return current position in input.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(|ch| ch.is_ascii_whitespace()) {
                self.pos += 1;
            }
            if self.peek() == Some(b';') {
                while self.peek().is_some_and(|ch| ch != b'\n') {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn read_expr(&mut self) -> SchemeResult<Value> {
        self.skip_whitespace_and_comments();

        match self.peek() {
            None => Err(SchemeError::malformed("unexpected end of input")),
            Some(b'(') => ensure_sufficient_stack(|| self.read_list()),
            Some(b')') => Err(SchemeError::malformed("unexpected ')'")),
            Some(_) => self.read_word(),
        }
    }

    /// Read a list: `(a b c)`, right-nested into pairs ending in `Nil`.
    fn read_list(&mut self) -> SchemeResult<Value> {
        self.pos += 1; // consume '('

        let mut elements = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            match self.peek() {
                Some(b')') => {
                    self.pos += 1;
                    break;
                }
                None => return Err(SchemeError::malformed("unterminated list, expected ')'")),
                Some(_) => elements.push(self.read_expr()?),
            }
        }

        self.heap.list(&elements)
    }

    /// Read a word: number, boolean, or symbol.
    fn read_word(&mut self) -> SchemeResult<Value> {
        let start = self.pos;
        while self.peek().is_some_and(|ch| !is_delimiter(ch)) {
            self.pos += 1;
        }

        let word = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| SchemeError::malformed("invalid UTF-8 in token"))?;

        if word.starts_with('#') {
            return match word {
                "#t" => Ok(Value::Boolean(true)),
                "#f" => Ok(Value::Boolean(false)),
                other => Err(SchemeError::malformed(format!("invalid boolean literal '{}'", other))),
            };
        }

        if is_number(word) {
            let n = word
                .parse::<f64>()
                .map_err(|_| SchemeError::malformed(format!("invalid number '{}'", word)))?;
            return Ok(Value::Number(n));
        }

        let id = self.symbols.intern(word);
        Ok(Value::Symbol(id))
    }
}

fn is_delimiter(ch: u8) -> bool {
    ch.is_ascii_whitespace() || ch == b'(' || ch == b')' || ch == b';'
}

/// True if `word` matches `-?\d+(\.\d+)?`.
fn is_number(word: &str) -> bool {
    let digits = word.strip_prefix('-').unwrap_or(word);
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (digits, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    all_digits(int_part) && frac_part.map_or(true, all_digits)
}

/// Read a single expression from a string.
pub fn read_str(input: &str, heap: &mut Heap, symbols: &mut SymbolTable) -> SchemeResult<Value> {
    let mut reader = Reader::new(input, heap, symbols);
    reader
        .read()?
        .ok_or_else(|| SchemeError::malformed("empty input"))
}

/// Read one expression starting at byte offset `pos`.
/// Returns `Ok(Some((value, new_pos)))` or `Ok(None)` if only whitespace and
/// comments remain.
pub fn read_one_at(
    input: &str,
    pos: usize,
    heap: &mut Heap,
    symbols: &mut SymbolTable,
) -> SchemeResult<Option<(Value, usize)>> {
    let mut reader = Reader::new(&input[pos..], heap, symbols);
    match reader.read()? {
        Some(val) => Ok(Some((val, pos + reader.position()))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::print_val;
    use pretty_assertions::assert_eq;

    fn setup() -> (Heap, SymbolTable) {
        (Heap::new(10_000, 1_000), SymbolTable::new())
    }

    fn roundtrip(input: &str) -> String {
        let (mut heap, mut symbols) = setup();
        let val = read_str(input, &mut heap, &mut symbols).unwrap();
        print_val(val, &heap, &symbols)
    }

    #[test]
    fn atoms() {
        let (mut heap, mut symbols) = setup();
        assert_eq!(read_str("42", &mut heap, &mut symbols), Ok(Value::Number(42.0)));
        assert_eq!(read_str("-3.5", &mut heap, &mut symbols), Ok(Value::Number(-3.5)));
        assert_eq!(read_str("#t", &mut heap, &mut symbols), Ok(Value::Boolean(true)));
        assert_eq!(read_str("#f", &mut heap, &mut symbols), Ok(Value::Boolean(false)));
        let foo = read_str("foo", &mut heap, &mut symbols).unwrap();
        assert_eq!(foo, Value::Symbol(symbols.lookup("foo").unwrap()));
    }

    #[test]
    fn number_like_tokens_that_are_symbols() {
        let (mut heap, mut symbols) = setup();
        for word in ["-", "+", "1.", ".5", "1e5", "12abc", "--1", "1.2.3"] {
            let val = read_str(word, &mut heap, &mut symbols).unwrap();
            assert!(val.as_symbol().is_some(), "{} should be a symbol", word);
        }
    }

    #[test]
    fn nested_lists() {
        assert_eq!(roundtrip("(+ 1 (* 2 3))"), "(+ 1 (* 2 3))");
        assert_eq!(roundtrip("()"), "()");
        assert_eq!(roundtrip("( a\n\t b )"), "(a b)");
        assert_eq!(roundtrip("(a(b)c)"), "(a (b) c)");
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(roundtrip("; leading\n(a ; inner\n b)"), "(a b)");
    }

    #[test]
    fn reader_faults() {
        let (mut heap, mut symbols) = setup();
        assert!(matches!(
            read_str("(a b", &mut heap, &mut symbols),
            Err(SchemeError::MalformedSyntax(_))
        ));
        assert!(matches!(
            read_str(")", &mut heap, &mut symbols),
            Err(SchemeError::MalformedSyntax(_))
        ));
        assert!(matches!(
            read_str("#x", &mut heap, &mut symbols),
            Err(SchemeError::MalformedSyntax(_))
        ));
        assert!(matches!(
            read_str("   ", &mut heap, &mut symbols),
            Err(SchemeError::MalformedSyntax(_))
        ));
    }

    #[test]
    fn read_one_at_advances() {
        let (mut heap, mut symbols) = setup();
        let input = "(define x 1) x ; trailing";
        let (_, pos) = read_one_at(input, 0, &mut heap, &mut symbols).unwrap().unwrap();
        let (second, pos) = read_one_at(input, pos, &mut heap, &mut symbols).unwrap().unwrap();
        assert_eq!(second, Value::Symbol(symbols.lookup("x").unwrap()));
        assert_eq!(read_one_at(input, pos, &mut heap, &mut symbols), Ok(None));
    }
}
