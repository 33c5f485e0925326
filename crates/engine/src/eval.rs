// Formula evaluator - first-character dispatch plus the arithmetic grammar
// Supports: numbers, cell refs (A1), basic math (+, -, *, /), parentheses,
// unary minus, quoted text literals ('...)

use crate::cell_ref;
use crate::value::Value;

/// Resolves cell references encountered during evaluation.
///
/// `None` means the slot is empty; the evaluator substitutes zero. The
/// receiver is mutable because resolving a reference may recurse back into
/// the grid (the referenced cell can itself hold a formula) and
/// implementations track which cells are on the evaluation path to cut
/// circular references.
pub trait CellLookup {
    fn lookup(&mut self, row: usize, col: usize) -> Option<Value>;
}

/// Evaluate raw formula text.
///
/// Dispatch is on the first character:
/// - `'` quotes the rest of the text verbatim, even if it looks numeric;
/// - `=` evaluates the remainder as an arithmetic expression, with any
///   unconsumed trailing input making the whole formula invalid;
/// - otherwise the full text is a number if it parses as one, text if not.
///
/// Never panics; malformed input always comes back as [`Value::Invalid`].
pub fn evaluate_formula(formula: &str, cells: &mut dyn CellLookup) -> Value {
    if let Some(rest) = formula.strip_prefix('\'') {
        return Value::Text(rest.to_string());
    }

    if let Some(rest) = formula.strip_prefix('=') {
        let mut cur = Cursor::new(rest);
        let result = eval_expression(&mut cur, cells);
        if !cur.at_end() {
            return Value::Invalid;
        }
        return result;
    }

    match formula.parse::<f64>() {
        Ok(n) => Value::Number(n),
        Err(_) => Value::Text(formula.to_string()),
    }
}

// =============================================================================
// Cursor
// =============================================================================

const END: u8 = 0;

/// Parse position over a preprocessed expression: whitespace stripped and a
/// NUL terminator appended so lookahead never runs off the end of the
/// buffer. One cursor per evaluation; never shared.
struct Cursor {
    buf: Vec<u8>,
    pos: usize,
}

impl Cursor {
    fn new(expr: &str) -> Self {
        let mut buf: Vec<u8> = expr
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .into_bytes();
        buf.push(END);
        Cursor { buf, pos: 0 }
    }

    fn peek(&self) -> u8 {
        self.buf[self.pos]
    }

    /// Advance one byte, parking at the terminator instead of passing it.
    fn bump(&mut self) {
        if self.pos + 1 < self.buf.len() {
            self.pos += 1;
        }
    }

    fn at_end(&self) -> bool {
        self.peek() == END
    }
}

// =============================================================================
// Grammar
// =============================================================================
//
// expression := term (('+' | '-') term)*
// term       := factor (('*' | '/') factor)*
// factor     := '-'? (number | cell-ref | '(' expression ')')
//
// Left-associative throughout. Operands must both be numbers for an
// operator to produce a number; anything else poisons the running result
// with Invalid while the cursor keeps advancing, so trailing-garbage
// detection still works in the caller.

fn eval_expression(cur: &mut Cursor, cells: &mut dyn CellLookup) -> Value {
    let mut result = eval_term(cur, cells);
    while !cur.at_end() {
        let op = cur.peek();
        if op != b'+' && op != b'-' {
            return result;
        }
        cur.bump();

        let term = eval_term(cur, cells);
        result = match (result.as_number(), term.as_number()) {
            (Some(lhs), Some(rhs)) => {
                if op == b'+' {
                    Value::Number(lhs + rhs)
                } else {
                    Value::Number(lhs - rhs)
                }
            }
            _ => Value::Invalid,
        };
    }
    result
}

fn eval_term(cur: &mut Cursor, cells: &mut dyn CellLookup) -> Value {
    let mut result = eval_factor(cur, cells);
    while !cur.at_end() {
        let op = cur.peek();
        if op != b'*' && op != b'/' {
            return result;
        }
        cur.bump();

        let factor = eval_factor(cur, cells);
        result = match (result.as_number(), factor.as_number()) {
            (Some(lhs), Some(rhs)) => {
                if op == b'*' {
                    Value::Number(lhs * rhs)
                } else if rhs == 0.0 {
                    // Division by exactly zero is invalid, not infinity.
                    Value::Invalid
                } else {
                    Value::Number(lhs / rhs)
                }
            }
            _ => Value::Invalid,
        };
    }
    result
}

fn eval_factor(cur: &mut Cursor, cells: &mut dyn CellLookup) -> Value {
    let negative = cur.peek() == b'-';
    if negative {
        cur.bump();
    }

    let mut result;
    if cur.peek() == b'(' {
        cur.bump();
        result = eval_expression(cur, cells);
        if cur.peek() == b')' {
            cur.bump();
        } else {
            result = Value::Invalid;
        }
    } else {
        let mut token = String::new();
        while cur.peek().is_ascii_alphanumeric() || cur.peek() == b'.' {
            token.push(cur.peek() as char);
            cur.bump();
        }

        result = match cell_ref::parse(&token) {
            // Empty slots evaluate as zero.
            Some((row, col)) => cells.lookup(row, col).unwrap_or(Value::Number(0.0)),
            None => match token.parse::<f64>() {
                Ok(n) => Value::Number(n),
                Err(_) => Value::Invalid,
            },
        };
    }

    if negative {
        result = match result.as_number() {
            Some(n) => Value::Number(-n),
            None => Value::Invalid,
        };
    }
    result
}
