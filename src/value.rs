// ABOUTME: Value types representing the reader's object graph (conses, vectors, structs, ...)

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A cons cell. Interior mutability is required because the circular-reference
/// resolver (`circ.rs`) overwrites car/cdr after the cell has already been
/// embedded elsewhere in the tree.
pub type ConsCell = Rc<RefCell<(Value, Value)>>;
pub type VectorCell = Rc<RefCell<Vec<Value>>>;
pub type RangeCell = Rc<RefCell<(Value, Value)>>;
pub type HashCell = Rc<RefCell<HashMap<HashKey, Value>>>;
pub type StructCell = Rc<RefCell<Vec<(Rc<str>, Value)>>>;

#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Symbol(Rc<str>),
    Keyword(Rc<str>),
    String(Rc<str>),
    Char(char),
    Regex(Rc<str>),
    Buf(Rc<RefCell<Vec<u8>>>),
    Cons(ConsCell),
    Vector(VectorCell),
    Range(RangeCell),
    Hash(HashCell),
    Struct {
        type_name: Rc<str>,
        slots: StructCell,
    },
    Lambda {
        params: Vec<String>,
        body: Box<Value>,
        docstring: Option<String>,
    },
    BuiltIn(Rc<str>),
    /// Placeholder for an unresolved `#n#` forward reference; back-patched
    /// in place by `circ::resolve` once the enclosing top-level form is read.
    CircRef(i64),
    Error(String),
    Nil,
    /// Sentinel distinct from every legitimate value: "no syntax tree yet".
    Unset,
}

/// File/line provenance for a parsed form's root cell, recorded only when
/// the parser's source-location flag is set (§4.A `rec_source_loc`).
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLoc {
    pub name: Rc<str>,
    pub line: usize,
}

/// Hash-table key wrapper. Leaves compare structurally; compound values
/// compare (and hash) by the identity of their shared cell, matching the
/// original's identity-hash semantics for hash keys.
#[derive(Debug, Clone)]
pub struct HashKey(pub Value);

impl PartialEq for HashKey {
    fn eq(&self, other: &Self) -> bool {
        values_identical(&self.0, &other.0)
    }
}

impl Eq for HashKey {}

impl std::hash::Hash for HashKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        identity_hash(&self.0, state);
    }
}

fn identity_hash<H: std::hash::Hasher>(v: &Value, state: &mut H) {
    use std::hash::Hash;
    match v {
        Value::Number(n) => n.to_bits().hash(state),
        Value::Bool(b) => b.hash(state),
        Value::Symbol(s) | Value::Keyword(s) | Value::String(s) | Value::Regex(s) => {
            s.hash(state)
        }
        Value::Char(c) => c.hash(state),
        Value::Nil => 0u8.hash(state),
        Value::Cons(c) => (Rc::as_ptr(c) as usize).hash(state),
        Value::Vector(c) => (Rc::as_ptr(c) as usize).hash(state),
        Value::Range(c) => (Rc::as_ptr(c) as usize).hash(state),
        Value::Hash(c) => (Rc::as_ptr(c) as usize).hash(state),
        Value::Buf(c) => (Rc::as_ptr(c) as usize).hash(state),
        Value::Struct { slots, .. } => (Rc::as_ptr(slots) as usize).hash(state),
        _ => 0u8.hash(state),
    }
}

/// Identity comparison for the capabilities §6 requires ("compare by identity").
pub fn values_identical(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Symbol(x), Value::Symbol(y)) => Rc::ptr_eq(x, y) || x == y,
        (Value::Keyword(x), Value::Keyword(y)) => Rc::ptr_eq(x, y) || x == y,
        (Value::String(x), Value::String(y)) => Rc::ptr_eq(x, y) || x == y,
        (Value::Regex(x), Value::Regex(y)) => Rc::ptr_eq(x, y) || x == y,
        (Value::Char(x), Value::Char(y)) => x == y,
        (Value::Nil, Value::Nil) => true,
        (Value::Unset, Value::Unset) => true,
        (Value::Cons(x), Value::Cons(y)) => Rc::ptr_eq(x, y),
        (Value::Vector(x), Value::Vector(y)) => Rc::ptr_eq(x, y),
        (Value::Range(x), Value::Range(y)) => Rc::ptr_eq(x, y),
        (Value::Hash(x), Value::Hash(y)) => Rc::ptr_eq(x, y),
        (Value::Buf(x), Value::Buf(y)) => Rc::ptr_eq(x, y),
        (Value::Struct { slots: x, .. }, Value::Struct { slots: y, .. }) => Rc::ptr_eq(x, y),
        (Value::CircRef(x), Value::CircRef(y)) => x == y,
        _ => false,
    }
}

impl Value {
    pub fn cons(car: Value, cdr: Value) -> Value {
        Value::Cons(Rc::new(RefCell::new((car, cdr))))
    }

    pub fn list(items: Vec<Value>) -> Value {
        let mut out = Value::Nil;
        for item in items.into_iter().rev() {
            out = Value::cons(item, out);
        }
        out
    }

    pub fn symbol(s: impl Into<Rc<str>>) -> Value {
        Value::Symbol(s.into())
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Value::Unset)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Symbol(_) => "symbol",
            Value::Keyword(_) => "keyword",
            Value::String(_) => "string",
            Value::Char(_) => "char",
            Value::Regex(_) => "regex",
            Value::Buf(_) => "buf",
            Value::Cons(_) => "cons",
            Value::Vector(_) => "vector",
            Value::Range(_) => "range",
            Value::Hash(_) => "hash",
            Value::Struct { .. } => "struct",
            Value::Lambda { .. } => "function",
            Value::BuiltIn(_) => "function",
            Value::CircRef(_) => "circref",
            Value::Error(_) => "error",
            Value::Nil => "nil",
            Value::Unset => "unset",
        }
    }

    /// True if this value is a `#n#` placeholder awaiting back-patching.
    pub fn as_circref(&self) -> Option<i64> {
        match self {
            Value::CircRef(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::Symbol(s) => write!(f, "{}", s),
            Value::Keyword(k) => write!(f, ":{}", k),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Char(c) => write!(f, "#\\{}", c),
            Value::Regex(r) => write!(f, "#/{}/", r),
            Value::Buf(b) => write!(f, "#b'{}'", hex(&b.borrow())),
            Value::Nil => write!(f, "nil"),
            Value::Cons(cell) => {
                write!(f, "(")?;
                let mut first = true;
                let mut cur = Value::Cons(cell.clone());
                loop {
                    match cur {
                        Value::Cons(c) => {
                            let (car, cdr) = c.borrow().clone();
                            if !first {
                                write!(f, " ")?;
                            }
                            first = false;
                            write!(f, "{}", car)?;
                            cur = cdr;
                        }
                        Value::Nil => break,
                        other => {
                            write!(f, " . {}", other)?;
                            break;
                        }
                    }
                }
                write!(f, ")")
            }
            Value::Vector(v) => {
                write!(f, "#(")?;
                for (i, item) in v.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Value::Range(r) => {
                let (from, to) = r.borrow().clone();
                write!(f, "{}..{}", from, to)
            }
            Value::Hash(h) => {
                write!(f, "#H(")?;
                let mut entries: Vec<_> = h
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.0.clone(), v.clone()))
                    .collect();
                entries.sort_by_key(|(k, _)| k.to_string());
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "({} . {})", k, v)?;
                }
                write!(f, ")")
            }
            Value::Struct { type_name, slots } => {
                write!(f, "#S({}", type_name)?;
                for (name, val) in slots.borrow().iter() {
                    write!(f, " {} {}", name, val)?;
                }
                write!(f, ")")
            }
            Value::Lambda { .. } => write!(f, "#<lambda>"),
            Value::BuiltIn(name) => write!(f, "#<builtin {}>", name),
            Value::CircRef(n) => write!(f, "#{}#", n),
            Value::Error(msg) => write!(f, "#<error: {}>", msg),
            Value::Unset => write!(f, "#<unset>"),
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_display() {
        assert_eq!(format!("{}", Value::Number(42.0)), "42");
        assert_eq!(format!("{}", Value::Number(-2.5)), "-2.5");
    }

    #[test]
    fn test_list_display() {
        let list = Value::list(vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]);
        assert_eq!(format!("{}", list), "(1 2 3)");
    }

    #[test]
    fn test_nil_display() {
        assert_eq!(format!("{}", Value::Nil), "nil");
    }

    #[test]
    fn test_dotted_pair_display() {
        let pair = Value::cons(Value::Number(1.0), Value::Number(2.0));
        assert_eq!(format!("{}", pair), "(1 . 2)");
    }

    #[test]
    fn test_cons_identity() {
        let cell = Rc::new(RefCell::new((Value::Nil, Value::Nil)));
        let a = Value::Cons(cell.clone());
        let b = Value::Cons(cell);
        assert!(values_identical(&a, &b));
    }

    #[test]
    fn test_hash_key_identity() {
        let cell = Rc::new(RefCell::new(HashMap::new()));
        let a = HashKey(Value::Hash(cell.clone()));
        let b = HashKey(Value::Hash(cell));
        assert_eq!(a, b);
    }

    #[test]
    fn test_unset_distinct_from_nil() {
        assert!(!values_identical(&Value::Unset, &Value::Nil));
        assert!(Value::Unset.is_unset());
        assert!(!Value::Nil.is_unset());
    }
}
