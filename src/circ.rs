// ABOUTME: Circular-reference table and post-parse back-patching (#n= / #n#)
// Grounded directly in original_source/parser.c's parser_circ_def /
// parser_circ_ref / patch_ref / circ_backpatch.

use crate::error::ReadError;
use crate::value::{SourceLoc, Value};
use std::collections::HashMap;
use std::rc::Rc;

/// An entry in the circular-reference table: either seen-but-undefined
/// (`Unique`, i.e. only a `#n#` reference has been encountered so far) or
/// bound to its eventual value.
#[derive(Debug, Clone)]
enum Entry {
    Unique,
    Resolved(Value),
}

/// Per-parser table mapping `#n=`/`#n#` integer labels to values, plus the
/// count of not-yet-patched placeholders currently embedded in the tree.
#[derive(Debug, Default)]
pub struct CircTable {
    entries: HashMap<i64, Entry>,
    pub count: i64,
    /// When set, `reference` always returns the resolved value directly
    /// instead of minting a new placeholder — used by re-entrant reads that
    /// legitimately consult a label already defined by the outer read (§9).
    pub suppress: bool,
    /// Set by the grammar when a `#n=` definition is detected as a
    /// duplicate mid-parse; grammar productions can't fail a nom parse on a
    /// semantic error, so this is surfaced by the caller after parsing
    /// completes instead.
    pub pending_error: Option<ReadError>,
    /// Mirrors `Parser::rec_source_loc`; when set, the top-level read
    /// driver records an entry in `locations` for each form's root cell.
    pub rec_source_loc: bool,
    /// Pointer-identity -> provenance, populated only when
    /// `rec_source_loc` is set. Tracks the root cell of each top-level
    /// form rather than every nested cons cell, which would require
    /// threading scanner position through every grammar combinator.
    pub locations: HashMap<usize, SourceLoc>,
}

impl CircTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `#n=expr` — define or complete label `n`.
    pub fn define(&mut self, name: &str, label: i64, expr: Value) -> Result<(), ReadError> {
        match self.entries.get(&label) {
            Some(Entry::Resolved(_)) => {
                return Err(ReadError::DuplicateCircDef {
                    name: name.to_string(),
                    label,
                });
            }
            Some(Entry::Unique) | None => {}
        }
        self.entries.insert(label, Entry::Resolved(expr));
        Ok(())
    }

    /// `#n#` — reference label `n`, minting a placeholder if unresolved.
    pub fn reference(&mut self, label: i64) -> Value {
        match self.entries.get(&label) {
            None => {
                self.entries.insert(label, Entry::Unique);
                self.count += 1;
                Value::CircRef(label)
            }
            Some(Entry::Unique) => {
                if self.suppress {
                    Value::CircRef(label)
                } else {
                    self.count += 1;
                    Value::CircRef(label)
                }
            }
            Some(Entry::Resolved(v)) => v.clone(),
        }
    }

    fn lookup(&self, label: i64) -> Option<&Value> {
        match self.entries.get(&label) {
            Some(Entry::Resolved(v)) => Some(v),
            _ => None,
        }
    }
}

/// Replace `obj` with its patched value if it is itself a placeholder, per
/// `patch_ref`. Returns `Ok(None)` when `obj` was not a placeholder (caller
/// should recurse into it instead).
fn patch_ref(name: &str, table: &mut CircTable, obj: &Value) -> Result<Option<Value>, ReadError> {
    let label = match obj.as_circref() {
        Some(n) => n,
        None => return Ok(None),
    };

    let rep = match table.lookup(label) {
        Some(v) => v.clone(),
        None => {
            return Err(ReadError::DanglingCircRef {
                name: name.to_string(),
                label,
            })
        }
    };

    if rep.as_circref().is_some() {
        return Err(ReadError::AbsurdCircRef {
            name: name.to_string(),
            label,
        });
    }

    if table.count == 0 {
        return Err(ReadError::SurplusCircRef {
            name: name.to_string(),
            label,
        });
    }
    table.count -= 1;

    Ok(Some(rep))
}

/// Walk `obj` in place, replacing every placeholder slot with its resolved
/// value and recursing into slots that are not placeholders. Mirrors
/// `circ_backpatch`'s per-kind traversal; `visiting` breaks cycles exactly
/// as the C source's `circ_stack` does.
fn backpatch(
    name: &str,
    table: &mut CircTable,
    visiting: &mut Vec<*const ()>,
    obj: &Value,
) -> Result<(), ReadError> {
    if table.count == 0 {
        return Ok(());
    }

    let ptr = identity_ptr(obj);
    if let Some(ptr) = ptr {
        if visiting.contains(&ptr) {
            return Ok(());
        }
        visiting.push(ptr);
    }

    let result = backpatch_inner(name, table, visiting, obj);

    if ptr.is_some() {
        visiting.pop();
    }

    result
}

pub(crate) fn identity_ptr(obj: &Value) -> Option<*const ()> {
    match obj {
        Value::Cons(c) => Some(Rc::as_ptr(c) as *const ()),
        Value::Vector(v) => Some(Rc::as_ptr(v) as *const ()),
        Value::Range(r) => Some(Rc::as_ptr(r) as *const ()),
        Value::Hash(h) => Some(Rc::as_ptr(h) as *const ()),
        Value::Struct { slots, .. } => Some(Rc::as_ptr(slots) as *const ()),
        _ => None,
    }
}

fn backpatch_inner(
    name: &str,
    table: &mut CircTable,
    visiting: &mut Vec<*const ()>,
    obj: &Value,
) -> Result<(), ReadError> {
    match obj {
        Value::Cons(cell) => {
            // Follow cdr iteratively (tail position) to avoid deep recursion
            // on long lists, as the source does.
            let mut cur = cell.clone();
            loop {
                if table.count == 0 {
                    break;
                }
                let (car, cdr) = cur.borrow().clone();

                match patch_ref(name, table, &car)? {
                    Some(rep) => cur.borrow_mut().0 = rep,
                    None => backpatch(name, table, visiting, &car)?,
                }

                match patch_ref(name, table, &cdr)? {
                    Some(rep) => {
                        cur.borrow_mut().1 = rep;
                        break;
                    }
                    None => {}
                }

                match &cdr {
                    Value::Cons(next) => cur = next.clone(),
                    other => {
                        backpatch(name, table, visiting, other)?;
                        break;
                    }
                }
            }
            Ok(())
        }
        Value::Vector(v) => {
            let len = v.borrow().len();
            for i in 0..len {
                if table.count == 0 {
                    break;
                }
                let item = v.borrow()[i].clone();
                match patch_ref(name, table, &item)? {
                    Some(rep) => v.borrow_mut()[i] = rep,
                    None => backpatch(name, table, visiting, &item)?,
                }
            }
            Ok(())
        }
        Value::Range(r) => {
            let (from, to) = r.borrow().clone();
            match patch_ref(name, table, &from)? {
                Some(rep) => r.borrow_mut().0 = rep,
                None => backpatch(name, table, visiting, &from)?,
            }
            match patch_ref(name, table, &to)? {
                Some(rep) => r.borrow_mut().1 = rep,
                None => backpatch(name, table, visiting, &to)?,
            }
            Ok(())
        }
        Value::Hash(h) => {
            // Keys change hash position once patched, so collect, clear,
            // and re-insert (§4.C / §9's hash-key-patching design note).
            if table.count == 0 {
                return Ok(());
            }
            let pairs: Vec<(Value, Value)> = h
                .borrow()
                .iter()
                .map(|(k, v)| (k.0.clone(), v.clone()))
                .collect();
            let mut patched = Vec::with_capacity(pairs.len());
            for (k, v) in pairs {
                let k = match patch_ref(name, table, &k)? {
                    Some(rep) => rep,
                    None => {
                        backpatch(name, table, visiting, &k)?;
                        k
                    }
                };
                let v = match patch_ref(name, table, &v)? {
                    Some(rep) => rep,
                    None => {
                        backpatch(name, table, visiting, &v)?;
                        v
                    }
                };
                patched.push((k, v));
            }
            h.borrow_mut().clear();
            for (k, v) in patched {
                h.borrow_mut()
                    .insert(crate::value::HashKey(k), v);
            }
            Ok(())
        }
        Value::Struct { slots, .. } => {
            let names: Vec<_> = slots.borrow().iter().map(|(n, _)| n.clone()).collect();
            for slot_name in names {
                if table.count == 0 {
                    break;
                }
                let idx = slots
                    .borrow()
                    .iter()
                    .position(|(n, _)| *n == slot_name)
                    .unwrap();
                let val = slots.borrow()[idx].1.clone();
                match patch_ref(name, table, &val)? {
                    Some(rep) => slots.borrow_mut()[idx].1 = rep,
                    None => backpatch(name, table, visiting, &val)?,
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Resolve every `#n#` placeholder embedded in `tree` against `table`,
/// including `tree` itself (e.g. `#1=#1#` or a bare dangling `#2#` at top
/// level — `backpatch_inner` only walks into a value's *children*, so the
/// root has to be checked against `patch_ref` separately here). Returns the
/// resolved root, which the caller must use in place of `tree` since the
/// root itself may have been replaced. Called once per top-level form,
/// after the grammar has finished building it (§4.C "Back-patching").
pub fn resolve(name: &str, table: &mut CircTable, tree: &Value) -> Result<Value, ReadError> {
    if table.count == 0 {
        return Ok(tree.clone());
    }

    let root = match patch_ref(name, table, tree)? {
        Some(rep) => rep,
        None => tree.clone(),
    };

    let mut visiting = Vec::new();
    backpatch(name, table, &mut visiting, &root)?;

    if table.count > 0 {
        return Err(ReadError::UnresolvedCircRefs {
            name: name.to_string(),
        });
    }

    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_self_referential_cons() {
        let mut table = CircTable::new();
        // #1=(a . #1#)
        let placeholder = table.reference(1);
        let tree = Value::cons(Value::symbol("a"), placeholder);
        table.define("test", 1, tree.clone()).unwrap();

        resolve("test", &mut table, &tree).unwrap();
        assert_eq!(table.count, 0);

        if let Value::Cons(cell) = &tree {
            let (_car, cdr) = cell.borrow().clone();
            assert!(matches!(cdr, Value::Cons(c) if Rc::ptr_eq(&c, cell)));
        } else {
            panic!("expected cons");
        }
    }

    #[test]
    fn test_absurd_self_reference() {
        // #1=#1#
        let mut table = CircTable::new();
        let tree = table.reference(1);
        table.define("test", 1, tree.clone()).unwrap();

        let err = resolve("test", &mut table, &tree).unwrap_err();
        assert!(matches!(err, ReadError::AbsurdCircRef { label: 1, .. }));
    }

    #[test]
    fn test_dangling_reference() {
        let mut table = CircTable::new();
        let tree = table.reference(2);
        let err = resolve("test", &mut table, &tree).unwrap_err();
        assert!(matches!(err, ReadError::DanglingCircRef { label: 2, .. }));
    }

    #[test]
    fn test_duplicate_definition() {
        let mut table = CircTable::new();
        table.define("test", 1, Value::Number(1.0)).unwrap();
        let err = table.define("test", 1, Value::Number(2.0)).unwrap_err();
        assert!(matches!(err, ReadError::DuplicateCircDef { label: 1, .. }));
    }

    #[test]
    fn test_vector_backpatch() {
        let mut table = CircTable::new();
        let placeholder = table.reference(1);
        let vec_cell = Rc::new(RefCell::new(vec![Value::Number(1.0), placeholder]));
        let tree = Value::Vector(vec_cell.clone());
        table.define("test", 1, tree.clone()).unwrap();

        resolve("test", &mut table, &tree).unwrap();
        assert!(matches!(vec_cell.borrow()[1], Value::Vector(ref v) if Rc::ptr_eq(v, &vec_cell)));
    }

    #[test]
    fn test_suppress_returns_value_directly() {
        let mut table = CircTable::new();
        table.define("test", 1, Value::Number(7.0)).unwrap();
        table.suppress = true;
        let v = table.reference(1);
        assert!(matches!(v, Value::Number(n) if n == 7.0));
        assert_eq!(table.count, 0);
    }
}
