// ABOUTME: Package module — symbol visibility and struct-slot directory for completion

use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// What a symbol is bound as, for the completion engine's role filters
/// (§4.F: callable / indexable / slot / method).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bindings {
    pub variable: bool,
    pub function: bool,
    pub macro_: bool,
    pub special_operator: bool,
}

impl Bindings {
    pub fn fboundp(&self) -> bool {
        self.function
    }
    pub fn mboundp(&self) -> bool {
        self.macro_
    }
    pub fn callable(&self) -> bool {
        self.function || self.macro_ || self.special_operator
    }
    pub fn indexable(&self) -> bool {
        self.variable || self.function
    }
}

/// A struct type's slot names, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct StructType {
    pub slots: Vec<Rc<str>>,
}

/// A package: an interned symbol table plus a fallback search list.
/// `Environment` in the teacher crate is the variable-binding scope chain of
/// the (out-of-scope) evaluator; `Package` is the reader/completion-side
/// notion of "where a name lives", per this spec's glossary entry.
#[derive(Debug)]
pub struct Package {
    pub name: Rc<str>,
    symbols: RefCell<HashMap<Rc<str>, Bindings>>,
    struct_types: RefCell<HashMap<Rc<str>, StructType>>,
    /// Packages consulted, in order, when a symbol isn't interned here and
    /// the caller asked for fallback-inclusive visibility.
    pub fallback: RefCell<Vec<Rc<Package>>>,
}

impl Package {
    pub fn new(name: impl Into<Rc<str>>) -> Rc<Self> {
        Rc::new(Package {
            name: name.into(),
            symbols: RefCell::new(HashMap::new()),
            struct_types: RefCell::new(HashMap::new()),
            fallback: RefCell::new(Vec::new()),
        })
    }

    pub fn intern(&self, name: impl Into<Rc<str>>, bindings: Bindings) {
        self.symbols.borrow_mut().insert(name.into(), bindings);
    }

    pub fn define_struct_type(&self, name: impl Into<Rc<str>>, slots: Vec<Rc<str>>) {
        self.struct_types
            .borrow_mut()
            .insert(name.into(), StructType { slots });
    }

    pub fn add_fallback(&self, pkg: Rc<Package>) {
        self.fallback.borrow_mut().push(pkg);
    }

    /// The package's own interned symbols, as (name, bindings) pairs.
    pub fn own_symbols(&self) -> Vec<(Rc<str>, Bindings)> {
        self.symbols
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    /// Visible symbols: own symbols, plus — when `include_fallback` is set —
    /// every fallback package's symbols not already shadowed here (§4.F,
    /// grounded in `original_source/parser.c`'s `get_visible_syms`).
    pub fn visible_symbols(&self, include_fallback: bool) -> Vec<(Rc<str>, Bindings)> {
        if !include_fallback || self.fallback.borrow().is_empty() {
            return self.own_symbols();
        }

        let mut merged: HashMap<Rc<str>, Bindings> = self.symbols.borrow().clone();
        for fb in self.fallback.borrow().iter() {
            for (name, bindings) in fb.own_symbols() {
                merged.entry(name).or_insert(bindings);
            }
        }
        merged.into_iter().collect()
    }

    /// Slot names of every struct type registered in this package, used by
    /// slot/method completion kinds.
    pub fn slot_names(&self) -> Vec<Rc<str>> {
        let mut names: Vec<Rc<str>> = self
            .struct_types
            .borrow()
            .values()
            .flat_map(|st| st.slots.iter().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn struct_type(&self, name: &str) -> Option<StructType> {
        self.struct_types.borrow().get(name).cloned()
    }
}

/// Enumerate a struct's slot values in declaration order, for the
/// circular-reference back-patch traversal (§4.C).
pub fn struct_slot_values(slots: &crate::value::StructCell) -> Vec<(Rc<str>, Value)> {
    slots.borrow().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_symbols_only_without_fallback() {
        let pkg = Package::new("user");
        pkg.intern(
            "print",
            Bindings {
                function: true,
                ..Default::default()
            },
        );
        let syms = pkg.visible_symbols(true);
        assert_eq!(syms.len(), 1);
    }

    #[test]
    fn test_fallback_visibility_shadowing() {
        let base = Package::new("base");
        base.intern(
            "x",
            Bindings {
                variable: true,
                ..Default::default()
            },
        );

        let user = Package::new("user");
        user.intern(
            "x",
            Bindings {
                function: true,
                ..Default::default()
            },
        );
        user.add_fallback(base);

        let visible = user.visible_symbols(true);
        assert_eq!(visible.len(), 1);
        // user's own `x` (function) shadows base's `x` (variable)
        assert!(visible[0].1.function);
    }

    #[test]
    fn test_slot_names_sorted_and_deduped() {
        let pkg = Package::new("user");
        pkg.define_struct_type("point", vec!["y".into(), "x".into()]);
        pkg.define_struct_type("point3", vec!["z".into(), "x".into()]);
        assert_eq!(pkg.slot_names(), vec!["x".into(), "y".into(), "z".into()]);
    }
}
