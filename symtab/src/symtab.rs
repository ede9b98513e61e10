#![warn(
    clippy::print_stdout,
    clippy::unimplemented,
    clippy::doc_markdown,
    clippy::items_after_statements,
    clippy::match_same_arms,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::use_self,
    clippy::use_debug
)]

//! Lexically scoped symbol table.
//!
//! Inner scopes may shadow bindings of outer scopes. Lookups are O(1)
//! regardless of the nesting depth: for every visible symbol we keep the
//! stack of scope indices that bind it, innermost last.

use std::{collections::HashMap, hash::Hash};

/// SymbolTable associates a Symbol `S` with a stored value `T`.
pub type SymbolTable<S, T> = HashMap<S, T>;

/// Index into `Scoped::scopes`. Index 0 is the root scope.
type ScopeIdx = usize;

/// Scoped implements scoping for SymbolTable.
/// The generic type `S` is the Symbol and `T` is the value stored for that
/// symbol.
pub struct Scoped<S, T>
where
    S: Hash + Eq + Copy,
{
    scopes: Vec<SymbolTable<S, T>>,
    visible_defs: HashMap<S, Vec<ScopeIdx>>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct CannotLeaveRootScopeError;

#[allow(clippy::new_without_default_derive)]
impl<S, T> Scoped<S, T>
where
    S: Hash + Eq + Copy,
{
    pub fn new() -> Self {
        Scoped {
            scopes: vec![SymbolTable::new()],
            visible_defs: HashMap::new(),
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(SymbolTable::new())
    }

    pub fn leave_scope(&mut self) -> Result<(), CannotLeaveRootScopeError> {
        if self.scopes.len() <= 1 {
            return Err(CannotLeaveRootScopeError);
        }
        let popped_idx = self.scopes.len() - 1;
        let popped = self.scopes.pop().ok_or(CannotLeaveRootScopeError)?;

        for sym in popped.keys() {
            let now_empty = match self.visible_defs.get_mut(sym) {
                Some(stack) => {
                    let top = stack.pop();
                    debug_assert_eq!(
                        top,
                        Some(popped_idx),
                        "scopes inconsistent with visible_defs"
                    );
                    stack.is_empty()
                }
                None => {
                    debug_assert!(false, "scopes inconsistent with visible_defs");
                    false
                }
            };
            if now_empty {
                self.visible_defs.remove(sym);
            }
        }
        Ok(())
    }

    /// Runs `f` inside a fresh scope that is left again afterwards, no
    /// matter how `f` returns.
    pub fn with_scope<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.enter_scope();
        let depth = self.depth();
        let res = f(self);
        debug_assert_eq!(depth, self.depth(), "unbalanced scopes inside with_scope");
        // cannot fail: we entered a scope above
        let _ = self.leave_scope();
        res
    }

    /// Binds `sym` in the innermost scope. A binding of `sym` in the same
    /// scope is overwritten, bindings in outer scopes are shadowed.
    pub fn bind(&mut self, sym: S, val: T) -> Option<T> {
        let scope_idx = self.scopes.len() - 1;
        let previous = self.scopes[scope_idx].insert(sym, val);
        if previous.is_none() {
            self.visible_defs
                .entry(sym)
                .or_insert_with(Vec::new)
                .push(scope_idx);
        }
        previous
    }

    pub fn lookup(&self, sym: S) -> Option<&T> {
        // amortized O(1) lookup to get sym's innermost scope
        let scope_idx = *self.visible_defs.get(&sym)?.last()?;
        self.scopes[scope_idx].get(&sym)
    }

    pub fn is_bound_in_current_scope(&self, sym: S) -> bool {
        self.scopes
            .last()
            .map(|scope| scope.contains_key(&sym))
            .unwrap_or(false)
    }

    /// All symbols that currently resolve to some binding, in no particular
    /// order.
    pub fn visible_symbols(&self) -> impl Iterator<Item = S> + '_ {
        self.visible_defs.keys().cloned()
    }

    /// Number of scopes entered on top of the root scope.
    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use utils::assert_matches;

    macro_rules! def {
        ($scoped:expr, $s:expr) => {
            $scoped.bind($s, ());
            $scoped
                .lookup($s)
                .expect("just bound, should be visible");
        };
        ($scoped:expr, $s:expr, $t:expr) => {{
            $scoped.bind($s, $t);
            let vis = $scoped.lookup($s).expect("just bound, should be visible");
            assert_eq!(&$t, vis);
        }};
    }

    macro_rules! assert_def {
        ($scoped:expr, $s:expr) => {
            $scoped
                .lookup($s)
                .unwrap_or_else(|| panic!("expecting visible definition for {:?}", $s));
        };
        ($scoped:expr, $s:expr, $t:expr) => {
            assert_eq!(Some(&$t), $scoped.lookup($s));
        };
    }

    macro_rules! assert_no_def {
        ($scoped:expr, $s:expr) => {
            let def = $scoped.lookup($s);
            assert_matches!(def, None);
        };
    }

    #[test]
    fn definition_inheritance_works() {
        let mut scoped = Scoped::new();
        def!(scoped, "root");
        scoped.enter_scope();
        def!(scoped, "l1");
        scoped.enter_scope();
        def!(scoped, "l2");

        // at l2
        assert_def!(scoped, "root");
        assert_def!(scoped, "l1");
        assert_def!(scoped, "l2");
        scoped.leave_scope().expect("not in root scope");
        // at l1
        assert_def!(scoped, "root");
        assert_def!(scoped, "l1");
        assert_no_def!(scoped, "l2");
        scoped.leave_scope().expect("not in root scope");
        // at root scope
        assert_def!(scoped, "root");
        assert_no_def!(scoped, "l1");
        assert_no_def!(scoped, "l2");
    }

    #[test]
    fn neighboring_scopes() {
        let mut scoped = Scoped::new();
        def!(scoped, "inroot", 0);
        scoped.enter_scope();
        def!(scoped, "v", 1);
        scoped.leave_scope().expect("not in root scope");
        assert_no_def!(scoped, "v");
        scoped.enter_scope();
        def!(scoped, "v", 2);
        scoped.leave_scope().expect("not in root scope");
    }

    #[test]
    fn shadowing_is_undone_on_leave() {
        let mut scoped = Scoped::new();
        def!(scoped, "x", "Int");
        scoped.enter_scope();
        def!(scoped, "x", "String");
        assert_def!(scoped, "x", "String");
        scoped.enter_scope();
        assert_def!(scoped, "x", "String");
        def!(scoped, "x", "Bool");
        scoped.leave_scope().unwrap();
        assert_def!(scoped, "x", "String");
        scoped.leave_scope().unwrap();
        assert_def!(scoped, "x", "Int");
    }

    #[test]
    fn rebinding_in_same_scope_overwrites() {
        let mut scoped = Scoped::new();
        scoped.enter_scope();
        assert_eq!(None, scoped.bind("a", 1));
        assert_eq!(Some(1), scoped.bind("a", 2));
        assert_def!(scoped, "a", 2);
        // a single leave removes the overwritten binding completely
        scoped.leave_scope().unwrap();
        assert_no_def!(scoped, "a");
    }

    #[test]
    fn bound_in_current_scope_ignores_outer_scopes() {
        let mut scoped = Scoped::new();
        def!(scoped, "outer");
        assert!(scoped.is_bound_in_current_scope("outer"));
        scoped.enter_scope();
        assert!(!scoped.is_bound_in_current_scope("outer"));
        def!(scoped, "inner");
        assert!(scoped.is_bound_in_current_scope("inner"));
    }

    #[test]
    fn over_leaves_returns_err() {
        let mut scoped: Scoped<(), ()> = Scoped::new();
        scoped.enter_scope();
        scoped.enter_scope();
        scoped.leave_scope().unwrap();
        scoped.leave_scope().unwrap();
        let ret = scoped.leave_scope();
        assert_matches!(ret, Err(CannotLeaveRootScopeError));
    }

    #[test]
    fn with_scope_always_leaves() {
        let mut scoped = Scoped::new();
        def!(scoped, "x", 0);
        let seen = scoped.with_scope(|inner| {
            def!(inner, "x", 1);
            def!(inner, "y", 2);
            assert_eq!(1, inner.depth());
            *inner.lookup("x").unwrap()
        });
        assert_eq!(1, seen);
        assert_eq!(0, scoped.depth());
        assert_def!(scoped, "x", 0);
        assert_no_def!(scoped, "y");
    }

    #[test]
    fn visible_symbols_lists_each_symbol_once() {
        let mut scoped = Scoped::new();
        def!(scoped, "a");
        scoped.enter_scope();
        def!(scoped, "a");
        def!(scoped, "b");
        let mut visible: Vec<_> = scoped.visible_symbols().collect();
        visible.sort();
        assert_eq!(vec!["a", "b"], visible);
    }
}
