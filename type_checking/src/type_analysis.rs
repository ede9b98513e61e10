use ast::{Expr, Located};
use std::collections::HashMap;
use strtab::Symbol;
use utils::RefEq;

/// The inferred static type of every checked expression node. Nodes are
/// identified by address, so two structurally equal subtrees are annotated
/// separately.
#[derive(Debug, Default)]
pub struct TypeAnalysis<'src, 'ast> {
    expr_types: HashMap<RefEq<'ast, Located<Expr<'src>>>, Symbol<'src>>,
}

impl<'src, 'ast> TypeAnalysis<'src, 'ast> {
    pub fn new() -> Self {
        TypeAnalysis::default()
    }

    /// Each node is annotated at most once per analysis run.
    pub fn set_expr_type(&mut self, expr: &'ast Located<Expr<'src>>, ty: Symbol<'src>) {
        let previous = self.expr_types.insert(RefEq(expr), ty);
        debug_assert!(
            previous.is_none(),
            "expression at line {} annotated twice",
            expr.line
        );
    }

    /// `None` for nodes the checker did not reach, e.g. below the nesting
    /// limit.
    pub fn expr_type(&self, expr: &'ast Located<Expr<'src>>) -> Option<Symbol<'src>> {
        self.expr_types.get(&RefEq(expr)).cloned()
    }

    pub fn len(&self) -> usize {
        self.expr_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expr_types.is_empty()
    }
}
