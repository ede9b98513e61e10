use crate::{semantic_error::SemanticError, type_system::*};
use diagnostics::{Diagnostics, Location};
use strtab::Symbol;
use symtab::Scoped;

/// Variables visible while checking one class: `self`, every attribute of
/// the class and its ancestors, and the formals and locals introduced by
/// nested scopes. Each name maps to its declared type.
pub struct ObjectEnvironment<'src> {
    current_class: Symbol<'src>,
    scoped: Scoped<Symbol<'src>, Symbol<'src>>,
}

impl<'src> ObjectEnvironment<'src> {
    /// Builds the class scope of `class`.
    ///
    /// Inherited attributes are bound first, the closest ancestor winning.
    /// An own attribute whose name is already bound is reported and does not
    /// replace the existing binding. Attributes named `self` are left to the
    /// feature checks.
    pub fn for_class(
        type_system: &TypeSystem<'src>,
        class: &ClassDef<'src>,
        diagnostics: &Diagnostics,
    ) -> Self {
        let symbols = type_system.symbols();
        let mut scoped = Scoped::new();
        scoped.bind(symbols.self_, symbols.self_type);

        for ancestor in type_system.ancestors(class.name).skip(1) {
            for attribute in &ancestor.attributes {
                if attribute.name == symbols.self_ || scoped.lookup(attribute.name).is_some() {
                    continue;
                }
                scoped.bind(attribute.name, attribute.ty);
            }
        }

        for attribute in &class.attributes {
            if attribute.name == symbols.self_ {
                continue;
            }
            if scoped.lookup(attribute.name).is_some() {
                diagnostics.error_at(
                    Location::new(class.filename.as_str(), attribute.line),
                    SemanticError::AttributeRedefined {
                        name: attribute.name.to_string(),
                    },
                );
                continue;
            }
            scoped.bind(attribute.name, attribute.ty);
        }

        ObjectEnvironment {
            current_class: class.name,
            scoped,
        }
    }

    pub fn current_class(&self) -> Symbol<'src> {
        self.current_class
    }

    pub fn enter_scope(&mut self) {
        self.scoped.enter_scope();
    }

    /// Leaving the class scope itself is a bug in the caller.
    pub fn leave_scope(&mut self) {
        self.scoped
            .leave_scope()
            .expect("scopes of an object environment are balanced");
    }

    pub fn bind(&mut self, name: Symbol<'src>, ty: Symbol<'src>) {
        self.scoped.bind(name, ty);
    }

    pub fn lookup(&self, name: Symbol<'src>) -> Option<Symbol<'src>> {
        self.scoped.lookup(name).cloned()
    }

    pub fn is_bound_in_current_scope(&self, name: Symbol<'src>) -> bool {
        self.scoped.is_bound_in_current_scope(name)
    }

    pub fn visible_symbols(&self) -> impl Iterator<Item = Symbol<'src>> + '_ {
        self.scoped.visible_symbols()
    }
}
