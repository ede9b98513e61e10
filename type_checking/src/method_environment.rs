use crate::{semantic_error::SemanticError, type_system::*};
use diagnostics::{Diagnostics, Location};
use std::{collections::HashMap, rc::Rc};
use strtab::Symbol;

/// The method table: `(class, method)` to the declaration found directly in
/// that class. Inherited methods are found through
/// [`MethodEnvironment::resolve_method`].
#[derive(Debug, Default)]
pub struct MethodEnvironment<'src> {
    methods: HashMap<(Symbol<'src>, Symbol<'src>), Rc<ClassMethodDef<'src>>>,
}

impl<'src> MethodEnvironment<'src> {
    /// Collects the methods of every registered class. A method declared
    /// twice in one class is reported and the first declaration is kept.
    pub fn build(type_system: &TypeSystem<'src>, diagnostics: &Diagnostics) -> Self {
        let mut methods = HashMap::new();

        for class in type_system.classes() {
            for method in &class.methods {
                let key = (class.name, method.name);
                if methods.contains_key(&key) {
                    diagnostics.error_at(
                        Location::new(class.filename.as_str(), method.line),
                        SemanticError::MethodRedefined {
                            name: method.name.to_string(),
                        },
                    );
                    continue;
                }
                methods.insert(key, Rc::clone(method));
            }
        }

        log::debug!("method table has {} entries", methods.len());
        MethodEnvironment { methods }
    }

    /// The declaration directly in `class`, not looking at ancestors.
    pub fn declared_method(
        &self,
        class: Symbol<'src>,
        method: Symbol<'src>,
    ) -> Option<Rc<ClassMethodDef<'src>>> {
        self.methods.get(&(class, method)).map(Rc::clone)
    }

    /// The first declaration of `method` in `class` or its closest ancestor.
    pub fn resolve_method(
        &self,
        type_system: &TypeSystem<'src>,
        class: Symbol<'src>,
        method: Symbol<'src>,
    ) -> Option<Rc<ClassMethodDef<'src>>> {
        type_system
            .ancestors(class)
            .find_map(|ancestor| self.declared_method(ancestor.name, method))
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
