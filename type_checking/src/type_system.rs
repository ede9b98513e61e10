use crate::{builtin_types, semantic_error::HierarchyError, well_known::WellKnownSymbols};
use diagnostics::{Location, MaybeLocated};
use itertools::Itertools;
use std::{collections::HashMap, fmt, rc::Rc};
use strtab::Symbol;

/// The class registry: every built-in and user class by name, plus the
/// subtype and join relations over them.
///
/// A `TypeSystem` is only handed out by [`TypeSystem::build`] once the
/// hierarchy is known to be well formed: every parent is registered, no
/// class inherits from `Int`, `Bool`, `String` or `SELF_TYPE`, and there are
/// no cycles. It is immutable afterwards.
#[derive(Debug)]
pub struct TypeSystem<'src> {
    classes: HashMap<Symbol<'src>, Rc<ClassDef<'src>>>,
    /// Registration order: built-ins first, then user classes in
    /// declaration order.
    class_order: Vec<Symbol<'src>>,
    symbols: WellKnownSymbols<'src>,
}

#[derive(Debug)]
pub struct ClassDef<'src> {
    pub name: Symbol<'src>,
    /// `None` only for `Object`.
    pub parent: Option<Symbol<'src>>,
    pub filename: Symbol<'src>,
    pub line: usize,
    pub attributes: Vec<ClassAttributeDef<'src>>,
    /// Directly declared methods in declaration order, duplicates included.
    pub methods: Vec<Rc<ClassMethodDef<'src>>>,
    pub is_builtin: bool,
}

#[derive(Debug)]
pub struct ClassAttributeDef<'src> {
    pub name: Symbol<'src>,
    pub ty: Symbol<'src>,
    pub line: usize,
}

#[derive(Debug)]
pub struct ClassMethodDef<'src> {
    pub name: Symbol<'src>,
    /// The class declaring the method.
    pub class: Symbol<'src>,
    pub params: Vec<MethodParamDef<'src>>,
    pub return_ty: Symbol<'src>,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodParamDef<'src> {
    pub name: Symbol<'src>,
    pub ty: Symbol<'src>,
}

impl<'src> ClassDef<'src> {
    pub fn from_ast(class: &ast::Located<ast::Class<'src>>) -> Self {
        let attributes = class
            .attributes()
            .map(|(line, attribute)| ClassAttributeDef {
                name: attribute.name,
                ty: attribute.ty,
                line,
            })
            .collect();
        let methods = class
            .methods()
            .map(|(line, method)| {
                Rc::new(ClassMethodDef {
                    name: method.name,
                    class: class.name,
                    params: method
                        .formals
                        .iter()
                        .map(|formal| MethodParamDef {
                            name: formal.name,
                            ty: formal.ty,
                        })
                        .collect(),
                    return_ty: method.return_type,
                    line,
                })
            })
            .collect();

        ClassDef {
            name: class.name,
            parent: Some(class.parent),
            filename: class.filename,
            line: class.line,
            attributes,
            methods,
            is_builtin: false,
        }
    }

    pub fn location(&self) -> Location {
        Location::new(self.filename.as_str(), self.line)
    }
}

impl fmt::Display for ClassDef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parent {
            Some(parent) => write!(f, "class {} inherits {}", self.name, parent),
            None => write!(f, "class {}", self.name),
        }
    }
}

pub type HierarchyResult<'src> = Result<TypeSystem<'src>, MaybeLocated<HierarchyError>>;

impl<'src> TypeSystem<'src> {
    /// A registry holding only the five built-in classes.
    pub fn with_builtins(symbols: WellKnownSymbols<'src>) -> Self {
        let mut type_system = TypeSystem {
            classes: HashMap::new(),
            class_order: Vec::new(),
            symbols,
        };
        for class in builtin_types::builtin_classes(&symbols) {
            type_system.insert(class);
        }
        type_system
    }

    /// Registers the classes of `program` and validates the hierarchy. The
    /// first violation found is returned, nothing after it is looked at.
    pub fn build(
        program: &ast::Program<'src>,
        symbols: WellKnownSymbols<'src>,
    ) -> HierarchyResult<'src> {
        let mut type_system = Self::with_builtins(symbols);

        for class in &program.classes {
            let name = class.name;
            let already_registered = type_system.lookup_class(name);
            if already_registered.is_some() || name == symbols.self_type {
                let location = Location::new(class.filename.as_str(), class.line);
                let name = name.to_string();
                let error = match already_registered {
                    Some(existing) if !existing.is_builtin => {
                        HierarchyError::ClassRedefined { name }
                    }
                    _ => HierarchyError::BasicClassRedefined { name },
                };
                return Err(MaybeLocated::WithLocation(location, error));
            }
            type_system.insert(ClassDef::from_ast(class));
        }

        if !type_system.is_defined(symbols.main_class) {
            return Err(MaybeLocated::WithoutLocation(HierarchyError::MainNotDefined));
        }

        for class in &program.classes {
            type_system.check_parent_chain(class.name)?;
        }

        log::debug!(
            "class hierarchy: {}",
            type_system
                .class_order
                .iter()
                .map(|name| type_system.classes[name].to_string())
                .join(", ")
        );

        Ok(type_system)
    }

    /// Walks the ancestors of `start` up to `Object`.
    fn check_parent_chain(
        &self,
        start: Symbol<'src>,
    ) -> Result<(), MaybeLocated<HierarchyError>> {
        let symbols = &self.symbols;
        let mut current = match self.lookup_class(start) {
            Some(class) => class,
            None => return Ok(()),
        };
        // a walk that never reaches `start` again is stuck in a cycle of
        // other classes; that cycle is reported by the walk of one of them
        let mut remaining_steps = self.classes.len();

        while let Some(parent) = current.parent {
            if parent == symbols.object {
                break;
            }

            let fail = |error| Err(MaybeLocated::WithLocation(current.location(), error));
            let class = current.name.to_string();

            if symbols.is_sealed(parent) {
                return fail(HierarchyError::InheritsFromSealedClass {
                    class,
                    parent: parent.to_string(),
                });
            }

            let parent_def = match self.lookup_class(parent) {
                Some(parent_def) => parent_def,
                None => {
                    return fail(HierarchyError::UndefinedParent {
                        class,
                        parent: parent.to_string(),
                    });
                }
            };

            if parent == start {
                return fail(HierarchyError::InheritanceCycle { class });
            }

            if remaining_steps == 0 {
                break;
            }
            remaining_steps -= 1;
            current = parent_def;
        }

        Ok(())
    }

    fn insert(&mut self, class_def: ClassDef<'src>) {
        let name = class_def.name;
        self.classes.insert(name, Rc::new(class_def));
        self.class_order.push(name);
    }

    pub fn symbols(&self) -> &WellKnownSymbols<'src> {
        &self.symbols
    }

    pub fn is_defined(&self, name: Symbol<'src>) -> bool {
        self.classes.contains_key(&name)
    }

    pub fn lookup_class(&self, name: Symbol<'src>) -> Option<Rc<ClassDef<'src>>> {
        self.classes.get(&name).map(Rc::clone)
    }

    /// All classes in registration order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassDef<'src>> {
        self.class_order.iter().map(move |name| &*self.classes[name])
    }

    /// `class` itself followed by its parent, its parent's parent and so on
    /// up to `Object`. Empty for unregistered classes.
    pub fn ancestors(&self, class: Symbol<'src>) -> Ancestors<'_, 'src> {
        Ancestors {
            type_system: self,
            next: Some(class),
            remaining: self.classes.len(),
        }
    }

    fn resolve_self_type(&self, ty: Symbol<'src>, current_class: Symbol<'src>) -> Symbol<'src> {
        if ty == self.symbols.self_type {
            current_class
        } else {
            ty
        }
    }

    /// Whether `sub` conforms to `sup` inside `current_class`, where
    /// `SELF_TYPE` on either side stands for `current_class`.
    pub fn is_subclass(
        &self,
        sub: Symbol<'src>,
        sup: Symbol<'src>,
        current_class: Symbol<'src>,
    ) -> bool {
        let sub = self.resolve_self_type(sub, current_class);
        let sup = self.resolve_self_type(sup, current_class);
        self.ancestors(sub).any(|ancestor| ancestor.name == sup)
    }

    /// The least common ancestor of `a` and `b` inside `current_class`.
    pub fn join(
        &self,
        a: Symbol<'src>,
        b: Symbol<'src>,
        current_class: Symbol<'src>,
    ) -> Symbol<'src> {
        let a = self.resolve_self_type(a, current_class);
        self.ancestors(a)
            .map(|candidate| candidate.name)
            .find(|&candidate| self.is_subclass(b, candidate, current_class))
            .unwrap_or(self.symbols.object)
    }
}

pub struct Ancestors<'ts, 'src> {
    type_system: &'ts TypeSystem<'src>,
    next: Option<Symbol<'src>>,
    remaining: usize,
}

impl<'ts, 'src> Iterator for Ancestors<'ts, 'src> {
    type Item = &'ts ClassDef<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let class = self.type_system.classes.get(&self.next?)?;
        self.next = class.parent;
        Some(&**class)
    }
}
