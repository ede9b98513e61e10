//! The five classes every program starts out with.
//!
//! Their methods have no bodies, they are provided by the runtime system.

use crate::{type_system::*, well_known::WellKnownSymbols};
use std::rc::Rc;
use strtab::Symbol;

struct BuiltinClass<'src> {
    def: ClassDef<'src>,
}

impl<'src> BuiltinClass<'src> {
    fn new(
        symbols: &WellKnownSymbols<'src>,
        name: Symbol<'src>,
        parent: Option<Symbol<'src>>,
    ) -> Self {
        BuiltinClass {
            def: ClassDef {
                name,
                parent,
                filename: symbols.basic_class_file,
                line: 0,
                attributes: vec![],
                methods: vec![],
                is_builtin: true,
            },
        }
    }

    fn attribute(mut self, name: Symbol<'src>, ty: Symbol<'src>) -> Self {
        self.def.attributes.push(ClassAttributeDef { name, ty, line: 0 });
        self
    }

    fn method(
        mut self,
        name: Symbol<'src>,
        params: &[(Symbol<'src>, Symbol<'src>)],
        return_ty: Symbol<'src>,
    ) -> Self {
        let params = params
            .iter()
            .map(|&(name, ty)| MethodParamDef { name, ty })
            .collect();
        self.def.methods.push(Rc::new(ClassMethodDef {
            name,
            class: self.def.name,
            params,
            return_ty,
            line: 0,
        }));
        self
    }

    fn build(self) -> ClassDef<'src> {
        log::trace!("installing built-in {}", self.def);
        self.def
    }
}

/// `Object`, `IO`, `Int`, `Bool` and `String`, in this order.
pub fn builtin_classes<'src>(symbols: &WellKnownSymbols<'src>) -> Vec<ClassDef<'src>> {
    let s = symbols;

    let object = BuiltinClass::new(s, s.object, None)
        .method(s.abort, &[], s.object)
        .method(s.type_name, &[], s.string)
        .method(s.copy, &[], s.self_type)
        .build();

    let io = BuiltinClass::new(s, s.io, Some(s.object))
        .method(s.out_string, &[(s.arg, s.string)], s.self_type)
        .method(s.out_int, &[(s.arg, s.int)], s.self_type)
        .method(s.in_string, &[], s.string)
        .method(s.in_int, &[], s.int)
        .build();

    let int = BuiltinClass::new(s, s.int, Some(s.object))
        .attribute(s.val, s.prim_slot)
        .build();

    let bool_ = BuiltinClass::new(s, s.bool, Some(s.object))
        .attribute(s.val, s.prim_slot)
        .build();

    let string = BuiltinClass::new(s, s.string, Some(s.object))
        .attribute(s.val, s.int)
        .attribute(s.str_field, s.prim_slot)
        .method(s.length, &[], s.int)
        .method(s.concat, &[(s.arg, s.string)], s.string)
        .method(s.substr, &[(s.arg, s.int), (s.arg2, s.int)], s.string)
        .build();

    vec![object, io, int, bool_, string]
}
