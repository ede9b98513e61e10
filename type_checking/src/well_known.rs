use strtab::{StringTable, Symbol};

/// Names the analysis refers to directly, interned once per analysis.
///
/// `no_type` is the type of a missing expression and `prim_slot` the type of
/// the raw value slots of the primitive classes. Built-in classes are
/// attributed to the file `basic_class_file`.
#[derive(Debug, Clone, Copy)]
pub struct WellKnownSymbols<'src> {
    pub object: Symbol<'src>,
    pub io: Symbol<'src>,
    pub int: Symbol<'src>,
    pub bool: Symbol<'src>,
    pub string: Symbol<'src>,
    pub self_type: Symbol<'src>,
    pub self_: Symbol<'src>,
    pub main_class: Symbol<'src>,
    pub no_type: Symbol<'src>,
    pub prim_slot: Symbol<'src>,
    pub basic_class_file: Symbol<'src>,

    pub abort: Symbol<'src>,
    pub type_name: Symbol<'src>,
    pub copy: Symbol<'src>,
    pub out_string: Symbol<'src>,
    pub out_int: Symbol<'src>,
    pub in_string: Symbol<'src>,
    pub in_int: Symbol<'src>,
    pub length: Symbol<'src>,
    pub concat: Symbol<'src>,
    pub substr: Symbol<'src>,
    pub arg: Symbol<'src>,
    pub arg2: Symbol<'src>,
    pub val: Symbol<'src>,
    pub str_field: Symbol<'src>,
}

impl<'src> WellKnownSymbols<'src> {
    pub fn new(strtab: &mut StringTable<'src>) -> Self {
        WellKnownSymbols {
            object: strtab.intern("Object"),
            io: strtab.intern("IO"),
            int: strtab.intern("Int"),
            bool: strtab.intern("Bool"),
            string: strtab.intern("String"),
            self_type: strtab.self_type_symbol(),
            self_: strtab.self_symbol(),
            main_class: strtab.intern("Main"),
            no_type: strtab.intern("_no_type"),
            prim_slot: strtab.intern("_prim_slot"),
            basic_class_file: strtab.intern("<basic class>"),

            abort: strtab.intern("abort"),
            type_name: strtab.intern("type_name"),
            copy: strtab.intern("copy"),
            out_string: strtab.intern("out_string"),
            out_int: strtab.intern("out_int"),
            in_string: strtab.intern("in_string"),
            in_int: strtab.intern("in_int"),
            length: strtab.intern("length"),
            concat: strtab.intern("concat"),
            substr: strtab.intern("substr"),
            arg: strtab.intern("arg"),
            arg2: strtab.intern("arg2"),
            val: strtab.intern("_val"),
            str_field: strtab.intern("_str_field"),
        }
    }

    /// The classes that cannot be inherited from.
    pub fn is_sealed(&self, class: Symbol<'src>) -> bool {
        class == self.int || class == self.bool || class == self.string || class == self.self_type
    }

    /// `Int`, `Bool` and `String` may only be compared with themselves.
    pub fn is_basic_value_type(&self, ty: Symbol<'src>) -> bool {
        ty == self.int || ty == self.bool || ty == self.string
    }
}
