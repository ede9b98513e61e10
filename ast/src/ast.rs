use crate::Located;
use std::fmt;
use strtab::Symbol;
use strum_macros::EnumDiscriminants;

/// This is the top-level node. It stores all class declarations of the
/// program in declaration order.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Program<'t> {
    pub classes: Vec<Located<Class<'t>>>,
}

/// A class declaration: its name, the name of its parent (`Object` if the
/// source omitted it), the file it was declared in and its features in
/// declaration order.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Class<'t> {
    pub name: Symbol<'t>,
    pub parent: Symbol<'t>,
    pub filename: Symbol<'t>,
    pub features: Vec<Located<Feature<'t>>>,
}

/// A class feature is either one of
/// * `Attribute`: a typed field with an optional initializer
/// * `Method`: a method with formals, return type and body
#[derive(EnumDiscriminants, Debug, PartialEq, Eq, Clone)]
#[strum_discriminants(derive(Display))]
pub enum Feature<'t> {
    Attribute(Attribute<'t>),
    Method(Method<'t>),
}

/// An attribute without initializer carries `Expr::NoExpr` as `init`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Attribute<'t> {
    pub name: Symbol<'t>,
    pub ty: Symbol<'t>,
    pub init: Box<Located<Expr<'t>>>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Method<'t> {
    pub name: Symbol<'t>,
    pub formals: Vec<Located<Formal<'t>>>,
    pub return_type: Symbol<'t>,
    pub body: Box<Located<Expr<'t>>>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Formal<'t> {
    pub name: Symbol<'t>,
    pub ty: Symbol<'t>,
}

/// One `name : ty => body` arm of a `case` expression.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct CaseBranch<'t> {
    pub name: Symbol<'t>,
    pub ty: Symbol<'t>,
    pub body: Box<Located<Expr<'t>>>,
}

pub type ArgumentList<'t> = Vec<Located<Expr<'t>>>;

/// An expression is either one of
/// * `Assign`: `name <- value`
/// * `Dispatch`: `receiver.method(args)`; a dispatch without explicit
/// receiver has `self` as receiver
/// * `StaticDispatch`: `receiver@Type.method(args)`
/// * `Cond`: `if pred then .. else .. fi`
/// * `Loop`: `while pred loop body pool`
/// * `Case`: `case scrutinee of branches esac`
/// * `Block`: `{ e1; e2; ... }`, the value is that of the last expression
/// * `Let`: a single binding with optional initializer (`NoExpr` if absent);
/// multi-binding lets are nested
/// * `Binary`: one of the operations defined in `BinaryOp`
/// * `Neg`, `Not`: integer negation `~` and boolean `not`
/// * `IntConst`, `BoolConst`, `StringConst`: literals
/// * `New`: `new Type`
/// * `IsVoid`: `isvoid e`
/// * `NoExpr`: placeholder for an omitted optional expression
/// * `Object`: use of a variable, attribute or `self`
#[derive(EnumDiscriminants, Debug, PartialEq, Eq, Clone)]
#[strum_discriminants(derive(Display))]
pub enum Expr<'t> {
    Assign(Symbol<'t>, Box<Located<Expr<'t>>>),
    Dispatch {
        receiver: Box<Located<Expr<'t>>>,
        method: Symbol<'t>,
        args: ArgumentList<'t>,
    },
    StaticDispatch {
        receiver: Box<Located<Expr<'t>>>,
        type_name: Symbol<'t>,
        method: Symbol<'t>,
        args: ArgumentList<'t>,
    },
    Cond(
        Box<Located<Expr<'t>>>,
        Box<Located<Expr<'t>>>,
        Box<Located<Expr<'t>>>,
    ),
    Loop(Box<Located<Expr<'t>>>, Box<Located<Expr<'t>>>),
    Case(Box<Located<Expr<'t>>>, Vec<Located<CaseBranch<'t>>>),
    Block(Vec<Located<Expr<'t>>>),
    Let {
        name: Symbol<'t>,
        ty: Symbol<'t>,
        init: Box<Located<Expr<'t>>>,
        body: Box<Located<Expr<'t>>>,
    },
    Binary(
        BinaryOp,
        Box<Located<Expr<'t>>>,
        Box<Located<Expr<'t>>>,
    ),
    Neg(Box<Located<Expr<'t>>>),
    Not(Box<Located<Expr<'t>>>),
    IntConst(i64),
    BoolConst(bool),
    StringConst(Symbol<'t>),
    New(Symbol<'t>),
    IsVoid(Box<Located<Expr<'t>>>),
    NoExpr,
    Object(Symbol<'t>),
}

/// Arithmetic operations (`+`, `-`, `*`, `/`) and comparisons (`<`, `<=`,
/// `=`).
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum BinaryOp {
    Plus,
    Sub,
    Mul,
    Divide,
    Lt,
    Leq,
    Eq,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        use self::BinaryOp::*;
        match self {
            Plus | Sub | Mul | Divide => true,
            Lt | Leq | Eq => false,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use self::BinaryOp::*;
        let op = match self {
            Plus => "+",
            Sub => "-",
            Mul => "*",
            Divide => "/",
            Lt => "<",
            Leq => "<=",
            Eq => "=",
        };
        write!(f, "{}", op)
    }
}

impl<'t> Expr<'t> {
    /// The direct subexpressions of this node, in evaluation order.
    pub fn children(&self) -> Vec<&Located<Expr<'t>>> {
        use self::Expr::*;
        match self {
            Assign(_, value) => vec![&**value],
            Dispatch { receiver, args, .. } | StaticDispatch { receiver, args, .. } => {
                let mut children = vec![&**receiver];
                children.extend(args.iter());
                children
            }
            Cond(pred, then_arm, else_arm) => vec![&**pred, &**then_arm, &**else_arm],
            Loop(pred, body) => vec![&**pred, &**body],
            Case(scrutinee, branches) => {
                let mut children = vec![&**scrutinee];
                children.extend(branches.iter().map(|branch| &*branch.body));
                children
            }
            Block(exprs) => exprs.iter().collect(),
            Let { init, body, .. } => vec![&**init, &**body],
            Binary(_, lhs, rhs) => vec![&**lhs, &**rhs],
            Neg(operand) | Not(operand) | IsVoid(operand) => vec![&**operand],
            IntConst(_) | BoolConst(_) | StringConst(_) | New(_) | NoExpr | Object(_) => vec![],
        }
    }

    pub fn is_no_expr(&self) -> bool {
        match self {
            Expr::NoExpr => true,
            _ => false,
        }
    }
}

impl<'t> Located<Expr<'t>> {
    /// Visits this node and all its descendants in pre-order.
    pub fn walk<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a Located<Expr<'t>>),
    {
        f(self);
        for child in self.children() {
            child.walk(&mut *f);
        }
    }
}

impl<'t> Class<'t> {
    pub fn attributes(&self) -> impl Iterator<Item = (usize, &Attribute<'t>)> {
        self.features.iter().filter_map(|feature| match &feature.data {
            Feature::Attribute(attribute) => Some((feature.line, attribute)),
            Feature::Method(_) => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = (usize, &Method<'t>)> {
        self.features.iter().filter_map(|feature| match &feature.data {
            Feature::Method(method) => Some((feature.line, method)),
            Feature::Attribute(_) => None,
        })
    }
}
