//! Reads the syntax tree from its JSON serialization.
//!
//! Reading happens in two steps: `serde` deserializes the text into the
//! owned `Raw*` structures below, which are then lowered into a [`Program`]
//! whose names are interned in a [`StringTable`]. The interned symbols borrow
//! from the raw tree, so it has to outlive the lowered program.
//!
//! Every node may carry a `line`. A node without one gets the line of the
//! enclosing node.

use crate::{ast::*, Located};
use failure::{Error, Fail, ResultExt};
use serde_derive::Deserialize;
use std::io;
use strtab::{StringTable, Symbol};

#[derive(Debug, Deserialize)]
pub struct RawProgram {
    pub classes: Vec<RawClass>,
}

#[derive(Debug, Deserialize)]
pub struct RawClass {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub line: Option<usize>,
    #[serde(default)]
    pub features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawFeature {
    Attribute(RawAttribute),
    Method(RawMethod),
}

#[derive(Debug, Deserialize)]
pub struct RawAttribute {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub init: Option<RawExpr>,
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RawMethod {
    pub name: String,
    #[serde(default)]
    pub formals: Vec<RawFormal>,
    pub return_type: String,
    pub body: RawExpr,
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RawFormal {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct RawCaseBranch {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub body: RawExpr,
    #[serde(default)]
    pub line: Option<usize>,
}

/// An expression is a JSON object with exactly one key naming its kind,
/// plus an optional `line`.
#[derive(Debug, Deserialize)]
pub struct RawExpr {
    #[serde(default)]
    pub line: Option<usize>,
    #[serde(flatten)]
    pub kind: RawExprKind,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawExprKind {
    Int(i64),
    Bool(bool),
    String(String),
    Object(String),
    Assign {
        name: String,
        value: Box<RawExpr>,
    },
    /// Without `receiver` the method is dispatched on `self`.
    Dispatch {
        #[serde(default)]
        receiver: Option<Box<RawExpr>>,
        method: String,
        #[serde(default)]
        args: Vec<RawExpr>,
    },
    StaticDispatch {
        #[serde(default)]
        receiver: Option<Box<RawExpr>>,
        #[serde(rename = "type")]
        type_name: String,
        method: String,
        #[serde(default)]
        args: Vec<RawExpr>,
    },
    Cond {
        pred: Box<RawExpr>,
        then: Box<RawExpr>,
        #[serde(rename = "else")]
        otherwise: Box<RawExpr>,
    },
    Loop {
        pred: Box<RawExpr>,
        body: Box<RawExpr>,
    },
    Case {
        expr: Box<RawExpr>,
        branches: Vec<RawCaseBranch>,
    },
    Block(Vec<RawExpr>),
    Let {
        name: String,
        #[serde(rename = "type")]
        ty: String,
        #[serde(default)]
        init: Option<Box<RawExpr>>,
        body: Box<RawExpr>,
    },
    Plus(Box<RawExpr>, Box<RawExpr>),
    Sub(Box<RawExpr>, Box<RawExpr>),
    Mul(Box<RawExpr>, Box<RawExpr>),
    Divide(Box<RawExpr>, Box<RawExpr>),
    Lt(Box<RawExpr>, Box<RawExpr>),
    Leq(Box<RawExpr>, Box<RawExpr>),
    Eq(Box<RawExpr>, Box<RawExpr>),
    Neg(Box<RawExpr>),
    Not(Box<RawExpr>),
    New(String),
    #[serde(rename = "isvoid")]
    IsVoid(Box<RawExpr>),
    NoExpr,
}

/// A raw tree whose text nests deeper than the reader allows.
#[derive(Debug, Fail)]
#[fail(display = "syntax tree nests deeper than {} levels", limit)]
pub struct NestingTooDeep {
    pub limit: usize,
}

/// JSON levels an expression can add on top of its parent: a case branch
/// body sits in `{"case": {"branches": [{"body": ...}]}}`.
const JSON_LEVELS_PER_EXPR: usize = 4;
/// JSON levels between the document root and the body of a method.
const JSON_LEVELS_ABOVE_EXPR: usize = 8;

/// Maximum nesting of the JSON text such that every tree whose expressions
/// nest at most `max_expr_depth` levels is accepted.
pub fn json_nesting_limit(max_expr_depth: usize) -> usize {
    max_expr_depth
        .saturating_add(1)
        .saturating_mul(JSON_LEVELS_PER_EXPR)
        .saturating_add(JSON_LEVELS_ABOVE_EXPR)
}

pub fn read_program<R: io::Read>(
    mut reader: R,
    max_expr_depth: usize,
) -> Result<RawProgram, Error> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .context("cannot read syntax tree")?;
    parse_program(&text, max_expr_depth)
}

/// Deserializes `text`. Input that nests deeper than
/// [`json_nesting_limit`]`(max_expr_depth)` is rejected before it is
/// deserialized, anything below is read regardless of `serde_json`'s own
/// recursion limit.
pub fn parse_program(text: &str, max_expr_depth: usize) -> Result<RawProgram, Error> {
    let limit = json_nesting_limit(max_expr_depth);
    if nesting_depth(text) > limit {
        return Err(NestingTooDeep { limit }.context("malformed syntax tree").into());
    }

    let mut deserializer = serde_json::Deserializer::from_str(text);
    deserializer.disable_recursion_limit();
    let program: RawProgram = {
        let deserializer = serde_stacker::Deserializer::new(&mut deserializer);
        <RawProgram as serde::Deserialize>::deserialize(deserializer)
            .context("malformed syntax tree")?
    };
    deserializer.end().context("malformed syntax tree")?;
    Ok(program)
}

/// Deepest nesting of objects and arrays in `text`, brackets inside string
/// literals excluded.
fn nesting_depth(text: &str) -> usize {
    let (mut depth, mut max_depth) = (0usize, 0);
    let mut in_string = false;
    let mut escaped = false;
    for byte in text.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max_depth
}

/// Interns all names of `raw` and builds the tree the analysis works on.
/// Classes without a `filename` are attributed to `default_filename`.
pub fn lower<'f>(
    raw: &'f RawProgram,
    default_filename: &'f str,
    strtab: &mut StringTable<'f>,
) -> Program<'f> {
    let mut lowering = Lowering {
        object: strtab.intern("Object"),
        self_symbol: strtab.self_symbol(),
        default_filename: strtab.intern(default_filename),
        strtab,
    };
    let classes = raw
        .classes
        .iter()
        .map(|class| lowering.class(class))
        .collect::<Vec<_>>();
    log::debug!("lowered {} classes from the syntax tree", classes.len());
    Program { classes }
}

struct Lowering<'f, 's> {
    strtab: &'s mut StringTable<'f>,
    object: Symbol<'f>,
    self_symbol: Symbol<'f>,
    default_filename: Symbol<'f>,
}

/// Line of classes that do not state one.
const DEFAULT_CLASS_LINE: usize = 1;

/// Lowering recurses once per expression level. Below `STACK_RED_ZONE`
/// bytes of remaining stack a new segment of `STACK_GROWTH` bytes is used.
const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROWTH: usize = 1024 * 1024;

impl<'f, 's> Lowering<'f, 's> {
    fn sym(&mut self, s: &'f str) -> Symbol<'f> {
        self.strtab.intern(s)
    }

    fn class(&mut self, raw: &'f RawClass) -> Located<Class<'f>> {
        let line = raw.line.unwrap_or(DEFAULT_CLASS_LINE);
        let name = self.sym(&raw.name);
        let parent = match &raw.parent {
            Some(parent) => self.sym(parent),
            None => self.object,
        };
        let filename = match &raw.filename {
            Some(filename) => self.sym(filename),
            None => self.default_filename,
        };
        let features = raw
            .features
            .iter()
            .map(|feature| self.feature(feature, line))
            .collect();

        Located::new(
            line,
            Class {
                name,
                parent,
                filename,
                features,
            },
        )
    }

    fn feature(&mut self, raw: &'f RawFeature, outer_line: usize) -> Located<Feature<'f>> {
        match raw {
            RawFeature::Attribute(attribute) => {
                let line = attribute.line.unwrap_or(outer_line);
                let init = match &attribute.init {
                    Some(init) => self.expr(init, line),
                    None => Located::new(line, Expr::NoExpr),
                };
                Located::new(
                    line,
                    Feature::Attribute(Attribute {
                        name: self.sym(&attribute.name),
                        ty: self.sym(&attribute.ty),
                        init: Box::new(init),
                    }),
                )
            }
            RawFeature::Method(method) => {
                let line = method.line.unwrap_or(outer_line);
                let formals = method
                    .formals
                    .iter()
                    .map(|formal| {
                        Located::new(
                            formal.line.unwrap_or(line),
                            Formal {
                                name: self.sym(&formal.name),
                                ty: self.sym(&formal.ty),
                            },
                        )
                    })
                    .collect();
                Located::new(
                    line,
                    Feature::Method(Method {
                        name: self.sym(&method.name),
                        formals,
                        return_type: self.sym(&method.return_type),
                        body: Box::new(self.expr(&method.body, line)),
                    }),
                )
            }
        }
    }

    fn boxed(&mut self, raw: &'f RawExpr, outer_line: usize) -> Box<Located<Expr<'f>>> {
        Box::new(self.expr(raw, outer_line))
    }

    fn optional(
        &mut self,
        raw: &'f Option<Box<RawExpr>>,
        outer_line: usize,
    ) -> Box<Located<Expr<'f>>> {
        match raw {
            Some(raw) => self.boxed(raw, outer_line),
            None => Box::new(Located::new(outer_line, Expr::NoExpr)),
        }
    }

    fn receiver(
        &mut self,
        raw: &'f Option<Box<RawExpr>>,
        outer_line: usize,
    ) -> Box<Located<Expr<'f>>> {
        match raw {
            Some(raw) => self.boxed(raw, outer_line),
            None => Box::new(Located::new(outer_line, Expr::Object(self.self_symbol))),
        }
    }

    fn args(&mut self, raw: &'f [RawExpr], outer_line: usize) -> ArgumentList<'f> {
        raw.iter().map(|arg| self.expr(arg, outer_line)).collect()
    }

    fn binary(
        &mut self,
        op: BinaryOp,
        lhs: &'f RawExpr,
        rhs: &'f RawExpr,
        line: usize,
    ) -> Expr<'f> {
        Expr::Binary(op, self.boxed(lhs, line), self.boxed(rhs, line))
    }

    fn expr(&mut self, raw: &'f RawExpr, outer_line: usize) -> Located<Expr<'f>> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || self.lower_expr(raw, outer_line))
    }

    fn lower_expr(&mut self, raw: &'f RawExpr, outer_line: usize) -> Located<Expr<'f>> {
        use self::RawExprKind as R;

        let line = raw.line.unwrap_or(outer_line);
        let expr = match &raw.kind {
            R::Int(value) => Expr::IntConst(*value),
            R::Bool(value) => Expr::BoolConst(*value),
            R::String(value) => Expr::StringConst(self.sym(value)),
            R::Object(name) => Expr::Object(self.sym(name)),
            R::Assign { name, value } => Expr::Assign(self.sym(name), self.boxed(value, line)),
            R::Dispatch {
                receiver,
                method,
                args,
            } => Expr::Dispatch {
                receiver: self.receiver(receiver, line),
                method: self.sym(method),
                args: self.args(args, line),
            },
            R::StaticDispatch {
                receiver,
                type_name,
                method,
                args,
            } => Expr::StaticDispatch {
                receiver: self.receiver(receiver, line),
                type_name: self.sym(type_name),
                method: self.sym(method),
                args: self.args(args, line),
            },
            R::Cond {
                pred,
                then,
                otherwise,
            } => Expr::Cond(
                self.boxed(pred, line),
                self.boxed(then, line),
                self.boxed(otherwise, line),
            ),
            R::Loop { pred, body } => Expr::Loop(self.boxed(pred, line), self.boxed(body, line)),
            R::Case { expr, branches } => {
                let scrutinee = self.boxed(expr, line);
                let branches = branches
                    .iter()
                    .map(|branch| {
                        let branch_line = branch.line.unwrap_or(line);
                        Located::new(
                            branch_line,
                            CaseBranch {
                                name: self.sym(&branch.name),
                                ty: self.sym(&branch.ty),
                                body: self.boxed(&branch.body, branch_line),
                            },
                        )
                    })
                    .collect();
                Expr::Case(scrutinee, branches)
            }
            R::Block(exprs) => Expr::Block(self.args(exprs, line)),
            R::Let {
                name,
                ty,
                init,
                body,
            } => Expr::Let {
                name: self.sym(name),
                ty: self.sym(ty),
                init: self.optional(init, line),
                body: self.boxed(body, line),
            },
            R::Plus(lhs, rhs) => self.binary(BinaryOp::Plus, lhs, rhs, line),
            R::Sub(lhs, rhs) => self.binary(BinaryOp::Sub, lhs, rhs, line),
            R::Mul(lhs, rhs) => self.binary(BinaryOp::Mul, lhs, rhs, line),
            R::Divide(lhs, rhs) => self.binary(BinaryOp::Divide, lhs, rhs, line),
            R::Lt(lhs, rhs) => self.binary(BinaryOp::Lt, lhs, rhs, line),
            R::Leq(lhs, rhs) => self.binary(BinaryOp::Leq, lhs, rhs, line),
            R::Eq(lhs, rhs) => self.binary(BinaryOp::Eq, lhs, rhs, line),
            R::Neg(operand) => Expr::Neg(self.boxed(operand, line)),
            R::Not(operand) => Expr::Not(self.boxed(operand, line)),
            R::New(ty) => Expr::New(self.sym(ty)),
            R::IsVoid(operand) => Expr::IsVoid(self.boxed(operand, line)),
            R::NoExpr => Expr::NoExpr,
        };
        Located::new(line, expr)
    }
}
