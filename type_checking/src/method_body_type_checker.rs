use crate::{
    checker::CheckerOptions,
    method_environment::MethodEnvironment,
    object_environment::ObjectEnvironment,
    semantic_error::{DidYouMean, SemanticError},
    type_analysis::TypeAnalysis,
    type_system::*,
    well_known::WellKnownSymbols,
};
use ast::{BinaryOp, Expr, Located};
use compiler_shared::Context;
use diagnostics::Location;
use std::{collections::HashSet, rc::Rc};
use strtab::Symbol;

/// `infer` and `type_expr` take several kilobytes of stack per nesting
/// level. Below `STACK_RED_ZONE` bytes of remaining stack the recursion
/// continues on a fresh segment of `STACK_GROWTH` bytes.
const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROWTH: usize = 2 * 1024 * 1024;

/// Checks the features of one class and records the type of every
/// expression it visits. Errors are reported to the context and checking
/// continues with the fallback type of the offending node.
pub struct MethodBodyTypeChecker<'ctx, 'src, 'ast, 'ana> {
    context: &'ctx Context,
    type_system: &'ctx TypeSystem<'src>,
    methods: &'ctx MethodEnvironment<'src>,
    options: &'ctx CheckerOptions,
    type_analysis: &'ana mut TypeAnalysis<'src, 'ast>,
    current_class: Rc<ClassDef<'src>>,
    env: ObjectEnvironment<'src>,
    symbols: WellKnownSymbols<'src>,
    depth: usize,
}

impl<'ctx, 'src, 'ast, 'ana> MethodBodyTypeChecker<'ctx, 'src, 'ast, 'ana> {
    pub fn check_class(
        class: &'ast Located<ast::Class<'src>>,
        type_system: &'ctx TypeSystem<'src>,
        methods: &'ctx MethodEnvironment<'src>,
        type_analysis: &'ana mut TypeAnalysis<'src, 'ast>,
        context: &'ctx Context,
        options: &'ctx CheckerOptions,
    ) {
        let current_class = type_system
            .lookup_class(class.name)
            .expect("every class was registered by the hierarchy pass");
        let env = ObjectEnvironment::for_class(type_system, &current_class, &context.diagnostics);

        let mut checker = MethodBodyTypeChecker {
            context,
            type_system,
            methods,
            options,
            type_analysis,
            current_class,
            env,
            symbols: *type_system.symbols(),
            depth: 0,
        };

        for feature in &class.features {
            match &feature.data {
                ast::Feature::Attribute(attribute) => {
                    checker.check_attribute(feature.line, attribute)
                }
                ast::Feature::Method(method) => checker.check_method(feature.line, method),
            }
        }
    }

    fn check_attribute(&mut self, line: usize, attribute: &'ast ast::Attribute<'src>) {
        log::trace!("checking attribute {}.{}", self.current_class.name, attribute.name);

        if attribute.name == self.symbols.self_ {
            self.report(line, SemanticError::SelfAttribute);
        }
        if !self.is_declarable(attribute.ty) {
            self.report(
                line,
                SemanticError::UndefinedAttributeType {
                    name: attribute.name.to_string(),
                    ty: attribute.ty.to_string(),
                },
            );
        }

        let init_ty = self.type_expr(&attribute.init);
        if !attribute.init.is_no_expr() && !self.conforms(init_ty, attribute.ty) {
            self.report(
                attribute.init.line,
                SemanticError::AttributeInitMismatch {
                    name: attribute.name.to_string(),
                    actual: init_ty.to_string(),
                    declared: attribute.ty.to_string(),
                },
            );
        }
    }

    fn check_method(&mut self, line: usize, method: &'ast ast::Method<'src>) {
        log::trace!("checking method {}.{}", self.current_class.name, method.name);

        self.in_scope(|checker| {
            for formal in &method.formals {
                checker.bind_formal(formal);
            }

            if !checker.is_declarable(method.return_type) {
                checker.report(
                    line,
                    SemanticError::UndefinedReturnType {
                        method: method.name.to_string(),
                        ty: method.return_type.to_string(),
                    },
                );
            }

            let body_ty = checker.type_expr(&method.body);
            if !checker.conforms(body_ty, method.return_type) {
                checker.report(
                    method.body.line,
                    SemanticError::ReturnTypeMismatch {
                        method: method.name.to_string(),
                        actual: body_ty.to_string(),
                        declared: method.return_type.to_string(),
                    },
                );
            }
        });
    }

    fn bind_formal(&mut self, formal: &Located<ast::Formal<'src>>) {
        let name = formal.name.to_string();

        if formal.name == self.symbols.self_ {
            self.report(formal.line, SemanticError::SelfFormal);
            return;
        }
        if formal.ty == self.symbols.self_type {
            self.report(formal.line, SemanticError::SelfTypeFormal { name: name.clone() });
        } else if !self.type_system.is_defined(formal.ty) {
            self.report(
                formal.line,
                SemanticError::UndefinedFormalType {
                    name: name.clone(),
                    ty: formal.ty.to_string(),
                },
            );
        }

        if self.env.is_bound_in_current_scope(formal.name) {
            self.report(formal.line, SemanticError::DuplicateFormal { name });
            return;
        }
        self.env.bind(formal.name, formal.ty);
    }

    /// Infers the type of `expr`, records it and returns it.
    fn type_expr(&mut self, expr: &'ast Located<Expr<'src>>) -> Symbol<'src> {
        if self.depth >= self.options.max_nesting_depth {
            self.report(
                expr.line,
                SemanticError::NestingTooDeep {
                    limit: self.options.max_nesting_depth,
                },
            );
            let ty = self.symbols.object;
            self.type_analysis.set_expr_type(expr, ty);
            return ty;
        }

        self.depth += 1;
        let ty = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || self.infer(expr));
        self.depth -= 1;

        self.type_analysis.set_expr_type(expr, ty);
        ty
    }

    fn infer(&mut self, expr: &'ast Located<Expr<'src>>) -> Symbol<'src> {
        use self::Expr::*;
        let symbols = self.symbols;
        let line = expr.line;

        match &expr.data {
            Object(name) => match self.env.lookup(*name) {
                Some(ty) => ty,
                None => {
                    let hint = self.did_you_mean(*name);
                    self.report(
                        line,
                        SemanticError::UndeclaredIdentifier {
                            name: name.to_string(),
                            hint,
                        },
                    );
                    symbols.object
                }
            },
            Assign(name, value) => {
                let value_ty = self.type_expr(value);
                if *name == symbols.self_ {
                    self.report(line, SemanticError::AssignToSelf);
                    return symbols.object;
                }
                match self.env.lookup(*name) {
                    None => {
                        let hint = self.did_you_mean(*name);
                        self.report(
                            line,
                            SemanticError::AssignToUndeclared {
                                name: name.to_string(),
                                hint,
                            },
                        );
                        symbols.object
                    }
                    Some(declared) if !self.conforms(value_ty, declared) => {
                        self.report(
                            line,
                            SemanticError::AssignMismatch {
                                name: name.to_string(),
                                actual: value_ty.to_string(),
                                declared: declared.to_string(),
                            },
                        );
                        symbols.object
                    }
                    Some(_) => value_ty,
                }
            }
            Dispatch {
                receiver,
                method,
                args,
            } => {
                let receiver_ty = self.type_expr(receiver);
                let arg_tys = self.type_args(args);

                let lookup_class = self.resolve_self_type(receiver_ty);
                if !self.type_system.is_defined(lookup_class) {
                    // reported where the unknown type was introduced
                    return symbols.object;
                }
                self.check_call(line, lookup_class, *method, receiver_ty, &arg_tys)
            }
            StaticDispatch {
                receiver,
                type_name,
                method,
                args,
            } => {
                let receiver_ty = self.type_expr(receiver);
                let arg_tys = self.type_args(args);

                if *type_name == symbols.self_type {
                    self.report(line, SemanticError::StaticDispatchToSelfType);
                    return symbols.object;
                }
                if !self.type_system.is_defined(*type_name) {
                    self.report(
                        line,
                        SemanticError::StaticDispatchToUndefinedClass {
                            class: type_name.to_string(),
                        },
                    );
                    return symbols.object;
                }
                if !self.conforms(receiver_ty, *type_name) {
                    self.report(
                        line,
                        SemanticError::StaticDispatchMismatch {
                            actual: receiver_ty.to_string(),
                            declared: type_name.to_string(),
                        },
                    );
                }
                self.check_call(line, *type_name, *method, receiver_ty, &arg_tys)
            }
            Cond(pred, then_arm, else_arm) => {
                let pred_ty = self.type_expr(pred);
                if pred_ty != symbols.bool {
                    self.report(line, SemanticError::IfPredicateNotBool);
                }
                let then_ty = self.type_expr(then_arm);
                let else_ty = self.type_expr(else_arm);
                self.join(then_ty, else_ty)
            }
            Loop(pred, body) => {
                let pred_ty = self.type_expr(pred);
                if pred_ty != symbols.bool {
                    self.report(line, SemanticError::LoopConditionNotBool);
                }
                self.type_expr(body);
                symbols.object
            }
            Case(scrutinee, branches) => {
                self.type_expr(scrutinee);

                let mut seen = HashSet::new();
                let mut result: Option<Symbol<'src>> = None;
                for branch in branches {
                    if !seen.insert(branch.ty) {
                        self.report(
                            branch.line,
                            SemanticError::DuplicateCaseBranch {
                                ty: branch.ty.to_string(),
                            },
                        );
                    }
                    let branch_ty = self.in_scope(|checker| checker.check_case_branch(branch));
                    result = Some(match result {
                        Some(ty) => self.join(ty, branch_ty),
                        None => branch_ty,
                    });
                }
                result.unwrap_or(symbols.object)
            }
            Block(exprs) => exprs
                .iter()
                .map(|expr| self.type_expr(expr))
                .last()
                .unwrap_or(symbols.object),
            Let {
                name,
                ty,
                init,
                body,
            } => {
                // the initializer does not see the new binding
                let init_ty = self.type_expr(init);

                if *name == symbols.self_ {
                    self.report(line, SemanticError::SelfInLet);
                }
                if !self.is_declarable(*ty) {
                    self.report(
                        line,
                        SemanticError::UndefinedLetType {
                            name: name.to_string(),
                            ty: ty.to_string(),
                        },
                    );
                }
                if !init.is_no_expr() && !self.conforms(init_ty, *ty) {
                    self.report(
                        line,
                        SemanticError::LetInitMismatch {
                            name: name.to_string(),
                            actual: init_ty.to_string(),
                            declared: ty.to_string(),
                        },
                    );
                }

                self.in_scope(|checker| {
                    if *name != symbols.self_ {
                        checker.env.bind(*name, *ty);
                    }
                    checker.type_expr(body)
                })
            }
            Binary(op, lhs, rhs) => {
                let lhs_ty = self.type_expr(lhs);
                let rhs_ty = self.type_expr(rhs);
                self.check_binary(line, *op, lhs_ty, rhs_ty)
            }
            Neg(operand) => {
                let ty = self.type_expr(operand);
                if ty != symbols.int {
                    self.report(line, SemanticError::NegNotInt { ty: ty.to_string() });
                }
                symbols.int
            }
            Not(operand) => {
                let ty = self.type_expr(operand);
                if ty != symbols.bool {
                    self.report(line, SemanticError::NotNotBool { ty: ty.to_string() });
                }
                symbols.bool
            }
            IntConst(_) => symbols.int,
            BoolConst(_) => symbols.bool,
            StringConst(_) => symbols.string,
            New(ty) => {
                if *ty == symbols.self_type || self.type_system.is_defined(*ty) {
                    *ty
                } else {
                    self.report(line, SemanticError::NewUndefinedClass { ty: ty.to_string() });
                    symbols.object
                }
            }
            IsVoid(operand) => {
                self.type_expr(operand);
                symbols.bool
            }
            NoExpr => symbols.no_type,
        }
    }

    fn type_args(&mut self, args: &'ast [Located<Expr<'src>>]) -> Vec<Symbol<'src>> {
        args.iter().map(|arg| self.type_expr(arg)).collect()
    }

    /// Resolves `method` starting at `lookup_class` and checks the
    /// arguments against its formals. A `SELF_TYPE` result stands for the
    /// type of the receiver.
    fn check_call(
        &mut self,
        line: usize,
        lookup_class: Symbol<'src>,
        method: Symbol<'src>,
        receiver_ty: Symbol<'src>,
        arg_tys: &[Symbol<'src>],
    ) -> Symbol<'src> {
        let method_def = match self
            .methods
            .resolve_method(self.type_system, lookup_class, method)
        {
            Some(method_def) => method_def,
            None => {
                self.report(
                    line,
                    SemanticError::UndefinedMethod {
                        method: method.to_string(),
                    },
                );
                return self.symbols.object;
            }
        };

        if method_def.params.len() != arg_tys.len() {
            self.report(
                line,
                SemanticError::WrongArity {
                    method: method.to_string(),
                    expected: method_def.params.len(),
                    actual: arg_tys.len(),
                },
            );
        } else {
            for (param, &arg_ty) in method_def.params.iter().zip(arg_tys) {
                if !self.conforms(arg_ty, param.ty) {
                    self.report(
                        line,
                        SemanticError::ArgumentMismatch {
                            method: method.to_string(),
                            param: param.name.to_string(),
                            actual: arg_ty.to_string(),
                            declared: param.ty.to_string(),
                        },
                    );
                }
            }
        }

        if method_def.return_ty == self.symbols.self_type {
            receiver_ty
        } else {
            method_def.return_ty
        }
    }

    fn check_case_branch(
        &mut self,
        branch: &'ast Located<ast::CaseBranch<'src>>,
    ) -> Symbol<'src> {
        let symbols = self.symbols;

        if branch.name == symbols.self_ {
            self.report(branch.line, SemanticError::SelfInCase);
        }
        if branch.ty == symbols.self_type {
            self.report(
                branch.line,
                SemanticError::SelfTypeCaseBranch {
                    name: branch.name.to_string(),
                },
            );
        } else if !self.type_system.is_defined(branch.ty) {
            self.report(
                branch.line,
                SemanticError::UndefinedCaseBranchType {
                    ty: branch.ty.to_string(),
                },
            );
        }

        if branch.name != symbols.self_ {
            self.env.bind(branch.name, branch.ty);
        }
        self.type_expr(&branch.body)
    }

    fn check_binary(
        &mut self,
        line: usize,
        op: BinaryOp,
        lhs_ty: Symbol<'src>,
        rhs_ty: Symbol<'src>,
    ) -> Symbol<'src> {
        let symbols = self.symbols;
        let both_int = lhs_ty == symbols.int && rhs_ty == symbols.int;

        match op {
            BinaryOp::Eq => {
                let involves_basic =
                    symbols.is_basic_value_type(lhs_ty) || symbols.is_basic_value_type(rhs_ty);
                if involves_basic && lhs_ty != rhs_ty {
                    self.report(line, SemanticError::IllegalComparison);
                }
                symbols.bool
            }
            _ if both_int => {
                if op.is_arithmetic() {
                    symbols.int
                } else {
                    symbols.bool
                }
            }
            _ => {
                self.report(
                    line,
                    SemanticError::NonIntArguments {
                        lhs: lhs_ty.to_string(),
                        op: op.to_string(),
                        rhs: rhs_ty.to_string(),
                    },
                );
                if op.is_arithmetic() {
                    symbols.object
                } else {
                    symbols.bool
                }
            }
        }
    }

    /// Runs `f` in a fresh scope of the object environment.
    fn in_scope<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.env.enter_scope();
        let res = f(self);
        self.env.leave_scope();
        res
    }

    fn resolve_self_type(&self, ty: Symbol<'src>) -> Symbol<'src> {
        if ty == self.symbols.self_type {
            self.current_class.name
        } else {
            ty
        }
    }

    /// Types that do not name a registered class were already reported
    /// where they were declared and conform to everything.
    fn conforms(&self, sub: Symbol<'src>, sup: Symbol<'src>) -> bool {
        if !self.is_declarable(sub) || !self.is_declarable(sup) {
            return true;
        }
        self.type_system.is_subclass(sub, sup, self.current_class.name)
    }

    fn join(&self, a: Symbol<'src>, b: Symbol<'src>) -> Symbol<'src> {
        if a == b {
            return a;
        }
        self.type_system.join(a, b, self.current_class.name)
    }

    /// Whether `ty` may appear as the declared type of an attribute, a let
    /// binding or a method result.
    fn is_declarable(&self, ty: Symbol<'src>) -> bool {
        ty == self.symbols.self_type || self.type_system.is_defined(ty)
    }

    fn did_you_mean(&self, name: Symbol<'src>) -> DidYouMean {
        let candidate = strtab::most_related(name, self.env.visible_symbols());
        DidYouMean(candidate.map(|candidate| candidate.to_string()))
    }

    fn report(&self, line: usize, error: SemanticError) {
        let location = Location::new(self.current_class.filename.as_str(), line);
        self.context.diagnostics.error_at(location, error);
    }
}
