use crate::{
    method_body_type_checker::MethodBodyTypeChecker, method_environment::MethodEnvironment,
    type_analysis::TypeAnalysis, type_system::TypeSystem, well_known::WellKnownSymbols,
};
use compiler_shared::{timed_scope, Context};
use diagnostics::MessageLevel;
use failure::Fail;

/// Knobs of the type checker.
#[derive(Debug, Clone)]
pub struct CheckerOptions {
    /// Expressions nested deeper than this are reported instead of checked.
    pub max_nesting_depth: usize,
}

impl Default for CheckerOptions {
    fn default() -> Self {
        CheckerOptions {
            max_nesting_depth: 1000,
        }
    }
}

/// Everything the analysis found out about a program.
#[derive(Debug)]
pub struct Analysis<'src, 'ast> {
    pub type_system: TypeSystem<'src>,
    pub methods: MethodEnvironment<'src>,
    pub types: TypeAnalysis<'src, 'ast>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Phase {
    #[display(fmt = "hierarchy validation")]
    Hierarchy,
    #[display(fmt = "type checking")]
    TypeChecking,
}

/// The analysis stopped. The messages themselves were reported to the
/// diagnostics of the context.
#[derive(Debug, Fail)]
#[fail(display = "{} failed with {} error(s)", phase, errors)]
pub struct SemanticHalt {
    pub phase: Phase,
    pub errors: usize,
}

/// Validates the class hierarchy and, if it is sound, type checks every
/// class.
///
/// Only a hierarchy violation makes this return `Err`. Type errors are
/// reported to `context` and the (partial) analysis is returned anyway, use
/// [`check`] to treat them as failure.
pub fn analyze<'src, 'ast>(
    program: &'ast ast::Program<'src>,
    symbols: WellKnownSymbols<'src>,
    context: &Context,
    options: &CheckerOptions,
) -> Result<Analysis<'src, 'ast>, SemanticHalt> {
    let type_system = {
        timed_scope!("hierarchy");
        match TypeSystem::build(program, symbols) {
            Ok(type_system) => type_system,
            Err(error) => {
                log::debug!("hierarchy validation failed: {}", error.data());
                context.diagnostics.emit(MessageLevel::Error, error);
                return Err(SemanticHalt {
                    phase: Phase::Hierarchy,
                    errors: 1,
                });
            }
        }
    };

    timed_scope!("typecheck");
    let methods = MethodEnvironment::build(&type_system, &context.diagnostics);
    let mut types = TypeAnalysis::new();
    for class in &program.classes {
        MethodBodyTypeChecker::check_class(
            class,
            &type_system,
            &methods,
            &mut types,
            context,
            options,
        );
    }
    log::debug!(
        "annotated {} expressions, {} error(s)",
        types.len(),
        context.diagnostics.count(MessageLevel::Error)
    );

    Ok(Analysis {
        type_system,
        methods,
        types,
    })
}

/// Like [`analyze`], but any reported error is a failure.
pub fn check<'src, 'ast>(
    program: &'ast ast::Program<'src>,
    symbols: WellKnownSymbols<'src>,
    context: &Context,
    options: &CheckerOptions,
) -> Result<Analysis<'src, 'ast>, SemanticHalt> {
    let analysis = analyze(program, symbols, context, options)?;
    if context.diagnostics.errored() {
        return Err(SemanticHalt {
            phase: Phase::TypeChecking,
            errors: context.diagnostics.count(MessageLevel::Error),
        });
    }
    Ok(analysis)
}
