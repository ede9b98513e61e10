use failure::Fail;
use std::fmt;

/// Violations of the class hierarchy. The first one found stops the
/// analysis.
#[derive(Debug, Fail, PartialEq, Eq)]
pub enum HierarchyError {
    #[fail(display = "redefinition of basic class {}.", name)]
    BasicClassRedefined { name: String },
    #[fail(display = "redefinition of class {}.", name)]
    ClassRedefined { name: String },
    #[fail(display = "class Main is not defined.")]
    MainNotDefined,
    #[fail(display = "class {} cannot inherit class {}.", class, parent)]
    InheritsFromSealedClass { class: String, parent: String },
    #[fail(
        display = "class {} inherits from an undefined class {}.",
        class, parent
    )]
    UndefinedParent { class: String, parent: String },
    #[fail(
        display = "class {}, or an ancestor of {}, is involved in an inheritance cycle.",
        class, class
    )]
    InheritanceCycle { class: String },
}

/// Type errors. They are collected and do not stop the checker.
#[derive(Debug, Fail)]
pub enum SemanticError {
    #[fail(display = "Undeclared identifier {}.{}", name, hint)]
    UndeclaredIdentifier { name: String, hint: DidYouMean },
    #[fail(display = "Cannot assign to 'self'.")]
    AssignToSelf,
    #[fail(display = "Assignment to undeclared variable {}.{}", name, hint)]
    AssignToUndeclared { name: String, hint: DidYouMean },
    #[fail(
        display = "Type {} of assigned expression does not conform to declared type {} of identifier {}.",
        actual, declared, name
    )]
    AssignMismatch {
        name: String,
        actual: String,
        declared: String,
    },

    #[fail(display = "Dispatch to undefined method {}.", method)]
    UndefinedMethod { method: String },
    #[fail(
        display = "Method {} called with wrong number of arguments (expected {}, got {}).",
        method, expected, actual
    )]
    WrongArity {
        method: String,
        expected: usize,
        actual: usize,
    },
    #[fail(
        display = "In call of method {}, type {} of parameter {} does not conform to declared type {}.",
        method, actual, param, declared
    )]
    ArgumentMismatch {
        method: String,
        param: String,
        actual: String,
        declared: String,
    },
    #[fail(display = "Static dispatch to SELF_TYPE.")]
    StaticDispatchToSelfType,
    #[fail(display = "Static dispatch to undefined class {}.", class)]
    StaticDispatchToUndefinedClass { class: String },
    #[fail(
        display = "Expression type {} does not conform to declared static dispatch type {}.",
        actual, declared
    )]
    StaticDispatchMismatch { actual: String, declared: String },

    #[fail(display = "Predicate of 'if' does not have type Bool.")]
    IfPredicateNotBool,
    #[fail(display = "Loop condition does not have type Bool.")]
    LoopConditionNotBool,

    #[fail(display = "Duplicate branch {} in case statement.", ty)]
    DuplicateCaseBranch { ty: String },
    #[fail(
        display = "Identifier {} declared with type SELF_TYPE in case branch.",
        name
    )]
    SelfTypeCaseBranch { name: String },
    #[fail(display = "Class {} of case branch is undefined.", ty)]
    UndefinedCaseBranchType { ty: String },
    #[fail(display = "'self' bound in 'case'.")]
    SelfInCase,

    #[fail(display = "'self' cannot be bound in a 'let' expression.")]
    SelfInLet,
    #[fail(
        display = "Class {} of let-bound identifier {} is undefined.",
        ty, name
    )]
    UndefinedLetType { name: String, ty: String },
    #[fail(
        display = "Inferred type {} of initialization of {} does not conform to identifier's declared type {}.",
        actual, name, declared
    )]
    LetInitMismatch {
        name: String,
        actual: String,
        declared: String,
    },

    #[fail(display = "non-Int arguments: {} {} {}", lhs, op, rhs)]
    NonIntArguments { lhs: String, op: String, rhs: String },
    #[fail(display = "Illegal comparison with a basic type.")]
    IllegalComparison,
    #[fail(display = "Argument of '~' has type {} instead of Int.", ty)]
    NegNotInt { ty: String },
    #[fail(display = "Argument of 'not' has type {} instead of Bool.", ty)]
    NotNotBool { ty: String },
    #[fail(display = "'new' used with undefined class {}.", ty)]
    NewUndefinedClass { ty: String },

    #[fail(
        display = "attribute {} is already defined in the same class or a superclass.",
        name
    )]
    AttributeRedefined { name: String },
    #[fail(display = "'self' cannot be the name of an attribute.")]
    SelfAttribute,
    #[fail(display = "Class {} of attribute {} is undefined.", ty, name)]
    UndefinedAttributeType { name: String, ty: String },
    #[fail(
        display = "Inferred type {} of initialization of attribute {} does not conform to declared type {}.",
        actual, name, declared
    )]
    AttributeInitMismatch {
        name: String,
        actual: String,
        declared: String,
    },

    #[fail(display = "Method {} is multiply defined.", name)]
    MethodRedefined { name: String },
    #[fail(display = "Formal parameter {} is multiply defined.", name)]
    DuplicateFormal { name: String },
    #[fail(display = "'self' cannot be the name of a formal parameter.")]
    SelfFormal,
    #[fail(
        display = "Formal parameter {} cannot have type SELF_TYPE.",
        name
    )]
    SelfTypeFormal { name: String },
    #[fail(
        display = "Class {} of formal parameter {} is undefined.",
        ty, name
    )]
    UndefinedFormalType { name: String, ty: String },
    #[fail(
        display = "Undefined return type {} in method {}.",
        ty, method
    )]
    UndefinedReturnType { method: String, ty: String },
    #[fail(
        display = "Inferred return type {} of method {} does not conform to declared return type {}.",
        actual, method, declared
    )]
    ReturnTypeMismatch {
        method: String,
        actual: String,
        declared: String,
    },

    #[fail(
        display = "expression nesting exceeds the limit of {} levels.",
        limit
    )]
    NestingTooDeep { limit: usize },
}

/// Optional suggestion appended to a message about an unknown name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DidYouMean(pub Option<String>);

impl fmt::Display for DidYouMean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(candidate) => write!(f, " Did you mean '{}'?", candidate),
            None => Ok(()),
        }
    }
}
