#![warn(
    clippy::print_stdout,
    clippy::unimplemented,
    clippy::doc_markdown,
    clippy::items_after_statements,
    clippy::match_same_arms,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::use_self,
    clippy::use_debug
)]

//! Semantic analysis: validates the class hierarchy, builds the method and
//! object environments and infers a static type for every expression.

#[macro_use]
extern crate derive_more;

mod builtin_types;
pub mod checker;
mod method_body_type_checker;
pub mod method_environment;
pub mod object_environment;
pub mod semantic_error;
pub mod type_analysis;
pub mod type_system;
pub mod well_known;

pub use self::{
    checker::{analyze, check, Analysis, CheckerOptions, Phase, SemanticHalt},
    semantic_error::{HierarchyError, SemanticError},
    type_analysis::TypeAnalysis,
    type_system::TypeSystem,
    well_known::WellKnownSymbols,
};
