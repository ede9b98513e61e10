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

//! The class/expression tree the semantic analysis works on.
//!
//! The tree is produced by an external parser and handed to us as JSON, see
//! [`json`]. All names in the tree are interned [`Symbol`]s.

#[macro_use]
extern crate derive_more;

mod ast;
pub mod json;
mod located;

pub use self::{ast::*, located::Located};
pub use strtab::Symbol;
