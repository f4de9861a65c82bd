//! The middle gives the syntax tree meaning. The builder turns the CST into an
//! AST [`ast::Document`], and validation attaches a type and fixed state to
//! every node while collecting incidents along the way.

pub mod ast;
pub mod attribute;
pub mod builder;
pub mod builtins;
pub mod constant;
pub mod primitive;
pub mod trace;
pub mod ty;
pub mod validate;
