//! # Expression Trees
//!
//! This module defines the expression tree consumed by the canonicalization
//! engine. Trees are produced once by a query compiler and then only read.
//!
//! ## Architecture Overview
//!
//! - **[node]** - [`AstNode`], its [`NodeKind`] tag and identity types
//! - **[literal]** - literal payloads of value nodes and attribute keys
//! - **[operators]** - comparison and arithmetic operators
//! - **[builder]** - the [`Ast`] build handle that creates nodes and
//!   declares variables and functions
//!
//! ## Identity
//!
//! Variables and builtin functions are compared by identity, never by
//! name: two variables both called `doc` are different variables. The
//! [`Ast`] hands out an [`Identity`] per declaration and a [`NodeId`] per
//! node, both unique within one build.
//!
//! ## Example
//!
//! ```text
//! doc.items[0].price > 100
//! ```
//!
//! is built as
//!
//! ```
//! use clove_canon::{Ast, CmpOp};
//!
//! let mut ast = Ast::new();
//! let doc = ast.declare_variable("doc");
//!
//! let items = ast.attribute_access(ast.reference(&doc), "items");
//! let first = ast.indexed_access(items, ast.value(0));
//! let price = ast.attribute_access(first, "price");
//! let cond = ast.compare(CmpOp::Gt, price, ast.value(100));
//! assert_eq!(cond.num_members(), 2);
//! ```
pub mod builder;
pub mod literal;
pub mod node;
pub mod operators;

pub use builder::{Ast, Function, Variable};
pub use literal::Literal;
pub use node::{AstNode, Identity, NodeId, NodeKind};
pub use operators::{ArithOp, CmpOp};
