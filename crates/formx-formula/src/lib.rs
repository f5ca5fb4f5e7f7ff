//! # formx-formula
//!
//! Formula compiler and evaluator for formx.
//!
//! This crate provides:
//! - Tokenizing formula text (`a + b * 2`, `IF(score >= 90, "A", "B")`)
//! - Compiling token streams to postfix programs via shunting-yard
//! - Evaluating postfix programs on a stack machine against a flat
//!   key-to-value scope
//! - The fixed builtin function table (MAX, MIN, POW, ROUND, FLOOR, CEIL,
//!   ABS, SQRT, IF)
//! - A dependency graph over field keys with static cycle detection
//!
//! ## Example
//!
//! ```rust
//! use formx_formula::{compile, evaluate};
//! use formx_core::Value;
//! use std::collections::BTreeMap;
//!
//! let program = compile("a + b * 2").unwrap();
//! let mut scope = BTreeMap::new();
//! scope.insert("a".to_string(), Value::from(1.0));
//! scope.insert("b".to_string(), Value::from(3.0));
//! assert_eq!(evaluate(&program, &scope).unwrap(), Value::from(7.0));
//! ```

pub mod compiler;
pub mod dependency;
pub mod error;
pub mod eval;
pub mod functions;
pub mod token;

pub use compiler::{compile, referenced_variables, Program};
pub use dependency::{DependencyGraph, NodeId};
pub use error::{ExprError, ExprResult};
pub use eval::{evaluate, Scope};
pub use token::{tokenize, Op, Token};
