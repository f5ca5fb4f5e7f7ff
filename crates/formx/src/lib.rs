//! # formx
//!
//! A headless reactive computation engine for nested record data.
//!
//! A host hands formx a schema (fields, formulas, repeatable row-groups)
//! and a path-addressable store; formx compiles the formulas, wires a
//! dependency graph, and from then on keeps every derived field consistent
//! as values change. There is no UI layer and no I/O: the host owns the
//! store and subscribes to its change notifications.
//!
//! ## Example
//!
//! ```rust
//! use formx::prelude::*;
//! use std::rc::Rc;
//!
//! let schema = vec![
//!     FieldDef::new("price"),
//!     FieldDef::new("qty"),
//!     FieldDef::computed("total", "price * qty"),
//! ];
//! let store = Rc::new(MemoryStore::new(Value::record([
//!     ("price", Value::from(10.0)),
//!     ("qty", Value::from(2.0)),
//! ])));
//!
//! let engine = Engine::new(&schema, store).unwrap();
//! assert_eq!(engine.store().get("total"), Some(Value::from(20.0)));
//!
//! engine.set_value("price", 12.0);
//! assert_eq!(engine.store().get("total"), Some(Value::from(24.0)));
//! ```
//!
//! ## Guarantees
//!
//! - One store batch (one change notification) per external `set_value`.
//! - Unchanged values, within float tolerance, do not cascade.
//! - Runtime faults are contained: a broken formula is logged and its
//!   field keeps the prior value; sibling branches still run.
//! - Cascades are bounded by a depth ceiling shared with re-entrant calls
//!   from subscribers, so no input can run the engine away.

pub mod engine;
pub mod error;
pub mod prelude;

mod registry;

pub use engine::{Engine, CASCADE_DEPTH_LIMIT};
pub use error::{EngineError, EngineResult};

// Re-export the data model
pub use formx_core::{
    CoreError, CoreResult, FieldDef, Listener, MemoryStore, Path, RowGroup, Section, Segment,
    Store, Subscription, Value,
};

// Re-export the formula layer
pub use formx_formula::{
    compile, evaluate, referenced_variables, DependencyGraph, ExprError, ExprResult, Program,
    Scope,
};
