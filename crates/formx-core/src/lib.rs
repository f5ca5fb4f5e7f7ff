//! # formx-core
//!
//! Core data structures for the formx reactive computation engine.
//!
//! This crate provides the fundamental types used throughout formx:
//! - [`Value`] - Tagged values stored in the data tree (numbers, text,
//!   booleans, lists of row records, nested records)
//! - [`Path`] - Dot-delimited addresses into the data tree
//!   (rows addressed by numeric segments, e.g. `items.2.price`)
//! - [`FieldDef`] / [`RowGroup`] - Schema definitions, including repeatable
//!   row-groups
//! - [`Store`] - The path-addressable data store contract, plus
//!   [`MemoryStore`], a single-threaded copy-on-write reference store
//!
//! ## Example
//!
//! ```rust
//! use formx_core::{MemoryStore, Store, Value};
//!
//! let store = MemoryStore::new(Value::record([
//!     ("price", Value::from(10.0)),
//!     ("qty", Value::from(2.0)),
//! ]));
//!
//! store.set_value("price", Value::from(12.0));
//! assert_eq!(store.get("price"), Some(Value::from(12.0)));
//! ```

pub mod error;
pub mod path;
pub mod schema;
pub mod store;
pub mod value;

pub use error::{CoreError, CoreResult};
pub use path::{Path, Segment};
pub use schema::{FieldDef, RowGroup, Section};
pub use store::{resolve, Listener, MemoryStore, Store, Subscription};
pub use value::Value;
