//! Convenient re-exports for typical engine usage
//!
//! ```rust
//! use formx::prelude::*;
//! ```

pub use crate::engine::Engine;
pub use crate::error::{EngineError, EngineResult};
pub use formx_core::{FieldDef, MemoryStore, Path, RowGroup, Section, Store, Value};
