//! Document persistence.
//!
//! Records live in named collections keyed by chat identifier. The
//! [`JsonStore`] keeps each collection in its own JSON file; the
//! [`MemoryCollection`] is used by tests.

mod collection;
mod json;
mod memory;

pub use collection::{Collection, Document, StoreError};
pub use json::{JsonCollection, JsonStore};
pub use memory::MemoryCollection;
