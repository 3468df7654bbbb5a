//! Product storage boundary.
//!
//! This module defines the storage collaborator the unit of work commits
//! through, and the transaction-scoped session opened over it.

pub mod in_memory;
pub mod session;
pub mod r#trait;

pub use in_memory::InMemoryProductStore;
pub use r#trait::{ProductChange, ProductStore, StoreError, StoredProduct, WriteStamps};
pub use session::{Session, SessionFactory, StoreSession};
