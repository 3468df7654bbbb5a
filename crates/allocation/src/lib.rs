//! Allocation domain module.
//!
//! This crate contains the business rules for allocating order lines against
//! stock batches, implemented purely as deterministic domain logic (no IO, no
//! HTTP, no storage).

pub mod batch;
pub mod events;
pub mod order_line;
pub mod product;

pub use batch::Batch;
pub use events::{
    AllocationEvent, AllocationEventKind, AllocationRequired, BatchCreated, BatchQuantityChanged,
    OutOfStock,
};
pub use order_line::OrderLine;
pub use product::Product;
