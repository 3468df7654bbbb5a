//! `allocation-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model and the aggregate/entity/value-object
//! traits shared by the allocation model and the infrastructure around it.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{AggregateRoot, ExpectedVersion, RecordsEvents};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{BatchReference, OrderId, Sku};
pub use value_object::ValueObject;
