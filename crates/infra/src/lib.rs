//! Infrastructure layer: storage, unit of work, handlers and bus wiring.
//!
//! ```text
//! AllocationService ─▶ MessageBus ─▶ handlers ─▶ UnitOfWork ─▶ TrackingRepository ─▶ Session ─▶ ProductStore
//!                          ▲                          │
//!                          └──── harvested events ────┘
//! ```

pub mod config;
pub mod handlers;
pub mod message_bus;
pub mod notifications;
pub mod product_store;
pub mod repository;
pub mod services;
pub mod unit_of_work;


pub use config::{AllocationConfig, ConfigError};
pub use handlers::{BatchView, HandlerError};
pub use message_bus::{allocation_handlers, build_message_bus, AllocationBus, AllocationHandlers};
pub use notifications::{InMemoryNotifier, LogNotifier, Notification, NotificationError, Notifier};
pub use product_store::{
    InMemoryProductStore, ProductChange, ProductStore, Session, SessionFactory, StoreError,
    StoreSession, StoredProduct, WriteStamps,
};
pub use repository::{Repository, TrackingRepository};
pub use services::AllocationService;
pub use unit_of_work::{ActiveUnitOfWork, UnitOfWork, UnitOfWorkState};
