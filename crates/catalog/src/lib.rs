//! Catalog store and availability checker.
//!
//! Read-mostly records for courses, events, and digital products, plus the
//! pure availability rules consumed by both the cart engine and the order
//! core. Catalog item lifecycle (create/edit/soft-delete) belongs to an
//! external admin collaborator; this crate only reads published/capacity/
//! price fields and adjusts the fulfillment counters.

pub mod availability;
pub mod error;
pub mod item;
pub mod memory;
pub mod postgres;
pub mod store;

pub use availability::{Availability, AvailabilityChecker, UnavailableReason, evaluate};
pub use error::CatalogError;
pub use item::{CatalogItem, Course, DigitalProduct, EventItem};
pub use memory::InMemoryCatalog;
pub use postgres::PostgresCatalog;
pub use store::CatalogStore;
