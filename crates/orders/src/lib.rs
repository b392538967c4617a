//! Order and booking core.
//!
//! Converts validated carts into durable orders, walks them through the
//! payment lifecycle, and applies/reverses fulfillment side effects
//! (course enrollments, event seat bookings, download grants). Every
//! mutating operation is a single transactional unit, and event capacity
//! is enforced at order creation so concurrent purchases cannot oversell.

pub mod error;
pub mod memory;
pub mod order;
pub mod postgres;
pub mod service;
pub mod status;
pub mod store;

pub use error::OrderError;
pub use memory::InMemoryOrderStore;
pub use order::{Booking, BookingStatus, Order, OrderLine};
pub use postgres::PostgresOrderStore;
pub use service::OrderService;
pub use status::{OrderStatus, ensure_transition};
pub use store::OrderStore;
