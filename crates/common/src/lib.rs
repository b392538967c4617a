//! Shared building blocks for the commerce core: typed identifiers,
//! minor-unit money, the tax policy, and the error-kind taxonomy every
//! crate's errors classify into.

pub mod error;
pub mod money;
pub mod tax;
pub mod types;

pub use error::ErrorKind;
pub use money::Money;
pub use tax::{DEFAULT_TAX_BASIS_POINTS, TaxPolicy, Totals};
pub use types::{ItemType, OrderId, UserId};
