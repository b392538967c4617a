//! Tax policy and derived totals.
//!
//! The cart engine and the order core must apply the exact same rate and
//! rounding rule, otherwise the displayed cart total and the charged order
//! total can drift by a cent. Both therefore go through [`Totals::compute`].

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Default tax rate in basis points (800 = 8%).
pub const DEFAULT_TAX_BASIS_POINTS: u32 = 800;

/// A flat tax rate, expressed in basis points of the subtotal.
///
/// Modeled as an injected policy rather than a hardcoded constant so a
/// rate-by-jurisdiction lookup can replace it without touching the
/// total-computation contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxPolicy {
    basis_points: u32,
}

impl TaxPolicy {
    /// Creates a policy with the given rate in basis points.
    pub fn new(basis_points: u32) -> Self {
        Self { basis_points }
    }

    /// Returns the rate in basis points.
    pub fn basis_points(&self) -> u32 {
        self.basis_points
    }

    /// Computes the tax on a subtotal, rounded half-up to the nearest
    /// minor currency unit.
    pub fn tax_on(&self, subtotal: Money) -> Money {
        let bp = i64::from(self.basis_points);
        Money::from_cents((subtotal.cents() * bp + 5_000) / 10_000)
    }
}

impl Default for TaxPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TAX_BASIS_POINTS)
    }
}

/// Derived totals for a collection of priced lines.
///
/// Always recomputed from the lines that produced them, never stored
/// independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    /// Sum of `unit_price * quantity` over all lines.
    pub subtotal: Money,
    /// Tax on the subtotal per the policy.
    pub tax: Money,
    /// `subtotal + tax`.
    pub total: Money,
    /// Sum of quantities over all lines.
    pub item_count: u32,
}

impl Totals {
    /// Computes totals from `(unit_price, quantity)` pairs.
    pub fn compute(lines: impl Iterator<Item = (Money, u32)>, policy: TaxPolicy) -> Self {
        let mut subtotal = Money::zero();
        let mut item_count = 0u32;
        for (unit_price, quantity) in lines {
            subtotal += unit_price.multiply(quantity);
            item_count += quantity;
        }
        let tax = policy.tax_on(subtotal);
        Self {
            subtotal,
            tax,
            total: subtotal + tax,
            item_count,
        }
    }
}
