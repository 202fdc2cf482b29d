//! Money calculation utilities using rust_decimal for precision
//!
//! All calculations are done using `Decimal` internally, then converted to `f64`
//! for storage/serialization.

use rust_decimal::prelude::*;
use shared::models::{Order, OrderStatus, SalesSummary};

/// Rounding strategy for monetary values (2 decimal places, half away from zero)
const DECIMAL_PLACES: u32 = 2;

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    round_money(value).to_f64().unwrap_or_default()
}

#[inline]
fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// quantity × unit_price
pub fn line_total(quantity: i32, unit_price: f64) -> Decimal {
    to_decimal(unit_price) * Decimal::from(quantity)
}

/// Totals frozen on an order at creation time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub tax_amount: f64,
    pub total_amount: f64,
}

/// Compute subtotal, tax and total from `(quantity, unit_price)` lines
///
/// Subtotal and tax are each rounded before summing, so
/// `total_amount == subtotal + tax_amount` holds to the cent.
pub fn calculate_totals(
    lines: impl IntoIterator<Item = (i32, f64)>,
    tax_rate: f64,
) -> OrderTotals {
    let subtotal = round_money(
        lines
            .into_iter()
            .map(|(quantity, unit_price)| line_total(quantity, unit_price))
            .sum::<Decimal>(),
    );
    let tax = round_money(subtotal * to_decimal(tax_rate));

    OrderTotals {
        subtotal: to_f64(subtotal),
        tax_amount: to_f64(tax),
        total_amount: to_f64(subtotal + tax),
    }
}

/// Aggregate non-cancelled orders into a [`SalesSummary`]
pub fn summarize_sales<'a>(orders: impl IntoIterator<Item = &'a Order>) -> SalesSummary {
    let mut count: u64 = 0;
    let mut sales = Decimal::ZERO;
    let mut tax = Decimal::ZERO;

    for order in orders {
        if order.status == OrderStatus::Cancelled {
            continue;
        }
        count += 1;
        sales += to_decimal(order.total_amount);
        tax += to_decimal(order.tax_amount);
    }

    if count == 0 {
        return SalesSummary::default();
    }

    SalesSummary {
        total_orders: count,
        total_sales: to_f64(sales),
        total_tax: to_f64(tax),
        average_order: to_f64(sales / Decimal::from(count)),
    }
}
