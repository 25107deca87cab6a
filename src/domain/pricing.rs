//! Pure price computation for a transaction.

/// Computes the payable total for a reservation.
///
/// `unit_price × quantity − voucher_discount − points_used`, floored at
/// zero: discounts and point redemptions can bring the total to nothing
/// but never produce a negative amount owed.
#[must_use]
pub fn total_due(unit_price: i64, quantity: u32, voucher_discount: i64, points_used: i64) -> i64 {
    let subtotal = unit_price.saturating_mul(i64::from(quantity));
    subtotal
        .saturating_sub(voucher_discount)
        .saturating_sub(points_used)
        .max(0)
}
