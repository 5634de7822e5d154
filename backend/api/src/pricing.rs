//! Cost derivation.
//!
//! The price of one share is a pure function of the franchise's area, cost
//! per unit area, and total share count. It is computed here and nowhere
//! else — both the display projection and purchase validation go through
//! [`cost_per_share`] so the two can never drift apart.

use crate::errors::{ApiError, Result};

/// `cost_per_area * carpet_area / total_shares`.
///
/// Fails with a validation error when `total_shares` is not positive;
/// callers never divide by zero.
pub fn cost_per_share(cost_per_area: f64, carpet_area: f64, total_shares: i64) -> Result<f64> {
    if total_shares <= 0 {
        return Err(ApiError::Validation(
            "total shares must be a positive integer".to_string(),
        ));
    }
    Ok(cost_per_area * carpet_area / total_shares as f64)
}

/// Tolerance comparison for client-offered prices. Currency arithmetic is
/// floating-point, so exact equality is too strict.
pub fn price_matches(offered: f64, computed: f64, tolerance: f64) -> bool {
    (offered - computed).abs() <= tolerance
}
