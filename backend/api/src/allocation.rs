//! The share-allocation operation.
//!
//! This is the one write path with a real invariant to protect: across any
//! set of concurrent purchases, a franchise's `selected_shares` must never
//! exceed `total_shares`, and every successful purchase must leave exactly
//! one ledger entry whose share count is reflected in `selected_shares`.
//!
//! The whole operation runs inside a single transaction. Capacity is
//! enforced with a guarded UPDATE (`WHERE selected_shares + n <=
//! total_shares`) so that the check and the increment are one atomic
//! statement at the storage layer — two racing purchases cannot both
//! observe the same remaining capacity and overallocate. An early return
//! drops the transaction and rolls everything back, so no partial state is
//! ever visible.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::errors::{ApiError, Result};
use crate::models::{Franchise, ShareAllocation};
use crate::pricing;

/// A validated purchase request for shares in one franchise.
#[derive(Debug, Clone)]
pub struct AllocationRequest {
    pub franchise_id: String,
    pub investor_id: String,
    pub investor_name: String,
    pub investor_image: Option<String>,
    pub shares: i64,
    /// Price per share the client saw. Must match the server-derived price
    /// within the configured tolerance, otherwise the client is stale.
    pub offered_price: f64,
}

/// Result of a successful allocation: the ledger entry that was created
/// plus the franchise's updated capacity numbers.
#[derive(Debug, Clone)]
pub struct AllocationOutcome {
    pub allocation: ShareAllocation,
    pub selected_shares: i64,
    pub remaining: i64,
}

/// Allocate shares of a franchise to an investor.
///
/// Fails with:
/// - `Validation` — non-positive share count
/// - `NotFound` — unknown franchise id
/// - `InvalidStatus` — franchise not open for funding
/// - `PriceMismatch` — offered price differs from the derived price
///   (reports the expected value; caller should refetch and retry)
/// - `InsufficientShares` — request exceeds remaining capacity (reports
///   what is left so the caller can offer a partial purchase)
/// - `StorageConflict` — transient write conflict; retryable as-is
pub async fn allocate_shares(
    pool: &SqlitePool,
    price_tolerance: f64,
    req: AllocationRequest,
) -> Result<AllocationOutcome> {
    if req.shares <= 0 {
        return Err(ApiError::Validation(
            "number of shares must be a positive integer".to_string(),
        ));
    }

    let mut tx = pool.begin().await.map_err(ApiError::from_sqlx)?;

    let franchise: Franchise = sqlx::query_as(
        r#"
        SELECT id, business_id, owner_id, building, location, cost_per_area,
               carpet_area, total_shares, selected_shares, total_investment, status, created_at
        FROM   franchises
        WHERE  id = ?1
        "#,
    )
    .bind(&req.franchise_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(ApiError::from_sqlx)?
    .ok_or_else(|| ApiError::NotFound(format!("franchise {}", req.franchise_id)))?;

    if !franchise.status.allows_allocation() {
        return Err(ApiError::InvalidStatus {
            status: franchise.status,
        });
    }

    let expected = franchise.cost_per_share()?;
    if !pricing::price_matches(req.offered_price, expected, price_tolerance) {
        return Err(ApiError::PriceMismatch { expected });
    }

    // Capacity check and increment in one guarded statement. The SELECT
    // above may be stale by the time we get here; the guard re-checks
    // against whatever is actually committed.
    let invested = req.shares as f64 * expected;
    let updated = sqlx::query(
        r#"
        UPDATE franchises
        SET    selected_shares  = selected_shares + ?1,
               total_investment = total_investment + ?2
        WHERE  id = ?3
          AND  selected_shares + ?1 <= total_shares
        "#,
    )
    .bind(req.shares)
    .bind(invested)
    .bind(&req.franchise_id)
    .execute(&mut *tx)
    .await
    .map_err(ApiError::from_sqlx)?
    .rows_affected();

    if updated == 0 {
        let (remaining,): (i64,) =
            sqlx::query_as("SELECT total_shares - selected_shares FROM franchises WHERE id = ?1")
                .bind(&req.franchise_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(ApiError::from_sqlx)?;
        return Err(ApiError::InsufficientShares { remaining });
    }

    let created_at = Utc::now().timestamp();
    let ledger_id = sqlx::query(
        r#"
        INSERT INTO share_allocations
            (franchise_id, investor_id, investor_name, investor_image,
             shares, price_per_share, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&req.franchise_id)
    .bind(&req.investor_id)
    .bind(&req.investor_name)
    .bind(&req.investor_image)
    .bind(req.shares)
    .bind(expected)
    .bind(created_at)
    .execute(&mut *tx)
    .await
    .map_err(ApiError::from_sqlx)?
    .last_insert_rowid();

    let (selected_shares, total_shares): (i64, i64) =
        sqlx::query_as("SELECT selected_shares, total_shares FROM franchises WHERE id = ?1")
            .bind(&req.franchise_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(ApiError::from_sqlx)?;

    tx.commit().await.map_err(ApiError::from_sqlx)?;

    Ok(AllocationOutcome {
        allocation: ShareAllocation {
            id: ledger_id,
            franchise_id: req.franchise_id,
            investor_id: req.investor_id,
            investor_name: req.investor_name,
            investor_image: req.investor_image,
            shares: req.shares,
            price_per_share: expected,
            created_at,
        },
        selected_shares,
        remaining: total_shares - selected_shares,
    })
}
