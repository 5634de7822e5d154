//! Database layer — migrations and franchise/ledger/invoice queries.
//!
//! The share-allocation write path lives in [`crate::allocation`]; this
//! module holds pool setup and the plain reads and writes.

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::info;

use crate::errors::{ApiError, Result};
use crate::models::{Franchise, FranchiseStatus, Invoice, InvoiceKind, InvoiceStatus, ShareAllocation};

const FRANCHISE_COLUMNS: &str = "id, business_id, owner_id, building, location, cost_per_area, \
     carpet_area, total_shares, selected_shares, total_investment, status, created_at";

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    // Make sure the file is created if it doesn't exist yet.
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .map_err(ApiError::from_sqlx)?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| ApiError::Database(e.into()))?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// Franchise records
// ─────────────────────────────────────────────────────────

pub async fn insert_franchise<'e, E>(executor: E, franchise: &Franchise) -> Result<()>
where
    E: sqlx::SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO franchises
            (id, business_id, owner_id, building, location, cost_per_area,
             carpet_area, total_shares, selected_shares, total_investment, status, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&franchise.id)
    .bind(&franchise.business_id)
    .bind(&franchise.owner_id)
    .bind(&franchise.building)
    .bind(&franchise.location)
    .bind(franchise.cost_per_area)
    .bind(franchise.carpet_area)
    .bind(franchise.total_shares)
    .bind(franchise.selected_shares)
    .bind(franchise.total_investment)
    .bind(franchise.status)
    .bind(franchise.created_at)
    .execute(executor)
    .await
    .map_err(ApiError::from_sqlx)?;
    Ok(())
}

/// Owner onboarding: create the franchise record and bill the listing fee
/// in one transaction. Neither row is observable without the other.
pub async fn onboard_franchise(
    pool: &SqlitePool,
    franchise: &Franchise,
    invoice: NewInvoice,
) -> Result<Invoice> {
    let mut tx = pool.begin().await.map_err(ApiError::from_sqlx)?;
    insert_franchise(&mut *tx, franchise).await?;
    let created = insert_invoice(&mut *tx, invoice).await?;
    tx.commit().await.map_err(ApiError::from_sqlx)?;
    Ok(created)
}

pub async fn get_franchise(pool: &SqlitePool, id: &str) -> Result<Option<Franchise>> {
    let sql = format!("SELECT {FRANCHISE_COLUMNS} FROM franchises WHERE id = ?1");
    let row = sqlx::query_as::<_, Franchise>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(ApiError::from_sqlx)?;
    Ok(row)
}

/// All franchises listed by a business, newest first.
pub async fn list_franchises_for_business(
    pool: &SqlitePool,
    business_id: &str,
) -> Result<Vec<Franchise>> {
    let sql = format!(
        "SELECT {FRANCHISE_COLUMNS} FROM franchises \
         WHERE business_id = ?1 ORDER BY created_at DESC, id DESC"
    );
    let rows = sqlx::query_as::<_, Franchise>(&sql)
        .bind(business_id)
        .fetch_all(pool)
        .await
        .map_err(ApiError::from_sqlx)?;
    Ok(rows)
}

/// Move a franchise to `next`, guarded on the status the caller observed.
/// Zero rows affected means a concurrent transition won the race.
pub async fn update_status(
    pool: &SqlitePool,
    id: &str,
    observed: FranchiseStatus,
    next: FranchiseStatus,
) -> Result<()> {
    let updated = sqlx::query("UPDATE franchises SET status = ?1 WHERE id = ?2 AND status = ?3")
        .bind(next)
        .bind(id)
        .bind(observed)
        .execute(pool)
        .await
        .map_err(ApiError::from_sqlx)?
        .rows_affected();

    if updated == 0 {
        return Err(ApiError::StorageConflict);
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────
// Allocation ledger reads
// ─────────────────────────────────────────────────────────

/// Fetch the allocation ledger for a franchise, oldest entry first.
pub async fn allocations_for_franchise(
    pool: &SqlitePool,
    franchise_id: &str,
) -> Result<Vec<ShareAllocation>> {
    let rows = sqlx::query_as::<_, ShareAllocation>(
        r#"
        SELECT id, franchise_id, investor_id, investor_name, investor_image,
               shares, price_per_share, created_at
        FROM   share_allocations
        WHERE  franchise_id = ?1
        ORDER  BY id ASC
        "#,
    )
    .bind(franchise_id)
    .fetch_all(pool)
    .await
    .map_err(ApiError::from_sqlx)?;
    Ok(rows)
}

/// Sum of shares across a franchise's ledger. Must always equal the
/// franchise's `selected_shares`.
pub async fn allocated_shares_sum(pool: &SqlitePool, franchise_id: &str) -> Result<i64> {
    let (sum,): (i64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(shares), 0) FROM share_allocations WHERE franchise_id = ?1",
    )
    .bind(franchise_id)
    .fetch_one(pool)
    .await
    .map_err(ApiError::from_sqlx)?;
    Ok(sum)
}

// ─────────────────────────────────────────────────────────
// Invoices
// ─────────────────────────────────────────────────────────

pub struct NewInvoice {
    pub franchise_id: String,
    pub user_id: String,
    pub kind: InvoiceKind,
    pub amount: f64,
    pub gst: f64,
    pub status: InvoiceStatus,
    pub tx_signature: Option<String>,
}

/// Record a billable event. A duplicate transaction signature is a client
/// error (the payment was already recorded), not an internal one.
pub async fn insert_invoice<'e, E>(executor: E, invoice: NewInvoice) -> Result<Invoice>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let created_at = chrono::Utc::now().timestamp();
    let total = invoice.amount + invoice.gst;

    let result = sqlx::query(
        r#"
        INSERT INTO invoices
            (franchise_id, user_id, kind, amount, gst, total, status, tx_signature, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&invoice.franchise_id)
    .bind(&invoice.user_id)
    .bind(invoice.kind)
    .bind(invoice.amount)
    .bind(invoice.gst)
    .bind(total)
    .bind(invoice.status)
    .bind(&invoice.tx_signature)
    .bind(created_at)
    .execute(executor)
    .await
    .map_err(|e| {
        if e.as_database_error()
            .map(|d| d.is_unique_violation())
            .unwrap_or(false)
        {
            ApiError::Validation("a payment with this signature was already recorded".to_string())
        } else {
            ApiError::from_sqlx(e)
        }
    })?;

    Ok(Invoice {
        id: result.last_insert_rowid(),
        franchise_id: invoice.franchise_id,
        user_id: invoice.user_id,
        kind: invoice.kind,
        amount: invoice.amount,
        gst: invoice.gst,
        total,
        status: invoice.status,
        tx_signature: invoice.tx_signature,
        created_at,
    })
}
