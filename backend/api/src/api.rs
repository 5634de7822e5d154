//! Axum REST API handlers.
//!
//! Every ownership and status rule is enforced here on the server; hiding a
//! button in some client is not a substitute for rejecting the request.

use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::allocation::{self, AllocationRequest};
use crate::config::Config;
use crate::db;
use crate::errors::{ApiError, Result};
use crate::models::{
    Franchise, FranchiseStatus, FranchiseView, InvoiceKind, InvoiceStatus, ShareAllocation,
};
use crate::payments::TransactionVerifier;

pub struct ApiState<V> {
    pub pool: SqlitePool,
    pub config: Config,
    pub verifier: V,
}

/// Build the application router over the given state.
pub fn router<V: TransactionVerifier>(state: Arc<ApiState<V>>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/franchises", post(create_franchise::<V>))
        .route("/franchises/:id", get(get_franchise::<V>))
        .route("/franchises/:id/allocations", get(franchise_allocations::<V>))
        .route("/franchises/:id/status", post(change_status::<V>))
        .route("/businesses/:id/franchises", get(business_franchises::<V>))
        .route("/allocations", post(allocate::<V>))
        .route("/payments/record", post(record_payment::<V>))
        .route("/payments/stripe/checkout", post(stripe_checkout_gone))
        .route("/payments/stripe/webhook", post(stripe_webhook_gone))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFranchiseBody {
    pub business_id: String,
    pub owner_id: String,
    pub building: String,
    pub location: String,
    pub cost_per_area: f64,
    pub carpet_area: f64,
    pub total_shares: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocateBody {
    pub franchise_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_image: Option<String>,
    pub number_of_shares: i64,
    pub cost_per_share: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocateResponse {
    pub success: bool,
    pub allocation: ShareAllocation,
    pub selected_shares: i64,
    pub remaining: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStatusBody {
    pub caller_id: String,
    pub status: FranchiseStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentBody {
    pub signature: String,
    pub franchise_id: String,
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct CallerQuery {
    pub caller: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FranchiseListResponse {
    pub count: usize,
    pub franchises: Vec<FranchiseView>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationListResponse {
    pub franchise_id: String,
    pub count: usize,
    pub allocations: Vec<ShareAllocation>,
}

// Body extraction failures (missing fields, bad types) are the caller's
// fault and must surface as HTTP 400, not axum's default rejection.
fn require_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => Err(ApiError::Validation(rejection.body_text())),
    }
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /franchises`
///
/// Business-owner onboarding: creates a franchise in `PendingApproval` and
/// bills the listing fee as a pending invoice.
pub async fn create_franchise<V: TransactionVerifier>(
    State(state): State<Arc<ApiState<V>>>,
    payload: std::result::Result<Json<CreateFranchiseBody>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let body = require_body(payload)?;

    if body.total_shares <= 0 {
        return Err(ApiError::Validation(
            "total shares must be a positive integer".to_string(),
        ));
    }
    if body.cost_per_area <= 0.0 || body.carpet_area <= 0.0 {
        return Err(ApiError::Validation(
            "cost per area and carpet area must be positive".to_string(),
        ));
    }

    let franchise = Franchise {
        id: Uuid::new_v4().to_string(),
        business_id: body.business_id,
        owner_id: body.owner_id.clone(),
        building: body.building,
        location: body.location,
        cost_per_area: body.cost_per_area,
        carpet_area: body.carpet_area,
        total_shares: body.total_shares,
        selected_shares: 0,
        total_investment: 0.0,
        status: FranchiseStatus::PendingApproval,
        created_at: Utc::now().timestamp(),
    };
    // One transaction: a franchise without its listing-fee invoice (or the
    // reverse) must never be observable, and a retry after a transient
    // failure must not mint a duplicate franchise.
    let fee = state.config.listing_fee;
    db::onboard_franchise(
        &state.pool,
        &franchise,
        db::NewInvoice {
            franchise_id: franchise.id.clone(),
            user_id: body.owner_id,
            kind: InvoiceKind::ListingFee,
            amount: fee,
            gst: fee * state.config.gst_rate,
            status: InvoiceStatus::Pending,
            tx_signature: None,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(franchise.to_view()?)))
}

/// `GET /franchises/:id`
///
/// Public projection with the price computed server-side. A franchise that
/// is still pending approval is only visible to its owner; everyone else
/// gets a 404 rather than a hint that it exists.
pub async fn get_franchise<V: TransactionVerifier>(
    State(state): State<Arc<ApiState<V>>>,
    Path(id): Path<String>,
    Query(query): Query<CallerQuery>,
) -> Result<impl IntoResponse> {
    let franchise = db::get_franchise(&state.pool, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("franchise {id}")))?;

    if !franchise.status.publicly_visible()
        && query.caller.as_deref() != Some(franchise.owner_id.as_str())
    {
        return Err(ApiError::NotFound(format!("franchise {id}")));
    }

    Ok(Json(franchise.to_view()?))
}

/// `GET /businesses/:id/franchises`
///
/// All franchises listed by a business. Non-owner callers never see
/// `PendingApproval` records.
pub async fn business_franchises<V: TransactionVerifier>(
    State(state): State<Arc<ApiState<V>>>,
    Path(business_id): Path<String>,
    Query(query): Query<CallerQuery>,
) -> Result<impl IntoResponse> {
    let franchises = db::list_franchises_for_business(&state.pool, &business_id).await?;

    let mut views = Vec::with_capacity(franchises.len());
    for franchise in franchises {
        let visible = franchise.status.publicly_visible()
            || query.caller.as_deref() == Some(franchise.owner_id.as_str());
        if visible {
            views.push(franchise.to_view()?);
        }
    }

    Ok(Json(FranchiseListResponse {
        count: views.len(),
        franchises: views,
    }))
}

/// `GET /franchises/:id/allocations`
///
/// The allocation ledger for a franchise, oldest entry first.
pub async fn franchise_allocations<V: TransactionVerifier>(
    State(state): State<Arc<ApiState<V>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    db::get_franchise(&state.pool, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("franchise {id}")))?;

    let allocations = db::allocations_for_franchise(&state.pool, &id).await?;
    Ok(Json(AllocationListResponse {
        franchise_id: id,
        count: allocations.len(),
        allocations,
    }))
}

/// `POST /allocations`
///
/// Purchase shares in a franchise. The offered `costPerShare` is validated
/// against the server-derived price; a client-computed value is never
/// trusted.
pub async fn allocate<V: TransactionVerifier>(
    State(state): State<Arc<ApiState<V>>>,
    payload: std::result::Result<Json<AllocateBody>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let body = require_body(payload)?;

    let outcome = allocation::allocate_shares(
        &state.pool,
        state.config.price_tolerance,
        AllocationRequest {
            franchise_id: body.franchise_id,
            investor_id: body.user_id,
            investor_name: body.user_name,
            investor_image: body.user_image,
            shares: body.number_of_shares,
            offered_price: body.cost_per_share,
        },
    )
    .await?;

    Ok(Json(AllocateResponse {
        success: true,
        allocation: outcome.allocation,
        selected_shares: outcome.selected_shares,
        remaining: outcome.remaining,
    }))
}

/// `POST /franchises/:id/status`
///
/// Lifecycle transition, owner-only. Transitions are forward-only and
/// `Closed` is terminal.
pub async fn change_status<V: TransactionVerifier>(
    State(state): State<Arc<ApiState<V>>>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<ChangeStatusBody>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let body = require_body(payload)?;

    let franchise = db::get_franchise(&state.pool, &id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("franchise {id}")))?;

    if body.caller_id != franchise.owner_id {
        return Err(ApiError::Forbidden);
    }
    if !franchise.status.can_transition_to(body.status) {
        return Err(ApiError::InvalidStatus {
            status: franchise.status,
        });
    }

    db::update_status(&state.pool, &id, franchise.status, body.status).await?;

    let updated = Franchise {
        status: body.status,
        ..franchise
    };
    Ok(Json(updated.to_view()?))
}

/// `POST /payments/record`
///
/// Verify a transaction signature through the external verifier and record
/// the confirmed amount as a paid funding-contribution invoice.
pub async fn record_payment<V: TransactionVerifier>(
    State(state): State<Arc<ApiState<V>>>,
    payload: std::result::Result<Json<RecordPaymentBody>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let body = require_body(payload)?;

    db::get_franchise(&state.pool, &body.franchise_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("franchise {}", body.franchise_id)))?;

    let verified = state.verifier.verify(&body.signature).await?;
    if !verified.confirmed {
        return Err(ApiError::Validation(
            "transaction is not confirmed".to_string(),
        ));
    }

    let invoice = db::insert_invoice(
        &state.pool,
        db::NewInvoice {
            franchise_id: body.franchise_id,
            user_id: body.user_id,
            kind: InvoiceKind::FundingContribution,
            amount: verified.amount,
            gst: verified.amount * state.config.gst_rate,
            status: InvoiceStatus::Paid,
            tx_signature: Some(body.signature),
        },
    )
    .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "invoice": invoice,
    })))
}

// ─────────────────────────────────────────────────────────
// Deprecated payment routes
// ─────────────────────────────────────────────────────────

// Old clients must receive a clear deprecation signal, not a 404.

/// `POST /payments/stripe/checkout`
pub async fn stripe_checkout_gone() -> impl IntoResponse {
    (
        StatusCode::GONE,
        Json(serde_json::json!({
            "error": "Stripe checkout is no longer supported; use POST /payments/record"
        })),
    )
}

/// `POST /payments/stripe/webhook`
pub async fn stripe_webhook_gone() -> impl IntoResponse {
    (
        StatusCode::GONE,
        Json(serde_json::json!({
            "error": "Stripe webhooks are no longer supported; use POST /payments/record"
        })),
    )
}
