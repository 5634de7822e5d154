//! Domain types shared across the API, allocation, and storage layers.
//!
//! ## Status as a finite-state machine
//!
//! [`FranchiseStatus`] enforces a strict forward-only lifecycle:
//!
//! ```text
//! PendingApproval ──► Approval ──► Funding ──► Launching ──► Active ──► Closed
//! ```
//!
//! Forward jumps are allowed (an admin may move a franchise straight from
//! `Approval` to `Active`); backward transitions and any transition out of
//! `Closed` are rejected.

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::pricing;

/// Lifecycle status of a franchise listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum FranchiseStatus {
    /// Submitted by a business owner; awaiting admin review. Not public.
    PendingApproval,
    /// Approved but not yet open for investment.
    Approval,
    /// Open for share allocation.
    Funding,
    /// Fully funded; unit being set up.
    Launching,
    /// Operating.
    Active,
    /// Terminal. Record is effectively immutable from here on.
    Closed,
}

impl FranchiseStatus {
    fn rank(self) -> u8 {
        match self {
            Self::PendingApproval => 0,
            Self::Approval => 1,
            Self::Funding => 2,
            Self::Launching => 3,
            Self::Active => 4,
            Self::Closed => 5,
        }
    }

    /// Forward-only lifecycle check; `Closed` is terminal.
    pub fn can_transition_to(self, next: FranchiseStatus) -> bool {
        self != Self::Closed && next.rank() > self.rank()
    }

    /// Share purchases are only accepted while the franchise is funding.
    pub fn allows_allocation(self) -> bool {
        matches!(self, Self::Funding)
    }

    /// Whether non-owner callers may see this franchise at all.
    pub fn publicly_visible(self) -> bool {
        !matches!(self, Self::PendingApproval)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingApproval => "pending_approval",
            Self::Approval => "approval",
            Self::Funding => "funding",
            Self::Launching => "launching",
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for FranchiseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A franchise record as stored in / read from the database.
///
/// `cost_per_share` is deliberately absent: it is derived on demand so it can
/// never go stale when `cost_per_area`, `carpet_area`, or `total_shares`
/// change.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Franchise {
    pub id: String,
    pub business_id: String,
    pub owner_id: String,
    pub building: String,
    pub location: String,
    pub cost_per_area: f64,
    pub carpet_area: f64,
    pub total_shares: i64,
    pub selected_shares: i64,
    pub total_investment: f64,
    pub status: FranchiseStatus,
    pub created_at: i64,
}

impl Franchise {
    pub fn remaining_shares(&self) -> i64 {
        self.total_shares - self.selected_shares
    }

    /// Derived price of one share. Fails only if `total_shares` is invalid,
    /// which the schema already forbids.
    pub fn cost_per_share(&self) -> Result<f64> {
        pricing::cost_per_share(self.cost_per_area, self.carpet_area, self.total_shares)
    }

    /// Project this record to the public wire shape with the price computed
    /// server-side.
    pub fn to_view(&self) -> Result<FranchiseView> {
        Ok(FranchiseView {
            franchise: self.clone(),
            cost_per_share: self.cost_per_share()?,
            remaining_shares: self.remaining_shares(),
        })
    }
}

/// Public projection of a [`Franchise`]: the stored record plus the two
/// derived quantities clients need but must never compute themselves.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FranchiseView {
    #[serde(flatten)]
    pub franchise: Franchise,
    pub cost_per_share: f64,
    pub remaining_shares: i64,
}

/// One immutable entry in the share-allocation ledger.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ShareAllocation {
    pub id: i64,
    pub franchise_id: String,
    pub investor_id: String,
    pub investor_name: String,
    pub investor_image: Option<String>,
    pub shares: i64,
    pub price_per_share: f64,
    pub created_at: i64,
}

/// What an invoice bills for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum InvoiceKind {
    ListingFee,
    FundingContribution,
    Payout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Paid,
    Pending,
    Failed,
    Refunded,
}

/// A billable event (listing fee, funding contribution, payout).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: i64,
    pub franchise_id: String,
    pub user_id: String,
    pub kind: InvoiceKind,
    pub amount: f64,
    pub gst: f64,
    pub total: f64,
    pub status: InvoiceStatus,
    pub tx_signature: Option<String>,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_moves_forward_only() {
        use FranchiseStatus::*;

        assert!(PendingApproval.can_transition_to(Approval));
        assert!(Approval.can_transition_to(Funding));
        assert!(Funding.can_transition_to(Launching));
        assert!(Launching.can_transition_to(Active));
        assert!(Active.can_transition_to(Closed));

        // Forward jumps are fine.
        assert!(Approval.can_transition_to(Active));
        assert!(PendingApproval.can_transition_to(Closed));

        // Backward transitions are not.
        assert!(!Funding.can_transition_to(Approval));
        assert!(!Active.can_transition_to(Funding));
        assert!(!Approval.can_transition_to(PendingApproval));
    }

    #[test]
    fn closed_is_terminal() {
        use FranchiseStatus::*;
        for next in [PendingApproval, Approval, Funding, Launching, Active, Closed] {
            assert!(!Closed.can_transition_to(next));
        }
    }

    #[test]
    fn only_funding_accepts_allocations() {
        use FranchiseStatus::*;
        assert!(Funding.allows_allocation());
        for s in [PendingApproval, Approval, Launching, Active, Closed] {
            assert!(!s.allows_allocation());
        }
    }

    #[test]
    fn pending_approval_is_hidden_from_the_public() {
        use FranchiseStatus::*;
        assert!(!PendingApproval.publicly_visible());
        for s in [Approval, Funding, Launching, Active, Closed] {
            assert!(s.publicly_visible());
        }
    }

    fn sample_franchise() -> Franchise {
        Franchise {
            id: "fr-1".into(),
            business_id: "biz-1".into(),
            owner_id: "owner-1".into(),
            building: "Tower A".into(),
            location: "Mumbai".into(),
            cost_per_area: 1000.0,
            carpet_area: 500.0,
            total_shares: 100,
            selected_shares: 90,
            total_investment: 450_000.0,
            status: FranchiseStatus::Funding,
            created_at: 0,
        }
    }

    #[test]
    fn view_carries_derived_quantities() {
        let view = sample_franchise().to_view().unwrap();
        assert_eq!(view.cost_per_share, 5000.0);
        assert_eq!(view.remaining_shares, 10);
    }
}
