//! Franchise investment backend.
//!
//! Businesses list franchises divided into shares; investors purchase
//! fractional shares while the franchise is funding. The core of the crate
//! is the [`allocation`] module, which protects the one real invariant in
//! the system: a franchise's allocated shares never exceed its total, and
//! every purchase leaves exactly one ledger entry.

pub mod allocation;
pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod payments;
pub mod pricing;
