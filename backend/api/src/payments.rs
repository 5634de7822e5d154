//! External transaction-verifier collaborator.
//!
//! Payment-network verification is out of scope: the service only asks an
//! external verifier whether a transaction signature is confirmed and for
//! what amount, then records the result as an invoice. The verifier is a
//! trait so tests can substitute a stub.

use std::future::Future;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::{ApiError, Result};

/// What the verifier reports for a transaction signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedTransaction {
    pub amount: f64,
    pub confirmed: bool,
}

pub trait TransactionVerifier: Send + Sync + 'static {
    fn verify(
        &self,
        signature: &str,
    ) -> impl Future<Output = Result<VerifiedTransaction>> + Send;
}

/// Verifier backed by an HTTP endpoint: POSTs `{ "signature": ... }` and
/// expects a [`VerifiedTransaction`] body back.
#[derive(Clone)]
pub struct HttpVerifier {
    client: Client,
    url: String,
}

impl HttpVerifier {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl TransactionVerifier for HttpVerifier {
    fn verify(
        &self,
        signature: &str,
    ) -> impl Future<Output = Result<VerifiedTransaction>> + Send {
        let request = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "signature": signature }));

        async move {
            let response = request
                .send()
                .await
                .map_err(|e| ApiError::Verifier(e.to_string()))?;

            if !response.status().is_success() {
                return Err(ApiError::Verifier(format!(
                    "verifier returned status {}",
                    response.status()
                )));
            }

            response
                .json::<VerifiedTransaction>()
                .await
                .map_err(|e| ApiError::Verifier(e.to_string()))
        }
    }
}
