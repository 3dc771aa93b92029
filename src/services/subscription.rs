//! Email subscription client
//!
//! Wraps a single insert into the subscriber table and folds every outcome
//! into a `SubscribeResult`. Nothing is thrown to the caller:
//! - insert ok -> success
//! - uniqueness violation (`23505`) -> success, re-subscribing is idempotent
//! - other remote error -> failure with the remote message
//! - transport failure -> failure with a generic localized message

use crate::domain::content::NETWORK_ERROR_MESSAGE;
use crate::domain::types::{SubscribeResult, SubscriptionRecord};
use crate::infra::metrics::{Metrics, SubscribeOutcome};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

/// Postgres `unique_violation` SQLSTATE
pub const UNIQUE_VIOLATION_CODE: &str = "23505";

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend answered and refused the row
    #[error("{message}")]
    Rejected { code: Option<String>, message: String },
    /// The request never completed
    #[error("transport error: {0}")]
    Transport(String),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::Rejected { code: Some(code), .. } if code == UNIQUE_VIOLATION_CODE)
    }
}

/// Remote table the subscriber rows are written to
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    async fn insert(&self, record: &SubscriptionRecord) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: SubscriberStore + ?Sized> SubscriberStore for Arc<S> {
    async fn insert(&self, record: &SubscriptionRecord) -> Result<(), StoreError> {
        (**self).insert(record).await
    }
}

pub struct SubscriptionClient<S> {
    store: S,
    metrics: Option<Arc<Metrics>>,
}

impl<S: SubscriberStore> SubscriptionClient<S> {
    pub fn new(store: S) -> Self {
        Self { store, metrics: None }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Insert `{email, subscribed_at: now}`. No retries.
    pub async fn subscribe(&self, email: &str) -> SubscribeResult {
        let record = SubscriptionRecord::now(email);
        let start = Instant::now();
        let result = self.store.insert(&record).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let (outcome, reply) = match result {
            Ok(()) => (SubscribeOutcome::Inserted, SubscribeResult::ok()),
            Err(e) if e.is_unique_violation() => (SubscribeOutcome::Duplicate, SubscribeResult::ok()),
            Err(StoreError::Rejected { code, message }) => {
                warn!(code = ?code, error = %message, "subscribe_rejected");
                (SubscribeOutcome::Rejected, SubscribeResult::failed(message))
            }
            Err(StoreError::Transport(e)) => {
                warn!(error = %e, "subscribe_transport_error");
                (SubscribeOutcome::NetworkError, SubscribeResult::failed(NETWORK_ERROR_MESSAGE))
            }
        };

        info!(outcome = ?outcome, latency_ms = %latency_ms, "subscribe_completed");

        if let Some(metrics) = &self.metrics {
            metrics.record_subscribe(outcome, latency_ms);
        }
        reply
    }
}
