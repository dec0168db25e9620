//! Payment provider trait definitions
//!
//! Defines the gateway-neutral interface every payment provider implements.

use crate::error::AppResult;
use crate::payments::types::{PaymentRequest, PaymentResult, Provider};
use async_trait::async_trait;

/// Trait for payment provider implementations
///
/// Every call yields a [`PaymentResult`]. Business refusals and protocol
/// failures reported by the gateway come back as `Ok` with
/// [`PaymentResult::is_error`] set; `Err` is reserved for validation,
/// transport, malformed responses and unknown status labels.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Which gateway this is
    fn provider(&self) -> Provider;

    /// Create a payment transaction
    ///
    /// # Arguments
    /// * `request` - Order, amount, instrument and customer billing details
    async fn create_payment(&self, request: PaymentRequest) -> AppResult<PaymentResult>;

    /// Fetch the current state of a transaction
    async fn get_payment(&self, transaction_uuid: &str) -> AppResult<PaymentResult>;

    /// Settle an authorised transaction
    async fn capture_payment(&self, transaction_uuid: &str) -> AppResult<PaymentResult>;

    /// Cancel a transaction that has not been captured
    async fn cancel_payment(&self, transaction_uuid: &str) -> AppResult<PaymentResult>;

    /// Refund all or part of a captured transaction
    ///
    /// # Arguments
    /// * `transaction_uuid` - Transaction to refund
    /// * `amount` - Amount in major units
    async fn refund_payment(&self, transaction_uuid: &str, amount: f64) -> AppResult<PaymentResult>;
}
