//! PayZen SOAP web service client
//!
//! Every operation runs through [`PayzenProvider::execute`]: validate, build
//! and sign the envelope, POST it, decode the reply, check the response
//! header, normalize the status and assemble the [`PaymentResult`].

pub mod assembler;
pub mod auth;
pub mod config;
pub mod envelope;
#[cfg(feature = "boleto-form")]
pub mod form;
pub mod models;
pub mod operation;
pub mod recurrence;
pub mod response;
pub mod transport;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info, warn};

pub use assembler::{HEADER_NOT_VALID, NOT_CREATED_MESSAGE, REFUSED_MESSAGE};
pub use auth::{Direction, Signer};
pub use config::{Mode, PayzenConfig};
pub use envelope::RequestEnvelope;
#[cfg(feature = "boleto-form")]
pub use form::{BoletoDocument, BoletoForm, FormReply};
pub use operation::{DuplicateRequest, Operation, OperationKind, PaymentUpdate};
pub use recurrence::{Cycle, Recurrence};

use assembler::Assembler;
use transport::HttpTransport;

use crate::error::{AppError, AppResult};
use crate::payments::traits::PaymentProvider;
use crate::payments::types::{
    CardDetails, Customer, PaymentRequest, PaymentResult, Provider, SubscriptionRequest,
    SubscriptionUpdate, TokenRequest,
};

/// PayZen client bound to one shop account
#[derive(Debug, Clone)]
pub struct PayzenProvider {
    config: PayzenConfig,
    signer: Signer,
    transport: HttpTransport,
}

impl PayzenProvider {
    pub fn new(config: PayzenConfig) -> AppResult<Self> {
        config.validate()?;
        let signer = Signer::new(config.signing_key());
        let transport = HttpTransport::new(config.timeout_secs, config.log_payloads)?;

        info!(
            "PayZen provider ready: shop_id={}, mode={}",
            config.shop_id, config.mode
        );

        Ok(Self {
            config,
            signer,
            transport,
        })
    }

    /// Create provider from `MULTIPAY_PAYZEN__*` environment variables
    pub fn from_env() -> AppResult<Self> {
        let config = crate::config::Config::from_env()
            .map_err(|e| AppError::configuration(format!("{:#}", e)))?;
        Self::new(config.payzen)
    }

    pub fn config(&self) -> &PayzenConfig {
        &self.config
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// Run one operation end to end
    pub async fn execute(&self, operation: Operation) -> AppResult<PaymentResult> {
        let kind = operation.kind();
        info!("PayZen {} started", kind);

        operation
            .validate()
            .inspect_err(|e| warn!("PayZen {} rejected before sending: {}", kind, e))?;

        let envelope = RequestEnvelope::build(&self.config, &self.signer, &operation, Utc::now())?;
        let body = envelope.to_xml()?;

        let exchange = self
            .transport
            .post(self.config.endpoint(), envelope.soap_action(), body)
            .await?;

        let parsed = response::parse(kind, &exchange.raw_response).inspect_err(|e| {
            error!("PayZen {} response could not be decoded: {}", kind, e);
        })?;

        let result = Assembler {
            signer: &self.signer,
            operation: &operation,
            envelope: &envelope,
        }
        .assemble(exchange, parsed)
        .inspect_err(|e| error!("PayZen {} failed: {}", kind, e))?;

        if result.is_error() {
            warn!(
                "PayZen {} returned an error: code={:?}, message={}",
                kind,
                result.response_code,
                result.message().unwrap_or_default()
            );
        } else {
            info!(
                "PayZen {} completed: uuid={:?}, status={:?}",
                kind, result.transaction_uuid, result.transaction_status
            );
        }

        Ok(result)
    }

    pub async fn create_payment(&self, request: PaymentRequest) -> AppResult<PaymentResult> {
        self.execute(Operation::CreatePayment(request)).await
    }

    pub async fn update_payment(&self, update: PaymentUpdate) -> AppResult<PaymentResult> {
        self.execute(Operation::UpdatePayment(update)).await
    }

    pub async fn cancel_payment(&self, transaction_uuid: &str) -> AppResult<PaymentResult> {
        self.execute(Operation::CancelPayment {
            transaction_uuid: transaction_uuid.to_string(),
        })
        .await
    }

    pub async fn duplicate_payment(&self, request: DuplicateRequest) -> AppResult<PaymentResult> {
        self.execute(Operation::DuplicatePayment(request)).await
    }

    pub async fn capture_payments(
        &self,
        transaction_uuids: Vec<String>,
    ) -> AppResult<PaymentResult> {
        self.execute(Operation::CapturePayment { transaction_uuids })
            .await
    }

    pub async fn validate_payment(&self, transaction_uuid: &str) -> AppResult<PaymentResult> {
        self.execute(Operation::ValidatePayment {
            transaction_uuid: transaction_uuid.to_string(),
        })
        .await
    }

    pub async fn refund_payment(
        &self,
        transaction_uuid: &str,
        amount: f64,
    ) -> AppResult<PaymentResult> {
        self.execute(Operation::RefundPayment {
            transaction_uuid: transaction_uuid.to_string(),
            amount,
        })
        .await
    }

    pub async fn create_token(&self, request: TokenRequest) -> AppResult<PaymentResult> {
        self.execute(Operation::CreateToken(request)).await
    }

    pub async fn update_token(
        &self,
        token: &str,
        card: Option<CardDetails>,
        customer: Option<Customer>,
    ) -> AppResult<PaymentResult> {
        self.execute(Operation::UpdateToken {
            token: token.to_string(),
            card,
            customer,
        })
        .await
    }

    pub async fn cancel_token(&self, token: &str) -> AppResult<PaymentResult> {
        self.execute(Operation::CancelToken {
            token: token.to_string(),
        })
        .await
    }

    pub async fn reactivate_token(&self, token: &str) -> AppResult<PaymentResult> {
        self.execute(Operation::ReactivateToken {
            token: token.to_string(),
        })
        .await
    }

    pub async fn get_token_details(&self, token: &str) -> AppResult<PaymentResult> {
        self.execute(Operation::GetTokenDetails {
            token: token.to_string(),
        })
        .await
    }

    pub async fn find_payments(&self, order_id: &str) -> AppResult<PaymentResult> {
        self.execute(Operation::FindPayments {
            order_id: order_id.to_string(),
        })
        .await
    }

    pub async fn get_payment_details(&self, transaction_uuid: &str) -> AppResult<PaymentResult> {
        self.execute(Operation::GetPaymentDetails {
            transaction_uuid: transaction_uuid.to_string(),
        })
        .await
    }

    pub async fn create_subscription(
        &self,
        request: SubscriptionRequest,
    ) -> AppResult<PaymentResult> {
        self.execute(Operation::CreateSubscription(request)).await
    }

    pub async fn get_subscription_details(
        &self,
        subscription_id: &str,
        token: &str,
    ) -> AppResult<PaymentResult> {
        self.execute(Operation::GetSubscriptionDetails {
            subscription_id: subscription_id.to_string(),
            token: token.to_string(),
        })
        .await
    }

    pub async fn cancel_subscription(
        &self,
        subscription_id: &str,
        token: &str,
    ) -> AppResult<PaymentResult> {
        self.execute(Operation::CancelSubscription {
            subscription_id: subscription_id.to_string(),
            token: token.to_string(),
        })
        .await
    }

    pub async fn update_subscription(
        &self,
        update: SubscriptionUpdate,
    ) -> AppResult<PaymentResult> {
        self.execute(Operation::UpdateSubscription(update)).await
    }

    /// Generate a boleto through the form-redirect flow
    #[cfg(feature = "boleto-form")]
    pub async fn generate_boleto_form(&self, request: &PaymentRequest) -> AppResult<FormReply> {
        info!("PayZen boleto form started: order_id={}", request.order_id);

        let form = BoletoForm::new(&self.config, request, Utc::now())?.sign(&self.signer);
        let exchange = self
            .transport
            .post_form(&self.config.form_endpoint, form.encode())
            .await?;

        let reply = form::classify(exchange.content_type.as_deref(), &exchange.body);
        match &reply {
            FormReply::Document(document) => info!(
                "PayZen boleto generated: order_id={}, bytes={}",
                request.order_id,
                document.bytes.len()
            ),
            FormReply::Rejected(message) => warn!(
                "PayZen boleto form rejected: order_id={}, message={}",
                request.order_id, message
            ),
        }
        Ok(reply)
    }
}

#[async_trait]
impl PaymentProvider for PayzenProvider {
    fn provider(&self) -> Provider {
        Provider::PayZen
    }

    async fn create_payment(&self, request: PaymentRequest) -> AppResult<PaymentResult> {
        PayzenProvider::create_payment(self, request).await
    }

    async fn get_payment(&self, transaction_uuid: &str) -> AppResult<PaymentResult> {
        self.get_payment_details(transaction_uuid).await
    }

    async fn capture_payment(&self, transaction_uuid: &str) -> AppResult<PaymentResult> {
        self.capture_payments(vec![transaction_uuid.to_string()]).await
    }

    async fn cancel_payment(&self, transaction_uuid: &str) -> AppResult<PaymentResult> {
        PayzenProvider::cancel_payment(self, transaction_uuid).await
    }

    async fn refund_payment(
        &self,
        transaction_uuid: &str,
        amount: f64,
    ) -> AppResult<PaymentResult> {
        PayzenProvider::refund_payment(self, transaction_uuid, amount).await
    }
}
