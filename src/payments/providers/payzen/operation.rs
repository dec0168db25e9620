//! The closed set of web service operations
//!
//! [`Operation`] carries the typed inputs of a call; [`OperationKind`] is its
//! fieldless discriminant and knows the wire element names and which response
//! sections each operation must return.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppResult, ValidationErrors};
use crate::payments::amount;
use crate::payments::status::LifecycleAction;
use crate::payments::types::{
    CardDetails, Customer, PaymentInstrument, PaymentRequest, SubscriptionRequest,
    SubscriptionUpdate, TokenRequest,
};

/// Changes to a payment that has not been captured yet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentUpdate {
    pub transaction_uuid: String,
    pub amount: Option<f64>,
    pub expected_capture_date: Option<DateTime<Utc>>,
    pub manual_validation: Option<bool>,
}

/// New payment reusing the card data of an existing one
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateRequest {
    pub transaction_uuid: String,
    pub order_id: String,
    pub amount: f64,
}

#[derive(Debug, Clone)]
pub enum Operation {
    CreatePayment(PaymentRequest),
    UpdatePayment(PaymentUpdate),
    CancelPayment { transaction_uuid: String },
    DuplicatePayment(DuplicateRequest),
    CapturePayment { transaction_uuids: Vec<String> },
    ValidatePayment { transaction_uuid: String },
    RefundPayment { transaction_uuid: String, amount: f64 },
    CreateToken(TokenRequest),
    UpdateToken {
        token: String,
        card: Option<CardDetails>,
        customer: Option<Customer>,
    },
    CancelToken { token: String },
    ReactivateToken { token: String },
    GetTokenDetails { token: String },
    FindPayments { order_id: String },
    GetPaymentDetails { transaction_uuid: String },
    CreateSubscription(SubscriptionRequest),
    GetSubscriptionDetails { subscription_id: String, token: String },
    CancelSubscription { subscription_id: String, token: String },
    UpdateSubscription(SubscriptionUpdate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    CreatePayment,
    UpdatePayment,
    CancelPayment,
    DuplicatePayment,
    CapturePayment,
    ValidatePayment,
    RefundPayment,
    CreateToken,
    UpdateToken,
    CancelToken,
    ReactivateToken,
    GetTokenDetails,
    FindPayments,
    GetPaymentDetails,
    CreateSubscription,
    GetSubscriptionDetails,
    CancelSubscription,
    UpdateSubscription,
}

/// Response sections an operation cannot do without
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSection {
    Payment,
    PaymentToken,
    Subscription,
}

impl OperationKind {
    pub const ALL: [OperationKind; 18] = [
        OperationKind::CreatePayment,
        OperationKind::UpdatePayment,
        OperationKind::CancelPayment,
        OperationKind::DuplicatePayment,
        OperationKind::CapturePayment,
        OperationKind::ValidatePayment,
        OperationKind::RefundPayment,
        OperationKind::CreateToken,
        OperationKind::UpdateToken,
        OperationKind::CancelToken,
        OperationKind::ReactivateToken,
        OperationKind::GetTokenDetails,
        OperationKind::FindPayments,
        OperationKind::GetPaymentDetails,
        OperationKind::CreateSubscription,
        OperationKind::GetSubscriptionDetails,
        OperationKind::CancelSubscription,
        OperationKind::UpdateSubscription,
    ];

    /// Request element name, without namespace prefix
    pub fn element(&self) -> &'static str {
        match self {
            OperationKind::CreatePayment => "createPayment",
            OperationKind::UpdatePayment => "updatePayment",
            OperationKind::CancelPayment => "cancelPayment",
            OperationKind::DuplicatePayment => "duplicatePayment",
            OperationKind::CapturePayment => "capturePayment",
            OperationKind::ValidatePayment => "validatePayment",
            OperationKind::RefundPayment => "refundPayment",
            OperationKind::CreateToken => "createToken",
            OperationKind::UpdateToken => "updateToken",
            OperationKind::CancelToken => "cancelToken",
            OperationKind::ReactivateToken => "reactivateToken",
            OperationKind::GetTokenDetails => "getTokenDetails",
            OperationKind::FindPayments => "findPayments",
            OperationKind::GetPaymentDetails => "getPaymentDetails",
            OperationKind::CreateSubscription => "createSubscription",
            OperationKind::GetSubscriptionDetails => "getSubscriptionDetails",
            OperationKind::CancelSubscription => "cancelSubscription",
            OperationKind::UpdateSubscription => "updateSubscription",
        }
    }

    /// Element wrapping the result in the response body
    pub fn response_element(&self) -> String {
        format!("{}Response", self.element())
    }

    pub fn required_sections(&self) -> &'static [ResponseSection] {
        match self {
            OperationKind::CreatePayment
            | OperationKind::UpdatePayment
            | OperationKind::CancelPayment
            | OperationKind::DuplicatePayment
            | OperationKind::ValidatePayment
            | OperationKind::RefundPayment
            | OperationKind::GetPaymentDetails => &[ResponseSection::Payment],
            OperationKind::CreateToken
            | OperationKind::UpdateToken
            | OperationKind::GetTokenDetails => &[ResponseSection::PaymentToken],
            OperationKind::CreateSubscription
            | OperationKind::GetSubscriptionDetails
            | OperationKind::UpdateSubscription => &[ResponseSection::Subscription],
            OperationKind::CapturePayment
            | OperationKind::CancelToken
            | OperationKind::ReactivateToken
            | OperationKind::FindPayments
            | OperationKind::CancelSubscription => &[],
        }
    }

    /// The response describes one transaction and must carry its status label
    pub fn carries_transaction(&self) -> bool {
        self.required_sections().contains(&ResponseSection::Payment)
    }

    /// State the transaction must be in for this operation to make sense
    pub fn lifecycle_action(&self) -> Option<LifecycleAction> {
        match self {
            OperationKind::UpdatePayment => Some(LifecycleAction::Update),
            OperationKind::CancelPayment => Some(LifecycleAction::Cancel),
            OperationKind::ValidatePayment => Some(LifecycleAction::Validate),
            OperationKind::CapturePayment => Some(LifecycleAction::Capture),
            OperationKind::RefundPayment => Some(LifecycleAction::Refund),
            OperationKind::DuplicatePayment => Some(LifecycleAction::Duplicate),
            _ => None,
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.element())
    }
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::CreatePayment(_) => OperationKind::CreatePayment,
            Operation::UpdatePayment(_) => OperationKind::UpdatePayment,
            Operation::CancelPayment { .. } => OperationKind::CancelPayment,
            Operation::DuplicatePayment(_) => OperationKind::DuplicatePayment,
            Operation::CapturePayment { .. } => OperationKind::CapturePayment,
            Operation::ValidatePayment { .. } => OperationKind::ValidatePayment,
            Operation::RefundPayment { .. } => OperationKind::RefundPayment,
            Operation::CreateToken(_) => OperationKind::CreateToken,
            Operation::UpdateToken { .. } => OperationKind::UpdateToken,
            Operation::CancelToken { .. } => OperationKind::CancelToken,
            Operation::ReactivateToken { .. } => OperationKind::ReactivateToken,
            Operation::GetTokenDetails { .. } => OperationKind::GetTokenDetails,
            Operation::FindPayments { .. } => OperationKind::FindPayments,
            Operation::GetPaymentDetails { .. } => OperationKind::GetPaymentDetails,
            Operation::CreateSubscription(_) => OperationKind::CreateSubscription,
            Operation::GetSubscriptionDetails { .. } => OperationKind::GetSubscriptionDetails,
            Operation::CancelSubscription { .. } => OperationKind::CancelSubscription,
            Operation::UpdateSubscription(_) => OperationKind::UpdateSubscription,
        }
    }

    /// The payment is funded by a boleto slip
    pub fn uses_boleto(&self) -> bool {
        matches!(self, Operation::CreatePayment(request) if request.instrument.is_boleto())
    }

    /// Payment token the operation addresses, when it addresses one
    pub fn token(&self) -> Option<&str> {
        match self {
            Operation::UpdateToken { token, .. }
            | Operation::CancelToken { token }
            | Operation::ReactivateToken { token }
            | Operation::GetTokenDetails { token }
            | Operation::GetSubscriptionDetails { token, .. }
            | Operation::CancelSubscription { token, .. } => Some(token),
            Operation::CreateSubscription(request) => Some(&request.token),
            Operation::UpdateSubscription(update) => Some(&update.token),
            _ => None,
        }
    }

    /// Pre-flight checks; no I/O happens when these fail
    pub fn validate(&self) -> AppResult<()> {
        let mut errors = ValidationErrors::new();

        match self {
            Operation::CreatePayment(request) => {
                errors.require("order_id", Some(&request.order_id), "order id is required");
                check_amount(&mut errors, "amount", request.amount);
                match &request.instrument {
                    PaymentInstrument::Card(card) if !card.scheme.is_boleto() => {
                        check_card(&mut errors, card)
                    }
                    PaymentInstrument::Token(token) => {
                        errors.require("token", Some(token), "payment token is required")
                    }
                    _ => {
                        let customer = &request.customer;
                        errors.require(
                            "customer.email",
                            customer.email.as_deref(),
                            "customer email is required for boleto",
                        );
                        errors.require(
                            "customer.identity_code",
                            customer.identity_code.as_deref(),
                            "customer CPF/CNPJ is required for boleto",
                        );
                    }
                }
                if matches!(request.installments, Some(0)) {
                    errors.add("installments", "installments must be at least 1");
                }
            }
            Operation::UpdatePayment(update) => {
                require_uuid(&mut errors, &update.transaction_uuid);
                if let Some(amount) = update.amount {
                    check_amount(&mut errors, "amount", amount);
                }
                if update.amount.is_none()
                    && update.expected_capture_date.is_none()
                    && update.manual_validation.is_none()
                {
                    errors.add("update", "nothing to update");
                }
            }
            Operation::CancelPayment { transaction_uuid }
            | Operation::ValidatePayment { transaction_uuid }
            | Operation::GetPaymentDetails { transaction_uuid } => {
                require_uuid(&mut errors, transaction_uuid)
            }
            Operation::DuplicatePayment(request) => {
                require_uuid(&mut errors, &request.transaction_uuid);
                errors.require("order_id", Some(&request.order_id), "order id is required");
                check_amount(&mut errors, "amount", request.amount);
            }
            Operation::CapturePayment { transaction_uuids } => {
                if transaction_uuids.iter().all(|uuid| uuid.trim().is_empty()) {
                    errors.add("transaction_uuids", "at least one transaction uuid is required");
                }
            }
            Operation::RefundPayment {
                transaction_uuid,
                amount,
            } => {
                require_uuid(&mut errors, transaction_uuid);
                check_amount(&mut errors, "amount", *amount);
            }
            Operation::CreateToken(request) => check_card(&mut errors, &request.card),
            Operation::UpdateToken {
                token,
                card,
                customer,
            } => {
                errors.require("token", Some(token), "payment token is required");
                if let Some(card) = card {
                    check_card(&mut errors, card);
                }
                if card.is_none() && customer.is_none() {
                    errors.add("update", "nothing to update");
                }
            }
            Operation::CancelToken { token }
            | Operation::ReactivateToken { token }
            | Operation::GetTokenDetails { token } => {
                errors.require("token", Some(token), "payment token is required")
            }
            Operation::FindPayments { order_id } => {
                errors.require("order_id", Some(order_id), "order id is required")
            }
            Operation::CreateSubscription(request) => {
                errors.require("order_id", Some(&request.order_id), "order id is required");
                errors.require("token", Some(&request.token), "payment token is required");
                errors.require("rule", Some(&request.rule), "recurrence rule is required");
                check_amount(&mut errors, "amount", request.amount);
                if let Some(initial) = request.initial_amount {
                    check_amount(&mut errors, "initial_amount", initial);
                }
            }
            Operation::GetSubscriptionDetails {
                subscription_id,
                token,
            }
            | Operation::CancelSubscription {
                subscription_id,
                token,
            } => {
                errors.require(
                    "subscription_id",
                    Some(subscription_id),
                    "subscription id is required",
                );
                errors.require("token", Some(token), "payment token is required");
            }
            Operation::UpdateSubscription(update) => {
                errors.require(
                    "subscription_id",
                    Some(&update.subscription_id),
                    "subscription id is required",
                );
                errors.require("token", Some(&update.token), "payment token is required");
                if let Some(amount) = update.amount {
                    check_amount(&mut errors, "amount", amount);
                }
            }
        }

        errors.into_result()
    }
}

fn require_uuid(errors: &mut ValidationErrors, uuid: &str) {
    errors.require("transaction_uuid", Some(uuid), "transaction uuid is required");
}

/// Amounts must be at least one cent once rounded
pub(super) fn check_amount(errors: &mut ValidationErrors, field: &str, value: f64) {
    if amount::to_minor_units(value).map_or(true, |cents| cents == 0) {
        errors.add(field, "amount must be greater than zero");
    }
}

fn check_card(errors: &mut ValidationErrors, card: &CardDetails) {
    let digits = card.number.chars().filter(|c| !c.is_whitespace()).count();
    let well_formed = card.number.chars().all(|c| c.is_ascii_digit() || c == ' ');
    if !(12..=19).contains(&digits) || !well_formed {
        errors.add("card.number", "card number is invalid");
    }
    if !(1..=12).contains(&card.expiry_month) {
        errors.add("card.expiry_month", "expiry month must be between 1 and 12");
    }
    if card.expiry_year < 2000 {
        errors.add("card.expiry_year", "expiry year must have four digits");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::types::PaymentScheme;

    fn card() -> CardDetails {
        CardDetails {
            number: "4970100000000055".to_string(),
            scheme: PaymentScheme::Visa,
            expiry_month: 12,
            expiry_year: 2030,
            security_code: Some("123".to_string()),
            holder_name: None,
        }
    }

    fn payment(instrument: PaymentInstrument) -> PaymentRequest {
        PaymentRequest {
            order_id: "order-1".to_string(),
            amount: 10.5,
            instrument,
            customer: Customer::default(),
            installments: None,
            manual_validation: false,
            expected_capture_date: None,
            metadata: None,
        }
    }

    fn field_errors(operation: Operation) -> ValidationErrors {
        match operation.validate().unwrap_err().kind {
            crate::error::AppErrorKind::Validation(errors) => errors,
            other => panic!("unexpected error kind {:?}", other),
        }
    }

    #[test]
    fn test_card_payment_is_valid() {
        assert!(Operation::CreatePayment(payment(PaymentInstrument::Card(card())))
            .validate()
            .is_ok());
    }

    #[test]
    fn test_missing_fields_are_reported_by_name() {
        let mut request = payment(PaymentInstrument::Card(CardDetails {
            number: "12".to_string(),
            expiry_month: 13,
            ..card()
        }));
        request.order_id.clear();
        request.amount = 0.0;

        let errors = field_errors(Operation::CreatePayment(request));
        assert_eq!(errors.get("order_id"), Some("order id is required"));
        assert!(errors.get("amount").is_some());
        assert!(errors.get("card.number").is_some());
        assert!(errors.get("card.expiry_month").is_some());
    }

    #[test]
    fn test_sub_cent_amounts_are_rejected() {
        let mut request = payment(PaymentInstrument::Card(card()));
        request.amount = 0.001;
        let errors = field_errors(Operation::CreatePayment(request));
        assert_eq!(errors.get("amount"), Some("amount must be greater than zero"));

        let errors = field_errors(Operation::RefundPayment {
            transaction_uuid: "uuid-1".to_string(),
            amount: 0.004,
        });
        assert!(errors.get("amount").is_some());

        let mut request = payment(PaymentInstrument::Card(card()));
        request.amount = 0.005;
        assert!(Operation::CreatePayment(request).validate().is_ok());
    }

    #[test]
    fn test_boleto_requires_customer_identity() {
        let errors = field_errors(Operation::CreatePayment(payment(PaymentInstrument::Boleto)));
        assert!(errors.get("customer.email").is_some());
        assert!(errors.get("customer.identity_code").is_some());

        let mut request = payment(PaymentInstrument::Boleto);
        request.customer.email = Some("buyer@example.com".to_string());
        request.customer.identity_code = Some("12345678909".to_string());
        assert!(Operation::CreatePayment(request).validate().is_ok());
    }

    #[test]
    fn test_housekeeping_operations_require_identifiers() {
        assert!(Operation::CancelPayment {
            transaction_uuid: " ".to_string()
        }
        .validate()
        .is_err());
        assert!(Operation::CapturePayment {
            transaction_uuids: vec![]
        }
        .validate()
        .is_err());
        assert!(Operation::GetSubscriptionDetails {
            subscription_id: "sub".to_string(),
            token: String::new()
        }
        .validate()
        .is_err());
        assert!(Operation::GetTokenDetails {
            token: "tok".to_string()
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn test_update_needs_a_change() {
        let errors = field_errors(Operation::UpdatePayment(PaymentUpdate {
            transaction_uuid: "uuid".to_string(),
            amount: None,
            expected_capture_date: None,
            manual_validation: None,
        }));
        assert_eq!(errors.get("update"), Some("nothing to update"));
    }

    #[test]
    fn test_kind_metadata() {
        assert_eq!(OperationKind::ALL.len(), 18);
        assert_eq!(OperationKind::GetTokenDetails.element(), "getTokenDetails");
        assert!(OperationKind::CreatePayment.carries_transaction());
        assert!(!OperationKind::CapturePayment.carries_transaction());
        assert_eq!(
            OperationKind::CreateSubscription.required_sections(),
            &[ResponseSection::Subscription]
        );
        assert_eq!(
            OperationKind::RefundPayment.lifecycle_action(),
            Some(LifecycleAction::Refund)
        );
    }

    #[test]
    fn test_uses_boleto() {
        assert!(Operation::CreatePayment(payment(PaymentInstrument::Boleto)).uses_boleto());
        assert!(!Operation::CreatePayment(payment(PaymentInstrument::Card(card()))).uses_boleto());
    }
}
