//! Payment provider types and data structures
//!
//! Gateway-neutral request types handed to providers and the canonical
//! [`PaymentResult`] every provider call produces.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::payments::status::{PaymentStatus, TransactionStatus};

/// Payment backends known to the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// SOAP card/boleto gateway
    PayZen,
    /// JSON card/boleto/pix gateway
    Pagarme,
    /// JSON invoice gateway (boleto/pix)
    Iugu,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::PayZen => "PayZen",
            Provider::Pagarme => "Pagarme",
            Provider::Iugu => "Iugu",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Card brand or alternative payment scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentScheme {
    Visa,
    Mastercard,
    Amex,
    Elo,
    Hipercard,
    Diners,
    Boleto,
}

impl PaymentScheme {
    pub fn code(&self) -> &'static str {
        match self {
            PaymentScheme::Visa => "VISA",
            PaymentScheme::Mastercard => "MASTERCARD",
            PaymentScheme::Amex => "AMEX",
            PaymentScheme::Elo => "ELO",
            PaymentScheme::Hipercard => "HIPERCARD",
            PaymentScheme::Diners => "DINERS",
            PaymentScheme::Boleto => "BOLETO",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "VISA" => Some(PaymentScheme::Visa),
            "MASTERCARD" => Some(PaymentScheme::Mastercard),
            "AMEX" => Some(PaymentScheme::Amex),
            "ELO" => Some(PaymentScheme::Elo),
            "HIPERCARD" => Some(PaymentScheme::Hipercard),
            "DINERS" => Some(PaymentScheme::Diners),
            "BOLETO" => Some(PaymentScheme::Boleto),
            _ => None,
        }
    }

    pub fn is_boleto(&self) -> bool {
        matches!(self, PaymentScheme::Boleto)
    }
}

/// Raw card data for a charge or a tokenization
#[derive(Clone, Serialize, Deserialize)]
pub struct CardDetails {
    pub number: String,
    pub scheme: PaymentScheme,
    pub expiry_month: u8,
    pub expiry_year: u16,
    pub security_code: Option<String>,
    pub holder_name: Option<String>,
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardDetails")
            .field("number", &mask_card_number(&self.number))
            .field("scheme", &self.scheme)
            .field("expiry_month", &self.expiry_month)
            .field("expiry_year", &self.expiry_year)
            .field("security_code", &self.security_code.as_ref().map(|_| "***"))
            .field("holder_name", &self.holder_name)
            .finish()
    }
}

/// Keep the BIN and the last four digits only
pub fn mask_card_number(number: &str) -> String {
    let digits: Vec<char> = number.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() <= 10 {
        return "*".repeat(digits.len());
    }
    digits
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if i < 6 || i >= digits.len() - 4 {
                *c
            } else {
                'X'
            }
        })
        .collect()
}

/// How a payment is funded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PaymentInstrument {
    Card(CardDetails),
    /// Previously registered payment token
    Token(String),
    /// Synchronously generated boleto slip
    Boleto,
}

impl PaymentInstrument {
    pub fn is_boleto(&self) -> bool {
        match self {
            PaymentInstrument::Boleto => true,
            PaymentInstrument::Card(card) => card.scheme.is_boleto(),
            PaymentInstrument::Token(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerType {
    Private,
    Company,
}

/// Customer billing details
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Customer {
    pub reference: Option<String>,
    pub customer_type: Option<CustomerType>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub legal_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub cell_phone_number: Option<String>,
    /// CPF or CNPJ
    pub identity_code: Option<String>,
    pub street_number: Option<String>,
    pub address: Option<String>,
    pub district: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub language: Option<String>,
}

/// Payment request for creating a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Merchant order reference
    pub order_id: String,
    /// Amount in major units (e.g. 10.50)
    pub amount: f64,
    pub instrument: PaymentInstrument,
    pub customer: Customer,
    /// Number of card installments, if any
    pub installments: Option<u8>,
    /// Hold the payment until it is explicitly validated
    pub manual_validation: bool,
    pub expected_capture_date: Option<DateTime<Utc>>,
    /// Forwarded as order ext-info key/value pairs
    pub metadata: Option<serde_json::Value>,
}

/// Request for registering a payment token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
    pub card: CardDetails,
    pub customer: Customer,
}

/// Request for a recurring charge on a payment token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub order_id: String,
    pub token: String,
    pub amount: f64,
    pub effect_date: DateTime<Utc>,
    /// iCalendar recurrence rule, see [`crate::payments::providers::payzen::Recurrence`]
    pub rule: String,
    pub initial_amount: Option<f64>,
    pub initial_amount_count: Option<u32>,
    pub description: Option<String>,
}

/// Changes applied to an existing subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionUpdate {
    pub subscription_id: String,
    pub token: String,
    pub amount: Option<f64>,
    pub effect_date: DateTime<Utc>,
    pub rule: Option<String>,
    pub description: Option<String>,
}

/// Token metadata returned by token operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenDetails {
    pub token: String,
    pub masked_number: Option<String>,
    pub scheme: Option<String>,
    pub expiry_month: Option<u8>,
    pub expiry_year: Option<u16>,
    pub creation_date: Option<String>,
    pub cancellation_date: Option<String>,
    pub active: bool,
}

/// Subscription metadata returned by subscription operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionDetails {
    pub subscription_id: String,
    pub effect_date: Option<String>,
    pub cancel_date: Option<String>,
    pub rule: Option<String>,
    pub amount: Option<f64>,
    pub initial_amount: Option<f64>,
    pub initial_amount_count: Option<u32>,
    pub past_payments: Option<u32>,
    pub total_payments: Option<u32>,
    pub description: Option<String>,
}

/// One transaction listed by a payment search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentItem {
    pub transaction_uuid: String,
    pub transaction_id: Option<String>,
    pub amount: Option<f64>,
    pub transaction_status: TransactionStatus,
    pub payment_status: PaymentStatus,
}

/// Canonical outcome of a provider call
///
/// Populated step by step: the transport records the raw payloads, the parser
/// copies identifiers and amounts, the status normalizer sets the status fields.
/// Once failed, a result always carries a non-empty message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResult {
    pub provider: Provider,
    error: bool,
    message: Option<String>,
    pub response_code: Option<i32>,
    pub response_code_detail: Option<String>,
    pub transaction_status: Option<TransactionStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub transaction_id: Option<String>,
    pub transaction_uuid: Option<String>,
    pub order_id: Option<String>,
    pub amount: Option<f64>,
    pub boleto_url: Option<String>,
    pub token: Option<TokenDetails>,
    pub subscription: Option<SubscriptionDetails>,
    pub payments: Vec<PaymentItem>,
    pub raw_request: Option<String>,
    pub raw_response: Option<String>,
}

pub const DEFAULT_ERROR_MESSAGE: &str = "payment operation failed";

impl PaymentResult {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            error: false,
            message: None,
            response_code: None,
            response_code_detail: None,
            transaction_status: None,
            payment_status: None,
            transaction_id: None,
            transaction_uuid: None,
            order_id: None,
            amount: None,
            boleto_url: None,
            token: None,
            subscription: None,
            payments: Vec::new(),
            raw_request: None,
            raw_response: None,
        }
    }

    /// Mark the result as failed. A blank message is replaced by a generic one.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.error = true;
        self.message = if message.trim().is_empty() {
            Some(DEFAULT_ERROR_MESSAGE.to_string())
        } else {
            Some(message)
        };
    }

    pub fn is_error(&self) -> bool {
        self.error
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Record the canonical status and its coarse payment outcome
    pub fn set_status(&mut self, status: TransactionStatus) {
        self.transaction_status = Some(status);
        self.payment_status = Some(status.payment_status(self.provider));
    }
}
