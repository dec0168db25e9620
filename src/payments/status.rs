//! Status normalization
//!
//! Every provider speaks its own status vocabulary. Each one gets a static
//! label table resolving into the gateway-neutral [`TransactionStatus`]; the
//! coarser [`PaymentStatus`] is then derived from the status *and* the provider,
//! because the same label means different business outcomes on different
//! gateways.
//!
//! Labels outside a provider's table are rejected with
//! [`DomainError::UnmappedStatus`]; they are never coerced into a default.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::payments::types::Provider;

/// Gateway-neutral transaction state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    Initial,
    NotCreated,
    Authorised,
    AuthorisedToValidate,
    WaitingAuthorisation,
    WaitingAuthorisationToValidate,
    Refused,
    Captured,
    Cancelled,
    Expired,
    UnderVerification,
    Refunded,
    PartiallyRefunded,
    PartiallyPaid,
    InProtest,
    Chargeback,
    /// Operation without a transaction (tokens, subscriptions) succeeded
    Success,
    Error,
}

/// Coarse business outcome of a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    Paid,
    WaitingPayment,
    Refused,
    Cancelled,
    Refunded,
    Expired,
    Chargeback,
    Other,
    Success,
    Error,
}

/// Follow-up operations that depend on the current transaction state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleAction {
    Update,
    Cancel,
    Validate,
    Capture,
    Refund,
    Duplicate,
}

impl TransactionStatus {
    /// No further transition is possible from this state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::NotCreated
                | TransactionStatus::Refused
                | TransactionStatus::Cancelled
                | TransactionStatus::Expired
                | TransactionStatus::Refunded
                | TransactionStatus::Chargeback
                | TransactionStatus::Error
        )
    }

    /// Funds have been settled for this transaction
    pub fn is_captured(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Captured | TransactionStatus::PartiallyRefunded
        )
    }

    /// Source-state precondition of `action`
    ///
    /// `Initial -> Authorised* / WaitingAuthorisation* -> Captured -> Refunded | Chargeback`,
    /// with `Cancelled`, `Expired` and `Refused` reachable before capture.
    pub fn permits(&self, action: LifecycleAction) -> bool {
        use TransactionStatus::*;

        match action {
            LifecycleAction::Update | LifecycleAction::Cancel => matches!(
                self,
                Initial
                    | Authorised
                    | AuthorisedToValidate
                    | WaitingAuthorisation
                    | WaitingAuthorisationToValidate
                    | UnderVerification
            ),
            LifecycleAction::Validate => {
                matches!(self, AuthorisedToValidate | WaitingAuthorisationToValidate)
            }
            LifecycleAction::Capture => matches!(self, Authorised),
            LifecycleAction::Refund => self.is_captured(),
            LifecycleAction::Duplicate => !matches!(self, Initial | NotCreated | Error),
        }
    }

    /// Coarse outcome of this status on `provider`
    pub fn payment_status(&self, provider: Provider) -> PaymentStatus {
        use TransactionStatus::*;

        match self {
            // PayZen remits authorised payments automatically; elsewhere the
            // funds are only reserved until captured.
            Authorised => match provider {
                Provider::PayZen => PaymentStatus::Paid,
                Provider::Pagarme | Provider::Iugu => PaymentStatus::WaitingPayment,
            },
            Captured => PaymentStatus::Paid,
            Initial
            | AuthorisedToValidate
            | WaitingAuthorisation
            | WaitingAuthorisationToValidate
            | UnderVerification => PaymentStatus::WaitingPayment,
            NotCreated | Refused => PaymentStatus::Refused,
            Cancelled => PaymentStatus::Cancelled,
            Expired => PaymentStatus::Expired,
            Refunded => PaymentStatus::Refunded,
            Chargeback => PaymentStatus::Chargeback,
            PartiallyRefunded | PartiallyPaid | InProtest => PaymentStatus::Other,
            Success => PaymentStatus::Success,
            Error => PaymentStatus::Error,
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Native label table of one provider
#[derive(Debug)]
pub struct StatusTable {
    pub provider: Provider,
    entries: &'static [(&'static str, TransactionStatus)],
}

static PAYZEN_STATUSES: &[(&str, TransactionStatus)] = &[
    ("INITIAL", TransactionStatus::Initial),
    ("NOT_CREATED", TransactionStatus::NotCreated),
    ("AUTHORISED", TransactionStatus::Authorised),
    ("AUTHORISED_TO_VALIDATE", TransactionStatus::AuthorisedToValidate),
    ("WAITING_AUTHORISATION", TransactionStatus::WaitingAuthorisation),
    (
        "WAITING_AUTHORISATION_TO_VALIDATE",
        TransactionStatus::WaitingAuthorisationToValidate,
    ),
    ("REFUSED", TransactionStatus::Refused),
    ("CAPTURED", TransactionStatus::Captured),
    ("CANCELLED", TransactionStatus::Cancelled),
    ("EXPIRED", TransactionStatus::Expired),
    ("UNDER_VERIFICATION", TransactionStatus::UnderVerification),
];

// Charge and transaction statuses
static PAGARME_STATUSES: &[(&str, TransactionStatus)] = &[
    ("pending", TransactionStatus::WaitingAuthorisation),
    ("generated", TransactionStatus::WaitingAuthorisation),
    ("waiting_payment", TransactionStatus::WaitingAuthorisation),
    ("processing", TransactionStatus::UnderVerification),
    ("authorized_pending_capture", TransactionStatus::Authorised),
    ("waiting_capture", TransactionStatus::Authorised),
    ("paid", TransactionStatus::Captured),
    ("captured", TransactionStatus::Captured),
    ("overpaid", TransactionStatus::Captured),
    ("underpaid", TransactionStatus::PartiallyPaid),
    ("partial_capture", TransactionStatus::PartiallyPaid),
    ("canceled", TransactionStatus::Cancelled),
    ("voided", TransactionStatus::Cancelled),
    ("failed", TransactionStatus::Refused),
    ("not_authorized", TransactionStatus::Refused),
    ("refunded", TransactionStatus::Refunded),
    ("partial_refunded", TransactionStatus::PartiallyRefunded),
    ("chargedback", TransactionStatus::Chargeback),
    ("with_error", TransactionStatus::Error),
];

// Invoice statuses
static IUGU_STATUSES: &[(&str, TransactionStatus)] = &[
    ("draft", TransactionStatus::Initial),
    ("pending", TransactionStatus::WaitingAuthorisation),
    ("in_analysis", TransactionStatus::UnderVerification),
    ("authorized", TransactionStatus::Authorised),
    ("paid", TransactionStatus::Captured),
    ("partially_paid", TransactionStatus::PartiallyPaid),
    ("canceled", TransactionStatus::Cancelled),
    ("expired", TransactionStatus::Expired),
    ("refunded", TransactionStatus::Refunded),
    ("partially_refunded", TransactionStatus::PartiallyRefunded),
    ("in_protest", TransactionStatus::InProtest),
    ("chargeback", TransactionStatus::Chargeback),
];

static PAYZEN_TABLE: StatusTable = StatusTable {
    provider: Provider::PayZen,
    entries: PAYZEN_STATUSES,
};

static PAGARME_TABLE: StatusTable = StatusTable {
    provider: Provider::Pagarme,
    entries: PAGARME_STATUSES,
};

static IUGU_TABLE: StatusTable = StatusTable {
    provider: Provider::Iugu,
    entries: IUGU_STATUSES,
};

impl StatusTable {
    pub fn for_provider(provider: Provider) -> &'static StatusTable {
        match provider {
            Provider::PayZen => &PAYZEN_TABLE,
            Provider::Pagarme => &PAGARME_TABLE,
            Provider::Iugu => &IUGU_TABLE,
        }
    }

    /// Map a native label onto the canonical status
    pub fn resolve(&self, label: &str) -> Result<TransactionStatus, DomainError> {
        let label = label.trim();
        self.entries
            .iter()
            .find(|(native, _)| *native == label)
            .map(|(_, status)| *status)
            .ok_or_else(|| DomainError::UnmappedStatus {
                provider: self.provider,
                label: label.to_string(),
            })
    }

    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(native, _)| *native)
    }
}

/// Resolve a provider label into both canonical taxonomies
pub fn resolve_status(
    provider: Provider,
    label: &str,
) -> Result<(TransactionStatus, PaymentStatus), DomainError> {
    let status = StatusTable::for_provider(provider).resolve(label)?;
    Ok((status, status.payment_status(provider)))
}
