//! Application error types
//!
//! Every fallible operation in the crate returns [`AppResult`]. Protocol-level
//! failures reported by a provider (non-zero response codes, bad response
//! signatures, business refusals) are not errors here: they are carried on the
//! returned `PaymentResult` instead.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::payments::types::Provider;

/// Result type for application operations
pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Error)]
pub enum AppErrorKind {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    External(#[from] ExternalError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),
}

/// Errors raised by remote systems or while talking to them
#[derive(Debug, Clone, Error)]
pub enum ExternalError {
    /// Non-200 reply or connection failure. The raw payloads are kept for audit.
    #[error("{provider} transport error: {}", describe_status(.status, .reason))]
    Transport {
        provider: Provider,
        status: Option<u16>,
        reason: String,
        raw_request: String,
        raw_response: Option<String>,
    },

    #[error("{provider} returned a malformed response: {message}")]
    MalformedResponse { provider: Provider, message: String },
}

fn describe_status(status: &Option<u16>, reason: &str) -> String {
    match status {
        Some(code) => format!("HTTP {} {}", code, reason),
        None => reason.to_string(),
    }
}

/// Errors in the payment domain itself
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{provider} status label '{label}' is not part of the known vocabulary")]
    UnmappedStatus { provider: Provider, label: String },

    #[error("invalid amount: {message}")]
    InvalidAmount { message: String },

    #[error(transparent)]
    Recurrence(#[from] RecurrenceError),
}

/// Subscription recurrence rule builder errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecurrenceError {
    #[error("cycle is required")]
    CycleRequired,

    #[error("unknown cycle '{0}'")]
    UnknownCycle(String),

    #[error("day of month and last day of month are mutually exclusive")]
    ConflictingMonthDay,

    #[error("day of month must be between 1 and 31, got {0}")]
    InvalidMonthDay(u8),
}

#[derive(Debug, Clone, Error)]
pub enum InfrastructureError {
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("http client error: {message}")]
    HttpClient { message: String },

    #[error("failed to serialize {what}: {message}")]
    Serialization { what: String, message: String },
}

/// Pre-flight validation failures, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.insert(field.into(), message.into());
    }

    /// Record `message` against `field` when `value` is missing or blank
    pub fn require<S: AsRef<str>>(&mut self, field: &str, value: Option<S>, message: &str) {
        if value.as_ref().map_or(true, |v| v.as_ref().trim().is_empty()) {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Turn the collected failures into an error, or `Ok(())` when there are none
    pub fn into_result(self) -> AppResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::new(AppErrorKind::Validation(self)))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed")?;
        let mut sep = ": ";
        for (field, message) in &self.fields {
            write!(f, "{}{}: {}", sep, field, message)?;
            sep = ", ";
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl AppError {
    pub fn new(kind: impl Into<AppErrorKind>) -> Self {
        Self {
            kind: kind.into(),
            context: None,
        }
    }

    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(InfrastructureError::Configuration {
            message: message.into(),
        })
    }

    pub fn malformed(provider: Provider, message: impl Into<String>) -> Self {
        Self::new(ExternalError::MalformedResponse {
            provider,
            message: message.into(),
        })
    }

    pub fn invalid_amount(message: impl Into<String>) -> Self {
        Self::new(DomainError::InvalidAmount {
            message: message.into(),
        })
    }

    /// Only transport failures without a status or with a 5xx status are worth retrying
    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            AppErrorKind::External(ExternalError::Transport { status, .. }) => {
                status.map_or(true, |code| (500..600).contains(&code))
            }
            _ => false,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self.kind, AppErrorKind::Validation(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(
            self.kind,
            AppErrorKind::External(ExternalError::Transport { .. })
        )
    }

    pub fn is_unmapped_status(&self) -> bool {
        matches!(
            self.kind,
            AppErrorKind::Domain(DomainError::UnmappedStatus { .. })
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(context) => write!(f, "{} ({})", self.kind, context),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<AppErrorKind> for AppError {
    fn from(kind: AppErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        Self::new(err)
    }
}

impl From<ExternalError> for AppError {
    fn from(err: ExternalError) -> Self {
        Self::new(err)
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        Self::new(err)
    }
}

impl From<RecurrenceError> for AppError {
    fn from(err: RecurrenceError) -> Self {
        Self::new(DomainError::from(err))
    }
}

impl From<InfrastructureError> for AppError {
    fn from(err: InfrastructureError) -> Self {
        Self::new(err)
    }
}
