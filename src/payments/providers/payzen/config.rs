use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Web service endpoint, shared by both modes unless overridden
pub const DEFAULT_WS_ENDPOINT: &str = "https://secure.payzen.com.br/vads-ws/v5";
/// Form-redirect payment endpoint
pub const DEFAULT_FORM_ENDPOINT: &str = "https://secure.payzen.com.br/vads-payment/";
/// ISO-4217 numeric code for BRL
pub const DEFAULT_CURRENCY: &str = "986";

/// Account mode, sent in every request header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    #[default]
    #[serde(alias = "test")]
    Test,
    #[serde(alias = "production")]
    Production,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Test => "TEST",
            Mode::Production => "PRODUCTION",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PayZen account configuration
///
/// Immutable once the client is built; behaviour that used to be toggled per
/// call (payload logging) lives here.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PayzenConfig {
    pub shop_id: String,
    /// Shared secret used in `Test` mode
    pub test_key: String,
    /// Shared secret used in `Production` mode
    pub production_key: String,
    pub mode: Mode,
    pub test_endpoint: String,
    pub production_endpoint: String,
    pub form_endpoint: String,
    /// ISO-4217 numeric currency code
    pub currency: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Log raw SOAP payloads at debug level
    pub log_payloads: bool,
}

impl Default for PayzenConfig {
    fn default() -> Self {
        Self {
            shop_id: String::new(),
            test_key: String::new(),
            production_key: String::new(),
            mode: Mode::Test,
            test_endpoint: DEFAULT_WS_ENDPOINT.to_string(),
            production_endpoint: DEFAULT_WS_ENDPOINT.to_string(),
            form_endpoint: DEFAULT_FORM_ENDPOINT.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            timeout_secs: 30,
            log_payloads: false,
        }
    }
}

impl fmt::Debug for PayzenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayzenConfig")
            .field("shop_id", &self.shop_id)
            .field("test_key", &"<redacted>")
            .field("production_key", &"<redacted>")
            .field("mode", &self.mode)
            .field("test_endpoint", &self.test_endpoint)
            .field("production_endpoint", &self.production_endpoint)
            .field("form_endpoint", &self.form_endpoint)
            .field("currency", &self.currency)
            .field("timeout_secs", &self.timeout_secs)
            .field("log_payloads", &self.log_payloads)
            .finish()
    }
}

impl PayzenConfig {
    /// Shared secret for the configured mode
    pub fn signing_key(&self) -> &str {
        match self.mode {
            Mode::Test => &self.test_key,
            Mode::Production => &self.production_key,
        }
    }

    /// Web service endpoint for the configured mode
    pub fn endpoint(&self) -> &str {
        match self.mode {
            Mode::Test => &self.test_endpoint,
            Mode::Production => &self.production_endpoint,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.shop_id.trim().is_empty() {
            return Err(AppError::configuration("PayZen shop_id cannot be empty"));
        }

        if self.signing_key().trim().is_empty() {
            return Err(AppError::configuration(format!(
                "PayZen key for {} mode cannot be empty",
                self.mode
            )));
        }

        if self.endpoint().trim().is_empty() || self.form_endpoint.trim().is_empty() {
            return Err(AppError::configuration("PayZen endpoints cannot be empty"));
        }

        if self.currency.len() != 3 || !self.currency.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AppError::configuration(format!(
                "PayZen currency must be an ISO-4217 numeric code, got '{}'",
                self.currency
            )));
        }

        if self.timeout_secs == 0 {
            return Err(AppError::configuration(
                "PayZen timeout_secs must be greater than 0",
            ));
        }

        Ok(())
    }
}
