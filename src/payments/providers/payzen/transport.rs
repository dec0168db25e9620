//! HTTP transport for SOAP envelopes
//!
//! One POST per call and no retries. Raw payloads are always kept: on success
//! they travel with the [`Exchange`], on failure inside the transport error.

use std::time::Duration;

use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use tracing::{debug, error};

use crate::error::{AppError, AppResult, ExternalError, InfrastructureError};
use crate::payments::types::Provider;

pub const SOAP_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Raw payloads of one successful round trip
#[derive(Debug, Clone)]
pub struct Exchange {
    pub raw_request: String,
    pub raw_response: String,
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    log_payloads: bool,
}

impl HttpTransport {
    pub fn new(timeout_secs: u64, log_payloads: bool) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                AppError::new(InfrastructureError::HttpClient {
                    message: e.to_string(),
                })
            })?;

        Ok(Self {
            client,
            log_payloads,
        })
    }

    /// POST `body` and hand back both payloads; anything but HTTP 200 is an error
    pub async fn post(
        &self,
        endpoint: &str,
        soap_action: &str,
        body: String,
    ) -> AppResult<Exchange> {
        if self.log_payloads {
            debug!(endpoint, soap_action, payload = %body, "PayZen request");
        }

        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, HeaderValue::from_static(SOAP_CONTENT_TYPE))
            .header("SOAPAction", format!("\"{}\"", soap_action))
            .body(body.clone())
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                error!("PayZen request to {} failed: {}", endpoint, e);
                return Err(transport_error(None, e.to_string(), body, None));
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to read PayZen response body: {}", e);
                return Err(transport_error(Some(status.as_u16()), e.to_string(), body, None));
            }
        };

        if self.log_payloads {
            debug!(status = status.as_u16(), payload = %text, "PayZen response");
        }

        if status != reqwest::StatusCode::OK {
            error!("PayZen returned HTTP {}", status);
            return Err(transport_error(
                Some(status.as_u16()),
                status.canonical_reason().unwrap_or("unexpected status").to_string(),
                body,
                Some(text),
            ));
        }

        Ok(Exchange {
            raw_request: body,
            raw_response: text,
        })
    }

    /// POST an url-encoded form; the reply may be binary
    #[cfg(feature = "boleto-form")]
    pub async fn post_form(&self, endpoint: &str, body: String) -> AppResult<FormExchange> {
        if self.log_payloads {
            debug!(endpoint, payload = %body, "PayZen form request");
        }

        let response = self
            .client
            .post(endpoint)
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .body(body.clone())
            .send()
            .await
            .map_err(|e| {
                error!("PayZen form post to {} failed: {}", endpoint, e);
                transport_error(None, e.to_string(), body.clone(), None)
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| {
                transport_error(Some(status.as_u16()), e.to_string(), body.clone(), None)
            })?;

        if status != reqwest::StatusCode::OK {
            error!("PayZen form endpoint returned HTTP {}", status);
            return Err(transport_error(
                Some(status.as_u16()),
                status.canonical_reason().unwrap_or("unexpected status").to_string(),
                body,
                Some(String::from_utf8_lossy(&bytes).into_owned()),
            ));
        }

        Ok(FormExchange {
            raw_request: body,
            content_type,
            body: bytes.to_vec(),
        })
    }
}

/// Raw reply of a form submission
#[cfg(feature = "boleto-form")]
#[derive(Debug, Clone)]
pub struct FormExchange {
    pub raw_request: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

fn transport_error(
    status: Option<u16>,
    reason: String,
    raw_request: String,
    raw_response: Option<String>,
) -> AppError {
    AppError::new(ExternalError::Transport {
        provider: Provider::PayZen,
        status,
        reason,
        raw_request,
        raw_response,
    })
}
