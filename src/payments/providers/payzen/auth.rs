//! Request/response authentication tokens
//!
//! Every envelope carries an `authToken`: base64(HMAC-SHA256(secret, message)),
//! where the message is `requestId + timestamp` on the way out and
//! `timestamp + requestId` when checking what came back.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::models::{RequestHeader, ResponseHeader};

type HmacSha256 = Hmac<Sha256>;

/// Which way the token travels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Request,
    Response,
}

/// Stateless signer bound to one shared secret
///
/// Safe to share between tasks: the secret is never mutated after construction.
#[derive(Clone)]
pub struct Signer {
    secret: String,
}

impl Signer {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn generate_token(
        &self,
        request_id: &str,
        timestamp: &str,
        direction: Direction,
    ) -> String {
        let message = match direction {
            Direction::Request => format!("{}{}", request_id, timestamp),
            Direction::Response => format!("{}{}", timestamp, request_id),
        };
        self.sign(message.as_bytes())
    }

    /// Check the token of a response header and that it echoes the request
    ///
    /// The token only covers the request id and the timestamp, so the shop id
    /// and mode are compared against what was sent.
    pub fn validate_response_header(&self, header: &ResponseHeader, sent: &RequestHeader) -> bool {
        if header.shop_id != sent.shop_id || header.mode != sent.mode {
            return false;
        }

        let expected =
            self.generate_token(&header.request_id, &header.timestamp, Direction::Response);
        constant_time_eq(expected.as_bytes(), header.auth_token.trim().as_bytes())
    }

    /// Signature of a redirect form
    ///
    /// Values of the `vads_` fields, sorted by field name, joined with `+`,
    /// followed by `+` and the secret.
    pub fn generate_form_token(&self, fields: &BTreeMap<String, String>) -> String {
        let mut message = String::new();
        for (_, value) in fields.iter().filter(|(key, _)| key.starts_with("vads_")) {
            message.push_str(value);
            message.push('+');
        }
        message.push_str(&self.secret);
        self.sign(message.as_bytes())
    }

    fn sign(&self, message: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(message);
        BASE64.encode(mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Signer(<redacted>)")
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}
