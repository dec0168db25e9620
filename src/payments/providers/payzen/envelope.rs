//! Signed request envelopes
//!
//! The header is serialized with `quick-xml`, the operation payload under a
//! `v5:`-prefixed root, and both are spliced into the SOAP envelope.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::auth::{Direction, Signer};
use super::config::PayzenConfig;
use super::models::*;
use super::operation::{Operation, OperationKind};
use crate::error::{AppError, AppResult, InfrastructureError};
use crate::payments::amount;
use crate::payments::types::{
    CardDetails, Customer, CustomerType, PaymentInstrument, PaymentScheme,
};

/// Wire timestamp format, always UTC
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Name-based UUID derived from the request timestamp
pub fn request_id_for(timestamp: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, timestamp.as_bytes()).to_string()
}

/// One signed call, built per request and discarded afterwards
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    pub kind: OperationKind,
    pub header: RequestHeader,
    body: String,
}

impl RequestEnvelope {
    pub fn build(
        config: &PayzenConfig,
        signer: &Signer,
        operation: &Operation,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let timestamp = format_timestamp(now);
        let request_id = request_id_for(&timestamp);
        let auth_token = signer.generate_token(&request_id, &timestamp, Direction::Request);

        let header = RequestHeader {
            shop_id: config.shop_id.clone(),
            request_id,
            timestamp,
            mode: config.mode.as_str().to_string(),
            auth_token,
        };

        let body = PayloadBuilder {
            config,
            timestamp: &header.timestamp,
        }
        .build(operation)?;

        Ok(Self {
            kind: operation.kind(),
            header,
            body,
        })
    }

    /// SOAP action advertised with the request
    pub fn soap_action(&self) -> &'static str {
        self.kind.element()
    }

    pub fn to_xml(&self) -> AppResult<String> {
        let header = quick_xml::se::to_string_with_root("soapenv:Header", &self.header)
            .map_err(|e| serialization_error("request header", e))?;

        Ok(format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<soapenv:Envelope xmlns:soapenv="{}" xmlns:soapHeader="{}" xmlns:v5="{}">"#,
                "{}<soapenv:Body>{}</soapenv:Body></soapenv:Envelope>"
            ),
            SOAP_ENV_NS, HEADER_NS, BODY_NS, header, self.body
        ))
    }
}

fn serialization_error(what: &str, err: impl std::fmt::Display) -> AppError {
    AppError::new(InfrastructureError::Serialization {
        what: what.to_string(),
        message: err.to_string(),
    })
}

struct PayloadBuilder<'a> {
    config: &'a PayzenConfig,
    timestamp: &'a str,
}

impl PayloadBuilder<'_> {
    fn build(&self, operation: &Operation) -> AppResult<String> {
        let kind = operation.kind();

        match operation {
            Operation::CreatePayment(request) => self.serialize(
                kind,
                &CreatePaymentPayload {
                    common_request: self.common(),
                    payment_request: PaymentRequestBody {
                        manual_validation: Some(u8::from(request.manual_validation)),
                        expected_capture_date: request.expected_capture_date.map(format_timestamp),
                        payment_option_code: request
                            .installments
                            .filter(|count| *count > 1)
                            .map(|count| count.to_string()),
                        ..self.payment(request.amount)?
                    },
                    order_request: OrderRequest {
                        order_id: request.order_id.clone(),
                        ext_info: ext_info(request.metadata.as_ref()),
                    },
                    card_request: match &request.instrument {
                        PaymentInstrument::Card(card) => card_request(card),
                        PaymentInstrument::Token(token) => token_reference(token),
                        PaymentInstrument::Boleto => CardRequest {
                            scheme: Some(PaymentScheme::Boleto.code().to_string()),
                            ..Default::default()
                        },
                    },
                    customer_request: customer_request(&request.customer),
                },
            ),
            Operation::UpdatePayment(update) => {
                let mut payment = match update.amount {
                    Some(value) => self.payment(value)?,
                    None => PaymentRequestBody::default(),
                };
                payment.expected_capture_date = update.expected_capture_date.map(format_timestamp);
                payment.manual_validation = update.manual_validation.map(u8::from);

                self.serialize(
                    kind,
                    &UpdatePaymentPayload {
                        common_request: self.common(),
                        query_request: by_uuid(&update.transaction_uuid),
                        payment_request: payment,
                    },
                )
            }
            Operation::CancelPayment { transaction_uuid }
            | Operation::ValidatePayment { transaction_uuid } => self.serialize(
                kind,
                &CommonQueryPayload {
                    common_request: self.common(),
                    query_request: by_uuid(transaction_uuid),
                },
            ),
            Operation::DuplicatePayment(request) => self.serialize(
                kind,
                &DuplicatePaymentPayload {
                    common_request: self.common(),
                    payment_request: self.payment(request.amount)?,
                    order_request: OrderRequest {
                        order_id: request.order_id.clone(),
                        ext_info: Vec::new(),
                    },
                    query_request: by_uuid(&request.transaction_uuid),
                },
            ),
            Operation::CapturePayment { transaction_uuids } => self.serialize(
                kind,
                &CapturePaymentPayload {
                    settlement_request: SettlementRequest {
                        transaction_uuids: transaction_uuids
                            .iter()
                            .filter(|uuid| !uuid.trim().is_empty())
                            .cloned()
                            .collect(),
                        date: Some(self.timestamp.to_string()),
                    },
                },
            ),
            Operation::RefundPayment {
                transaction_uuid,
                amount,
            } => self.serialize(
                kind,
                &RefundPaymentPayload {
                    common_request: self.common(),
                    payment_request: self.payment(*amount)?,
                    query_request: by_uuid(transaction_uuid),
                },
            ),
            Operation::CreateToken(request) => self.serialize(
                kind,
                &CreateTokenPayload {
                    common_request: self.common(),
                    card_request: card_request(&request.card),
                    customer_request: customer_request(&request.customer),
                },
            ),
            Operation::UpdateToken {
                token,
                card,
                customer,
            } => self.serialize(
                kind,
                &UpdateTokenPayload {
                    common_request: self.common(),
                    query_request: by_token(token),
                    card_request: card.as_ref().map(card_request),
                    customer_request: customer.as_ref().map(customer_request),
                },
            ),
            Operation::CancelToken { token } | Operation::ReactivateToken { token } => self
                .serialize(
                    kind,
                    &CommonQueryPayload {
                        common_request: self.common(),
                        query_request: by_token(token),
                    },
                ),
            Operation::GetTokenDetails { token } => self.serialize(
                kind,
                &QueryPayload {
                    query_request: by_token(token),
                },
            ),
            Operation::FindPayments { order_id } => self.serialize(
                kind,
                &QueryPayload {
                    query_request: QueryRequest {
                        order_id: Some(order_id.clone()),
                        ..Default::default()
                    },
                },
            ),
            Operation::GetPaymentDetails { transaction_uuid } => self.serialize(
                kind,
                &QueryPayload {
                    query_request: by_uuid(transaction_uuid),
                },
            ),
            Operation::CreateSubscription(request) => self.serialize(
                kind,
                &CreateSubscriptionPayload {
                    common_request: self.common(),
                    order_request: OrderRequest {
                        order_id: request.order_id.clone(),
                        ext_info: Vec::new(),
                    },
                    subscription_request: SubscriptionRequestBody {
                        subscription_id: None,
                        effect_date: format_timestamp(request.effect_date),
                        amount: Some(amount::to_wire(request.amount)?),
                        currency: Some(self.config.currency.clone()),
                        initial_amount: request.initial_amount.map(amount::to_wire).transpose()?,
                        initial_amount_number: request.initial_amount_count,
                        rrule: Some(request.rule.clone()),
                        description: request.description.clone(),
                    },
                    card_request: token_reference(&request.token),
                },
            ),
            Operation::GetSubscriptionDetails {
                subscription_id,
                token,
            } => self.serialize(
                kind,
                &QueryPayload {
                    query_request: by_subscription(subscription_id, token),
                },
            ),
            Operation::CancelSubscription {
                subscription_id,
                token,
            } => self.serialize(
                kind,
                &CommonQueryPayload {
                    common_request: self.common(),
                    query_request: by_subscription(subscription_id, token),
                },
            ),
            Operation::UpdateSubscription(update) => self.serialize(
                kind,
                &UpdateSubscriptionPayload {
                    common_request: self.common(),
                    query_request: by_subscription(&update.subscription_id, &update.token),
                    subscription_request: SubscriptionRequestBody {
                        subscription_id: Some(update.subscription_id.clone()),
                        effect_date: format_timestamp(update.effect_date),
                        amount: update.amount.map(amount::to_wire).transpose()?,
                        currency: update.amount.map(|_| self.config.currency.clone()),
                        initial_amount: None,
                        initial_amount_number: None,
                        rrule: update.rule.clone(),
                        description: update.description.clone(),
                    },
                },
            ),
        }
    }

    fn serialize<T: Serialize>(&self, kind: OperationKind, payload: &T) -> AppResult<String> {
        quick_xml::se::to_string_with_root(&format!("v5:{}", kind.element()), payload)
            .map_err(|e| serialization_error(kind.element(), e))
    }

    fn common(&self) -> CommonRequest {
        CommonRequest {
            payment_source: Some("EC".to_string()),
            submission_date: Some(self.timestamp.to_string()),
            ..Default::default()
        }
    }

    fn payment(&self, value: f64) -> AppResult<PaymentRequestBody> {
        Ok(PaymentRequestBody {
            amount: Some(amount::to_wire(value)?),
            currency: Some(self.config.currency.clone()),
            ..Default::default()
        })
    }
}

fn by_uuid(uuid: &str) -> QueryRequest {
    QueryRequest {
        uuid: Some(uuid.to_string()),
        ..Default::default()
    }
}

fn by_token(token: &str) -> QueryRequest {
    QueryRequest {
        payment_token: Some(token.to_string()),
        ..Default::default()
    }
}

fn by_subscription(subscription_id: &str, token: &str) -> QueryRequest {
    QueryRequest {
        subscription_id: Some(subscription_id.to_string()),
        payment_token: Some(token.to_string()),
        ..Default::default()
    }
}

fn card_request(card: &CardDetails) -> CardRequest {
    CardRequest {
        number: Some(card.number.chars().filter(|c| !c.is_whitespace()).collect()),
        scheme: Some(card.scheme.code().to_string()),
        expiry_month: Some(card.expiry_month),
        expiry_year: Some(card.expiry_year),
        card_security_code: card.security_code.clone(),
        card_holder_name: card.holder_name.clone(),
        payment_token: None,
    }
}

fn token_reference(token: &str) -> CardRequest {
    CardRequest {
        payment_token: Some(token.to_string()),
        ..Default::default()
    }
}

fn customer_request(customer: &Customer) -> CustomerRequest {
    CustomerRequest {
        billing_details: BillingDetails {
            reference: customer.reference.clone(),
            customer_type: customer.customer_type.map(|t| {
                match t {
                    CustomerType::Private => "PRIVATE",
                    CustomerType::Company => "COMPANY",
                }
                .to_string()
            }),
            first_name: customer.first_name.clone(),
            last_name: customer.last_name.clone(),
            phone_number: customer.phone_number.clone(),
            email: customer.email.clone(),
            street_number: customer.street_number.clone(),
            address: customer.address.clone(),
            district: customer.district.clone(),
            zip_code: customer.zip_code.clone(),
            city: customer.city.clone(),
            state: customer.state.clone(),
            country: customer.country.clone(),
            language: customer.language.clone(),
            cell_phone_number: customer.cell_phone_number.clone(),
            legal_name: customer.legal_name.clone(),
            identity_code: customer.identity_code.clone(),
        },
    }
}

/// Flat JSON object metadata becomes order ext-info pairs
fn ext_info(metadata: Option<&serde_json::Value>) -> Vec<ExtInfo> {
    let Some(serde_json::Value::Object(map)) = metadata else {
        return Vec::new();
    };

    map.iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| ExtInfo {
            key: key.clone(),
            value: match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::payments::types::PaymentRequest;

    fn config() -> PayzenConfig {
        PayzenConfig {
            shop_id: "91335531".to_string(),
            test_key: "7193867243045890".to_string(),
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn boleto_payment() -> Operation {
        Operation::CreatePayment(PaymentRequest {
            order_id: "order-42".to_string(),
            amount: 10.5,
            instrument: PaymentInstrument::Boleto,
            customer: Customer {
                email: Some("buyer@example.com".to_string()),
                identity_code: Some("12345678909".to_string()),
                customer_type: Some(CustomerType::Private),
                ..Default::default()
            },
            installments: None,
            manual_validation: false,
            expected_capture_date: None,
            metadata: Some(serde_json::json!({ "cart": "c-1", "items": 3 })),
        })
    }

    fn build(operation: &Operation) -> RequestEnvelope {
        let config = config();
        let signer = Signer::new(config.signing_key());
        RequestEnvelope::build(&config, &signer, operation, now()).unwrap()
    }

    #[test]
    fn test_header_is_signed_and_deterministic() {
        let envelope = build(&boleto_payment());
        let header = &envelope.header;

        assert_eq!(header.timestamp, "2024-03-01T12:00:00Z");
        assert_eq!(header.request_id, request_id_for("2024-03-01T12:00:00Z"));
        assert_eq!(header.mode, "TEST");
        assert_eq!(
            header.auth_token,
            Signer::new("7193867243045890").generate_token(
                &header.request_id,
                &header.timestamp,
                Direction::Request
            )
        );

        assert_eq!(build(&boleto_payment()).header, envelope.header);
    }

    #[test]
    fn test_request_id_is_a_v5_uuid() {
        let id = Uuid::parse_str(&request_id_for("2024-03-01T12:00:00Z")).unwrap();
        assert_eq!(id.get_version_num(), 5);
        assert_ne!(
            request_id_for("2024-03-01T12:00:00Z"),
            request_id_for("2024-03-01T12:00:01Z")
        );
    }

    #[test]
    fn test_create_payment_envelope() {
        let xml = build(&boleto_payment()).to_xml().unwrap();

        assert!(xml.contains(r#"xmlns:v5="http://v5.ws.vads.lyra.com/""#));
        assert!(xml.contains("<soapHeader:shopId>91335531</soapHeader:shopId>"));
        assert!(xml.contains("<soapenv:Body><v5:createPayment>"));
        assert!(xml.contains("<amount>1050</amount>"));
        assert!(xml.contains("<currency>986</currency>"));
        assert!(xml.contains("<manualValidation>0</manualValidation>"));
        assert!(xml.contains("<orderId>order-42</orderId>"));
        assert!(xml.contains("<scheme>BOLETO</scheme>"));
        assert!(xml.contains("<type>PRIVATE</type>"));
        assert!(xml.contains("<identityCode>12345678909</identityCode>"));
        assert!(xml.contains("<extInfo><key>cart</key><value>c-1</value></extInfo>"));
        assert!(xml.contains("<extInfo><key>items</key><value>3</value></extInfo>"));

        // commonRequest, paymentRequest, orderRequest, cardRequest, customerRequest
        let positions: Vec<usize> = [
            "<commonRequest>",
            "<paymentRequest>",
            "<orderRequest>",
            "<cardRequest>",
            "<customerRequest>",
        ]
        .iter()
        .map(|tag| xml.find(tag).unwrap())
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_values_are_escaped() {
        let xml = build(&Operation::FindPayments {
            order_id: "a<b&c".to_string(),
        })
        .to_xml()
        .unwrap();
        assert!(xml.contains("<orderId>a&lt;b&amp;c</orderId>"));
        assert!(xml.contains("<v5:findPayments><queryRequest>"));
    }

    #[test]
    fn test_capture_lists_every_uuid() {
        let xml = build(&Operation::CapturePayment {
            transaction_uuids: vec!["u1".to_string(), "u2".to_string()],
        })
        .to_xml()
        .unwrap();
        assert!(xml.contains("<transactionUuids>u1</transactionUuids>"));
        assert!(xml.contains("<transactionUuids>u2</transactionUuids>"));
    }

    #[test]
    fn test_invalid_amount_fails_construction() {
        let config = config();
        let signer = Signer::new(config.signing_key());
        let operation = Operation::RefundPayment {
            transaction_uuid: "uuid".to_string(),
            amount: f64::NAN,
        };
        assert!(RequestEnvelope::build(&config, &signer, &operation, now()).is_err());
    }

    #[test]
    fn test_ext_info_ignores_non_objects() {
        assert!(ext_info(Some(&serde_json::json!(["a"]))).is_empty());
        assert!(ext_info(None).is_empty());
    }
}
