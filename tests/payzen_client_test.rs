//! End-to-end tests of the PayZen client against a mock SOAP endpoint

use chrono::{TimeZone, Utc};
use multipay_backend::error::{AppErrorKind, ExternalError};
use multipay_backend::payments::providers::payzen::{
    Cycle, Direction, PayzenConfig, PayzenProvider, Recurrence, Signer, HEADER_NOT_VALID,
    REFUSED_MESSAGE,
};
use multipay_backend::payments::status::{PaymentStatus, TransactionStatus};
use multipay_backend::payments::traits::PaymentProvider;
use multipay_backend::payments::types::{
    CardDetails, Customer, PaymentInstrument, PaymentRequest, PaymentScheme, SubscriptionRequest,
    TokenRequest,
};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SHOP_ID: &str = "91335531";
const KEY: &str = "7193867243045890";
const RESPONSE_REQUEST_ID: &str = "5f0f6a44-2b3c-4c1d-9e7f-8a9b0c1d2e3f";
const RESPONSE_TIMESTAMP: &str = "2024-03-01T12:00:01Z";

fn config(server: &MockServer) -> PayzenConfig {
    PayzenConfig {
        shop_id: SHOP_ID.to_string(),
        test_key: KEY.to_string(),
        test_endpoint: format!("{}/vads-ws/v5", server.uri()),
        form_endpoint: format!("{}/vads-payment/", server.uri()),
        timeout_secs: 5,
        log_payloads: true,
        ..Default::default()
    }
}

fn provider(server: &MockServer) -> PayzenProvider {
    PayzenProvider::new(config(server)).unwrap()
}

fn signed_header(timestamp_in_token: &str, timestamp_sent: &str) -> String {
    let token = Signer::new(KEY).generate_token(
        RESPONSE_REQUEST_ID,
        timestamp_in_token,
        Direction::Response,
    );
    format!(
        r#"<soap:Header xmlns:h="http://v5.ws.vads.lyra.com/Header/">
    <h:shopId>{SHOP_ID}</h:shopId>
    <h:requestId>{RESPONSE_REQUEST_ID}</h:requestId>
    <h:timestamp>{timestamp_sent}</h:timestamp>
    <h:mode>TEST</h:mode>
    <h:authToken>{token}</h:authToken>
  </soap:Header>"#
    )
}

fn soap_response(header: &str, operation: &str, result: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  {header}
  <soap:Body>
    <ns2:{operation}Response xmlns:ns2="http://v5.ws.vads.lyra.com/">
      <{operation}Result>
        <requestId>{RESPONSE_REQUEST_ID}</requestId>
        {result}
      </{operation}Result>
    </ns2:{operation}Response>
  </soap:Body>
</soap:Envelope>"#
    )
}

fn signed_response(operation: &str, result: &str) -> String {
    soap_response(
        &signed_header(RESPONSE_TIMESTAMP, RESPONSE_TIMESTAMP),
        operation,
        result,
    )
}

fn common(code: i32, label: Option<&str>) -> String {
    let label = label
        .map(|l| format!("<transactionStatusLabel>{}</transactionStatusLabel>", l))
        .unwrap_or_default();
    format!(
        "<commonResponse><responseCode>{code}</responseCode>\
         <responseCodeDetail>Action successfully completed</responseCodeDetail>{label}\
         <shopId>{SHOP_ID}</shopId></commonResponse>"
    )
}

fn payment_section(uuid: &str, amount: &str) -> String {
    format!(
        "<paymentResponse><transactionId>000042</transactionId>\
         <transactionUuid>{uuid}</transactionUuid><amount>{amount}</amount>\
         <currency>986</currency></paymentResponse>"
    )
}

fn boleto_request() -> PaymentRequest {
    PaymentRequest {
        order_id: "order-42".to_string(),
        amount: 10.5,
        instrument: PaymentInstrument::Boleto,
        customer: Customer {
            first_name: Some("Ana".to_string()),
            last_name: Some("Souza".to_string()),
            email: Some("ana@example.com".to_string()),
            identity_code: Some("12345678909".to_string()),
            ..Default::default()
        },
        installments: None,
        manual_validation: false,
        expected_capture_date: None,
        metadata: None,
    }
}

fn card() -> CardDetails {
    CardDetails {
        number: "4970100000000055".to_string(),
        scheme: PaymentScheme::Visa,
        expiry_month: 12,
        expiry_year: 2030,
        security_code: Some("123".to_string()),
        holder_name: Some("ANA SOUZA".to_string()),
    }
}

fn card_request() -> PaymentRequest {
    PaymentRequest {
        instrument: PaymentInstrument::Card(card()),
        installments: Some(3),
        ..boleto_request()
    }
}

async fn mount(server: &MockServer, operation: &str, status: u16, body: String) {
    Mock::given(method("POST"))
        .and(path("/vads-ws/v5"))
        .and(header("content-type", "text/xml; charset=utf-8"))
        .and(body_string_contains(format!("<v5:{}>", operation)))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

fn between<'a>(text: &'a str, open: &str, close: &str) -> &'a str {
    let start = text.find(open).unwrap() + open.len();
    let end = start + text[start..].find(close).unwrap();
    &text[start..end]
}

#[tokio::test]
async fn test_boleto_creation_returns_boleto_url() {
    let server = MockServer::start().await;
    let result_xml = format!(
        "{}{}<orderResponse><orderId>order-42</orderId>\
         <extInfo><key>boletoUrl</key><value>https://secure.payzen.com.br/boleto/42.pdf</value></extInfo>\
         </orderResponse>",
        common(0, Some("WAITING_AUTHORISATION")),
        payment_section("a1b2c3", "1050"),
    );
    mount(
        &server,
        "createPayment",
        200,
        signed_response("createPayment", &result_xml),
    )
    .await;

    let result = provider(&server)
        .create_payment(boleto_request())
        .await
        .unwrap();

    assert!(!result.is_error(), "{:?}", result.message());
    assert_eq!(
        result.transaction_status,
        Some(TransactionStatus::WaitingAuthorisation)
    );
    assert_eq!(result.payment_status, Some(PaymentStatus::WaitingPayment));
    assert_eq!(
        result.boleto_url.as_deref(),
        Some("https://secure.payzen.com.br/boleto/42.pdf")
    );
    assert_eq!(result.transaction_uuid.as_deref(), Some("a1b2c3"));
    assert_eq!(result.transaction_id.as_deref(), Some("000042"));
    assert_eq!(result.amount, Some(10.5));
    assert_eq!(result.order_id.as_deref(), Some("order-42"));
    assert!(result.raw_request.as_deref().unwrap().contains("<amount>1050</amount>"));
    assert!(result.raw_response.as_deref().unwrap().contains("WAITING_AUTHORISATION"));
}

#[tokio::test]
async fn test_request_header_is_signed() {
    let server = MockServer::start().await;
    let result_xml = format!("{}{}", common(0, Some("AUTHORISED")), payment_section("u", "1050"));
    mount(
        &server,
        "createPayment",
        200,
        signed_response("createPayment", &result_xml),
    )
    .await;

    let result = provider(&server).create_payment(card_request()).await.unwrap();
    assert_eq!(result.payment_status, Some(PaymentStatus::Paid));
    // Card payments never carry a boleto URL
    assert_eq!(result.boleto_url, None);

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();

    let request_id = between(&body, "<soapHeader:requestId>", "</soapHeader:requestId>");
    let timestamp = between(&body, "<soapHeader:timestamp>", "</soapHeader:timestamp>");
    let token = between(&body, "<soapHeader:authToken>", "</soapHeader:authToken>");
    assert_eq!(
        token,
        Signer::new(KEY).generate_token(request_id, timestamp, Direction::Request)
    );
    assert_eq!(between(&body, "<soapHeader:shopId>", "</soapHeader:shopId>"), SHOP_ID);
    assert_eq!(between(&body, "<soapHeader:mode>", "</soapHeader:mode>"), "TEST");
    assert!(body.contains("<paymentOptionCode>3</paymentOptionCode>"));
    assert!(body.contains("<number>4970100000000055</number>"));
    assert_eq!(
        requests[0].headers.get("SOAPAction").unwrap().to_str().unwrap(),
        "\"createPayment\""
    );
}

#[tokio::test]
async fn test_refused_payment_is_a_business_refusal() {
    let server = MockServer::start().await;
    let result_xml = format!("{}{}", common(0, Some("REFUSED")), payment_section("r1", "1050"));
    mount(
        &server,
        "createPayment",
        200,
        signed_response("createPayment", &result_xml),
    )
    .await;

    let result = provider(&server).create_payment(card_request()).await.unwrap();

    assert!(result.is_error());
    assert_eq!(result.response_code, Some(0));
    assert_eq!(result.transaction_status, Some(TransactionStatus::Refused));
    assert_eq!(result.payment_status, Some(PaymentStatus::Refused));
    assert_eq!(result.message(), Some(REFUSED_MESSAGE));
}

#[tokio::test]
async fn test_http_500_is_a_transport_error() {
    let server = MockServer::start().await;
    mount(&server, "createPayment", 500, "Internal Server Error".to_string()).await;

    let err = provider(&server)
        .create_payment(boleto_request())
        .await
        .unwrap_err();

    assert!(err.is_transport());
    match err.kind {
        AppErrorKind::External(ExternalError::Transport {
            status,
            raw_request,
            raw_response,
            ..
        }) => {
            assert_eq!(status, Some(500));
            assert!(raw_request.contains("<v5:createPayment>"));
            assert_eq!(raw_response.as_deref(), Some("Internal Server Error"));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_tampered_header_timestamp_invalidates_response() {
    let server = MockServer::start().await;
    let result_xml = format!("{}{}", common(0, Some("AUTHORISED")), payment_section("t1", "1050"));
    let body = soap_response(
        &signed_header(RESPONSE_TIMESTAMP, "2024-03-01T12:00:09Z"),
        "createPayment",
        &result_xml,
    );
    mount(&server, "createPayment", 200, body).await;

    let result = provider(&server).create_payment(card_request()).await.unwrap();

    assert!(result.is_error());
    assert_eq!(result.message(), Some(HEADER_NOT_VALID));
    assert_eq!(result.transaction_status, None);
    assert_eq!(result.transaction_uuid, None);
}

#[tokio::test]
async fn test_non_zero_response_code() {
    let server = MockServer::start().await;
    let result_xml = "<commonResponse><responseCode>13</responseCode>\
                      <responseCodeDetail>Invalid amount</responseCodeDetail></commonResponse>";
    mount(
        &server,
        "refundPayment",
        200,
        signed_response("refundPayment", result_xml),
    )
    .await;

    let result = provider(&server)
        .refund_payment("a1b2c3", 5.0)
        .await
        .unwrap();

    assert!(result.is_error());
    assert_eq!(result.response_code, Some(13));
    assert_eq!(result.message(), Some("13 - Invalid amount"));
    assert_eq!(result.transaction_status, None);
}

#[tokio::test]
async fn test_unmapped_status_label_is_fatal() {
    let server = MockServer::start().await;
    let result_xml = format!("{}{}", common(0, Some("PAID_OUT")), payment_section("x", "1050"));
    mount(
        &server,
        "getPaymentDetails",
        200,
        signed_response("getPaymentDetails", &result_xml),
    )
    .await;

    let err = provider(&server).get_payment_details("x").await.unwrap_err();
    assert!(err.is_unmapped_status());
    assert!(err.to_string().contains("PAID_OUT"));
}

#[tokio::test]
async fn test_validation_error_performs_no_io() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut request = boleto_request();
    request.order_id.clear();
    request.customer.email = None;

    let err = provider(&server).create_payment(request).await.unwrap_err();
    match err.kind {
        AppErrorKind::Validation(errors) => {
            assert!(errors.get("order_id").is_some());
            assert!(errors.get("customer.email").is_some());
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_soap_fault_fails_result() {
    let server = MockServer::start().await;
    let body = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <soap:Fault><faultcode>soap:Client</faultcode><faultstring>Unmarshalling Error</faultstring></soap:Fault>
  </soap:Body>
</soap:Envelope>"#;
    mount(&server, "cancelPayment", 200, body.to_string()).await;

    let result = provider(&server).cancel_payment("a1b2c3").await.unwrap();
    assert!(result.is_error());
    assert!(result.message().unwrap().contains("Unmarshalling Error"));
}

#[tokio::test]
async fn test_response_for_another_operation_is_malformed() {
    let server = MockServer::start().await;
    let result_xml = format!("{}{}", common(0, Some("CANCELLED")), payment_section("c", "1050"));
    mount(
        &server,
        "cancelPayment",
        200,
        signed_response("validatePayment", &result_xml),
    )
    .await;

    let err = provider(&server).cancel_payment("c").await.unwrap_err();
    assert!(matches!(
        err.kind,
        AppErrorKind::External(ExternalError::MalformedResponse { .. })
    ));
}

#[tokio::test]
async fn test_create_token() {
    let server = MockServer::start().await;
    let result_xml = "<commonResponse><responseCode>0</responseCode>\
         <responseCodeDetail>Action successfully completed</responseCodeDetail>\
         <paymentToken>tok-123</paymentToken></commonResponse>\
         <cardResponse><number>4970100000000055</number><scheme>VISA</scheme>\
         <expiryMonth>12</expiryMonth><expiryYear>2030</expiryYear></cardResponse>\
         <tokenResponse><creationDate>2024-03-01T12:00:01Z</creationDate></tokenResponse>";
    mount(
        &server,
        "createToken",
        200,
        signed_response("createToken", result_xml),
    )
    .await;

    let result = provider(&server)
        .create_token(TokenRequest {
            card: card(),
            customer: Customer::default(),
        })
        .await
        .unwrap();

    assert!(!result.is_error());
    assert_eq!(result.transaction_status, Some(TransactionStatus::Success));
    assert_eq!(result.payment_status, Some(PaymentStatus::Success));

    let token = result.token.unwrap();
    assert_eq!(token.token, "tok-123");
    assert_eq!(token.masked_number.as_deref(), Some("497010XXXXXX0055"));
    assert_eq!(token.scheme.as_deref(), Some("VISA"));
    assert_eq!(token.expiry_month, Some(12));
    assert_eq!(token.expiry_year, Some(2030));
    assert!(token.active);
}

#[tokio::test]
async fn test_create_subscription() {
    let server = MockServer::start().await;
    let result_xml = format!(
        "{}<subscriptionResponse><subscriptionId>sub-9</subscriptionId>\
         <effectDate>2024-04-10T00:00:00Z</effectDate>\
         <amount>2990</amount><currency>986</currency>\
         <rrule>RRULE:COUNT=12;FREQ=MONTHLY;BYMONTHDAY=10</rrule>\
         <pastPaymentsNumber>0</pastPaymentsNumber><totalPaymentsNumber>12</totalPaymentsNumber>\
         </subscriptionResponse>",
        common(0, None)
    );
    mount(
        &server,
        "createSubscription",
        200,
        signed_response("createSubscription", &result_xml),
    )
    .await;

    let rule = Recurrence::new(Cycle::Monthly)
        .count(12)
        .day_of_month(10)
        .build()
        .unwrap();
    let result = provider(&server)
        .create_subscription(SubscriptionRequest {
            order_id: "sub-order".to_string(),
            token: "tok-123".to_string(),
            amount: 29.9,
            effect_date: Utc.with_ymd_and_hms(2024, 4, 10, 0, 0, 0).unwrap(),
            rule,
            initial_amount: None,
            initial_amount_count: None,
            description: Some("monthly plan".to_string()),
        })
        .await
        .unwrap();

    assert!(!result.is_error());
    let subscription = result.subscription.unwrap();
    assert_eq!(subscription.subscription_id, "sub-9");
    assert_eq!(subscription.amount, Some(29.9));
    assert_eq!(subscription.total_payments, Some(12));
    assert_eq!(
        subscription.rule.as_deref(),
        Some("RRULE:COUNT=12;FREQ=MONTHLY;BYMONTHDAY=10")
    );

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(body.contains("<paymentToken>tok-123</paymentToken>"));
    assert!(body.contains("<rrule>RRULE:COUNT=12;FREQ=MONTHLY;BYMONTHDAY=10</rrule>"));
}

#[tokio::test]
async fn test_find_payments_lists_transactions() {
    let server = MockServer::start().await;
    let result_xml = format!(
        "{}<transactionItem><transactionUuid>a</transactionUuid>\
         <transactionStatusLabel>CAPTURED</transactionStatusLabel><amount>1050</amount></transactionItem>\
         <transactionItem><transactionUuid>b</transactionUuid>\
         <transactionStatusLabel>EXPIRED</transactionStatusLabel><amount>200</amount></transactionItem>",
        common(0, None)
    );
    mount(
        &server,
        "findPayments",
        200,
        signed_response("findPayments", &result_xml),
    )
    .await;

    let result = provider(&server).find_payments("order-42").await.unwrap();

    assert_eq!(result.payments.len(), 2);
    assert_eq!(result.payments[0].transaction_status, TransactionStatus::Captured);
    assert_eq!(result.payments[1].payment_status, PaymentStatus::Expired);
    assert_eq!(result.payments[1].amount, Some(2.0));
}

#[tokio::test]
async fn test_usable_through_provider_trait() {
    let server = MockServer::start().await;
    let result_xml = format!("{}{}", common(0, Some("CAPTURED")), payment_section("g1", "1050"));
    mount(
        &server,
        "getPaymentDetails",
        200,
        signed_response("getPaymentDetails", &result_xml),
    )
    .await;

    let provider: Box<dyn PaymentProvider> = Box::new(provider(&server));
    let result = provider.get_payment("g1").await.unwrap();

    assert_eq!(result.provider, provider.provider());
    assert_eq!(result.transaction_status, Some(TransactionStatus::Captured));
    assert_eq!(result.payment_status, Some(PaymentStatus::Paid));
}

#[cfg(feature = "boleto-form")]
mod boleto_form {
    use std::collections::BTreeMap;

    use multipay_backend::payments::providers::payzen::FormReply;

    use super::*;

    async fn mount_form(server: &MockServer, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/vads-payment/"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("vads_payment_cards=BOLETO"))
            .respond_with(response)
            .expect(1)
            .mount(server)
            .await;
    }

    async fn sent_fields(server: &MockServer) -> BTreeMap<String, String> {
        let requests = server.received_requests().await.unwrap();
        url::form_urlencoded::parse(&requests[0].body)
            .into_owned()
            .collect()
    }

    #[tokio::test]
    async fn test_pdf_reply_is_a_document() {
        let server = MockServer::start().await;
        mount_form(
            &server,
            ResponseTemplate::new(200)
                .set_body_raw(b"%PDF-1.4 boleto".to_vec(), "application/pdf"),
        )
        .await;

        let reply = provider(&server)
            .generate_boleto_form(&boleto_request())
            .await
            .unwrap();
        match reply {
            FormReply::Document(document) => {
                assert_eq!(document.content_type, "application/pdf");
                assert_eq!(document.bytes, b"%PDF-1.4 boleto");
            }
            other => panic!("expected a document, got {:?}", other),
        }

        let mut fields = sent_fields(&server).await;
        assert_eq!(fields.get("vads_amount").map(String::as_str), Some("1050"));
        assert_eq!(fields.get("vads_site_id").map(String::as_str), Some(SHOP_ID));

        let trans_date = fields.get("vads_trans_date").unwrap();
        assert_eq!(trans_date.len(), 14);
        assert!(trans_date.chars().all(|c| c.is_ascii_digit()));
        assert!(trans_date.starts_with("20"));

        let signature = fields.remove("signature").unwrap();
        assert_eq!(signature, Signer::new(KEY).generate_form_token(&fields));
    }

    #[tokio::test]
    async fn test_html_reply_is_rejected_with_its_message() {
        let server = MockServer::start().await;
        let html = r#"<html><body>
  <div id="payment-error">
    <span class="message"><div>Invalid <b>customer</b> document</div></span>
  </div>
</body></html>"#;
        mount_form(
            &server,
            ResponseTemplate::new(200).set_body_raw(html.as_bytes().to_vec(), "text/html"),
        )
        .await;

        let reply = provider(&server)
            .generate_boleto_form(&boleto_request())
            .await
            .unwrap();
        assert_eq!(
            reply,
            FormReply::Rejected("Invalid customer document".to_string())
        );
    }

    #[tokio::test]
    async fn test_form_http_500_is_a_transport_error() {
        let server = MockServer::start().await;
        mount_form(
            &server,
            ResponseTemplate::new(500).set_body_string("Internal Server Error"),
        )
        .await;

        let err = provider(&server)
            .generate_boleto_form(&boleto_request())
            .await
            .unwrap_err();

        assert!(err.is_transport());
        match err.kind {
            AppErrorKind::External(ExternalError::Transport {
                status,
                raw_request,
                raw_response,
                ..
            }) => {
                assert_eq!(status, Some(500));
                assert!(raw_request.contains("signature="));
                assert_eq!(raw_response.as_deref(), Some("Internal Server Error"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_form_validation_performs_no_io() {
        let server = MockServer::start().await;
        let mut request = boleto_request();
        request.customer.email = None;

        let err = provider(&server)
            .generate_boleto_form(&request)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
