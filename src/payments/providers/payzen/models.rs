//! Wire-format structures of the PayZen v5 web service
//!
//! Request structures serialize with `quick-xml` in the element order the
//! service expects, so field order matters. Response structures match on local
//! names only; namespace prefixes sent by the service are irrelevant. Numeric
//! response fields stay textual since the service sends empty elements for
//! absent values.

use serde::{Deserialize, Serialize};

pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const HEADER_NS: &str = "http://v5.ws.vads.lyra.com/Header/";
pub const BODY_NS: &str = "http://v5.ws.vads.lyra.com/";

/// Signed request header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestHeader {
    #[serde(rename = "soapHeader:shopId")]
    pub shop_id: String,
    #[serde(rename = "soapHeader:requestId")]
    pub request_id: String,
    #[serde(rename = "soapHeader:timestamp")]
    pub timestamp: String,
    #[serde(rename = "soapHeader:mode")]
    pub mode: String,
    #[serde(rename = "soapHeader:authToken")]
    pub auth_token: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_capture_date: Option<String>,
    /// 0 = automatic, 1 = manual
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_validation: Option<u8>,
    /// Installment count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_option_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtInfo {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub order_id: String,
    #[serde(rename = "extInfo", skip_serializing_if = "Vec::is_empty")]
    pub ext_info: Vec<ExtInfo>,
}

#[derive(Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_month: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_year: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_security_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_holder_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_token: Option<String>,
}

impl std::fmt::Debug for CardRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardRequest")
            .field("scheme", &self.scheme)
            .field("payment_token", &self.payment_token)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub customer_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRequest {
    pub billing_details: BillingDetails,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRequest {
    pub transaction_uuids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    pub effect_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_amount_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rrule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// One payload per operation; the element order is the one the service expects.

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentPayload {
    pub common_request: CommonRequest,
    pub payment_request: PaymentRequestBody,
    pub order_request: OrderRequest,
    pub card_request: CardRequest,
    pub customer_request: CustomerRequest,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentPayload {
    pub common_request: CommonRequest,
    pub query_request: QueryRequest,
    pub payment_request: PaymentRequestBody,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicatePaymentPayload {
    pub common_request: CommonRequest,
    pub payment_request: PaymentRequestBody,
    pub order_request: OrderRequest,
    pub query_request: QueryRequest,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturePaymentPayload {
    pub settlement_request: SettlementRequest,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundPaymentPayload {
    pub common_request: CommonRequest,
    pub payment_request: PaymentRequestBody,
    pub query_request: QueryRequest,
}

/// Cancel, validate and the token/subscription housekeeping operations
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonQueryPayload {
    pub common_request: CommonRequest,
    pub query_request: QueryRequest,
}

/// Read-only lookups
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPayload {
    pub query_request: QueryRequest,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenPayload {
    pub common_request: CommonRequest,
    pub card_request: CardRequest,
    pub customer_request: CustomerRequest,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTokenPayload {
    pub common_request: CommonRequest,
    pub query_request: QueryRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_request: Option<CardRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_request: Option<CustomerRequest>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionPayload {
    pub common_request: CommonRequest,
    pub order_request: OrderRequest,
    pub subscription_request: SubscriptionRequestBody,
    pub card_request: CardRequest,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionPayload {
    pub common_request: CommonRequest,
    pub query_request: QueryRequest,
    pub subscription_request: SubscriptionRequestBody,
}

// --- responses ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponseHeader {
    pub shop_id: String,
    pub request_id: String,
    pub timestamp: String,
    pub mode: String,
    pub auth_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "Header", default)]
    pub header: Option<ResponseHeader>,
    #[serde(rename = "Body")]
    pub body: ResponseBody,
}

#[derive(Debug, Deserialize)]
pub struct ResponseBody {
    #[serde(rename = "$value")]
    pub content: BodyContent,
}

/// The single element inside the response body, discriminated by its name
#[derive(Debug, Deserialize)]
pub enum BodyContent {
    #[serde(rename = "createPaymentResponse")]
    CreatePayment(OperationResponse),
    #[serde(rename = "updatePaymentResponse")]
    UpdatePayment(OperationResponse),
    #[serde(rename = "cancelPaymentResponse")]
    CancelPayment(OperationResponse),
    #[serde(rename = "duplicatePaymentResponse")]
    DuplicatePayment(OperationResponse),
    #[serde(rename = "capturePaymentResponse")]
    CapturePayment(OperationResponse),
    #[serde(rename = "validatePaymentResponse")]
    ValidatePayment(OperationResponse),
    #[serde(rename = "refundPaymentResponse")]
    RefundPayment(OperationResponse),
    #[serde(rename = "createTokenResponse")]
    CreateToken(OperationResponse),
    #[serde(rename = "updateTokenResponse")]
    UpdateToken(OperationResponse),
    #[serde(rename = "cancelTokenResponse")]
    CancelToken(OperationResponse),
    #[serde(rename = "reactivateTokenResponse")]
    ReactivateToken(OperationResponse),
    #[serde(rename = "getTokenDetailsResponse")]
    GetTokenDetails(OperationResponse),
    #[serde(rename = "findPaymentsResponse")]
    FindPayments(OperationResponse),
    #[serde(rename = "getPaymentDetailsResponse")]
    GetPaymentDetails(OperationResponse),
    #[serde(rename = "createSubscriptionResponse")]
    CreateSubscription(OperationResponse),
    #[serde(rename = "getSubscriptionDetailsResponse")]
    GetSubscriptionDetails(OperationResponse),
    #[serde(rename = "cancelSubscriptionResponse")]
    CancelSubscription(OperationResponse),
    #[serde(rename = "updateSubscriptionResponse")]
    UpdateSubscription(OperationResponse),
    Fault(SoapFault),
}

/// `<xxxResponse><xxxResult>...</xxxResult></xxxResponse>`
#[derive(Debug, Deserialize)]
pub struct OperationResponse {
    #[serde(
        rename = "createPaymentResult",
        alias = "updatePaymentResult",
        alias = "cancelPaymentResult",
        alias = "duplicatePaymentResult",
        alias = "capturePaymentResult",
        alias = "validatePaymentResult",
        alias = "refundPaymentResult",
        alias = "createTokenResult",
        alias = "updateTokenResult",
        alias = "cancelTokenResult",
        alias = "reactivateTokenResult",
        alias = "getTokenDetailsResult",
        alias = "findPaymentsResult",
        alias = "getPaymentDetailsResult",
        alias = "createSubscriptionResult",
        alias = "getSubscriptionDetailsResult",
        alias = "cancelSubscriptionResult",
        alias = "updateSubscriptionResult"
    )]
    pub result: OperationResult,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationResult {
    pub request_id: Option<String>,
    pub common_response: Option<CommonResponse>,
    pub payment_response: Option<PaymentResponse>,
    pub order_response: Option<OrderResponse>,
    pub card_response: Option<CardResponse>,
    pub token_response: Option<TokenResponse>,
    pub subscription_response: Option<SubscriptionResponse>,
    #[serde(rename = "transactionItem")]
    pub transaction_items: Vec<TransactionItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommonResponse {
    pub response_code: Option<i32>,
    pub response_code_detail: Option<String>,
    pub transaction_status_label: Option<String>,
    pub shop_id: Option<String>,
    pub payment_source: Option<String>,
    pub submission_date: Option<String>,
    pub contract_number: Option<String>,
    pub payment_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentResponse {
    pub transaction_id: Option<String>,
    pub transaction_uuid: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub effective_amount: Option<String>,
    pub expected_capture_date: Option<String>,
    pub operation_type: Option<String>,
    pub creation_date: Option<String>,
    pub sequence_number: Option<String>,
    pub payment_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderResponse {
    pub order_id: Option<String>,
    #[serde(rename = "extInfo")]
    pub ext_info: Vec<ExtInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardResponse {
    pub number: Option<String>,
    pub scheme: Option<String>,
    pub brand: Option<String>,
    pub country: Option<String>,
    pub expiry_month: Option<String>,
    pub expiry_year: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenResponse {
    pub creation_date: Option<String>,
    pub cancellation_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscriptionResponse {
    pub subscription_id: Option<String>,
    pub effect_date: Option<String>,
    pub cancel_date: Option<String>,
    pub initial_amount: Option<String>,
    pub initial_amount_number: Option<String>,
    pub rrule: Option<String>,
    pub description: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub past_payments_number: Option<String>,
    pub total_payments_number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionItem {
    pub transaction_uuid: Option<String>,
    pub transaction_id: Option<String>,
    pub transaction_status_label: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub expected_capture_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SoapFault {
    pub faultcode: String,
    pub faultstring: String,
}
