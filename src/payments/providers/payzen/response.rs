//! Response envelope decoding
//!
//! The body element's name selects the [`BodyContent`] variant; the variant must
//! match the operation that was sent.

use super::models::{
    BodyContent, CommonResponse, OperationResult, ResponseEnvelope, ResponseHeader, SoapFault,
};
use super::operation::OperationKind;
use crate::error::{AppError, AppResult};
use crate::payments::types::Provider;

/// What the service answered
#[derive(Debug)]
pub enum Reply {
    Result(Box<OperationResult>),
    Fault(SoapFault),
}

#[derive(Debug)]
pub struct ParsedResponse {
    pub header: Option<ResponseHeader>,
    pub reply: Reply,
}

impl BodyContent {
    /// Operation the element answers with its result, or the fault
    pub fn into_parts(self) -> Result<(OperationKind, OperationResult), SoapFault> {
        let (kind, response) = match self {
            BodyContent::CreatePayment(r) => (OperationKind::CreatePayment, r),
            BodyContent::UpdatePayment(r) => (OperationKind::UpdatePayment, r),
            BodyContent::CancelPayment(r) => (OperationKind::CancelPayment, r),
            BodyContent::DuplicatePayment(r) => (OperationKind::DuplicatePayment, r),
            BodyContent::CapturePayment(r) => (OperationKind::CapturePayment, r),
            BodyContent::ValidatePayment(r) => (OperationKind::ValidatePayment, r),
            BodyContent::RefundPayment(r) => (OperationKind::RefundPayment, r),
            BodyContent::CreateToken(r) => (OperationKind::CreateToken, r),
            BodyContent::UpdateToken(r) => (OperationKind::UpdateToken, r),
            BodyContent::CancelToken(r) => (OperationKind::CancelToken, r),
            BodyContent::ReactivateToken(r) => (OperationKind::ReactivateToken, r),
            BodyContent::GetTokenDetails(r) => (OperationKind::GetTokenDetails, r),
            BodyContent::FindPayments(r) => (OperationKind::FindPayments, r),
            BodyContent::GetPaymentDetails(r) => (OperationKind::GetPaymentDetails, r),
            BodyContent::CreateSubscription(r) => (OperationKind::CreateSubscription, r),
            BodyContent::GetSubscriptionDetails(r) => (OperationKind::GetSubscriptionDetails, r),
            BodyContent::CancelSubscription(r) => (OperationKind::CancelSubscription, r),
            BodyContent::UpdateSubscription(r) => (OperationKind::UpdateSubscription, r),
            BodyContent::Fault(fault) => return Err(fault),
        };
        Ok((kind, response.result))
    }
}

impl OperationResult {
    /// The common section every result carries
    pub fn common(&self) -> AppResult<&CommonResponse> {
        self.common_response
            .as_ref()
            .ok_or_else(|| AppError::malformed(Provider::PayZen, "commonResponse is missing"))
    }
}

pub fn parse(expected: OperationKind, raw: &str) -> AppResult<ParsedResponse> {
    let envelope: ResponseEnvelope = quick_xml::de::from_str(raw).map_err(|e| {
        AppError::malformed(Provider::PayZen, format!("cannot decode envelope: {}", e))
    })?;

    let reply = match envelope.body.content.into_parts() {
        Ok((kind, _)) if kind != expected => {
            return Err(AppError::malformed(
                Provider::PayZen,
                format!(
                    "expected {} but received {}",
                    expected.response_element(),
                    kind.response_element()
                ),
            ));
        }
        Ok((_, result)) => {
            result.common()?;
            Reply::Result(Box::new(result))
        }
        Err(fault) => Reply::Fault(fault),
    };

    Ok(ParsedResponse {
        header: envelope.header,
        reply,
    })
}
