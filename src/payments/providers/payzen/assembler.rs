//! Folds a decoded response into a [`PaymentResult`]
//!
//! Order matters: response code, then header signature, then status
//! normalization, then field extraction. The first two stop the fold with a
//! failed result; an unknown status label aborts it with an error.

use tracing::warn;

use super::auth::Signer;
use super::envelope::RequestEnvelope;
use super::models::{CommonResponse, OperationResult, SubscriptionResponse};
use super::operation::{Operation, OperationKind, ResponseSection};
use super::response::{ParsedResponse, Reply};
use super::transport::Exchange;
use crate::error::{AppError, AppResult, DomainError};
use crate::payments::amount;
use crate::payments::status::{StatusTable, TransactionStatus};
use crate::payments::types::{
    mask_card_number, PaymentItem, PaymentResult, Provider, SubscriptionDetails, TokenDetails,
};

pub const HEADER_NOT_VALID: &str = "header not valid";
pub const NOT_CREATED_MESSAGE: &str = "transaction was not created";
pub const REFUSED_MESSAGE: &str = "transaction was refused";

pub struct Assembler<'a> {
    pub signer: &'a Signer,
    pub operation: &'a Operation,
    pub envelope: &'a RequestEnvelope,
}

impl Assembler<'_> {
    pub fn assemble(&self, exchange: Exchange, parsed: ParsedResponse) -> AppResult<PaymentResult> {
        let mut result = PaymentResult::new(Provider::PayZen);
        result.raw_request = Some(exchange.raw_request);
        result.raw_response = Some(exchange.raw_response);

        let data = match parsed.reply {
            Reply::Fault(fault) => {
                warn!("PayZen SOAP fault {}: {}", fault.faultcode, fault.faultstring);
                let message = format!("{} - {}", fault.faultcode, fault.faultstring);
                result.fail(message.trim_matches([' ', '-']));
                return Ok(result);
            }
            Reply::Result(data) => data,
        };

        let common = data.common()?;
        let code = common
            .response_code
            .ok_or_else(|| AppError::malformed(Provider::PayZen, "responseCode is missing"))?;
        result.response_code = Some(code);
        result.response_code_detail = non_empty(&common.response_code_detail);

        if code != 0 {
            let detail = result.response_code_detail.clone().unwrap_or_default();
            result.fail(format!("{} - {}", code, detail));
            return Ok(result);
        }

        let header_valid = parsed
            .header
            .as_ref()
            .is_some_and(|header| {
                self.signer
                    .validate_response_header(header, &self.envelope.header)
            });
        if !header_valid {
            warn!("PayZen response header failed validation");
            result.fail(HEADER_NOT_VALID);
            return Ok(result);
        }

        let status = self.normalize(common)?;
        result.set_status(status);
        let refused = match status {
            TransactionStatus::NotCreated => Some(NOT_CREATED_MESSAGE),
            TransactionStatus::Refused => Some(REFUSED_MESSAGE),
            _ => None,
        };
        if let Some(message) = refused {
            result.fail(message);
        } else {
            self.check_sections(&data, common)?;
        }

        self.extract(&data, common, &mut result)?;
        Ok(result)
    }

    fn normalize(&self, common: &CommonResponse) -> AppResult<TransactionStatus> {
        let table = StatusTable::for_provider(Provider::PayZen);
        let kind = self.envelope.kind;

        match non_empty(&common.transaction_status_label) {
            Some(label) => Ok(table.resolve(&label).inspect_err(|e| warn!("{}", e))?),
            None if kind.carries_transaction() => Err(DomainError::UnmappedStatus {
                provider: Provider::PayZen,
                label: String::new(),
            }
            .into()),
            None => Ok(TransactionStatus::Success),
        }
    }

    fn check_sections(&self, data: &OperationResult, common: &CommonResponse) -> AppResult<()> {
        for section in self.envelope.kind.required_sections() {
            let present = match section {
                ResponseSection::Payment => data.payment_response.is_some(),
                ResponseSection::PaymentToken => {
                    non_empty(&common.payment_token).is_some() || self.operation.token().is_some()
                }
                ResponseSection::Subscription => data.subscription_response.is_some(),
            };

            if !present {
                return Err(AppError::malformed(
                    Provider::PayZen,
                    format!(
                        "{} lacks its {:?} section",
                        self.envelope.kind.response_element(),
                        section
                    ),
                ));
            }
        }
        Ok(())
    }

    fn extract(
        &self,
        data: &OperationResult,
        common: &CommonResponse,
        result: &mut PaymentResult,
    ) -> AppResult<()> {
        let kind = self.envelope.kind;

        if let Some(payment) = &data.payment_response {
            result.transaction_id = non_empty(&payment.transaction_id);
            result.transaction_uuid = non_empty(&payment.transaction_uuid);
            result.amount = wire_amount(&payment.amount, "paymentResponse.amount")?;
        }

        if let Some(order) = &data.order_response {
            result.order_id = non_empty(&order.order_id);
            if self.operation.uses_boleto() {
                result.boleto_url = order
                    .ext_info
                    .first()
                    .map(|info| info.value.trim().to_string())
                    .filter(|url| !url.is_empty());
            }
        }

        if is_token_operation(kind) || non_empty(&common.payment_token).is_some() {
            result.token = self.token_details(data, common);
        }

        if let Some(subscription) = &data.subscription_response {
            result.subscription = Some(self.subscription_details(subscription)?);
        }

        let table = StatusTable::for_provider(Provider::PayZen);
        for item in &data.transaction_items {
            let label = non_empty(&item.transaction_status_label).unwrap_or_default();
            let status = table.resolve(&label)?;
            result.payments.push(PaymentItem {
                transaction_uuid: non_empty(&item.transaction_uuid).unwrap_or_default(),
                transaction_id: non_empty(&item.transaction_id),
                amount: wire_amount(&item.amount, "transactionItem.amount")?,
                transaction_status: status,
                payment_status: status.payment_status(Provider::PayZen),
            });
        }

        Ok(())
    }

    fn token_details(
        &self,
        data: &OperationResult,
        common: &CommonResponse,
    ) -> Option<TokenDetails> {
        let token = non_empty(&common.payment_token)
            .or_else(|| self.operation.token().map(str::to_string))?;

        let card = data.card_response.as_ref();
        let dates = data.token_response.as_ref();
        let cancellation_date = dates.and_then(|d| non_empty(&d.cancellation_date));

        Some(TokenDetails {
            token,
            masked_number: card
                .and_then(|c| non_empty(&c.number))
                .map(|number| mask_card_number(&number)),
            scheme: card.and_then(|c| non_empty(&c.scheme).or_else(|| non_empty(&c.brand))),
            expiry_month: card.and_then(|c| parse_number(&c.expiry_month)),
            expiry_year: card.and_then(|c| parse_number(&c.expiry_year)),
            creation_date: dates.and_then(|d| non_empty(&d.creation_date)),
            active: cancellation_date.is_none() && self.envelope.kind != OperationKind::CancelToken,
            cancellation_date,
        })
    }

    fn subscription_details(
        &self,
        subscription: &SubscriptionResponse,
    ) -> AppResult<SubscriptionDetails> {
        let subscription_id = non_empty(&subscription.subscription_id)
            .or_else(|| match self.operation {
                Operation::GetSubscriptionDetails { subscription_id, .. }
                | Operation::CancelSubscription {
                    subscription_id, ..
                } => Some(subscription_id.clone()),
                Operation::UpdateSubscription(update) => Some(update.subscription_id.clone()),
                _ => None,
            })
            .unwrap_or_default();

        Ok(SubscriptionDetails {
            subscription_id,
            effect_date: non_empty(&subscription.effect_date),
            cancel_date: non_empty(&subscription.cancel_date),
            rule: non_empty(&subscription.rrule),
            amount: wire_amount(&subscription.amount, "subscriptionResponse.amount")?,
            initial_amount: wire_amount(
                &subscription.initial_amount,
                "subscriptionResponse.initialAmount",
            )?,
            initial_amount_count: parse_number(&subscription.initial_amount_number),
            past_payments: parse_number(&subscription.past_payments_number),
            total_payments: parse_number(&subscription.total_payments_number),
            description: non_empty(&subscription.description),
        })
    }
}

fn is_token_operation(kind: OperationKind) -> bool {
    matches!(
        kind,
        OperationKind::CreateToken
            | OperationKind::UpdateToken
            | OperationKind::CancelToken
            | OperationKind::ReactivateToken
            | OperationKind::GetTokenDetails
    )
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_number<T: std::str::FromStr>(value: &Option<String>) -> Option<T> {
    non_empty(value).and_then(|v| v.parse().ok())
}

fn wire_amount(value: &Option<String>, field: &str) -> AppResult<Option<f64>> {
    non_empty(value)
        .map(|v| {
            amount::from_wire(&v).map_err(|_| {
                AppError::malformed(
                    Provider::PayZen,
                    format!("{} is not an amount: '{}'", field, v),
                )
            })
        })
        .transpose()
}
