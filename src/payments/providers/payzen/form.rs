//! Form-redirect boleto generation
//!
//! The `vads_*` field set is signed with the form token and POSTed
//! url-encoded. The service answers either with the boleto PDF or with an HTML
//! page carrying the error under `#payment-error > span > div`.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{DateTime, Timelike, Utc};
use regex::Regex;

use super::auth::Signer;
use super::config::PayzenConfig;
use super::operation::check_amount;
use crate::error::{AppResult, ValidationErrors};
use crate::payments::amount;
use crate::payments::types::{PaymentRequest, PaymentScheme};

/// Trans date format of the form flow
pub const TRANS_DATE_FORMAT: &str = "%Y%m%d%H%M%S";
pub const FORM_VERSION: &str = "V2";
pub const DEFAULT_FORM_ERROR: &str = "boleto form was rejected";

/// Daily unique transaction number, `000000` to `899999`
pub fn trans_id_for(at: DateTime<Utc>) -> String {
    let tenths = at.num_seconds_from_midnight() * 10 + at.timestamp_subsec_millis() / 100;
    format!("{:06}", tenths % 900_000)
}

/// Signed field set of one form submission
#[derive(Debug, Clone)]
pub struct BoletoForm {
    fields: BTreeMap<String, String>,
}

impl BoletoForm {
    pub fn new(
        config: &PayzenConfig,
        request: &PaymentRequest,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let mut errors = ValidationErrors::new();
        if !request.instrument.is_boleto() {
            errors.add("instrument", "form flow only supports boleto");
        }
        errors.require("order_id", Some(&request.order_id), "order id is required");
        check_amount(&mut errors, "amount", request.amount);
        errors.require(
            "customer.email",
            request.customer.email.as_deref(),
            "customer email is required for boleto",
        );
        errors.into_result()?;

        let mut fields = BTreeMap::new();
        let mut set = |key: &str, value: Option<&str>| {
            if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
                fields.insert(format!("vads_{}", key), value.to_string());
            }
        };

        let wire_amount = amount::to_wire(request.amount)?;
        let trans_date = now.format(TRANS_DATE_FORMAT).to_string();
        let trans_id = trans_id_for(now);
        let customer = &request.customer;

        set("action_mode", Some("INTERACTIVE"));
        set("amount", Some(&wire_amount));
        set("ctx_mode", Some(config.mode.as_str()));
        set("currency", Some(&config.currency));
        set("page_action", Some("PAYMENT"));
        set("payment_config", Some("SINGLE"));
        set("payment_cards", Some(PaymentScheme::Boleto.code()));
        set("site_id", Some(&config.shop_id));
        set("trans_date", Some(&trans_date));
        set("trans_id", Some(&trans_id));
        set("version", Some(FORM_VERSION));
        set("order_id", Some(&request.order_id));
        set("cust_email", customer.email.as_deref());
        set("cust_first_name", customer.first_name.as_deref());
        set("cust_last_name", customer.last_name.as_deref());
        set("cust_legal_name", customer.legal_name.as_deref());
        set("cust_national_id", customer.identity_code.as_deref());
        set("cust_phone", customer.phone_number.as_deref());
        set("cust_cell_phone", customer.cell_phone_number.as_deref());
        set("cust_address_number", customer.street_number.as_deref());
        set("cust_address", customer.address.as_deref());
        set("cust_district", customer.district.as_deref());
        set("cust_zip", customer.zip_code.as_deref());
        set("cust_city", customer.city.as_deref());
        set("cust_state", customer.state.as_deref());
        set("cust_country", customer.country.as_deref());

        Ok(Self { fields })
    }

    /// Add the `signature` field computed over the `vads_*` fields
    pub fn sign(mut self, signer: &Signer) -> Self {
        self.fields.remove("signature");
        let signature = signer.generate_form_token(&self.fields);
        self.fields.insert("signature".to_string(), signature);
        self
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter())
            .finish()
    }
}

/// Generated boleto slip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoletoDocument {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormReply {
    Document(BoletoDocument),
    Rejected(String),
}

pub fn classify(content_type: Option<&str>, body: &[u8]) -> FormReply {
    let declared_pdf =
        content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("application/pdf"));
    if declared_pdf || body.starts_with(b"%PDF") {
        return FormReply::Document(BoletoDocument {
            content_type: "application/pdf".to_string(),
            bytes: body.to_vec(),
        });
    }

    let html = String::from_utf8_lossy(body);
    FormReply::Rejected(
        extract_error_message(&html).unwrap_or_else(|| DEFAULT_FORM_ERROR.to_string()),
    )
}

/// Error text under `#payment-error`, its first `span` and the `div`s inside it
pub fn extract_error_message(html: &str) -> Option<String> {
    dom_error_message(html).or_else(|| scan_error_message(html))
}

fn dom_error_message(html: &str) -> Option<String> {
    let document = roxmltree::Document::parse(html).ok()?;
    let container = document
        .descendants()
        .find(|node| node.attribute("id") == Some("payment-error"))?;
    let span = container.descendants().find(|node| node.has_tag_name("span"))?;

    let divs: Vec<String> = span
        .descendants()
        .filter(|node| node.has_tag_name("div"))
        .filter(|div| !div.children().any(|child| child.has_tag_name("div")))
        .map(text_of)
        .filter(|text| !text.is_empty())
        .collect();

    if divs.is_empty() {
        let text = text_of(span);
        return (!text.is_empty()).then_some(text);
    }
    Some(divs.join(" "))
}

/// Fallback for pages that are not well-formed XML
fn scan_error_message(html: &str) -> Option<String> {
    static SECTION: OnceLock<Regex> = OnceLock::new();
    static TAG: OnceLock<Regex> = OnceLock::new();

    let section = SECTION.get_or_init(|| {
        Regex::new(r#"(?is)id\s*=\s*["']payment-error["'][^>]*>.*?<span[^>]*>(.*?)</span>"#)
            .expect("valid regex")
    });
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"));

    let inner = section.captures(html)?.get(1)?.as_str();
    let text = collapse(&tag.replace_all(inner, " "));
    (!text.is_empty()).then_some(text)
}

/// Text nodes under `node`, whitespace collapsed
fn text_of(node: roxmltree::Node<'_, '_>) -> String {
    let text: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    collapse(&text)
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
