//! The client for the external vision model and the sanitizer for its output.

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::Error;

/// The model used for receipt extraction.
const GEMINI_MODEL: &str = "gemini-2.5-flash";
const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// The instruction sent alongside the receipt image.
///
/// The model is asked to exclude payment, tender, and summary lines and to
/// make the item prices sum to the receipt total, but this is advisory only.
/// Downstream validation must not trust it.
const EXTRACTION_PROMPT: &str = "\
You are extracting ALL line items from a receipt image.
Return ONLY a strict JSON object. No markdown, no code fences, no commentary.
Use this exact top-level structure:
{ transaction_date: \"YYYY-MM-DD\", merchant_name: \"Store\", items: [{ item_name: \"Coffee\", item_price: 4.00, item_cat_1: \"Food\" }] }
transaction_date must be the physical receipt date formatted as YYYY-MM-DD.
merchant_name must be the merchant shown on the receipt.
items must ONLY contain physical products/services purchased.
If Tax, Tip, Service Fee, Delivery Fee, or other fees exist, include them as separate item rows in items.
CRITICAL RULE: NEVER include these as objects in items: Total, Subtotal, Balance Due, Cash, Visa, Mastercard, Change, Savings, Discounts, Coupons, or payment-method lines.
Do not extract any payment rows, tender rows, or receipt summary totals into items.
Grocery receipts (Kroger/King Soopers style) often show informational Savings, Coupons, or Discounts directly below an item.
DO NOT extract those savings/coupon/discount lines as separate items or negative numbers if the main item price on the right already reflects post-discount cost.
If you add the Total line as an item, you will ruin the math. The sum of the item_price values you extract must naturally equal the receipt's final total.
The sum of all item_price values, including Tax and Fees, MUST perfectly equal the final total paid at the bottom of the receipt.
If uncertain, make your best estimate from the visible receipt text.";

/// A client for the Gemini generateContent REST API.
#[derive(Debug, Clone)]
pub struct VisionClient {
    http_client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl VisionClient {
    /// Create a client that authenticates with `api_key`.
    pub fn new(api_key: String) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_key,
            endpoint: format!("{GEMINI_ENDPOINT}/{GEMINI_MODEL}:generateContent"),
        }
    }

    /// Send a receipt image to the vision model and return the raw text of
    /// its reply.
    ///
    /// The reply *should* be a single JSON object but there is no guarantee
    /// of well-formedness, callers must sanitize and parse it themselves.
    /// The call is made once with no retries.
    ///
    /// # Errors
    ///
    /// Returns an [Error::VisionRequest] if the request fails, the model API
    /// responds with a non-success status, or the reply contains no text.
    pub async fn extract_receipt_text(
        &self,
        image_data: &[u8],
        mime_type: &str,
    ) -> Result<String, Error> {
        let request_body = build_generate_content_request(image_data, mime_type);

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|error| Error::VisionRequest(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::VisionRequest(format!(
                "the model API returned HTTP {status}"
            )));
        }

        let response_body: serde_json::Value = response
            .json()
            .await
            .map_err(|error| Error::VisionRequest(error.to_string()))?;

        text_from_generate_content_response(&response_body).ok_or_else(|| {
            Error::VisionRequest("the model response contained no text parts".to_owned())
        })
    }
}

/// Build the generateContent request body with the extraction prompt and the
/// base64-encoded image as inline data.
fn build_generate_content_request(image_data: &[u8], mime_type: &str) -> serde_json::Value {
    serde_json::json!({
        "contents": [{
            "parts": [
                { "text": EXTRACTION_PROMPT },
                {
                    "inline_data": {
                        "mime_type": mime_type,
                        "data": STANDARD.encode(image_data),
                    }
                },
            ]
        }]
    })
}

/// Concatenate the text parts of the first candidate in a generateContent
/// response, or `None` if there are none.
fn text_from_generate_content_response(response_body: &serde_json::Value) -> Option<String> {
    let parts = response_body
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|text| text.as_str()))
        .collect();

    if text.is_empty() { None } else { Some(text) }
}

/// Strip a leading/trailing code-fence marker from model output, if present.
///
/// An optional language tag immediately after the opening fence is removed
/// too. Text without fences is passed through unchanged after trimming
/// surrounding whitespace. No guarantee is made beyond fence removal,
/// parsing may still fail downstream.
pub fn sanitize_model_json(raw_text: &str) -> &str {
    let trimmed = raw_text.trim();

    let Some(mut inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    if inner.len() >= 4 && inner[..4].eq_ignore_ascii_case("json") {
        inner = &inner[4..];
    }

    inner.strip_suffix("```").unwrap_or(inner).trim()
}
