//! The normalization pipeline that turns raw extraction output or a
//! user-edited review payload into persistence-ready rows.

use serde::{Deserialize, Serialize};

use crate::{Error, receipt::extract::sanitize_model_json, transaction::NewItem};

/// The category label substituted when an item's label is blank.
pub const DEFAULT_CATEGORY: &str = "Uncategorized";

/// A receipt that survived normalization: the header fields plus the line
/// items that passed item-level validation.
///
/// The transaction date is kept as a trimmed string here. Its format is only
/// validated at the persistence boundary so that extraction output can be
/// shown to the user for review as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedReceipt {
    /// The calendar date of the purchase as reported by the receipt.
    pub transaction_date: String,
    /// The trimmed merchant display name.
    pub merchant_name: String,
    /// The items that passed item-level validation.
    pub items: Vec<NewItem>,
}

/// Parse sanitized model output as JSON.
///
/// # Errors
///
/// Returns an [Error::ExtractionParse] carrying the raw (unsanitized) model
/// text when the output is not JSON, so the caller can show it for
/// diagnosis. Never silently drops the text.
pub fn parse_extraction(raw_text: &str) -> Result<serde_json::Value, Error> {
    let sanitized = sanitize_model_json(raw_text);

    serde_json::from_str(sanitized).map_err(|_| Error::ExtractionParse {
        raw: raw_text.to_owned(),
    })
}

/// Normalize a parsed extraction payload.
///
/// Validation is deliberately item-level-lenient but payload-level-strict:
/// individual bad rows are dropped without an error, but a payload with a
/// blank header or no surviving items is rejected so that a zero-item
/// transaction can never be persisted.
///
/// # Errors
///
/// Returns:
/// - [Error::InvalidReceiptPayload] if the merchant name or transaction date
///   is blank after trimming, or the items list is missing or empty.
/// - [Error::NoValidLineItems] if every candidate item failed item-level
///   validation.
pub fn normalize_receipt(payload: &serde_json::Value) -> Result<NormalizedReceipt, Error> {
    let merchant_name = string_field(payload, "merchant_name");
    let transaction_date = string_field(payload, "transaction_date");
    let raw_items = payload
        .get("items")
        .and_then(|items| items.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    if merchant_name.is_empty() || transaction_date.is_empty() || raw_items.is_empty() {
        return Err(Error::InvalidReceiptPayload);
    }

    let items = normalize_items(raw_items);

    if items.is_empty() {
        return Err(Error::NoValidLineItems);
    }

    Ok(NormalizedReceipt {
        transaction_date: transaction_date.to_owned(),
        merchant_name: merchant_name.to_owned(),
        items,
    })
}

/// Run item-level validation over candidate items, dropping the ones that
/// fail.
///
/// An item is dropped when its name is empty after trimming or its price
/// cannot be coerced to a finite number. Dropped items are excluded, not
/// reported. A blank category label is replaced with [DEFAULT_CATEGORY].
pub fn normalize_items(raw_items: &[serde_json::Value]) -> Vec<NewItem> {
    raw_items.iter().filter_map(normalize_item).collect()
}

fn normalize_item(raw_item: &serde_json::Value) -> Option<NewItem> {
    let name = string_field(raw_item, "item_name");
    if name.is_empty() {
        return None;
    }

    let price = coerce_price(raw_item.get("item_price")?)?;

    let category = string_field(raw_item, "item_cat_1");
    let category = if category.is_empty() {
        DEFAULT_CATEGORY
    } else {
        category
    };

    Some(NewItem {
        name: name.to_owned(),
        price,
        category: category.to_owned(),
    })
}

/// Coerce a JSON value to a finite price.
///
/// Numbers pass through; strings are parsed after trimming, matching the
/// loose coercion the review form relies on. Anything else, including
/// non-finite values, is rejected.
fn coerce_price(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(number) => number.as_f64().filter(|price| price.is_finite()),
        serde_json::Value::String(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|price| price.is_finite()),
        _ => None,
    }
}

fn string_field<'a>(value: &'a serde_json::Value, field: &str) -> &'a str {
    value
        .get(field)
        .and_then(|field_value| field_value.as_str())
        .unwrap_or_default()
        .trim()
}


#[cfg(test)]
mod normalize_receipt_tests {
    use crate::{Error, receipt::normalize::DEFAULT_CATEGORY};

    use super::{normalize_items, normalize_receipt, parse_extraction};

    #[test]
    fn fenced_extraction_yields_uncategorized_item() {
        let raw = "```json\n{\"transaction_date\":\"2024-01-05\",\"merchant_name\":\"Cafe\",\"items\":[{\"item_name\":\"Latte\",\"item_price\":4.5}]}\n```";
        let payload = parse_extraction(raw).unwrap();

        let receipt = normalize_receipt(&payload).unwrap();

        assert_eq!(receipt.merchant_name, "Cafe");
        assert_eq!(receipt.transaction_date, "2024-01-05");
        assert_eq!(receipt.items.len(), 1);
        assert_eq!(receipt.items[0].name, "Latte");
        assert_eq!(receipt.items[0].category, DEFAULT_CATEGORY);
    }

    #[test]
    fn trims_header_fields() {
        let payload = serde_json::json!({
            "transaction_date": " 2024-01-05 ",
            "merchant_name": " Cafe ",
            "items": [{ "item_name": "Latte", "item_price": 4.5 }],
        });

        let receipt = normalize_receipt(&payload).unwrap();

        assert_eq!(receipt.merchant_name, "Cafe");
        assert_eq!(receipt.transaction_date, "2024-01-05");
    }

    #[test]
    fn blank_merchant_name_is_invalid() {
        let payload = serde_json::json!({
            "transaction_date": "2024-01-05",
            "merchant_name": "  ",
            "items": [{ "item_name": "Latte", "item_price": 4.5 }],
        });

        assert_eq!(
            normalize_receipt(&payload),
            Err(Error::InvalidReceiptPayload)
        );
    }

    #[test]
    fn missing_items_list_is_invalid() {
        let payload = serde_json::json!({
            "transaction_date": "2024-01-05",
            "merchant_name": "Cafe",
        });

        assert_eq!(
            normalize_receipt(&payload),
            Err(Error::InvalidReceiptPayload)
        );
    }

    #[test]
    fn all_items_invalid_is_rejected() {
        let payload = serde_json::json!({
            "transaction_date": "2024-01-05",
            "merchant_name": "Cafe",
            "items": [{ "item_name": "Latte", "item_price": "abc" }],
        });

        assert_eq!(normalize_receipt(&payload), Err(Error::NoValidLineItems));
    }

    #[test]
    fn bad_items_are_dropped_without_error() {
        let raw_items = [
            serde_json::json!({ "item_name": "Latte", "item_price": 4.5 }),
            serde_json::json!({ "item_name": "  ", "item_price": 2.0 }),
            serde_json::json!({ "item_name": "Muffin", "item_price": "abc" }),
            serde_json::json!({ "item_name": "Tea", "item_price": "3.25" }),
            serde_json::json!({ "item_name": "Scone", "item_price": null }),
        ];

        let items = normalize_items(&raw_items);

        let names: Vec<&str> = items.iter().map(|item| item.name.as_str()).collect();
        assert_eq!(names, ["Latte", "Tea"]);
        assert_eq!(items[1].price, 3.25);
    }

    #[test]
    fn negative_prices_are_not_rejected() {
        let raw_items = [serde_json::json!({ "item_name": "Refund", "item_price": -2.5 })];

        let items = normalize_items(&raw_items);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].price, -2.5);
    }

    #[test]
    fn blank_category_defaults_to_uncategorized() {
        let raw_items = [
            serde_json::json!({ "item_name": "Latte", "item_price": 4.5, "item_cat_1": " " }),
            serde_json::json!({ "item_name": "Muffin", "item_price": 3.0, "item_cat_1": "Food" }),
        ];

        let items = normalize_items(&raw_items);

        assert_eq!(items[0].category, DEFAULT_CATEGORY);
        assert_eq!(items[1].category, "Food");
    }

    #[test]
    fn non_finite_price_strings_are_dropped() {
        let raw_items = [
            serde_json::json!({ "item_name": "Latte", "item_price": "inf" }),
            serde_json::json!({ "item_name": "Muffin", "item_price": "NaN" }),
        ];

        assert!(normalize_items(&raw_items).is_empty());
    }
}
