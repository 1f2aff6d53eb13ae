//! Core transaction domain types.

use serde::{Deserialize, Serialize};

/// Database identifier for a transaction.
pub type TransactionId = i64;

/// Database identifier for an item.
pub type ItemId = i64;

/// A persistence-ready line item produced by receipt normalization.
///
/// The serialized field names match the wire format the review form sends
/// back, so the same type round-trips through the scan response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    /// The item name, non-empty after trimming.
    #[serde(rename = "item_name")]
    pub name: String,
    /// The unit price. Never validated positive, a negative price can only
    /// come from input error.
    #[serde(rename = "item_price")]
    pub price: f64,
    /// The primary category label, 'Uncategorized' when the input was blank.
    #[serde(rename = "item_cat_1")]
    pub category: String,
}

/// One row of the transaction history listing.
///
/// The total is recomputed from the items on every read, it is never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionSummary {
    /// The transaction's ID in the application database.
    pub id: TransactionId,
    /// The calendar date of the purchase, formatted as YYYY-MM-DD.
    pub transaction_date: String,
    /// The display name of the merchant.
    pub merchant_name: String,
    /// The sum of the item prices.
    pub total: f64,
    /// The line items of the transaction.
    pub items: Vec<ItemSummary>,
}

/// A line item as returned by the transaction history listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSummary {
    /// The item's ID in the application database.
    pub id: ItemId,
    /// The item name.
    pub item_name: String,
    /// The unit price.
    pub item_price: f64,
    /// The primary category label.
    pub item_cat_1: String,
}
