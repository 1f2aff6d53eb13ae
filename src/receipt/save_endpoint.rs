//! The endpoint for persisting a reviewed receipt.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    receipt::{
        normalize::{NormalizedReceipt, normalize_items},
        persist::save_receipt,
    },
    user::UserID,
};

/// The state needed for saving a receipt.
#[derive(Debug, Clone)]
pub struct SaveReceiptState {
    /// The database connection for persisting receipts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for SaveReceiptState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Route handler for saving a reviewed receipt.
///
/// The payload carries the same shape the scan endpoint returned, possibly
/// edited by the user, so it goes through the same item-level validation:
/// invalid items are dropped silently, and the save is rejected only when
/// a header field is blank or no items survive.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn save_receipt_endpoint(
    State(state): State<SaveReceiptState>,
    Extension(user_id): Extension<UserID>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    let transaction_date = string_field(&payload, "transaction_date");
    if transaction_date.is_empty() {
        return Error::MissingField("transaction_date").into_response();
    }

    let merchant_name = string_field(&payload, "merchant_name");
    if merchant_name.is_empty() {
        return Error::MissingField("merchant_name").into_response();
    }

    let raw_items = payload
        .get("items")
        .and_then(|items| items.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();
    if raw_items.is_empty() {
        return Error::EmptyItems.into_response();
    }

    let items = normalize_items(raw_items);
    if items.is_empty() {
        return Error::NoValidLineItems.into_response();
    }

    let receipt = NormalizedReceipt {
        transaction_date: transaction_date.to_owned(),
        merchant_name: merchant_name.to_owned(),
        items,
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match save_receipt(&receipt, user_id, &connection) {
        Ok(saved) => Json(serde_json::json!({
            "success": true,
            "transaction_id": saved.transaction_id,
            "inserted_count": saved.inserted_count,
        }))
        .into_response(),
        Err(error) => {
            tracing::error!("Could not save receipt for user {user_id}: {error}");
            error.into_response()
        }
    }
}

fn string_field<'a>(payload: &'a serde_json::Value, field: &str) -> &'a str {
    payload
        .get(field)
        .and_then(|value| value.as_str())
        .unwrap_or_default()
        .trim()
}
