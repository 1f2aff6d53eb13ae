//! The endpoint for listing the current user's transaction history.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{AppState, Error, transaction::get_transactions_with_items, user::UserID};

/// The state needed for listing transactions.
#[derive(Debug, Clone)]
pub struct TransactionListState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionListState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Route handler for listing the current user's transactions with their
/// merchant names, items, and recomputed totals.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_transactions_endpoint(
    State(state): State<TransactionListState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match get_transactions_with_items(user_id, &connection) {
        Ok(transactions) => {
            Json(serde_json::json!({ "transactions": transactions })).into_response()
        }
        Err(error) => {
            tracing::error!("Could not list transactions for user {user_id}: {error}");
            error.into_response()
        }
    }
}
