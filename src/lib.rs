//! Spendscan is a web app for turning photos of paper receipts into
//! transaction history.
//!
//! Users upload a receipt image, an external vision model extracts the line
//! items, and after review the receipt is saved as a transaction with its
//! items. This library provides the JSON REST API.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

use crate::api::error_response;

mod api;
mod auth_cookie;
mod auth_middleware;
mod category;
mod db;
mod endpoints;
mod log_in;
mod log_out;
mod logging;
mod merchant;
mod password;
mod receipt;
mod register_user;
mod routing;
mod state;
mod transaction;
mod user;

pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use password::{PasswordHash, ValidatedPassword};
pub use receipt::VisionClient;
pub use routing::build_router;
pub use state::AppState;
pub use user::{User, UserID, get_user_by_id};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an invalid combination of email and password.
    #[error("Invalid email or password.")]
    InvalidCredentials,

    /// The auth token cookie is missing from the cookie jar in the request.
    #[error("no auth token cookie in the cookie jar")]
    CookieMissing,

    /// There was an error formatting or parsing a date-time, e.g. for the
    /// auth token expiry.
    ///
    /// Callers should pass in the original error as a string.
    #[error("could not handle a date-time value: {0}")]
    DateError(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The email used to register already belongs to a user.
    #[error("The email address is already registered.")]
    DuplicateEmail,

    /// A required request field was missing or empty after trimming.
    ///
    /// The field name is interpolated into the client-facing message, e.g.
    /// "transaction_date is required.".
    #[error("{0} is required.")]
    MissingField(&'static str),

    /// A receipt was submitted for saving without any items at all.
    #[error("At least one item is required.")]
    EmptyItems,

    /// An empty string was used to create a category.
    #[error("Category name is required.")]
    EmptyCategoryName,

    /// The multipart form for a receipt scan did not contain a file field.
    #[error("No file uploaded.")]
    MissingFile,

    /// The multipart form could not be parsed.
    #[error("Could not parse multipart form: {0}")]
    MultipartError(String),

    /// The server was started without the vision API credential, so receipt
    /// scanning is unavailable.
    #[error("Missing GEMINI_API_KEY environment variable.")]
    MissingApiKey,

    /// The request to the vision model failed before any text came back.
    #[error("Receipt scan failed: {0}")]
    VisionRequest(String),

    /// The vision model returned text that is not JSON, even after stripping
    /// code fences.
    ///
    /// Carries the raw model text so the client can show it for diagnosis.
    #[error("Gemini returned non-JSON output.")]
    ExtractionParse {
        /// The unsanitized text returned by the model.
        raw: String,
    },

    /// The extraction parsed as JSON but is structurally incomplete: a blank
    /// merchant name, a blank transaction date, or no items at all.
    #[error("Gemini returned an invalid receipt payload.")]
    InvalidReceiptPayload,

    /// Every candidate line item failed item-level validation.
    #[error("No valid line items available to save.")]
    NoValidLineItems,

    /// The merchant row could not be looked up or created.
    #[error("Unable to resolve merchant: {0}")]
    MerchantResolution(String),

    /// The transaction row could not be inserted. Any merchant row created
    /// moments before remains in place.
    #[error("Failed to create transaction: {0}")]
    TransactionInsert(String),

    /// The item rows could not be inserted. The transaction row already
    /// committed remains in place with zero items.
    #[error("Failed to save items: {0}")]
    ItemInsert(String),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::InvalidCredentials | Error::CookieMissing => {
                error_response(StatusCode::UNAUTHORIZED, "Unauthorized")
            }
            Error::TooWeak(_)
            | Error::MissingField(_)
            | Error::EmptyItems
            | Error::EmptyCategoryName
            | Error::MissingFile
            | Error::MultipartError(_) => {
                error_response(StatusCode::BAD_REQUEST, &self.to_string())
            }
            Error::DuplicateEmail => error_response(StatusCode::CONFLICT, &self.to_string()),
            Error::MissingApiKey => {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, &self.to_string())
            }
            Error::ExtractionParse { ref raw } => (
                StatusCode::BAD_GATEWAY,
                axum::Json(serde_json::json!({ "error": self.to_string(), "raw": raw })),
            )
                .into_response(),
            Error::InvalidReceiptPayload | Error::NoValidLineItems => {
                error_response(StatusCode::UNPROCESSABLE_ENTITY, &self.to_string())
            }
            Error::MerchantResolution(_)
            | Error::TransactionInsert(_)
            | Error::ItemInsert(_)
            | Error::VisionRequest(_) => {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, &self.to_string())
            }
            Error::NotFound | Error::DeleteMissingTransaction => {
                error_response(StatusCode::NOT_FOUND, "Not found.")
            }
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred, check the server logs for more details.",
                )
            }
        }
    }
}

#[cfg(test)]
mod error_response_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::Error;

    #[tokio::test]
    async fn missing_field_names_the_field_in_the_message() {
        let response = Error::MissingField("transaction_date").into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "transaction_date is required.");
    }

    #[tokio::test]
    async fn extraction_parse_includes_raw_model_text() {
        let response = Error::ExtractionParse {
            raw: "not json at all".to_owned(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Gemini returned non-JSON output.");
        assert_eq!(json["raw"], "not json at all");
    }

    #[tokio::test]
    async fn sql_errors_are_not_shown_to_the_client() {
        let response = Error::SqlError(rusqlite::Error::InvalidQuery).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(
            !json["error"].as_str().unwrap().contains("SQL"),
            "internal detail leaked to the client: {json}"
        );
    }
}
