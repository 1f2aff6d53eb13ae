//! The API endpoint URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/transactions/{transaction_id}',
//! use [format_endpoint].

/// The route to create a user account.
pub const USERS: &str = "/api/users";
/// The route for logging in a user.
pub const LOG_IN: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to list and create the current user's categories.
pub const CATEGORIES: &str = "/api/categories";
/// The route to upload a receipt image for extraction.
pub const SCAN: &str = "/api/scan";
/// The route to persist a reviewed receipt.
pub const SAVE_RECEIPT: &str = "/api/save-receipt";
/// The route to list the current user's transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to delete a single transaction.
pub const DELETE_TRANSACTION: &str = "/api/transactions/{transaction_id}";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/transactions/{transaction_id}',
/// '{transaction_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::format_endpoint;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok(), "invalid URI: {uri}");
    }

    #[test]
    fn endpoints_are_valid_uris() {
        for endpoint in [
            endpoints::USERS,
            endpoints::LOG_IN,
            endpoints::LOG_OUT,
            endpoints::CATEGORIES,
            endpoints::SCAN,
            endpoints::SAVE_RECEIPT,
            endpoints::TRANSACTIONS,
        ] {
            assert_endpoint_is_valid_uri(endpoint);
        }

        assert_endpoint_is_valid_uri(&format_endpoint(endpoints::DELETE_TRANSACTION, 42));
    }

    #[test]
    fn format_endpoint_replaces_parameter() {
        let formatted = format_endpoint(endpoints::DELETE_TRANSACTION, 123);

        assert_eq!(formatted, "/api/transactions/123");
    }

    #[test]
    fn format_endpoint_without_parameter_returns_path_unchanged() {
        let formatted = format_endpoint(endpoints::TRANSACTIONS, 123);

        assert_eq!(formatted, endpoints::TRANSACTIONS);
    }
}
