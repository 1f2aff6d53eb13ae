//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    response::Response,
    routing::{delete, get, post},
};

use crate::{
    AppState,
    api::error_response,
    auth_middleware::auth_guard,
    category::{create_category_endpoint, list_categories_endpoint},
    endpoints,
    log_in::post_log_in,
    log_out::get_log_out,
    receipt::{save_receipt_endpoint, scan_receipt_endpoint},
    register_user::register_user,
    transaction::{delete_transaction_endpoint, get_transactions_endpoint},
};

/// The largest receipt image upload accepted by the scan endpoint.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::USERS, post(register_user))
        .route(endpoints::LOG_IN, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out));

    let protected_routes = Router::new()
        .route(
            endpoints::CATEGORIES,
            get(list_categories_endpoint).post(create_category_endpoint),
        )
        .route(
            endpoints::SCAN,
            post(scan_receipt_endpoint).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route(endpoints::SAVE_RECEIPT, post(save_receipt_endpoint))
        .route(endpoints::TRANSACTIONS, get(get_transactions_endpoint))
        .route(
            endpoints::DELETE_TRANSACTION,
            delete(delete_transaction_endpoint),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_not_found)
        .with_state(state)
}

async fn get_not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found.")
}

#[cfg(test)]
mod router_tests {
    use axum_test::TestServer;
    use rusqlite::Connection;

    use crate::{AppState, auth_cookie::COOKIE_TOKEN, build_router, endpoints};

    fn get_test_server() -> TestServer {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        let state = AppState::new(connection, "wubbalubbadubdub", None)
            .expect("Could not create app state");

        TestServer::new(build_router(state))
    }

    #[tokio::test]
    async fn protected_routes_require_authentication() {
        let server = get_test_server();

        for (method, path) in [
            ("GET", endpoints::CATEGORIES),
            ("POST", endpoints::CATEGORIES),
            ("POST", endpoints::SCAN),
            ("POST", endpoints::SAVE_RECEIPT),
            ("GET", endpoints::TRANSACTIONS),
        ] {
            let response = match method {
                "GET" => server.get(path).await,
                _ => server.post(path).await,
            };

            response.assert_status_unauthorized();
            let json: serde_json::Value = response.json();
            assert_eq!(json["error"], "Unauthorized", "for {method} {path}");
        }
    }

    #[tokio::test]
    async fn unknown_routes_return_not_found() {
        let server = get_test_server();

        let response = server.get("/api/nonsense").await;

        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn register_then_manage_categories_round_trip() {
        let server = get_test_server();

        let response = server
            .post(endpoints::USERS)
            .json(&serde_json::json!({
                "email": "foo@bar.baz",
                "password": "okon rigid spelling bypass",
            }))
            .await;
        response.assert_status_ok();
        let token_cookie = response.cookie(COOKIE_TOKEN);

        let response = server
            .post(endpoints::CATEGORIES)
            .add_cookie(token_cookie.clone())
            .json(&serde_json::json!({ "name": "Groceries" }))
            .await;
        response.assert_status_ok();
        let json: serde_json::Value = response.json();
        assert_eq!(json["category"]["name"], "Groceries");

        let response = server
            .get(endpoints::CATEGORIES)
            .add_cookie(token_cookie)
            .await;
        response.assert_status_ok();
        let json: serde_json::Value = response.json();
        assert_eq!(json["categories"][0]["name"], "Groceries");
    }

    #[tokio::test]
    async fn save_receipt_then_browse_history_round_trip() {
        let server = get_test_server();

        let response = server
            .post(endpoints::USERS)
            .json(&serde_json::json!({
                "email": "foo@bar.baz",
                "password": "okon rigid spelling bypass",
            }))
            .await;
        response.assert_status_ok();
        let token_cookie = response.cookie(COOKIE_TOKEN);

        let response = server
            .post(endpoints::SAVE_RECEIPT)
            .add_cookie(token_cookie.clone())
            .json(&serde_json::json!({
                "transaction_date": "2024-01-05",
                "merchant_name": "Cafe",
                "items": [
                    { "item_name": "Latte", "item_price": 4.5, "item_cat_1": "Food" },
                    { "item_name": "Muffin", "item_price": 3.25 },
                ],
            }))
            .await;
        response.assert_status_ok();
        let json: serde_json::Value = response.json();
        assert_eq!(json["success"], true);
        assert_eq!(json["inserted_count"], 2);
        let transaction_id = json["transaction_id"].as_i64().unwrap();

        let response = server
            .get(endpoints::TRANSACTIONS)
            .add_cookie(token_cookie.clone())
            .await;
        response.assert_status_ok();
        let json: serde_json::Value = response.json();
        assert_eq!(json["transactions"][0]["id"], transaction_id);
        assert_eq!(json["transactions"][0]["merchant_name"], "Cafe");
        assert_eq!(json["transactions"][0]["total"], 7.75);
        assert_eq!(
            json["transactions"][0]["items"][1]["item_cat_1"],
            "Uncategorized"
        );

        let response = server
            .delete(&endpoints::format_endpoint(
                endpoints::DELETE_TRANSACTION,
                transaction_id,
            ))
            .add_cookie(token_cookie.clone())
            .await;
        response.assert_status_ok();

        let response = server
            .get(endpoints::TRANSACTIONS)
            .add_cookie(token_cookie)
            .await;
        let json: serde_json::Value = response.json();
        assert!(json["transactions"].as_array().unwrap().is_empty());
    }
}
