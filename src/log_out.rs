//! Log-out route handler that invalidates the authentication cookie.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;

use crate::auth_cookie::invalidate_auth_cookie;

/// Invalidate the auth cookie.
pub async fn get_log_out(jar: PrivateCookieJar) -> Response {
    let jar = invalidate_auth_cookie(jar);

    (jar, Json(serde_json::json!({ "success": true }))).into_response()
}
