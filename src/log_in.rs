//! The endpoint for logging in with an email and password.
//! The auth_cookie module handles the lower level cookie auth logic.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;
use serde::Deserialize;
use time::Duration;

use crate::{
    AppState, Error,
    auth_cookie::{DEFAULT_COOKIE_DURATION, set_auth_cookie},
    state::create_cookie_key,
    user::{User, get_user_by_email},
};

/// The credentials submitted at log-in.
#[derive(Debug, Deserialize)]
pub struct LogInData {
    /// The email address the user registered with.
    pub email: String,
    /// The plain text password.
    pub password: String,
}

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The database connection for looking up users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl LoginState {
    /// Create the cookie key from a string and set the default cookie duration.
    pub fn new(cookie_secret: &str, db_connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            db_connection,
        }
    }
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request the auth cookie is set and the user's ID is
/// returned. A wrong email and a wrong password both produce the same
/// response so the client cannot tell which one was incorrect.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    Json(log_in_data): Json<LogInData>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    let user: User = match get_user_by_email(log_in_data.email.trim(), &connection) {
        Ok(user) => user,
        Err(Error::NotFound) => return Error::InvalidCredentials.into_response(),
        Err(error) => {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            return error.into_response();
        }
    };

    let is_password_valid = match user.password_hash.verify(&log_in_data.password) {
        Ok(is_password_valid) => is_password_valid,
        Err(error) => {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            return Error::HashingError(error.to_string()).into_response();
        }
    };

    if !is_password_valid {
        return Error::InvalidCredentials.into_response();
    }

    match set_auth_cookie(jar, user.id, state.cookie_duration) {
        Ok(updated_jar) => (
            StatusCode::OK,
            updated_jar,
            Json(serde_json::json!({ "success": true, "user_id": user.id })),
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Could not set auth cookie at log-in: {error}");
            error.into_response()
        }
    }
}
