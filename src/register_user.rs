//! The endpoint for registering a new user account.

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
    AppState, Error, PasswordHash,
    auth_cookie::{DEFAULT_COOKIE_DURATION, set_auth_cookie},
    state::create_cookie_key,
    user::create_user,
};

/// The data submitted when registering a new account.
#[derive(Debug, Deserialize)]
pub struct RegisterData {
    /// The email address to register with.
    pub email: String,
    /// The plain text password chosen by the user.
    pub password: String,
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The database connection for creating users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl RegistrationState {
    /// Create the cookie key from a string and set the default cookie duration.
    pub fn new(cookie_secret: &str, db_connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            db_connection,
        }
    }
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<RegistrationState> for Key {
    fn from_ref(state: &RegistrationState) -> Self {
        state.cookie_key.clone()
    }
}

/// Handler for registering a new user account.
///
/// On success the auth cookie is set and the new user's ID is returned.
///
/// # Errors
///
/// Responds with an error if:
/// - the email is empty after trimming,
/// - the password is too weak,
/// - or the email is already registered.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn register_user(
    State(state): State<RegistrationState>,
    jar: PrivateCookieJar,
    Json(register_data): Json<RegisterData>,
) -> Response {
    let email = register_data.email.trim();

    if email.is_empty() {
        return Error::MissingField("email").into_response();
    }

    let password_hash =
        match PasswordHash::from_raw_password(&register_data.password, PasswordHash::DEFAULT_COST) {
            Ok(password_hash) => password_hash,
            Err(error) => return error.into_response(),
        };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    let user = match create_user(email, password_hash, &connection) {
        Ok(user) => user,
        Err(error) => return error.into_response(),
    };

    match set_auth_cookie(jar, user.id, state.cookie_duration) {
        Ok(updated_jar) => (
            StatusCode::OK,
            updated_jar,
            Json(serde_json::json!({ "user_id": user.id })),
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Could not set auth cookie after registration: {error}");
            error.into_response()
        }
    }
}
