//! User-defined spending categories: the domain type, database operations,
//! and the list/create endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{AppState, Error, api::error_response, user::UserID};

/// Database identifier for a category.
pub type CategoryId = i64;

/// A spending category created by a user.
///
/// Categories are scoped to their owning user and are never shared. Names are
/// not required to be unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// The category's ID in the application database.
    pub id: CategoryId,
    /// The display name, e.g. 'Groceries'.
    pub name: String,
    /// When the category was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Initialize the user category table.
pub fn create_user_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user_category (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// Create a category for `user_id` and return it with its generated ID.
pub fn create_category(
    user_id: UserID,
    name: &str,
    connection: &Connection,
) -> Result<Category, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO user_category (user_id, name, created_at) VALUES (?1, ?2, ?3);",
        (user_id.as_i64(), name, created_at),
    )?;

    let id = connection.last_insert_rowid();

    Ok(Category {
        id,
        name: name.to_owned(),
        created_at,
    })
}

/// Retrieve the categories owned by `user_id`, ordered alphabetically by name.
pub fn get_categories(user_id: UserID, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, name, created_at FROM user_category
             WHERE user_id = :user_id ORDER BY name ASC;",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

/// The state needed for listing and creating categories.
#[derive(Debug, Clone)]
pub struct CategoryState {
    /// The database connection for managing categories.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating a category.
#[derive(Debug, Serialize, Deserialize)]
pub struct NewCategoryData {
    /// The display name for the new category.
    #[serde(default)]
    pub name: String,
}

/// Route handler for listing the current user's categories.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn list_categories_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match get_categories(user_id, &connection) {
        Ok(categories) => Json(serde_json::json!({ "categories": categories })).into_response(),
        Err(error) => {
            tracing::error!("Could not list categories for user {user_id}: {error}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Failed to fetch categories: {error}"),
            )
        }
    }
}

/// Route handler for creating a category.
///
/// Returns a 400 response if the name is empty after trimming.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    Extension(user_id): Extension<UserID>,
    Json(new_category): Json<NewCategoryData>,
) -> Response {
    let name = new_category.name.trim();

    if name.is_empty() {
        return Error::EmptyCategoryName.into_response();
    }

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match create_category(user_id, name, &connection) {
        Ok(category) => Json(serde_json::json!({ "category": category })).into_response(),
        Err(error) => {
            tracing::error!("Could not create category for user {user_id}: {error}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Failed to create category: {error}"),
            )
        }
    }
}

#[cfg(test)]
mod category_query_tests {
    use rusqlite::Connection;

    use crate::{PasswordHash, initialize_db, user::create_user};

    use super::{create_category, get_categories};

    fn get_test_db_connection() -> (Connection, crate::UserID) {
        let connection = Connection::open_in_memory().unwrap();
        initialize_db(&connection).expect("Could not initialize database");
        let user = create_user(
            "foo@bar.baz",
            PasswordHash::new_unchecked("hunter2"),
            &connection,
        )
        .unwrap();

        (connection, user.id)
    }

    #[test]
    fn create_category_succeeds() {
        let (connection, user_id) = get_test_db_connection();

        let category = create_category(user_id, "Groceries", &connection)
            .expect("Could not create category");

        assert!(category.id > 0);
        assert_eq!(category.name, "Groceries");
    }

    #[test]
    fn get_categories_orders_by_name() {
        let (connection, user_id) = get_test_db_connection();
        create_category(user_id, "Transport", &connection).unwrap();
        create_category(user_id, "Groceries", &connection).unwrap();

        let categories = get_categories(user_id, &connection).unwrap();

        let names: Vec<&str> = categories
            .iter()
            .map(|category| category.name.as_str())
            .collect();
        assert_eq!(names, ["Groceries", "Transport"]);
    }

    #[test]
    fn get_categories_is_scoped_to_the_owning_user() {
        let (connection, user_id) = get_test_db_connection();
        let other_user = crate::user::create_user(
            "bar@baz.qux",
            crate::PasswordHash::new_unchecked("hunter3"),
            &connection,
        )
        .unwrap();
        create_category(user_id, "Groceries", &connection).unwrap();
        create_category(other_user.id, "Rent", &connection).unwrap();

        let categories = get_categories(user_id, &connection).unwrap();

        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "Groceries");
    }
}
