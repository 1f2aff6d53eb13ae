//! Creates the application's database schema.

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{
    Error,
    category::create_user_category_table,
    merchant::create_merchant_table,
    transaction::{create_item_table, create_transaction_table},
    user::create_user_table,
};

/// Create the tables for the domain models.
///
/// Foreign key enforcement is turned on for the connection so that deleting a
/// transaction cascades to its items.
///
/// # Errors
/// Returns an error if a table could not be created or if there is an SQL error.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // The foreign_keys pragma is a no-op inside a transaction, so set it first.
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_merchant_table(&transaction)?;
    create_user_category_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_item_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
