//! Database operations for transactions and items.

use rusqlite::{Connection, Row};
use time::Date;

use crate::{
    Error,
    transaction::{ItemSummary, NewItem, TransactionId, TransactionSummary},
    user::UserID,
};

/// Initialize the transaction table.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY,
            merchant_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            category_id INTEGER,
            user_id INTEGER NOT NULL,
            FOREIGN KEY(merchant_id) REFERENCES merchant(id),
            FOREIGN KEY(category_id) REFERENCES user_category(id) ON DELETE SET NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// Initialize the item table.
///
/// Items cannot outlive their transaction, deleting a transaction cascades
/// to its items.
pub fn create_item_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS item (
            id INTEGER PRIMARY KEY,
            transaction_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            price REAL NOT NULL,
            category TEXT NOT NULL,
            FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id) ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// Insert a transaction row and return its generated ID.
///
/// The category reference is left unset, categorization happens at the item
/// level when a receipt is saved.
pub fn insert_transaction(
    merchant_id: i64,
    date: Date,
    user_id: UserID,
    connection: &Connection,
) -> Result<TransactionId, Error> {
    connection.execute(
        "INSERT INTO \"transaction\" (merchant_id, date, user_id) VALUES (?1, ?2, ?3)",
        (merchant_id, date, user_id.as_i64()),
    )?;

    Ok(connection.last_insert_rowid())
}

/// Insert all of `items` referencing `transaction_id` and return the number
/// of rows inserted.
pub fn insert_items(
    transaction_id: TransactionId,
    items: &[NewItem],
    connection: &Connection,
) -> Result<usize, Error> {
    let mut statement = connection.prepare(
        "INSERT INTO item (transaction_id, name, price, category) VALUES (?1, ?2, ?3, ?4)",
    )?;

    for item in items {
        statement.execute((transaction_id, &item.name, item.price, &item.category))?;
    }

    Ok(items.len())
}

/// Retrieve the items of a transaction in insertion order.
pub fn get_items(
    transaction_id: TransactionId,
    connection: &Connection,
) -> Result<Vec<ItemSummary>, Error> {
    connection
        .prepare(
            "SELECT id, name, price, category FROM item
             WHERE transaction_id = :transaction_id ORDER BY id ASC",
        )?
        .query_map(&[(":transaction_id", &transaction_id)], map_item_row)?
        .map(|maybe_item| maybe_item.map_err(|error| error.into()))
        .collect()
}

/// Retrieve the transactions of `user_id` with their merchant names and
/// items, newest date first.
///
/// Each transaction's total is recomputed as the sum of its item prices.
pub fn get_transactions_with_items(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<TransactionSummary>, Error> {
    let headers: Vec<(TransactionId, String, String)> = connection
        .prepare(
            "SELECT t.id, t.date, m.name FROM \"transaction\" t
             INNER JOIN merchant m ON t.merchant_id = m.id
             WHERE t.user_id = :user_id
             ORDER BY t.date DESC, t.id DESC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<Result<_, _>>()?;

    headers
        .into_iter()
        .map(|(id, transaction_date, merchant_name)| {
            let items = get_items(id, connection)?;
            let total = items.iter().map(|item| item.item_price).sum();

            Ok(TransactionSummary {
                id,
                transaction_date,
                merchant_name,
                total,
                items,
            })
        })
        .collect()
}

type RowsAffected = usize;

/// Delete a transaction owned by `user_id`. Item rows cascade.
///
/// Returns the number of rows affected, zero when the transaction does not
/// exist or belongs to another user.
pub fn delete_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<RowsAffected, Error> {
    connection
        .execute(
            "DELETE FROM \"transaction\" WHERE id = :id AND user_id = :user_id",
            &[(":id", &id), (":user_id", &user_id.as_i64())],
        )
        .map_err(|err| err.into())
}

fn map_item_row(row: &Row) -> Result<ItemSummary, rusqlite::Error> {
    Ok(ItemSummary {
        id: row.get(0)?,
        item_name: row.get(1)?,
        item_price: row.get(2)?,
        item_cat_1: row.get(3)?,
    })
}
