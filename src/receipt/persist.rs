//! The orchestrator that turns a normalized receipt into durable rows.

use rusqlite::Connection;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    Error,
    merchant::resolve_or_create_merchant,
    receipt::normalize::NormalizedReceipt,
    transaction::{TransactionId, insert_items, insert_transaction},
    user::UserID,
};

/// The calendar date format receipts are saved with, e.g. "2024-01-05".
const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// The result of a successful receipt save.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedReceipt {
    /// The ID of the newly created transaction.
    pub transaction_id: TransactionId,
    /// The number of item rows inserted.
    pub inserted_count: usize,
}

/// Persist a normalized receipt as a merchant reference, one transaction,
/// and its item rows.
///
/// The three steps run strictly in order and are *not* wrapped in a database
/// transaction. A failure aborts the sequence but leaves earlier rows in
/// place: a merchant created for a save whose transaction insert fails
/// remains, and a transaction whose item insert fails remains with zero
/// items. Such orphans are harmless because totals are always recomputed
/// from whatever items exist, and they are never cleaned up automatically.
///
/// # Errors
///
/// Each step surfaces its own error so the caller can name the failed step:
/// [Error::MerchantResolution], [Error::TransactionInsert] (which also covers
/// a transaction date that does not parse as YYYY-MM-DD), or
/// [Error::ItemInsert].
pub fn save_receipt(
    receipt: &NormalizedReceipt,
    user_id: UserID,
    connection: &Connection,
) -> Result<SavedReceipt, Error> {
    let merchant_id = resolve_or_create_merchant(&receipt.merchant_name, connection)
        .map_err(|error| Error::MerchantResolution(error.to_string()))?;

    let date = Date::parse(&receipt.transaction_date, DATE_FORMAT).map_err(|_| {
        Error::TransactionInsert(format!(
            "invalid transaction date {:?}",
            receipt.transaction_date
        ))
    })?;

    let transaction_id = insert_transaction(merchant_id, date, user_id, connection)
        .map_err(|error| Error::TransactionInsert(error.to_string()))?;

    let inserted_count = insert_items(transaction_id, &receipt.items, connection)
        .map_err(|error| Error::ItemInsert(error.to_string()))?;

    tracing::info!(
        "Saved receipt for user {user_id}: transaction {transaction_id} with {inserted_count} items"
    );

    Ok(SavedReceipt {
        transaction_id,
        inserted_count,
    })
}

#[cfg(test)]
mod save_receipt_tests {
    use rusqlite::Connection;

    use crate::{
        Error, PasswordHash, UserID, initialize_db,
        merchant::find_merchant_by_name,
        receipt::normalize::NormalizedReceipt,
        transaction::{NewItem, get_transactions_with_items},
        user::create_user,
    };

    use super::save_receipt;

    fn get_test_db_connection() -> (Connection, UserID) {
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

    fn test_receipt() -> NormalizedReceipt {
        NormalizedReceipt {
            transaction_date: "2024-01-05".to_owned(),
            merchant_name: "Cafe".to_owned(),
            items: vec![
                NewItem {
                    name: "Latte".to_owned(),
                    price: 4.5,
                    category: "Food".to_owned(),
                },
                NewItem {
                    name: "Muffin".to_owned(),
                    price: 3.25,
                    category: "Uncategorized".to_owned(),
                },
            ],
        }
    }

    #[test]
    fn save_inserts_transaction_and_items() {
        let (connection, user_id) = get_test_db_connection();

        let saved = save_receipt(&test_receipt(), user_id, &connection).unwrap();

        assert!(saved.transaction_id > 0);
        assert_eq!(saved.inserted_count, 2);

        let transactions = get_transactions_with_items(user_id, &connection).unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].merchant_name, "Cafe");
        assert_eq!(transactions[0].items.len(), 2);
    }

    #[test]
    fn merchant_resolution_is_idempotent_across_saves() {
        let (connection, user_id) = get_test_db_connection();

        save_receipt(&test_receipt(), user_id, &connection).unwrap();
        let mut second_receipt = test_receipt();
        second_receipt.merchant_name = "CAFE".to_owned();
        save_receipt(&second_receipt, user_id, &connection).unwrap();

        let merchant = find_merchant_by_name("cafe", &connection).unwrap().unwrap();
        let mut statement = connection
            .prepare("SELECT COUNT(id) FROM merchant")
            .unwrap();
        let merchant_count: i64 = statement.query_row([], |row| row.get(0)).unwrap();

        assert_eq!(merchant_count, 1);
        assert_eq!(merchant.name, "Cafe");
    }

    #[test]
    fn invalid_date_fails_the_transaction_step_and_keeps_the_merchant() {
        let (connection, user_id) = get_test_db_connection();
        let mut receipt = test_receipt();
        receipt.transaction_date = "05/01/2024".to_owned();

        let result = save_receipt(&receipt, user_id, &connection);

        assert!(
            matches!(result, Err(Error::TransactionInsert(_))),
            "got {result:?}"
        );
        // No rollback: the merchant created before the failing step remains.
        assert!(
            find_merchant_by_name("Cafe", &connection)
                .unwrap()
                .is_some()
        );
        assert!(
            get_transactions_with_items(user_id, &connection)
                .unwrap()
                .is_empty()
        );
    }
}
