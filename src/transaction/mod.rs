//! Transactions and their line items: the domain types, database operations,
//! and the history listing and delete endpoints.

mod db;
mod delete_endpoint;
mod list_endpoint;
mod models;

pub use db::{
    create_item_table, create_transaction_table, delete_transaction, get_items,
    get_transactions_with_items, insert_items, insert_transaction,
};
pub use delete_endpoint::delete_transaction_endpoint;
pub use list_endpoint::get_transactions_endpoint;
pub use models::{ItemId, ItemSummary, NewItem, TransactionId, TransactionSummary};
