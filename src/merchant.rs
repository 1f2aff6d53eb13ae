//! Merchant rows and the lookup-or-create resolution used when saving receipts.

use rusqlite::{Connection, Row};

use crate::Error;

/// Database identifier for a merchant.
pub type MerchantId = i64;

/// A merchant that appeared on at least one receipt.
///
/// Merchants are shared between users and are never updated or deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct Merchant {
    /// The merchant's ID in the application database.
    pub id: MerchantId,
    /// The display name as it first appeared on a receipt.
    pub name: String,
}

/// Initialize the merchant table.
pub fn create_merchant_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS merchant (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_merchant_name ON merchant(name);",
    )?;

    Ok(())
}

/// Find a merchant by name using a case-insensitive exact match.
///
/// If multiple rows match (possible when concurrent saves raced on the same
/// new name), the first match wins.
pub fn find_merchant_by_name(name: &str, connection: &Connection) -> Result<Option<Merchant>, Error> {
    let mut statement = connection.prepare(
        "SELECT id, name FROM merchant WHERE name = :name COLLATE NOCASE ORDER BY id ASC LIMIT 1;",
    )?;
    let mut rows = statement.query_map(&[(":name", &name)], map_row)?;

    match rows.next() {
        Some(merchant) => Ok(Some(merchant?)),
        None => Ok(None),
    }
}

/// Create a merchant and return it with its generated ID.
pub fn create_merchant(name: &str, connection: &Connection) -> Result<Merchant, Error> {
    connection.execute("INSERT INTO merchant (name) VALUES (?1);", (name,))?;

    let id = connection.last_insert_rowid();

    Ok(Merchant {
        id,
        name: name.to_owned(),
    })
}

/// Look up a merchant by name, creating it if it does not exist yet.
///
/// The lookup and the insert are two separate statements with no lock in
/// between: two concurrent saves for the same brand-new name can both miss
/// the lookup and create duplicate rows. Later saves will consistently pick
/// the row with the lowest ID.
///
/// # Errors
/// This function will return an error if the lookup or the insert failed.
pub fn resolve_or_create_merchant(
    name: &str,
    connection: &Connection,
) -> Result<MerchantId, Error> {
    if let Some(merchant) = find_merchant_by_name(name, connection)? {
        return Ok(merchant.id);
    }

    let merchant = create_merchant(name, connection)?;
    tracing::info!("Created merchant {} ({})", merchant.name, merchant.id);

    Ok(merchant.id)
}

fn map_row(row: &Row) -> Result<Merchant, rusqlite::Error> {
    Ok(Merchant {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}
