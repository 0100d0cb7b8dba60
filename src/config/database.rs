//! Database configuration module.
//!
//! Connects to the ledger database and creates every table from the entity
//! definitions with `Schema::create_table_from_entity`, so the schema always matches
//! the Rust structs. Composite uniqueness rules that a single column attribute cannot
//! express are added as explicit unique indexes.

use crate::entities::{
    Batch, BatchColumn, CheckoutOrder, Customer, CustomerColumn, Inventory, InventoryColumn,
    Medicine, OrderLine, Organization, Payment, Supplier, SupplierOrder, SupplierPaymentRecord,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::Path;
use tracing::info;

/// Fallback location of the `SQLite` ledger file.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/pharmacy.sqlite?mode=rwc";

/// Directory that must exist before a file-backed `SQLite` URL can be opened.
///
/// Returns `None` for in-memory databases, other backends and bare file names.
#[must_use]
pub fn sqlite_parent_dir(database_url: &str) -> Option<&Path> {
    let rest = database_url.strip_prefix("sqlite:")?;
    let path = rest.trim_start_matches("//").split('?').next()?;
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Path::new(path).parent().filter(|dir| !dir.as_os_str().is_empty())
}

/// Establishes a connection to the given database URL.
///
/// For a file-backed `SQLite` database the containing directory is created first.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    if let Some(dir) = sqlite_parent_dir(database_url) {
        std::fs::create_dir_all(dir)?;
    }
    Database::connect(database_url).await.map_err(Into::into)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(builder.build(&stmt)).await?;
    Ok(())
}

/// Creates all ledger tables and their unique indexes.
///
/// Tables are created parent-first so foreign keys always point at an existing
/// table. Safe to call on an already initialised database.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_table(db, &schema, Organization).await?;
    create_table(db, &schema, Medicine).await?;
    create_table(db, &schema, Inventory).await?;
    create_table(db, &schema, Batch).await?;
    create_table(db, &schema, Customer).await?;
    create_table(db, &schema, CheckoutOrder).await?;
    create_table(db, &schema, OrderLine).await?;
    create_table(db, &schema, Payment).await?;
    create_table(db, &schema, Supplier).await?;
    create_table(db, &schema, SupplierOrder).await?;
    create_table(db, &schema, SupplierPaymentRecord).await?;

    let unique_indexes = [
        Index::create()
            .name("idx_inventories_medicine_organization")
            .table(Inventory)
            .col(InventoryColumn::MedicineId)
            .col(InventoryColumn::OrganizationId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_batches_inventory_number")
            .table(Batch)
            .col(BatchColumn::InventoryId)
            .col(BatchColumn::BatchNumber)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_customers_organization_name_contact")
            .table(Customer)
            .col(CustomerColumn::OrganizationId)
            .col(CustomerColumn::Name)
            .col(CustomerColumn::Contact)
            .unique()
            .if_not_exists()
            .to_owned(),
    ];
    for index in &unique_indexes {
        db.execute(builder.build(index)).await?;
    }

    info!("Ledger schema ready");
    Ok(())
}
