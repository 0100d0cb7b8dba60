//! Shared test utilities for the pharmacy ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        customer,
        stock::{self, NewBatch, NewMedicine},
        supplier::{self, NewSupplier, NewSupplierOrder},
        tenant::{self, Tenant},
    },
    entities::{self, CheckoutStatus},
    errors::Result,
};
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test organization named `name` with no contact number.
pub async fn create_test_organization(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::organization::Model> {
    tenant::create_organization(db, name.to_string(), "Test Address".to_string(), None).await
}

/// Creates a catalog medicine.
///
/// # Defaults
/// * `dosage`: "500mg"
/// * packaging: 10 pieces per strip, 10 strips per box, 100 pieces per box
pub async fn create_test_medicine(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::medicine::Model> {
    stock::create_medicine(
        db,
        NewMedicine {
            name: name.to_string(),
            generic_name: Some("Paracetamol".to_string()),
            dosage: "500mg".to_string(),
            pieces_per_strip: 10,
            strips_per_box: 10,
            pieces_per_box: 100,
            ..Default::default()
        },
    )
    .await
}

/// Stock-in request for `quantity` pieces with a generated batch number.
///
/// # Defaults
/// * prices: buying 2.00, selling 3.00
/// * no expiry date
pub fn sample_new_batch(inventory_id: i64, quantity: i32) -> NewBatch {
    NewBatch {
        inventory_id,
        batch_number: None,
        quantity,
        buying_price: dec!(2.00),
        selling_price: dec!(3.00),
        expiry_date: None,
        alert_quantity: 0,
        unit_type: Some("strip".to_string()),
        shelf_no: None,
    }
}

/// Adds a batch with a generated number.
pub async fn create_test_batch(
    db: &DatabaseConnection,
    tenant: Tenant,
    inventory_id: i64,
    quantity: i32,
) -> Result<entities::batch::Model> {
    stock::add_batch(db, tenant, sample_new_batch(inventory_id, quantity)).await
}

/// Adds a batch with an explicit number.
pub async fn create_numbered_batch(
    db: &DatabaseConnection,
    tenant: Tenant,
    inventory_id: i64,
    batch_number: &str,
    quantity: i32,
) -> Result<entities::batch::Model> {
    let mut new = sample_new_batch(inventory_id, quantity);
    new.batch_number = Some(batch_number.to_string());
    stock::add_batch(db, tenant, new).await
}

/// Adds a 10-piece batch expiring on `expiry_date`.
pub async fn create_expiring_batch(
    db: &DatabaseConnection,
    tenant: Tenant,
    inventory_id: i64,
    expiry_date: Option<NaiveDate>,
) -> Result<entities::batch::Model> {
    let mut new = sample_new_batch(inventory_id, 10);
    new.expiry_date = expiry_date;
    stock::add_batch(db, tenant, new).await
}

/// Sets up an organization stocking "Napa" with an empty inventory.
/// Returns (db, tenant, inventory); the low-stock threshold is 10.
pub async fn setup_with_inventory()
-> Result<(DatabaseConnection, Tenant, entities::inventory::Model)> {
    let db = setup_test_db().await?;
    let org = create_test_organization(&db, "Test Pharmacy").await?;
    let tenant = Tenant::from(&org);
    let medicine = create_test_medicine(&db, "Napa").await?;
    let inventory = stock::create_inventory(&db, tenant, medicine.id, 10).await?;
    Ok((db, tenant, inventory))
}

/// Sets up an inventory holding one `BATCH-A` batch of `quantity` pieces.
/// Returns (db, tenant, inventory, batch).
pub async fn setup_with_batch(
    quantity: i32,
) -> Result<(
    DatabaseConnection,
    Tenant,
    entities::inventory::Model,
    entities::batch::Model,
)> {
    let (db, tenant, inventory) = setup_with_inventory().await?;
    let batch = create_test_batch(&db, tenant, inventory.id, quantity).await?;
    Ok((db, tenant, inventory, batch))
}

/// Sets up an organization with the customer "Rahim".
/// Returns (db, tenant, customer).
pub async fn setup_with_customer()
-> Result<(DatabaseConnection, Tenant, entities::customer::Model)> {
    let db = setup_test_db().await?;
    let org = create_test_organization(&db, "Test Pharmacy").await?;
    let tenant = Tenant::from(&org);
    let customer = customer::resolve_customer(&db, tenant, "Rahim", "01700000000").await?;
    Ok((db, tenant, customer))
}

/// Inserts an unpaid checkout order for `customer`, backdated by `days_ago` days.
///
/// Skips the stock side of a checkout so payment tests can control order dates.
pub async fn create_due_order(
    db: &DatabaseConnection,
    tenant: Tenant,
    customer: &entities::customer::Model,
    price: Decimal,
    days_ago: i64,
) -> Result<entities::checkout_order::Model> {
    let order = entities::checkout_order::ActiveModel {
        organization_id: Set(tenant.organization_id),
        employee_id: Set(1),
        customer_id: Set(Some(customer.id)),
        checkout_price: Set(price),
        paid_amount: Set(Decimal::ZERO),
        due_amount: Set(price),
        status: Set(CheckoutStatus::Pending),
        discount_percentage: Set(Decimal::ZERO),
        customer_name: Set(Some(customer.name.clone())),
        customer_contact: Set(Some(customer.contact.clone())),
        created_at: Set(Utc::now() - Duration::days(days_ago)),
        ..Default::default()
    };
    Ok(order.insert(db).await?)
}

/// Sets up an organization with one supplier.
/// Returns (db, tenant, supplier).
pub async fn setup_with_supplier()
-> Result<(DatabaseConnection, Tenant, entities::supplier::Model)> {
    let db = setup_test_db().await?;
    let org = create_test_organization(&db, "Test Pharmacy").await?;
    let tenant = Tenant::from(&org);
    let supplier = supplier::create_supplier(
        &db,
        tenant,
        NewSupplier {
            name: "Square Pharmaceuticals".to_string(),
            phone: "0200000000".to_string(),
            ..Default::default()
        },
    )
    .await?;
    Ok((db, tenant, supplier))
}

/// Records a supplier purchase.
pub async fn create_test_supplier_order(
    db: &DatabaseConnection,
    tenant: Tenant,
    supplier_id: i64,
    total_amount: Decimal,
    paid_amount: Decimal,
    order_date: NaiveDate,
) -> Result<entities::supplier_order::Model> {
    supplier::create_supplier_order(
        db,
        tenant,
        NewSupplierOrder {
            supplier_id,
            total_amount,
            paid_amount,
            order_date,
            notes: None,
        },
    )
    .await
}
