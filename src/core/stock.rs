//! Stock ledger - medicines, inventories and batches.
//!
//! Stock lives in batches; an inventory's `quantity` is always recomputed as the sum of
//! its batches ([`reconcile_inventory_quantity`]) rather than adjusted by deltas, which
//! heals any drift left behind by earlier writes. Every stock mutation locks the batch
//! first and its inventory second, inside one database transaction.

use crate::{
    core::{batch_number, tenant::Tenant},
    entities::{Batch, Inventory, Medicine, batch, inventory, medicine},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Catalog data for a new medicine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMedicine {
    /// Brand-level name shown at the counter; must not be blank
    pub name: String,
    /// Generic (molecule) name
    pub generic_name: Option<String>,
    /// Therapeutic category
    pub category: Option<String>,
    /// Strength, e.g. `"500mg"`
    pub dosage: String,
    /// Manufacturer brand
    pub brand: Option<String>,
    /// Tablet, syrup, injection and so on
    pub dosage_form: Option<String>,
    /// Pieces in one strip
    pub pieces_per_strip: i32,
    /// Strips in one box
    pub strips_per_box: i32,
    /// Pieces in one box
    pub pieces_per_box: i32,
}

/// Stock-in of a new batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBatch {
    /// Inventory receiving the stock
    pub inventory_id: i64,
    /// Explicit batch number; generated when absent
    pub batch_number: Option<String>,
    /// Pieces received
    pub quantity: i32,
    /// Purchase price per piece
    pub buying_price: Decimal,
    /// Selling price per piece
    pub selling_price: Decimal,
    /// Expiry date, if printed on the pack
    pub expiry_date: Option<NaiveDate>,
    /// Per-batch low-stock level
    pub alert_quantity: i32,
    /// Unit the batch was bought in
    pub unit_type: Option<String>,
    /// Where the batch is kept
    pub shelf_no: Option<String>,
}

/// Partial update of an existing batch. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchUpdate {
    /// New purchase price per piece
    pub buying_price: Option<Decimal>,
    /// New selling price per piece
    pub selling_price: Option<Decimal>,
    /// New expiry date
    pub expiry_date: Option<NaiveDate>,
    /// New per-batch low-stock level
    pub alert_quantity: Option<i32>,
    /// New shelf location
    pub shelf_no: Option<String>,
    /// Added to the parent inventory's low-stock threshold
    pub stock_alert_qty: Option<i32>,
    /// Pieces added to the batch; only positive increments are applied
    pub new_quantity: Option<i32>,
}

fn ensure_non_negative_price(label: &str, price: Decimal) -> Result<()> {
    if price < Decimal::ZERO {
        return Err(Error::validation(format!("{label} cannot be negative")));
    }
    Ok(())
}

/// Adds a medicine to the shared catalog.
pub async fn create_medicine(db: &DatabaseConnection, new: NewMedicine) -> Result<medicine::Model> {
    if new.name.trim().is_empty() {
        return Err(Error::validation("Medicine name cannot be empty"));
    }
    if new.pieces_per_strip < 0 || new.strips_per_box < 0 || new.pieces_per_box < 0 {
        return Err(Error::validation("Packaging ratios cannot be negative"));
    }

    let medicine = medicine::ActiveModel {
        name: Set(new.name.trim().to_string()),
        generic_name: Set(new.generic_name),
        category: Set(new.category),
        dosage: Set(new.dosage),
        brand: Set(new.brand),
        dosage_form: Set(new.dosage_form),
        pieces_per_strip: Set(new.pieces_per_strip),
        strips_per_box: Set(new.strips_per_box),
        pieces_per_box: Set(new.pieces_per_box),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    Ok(medicine.insert(db).await?)
}

/// Starts stocking a medicine for the tenant with an empty inventory.
///
/// Each organization has at most one inventory per medicine.
pub async fn create_inventory(
    db: &DatabaseConnection,
    tenant: Tenant,
    medicine_id: i64,
    stock_alert_qty: i32,
) -> Result<inventory::Model> {
    if stock_alert_qty < 0 {
        return Err(Error::validation("Stock alert quantity cannot be negative"));
    }

    Medicine::find_by_id(medicine_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Medicine", medicine_id))?;

    let existing = Inventory::find()
        .filter(inventory::Column::MedicineId.eq(medicine_id))
        .filter(inventory::Column::OrganizationId.eq(tenant.organization_id))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(Error::validation(format!(
            "Medicine {medicine_id} is already in this organization's inventory"
        )));
    }

    let inventory = inventory::ActiveModel {
        medicine_id: Set(medicine_id),
        organization_id: Set(tenant.organization_id),
        quantity: Set(0),
        stock_alert_qty: Set(stock_alert_qty),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        inventory_id = inventory.id,
        medicine_id,
        organization_id = tenant.organization_id,
        "Inventory created"
    );
    Ok(inventory)
}

/// Fetches an inventory of the tenant.
pub async fn get_inventory<C>(db: &C, tenant: Tenant, inventory_id: i64) -> Result<inventory::Model>
where
    C: ConnectionTrait,
{
    let inventory = Inventory::find_by_id(inventory_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Inventory", inventory_id))?;
    tenant.ensure_owns("Inventory", inventory_id, inventory.organization_id)?;
    Ok(inventory)
}

/// Fetches a batch of the tenant.
pub async fn get_batch<C>(db: &C, tenant: Tenant, batch_id: i64) -> Result<batch::Model>
where
    C: ConnectionTrait,
{
    let batch = Batch::find_by_id(batch_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Batch", batch_id))?;
    let inventory = Inventory::find_by_id(batch.inventory_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Batch", batch_id))?;
    tenant.ensure_owns("Batch", batch_id, inventory.organization_id)?;
    Ok(batch)
}

/// All batches of an inventory, oldest first.
pub async fn list_batches<C>(db: &C, tenant: Tenant, inventory_id: i64) -> Result<Vec<batch::Model>>
where
    C: ConnectionTrait,
{
    let inventory = get_inventory(db, tenant, inventory_id).await?;
    Batch::find()
        .filter(batch::Column::InventoryId.eq(inventory.id))
        .order_by_asc(batch::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Locks an inventory row of the tenant for the rest of the transaction.
pub(crate) async fn lock_inventory<C>(
    conn: &C,
    tenant: Tenant,
    inventory_id: i64,
) -> Result<inventory::Model>
where
    C: ConnectionTrait,
{
    let inventory = Inventory::find_by_id(inventory_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| Error::not_found("Inventory", inventory_id))?;
    tenant.ensure_owns("Inventory", inventory_id, inventory.organization_id)?;
    Ok(inventory)
}

/// Locks a batch and then its parent inventory.
///
/// Always batch before inventory; every stock mutation takes the locks in this order.
pub(crate) async fn lock_batch_and_inventory<C>(
    conn: &C,
    tenant: Tenant,
    batch_id: i64,
) -> Result<(batch::Model, inventory::Model)>
where
    C: ConnectionTrait,
{
    let batch = Batch::find_by_id(batch_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| Error::not_found("Batch", batch_id))?;

    let inventory = Inventory::find_by_id(batch.inventory_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| Error::not_found("Batch", batch_id))?;
    tenant.ensure_owns("Batch", batch_id, inventory.organization_id)?;

    Ok((batch, inventory))
}

/// Sets an inventory's quantity to the sum of all its batches and returns it.
///
/// This is the canonical reconciliation step after any stock change; the caller must
/// already hold the inventory lock.
pub async fn reconcile_inventory_quantity<C>(conn: &C, inventory_id: i64) -> Result<i32>
where
    C: ConnectionTrait,
{
    use sea_orm::sea_query::Expr;

    let batches = Batch::find()
        .filter(batch::Column::InventoryId.eq(inventory_id))
        .all(conn)
        .await?;
    let total: i32 = batches.iter().map(|b| b.quantity).sum();

    Inventory::update_many()
        .col_expr(inventory::Column::Quantity, Expr::value(total))
        .col_expr(inventory::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(inventory::Column::Id.eq(inventory_id))
        .exec(conn)
        .await?;

    debug!(inventory_id, quantity = total, "Inventory quantity reconciled");
    Ok(total)
}

/// Stocks a new batch into an inventory.
///
/// Enforces the per-inventory batch cap, generates a batch number when none is given
/// and reconciles the inventory quantity, all in one transaction.
#[instrument(skip(db, new), fields(inventory_id = new.inventory_id))]
pub async fn add_batch(db: &DatabaseConnection, tenant: Tenant, new: NewBatch) -> Result<batch::Model> {
    if new.quantity < 0 {
        return Err(Error::validation("Batch quantity cannot be negative"));
    }
    if new.alert_quantity < 0 {
        return Err(Error::validation("Alert quantity cannot be negative"));
    }
    ensure_non_negative_price("Buying price", new.buying_price)?;
    ensure_non_negative_price("Selling price", new.selling_price)?;

    let txn = db.begin().await?;

    let inventory = lock_inventory(&txn, tenant, new.inventory_id).await?;
    let existing = Batch::find()
        .filter(batch::Column::InventoryId.eq(inventory.id))
        .all(&txn)
        .await?;

    let batch_number = match new.batch_number.as_deref().map(str::trim) {
        Some(number) if !number.is_empty() => {
            if existing.len() >= batch_number::MAX_BATCHES_PER_INVENTORY {
                return Err(Error::BatchLimitExceeded {
                    inventory_id: inventory.id,
                    limit: batch_number::MAX_BATCHES_PER_INVENTORY,
                });
            }
            if existing.iter().any(|b| b.batch_number == number) {
                return Err(Error::validation(format!(
                    "Batch number {number} already exists in inventory {}",
                    inventory.id
                )));
            }
            number.to_string()
        }
        _ => batch_number::batch_number_for(inventory.id, &existing)?,
    };

    let now = Utc::now();
    let batch = batch::ActiveModel {
        inventory_id: Set(inventory.id),
        batch_number: Set(batch_number),
        quantity: Set(new.quantity),
        buying_price: Set(new.buying_price.round_dp(2)),
        selling_price: Set(new.selling_price.round_dp(2)),
        expiry_date: Set(new.expiry_date),
        alert_quantity: Set(new.alert_quantity),
        unit_type: Set(new.unit_type),
        shelf_no: Set(new.shelf_no),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let quantity = reconcile_inventory_quantity(&txn, inventory.id).await?;
    txn.commit().await?;

    info!(
        batch_id = batch.id,
        batch_number = %batch.batch_number,
        inventory_id = inventory.id,
        inventory_quantity = quantity,
        "Batch stocked"
    );
    Ok(batch)
}

/// Applies a partial update to a batch, optionally restocking it.
#[instrument(skip(db, update))]
pub async fn update_batch(
    db: &DatabaseConnection,
    tenant: Tenant,
    batch_id: i64,
    update: BatchUpdate,
) -> Result<batch::Model> {
    if let Some(price) = update.buying_price {
        ensure_non_negative_price("Buying price", price)?;
    }
    if let Some(price) = update.selling_price {
        ensure_non_negative_price("Selling price", price)?;
    }
    if update.alert_quantity.is_some_and(|qty| qty < 0) {
        return Err(Error::validation("Alert quantity cannot be negative"));
    }

    let txn = db.begin().await?;
    let (batch, inventory) = lock_batch_and_inventory(&txn, tenant, batch_id).await?;

    let increment = update.new_quantity.filter(|qty| *qty > 0).unwrap_or(0);
    let new_quantity = batch
        .quantity
        .checked_add(increment)
        .ok_or_else(|| Error::validation("Batch quantity overflow"))?;
    let threshold = update
        .stock_alert_qty
        .map(|delta| {
            inventory
                .stock_alert_qty
                .checked_add(delta)
                .map(|qty| qty.max(0))
                .ok_or_else(|| Error::validation("Stock alert quantity overflow"))
        })
        .transpose()?;

    let mut active: batch::ActiveModel = batch.into();
    if let Some(price) = update.buying_price {
        active.buying_price = Set(price.round_dp(2));
    }
    if let Some(price) = update.selling_price {
        active.selling_price = Set(price.round_dp(2));
    }
    if let Some(expiry) = update.expiry_date {
        active.expiry_date = Set(Some(expiry));
    }
    if let Some(alert) = update.alert_quantity {
        active.alert_quantity = Set(alert);
    }
    if let Some(shelf) = update.shelf_no {
        active.shelf_no = Set(Some(shelf));
    }
    active.quantity = Set(new_quantity);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;

    if let Some(threshold) = threshold {
        let mut inventory_active: inventory::ActiveModel = inventory.clone().into();
        inventory_active.stock_alert_qty = Set(threshold);
        inventory_active.update(&txn).await?;
    }

    let quantity = reconcile_inventory_quantity(&txn, inventory.id).await?;
    txn.commit().await?;

    info!(
        batch_id,
        added = increment,
        inventory_quantity = quantity,
        "Batch updated"
    );
    Ok(updated)
}

/// Deletes a batch and reconciles its inventory.
///
/// Order lines that sold from the batch are removed with it.
pub async fn delete_batch(db: &DatabaseConnection, tenant: Tenant, batch_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let (batch, inventory) = lock_batch_and_inventory(&txn, tenant, batch_id).await?;

    let removed = batch.quantity;
    batch.delete(&txn).await?;
    let quantity = reconcile_inventory_quantity(&txn, inventory.id).await?;

    txn.commit().await?;
    info!(
        batch_id,
        removed,
        inventory_id = inventory.id,
        inventory_quantity = quantity,
        "Batch deleted"
    );
    Ok(())
}
