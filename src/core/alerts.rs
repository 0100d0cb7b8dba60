//! Read-only stock and expiry alerts.

use crate::{
    core::tenant::Tenant,
    entities::{Batch, Inventory, Medicine, batch, inventory, medicine},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sea_orm::{QueryOrder, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Why an inventory shows up in the stock alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockStatus {
    /// Some stock left, but at or below the threshold
    #[serde(rename = "Low Stock")]
    LowStock,
    /// Nothing left
    #[serde(rename = "Stock Out")]
    StockOut,
}

impl StockStatus {
    /// Label shown to users.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LowStock => "Low Stock",
            Self::StockOut => "Stock Out",
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a batch shows up in the expiry alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpiryStatus {
    /// Expiry date is today or earlier
    Expired,
    /// Expires within the alert window
    #[serde(rename = "Expiring Soon")]
    ExpiringSoon,
}

impl ExpiryStatus {
    /// Label shown to users.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Expired => "Expired",
            Self::ExpiringSoon => "Expiring Soon",
        }
    }
}

impl std::fmt::Display for ExpiryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inventory at or below its low-stock threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockAlert {
    /// Inventory the alert is about
    pub inventory_id: i64,
    /// Catalog name of the medicine
    pub medicine_name: String,
    /// Generic name, if recorded
    pub generic_name: Option<String>,
    /// Brand, if recorded
    pub brand: Option<String>,
    /// Strength, e.g. `"500mg"`
    pub dosage: String,
    /// Pieces in stock
    pub quantity: i32,
    /// Low-stock threshold of the inventory
    pub stock_alert_qty: i32,
    /// Last change to the inventory
    pub updated_at: DateTime<Utc>,
    /// Low stock or stock out
    pub status: StockStatus,
}

/// A batch that has expired or expires within the alert window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiryAlert {
    /// Batch the alert is about
    pub batch_id: i64,
    /// Number of the batch, e.g. `"BATCH-A"`
    pub batch_number: String,
    /// Catalog name of the medicine
    pub medicine_name: String,
    /// Generic name, if recorded
    pub generic_name: Option<String>,
    /// Brand, if recorded
    pub brand: Option<String>,
    /// Strength of the medicine
    pub dosage: String,
    /// Pieces left across the whole inventory
    pub quantity: i32,
    /// When the batch expires
    pub expiry_date: NaiveDate,
    /// Last change to the batch
    pub updated_at: DateTime<Utc>,
    /// Expired or expiring soon
    pub status: ExpiryStatus,
}

/// Alert counts for a dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlertSummary {
    /// Inventories at or below their threshold, stock-outs included
    pub low_stock_count: u64,
    /// Batches expiring within the window, expired ones included
    pub expiring_count: u64,
    /// Batches already expired
    pub critical_count: u64,
}

/// `None` while the quantity is above the threshold.
#[must_use]
pub const fn classify_stock(quantity: i32, threshold: i32) -> Option<StockStatus> {
    if quantity > threshold {
        None
    } else if quantity <= 0 {
        Some(StockStatus::StockOut)
    } else {
        Some(StockStatus::LowStock)
    }
}

/// `None` for batches without an expiry date or expiring after `today + days`.
#[must_use]
pub fn classify_expiry(expiry: Option<NaiveDate>, today: NaiveDate, days: i64) -> Option<ExpiryStatus> {
    let expiry = expiry?;
    if expiry < today {
        return Some(ExpiryStatus::Expired);
    }
    let horizon = today.checked_add_signed(Duration::try_days(days)?)?;
    (expiry <= horizon).then_some(ExpiryStatus::ExpiringSoon)
}

fn alert_horizon(today: NaiveDate, days: i64) -> Result<NaiveDate> {
    if days < 0 {
        return Err(Error::validation("Expiry window cannot be negative"));
    }
    Duration::try_days(days)
        .and_then(|window| today.checked_add_signed(window))
        .ok_or_else(|| Error::validation(format!("Expiry window of {days} days is out of range")))
}

/// Inventories of the tenant at or below their threshold, optionally of one status.
pub async fn stock_alerts(
    db: &DatabaseConnection,
    tenant: Tenant,
    status: Option<StockStatus>,
) -> Result<Vec<StockAlert>> {
    let rows = Inventory::find()
        .filter(inventory::Column::OrganizationId.eq(tenant.organization_id))
        .find_also_related(Medicine)
        .order_by_asc(inventory::Column::Id)
        .all(db)
        .await?;

    let alerts = rows
        .into_iter()
        .filter_map(|(inventory, medicine)| {
            let found = classify_stock(inventory.quantity, inventory.stock_alert_qty)?;
            if status.is_some_and(|wanted| wanted != found) {
                return None;
            }
            let medicine = medicine?;
            Some(StockAlert {
                inventory_id: inventory.id,
                medicine_name: medicine.name,
                generic_name: medicine.generic_name,
                brand: medicine.brand,
                dosage: medicine.dosage,
                quantity: inventory.quantity,
                stock_alert_qty: inventory.stock_alert_qty,
                updated_at: inventory.updated_at,
                status: found,
            })
        })
        .collect();
    Ok(alerts)
}

/// Batches of the tenant expired or expiring within `days` of `today`, soonest first.
pub async fn expiry_alerts(
    db: &DatabaseConnection,
    tenant: Tenant,
    today: NaiveDate,
    days: i64,
    status: Option<ExpiryStatus>,
) -> Result<Vec<ExpiryAlert>> {
    let horizon = alert_horizon(today, days)?;

    let rows = Batch::find()
        .find_also_related(Inventory)
        .filter(inventory::Column::OrganizationId.eq(tenant.organization_id))
        .filter(batch::Column::ExpiryDate.is_not_null())
        .filter(batch::Column::ExpiryDate.lte(horizon))
        .order_by_asc(batch::Column::ExpiryDate)
        .order_by_asc(batch::Column::Id)
        .all(db)
        .await?;

    let medicine_ids: Vec<i64> = rows
        .iter()
        .filter_map(|(_, inventory)| inventory.as_ref().map(|i| i.medicine_id))
        .collect();
    let medicines: HashMap<i64, medicine::Model> = Medicine::find()
        .filter(medicine::Column::Id.is_in(medicine_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();

    let alerts = rows
        .into_iter()
        .filter_map(|(batch, inventory)| {
            let inventory = inventory?;
            let expiry_date = batch.expiry_date?;
            let found = classify_expiry(Some(expiry_date), today, days)?;
            if status.is_some_and(|wanted| wanted != found) {
                return None;
            }
            let medicine = medicines.get(&inventory.medicine_id)?;
            Some(ExpiryAlert {
                batch_id: batch.id,
                batch_number: batch.batch_number,
                medicine_name: medicine.name.clone(),
                generic_name: medicine.generic_name.clone(),
                brand: medicine.brand.clone(),
                dosage: medicine.dosage.clone(),
                quantity: inventory.quantity,
                expiry_date,
                updated_at: batch.updated_at,
                status: found,
            })
        })
        .collect();
    Ok(alerts)
}

/// Alert counters for a dashboard.
pub async fn alert_summary(
    db: &DatabaseConnection,
    tenant: Tenant,
    today: NaiveDate,
    days: i64,
) -> Result<AlertSummary> {
    let low_stock = stock_alerts(db, tenant, None).await?;
    let expiring = expiry_alerts(db, tenant, today, days, None).await?;

    Ok(AlertSummary {
        low_stock_count: low_stock.len() as u64,
        expiring_count: expiring.len() as u64,
        critical_count: expiring
            .iter()
            .filter(|a| a.status == ExpiryStatus::Expired)
            .count() as u64,
    })
}
