//! Batch numbering.
//!
//! Batch numbers have the form `BATCH-<letter>`. A new number takes the first letter,
//! starting at `A`, that no existing batch of the inventory uses, so numbers freed by
//! deleted batches are reused. An inventory holds at most
//! [`MAX_BATCHES_PER_INVENTORY`] batches, counting every row regardless of quantity.

use crate::{
    core::{stock, tenant::Tenant},
    entities::{Batch, batch},
    errors::{Error, Result},
};
use sea_orm::prelude::*;

/// Cap on live batches per inventory, enforced when a batch is created.
pub const MAX_BATCHES_PER_INVENTORY: usize = 3;

const BATCH_PREFIX: &str = "BATCH";

/// Returns the first `BATCH-<letter>` not present in `existing`.
///
/// Returns `None` only when every letter `A`..=`Z` is taken.
#[must_use]
pub fn next_batch_number<S: AsRef<str>>(existing: &[S]) -> Option<String> {
    ('A'..='Z')
        .map(|suffix| format!("{BATCH_PREFIX}-{suffix}"))
        .find(|candidate| !existing.iter().any(|taken| taken.as_ref() == candidate))
}

/// Picks the batch number for a new batch given the inventory's current batches.
///
/// Fails with `BatchLimitExceeded` when the inventory is already full.
pub fn batch_number_for(inventory_id: i64, existing: &[batch::Model]) -> Result<String> {
    if existing.len() >= MAX_BATCHES_PER_INVENTORY {
        return Err(Error::BatchLimitExceeded {
            inventory_id,
            limit: MAX_BATCHES_PER_INVENTORY,
        });
    }

    let taken: Vec<&str> = existing.iter().map(|b| b.batch_number.as_str()).collect();
    next_batch_number(&taken).ok_or_else(|| {
        Error::validation(format!("No free batch number left for inventory {inventory_id}"))
    })
}

/// Proposes the next batch number for an inventory of the tenant.
pub async fn generate_batch_number<C>(db: &C, tenant: Tenant, inventory_id: i64) -> Result<String>
where
    C: ConnectionTrait,
{
    let inventory = stock::get_inventory(db, tenant, inventory_id).await?;
    let existing = Batch::find()
        .filter(batch::Column::InventoryId.eq(inventory.id))
        .all(db)
        .await?;

    batch_number_for(inventory.id, &existing)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_next_batch_number_starts_at_a() {
        let none: [&str; 0] = [];
        assert_eq!(next_batch_number(&none).unwrap(), "BATCH-A");
    }

    #[test]
    fn test_next_batch_number_fills_gaps() {
        assert_eq!(next_batch_number(&["BATCH-A", "BATCH-C"]).unwrap(), "BATCH-B");
        assert_eq!(next_batch_number(&["BATCH-B"]).unwrap(), "BATCH-A");
        assert_eq!(next_batch_number(&["BATCH-A", "BATCH-B"]).unwrap(), "BATCH-C");
    }

    #[test]
    fn test_next_batch_number_ignores_foreign_formats() {
        assert_eq!(next_batch_number(&["LOT-77", "BATCH-A"]).unwrap(), "BATCH-B");
    }

    #[tokio::test]
    async fn test_generate_batch_number_fills_gap_integration() -> Result<()> {
        let (db, tenant, inventory) = setup_with_inventory().await?;
        create_numbered_batch(&db, tenant, inventory.id, "BATCH-A", 10).await?;
        create_numbered_batch(&db, tenant, inventory.id, "BATCH-C", 10).await?;

        let number = generate_batch_number(&db, tenant, inventory.id).await?;
        assert_eq!(number, "BATCH-B");
        Ok(())
    }

    #[tokio::test]
    async fn test_generate_batch_number_limit_integration() -> Result<()> {
        let (db, tenant, inventory) = setup_with_inventory().await?;
        for _ in 0..MAX_BATCHES_PER_INVENTORY {
            create_test_batch(&db, tenant, inventory.id, 0).await?;
        }

        let result = generate_batch_number(&db, tenant, inventory.id).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::BatchLimitExceeded { limit: 3, .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_generate_batch_number_other_tenant() -> Result<()> {
        let (db, _tenant, inventory) = setup_with_inventory().await?;
        let other = create_test_organization(&db, "Other Pharmacy").await?;

        let result = generate_batch_number(&db, Tenant::from(&other), inventory.id).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::NotFound { entity: "Inventory", .. }
        ));
        Ok(())
    }
}
