//! Order line entity - one cart item of a checkout.
//!
//! Lines are created at checkout time and never edited. Deleting a line returns its
//! pieces to the batch (`core::checkout::delete_order_line`).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order line database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order line
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Checkout this line belongs to
    pub checkout_id: i64,
    /// Batch the pieces were taken from
    pub batch_id: i64,
    /// Parent inventory of `batch_id`
    pub inventory_id: i64,
    /// Pieces sold
    pub quantity: i32,
    /// Price of a single piece
    pub price_per_unit: Decimal,
    /// Discount in percent
    pub discount: Decimal,
    /// Line total after discount
    pub total_price: Decimal,
    /// When the line was sold
    pub created_at: DateTimeUtc,
}

/// Defines relationships between an order line and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Removing a checkout removes its lines
    #[sea_orm(
        belongs_to = "super::checkout_order::Entity",
        from = "Column::CheckoutId",
        to = "super::checkout_order::Column::Id",
        on_delete = "Cascade"
    )]
    CheckoutOrder,
    /// Removing a batch removes the lines sold from it
    #[sea_orm(
        belongs_to = "super::batch::Entity",
        from = "Column::BatchId",
        to = "super::batch::Column::Id",
        on_delete = "Cascade"
    )]
    Batch,
    /// Inventory of the batch
    #[sea_orm(
        belongs_to = "super::inventory::Entity",
        from = "Column::InventoryId",
        to = "super::inventory::Column::Id",
        on_delete = "Cascade"
    )]
    Inventory,
}

impl Related<super::checkout_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CheckoutOrder.def()
    }
}

impl Related<super::batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batch.def()
    }
}

impl Related<super::inventory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inventory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
