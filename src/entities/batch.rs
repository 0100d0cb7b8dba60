//! Batch entity - a priced, dated lot inside one inventory.
//!
//! Quantities are in pieces. Checkout sales decrement `quantity`; stock-in and
//! partial updates increment it. `batch_number` is unique within its inventory.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Batch database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "batches")]
pub struct Model {
    /// Unique identifier for the batch
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Parent inventory
    pub inventory_id: i64,
    /// Identifier such as `BATCH-A`
    pub batch_number: String,
    /// Pieces remaining
    pub quantity: i32,
    /// Purchase price per piece
    pub buying_price: Decimal,
    /// Selling price per piece
    pub selling_price: Decimal,
    /// Lots without a printed expiry never raise expiry alerts
    pub expiry_date: Option<Date>,
    /// Per-batch low-stock level
    pub alert_quantity: i32,
    /// Unit the batch was bought in
    pub unit_type: Option<String>,
    /// Shelf the batch is kept on
    pub shelf_no: Option<String>,
    /// When the batch was stocked
    pub created_at: DateTimeUtc,
    /// Last change to the batch
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Batch and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each batch belongs to one inventory
    #[sea_orm(
        belongs_to = "super::inventory::Entity",
        from = "Column::InventoryId",
        to = "super::inventory::Column::Id",
        on_delete = "Cascade"
    )]
    Inventory,
    /// Order lines that sold from this batch
    #[sea_orm(has_many = "super::order_line::Entity")]
    OrderLines,
}

impl Related<super::inventory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inventory.def()
    }
}

impl Related<super::order_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
