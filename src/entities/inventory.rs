//! Inventory entity - one row per (medicine, organization).
//!
//! `quantity` is the sum of the quantities of the inventory's batches and is
//! recomputed from them after every stock mutation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Inventory database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventories")]
pub struct Model {
    /// Unique identifier for the inventory row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Catalog medicine being stocked
    pub medicine_id: i64,
    /// Owning organization
    pub organization_id: i64,
    /// Total pieces on hand across all batches
    pub quantity: i32,
    /// Low-stock threshold in pieces
    pub stock_alert_qty: i32,
    /// When the row was last reconciled or edited
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Inventory and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each inventory stocks one catalog medicine
    #[sea_orm(
        belongs_to = "super::medicine::Entity",
        from = "Column::MedicineId",
        to = "super::medicine::Column::Id",
        on_delete = "Cascade"
    )]
    Medicine,
    /// Each inventory belongs to one organization
    #[sea_orm(
        belongs_to = "super::organization::Entity",
        from = "Column::OrganizationId",
        to = "super::organization::Column::Id",
        on_delete = "Cascade"
    )]
    Organization,
    /// One inventory holds up to three batches
    #[sea_orm(has_many = "super::batch::Entity")]
    Batches,
}

impl Related<super::medicine::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Medicine.def()
    }
}

impl Related<super::organization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl Related<super::batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batches.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
