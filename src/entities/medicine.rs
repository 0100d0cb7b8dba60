//! Medicine entity - shared catalog reference data.
//!
//! Medicines are never owned by a tenant; organizations stock them through
//! [`super::inventory`]. The packaging ratios convert boxes and strips to pieces.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Medicine database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "medicines")]
pub struct Model {
    /// Unique identifier for the medicine
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Brand-level product name (e.g., "Napa Extra")
    pub name: String,
    /// Generic (molecule) name
    pub generic_name: Option<String>,
    /// Therapeutic category
    pub category: Option<String>,
    /// Strength, e.g. "500mg"
    pub dosage: String,
    /// Manufacturer brand
    pub brand: Option<String>,
    /// Tablet, syrup, injection...
    pub dosage_form: Option<String>,
    /// Pieces in one strip
    pub pieces_per_strip: i32,
    /// Strips in one box
    pub strips_per_box: i32,
    /// Pieces in one box
    pub pieces_per_box: i32,
    /// When the catalog entry was added
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Medicine and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A medicine is stocked by many organizations
    #[sea_orm(has_many = "super::inventory::Entity")]
    Inventories,
}

impl Related<super::inventory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inventories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
