//! Organization entity - a tenant pharmacy.
//!
//! Every inventory row, customer, supplier and sale belongs to exactly one
//! organization and is cascade-deleted with it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Organization database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "organizations")]
pub struct Model {
    /// Unique identifier for the organization
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name of the pharmacy
    pub name: String,
    /// Postal address printed on receipts
    pub address: String,
    /// URL-safe identifier derived from name and contact number
    #[sea_orm(unique)]
    pub slug: String,
    /// Optional phone number
    pub contact_number: Option<String>,
    /// Inactive organizations keep their data but take no new sales
    pub is_active: bool,
    /// When the organization was onboarded
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Organization and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One organization stocks many inventories
    #[sea_orm(has_many = "super::inventory::Entity")]
    Inventories,
    /// One organization has many customers
    #[sea_orm(has_many = "super::customer::Entity")]
    Customers,
    /// One organization buys from many suppliers
    #[sea_orm(has_many = "super::supplier::Entity")]
    Suppliers,
    /// One organization records many checkouts
    #[sea_orm(has_many = "super::checkout_order::Entity")]
    CheckoutOrders,
}

impl Related<super::inventory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inventories.def()
    }
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customers.def()
    }
}

impl Related<super::supplier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Suppliers.def()
    }
}

impl Related<super::checkout_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CheckoutOrders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
