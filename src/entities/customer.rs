//! Customer entity - a buyer identified by (name, contact) within one organization.
//!
//! Dues and payments are derived from the customer's checkout orders and payment rows;
//! see `core::customer::customer_balance`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Customer database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    /// Unique identifier for the customer
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Organization the customer buys from
    pub organization_id: i64,
    /// Name as entered at the counter
    pub name: String,
    /// Phone number or other contact handle
    pub contact: String,
}

/// Defines relationships between Customer and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each customer belongs to one organization
    #[sea_orm(
        belongs_to = "super::organization::Entity",
        from = "Column::OrganizationId",
        to = "super::organization::Column::Id",
        on_delete = "Cascade"
    )]
    Organization,
    /// Sales made on the customer's account
    #[sea_orm(has_many = "super::checkout_order::Entity")]
    CheckoutOrders,
    /// Payments received from the customer
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::organization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl Related<super::checkout_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CheckoutOrders.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
