//! Supplier order entity - a purchase the organization still may owe money on.
//!
//! Unlike checkout orders, supplier orders are paid down by mutating
//! `paid_amount`/`due_amount` directly; payment history lives in
//! [`super::supplier_payment_record`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Supplier order database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "supplier_orders")]
pub struct Model {
    /// Unique identifier for the supplier order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Supplier the goods came from
    pub supplier_id: i64,
    /// Organization that placed the order
    pub organization_id: i64,
    /// Invoice total
    pub total_amount: Decimal,
    /// Paid so far
    pub paid_amount: Decimal,
    /// `total_amount - paid_amount`
    pub due_amount: Decimal,
    /// Business date of the purchase; drives oldest-first payment
    pub order_date: Date,
    /// Free-form note
    pub notes: Option<String>,
    /// When the order was recorded
    pub created_at: DateTimeUtc,
    /// Last payment or edit
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between SupplierOrder and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order belongs to one supplier
    #[sea_orm(
        belongs_to = "super::supplier::Entity",
        from = "Column::SupplierId",
        to = "super::supplier::Column::Id",
        on_delete = "Cascade"
    )]
    Supplier,
    /// Each order belongs to one organization
    #[sea_orm(
        belongs_to = "super::organization::Entity",
        from = "Column::OrganizationId",
        to = "super::organization::Column::Id",
        on_delete = "Cascade"
    )]
    Organization,
}

impl Related<super::supplier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl Related<super::organization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
