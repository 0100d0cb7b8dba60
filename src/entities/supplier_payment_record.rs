//! Supplier payment record entity - history of every payment made to a supplier.
//!
//! Records are audit rows only; the amounts on supplier orders are authoritative.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Supplier payment record database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "supplier_payment_records")]
pub struct Model {
    /// Unique identifier for the record
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Supplier that was paid
    pub supplier_id: i64,
    /// Organization that paid
    pub organization_id: i64,
    /// The amount paid in this transaction
    pub amount: Decimal,
    /// When the payment was made
    pub payment_date: DateTimeUtc,
    /// Free text such as a transaction id or payment method
    pub notes: Option<String>,
}

/// Defines relationships between SupplierPaymentRecord and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each record belongs to one supplier
    #[sea_orm(
        belongs_to = "super::supplier::Entity",
        from = "Column::SupplierId",
        to = "super::supplier::Column::Id",
        on_delete = "Cascade"
    )]
    Supplier,
    /// Each record belongs to one organization
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
