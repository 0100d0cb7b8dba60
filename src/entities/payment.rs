//! Payment entity - an immutable receipt against one checkout order.
//!
//! Inserting a payment is the only way a checkout order's paid/due/status change;
//! `core::payment::record_payment` performs both steps together.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    /// Unique identifier for the payment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Order the money was applied to
    pub checkout_order_id: i64,
    /// Customer who paid
    pub customer_id: i64,
    /// Amount received
    pub amount: Decimal,
    /// How it was paid
    pub payment_method: PaymentMethod,
    /// Free-form note, e.g. the initial checkout payment
    pub notes: Option<String>,
    /// When the payment was received
    pub created_at: DateTimeUtc,
}

/// How the customer paid
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash at the counter
    #[default]
    #[sea_orm(string_value = "cash")]
    Cash,
    /// Debit or credit card
    #[sea_orm(string_value = "card")]
    Card,
    /// Mobile banking
    #[sea_orm(string_value = "mobile")]
    Mobile,
    /// Bank transfer
    #[sea_orm(string_value = "bank")]
    Bank,
}

/// Defines relationships between Payment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Deleting an order deletes its payments
    #[sea_orm(
        belongs_to = "super::checkout_order::Entity",
        from = "Column::CheckoutOrderId",
        to = "super::checkout_order::Column::Id",
        on_delete = "Cascade"
    )]
    CheckoutOrder,
    /// Deleting a customer deletes their payments
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id",
        on_delete = "Cascade"
    )]
    Customer,
}

impl Related<super::checkout_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CheckoutOrder.def()
    }
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
