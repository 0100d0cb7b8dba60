//! Checkout order entity - one point-of-sale transaction.
//!
//! `due_amount` is always `checkout_price - paid_amount` and `status` is a pure
//! function of the two amounts ([`CheckoutStatus::derive`]). After creation the
//! amounts change only through payment recording.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Checkout order database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "checkout_orders")]
pub struct Model {
    /// Unique identifier for the checkout
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Organization that made the sale
    pub organization_id: i64,
    /// Employee who rang up the sale
    pub employee_id: i64,
    /// Customer account, required whenever the sale leaves a due
    pub customer_id: Option<i64>,
    /// Final price after discount
    pub checkout_price: Decimal,
    /// Sum of payment receipts
    pub paid_amount: Decimal,
    /// `checkout_price - paid_amount`
    pub due_amount: Decimal,
    /// Derived from paid and due amounts
    pub status: CheckoutStatus,
    /// Flat discount applied to every line, in percent
    pub discount_percentage: Decimal,
    /// Customer name as typed at the counter
    pub customer_name: Option<String>,
    /// Customer contact as typed at the counter
    pub customer_contact: Option<String>,
    /// When the sale was made; orders are paid oldest first
    pub created_at: DateTimeUtc,
}

/// Payment state of a checkout order
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    /// Nothing paid yet
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Some money received, some still due
    #[sea_orm(string_value = "partially_paid")]
    PartiallyPaid,
    /// Nothing left to pay
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl CheckoutStatus {
    /// Derives the status from the paid and due amounts.
    ///
    /// `due <= 0` is completed; otherwise any positive payment makes the order
    /// partially paid, and no payment leaves it pending.
    #[must_use]
    pub fn derive(paid_amount: Decimal, due_amount: Decimal) -> Self {
        if due_amount <= Decimal::ZERO {
            Self::Completed
        } else if paid_amount > Decimal::ZERO {
            Self::PartiallyPaid
        } else {
            Self::Pending
        }
    }

    /// Database/wire representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PartiallyPaid => "partially_paid",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for CheckoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Defines relationships between CheckoutOrder and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each checkout belongs to one organization
    #[sea_orm(
        belongs_to = "super::organization::Entity",
        from = "Column::OrganizationId",
        to = "super::organization::Column::Id",
        on_delete = "Cascade"
    )]
    Organization,
    /// Deleting a customer keeps their sales on the books
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id",
        on_delete = "SetNull"
    )]
    Customer,
    /// Lines sold in this checkout
    #[sea_orm(has_many = "super::order_line::Entity")]
    OrderLines,
    /// Payments received against this checkout
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::organization::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organization.def()
    }
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::order_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderLines.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
