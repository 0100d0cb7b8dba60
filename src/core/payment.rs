//! Customer payment receipts.
//!
//! A [`payment`] row is immutable once written. [`record_payment`] is the only code that
//! inserts one, and it immediately rewrites the paid/due/status fields of the order the
//! payment belongs to, so an order's amounts never change any other way after checkout.

use crate::{
    core::{customer, tenant::Tenant},
    entities::{CheckoutOrder, CheckoutStatus, Payment, PaymentMethod, checkout_order, payment},
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::info;

/// A stored payment together with the order it updated.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedPayment {
    /// The inserted receipt
    pub payment: payment::Model,
    /// The order with its recomputed amounts
    pub order: checkout_order::Model,
}

/// Inserts a payment against `order` and recomputes the order's amounts and status.
///
/// `paid_amount` becomes the sum of every payment of the order, so the order reflects
/// its receipts even if it had drifted before. Runs on the caller's connection or
/// transaction; the caller is responsible for locking the order.
pub async fn record_payment<C>(
    conn: &C,
    order: &checkout_order::Model,
    amount: Decimal,
    method: PaymentMethod,
    notes: Option<String>,
) -> Result<RecordedPayment>
where
    C: ConnectionTrait,
{
    let customer_id = order.customer_id.ok_or_else(|| {
        Error::validation(format!("Checkout {} has no customer to bill", order.id))
    })?;
    if amount <= Decimal::ZERO {
        return Err(Error::validation("Payment amount must be greater than zero"));
    }

    let payment = payment::ActiveModel {
        checkout_order_id: Set(order.id),
        customer_id: Set(customer_id),
        amount: Set(amount.round_dp(2)),
        payment_method: Set(method),
        notes: Set(notes),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    let receipts = Payment::find()
        .filter(payment::Column::CheckoutOrderId.eq(order.id))
        .all(conn)
        .await?;
    let paid: Decimal = receipts.iter().map(|p| p.amount).sum();
    let due = order.checkout_price - paid;

    let mut active: checkout_order::ActiveModel = order.clone().into();
    active.paid_amount = Set(paid);
    active.due_amount = Set(due);
    active.status = Set(CheckoutStatus::derive(paid, due));
    let order = active.update(conn).await?;

    Ok(RecordedPayment { payment, order })
}

/// Locks a checkout order of the tenant for the rest of the transaction.
pub(crate) async fn lock_checkout_order<C>(
    conn: &C,
    tenant: Tenant,
    checkout_id: i64,
) -> Result<checkout_order::Model>
where
    C: ConnectionTrait,
{
    let order = CheckoutOrder::find_by_id(checkout_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| Error::not_found("Checkout", checkout_id))?;
    tenant.ensure_owns("Checkout", checkout_id, order.organization_id)?;
    Ok(order)
}

/// Pays toward a single checkout order.
pub async fn pay_checkout_order(
    db: &DatabaseConnection,
    tenant: Tenant,
    checkout_id: i64,
    amount: Decimal,
    method: PaymentMethod,
    notes: Option<String>,
) -> Result<RecordedPayment> {
    let amount = amount.round_dp(2);
    if amount <= Decimal::ZERO {
        return Err(Error::validation("Payment amount must be greater than zero"));
    }

    let txn = db.begin().await?;
    let order = lock_checkout_order(&txn, tenant, checkout_id).await?;

    if order.customer_id.is_none() {
        return Err(Error::validation(format!(
            "Checkout {checkout_id} has no customer to bill"
        )));
    }
    if order.due_amount <= Decimal::ZERO {
        return Err(Error::validation(format!(
            "Checkout {checkout_id} is already fully paid"
        )));
    }
    if amount > order.due_amount {
        return Err(Error::ExcessPayment {
            amount,
            total_due: order.due_amount,
        });
    }

    let recorded = record_payment(&txn, &order, amount, method, notes).await?;
    txn.commit().await?;

    info!(
        checkout_id,
        payment_id = recorded.payment.id,
        %amount,
        status = %recorded.order.status,
        "Checkout payment recorded"
    );
    Ok(recorded)
}

/// Payments made by a customer of the tenant, newest first.
pub async fn payment_history(
    db: &DatabaseConnection,
    tenant: Tenant,
    customer_id: i64,
) -> Result<Vec<payment::Model>> {
    let customer = customer::get_customer(db, tenant, customer_id).await?;
    Payment::find()
        .filter(payment::Column::CustomerId.eq(customer.id))
        .order_by_desc(payment::Column::CreatedAt)
        .order_by_desc(payment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
