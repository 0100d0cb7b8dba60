//! Supplier ledger - accounts payable of a pharmacy.
//!
//! Supplier orders are paid down in place: allocating a payment edits the order's
//! paid and due amounts directly, and a single [`supplier_payment_record`] row keeps
//! the history of the lump payment.

use crate::{
    core::{
        allocator::{self, AllocationStrategy},
        tenant::Tenant,
    },
    entities::{
        Supplier, SupplierOrder, SupplierPaymentRecord, supplier, supplier_order,
        supplier_payment_record,
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, QuerySelect, Select, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument};

/// Contact details of a new supplier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSupplier {
    /// Company name; must not be blank
    pub name: String,
    /// Phone number; must not be blank
    pub phone: String,
    /// Email address
    pub email: Option<String>,
    /// Postal address
    pub address: Option<String>,
}

/// A purchase from a supplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSupplierOrder {
    /// Supplier the goods came from
    pub supplier_id: i64,
    /// Invoice total
    pub total_amount: Decimal,
    /// Paid up front at purchase time
    #[serde(default)]
    pub paid_amount: Decimal,
    /// Date of the purchase; decides payment order
    pub order_date: NaiveDate,
    /// Free-form note
    pub notes: Option<String>,
}

/// Aggregates of one supplier's orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SupplierTotals {
    /// Sum of order totals
    pub total_orders: Decimal,
    /// Sum of amounts paid
    pub total_payments: Decimal,
    /// Sum of amounts still owed
    pub total_due: Decimal,
}

/// A lump payment toward everything owed to a supplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierPaymentRequest {
    /// Supplier being paid
    pub supplier_id: i64,
    /// Amount paid; must not exceed the total due
    pub payment_amount: Decimal,
    /// Stored on the payment record
    pub notes: Option<String>,
}

/// Share of a supplier payment credited to one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplierPaymentDetail {
    /// Order credited
    pub order_id: i64,
    /// Its purchase date
    pub order_date: NaiveDate,
    /// Amount credited to it
    pub payment_amount: Decimal,
    /// Due left on the order
    pub remaining_due: Decimal,
}

/// Result of [`pay_supplier_due`].
#[derive(Debug, Clone, Serialize)]
pub struct SupplierPaymentOutcome {
    /// Amount paid
    pub total_payment: Decimal,
    /// Unallocated remainder, always zero on success
    pub remaining_payment: Decimal,
    /// Orders that received money, oldest first
    pub payment_details: Vec<SupplierPaymentDetail>,
    /// Supplier's total due after the payment
    pub new_total_due: Decimal,
    /// The stored payment record
    pub record: supplier_payment_record::Model,
}

/// Credits allocations by editing the supplier order in place.
///
/// The due is recomputed from the order total, so an order whose stored due had
/// drifted from `total - paid` fails the post-allocation check.
struct SupplierPaymentStrategy<'a, C> {
    conn: &'a C,
}

impl<C> AllocationStrategy for SupplierPaymentStrategy<'_, C>
where
    C: ConnectionTrait,
{
    type Item = supplier_order::Model;

    async fn apply(&mut self, item: &supplier_order::Model, amount: Decimal) -> Result<()> {
        let paid = item.paid_amount + amount;
        let mut active: supplier_order::ActiveModel = item.clone().into();
        active.paid_amount = Set(paid);
        active.due_amount = Set(item.total_amount - paid);
        active.updated_at = Set(Utc::now());
        active.update(self.conn).await?;
        Ok(())
    }
}

/// Registers a supplier for the tenant.
pub async fn create_supplier(
    db: &DatabaseConnection,
    tenant: Tenant,
    new: NewSupplier,
) -> Result<supplier::Model> {
    if new.name.trim().is_empty() {
        return Err(Error::validation("Supplier name cannot be empty"));
    }
    if new.phone.trim().is_empty() {
        return Err(Error::validation("Supplier phone cannot be empty"));
    }

    let supplier = supplier::ActiveModel {
        organization_id: Set(tenant.organization_id),
        name: Set(new.name.trim().to_string()),
        phone: Set(new.phone.trim().to_string()),
        email: Set(new.email),
        address: Set(new.address),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        supplier_id = supplier.id,
        organization_id = tenant.organization_id,
        "Supplier created"
    );
    Ok(supplier)
}

/// Fetches a supplier of the tenant.
pub async fn get_supplier<C>(conn: &C, tenant: Tenant, supplier_id: i64) -> Result<supplier::Model>
where
    C: ConnectionTrait,
{
    let supplier = Supplier::find_by_id(supplier_id)
        .one(conn)
        .await?
        .ok_or_else(|| Error::not_found("Supplier", supplier_id))?;
    tenant.ensure_owns("Supplier", supplier_id, supplier.organization_id)?;
    Ok(supplier)
}

/// Records a purchase from a supplier.
pub async fn create_supplier_order(
    db: &DatabaseConnection,
    tenant: Tenant,
    new: NewSupplierOrder,
) -> Result<supplier_order::Model> {
    let total = new.total_amount.round_dp(2);
    let paid = new.paid_amount.round_dp(2);
    if total <= Decimal::ZERO {
        return Err(Error::validation("Order total must be greater than zero"));
    }
    if paid < Decimal::ZERO || paid > total {
        return Err(Error::validation(format!(
            "Paid amount must be between 0 and the order total ({total})"
        )));
    }

    let supplier = get_supplier(db, tenant, new.supplier_id).await?;
    let now = Utc::now();
    let order = supplier_order::ActiveModel {
        supplier_id: Set(supplier.id),
        organization_id: Set(tenant.organization_id),
        total_amount: Set(total),
        paid_amount: Set(paid),
        due_amount: Set(total - paid),
        order_date: Set(new.order_date),
        notes: Set(new.notes),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        order_id = order.id,
        supplier_id = supplier.id,
        %total,
        due = %order.due_amount,
        "Supplier order recorded"
    );
    Ok(order)
}

/// Order, payment and due totals of one supplier.
pub async fn supplier_totals<C>(conn: &C, supplier_id: i64) -> Result<SupplierTotals>
where
    C: ConnectionTrait,
{
    let orders = SupplierOrder::find()
        .filter(supplier_order::Column::SupplierId.eq(supplier_id))
        .all(conn)
        .await?;

    Ok(SupplierTotals {
        total_orders: orders.iter().map(|o| o.total_amount).sum(),
        total_payments: orders.iter().map(|o| o.paid_amount).sum(),
        total_due: orders.iter().map(|o| o.due_amount).sum(),
    })
}

fn supplier_orders_query(supplier_id: i64) -> Select<SupplierOrder> {
    SupplierOrder::find()
        .filter(supplier_order::Column::SupplierId.eq(supplier_id))
        .order_by_asc(supplier_order::Column::OrderDate)
        .order_by_asc(supplier_order::Column::CreatedAt)
        .order_by_asc(supplier_order::Column::Id)
}

/// Every order of a supplier, oldest first.
pub async fn supplier_orders(
    db: &DatabaseConnection,
    tenant: Tenant,
    supplier_id: i64,
) -> Result<Vec<supplier_order::Model>> {
    let supplier = get_supplier(db, tenant, supplier_id).await?;
    Ok(supplier_orders_query(supplier.id).all(db).await?)
}

/// Orders of a supplier that still carry a due, oldest first.
pub async fn supplier_due_orders<C>(conn: &C, supplier_id: i64) -> Result<Vec<supplier_order::Model>>
where
    C: ConnectionTrait,
{
    Ok(supplier_orders_query(supplier_id)
        .filter(supplier_order::Column::DueAmount.gt(Decimal::ZERO))
        .all(conn)
        .await?)
}

/// Spreads a lump payment over a supplier's unpaid orders, oldest first.
///
/// One payment record is written for the whole amount. The supplier's total due must
/// drop by exactly the amount paid, otherwise everything is rolled back.
#[instrument(skip(db, request), fields(supplier_id = request.supplier_id))]
pub async fn pay_supplier_due(
    db: &DatabaseConnection,
    tenant: Tenant,
    request: SupplierPaymentRequest,
) -> Result<SupplierPaymentOutcome> {
    let amount = request.payment_amount.round_dp(2);
    if amount <= Decimal::ZERO {
        return Err(Error::validation("Payment amount must be greater than zero"));
    }

    let txn = db.begin().await?;
    let supplier = get_supplier(&txn, tenant, request.supplier_id).await?;

    let orders = supplier_orders_query(supplier.id)
        .filter(supplier_order::Column::DueAmount.gt(Decimal::ZERO))
        .lock_exclusive()
        .all(&txn)
        .await?;
    if orders.is_empty() {
        return Err(Error::validation("No outstanding dues for this supplier."));
    }

    let before = supplier_totals(&txn, supplier.id).await?;

    let mut strategy = SupplierPaymentStrategy { conn: &txn };
    let allocation = allocator::allocate(amount, &orders, &mut strategy).await?;

    let record = supplier_payment_record::ActiveModel {
        supplier_id: Set(supplier.id),
        organization_id: Set(tenant.organization_id),
        amount: Set(amount),
        payment_date: Set(Utc::now()),
        notes: Set(request.notes),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let after = supplier_totals(&txn, supplier.id).await?;
    allocator::verify_total_due(before.total_due - amount, after.total_due)?;

    txn.commit().await?;

    info!(
        supplier_id = supplier.id,
        %amount,
        orders_paid = allocation.details.len(),
        new_total_due = %after.total_due,
        "Supplier due payment recorded"
    );

    let order_dates: HashMap<i64, NaiveDate> = orders.iter().map(|o| (o.id, o.order_date)).collect();
    let payment_details = allocation
        .details
        .iter()
        .filter_map(|d| {
            order_dates.get(&d.item_id).map(|date| SupplierPaymentDetail {
                order_id: d.item_id,
                order_date: *date,
                payment_amount: d.allocated_amount,
                remaining_due: d.remaining_due,
            })
        })
        .collect();

    Ok(SupplierPaymentOutcome {
        total_payment: amount,
        remaining_payment: allocation.remaining_payment,
        payment_details,
        new_total_due: after.total_due,
        record,
    })
}

/// Payments made to a supplier, newest first.
pub async fn supplier_payment_history(
    db: &DatabaseConnection,
    tenant: Tenant,
    supplier_id: i64,
) -> Result<Vec<supplier_payment_record::Model>> {
    let supplier = get_supplier(db, tenant, supplier_id).await?;
    Ok(SupplierPaymentRecord::find()
        .filter(supplier_payment_record::Column::SupplierId.eq(supplier.id))
        .order_by_desc(supplier_payment_record::Column::PaymentDate)
        .order_by_desc(supplier_payment_record::Column::Id)
        .all(db)
        .await?)
}
