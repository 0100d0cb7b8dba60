//! Customer ledger - accounts receivable of a pharmacy.
//!
//! A customer is identified by name and contact within an organization. Their balance
//! is never stored; it is always derived from their checkout orders and payments.

use crate::{
    core::{
        allocator::{self, AllocationStrategy},
        payment,
        tenant::Tenant,
    },
    entities::{
        CheckoutOrder, CheckoutStatus, Customer, Payment, PaymentMethod, checkout_order,
        customer, payment as payment_entity,
    },
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, QuerySelect, Select, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument};

const DEFAULT_PAYMENT_NOTE: &str = "Payment towards total due.";

/// Derived totals of one customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CustomerBalance {
    /// Sum of due amounts over all the customer's orders
    pub total_due_amount: Decimal,
    /// Sum of all payment receipts
    pub total_paid_amount: Decimal,
}

/// A customer row in listings.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerSummary {
    /// The customer row
    pub customer: customer::Model,
    /// Outstanding due over all orders
    pub total_due: Decimal,
    /// Whether `total_due` is above zero
    pub has_due: bool,
}

/// Customer counts for a dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CustomerStats {
    /// Customers of the organization
    pub total_customers: u64,
    /// Sum of every customer's due
    pub total_due: Decimal,
    /// Customers owing money
    pub customers_with_due: u64,
}

/// A lump payment toward everything a customer owes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerPaymentRequest {
    /// Customer paying
    pub customer_id: i64,
    /// Amount paid; must not exceed the total due
    pub amount: Decimal,
    /// Defaults to cash
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Note stored on each receipt; a default note is used when blank
    pub notes: Option<String>,
}

/// Share of a customer payment credited to one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentDistribution {
    /// Order credited
    pub order_id: i64,
    /// Amount credited to it
    pub allocated_amount: Decimal,
    /// Due left on the order
    pub remaining_due: Decimal,
}

/// Result of [`pay_customer_due`].
#[derive(Debug, Clone, Serialize)]
pub struct CustomerPaymentOutcome {
    /// Orders that received money, oldest first
    pub distribution: Vec<PaymentDistribution>,
    /// Customer's total due after the payment
    pub remaining_due: Decimal,
}

/// Credits allocations by writing one payment receipt per order.
struct CustomerPaymentStrategy<'a, C> {
    conn: &'a C,
    method: PaymentMethod,
    notes: String,
}

impl<C> AllocationStrategy for CustomerPaymentStrategy<'_, C>
where
    C: ConnectionTrait,
{
    type Item = checkout_order::Model;

    async fn apply(&mut self, item: &checkout_order::Model, amount: Decimal) -> Result<()> {
        payment::record_payment(self.conn, item, amount, self.method, Some(self.notes.clone()))
            .await?;
        Ok(())
    }
}

/// Finds the tenant's customer with this name and contact, creating it if needed.
pub async fn resolve_customer<C>(
    conn: &C,
    tenant: Tenant,
    name: &str,
    contact: &str,
) -> Result<customer::Model>
where
    C: ConnectionTrait,
{
    let name = name.trim();
    let contact = contact.trim();
    if name.is_empty() || contact.is_empty() {
        return Err(Error::validation("Customer name and contact are required"));
    }

    let existing = Customer::find()
        .filter(customer::Column::OrganizationId.eq(tenant.organization_id))
        .filter(customer::Column::Name.eq(name))
        .filter(customer::Column::Contact.eq(contact))
        .one(conn)
        .await?;
    if let Some(customer) = existing {
        return Ok(customer);
    }

    let customer = customer::ActiveModel {
        organization_id: Set(tenant.organization_id),
        name: Set(name.to_string()),
        contact: Set(contact.to_string()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    info!(
        customer_id = customer.id,
        organization_id = tenant.organization_id,
        "Customer created"
    );
    Ok(customer)
}

/// Fetches a customer of the tenant.
pub async fn get_customer<C>(conn: &C, tenant: Tenant, customer_id: i64) -> Result<customer::Model>
where
    C: ConnectionTrait,
{
    let customer = Customer::find_by_id(customer_id)
        .one(conn)
        .await?
        .ok_or_else(|| Error::not_found("Customer", customer_id))?;
    tenant.ensure_owns("Customer", customer_id, customer.organization_id)?;
    Ok(customer)
}

/// Sums a customer's dues over all their orders and their payments.
pub async fn customer_balance<C>(conn: &C, customer_id: i64) -> Result<CustomerBalance>
where
    C: ConnectionTrait,
{
    let orders = CheckoutOrder::find()
        .filter(checkout_order::Column::CustomerId.eq(customer_id))
        .all(conn)
        .await?;
    let payments = Payment::find()
        .filter(payment_entity::Column::CustomerId.eq(customer_id))
        .all(conn)
        .await?;

    Ok(CustomerBalance {
        total_due_amount: orders.iter().map(|o| o.due_amount).sum(),
        total_paid_amount: payments.iter().map(|p| p.amount).sum(),
    })
}

/// Outstanding dues of every customer of the tenant.
async fn dues_by_customer(db: &DatabaseConnection, tenant: Tenant) -> Result<HashMap<i64, Decimal>> {
    let orders = CheckoutOrder::find()
        .filter(checkout_order::Column::OrganizationId.eq(tenant.organization_id))
        .filter(checkout_order::Column::CustomerId.is_not_null())
        .all(db)
        .await?;

    let mut dues: HashMap<i64, Decimal> = HashMap::new();
    for order in orders {
        if let Some(customer_id) = order.customer_id {
            *dues.entry(customer_id).or_default() += order.due_amount;
        }
    }
    Ok(dues)
}

/// Customers of the tenant, those owing money first, then newest.
///
/// `search` matches name or contact, ignoring case.
pub async fn list_customers(
    db: &DatabaseConnection,
    tenant: Tenant,
    search: Option<&str>,
) -> Result<Vec<CustomerSummary>> {
    let customers = Customer::find()
        .filter(customer::Column::OrganizationId.eq(tenant.organization_id))
        .order_by_desc(customer::Column::Id)
        .all(db)
        .await?;
    let dues = dues_by_customer(db, tenant).await?;

    let needle = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let mut summaries: Vec<CustomerSummary> = customers
        .into_iter()
        .filter(|c| match &needle {
            Some(needle) => {
                c.name.to_lowercase().contains(needle) || c.contact.to_lowercase().contains(needle)
            }
            None => true,
        })
        .map(|customer| {
            let total_due = dues.get(&customer.id).copied().unwrap_or_default();
            CustomerSummary {
                customer,
                total_due,
                has_due: total_due > Decimal::ZERO,
            }
        })
        .collect();

    // Stable sort keeps newest-first within each group
    summaries.sort_by_key(|s| !s.has_due);
    Ok(summaries)
}

/// Customer counts and dues of the tenant.
pub async fn customer_stats(db: &DatabaseConnection, tenant: Tenant) -> Result<CustomerStats> {
    let total_customers = Customer::find()
        .filter(customer::Column::OrganizationId.eq(tenant.organization_id))
        .count(db)
        .await?;
    let dues = dues_by_customer(db, tenant).await?;

    Ok(CustomerStats {
        total_customers,
        total_due: dues.values().copied().sum(),
        customers_with_due: dues.values().filter(|due| **due > Decimal::ZERO).count() as u64,
    })
}

fn due_orders_query(customer_id: i64) -> Select<CheckoutOrder> {
    CheckoutOrder::find()
        .filter(checkout_order::Column::CustomerId.eq(customer_id))
        .filter(
            checkout_order::Column::Status
                .is_in([CheckoutStatus::Pending, CheckoutStatus::PartiallyPaid]),
        )
        .order_by_asc(checkout_order::Column::CreatedAt)
        .order_by_asc(checkout_order::Column::Id)
}

/// A customer's unpaid orders, oldest first.
pub async fn due_orders<C>(conn: &C, customer_id: i64) -> Result<Vec<checkout_order::Model>>
where
    C: ConnectionTrait,
{
    Ok(due_orders_query(customer_id).all(conn).await?)
}

/// Spreads a lump payment over a customer's unpaid orders, oldest first.
///
/// Each order that receives money gets its own payment receipt. The customer's total
/// due must drop by exactly the amount paid, otherwise the whole payment is rolled back.
#[instrument(skip(db, request), fields(customer_id = request.customer_id))]
pub async fn pay_customer_due(
    db: &DatabaseConnection,
    tenant: Tenant,
    request: CustomerPaymentRequest,
) -> Result<CustomerPaymentOutcome> {
    let amount = request.amount.round_dp(2);
    if amount <= Decimal::ZERO {
        return Err(Error::validation("Payment amount must be greater than zero"));
    }

    let txn = db.begin().await?;
    let customer = get_customer(&txn, tenant, request.customer_id).await?;

    let orders = due_orders_query(customer.id)
        .lock_exclusive()
        .all(&txn)
        .await?;
    if orders.is_empty() {
        return Err(Error::validation("This customer has no outstanding dues."));
    }

    let before = customer_balance(&txn, customer.id).await?;

    let mut strategy = CustomerPaymentStrategy {
        conn: &txn,
        method: request.payment_method,
        notes: request
            .notes
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PAYMENT_NOTE.to_string()),
    };
    let allocation = allocator::allocate(amount, &orders, &mut strategy).await?;

    let after = customer_balance(&txn, customer.id).await?;
    allocator::verify_total_due(before.total_due_amount - amount, after.total_due_amount)?;

    txn.commit().await?;

    info!(
        customer_id = customer.id,
        %amount,
        orders_paid = allocation.details.len(),
        remaining_due = %after.total_due_amount,
        "Customer due payment recorded"
    );

    Ok(CustomerPaymentOutcome {
        distribution: allocation
            .details
            .into_iter()
            .map(|d| PaymentDistribution {
                order_id: d.item_id,
                allocated_amount: d.allocated_amount,
                remaining_due: d.remaining_due,
            })
            .collect(),
        remaining_due: after.total_due_amount,
    })
}
