//! Point-of-sale checkout.
//!
//! A checkout creates the order, sells every cart line out of its batch and records
//! the initial cash payment in one database transaction. Each batch is locked together
//! with its inventory before its quantity is read, so two checkouts racing for the same
//! batch can never sell more than it holds.

use crate::{
    core::{customer, payment, stock, tenant::Tenant},
    entities::{
        Batch, CheckoutOrder, CheckoutStatus, Inventory, Medicine, OrderLine, PaymentMethod,
        batch, checkout_order, inventory, order_line,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Select, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

const INITIAL_PAYMENT_NOTE: &str = "Initial payment during checkout";

const fn default_unit_quantity() -> i32 {
    1
}

/// One cart line as sent by the point-of-sale screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    /// Batch the pieces are taken from
    #[serde(rename = "selectedBatchId")]
    pub batch_id: i64,
    /// Number of selling units (pieces, strips or boxes)
    #[serde(rename = "selectedUnitItem", default = "default_unit_quantity")]
    pub unit_quantity: i32,
    /// Pieces in one selling unit
    #[serde(rename = "selectedUnitQuantity")]
    pub pieces_per_unit: i32,
    /// Price of one selling unit
    #[serde(rename = "selling_price")]
    pub selling_price_per_unit: Decimal,
    /// Price of a single piece, stored on the order line
    pub per_piece_price: Decimal,
}

/// Totals of the sale as computed at the counter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AmountSummary {
    /// Amount owed after discount
    pub final_amount: Decimal,
    /// Cash handed over by the customer
    pub cash_received: Decimal,
    /// Cash given back; never more than `cash_received`
    pub change_amount: Decimal,
    /// Discount applied to every line, 0 to 100
    pub discount_percentage: Decimal,
}

/// A sale as submitted by the point-of-sale screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Cart lines; at least one
    pub items: Vec<CartItem>,
    /// Counter totals
    pub amount: AmountSummary,
    /// Required together with `customer_contact` when money is left due
    pub customer_name: Option<String>,
    /// Phone number or other contact of the customer
    pub customer_contact: Option<String>,
}

/// A sold line enriched with batch and medicine details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineView {
    /// Order line id
    pub id: i64,
    /// Batch the pieces came from
    pub batch_number: String,
    /// Inventory of the batch
    pub inventory_id: i64,
    /// Catalog name of the medicine
    pub medicine_name: String,
    /// Packaging of the medicine
    pub pieces_per_strip: i32,
    /// Packaging of the medicine
    pub strips_per_box: i32,
    /// Packaging of the medicine
    pub pieces_per_box: i32,
    /// Pieces sold
    pub quantity: i32,
    /// Price of one piece
    pub price_per_unit: Decimal,
    /// Discount percentage applied to the line
    pub discount: Decimal,
    /// Line total after discount
    pub total_price: Decimal,
    /// When the line was sold
    pub created_at: DateTime<Utc>,
}

/// A checkout order with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    /// The checkout order
    pub order: checkout_order::Model,
    /// Its lines in sale order
    pub lines: Vec<OrderLineView>,
}

/// Narrows checkout listings; every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutFilter {
    /// Only orders in this status
    pub status: Option<CheckoutStatus>,
    /// Inclusive lower bound on `created_at`
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`
    pub to: Option<DateTime<Utc>>,
    /// Only orders rung up by this employee
    pub employee_id: Option<i64>,
}

/// Dashboard totals over a set of checkouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckoutSummary {
    /// Number of checkouts
    pub total_orders: u64,
    /// Sum of checkout prices
    pub total_sales: Decimal,
    /// Sum of amounts still due
    pub total_dues: Decimal,
}

/// Paid and due amounts derived from the counter totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Settlement {
    final_amount: Decimal,
    paid: Decimal,
    due: Decimal,
    discount: Decimal,
}

impl Settlement {
    fn from_amount(amount: &AmountSummary) -> Result<Self> {
        let final_amount = amount.final_amount.round_dp(2);
        let cash_received = amount.cash_received.round_dp(2);
        // Negative change counts as none
        let change = amount.change_amount.round_dp(2).max(Decimal::ZERO);
        let discount = amount.discount_percentage.round_dp(2);

        if final_amount < Decimal::ZERO || cash_received < Decimal::ZERO {
            return Err(Error::validation("Checkout amounts cannot be negative"));
        }
        if change > cash_received {
            return Err(Error::validation(
                "Change amount cannot exceed the cash received",
            ));
        }
        if discount < Decimal::ZERO || discount > Decimal::ONE_HUNDRED {
            return Err(Error::validation("Discount must be between 0 and 100 percent"));
        }

        let paid = cash_received - change;
        Ok(Self {
            final_amount,
            paid,
            due: final_amount - paid,
            discount,
        })
    }

    fn status(&self) -> CheckoutStatus {
        CheckoutStatus::derive(self.paid, self.due)
    }
}

fn validate_items(items: &[CartItem]) -> Result<()> {
    if items.is_empty() {
        return Err(Error::validation("Checkout must contain at least one item"));
    }
    for item in items {
        if item.unit_quantity <= 0 || item.pieces_per_unit <= 0 {
            return Err(Error::validation(format!(
                "Quantities for batch {} must be positive",
                item.batch_id
            )));
        }
        if item.selling_price_per_unit < Decimal::ZERO || item.per_piece_price < Decimal::ZERO {
            return Err(Error::validation(format!(
                "Prices for batch {} cannot be negative",
                item.batch_id
            )));
        }
    }
    Ok(())
}

/// Both name and contact, trimmed, when the cashier entered them.
fn customer_identity(request: &CheckoutRequest) -> Option<(&str, &str)> {
    let name = request.customer_name.as_deref().map(str::trim)?;
    let contact = request.customer_contact.as_deref().map(str::trim)?;
    (!name.is_empty() && !contact.is_empty()).then_some((name, contact))
}

/// Line total after the checkout-wide discount.
fn line_total(item: &CartItem, discount: Decimal) -> Decimal {
    let subtotal = item.selling_price_per_unit * Decimal::from(item.unit_quantity);
    (subtotal - subtotal * discount / Decimal::ONE_HUNDRED).round_dp(2)
}

/// Sells one cart line out of its batch inside the checkout transaction.
async fn sell_item<C>(
    conn: &C,
    tenant: Tenant,
    checkout_id: i64,
    item: &CartItem,
    discount: Decimal,
) -> Result<order_line::Model>
where
    C: ConnectionTrait,
{
    let pieces = item
        .pieces_per_unit
        .checked_mul(item.unit_quantity)
        .ok_or_else(|| Error::validation(format!("Quantity too large for batch {}", item.batch_id)))?;

    let (batch, inventory) = stock::lock_batch_and_inventory(conn, tenant, item.batch_id).await?;
    if batch.quantity < pieces {
        return Err(Error::InsufficientStock {
            batch_id: batch.id,
            available: batch.quantity,
            required: pieces,
        });
    }

    let remaining = batch.quantity - pieces;
    let mut active: batch::ActiveModel = batch.into();
    active.quantity = Set(remaining);
    active.updated_at = Set(Utc::now());
    active.update(conn).await?;

    let line = order_line::ActiveModel {
        checkout_id: Set(checkout_id),
        batch_id: Set(item.batch_id),
        inventory_id: Set(inventory.id),
        quantity: Set(pieces),
        price_per_unit: Set(item.per_piece_price.round_dp(2)),
        discount: Set(discount),
        total_price: Set(line_total(item, discount)),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    stock::reconcile_inventory_quantity(conn, inventory.id).await?;
    debug!(checkout_id, batch_id = item.batch_id, pieces, remaining, "Cart line sold");
    Ok(line)
}

/// Completes a sale.
///
/// A sale that leaves money due must name its customer; this is checked before
/// anything is written. Everything else (stock checks, line creation, initial
/// payment) happens in one transaction that is rolled back on the first failure.
#[instrument(skip(db, request), fields(items = request.items.len()))]
pub async fn checkout(
    db: &DatabaseConnection,
    tenant: Tenant,
    employee_id: i64,
    request: CheckoutRequest,
) -> Result<CheckoutReceipt> {
    validate_items(&request.items)?;
    let settlement = Settlement::from_amount(&request.amount)?;
    let identity = customer_identity(&request);

    if settlement.due > Decimal::ZERO && identity.is_none() {
        return Err(Error::validation(
            "Customer name and contact are required for due payments",
        ));
    }

    let txn = db.begin().await?;

    let customer = match identity {
        Some((name, contact)) => Some(customer::resolve_customer(&txn, tenant, name, contact).await?),
        None => None,
    };

    let order = checkout_order::ActiveModel {
        organization_id: Set(tenant.organization_id),
        employee_id: Set(employee_id),
        customer_id: Set(customer.as_ref().map(|c| c.id)),
        checkout_price: Set(settlement.final_amount),
        paid_amount: Set(settlement.paid),
        due_amount: Set(settlement.due),
        status: Set(settlement.status()),
        discount_percentage: Set(settlement.discount),
        customer_name: Set(request.customer_name.clone()),
        customer_contact: Set(request.customer_contact.clone()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for item in &request.items {
        sell_item(&txn, tenant, order.id, item, settlement.discount).await?;
    }

    let order = if settlement.paid > Decimal::ZERO && customer.is_some() {
        payment::record_payment(
            &txn,
            &order,
            settlement.paid,
            PaymentMethod::Cash,
            Some(INITIAL_PAYMENT_NOTE.to_string()),
        )
        .await?
        .order
    } else {
        order
    };

    let lines = line_views(&txn, order.id).await?;
    txn.commit().await?;

    info!(
        checkout_id = order.id,
        organization_id = tenant.organization_id,
        employee_id,
        lines = lines.len(),
        total = %order.checkout_price,
        due = %order.due_amount,
        status = %order.status,
        "Checkout completed"
    );
    Ok(CheckoutReceipt { order, lines })
}

/// Lines of a checkout with batch and medicine details, in sale order.
async fn line_views<C>(conn: &C, checkout_id: i64) -> Result<Vec<OrderLineView>>
where
    C: ConnectionTrait,
{
    let lines = OrderLine::find()
        .filter(order_line::Column::CheckoutId.eq(checkout_id))
        .order_by_asc(order_line::Column::Id)
        .all(conn)
        .await?;

    let batch_ids: Vec<i64> = lines.iter().map(|l| l.batch_id).collect();
    let inventory_ids: Vec<i64> = lines.iter().map(|l| l.inventory_id).collect();

    let batches: HashMap<i64, batch::Model> = Batch::find()
        .filter(batch::Column::Id.is_in(batch_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|b| (b.id, b))
        .collect();
    let inventories: HashMap<i64, _> = Inventory::find()
        .filter(inventory::Column::Id.is_in(inventory_ids))
        .find_also_related(Medicine)
        .all(conn)
        .await?
        .into_iter()
        .map(|(inventory, medicine)| (inventory.id, medicine))
        .collect();

    let mut views = Vec::with_capacity(lines.len());
    for line in lines {
        let batch = batches
            .get(&line.batch_id)
            .ok_or_else(|| Error::not_found("Batch", line.batch_id))?;
        let medicine = inventories
            .get(&line.inventory_id)
            .and_then(Option::as_ref)
            .ok_or_else(|| Error::not_found("Inventory", line.inventory_id))?;

        views.push(OrderLineView {
            id: line.id,
            batch_number: batch.batch_number.clone(),
            inventory_id: line.inventory_id,
            medicine_name: medicine.name.clone(),
            pieces_per_strip: medicine.pieces_per_strip,
            strips_per_box: medicine.strips_per_box,
            pieces_per_box: medicine.pieces_per_box,
            quantity: line.quantity,
            price_per_unit: line.price_per_unit,
            discount: line.discount,
            total_price: line.total_price,
            created_at: line.created_at,
        });
    }
    Ok(views)
}

/// Fetches a checkout of the tenant with its lines.
pub async fn get_checkout(
    db: &DatabaseConnection,
    tenant: Tenant,
    checkout_id: i64,
) -> Result<CheckoutReceipt> {
    let order = CheckoutOrder::find_by_id(checkout_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Checkout", checkout_id))?;
    tenant.ensure_owns("Checkout", checkout_id, order.organization_id)?;

    let lines = line_views(db, order.id).await?;
    Ok(CheckoutReceipt { order, lines })
}

fn filtered(tenant: Tenant, filter: &CheckoutFilter) -> Select<CheckoutOrder> {
    let mut query =
        CheckoutOrder::find().filter(checkout_order::Column::OrganizationId.eq(tenant.organization_id));

    if let Some(status) = filter.status {
        query = query.filter(checkout_order::Column::Status.eq(status));
    }
    if let Some(from) = filter.from {
        query = query.filter(checkout_order::Column::CreatedAt.gte(from));
    }
    if let Some(to) = filter.to {
        query = query.filter(checkout_order::Column::CreatedAt.lte(to));
    }
    if let Some(employee_id) = filter.employee_id {
        query = query.filter(checkout_order::Column::EmployeeId.eq(employee_id));
    }
    query
}

/// Checkouts of the tenant matching `filter`, newest first.
pub async fn list_checkouts(
    db: &DatabaseConnection,
    tenant: Tenant,
    filter: &CheckoutFilter,
) -> Result<Vec<checkout_order::Model>> {
    Ok(filtered(tenant, filter)
        .order_by_desc(checkout_order::Column::CreatedAt)
        .order_by_desc(checkout_order::Column::Id)
        .all(db)
        .await?)
}

/// Sales totals over the checkouts matching `filter`.
pub async fn checkout_summary(
    db: &DatabaseConnection,
    tenant: Tenant,
    filter: &CheckoutFilter,
) -> Result<CheckoutSummary> {
    let orders = filtered(tenant, filter).all(db).await?;

    Ok(CheckoutSummary {
        total_orders: orders.len() as u64,
        total_sales: orders.iter().map(|o| o.checkout_price).sum(),
        total_dues: orders.iter().map(|o| o.due_amount).sum(),
    })
}

/// Removes one line from a checkout, returning its pieces to the batch.
///
/// The checkout's price becomes the sum of its remaining lines; paid amount is kept,
/// so the due and status are recomputed from it. Returns the updated checkout.
#[instrument(skip(db))]
pub async fn delete_order_line(
    db: &DatabaseConnection,
    tenant: Tenant,
    line_id: i64,
) -> Result<checkout_order::Model> {
    let txn = db.begin().await?;

    let line = OrderLine::find_by_id(line_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Order line", line_id))?;

    let (batch, inventory) = match stock::lock_batch_and_inventory(&txn, tenant, line.batch_id).await {
        Ok(locked) => locked,
        Err(Error::NotFound { .. }) => return Err(Error::not_found("Order line", line_id)),
        Err(e) => return Err(e),
    };
    let order = payment::lock_checkout_order(&txn, tenant, line.checkout_id).await?;

    let restored = batch
        .quantity
        .checked_add(line.quantity)
        .ok_or_else(|| Error::validation("Batch quantity overflow"))?;
    let mut active: batch::ActiveModel = batch.into();
    active.quantity = Set(restored);
    active.updated_at = Set(Utc::now());
    active.update(&txn).await?;

    let returned = line.quantity;
    line.delete(&txn).await?;
    stock::reconcile_inventory_quantity(&txn, inventory.id).await?;

    let remaining_lines = OrderLine::find()
        .filter(order_line::Column::CheckoutId.eq(order.id))
        .all(&txn)
        .await?;
    let price: Decimal = remaining_lines.iter().map(|l| l.total_price).sum();
    let due = price - order.paid_amount;
    if due < Decimal::ZERO {
        warn!(checkout_id = order.id, %due, "Checkout now overpaid after line removal");
    }

    let paid = order.paid_amount;
    let mut order_active: checkout_order::ActiveModel = order.into();
    order_active.checkout_price = Set(price);
    order_active.due_amount = Set(due);
    order_active.status = Set(CheckoutStatus::derive(paid, due));
    let order = order_active.update(&txn).await?;

    txn.commit().await?;

    info!(
        line_id,
        checkout_id = order.id,
        returned,
        checkout_price = %order.checkout_price,
        "Order line removed"
    );
    Ok(order)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::stock::get_inventory,
        entities::Payment,
        test_utils::*,
    };
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase, PaginatorTrait};

    const EMPLOYEE: i64 = 7;

    fn item(batch_id: i64, units: i32, pieces_per_unit: i32, unit_price: Decimal) -> CartItem {
        CartItem {
            batch_id,
            unit_quantity: units,
            pieces_per_unit,
            selling_price_per_unit: unit_price,
            per_piece_price: unit_price / Decimal::from(pieces_per_unit),
        }
    }

    fn request(items: Vec<CartItem>, final_amount: Decimal, cash: Decimal) -> CheckoutRequest {
        CheckoutRequest {
            items,
            amount: AmountSummary {
                final_amount,
                cash_received: cash,
                change_amount: Decimal::ZERO,
                discount_percentage: Decimal::ZERO,
            },
            customer_name: None,
            customer_contact: None,
        }
    }

    fn with_customer(mut request: CheckoutRequest) -> CheckoutRequest {
        request.customer_name = Some("Rahim".to_string());
        request.customer_contact = Some("01700000000".to_string());
        request
    }

    #[test]
    fn test_settlement_from_amount() {
        let amount = AmountSummary {
            final_amount: dec!(95),
            cash_received: dec!(100),
            change_amount: dec!(5),
            discount_percentage: dec!(5),
        };
        let settlement = Settlement::from_amount(&amount).unwrap();
        assert_eq!(settlement.paid, dec!(95));
        assert_eq!(settlement.due, dec!(0));
        assert_eq!(settlement.status(), CheckoutStatus::Completed);

        let partial = AmountSummary {
            final_amount: dec!(100),
            cash_received: dec!(40),
            change_amount: dec!(-3),
            ..Default::default()
        };
        let settlement = Settlement::from_amount(&partial).unwrap();
        assert_eq!(settlement.paid, dec!(40));
        assert_eq!(settlement.due, dec!(60));
        assert_eq!(settlement.status(), CheckoutStatus::PartiallyPaid);

        let bad_discount = AmountSummary {
            discount_percentage: dec!(101),
            ..Default::default()
        };
        assert!(Settlement::from_amount(&bad_discount).is_err());
    }

    #[test]
    fn test_settlement_change_exceeds_cash() {
        let amount = AmountSummary {
            final_amount: dec!(50),
            cash_received: dec!(0),
            change_amount: dec!(10),
            ..Default::default()
        };
        assert!(matches!(
            Settlement::from_amount(&amount).unwrap_err(),
            Error::Validation { .. }
        ));

        // All cash handed back is still a valid, fully unpaid sale
        let exact = AmountSummary {
            final_amount: dec!(50),
            cash_received: dec!(10),
            change_amount: dec!(10),
            ..Default::default()
        };
        let settlement = Settlement::from_amount(&exact).unwrap();
        assert_eq!(settlement.paid, dec!(0));
        assert_eq!(settlement.due, dec!(50));
        assert_eq!(settlement.status(), CheckoutStatus::Pending);
    }

    #[test]
    fn test_line_total_applies_discount() {
        let line = item(1, 3, 10, dec!(12.50));
        assert_eq!(line_total(&line, dec!(0)), dec!(37.50));
        assert_eq!(line_total(&line, dec!(10)), dec!(33.75));
        assert_eq!(line_total(&line, dec!(33.33)), dec!(25.00));
    }

    #[test]
    fn test_cart_item_wire_names() {
        let json = r#"{
            "selectedBatchId": 4,
            "selectedUnitItem": 2,
            "selectedUnitQuantity": 10,
            "selling_price": "25.00",
            "per_piece_price": "2.50"
        }"#;
        let item: CartItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.batch_id, 4);
        assert_eq!(item.unit_quantity, 2);
        assert_eq!(item.pieces_per_unit, 10);
        assert_eq!(item.selling_price_per_unit, dec!(25));
    }

    #[tokio::test]
    async fn test_checkout_decrements_stock() -> Result<()> {
        let (db, tenant, inventory, batch) = setup_with_batch(100).await?;
        create_test_batch(&db, tenant, inventory.id, 20).await?;

        let receipt = checkout(
            &db,
            tenant,
            EMPLOYEE,
            request(vec![item(batch.id, 2, 10, dec!(30))], dec!(60), dec!(60)),
        )
        .await?;

        assert_eq!(receipt.order.status, CheckoutStatus::Completed);
        assert_eq!(receipt.order.due_amount, dec!(0));
        assert_eq!(receipt.order.customer_id, None);
        assert_eq!(receipt.lines.len(), 1);
        let line = &receipt.lines[0];
        assert_eq!(line.quantity, 20);
        assert_eq!(line.batch_number, "BATCH-A");
        assert_eq!(line.price_per_unit, dec!(3));
        assert_eq!(line.total_price, dec!(60));
        assert_eq!(line.medicine_name, "Napa");

        let batch = Batch::find_by_id(batch.id).one(&db).await?.unwrap();
        assert_eq!(batch.quantity, 80);
        let inventory = get_inventory(&db, tenant, inventory.id).await?;
        assert_eq!(inventory.quantity, 100);
        Ok(())
    }

    #[tokio::test]
    async fn test_checkout_insufficient_stock_rolls_back() -> Result<()> {
        let (db, tenant, inventory, first) = setup_with_batch(50).await?;
        let second = create_test_batch(&db, tenant, inventory.id, 5).await?;

        let result = checkout(
            &db,
            tenant,
            EMPLOYEE,
            request(
                vec![item(first.id, 1, 10, dec!(10)), item(second.id, 1, 10, dec!(10))],
                dec!(20),
                dec!(20),
            ),
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientStock { available: 5, required: 10, .. }
        ));

        // The first line's decrement was rolled back with everything else
        let first = Batch::find_by_id(first.id).one(&db).await?.unwrap();
        assert_eq!(first.quantity, 50);
        assert_eq!(get_inventory(&db, tenant, inventory.id).await?.quantity, 55);
        assert_eq!(CheckoutOrder::find().count(&db).await?, 0);
        assert_eq!(OrderLine::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_due_checkout_requires_customer() -> Result<()> {
        let (db, tenant, _inventory, batch) = setup_with_batch(50).await?;

        let result = checkout(
            &db,
            tenant,
            EMPLOYEE,
            request(vec![item(batch.id, 1, 10, dec!(100))], dec!(100), dec!(40)),
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        assert_eq!(OrderLine::find().count(&db).await?, 0);
        assert_eq!(
            Batch::find_by_id(batch.id).one(&db).await?.unwrap().quantity,
            50
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_due_checkout_records_initial_payment() -> Result<()> {
        let (db, tenant, _inventory, batch) = setup_with_batch(50).await?;

        let receipt = checkout(
            &db,
            tenant,
            EMPLOYEE,
            with_customer(request(
                vec![item(batch.id, 1, 10, dec!(100))],
                dec!(100),
                dec!(40),
            )),
        )
        .await?;

        assert_eq!(receipt.order.paid_amount, dec!(40));
        assert_eq!(receipt.order.due_amount, dec!(60));
        assert_eq!(receipt.order.status, CheckoutStatus::PartiallyPaid);

        let customer_id = receipt.order.customer_id.unwrap();
        let payments = Payment::find().all(&db).await?;
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount, dec!(40));
        assert_eq!(payments[0].customer_id, customer_id);
        assert_eq!(payments[0].notes.as_deref(), Some(INITIAL_PAYMENT_NOTE));

        let balance = customer::customer_balance(&db, customer_id).await?;
        assert_eq!(balance.total_due_amount, dec!(60));
        Ok(())
    }

    #[tokio::test]
    async fn test_unpaid_checkout_is_pending() -> Result<()> {
        let (db, tenant, _inventory, batch) = setup_with_batch(50).await?;

        let receipt = checkout(
            &db,
            tenant,
            EMPLOYEE,
            with_customer(request(vec![item(batch.id, 1, 10, dec!(25))], dec!(25), dec!(0))),
        )
        .await?;
        assert_eq!(receipt.order.status, CheckoutStatus::Pending);
        assert_eq!(Payment::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_checkout_validation_before_database() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let tenant = Tenant::new(1);

        let empty = checkout(&db, tenant, EMPLOYEE, request(vec![], dec!(0), dec!(0))).await;
        assert!(matches!(empty.unwrap_err(), Error::Validation { .. }));

        let zero_units = checkout(
            &db,
            tenant,
            EMPLOYEE,
            request(vec![item(1, 0, 10, dec!(5))], dec!(0), dec!(0)),
        )
        .await;
        assert!(matches!(zero_units.unwrap_err(), Error::Validation { .. }));
    }

    #[tokio::test]
    async fn test_excess_change_leaves_stock_and_customer_untouched() -> Result<()> {
        let (db, tenant, _inventory, batch) = setup_with_batch(50).await?;

        let mut over = with_customer(request(
            vec![item(batch.id, 1, 10, dec!(50))],
            dec!(50),
            dec!(0),
        ));
        over.amount.change_amount = dec!(10);

        let result = checkout(&db, tenant, EMPLOYEE, over).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        assert_eq!(CheckoutOrder::find().count(&db).await?, 0);
        assert_eq!(crate::entities::Customer::find().count(&db).await?, 0);
        assert_eq!(
            Batch::find_by_id(batch.id).one(&db).await?.unwrap().quantity,
            50
        );

        // The same sale with no change can be settled later in full
        let receipt = checkout(
            &db,
            tenant,
            EMPLOYEE,
            with_customer(request(vec![item(batch.id, 1, 10, dec!(50))], dec!(50), dec!(0))),
        )
        .await?;
        let customer_id = receipt.order.customer_id.unwrap();
        let outcome = customer::pay_customer_due(
            &db,
            tenant,
            customer::CustomerPaymentRequest {
                customer_id,
                amount: dec!(50),
                payment_method: PaymentMethod::Cash,
                notes: None,
            },
        )
        .await?;
        assert_eq!(outcome.remaining_due, dec!(0));
        Ok(())
    }

    /// The in-memory pool holds a single connection, so the two checkouts below
    /// take turns on it; row locks only come into play on a multi-connection pool.
    #[tokio::test]
    async fn test_concurrent_checkouts_never_oversell() -> Result<()> {
        let (db, tenant, inventory, batch) = setup_with_batch(10).await?;

        let first = checkout(
            &db,
            tenant,
            EMPLOYEE,
            request(vec![item(batch.id, 6, 1, dec!(1))], dec!(6), dec!(6)),
        );
        let second = checkout(
            &db,
            tenant,
            EMPLOYEE,
            request(vec![item(batch.id, 6, 1, dec!(1))], dec!(6), dec!(6)),
        );
        let (first, second) = tokio::join!(first, second);

        let outcomes = [first, second];
        let succeeded = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 1);
        assert!(outcomes.iter().any(|r| matches!(
            r,
            Err(Error::InsufficientStock { available: 4, required: 6, .. })
        )));

        let batch = Batch::find_by_id(batch.id).one(&db).await?.unwrap();
        assert_eq!(batch.quantity, 4);
        assert_eq!(get_inventory(&db, tenant, inventory.id).await?.quantity, 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_checkout_other_tenant_batch() -> Result<()> {
        let (db, _tenant, _inventory, batch) = setup_with_batch(10).await?;
        let other = create_test_organization(&db, "Other Pharmacy").await?;

        let result = checkout(
            &db,
            Tenant::from(&other),
            EMPLOYEE,
            request(vec![item(batch.id, 1, 1, dec!(1))], dec!(1), dec!(1)),
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::NotFound { entity: "Batch", .. }
        ));
        assert_eq!(
            Batch::find_by_id(batch.id).one(&db).await?.unwrap().quantity,
            10
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_listing_and_summary() -> Result<()> {
        let (db, tenant, _inventory, batch) = setup_with_batch(100).await?;

        let paid = checkout(
            &db,
            tenant,
            EMPLOYEE,
            request(vec![item(batch.id, 1, 1, dec!(10))], dec!(10), dec!(10)),
        )
        .await?;
        let owing = checkout(
            &db,
            tenant,
            EMPLOYEE + 1,
            with_customer(request(vec![item(batch.id, 3, 1, dec!(10))], dec!(30), dec!(5))),
        )
        .await?;

        let all = list_checkouts(&db, tenant, &CheckoutFilter::default()).await?;
        assert_eq!(
            all.iter().map(|o| o.id).collect::<Vec<_>>(),
            vec![owing.order.id, paid.order.id]
        );

        let partial = list_checkouts(
            &db,
            tenant,
            &CheckoutFilter {
                status: Some(CheckoutStatus::PartiallyPaid),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(partial.len(), 1);
        assert_eq!(partial[0].id, owing.order.id);

        let by_employee = list_checkouts(
            &db,
            tenant,
            &CheckoutFilter {
                employee_id: Some(EMPLOYEE),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(by_employee.len(), 1);

        let summary = checkout_summary(&db, tenant, &CheckoutFilter::default()).await?;
        assert_eq!(summary.total_orders, 2);
        assert_eq!(summary.total_sales, dec!(40));
        assert_eq!(summary.total_dues, dec!(25));

        let receipt = get_checkout(&db, tenant, owing.order.id).await?;
        assert_eq!(receipt.lines.len(), 1);
        assert_eq!(receipt.lines[0].quantity, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_order_line_restores_stock() -> Result<()> {
        let (db, tenant, inventory, batch) = setup_with_batch(100).await?;

        let receipt = checkout(
            &db,
            tenant,
            EMPLOYEE,
            with_customer(request(
                vec![item(batch.id, 2, 10, dec!(20)), item(batch.id, 1, 10, dec!(20))],
                dec!(60),
                dec!(30),
            )),
        )
        .await?;
        assert_eq!(get_inventory(&db, tenant, inventory.id).await?.quantity, 70);

        let order = delete_order_line(&db, tenant, receipt.lines[0].id).await?;
        assert_eq!(order.checkout_price, dec!(20));
        assert_eq!(order.paid_amount, dec!(30));
        assert_eq!(order.due_amount, dec!(-10));
        assert_eq!(order.status, CheckoutStatus::Completed);

        let batch = Batch::find_by_id(batch.id).one(&db).await?.unwrap();
        assert_eq!(batch.quantity, 90);
        assert_eq!(get_inventory(&db, tenant, inventory.id).await?.quantity, 90);
        assert_eq!(get_checkout(&db, tenant, order.id).await?.lines.len(), 1);
        Ok(())
    }
}
