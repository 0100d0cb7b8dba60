//! Oldest-first payment allocation.
//!
//! A lump payment is spread over a debtor's outstanding items in the order the caller
//! supplies (oldest first), settling each item fully before moving to the next. How
//! an allocation is written to the database is left to an [`AllocationStrategy`]; the
//! customer ledger records a payment receipt per order, the supplier ledger edits the
//! order directly.

use crate::{
    entities::{checkout_order, supplier_order},
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::future::Future;
use tracing::{debug, error};

/// Anything that carries an outstanding balance.
pub trait DueItem {
    /// Id reported in allocation details
    fn item_id(&self) -> i64;
    /// Amount still owed on the item
    fn due_amount(&self) -> Decimal;
}

impl DueItem for checkout_order::Model {
    fn item_id(&self) -> i64 {
        self.id
    }

    fn due_amount(&self) -> Decimal {
        self.due_amount
    }
}

impl DueItem for supplier_order::Model {
    fn item_id(&self) -> i64 {
        self.id
    }

    fn due_amount(&self) -> Decimal {
        self.due_amount
    }
}

/// Persists the share of a payment allocated to one item.
///
/// `apply` is the only place an allocation mutates state. It runs inside the caller's
/// transaction, so returning an error aborts the whole allocation.
pub trait AllocationStrategy {
    /// Kind of item this strategy pays down
    type Item: DueItem;

    /// Credits `amount` to `item`.
    fn apply(&mut self, item: &Self::Item, amount: Decimal) -> impl Future<Output = Result<()>>;
}

/// How much of the payment went to one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationDetail {
    /// Id of the order that received money
    pub item_id: i64,
    /// Amount credited to it
    pub allocated_amount: Decimal,
    /// Due left on the item after the allocation
    pub remaining_due: Decimal,
}

/// Outcome of spreading one payment over a list of due items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationResult {
    /// Amount the debtor paid
    pub payment_amount: Decimal,
    /// Sum of the items' dues before allocation
    pub total_due_before: Decimal,
    /// Unallocated remainder; zero whenever the payment passed validation
    pub remaining_payment: Decimal,
    /// One entry per item that received money, in allocation order
    pub details: Vec<AllocationDetail>,
}

impl AllocationResult {
    /// Total due the items should carry once the allocation is persisted.
    #[must_use]
    pub fn total_due_after(&self) -> Decimal {
        self.total_due_before - (self.payment_amount - self.remaining_payment)
    }
}

/// Sum of the outstanding balances.
pub fn total_due<T: DueItem>(items: &[T]) -> Decimal {
    items.iter().map(T::due_amount).sum()
}

/// Checks that a payment is positive and does not exceed what is owed.
pub fn validate_payment(payment_amount: Decimal, total_due: Decimal) -> Result<()> {
    if payment_amount <= Decimal::ZERO {
        return Err(Error::validation("Payment amount must be greater than zero"));
    }
    if payment_amount > total_due {
        return Err(Error::ExcessPayment {
            amount: payment_amount,
            total_due,
        });
    }
    Ok(())
}

/// Spreads `payment_amount` over `items` in the given order.
///
/// `items` must already be sorted oldest first; the allocator does not reorder them.
/// The payment is validated against the items' total due before anything is applied.
pub async fn allocate<S>(
    payment_amount: Decimal,
    items: &[S::Item],
    strategy: &mut S,
) -> Result<AllocationResult>
where
    S: AllocationStrategy,
{
    let total_due_before = total_due(items);
    validate_payment(payment_amount, total_due_before)?;

    let mut remaining = payment_amount;
    let mut details = Vec::new();

    for item in items {
        if remaining <= Decimal::ZERO {
            break;
        }

        let due = item.due_amount();
        let allocated = remaining.min(due);
        if allocated <= Decimal::ZERO {
            continue;
        }

        strategy.apply(item, allocated).await?;
        remaining -= allocated;

        debug!(item_id = item.item_id(), %allocated, "Payment allocated");
        details.push(AllocationDetail {
            item_id: item.item_id(),
            allocated_amount: allocated,
            remaining_due: due - allocated,
        });
    }

    Ok(AllocationResult {
        payment_amount,
        total_due_before,
        remaining_payment: remaining,
        details,
    })
}

/// Compares the total due found after an allocation with the expected one.
///
/// A mismatch means some other writer changed the ledger mid-allocation; it is
/// logged and reported as a `ConsistencyViolation` so the transaction rolls back.
pub fn verify_total_due(expected: Decimal, actual: Decimal) -> Result<()> {
    if expected == actual {
        return Ok(());
    }

    error!(%expected, %actual, "Total due mismatch after payment allocation");
    Err(Error::ConsistencyViolation { expected, actual })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use rust_decimal_macros::dec;

    struct Owed {
        id: i64,
        due: Decimal,
    }

    impl DueItem for Owed {
        fn item_id(&self) -> i64 {
            self.id
        }

        fn due_amount(&self) -> Decimal {
            self.due
        }
    }

    /// Records every application; optionally fails on one item.
    #[derive(Default)]
    struct Recorder {
        applied: Vec<(i64, Decimal)>,
        fail_on: Option<i64>,
    }

    impl AllocationStrategy for Recorder {
        type Item = Owed;

        async fn apply(&mut self, item: &Owed, amount: Decimal) -> Result<()> {
            if self.fail_on == Some(item.id) {
                return Err(Error::validation("write failed"));
            }
            self.applied.push((item.id, amount));
            Ok(())
        }
    }

    fn owed(dues: &[Decimal]) -> Vec<Owed> {
        dues.iter()
            .enumerate()
            .map(|(idx, due)| Owed {
                id: idx as i64 + 1,
                due: *due,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_allocates_oldest_first() -> Result<()> {
        let items = owed(&[dec!(30), dec!(20), dec!(50)]);
        let mut recorder = Recorder::default();

        let result = allocate(dec!(45), &items, &mut recorder).await?;

        assert_eq!(recorder.applied, vec![(1, dec!(30)), (2, dec!(15))]);
        assert_eq!(result.remaining_payment, dec!(0));
        assert_eq!(result.total_due_before, dec!(100));
        assert_eq!(result.total_due_after(), dec!(55));
        assert_eq!(result.details.len(), 2);
        assert_eq!(result.details[0].remaining_due, dec!(0));
        assert_eq!(result.details[1].remaining_due, dec!(5));
        Ok(())
    }

    #[tokio::test]
    async fn test_exact_payoff() -> Result<()> {
        let items = owed(&[dec!(30), dec!(20), dec!(50)]);
        let mut recorder = Recorder::default();

        let result = allocate(dec!(100), &items, &mut recorder).await?;
        assert_eq!(recorder.applied.len(), 3);
        assert_eq!(result.total_due_after(), dec!(0));
        assert!(result.details.iter().all(|d| d.remaining_due == dec!(0)));
        Ok(())
    }

    #[tokio::test]
    async fn test_skips_settled_items() -> Result<()> {
        let items = owed(&[dec!(0), dec!(25)]);
        let mut recorder = Recorder::default();

        let result = allocate(dec!(10), &items, &mut recorder).await?;
        assert_eq!(recorder.applied, vec![(2, dec!(10))]);
        assert_eq!(result.details[0].item_id, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_rejects_excess_payment_without_applying() {
        let items = owed(&[dec!(30), dec!(20), dec!(50)]);
        let mut recorder = Recorder::default();

        let err = allocate(dec!(100.01), &items, &mut recorder).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ExcessPayment { total_due, .. } if total_due == dec!(100)
        ));
        assert!(recorder.applied.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_non_positive_payment() {
        let items = owed(&[dec!(30)]);
        let mut recorder = Recorder::default();

        for amount in [dec!(0), dec!(-5)] {
            let err = allocate(amount, &items, &mut recorder).await.unwrap_err();
            assert!(matches!(err, Error::Validation { .. }));
        }
        assert!(recorder.applied.is_empty());
    }

    #[tokio::test]
    async fn test_apply_failure_propagates() {
        let items = owed(&[dec!(30), dec!(20)]);
        let mut recorder = Recorder {
            fail_on: Some(2),
            ..Default::default()
        };

        let err = allocate(dec!(40), &items, &mut recorder).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_verify_total_due() {
        assert!(verify_total_due(dec!(55), dec!(55.00)).is_ok());
        assert!(matches!(
            verify_total_due(dec!(55), dec!(60)).unwrap_err(),
            Error::ConsistencyViolation { .. }
        ));
    }
}
