//! Core ledger logic, independent of any request layer.
//!
//! Every operation takes a [`tenant::Tenant`] and only ever sees that organization's
//! rows. Stock changes, checkouts and payment allocations each run in one database
//! transaction and leave nothing behind when they fail.

pub mod alerts;
pub mod allocator;
pub mod batch_number;
pub mod checkout;
pub mod customer;
pub mod payment;
pub mod stock;
pub mod supplier;
pub mod tenant;
