//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the ledger tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod batch;
pub mod checkout_order;
pub mod customer;
pub mod inventory;
pub mod medicine;
pub mod order_line;
pub mod organization;
pub mod payment;
pub mod supplier;
pub mod supplier_order;
pub mod supplier_payment_record;

// Re-export specific types to avoid conflicts
pub use batch::{Column as BatchColumn, Entity as Batch, Model as BatchModel};
pub use checkout_order::{
    CheckoutStatus, Column as CheckoutOrderColumn, Entity as CheckoutOrder,
    Model as CheckoutOrderModel,
};
pub use customer::{Column as CustomerColumn, Entity as Customer, Model as CustomerModel};
pub use inventory::{Column as InventoryColumn, Entity as Inventory, Model as InventoryModel};
pub use medicine::{Column as MedicineColumn, Entity as Medicine, Model as MedicineModel};
pub use order_line::{Column as OrderLineColumn, Entity as OrderLine, Model as OrderLineModel};
pub use organization::{
    Column as OrganizationColumn, Entity as Organization, Model as OrganizationModel,
};
pub use payment::{
    Column as PaymentColumn, Entity as Payment, Model as PaymentModel, PaymentMethod,
};
pub use supplier::{Column as SupplierColumn, Entity as Supplier, Model as SupplierModel};
pub use supplier_order::{
    Column as SupplierOrderColumn, Entity as SupplierOrder, Model as SupplierOrderModel,
};
pub use supplier_payment_record::{
    Column as SupplierPaymentRecordColumn, Entity as SupplierPaymentRecord,
    Model as SupplierPaymentRecordModel,
};
