//! Record lookups shared by the services.
//!
//! Customers, products and work orders that have been deactivated resolve
//! as `NotFound`, the same as ids that never existed.

use common::{
    Customer, CustomerId, Product, ProductId, SerialNumber, SerialNumberId, Sscc, SsccId,
    WorkOrder, WorkOrderId,
};
use store::Store;

use crate::{DomainError, Result};

pub(crate) async fn active_customer<S: Store + ?Sized>(
    store: &S,
    id: CustomerId,
) -> Result<Customer> {
    store
        .get_customer(id)
        .await?
        .filter(|c| c.is_active)
        .ok_or_else(|| DomainError::not_found("Customer", id))
}

pub(crate) async fn active_product<S: Store + ?Sized>(store: &S, id: ProductId) -> Result<Product> {
    store
        .get_product(id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| DomainError::not_found("Product", id))
}

pub(crate) async fn active_work_order<S: Store + ?Sized>(
    store: &S,
    id: WorkOrderId,
) -> Result<WorkOrder> {
    store
        .get_work_order(id)
        .await?
        .filter(|w| w.is_active)
        .ok_or_else(|| DomainError::not_found("WorkOrder", id))
}

pub(crate) async fn serial_number<S: Store + ?Sized>(
    store: &S,
    id: SerialNumberId,
) -> Result<SerialNumber> {
    store
        .get_serial_number(id)
        .await?
        .ok_or_else(|| DomainError::not_found("SerialNumber", id))
}

pub(crate) async fn container<S: Store + ?Sized>(store: &S, id: SsccId) -> Result<Sscc> {
    store
        .get_container(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Sscc", id))
}
