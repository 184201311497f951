use std::collections::HashMap;

use async_trait::async_trait;
use common::{
    Customer, CustomerId, Product, ProductId, SerialNumber, SerialNumberId, Sscc, SsccId,
    WorkOrder, WorkOrderId,
};

use crate::{ChangeSet, Result, WorkOrderQuery};

/// Persistence contract for the serialization records.
///
/// Lookups by id return records whether or not they are active; callers
/// decide what a deactivated customer, product or work order means for them.
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>>;

    async fn get_customer_by_gln(&self, gln: &str) -> Result<Option<Customer>>;

    /// Lists active customers ordered by company name.
    async fn list_customers(&self) -> Result<Vec<Customer>>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    async fn get_product_by_gtin(&self, gtin: &str) -> Result<Option<Product>>;

    /// Lists active products of a customer ordered by name.
    async fn products_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Product>>;

    async fn get_work_order(&self, id: WorkOrderId) -> Result<Option<WorkOrder>>;

    async fn get_work_order_by_number(&self, order_number: &str) -> Result<Option<WorkOrder>>;

    /// Lists work orders matching `query`, newest first.
    async fn list_work_orders(&self, query: WorkOrderQuery) -> Result<Vec<WorkOrder>>;

    async fn get_serial_number(&self, id: SerialNumberId) -> Result<Option<SerialNumber>>;

    /// Fetches every serial number in `ids` that exists, in no particular order.
    async fn get_serial_numbers(&self, ids: &[SerialNumberId]) -> Result<Vec<SerialNumber>>;

    /// Finds a serial number by its value within a work order.
    async fn get_serial_by_value(
        &self,
        work_order_id: WorkOrderId,
        serial: &str,
    ) -> Result<Option<SerialNumber>>;

    /// Lists the serial numbers of a work order ordered by serial.
    async fn serial_numbers_by_work_order(
        &self,
        work_order_id: WorkOrderId,
    ) -> Result<Vec<SerialNumber>>;

    /// Lists the serial numbers of a work order that are in no box, ordered by serial.
    async fn unassigned_serial_numbers(
        &self,
        work_order_id: WorkOrderId,
    ) -> Result<Vec<SerialNumber>>;

    /// Lists the serial numbers held by any of `container_ids`, ordered by serial.
    async fn serial_numbers_by_containers(
        &self,
        container_ids: &[SsccId],
    ) -> Result<Vec<SerialNumber>>;

    /// Counts serial numbers per container. Containers holding nothing are absent.
    async fn count_serial_numbers_by_containers(
        &self,
        container_ids: &[SsccId],
    ) -> Result<HashMap<SsccId, u64>>;

    async fn get_container(&self, id: SsccId) -> Result<Option<Sscc>>;

    /// Fetches every container in `ids` that exists, in no particular order.
    async fn get_containers(&self, ids: &[SsccId]) -> Result<Vec<Sscc>>;

    async fn get_container_by_code(&self, code: &str) -> Result<Option<Sscc>>;

    /// Lists the boxes on a pallet ordered by creation time.
    async fn containers_by_parent(&self, parent_id: SsccId) -> Result<Vec<Sscc>>;

    /// Lists the containers of a work order ordered by creation time.
    async fn containers_by_work_order(&self, work_order_id: WorkOrderId) -> Result<Vec<Sscc>>;

    /// Applies every change atomically.
    ///
    /// Fails with `ConcurrencyConflict` if any update's version is stale and
    /// with `UniqueViolation` if any insert collides with an existing key.
    /// On failure nothing is written. An empty change set is a no-op.
    async fn commit(&self, changes: ChangeSet) -> Result<()>;
}

/// Convenience lookups built on [`Store`].
#[async_trait]
pub trait StoreExt: Store {
    async fn serial_numbers_by_container(&self, container_id: SsccId) -> Result<Vec<SerialNumber>> {
        self.serial_numbers_by_containers(&[container_id]).await
    }

    async fn count_serial_numbers_by_container(&self, container_id: SsccId) -> Result<u64> {
        let counts = self.count_serial_numbers_by_containers(&[container_id]).await?;
        Ok(counts.get(&container_id).copied().unwrap_or(0))
    }

    async fn gln_exists(&self, gln: &str) -> Result<bool> {
        Ok(self.get_customer_by_gln(gln).await?.is_some())
    }

    async fn gtin_exists(&self, gtin: &str) -> Result<bool> {
        Ok(self.get_product_by_gtin(gtin).await?.is_some())
    }

    async fn order_number_exists(&self, order_number: &str) -> Result<bool> {
        Ok(self.get_work_order_by_number(order_number).await?.is_some())
    }
}

impl<T: Store + ?Sized> StoreExt for T {}
