//! Customers, products and work orders.

use chrono::NaiveDate;
use common::{
    ContainerKind, Customer, CustomerId, Product, ProductId, Record, SerialStatus, WorkOrder,
    WorkOrderId, WorkOrderStatus,
};
use gs1::IdentifierKind;
use serde::{Deserialize, Serialize};
use store::{ChangeSet, Store, StoreExt, WorkOrderQuery};

use crate::retry::with_conflict_retry;
use crate::{Config, DomainError, Result, lookup};

/// Longest batch number AI(10) allows.
const MAX_BATCH_LENGTH: usize = 20;

/// Input for registering a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub customer_id: CustomerId,
    pub gtin: String,
    pub product_name: String,
    pub description: Option<String>,
}

/// Input for creating a work order. Unset fields take the work order defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorkOrder {
    pub order_number: String,
    pub product_id: ProductId,
    pub production_quantity: u32,
    pub batch_number: String,
    pub expiration_date: NaiveDate,
    #[serde(default)]
    pub serial_number_start: Option<i64>,
    #[serde(default)]
    pub items_per_box: Option<u32>,
    #[serde(default)]
    pub boxes_per_pallet: Option<u32>,
}

/// Progress counters of a work order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkOrderSummary {
    pub work_order_id: WorkOrderId,
    pub order_number: String,
    pub status: WorkOrderStatus,
    pub production_quantity: u32,
    pub total_serial_numbers: u64,
    /// Serials that have been printed at some point (any status past `Generated`).
    pub printed: u64,
    pub verified: u64,
    pub rejected: u64,
    pub aggregated: u64,
    pub boxes: u64,
    pub pallets: u64,
    /// Generated serials as a percentage of the production quantity, two decimals.
    pub completion_percentage: f64,
}

/// Service for the customer/product catalog and work order administration.
pub struct CatalogService<S: Store> {
    store: S,
    max_conflict_retries: u32,
}

impl<S: Store> CatalogService<S> {
    /// Creates a new service with default settings.
    pub fn new(store: S) -> Self {
        Self::with_config(store, &Config::default())
    }

    /// Creates a new service using the retry limit from `config`.
    pub fn with_config(store: S, config: &Config) -> Self {
        Self {
            store,
            max_conflict_retries: config.max_conflict_retries,
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registers a customer identified by its GLN.
    #[tracing::instrument(skip(self))]
    pub async fn register_customer(
        &self,
        company_name: &str,
        gln: &str,
        description: Option<String>,
    ) -> Result<Customer> {
        if company_name.trim().is_empty() {
            return Err(DomainError::validation("Company name must not be empty"));
        }
        gs1::ensure_valid(IdentifierKind::Gln, gln)?;
        if self.store.gln_exists(gln).await? {
            return Err(DomainError::Duplicate {
                entity: "Customer",
                field: "gln",
                value: gln.to_string(),
            });
        }

        let mut customer = Customer::new(company_name.trim(), gln);
        customer.description = description;

        let mut changes = ChangeSet::new();
        changes.insert_customer(customer.clone());
        self.store.commit(changes).await?;

        tracing::info!(customer_id = %customer.id, gln, "customer registered");
        Ok(customer)
    }

    /// Registers a product for an existing customer.
    #[tracing::instrument(skip(self))]
    pub async fn register_product(&self, input: NewProduct) -> Result<Product> {
        if input.product_name.trim().is_empty() {
            return Err(DomainError::validation("Product name must not be empty"));
        }
        gs1::ensure_valid(IdentifierKind::Gtin, &input.gtin)?;
        lookup::active_customer(&self.store, input.customer_id).await?;
        if self.store.gtin_exists(&input.gtin).await? {
            return Err(DomainError::Duplicate {
                entity: "Product",
                field: "gtin",
                value: input.gtin,
            });
        }

        let mut product = Product::new(input.customer_id, input.gtin, input.product_name.trim());
        product.description = input.description;

        let mut changes = ChangeSet::new();
        changes.insert_product(product.clone());
        self.store.commit(changes).await?;

        tracing::info!(product_id = %product.id, gtin = %product.gtin, "product registered");
        Ok(product)
    }

    pub async fn get_customer(&self, id: CustomerId) -> Result<Customer> {
        lookup::active_customer(&self.store, id).await
    }

    pub async fn list_customers(&self) -> Result<Vec<Customer>> {
        Ok(self.store.list_customers().await?)
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        lookup::active_product(&self.store, id).await
    }

    pub async fn products_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Product>> {
        lookup::active_customer(&self.store, customer_id).await?;
        Ok(self.store.products_by_customer(customer_id).await?)
    }

    /// Creates a work order for an existing product.
    #[tracing::instrument(skip(self))]
    pub async fn create_work_order(&self, input: NewWorkOrder) -> Result<WorkOrder> {
        let order_number = input.order_number.trim();
        if order_number.is_empty() {
            return Err(DomainError::validation("Order number must not be empty"));
        }
        if input.batch_number.is_empty() || input.batch_number.len() > MAX_BATCH_LENGTH {
            return Err(DomainError::validation_with(
                format!("Batch number must be 1 to {MAX_BATCH_LENGTH} characters"),
                [&input.batch_number],
            ));
        }
        if input.production_quantity == 0 {
            return Err(DomainError::validation_with(
                "Production quantity must be greater than zero",
                [order_number],
            ));
        }

        let serial_start = input
            .serial_number_start
            .unwrap_or(WorkOrder::DEFAULT_SERIAL_START);
        if serial_start < 1 {
            return Err(DomainError::validation_with(
                format!("Serial number start must be at least 1, got {serial_start}"),
                [order_number],
            ));
        }
        if serial_start
            .checked_add(i64::from(input.production_quantity) - 1)
            .is_none()
        {
            return Err(DomainError::validation_with(
                format!(
                    "Serial number start {serial_start} leaves no room for {} serial numbers",
                    input.production_quantity
                ),
                [order_number],
            ));
        }

        let items_per_box = input.items_per_box.unwrap_or(WorkOrder::DEFAULT_ITEMS_PER_BOX);
        let boxes_per_pallet = input
            .boxes_per_pallet
            .unwrap_or(WorkOrder::DEFAULT_BOXES_PER_PALLET);
        if items_per_box == 0 || boxes_per_pallet == 0 {
            return Err(DomainError::validation_with(
                "Box and pallet capacities must be greater than zero",
                [order_number],
            ));
        }

        lookup::active_product(&self.store, input.product_id).await?;
        if self.store.order_number_exists(order_number).await? {
            return Err(DomainError::Duplicate {
                entity: "WorkOrder",
                field: "order_number",
                value: order_number.to_string(),
            });
        }

        let work_order = WorkOrder::new(
            order_number,
            input.product_id,
            input.production_quantity,
            input.batch_number,
            input.expiration_date,
        )
        .with_serial_start(serial_start)
        .with_capacities(items_per_box, boxes_per_pallet);

        let mut changes = ChangeSet::new();
        changes.insert_work_order(work_order.clone());
        self.store.commit(changes).await?;

        tracing::info!(
            work_order_id = %work_order.id,
            order_number = %work_order.order_number,
            "work order created"
        );
        Ok(work_order)
    }

    /// Gets an active work order.
    pub async fn get_work_order(&self, id: WorkOrderId) -> Result<WorkOrder> {
        lookup::active_work_order(&self.store, id).await
    }

    /// Gets an active work order by its order number.
    pub async fn get_work_order_by_number(&self, order_number: &str) -> Result<WorkOrder> {
        self.store
            .get_work_order_by_number(order_number)
            .await?
            .filter(|w| w.is_active)
            .ok_or_else(|| DomainError::not_found("WorkOrder", order_number))
    }

    /// Lists active work orders, newest first.
    pub async fn list_work_orders(&self, query: WorkOrderQuery) -> Result<Vec<WorkOrder>> {
        Ok(self.store.list_work_orders(query).await?)
    }

    /// Sets an operator-controlled status.
    ///
    /// `OnHold` and `Cancelled` are set directly when the current status
    /// allows it. Requesting `Created` or `InProgress` resumes a held order;
    /// the resulting status depends on whether serials were already
    /// allocated. `Completed` is only reached through allocation.
    #[tracing::instrument(skip(self))]
    pub async fn update_work_order_status(
        &self,
        id: WorkOrderId,
        status: WorkOrderStatus,
    ) -> Result<WorkOrder> {
        with_conflict_retry("update_work_order_status", self.max_conflict_retries, || {
            self.try_update_status(id, status)
        })
        .await
    }

    async fn try_update_status(
        &self,
        id: WorkOrderId,
        target: WorkOrderStatus,
    ) -> Result<WorkOrder> {
        let mut work_order = lookup::active_work_order(&self.store, id).await?;
        let current = work_order.status;

        let (allowed, action) = match target {
            WorkOrderStatus::OnHold => (current.can_hold(), "hold"),
            WorkOrderStatus::Cancelled => (current.can_cancel(), "cancel"),
            WorkOrderStatus::Created | WorkOrderStatus::InProgress => {
                (current.can_resume(), "resume")
            }
            WorkOrderStatus::Completed => (false, "complete"),
        };
        if !allowed {
            return Err(DomainError::WorkOrderStatus {
                status: current,
                action,
            });
        }

        work_order.status = match target {
            WorkOrderStatus::Created | WorkOrderStatus::InProgress => {
                if work_order.allocated_count() == 0 {
                    WorkOrderStatus::Created
                } else {
                    WorkOrderStatus::InProgress
                }
            }
            other => other,
        };

        let mut changes = ChangeSet::new();
        changes.update_work_order(work_order.clone());
        self.store.commit(changes).await?;
        work_order.set_version(work_order.version.next());

        tracing::info!(
            order_number = %work_order.order_number,
            from = %current,
            to = %work_order.status,
            "work order status changed"
        );
        Ok(work_order)
    }

    /// Soft-deletes a work order. It then resolves as not found everywhere.
    #[tracing::instrument(skip(self))]
    pub async fn deactivate_work_order(&self, id: WorkOrderId) -> Result<()> {
        with_conflict_retry("deactivate_work_order", self.max_conflict_retries, || async {
            let mut work_order = lookup::active_work_order(&self.store, id).await?;
            work_order.is_active = false;

            let mut changes = ChangeSet::new();
            changes.update_work_order(work_order.clone());
            self.store.commit(changes).await?;

            tracing::info!(order_number = %work_order.order_number, "work order deactivated");
            Ok(())
        })
        .await
    }

    /// Counts serials by status and containers by kind for a work order.
    pub async fn work_order_summary(&self, id: WorkOrderId) -> Result<WorkOrderSummary> {
        let work_order = lookup::active_work_order(&self.store, id).await?;
        let serials = self.store.serial_numbers_by_work_order(id).await?;
        let containers = self.store.containers_by_work_order(id).await?;

        let count =
            |status: SerialStatus| serials.iter().filter(|s| s.status == status).count() as u64;
        let total = serials.len() as u64;
        let completion_percentage = if work_order.production_quantity > 0 {
            let ratio = total as f64 / f64::from(work_order.production_quantity) * 100.0;
            (ratio * 100.0).round() / 100.0
        } else {
            0.0
        };

        Ok(WorkOrderSummary {
            work_order_id: work_order.id,
            order_number: work_order.order_number,
            status: work_order.status,
            production_quantity: work_order.production_quantity,
            total_serial_numbers: total,
            printed: serials
                .iter()
                .filter(|s| s.status >= SerialStatus::Printed)
                .count() as u64,
            verified: count(SerialStatus::Verified),
            rejected: count(SerialStatus::Rejected),
            aggregated: count(SerialStatus::Aggregated),
            boxes: containers
                .iter()
                .filter(|c| c.kind == ContainerKind::Box)
                .count() as u64,
            pallets: containers
                .iter()
                .filter(|c| c.kind == ContainerKind::Pallet)
                .count() as u64,
            completion_percentage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::InMemoryStore;

    const GLN: &str = "5901234123457";
    const GTIN: &str = "05901234123457";

    fn new_work_order(product_id: ProductId, number: &str) -> NewWorkOrder {
        NewWorkOrder {
            order_number: number.to_string(),
            product_id,
            production_quantity: 100,
            batch_number: "LOT1".to_string(),
            expiration_date: NaiveDate::from_ymd_opt(2027, 12, 31).unwrap(),
            serial_number_start: None,
            items_per_box: Some(12),
            boxes_per_pallet: None,
        }
    }

    async fn service_with_product() -> (CatalogService<InMemoryStore>, Product) {
        let service = CatalogService::new(InMemoryStore::new());
        let customer = service.register_customer("Acme", GLN, None).await.unwrap();
        let product = service
            .register_product(NewProduct {
                customer_id: customer.id,
                gtin: GTIN.to_string(),
                product_name: "Widget".to_string(),
                description: None,
            })
            .await
            .unwrap();
        (service, product)
    }

    #[tokio::test]
    async fn customer_gln_is_validated_and_unique() {
        let service = CatalogService::new(InMemoryStore::new());

        let err = service
            .register_customer("Acme", "5901234123458", None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Gs1Validation);

        service.register_customer("Acme", GLN, None).await.unwrap();
        let err = service
            .register_customer("Other", GLN, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Duplicate);
    }

    #[tokio::test]
    async fn serial_start_must_leave_room_for_the_quantity() {
        let (service, product) = service_with_product().await;

        let mut input = new_work_order(product.id, "WO-MAX");
        input.serial_number_start = Some(i64::MAX);
        let err = service.create_work_order(input).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
        assert_eq!(err.offending(), ["WO-MAX".to_string()]);

        let mut input = new_work_order(product.id, "WO-EDGE");
        input.serial_number_start = Some(i64::MAX - 99);
        let work_order = service.create_work_order(input).await.unwrap();
        assert_eq!(work_order.serial_number_start, i64::MAX - 99);
    }

    #[tokio::test]
    async fn product_requires_known_customer() {
        let service = CatalogService::new(InMemoryStore::new());
        let err = service
            .register_product(NewProduct {
                customer_id: CustomerId::new(),
                gtin: GTIN.to_string(),
                product_name: "Widget".to_string(),
                description: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "Customer", .. }));
    }

    #[tokio::test]
    async fn work_order_defaults_and_overrides() {
        let (service, product) = service_with_product().await;
        let wo = service
            .create_work_order(new_work_order(product.id, "WO-1"))
            .await
            .unwrap();

        assert_eq!(wo.serial_number_start, 1);
        assert_eq!(wo.last_serial_number, 0);
        assert_eq!(wo.items_per_box, 12);
        assert_eq!(wo.boxes_per_pallet, WorkOrder::DEFAULT_BOXES_PER_PALLET);
        assert_eq!(wo.status, WorkOrderStatus::Created);

        let err = service
            .create_work_order(new_work_order(product.id, "WO-1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Duplicate);
    }

    #[tokio::test]
    async fn work_order_input_is_validated() {
        let (service, product) = service_with_product().await;

        let mut zero = new_work_order(product.id, "WO-Z");
        zero.production_quantity = 0;
        assert_eq!(
            service.create_work_order(zero).await.unwrap_err().kind(),
            crate::ErrorKind::Validation
        );

        let mut long_batch = new_work_order(product.id, "WO-B");
        long_batch.batch_number = "B".repeat(21);
        assert_eq!(
            service.create_work_order(long_batch).await.unwrap_err().kind(),
            crate::ErrorKind::Validation
        );

        let mut bad_start = new_work_order(product.id, "WO-S");
        bad_start.serial_number_start = Some(0);
        assert_eq!(
            service.create_work_order(bad_start).await.unwrap_err().kind(),
            crate::ErrorKind::Validation
        );
    }

    #[tokio::test]
    async fn hold_resume_cancel() {
        let (service, product) = service_with_product().await;
        let wo = service
            .create_work_order(new_work_order(product.id, "WO-1"))
            .await
            .unwrap();

        let held = service
            .update_work_order_status(wo.id, WorkOrderStatus::OnHold)
            .await
            .unwrap();
        assert_eq!(held.status, WorkOrderStatus::OnHold);

        let resumed = service
            .update_work_order_status(wo.id, WorkOrderStatus::InProgress)
            .await
            .unwrap();
        assert_eq!(resumed.status, WorkOrderStatus::Created);

        let cancelled = service
            .update_work_order_status(wo.id, WorkOrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, WorkOrderStatus::Cancelled);

        let err = service
            .update_work_order_status(wo.id, WorkOrderStatus::OnHold)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::WorkOrderStatus);
    }

    #[tokio::test]
    async fn completed_cannot_be_set_directly() {
        let (service, product) = service_with_product().await;
        let wo = service
            .create_work_order(new_work_order(product.id, "WO-1"))
            .await
            .unwrap();
        let err = service
            .update_work_order_status(wo.id, WorkOrderStatus::Completed)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::WorkOrderStatus);
    }

    #[tokio::test]
    async fn deactivated_work_order_disappears() {
        let (service, product) = service_with_product().await;
        let wo = service
            .create_work_order(new_work_order(product.id, "WO-1"))
            .await
            .unwrap();

        service.deactivate_work_order(wo.id).await.unwrap();

        assert_eq!(
            service.get_work_order(wo.id).await.unwrap_err().kind(),
            crate::ErrorKind::NotFound
        );
        assert!(service
            .get_work_order_by_number("WO-1")
            .await
            .is_err());
        assert!(service
            .list_work_orders(WorkOrderQuery::new())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn empty_summary() {
        let (service, product) = service_with_product().await;
        let wo = service
            .create_work_order(new_work_order(product.id, "WO-1"))
            .await
            .unwrap();

        let summary = service.work_order_summary(wo.id).await.unwrap();
        assert_eq!(summary.total_serial_numbers, 0);
        assert_eq!(summary.completion_percentage, 0.0);
        assert_eq!(summary.boxes, 0);
    }
}
