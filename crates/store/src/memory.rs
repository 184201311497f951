use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use common::{
    Customer, CustomerId, Product, ProductId, SerialNumber, SerialNumberId, Sscc, SsccId, Version,
    WorkOrder, WorkOrderId,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{Change, ChangeSet, Result, Row, Store, StoreError, WorkOrderQuery};

/// In-memory store implementation for tests and benchmarks.
///
/// Enforces the same version checks and unique keys as the PostgreSQL
/// implementation. A commit applies its changes in place and journals what
/// each one overwrote; if any change fails the journal is replayed backwards.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored serial numbers.
    pub async fn serial_number_count(&self) -> usize {
        self.tables.read().await.serial_numbers.len()
    }

    /// Returns the number of stored containers.
    pub async fn container_count(&self) -> usize {
        self.tables.read().await.containers.len()
    }
}

/// A unique key: the index it lives in, the field reported on collision and
/// the indexed value.
struct UniqueKey {
    index: &'static str,
    field: &'static str,
    value: String,
}

fn unique_keys(row: &Row) -> Vec<UniqueKey> {
    match row {
        Row::Customer(c) => vec![UniqueKey {
            index: "customers.gln",
            field: "gln",
            value: c.gln.clone(),
        }],
        Row::Product(p) => vec![UniqueKey {
            index: "products.gtin",
            field: "gtin",
            value: p.gtin.clone(),
        }],
        Row::WorkOrder(w) => vec![UniqueKey {
            index: "work_orders.order_number",
            field: "order_number",
            value: w.order_number.clone(),
        }],
        Row::SerialNumber(s) => vec![UniqueKey {
            index: "serial_numbers.work_order_serial",
            field: "serial",
            value: format!("{}/{}", s.work_order_id, s.serial),
        }],
        Row::Container(c) => vec![UniqueKey {
            index: "containers.code",
            field: "code",
            value: c.code.clone(),
        }],
    }
}

/// What a single write overwrote.
enum Undo {
    Inserted(Row),
    Replaced(Row),
    Slot {
        slot: (&'static str, String),
        owner: Option<Uuid>,
    },
}

#[derive(Default)]
struct Tables {
    customers: HashMap<Uuid, Customer>,
    products: HashMap<Uuid, Product>,
    work_orders: HashMap<Uuid, WorkOrder>,
    serial_numbers: HashMap<Uuid, SerialNumber>,
    containers: HashMap<Uuid, Sscc>,
    unique: HashMap<(&'static str, String), Uuid>,
}

impl Tables {
    fn lookup(&self, row: &Row) -> Option<Row> {
        let id = row.id();
        match row {
            Row::Customer(_) => self.customers.get(&id).cloned().map(Row::Customer),
            Row::Product(_) => self.products.get(&id).cloned().map(Row::Product),
            Row::WorkOrder(_) => self.work_orders.get(&id).cloned().map(Row::WorkOrder),
            Row::SerialNumber(_) => self.serial_numbers.get(&id).cloned().map(Row::SerialNumber),
            Row::Container(_) => self.containers.get(&id).cloned().map(Row::Container),
        }
    }

    fn put(&mut self, row: Row) {
        let id = row.id();
        match row {
            Row::Customer(r) => {
                self.customers.insert(id, r);
            }
            Row::Product(r) => {
                self.products.insert(id, r);
            }
            Row::WorkOrder(r) => {
                self.work_orders.insert(id, r);
            }
            Row::SerialNumber(r) => {
                self.serial_numbers.insert(id, r);
            }
            Row::Container(r) => {
                self.containers.insert(id, r);
            }
        }
    }

    fn remove(&mut self, row: &Row) {
        let id = row.id();
        match row {
            Row::Customer(_) => {
                self.customers.remove(&id);
            }
            Row::Product(_) => {
                self.products.remove(&id);
            }
            Row::WorkOrder(_) => {
                self.work_orders.remove(&id);
            }
            Row::SerialNumber(_) => {
                self.serial_numbers.remove(&id);
            }
            Row::Container(_) => {
                self.containers.remove(&id);
            }
        }
    }

    fn set_slot(
        &mut self,
        slot: (&'static str, String),
        owner: Option<Uuid>,
        journal: &mut Vec<Undo>,
    ) {
        let previous = match owner {
            Some(id) => self.unique.insert(slot.clone(), id),
            None => self.unique.remove(&slot),
        };
        journal.push(Undo::Slot { slot, owner: previous });
    }

    fn rollback(&mut self, journal: Vec<Undo>) {
        for undo in journal.into_iter().rev() {
            match undo {
                Undo::Inserted(row) => self.remove(&row),
                Undo::Replaced(row) => self.put(row),
                Undo::Slot { slot, owner: Some(id) } => {
                    self.unique.insert(slot, id);
                }
                Undo::Slot { slot, owner: None } => {
                    self.unique.remove(&slot);
                }
            }
        }
    }

    fn apply(&mut self, change: Change, journal: &mut Vec<Undo>) -> Result<()> {
        let is_insert = change.is_insert();
        let mut row = change.into_row();
        let id = row.id();
        let record_type = row.record_type();
        let existing = self.lookup(&row);

        if is_insert {
            if existing.is_some() {
                return Err(StoreError::UniqueViolation {
                    record_type,
                    field: "id",
                    value: id.to_string(),
                });
            }
            row.set_version(Version::first());
        } else {
            let expected = row.version();
            match &existing {
                Some(stored) if stored.version() == expected => {}
                other => {
                    return Err(StoreError::ConcurrencyConflict {
                        record_type,
                        id,
                        expected,
                        actual: other.as_ref().map(Row::version),
                    });
                }
            }
            row.set_version(expected.next());
        }

        if let Some(old) = &existing {
            for key in unique_keys(old) {
                self.set_slot((key.index, key.value), None, journal);
            }
        }
        for key in unique_keys(&row) {
            let slot = (key.index, key.value);
            if let Some(owner) = self.unique.get(&slot)
                && *owner != id
            {
                return Err(StoreError::UniqueViolation {
                    record_type,
                    field: key.field,
                    value: slot.1,
                });
            }
            self.set_slot(slot, Some(id), journal);
        }

        journal.push(match existing {
            Some(old) => Undo::Replaced(old),
            None => Undo::Inserted(row.clone()),
        });
        self.put(row);
        Ok(())
    }
}

fn sorted_by_serial(mut serials: Vec<SerialNumber>) -> Vec<SerialNumber> {
    serials.sort_by(|a, b| a.serial.cmp(&b.serial));
    serials
}

fn sorted_by_creation(mut containers: Vec<Sscc>) -> Vec<Sscc> {
    containers.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.code.cmp(&b.code))
    });
    containers
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        Ok(self.tables.read().await.customers.get(&id.as_uuid()).cloned())
    }

    async fn get_customer_by_gln(&self, gln: &str) -> Result<Option<Customer>> {
        let tables = self.tables.read().await;
        Ok(tables.customers.values().find(|c| c.gln == gln).cloned())
    }

    async fn list_customers(&self) -> Result<Vec<Customer>> {
        let tables = self.tables.read().await;
        let mut customers: Vec<_> = tables
            .customers
            .values()
            .filter(|c| c.is_active)
            .cloned()
            .collect();
        customers.sort_by(|a, b| a.company_name.cmp(&b.company_name));
        Ok(customers)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id.as_uuid()).cloned())
    }

    async fn get_product_by_gtin(&self, gtin: &str) -> Result<Option<Product>> {
        let tables = self.tables.read().await;
        Ok(tables.products.values().find(|p| p.gtin == gtin).cloned())
    }

    async fn products_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        let mut products: Vec<_> = tables
            .products
            .values()
            .filter(|p| p.is_active && p.customer_id == customer_id)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.product_name.cmp(&b.product_name));
        Ok(products)
    }

    async fn get_work_order(&self, id: WorkOrderId) -> Result<Option<WorkOrder>> {
        Ok(self
            .tables
            .read()
            .await
            .work_orders
            .get(&id.as_uuid())
            .cloned())
    }

    async fn get_work_order_by_number(&self, order_number: &str) -> Result<Option<WorkOrder>> {
        let tables = self.tables.read().await;
        Ok(tables
            .work_orders
            .values()
            .find(|w| w.order_number == order_number)
            .cloned())
    }

    async fn list_work_orders(&self, query: WorkOrderQuery) -> Result<Vec<WorkOrder>> {
        let tables = self.tables.read().await;
        let mut work_orders: Vec<_> = tables
            .work_orders
            .values()
            .filter(|w| query.matches(w))
            .cloned()
            .collect();
        work_orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.order_number.cmp(&b.order_number))
        });
        Ok(work_orders)
    }

    async fn get_serial_number(&self, id: SerialNumberId) -> Result<Option<SerialNumber>> {
        Ok(self
            .tables
            .read()
            .await
            .serial_numbers
            .get(&id.as_uuid())
            .cloned())
    }

    async fn get_serial_numbers(&self, ids: &[SerialNumberId]) -> Result<Vec<SerialNumber>> {
        let tables = self.tables.read().await;
        let unique: HashSet<_> = ids.iter().map(|id| id.as_uuid()).collect();
        Ok(unique
            .iter()
            .filter_map(|id| tables.serial_numbers.get(id).cloned())
            .collect())
    }

    async fn get_serial_by_value(
        &self,
        work_order_id: WorkOrderId,
        serial: &str,
    ) -> Result<Option<SerialNumber>> {
        let tables = self.tables.read().await;
        Ok(tables
            .serial_numbers
            .values()
            .find(|s| s.work_order_id == work_order_id && s.serial == serial)
            .cloned())
    }

    async fn serial_numbers_by_work_order(
        &self,
        work_order_id: WorkOrderId,
    ) -> Result<Vec<SerialNumber>> {
        let tables = self.tables.read().await;
        Ok(sorted_by_serial(
            tables
                .serial_numbers
                .values()
                .filter(|s| s.work_order_id == work_order_id)
                .cloned()
                .collect(),
        ))
    }

    async fn unassigned_serial_numbers(
        &self,
        work_order_id: WorkOrderId,
    ) -> Result<Vec<SerialNumber>> {
        let tables = self.tables.read().await;
        Ok(sorted_by_serial(
            tables
                .serial_numbers
                .values()
                .filter(|s| s.work_order_id == work_order_id && s.container_id.is_none())
                .cloned()
                .collect(),
        ))
    }

    async fn serial_numbers_by_containers(
        &self,
        container_ids: &[SsccId],
    ) -> Result<Vec<SerialNumber>> {
        let tables = self.tables.read().await;
        let wanted: HashSet<_> = container_ids.iter().copied().collect();
        Ok(sorted_by_serial(
            tables
                .serial_numbers
                .values()
                .filter(|s| s.container_id.is_some_and(|c| wanted.contains(&c)))
                .cloned()
                .collect(),
        ))
    }

    async fn count_serial_numbers_by_containers(
        &self,
        container_ids: &[SsccId],
    ) -> Result<HashMap<SsccId, u64>> {
        let tables = self.tables.read().await;
        let wanted: HashSet<_> = container_ids.iter().copied().collect();
        let mut counts = HashMap::new();
        for container_id in tables
            .serial_numbers
            .values()
            .filter_map(|s| s.container_id)
            .filter(|c| wanted.contains(c))
        {
            *counts.entry(container_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn get_container(&self, id: SsccId) -> Result<Option<Sscc>> {
        Ok(self
            .tables
            .read()
            .await
            .containers
            .get(&id.as_uuid())
            .cloned())
    }

    async fn get_containers(&self, ids: &[SsccId]) -> Result<Vec<Sscc>> {
        let tables = self.tables.read().await;
        let unique: HashSet<_> = ids.iter().map(|id| id.as_uuid()).collect();
        Ok(unique
            .iter()
            .filter_map(|id| tables.containers.get(id).cloned())
            .collect())
    }

    async fn get_container_by_code(&self, code: &str) -> Result<Option<Sscc>> {
        let tables = self.tables.read().await;
        Ok(tables.containers.values().find(|c| c.code == code).cloned())
    }

    async fn containers_by_parent(&self, parent_id: SsccId) -> Result<Vec<Sscc>> {
        let tables = self.tables.read().await;
        Ok(sorted_by_creation(
            tables
                .containers
                .values()
                .filter(|c| c.parent_id == Some(parent_id))
                .cloned()
                .collect(),
        ))
    }

    async fn containers_by_work_order(&self, work_order_id: WorkOrderId) -> Result<Vec<Sscc>> {
        let tables = self.tables.read().await;
        Ok(sorted_by_creation(
            tables
                .containers
                .values()
                .filter(|c| c.work_order_id == work_order_id)
                .cloned()
                .collect(),
        ))
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut tables = self.tables.write().await;
        let mut journal = Vec::new();
        for change in changes.into_changes() {
            if let Err(e) = tables.apply(change, &mut journal) {
                tables.rollback(journal);
                return Err(e);
            }
        }
        Ok(())
    }
}
