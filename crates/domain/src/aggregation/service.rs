use std::collections::HashMap;

use common::{ContainerKind, Record, SerialNumber, SerialNumberId, Sscc, SsccId, WorkOrderId};
use store::{ChangeSet, SSCC_SERIAL_REFERENCE, SequenceCounter, Store, StoreExt};
use tracing::{debug, info};

use super::rules::{check_boxes_for_pallet, check_items_for_box};
use super::{AggregationHierarchy, BoxContents, HierarchyContents};
use crate::retry::with_conflict_retry;
use crate::serialization::{aggregate, release};
use crate::{Config, DomainError, Result, lookup};

/// Service that mints SSCCs and maintains the packaging tree.
///
/// `counter` hands out SSCC serial references. It must be shared by every
/// service instance that mints codes for the same company prefix.
pub struct AggregationService<S: Store, C: SequenceCounter> {
    store: S,
    counter: C,
    config: Config,
}

impl<S: Store, C: SequenceCounter> AggregationService<S, C> {
    /// Creates a new service with default settings.
    pub fn new(store: S, counter: C) -> Self {
        Self::with_config(store, counter, &Config::default())
    }

    /// Creates a new service using the SSCC and retry settings from `config`.
    pub fn with_config(store: S, counter: C, config: &Config) -> Self {
        Self {
            store,
            counter,
            config: config.clone(),
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates an empty box for a work order.
    #[tracing::instrument(skip(self))]
    pub async fn create_box(&self, work_order_id: WorkOrderId) -> Result<Sscc> {
        self.create_container(work_order_id, ContainerKind::Box).await
    }

    /// Creates an empty pallet for a work order.
    #[tracing::instrument(skip(self))]
    pub async fn create_pallet(&self, work_order_id: WorkOrderId) -> Result<Sscc> {
        self.create_container(work_order_id, ContainerKind::Pallet).await
    }

    async fn create_container(
        &self,
        work_order_id: WorkOrderId,
        kind: ContainerKind,
    ) -> Result<Sscc> {
        let work_order = lookup::active_work_order(&self.store, work_order_id).await?;
        let product = lookup::active_product(&self.store, work_order.product_id).await?;
        let customer = lookup::active_customer(&self.store, product.customer_id).await?;

        let company_prefix = self.config.company_prefix(&customer.gln);
        let reference = self.counter.next_value(SSCC_SERIAL_REFERENCE).await?;
        let reference = u64::try_from(reference).map_err(|_| {
            DomainError::validation(format!("SSCC serial reference {reference} is negative"))
        })?;

        let code = gs1::generate_sscc(company_prefix, self.config.sscc_extension_digit, reference)?;
        let data_matrix = gs1::generate_sscc_data_matrix(&code);
        let container = Sscc::new(kind, work_order.id, code, data_matrix);

        let mut changes = ChangeSet::new();
        changes.insert_container(container.clone());
        self.store.commit(changes).await?;

        metrics::counter!("containers_created_total", "kind" => kind.as_str()).increment(1);
        info!(
            sscc = %container.code,
            %kind,
            order_number = %work_order.order_number,
            "container created"
        );

        Ok(container)
    }

    /// Puts serial numbers into a box.
    ///
    /// Either every serial is assigned and marked `Aggregated` or nothing
    /// changes. Returns the serials that moved into the box.
    #[tracing::instrument(skip(self, serial_ids), fields(count = serial_ids.len()))]
    pub async fn add_items_to_box(
        &self,
        box_id: SsccId,
        serial_ids: &[SerialNumberId],
    ) -> Result<Vec<SerialNumber>> {
        with_conflict_retry("add_items_to_box", self.config.max_conflict_retries, || {
            self.try_add_items(box_id, serial_ids)
        })
        .await
    }

    async fn try_add_items(
        &self,
        box_id: SsccId,
        serial_ids: &[SerialNumberId],
    ) -> Result<Vec<SerialNumber>> {
        let target = lookup::container(&self.store, box_id).await?;
        let work_order = lookup::active_work_order(&self.store, target.work_order_id).await?;
        let found = self.store.get_serial_numbers(serial_ids).await?;
        let current = self.store.count_serial_numbers_by_container(target.id).await?;

        let mut incoming = check_items_for_box(&target, &work_order, serial_ids, &found, current)?;
        for serial in &mut incoming {
            aggregate(serial, target.id);
        }

        let mut changes = ChangeSet::new();
        changes.touch_container(&target);
        for serial in &incoming {
            changes.update_serial_number(serial.clone());
        }
        self.store.commit(changes).await?;

        for serial in &mut incoming {
            serial.set_version(serial.version.next());
        }

        metrics::counter!("aggregation_changes_total", "operation" => "add_items")
            .increment(incoming.len() as u64);
        info!(
            sscc = %target.code,
            added = incoming.len(),
            total = current + incoming.len() as u64,
            "items added to box"
        );

        Ok(incoming)
    }

    /// Puts boxes onto a pallet.
    ///
    /// Either every box is parented to the pallet or nothing changes. Returns
    /// the boxes that moved onto the pallet.
    #[tracing::instrument(skip(self, box_ids), fields(count = box_ids.len()))]
    pub async fn add_boxes_to_pallet(
        &self,
        pallet_id: SsccId,
        box_ids: &[SsccId],
    ) -> Result<Vec<Sscc>> {
        with_conflict_retry("add_boxes_to_pallet", self.config.max_conflict_retries, || {
            self.try_add_boxes(pallet_id, box_ids)
        })
        .await
    }

    async fn try_add_boxes(&self, pallet_id: SsccId, box_ids: &[SsccId]) -> Result<Vec<Sscc>> {
        let target = lookup::container(&self.store, pallet_id).await?;
        let work_order = lookup::active_work_order(&self.store, target.work_order_id).await?;
        let found = self.store.get_containers(box_ids).await?;
        let found_ids: Vec<SsccId> = found.iter().map(|c| c.id).collect();
        let item_counts = self
            .store
            .count_serial_numbers_by_containers(&found_ids)
            .await?;
        let current = self.store.containers_by_parent(target.id).await?.len() as u64;

        let mut incoming = check_boxes_for_pallet(
            &target,
            &work_order,
            box_ids,
            &found,
            &item_counts,
            current,
        )?;
        for container in &mut incoming {
            container.parent_id = Some(target.id);
        }

        let mut changes = ChangeSet::new();
        changes.touch_container(&target);
        for container in &incoming {
            changes.update_container(container.clone());
        }
        self.store.commit(changes).await?;

        for container in &mut incoming {
            container.set_version(container.version.next());
        }

        metrics::counter!("aggregation_changes_total", "operation" => "add_boxes")
            .increment(incoming.len() as u64);
        info!(
            sscc = %target.code,
            added = incoming.len(),
            total = current + incoming.len() as u64,
            "boxes added to pallet"
        );

        Ok(incoming)
    }

    /// Takes a serial number out of its box. The serial returns to `Verified`.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item_from_box(&self, serial_id: SerialNumberId) -> Result<SerialNumber> {
        with_conflict_retry("remove_item_from_box", self.config.max_conflict_retries, || {
            self.try_remove_item(serial_id)
        })
        .await
    }

    async fn try_remove_item(&self, serial_id: SerialNumberId) -> Result<SerialNumber> {
        let mut serial = lookup::serial_number(&self.store, serial_id).await?;
        let Some(box_id) = serial.container_id else {
            return Err(DomainError::validation_with(
                format!("Serial number {} is not in a box", serial.serial),
                [&serial.serial],
            ));
        };
        let container = lookup::container(&self.store, box_id).await?;

        release(&mut serial);

        let mut changes = ChangeSet::new();
        changes
            .touch_container(&container)
            .update_serial_number(serial.clone());
        self.store.commit(changes).await?;
        serial.set_version(serial.version.next());

        metrics::counter!("aggregation_changes_total", "operation" => "remove_item").increment(1);
        info!(serial = %serial.serial, sscc = %container.code, "item removed from box");

        Ok(serial)
    }

    /// Takes a box off its pallet. The box keeps its items.
    ///
    /// A box that is not on a pallet is returned unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn remove_box_from_pallet(&self, box_id: SsccId) -> Result<Sscc> {
        with_conflict_retry("remove_box_from_pallet", self.config.max_conflict_retries, || {
            self.try_remove_box(box_id)
        })
        .await
    }

    async fn try_remove_box(&self, box_id: SsccId) -> Result<Sscc> {
        let mut container = lookup::container(&self.store, box_id).await?;
        if !container.is_box() {
            return Err(DomainError::validation_with(
                format!(
                    "SSCC {} is a {}, only boxes can be removed from a pallet",
                    container.code, container.kind
                ),
                [&container.code],
            ));
        }

        let Some(pallet_id) = container.parent_id.take() else {
            debug!(sscc = %container.code, "box is not on a pallet");
            return Ok(container);
        };
        let pallet = lookup::container(&self.store, pallet_id).await?;

        let mut changes = ChangeSet::new();
        changes
            .touch_container(&pallet)
            .update_container(container.clone());
        self.store.commit(changes).await?;
        container.set_version(container.version.next());

        metrics::counter!("aggregation_changes_total", "operation" => "remove_box").increment(1);
        info!(sscc = %container.code, pallet = %pallet.code, "box removed from pallet");

        Ok(container)
    }

    /// Loads a container with its full subtree.
    pub async fn get_aggregation_hierarchy(&self, id: SsccId) -> Result<AggregationHierarchy> {
        let container = lookup::container(&self.store, id).await?;

        let contents = match container.kind {
            ContainerKind::Box => {
                HierarchyContents::Items(self.store.serial_numbers_by_container(id).await?)
            }
            ContainerKind::Pallet => {
                let boxes = self.store.containers_by_parent(id).await?;
                let box_ids: Vec<SsccId> = boxes.iter().map(|b| b.id).collect();
                let mut items: HashMap<SsccId, Vec<SerialNumber>> = HashMap::new();
                for serial in self.store.serial_numbers_by_containers(&box_ids).await? {
                    if let Some(box_id) = serial.container_id {
                        items.entry(box_id).or_default().push(serial);
                    }
                }
                HierarchyContents::Boxes(
                    boxes
                        .into_iter()
                        .map(|b| BoxContents {
                            items: items.remove(&b.id).unwrap_or_default(),
                            container: b,
                        })
                        .collect(),
                )
            }
        };

        Ok(AggregationHierarchy {
            container,
            contents,
        })
    }

    /// Gets a container by id.
    pub async fn get_container(&self, id: SsccId) -> Result<Sscc> {
        lookup::container(&self.store, id).await
    }

    /// Finds a container by its 18-digit SSCC.
    pub async fn find_by_code(&self, code: &str) -> Result<Sscc> {
        self.store
            .get_container_by_code(code)
            .await?
            .ok_or_else(|| DomainError::not_found("Sscc", code))
    }

    /// Lists the containers of a work order in creation order.
    pub async fn containers_by_work_order(&self, work_order_id: WorkOrderId) -> Result<Vec<Sscc>> {
        lookup::active_work_order(&self.store, work_order_id).await?;
        Ok(self.store.containers_by_work_order(work_order_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use common::{Customer, Product, SerialStatus, WorkOrder};
    use store::{InMemorySequenceCounter, InMemoryStore};

    use crate::serialization::SerializationService;

    struct Fixture {
        store: InMemoryStore,
        aggregation: AggregationService<InMemoryStore, InMemorySequenceCounter>,
        serialization: SerializationService<InMemoryStore>,
        work_order: WorkOrder,
    }

    async fn fixture(items_per_box: u32, boxes_per_pallet: u32) -> Fixture {
        let store = InMemoryStore::new();
        let customer = Customer::new("Acme", "5901234123457");
        let product = Product::new(customer.id, "05901234123457", "Widget");
        let work_order = WorkOrder::new(
            "WO-1",
            product.id,
            100,
            "LOT1",
            NaiveDate::from_ymd_opt(2027, 6, 30).unwrap(),
        )
        .with_capacities(items_per_box, boxes_per_pallet);

        let mut changes = ChangeSet::new();
        changes
            .insert_customer(customer)
            .insert_product(product)
            .insert_work_order(work_order.clone());
        store.commit(changes).await.unwrap();

        Fixture {
            aggregation: AggregationService::new(store.clone(), InMemorySequenceCounter::new(42)),
            serialization: SerializationService::new(store.clone()),
            store,
            work_order,
        }
    }

    impl Fixture {
        async fn verified(&self, n: u32) -> Vec<SerialNumberId> {
            let serials = self
                .serialization
                .generate_serial_numbers(self.work_order.id, n)
                .await
                .unwrap();
            let mut ids = Vec::new();
            for serial in serials {
                self.serialization.mark_verified(serial.id).await.unwrap();
                ids.push(serial.id);
            }
            ids
        }
    }

    #[tokio::test]
    async fn create_box_mints_a_valid_sscc() {
        let f = fixture(10, 10).await;
        let container = f.aggregation.create_box(f.work_order.id).await.unwrap();

        assert_eq!(container.kind, ContainerKind::Box);
        assert_eq!(container.code.len(), 18);
        assert!(container.code.starts_with("0590123412"));
        assert!(gs1::validate_sscc(&container.code));
        assert_eq!(container.data_matrix, format!("00{}", container.code));
        assert_eq!(&container.code[10..17], "0000042");
    }

    #[tokio::test]
    async fn successive_containers_get_distinct_codes() {
        let f = fixture(10, 10).await;
        let a = f.aggregation.create_box(f.work_order.id).await.unwrap();
        let b = f.aggregation.create_pallet(f.work_order.id).await.unwrap();
        assert_ne!(a.code, b.code);
        assert_eq!(b.kind, ContainerKind::Pallet);
    }

    #[tokio::test]
    async fn create_box_for_unknown_work_order_is_not_found() {
        let f = fixture(10, 10).await;
        let err = f.aggregation.create_box(WorkOrderId::new()).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn add_items_aggregates_serials() {
        let f = fixture(3, 10).await;
        let ids = f.verified(3).await;
        let container = f.aggregation.create_box(f.work_order.id).await.unwrap();

        let added = f.aggregation.add_items_to_box(container.id, &ids).await.unwrap();
        assert_eq!(added.len(), 3);

        let stored = f.store.serial_numbers_by_container(container.id).await.unwrap();
        assert_eq!(stored.len(), 3);
        assert!(stored.iter().all(|s| s.status == SerialStatus::Aggregated));
        assert_eq!(stored[0].version, added[0].version);
    }

    #[tokio::test]
    async fn remove_item_returns_serial_to_verified() {
        let f = fixture(3, 10).await;
        let ids = f.verified(1).await;
        let container = f.aggregation.create_box(f.work_order.id).await.unwrap();
        f.aggregation.add_items_to_box(container.id, &ids).await.unwrap();

        let released = f.aggregation.remove_item_from_box(ids[0]).await.unwrap();
        assert_eq!(released.status, SerialStatus::Verified);
        assert_eq!(released.container_id, None);

        let err = f.aggregation.remove_item_from_box(ids[0]).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }

    #[tokio::test]
    async fn pallet_hierarchy_lists_boxes_with_items() {
        let f = fixture(2, 10).await;
        let ids = f.verified(3).await;
        let first = f.aggregation.create_box(f.work_order.id).await.unwrap();
        let second = f.aggregation.create_box(f.work_order.id).await.unwrap();
        let pallet = f.aggregation.create_pallet(f.work_order.id).await.unwrap();
        f.aggregation.add_items_to_box(first.id, &ids[..2]).await.unwrap();
        f.aggregation.add_items_to_box(second.id, &ids[2..]).await.unwrap();
        f.aggregation
            .add_boxes_to_pallet(pallet.id, &[first.id, second.id])
            .await
            .unwrap();

        let tree = f.aggregation.get_aggregation_hierarchy(pallet.id).await.unwrap();
        assert_eq!(tree.box_count(), 2);
        assert_eq!(tree.item_count(), 3);
        let HierarchyContents::Boxes(boxes) = &tree.contents else {
            panic!("pallet should hold boxes");
        };
        assert_eq!(boxes[0].container.id, first.id);
        assert_eq!(boxes[0].items.len(), 2);
        assert_eq!(boxes[1].items.len(), 1);
    }

    #[tokio::test]
    async fn remove_box_keeps_its_items() {
        let f = fixture(2, 10).await;
        let ids = f.verified(1).await;
        let container = f.aggregation.create_box(f.work_order.id).await.unwrap();
        let pallet = f.aggregation.create_pallet(f.work_order.id).await.unwrap();
        f.aggregation.add_items_to_box(container.id, &ids).await.unwrap();
        f.aggregation
            .add_boxes_to_pallet(pallet.id, &[container.id])
            .await
            .unwrap();

        let removed = f.aggregation.remove_box_from_pallet(container.id).await.unwrap();
        assert_eq!(removed.parent_id, None);
        assert_eq!(
            f.store.count_serial_numbers_by_container(container.id).await.unwrap(),
            1
        );
        assert!(f.store.containers_by_parent(pallet.id).await.unwrap().is_empty());

        let again = f.aggregation.remove_box_from_pallet(container.id).await.unwrap();
        assert_eq!(again.version, removed.version);
    }

    #[tokio::test]
    async fn removing_a_pallet_from_a_pallet_is_invalid() {
        let f = fixture(2, 10).await;
        let pallet = f.aggregation.create_pallet(f.work_order.id).await.unwrap();
        let err = f.aggregation.remove_box_from_pallet(pallet.id).await.unwrap_err();
        assert_eq!(err.offending(), [pallet.code.clone()]);
    }

    #[tokio::test]
    async fn find_by_code_resolves_minted_sscc() {
        let f = fixture(2, 10).await;
        let container = f.aggregation.create_box(f.work_order.id).await.unwrap();
        let found = f.aggregation.find_by_code(&container.code).await.unwrap();
        assert_eq!(found.id, container.id);

        let listed = f.aggregation.containers_by_work_order(f.work_order.id).await.unwrap();
        assert_eq!(listed.len(), 1);
    }
}
