use chrono::Utc;
use common::{Record, SerialNumber, SerialNumberId, WorkOrderId};
use store::{ChangeSet, Store};

use super::{Mark, allocate, apply_mark};
use crate::retry::with_conflict_retry;
use crate::{Config, DomainError, Result, lookup};

/// Service for allocating serial numbers and recording operator marks.
pub struct SerializationService<S: Store> {
    store: S,
    max_conflict_retries: u32,
}

impl<S: Store> SerializationService<S> {
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

    /// Generates the next `quantity` serial numbers of a work order.
    ///
    /// Serials are numbered contiguously from the work order's watermark,
    /// rendered as 20-character AI(21) values and stored as `Generated`
    /// together with their Data Matrix payload.
    #[tracing::instrument(skip(self))]
    pub async fn generate_serial_numbers(
        &self,
        work_order_id: WorkOrderId,
        quantity: u32,
    ) -> Result<Vec<SerialNumber>> {
        with_conflict_retry("generate_serial_numbers", self.max_conflict_retries, || {
            self.try_generate(work_order_id, quantity)
        })
        .await
    }

    async fn try_generate(
        &self,
        work_order_id: WorkOrderId,
        quantity: u32,
    ) -> Result<Vec<SerialNumber>> {
        let work_order = lookup::active_work_order(&self.store, work_order_id).await?;
        let product = lookup::active_product(&self.store, work_order.product_id).await?;

        let mut updated = work_order.clone();
        let range = allocate(&mut updated, quantity)?;

        let mut serials = Vec::with_capacity(range.len() as usize);
        for sequence in range.iter() {
            let sequence = u64::try_from(sequence).map_err(|_| {
                DomainError::validation_with(
                    format!("Serial sequence {sequence} is negative"),
                    [&work_order.order_number],
                )
            })?;
            let serial = gs1::generate_serial_number(sequence, None)?;
            let data_matrix = gs1::generate_gs1_data_matrix(
                &product.gtin,
                &serial,
                work_order.expiration_date,
                &work_order.batch_number,
            );
            serials.push(SerialNumber::generated(work_order.id, serial, data_matrix));
        }

        let mut changes = ChangeSet::new();
        changes
            .update_work_order(updated.clone())
            .insert_serial_numbers(serials.iter().cloned());
        self.store.commit(changes).await?;

        metrics::counter!("serials_generated_total").increment(range.len());
        tracing::info!(
            order_number = %work_order.order_number,
            first = range.first,
            last = range.last,
            status = %updated.status,
            "serial numbers generated"
        );

        Ok(serials)
    }

    /// Marks a serial number as printed.
    #[tracing::instrument(skip(self))]
    pub async fn mark_printed(&self, id: SerialNumberId) -> Result<SerialNumber> {
        self.mark(id, Mark::Printed).await
    }

    /// Marks a serial number as verified.
    #[tracing::instrument(skip(self))]
    pub async fn mark_verified(&self, id: SerialNumberId) -> Result<SerialNumber> {
        self.mark(id, Mark::Verified).await
    }

    /// Marks a serial number as rejected.
    #[tracing::instrument(skip(self))]
    pub async fn mark_rejected(&self, id: SerialNumberId) -> Result<SerialNumber> {
        self.mark(id, Mark::Rejected).await
    }

    async fn mark(&self, id: SerialNumberId, mark: Mark) -> Result<SerialNumber> {
        with_conflict_retry("mark_serial_number", self.max_conflict_retries, || {
            self.try_mark(id, mark)
        })
        .await
    }

    async fn try_mark(&self, id: SerialNumberId, mark: Mark) -> Result<SerialNumber> {
        let mut serial = lookup::serial_number(&self.store, id).await?;
        apply_mark(&mut serial, mark, Utc::now())?;

        let mut changes = ChangeSet::new();
        changes.update_serial_number(serial.clone());
        self.store.commit(changes).await?;
        serial.set_version(serial.version.next());

        metrics::counter!("serial_status_changes_total", "status" => serial.status.as_str())
            .increment(1);
        tracing::debug!(serial = %serial.serial, status = %serial.status, "serial number marked");

        Ok(serial)
    }

    /// Gets a serial number by id.
    pub async fn get_serial_number(&self, id: SerialNumberId) -> Result<SerialNumber> {
        lookup::serial_number(&self.store, id).await
    }

    /// Finds a serial number by its value within a work order.
    pub async fn find_by_serial(
        &self,
        work_order_id: WorkOrderId,
        serial: &str,
    ) -> Result<SerialNumber> {
        lookup::active_work_order(&self.store, work_order_id).await?;
        self.store
            .get_serial_by_value(work_order_id, serial)
            .await?
            .ok_or_else(|| DomainError::not_found("SerialNumber", serial))
    }

    /// Lists the serial numbers of a work order, ordered by serial.
    pub async fn serial_numbers_by_work_order(
        &self,
        work_order_id: WorkOrderId,
    ) -> Result<Vec<SerialNumber>> {
        lookup::active_work_order(&self.store, work_order_id).await?;
        Ok(self.store.serial_numbers_by_work_order(work_order_id).await?)
    }

    /// Lists the serial numbers of a work order that are not in any box.
    pub async fn unassigned_serial_numbers(
        &self,
        work_order_id: WorkOrderId,
    ) -> Result<Vec<SerialNumber>> {
        lookup::active_work_order(&self.store, work_order_id).await?;
        Ok(self.store.unassigned_serial_numbers(work_order_id).await?)
    }
}
