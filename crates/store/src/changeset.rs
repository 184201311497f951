//! Atomic units of work.
//!
//! Domain services read records, decide, and then describe every write they
//! want as a [`ChangeSet`]. The store applies a change set all-or-nothing.

use common::{Customer, Product, Record, SerialNumber, Sscc, Version, WorkOrder};
use uuid::Uuid;

/// A record carried by a [`Change`].
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Customer(Customer),
    Product(Product),
    WorkOrder(WorkOrder),
    SerialNumber(SerialNumber),
    Container(Sscc),
}

impl Row {
    pub fn record_type(&self) -> &'static str {
        match self {
            Row::Customer(_) => Customer::record_type(),
            Row::Product(_) => Product::record_type(),
            Row::WorkOrder(_) => WorkOrder::record_type(),
            Row::SerialNumber(_) => SerialNumber::record_type(),
            Row::Container(_) => Sscc::record_type(),
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Row::Customer(r) => r.record_id(),
            Row::Product(r) => r.record_id(),
            Row::WorkOrder(r) => r.record_id(),
            Row::SerialNumber(r) => r.record_id(),
            Row::Container(r) => r.record_id(),
        }
    }

    pub fn version(&self) -> Version {
        match self {
            Row::Customer(r) => r.version(),
            Row::Product(r) => r.version(),
            Row::WorkOrder(r) => r.version(),
            Row::SerialNumber(r) => r.version(),
            Row::Container(r) => r.version(),
        }
    }

    pub fn set_version(&mut self, version: Version) {
        match self {
            Row::Customer(r) => r.set_version(version),
            Row::Product(r) => r.set_version(version),
            Row::WorkOrder(r) => r.set_version(version),
            Row::SerialNumber(r) => r.set_version(version),
            Row::Container(r) => r.set_version(version),
        }
    }
}

/// A single write.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Stores a new record at [`Version::first`].
    Insert(Row),

    /// Replaces a record, provided the stored version still equals the
    /// version carried by the row. The stored version becomes `version + 1`.
    ///
    /// An update that carries an unchanged record is a "touch": it only bumps
    /// the version, so any concurrent writer that read the old version fails.
    Update(Row),
}

impl Change {
    pub fn row(&self) -> &Row {
        match self {
            Change::Insert(row) | Change::Update(row) => row,
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Change::Insert(_))
    }

    pub fn into_row(self) -> Row {
        match self {
            Change::Insert(row) | Change::Update(row) => row,
        }
    }
}

/// An ordered list of writes committed as one transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: Change) -> &mut Self {
        self.changes.push(change);
        self
    }

    pub fn insert_customer(&mut self, customer: Customer) -> &mut Self {
        self.push(Change::Insert(Row::Customer(customer)))
    }

    pub fn update_customer(&mut self, customer: Customer) -> &mut Self {
        self.push(Change::Update(Row::Customer(customer)))
    }

    pub fn insert_product(&mut self, product: Product) -> &mut Self {
        self.push(Change::Insert(Row::Product(product)))
    }

    pub fn update_product(&mut self, product: Product) -> &mut Self {
        self.push(Change::Update(Row::Product(product)))
    }

    pub fn insert_work_order(&mut self, work_order: WorkOrder) -> &mut Self {
        self.push(Change::Insert(Row::WorkOrder(work_order)))
    }

    pub fn update_work_order(&mut self, work_order: WorkOrder) -> &mut Self {
        self.push(Change::Update(Row::WorkOrder(work_order)))
    }

    pub fn insert_serial_number(&mut self, serial: SerialNumber) -> &mut Self {
        self.push(Change::Insert(Row::SerialNumber(serial)))
    }

    pub fn insert_serial_numbers(
        &mut self,
        serials: impl IntoIterator<Item = SerialNumber>,
    ) -> &mut Self {
        for serial in serials {
            self.insert_serial_number(serial);
        }
        self
    }

    pub fn update_serial_number(&mut self, serial: SerialNumber) -> &mut Self {
        self.push(Change::Update(Row::SerialNumber(serial)))
    }

    pub fn insert_container(&mut self, container: Sscc) -> &mut Self {
        self.push(Change::Insert(Row::Container(container)))
    }

    pub fn update_container(&mut self, container: Sscc) -> &mut Self {
        self.push(Change::Update(Row::Container(container)))
    }

    /// Bumps a container's version without changing it.
    pub fn touch_container(&mut self, container: &Sscc) -> &mut Self {
        self.update_container(container.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }

    pub fn into_changes(self) -> Vec<Change> {
        self.changes
    }
}
