use std::collections::HashMap;

use async_trait::async_trait;
use common::{
    Customer, CustomerId, Product, ProductId, SerialNumber, SerialNumberId, Sscc, SsccId, Version,
    WorkOrder, WorkOrderId,
};
use sqlx::{PgPool, Postgres, Row as _, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{Change, ChangeSet, Result, Row, SequenceCounter, Store, StoreError, WorkOrderQuery};

const CUSTOMER_COLUMNS: &str = "id, company_name, gln, description, is_active, created_at, version";
const PRODUCT_COLUMNS: &str =
    "id, gtin, product_name, description, customer_id, is_active, created_at, version";
const WORK_ORDER_COLUMNS: &str = "id, order_number, product_id, production_quantity, \
     batch_number, expiration_date, serial_number_start, last_serial_number, items_per_box, \
     boxes_per_pallet, status, is_active, created_at, version";
const SERIAL_COLUMNS: &str = "id, serial, data_matrix, status, printed_at, verified_at, \
     work_order_id, container_id, created_at, version";
const CONTAINER_COLUMNS: &str =
    "id, code, kind, work_order_id, parent_id, data_matrix, created_at, version";

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn to_u32(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

fn row_to_customer(row: PgRow) -> Result<Customer> {
    Ok(Customer {
        id: CustomerId::from_uuid(row.try_get("id")?),
        company_name: row.try_get("company_name")?,
        gln: row.try_get("gln")?,
        description: row.try_get("description")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        version: Version::new(row.try_get("version")?),
    })
}

fn row_to_product(row: PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id")?),
        gtin: row.try_get("gtin")?,
        product_name: row.try_get("product_name")?,
        description: row.try_get("description")?,
        customer_id: CustomerId::from_uuid(row.try_get("customer_id")?),
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        version: Version::new(row.try_get("version")?),
    })
}

fn row_to_work_order(row: PgRow) -> Result<WorkOrder> {
    let status: String = row.try_get("status")?;
    Ok(WorkOrder {
        id: WorkOrderId::from_uuid(row.try_get("id")?),
        order_number: row.try_get("order_number")?,
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        production_quantity: to_u32(row.try_get("production_quantity")?, "production_quantity")?,
        batch_number: row.try_get("batch_number")?,
        expiration_date: row.try_get("expiration_date")?,
        serial_number_start: row.try_get("serial_number_start")?,
        last_serial_number: row.try_get("last_serial_number")?,
        items_per_box: to_u32(row.try_get("items_per_box")?, "items_per_box")?,
        boxes_per_pallet: to_u32(row.try_get("boxes_per_pallet")?, "boxes_per_pallet")?,
        status: status.parse()?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        version: Version::new(row.try_get("version")?),
    })
}

fn row_to_serial(row: PgRow) -> Result<SerialNumber> {
    let status: String = row.try_get("status")?;
    Ok(SerialNumber {
        id: SerialNumberId::from_uuid(row.try_get("id")?),
        serial: row.try_get("serial")?,
        data_matrix: row.try_get("data_matrix")?,
        status: status.parse()?,
        printed_at: row.try_get("printed_at")?,
        verified_at: row.try_get("verified_at")?,
        work_order_id: WorkOrderId::from_uuid(row.try_get("work_order_id")?),
        container_id: row
            .try_get::<Option<Uuid>, _>("container_id")?
            .map(SsccId::from_uuid),
        created_at: row.try_get("created_at")?,
        version: Version::new(row.try_get("version")?),
    })
}

fn row_to_container(row: PgRow) -> Result<Sscc> {
    let kind: String = row.try_get("kind")?;
    Ok(Sscc {
        id: SsccId::from_uuid(row.try_get("id")?),
        code: row.try_get("code")?,
        kind: kind.parse()?,
        work_order_id: WorkOrderId::from_uuid(row.try_get("work_order_id")?),
        parent_id: row
            .try_get::<Option<Uuid>, _>("parent_id")?
            .map(SsccId::from_uuid),
        data_matrix: row.try_get("data_matrix")?,
        created_at: row.try_get("created_at")?,
        version: Version::new(row.try_get("version")?),
    })
}

fn table_name(row: &Row) -> &'static str {
    match row {
        Row::Customer(_) => "customers",
        Row::Product(_) => "products",
        Row::WorkOrder(_) => "work_orders",
        Row::SerialNumber(_) => "serial_numbers",
        Row::Container(_) => "containers",
    }
}

/// Maps a unique-constraint failure to the field and value that collided.
fn unique_violation(row: &Row, constraint: Option<&str>) -> StoreError {
    let record_type = row.record_type();
    let (field, value) = match (constraint, row) {
        (Some("unique_customer_gln"), Row::Customer(c)) => ("gln", c.gln.clone()),
        (Some("unique_product_gtin"), Row::Product(p)) => ("gtin", p.gtin.clone()),
        (Some("unique_work_order_number"), Row::WorkOrder(w)) => {
            ("order_number", w.order_number.clone())
        }
        (Some("unique_work_order_serial"), Row::SerialNumber(s)) => {
            ("serial", format!("{}/{}", s.work_order_id, s.serial))
        }
        (Some("unique_container_code"), Row::Container(c)) => ("code", c.code.clone()),
        _ => ("id", row.id().to_string()),
    };
    StoreError::UniqueViolation {
        record_type,
        field,
        value,
    }
}

fn map_write_error(row: &Row, e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return unique_violation(row, db_err.constraint());
    }
    StoreError::from_database(e)
}

async fn insert_row(tx: &mut Transaction<'_, Postgres>, row: &Row) -> Result<()> {
    let version = Version::first().as_i64();
    let query = match row {
        Row::Customer(c) => sqlx::query(
            "INSERT INTO customers (id, company_name, gln, description, is_active, created_at, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(c.id.as_uuid())
        .bind(&c.company_name)
        .bind(&c.gln)
        .bind(&c.description)
        .bind(c.is_active)
        .bind(c.created_at)
        .bind(version),
        Row::Product(p) => sqlx::query(
            "INSERT INTO products (id, gtin, product_name, description, customer_id, is_active, created_at, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(p.id.as_uuid())
        .bind(&p.gtin)
        .bind(&p.product_name)
        .bind(&p.description)
        .bind(p.customer_id.as_uuid())
        .bind(p.is_active)
        .bind(p.created_at)
        .bind(version),
        Row::WorkOrder(w) => sqlx::query(
            "INSERT INTO work_orders (id, order_number, product_id, production_quantity, batch_number, \
             expiration_date, serial_number_start, last_serial_number, items_per_box, boxes_per_pallet, \
             status, is_active, created_at, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(w.id.as_uuid())
        .bind(&w.order_number)
        .bind(w.product_id.as_uuid())
        .bind(i64::from(w.production_quantity))
        .bind(&w.batch_number)
        .bind(w.expiration_date)
        .bind(w.serial_number_start)
        .bind(w.last_serial_number)
        .bind(i64::from(w.items_per_box))
        .bind(i64::from(w.boxes_per_pallet))
        .bind(w.status.as_str())
        .bind(w.is_active)
        .bind(w.created_at)
        .bind(version),
        Row::SerialNumber(s) => sqlx::query(
            "INSERT INTO serial_numbers (id, serial, data_matrix, status, printed_at, verified_at, \
             work_order_id, container_id, created_at, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(s.id.as_uuid())
        .bind(&s.serial)
        .bind(&s.data_matrix)
        .bind(s.status.as_str())
        .bind(s.printed_at)
        .bind(s.verified_at)
        .bind(s.work_order_id.as_uuid())
        .bind(s.container_id.map(|c| c.as_uuid()))
        .bind(s.created_at)
        .bind(version),
        Row::Container(c) => sqlx::query(
            "INSERT INTO containers (id, code, kind, work_order_id, parent_id, data_matrix, created_at, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(c.id.as_uuid())
        .bind(&c.code)
        .bind(c.kind.as_str())
        .bind(c.work_order_id.as_uuid())
        .bind(c.parent_id.map(|p| p.as_uuid()))
        .bind(&c.data_matrix)
        .bind(c.created_at)
        .bind(version),
    };

    query
        .execute(&mut **tx)
        .await
        .map_err(|e| map_write_error(row, e))?;
    Ok(())
}

/// Applies a versioned update. Returns the number of rows matched.
async fn update_row(tx: &mut Transaction<'_, Postgres>, row: &Row) -> Result<u64> {
    let expected = row.version().as_i64();
    let next = row.version().next().as_i64();
    let query = match row {
        Row::Customer(c) => sqlx::query(
            "UPDATE customers SET company_name = $3, gln = $4, description = $5, is_active = $6, \
             version = $7 WHERE id = $1 AND version = $2",
        )
        .bind(c.id.as_uuid())
        .bind(expected)
        .bind(&c.company_name)
        .bind(&c.gln)
        .bind(&c.description)
        .bind(c.is_active)
        .bind(next),
        Row::Product(p) => sqlx::query(
            "UPDATE products SET gtin = $3, product_name = $4, description = $5, customer_id = $6, \
             is_active = $7, version = $8 WHERE id = $1 AND version = $2",
        )
        .bind(p.id.as_uuid())
        .bind(expected)
        .bind(&p.gtin)
        .bind(&p.product_name)
        .bind(&p.description)
        .bind(p.customer_id.as_uuid())
        .bind(p.is_active)
        .bind(next),
        Row::WorkOrder(w) => sqlx::query(
            "UPDATE work_orders SET order_number = $3, production_quantity = $4, batch_number = $5, \
             expiration_date = $6, last_serial_number = $7, items_per_box = $8, \
             boxes_per_pallet = $9, status = $10, is_active = $11, version = $12 \
             WHERE id = $1 AND version = $2",
        )
        .bind(w.id.as_uuid())
        .bind(expected)
        .bind(&w.order_number)
        .bind(i64::from(w.production_quantity))
        .bind(&w.batch_number)
        .bind(w.expiration_date)
        .bind(w.last_serial_number)
        .bind(i64::from(w.items_per_box))
        .bind(i64::from(w.boxes_per_pallet))
        .bind(w.status.as_str())
        .bind(w.is_active)
        .bind(next),
        Row::SerialNumber(s) => sqlx::query(
            "UPDATE serial_numbers SET status = $3, printed_at = $4, verified_at = $5, \
             container_id = $6, version = $7 WHERE id = $1 AND version = $2",
        )
        .bind(s.id.as_uuid())
        .bind(expected)
        .bind(s.status.as_str())
        .bind(s.printed_at)
        .bind(s.verified_at)
        .bind(s.container_id.map(|c| c.as_uuid()))
        .bind(next),
        Row::Container(c) => sqlx::query(
            "UPDATE containers SET parent_id = $3, data_matrix = $4, version = $5 \
             WHERE id = $1 AND version = $2",
        )
        .bind(c.id.as_uuid())
        .bind(expected)
        .bind(c.parent_id.map(|p| p.as_uuid()))
        .bind(&c.data_matrix)
        .bind(next),
    };

    let result = query
        .execute(&mut **tx)
        .await
        .map_err(|e| map_write_error(row, e))?;
    Ok(result.rows_affected())
}

async fn stored_version(tx: &mut Transaction<'_, Postgres>, row: &Row) -> Result<Option<Version>> {
    let sql = format!("SELECT version FROM {} WHERE id = $1", table_name(row));
    let version: Option<i64> = sqlx::query_scalar(&sql)
        .bind(row.id())
        .fetch_optional(&mut **tx)
        .await?;
    Ok(version.map(Version::new))
}

#[async_trait]
impl Store for PostgresStore {
    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_customer)
            .transpose()
    }

    async fn get_customer_by_gln(&self, gln: &str) -> Result<Option<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE gln = $1");
        sqlx::query(&sql)
            .bind(gln)
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_customer)
            .transpose()
    }

    async fn list_customers(&self) -> Result<Vec<Customer>> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE is_active ORDER BY company_name"
        );
        sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(row_to_customer)
            .collect()
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_product)
            .transpose()
    }

    async fn get_product_by_gtin(&self, gtin: &str) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE gtin = $1");
        sqlx::query(&sql)
            .bind(gtin)
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_product)
            .transpose()
    }

    async fn products_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE customer_id = $1 AND is_active ORDER BY product_name"
        );
        sqlx::query(&sql)
            .bind(customer_id.as_uuid())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(row_to_product)
            .collect()
    }

    async fn get_work_order(&self, id: WorkOrderId) -> Result<Option<WorkOrder>> {
        let sql = format!("SELECT {WORK_ORDER_COLUMNS} FROM work_orders WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_work_order)
            .transpose()
    }

    async fn get_work_order_by_number(&self, order_number: &str) -> Result<Option<WorkOrder>> {
        let sql = format!("SELECT {WORK_ORDER_COLUMNS} FROM work_orders WHERE order_number = $1");
        sqlx::query(&sql)
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_work_order)
            .transpose()
    }

    async fn list_work_orders(&self, query: WorkOrderQuery) -> Result<Vec<WorkOrder>> {
        let sql = format!(
            "SELECT {WORK_ORDER_COLUMNS} FROM work_orders \
             WHERE is_active \
             AND ($1::VARCHAR IS NULL OR status = $1) \
             AND ($2::UUID IS NULL OR product_id = $2) \
             ORDER BY created_at DESC, order_number"
        );
        let status = query.status.map(|s| s.as_str());
        let product_id = query.product_id.map(|p| p.as_uuid());
        sqlx::query(&sql)
            .bind(status)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(row_to_work_order)
            .collect()
    }

    async fn get_serial_number(&self, id: SerialNumberId) -> Result<Option<SerialNumber>> {
        let sql = format!("SELECT {SERIAL_COLUMNS} FROM serial_numbers WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_serial)
            .transpose()
    }

    async fn get_serial_numbers(&self, ids: &[SerialNumberId]) -> Result<Vec<SerialNumber>> {
        let ids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let sql = format!("SELECT {SERIAL_COLUMNS} FROM serial_numbers WHERE id = ANY($1)");
        sqlx::query(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(row_to_serial)
            .collect()
    }

    async fn get_serial_by_value(
        &self,
        work_order_id: WorkOrderId,
        serial: &str,
    ) -> Result<Option<SerialNumber>> {
        let sql = format!(
            "SELECT {SERIAL_COLUMNS} FROM serial_numbers WHERE work_order_id = $1 AND serial = $2"
        );
        sqlx::query(&sql)
            .bind(work_order_id.as_uuid())
            .bind(serial)
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_serial)
            .transpose()
    }

    async fn serial_numbers_by_work_order(
        &self,
        work_order_id: WorkOrderId,
    ) -> Result<Vec<SerialNumber>> {
        let sql = format!(
            "SELECT {SERIAL_COLUMNS} FROM serial_numbers WHERE work_order_id = $1 ORDER BY serial"
        );
        sqlx::query(&sql)
            .bind(work_order_id.as_uuid())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(row_to_serial)
            .collect()
    }

    async fn unassigned_serial_numbers(
        &self,
        work_order_id: WorkOrderId,
    ) -> Result<Vec<SerialNumber>> {
        let sql = format!(
            "SELECT {SERIAL_COLUMNS} FROM serial_numbers \
             WHERE work_order_id = $1 AND container_id IS NULL ORDER BY serial"
        );
        sqlx::query(&sql)
            .bind(work_order_id.as_uuid())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(row_to_serial)
            .collect()
    }

    async fn serial_numbers_by_containers(
        &self,
        container_ids: &[SsccId],
    ) -> Result<Vec<SerialNumber>> {
        let ids: Vec<Uuid> = container_ids.iter().map(|id| id.as_uuid()).collect();
        let sql = format!(
            "SELECT {SERIAL_COLUMNS} FROM serial_numbers \
             WHERE container_id = ANY($1) ORDER BY serial"
        );
        sqlx::query(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(row_to_serial)
            .collect()
    }

    async fn count_serial_numbers_by_containers(
        &self,
        container_ids: &[SsccId],
    ) -> Result<HashMap<SsccId, u64>> {
        let ids: Vec<Uuid> = container_ids.iter().map(|id| id.as_uuid()).collect();
        let rows = sqlx::query(
            "SELECT container_id, COUNT(*) AS item_count FROM serial_numbers \
             WHERE container_id = ANY($1) GROUP BY container_id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = HashMap::with_capacity(rows.len());
        for row in rows {
            let id: Uuid = row.try_get("container_id")?;
            let count: i64 = row.try_get("item_count")?;
            counts.insert(SsccId::from_uuid(id), count.unsigned_abs());
        }
        Ok(counts)
    }

    async fn get_container(&self, id: SsccId) -> Result<Option<Sscc>> {
        let sql = format!("SELECT {CONTAINER_COLUMNS} FROM containers WHERE id = $1");
        sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_container)
            .transpose()
    }

    async fn get_containers(&self, ids: &[SsccId]) -> Result<Vec<Sscc>> {
        let ids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let sql = format!("SELECT {CONTAINER_COLUMNS} FROM containers WHERE id = ANY($1)");
        sqlx::query(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(row_to_container)
            .collect()
    }

    async fn get_container_by_code(&self, code: &str) -> Result<Option<Sscc>> {
        let sql = format!("SELECT {CONTAINER_COLUMNS} FROM containers WHERE code = $1");
        sqlx::query(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .map(row_to_container)
            .transpose()
    }

    async fn containers_by_parent(&self, parent_id: SsccId) -> Result<Vec<Sscc>> {
        let sql = format!(
            "SELECT {CONTAINER_COLUMNS} FROM containers \
             WHERE parent_id = $1 ORDER BY created_at, code"
        );
        sqlx::query(&sql)
            .bind(parent_id.as_uuid())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(row_to_container)
            .collect()
    }

    async fn containers_by_work_order(&self, work_order_id: WorkOrderId) -> Result<Vec<Sscc>> {
        let sql = format!(
            "SELECT {CONTAINER_COLUMNS} FROM containers \
             WHERE work_order_id = $1 ORDER BY created_at, code"
        );
        sqlx::query(&sql)
            .bind(work_order_id.as_uuid())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(row_to_container)
            .collect()
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        apply_changes(&mut tx, lock_ordered(changes))
            .await
            .map_err(StoreError::reclassify)?;
        tx.commit().await.map_err(StoreError::from_database)?;
        Ok(())
    }
}

async fn apply_changes(tx: &mut Transaction<'_, Postgres>, changes: Vec<Change>) -> Result<()> {
    for change in &changes {
        match change {
            Change::Insert(row) => insert_row(tx, row).await?,
            Change::Update(row) => {
                if update_row(tx, row).await? == 0 {
                    let actual = stored_version(tx, row).await?;
                    return Err(StoreError::ConcurrencyConflict {
                        record_type: row.record_type(),
                        id: row.id(),
                        expected: row.version(),
                        actual,
                    });
                }
            }
        }
    }
    Ok(())
}

/// Position of a table in the row-lock order.
fn lock_rank(row: &Row) -> u8 {
    match row {
        Row::Customer(_) => 0,
        Row::Product(_) => 1,
        Row::WorkOrder(_) => 2,
        Row::Container(_) => 3,
        Row::SerialNumber(_) => 4,
    }
}

/// Inserts first, in the order given (foreign keys), then updates sorted by
/// table and id so concurrent transactions lock shared rows in one order.
fn lock_ordered(changes: ChangeSet) -> Vec<Change> {
    let (mut ordered, mut updates): (Vec<Change>, Vec<Change>) =
        changes.into_changes().into_iter().partition(Change::is_insert);
    updates.sort_by_key(|change| (lock_rank(change.row()), change.row().id()));
    ordered.append(&mut updates);
    ordered
}

/// Counter backed by the `sequences` table.
///
/// The first call for a name stores and returns `seed`. Later calls return
/// the stored value plus one, or `seed` if that is larger, so raising the
/// configured seed skips ahead and lowering it has no effect.
#[derive(Clone)]
pub struct PostgresSequenceCounter {
    pool: PgPool,
    seed: i64,
}

impl PostgresSequenceCounter {
    pub fn new(pool: PgPool, seed: i64) -> Self {
        Self { pool, seed }
    }
}

#[async_trait]
impl SequenceCounter for PostgresSequenceCounter {
    async fn next_value(&self, name: &str) -> Result<i64> {
        let value: i64 = sqlx::query_scalar(
            "INSERT INTO sequences (name, value) VALUES ($1, $2) \
             ON CONFLICT (name) DO UPDATE SET value = GREATEST(sequences.value + 1, EXCLUDED.value) \
             RETURNING value",
        )
        .bind(name)
        .bind(self.seed)
        .fetch_one(&self.pool)
        .await?;
        Ok(value)
    }
}
