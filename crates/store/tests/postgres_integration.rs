//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container started through testcontainers,
//! so Docker must be available.
//!
//! Every test creates its own customer, product and work order, so tests can
//! run in parallel against the same database.

use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::PgPool;
use store::{
    ChangeSet, ContainerKind, Customer, PostgresSequenceCounter, PostgresStore, Product,
    SSCC_SERIAL_REFERENCE, SequenceCounter, SerialNumber, SerialStatus, Sscc, Store, StoreError,
    StoreExt, Version, WorkOrder, WorkOrderQuery, WorkOrderStatus,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresStore::new(pool.clone())
                .run_migrations()
                .await
                .unwrap();
            pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_test_pool() -> PgPool {
    let info = get_container_info().await;
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap()
}

async fn get_test_store() -> PostgresStore {
    PostgresStore::new(get_test_pool().await)
}

/// A digit string of `width` characters unique to this test run.
fn unique_digits(width: u32) -> String {
    let n = Uuid::new_v4().as_u128() % 10u128.pow(width);
    format!("{n:0width$}", width = width as usize)
}

/// Inserts a customer, a product and a work order owned by them.
async fn seed_work_order(store: &PostgresStore) -> WorkOrder {
    let customer = Customer::new("Acme Pharma", unique_digits(13));
    let product = Product::new(customer.id, unique_digits(14), "Aspirin 500mg");
    let work_order = WorkOrder::new(
        format!("WO-{}", Uuid::new_v4()),
        product.id,
        50,
        "LOT42",
        NaiveDate::from_ymd_opt(2027, 3, 31).unwrap(),
    )
    .with_capacities(2, 2);

    let mut changes = ChangeSet::new();
    changes
        .insert_customer(customer)
        .insert_product(product)
        .insert_work_order(work_order.clone());
    store.commit(changes).await.unwrap();
    work_order
}

#[tokio::test]
async fn insert_and_load_work_order() {
    let store = get_test_store().await;
    let work_order = seed_work_order(&store).await;

    let loaded = store.get_work_order(work_order.id).await.unwrap().unwrap();
    assert_eq!(loaded.order_number, work_order.order_number);
    assert_eq!(loaded.status, WorkOrderStatus::Created);
    assert_eq!(loaded.production_quantity, 50);
    assert_eq!(loaded.items_per_box, 2);
    assert_eq!(loaded.version, Version::first());

    let by_number = store
        .get_work_order_by_number(&work_order.order_number)
        .await
        .unwrap();
    assert_eq!(by_number.map(|w| w.id), Some(work_order.id));
}

#[tokio::test]
async fn versioned_update_and_conflict() {
    let store = get_test_store().await;
    let work_order = seed_work_order(&store).await;

    let mut updated = work_order.clone();
    updated.status = WorkOrderStatus::InProgress;
    updated.last_serial_number = 10;
    let mut changes = ChangeSet::new();
    changes.update_work_order(updated);
    store.commit(changes).await.unwrap();

    let loaded = store.get_work_order(work_order.id).await.unwrap().unwrap();
    assert_eq!(loaded.version, Version::new(2));
    assert_eq!(loaded.last_serial_number, 10);

    let mut stale = ChangeSet::new();
    stale.update_work_order(work_order.clone());
    let err = store.commit(stale).await.unwrap_err();
    match err {
        StoreError::ConcurrencyConflict {
            expected, actual, ..
        } => {
            assert_eq!(expected, Version::first());
            assert_eq!(actual, Some(Version::new(2)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn failed_commit_rolls_back_everything() {
    let store = get_test_store().await;
    let work_order = seed_work_order(&store).await;

    let mut changes = ChangeSet::new();
    changes
        .insert_serial_number(SerialNumber::generated(work_order.id, "S1", "dm"))
        .insert_serial_number(SerialNumber::generated(work_order.id, "S1", "dm"));
    let err = store.commit(changes).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::UniqueViolation { field: "serial", .. }
    ));

    let serials = store
        .serial_numbers_by_work_order(work_order.id)
        .await
        .unwrap();
    assert!(serials.is_empty());
}

#[tokio::test]
async fn duplicate_gln_is_reported() {
    let store = get_test_store().await;
    let gln = unique_digits(13);

    let mut first = ChangeSet::new();
    first.insert_customer(Customer::new("First", gln.clone()));
    store.commit(first).await.unwrap();

    let mut second = ChangeSet::new();
    second.insert_customer(Customer::new("Second", gln.clone()));
    let err = store.commit(second).await.unwrap_err();
    match err {
        StoreError::UniqueViolation { field, value, .. } => {
            assert_eq!(field, "gln");
            assert_eq!(value, gln);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(store.gln_exists(&gln).await.unwrap());
}

#[tokio::test]
async fn aggregation_queries() {
    let store = get_test_store().await;
    let work_order = seed_work_order(&store).await;

    let pallet = Sscc::new(
        ContainerKind::Pallet,
        work_order.id,
        unique_digits(18),
        "00",
    );
    let mut boxed = Sscc::new(ContainerKind::Box, work_order.id, unique_digits(18), "00");
    boxed.parent_id = Some(pallet.id);
    let mut packed = SerialNumber::generated(work_order.id, "0002", "dm");
    packed.status = SerialStatus::Aggregated;
    packed.container_id = Some(boxed.id);
    let loose = SerialNumber::generated(work_order.id, "0001", "dm");

    let mut changes = ChangeSet::new();
    changes
        .insert_container(pallet.clone())
        .insert_container(boxed.clone())
        .insert_serial_number(loose.clone())
        .insert_serial_number(packed.clone());
    store.commit(changes).await.unwrap();

    let boxes = store.containers_by_parent(pallet.id).await.unwrap();
    assert_eq!(boxes.len(), 1);
    assert_eq!(boxes[0].id, boxed.id);
    assert_eq!(boxes[0].kind, ContainerKind::Box);

    let counts = store
        .count_serial_numbers_by_containers(&[boxed.id, pallet.id])
        .await
        .unwrap();
    assert_eq!(counts.get(&boxed.id), Some(&1));
    assert_eq!(counts.get(&pallet.id), None);

    let items = store.serial_numbers_by_container(boxed.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].status, SerialStatus::Aggregated);

    let unassigned = store.unassigned_serial_numbers(work_order.id).await.unwrap();
    assert_eq!(unassigned.len(), 1);
    assert_eq!(unassigned[0].id, loose.id);

    let mut touch = ChangeSet::new();
    touch.touch_container(&boxed);
    store.commit(touch).await.unwrap();
    let reloaded = store.get_container(boxed.id).await.unwrap().unwrap();
    assert_eq!(reloaded.version, Version::new(2));
    assert_eq!(reloaded.parent_id, Some(pallet.id));
}

#[tokio::test]
async fn list_work_orders_by_product() {
    let store = get_test_store().await;
    let work_order = seed_work_order(&store).await;

    let listed = store
        .list_work_orders(WorkOrderQuery::new().product(work_order.product_id))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, work_order.id);

    let completed = store
        .list_work_orders(
            WorkOrderQuery::new()
                .product(work_order.product_id)
                .status(WorkOrderStatus::Completed),
        )
        .await
        .unwrap();
    assert!(completed.is_empty());
}

#[tokio::test]
async fn sequence_counter_is_monotonic_and_seeded() {
    let pool = get_test_pool().await;
    let name = format!("{SSCC_SERIAL_REFERENCE}_{}", Uuid::new_v4());

    let counter = PostgresSequenceCounter::new(pool.clone(), 100);
    assert_eq!(counter.next_value(&name).await.unwrap(), 100);
    assert_eq!(counter.next_value(&name).await.unwrap(), 101);

    let lower_seed = PostgresSequenceCounter::new(pool.clone(), 1);
    assert_eq!(lower_seed.next_value(&name).await.unwrap(), 102);

    let higher_seed = PostgresSequenceCounter::new(pool, 500);
    assert_eq!(higher_seed.next_value(&name).await.unwrap(), 500);
}

#[tokio::test]
async fn concurrent_counter_calls_never_repeat() {
    let pool = get_test_pool().await;
    let name = format!("{SSCC_SERIAL_REFERENCE}_{}", Uuid::new_v4());
    let counter = PostgresSequenceCounter::new(pool, 1);

    let mut handles = Vec::new();
    for _ in 0..20 {
        let counter = counter.clone();
        let name = name.clone();
        handles.push(tokio::spawn(
            async move { counter.next_value(&name).await.unwrap() },
        ));
    }

    let mut values = Vec::new();
    for handle in handles {
        values.push(handle.await.unwrap());
    }
    values.sort_unstable();
    assert_eq!(values, (1..=20).collect::<Vec<_>>());
}
