use cart::CartItem;
use catalog::{CatalogItem, Course, EventItem, InMemoryCatalog};
use chrono::{Duration, Utc};
use common::{ItemType, Money, TaxPolicy, Totals, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use orders::{InMemoryOrderStore, OrderStore};
use uuid::Uuid;

fn seeded_store() -> (InMemoryOrderStore, UserId, Uuid, Uuid) {
    let catalog = InMemoryCatalog::new();
    let course_id = Uuid::new_v4();
    let event_id = Uuid::new_v4();
    catalog.insert(CatalogItem::Course(Course::new(
        course_id,
        "Meditation 101",
        Money::from_cents(5999),
    )));
    catalog.insert(CatalogItem::Event(EventItem::new(
        event_id,
        "Weekend Retreat",
        Money::from_cents(14_999),
        Utc::now() + Duration::days(7),
        1_000_000,
    )));

    let store = InMemoryOrderStore::new(catalog, TaxPolicy::default());
    let user_id = UserId::new();
    store.add_user(user_id);
    (store, user_id, course_id, event_id)
}

fn bench_totals_compute(c: &mut Criterion) {
    let policy = TaxPolicy::default();
    let lines: Vec<(Money, u32)> = (0..20)
        .map(|i| (Money::from_cents(999 + i * 100), (i % 3 + 1) as u32))
        .collect();

    c.bench_function("orders/totals_compute_20_lines", |b| {
        b.iter(|| Totals::compute(lines.iter().copied(), policy));
    });
}

fn bench_create_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (store, user_id, course_id, event_id) = seeded_store();
    let items = [
        CartItem::new(
            ItemType::Course,
            course_id,
            "Meditation 101",
            Money::from_cents(5999),
            1,
        ),
        CartItem::new(
            ItemType::Event,
            event_id,
            "Weekend Retreat",
            Money::from_cents(14_999),
            2,
        ),
    ];

    c.bench_function("orders/create_order_two_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.create_order(user_id, &items).await.unwrap();
            });
        });
    });
}

fn bench_full_lifecycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (store, user_id, course_id, _) = seeded_store();
    let items = [CartItem::new(
        ItemType::Course,
        course_id,
        "Meditation 101",
        Money::from_cents(5999),
        1,
    )];

    c.bench_function("orders/lifecycle_to_completed", |b| {
        b.iter(|| {
            rt.block_on(async {
                let order = store.create_order(user_id, &items).await.unwrap();
                store
                    .attach_payment_reference(order.id, "pi_bench")
                    .await
                    .unwrap();
                store.mark_paid(order.id).await.unwrap();
                store.fulfill_order(order.id).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_totals_compute,
    bench_create_order,
    bench_full_lifecycle
);
criterion_main!(benches);
