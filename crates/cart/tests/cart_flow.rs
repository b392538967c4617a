//! End-to-end cart engine flows against the in-memory store.

use cart::{CartService, InMemoryCartStore};
use catalog::{CatalogItem, Course, EventItem, InMemoryCatalog};
use chrono::{Duration as ChronoDuration, Utc};
use common::{ItemType, Money, TaxPolicy};
use uuid::Uuid;

fn setup() -> (
    CartService<InMemoryCartStore, InMemoryCatalog>,
    InMemoryCartStore,
    InMemoryCatalog,
) {
    let store = InMemoryCartStore::default();
    let catalog = InMemoryCatalog::new();
    let service = CartService::new(store.clone(), catalog.clone(), TaxPolicy::default());
    (service, store, catalog)
}

fn seed(catalog: &InMemoryCatalog) -> (Uuid, Uuid) {
    let course_id = Uuid::new_v4();
    catalog.insert(CatalogItem::Course(Course::new(
        course_id,
        "Breathwork Basics",
        Money::from_cents(5999),
    )));

    let event_id = Uuid::new_v4();
    catalog.insert(CatalogItem::Event(EventItem::new(
        event_id,
        "Full Moon Retreat",
        Money::from_cents(14_999),
        Utc::now() + ChronoDuration::days(14),
        1,
    )));

    (course_id, event_id)
}

#[tokio::test]
async fn cart_totals_follow_the_fixed_tax_rate() {
    let (service, _, catalog) = setup();
    let (course_id, event_id) = seed(&catalog);

    service
        .add_item("user:1", ItemType::Course, course_id, 1)
        .await
        .unwrap();
    let cart = service
        .add_item("user:1", ItemType::Event, event_id, 1)
        .await
        .unwrap();

    assert_eq!(cart.subtotal().cents(), 20_998);
    assert_eq!(cart.tax().cents(), 1_680);
    assert_eq!(cart.total().cents(), 22_678);
    assert_eq!(cart.item_count(), 2);
}

#[tokio::test]
async fn expired_cart_reads_back_empty() {
    let (service, store, catalog) = setup();
    let (course_id, _) = seed(&catalog);

    service
        .add_item("user:1", ItemType::Course, course_id, 1)
        .await
        .unwrap();
    store.expire("user:1");

    let cart = service.get_cart("user:1").await.unwrap();
    assert!(cart.is_empty());
    assert_eq!(cart.total(), Money::zero());
}

#[tokio::test]
async fn guest_login_merge_then_checkout_flow() {
    let (service, _, catalog) = setup();
    let (course_id, event_id) = seed(&catalog);

    // Guest browses before logging in.
    service
        .add_item("guest:s1", ItemType::Course, course_id, 1)
        .await
        .unwrap();
    service
        .add_item("guest:s1", ItemType::Event, event_id, 1)
        .await
        .unwrap();

    // Login merges guest into user.
    let merged = service.merge_guest_cart("guest:s1", "user:7").await.unwrap();
    assert_eq!(merged.items().len(), 2);

    // No discrepancies: safe to check out.
    assert!(service.validate_cart("user:7").await.unwrap().is_empty());

    // Fulfillment clears the cart.
    service.clear_cart("user:7").await.unwrap();
    assert!(service.get_cart("user:7").await.unwrap().is_empty());
}
