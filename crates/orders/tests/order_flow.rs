//! Order lifecycle integration tests against the in-memory store.

use cart::CartItem;
use catalog::{CatalogItem, Course, DigitalProduct, EventItem, InMemoryCatalog, UnavailableReason};
use chrono::{Duration, Utc};
use common::{ErrorKind, ItemType, Money, TaxPolicy, UserId};
use orders::{
    BookingStatus, InMemoryOrderStore, OrderError, OrderService, OrderStatus, OrderStore,
};
use uuid::Uuid;

struct Fixture {
    store: InMemoryOrderStore,
    service: OrderService<InMemoryOrderStore>,
    user_id: UserId,
    course_id: Uuid,
    event_id: Uuid,
    product_id: Uuid,
}

fn fixture() -> Fixture {
    fixture_with_capacity(10)
}

fn fixture_with_capacity(capacity: u32) -> Fixture {
    let catalog = InMemoryCatalog::new();
    let course_id = Uuid::new_v4();
    let event_id = Uuid::new_v4();
    let product_id = Uuid::new_v4();

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
        capacity,
    )));
    catalog.insert(CatalogItem::DigitalProduct(DigitalProduct::new(
        product_id,
        "Guided Audio Pack",
        Money::from_cents(999),
    )));

    let store = InMemoryOrderStore::new(catalog, TaxPolicy::default());
    let user_id = UserId::new();
    store.add_user(user_id);

    Fixture {
        service: OrderService::new(store.clone()),
        store,
        user_id,
        course_id,
        event_id,
        product_id,
    }
}

fn course_line(fx: &Fixture) -> CartItem {
    CartItem::new(
        ItemType::Course,
        fx.course_id,
        "Meditation 101",
        Money::from_cents(5999),
        1,
    )
}

fn event_line(fx: &Fixture, quantity: u32) -> CartItem {
    CartItem::new(
        ItemType::Event,
        fx.event_id,
        "Weekend Retreat",
        Money::from_cents(14_999),
        quantity,
    )
}

fn product_line(fx: &Fixture) -> CartItem {
    CartItem::new(
        ItemType::DigitalProduct,
        fx.product_id,
        "Guided Audio Pack",
        Money::from_cents(999),
        1,
    )
}

#[tokio::test]
async fn full_lifecycle_completes_and_grants() {
    let fx = fixture();
    let items = [course_line(&fx), event_line(&fx, 2), product_line(&fx)];

    let order = fx.service.create_order(fx.user_id, &items).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.items.len(), 3);
    // 5999 + 2 * 14999 + 999 = 36996; 8% rounded half-up = 2960.
    assert_eq!(order.subtotal.cents(), 36_996);
    assert_eq!(order.tax.cents(), 2960);
    assert_eq!(order.total.cents(), 39_956);

    let order = fx
        .service
        .attach_payment_reference(order.id, "pi_12345")
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::PaymentPending);
    assert_eq!(order.payment_reference.as_deref(), Some("pi_12345"));

    let order = fx.service.mark_paid(order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Paid);

    let order = fx.service.fulfill_order(order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
    assert!(order.completed_at.is_some());

    assert!(fx.store.has_enrollment(order.id, fx.course_id));
    assert!(fx.store.has_download_grant(order.id, fx.product_id));
    let booking = fx.store.booking(order.id, fx.event_id).unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.quantity, 2);
    assert_eq!(booking.user_id, fx.user_id);

    let catalog = fx.store.catalog();
    let course = catalog.fetch(ItemType::Course, fx.course_id).unwrap();
    assert_eq!(course.as_course().unwrap().enrolled_count, 1);
    let event = catalog.fetch(ItemType::Event, fx.event_id).unwrap();
    assert_eq!(event.as_event().unwrap().booked_count, 2);
    let product = catalog
        .fetch(ItemType::DigitalProduct, fx.product_id)
        .unwrap();
    assert_eq!(product.as_digital_product().unwrap().download_count, 1);
}

#[tokio::test]
async fn concurrent_creates_never_oversell_the_event() {
    let fx = fixture_with_capacity(3);

    let mut handles = Vec::new();
    for _ in 0..6 {
        let store = fx.store.clone();
        let user_id = fx.user_id;
        let line = event_line(&fx, 1);
        handles.push(tokio::spawn(async move {
            store.create_order(user_id, &[line]).await
        }));
    }

    let mut created = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(OrderError::ItemUnavailable {
                reason: UnavailableReason::FullyBooked,
                ..
            }) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(created, 3);
    assert_eq!(rejected, 3);

    let event = fx.store.catalog().fetch(ItemType::Event, fx.event_id).unwrap();
    assert_eq!(event.as_event().unwrap().booked_count, 3);
}

#[tokio::test]
async fn oversized_claim_leaves_remaining_seats_intact() {
    let fx = fixture_with_capacity(3);

    let err = fx
        .store
        .create_order(fx.user_id, &[event_line(&fx, 4)])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrderError::ItemUnavailable {
            reason: UnavailableReason::FullyBooked,
            ..
        }
    ));

    // The failed order must not have consumed any seats.
    fx.store
        .create_order(fx.user_id, &[event_line(&fx, 3)])
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_line_releases_seats_claimed_by_earlier_lines() {
    let fx = fixture_with_capacity(5);
    let hidden = Uuid::new_v4();
    let mut item = Course::new(hidden, "Unlisted", Money::from_cents(100));
    item.is_published = false;
    fx.store.catalog().insert(CatalogItem::Course(item));

    let items = [
        event_line(&fx, 2),
        CartItem::new(
            ItemType::Course,
            hidden,
            "Unlisted",
            Money::from_cents(100),
            1,
        ),
    ];
    let err = fx.store.create_order(fx.user_id, &items).await.unwrap_err();
    assert!(matches!(
        err,
        OrderError::ItemUnavailable {
            reason: UnavailableReason::Unpublished,
            ..
        }
    ));

    let event = fx.store.catalog().fetch(ItemType::Event, fx.event_id).unwrap();
    assert_eq!(event.as_event().unwrap().booked_count, 0);
}

#[tokio::test]
async fn order_totals_are_frozen_against_catalog_edits() {
    let fx = fixture();
    let order = fx
        .store
        .create_order(fx.user_id, &[course_line(&fx)])
        .await
        .unwrap();

    fx.store
        .catalog()
        .set_price(ItemType::Course, fx.course_id, Money::from_cents(9999));

    let reloaded = fx.service.get_order(order.id).await.unwrap();
    assert_eq!(reloaded.subtotal.cents(), 5999);
    assert_eq!(
        reloaded
            .get_line(ItemType::Course, fx.course_id)
            .unwrap()
            .unit_price
            .cents(),
        5999
    );

    // A fresh order picks up the live price.
    let fresh = fx
        .store
        .create_order(fx.user_id, &[course_line(&fx)])
        .await
        .unwrap();
    assert_eq!(fresh.subtotal.cents(), 9999);
}

#[tokio::test]
async fn fulfillment_is_idempotent() {
    let fx = fixture();
    let order = fx
        .store
        .create_order(fx.user_id, &[course_line(&fx), event_line(&fx, 1)])
        .await
        .unwrap();
    fx.service
        .attach_payment_reference(order.id, "pi_1")
        .await
        .unwrap();
    fx.service.mark_paid(order.id).await.unwrap();

    let first = fx.service.fulfill_order(order.id).await.unwrap();
    let booking_id = fx.store.booking(order.id, fx.event_id).unwrap().id;

    let second = fx.service.fulfill_order(order.id).await.unwrap();
    assert_eq!(second.status, OrderStatus::Completed);
    assert_eq!(second.completed_at, first.completed_at);

    // No double grants, and the booking was not recreated.
    let catalog = fx.store.catalog();
    let course = catalog.fetch(ItemType::Course, fx.course_id).unwrap();
    assert_eq!(course.as_course().unwrap().enrolled_count, 1);
    assert_eq!(fx.store.booking(order.id, fx.event_id).unwrap().id, booking_id);
}

#[tokio::test]
async fn fulfill_before_payment_is_rejected() {
    let fx = fixture();
    let order = fx
        .store
        .create_order(fx.user_id, &[course_line(&fx)])
        .await
        .unwrap();

    let err = fx.service.fulfill_order(order.id).await.unwrap_err();
    assert!(matches!(err, OrderError::NotFulfillable { .. }));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("must be paid"));
}

#[tokio::test]
async fn cancel_releases_claimed_seats() {
    let fx = fixture_with_capacity(3);
    let order = fx
        .store
        .create_order(fx.user_id, &[event_line(&fx, 2)])
        .await
        .unwrap();

    let event = fx.store.catalog().fetch(ItemType::Event, fx.event_id).unwrap();
    assert_eq!(event.as_event().unwrap().booked_count, 2);

    let order = fx.service.cancel_order(order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);

    let event = fx.store.catalog().fetch(ItemType::Event, fx.event_id).unwrap();
    assert_eq!(event.as_event().unwrap().booked_count, 0);
}

#[tokio::test]
async fn cancel_after_completion_is_rejected_without_side_effects() {
    let fx = fixture();
    let order = fx
        .store
        .create_order(fx.user_id, &[course_line(&fx)])
        .await
        .unwrap();
    fx.service
        .attach_payment_reference(order.id, "pi_1")
        .await
        .unwrap();
    fx.service.mark_paid(order.id).await.unwrap();
    fx.service.fulfill_order(order.id).await.unwrap();

    let err = fx.service.cancel_order(order.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let msg = err.to_string();
    assert!(msg.contains("completed"));
    assert!(msg.contains("cancelled"));

    let reloaded = fx.service.get_order(order.id).await.unwrap();
    assert_eq!(reloaded.status, OrderStatus::Completed);
    assert!(fx.store.has_enrollment(order.id, fx.course_id));
}

#[tokio::test]
async fn refund_reverses_each_grant_exactly_once() {
    let fx = fixture();
    let order = fx
        .store
        .create_order(
            fx.user_id,
            &[course_line(&fx), event_line(&fx, 2), product_line(&fx)],
        )
        .await
        .unwrap();
    fx.service
        .attach_payment_reference(order.id, "pi_1")
        .await
        .unwrap();
    fx.service.mark_paid(order.id).await.unwrap();
    fx.service.fulfill_order(order.id).await.unwrap();

    let order = fx.service.refund_order(order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Refunded);

    let catalog = fx.store.catalog();
    let course = catalog.fetch(ItemType::Course, fx.course_id).unwrap();
    assert_eq!(course.as_course().unwrap().enrolled_count, 0);
    let event = catalog.fetch(ItemType::Event, fx.event_id).unwrap();
    assert_eq!(event.as_event().unwrap().booked_count, 0);
    let product = catalog
        .fetch(ItemType::DigitalProduct, fx.product_id)
        .unwrap();
    assert_eq!(product.as_digital_product().unwrap().download_count, 0);

    assert!(!fx.store.has_enrollment(order.id, fx.course_id));
    let booking = fx.store.booking(order.id, fx.event_id).unwrap();
    assert_eq!(booking.status, BookingStatus::Cancelled);

    // Refunded is terminal.
    let err = fx.service.refund_order(order.id).await.unwrap_err();
    assert!(matches!(err, OrderError::InvalidTransition { .. }));
}

#[tokio::test]
async fn refund_before_completion_is_rejected() {
    let fx = fixture();
    let order = fx
        .store
        .create_order(fx.user_id, &[course_line(&fx)])
        .await
        .unwrap();

    let err = fx.service.refund_order(order.id).await.unwrap_err();
    assert!(matches!(
        err,
        OrderError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Refunded,
        }
    ));
}

#[tokio::test]
async fn payment_reference_cannot_be_attached_twice() {
    let fx = fixture();
    let order = fx
        .store
        .create_order(fx.user_id, &[course_line(&fx)])
        .await
        .unwrap();
    fx.service
        .attach_payment_reference(order.id, "pi_1")
        .await
        .unwrap();

    let err = fx
        .service
        .attach_payment_reference(order.id, "pi_2")
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::PaymentReferenceAttached(_)));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let reloaded = fx.service.get_order(order.id).await.unwrap();
    assert_eq!(reloaded.payment_reference.as_deref(), Some("pi_1"));
}

#[tokio::test]
async fn create_order_rejects_bad_input() {
    let fx = fixture();

    let err = fx.store.create_order(fx.user_id, &[]).await.unwrap_err();
    assert!(matches!(err, OrderError::EmptyCart));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let stranger = UserId::new();
    let err = fx
        .store
        .create_order(stranger, &[course_line(&fx)])
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::UserNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let mut zero = course_line(&fx);
    zero.quantity = 0;
    let err = fx.store.create_order(fx.user_id, &[zero]).await.unwrap_err();
    assert!(matches!(err, OrderError::InvalidQuantity { .. }));
}

#[tokio::test]
async fn get_order_maps_absence_to_not_found() {
    let fx = fixture();
    let err = fx
        .service
        .get_order(common::OrderId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::OrderNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
