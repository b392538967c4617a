//! PostgreSQL-backed order store.
//!
//! Each trait method runs inside one transaction. Event seats are claimed
//! with a conditional UPDATE against the row the transaction has locked,
//! so the capacity invariant holds under concurrent order creation.

use async_trait::async_trait;
use cart::CartItem;
use catalog::{CatalogItem, Course, DigitalProduct, EventItem, evaluate};
use chrono::{DateTime, Utc};
use common::{ItemType, Money, OrderId, TaxPolicy, Totals, UserId};
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::OrderError;
use crate::order::{Order, OrderLine};
use crate::status::{OrderStatus, ensure_transition};
use crate::store::OrderStore;

/// Order store over the orders/order_items/bookings tables.
#[derive(Debug, Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
    tax: TaxPolicy,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool, tax: TaxPolicy) -> Self {
        Self { pool, tax }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: &PgRow) -> Result<Order, OrderError> {
        let status_text: String = row.try_get("status")?;
        let status = OrderStatus::parse(&status_text)
            .ok_or_else(|| OrderError::CorruptRecord(format!("order status {status_text:?}")))?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            status,
            subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
            tax: Money::from_cents(row.try_get("tax_cents")?),
            total: Money::from_cents(row.try_get("total_cents")?),
            payment_reference: row.try_get("payment_reference")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            completed_at: row.try_get::<Option<DateTime<Utc>>, _>("completed_at")?,
            items: Vec::new(),
        })
    }

    fn row_to_line(row: &PgRow) -> Result<OrderLine, OrderError> {
        let type_text: String = row.try_get("item_type")?;
        let item_type = ItemType::parse(&type_text)
            .ok_or_else(|| OrderError::CorruptRecord(format!("item type {type_text:?}")))?;

        Ok(OrderLine {
            item_type,
            item_id: row.try_get("item_id")?,
            title: row.try_get("title")?,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
            quantity: row.try_get::<i32, _>("quantity")? as u32,
            line_subtotal: Money::from_cents(row.try_get("line_subtotal_cents")?),
        })
    }

    /// Loads an order and its lines on the given connection.
    async fn load_order(
        conn: &mut PgConnection,
        order_id: OrderId,
        lock: bool,
    ) -> Result<Option<Order>, OrderError> {
        let sql = if lock {
            "SELECT id, user_id, status, subtotal_cents, tax_cents, total_cents, \
             payment_reference, created_at, updated_at, completed_at \
             FROM orders WHERE id = $1 FOR UPDATE"
        } else {
            "SELECT id, user_id, status, subtotal_cents, tax_cents, total_cents, \
             payment_reference, created_at, updated_at, completed_at \
             FROM orders WHERE id = $1"
        };

        let row = sqlx::query(sql)
            .bind(order_id.as_uuid())
            .fetch_optional(&mut *conn)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut order = Self::row_to_order(&row)?;

        let line_rows = sqlx::query(
            r#"
            SELECT item_type, item_id, title, unit_price_cents, quantity, line_subtotal_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&mut *conn)
        .await?;

        order.items = line_rows
            .iter()
            .map(Self::row_to_line)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(order))
    }

    /// Locks a catalog row and decodes it, or returns None if absent.
    async fn lock_catalog_item(
        conn: &mut PgConnection,
        item_type: ItemType,
        item_id: Uuid,
    ) -> Result<Option<CatalogItem>, OrderError> {
        let item = match item_type {
            ItemType::Course => sqlx::query(
                r#"
                SELECT id, title, price_cents, is_published, deleted_at, enrolled_count
                FROM courses
                WHERE id = $1
                FOR UPDATE
                "#,
            )
            .bind(item_id)
            .fetch_optional(&mut *conn)
            .await?
            .map(|row| {
                Ok::<_, OrderError>(CatalogItem::Course(Course {
                    id: row.try_get("id")?,
                    title: row.try_get("title")?,
                    price: Money::from_cents(row.try_get("price_cents")?),
                    is_published: row.try_get("is_published")?,
                    deleted_at: row.try_get::<Option<DateTime<Utc>>, _>("deleted_at")?,
                    enrolled_count: row.try_get::<i32, _>("enrolled_count")? as u32,
                }))
            })
            .transpose()?,
            ItemType::Event => sqlx::query(
                r#"
                SELECT id, title, price_cents, is_published, deleted_at,
                       start_time, capacity, booked_count
                FROM events
                WHERE id = $1
                FOR UPDATE
                "#,
            )
            .bind(item_id)
            .fetch_optional(&mut *conn)
            .await?
            .map(|row| {
                Ok::<_, OrderError>(CatalogItem::Event(EventItem {
                    id: row.try_get("id")?,
                    title: row.try_get("title")?,
                    price: Money::from_cents(row.try_get("price_cents")?),
                    is_published: row.try_get("is_published")?,
                    deleted_at: row.try_get::<Option<DateTime<Utc>>, _>("deleted_at")?,
                    start_time: row.try_get("start_time")?,
                    capacity: row.try_get::<i32, _>("capacity")? as u32,
                    booked_count: row.try_get::<i32, _>("booked_count")? as u32,
                }))
            })
            .transpose()?,
            ItemType::DigitalProduct => sqlx::query(
                r#"
                SELECT id, title, price_cents, is_published, deleted_at, download_count
                FROM digital_products
                WHERE id = $1
                FOR UPDATE
                "#,
            )
            .bind(item_id)
            .fetch_optional(&mut *conn)
            .await?
            .map(|row| {
                Ok::<_, OrderError>(CatalogItem::DigitalProduct(DigitalProduct {
                    id: row.try_get("id")?,
                    title: row.try_get("title")?,
                    price: Money::from_cents(row.try_get("price_cents")?),
                    is_published: row.try_get("is_published")?,
                    deleted_at: row.try_get::<Option<DateTime<Utc>>, _>("deleted_at")?,
                    download_count: row.try_get::<i32, _>("download_count")? as u32,
                }))
            })
            .transpose()?,
        };

        Ok(item)
    }

    /// Loads an order under lock, checks the transition, and writes the
    /// new status. Used by the simple lifecycle steps.
    async fn transition(&self, order_id: OrderId, to: OrderStatus) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        let mut order = Self::load_order(&mut *tx, order_id, true)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;
        ensure_transition(order.status, to)?;

        let now = Utc::now();
        sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(order_id.as_uuid())
            .bind(to.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        order.status = to;
        order.updated_at = now;
        Ok(order)
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn create_order(&self, user_id: UserId, items: &[CartItem]) -> Result<Order, OrderError> {
        if items.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        for item in items {
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    item_id: item.item_id,
                    quantity: item.quantity,
                });
            }
        }

        let mut tx = self.pool.begin().await?;

        let user_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id.as_uuid())
            .fetch_one(&mut *tx)
            .await?;
        if !user_exists {
            return Err(OrderError::UserNotFound(user_id));
        }

        // Re-validate each item against the locked catalog row and claim
        // event seats with a conditional increment. Returning early here
        // drops the transaction, rolling back every claim made so far.
        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let snapshot = Self::lock_catalog_item(&mut *tx, item.item_type, item.item_id).await?;
            let price = evaluate(snapshot.as_ref(), Utc::now())
                .into_result()
                .map_err(|reason| OrderError::ItemUnavailable {
                    item_type: item.item_type,
                    item_id: item.item_id,
                    reason,
                })?;

            if item.item_type == ItemType::Event {
                let claimed = sqlx::query(
                    r#"
                    UPDATE events
                    SET booked_count = booked_count + $2
                    WHERE id = $1 AND booked_count + $2 <= capacity
                    "#,
                )
                .bind(item.item_id)
                .bind(item.quantity as i32)
                .execute(&mut *tx)
                .await?;

                if claimed.rows_affected() == 0 {
                    return Err(OrderError::ItemUnavailable {
                        item_type: item.item_type,
                        item_id: item.item_id,
                        reason: catalog::UnavailableReason::FullyBooked,
                    });
                }
            }

            let title = snapshot.map(|s| s.title().to_string()).unwrap_or_default();
            lines.push(OrderLine::new(
                item.item_type,
                item.item_id,
                title,
                price,
                item.quantity,
            ));
        }

        let totals = Totals::compute(lines.iter().map(|l| (l.unit_price, l.quantity)), self.tax);
        let now = Utc::now();
        let order_id = OrderId::new();

        sqlx::query(
            r#"
            INSERT INTO orders
                (id, user_id, status, subtotal_cents, tax_cents, total_cents, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(OrderStatus::Pending.as_str())
        .bind(totals.subtotal.cents())
        .bind(totals.tax.cents())
        .bind(totals.total.cents())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for (position, line) in lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items
                    (order_id, position, item_type, item_id, title,
                     unit_price_cents, quantity, line_subtotal_cents)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(order_id.as_uuid())
            .bind(position as i32)
            .bind(line.item_type.as_str())
            .bind(line.item_id)
            .bind(&line.title)
            .bind(line.unit_price.cents())
            .bind(line.quantity as i32)
            .bind(line.line_subtotal.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Order {
            id: order_id,
            user_id,
            status: OrderStatus::Pending,
            subtotal: totals.subtotal,
            tax: totals.tax,
            total: totals.total,
            payment_reference: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            items: lines,
        })
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, OrderError> {
        let mut conn = self.pool.acquire().await?;
        Self::load_order(&mut *conn, order_id, false).await
    }

    async fn attach_payment_reference(
        &self,
        order_id: OrderId,
        payment_reference: &str,
    ) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        let mut order = Self::load_order(&mut *tx, order_id, true)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;
        if order.payment_reference.is_some() {
            return Err(OrderError::PaymentReferenceAttached(order_id));
        }
        ensure_transition(order.status, OrderStatus::PaymentPending)?;

        let now = Utc::now();
        sqlx::query(
            "UPDATE orders SET payment_reference = $2, status = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(order_id.as_uuid())
        .bind(payment_reference)
        .bind(OrderStatus::PaymentPending.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        order.payment_reference = Some(payment_reference.to_string());
        order.status = OrderStatus::PaymentPending;
        order.updated_at = now;
        Ok(order)
    }

    async fn mark_paid(&self, order_id: OrderId) -> Result<Order, OrderError> {
        self.transition(order_id, OrderStatus::Paid).await
    }

    async fn start_processing(&self, order_id: OrderId) -> Result<Order, OrderError> {
        self.transition(order_id, OrderStatus::Processing).await
    }

    async fn fulfill_order(&self, order_id: OrderId) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        let mut order = Self::load_order(&mut *tx, order_id, true)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;

        // Webhook redelivery: fulfilling a completed order is a no-op.
        if order.status == OrderStatus::Completed {
            return Ok(order);
        }
        if !matches!(order.status, OrderStatus::Paid | OrderStatus::Processing) {
            return Err(OrderError::NotFulfillable {
                status: order.status,
            });
        }

        // Each grant is insert-if-absent keyed on (order, item); the
        // paired counter only moves when the insert actually happened.
        let now = Utc::now();
        for line in &order.items {
            match line.item_type {
                ItemType::Course => {
                    let inserted = sqlx::query(
                        r#"
                        INSERT INTO enrollments (id, order_id, user_id, course_id, created_at)
                        VALUES ($1, $2, $3, $4, $5)
                        ON CONFLICT (order_id, course_id) DO NOTHING
                        "#,
                    )
                    .bind(Uuid::new_v4())
                    .bind(order_id.as_uuid())
                    .bind(order.user_id.as_uuid())
                    .bind(line.item_id)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;

                    if inserted.rows_affected() == 1 {
                        sqlx::query("UPDATE courses SET enrolled_count = enrolled_count + 1 WHERE id = $1")
                            .bind(line.item_id)
                            .execute(&mut *tx)
                            .await?;
                    }
                }
                ItemType::Event => {
                    sqlx::query(
                        r#"
                        INSERT INTO bookings
                            (id, order_id, user_id, event_id, quantity, status, created_at)
                        VALUES ($1, $2, $3, $4, $5, 'confirmed', $6)
                        ON CONFLICT (order_id, event_id) DO NOTHING
                        "#,
                    )
                    .bind(Uuid::new_v4())
                    .bind(order_id.as_uuid())
                    .bind(order.user_id.as_uuid())
                    .bind(line.item_id)
                    .bind(line.quantity as i32)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;
                }
                ItemType::DigitalProduct => {
                    let inserted = sqlx::query(
                        r#"
                        INSERT INTO download_grants (id, order_id, user_id, product_id, created_at)
                        VALUES ($1, $2, $3, $4, $5)
                        ON CONFLICT (order_id, product_id) DO NOTHING
                        "#,
                    )
                    .bind(Uuid::new_v4())
                    .bind(order_id.as_uuid())
                    .bind(order.user_id.as_uuid())
                    .bind(line.item_id)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;

                    if inserted.rows_affected() == 1 {
                        sqlx::query(
                            "UPDATE digital_products SET download_count = download_count + 1 WHERE id = $1",
                        )
                        .bind(line.item_id)
                        .execute(&mut *tx)
                        .await?;
                    }
                }
            }
        }

        if order.status == OrderStatus::Paid {
            ensure_transition(order.status, OrderStatus::Processing)?;
            order.status = OrderStatus::Processing;
        }
        ensure_transition(order.status, OrderStatus::Completed)?;

        sqlx::query(
            "UPDATE orders SET status = $2, updated_at = $3, completed_at = $3 WHERE id = $1",
        )
        .bind(order_id.as_uuid())
        .bind(OrderStatus::Completed.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        order.status = OrderStatus::Completed;
        order.updated_at = now;
        order.completed_at = Some(now);
        Ok(order)
    }

    async fn cancel_order(&self, order_id: OrderId) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        let mut order = Self::load_order(&mut *tx, order_id, true)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;
        ensure_transition(order.status, OrderStatus::Cancelled)?;
        if !matches!(
            order.status,
            OrderStatus::Pending | OrderStatus::PaymentPending
        ) {
            return Err(OrderError::NotCancellable {
                status: order.status,
            });
        }

        for line in &order.items {
            if line.item_type == ItemType::Event {
                sqlx::query(
                    "UPDATE events SET booked_count = GREATEST(booked_count - $2, 0) WHERE id = $1",
                )
                .bind(line.item_id)
                .bind(line.quantity as i32)
                .execute(&mut *tx)
                .await?;
            }
        }

        let now = Utc::now();
        sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(order_id.as_uuid())
            .bind(OrderStatus::Cancelled.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        order.status = OrderStatus::Cancelled;
        order.updated_at = now;
        Ok(order)
    }

    async fn refund_order(&self, order_id: OrderId) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        let mut order = Self::load_order(&mut *tx, order_id, true)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))?;
        ensure_transition(order.status, OrderStatus::Refunded)?;

        // Reversals mirror the fulfillment grants: the counter only moves
        // when the grant row was actually removed or flipped, so a double
        // refund attempt (already rejected by the transition table) could
        // never drive a counter below zero anyway.
        for line in &order.items {
            match line.item_type {
                ItemType::Course => {
                    let removed = sqlx::query(
                        "DELETE FROM enrollments WHERE order_id = $1 AND course_id = $2",
                    )
                    .bind(order_id.as_uuid())
                    .bind(line.item_id)
                    .execute(&mut *tx)
                    .await?;

                    if removed.rows_affected() == 1 {
                        sqlx::query(
                            "UPDATE courses SET enrolled_count = GREATEST(enrolled_count - 1, 0) WHERE id = $1",
                        )
                        .bind(line.item_id)
                        .execute(&mut *tx)
                        .await?;
                    }
                }
                ItemType::Event => {
                    let cancelled = sqlx::query(
                        r#"
                        UPDATE bookings SET status = 'cancelled'
                        WHERE order_id = $1 AND event_id = $2 AND status = 'confirmed'
                        "#,
                    )
                    .bind(order_id.as_uuid())
                    .bind(line.item_id)
                    .execute(&mut *tx)
                    .await?;

                    if cancelled.rows_affected() == 1 {
                        sqlx::query(
                            "UPDATE events SET booked_count = GREATEST(booked_count - $2, 0) WHERE id = $1",
                        )
                        .bind(line.item_id)
                        .bind(line.quantity as i32)
                        .execute(&mut *tx)
                        .await?;
                    }
                }
                ItemType::DigitalProduct => {
                    let removed = sqlx::query(
                        "DELETE FROM download_grants WHERE order_id = $1 AND product_id = $2",
                    )
                    .bind(order_id.as_uuid())
                    .bind(line.item_id)
                    .execute(&mut *tx)
                    .await?;

                    if removed.rows_affected() == 1 {
                        sqlx::query(
                            "UPDATE digital_products SET download_count = GREATEST(download_count - 1, 0) WHERE id = $1",
                        )
                        .bind(line.item_id)
                        .execute(&mut *tx)
                        .await?;
                    }
                }
            }
        }

        let now = Utc::now();
        sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(order_id.as_uuid())
            .bind(OrderStatus::Refunded.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        order.status = OrderStatus::Refunded;
        order.updated_at = now;
        Ok(order)
    }
}
