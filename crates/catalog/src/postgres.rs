//! PostgreSQL-backed catalog store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ItemType, Money};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::CatalogError;
use crate::item::{CatalogItem, Course, DigitalProduct, EventItem};
use crate::store::CatalogStore;

/// Catalog reads against the courses/events/digital_products tables.
#[derive(Debug, Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    /// Creates a new PostgreSQL catalog store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_course(row: &PgRow) -> Result<Course, CatalogError> {
        Ok(Course {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            is_published: row.try_get("is_published")?,
            deleted_at: row.try_get::<Option<DateTime<Utc>>, _>("deleted_at")?,
            enrolled_count: row.try_get::<i32, _>("enrolled_count")? as u32,
        })
    }

    fn row_to_event(row: &PgRow) -> Result<EventItem, CatalogError> {
        Ok(EventItem {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            is_published: row.try_get("is_published")?,
            deleted_at: row.try_get::<Option<DateTime<Utc>>, _>("deleted_at")?,
            start_time: row.try_get("start_time")?,
            capacity: row.try_get::<i32, _>("capacity")? as u32,
            booked_count: row.try_get::<i32, _>("booked_count")? as u32,
        })
    }

    fn row_to_product(row: &PgRow) -> Result<DigitalProduct, CatalogError> {
        Ok(DigitalProduct {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            is_published: row.try_get("is_published")?,
            deleted_at: row.try_get::<Option<DateTime<Utc>>, _>("deleted_at")?,
            download_count: row.try_get::<i32, _>("download_count")? as u32,
        })
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalog {
    async fn get(
        &self,
        item_type: ItemType,
        item_id: Uuid,
    ) -> Result<Option<CatalogItem>, CatalogError> {
        let item = match item_type {
            ItemType::Course => sqlx::query(
                r#"
                SELECT id, title, price_cents, is_published, deleted_at, enrolled_count
                FROM courses
                WHERE id = $1
                "#,
            )
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| Self::row_to_course(&row).map(CatalogItem::Course))
            .transpose()?,
            ItemType::Event => sqlx::query(
                r#"
                SELECT id, title, price_cents, is_published, deleted_at,
                       start_time, capacity, booked_count
                FROM events
                WHERE id = $1
                "#,
            )
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| Self::row_to_event(&row).map(CatalogItem::Event))
            .transpose()?,
            ItemType::DigitalProduct => sqlx::query(
                r#"
                SELECT id, title, price_cents, is_published, deleted_at, download_count
                FROM digital_products
                WHERE id = $1
                "#,
            )
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| Self::row_to_product(&row).map(CatalogItem::DigitalProduct))
            .transpose()?,
        };

        Ok(item)
    }
}
