use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::collections::HashSet;
use tracing::info;

use super::ImageStore;
use crate::models::image::ImageRecord;

/// PostgreSQL implementation of the primary image store.
pub struct PostgresImageStore {
    pool: PgPool,
}

impl PostgresImageStore {
    pub async fn new(uri: &str, pool_size: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(10))
            .connect(uri)
            .await?;

        info!("Connected to PostgreSQL (pool_size={pool_size})");
        Ok(Self { pool })
    }
}

fn row_to_record(row: &sqlx::postgres::PgRow) -> ImageRecord {
    ImageRecord {
        id: row.get("id"),
        shop: row.get("shop"),
        product_id: row.get("product_id"),
        label: row.get("label"),
        handle: row.get("handle"),
        source_url: row.get("source_url"),
        embedding: row.get::<Vec<f32>, _>("embedding"),
        created_at: row
            .get::<Option<chrono::DateTime<chrono::Utc>>, _>("created_at")
            .map(|dt| dt.to_rfc3339()),
    }
}

#[async_trait]
impl ImageStore for PostgresImageStore {
    async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS images (
                seq BIGSERIAL PRIMARY KEY,
                id VARCHAR(64) NOT NULL UNIQUE,
                shop VARCHAR(255) NOT NULL,
                product_id VARCHAR(255) NOT NULL,
                label TEXT NOT NULL DEFAULT '',
                handle VARCHAR(255) NOT NULL DEFAULT '',
                source_url TEXT NOT NULL UNIQUE,
                embedding REAL[] NOT NULL DEFAULT '{}',
                created_at TIMESTAMP WITH TIME ZONE DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_images_shop ON images(shop)")
            .execute(&self.pool)
            .await?;

        info!("Image store tables initialized");
        Ok(())
    }

    async fn find_comparable(&self, limit: i64) -> anyhow::Result<Vec<ImageRecord>> {
        let rows = sqlx::query(
            "SELECT id, shop, product_id, label, handle, source_url, embedding, created_at
             FROM images
             WHERE cardinality(embedding) > 0
             ORDER BY seq
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn existing_source_urls(&self, urls: &[String]) -> anyhow::Result<HashSet<String>> {
        if urls.is_empty() {
            return Ok(HashSet::new());
        }

        let rows = sqlx::query("SELECT source_url FROM images WHERE source_url = ANY($1)")
            .bind(urls)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| r.get::<String, _>("source_url"))
            .collect())
    }

    async fn insert(&self, record: &ImageRecord) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO images (id, shop, product_id, label, handle, source_url, embedding)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&record.id)
        .bind(&record.shop)
        .bind(&record.product_id)
        .bind(&record.label)
        .bind(&record.handle)
        .bind(&record.source_url)
        .bind(&record.embedding)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
