use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{LedgerEntry, LedgerEntryRow};

/// Append-only entry store queryable by day key.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert(&self, entry: &LedgerEntry) -> anyhow::Result<()>;
    /// Returns false when no entry had this id.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
    /// Newest first.
    async fn list_for_day(&self, day: &str) -> anyhow::Result<Vec<LedgerEntry>>;
}

#[derive(Clone)]
pub struct PgLedgerStore {
    db: PgPool,
}

impl PgLedgerStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn insert(&self, e: &LedgerEntry) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO food_log (id, name, brand, calories, protein_g, carbs_g, fat_g,
                                  fiber_g, sugar_g, sodium_mg, saturated_fat_g,
                                  meal_type, portion_grams, image_url, logged_at, day_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(e.id)
        .bind(&e.name)
        .bind(&e.brand)
        .bind(e.calories)
        .bind(e.protein_g)
        .bind(e.carbs_g)
        .bind(e.fat_g)
        .bind(e.fiber_g)
        .bind(e.sugar_g)
        .bind(e.sodium_mg)
        .bind(e.saturated_fat_g)
        .bind(e.meal_type.as_str())
        .bind(e.portion_grams)
        .bind(&e.image_url) // NULL allowed
        .bind(e.logged_at)
        .bind(&e.day)
        .execute(&self.db)
        .await
        .context("insert food_log entry")?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM food_log WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete food_log entry")?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_for_day(&self, day: &str) -> anyhow::Result<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerEntryRow>(
            r#"
            SELECT id, name, brand, calories, protein_g, carbs_g, fat_g,
                   fiber_g, sugar_g, sodium_mg, saturated_fat_g,
                   meal_type, portion_grams, image_url, logged_at, day_key
              FROM food_log
             WHERE day_key = $1
             ORDER BY logged_at DESC
            "#,
        )
        .bind(day)
        .fetch_all(&self.db)
        .await
        .with_context(|| format!("list food_log for {day}"))?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }
}
