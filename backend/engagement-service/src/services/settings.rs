//! Per-user playback settings

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::Settings;
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsUpdate {
    pub autoplay_on_wifi: Option<bool>,
    pub autoplay_on_mobile: Option<bool>,
}

#[derive(Clone)]
pub struct SettingsService {
    pool: PgPool,
}

impl SettingsService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Settings for a user; defaults are materialized on first read
    pub async fn get_settings(&self, owner_id: Uuid) -> Result<Settings> {
        let settings = sqlx::query_as::<_, Settings>(
            r#"
            INSERT INTO settings (owner_id)
            VALUES ($1)
            ON CONFLICT (owner_id) DO UPDATE SET owner_id = EXCLUDED.owner_id
            RETURNING id, owner_id, autoplay_on_wifi, autoplay_on_mobile, updated_at
            "#,
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(settings)
    }

    /// Upsert the provided toggles, leaving the rest unchanged
    pub async fn update_settings(
        &self,
        owner_id: Uuid,
        update: SettingsUpdate,
    ) -> Result<Settings> {
        let settings = sqlx::query_as::<_, Settings>(
            r#"
            INSERT INTO settings (owner_id, autoplay_on_wifi, autoplay_on_mobile)
            VALUES ($1, COALESCE($2, TRUE), COALESCE($3, FALSE))
            ON CONFLICT (owner_id) DO UPDATE
            SET autoplay_on_wifi = COALESCE($2, settings.autoplay_on_wifi),
                autoplay_on_mobile = COALESCE($3, settings.autoplay_on_mobile),
                updated_at = NOW()
            RETURNING id, owner_id, autoplay_on_wifi, autoplay_on_mobile, updated_at
            "#,
        )
        .bind(owner_id)
        .bind(update.autoplay_on_wifi)
        .bind(update.autoplay_on_mobile)
        .fetch_one(&self.pool)
        .await?;

        Ok(settings)
    }
}
