//! Cooldown record operations

use super::PostgresStorage;
use crate::CooldownStore;
use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait::async_trait]
impl CooldownStore for PostgresStorage {
    async fn get(&self, team_id: Uuid, challenge_id: Uuid) -> Result<Option<DateTime<Utc>>> {
        let at: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            SELECT last_stopped_at FROM instance_cooldowns
            WHERE team_id = $1 AND challenge_id = $2
            "#,
        )
        .bind(team_id)
        .bind(challenge_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(at)
    }

    async fn record(&self, team_id: Uuid, challenge_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        // Stop and kill both land here; the upsert keeps it a single atomic
        // statement with no read-modify-write gap
        sqlx::query(
            r#"
            INSERT INTO instance_cooldowns (team_id, challenge_id, last_stopped_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (team_id, challenge_id)
            DO UPDATE SET last_stopped_at = EXCLUDED.last_stopped_at
            "#,
        )
        .bind(team_id)
        .bind(challenge_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
