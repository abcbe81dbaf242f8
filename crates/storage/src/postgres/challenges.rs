//! Challenge catalog reads

use super::rows::ChallengeRow;
use super::PostgresStorage;
use crate::ChallengeStore;
use anyhow::Result;
use ctf_platform_models::*;
use uuid::Uuid;

#[async_trait::async_trait]
impl ChallengeStore for PostgresStorage {
    async fn get(&self, id: Uuid) -> Result<Option<Challenge>> {
        let row = sqlx::query_as::<_, ChallengeRow>(
            r#"
            SELECT id, slug, title, kind, base_points, flag, decay,
                   declared_ports, enable_first_blood, first_blood_bonuses,
                   first_blood_badges, connection_template, image,
                   compose_yaml, instance_timeout_secs, created_at, updated_at
            FROM challenges
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Challenge::from))
    }
}
