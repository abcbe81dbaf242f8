//! Instance store operations

use super::{rows::InstanceRow, PostgresStorage};
use crate::{InsertInstanceOutcome, InstanceStore};
use anyhow::Result;
use chrono::{DateTime, Utc};
use ctf_platform_models::*;
use uuid::Uuid;

#[async_trait::async_trait]
impl InstanceStore for PostgresStorage {
    async fn insert_running(&self, instance: &Instance) -> Result<InsertInstanceOutcome> {
        let ports: Vec<i32> = instance.assigned_ports.iter().map(|p| *p as i32).collect();

        // The partial unique index on (team_id, challenge_id) WHERE
        // status = 'running' arbitrates concurrent starts; the loser's
        // insert affects zero rows
        let result = sqlx::query(
            r#"
            INSERT INTO instances (
                id, container_ref, user_id, team_id, challenge_id,
                assigned_ports, created_at, expires_at, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'running')
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(instance.id)
        .bind(&instance.container_ref)
        .bind(instance.user_id)
        .bind(instance.team_id)
        .bind(instance.challenge_id)
        .bind(&ports)
        .bind(instance.created_at)
        .bind(instance.expires_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Ok(InsertInstanceOutcome::Conflict)
        } else {
            Ok(InsertInstanceOutcome::Inserted)
        }
    }

    async fn find_running(&self, team_id: Uuid, challenge_id: Uuid) -> Result<Option<Instance>> {
        let row = sqlx::query_as::<_, InstanceRow>(
            r#"
            SELECT id, container_ref, user_id, team_id, challenge_id,
                   assigned_ports, created_at, expires_at, status
            FROM instances
            WHERE team_id = $1 AND challenge_id = $2 AND status = 'running'
            "#,
        )
        .bind(team_id)
        .bind(challenge_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Instance::from))
    }

    async fn find_latest(&self, team_id: Uuid, challenge_id: Uuid) -> Result<Option<Instance>> {
        let row = sqlx::query_as::<_, InstanceRow>(
            r#"
            SELECT id, container_ref, user_id, team_id, challenge_id,
                   assigned_ports, created_at, expires_at, status
            FROM instances
            WHERE team_id = $1 AND challenge_id = $2
            ORDER BY (status = 'running') DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(team_id)
        .bind(challenge_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Instance::from))
    }

    async fn count_running_by_user(&self, user_id: Uuid) -> Result<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM instances WHERE user_id = $1 AND status = 'running'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u32)
    }

    async fn count_running_by_team(&self, team_id: Uuid) -> Result<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM instances WHERE team_id = $1 AND status = 'running'",
        )
        .bind(team_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u32)
    }

    async fn transition_from_running(&self, id: Uuid, to: InstanceStatus) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE instances SET status = $2 WHERE id = $1 AND status = 'running'",
        )
        .bind(id)
        .bind(to.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM instances WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Instance>> {
        let rows = sqlx::query_as::<_, InstanceRow>(
            r#"
            SELECT id, container_ref, user_id, team_id, challenge_id,
                   assigned_ports, created_at, expires_at, status
            FROM instances
            WHERE status = 'running' AND expires_at < $1
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Instance::from).collect())
    }
}
