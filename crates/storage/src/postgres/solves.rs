//! Solve and first-blood operations

use super::rows::SolveRow;
use super::PostgresStorage;
use crate::{PricingFn, RecordSolveOutcome, SolveStore};
use anyhow::Result;
use chrono::Utc;
use ctf_platform_models::*;
use tracing::info;
use uuid::Uuid;

#[async_trait::async_trait]
impl SolveStore for PostgresStorage {
    async fn record_solve(
        &self,
        challenge_id: Uuid,
        team_id: Uuid,
        user_id: Uuid,
        pricer: &PricingFn,
    ) -> Result<RecordSolveOutcome> {
        let mut tx = self.pool.begin().await?;

        // Serialize position assignment per challenge: concurrent solvers
        // queue on the challenge row so no two solves share a position
        sqlx::query("SELECT id FROM challenges WHERE id = $1 FOR UPDATE")
            .bind(challenge_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Challenge {} not found", challenge_id))?;

        let position: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM solves WHERE challenge_id = $1")
                .bind(challenge_id)
                .fetch_one(&mut *tx)
                .await?;
        let position = position as i32;

        let pricing = pricer(position);
        let total_points = pricing.points + pricing.first_blood_bonus;
        let solve_id = Uuid::new_v4();
        let now = Utc::now();

        let inserted = sqlx::query(
            r#"
            INSERT INTO solves (id, team_id, challenge_id, user_id, points, position, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (team_id, challenge_id) DO NOTHING
            "#,
        )
        .bind(solve_id)
        .bind(team_id)
        .bind(challenge_id)
        .bind(user_id)
        .bind(total_points)
        .bind(position)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(RecordSolveOutcome::Duplicate);
        }

        let first_blood = if pricing.first_blood_bonus > 0 || !pricing.badges.is_empty() {
            let fb = FirstBlood {
                id: Uuid::new_v4(),
                challenge_id,
                team_id,
                user_id,
                position,
                bonus: pricing.first_blood_bonus,
                badges: pricing.badges,
                created_at: now,
            };

            sqlx::query(
                r#"
                INSERT INTO first_bloods (id, challenge_id, team_id, user_id, position, bonus, badges, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(fb.id)
            .bind(fb.challenge_id)
            .bind(fb.team_id)
            .bind(fb.user_id)
            .bind(fb.position)
            .bind(fb.bonus)
            .bind(&fb.badges)
            .bind(fb.created_at)
            .execute(&mut *tx)
            .await?;

            Some(fb)
        } else {
            None
        };

        tx.commit().await?;

        info!(
            challenge_id = %challenge_id,
            team_id = %team_id,
            position = position,
            points = total_points,
            "Solve recorded"
        );

        Ok(RecordSolveOutcome::Recorded {
            solve: Solve {
                id: solve_id,
                team_id,
                challenge_id,
                user_id,
                points: total_points,
                position,
                created_at: now,
            },
            first_blood,
        })
    }

    async fn solve_count(&self, challenge_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM solves WHERE challenge_id = $1")
            .bind(challenge_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn find_solve(&self, team_id: Uuid, challenge_id: Uuid) -> Result<Option<Solve>> {
        let row = sqlx::query_as::<_, SolveRow>(
            r#"
            SELECT id, team_id, challenge_id, user_id, points, position, created_at
            FROM solves
            WHERE team_id = $1 AND challenge_id = $2
            "#,
        )
        .bind(team_id)
        .bind(challenge_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Solve::from))
    }

    async fn list_for_challenge(&self, challenge_id: Uuid) -> Result<Vec<Solve>> {
        let rows = sqlx::query_as::<_, SolveRow>(
            r#"
            SELECT id, team_id, challenge_id, user_id, points, position, created_at
            FROM solves
            WHERE challenge_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(challenge_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Solve::from).collect())
    }

    async fn update_points(&self, solve_id: Uuid, points: i64) -> Result<()> {
        sqlx::query("UPDATE solves SET points = $2 WHERE id = $1")
            .bind(solve_id)
            .bind(points)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
