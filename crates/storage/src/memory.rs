//! In-memory store implementations.
//!
//! Used by unit and integration tests; each mutating method holds the lock
//! for its whole check-and-write so the concurrency invariants match the
//! transactional guarantees of the PostgreSQL backend.

use crate::{
    ChallengeStore, CooldownStore, InsertInstanceOutcome, InstanceStore, PricingFn,
    RecordSolveOutcome, SolveStore,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use ctf_platform_models::*;
use std::collections::HashMap;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// In-memory instance store
#[derive(Default)]
pub struct MemoryInstanceStore {
    instances: Mutex<HashMap<Uuid, Instance>>,
}

impl MemoryInstanceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl InstanceStore for MemoryInstanceStore {
    async fn insert_running(&self, instance: &Instance) -> Result<InsertInstanceOutcome> {
        let mut instances = self.instances.lock().await;
        let conflict = instances.values().any(|i| {
            i.team_id == instance.team_id
                && i.challenge_id == instance.challenge_id
                && i.status == InstanceStatus::Running
        });
        if conflict {
            return Ok(InsertInstanceOutcome::Conflict);
        }
        instances.insert(instance.id, instance.clone());
        Ok(InsertInstanceOutcome::Inserted)
    }

    async fn find_running(&self, team_id: Uuid, challenge_id: Uuid) -> Result<Option<Instance>> {
        let instances = self.instances.lock().await;
        Ok(instances
            .values()
            .find(|i| {
                i.team_id == team_id
                    && i.challenge_id == challenge_id
                    && i.status == InstanceStatus::Running
            })
            .cloned())
    }

    async fn find_latest(&self, team_id: Uuid, challenge_id: Uuid) -> Result<Option<Instance>> {
        let instances = self.instances.lock().await;
        let mut rows: Vec<&Instance> = instances
            .values()
            .filter(|i| i.team_id == team_id && i.challenge_id == challenge_id)
            .collect();
        rows.sort_by_key(|i| (i.status == InstanceStatus::Running, i.created_at));
        Ok(rows.last().cloned().cloned())
    }

    async fn count_running_by_user(&self, user_id: Uuid) -> Result<u32> {
        let instances = self.instances.lock().await;
        Ok(instances
            .values()
            .filter(|i| i.user_id == user_id && i.status == InstanceStatus::Running)
            .count() as u32)
    }

    async fn count_running_by_team(&self, team_id: Uuid) -> Result<u32> {
        let instances = self.instances.lock().await;
        Ok(instances
            .values()
            .filter(|i| i.team_id == team_id && i.status == InstanceStatus::Running)
            .count() as u32)
    }

    async fn transition_from_running(&self, id: Uuid, to: InstanceStatus) -> Result<bool> {
        let mut instances = self.instances.lock().await;
        match instances.get_mut(&id) {
            Some(instance) if instance.status == InstanceStatus::Running => {
                instance.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut instances = self.instances.lock().await;
        Ok(instances.remove(&id).is_some())
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Instance>> {
        let instances = self.instances.lock().await;
        Ok(instances
            .values()
            .filter(|i| i.status == InstanceStatus::Running && now > i.expires_at)
            .cloned()
            .collect())
    }
}

/// In-memory cooldown store
#[derive(Default)]
pub struct MemoryCooldownStore {
    records: Mutex<HashMap<(Uuid, Uuid), DateTime<Utc>>>,
}

impl MemoryCooldownStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CooldownStore for MemoryCooldownStore {
    async fn get(&self, team_id: Uuid, challenge_id: Uuid) -> Result<Option<DateTime<Utc>>> {
        let records = self.records.lock().await;
        Ok(records.get(&(team_id, challenge_id)).copied())
    }

    async fn record(&self, team_id: Uuid, challenge_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut records = self.records.lock().await;
        records.insert((team_id, challenge_id), at);
        Ok(())
    }
}

/// In-memory solve store
#[derive(Default)]
pub struct MemorySolveStore {
    inner: Mutex<SolveTables>,
}

#[derive(Default)]
struct SolveTables {
    solves: Vec<Solve>,
    first_bloods: Vec<FirstBlood>,
}

impl MemorySolveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn first_bloods_for(&self, challenge_id: Uuid) -> Vec<FirstBlood> {
        let inner = self.inner.lock().await;
        inner
            .first_bloods
            .iter()
            .filter(|fb| fb.challenge_id == challenge_id)
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl SolveStore for MemorySolveStore {
    async fn record_solve(
        &self,
        challenge_id: Uuid,
        team_id: Uuid,
        user_id: Uuid,
        pricer: &PricingFn,
    ) -> Result<RecordSolveOutcome> {
        let mut inner = self.inner.lock().await;

        let duplicate = inner
            .solves
            .iter()
            .any(|s| s.team_id == team_id && s.challenge_id == challenge_id);
        if duplicate {
            return Ok(RecordSolveOutcome::Duplicate);
        }

        let position = inner
            .solves
            .iter()
            .filter(|s| s.challenge_id == challenge_id)
            .count() as i32;
        let pricing = pricer(position);
        let now = Utc::now();

        let solve = Solve {
            id: Uuid::new_v4(),
            team_id,
            challenge_id,
            user_id,
            points: pricing.points + pricing.first_blood_bonus,
            position,
            created_at: now,
        };
        inner.solves.push(solve.clone());

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
            inner.first_bloods.push(fb.clone());
            Some(fb)
        } else {
            None
        };

        Ok(RecordSolveOutcome::Recorded { solve, first_blood })
    }

    async fn solve_count(&self, challenge_id: Uuid) -> Result<i64> {
        let inner = self.inner.lock().await;
        Ok(inner
            .solves
            .iter()
            .filter(|s| s.challenge_id == challenge_id)
            .count() as i64)
    }

    async fn find_solve(&self, team_id: Uuid, challenge_id: Uuid) -> Result<Option<Solve>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .solves
            .iter()
            .find(|s| s.team_id == team_id && s.challenge_id == challenge_id)
            .cloned())
    }

    async fn list_for_challenge(&self, challenge_id: Uuid) -> Result<Vec<Solve>> {
        let inner = self.inner.lock().await;
        let mut solves: Vec<Solve> = inner
            .solves
            .iter()
            .filter(|s| s.challenge_id == challenge_id)
            .cloned()
            .collect();
        solves.sort_by_key(|s| s.position);
        Ok(solves)
    }

    async fn update_points(&self, solve_id: Uuid, points: i64) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(solve) = inner.solves.iter_mut().find(|s| s.id == solve_id) {
            solve.points = points;
        }
        Ok(())
    }
}

/// In-memory challenge catalog
#[derive(Default)]
pub struct MemoryChallengeStore {
    challenges: RwLock<HashMap<Uuid, Challenge>>,
}

impl MemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, challenge: Challenge) {
        let mut challenges = self.challenges.write().await;
        challenges.insert(challenge.id, challenge);
    }
}

#[async_trait::async_trait]
impl ChallengeStore for MemoryChallengeStore {
    async fn get(&self, id: Uuid) -> Result<Option<Challenge>> {
        let challenges = self.challenges.read().await;
        Ok(challenges.get(&id).cloned())
    }
}
