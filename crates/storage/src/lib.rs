use anyhow::Result;
use chrono::{DateTime, Utc};
use ctf_platform_models::*;
use uuid::Uuid;

mod memory;
pub use memory::*;

mod postgres;
pub use postgres::*;

/// Outcome of the commit-point insert in the start flow.
///
/// `Conflict` means a concurrent start won the race for the
/// one-running-instance-per-(team, challenge) invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertInstanceOutcome {
    Inserted,
    Conflict,
}

/// Pricing for a solve at a given position, computed by the scoring engine
#[derive(Debug, Clone)]
pub struct SolvePricing {
    pub points: i64,
    pub first_blood_bonus: i64,
    pub badges: Vec<String>,
}

/// Position-to-pricing function handed into the transactional solve insert;
/// must be pure, it may be evaluated inside a held database transaction
pub type PricingFn = dyn Fn(i32) -> SolvePricing + Send + Sync;

/// Outcome of recording a solve
#[derive(Debug, Clone)]
pub enum RecordSolveOutcome {
    Recorded {
        solve: Solve,
        first_blood: Option<FirstBlood>,
    },
    Duplicate,
}

/// Durable record of challenge instances; source of truth for reconciliation
#[async_trait::async_trait]
pub trait InstanceStore: Send + Sync {
    /// Insert a new `running` instance. Must be atomic with respect to the
    /// at-most-one-running invariant: a concurrent insert for the same
    /// (team, challenge) yields `Conflict` for the loser.
    async fn insert_running(&self, instance: &Instance) -> Result<InsertInstanceOutcome>;

    /// The running instance for (team, challenge), if any
    async fn find_running(&self, team_id: Uuid, challenge_id: Uuid) -> Result<Option<Instance>>;

    /// Latest instance row for (team, challenge) regardless of status,
    /// preferring a running one
    async fn find_latest(&self, team_id: Uuid, challenge_id: Uuid) -> Result<Option<Instance>>;

    async fn count_running_by_user(&self, user_id: Uuid) -> Result<u32>;

    async fn count_running_by_team(&self, team_id: Uuid) -> Result<u32>;

    /// Flip status, only if the row is still `running`; returns whether the
    /// row was updated
    async fn transition_from_running(&self, id: Uuid, to: InstanceStatus) -> Result<bool>;

    /// Delete the row; returns whether it existed
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Running instances whose lifetime has elapsed at `now`
    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<Instance>>;
}

/// Per (team, challenge) last-stop timestamps gating restart timing
#[async_trait::async_trait]
pub trait CooldownStore: Send + Sync {
    async fn get(&self, team_id: Uuid, challenge_id: Uuid) -> Result<Option<DateTime<Utc>>>;

    /// Atomic upsert: create the record or overwrite its timestamp
    async fn record(&self, team_id: Uuid, challenge_id: Uuid, at: DateTime<Utc>) -> Result<()>;
}

/// Solves and first-blood awards
#[async_trait::async_trait]
pub trait SolveStore: Send + Sync {
    /// Record a solve atomically: determine the zero-based solve position,
    /// price it via `pricer`, insert the solve (and first blood when the
    /// bonus applies) in one transaction. A (team, challenge) duplicate
    /// yields `Duplicate` and writes nothing.
    async fn record_solve(
        &self,
        challenge_id: Uuid,
        team_id: Uuid,
        user_id: Uuid,
        pricer: &PricingFn,
    ) -> Result<RecordSolveOutcome>;

    async fn solve_count(&self, challenge_id: Uuid) -> Result<i64>;

    async fn find_solve(&self, team_id: Uuid, challenge_id: Uuid) -> Result<Option<Solve>>;

    /// All solves for a challenge ordered by position ascending
    async fn list_for_challenge(&self, challenge_id: Uuid) -> Result<Vec<Solve>>;

    /// Overwrite awarded points; used by admin bulk recalculation only
    async fn update_points(&self, solve_id: Uuid, points: i64) -> Result<()>;
}

/// Read-only challenge catalog access for the core
#[async_trait::async_trait]
pub trait ChallengeStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Challenge>>;
}
