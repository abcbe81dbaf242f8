//! Flag submission and solve bookkeeping

use crate::decay;
use ctf_platform_events::EventHub;
use ctf_platform_instancer::InstanceService;
use ctf_platform_models::*;
use ctf_platform_storage::{ChallengeStore, RecordSolveOutcome, SolveStore};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Prices and records solves, and triggers instance teardown on success
pub struct SolveService {
    challenges: Arc<dyn ChallengeStore>,
    solves: Arc<dyn SolveStore>,
    events: Arc<EventHub>,
    instancer: Arc<InstanceService>,
}

impl SolveService {
    pub fn new(
        challenges: Arc<dyn ChallengeStore>,
        solves: Arc<dyn SolveStore>,
        events: Arc<EventHub>,
        instancer: Arc<InstanceService>,
    ) -> Arc<Self> {
        Arc::new(Self {
            challenges,
            solves,
            events,
            instancer,
        })
    }

    /// Judge a flag submission.
    ///
    /// A wrong flag is a normal rejected outcome, not an error. A correct
    /// flag is priced at the team's solve position and recorded exactly
    /// once; the team's running instance is then torn down best-effort,
    /// without any failure reaching the solver.
    pub async fn submit_flag(
        &self,
        actor: Actor,
        challenge_id: Uuid,
        submission: &str,
    ) -> PlatformResult<SubmitFlagOutcome> {
        let challenge = self
            .challenges
            .get(challenge_id)
            .await?
            .ok_or_else(|| PlatformError::ChallengeNotFound {
                id: challenge_id.to_string(),
            })?;

        if !flags_match(&challenge.flag, submission.trim()) {
            info!(
                team_id = %actor.team_id,
                challenge = %challenge.slug,
                "Flag rejected"
            );
            return Ok(SubmitFlagOutcome::rejected());
        }

        let challenge_for_pricer = challenge.clone();
        let pricer = move |position: i32| decay::price_solve(&challenge_for_pricer, position);
        let outcome = self
            .solves
            .record_solve(challenge_id, actor.team_id, actor.user_id, &pricer)
            .await?;

        let (solve, first_blood) = match outcome {
            RecordSolveOutcome::Duplicate => return Err(PlatformError::AlreadySolved),
            RecordSolveOutcome::Recorded { solve, first_blood } => (solve, first_blood),
        };

        // The solve is committed; teardown and fan-out must not fail it
        self.instancer
            .stop_on_solve(actor.team_id, challenge_id)
            .await;

        self.events
            .publish_to_team_except(
                actor.team_id,
                actor.user_id,
                TeamEvent::new(EventKind::ChallengeSolved, actor.team_id, challenge_id)
                    .with_message(format!("{} solved for {} points", challenge.title, solve.points)),
            )
            .await;

        if let Some(fb) = &first_blood {
            self.events
                .publish_to_team_except(
                    actor.team_id,
                    Uuid::nil(),
                    TeamEvent::new(EventKind::FirstBlood, actor.team_id, challenge_id)
                        .with_message(format!("First blood #{} on {}", fb.position + 1, challenge.title)),
                )
                .await;
        }

        info!(
            team_id = %actor.team_id,
            challenge = %challenge.slug,
            position = solve.position,
            points = solve.points,
            "Flag accepted"
        );

        Ok(SubmitFlagOutcome {
            solved: true,
            points_awarded: Some(solve.points),
            first_blood_bonus: first_blood.map(|fb| fb.bonus),
        })
    }

    /// Points the next solver would receive right now, for display
    pub async fn current_points(&self, challenge_id: Uuid) -> PlatformResult<i64> {
        let challenge = self
            .challenges
            .get(challenge_id)
            .await?
            .ok_or_else(|| PlatformError::ChallengeNotFound {
                id: challenge_id.to_string(),
            })?;
        let solve_count = self.solves.solve_count(challenge_id).await?;
        Ok(decay::current_points(&challenge, solve_count))
    }

    /// Admin bulk recalculation: reprice every solve at its stored position.
    /// Frozen-position semantics keep earlier solves stable; only solves
    /// whose formula changed under them are rewritten. Returns the number
    /// of updated solves.
    pub async fn recalculate_challenge(&self, challenge_id: Uuid) -> PlatformResult<u32> {
        let challenge = self
            .challenges
            .get(challenge_id)
            .await?
            .ok_or_else(|| PlatformError::ChallengeNotFound {
                id: challenge_id.to_string(),
            })?;

        let solves = self.solves.list_for_challenge(challenge_id).await?;
        let mut updated = 0;

        for solve in solves {
            let repriced = decay::points_at_position(&challenge, solve.position)
                + decay::first_blood_bonus(&challenge, solve.position);
            if repriced != solve.points {
                if let Err(e) = self.solves.update_points(solve.id, repriced).await {
                    warn!(solve_id = %solve.id, error = %e, "Failed to reprice solve");
                    continue;
                }
                updated += 1;
            }
        }

        info!(challenge = %challenge.slug, updated = updated, "Challenge scores recalculated");
        Ok(updated)
    }
}

/// Constant-time flag comparison; rejects on length mismatch
fn flags_match(expected: &str, submitted: &str) -> bool {
    let expected = expected.as_bytes();
    let submitted = submitted.as_bytes();
    if expected.len() != submitted.len() {
        return false;
    }
    expected
        .iter()
        .zip(submitted)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
