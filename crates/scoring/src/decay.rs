//! Point-decay computation
//!
//! Two entry points with distinct time semantics: `current_points` prices a
//! challenge against its live solve count (display), `points_at_position`
//! prices a solve at a frozen position (awarding and recomputation), so
//! historical awards stay stable as later solves land.

use ctf_platform_models::{Challenge, DecayFormula, DecayKind};
use ctf_platform_storage::SolvePricing;

/// Points the next solver would currently receive, before any bonus
pub fn current_points(challenge: &Challenge, solve_count: i64) -> i64 {
    match &challenge.decay {
        None => challenge.base_points,
        Some(formula) => decayed_points(challenge.base_points, formula, solve_count),
    }
}

/// Points for the solve at a zero-based position. The solver at position N
/// sees the decay produced by the N solves before theirs.
pub fn points_at_position(challenge: &Challenge, position: i32) -> i64 {
    current_points(challenge, position.max(0) as i64)
}

/// First-blood bonus by solve position; zero when disabled or out of range
pub fn first_blood_bonus(challenge: &Challenge, position: i32) -> i64 {
    if !challenge.enable_first_blood || position < 0 {
        return 0;
    }
    challenge
        .first_blood_bonuses
        .get(position as usize)
        .copied()
        .unwrap_or(0)
}

/// Badge awarded at a solve position, when one is configured for it
pub fn first_blood_badges(challenge: &Challenge, position: i32) -> Vec<String> {
    if !challenge.enable_first_blood || position < 0 {
        return vec![];
    }
    challenge
        .first_blood_badges
        .get(position as usize)
        .map(|badge| vec![badge.clone()])
        .unwrap_or_default()
}

/// Full pricing for a solve at a position
pub fn price_solve(challenge: &Challenge, position: i32) -> SolvePricing {
    SolvePricing {
        points: points_at_position(challenge, position),
        first_blood_bonus: first_blood_bonus(challenge, position),
        badges: first_blood_badges(challenge, position),
    }
}

fn decayed_points(base: i64, formula: &DecayFormula, solve_count: i64) -> i64 {
    match formula.kind {
        DecayKind::None => base,
        // Custom formulas are not evaluated yet; they award base points
        DecayKind::Custom => base,
        DecayKind::Linear => {
            let cap = (base as f64 * formula.max_decay).floor() as i64;
            let decay = solve_count
                .saturating_mul(formula.linear_step)
                .clamp(0, cap.max(0));
            (base - decay).max(formula.min_points)
        }
        DecayKind::Logarithmic => {
            let log_base = if formula.logarithmic_base > 1.0 {
                formula.logarithmic_base
            } else {
                2.0
            };
            let factor = ((solve_count + 1) as f64).log(log_base) * formula.decay_rate;
            let factor = factor.clamp(0.0, formula.max_decay);
            let decay = (base as f64 * factor).floor() as i64;
            (base - decay).max(formula.min_points)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn challenge_with(decay: Option<DecayFormula>, base_points: i64) -> Challenge {
        Challenge {
            id: Uuid::new_v4(),
            slug: "pwn-warmup".to_string(),
            title: "Pwn Warmup".to_string(),
            kind: ctf_platform_models::ChallengeKind::Container,
            base_points,
            flag: "flag{test}".to_string(),
            decay,
            declared_ports: vec![31337],
            enable_first_blood: false,
            first_blood_bonuses: vec![],
            first_blood_badges: vec![],
            connection_template: None,
            image: None,
            compose_yaml: None,
            instance_timeout_secs: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn linear_formula() -> DecayFormula {
        DecayFormula {
            id: Uuid::new_v4(),
            kind: DecayKind::Linear,
            min_points: 10,
            max_decay: 0.5,
            decay_rate: 0.0,
            linear_step: 5,
            logarithmic_base: 2.0,
        }
    }

    #[test]
    fn no_decay_returns_base_points() {
        let challenge = challenge_with(None, 500);
        assert_eq!(current_points(&challenge, 0), 500);
        assert_eq!(current_points(&challenge, 1000), 500);
    }

    #[test]
    fn linear_decay_with_max_decay_cap() {
        let challenge = challenge_with(Some(linear_formula()), 100);
        assert_eq!(current_points(&challenge, 0), 100);
        assert_eq!(current_points(&challenge, 5), 75);
        // Max decay caps total decay at base_points * 0.5 = 50
        assert_eq!(current_points(&challenge, 10), 50);
        assert_eq!(current_points(&challenge, 20), 50);
    }

    #[test]
    fn logarithmic_decay() {
        let formula = DecayFormula {
            id: Uuid::new_v4(),
            kind: DecayKind::Logarithmic,
            min_points: 10,
            max_decay: 0.8,
            decay_rate: 0.3,
            linear_step: 0,
            logarithmic_base: 2.0,
        };
        let challenge = challenge_with(Some(formula), 100);
        // log2(3 + 1) = 2, factor = 0.6, decay = 60
        assert_eq!(current_points(&challenge, 3), 40);
    }

    #[test]
    fn decay_is_monotonically_non_increasing_with_floor() {
        let challenge = challenge_with(Some(linear_formula()), 100);
        let mut previous = i64::MAX;
        for solve_count in 0..50 {
            let points = current_points(&challenge, solve_count);
            assert!(points <= previous);
            assert!(points >= 10);
            previous = points;
        }
    }

    #[test]
    fn custom_formula_awards_base_points() {
        let formula = DecayFormula {
            kind: DecayKind::Custom,
            ..linear_formula()
        };
        let challenge = challenge_with(Some(formula), 250);
        assert_eq!(current_points(&challenge, 30), 250);
    }

    #[test]
    fn position_pricing_matches_prior_solve_count() {
        let challenge = challenge_with(Some(linear_formula()), 100);
        // The first solver sees no decay
        assert_eq!(points_at_position(&challenge, 0), 100);
        assert_eq!(points_at_position(&challenge, 5), 75);
    }

    #[test]
    fn first_blood_bonus_by_position() {
        let mut challenge = challenge_with(None, 100);
        challenge.enable_first_blood = true;
        challenge.first_blood_bonuses = vec![50, 25, 10];

        assert_eq!(first_blood_bonus(&challenge, 0), 50);
        assert_eq!(first_blood_bonus(&challenge, 2), 10);
        // Index past the bonus list means no bonus
        assert_eq!(first_blood_bonus(&challenge, 3), 0);
    }

    #[test]
    fn first_blood_bonus_requires_enablement() {
        let mut challenge = challenge_with(None, 100);
        challenge.first_blood_bonuses = vec![50];
        assert_eq!(first_blood_bonus(&challenge, 0), 0);
    }
}
