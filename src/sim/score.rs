//! Run scoring
//!
//! A pure function of the run outcome and the live registry at the moment the
//! target was struck. Variety is counted from what is alive at that moment,
//! so anything deleted (or blown up) before the hit does not count.

use serde::{Deserialize, Serialize};

/// Reward for striking the target at all
pub const BASE_REWARD: i64 = 1000;
/// Efficiency bonus with a single entity
pub const BASE_EFFICIENCY: i64 = 500;
/// Efficiency lost per entity beyond the first
pub const PENALTY_PER_EXTRA: i64 = 20;
/// Speed bonus at zero elapsed time
pub const BASE_SPEED: f32 = 500.0;
/// Speed bonus lost per elapsed second
pub const PENALTY_PER_SECOND: f32 = 50.0;
/// Bonus per distinct entity kind
pub const PER_KIND_BONUS: i64 = 100;

/// Collisions needed before the combo multiplier kicks in
pub const COMBO_THRESHOLD: u32 = 5;
/// Multipliers are kept in hundredths so the total rounds exactly
pub const COMBO_BASE_PERCENT: i64 = 110;
pub const COMBO_STEP_PERCENT: i64 = 5;
pub const COMBO_MAX_BONUS_PERCENT: i64 = 50;

/// Totals needed for one, two and three stars
pub const STAR_THRESHOLDS: [i64; 3] = [1000, 2000, 2800];

/// Inputs captured when the run ends
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInput {
    pub triggered: bool,
    /// Live bodies; a seesaw contributes both of its bodies
    pub entity_count: usize,
    pub elapsed_secs: f32,
    pub distinct_kinds: usize,
    pub collisions: u32,
}

/// Individual score components before the multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub base: i64,
    pub efficiency: i64,
    pub speed: i64,
    pub variety: i64,
    /// Combo multiplier in hundredths (100 = x1.0)
    pub multiplier_percent: i64,
}

impl ScoreBreakdown {
    pub fn subtotal(&self) -> i64 {
        self.base + self.efficiency + self.speed + self.variety
    }

    pub fn multiplier(&self) -> f32 {
        self.multiplier_percent as f32 / 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreReport {
    pub total: i64,
    /// 0 only when the target was never struck
    pub stars: u8,
    pub breakdown: ScoreBreakdown,
}

/// Combo multiplier in hundredths for a collision count
pub fn combo_percent(collisions: u32) -> i64 {
    if collisions < COMBO_THRESHOLD {
        return 100;
    }
    let extra = i64::from(collisions - COMBO_THRESHOLD) * COMBO_STEP_PERCENT;
    COMBO_BASE_PERCENT + extra.min(COMBO_MAX_BONUS_PERCENT)
}

/// Stars for a total, at least one
pub fn stars_for(total: i64) -> u8 {
    let [_, two, three] = STAR_THRESHOLDS;
    if total >= three {
        3
    } else if total >= two {
        2
    } else {
        1
    }
}

/// Score a finished run
pub fn score(input: &ScoreInput) -> ScoreReport {
    if !input.triggered {
        return ScoreReport {
            total: 0,
            stars: 0,
            breakdown: ScoreBreakdown {
                multiplier_percent: 100,
                ..Default::default()
            },
        };
    }

    let count = i64::try_from(input.entity_count).unwrap_or(i64::MAX);
    let efficiency = (BASE_EFFICIENCY - (count - 1).saturating_mul(PENALTY_PER_EXTRA)).max(0);
    let speed = ((BASE_SPEED - input.elapsed_secs * PENALTY_PER_SECOND).round() as i64).max(0);
    let variety = i64::try_from(input.distinct_kinds).unwrap_or(0) * PER_KIND_BONUS;

    let breakdown = ScoreBreakdown {
        base: BASE_REWARD,
        efficiency,
        speed,
        variety,
        multiplier_percent: combo_percent(input.collisions),
    };

    // Sum, then multiply, then round (half up)
    let total = (breakdown.subtotal() * breakdown.multiplier_percent + 50).div_euclid(100);

    ScoreReport {
        total,
        stars: stars_for(total),
        breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(entity_count: usize, elapsed_secs: f32, distinct_kinds: usize, collisions: u32) -> ScoreInput {
        ScoreInput {
            triggered: true,
            entity_count,
            elapsed_secs,
            distinct_kinds,
            collisions,
        }
    }

    #[test]
    fn test_single_entity_instant_hit() {
        let report = score(&input(1, 0.0, 1, 0));
        assert_eq!(report.breakdown.base, 1000);
        assert_eq!(report.breakdown.efficiency, 500);
        assert_eq!(report.breakdown.speed, 500);
        assert_eq!(report.breakdown.variety, 100);
        assert_eq!(report.breakdown.multiplier_percent, 100);
        assert_eq!(report.total, 2100);
        assert_eq!(report.stars, 2);
    }

    #[test]
    fn test_combo_applies_after_summing() {
        let report = score(&input(3, 1.0, 3, 12));
        assert_eq!(report.breakdown.subtotal(), 2210);
        assert_eq!(report.breakdown.multiplier_percent, 145);
        assert_eq!(report.total, 3205);
        assert_eq!(report.stars, 3);
    }

    #[test]
    fn test_combo_caps() {
        assert_eq!(combo_percent(4), 100);
        assert_eq!(combo_percent(5), 110);
        assert_eq!(combo_percent(15), 160);
        assert_eq!(combo_percent(500), 160);
    }

    #[test]
    fn test_components_floor_at_zero() {
        let report = score(&input(100, 60.0, 0, 0));
        assert_eq!(report.breakdown.efficiency, 0);
        assert_eq!(report.breakdown.speed, 0);
        assert_eq!(report.total, 1000);
        assert_eq!(report.stars, 1);
    }

    #[test]
    fn test_below_first_threshold_still_one_star() {
        assert_eq!(stars_for(10), 1);
        assert_eq!(stars_for(1999), 1);
        assert_eq!(stars_for(2000), 2);
        assert_eq!(stars_for(2800), 3);
    }

    #[test]
    fn test_no_trigger_scores_nothing() {
        let mut miss = input(1, 0.0, 1, 20);
        miss.triggered = false;
        let report = score(&miss);
        assert_eq!(report.total, 0);
        assert_eq!(report.stars, 0);
    }

    #[test]
    fn test_speed_rounds() {
        let report = score(&input(1, 0.25, 1, 0));
        assert_eq!(report.breakdown.speed, 488); // 487.5 rounds up
    }
}
