use crate::config::EngagementConfig;
use crate::models::ActivityCounters;

/// Sub-scores in [0, 1] that make up an engagement score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngagementBreakdown {
    pub time_score: f64,
    pub interaction_score: f64,
    pub continuous_score: f64,
}

/// Engagement score in 0..=100 using a 3-factor weighted average.
pub fn score(counters: &ActivityCounters, config: &EngagementConfig) -> u8 {
    let breakdown = breakdown(counters, config);

    let weighted = config.weight_time * breakdown.time_score
        + config.weight_interaction * breakdown.interaction_score
        + config.weight_continuous * breakdown.continuous_score;

    (weighted * 100.0).round().clamp(0.0, 100.0) as u8
}

pub fn breakdown(counters: &ActivityCounters, config: &EngagementConfig) -> EngagementBreakdown {
    EngagementBreakdown {
        time_score: saturate(ms_to_secs(counters.cumulative_focus_ms), config.time_threshold_secs),
        interaction_score: saturate(counters.interactions as f64, config.interaction_threshold),
        continuous_score: saturate(
            ms_to_secs(counters.continuous_focus_ms),
            config.continuous_threshold_secs,
        ),
    }
}

/// `min(raw / threshold, 1)`; a non-positive threshold counts as already saturated.
fn saturate(raw: f64, threshold: f64) -> f64 {
    if threshold <= 0.0 {
        return 1.0;
    }
    (raw / threshold).clamp(0.0, 1.0)
}

fn ms_to_secs(ms: u64) -> f64 {
    ms as f64 / 1_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(cumulative_secs: u64, interactions: u64, continuous_secs: u64) -> ActivityCounters {
        ActivityCounters {
            cumulative_focus_ms: cumulative_secs * 1_000,
            continuous_focus_ms: continuous_secs * 1_000,
            interactions,
            ..ActivityCounters::default()
        }
    }

    #[test]
    fn idle_item_scores_zero() {
        assert_eq!(score(&ActivityCounters::default(), &EngagementConfig::default()), 0);
    }

    #[test]
    fn saturates_at_thresholds() {
        let config = EngagementConfig::default();
        assert_eq!(score(&counters(300, 20, 180), &config), 100);
        assert_eq!(score(&counters(3_000, 500, 1_800), &config), 100);
    }

    #[test]
    fn weights_each_factor() {
        let config = EngagementConfig::default();
        // Only time saturated: 0.4
        assert_eq!(score(&counters(300, 0, 0), &config), 40);
        // Half of each: 0.5
        assert_eq!(score(&counters(150, 10, 90), &config), 50);
        // Only interactions saturated: 0.3
        assert_eq!(score(&counters(0, 20, 0), &config), 30);
    }

    #[test]
    fn stays_in_range_and_is_monotonic_per_input() {
        let config = EngagementConfig::default();
        let steps = [0u64, 1, 30, 90, 150, 179, 180, 181, 299, 300, 301, 10_000];

        for &fixed in &[0u64, 60, 400] {
            let mut previous = (0u8, 0u8, 0u8);
            for &step in &steps {
                let by_time = score(&counters(step, fixed, fixed), &config);
                let by_interactions = score(&counters(fixed, step, fixed), &config);
                let by_continuous = score(&counters(fixed, fixed, step), &config);

                for value in [by_time, by_interactions, by_continuous] {
                    assert!(value <= 100);
                }
                assert!(by_time >= previous.0);
                assert!(by_interactions >= previous.1);
                assert!(by_continuous >= previous.2);
                previous = (by_time, by_interactions, by_continuous);
            }
        }
    }

    #[test]
    fn zero_threshold_counts_as_saturated() {
        let config = EngagementConfig {
            interaction_threshold: 0.0,
            ..EngagementConfig::default()
        };
        assert_eq!(score(&counters(0, 0, 0), &config), 30);
    }
}
