// src/classification.rs - Efficacy verdicts from an ordered rule table

use serde::{Deserialize, Serialize};

/// Efficacy tiers, ordered from lowest to highest so `Ord` follows quality
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EfficacyTier {
    NeedsImprovement,
    Fair,
    Good,
    Excellent,
}

impl EfficacyTier {
    /// Verdict sentence reported to the user
    pub fn verdict(&self) -> &'static str {
        match self {
            EfficacyTier::Excellent => {
                "Excellent: protects against plant diseases, weeds, and insect pests"
            }
            EfficacyTier::Good => {
                "Good: controls insects and weeds, but not enough for plant diseases"
            }
            EfficacyTier::Fair => "Fair: controls weeds only",
            EfficacyTier::NeedsImprovement => {
                "Needs improvement: low efficacy for every kind of protection"
            }
        }
    }
}

/// One row of the policy table. Every condition that is present must hold.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PolicyRule {
    pub tier: EfficacyTier,

    /// Inclusive lower bound on droplet count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_count: Option<usize>,

    /// Inclusive lower bound on droplets per unit area (after density scaling)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_density: Option<f64>,

    /// Inclusive [min, max] band on mean diameter in physical units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diameter_range: Option<[f64; 2]>,
}

impl PolicyRule {
    fn matches(&self, input: &ClassificationInput) -> bool {
        if let Some(min_count) = self.min_count {
            if input.count < min_count {
                return false;
            }
        }

        if let Some(min_density) = self.min_density {
            if input.density < min_density {
                return false;
            }
        }

        if let Some([low, high]) = self.diameter_range {
            match input.mean_diameter {
                Some(d) if d >= low && d <= high => {}
                _ => return false,
            }
        }

        true
    }
}

/// Values the policy can look at
#[derive(Debug, Clone, Copy)]
pub struct ClassificationInput {
    pub count: usize,
    pub density: f64,
    pub mean_diameter: Option<f64>,
}

/// Ordered rule table, evaluated top-down; the first matching rule wins
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ClassificationPolicy {
    pub rules: Vec<PolicyRule>,
    pub fallback: EfficacyTier,
}

// Count-only thresholds
pub const COUNT_EXCELLENT_MIN: usize = 6;
pub const COUNT_GOOD_MIN: usize = 3;
pub const COUNT_FAIR_MIN: usize = 2;

// Count + diameter thresholds (diameters in µm)
pub const SIZED_EXCELLENT_MIN_COUNT: usize = 51;
pub const SIZED_EXCELLENT_DIAMETER: [f64; 2] = [100.0, 300.0];
pub const SIZED_GOOD_MIN_COUNT: usize = 31;
pub const SIZED_GOOD_DIAMETER: [f64; 2] = [50.0, 400.0];
pub const SIZED_FAIR_MIN_COUNT: usize = 21;

impl ClassificationPolicy {
    /// Tiers decided by droplet count alone
    pub fn count_only() -> Self {
        Self {
            rules: vec![
                PolicyRule::count_at_least(EfficacyTier::Excellent, COUNT_EXCELLENT_MIN),
                PolicyRule::count_at_least(EfficacyTier::Good, COUNT_GOOD_MIN),
                PolicyRule::count_at_least(EfficacyTier::Fair, COUNT_FAIR_MIN),
            ],
            fallback: EfficacyTier::NeedsImprovement,
        }
    }

    /// Tiers combining a count floor with a mean diameter band
    pub fn count_and_diameter() -> Self {
        Self {
            rules: vec![
                PolicyRule {
                    diameter_range: Some(SIZED_EXCELLENT_DIAMETER),
                    ..PolicyRule::count_at_least(EfficacyTier::Excellent, SIZED_EXCELLENT_MIN_COUNT)
                },
                PolicyRule {
                    diameter_range: Some(SIZED_GOOD_DIAMETER),
                    ..PolicyRule::count_at_least(EfficacyTier::Good, SIZED_GOOD_MIN_COUNT)
                },
                PolicyRule::count_at_least(EfficacyTier::Fair, SIZED_FAIR_MIN_COUNT),
            ],
            fallback: EfficacyTier::NeedsImprovement,
        }
    }

    pub fn classify(&self, input: &ClassificationInput) -> EfficacyTier {
        self.rules
            .iter()
            .find(|rule| rule.matches(input))
            .map(|rule| rule.tier)
            .unwrap_or(self.fallback)
    }
}

impl Default for ClassificationPolicy {
    fn default() -> Self {
        Self::count_only()
    }
}

impl PolicyRule {
    pub fn count_at_least(tier: EfficacyTier, min_count: usize) -> Self {
        Self {
            tier,
            min_count: Some(min_count),
            min_density: None,
            diameter_range: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(count: usize, mean_diameter: Option<f64>) -> ClassificationInput {
        ClassificationInput { count, density: 0.0, mean_diameter }
    }

    #[test]
    fn count_only_tiers() {
        let policy = ClassificationPolicy::count_only();
        assert_eq!(policy.classify(&input(0, None)), EfficacyTier::NeedsImprovement);
        assert_eq!(policy.classify(&input(1, None)), EfficacyTier::NeedsImprovement);
        assert_eq!(policy.classify(&input(2, None)), EfficacyTier::Fair);
        assert_eq!(policy.classify(&input(3, None)), EfficacyTier::Good);
        assert_eq!(policy.classify(&input(5, None)), EfficacyTier::Good);
        assert_eq!(policy.classify(&input(6, None)), EfficacyTier::Excellent);
    }

    #[test]
    fn diameter_band_gates_the_top_tiers() {
        let policy = ClassificationPolicy::count_and_diameter();
        assert_eq!(policy.classify(&input(60, Some(200.0))), EfficacyTier::Excellent);
        // Too coarse for excellent, still inside the good band
        assert_eq!(policy.classify(&input(60, Some(350.0))), EfficacyTier::Good);
        // Outside every band, count carries it to fair
        assert_eq!(policy.classify(&input(60, Some(900.0))), EfficacyTier::Fair);
        assert_eq!(policy.classify(&input(60, None)), EfficacyTier::Fair);
        assert_eq!(policy.classify(&input(50, Some(200.0))), EfficacyTier::Good);
        assert_eq!(policy.classify(&input(10, Some(200.0))), EfficacyTier::NeedsImprovement);
    }

    #[test]
    fn first_match_wins() {
        let policy = ClassificationPolicy {
            rules: vec![
                PolicyRule::count_at_least(EfficacyTier::Fair, 1),
                PolicyRule::count_at_least(EfficacyTier::Excellent, 1),
            ],
            fallback: EfficacyTier::NeedsImprovement,
        };
        assert_eq!(policy.classify(&input(10, None)), EfficacyTier::Fair);
    }

    #[test]
    fn density_rule() {
        let policy = ClassificationPolicy {
            rules: vec![PolicyRule {
                tier: EfficacyTier::Good,
                min_count: None,
                min_density: Some(2.5),
                diameter_range: None,
            }],
            fallback: EfficacyTier::NeedsImprovement,
        };
        let dense = ClassificationInput { count: 1, density: 3.0, mean_diameter: None };
        let sparse = ClassificationInput { count: 100, density: 1.0, mean_diameter: None };
        assert_eq!(policy.classify(&dense), EfficacyTier::Good);
        assert_eq!(policy.classify(&sparse), EfficacyTier::NeedsImprovement);
    }

    #[test]
    fn tiers_are_ordered() {
        assert!(EfficacyTier::Excellent > EfficacyTier::Good);
        assert!(EfficacyTier::Good > EfficacyTier::Fair);
        assert!(EfficacyTier::Fair > EfficacyTier::NeedsImprovement);
    }

    #[test]
    fn policy_loads_from_toml() {
        let text = r#"
            fallback = "needs_improvement"

            [[rules]]
            tier = "excellent"
            min_count = 10
            diameter_range = [100.0, 300.0]
        "#;
        let policy: ClassificationPolicy = toml::from_str(text).unwrap();
        assert_eq!(policy.rules.len(), 1);
        assert_eq!(policy.rules[0].diameter_range, Some([100.0, 300.0]));
        assert_eq!(policy.classify(&input(12, Some(150.0))), EfficacyTier::Excellent);
    }
}
