//! Tiered keep-counts for `borg prune`.

use serde::{Deserialize, Serialize};

/// Number of most recent archives kept per time granularity.
///
/// Zero keeps none at that tier. Every tier is always passed to borg so the
/// invocation is explicit about all seven.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RetentionPolicy {
    pub secondly: u32,
    pub minutely: u32,
    pub hourly: u32,
    pub daily: u32,
    pub weekly: u32,
    pub monthly: u32,
    pub yearly: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            secondly: 0,
            minutely: 0,
            hourly: 24,
            daily: 31,
            weekly: 104,
            monthly: 0,
            yearly: 0,
        }
    }
}

impl RetentionPolicy {
    /// Tiers in fixed order, finest first.
    pub fn tiers(&self) -> [(&'static str, u32); 7] {
        [
            ("secondly", self.secondly),
            ("minutely", self.minutely),
            ("hourly", self.hourly),
            ("daily", self.daily),
            ("weekly", self.weekly),
            ("monthly", self.monthly),
            ("yearly", self.yearly),
        ]
    }

    /// `--keep-<tier> <n>` pairs for every tier, zeros included.
    pub fn prune_args(&self) -> Vec<String> {
        self.tiers()
            .iter()
            .flat_map(|(tier, count)| [format!("--keep-{tier}"), count.to_string()])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_tiers_are_emitted() {
        let policy = RetentionPolicy {
            secondly: 0,
            minutely: 0,
            hourly: 24,
            daily: 31,
            weekly: 104,
            monthly: 0,
            yearly: 0,
        };
        assert_eq!(
            policy.prune_args(),
            vec![
                "--keep-secondly",
                "0",
                "--keep-minutely",
                "0",
                "--keep-hourly",
                "24",
                "--keep-daily",
                "31",
                "--keep-weekly",
                "104",
                "--keep-monthly",
                "0",
                "--keep-yearly",
                "0",
            ]
        );
    }

    #[test]
    fn partial_table_fills_defaults() {
        let policy: RetentionPolicy = toml::from_str("daily = 7").expect("parse");
        assert_eq!(policy.daily, 7);
        assert_eq!(policy.hourly, 24);
    }

    #[test]
    fn negative_counts_are_rejected() {
        assert!(toml::from_str::<RetentionPolicy>("hourly = -1").is_err());
    }

    #[test]
    fn unknown_tier_is_rejected() {
        assert!(toml::from_str::<RetentionPolicy>("fortnightly = 2").is_err());
    }
}
